// Importing result files into votes.

pub mod config_reader;
pub mod vote_default;

use log::{debug, info, warn};

use ballot_results::builder::VoteBuilder;
use ballot_results::*;
use chrono::{DateTime, Utc};
use snafu::{prelude::*, Snafu};

use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::json;
use serde_json::Value as JSValue;

use crate::import::config_reader::*;
use crate::tabular::*;

/// The sheet read from excel files, if it exists.
pub const RESULTS_SHEET: &str = "Resultate";

/// A problem found in an uploaded file, optionally with the row it was
/// found on.
///
/// Sorting orders the errors by row, errors concerning the whole file first.
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone)]
pub struct FileImportError {
    pub line: Option<usize>,
    pub error: String,
    pub filename: Option<String>,
}

impl FileImportError {
    pub fn new(error: &str, line: Option<usize>, filename: Option<&str>) -> FileImportError {
        FileImportError {
            line,
            error: error.to_string(),
            filename: filename.map(|f| f.to_string()),
        }
    }
}

impl Display for FileImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(filename) = &self.filename {
            write!(f, "{}: ", filename)?;
        }
        if let Some(line) = self.line {
            write!(f, "line {}: ", line)?;
        }
        write!(f, "{}", self.error)
    }
}

/// Problems with a single value of a row.
#[derive(Eq, PartialEq, Debug, Snafu)]
pub enum ValueError {
    #[snafu(display("Empty value: {column}"))]
    EmptyValue { column: String },
    #[snafu(display("Invalid integer: {column}"))]
    InvalidInteger { column: String },
    #[snafu(display("Missing column: {column}"))]
    MissingColumn { column: String },
}

/// Reads an integer from a row.
///
/// An empty value gives the default if `treat_empty_as_default` is set, an
/// error otherwise.
pub fn validate_integer<T: FromStr>(
    row: &CsvRow,
    column: &str,
    treat_empty_as_default: bool,
    default: T,
) -> Result<T, ValueError> {
    let value = row.get(column).context(MissingColumnSnafu { column })?;
    if value.is_empty() {
        ensure!(treat_empty_as_default, EmptyValueSnafu { column });
        return Ok(default);
    }
    value
        .parse::<T>()
        .ok()
        .context(InvalidIntegerSnafu { column })
}

/// Opens an uploaded file with the expected headers.
///
/// Files which are not plain text are converted from excel first. Every
/// structural problem becomes a single error for the whole file.
pub fn load_csv(
    bytes: &[u8],
    mimetype: &str,
    expected_headers: &[&str],
    filename: Option<&str>,
    dialect: Option<Dialect>,
) -> Result<CsvFile, FileImportError> {
    let error = |message: &str| FileImportError::new(message, None, filename);

    let mut dialect = dialect;
    let converted: Vec<u8>;
    let bytes = if mimetype == "text/plain" || mimetype == "text/csv" {
        bytes
    } else {
        let res = match convert_excel_to_csv(bytes, Some(RESULTS_SHEET)) {
            Err(CsvError::SheetNotFound { sheet }) => {
                debug!("load_csv: no sheet {}, using the first one", sheet);
                convert_excel_to_csv(bytes, None)
            }
            x => x,
        };
        converted = res.map_err(|e| {
            warn!("load_csv: could not convert {:?}: {}", filename, e);
            error(match e {
                CsvError::UnsupportedCell { .. } => "The xls/xlsx file contains unsupported cells.",
                CsvError::EmptyWorkbook {} => "The csv/xls/xlsx file is empty.",
                CsvError::NotAnExcelFile {}
                | CsvError::OpeningXlsx { .. }
                | CsvError::OpeningXls { .. }
                | CsvError::ReadingXlsx { .. }
                | CsvError::ReadingXls { .. } => "Not a valid xls/xlsx file.",
                _ => "Not a valid csv/xls/xlsx file.",
            })
        })?;
        dialect = Some(Dialect::EXCEL);
        converted.as_slice()
    };

    let options = CsvOptions {
        expected_headers: expected_headers.iter().map(|h| h.to_string()).collect(),
        dialect,
        encoding: None,
        rename_duplicate_column_names: false,
    };
    CsvFile::new(bytes, &options).map_err(|e| {
        warn!("load_csv: could not read {:?}: {}", filename, e);
        match e {
            CsvError::MissingColumns { columns } => error(&format!(
                "Missing columns: '{}'",
                columns.join(", ")
            )),
            CsvError::AmbiguousColumns { .. } => error(
                "Could not find the expected columns, make sure all required columns exist and that there are no extra columns.",
            ),
            CsvError::DuplicateColumnNames { .. } => error("Some column names appear twice."),
            CsvError::EmptyFile {} => error("The csv/xls/xlsx file is empty."),
            CsvError::EmptyLineInFile { .. } => error("The file contains an empty line."),
            _ => error("Not a valid csv/xls/xlsx file."),
        }
    })
}

/// Turns a row that could not be read into an error for that row.
pub fn row_error(e: &CsvError, filename: Option<&str>) -> FileImportError {
    let line = match e {
        CsvError::RowTooShort { rownumber, .. } | CsvError::MalformedRow { rownumber, .. } => {
            Some(*rownumber)
        }
        _ => None,
    };
    FileImportError::new("Not a valid csv/xls/xlsx file.", line, filename)
}

/// The entities (municipalities, quarters, ...) results may be reported
/// for, by id.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Principal {
    entities: BTreeMap<u32, Entity>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Entity {
    pub name: String,
    pub district: Option<String>,
}

impl Principal {
    pub fn new(entities: Vec<(u32, Entity)>) -> Principal {
        Principal {
            entities: entities.into_iter().collect(),
        }
    }

    pub fn entity(&self, entity_id: u32) -> Option<&Entity> {
        self.entities.get(&entity_id)
    }

    /// Without any entity, every id is accepted.
    pub fn knows(&self, entity_id: u32) -> bool {
        self.entities.is_empty() || self.entities.contains_key(&entity_id)
    }

    pub fn entities(&self) -> impl Iterator<Item = (u32, &Entity)> {
        self.entities.iter().map(|(id, e)| (*id, e))
    }
}

#[derive(Debug, Snafu)]
pub enum ImportError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error reading result file {path}"))]
    ReadingInput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing summary to {path}"))]
    WritingSummary {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error converting the results of {path} to csv"))]
    ConvertingExport { source: CsvError, path: String },
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("Invalid vote: {source}"))]
    InvalidVote { source: VoteError },
    #[snafu(display("{} errors found in the result files", errors.len()))]
    ImportFailed { errors: Vec<FileImportError> },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type ImportResult<T> = Result<T, ImportError>;

/// What to import, as given on the command line.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct RunOptions {
    pub config_path: String,
    /// A result file that replaces the sources of the configuration.
    pub input: Option<String>,
    pub input_type: Option<String>,
    pub ballot_type: Option<String>,
    pub out: Option<String>,
    /// Where to write the results of every entity as csv.
    pub export: Option<String>,
    pub reference: Option<String>,
}

/// The mime type under which a file is imported.
pub fn mimetype(input_type: Option<&str>, path: &str) -> ImportResult<&'static str> {
    let kind = match input_type {
        Some(t) => t.to_lowercase(),
        None => Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_else(|| "csv".to_string()),
    };
    match kind.as_str() {
        "csv" | "txt" => Ok("text/csv"),
        "xlsx" => Ok("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        "xls" => Ok("application/vnd.ms-excel"),
        x => whatever!("Input type {:?} is not supported", x),
    }
}

pub fn build_vote(settings: &VoteSettings, at: DateTime<Utc>) -> ImportResult<Vote> {
    let mut builder = VoteBuilder::new(&settings.id)
        .context(InvalidVoteSnafu {})?
        .title(&settings.title)
        .date(settings.date)
        .domain(settings.domain.unwrap_or(Domain::Federation))
        .expats(settings.has_expats.unwrap_or(false));
    if let Some(shortcode) = &settings.shortcode {
        builder = builder.shortcode(shortcode);
    }
    builder = match settings.vote_type.as_deref() {
        None | Some("simple") => builder,
        Some("complex") => builder.complex(),
        Some(x) => whatever!("Vote type {:?} is not supported", x),
    };
    let mut vote = builder.build(at).context(InvalidVoteSnafu {})?;
    if settings.status.is_some() {
        vote.set_status(settings.status, at);
    }
    Ok(vote)
}

pub fn build_principal(entities: &[EntityConfig]) -> Principal {
    Principal::new(
        entities
            .iter()
            .map(|e| {
                (
                    e.id,
                    Entity {
                        name: e.name.clone(),
                        district: e.district.clone(),
                    },
                )
            })
            .collect(),
    )
}

/// The summary of a vote, as printed and compared with references.
pub fn build_summary_js(vote: &Vote) -> JSValue {
    let ballots: Vec<JSValue> = vote
        .ballots()
        .iter()
        .map(|b| {
            json!({
                "type": b.ballot_type(),
                "counted": b.counted(),
                "accepted": b.accepted(),
                "yeas": b.yeas(),
                "nays": b.nays(),
                "empty": b.empty(),
                "invalid": b.invalid(),
                "eligibleVoters": b.eligible_voters(),
                "yeasPercentage": round2(b.yeas_percentage()),
                "naysPercentage": round2(b.nays_percentage()),
                "turnout": round2(b.turnout()),
                "progress": [b.progress().0, b.progress().1],
                "districts": b.results_by_district(),
            })
        })
        .collect();
    let (counted, total) = vote.progress();
    json!({
        "vote": {
            "id": vote.id(),
            "title": vote.title(),
            "date": vote.date().format("%Y-%m-%d").to_string(),
            "domain": vote.domain(),
            "status": vote.status(),
            "complex": vote.is_complex(),
        },
        "results": {
            "answer": vote.answer(),
            "counted": vote.counted(),
            "completed": vote.completed(),
            "progress": [counted, total],
            "countedEntities": vote.counted_entities(),
            "yeasPercentage": round2(vote.yeas_percentage()),
            "naysPercentage": round2(vote.nays_percentage()),
            "turnout": round2(vote.turnout()),
            "eligibleVoters": vote.eligible_voters(),
            "castBallots": vote.cast_ballots(),
            "ballots": ballots,
        },
        "export": vote.export(),
    })
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Imports all the result files of a configuration and returns the vote.
///
/// The errors of all the files are collected before failing.
pub fn import_vote(options: &RunOptions, at: DateTime<Utc>) -> ImportResult<Vote> {
    let config = read_config(&options.config_path)?;
    info!("import_vote: config: {:?}", config);

    let mut vote = build_vote(&config.vote, at)?;
    let principal = build_principal(&config.entities);

    let sources: Vec<(String, FileSource)> = match &options.input {
        Some(input) => vec![(
            input.clone(),
            FileSource {
                ballot_type: options
                    .ballot_type
                    .clone()
                    .unwrap_or_else(|| "proposal".to_string()),
                file_path: input.clone(),
                input_type: options.input_type.clone(),
            },
        )],
        None => {
            let config_p = Path::new(&options.config_path);
            let root_p = config_p.parent().context(MissingParentDirSnafu {})?;
            config
                .result_file_sources
                .iter()
                .map(|s| {
                    let p: PathBuf = root_p.join(&s.file_path);
                    (p.display().to_string(), s.clone())
                })
                .collect()
        }
    };
    if sources.is_empty() {
        whatever!("No result files given")
    }

    let mut errors: Vec<FileImportError> = Vec::new();
    for (path, source) in sources.iter() {
        let ballot_type = match BallotType::parse(&source.ballot_type) {
            Some(bt) => bt,
            None => whatever!("Unknown ballot type {:?}", source.ballot_type),
        };
        info!("import_vote: reading {:?} for the {}", path, ballot_type);
        let bytes = fs::read(path).context(ReadingInputSnafu { path })?;
        let mime = mimetype(source.input_type.as_deref(), path)?;
        let mut file_errors = vote_default::import_vote_default(
            &mut vote,
            &principal,
            ballot_type,
            &bytes,
            mime,
            at,
        );
        errors.append(&mut file_errors);
    }
    ensure!(errors.is_empty(), ImportFailedSnafu { errors });
    Ok(vote)
}

/// Imports, prints the summary and compares it with the reference.
pub fn run_import(options: &RunOptions) -> ImportResult<()> {
    let vote = import_vote(options, Utc::now())?;
    let summary_js = build_summary_js(&vote);
    let pretty_js_summary = serde_json::to_string_pretty(&summary_js)
        .context(ParsingJsonSnafu { path: "summary" })?;

    match options.out.as_deref() {
        None | Some("stdout") => println!("{}", pretty_js_summary),
        Some(path) => {
            fs::write(path, &pretty_js_summary).context(WritingSummarySnafu { path })?;
            info!("run_import: summary written to {:?}", path);
        }
    }

    if let Some(path) = options.export.as_deref() {
        let export = convert_rows_to_csv(&vote.export()).context(ConvertingExportSnafu { path })?;
        fs::write(path, export).context(WritingSummarySnafu { path })?;
        info!("run_import: results exported to {:?}", path);
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &options.reference {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref = serde_json::to_string_pretty(&summary_ref)
            .context(ParsingJsonSnafu { path: summary_p })?;
        if pretty_js_summary_ref != pretty_js_summary {
            warn!("Found differences with the reference summary");
            text_diff::print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_summary.as_str(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }
    Ok(())
}
