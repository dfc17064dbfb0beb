// Reading tabular files whose headers only loosely match what we expect.

pub mod dialect;
pub mod encoding;
pub mod headers;
pub mod io_excel;
pub mod io_export;

use log::{debug, info};
use snafu::{prelude::*, Snafu};
use std::rc::Rc;

pub use crate::tabular::dialect::{sniff_dialect, Dialect};
use crate::tabular::dialect::split_records;
pub use crate::tabular::encoding::{decode, detect_encoding};
pub use crate::tabular::headers::{
    as_valid_identifier, match_headers, normalize_header, parse_header, sane_distance,
};
pub use crate::tabular::io_excel::{convert_excel_to_csv, convert_xls_to_csv, convert_xlsx_to_csv};
pub use crate::tabular::io_export::convert_rows_to_csv;

/// Structural problems of a tabular file.
///
/// Problems with single values are left to the callers.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CsvError {
    #[snafu(display("The encoding of the file could not be detected"))]
    EncodingUndetectable {},
    #[snafu(display("The file is empty"))]
    EmptyFile {},
    #[snafu(display("The delimiter of the file could not be detected"))]
    InvalidFormat {},
    #[snafu(display("The file contains an empty line before row {rownumber}"))]
    EmptyLineInFile { rownumber: usize },
    #[snafu(display("Some column names appear twice: {}", names.join(", ")))]
    DuplicateColumnNames { names: Vec<String> },
    #[snafu(display("Missing columns: {}", columns.join(", ")))]
    MissingColumns { columns: Vec<String> },
    #[snafu(display("Ambiguous columns: {:?}", columns))]
    AmbiguousColumns {
        columns: Vec<(String, Vec<String>)>,
    },
    #[snafu(display("The column {name} can not be used, rownumber is reserved"))]
    ReservedColumnName { name: String },
    #[snafu(display("Row {rownumber} has no value for the column {column}"))]
    RowTooShort { rownumber: usize, column: String },
    #[snafu(display("Row {rownumber} could not be parsed"))]
    MalformedRow {
        source: csv::Error,
        rownumber: usize,
    },

    #[snafu(display("Error opening xlsx file"))]
    OpeningXlsx { source: calamine::XlsxError },
    #[snafu(display("Error opening xls file"))]
    OpeningXls { source: calamine::XlsError },
    #[snafu(display("Error reading sheet of xlsx file"))]
    ReadingXlsx { source: calamine::XlsxError },
    #[snafu(display("Error reading sheet of xls file"))]
    ReadingXls { source: calamine::XlsError },
    #[snafu(display("The file is neither a xlsx nor a xls file"))]
    NotAnExcelFile {},
    #[snafu(display("The sheet {sheet} does not exist"))]
    SheetNotFound { sheet: String },
    #[snafu(display("The workbook has no sheets"))]
    EmptyWorkbook {},
    #[snafu(display("Unsupported cell at row {row}, column {column}"))]
    UnsupportedCell { row: usize, column: usize },
    #[snafu(display("Error writing the converted file"))]
    WritingCsv { source: csv::Error },
    #[snafu(display("Error writing the converted file"))]
    FlushingCsv { source: std::io::Error },
}

pub type CsvResult<T> = Result<T, CsvError>;

/// How a file should be read. Everything that is not given is detected.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct CsvOptions {
    /// The columns the caller needs, in any spelling close enough to the
    /// real headers. When empty, the headers of the file are used.
    pub expected_headers: Vec<String>,
    pub dialect: Option<Dialect>,
    /// An encoding label such as `utf-8` or `cp1252`.
    pub encoding: Option<String>,
    pub rename_duplicate_column_names: bool,
}

/// A decoded file with its headers matched to the expected ones.
///
/// The file is read once. Every call to `lines` starts over from the first
/// row.
#[derive(Debug)]
pub struct CsvFile {
    text: String,
    dialect: Dialect,
    // (matched header, column index in the file)
    headers: Vec<(String, usize)>,
    fields: Rc<Vec<String>>,
}

/// One data row. Values are trimmed but not converted.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CsvRow {
    /// Starts at 2, the header being on the first row.
    pub rownumber: usize,
    fields: Rc<Vec<String>>,
    values: Vec<String>,
}

impl CsvRow {
    /// The value of a column, by its identifier (see `as_valid_identifier`).
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .position(|f| f == field)
            .and_then(|idx| self.values.get(idx))
            .map(|s| s.as_str())
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

impl CsvFile {
    pub fn new(bytes: &[u8], options: &CsvOptions) -> CsvResult<CsvFile> {
        let text = decode(bytes, options.encoding.as_deref())?;

        let dialect = match options.dialect {
            Some(d) => d,
            None => {
                let sample: String = text.chars().take(1024).collect();
                match sniff_dialect(&sample) {
                    Err(CsvError::InvalidFormat {}) => sniff_dialect(&text)?,
                    x => x?,
                }
            }
        };
        debug!("CsvFile::new: dialect: {:?}", dialect);

        let first_line = text.lines().next().unwrap_or("");
        let parsed = headers::parse_header_columns(
            first_line,
            Some(dialect),
            options.rename_duplicate_column_names,
        )?;
        let found: Vec<String> = parsed.iter().map(|(_, h)| h.clone()).collect();
        let expected = if options.expected_headers.is_empty() {
            found.clone()
        } else {
            options.expected_headers.clone()
        };
        let matched = match_headers(&found, &expected)?;
        let headers: Vec<(String, usize)> = matched
            .into_iter()
            .zip(parsed.iter().map(|(column, _)| *column))
            .collect();
        info!("CsvFile::new: headers: {:?}", headers);

        let fields: Vec<String> = headers
            .iter()
            .map(|(h, _)| as_valid_identifier(h))
            .collect();
        if let Some((name, _)) = headers
            .iter()
            .zip(fields.iter())
            .find(|(_, f)| f.as_str() == "rownumber")
            .map(|(h, _)| h)
        {
            return ReservedColumnNameSnafu { name: name.clone() }.fail();
        }

        check_empty_lines(&text, dialect)?;

        Ok(CsvFile {
            text,
            dialect,
            headers,
            fields: Rc::new(fields),
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// The matched headers, in the order of the file.
    pub fn headers(&self) -> Vec<&str> {
        self.headers.iter().map(|(h, _)| h.as_str()).collect()
    }

    /// The identifiers under which the values of a row can be accessed.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn lines(&self) -> impl Iterator<Item = CsvResult<CsvRow>> + '_ {
        let reader = self
            .dialect
            .reader_builder()
            .from_reader(self.text.as_bytes());
        reader
            .into_records()
            .enumerate()
            // the first record holds the headers
            .skip(1)
            .map(move |(ix, record)| {
                let rownumber = ix + 1;
                let record = record.context(MalformedRowSnafu { rownumber })?;
                let values = self
                    .headers
                    .iter()
                    .map(|(name, column)| {
                        record
                            .get(*column)
                            .map(|v| v.trim().to_string())
                            .context(RowTooShortSnafu {
                                rownumber,
                                column: name.clone(),
                            })
                    })
                    .collect::<CsvResult<Vec<String>>>()?;
                Ok(CsvRow {
                    rownumber,
                    fields: Rc::clone(&self.fields),
                    values,
                })
            })
    }
}

// Empty lines are only allowed at the end of a file. Quoted values may
// span several lines, so this works on records rather than lines.
fn check_empty_lines(text: &str, dialect: Dialect) -> CsvResult<()> {
    let mut encountered_empty_line = false;
    for record in split_records(text, &[dialect.delimiter], dialect.quote) {
        if record.text.is_empty() {
            encountered_empty_line = true;
            continue;
        }
        ensure!(
            !encountered_empty_line,
            EmptyLineInFileSnafu {
                rownumber: record.line
            }
        );
    }
    Ok(())
}
