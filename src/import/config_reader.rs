use crate::import::*;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct VoteSettings {
    pub id: String,
    pub title: String,
    pub shortcode: Option<String>,
    pub date: NaiveDate,
    pub domain: Option<Domain>,
    /// `simple` (the default) or `complex`.
    #[serde(rename = "type")]
    pub vote_type: Option<String>,
    #[serde(rename = "hasExpats")]
    pub has_expats: Option<bool>,
    pub status: Option<Status>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct EntityConfig {
    pub id: u32,
    pub name: String,
    pub district: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    #[serde(rename = "ballotType")]
    pub ballot_type: String,
    /// Relative to the configuration file.
    #[serde(rename = "filePath")]
    pub file_path: String,
    /// `csv`, `xls` or `xlsx`. Guessed from the extension if missing.
    #[serde(rename = "inputType")]
    pub input_type: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    pub vote: VoteSettings,
    #[serde(default)]
    pub entities: Vec<EntityConfig>,
    #[serde(rename = "resultFileSources", default)]
    pub result_file_sources: Vec<FileSource>,
}

pub fn read_config(path: &str) -> ImportResult<ImportConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    parse_config(&contents, path)
}

pub(crate) fn parse_config(contents: &str, path: &str) -> ImportResult<ImportConfig> {
    let config: ImportConfig =
        serde_json::from_str(contents).context(ParsingJsonSnafu { path })?;
    Ok(config)
}

pub fn read_summary(path: &str) -> ImportResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    debug!("read_summary: content: {:?}", contents);
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(js)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_config() {
        let contents = r#"{
            "vote": {
                "id": "vote-2015-06-14",
                "title": "Stipendieninitiative",
                "date": "2015-06-14",
                "domain": "canton",
                "type": "complex",
                "hasExpats": true
            },
            "entities": [
                { "id": 1701, "name": "Baar", "district": "Baar" },
                { "id": 1702, "name": "Cham" }
            ],
            "resultFileSources": [
                { "ballotType": "proposal", "filePath": "proposal.xlsx" }
            ]
        }"#;
        let config = parse_config(contents, "config.json").unwrap();
        assert_eq!(config.vote.date, NaiveDate::from_ymd_opt(2015, 6, 14).unwrap());
        assert_eq!(config.vote.domain, Some(Domain::Canton));
        assert_eq!(config.vote.vote_type.as_deref(), Some("complex"));
        assert_eq!(config.vote.status, None);
        assert_eq!(config.entities.len(), 2);
        assert_eq!(config.entities[1].district, None);
        assert_eq!(config.result_file_sources[0].file_path, "proposal.xlsx");
        assert_eq!(config.result_file_sources[0].input_type, None);
    }

    #[test]
    fn reports_invalid_config() {
        let res = parse_config(r#"{ "vote": { "id": "x" } }"#, "config.json");
        assert!(matches!(res, Err(ImportError::ParsingJson { .. })));
        assert!(matches!(
            read_config("/nonexistent/config.json"),
            Err(ImportError::OpeningJson { .. })
        ));
    }
}
