// Matching the headers of a file against the expected ones.

use crate::tabular::*;
use deunicode::deunicode;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Strips, lowercases, transliterates to ASCII and collapses inner
/// whitespace: ` Ungültige  Stimmzettel` becomes `ungultige stimmzettel`.
pub fn normalize_header(header: &str) -> String {
    let header = deunicode(&header.trim().to_lowercase());
    WHITESPACE.replace_all(&header, " ").into_owned()
}

/// The name under which a column is accessible in a row.
pub fn as_valid_identifier(value: &str) -> String {
    let result: String = normalize_header(value)
        .chars()
        .map(|c| if "- .%/,;()".contains(c) { '_' } else { c })
        .collect();
    result
        .trim_start_matches(|c: char| c == '_' || c.is_ascii_digit())
        .to_string()
}

/// The normalized headers of the first line, without the empty ones.
///
/// Without dialect, the dialect is sniffed. An empty line has no headers.
pub fn parse_header(
    line: &str,
    dialect: Option<Dialect>,
    rename_duplicate_column_names: bool,
) -> CsvResult<Vec<String>> {
    let columns = parse_header_columns(line, dialect, rename_duplicate_column_names)?;
    Ok(columns.into_iter().map(|(_, h)| h).collect())
}

// Same as parse_header, with the index of every header in the line.
pub(crate) fn parse_header_columns(
    line: &str,
    dialect: Option<Dialect>,
    rename_duplicate_column_names: bool,
) -> CsvResult<Vec<(usize, String)>> {
    let dialect = match dialect {
        Some(d) => d,
        None => match sniff_dialect(line) {
            Ok(d) => d,
            Err(CsvError::EmptyFile {}) => return Ok(Vec::new()),
            // Maybe a file with a single column.
            Err(_) => Dialect::EXCEL,
        },
    };

    let mut reader = dialect.reader_builder().from_reader(line.as_bytes());
    let record = match reader.records().next() {
        Some(r) => r.context(MalformedRowSnafu { rownumber: 1usize })?,
        None => return Ok(Vec::new()),
    };
    let mut headers: Vec<(usize, String)> = record
        .iter()
        .enumerate()
        .filter(|(_, h)| !h.is_empty())
        .map(|(idx, h)| (idx, normalize_header(h)))
        .collect();

    if rename_duplicate_column_names {
        let mut seen: Vec<(String, usize)> = Vec::new();
        for (_, header) in headers.iter_mut() {
            match seen.iter_mut().find(|(h, _)| h == header) {
                Some((_, count)) => {
                    *count += 1;
                    *header = format!("{}_{}", header, count);
                }
                None => seen.push((header.clone(), 0)),
            }
        }
    }
    debug!("parse_header_columns: {:?}", headers);
    Ok(headers)
}

/// The largest edit distance (excluded) at which a header still matches an
/// expected column.
///
/// It is the smallest of the distances between the headers, the distances
/// between the expected columns and the length of the shortest expected
/// column. A header closer to an expected column than the headers are to
/// each other is a misspelling, anything further away is not a match.
pub fn sane_distance(headers: &[String], expected: &[String]) -> usize {
    let mut sane = usize::MAX;
    sane = sane.min(min_pairwise_distance(headers));
    sane = sane.min(min_pairwise_distance(expected));
    if let Some(shortest) = expected.iter().map(|c| c.chars().count()).min() {
        sane = sane.min(shortest);
    }
    sane
}

fn min_pairwise_distance(values: &[String]) -> usize {
    let mut res = usize::MAX;
    for (i, a) in values.iter().enumerate() {
        for b in values.iter().skip(i + 1) {
            res = res.min(strsim::levenshtein(a, b));
        }
    }
    res
}

/// Replaces the headers that match an expected column by the name of that
/// column. Other headers are kept as they are.
///
/// The headers should be normalized already (see `parse_header`). All the
/// expected columns are checked before failing: missing columns are
/// reported first, then the ambiguous ones.
pub fn match_headers(headers: &[String], expected: &[String]) -> CsvResult<Vec<String>> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut duplicates: BTreeSet<String> = BTreeSet::new();
    for h in headers {
        if !seen.insert(h.as_str()) {
            duplicates.insert(h.clone());
        }
    }
    ensure!(
        duplicates.is_empty(),
        DuplicateColumnNamesSnafu {
            names: duplicates.into_iter().collect::<Vec<String>>()
        }
    );

    if expected.is_empty() {
        return Ok(headers.to_vec());
    }

    let sane = sane_distance(headers, expected);
    debug!("match_headers: sane distance: {}", sane);

    // header index -> expected column
    let mut mapping: Vec<Option<&String>> = vec![None; headers.len()];
    let mut missing: Vec<String> = Vec::new();
    let mut ambiguous: Vec<(String, Vec<String>)> = Vec::new();

    for column in expected {
        let normalized = normalize_header(column);
        let distances: Vec<usize> = headers
            .iter()
            .map(|h| strsim::levenshtein(&normalized, h))
            .collect();
        let closest = match distances.iter().min() {
            Some(d) if *d < sane => *d,
            _ => {
                missing.push(column.clone());
                continue;
            }
        };

        let matches: Vec<usize> = distances
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == closest)
            .map(|(idx, _)| idx)
            .collect();
        match matches.as_slice() {
            [idx] if mapping[*idx].is_none() => mapping[*idx] = Some(column),
            _ => ambiguous.push((
                column.clone(),
                matches.iter().map(|idx| headers[*idx].clone()).collect(),
            )),
        }
    }

    ensure!(missing.is_empty(), MissingColumnsSnafu { columns: missing });
    ensure!(
        ambiguous.is_empty(),
        AmbiguousColumnsSnafu { columns: ambiguous }
    );

    Ok(headers
        .iter()
        .zip(mapping)
        .map(|(h, m)| m.unwrap_or(h).clone())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn normalizes() {
        assert_eq!(normalize_header(" Ungültige  Stimmzettel "), "ungultige stimmzettel");
        assert_eq!(normalize_header("Ja\tStimmen"), "ja stimmen");
        assert_eq!(normalize_header("Électeurs"), "electeurs");
    }

    #[test]
    fn makes_identifiers() {
        assert_eq!(as_valid_identifier("Ja Stimmen"), "ja_stimmen");
        assert_eq!(as_valid_identifier("1. Wahlgang (%)"), "wahlgang____");
        assert_eq!(as_valid_identifier("_id"), "id");
        assert_eq!(as_valid_identifier("a-b/c,d;e"), "a_b_c_d_e");
    }

    #[test]
    fn parses_headers() {
        assert_eq!(
            parse_header("Ja Stimmen, Nein Stimmen,,ID", None, false).unwrap(),
            strings(&["ja stimmen", "nein stimmen", "id"])
        );
        assert_eq!(
            parse_header("a;b;a;a", None, true).unwrap(),
            strings(&["a", "b", "a_1", "a_2"])
        );
        assert_eq!(parse_header("", None, false).unwrap(), Vec::<String>::new());
        assert_eq!(
            parse_header("Single", None, false).unwrap(),
            strings(&["single"])
        );
    }

    #[test]
    fn computes_sane_distance() {
        let headers = strings(&["first", "second"]);
        let expected = strings(&["first", "third"]);
        assert_eq!(sane_distance(&headers, &expected), 4);
        assert_eq!(sane_distance(&strings(&["a"]), &strings(&["abc"])), 3);
    }

    #[test]
    fn matches_headers() {
        assert_eq!(
            match_headers(
                &strings(&["firstname", "lastname"]),
                &strings(&["last_name", "first_name"])
            )
            .unwrap(),
            strings(&["first_name", "last_name"])
        );
        assert_eq!(
            match_headers(&strings(&["id", "extra"]), &strings(&["ID"])).unwrap(),
            strings(&["ID", "extra"])
        );
        assert_eq!(
            match_headers(&strings(&["a", "b"]), &[]).unwrap(),
            strings(&["a", "b"])
        );
    }

    #[test]
    fn refuses_distant_matches() {
        // "third" is as far from "first" as the expected columns are apart.
        let res = match_headers(&strings(&["first", "second"]), &strings(&["first", "third"]));
        match res {
            Err(CsvError::MissingColumns { columns }) => assert_eq!(columns, strings(&["third"])),
            x => panic!("unexpected {:?}", x),
        }
    }

    #[test]
    fn reports_ambiguous_columns() {
        let res = match_headers(&strings(&["aaxx", "aayy"]), &strings(&["aaxy"]));
        match res {
            Err(CsvError::AmbiguousColumns { columns }) => assert_eq!(
                columns,
                vec![("aaxy".to_string(), strings(&["aaxx", "aayy"]))]
            ),
            x => panic!("unexpected {:?}", x),
        }
    }

    #[test]
    fn reports_missing_before_ambiguous() {
        let res = match_headers(
            &strings(&["aaxx", "aayy", "zzzzzzzz"]),
            &strings(&["aaxy", "qqqqqqqq"]),
        );
        match res {
            Err(CsvError::MissingColumns { columns }) => {
                assert_eq!(columns, strings(&["qqqqqqqq"]))
            }
            x => panic!("unexpected {:?}", x),
        }
    }

    #[test]
    fn reports_duplicates() {
        let res = match_headers(&strings(&["a", "b", "a"]), &strings(&["a"]));
        match res {
            Err(CsvError::DuplicateColumnNames { names }) => assert_eq!(names, strings(&["a"])),
            x => panic!("unexpected {:?}", x),
        }
    }

    #[test]
    fn everything_is_missing_without_headers() {
        let res = match_headers(&[], &strings(&["id", "name"]));
        match res {
            Err(CsvError::MissingColumns { columns }) => {
                assert_eq!(columns, strings(&["id", "name"]))
            }
            x => panic!("unexpected {:?}", x),
        }
    }
}
