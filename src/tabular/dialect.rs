// Guessing the delimiter of a file.

use crate::tabular::*;
use std::collections::HashMap;

/// The delimiters we accept, in order of preference.
const DELIMITERS: [u8; 3] = [b',', b'\t', b';'];

/// The share of records that must agree on the number of delimiters.
const MIN_CONSISTENCY: f64 = 0.9;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct Dialect {
    pub delimiter: u8,
    pub quote: u8,
}

impl Dialect {
    /// What excel writes when exporting to csv.
    pub const EXCEL: Dialect = Dialect {
        delimiter: b',',
        quote: b'"',
    };

    pub fn with_delimiter(delimiter: u8) -> Dialect {
        Dialect {
            delimiter,
            ..Dialect::EXCEL
        }
    }

    /// A reader that returns the header as a record and tolerates rows of
    /// different lengths.
    pub fn reader_builder(&self) -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .delimiter(self.delimiter)
            .quote(self.quote)
            .has_headers(false)
            .flexible(true);
        builder
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Dialect::EXCEL
    }
}

/// Detects the delimiter among `,`, tab and `;`.
///
/// The delimiter must appear the same number of times in (almost) every
/// record. If the whole text does not allow a decision, the first line alone
/// is tried.
pub fn sniff_dialect(text: &str) -> CsvResult<Dialect> {
    ensure!(!text.is_empty(), EmptyFileSnafu {});

    if let Some(d) = guess_delimiter(text) {
        return Ok(Dialect::with_delimiter(d));
    }

    // The header tends to contain fewer special cases.
    if let Some(pos) = text.find('\n') {
        debug!("sniff_dialect: retrying with the first line");
        return sniff_dialect(&text[..pos]);
    }

    InvalidFormatSnafu {}.fail()
}

fn guess_delimiter(text: &str) -> Option<u8> {
    let records: Vec<[usize; 3]> = split_records(text, &DELIMITERS, Dialect::EXCEL.quote)
        .into_iter()
        .filter(|r| !r.text.is_empty())
        .map(|r| r.delimiters)
        .collect();
    if records.is_empty() {
        return None;
    }
    let total = records.len() as f64;

    let mut best: Option<(u8, f64)> = None;
    for (idx, delimiter) in DELIMITERS.iter().enumerate() {
        let mut frequencies: HashMap<usize, usize> = HashMap::new();
        for counts in records.iter() {
            *frequencies.entry(counts[idx]).or_insert(0) += 1;
        }
        // The most common number of occurences, ignoring records without any.
        let mode = frequencies
            .iter()
            .filter(|(occurences, _)| **occurences > 0)
            .max_by(|(o1, n1), (o2, n2)| n1.cmp(n2).then(o2.cmp(o1)));
        if let Some((_, &agreeing)) = mode {
            let agreeing = agreeing as f64;
            let consistency = (agreeing - (total - agreeing)) / total;
            debug!(
                "guess_delimiter: {:?}: consistency {}",
                *delimiter as char, consistency
            );
            if consistency >= MIN_CONSISTENCY {
                match best {
                    Some((_, c)) if c >= consistency => {}
                    _ => best = Some((*delimiter, consistency)),
                }
            }
        }
    }
    best.map(|(d, _)| d)
}

/// A record as found in the raw text, before any parsing.
#[derive(Eq, PartialEq, Debug)]
pub(crate) struct RawRecord<'a> {
    /// The line the record starts on, from 1.
    pub line: usize,
    /// Without the line terminator.
    pub text: &'a str,
    /// The occurences of `,`, tab and `;` outside of quoted values.
    pub delimiters: [usize; 3],
}

// Splits the text into records the way the csv reader does: a quote only
// opens a quoted value at the start of a field, and line breaks within a
// quoted value do not end the record. Doubled quotes are escapes.
pub(crate) fn split_records<'a>(text: &'a str, separators: &[u8], quote: u8) -> Vec<RawRecord<'a>> {
    let quote = quote as char;
    let mut records: Vec<RawRecord> = Vec::new();
    let mut start = 0;
    let mut start_line = 1;
    let mut line = 1;
    let mut delimiters = [0usize; 3];
    let mut in_quotes = false;
    let mut at_field_start = true;
    let mut chars = text.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        if c == '\n' {
            line += 1;
        }
        if in_quotes {
            if c == quote {
                if chars.peek().map(|(_, next)| *next == quote).unwrap_or(false) {
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            continue;
        }
        if c == '\n' {
            let record = &text[start..idx];
            records.push(RawRecord {
                line: start_line,
                text: record.strip_suffix('\r').unwrap_or(record),
                delimiters,
            });
            start = idx + 1;
            start_line = line;
            delimiters = [0; 3];
            at_field_start = true;
        } else if c == quote && at_field_start {
            in_quotes = true;
            at_field_start = false;
        } else if c.is_ascii() && separators.contains(&(c as u8)) {
            if let Some(pos) = DELIMITERS.iter().position(|d| *d as char == c) {
                delimiters[pos] += 1;
            }
            at_field_start = true;
        } else if c != '\r' {
            at_field_start = false;
        }
    }
    if start < text.len() {
        let record = &text[start..];
        records.push(RawRecord {
            line: start_line,
            text: record.strip_suffix('\r').unwrap_or(record),
            delimiters,
        });
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_common_delimiters() {
        assert_eq!(sniff_dialect("a,b,c\n1,2,3\n").unwrap().delimiter, b',');
        assert_eq!(sniff_dialect("a;b;c\n1;2;3\n").unwrap().delimiter, b';');
        assert_eq!(sniff_dialect("a\tb\n1\t2").unwrap().delimiter, b'\t');
    }

    #[test]
    fn prefers_consistent_delimiter() {
        // Commas appear in values, semicolons separate.
        let text = "name;value\n\"a,b\";1\nc,d,e;2\nf;3\n";
        assert_eq!(sniff_dialect(text).unwrap().delimiter, b';');
    }

    #[test]
    fn ignores_delimiters_in_quotes() {
        let text = "a,b\n\"x;y;z\",1\n\"u;v;w\",2\n";
        assert_eq!(sniff_dialect(text).unwrap().delimiter, b',');
    }

    #[test]
    fn falls_back_to_first_line() {
        let text = "a;b;c\n1\n2\n3\n";
        assert_eq!(sniff_dialect(text).unwrap().delimiter, b';');
    }

    #[test]
    fn fails_without_delimiter() {
        assert!(matches!(sniff_dialect(""), Err(CsvError::EmptyFile {})));
        assert!(matches!(
            sniff_dialect("abc\ndef\n"),
            Err(CsvError::InvalidFormat {})
        ));
        // Pipes are not accepted.
        assert!(matches!(
            sniff_dialect("a|b\n1|2\n"),
            Err(CsvError::InvalidFormat {})
        ));
    }

    #[test]
    fn quotes_inside_values_are_literal() {
        let text = "size,n\n12\" Zoll,1\n13\" Zoll,2\n14\" Zoll,3\n";
        assert_eq!(sniff_dialect(text).unwrap().delimiter, b',');

        let records = split_records(text, b",", b'"');
        let lines: Vec<(usize, &str)> = records.iter().map(|r| (r.line, r.text)).collect();
        assert_eq!(
            lines,
            vec![
                (1, "size,n"),
                (2, "12\" Zoll,1"),
                (3, "13\" Zoll,2"),
                (4, "14\" Zoll,3")
            ]
        );
    }

    #[test]
    fn splits_records_on_unquoted_line_breaks() {
        let text = "a;b\r\n\"x\n\"\"y\"\"\";1\r\n\n2;3";
        let records = split_records(text, b";", b'"');
        let lines: Vec<(usize, &str)> = records.iter().map(|r| (r.line, r.text)).collect();
        assert_eq!(
            lines,
            vec![
                (1, "a;b"),
                (2, "\"x\n\"\"y\"\"\";1"),
                (4, ""),
                (5, "2;3")
            ]
        );
        assert_eq!(records[1].delimiters, [0, 0, 1]);
    }

    #[test]
    fn builds_readers() {
        let dialect = Dialect::with_delimiter(b';');
        assert_eq!(dialect.quote, b'"');
        let mut reader = dialect.reader_builder().from_reader("a;b\n1\n".as_bytes());
        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][1], "b");
        assert_eq!(records[1].len(), 1);
    }
}
