use crate::tabular::*;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

/// Either UTF-8 or, if the bytes are not valid UTF-8, Windows-1252.
///
/// Windows-1252 is what excel writes on windows and it is a superset of
/// Latin-1. Other encodings are not guessed.
pub fn detect_encoding(bytes: &[u8]) -> &'static Encoding {
    match std::str::from_utf8(bytes) {
        Ok(_) => UTF_8,
        Err(_) => WINDOWS_1252,
    }
}

/// Decodes the bytes with the given encoding label, or the detected
/// encoding. A byte order mark is removed.
pub fn decode(bytes: &[u8], label: Option<&str>) -> CsvResult<String> {
    let encoding = match label {
        Some(l) => Encoding::for_label(l.trim().as_bytes()).context(EncodingUndetectableSnafu {})?,
        None => detect_encoding(bytes),
    };
    debug!("decode: using {}", encoding.name());
    let (text, had_errors) = encoding.decode_with_bom_removal(bytes);
    ensure!(!had_errors, EncodingUndetectableSnafu {});
    Ok(text.into_owned())
}
