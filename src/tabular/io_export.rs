// Writing flat rows, such as the export rows of a vote, as csv.

use crate::tabular::*;
use serde::Serialize;

/// One line per row, preceded by the field names of the rows.
///
/// Without rows, nothing is written, not even the header.
pub fn convert_rows_to_csv<T: Serialize>(rows: &[T]) -> CsvResult<Vec<u8>> {
    let mut buffer: Vec<u8> = Vec::new();
    if rows.is_empty() {
        return Ok(buffer);
    }
    {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(&mut buffer);
        for row in rows {
            writer.serialize(row).context(WritingCsvSnafu {})?;
        }
        writer.flush().context(FlushingCsvSnafu {})?;
    }
    debug!("convert_rows_to_csv: {} rows, {} bytes", rows.len(), buffer.len());
    Ok(buffer)
}
