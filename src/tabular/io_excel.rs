// Converting excel workbooks to csv, so that they can be read like any
// other file.

use crate::tabular::*;
use calamine::{DataType, Range, Reader, Xls, Xlsx};
use std::io::Cursor;

/// Converts a sheet of a xlsx workbook, the first one if no sheet is given.
///
/// Rows without any value are left out.
pub fn convert_xlsx_to_csv(bytes: &[u8], sheet: Option<&str>) -> CsvResult<Vec<u8>> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).context(OpeningXlsxSnafu {})?;
    let range = match sheet {
        Some(name) => workbook
            .worksheet_range(name)
            .context(SheetNotFoundSnafu { sheet: name })?
            .context(ReadingXlsxSnafu {})?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyWorkbookSnafu {})?
            .context(ReadingXlsxSnafu {})?,
    };
    write_csv(&range, true)
}

/// Converts a sheet of a xls workbook, the first one if no sheet is given.
pub fn convert_xls_to_csv(bytes: &[u8], sheet: Option<&str>) -> CsvResult<Vec<u8>> {
    let mut workbook: Xls<_> = Xls::new(Cursor::new(bytes)).context(OpeningXlsSnafu {})?;
    let range = match sheet {
        Some(name) => workbook
            .worksheet_range(name)
            .context(SheetNotFoundSnafu { sheet: name })?
            .context(ReadingXlsSnafu {})?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyWorkbookSnafu {})?
            .context(ReadingXlsSnafu {})?,
    };
    write_csv(&range, false)
}

/// Tries the file as xlsx first, then as xls.
pub fn convert_excel_to_csv(bytes: &[u8], sheet: Option<&str>) -> CsvResult<Vec<u8>> {
    match convert_xlsx_to_csv(bytes, sheet) {
        Err(CsvError::OpeningXlsx { source }) => {
            debug!("convert_excel_to_csv: not a xlsx file: {:?}", source);
        }
        x => return x,
    }
    match convert_xls_to_csv(bytes, sheet) {
        Err(CsvError::OpeningXls { source }) => {
            debug!("convert_excel_to_csv: not a xls file: {:?}", source);
            NotAnExcelFileSnafu {}.fail()
        }
        x => x,
    }
}

fn write_csv(range: &Range<DataType>, skip_empty_rows: bool) -> CsvResult<Vec<u8>> {
    let (row_offset, column_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut buffer: Vec<u8> = Vec::new();
    {
        let mut writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Always)
            .terminator(csv::Terminator::Any(b'\n'))
            .flexible(true)
            .from_writer(&mut buffer);
        for (idx, row) in range.rows().enumerate() {
            if skip_empty_rows && row.iter().all(is_empty_cell) {
                continue;
            }
            let record = row
                .iter()
                .enumerate()
                .map(|(column, cell)| {
                    render_cell(cell, row_offset + idx + 1, column_offset + column + 1)
                })
                .collect::<CsvResult<Vec<String>>>()?;
            writer.write_record(&record).context(WritingCsvSnafu {})?;
        }
        writer.flush().context(FlushingCsvSnafu {})?;
    }
    Ok(buffer)
}

fn is_empty_cell(cell: &DataType) -> bool {
    match cell {
        DataType::Empty => true,
        DataType::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

// Rows and columns start at 1 for the error messages.
fn render_cell(cell: &DataType, row: usize, column: usize) -> CsvResult<String> {
    match cell {
        DataType::Empty => Ok(String::new()),
        DataType::String(s) => Ok(s.clone()),
        DataType::Int(i) => Ok(i.to_string()),
        DataType::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => Ok((*f as i64).to_string()),
        DataType::Float(f) => Ok(f.to_string()),
        DataType::Bool(b) => Ok(if *b { "1" } else { "0" }.to_string()),
        DataType::DateTime(_) => cell
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
            .context(UnsupportedCellSnafu { row, column }),
        _ => UnsupportedCellSnafu { row, column }.fail(),
    }
}
