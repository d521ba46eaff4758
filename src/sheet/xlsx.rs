use rust_xlsxwriter::{ColNum, RowNum, Workbook, XlsxError};
use thiserror::Error;

use super::table::Table;

/// Rows and columns of an Excel worksheet.
const MAX_ROWS: usize = 1_048_576;
const MAX_COLUMNS: usize = 16_384;

#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("could not write spreadsheet: {0}")]
    Xlsx(#[from] XlsxError),

    #[error("{rows} rows by {columns} columns do not fit in a worksheet")]
    TooLarge { rows: usize, columns: usize },
}

/// Write the header and rows of `table` to a workbook with a single sheet and return the file
/// contents.
pub fn write_table_to_xlsx(table: &Table, sheet_name: &str) -> Result<Vec<u8>, SerializationError> {
    let rows = table.rows.len() + 1;
    let columns = std::iter::once(&table.header)
        .chain(&table.rows)
        .map(Vec::len)
        .max()
        .unwrap_or(0);
    if rows > MAX_ROWS || columns > MAX_COLUMNS {
        return Err(SerializationError::TooLarge { rows, columns });
    }

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;
    for (row_index, row) in std::iter::once(&table.header).chain(&table.rows).enumerate() {
        for (column_index, value) in row.iter().enumerate() {
            // Both indices are within the limits checked above.
            worksheet.write_string(
                row_index as RowNum,
                column_index as ColNum,
                value.as_str(),
            )?;
        }
    }
    Ok(workbook.save_to_buffer()?)
}
