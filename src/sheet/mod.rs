pub mod table;
pub mod xlsx;

use crate::kml::feature::LineFeature;

use self::table::{build_table, TabulateOptions};
use self::xlsx::{write_table_to_xlsx, SerializationError};

/// Tabulate `features` and serialize them as an `.xlsx` workbook held in memory.
pub fn tabulate(
    features: &[LineFeature],
    options: &TabulateOptions,
) -> Result<Vec<u8>, SerializationError> {
    let table = build_table(features, options);
    log::debug!(
        "Writing {} rows with {} columns to sheet '{}'",
        table.rows.len(),
        table.header.len(),
        options.sheet_name
    );
    write_table_to_xlsx(&table, &options.sheet_name)
}
