use indexmap::IndexSet;
use serde::Deserialize;

use crate::kml::feature::LineFeature;

/// Columns every sheet starts with.
pub const FIXED_COLUMNS: [&str; 3] = ["Name", "Start_Coordinate", "End_Coordinate"];
pub const MISSING_VALUE: &str = "N/A";
pub const SHEET_NAME: &str = "KML Data";

/// Which metadata labels become columns.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColumnPolicy {
    /// Labels of the first feature only. Labels that only later features carry are dropped.
    #[default]
    FirstFeature,
    /// Labels of all features, in order of first appearance.
    Union,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TabulateOptions {
    pub column_policy: ColumnPolicy,
    /// Placeholder for absent endpoints and metadata values.
    pub missing_value: String,
    pub sheet_name: String,
}

impl Default for TabulateOptions {
    fn default() -> Self {
        Self {
            column_policy: ColumnPolicy::default(),
            missing_value: MISSING_VALUE.to_string(),
            sheet_name: SHEET_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub fn metadata_columns(features: &[LineFeature], policy: ColumnPolicy) -> Vec<String> {
    match policy {
        ColumnPolicy::FirstFeature => features
            .first()
            .map(|feature| feature.metadata.keys().cloned().collect())
            .unwrap_or_default(),
        ColumnPolicy::Union => {
            let columns: IndexSet<&String> = features
                .iter()
                .flat_map(|feature| feature.metadata.keys())
                .collect();
            columns.into_iter().cloned().collect()
        }
    }
}

/// One row per feature under the fixed columns followed by the metadata columns.
pub fn build_table(features: &[LineFeature], options: &TabulateOptions) -> Table {
    let columns = metadata_columns(features, options.column_policy);
    let missing = options.missing_value.as_str();

    let rows = features
        .iter()
        .map(|feature| {
            let mut row = Vec::with_capacity(FIXED_COLUMNS.len() + columns.len());
            row.push(feature.name.clone());
            row.push(format_coordinate(feature.start(), missing));
            row.push(format_coordinate(feature.end(), missing));
            row.extend(columns.iter().map(|column| {
                feature
                    .metadata
                    .get(column)
                    .cloned()
                    .unwrap_or_else(|| missing.to_string())
            }));
            row
        })
        .collect();

    let header = FIXED_COLUMNS
        .iter()
        .map(|column| column.to_string())
        .chain(columns)
        .collect();
    Table { header, rows }
}

/// `lon,lat`, with every ordinate written with a decimal point, e.g. `100.0,13.5`.
pub fn format_coordinate(coord: Option<geo::Coord>, missing: &str) -> String {
    match coord {
        Some(coord) => format!("{:?},{:?}", coord.x, coord.y),
        None => missing.to_string(),
    }
}
