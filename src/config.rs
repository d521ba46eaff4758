use std::{fs::read_to_string, path::Path, path::PathBuf};

use anyhow::{anyhow, Context};
use serde::Deserialize;

use crate::sheet::table::{ColumnPolicy, TabulateOptions, MISSING_VALUE, SHEET_NAME};

/// Conversion settings, read from a YAML file. Every key is optional.
///
/// ```yaml
/// output_dir: converted
/// column_policy: Union
/// missing_value: "-"
/// sheet_name: Lines
/// geojson_dump: true
/// ```
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Where spreadsheets are written. Defaults to the directory of each input file.
    pub output_dir: Option<PathBuf>,
    pub column_policy: ColumnPolicy,
    pub missing_value: String,
    pub sheet_name: String,
    /// Also write the extracted lines to `<input stem>.geojson` next to the spreadsheet.
    pub geojson_dump: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: None,
            column_policy: ColumnPolicy::default(),
            missing_value: MISSING_VALUE.to_string(),
            sheet_name: SHEET_NAME.to_string(),
            geojson_dump: false,
        }
    }
}

impl Config {
    pub fn from_yaml_file(filepath: &Path) -> anyhow::Result<Self> {
        if !filepath.exists() {
            return Err(anyhow!("Config file {:?} not found", filepath));
        }
        let config_contents = read_to_string(filepath)
            .with_context(|| format!("Reading config file {:?}", filepath))?;
        Self::from_yaml(&config_contents)
            .with_context(|| format!("Parsing config file {:?}", filepath))
    }

    pub fn from_yaml(contents: &str) -> anyhow::Result<Self> {
        // An empty file deserializes to null rather than an empty mapping.
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn tabulate_options(&self) -> TabulateOptions {
        TabulateOptions {
            column_policy: self.column_policy,
            missing_value: self.missing_value.clone(),
            sheet_name: self.sheet_name.clone(),
        }
    }
}
