use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context};
use thiserror::Error;

use crate::{
    config::Config,
    geofile::geojson::write_line_features_to_geojson,
    kml::{
        error::{ParseError, SkippedFeature},
        extract::extract,
        feature::LineFeature,
    },
    sheet::{table::TabulateOptions, tabulate, xlsx::SerializationError},
};

pub const SPREADSHEET_EXTENSION: &str = "xlsx";

/// Failure that ends the conversion of a whole document.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),
}

/// Result of converting one KML document.
#[derive(Debug)]
pub struct Conversion {
    pub features: Vec<LineFeature>,
    pub skipped: Vec<SkippedFeature>,
    /// Contents of the `.xlsx` file.
    pub workbook: Vec<u8>,
}

pub fn convert_document(
    document: &[u8],
    options: &TabulateOptions,
) -> Result<Conversion, ConversionError> {
    let extraction = extract(document)?;
    let workbook = tabulate(&extraction.features, options)?;
    Ok(Conversion {
        features: extraction.features,
        skipped: extraction.skipped,
        workbook,
    })
}

/// File name of the spreadsheet for `input`: the input's file name with the extension replaced.
pub fn output_filename(input: &Path) -> anyhow::Result<PathBuf> {
    let filename = input
        .file_name()
        .ok_or_else(|| anyhow!("Input path {:?} has no file name", input))?;
    Ok(Path::new(filename).with_extension(SPREADSHEET_EXTENSION))
}

#[derive(Debug)]
pub struct FileReport {
    pub output_path: PathBuf,
    pub feature_count: usize,
    pub skipped: Vec<SkippedFeature>,
}

/// Convert the KML file `input` and write the spreadsheet to the configured output directory, or
/// next to the input when none is configured. The output directory is created if needed.
pub fn convert_file(input: &Path, config: &Config) -> anyhow::Result<FileReport> {
    let document = fs::read(input).with_context(|| format!("Reading {:?}", input))?;
    let conversion = convert_document(&document, &config.tabulate_options())
        .with_context(|| format!("Converting {:?}", input))?;

    let output_dir = match &config.output_dir {
        Some(output_dir) => output_dir.clone(),
        None => input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    if !output_dir.as_os_str().is_empty() {
        fs::create_dir_all(&output_dir)
            .with_context(|| format!("Creating output directory {:?}", output_dir))?;
    }
    let output_path = output_dir.join(output_filename(input)?);
    fs::write(&output_path, &conversion.workbook)
        .with_context(|| format!("Writing {:?}", output_path))?;

    if config.geojson_dump {
        let geojson_path = output_path.with_extension("geojson");
        log::info!(
            "Writing {} lines to GeoJSON to {:?}",
            conversion.features.len(),
            geojson_path
        );
        write_line_features_to_geojson(&conversion.features, &geojson_path)
            .with_context(|| format!("Writing {:?}", geojson_path))?;
    }

    Ok(FileReport {
        output_path,
        feature_count: conversion.features.len(),
        skipped: conversion.skipped,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::path::{Path, PathBuf};

    use calamine::{Reader, Xlsx};
    use rstest::rstest;
    use testdir::testdir;

    use crate::{config::Config, sheet::table::TabulateOptions};

    use super::{convert_document, convert_file, output_filename, ConversionError};

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
<Document>
    <Placemark>
        <description><![CDATA[<table><tr><td>Altitude</td><td>120</td></tr></table>]]></description>
        <LineString><coordinates>1,2,0 3,4,0</coordinates></LineString>
    </Placemark>
    <Placemark>
        <name>Spur</name>
        <LineString><coordinates>5,6</coordinates></LineString>
    </Placemark>
    <Placemark>
        <name>Feeder 2</name>
        <LineString><coordinates>5,6 7,8</coordinates></LineString>
    </Placemark>
</Document>
</kml>"#;

    fn read_rows(workbook: &[u8]) -> Vec<Vec<String>> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(workbook.to_vec())).unwrap();
        let range = workbook.worksheet_range("KML Data").unwrap();
        range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[rstest]
    #[case("lines.kml", "lines.xlsx")]
    #[case("data/2024/Feeder A.kml", "Feeder A.xlsx")]
    #[case("no_extension", "no_extension.xlsx")]
    #[case("archive.tar.kml", "archive.tar.xlsx")]
    fn test_output_filename(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(
            PathBuf::from(expected),
            output_filename(Path::new(input)).unwrap()
        );
    }

    #[test]
    fn test_output_filename_needs_file_name() {
        assert!(output_filename(Path::new("/")).is_err());
    }

    #[test]
    fn test_convert_document() {
        let conversion =
            convert_document(DOCUMENT.as_bytes(), &TabulateOptions::default()).unwrap();

        assert_eq!(2, conversion.features.len());
        assert_eq!(1, conversion.skipped.len());
        assert_eq!("Spur", conversion.skipped[0].name);
        assert_eq!(
            vec![
                strings(&["Name", "Start_Coordinate", "End_Coordinate", "Altitude"]),
                strings(&["Unnamed", "1.0,2.0", "3.0,4.0", "120"]),
                strings(&["Feeder 2", "5.0,6.0", "7.0,8.0", "N/A"]),
            ],
            read_rows(&conversion.workbook)
        );
    }

    #[test]
    fn test_convert_document_without_lines() {
        let document = r#"<kml xmlns="http://www.opengis.net/kml/2.2"><Document/></kml>"#;
        let conversion = convert_document(document.as_bytes(), &TabulateOptions::default()).unwrap();
        assert_eq!(
            vec![strings(&["Name", "Start_Coordinate", "End_Coordinate"])],
            read_rows(&conversion.workbook)
        );
    }

    #[test]
    fn test_convert_malformed_document() {
        let result = convert_document(
            b"<kml xmlns=\"http://www.opengis.net/kml/2.2\"><Document>",
            &TabulateOptions::default(),
        );
        assert!(matches!(result, Err(ConversionError::Parse(_))));
    }

    #[test]
    fn test_convert_file_to_output_dir() {
        let test_dir = testdir!();
        let input = test_dir.join("lines.kml");
        std::fs::write(&input, DOCUMENT).unwrap();
        let config = Config {
            output_dir: Some(test_dir.join("converted")),
            geojson_dump: true,
            ..Config::default()
        };

        let report = convert_file(&input, &config).unwrap();

        assert_eq!(test_dir.join("converted").join("lines.xlsx"), report.output_path);
        assert_eq!(2, report.feature_count);
        assert_eq!(1, report.skipped.len());
        let workbook = std::fs::read(&report.output_path).unwrap();
        assert_eq!(3, read_rows(&workbook).len());
        assert!(test_dir.join("converted").join("lines.geojson").exists());
    }

    #[test]
    fn test_convert_file_next_to_input() {
        let test_dir = testdir!();
        let input = test_dir.join("Feeder.kml");
        std::fs::write(&input, DOCUMENT).unwrap();

        let report = convert_file(&input, &Config::default()).unwrap();

        assert_eq!(test_dir.join("Feeder.xlsx"), report.output_path);
        assert!(report.output_path.exists());
        assert!(!test_dir.join("Feeder.geojson").exists());
    }

    #[test]
    fn test_convert_missing_file_fails() {
        let input = testdir!().join("absent.kml");
        assert!(convert_file(&input, &Config::default()).is_err());
    }
}
