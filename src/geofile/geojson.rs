use std::{fs, io, path::Path};

use crate::kml::feature::LineFeature;

/// Write line features as a GeoJSON feature collection. The placemark name is stored in the
/// `name` property next to the metadata labels, and wins over a metadata label called `name`.
pub fn write_line_features_to_geojson(
    features: &[LineFeature],
    output_filepath: &Path,
) -> io::Result<()> {
    let feature_collection: geojson::FeatureCollection = features
        .iter()
        .map(|feature| {
            let mut geojson_feature =
                geojson::Feature::from(geojson::Geometry::from(&feature.geometry));
            for (label, value) in &feature.metadata {
                geojson_feature.set_property(label.clone(), value.clone());
            }
            geojson_feature.set_property("name", feature.name.clone());
            geojson_feature
        })
        .collect();
    let geojson_contents: geojson::GeoJson = geojson::GeoJson::from(feature_collection);
    fs::write(output_filepath, geojson_contents.to_string())
}

#[cfg(test)]
mod tests {
    use testdir::testdir;

    use crate::kml::feature::{LineFeature, Metadata};

    use super::write_line_features_to_geojson;

    #[test]
    fn test_write_line_features_to_geojson() {
        let features = vec![LineFeature {
            name: "Feeder 1".to_string(),
            metadata: Metadata::from([
                ("Owner".to_string(), "PEA".to_string()),
                ("name".to_string(), "from table".to_string()),
            ]),
            geometry: vec![(100.0, 13.0), (100.5, 13.5)].into(),
        }];
        let output_filepath = testdir!().join("lines.geojson");
        write_line_features_to_geojson(&features, &output_filepath).unwrap();

        let contents = std::fs::read_to_string(&output_filepath).unwrap();
        let collection = match contents.parse::<geojson::GeoJson>().unwrap() {
            geojson::GeoJson::FeatureCollection(collection) => collection,
            other => panic!("expected a feature collection, got {:?}", other),
        };
        assert_eq!(1, collection.features.len());
        let feature = &collection.features[0];
        assert_eq!(
            Some("Feeder 1"),
            feature.property("name").and_then(|value| value.as_str())
        );
        assert_eq!(
            Some("PEA"),
            feature.property("Owner").and_then(|value| value.as_str())
        );
        assert_eq!(
            Some(&geojson::Value::LineString(vec![
                vec![100.0, 13.0],
                vec![100.5, 13.5]
            ])),
            feature.geometry.as_ref().map(|geometry| &geometry.value)
        );
    }
}
