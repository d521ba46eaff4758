use indexmap::IndexMap;

/// Label to value mapping read from a placemark's description table. Iterates in the order in
/// which each label first appeared.
pub type Metadata = IndexMap<String, String>;

/// Name given to placemarks without a `<name>`.
pub const UNNAMED: &str = "Unnamed";

#[derive(Debug, Clone, PartialEq)]
pub struct LineFeature {
    pub name: String,
    pub metadata: Metadata,
    /// Longitude/latitude pairs, at least two of them.
    pub geometry: geo::LineString,
}

impl LineFeature {
    /// First point of the line.
    pub fn start(&self) -> Option<geo::Coord> {
        self.geometry.0.first().copied()
    }

    /// Last point of the line.
    pub fn end(&self) -> Option<geo::Coord> {
        self.geometry.0.last().copied()
    }
}

impl From<geo::LineString> for LineFeature {
    fn from(value: geo::LineString) -> Self {
        Self {
            name: UNNAMED.to_string(),
            metadata: Metadata::new(),
            geometry: value,
        }
    }
}
