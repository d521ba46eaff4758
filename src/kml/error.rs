use std::fmt;

use thiserror::Error;

/// The document is not well-formed markup. Nothing is extracted from it.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed KML at byte {position}: {source}")]
    Malformed {
        position: u64,
        source: quick_xml::Error,
    },

    #[error("element <{0}> is not closed at the end of the document")]
    UnclosedElement(String),

    #[error("content outside the root element at byte {0}")]
    OutsideRoot(u64),

    #[error("document has no root element")]
    NoRootElement,
}

/// Why a placemark's line could not be read. Only the placemark is skipped.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoordinateParseError {
    #[error("coordinate tuple '{0}' has no numeric longitude and latitude")]
    InvalidTuple(String),

    #[error("{0} coordinate point(s), a line needs at least 2")]
    TooFewPoints(usize),
}

/// Diagnostic for a placemark left out of the extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFeature {
    pub name: String,
    pub reason: CoordinateParseError,
}

impl fmt::Display for SkippedFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Skipped invalid LineString: {} ({})", self.name, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::{CoordinateParseError, SkippedFeature};

    #[test]
    fn test_skipped_feature_names_the_placemark() {
        let skipped = SkippedFeature {
            name: "Trail 7".to_string(),
            reason: CoordinateParseError::TooFewPoints(1),
        };
        assert_eq!(
            "Skipped invalid LineString: Trail 7 (1 coordinate point(s), a line needs at least 2)",
            skipped.to_string()
        );
    }
}
