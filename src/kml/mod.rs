pub mod description;
pub mod error;
pub mod extract;
pub mod feature;

/// Namespace of KML 2.2 documents. Elements in any other namespace are ignored.
pub const KML_NAMESPACE: &[u8] = b"http://www.opengis.net/kml/2.2";
