use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;

use super::{
    description::parse_metadata_table,
    error::{CoordinateParseError, ParseError, SkippedFeature},
    feature::{LineFeature, Metadata, UNNAMED},
    KML_NAMESPACE,
};

/// Line features of one KML document, plus the placemarks that had to be left out.
#[derive(Debug, Default)]
pub struct Extraction {
    pub features: Vec<LineFeature>,
    pub skipped: Vec<SkippedFeature>,
}

/// Extract all line placemarks from a KML document, in document order.
///
/// A placemark contributes a feature when it holds a `LineString` with at least two valid
/// coordinate tuples. Placemarks with bad or too few coordinates are recorded in
/// [`Extraction::skipped`] and the rest of the document is still read. Placemarks without any
/// `LineString` are not line features and are ignored.
///
/// Fails if `document` is not well-formed markup, in which case nothing is returned.
pub fn extract(document: &[u8]) -> Result<Extraction, ParseError> {
    let mut reader = NsReader::from_reader(document);
    let mut buf = Vec::new();

    // Local names of the open elements, with whether they are in the KML namespace.
    let mut open_elements: Vec<(bool, Vec<u8>)> = Vec::new();
    let mut placemarks: Vec<PlacemarkBuilder> = Vec::new();
    let mut seen_root = false;
    let mut extraction = Extraction::default();

    loop {
        let (in_kml, event) = reader
            .read_resolved_event_into(&mut buf)
            .map(|(namespace, event)| (is_kml_namespace(&namespace), event))
            .map_err(|err| malformed(&reader, err))?;
        let outside_root = open_elements.is_empty();
        match event {
            Event::Start(tag) => {
                if outside_root && seen_root {
                    return Err(ParseError::OutsideRoot(reader.buffer_position() as u64));
                }
                seen_root = true;
                check_attributes(&reader, &tag)?;
                let local_name = tag.local_name().as_ref().to_vec();
                let parent = open_elements.last().cloned();
                open_elements.push((in_kml, local_name));
                let depth = open_elements.len();
                if in_kml {
                    if let Some((_, name)) = open_elements.last() {
                        if name.as_slice() == b"Placemark" {
                            placemarks.push(PlacemarkBuilder::new(depth));
                        } else if let Some(placemark) = placemarks.last_mut() {
                            placemark.start_field(name, parent.as_ref(), depth);
                        }
                    }
                }
            }
            Event::Empty(tag) => {
                if outside_root && seen_root {
                    return Err(ParseError::OutsideRoot(reader.buffer_position() as u64));
                }
                seen_root = true;
                check_attributes(&reader, &tag)?;
                if in_kml && tag.local_name().as_ref() == b"coordinates" {
                    if let Some(placemark) = placemarks.last_mut() {
                        // `<coordinates/>` is a line without points.
                        if placemark.coordinates.is_none()
                            && is_line_string(open_elements.last())
                        {
                            placemark.coordinates = Some(String::new());
                        }
                    }
                }
            }
            Event::End(_) => {
                let depth = open_elements.len();
                open_elements.pop();
                if let Some(placemark) = placemarks.last_mut() {
                    if placemark.capture.map(|(_, at)| at) == Some(depth) {
                        placemark.capture = None;
                    }
                    if placemark.depth == depth {
                        if let Some(placemark) = placemarks.pop() {
                            match placemark.build() {
                                Some(Ok(feature)) => extraction.features.push(feature),
                                Some(Err(skipped)) => {
                                    log::warn!("{}", skipped);
                                    extraction.skipped.push(skipped);
                                }
                                None => log::debug!(
                                    "Ignoring placemark '{}' without a LineString",
                                    placemark_name(&placemark.name)
                                ),
                            }
                        }
                    }
                }
            }
            Event::Text(text) => {
                // Every text node must unescape, captured or not.
                let text = text.unescape().map_err(|err| malformed(&reader, err))?;
                if outside_root {
                    if !text.trim().is_empty() {
                        return Err(ParseError::OutsideRoot(reader.buffer_position() as u64));
                    }
                } else if let Some(placemark) = placemarks.last_mut() {
                    if placemark.is_capturing_at(open_elements.len()) {
                        placemark.push_text(&text);
                    }
                }
            }
            Event::CData(cdata) => {
                if outside_root {
                    return Err(ParseError::OutsideRoot(reader.buffer_position() as u64));
                }
                if let Some(placemark) = placemarks.last_mut() {
                    if placemark.is_capturing_at(open_elements.len()) {
                        placemark.push_text(&String::from_utf8_lossy(&cdata));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some((_, name)) = open_elements.last() {
        return Err(ParseError::UnclosedElement(
            String::from_utf8_lossy(name).into_owned(),
        ));
    }
    if !seen_root {
        return Err(ParseError::NoRootElement);
    }
    Ok(extraction)
}

/// Parse `lon,lat[,alt]` tuples separated by whitespace. Altitudes are dropped.
pub fn parse_coordinates(text: &str) -> Result<Vec<geo::Coord>, CoordinateParseError> {
    text.split_whitespace().map(parse_coordinate_tuple).collect()
}

fn parse_coordinate_tuple(tuple: &str) -> Result<geo::Coord, CoordinateParseError> {
    let mut components = tuple.split(',').map(|component| component.parse::<f64>());
    match (components.next(), components.next()) {
        (Some(Ok(x)), Some(Ok(y))) => Ok(geo::Coord { x, y }),
        _ => Err(CoordinateParseError::InvalidTuple(tuple.to_string())),
    }
}

fn is_kml_namespace(namespace: &ResolveResult) -> bool {
    matches!(namespace, ResolveResult::Bound(Namespace(uri)) if *uri == KML_NAMESPACE)
}

fn is_line_string(element: Option<&(bool, Vec<u8>)>) -> bool {
    matches!(element, Some((true, name)) if name.as_slice() == b"LineString")
}

fn malformed<R>(reader: &NsReader<R>, err: impl Into<quick_xml::Error>) -> ParseError {
    ParseError::Malformed {
        position: reader.buffer_position() as u64,
        source: err.into(),
    }
}

/// Attribute values must be well-formed even though none are read.
fn check_attributes<R>(reader: &NsReader<R>, tag: &BytesStart) -> Result<(), ParseError> {
    for attribute in tag.attributes() {
        let attribute = attribute.map_err(|err| malformed(reader, err))?;
        attribute
            .unescape_value()
            .map_err(|err| malformed(reader, err))?;
    }
    Ok(())
}

fn placemark_name(name: &Option<String>) -> &str {
    match name {
        Some(name) if !name.trim().is_empty() => name,
        _ => UNNAMED,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Name,
    Description,
    Coordinates,
}

/// Text collected for the innermost open placemark.
struct PlacemarkBuilder {
    /// Element depth of the `<Placemark>` itself.
    depth: usize,
    name: Option<String>,
    description: Option<String>,
    coordinates: Option<String>,
    /// Field whose element is open, and that element's depth. Only its direct text is collected.
    capture: Option<(Field, usize)>,
}

impl PlacemarkBuilder {
    fn new(depth: usize) -> Self {
        Self {
            depth,
            name: None,
            description: None,
            coordinates: None,
            capture: None,
        }
    }

    /// `name` and `description` count only as direct children of the placemark. Coordinates are
    /// taken from the first `LineString` found at any depth.
    fn start_field(&mut self, local_name: &[u8], parent: Option<&(bool, Vec<u8>)>, depth: usize) {
        let field = match local_name {
            b"name" if depth == self.depth + 1 && self.name.is_none() => Field::Name,
            b"description" if depth == self.depth + 1 && self.description.is_none() => {
                Field::Description
            }
            b"coordinates" if self.coordinates.is_none() && is_line_string(parent) => {
                Field::Coordinates
            }
            _ => return,
        };
        *self.slot(field) = Some(String::new());
        self.capture = Some((field, depth));
    }

    fn is_capturing_at(&self, depth: usize) -> bool {
        matches!(self.capture, Some((_, at)) if at == depth)
    }

    fn push_text(&mut self, text: &str) {
        if let Some((field, _)) = self.capture {
            if let Some(slot) = self.slot(field) {
                slot.push_str(text);
            }
        }
    }

    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Name => &mut self.name,
            Field::Description => &mut self.description,
            Field::Coordinates => &mut self.coordinates,
        }
    }

    /// `None` when the placemark has no line geometry at all.
    fn build(&self) -> Option<Result<LineFeature, SkippedFeature>> {
        let coordinates = self.coordinates.as_ref()?;
        let name = placemark_name(&self.name).to_string();
        let points = match parse_coordinates(coordinates) {
            Ok(points) if points.len() >= 2 => points,
            Ok(points) => {
                return Some(Err(SkippedFeature {
                    name,
                    reason: CoordinateParseError::TooFewPoints(points.len()),
                }))
            }
            Err(reason) => return Some(Err(SkippedFeature { name, reason })),
        };
        let metadata = match &self.description {
            Some(description) => parse_metadata_table(description),
            None => Metadata::new(),
        };
        Some(Ok(LineFeature {
            name,
            metadata,
            geometry: geo::LineString::new(points),
        }))
    }
}
