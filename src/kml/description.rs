use std::borrow::Cow;

use quick_xml::escape::resolve_html5_entity;
use quick_xml::events::{BytesText, Event};
use quick_xml::Reader;

use super::feature::Metadata;

/// Read the label/value table embedded in a placemark description.
///
/// Every `<tr>` with at least two `<td>` cells contributes one entry: the first cell's text is the
/// label, the second cell's text the value. Each text fragment of a cell is trimmed and the
/// fragments are joined without a separator, so `<b>Type</b> A` reads as `TypeA`. A label seen again overwrites the earlier
/// value but keeps its position.
///
/// Descriptions are HTML rather than XML, so unclosed and unmatched tags are tolerated: a new `<td>`
/// ends the open cell and a new `<tr>` ends the open row. If the markup becomes unreadable, the
/// rows completed up to that point are returned.
pub fn parse_metadata_table(html: &str) -> Metadata {
    let mut reader = Reader::from_str(html);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut table = TableBuilder::default();
    loop {
        match reader.read_event() {
            Ok(Event::Start(tag)) => match tag_kind(tag.local_name().as_ref()) {
                Some(TableTag::Row) => table.open_row(),
                Some(TableTag::Cell) => table.open_cell(),
                _ => {}
            },
            Ok(Event::Empty(tag)) => match tag_kind(tag.local_name().as_ref()) {
                Some(TableTag::Row) => table.close_row(),
                Some(TableTag::Cell) => {
                    table.open_cell();
                    table.close_cell();
                }
                _ => {}
            },
            Ok(Event::End(tag)) => match tag_kind(tag.local_name().as_ref()) {
                Some(TableTag::Cell) => table.close_cell(),
                Some(TableTag::Row | TableTag::Table) => table.close_row(),
                None => {}
            },
            Ok(Event::Text(text)) => table.push_text(&unescape_html(&text)),
            Ok(Event::CData(cdata)) => table.push_text(&String::from_utf8_lossy(&cdata)),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                log::warn!(
                    "Stopped reading description table at byte {}: {}",
                    reader.buffer_position(),
                    err
                );
                table.discard_open_row();
                break;
            }
        }
    }
    table.finish()
}

enum TableTag {
    Table,
    Row,
    Cell,
}

fn tag_kind(local_name: &[u8]) -> Option<TableTag> {
    if local_name.eq_ignore_ascii_case(b"td") {
        Some(TableTag::Cell)
    } else if local_name.eq_ignore_ascii_case(b"tr") {
        Some(TableTag::Row)
    } else if local_name.eq_ignore_ascii_case(b"table") {
        Some(TableTag::Table)
    } else {
        None
    }
}

/// Resolves HTML named entities such as `&nbsp;`. Text with an unknown entity is kept as written.
fn unescape_html<'a>(text: &'a BytesText) -> Cow<'a, str> {
    match text.unescape_with(resolve_html5_entity) {
        Ok(unescaped) => unescaped,
        Err(_) => String::from_utf8_lossy(text),
    }
}

#[derive(Default)]
struct TableBuilder {
    metadata: Metadata,
    row: Option<Vec<String>>,
    cell: Option<String>,
}

impl TableBuilder {
    fn open_row(&mut self) {
        self.close_row();
        self.row = Some(Vec::new());
    }

    /// Cells outside of a row are not part of the table.
    fn open_cell(&mut self) {
        self.close_cell();
        if self.row.is_some() {
            self.cell = Some(String::new());
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(cell) = self.cell.as_mut() {
            cell.push_str(text.trim());
        }
    }

    fn close_cell(&mut self) {
        if let (Some(cell), Some(row)) = (self.cell.take(), self.row.as_mut()) {
            row.push(cell);
        }
    }

    fn close_row(&mut self) {
        self.close_cell();
        if let Some(mut cells) = self.row.take() {
            if cells.len() >= 2 {
                let value = cells.swap_remove(1);
                let label = cells.swap_remove(0);
                self.metadata.insert(label, value);
            }
        }
    }

    fn discard_open_row(&mut self) {
        self.cell = None;
        self.row = None;
    }

    fn finish(mut self) -> Metadata {
        self.close_row();
        self.metadata
    }
}
