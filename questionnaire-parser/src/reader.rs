//! Tokenizer adapter over the streaming `xml-rs` reader.
//!
//! Flattens the reader's event stream into the four events the engine cares
//! about (element-open with attributes, character data, element-close, end of
//! document), each with a 1-based line/column position. CDATA folds into
//! ordinary text; comments, processing instructions and the prologue are
//! skipped. Malformed markup surfaces as the underlying reader error; the
//! engine turns that into a single terminal diagnostic and stops. No partial
//! recovery is attempted below the event level.

use crate::diagnostics::Pos;
use std::io::Read;
use xml::attribute::OwnedAttribute;
use xml::common::Position;
use xml::reader::{EventReader, ParserConfig, XmlEvent};

/// Public identifier of the bundled template DTD.
pub const PUBLIC_ID: &str = "-//Questionnaire//DTD Template 1.0//EN";
/// System identifier of the bundled template DTD.
pub const SYSTEM_ID: &str = "https://questionnaire.example/dtd/questionnaire-1.dtd";

const LOCAL_DTD: &str = include_str!("../resources/questionnaire-1.dtd");

/// Resolve the one recognized external identifier pair to the bundled DTD.
///
/// Returns `None` for anything else; the caller falls back to its default
/// resolution. Informational only: the DTD documents the vocabulary but the
/// engine's compiled-in schemas are what is enforced.
pub fn resolve_external_id(public_id: Option<&str>, system_id: Option<&str>) -> Option<&'static str> {
    if public_id == Some(PUBLIC_ID) || system_id == Some(SYSTEM_ID) {
        Some(LOCAL_DTD)
    } else {
        None
    }
}

/// One event of the flattened stream.
#[derive(Debug)]
pub enum Event {
    Open {
        name: String,
        attributes: Vec<OwnedAttribute>,
        pos: Pos,
    },
    Text {
        content: String,
        pos: Pos,
    },
    Close {
        name: String,
        pos: Pos,
    },
    End,
}

pub struct Reader<R: Read> {
    inner: EventReader<R>,
}

impl<R: Read> Reader<R> {
    pub fn new(source: R) -> Reader<R> {
        let config = ParserConfig::new()
            .cdata_to_characters(true)
            .whitespace_to_characters(true)
            .coalesce_characters(true)
            .ignore_comments(true);
        Reader {
            inner: config.create_reader(source),
        }
    }

    /// Next event in document order, or the reader's fatal error.
    pub fn next_event(&mut self) -> Result<Event, xml::reader::Error> {
        loop {
            let event = self.inner.next()?;
            let pos = Pos::from(self.inner.position());
            match event {
                XmlEvent::StartElement {
                    name, attributes, ..
                } => {
                    return Ok(Event::Open {
                        name: name.local_name,
                        attributes,
                        pos,
                    });
                }
                XmlEvent::Characters(content) => {
                    return Ok(Event::Text { content, pos });
                }
                XmlEvent::EndElement { name } => {
                    return Ok(Event::Close {
                        name: name.local_name,
                        pos,
                    });
                }
                XmlEvent::EndDocument => return Ok(Event::End),
                // StartDocument, PIs and anything else the reader surfaces
                _ => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn events(doc: &str) -> Vec<Event> {
        let mut reader = Reader::new(doc.as_bytes());
        let mut out = Vec::new();
        loop {
            match reader.next_event().expect("well-formed document") {
                Event::End => break,
                evt => out.push(evt),
            }
        }
        out
    }

    #[test]
    fn open_text_close_in_document_order() {
        let evts = events("<a href=\"x\">hi</a>");
        assert_eq!(evts.len(), 3);
        assert_matches!(&evts[0], Event::Open { name, attributes, .. } => {
            assert_eq!(name, "a");
            assert_eq!(attributes.len(), 1);
            assert_eq!(attributes[0].value, "x");
        });
        assert_matches!(&evts[1], Event::Text { content, .. } => assert_eq!(content, "hi"));
        assert_matches!(&evts[2], Event::Close { name, .. } => assert_eq!(name, "a"));
    }

    #[test]
    fn cdata_folds_into_text() {
        let evts = events("<a><![CDATA[1 < 2]]></a>");
        assert_matches!(&evts[1], Event::Text { content, .. } => assert_eq!(content, "1 < 2"));
    }

    #[test]
    fn positions_are_one_based() {
        // Inter-element whitespace surfaces as Text events, so locate the
        // open event rather than indexing past it.
        let evts = events("<a>\n  <b/>\n</a>");
        let open = evts
            .iter()
            .find(|e| matches!(e, Event::Open { name, .. } if name == "b"))
            .expect("<b> open event");
        assert_matches!(open, Event::Open { pos, .. } => {
            assert_eq!(pos.line, 2);
        });
    }

    #[test]
    fn malformed_markup_is_a_reader_error() {
        let mut reader = Reader::new("<a><b></a>".as_bytes());
        let mut saw_error = false;
        for _ in 0..8 {
            match reader.next_event() {
                Ok(Event::End) => break,
                Ok(_) => continue,
                Err(_) => {
                    saw_error = true;
                    break;
                }
            }
        }
        assert!(saw_error, "mismatched close tag should be fatal");
    }

    #[test]
    fn recognized_external_id_resolves_to_bundled_dtd() {
        assert!(resolve_external_id(Some(PUBLIC_ID), None)
            .expect("public id should resolve")
            .contains("questionnaire"));
        assert!(resolve_external_id(None, Some(SYSTEM_ID)).is_some());
        assert_eq!(resolve_external_id(Some("-//Other//EN"), None), None);
        assert_eq!(resolve_external_id(None, None), None);
    }
}
