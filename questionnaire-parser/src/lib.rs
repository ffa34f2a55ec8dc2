//! Schema-driven parsing and validation of questionnaire template documents.
//!
//! One [`parse`] call consumes one byte stream to completion (or to a single
//! fatal syntax error) and returns a fully populated
//! [`Template`](questionnaire_model::Template) plus the accumulated warnings
//! and errors. Schema violations and attribute problems never abort the parse:
//! the violating content is dropped or defaulted, a diagnostic is recorded,
//! and parsing continues. Callers decide whether a non-empty error list
//! rejects the document.
//!
//! Every parse owns its own reader, frame stack and diagnostics, so separate
//! parses may run concurrently on separate threads without any locking.

pub mod attrs;
pub mod diagnostics;
mod elements;
pub mod reader;
pub mod sequence;
pub mod verbatim;

pub use diagnostics::{codemap_diagnostics, Diagnostic, Diagnostics, Pos, Severity};
pub use reader::{resolve_external_id, PUBLIC_ID, SYSTEM_ID};

use crate::attrs::Attributes;
use crate::elements::{kind_for, ContentModel, Kind, Props, Value};
use crate::reader::{Event, Reader};
use crate::sequence::{Fallback, Route, Sequence};
use crate::verbatim::VerbatimCapture;
use questionnaire_model::Template;
use std::io::Read;
use xml::attribute::OwnedAttribute;
use xml::common::{is_whitespace_str, Position};

/// The outcome of one parse. `template` is always populated, with defaults
/// substituted wherever schema rules were violated; `warnings` and `errors`
/// are formatted as `"message (at line L, column C)"`.
#[derive(Debug)]
pub struct ParseResult {
    pub template: Template,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

/// Parse one document to completion.
///
/// External DTD references are not fetched: the compiled-in schemas are what
/// is enforced. Callers that validate against the published external
/// identifiers first (e.g. in an editor pipeline) can resolve them to the
/// bundled DTD via [`resolve_external_id`].
pub fn parse<R: Read>(input: R) -> ParseResult {
    let (template, diags) = parse_report(input);
    ParseResult {
        template,
        warnings: diags.warnings().iter().map(ToString::to_string).collect(),
        errors: diags.errors().iter().map(ToString::to_string).collect(),
    }
}

pub fn parse_str(doc: &str) -> ParseResult {
    parse(doc.as_bytes())
}

/// Structured form of [`parse`], for callers that want positions intact
/// (e.g. for span-annotated rendering via [`codemap_diagnostics`]).
pub fn parse_report<R: Read>(input: R) -> (Template, Diagnostics) {
    let mut reader = Reader::new(input);
    let mut diags = Diagnostics::default();
    let mut engine = Engine::default();
    let fatal = loop {
        match reader.next_event() {
            Ok(Event::End) => break false,
            Ok(event) => engine.handle(event, &mut diags),
            Err(err) => {
                // Fatal low-level syntax error: one terminal diagnostic.
                diags.error(
                    format!("syntax error: {}", err.msg()),
                    Some(err.position().into()),
                );
                break true;
            }
        }
    };
    (engine.finish(fatal, &mut diags), diags)
}

/// Where a finished frame delivers its value.
enum Dest {
    /// The document element: its value becomes the template.
    Root,
    /// Append to this part index of the parent's sequence.
    Part(usize),
    /// A captured fallback subtree: its fragment joins the parent's buffer.
    Fallback,
    /// Dropped content; produces no result.
    Discard,
}

/// Parse progress for one open element (or skipped/captured subtree).
enum State {
    Sequence {
        kind: Kind,
        props: Props,
        seq: Sequence<Value>,
        capture: Option<VerbatimCapture>,
    },
    Leaf {
        kind: Kind,
        props: Props,
        text: String,
    },
    /// Serializes one fallback subtree; `depth` counts nested opens so the
    /// whole subtree stays within this frame.
    Capture { cap: VerbatimCapture, depth: u32 },
    /// Skips one dropped subtree.
    Ignore { depth: u32 },
}

/// One stack entry per open tag: the tag, where the finished value goes,
/// and the parse state. A single stack of frames, no parallel arrays to
/// keep in step.
struct Frame {
    tag: String,
    dest: Dest,
    state: State,
}

#[derive(Default)]
struct Engine {
    stack: Vec<Frame>,
    template: Option<Template>,
    root_seen: bool,
}

enum OpenDecision {
    Element(Kind, Dest),
    Capture,
    Ignore,
}

impl Engine {
    fn handle(&mut self, event: Event, diags: &mut Diagnostics) {
        match event {
            Event::Open { name, attributes, pos } => self.open(name, attributes, pos, diags),
            Event::Text { content, pos } => self.text(&content, pos, diags),
            Event::Close { name, pos } => self.close(&name, pos, diags),
            Event::End => {}
        }
    }

    fn open(
        &mut self,
        name: String,
        attributes: Vec<OwnedAttribute>,
        pos: Pos,
        diags: &mut Diagnostics,
    ) {
        let decision = match self.stack.last_mut() {
            None => {
                self.root_seen = true;
                if name == "questionnaire" {
                    OpenDecision::Element(Kind::Questionnaire, Dest::Root)
                } else {
                    diags.error(
                        format!("unexpected root element <{name}>; expected <questionnaire>"),
                        Some(pos),
                    );
                    OpenDecision::Ignore
                }
            }
            Some(frame) => match &mut frame.state {
                State::Capture { cap, depth } => {
                    *depth += 1;
                    cap.open(&name, &attributes);
                    return;
                }
                State::Ignore { depth } => {
                    *depth += 1;
                    return;
                }
                State::Leaf { .. } => {
                    diags.error(
                        format!("element <{name}> is not allowed inside <{}>", frame.tag),
                        Some(pos),
                    );
                    OpenDecision::Ignore
                }
                State::Sequence { seq, .. } => match seq.route(&frame.tag, &name, pos, diags) {
                    Route::Part(idx) => match kind_for(&name) {
                        Some(kind) => OpenDecision::Element(kind, Dest::Part(idx)),
                        // Routed tags are always declared; stay total anyway.
                        None => OpenDecision::Ignore,
                    },
                    Route::Fallback => OpenDecision::Capture,
                    Route::Drop => OpenDecision::Ignore,
                },
            },
        };
        let frame = match decision {
            OpenDecision::Element(kind, dest) => {
                let attrs = Attributes::new(&attributes, pos);
                let props = kind.bind(&attrs, diags);
                let state = match kind.content_model() {
                    ContentModel::Leaf => State::Leaf {
                        kind,
                        props,
                        text: String::new(),
                    },
                    ContentModel::Composite(def) => State::Sequence {
                        kind,
                        props,
                        seq: Sequence::new(def),
                        capture: None,
                    },
                };
                Frame { tag: name, dest, state }
            }
            OpenDecision::Capture => {
                let mut cap = VerbatimCapture::new();
                cap.open(&name, &attributes);
                Frame {
                    tag: name,
                    dest: Dest::Fallback,
                    state: State::Capture { cap, depth: 0 },
                }
            }
            OpenDecision::Ignore => Frame {
                tag: name,
                dest: Dest::Discard,
                state: State::Ignore { depth: 0 },
            },
        };
        self.stack.push(frame);
    }

    fn text(&mut self, content: &str, pos: Pos, diags: &mut Diagnostics) {
        let frame = match self.stack.last_mut() {
            // Inter-element whitespace outside the root; anything worse is a
            // reader-level error before we ever see it.
            None => return,
            Some(frame) => frame,
        };
        match &mut frame.state {
            State::Leaf { text, .. } => text.push_str(content),
            State::Capture { cap, .. } => cap.text(content),
            State::Ignore { .. } => {}
            State::Sequence { seq, capture, .. } => {
                if seq.fallback() != Fallback::None {
                    capture.get_or_insert_with(VerbatimCapture::new).text(content);
                } else if !is_whitespace_str(content) {
                    diags.error(
                        format!("text content is not allowed inside <{}>", frame.tag),
                        Some(pos),
                    );
                }
            }
        }
    }

    fn close(&mut self, name: &str, pos: Pos, diags: &mut Diagnostics) {
        // The reader guarantees balanced tags, so the top frame is the one
        // being closed, unless it is depth-counting a nested subtree.
        if let Some(frame) = self.stack.last_mut() {
            match &mut frame.state {
                State::Capture { cap, depth } if *depth > 0 => {
                    *depth -= 1;
                    cap.close(name);
                    return;
                }
                State::Ignore { depth } if *depth > 0 => {
                    *depth -= 1;
                    return;
                }
                _ => {}
            }
        }
        let frame = match self.stack.pop() {
            Some(frame) => frame,
            None => return,
        };
        let Frame { tag, dest, state } = frame;
        let value = match state {
            State::Ignore { .. } => None,
            State::Capture { mut cap, .. } => {
                cap.close(name);
                // The finished fragment joins the owning element's buffer.
                if let Some(Frame {
                    state: State::Sequence { capture, .. },
                    ..
                }) = self.stack.last_mut()
                {
                    capture
                        .get_or_insert_with(VerbatimCapture::new)
                        .append_fragment(&cap.into_fragment());
                }
                None
            }
            State::Leaf { kind, props, text } => Some(kind.finalize_leaf(props, text)),
            State::Sequence {
                kind,
                props,
                mut seq,
                capture,
            } => {
                let captured = capture
                    .as_ref()
                    .map_or(false, |c| !c.is_effectively_empty());
                seq.finish(&tag, pos, captured, diags);
                let markup = capture.and_then(VerbatimCapture::into_markup);
                Some(kind.finalize(props, seq.into_values(), markup, pos, diags))
            }
        };
        match (dest, value) {
            (Dest::Root, Some(Value::Template(template))) => self.template = Some(template),
            (Dest::Part(idx), Some(value)) => {
                if let Some(Frame {
                    state: State::Sequence { seq, .. },
                    ..
                }) = self.stack.last_mut()
                {
                    seq.store(idx, value);
                }
            }
            _ => {}
        }
    }

    /// Yield the finished template. After a fatal error no synthetic
    /// end-of-document diagnostics are added; the terminal error stands
    /// alone with whatever was recorded before it.
    fn finish(self, fatal: bool, diags: &mut Diagnostics) -> Template {
        if !fatal && !self.root_seen {
            diags.error("document contains no <questionnaire> element", None);
        }
        self.template.unwrap_or_default()
    }
}
