//! Ordered-cardinality schema matching.
//!
//! Each composite element type declares a [`SequenceDef`]: an ordered list of
//! parts, each accepting a set of child tags within a min/max occurrence
//! window, optionally marked exclusive (the first accepted tag variant
//! commits the part to that variant). The runtime [`Sequence`] routes each
//! freshly opened child tag to a part, to the verbatim fallback, or to the
//! floor, recording a diagnostic for every rule it had to break on the way.
//! Violations never abort the parse.
//!
//! The matcher is generic over the child value type so it can be exercised
//! on its own, without dragging the object model in.

use crate::diagnostics::{Diagnostics, Pos};

/// Effectively unbounded occurrence count.
pub const MANY: u32 = u32::MAX;

/// One schema rule for a position in an element's child sequence.
pub struct PartDef {
    /// Child tags this part accepts. Alternative variants of one slot when
    /// `exclusive` is set.
    pub tags: &'static [&'static str],
    pub min: u32,
    pub max: u32,
    pub exclusive: bool,
}

/// Whether unmatched content is captured verbatim, and on what terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Unmatched content is an error.
    None,
    /// Unmatched content is captured; it may coexist with matched children.
    Mixed,
    /// Unmatched content is captured, but mixing it with any matched child
    /// is an error, reported once at element-close.
    Exclusive,
}

/// The declared child schema of one composite element type.
pub struct SequenceDef {
    pub parts: &'static [PartDef],
    pub fallback: Fallback,
}

/// Where a freshly opened child tag was routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Accepted by the part at this index; the child's finished value is to
    /// be stored there via [`Sequence::store`].
    Part(usize),
    /// Capture the child subtree verbatim.
    Fallback,
    /// No rule applies: an error was recorded and the child produces no
    /// result.
    Drop,
}

struct Part<V> {
    def: &'static PartDef,
    count: u32,
    /// Tag variant this exclusive part has committed to.
    committed: Option<&'static str>,
    /// Missing-minimum error already emitted (when skipped over).
    reported: bool,
    values: Vec<V>,
}

impl<V> Part<V> {
    fn accepts(&self, tag: &str) -> bool {
        if !self.def.tags.contains(&tag) {
            return false;
        }
        match self.committed {
            Some(committed) => committed == tag,
            None => true,
        }
    }

    fn has_capacity(&self) -> bool {
        self.count < self.def.max
    }

    fn satisfied(&self) -> bool {
        self.count >= self.def.min
    }

    fn tags_desc(&self) -> String {
        let named: Vec<String> = match self.committed {
            // Once committed, only the committed variant is acceptable.
            Some(tag) => vec![format!("<{tag}>")],
            None => self.def.tags.iter().map(|t| format!("<{t}>")).collect(),
        };
        named.join("|")
    }
}

/// Parse-time matching state for one open element.
pub struct Sequence<V> {
    def: &'static SequenceDef,
    parts: Vec<Part<V>>,
    cursor: usize,
    matched_any: bool,
}

impl<V> Sequence<V> {
    pub fn new(def: &'static SequenceDef) -> Sequence<V> {
        Sequence {
            def,
            parts: def
                .parts
                .iter()
                .map(|d| Part {
                    def: d,
                    count: 0,
                    committed: None,
                    reported: false,
                    values: Vec::new(),
                })
                .collect(),
            cursor: 0,
            matched_any: false,
        }
    }

    pub fn fallback(&self) -> Fallback {
        self.def.fallback
    }

    /// Decide where a freshly opened child tag belongs.
    ///
    /// `element` is the owning element's tag, used in diagnostics. Advances
    /// through satisfied parts, emits errors for skipped-but-unsatisfied
    /// parts and for tags nothing accepts.
    pub fn route(
        &mut self,
        element: &str,
        tag: &str,
        pos: Pos,
        diags: &mut Diagnostics,
    ) -> Route {
        // The current part gets first refusal.
        if let Some(part) = self.parts.get(self.cursor) {
            if part.accepts(tag) && part.has_capacity() {
                return Route::Part(self.take(self.cursor, tag));
            }
        }
        // Scan forward for the first later part that accepts the tag; every
        // unsatisfied part skipped over is an error.
        for idx in self.cursor + 1..self.parts.len() {
            if self.parts[idx].accepts(tag) && self.parts[idx].has_capacity() {
                for skipped in self.cursor..idx {
                    let part = &mut self.parts[skipped];
                    if !part.satisfied() && !part.reported {
                        part.reported = true;
                        diags.error(
                            format!(
                                "element <{element}> requires at least {} {} (found {})",
                                part.def.min,
                                part.tags_desc(),
                                part.count
                            ),
                            Some(pos),
                        );
                    }
                }
                self.cursor = idx;
                return Route::Part(self.take(idx, tag));
            }
        }
        // Nothing structured accepts this tag. A part already at its maximum
        // is no different from no part at all: the tag is dropped with an
        // error, not queued and not silently ignored.
        if self.def.fallback != Fallback::None {
            return Route::Fallback;
        }
        let expected = self.expected();
        if expected.is_empty() {
            diags.error(
                format!("unexpected element <{tag}> in <{element}>; no further content is allowed"),
                Some(pos),
            );
        } else {
            diags.error(
                format!(
                    "unexpected element <{tag}> in <{element}>; expected {}",
                    expected.join(" or ")
                ),
                Some(pos),
            );
        }
        Route::Drop
    }

    fn take(&mut self, idx: usize, tag: &str) -> usize {
        let part = &mut self.parts[idx];
        part.count += 1;
        if part.def.exclusive && part.committed.is_none() {
            // Intern against the declared tag list for a 'static name.
            part.committed = part.def.tags.iter().copied().find(|t| *t == tag);
        }
        self.matched_any = true;
        idx
    }

    /// Tags still acceptable from the current position.
    fn expected(&self) -> Vec<String> {
        let mut out = Vec::new();
        for part in &self.parts[self.cursor..] {
            if !part.has_capacity() {
                continue;
            }
            let desc = part.tags_desc();
            if !out.contains(&desc) {
                out.push(desc);
            }
        }
        out
    }

    /// Store the finished value of a child previously routed to `idx`.
    pub fn store(&mut self, idx: usize, value: V) {
        self.parts[idx].values.push(value);
    }

    /// Element-close bookkeeping: every part still below its minimum gets
    /// the same missing-children error as a skipped part, and an exclusive
    /// fallback that captured content alongside matched children is flagged.
    pub fn finish(
        &mut self,
        element: &str,
        pos: Pos,
        captured_fallback: bool,
        diags: &mut Diagnostics,
    ) {
        for part in &mut self.parts {
            if !part.satisfied() && !part.reported {
                part.reported = true;
                diags.error(
                    format!(
                        "element <{element}> requires at least {} {} (found {})",
                        part.def.min,
                        part.tags_desc(),
                        part.count
                    ),
                    Some(pos),
                );
            }
        }
        if self.def.fallback == Fallback::Exclusive && captured_fallback && self.matched_any {
            diags.error(
                format!(
                    "mixing free-form content with declared children is not allowed in <{element}>"
                ),
                Some(pos),
            );
        }
    }

    /// Consume the matched child values, one `Vec` per declared part.
    pub fn into_values(self) -> Vec<Vec<V>> {
        self.parts.into_iter().map(|p| p.values).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TITLES_THEN_ITEMS: SequenceDef = SequenceDef {
        parts: &[
            PartDef { tags: &["title"], min: 1, max: MANY, exclusive: false },
            PartDef { tags: &["item"], min: 0, max: 2, exclusive: false },
        ],
        fallback: Fallback::None,
    };

    const ONE_OF: SequenceDef = SequenceDef {
        parts: &[PartDef { tags: &["category", "option"], min: 1, max: MANY, exclusive: true }],
        fallback: Fallback::None,
    };

    const WITH_FALLBACK: SequenceDef = SequenceDef {
        parts: &[PartDef { tags: &["title"], min: 0, max: MANY, exclusive: false }],
        fallback: Fallback::Exclusive,
    };

    const WITH_MIXED_FALLBACK: SequenceDef = SequenceDef {
        parts: &[PartDef { tags: &["title"], min: 0, max: MANY, exclusive: false }],
        fallback: Fallback::Mixed,
    };

    fn pos() -> Pos {
        Pos { line: 1, column: 1 }
    }

    #[test]
    fn routes_in_declared_order() {
        let mut seq: Sequence<&str> = Sequence::new(&TITLES_THEN_ITEMS);
        let mut diags = Diagnostics::default();
        assert_eq!(seq.route("e", "title", pos(), &mut diags), Route::Part(0));
        assert_eq!(seq.route("e", "title", pos(), &mut diags), Route::Part(0));
        assert_eq!(seq.route("e", "item", pos(), &mut diags), Route::Part(1));
        assert!(!diags.has_errors());
    }

    #[test]
    fn skipping_an_unsatisfied_part_is_an_error() {
        let mut seq: Sequence<&str> = Sequence::new(&TITLES_THEN_ITEMS);
        let mut diags = Diagnostics::default();
        assert_eq!(seq.route("e", "item", pos(), &mut diags), Route::Part(1));
        assert_eq!(diags.errors().len(), 1);
        assert!(diags.errors()[0].message.contains("<title>"));
        // Not reported again at close.
        seq.finish("e", pos(), false, &mut diags);
        assert_eq!(diags.errors().len(), 1);
    }

    #[test]
    fn over_capacity_tag_is_dropped_with_error() {
        let mut seq: Sequence<&str> = Sequence::new(&TITLES_THEN_ITEMS);
        let mut diags = Diagnostics::default();
        seq.route("e", "title", pos(), &mut diags);
        seq.route("e", "item", pos(), &mut diags);
        seq.route("e", "item", pos(), &mut diags);
        // max = 2 for <item>: the third occurrence matches no part.
        assert_eq!(seq.route("e", "item", pos(), &mut diags), Route::Drop);
        assert_eq!(diags.errors().len(), 1);
        assert!(diags.errors()[0].message.contains("unexpected element <item>"));
    }

    #[test]
    fn no_backtracking_to_earlier_parts() {
        let mut seq: Sequence<&str> = Sequence::new(&TITLES_THEN_ITEMS);
        let mut diags = Diagnostics::default();
        seq.route("e", "title", pos(), &mut diags);
        seq.route("e", "item", pos(), &mut diags);
        // A <title> after the cursor moved on is unexpected.
        assert_eq!(seq.route("e", "title", pos(), &mut diags), Route::Drop);
        assert!(diags.errors()[0].message.contains("expected"));
    }

    #[test]
    fn exclusive_part_commits_to_first_variant() {
        let mut seq: Sequence<&str> = Sequence::new(&ONE_OF);
        let mut diags = Diagnostics::default();
        assert_eq!(seq.route("one-of", "category", pos(), &mut diags), Route::Part(0));
        assert_eq!(seq.route("one-of", "category", pos(), &mut diags), Route::Part(0));
        // <option> is a valid alternative when used first, but the part has
        // committed to <category>.
        assert_eq!(seq.route("one-of", "option", pos(), &mut diags), Route::Drop);
        assert_eq!(diags.errors().len(), 1);
        let msg = &diags.errors()[0].message;
        assert!(msg.contains("unexpected element <option>"), "{msg}");
        assert!(msg.contains("<category>") && !msg.contains("<option>|"), "{msg}");
    }

    #[test]
    fn unsatisfied_parts_reported_at_close() {
        let mut seq: Sequence<&str> = Sequence::new(&TITLES_THEN_ITEMS);
        let mut diags = Diagnostics::default();
        seq.finish("e", pos(), false, &mut diags);
        assert_eq!(diags.errors().len(), 1);
        assert!(diags.errors()[0].message.contains("at least 1 <title>"));
    }

    #[test]
    fn unknown_tag_routes_to_fallback_when_enabled() {
        let mut seq: Sequence<&str> = Sequence::new(&WITH_FALLBACK);
        let mut diags = Diagnostics::default();
        assert_eq!(seq.route("info", "em", pos(), &mut diags), Route::Fallback);
        assert!(!diags.has_errors());
    }

    #[test]
    fn exclusive_fallback_rejects_mixing_once() {
        let mut seq: Sequence<&str> = Sequence::new(&WITH_FALLBACK);
        let mut diags = Diagnostics::default();
        seq.route("info", "title", pos(), &mut diags);
        seq.route("info", "em", pos(), &mut diags);
        seq.finish("info", pos(), true, &mut diags);
        assert_eq!(diags.errors().len(), 1);
        assert!(diags.errors()[0].message.contains("not allowed in <info>"));
    }

    #[test]
    fn mixed_fallback_coexists_with_matched_children() {
        let mut seq: Sequence<&str> = Sequence::new(&WITH_MIXED_FALLBACK);
        let mut diags = Diagnostics::default();
        assert_eq!(seq.route("note", "title", pos(), &mut diags), Route::Part(0));
        assert_eq!(seq.route("note", "em", pos(), &mut diags), Route::Fallback);
        seq.finish("note", pos(), true, &mut diags);
        assert!(!diags.has_errors());
    }

    #[test]
    fn fallback_alone_is_fine() {
        let mut seq: Sequence<&str> = Sequence::new(&WITH_FALLBACK);
        let mut diags = Diagnostics::default();
        seq.route("info", "em", pos(), &mut diags);
        seq.finish("info", pos(), true, &mut diags);
        assert!(!diags.has_errors());
    }

    #[test]
    fn values_land_in_their_parts() {
        let mut seq: Sequence<&str> = Sequence::new(&TITLES_THEN_ITEMS);
        let mut diags = Diagnostics::default();
        let Route::Part(a) = seq.route("e", "title", pos(), &mut diags) else {
            panic!("expected part route");
        };
        seq.store(a, "t1");
        let Route::Part(b) = seq.route("e", "item", pos(), &mut diags) else {
            panic!("expected part route");
        };
        seq.store(b, "i1");
        let values = seq.into_values();
        assert_eq!(values, vec![vec!["t1"], vec!["i1"]]);
    }
}
