//! Warning/error accumulation for one parse.
//!
//! Recoverable problems are collected rather than thrown: each parse owns one
//! [`Diagnostics`] value, every component appends to it, and nothing here
//! ever aborts the parse. Positions are best-effort; a diagnostic without a
//! locator simply renders without the position suffix.

use std::fmt;
use xml::common::TextPosition;

/// 1-based line/column position in the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos {
    pub line: u64,
    pub column: u64,
}

impl From<TextPosition> for Pos {
    fn from(p: TextPosition) -> Pos {
        // TextPosition is zero-based
        Pos {
            line: p.row + 1,
            column: p.column + 1,
        }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// One warning or error, immutable once recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub pos: Option<Pos>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pos {
            Some(pos) => write!(f, "{} (at {})", self.message, pos),
            None => f.write_str(&self.message),
        }
    }
}

/// Additive collector: two ordered lists, no dedup, no severity escalation.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Diagnostic>,
    errors: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn warn(&mut self, message: impl Into<String>, pos: Option<Pos>) {
        self.warnings.push(Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
            pos,
        });
    }

    pub fn error(&mut self, message: impl Into<String>, pos: Option<Pos>) {
        self.errors.push(Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            pos,
        });
    }

    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// All diagnostics in severity-list order: warnings first, then errors,
    /// each list in the order it was recorded.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.warnings.iter().chain(self.errors.iter())
    }
}

/// Build a [`codemap::CodeMap`] and span-annotated diagnostics for terminal
/// rendering via `codemap_diagnostic::Emitter`.
pub fn codemap_diagnostics(
    name: String,
    source: String,
    diags: &Diagnostics,
) -> (codemap::CodeMap, Vec<codemap_diagnostic::Diagnostic>) {
    // Byte length of each line, captured before the source moves into the map.
    let line_lens: Vec<u64> = source.lines().map(|l| l.len() as u64).collect();
    let mut map = codemap::CodeMap::new();
    let file = map.add_file(name, source);
    let mut out = Vec::new();
    for d in diags.iter() {
        let spans = match d.pos {
            Some(pos) if !line_lens.is_empty() => {
                // Clamp to the file: xml-rs may report a position one past
                // the final line (e.g. unexpected end of stream).
                let line = (pos.line as usize - 1).min(line_lens.len() - 1);
                let col = (pos.column - 1).min(line_lens[line]);
                let span = file.line_span(line).subspan(col, col);
                vec![codemap_diagnostic::SpanLabel {
                    span,
                    label: None,
                    style: codemap_diagnostic::SpanStyle::Primary,
                }]
            }
            _ => vec![],
        };
        let level = match d.severity {
            Severity::Warning => codemap_diagnostic::Level::Warning,
            Severity::Error => codemap_diagnostic::Level::Error,
        };
        out.push(codemap_diagnostic::Diagnostic {
            level,
            message: d.message.clone(),
            code: None,
            spans,
        });
    }
    (map, out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_position() {
        let mut diags = Diagnostics::default();
        diags.error("boom", Some(Pos { line: 3, column: 9 }));
        assert_eq!(
            diags.errors()[0].to_string(),
            "boom (at line 3, column 9)"
        );
    }

    #[test]
    fn display_without_position() {
        let mut diags = Diagnostics::default();
        diags.warn("odd", None);
        assert_eq!(diags.warnings()[0].to_string(), "odd");
    }

    #[test]
    fn ordering_is_preserved() {
        let mut diags = Diagnostics::default();
        diags.error("first", None);
        diags.error("second", None);
        let msgs: Vec<_> = diags.errors().iter().map(|d| d.message.as_str()).collect();
        assert_eq!(msgs, ["first", "second"]);
    }

    #[test]
    fn codemap_rendering_clamps_out_of_range_positions() {
        let mut diags = Diagnostics::default();
        diags.error("past the end", Some(Pos { line: 99, column: 99 }));
        let (_map, rendered) =
            codemap_diagnostics("doc".to_string(), "<a/>\n".to_string(), &diags);
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].spans.len(), 1);
    }
}
