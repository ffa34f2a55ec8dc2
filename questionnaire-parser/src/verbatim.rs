//! Verbatim fallback capture.
//!
//! When a schema enables fallback, non-matching text and markup events are
//! re-serialized into one self-contained fragment. The tokenizer has already
//! resolved entities, so text and attribute values are re-escaped for the
//! five standard XML special characters on the way out. The reconstruction
//! is semantically equivalent to the input, not byte-identical.

use xml::attribute::OwnedAttribute;

/// Escape character data for element content.
pub fn escape_text(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
}

/// Escape an attribute value for a double-quoted position.
pub fn escape_attr(out: &mut String, value: &str) {
    // Same five characters; kept separate because the quoting context
    // differs even though the table currently matches.
    escape_text(out, value);
}

/// Accumulates interleaved text and nested markup into one fragment.
#[derive(Default)]
pub struct VerbatimCapture {
    buf: String,
}

impl VerbatimCapture {
    pub fn new() -> VerbatimCapture {
        VerbatimCapture::default()
    }

    pub fn text(&mut self, text: &str) {
        escape_text(&mut self.buf, text);
    }

    pub fn open(&mut self, name: &str, attributes: &[OwnedAttribute]) {
        self.buf.push('<');
        self.buf.push_str(name);
        for attr in attributes {
            self.buf.push(' ');
            self.buf.push_str(&attr.name.local_name);
            self.buf.push_str("=\"");
            escape_attr(&mut self.buf, &attr.value);
            self.buf.push('"');
        }
        self.buf.push('>');
    }

    pub fn close(&mut self, name: &str) {
        self.buf.push_str("</");
        self.buf.push_str(name);
        self.buf.push('>');
    }

    /// Append an already-serialized fragment (a completed child subtree).
    pub fn append_fragment(&mut self, fragment: &str) {
        self.buf.push_str(fragment);
    }

    /// Whitespace-only captures count as empty.
    pub fn is_effectively_empty(&self) -> bool {
        xml::common::is_whitespace_str(&self.buf)
    }

    pub fn into_fragment(self) -> String {
        self.buf
    }

    /// The finished fragment, or `None` when nothing of substance was seen.
    pub fn into_markup(self) -> Option<String> {
        if self.is_effectively_empty() {
            None
        } else {
            Some(self.buf)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xml::name::OwnedName;

    #[test]
    fn escapes_all_five_special_characters() {
        let mut out = String::new();
        escape_text(&mut out, r#"a<b>&"c'"#);
        assert_eq!(out, "a&lt;b&gt;&amp;&quot;c&apos;");
    }

    #[test]
    fn reconstructs_nested_markup() {
        let mut cap = VerbatimCapture::new();
        cap.open(
            "em",
            &[OwnedAttribute {
                name: OwnedName::local("class"),
                value: "wine & dine".to_string(),
            }],
        );
        cap.text("cheese < crackers");
        cap.close("em");
        assert_eq!(
            cap.into_fragment(),
            r#"<em class="wine &amp; dine">cheese &lt; crackers</em>"#
        );
    }

    #[test]
    fn whitespace_only_capture_is_empty() {
        let mut cap = VerbatimCapture::new();
        cap.text("  \n\t ");
        assert!(cap.is_effectively_empty());
        assert_eq!(cap.into_markup(), None);
    }

    #[test]
    fn markup_only_whitespace_text_still_counts() {
        let mut cap = VerbatimCapture::new();
        cap.open("br", &[]);
        cap.close("br");
        assert!(cap.into_markup().is_some());
    }
}
