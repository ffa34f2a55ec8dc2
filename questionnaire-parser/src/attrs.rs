//! Typed attribute binding.
//!
//! Each element binds its declared attributes exactly once, at element-open,
//! by walking the open tag's attribute list through the coercers below. All
//! coercions are pure and total: they never fail, they always yield a usable
//! value plus zero or more diagnostics. Invalid input costs a warning (value
//! adjusted, default or clamped bound substituted) or an error (required
//! value absent), never an aborted parse.

use crate::diagnostics::{Diagnostics, Pos};
use xml::attribute::OwnedAttribute;

/// The open tag's attribute set, matched by local name.
pub struct Attributes<'a> {
    attrs: &'a [OwnedAttribute],
    pos: Pos,
}

impl<'a> Attributes<'a> {
    pub fn new(attrs: &'a [OwnedAttribute], pos: Pos) -> Attributes<'a> {
        Attributes { attrs, pos }
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    fn raw(&self, name: &str) -> Option<&'a str> {
        self.attrs
            .iter()
            .find(|a| a.name.local_name == name)
            .map(|a| a.value.as_str())
    }

    /// Blank values are treated as absent (with a warning); absent uses the
    /// default silently.
    pub fn string(&self, name: &str, default: &str, diags: &mut Diagnostics) -> String {
        match self.raw(name) {
            Some(v) if v.trim().is_empty() => {
                diags.warn(
                    format!("attribute '{name}' is blank; treating it as absent"),
                    Some(self.pos),
                );
                default.to_string()
            }
            Some(v) => v.to_string(),
            None => default.to_string(),
        }
    }

    pub fn optional_string(&self, name: &str, diags: &mut Diagnostics) -> Option<String> {
        match self.raw(name) {
            Some(v) if v.trim().is_empty() => {
                diags.warn(
                    format!("attribute '{name}' is blank; treating it as absent"),
                    Some(self.pos),
                );
                None
            }
            Some(v) => Some(v.to_string()),
            None => None,
        }
    }

    /// Absence of a required attribute is an error; `fallback` is the
    /// sentinel substituted so that parsing can continue.
    pub fn required_string(
        &self,
        element: &str,
        name: &str,
        fallback: &str,
        diags: &mut Diagnostics,
    ) -> String {
        match self.raw(name) {
            Some(v) if !v.trim().is_empty() => v.to_string(),
            _ => {
                diags.error(
                    format!("element <{element}> is missing required attribute '{name}'"),
                    Some(self.pos),
                );
                fallback.to_string()
            }
        }
    }

    /// Case-insensitive `true|yes` / `false|no`.
    pub fn boolean(&self, name: &str, default: bool, diags: &mut Diagnostics) -> bool {
        match self.raw(name) {
            None => default,
            Some(v) => match v.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" => true,
                "false" | "no" => false,
                _ => {
                    diags.warn(
                        format!(
                            "attribute '{name}' has invalid boolean value {v:?}; \
                             using default {default}"
                        ),
                        Some(self.pos),
                    );
                    default
                }
            },
        }
    }

    /// Out-of-range values clamp to the nearest bound with a warning.
    pub fn integer(
        &self,
        name: &str,
        default: i64,
        min: i64,
        max: i64,
        diags: &mut Diagnostics,
    ) -> i64 {
        let raw = match self.raw(name) {
            None => return default,
            Some(v) => v,
        };
        match raw.trim().parse::<i64>() {
            Err(_) => {
                diags.warn(
                    format!("attribute '{name}' is not an integer: {raw:?}; using default {default}"),
                    Some(self.pos),
                );
                default
            }
            Ok(v) if v < min => {
                diags.warn(
                    format!("attribute '{name}' value {v} is below the minimum {min}; clamping"),
                    Some(self.pos),
                );
                min
            }
            Ok(v) if v > max => {
                diags.warn(
                    format!("attribute '{name}' value {v} is above the maximum {max}; clamping"),
                    Some(self.pos),
                );
                max
            }
            Ok(v) => v,
        }
    }

    /// Normalized lookup against declared constant names: uppercase, spaces
    /// and dashes to underscores. Failure is an error listing every valid
    /// value, and the default is used.
    pub fn keyword<T: Copy>(
        &self,
        name: &str,
        default: T,
        values: &'static [(&'static str, T)],
        diags: &mut Diagnostics,
    ) -> T {
        let raw = match self.raw(name) {
            None => return default,
            Some(v) => v,
        };
        let normalized = normalize_keyword(raw);
        match values.iter().find(|(n, _)| *n == normalized) {
            Some((_, v)) => *v,
            None => {
                let valid: Vec<&str> = values.iter().map(|(n, _)| *n).collect();
                diags.error(
                    format!(
                        "attribute '{name}' has unknown value {raw:?}; valid values are {}",
                        valid.join(", ")
                    ),
                    Some(self.pos),
                );
                default
            }
        }
    }

    /// Floating-point seconds. Non-finite values are rejected; values below
    /// `min` clamp up with a warning.
    pub fn seconds(&self, name: &str, default: f64, min: f64, diags: &mut Diagnostics) -> f64 {
        let raw = match self.raw(name) {
            None => return default,
            Some(v) => v,
        };
        match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => {
                if v < min {
                    diags.warn(
                        format!(
                            "attribute '{name}' value {v} is below the minimum {min} seconds; \
                             clamping"
                        ),
                        Some(self.pos),
                    );
                    min
                } else {
                    v
                }
            }
            _ => {
                diags.warn(
                    format!(
                        "attribute '{name}' is not a finite number of seconds: {raw:?}; \
                         using default {default}"
                    ),
                    Some(self.pos),
                );
                default
            }
        }
    }
}

fn normalize_keyword(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use xml::name::OwnedName;

    fn attr(name: &str, value: &str) -> OwnedAttribute {
        OwnedAttribute {
            name: OwnedName::local(name),
            value: value.to_string(),
        }
    }

    fn pos() -> Pos {
        Pos { line: 1, column: 1 }
    }

    #[test]
    fn boolean_accepts_yes_and_no() {
        let attrs = [attr("required", "Yes"), attr("detail", "no")];
        let attrs = Attributes::new(&attrs, pos());
        let mut diags = Diagnostics::default();
        assert!(attrs.boolean("required", false, &mut diags));
        assert!(!attrs.boolean("detail", true, &mut diags));
        assert!(diags.warnings().is_empty());
    }

    #[test]
    fn boolean_falls_back_on_garbage() {
        let attrs = [attr("required", "maybe")];
        let attrs = Attributes::new(&attrs, pos());
        let mut diags = Diagnostics::default();
        assert!(!attrs.boolean("required", false, &mut diags));
        assert_eq!(diags.warnings().len(), 1);
    }

    #[test]
    fn integer_clamps_to_nearest_bound() {
        let attrs = [attr("max", "10"), attr("min", "-3")];
        let attrs = Attributes::new(&attrs, pos());
        let mut diags = Diagnostics::default();
        assert_eq!(attrs.integer("max", 7, 1, 7, &mut diags), 7);
        assert_eq!(attrs.integer("min", 1, 0, 7, &mut diags), 0);
        assert_eq!(diags.warnings().len(), 2);
    }

    #[test]
    fn integer_unparsable_uses_default() {
        let attrs = [attr("repeats", "often")];
        let attrs = Attributes::new(&attrs, pos());
        let mut diags = Diagnostics::default();
        assert_eq!(attrs.integer("repeats", 1, 1, 1000, &mut diags), 1);
        assert_eq!(diags.warnings().len(), 1);
    }

    #[test]
    fn keyword_normalizes_case_spaces_and_dashes() {
        const KINDS: &[(&str, u8)] = &[("SENTENCE", 0), ("FREE_FORM", 1)];
        let attrs = [attr("a", "sentence"), attr("b", "free form"), attr("c", "Free-Form")];
        let attrs = Attributes::new(&attrs, pos());
        let mut diags = Diagnostics::default();
        assert_eq!(attrs.keyword("a", 9, KINDS, &mut diags), 0);
        assert_eq!(attrs.keyword("b", 9, KINDS, &mut diags), 1);
        assert_eq!(attrs.keyword("c", 9, KINDS, &mut diags), 1);
        assert!(!diags.has_errors());
    }

    #[test]
    fn keyword_failure_lists_valid_values() {
        const KINDS: &[(&str, u8)] = &[("SENTENCE", 0), ("PARAGRAPH", 1)];
        let attrs = [attr("detail-type", "shouty")];
        let attrs = Attributes::new(&attrs, pos());
        let mut diags = Diagnostics::default();
        assert_eq!(attrs.keyword("detail-type", 0, KINDS, &mut diags), 0);
        assert_eq!(diags.errors().len(), 1);
        let msg = &diags.errors()[0].message;
        assert!(msg.contains("SENTENCE") && msg.contains("PARAGRAPH"), "{msg}");
    }

    #[test]
    fn seconds_rejects_non_finite_and_clamps_low() {
        let attrs = [attr("interval", "NaN"), attr("short", "0.5")];
        let attrs = Attributes::new(&attrs, pos());
        let mut diags = Diagnostics::default();
        assert_eq!(attrs.seconds("interval", 60.0, 1.0, &mut diags), 60.0);
        assert_eq!(attrs.seconds("short", 60.0, 1.0, &mut diags), 1.0);
        assert_eq!(diags.warnings().len(), 2);
    }

    #[test]
    fn blank_string_treated_as_absent() {
        let attrs = [attr("lang", "   ")];
        let attrs = Attributes::new(&attrs, pos());
        let mut diags = Diagnostics::default();
        assert_eq!(attrs.optional_string("lang", &mut diags), None);
        assert_eq!(diags.warnings().len(), 1);
    }

    #[test]
    fn required_string_errors_and_substitutes_sentinel() {
        let attrs: [OwnedAttribute; 0] = [];
        let attrs = Attributes::new(&attrs, pos());
        let mut diags = Diagnostics::default();
        let id = attrs.required_string("question", "id", "invalid-id", &mut diags);
        assert_eq!(id, "invalid-id");
        assert!(diags.errors()[0].message.contains("'id'"));
    }
}
