//! Typed object model for questionnaire templates.
//!
//! A [`Template`] is the declarative, author-authored structural definition
//! of a questionnaire (sections, questions, answer types) prior to any
//! participant responses. The tree is assembled bottom-up by the parser in
//! the `questionnaire-parser` crate and is immutable once a document has
//! finished parsing.
//!
//! Question bodies are a closed sum type ([`QuestionType`]) rather than an
//! open class hierarchy, so every consumer (rendering, validation, export)
//! matches exhaustively and a new variant is a compile-time-visible gap.

/// A complete questionnaire template: the document root.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// Language used for titles/texts that carry no explicit `lang`.
    pub default_lang: String,
    pub titles: Vec<Title>,
    pub sections: Vec<Section>,
}

impl Default for Template {
    fn default() -> Self {
        Template {
            default_lang: "en".to_string(),
            titles: Vec::new(),
            sections: Vec::new(),
        }
    }
}

/// A heading, possibly restricted to one language.
#[derive(Debug, Clone, PartialEq)]
pub struct Title {
    pub text: String,
    pub language: Option<String>,
    /// Show this title regardless of the participant's language selection.
    pub always: bool,
}

/// A body text, possibly restricted to one language.
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub text: String,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub titles: Vec<Title>,
    pub content: Vec<SectionContent>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SectionContent {
    Info(Info),
    Question(Question),
}

/// Informational block: either structured titles/texts, or free-form markup
/// captured verbatim from the document (never both).
#[derive(Debug, Clone, PartialEq)]
pub struct Info {
    pub titles: Vec<Title>,
    pub texts: Vec<Text>,
    pub markup: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub id: String,
    pub required: bool,
    pub titles: Vec<Title>,
    pub texts: Vec<Text>,
    pub body: QuestionType,
}

impl Question {
    /// Sentinel substituted when a question carries no `id` attribute.
    pub const INVALID_ID: &'static str = "invalid-id";
}

/// The answer type of a question.
#[derive(Debug, Clone, PartialEq)]
pub enum QuestionType {
    FreeText(FreeText),
    Variable(TimeVariable),
    TimeProgression(TimeProgression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FreeText {
    pub input: InputKind,
    pub placeholder: Option<String>,
    pub default: Option<String>,
}

impl Default for FreeText {
    fn default() -> Self {
        FreeText {
            input: InputKind::Sentence,
            placeholder: None,
            default: None,
        }
    }
}

/// A variable sampled at one point in time: a closed choice or a scale.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeVariable {
    OneOf { categories: Vec<Category> },
    Scale {
        min: i64,
        max: i64,
        min_label: Option<String>,
        max_label: Option<String>,
    },
}

impl TimeVariable {
    /// Fallback used when a progression declares no base variable.
    pub fn default_scale() -> TimeVariable {
        TimeVariable::Scale {
            min: 1,
            max: 7,
            min_label: None,
            max_label: None,
        }
    }
}

/// The same [`TimeVariable`] asked repeatedly at a fixed interval.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeProgression {
    pub interval_secs: f64,
    pub repeats: i64,
    pub base: TimeVariable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub title: Option<Title>,
    pub options: Vec<Opt>,
}

/// One selectable option, with an optional free-text detail field.
#[derive(Debug, Clone, PartialEq)]
pub struct Opt {
    pub value: String,
    pub has_detail: bool,
    pub detail_kind: DetailKind,
    pub title: Option<Title>,
    pub detail_prompt: Option<String>,
}

impl Opt {
    /// Sentinel substituted when an option carries no `value` attribute.
    pub const INVALID_VALUE: &'static str = "invalid-value";
}

/// Input widget kind for free-text questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Sentence,
    Paragraph,
    Number,
}

impl InputKind {
    /// Declared constant names, as written in template documents.
    pub const NAMES: &'static [(&'static str, InputKind)] = &[
        ("SENTENCE", InputKind::Sentence),
        ("PARAGRAPH", InputKind::Paragraph),
        ("NUMBER", InputKind::Number),
    ];
}

/// Input kind for an option's detail field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailKind {
    Sentence,
    Paragraph,
    FreeForm,
}

impl DetailKind {
    /// Declared constant names, as written in template documents.
    pub const NAMES: &'static [(&'static str, DetailKind)] = &[
        ("SENTENCE", DetailKind::Sentence),
        ("PARAGRAPH", DetailKind::Paragraph),
        ("FREE_FORM", DetailKind::FreeForm),
    ];
}

impl Template {
    /// All questions in document order, across every section.
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.sections.iter().flat_map(|s| {
            s.content.iter().filter_map(|c| match c {
                SectionContent::Question(q) => Some(q),
                SectionContent::Info(_) => None,
            })
        })
    }
}
