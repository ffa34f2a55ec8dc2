//! The template vocabulary: one [`Kind`] per element type, its declared
//! child schema, its attribute bindings, and its close handler.
//!
//! Attribute "properties" are bound eagerly at element-open into a plain
//! [`Props`] value; there is no deferred evaluation. Close handlers build
//! one immutable model node from the bound properties and the child results;
//! a missing mandatory child yields an empty collection or a type-specific
//! fallback default, never a panic.

use crate::attrs::Attributes;
use crate::diagnostics::{Diagnostics, Pos};
use crate::sequence::{Fallback, PartDef, SequenceDef, MANY};
use questionnaire_model as model;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Questionnaire,
    Title,
    Text,
    Section,
    Info,
    Question,
    FreeText,
    OneOf,
    Scale,
    TimeProgression,
    Category,
    OptionEl,
    Placeholder,
    DefaultValue,
    MinLabel,
    MaxLabel,
    DetailPrompt,
}

/// Tag names are globally unique across the vocabulary.
pub fn kind_for(tag: &str) -> Option<Kind> {
    Some(match tag {
        "questionnaire" => Kind::Questionnaire,
        "title" => Kind::Title,
        "text" => Kind::Text,
        "section" => Kind::Section,
        "info" => Kind::Info,
        "question" => Kind::Question,
        "free-text" => Kind::FreeText,
        "one-of" => Kind::OneOf,
        "scale" => Kind::Scale,
        "time-progression" => Kind::TimeProgression,
        "category" => Kind::Category,
        "option" => Kind::OptionEl,
        "placeholder" => Kind::Placeholder,
        "default" => Kind::DefaultValue,
        "min-label" => Kind::MinLabel,
        "max-label" => Kind::MaxLabel,
        "detail-prompt" => Kind::DetailPrompt,
        _ => return None,
    })
}

// --- Declared child schemas ---

const QUESTIONNAIRE: SequenceDef = SequenceDef {
    parts: &[
        PartDef { tags: &["title"], min: 1, max: MANY, exclusive: false },
        PartDef { tags: &["section"], min: 0, max: MANY, exclusive: false },
    ],
    fallback: Fallback::None,
};

const SECTION: SequenceDef = SequenceDef {
    parts: &[
        PartDef { tags: &["title"], min: 1, max: MANY, exclusive: false },
        PartDef { tags: &["info", "question"], min: 0, max: MANY, exclusive: false },
    ],
    fallback: Fallback::None,
};

// Structured titles/texts or free-form markup, never both.
const INFO: SequenceDef = SequenceDef {
    parts: &[
        PartDef { tags: &["title"], min: 0, max: MANY, exclusive: false },
        PartDef { tags: &["text"], min: 0, max: MANY, exclusive: false },
    ],
    fallback: Fallback::Exclusive,
};

const QUESTION: SequenceDef = SequenceDef {
    parts: &[
        PartDef { tags: &["title"], min: 1, max: MANY, exclusive: false },
        PartDef { tags: &["text"], min: 0, max: MANY, exclusive: false },
        PartDef {
            tags: &["free-text", "one-of", "scale", "time-progression"],
            min: 1,
            max: 1,
            exclusive: true,
        },
    ],
    fallback: Fallback::None,
};

const FREE_TEXT: SequenceDef = SequenceDef {
    parts: &[
        PartDef { tags: &["placeholder"], min: 0, max: 1, exclusive: false },
        PartDef { tags: &["default"], min: 0, max: 1, exclusive: false },
    ],
    fallback: Fallback::None,
};

// Either categories or bare options; first child commits the slot.
const ONE_OF: SequenceDef = SequenceDef {
    parts: &[PartDef { tags: &["category", "option"], min: 1, max: MANY, exclusive: true }],
    fallback: Fallback::None,
};

const SCALE: SequenceDef = SequenceDef {
    parts: &[
        PartDef { tags: &["min-label"], min: 0, max: 1, exclusive: false },
        PartDef { tags: &["max-label"], min: 0, max: 1, exclusive: false },
    ],
    fallback: Fallback::None,
};

const TIME_PROGRESSION: SequenceDef = SequenceDef {
    parts: &[PartDef { tags: &["one-of", "scale"], min: 1, max: 1, exclusive: true }],
    fallback: Fallback::None,
};

const CATEGORY: SequenceDef = SequenceDef {
    parts: &[
        PartDef { tags: &["title"], min: 0, max: 1, exclusive: false },
        PartDef { tags: &["option"], min: 1, max: MANY, exclusive: false },
    ],
    fallback: Fallback::None,
};

const OPTION: SequenceDef = SequenceDef {
    parts: &[
        PartDef { tags: &["title"], min: 0, max: 1, exclusive: false },
        PartDef { tags: &["detail-prompt"], min: 0, max: 1, exclusive: false },
    ],
    fallback: Fallback::None,
};

pub enum ContentModel {
    /// Accumulates text only; child elements are schema violations.
    Leaf,
    Composite(&'static SequenceDef),
}

impl Kind {
    pub fn content_model(self) -> ContentModel {
        match self {
            Kind::Questionnaire => ContentModel::Composite(&QUESTIONNAIRE),
            Kind::Section => ContentModel::Composite(&SECTION),
            Kind::Info => ContentModel::Composite(&INFO),
            Kind::Question => ContentModel::Composite(&QUESTION),
            Kind::FreeText => ContentModel::Composite(&FREE_TEXT),
            Kind::OneOf => ContentModel::Composite(&ONE_OF),
            Kind::Scale => ContentModel::Composite(&SCALE),
            Kind::TimeProgression => ContentModel::Composite(&TIME_PROGRESSION),
            Kind::Category => ContentModel::Composite(&CATEGORY),
            Kind::OptionEl => ContentModel::Composite(&OPTION),
            Kind::Title
            | Kind::Text
            | Kind::Placeholder
            | Kind::DefaultValue
            | Kind::MinLabel
            | Kind::MaxLabel
            | Kind::DetailPrompt => ContentModel::Leaf,
        }
    }

    /// Walk the declared property list once, at element-open.
    pub fn bind(self, attrs: &Attributes, diags: &mut Diagnostics) -> Props {
        match self {
            Kind::Questionnaire => Props::Questionnaire {
                default_lang: attrs.string("default-lang", "en", diags),
            },
            Kind::Title => Props::Title {
                language: attrs.optional_string("lang", diags),
                always: attrs.boolean("always", false, diags),
            },
            Kind::Text => Props::Text {
                language: attrs.optional_string("lang", diags),
            },
            Kind::Question => Props::Question {
                id: attrs.required_string("question", "id", model::Question::INVALID_ID, diags),
                required: attrs.boolean("required", false, diags),
            },
            Kind::FreeText => Props::FreeText {
                input: attrs.keyword(
                    "type",
                    model::InputKind::Sentence,
                    model::InputKind::NAMES,
                    diags,
                ),
            },
            Kind::Scale => Props::Scale {
                min: attrs.integer("min", 1, 0, 7, diags),
                max: attrs.integer("max", 7, 1, 7, diags),
            },
            Kind::TimeProgression => Props::TimeProgression {
                interval_secs: attrs.seconds("interval", 86_400.0, 1.0, diags),
                repeats: attrs.integer("repeats", 1, 1, 1000, diags),
            },
            Kind::OptionEl => Props::Option {
                value: attrs.required_string("option", "value", model::Opt::INVALID_VALUE, diags),
                has_detail: attrs.boolean("detail", false, diags),
                detail_kind: attrs.keyword(
                    "detail-type",
                    model::DetailKind::Sentence,
                    model::DetailKind::NAMES,
                    diags,
                ),
            },
            Kind::Section
            | Kind::Info
            | Kind::OneOf
            | Kind::Category
            | Kind::Placeholder
            | Kind::DefaultValue
            | Kind::MinLabel
            | Kind::MaxLabel
            | Kind::DetailPrompt => Props::None,
        }
    }

    pub fn finalize_leaf(self, props: Props, text: String) -> Value {
        let text = text.trim().to_string();
        match (self, props) {
            (Kind::Title, Props::Title { language, always }) => Value::Title(model::Title {
                text,
                language,
                always,
            }),
            (Kind::Text, Props::Text { language }) => Value::Text(model::Text { text, language }),
            _ => Value::Chars(text),
        }
    }

    /// Build one immutable node from bound properties and child results.
    pub fn finalize(
        self,
        props: Props,
        values: Vec<Vec<Value>>,
        markup: Option<String>,
        pos: Pos,
        diags: &mut Diagnostics,
    ) -> Value {
        match (self, props) {
            (Kind::Questionnaire, Props::Questionnaire { default_lang }) => {
                let (title_values, section_values) = two(values);
                Value::Template(model::Template {
                    default_lang,
                    titles: titles(title_values),
                    sections: sections(section_values),
                })
            }
            (Kind::Section, _) => {
                let (title_values, content_values) = two(values);
                Value::Section(model::Section {
                    titles: titles(title_values),
                    content: content_values
                        .into_iter()
                        .filter_map(|v| match v {
                            Value::Info(info) => Some(model::SectionContent::Info(info)),
                            Value::Question(q) => Some(model::SectionContent::Question(q)),
                            _ => None,
                        })
                        .collect(),
                })
            }
            (Kind::Info, _) => {
                let (title_values, text_values) = two(values);
                Value::Info(model::Info {
                    titles: titles(title_values),
                    texts: texts(text_values),
                    markup,
                })
            }
            (Kind::Question, Props::Question { id, required }) => {
                let (title_values, text_values, body_values) = three(values);
                let body = body_values
                    .into_iter()
                    .next()
                    .map(question_body)
                    .unwrap_or_else(|| {
                        model::QuestionType::FreeText(model::FreeText::default())
                    });
                Value::Question(model::Question {
                    id,
                    required,
                    titles: titles(title_values),
                    texts: texts(text_values),
                    body,
                })
            }
            (Kind::FreeText, Props::FreeText { input }) => {
                let (placeholder_values, default_values) = two(values);
                Value::FreeText(model::FreeText {
                    input,
                    placeholder: first_chars(placeholder_values),
                    default: first_chars(default_values),
                })
            }
            (Kind::OneOf, _) => {
                let (choice_values,) = one(values);
                let mut categories = Vec::new();
                let mut loose = Vec::new();
                for v in choice_values {
                    match v {
                        Value::Category(c) => categories.push(c),
                        Value::Choice(o) => loose.push(o),
                        _ => {}
                    }
                }
                if !loose.is_empty() {
                    // Bare options form one implicit category.
                    categories.push(model::Category { title: None, options: loose });
                }
                Value::Variable(model::TimeVariable::OneOf { categories })
            }
            (Kind::Scale, Props::Scale { min, max }) => {
                if min >= max {
                    diags.warn(
                        format!("scale minimum {min} is not below its maximum {max}"),
                        Some(pos),
                    );
                }
                let (min_label_values, max_label_values) = two(values);
                Value::Variable(model::TimeVariable::Scale {
                    min,
                    max,
                    min_label: first_chars(min_label_values),
                    max_label: first_chars(max_label_values),
                })
            }
            (Kind::TimeProgression, Props::TimeProgression { interval_secs, repeats }) => {
                let (base_values,) = one(values);
                let base = base_values
                    .into_iter()
                    .find_map(|v| match v {
                        Value::Variable(var) => Some(var),
                        _ => None,
                    })
                    .unwrap_or_else(model::TimeVariable::default_scale);
                Value::Progression(model::TimeProgression {
                    interval_secs,
                    repeats,
                    base,
                })
            }
            (Kind::Category, _) => {
                let (title_values, option_values) = two(values);
                Value::Category(model::Category {
                    title: first_title(title_values),
                    options: option_values
                        .into_iter()
                        .filter_map(|v| match v {
                            Value::Choice(o) => Some(o),
                            _ => None,
                        })
                        .collect(),
                })
            }
            (Kind::OptionEl, Props::Option { value, has_detail, detail_kind }) => {
                let (title_values, prompt_values) = two(values);
                Value::Choice(model::Opt {
                    value,
                    has_detail,
                    detail_kind,
                    title: first_title(title_values),
                    detail_prompt: first_chars(prompt_values),
                })
            }
            // Leaves never reach here, and a props mismatch cannot happen
            // because bind() and finalize() key off the same Kind.
            (_, _) => Value::Chars(String::new()),
        }
    }
}

/// Eagerly bound attribute properties, immutable after element-open.
pub enum Props {
    Questionnaire { default_lang: String },
    Title { language: Option<String>, always: bool },
    Text { language: Option<String> },
    Question { id: String, required: bool },
    FreeText { input: model::InputKind },
    Scale { min: i64, max: i64 },
    TimeProgression { interval_secs: f64, repeats: i64 },
    Option { value: String, has_detail: bool, detail_kind: model::DetailKind },
    None,
}

/// A finalized element, on its way into the parent's matched part.
pub enum Value {
    Template(model::Template),
    Title(model::Title),
    Text(model::Text),
    Section(model::Section),
    Info(model::Info),
    Question(model::Question),
    FreeText(model::FreeText),
    Variable(model::TimeVariable),
    Progression(model::TimeProgression),
    Category(model::Category),
    Choice(model::Opt),
    Chars(String),
}

fn question_body(value: Value) -> model::QuestionType {
    match value {
        Value::FreeText(ft) => model::QuestionType::FreeText(ft),
        Value::Variable(var) => model::QuestionType::Variable(var),
        Value::Progression(p) => model::QuestionType::TimeProgression(p),
        _ => model::QuestionType::FreeText(model::FreeText::default()),
    }
}

// --- Part-value destructuring and extraction helpers ---

fn one(values: Vec<Vec<Value>>) -> (Vec<Value>,) {
    let mut it = values.into_iter();
    (it.next().unwrap_or_default(),)
}

fn two(values: Vec<Vec<Value>>) -> (Vec<Value>, Vec<Value>) {
    let mut it = values.into_iter();
    (it.next().unwrap_or_default(), it.next().unwrap_or_default())
}

fn three(values: Vec<Vec<Value>>) -> (Vec<Value>, Vec<Value>, Vec<Value>) {
    let mut it = values.into_iter();
    (
        it.next().unwrap_or_default(),
        it.next().unwrap_or_default(),
        it.next().unwrap_or_default(),
    )
}

fn titles(values: Vec<Value>) -> Vec<model::Title> {
    values
        .into_iter()
        .filter_map(|v| match v {
            Value::Title(t) => Some(t),
            _ => None,
        })
        .collect()
}

fn texts(values: Vec<Value>) -> Vec<model::Text> {
    values
        .into_iter()
        .filter_map(|v| match v {
            Value::Text(t) => Some(t),
            _ => None,
        })
        .collect()
}

fn sections(values: Vec<Value>) -> Vec<model::Section> {
    values
        .into_iter()
        .filter_map(|v| match v {
            Value::Section(s) => Some(s),
            _ => None,
        })
        .collect()
}

fn first_title(values: Vec<Value>) -> Option<model::Title> {
    values.into_iter().find_map(|v| match v {
        Value::Title(t) => Some(t),
        _ => None,
    })
}

fn first_chars(values: Vec<Value>) -> Option<String> {
    values.into_iter().find_map(|v| match v {
        Value::Chars(s) => Some(s),
        _ => None,
    })
}
