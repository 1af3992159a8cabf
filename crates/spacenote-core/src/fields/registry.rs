//! Static facts about each field type.
//!
//! Pure lookup tables: which options the admin editor shows, what shape a
//! default takes, how the value travels, and which query operators apply.

use serde::Serialize;

use crate::query::Operator;

use super::FieldType;

/// Admin-editable option of a field definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKey {
    StringKind,
    MinLength,
    MaxLength,
    SelectValues,
    ValueMaps,
    DatetimeKind,
    NumericKind,
    Min,
    Max,
    MaxWidth,
}

impl OptionKey {
    /// Key used in the `options` JSON object.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StringKind | Self::DatetimeKind | Self::NumericKind => "kind",
            Self::MinLength => "min_length",
            Self::MaxLength => "max_length",
            Self::SelectValues => "values",
            Self::ValueMaps => "value_maps",
            Self::Min => "min",
            Self::Max => "max",
            Self::MaxWidth => "max_width",
        }
    }
}

/// Shape of the `default` a field type accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultShape {
    Text,
    Bool,
    /// One of the select values.
    SelectValue,
    TagList,
    /// A username or `$me`.
    Username,
    /// An ISO datetime, `$now`, or an EXIF binding.
    Datetime,
    Number,
    /// No default accepted.
    None,
}

/// How a form value of this type becomes a `raw_fields` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportRule {
    Verbatim,
    BoolString,
    NumberString,
    CommaJoined,
    /// `YYYY-MM-DDTHH:MM:SS` in UTC.
    UtcDateTime,
    AttachmentNumber,
}

const TEXT_OPERATORS: &[Operator] = &[
    Operator::Eq,
    Operator::Ne,
    Operator::Contains,
    Operator::StartsWith,
    Operator::EndsWith,
];
const BOOLEAN_OPERATORS: &[Operator] = &[Operator::Eq, Operator::Ne];
const ORDERED_OPERATORS: &[Operator] = &[
    Operator::Eq,
    Operator::Ne,
    Operator::Gt,
    Operator::Gte,
    Operator::Lt,
    Operator::Lte,
];
const SELECT_OPERATORS: &[Operator] = &[Operator::Eq, Operator::Ne, Operator::In, Operator::Nin];
const TAGS_OPERATORS: &[Operator] = &[
    Operator::Eq,
    Operator::Ne,
    Operator::In,
    Operator::Nin,
    Operator::All,
];
const USER_OPERATORS: &[Operator] = &[Operator::Eq, Operator::Ne];

/// Query operators valid for a field type, in display order.
pub fn operators(field_type: FieldType) -> &'static [Operator] {
    match field_type {
        FieldType::String | FieldType::Markdown => TEXT_OPERATORS,
        FieldType::Boolean => BOOLEAN_OPERATORS,
        FieldType::Numeric | FieldType::Datetime => ORDERED_OPERATORS,
        FieldType::Select => SELECT_OPERATORS,
        FieldType::Tags => TAGS_OPERATORS,
        FieldType::User => USER_OPERATORS,
        FieldType::Image => &[],
    }
}

/// Operator preselected when a condition targets a field of this type.
pub fn default_operator(field_type: FieldType) -> Option<Operator> {
    operators(field_type).first().copied()
}

pub fn supports_operator(field_type: FieldType, operator: Operator) -> bool {
    operators(field_type).contains(&operator)
}

pub fn is_filterable(field_type: FieldType) -> bool {
    !operators(field_type).is_empty()
}

/// Options shown in the field definition editor.
pub fn option_keys(field_type: FieldType) -> &'static [OptionKey] {
    match field_type {
        FieldType::String => &[
            OptionKey::StringKind,
            OptionKey::MinLength,
            OptionKey::MaxLength,
        ],
        FieldType::Select => &[OptionKey::SelectValues, OptionKey::ValueMaps],
        FieldType::Datetime => &[OptionKey::DatetimeKind],
        FieldType::Numeric => &[OptionKey::NumericKind, OptionKey::Min, OptionKey::Max],
        FieldType::Image => &[OptionKey::MaxWidth],
        FieldType::Markdown | FieldType::Boolean | FieldType::Tags | FieldType::User => &[],
    }
}

pub fn default_shape(field_type: FieldType) -> DefaultShape {
    match field_type {
        FieldType::String | FieldType::Markdown => DefaultShape::Text,
        FieldType::Boolean => DefaultShape::Bool,
        FieldType::Select => DefaultShape::SelectValue,
        FieldType::Tags => DefaultShape::TagList,
        FieldType::User => DefaultShape::Username,
        FieldType::Datetime => DefaultShape::Datetime,
        FieldType::Numeric => DefaultShape::Number,
        FieldType::Image => DefaultShape::None,
    }
}

pub fn transport(field_type: FieldType) -> TransportRule {
    match field_type {
        FieldType::String | FieldType::Markdown | FieldType::Select | FieldType::User => {
            TransportRule::Verbatim
        }
        FieldType::Boolean => TransportRule::BoolString,
        FieldType::Numeric => TransportRule::NumberString,
        FieldType::Tags => TransportRule::CommaJoined,
        FieldType::Datetime => TransportRule::UtcDateTime,
        FieldType::Image => TransportRule::AttachmentNumber,
    }
}
