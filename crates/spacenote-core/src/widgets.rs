//! Field Config UI dispatch.
//!
//! Each of the three contexts a field appears in gets its own table:
//! defining the field (admin option editors), filling it in (input widget),
//! and showing a stored value (read-only display). The functions here only
//! describe *what* to render; drawing it is up to the front-end.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value as JsonValue};
use std::collections::BTreeMap;

use crate::codec::parse_utc_datetime;
use crate::defaults::API_PREFIX;
use crate::fields::registry::{self, DefaultShape, OptionKey};
use crate::fields::{
    DatetimeKind, FieldSpec, FieldType, NumericKind, RawSpaceField, SpaceField, StringKind,
};
use crate::{Error, Result};

// =============================================================================
// DEFINE: admin option editors
// =============================================================================

/// Control used to edit one option of a field definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "control", rename_all = "snake_case")]
pub enum EditorControl {
    /// Pick one of a fixed set of strings.
    Choice { choices: &'static [&'static str] },
    /// Non-negative integer.
    Count,
    Number,
    /// One entry per line.
    Lines,
    /// JSON object `{map: {value: attribute}}`.
    ValueMaps,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionEditor {
    pub key: OptionKey,
    pub label: &'static str,
    #[serde(flatten)]
    pub control: EditorControl,
}

const STRING_KINDS: &[&str] = &["line", "multiline"];
const DATETIME_KINDS: &[&str] = &["utc", "local", "date"];
const NUMERIC_KINDS: &[&str] = &["int", "float", "decimal"];

fn editor(key: OptionKey) -> OptionEditor {
    let (label, control) = match key {
        OptionKey::StringKind => ("Kind", EditorControl::Choice { choices: STRING_KINDS }),
        OptionKey::MinLength => ("Minimum length", EditorControl::Count),
        OptionKey::MaxLength => ("Maximum length", EditorControl::Count),
        OptionKey::SelectValues => ("Values", EditorControl::Lines),
        OptionKey::ValueMaps => ("Value maps", EditorControl::ValueMaps),
        OptionKey::DatetimeKind => ("Kind", EditorControl::Choice { choices: DATETIME_KINDS }),
        OptionKey::NumericKind => ("Kind", EditorControl::Choice { choices: NUMERIC_KINDS }),
        OptionKey::Min => ("Minimum", EditorControl::Number),
        OptionKey::Max => ("Maximum", EditorControl::Number),
        OptionKey::MaxWidth => ("Maximum width (px)", EditorControl::Count),
    };
    OptionEditor {
        key,
        label,
        control,
    }
}

/// Option editors the field definition form shows for `field_type`.
pub fn definition_editors(field_type: FieldType) -> Vec<OptionEditor> {
    registry::option_keys(field_type)
        .iter()
        .copied()
        .map(editor)
        .collect()
}

/// Field definition as typed into the admin form, before validation.
///
/// Every input is raw text; [`FieldDraft::build_field`] turns it into a
/// checked [`SpaceField`] or explains what is wrong.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDraft {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    pub options: BTreeMap<OptionKey, String>,
    pub default: String,
}

impl FieldDraft {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            options: BTreeMap::new(),
            default: String::new(),
        }
    }

    pub fn option(mut self, key: OptionKey, value: impl Into<String>) -> Self {
        self.options.insert(key, value.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = value.into();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    fn option_value(&self, key: OptionKey, raw: &str) -> Result<JsonValue> {
        let invalid = |what: &str| {
            Error::invalid_field(&self.name, format!("{} {}", key.as_str(), what))
        };
        match key {
            OptionKey::StringKind | OptionKey::DatetimeKind | OptionKey::NumericKind => {
                Ok(json!(raw))
            }
            OptionKey::MinLength | OptionKey::MaxLength | OptionKey::MaxWidth => raw
                .parse::<u32>()
                .map(|n| json!(n))
                .map_err(|_| invalid("must be a non-negative whole number")),
            OptionKey::Min | OptionKey::Max => raw
                .parse::<f64>()
                .map(|n| json!(n))
                .map_err(|_| invalid("must be a number")),
            OptionKey::SelectValues => {
                let values: Vec<&str> = raw
                    .lines()
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .collect();
                Ok(json!(values))
            }
            OptionKey::ValueMaps => serde_json::from_str::<JsonValue>(raw)
                .ok()
                .filter(JsonValue::is_object)
                .ok_or_else(|| invalid("must be a JSON object")),
        }
    }

    fn default_json(&self) -> JsonValue {
        let raw = self.default.trim();
        if raw.is_empty() {
            return JsonValue::Null;
        }
        match registry::default_shape(self.field_type) {
            DefaultShape::TagList => json!(raw
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()),
            _ => json!(raw),
        }
    }

    /// Validate the draft and build the field definition.
    ///
    /// Options that do not belong to the chosen type are ignored, so
    /// switching type in the editor never leaves stale options behind.
    pub fn build_field(&self) -> Result<SpaceField> {
        let allowed = registry::option_keys(self.field_type);
        let mut options = Map::new();
        for (key, raw) in &self.options {
            let raw = raw.trim();
            if raw.is_empty() || !allowed.contains(key) {
                continue;
            }
            options.insert(key.as_str().to_string(), self.option_value(*key, raw)?);
        }

        let raw = RawSpaceField {
            name: self.name.trim().to_string(),
            field_type: self.field_type.as_str().to_string(),
            required: self.required,
            options: JsonValue::Object(options),
            default: self.default_json(),
        };
        let field = SpaceField::try_from(raw)?;
        tracing::debug!(
            subsystem = "schema",
            component = "editor",
            op = "build_field",
            field = %field.name,
            field_type = %field.field_type(),
            "Built field definition"
        );
        Ok(field)
    }
}

// =============================================================================
// FILL: input widgets
// =============================================================================

/// Input shown for a field in note forms.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "widget", rename_all = "snake_case")]
pub enum InputWidget {
    TextInput {
        min_length: Option<usize>,
        max_length: Option<usize>,
    },
    TextArea {
        min_length: Option<usize>,
        max_length: Option<usize>,
    },
    MarkdownEditor,
    Checkbox,
    Select {
        choices: Vec<String>,
    },
    TagsInput,
    UserPicker {
        members: Vec<String>,
    },
    DateTimePicker {
        kind: DatetimeKind,
    },
    NumberInput {
        min: Option<f64>,
        max: Option<f64>,
        /// `None` means any precision.
        step: Option<f64>,
    },
    ImageUpload {
        max_width: Option<u32>,
    },
}

/// Widget for filling in `field`. `members` feeds the user picker.
pub fn input_widget(field: &SpaceField, members: &[String]) -> InputWidget {
    match &field.spec {
        FieldSpec::String { options, .. } => match options.kind {
            StringKind::Line => InputWidget::TextInput {
                min_length: options.min_length,
                max_length: options.max_length,
            },
            StringKind::Multiline => InputWidget::TextArea {
                min_length: options.min_length,
                max_length: options.max_length,
            },
        },
        FieldSpec::Markdown { .. } => InputWidget::MarkdownEditor,
        FieldSpec::Boolean { .. } => InputWidget::Checkbox,
        FieldSpec::Select { options, .. } => InputWidget::Select {
            choices: options.values.clone(),
        },
        FieldSpec::Tags { .. } => InputWidget::TagsInput,
        FieldSpec::User { .. } => InputWidget::UserPicker {
            members: members.to_vec(),
        },
        FieldSpec::Datetime { options, .. } => InputWidget::DateTimePicker { kind: options.kind },
        FieldSpec::Numeric { options, .. } => InputWidget::NumberInput {
            min: options.min,
            max: options.max,
            step: match options.kind {
                NumericKind::Int => Some(1.0),
                NumericKind::Decimal => Some(0.01),
                NumericKind::Float => None,
            },
        },
        FieldSpec::Image { options } => InputWidget::ImageUpload {
            max_width: options.max_width,
        },
        FieldSpec::Unknown { .. } => InputWidget::TextInput {
            min_length: None,
            max_length: None,
        },
    }
}

// =============================================================================
// DISPLAY: read-only values
// =============================================================================

/// Where a value is displayed; needed for image URLs and local times.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayContext {
    pub base_url: String,
    pub space_slug: String,
    pub note_number: i64,
    /// Viewer's UTC offset for `local` datetimes.
    pub offset: FixedOffset,
}

impl DisplayContext {
    pub fn image_url(&self, field: &str) -> String {
        format!(
            "{}/{}/spaces/{}/notes/{}/images/{}",
            self.base_url.trim_end_matches('/'),
            API_PREFIX,
            urlencoding::encode(&self.space_slug),
            self.note_number,
            urlencoding::encode(field)
        )
    }
}

/// Read-only rendering of a stored value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "display", rename_all = "snake_case")]
pub enum DisplayValue {
    Empty,
    Text { text: String },
    Markdown { source: String },
    Badge {
        label: String,
        attributes: BTreeMap<String, String>,
    },
    Chips { items: Vec<String> },
    User { username: String },
    DateTime { text: String },
    Number { text: String },
    Image { url: String },
}

impl std::fmt::Display for DisplayValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("-"),
            Self::Text { text } | Self::DateTime { text } | Self::Number { text } => {
                f.write_str(text)
            }
            Self::Markdown { source } => f.write_str(source),
            Self::Badge { label, .. } => write!(f, "[{}]", label),
            Self::Chips { items } => write!(f, "{}", items.join(" · ")),
            Self::User { username } => write!(f, "@{}", username),
            Self::Image { url } => f.write_str(url),
        }
    }
}

fn as_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn format_datetime(at: DateTime<Utc>, kind: DatetimeKind, offset: FixedOffset) -> String {
    match kind {
        DatetimeKind::Utc => at.format("%Y-%m-%d %H:%M UTC").to_string(),
        DatetimeKind::Local => at.with_timezone(&offset).format("%Y-%m-%d %H:%M").to_string(),
        DatetimeKind::Date => at.format("%Y-%m-%d").to_string(),
    }
}

fn format_number(n: f64, kind: NumericKind) -> String {
    match kind {
        NumericKind::Int => format!("{:.0}", n),
        NumericKind::Decimal => format!("{:.2}", n),
        NumericKind::Float => n.to_string(),
    }
}

/// Read-only display of `value` for `field`.
pub fn display_value(field: &SpaceField, value: &JsonValue, ctx: &DisplayContext) -> DisplayValue {
    if value.is_null() || value.as_str() == Some("") {
        return match field.spec {
            FieldSpec::Boolean { .. } => DisplayValue::Badge {
                label: "false".into(),
                attributes: BTreeMap::new(),
            },
            _ => DisplayValue::Empty,
        };
    }

    match &field.spec {
        FieldSpec::String { .. } | FieldSpec::Unknown { .. } => DisplayValue::Text {
            text: as_text(value),
        },
        FieldSpec::Markdown { .. } => DisplayValue::Markdown {
            source: as_text(value),
        },
        FieldSpec::Boolean { .. } => {
            let on = value.as_bool().unwrap_or_else(|| value.as_str() == Some("true"));
            DisplayValue::Badge {
                label: on.to_string(),
                attributes: BTreeMap::new(),
            }
        }
        FieldSpec::Select { options, .. } => {
            let label = as_text(value);
            DisplayValue::Badge {
                attributes: options.attributes_of(&label),
                label,
            }
        }
        FieldSpec::Tags { .. } => DisplayValue::Chips {
            items: match value {
                JsonValue::Array(items) => items.iter().map(as_text).collect(),
                other => as_text(other)
                    .split(',')
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect(),
            },
        },
        FieldSpec::User { .. } => DisplayValue::User {
            username: as_text(value),
        },
        FieldSpec::Datetime { options, .. } => {
            let raw = as_text(value);
            match parse_utc_datetime(&raw) {
                Ok(at) => DisplayValue::DateTime {
                    text: format_datetime(at, options.kind, ctx.offset),
                },
                Err(_) => DisplayValue::Text { text: raw },
            }
        }
        FieldSpec::Numeric { options, .. } => {
            let parsed = value
                .as_f64()
                .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()));
            match parsed {
                Some(n) => DisplayValue::Number {
                    text: format_number(n, options.kind),
                },
                None => DisplayValue::Text {
                    text: as_text(value),
                },
            }
        }
        FieldSpec::Image { .. } => DisplayValue::Image {
            url: ctx.image_url(&field.name),
        },
    }
}
