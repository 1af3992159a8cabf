//! Field definitions as a sum type.
//!
//! The backend describes a field as `{name, type, required, options, default}`
//! with `options` and `default` shaped by `type`. That shape is checked once,
//! at deserialization, and turned into a [`FieldSpec`] variant carrying typed
//! options and a typed default. Nothing downstream re-inspects raw JSON.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeMap;

use crate::codec::{date_to_utc, parse_utc_datetime};
use crate::{Error, Result};

/// Token resolving to the current user for `user` fields.
pub const ME_TOKEN: &str = "$me";

/// Token resolving to the current time for `datetime` fields.
pub const NOW_TOKEN: &str = "$now";

static EXIF_DEFAULT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\$exif\.created_at:([^|]+)(?:\|(.*))?$").expect("static regex")
});

// =============================================================================
// FIELD TYPE TAG
// =============================================================================

/// Closed set of field type tags understood by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Markdown,
    Boolean,
    Select,
    Tags,
    User,
    Datetime,
    Numeric,
    Image,
}

impl FieldType {
    pub const ALL: [FieldType; 9] = [
        FieldType::String,
        FieldType::Markdown,
        FieldType::Boolean,
        FieldType::Select,
        FieldType::Tags,
        FieldType::User,
        FieldType::Datetime,
        FieldType::Numeric,
        FieldType::Image,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Markdown => "markdown",
            Self::Boolean => "boolean",
            Self::Select => "select",
            Self::Tags => "tags",
            Self::User => "user",
            Self::Datetime => "datetime",
            Self::Numeric => "numeric",
            Self::Image => "image",
        }
    }

    /// Exact tag lookup.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == tag)
    }

    /// Tag lookup that treats anything unrecognised as a plain string field.
    pub fn resolve(tag: &str) -> Self {
        Self::from_tag(tag).unwrap_or_else(|| {
            tracing::debug!(
                subsystem = "schema",
                component = "registry",
                field_type = tag,
                "Unknown field type, treating as string"
            );
            Self::String
        })
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// OPTIONS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StringKind {
    #[default]
    Line,
    Multiline,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StringOptions {
    #[serde(default)]
    pub kind: StringKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericKind {
    Int,
    #[default]
    Float,
    Decimal,
}

impl NumericKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Decimal => "decimal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NumericOptions {
    #[serde(default)]
    pub kind: NumericKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// Allowed values of a select field plus optional named value maps.
///
/// A value map attaches an attribute to each value, e.g.
/// `{"color": {"open": "green", "closed": "gray"}}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectOptions {
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub value_maps: BTreeMap<String, BTreeMap<String, String>>,
}

impl SelectOptions {
    /// Attributes the value maps assign to `value`, keyed by map name.
    pub fn attributes_of(&self, value: &str) -> BTreeMap<String, String> {
        self.value_maps
            .iter()
            .filter_map(|(map, entries)| entries.get(value).map(|v| (map.clone(), v.clone())))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatetimeKind {
    #[default]
    Utc,
    Local,
    Date,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DatetimeOptions {
    #[serde(default)]
    pub kind: DatetimeKind,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_width: Option<u32>,
}

// =============================================================================
// DEFAULTS
// =============================================================================

/// Default of a `user` field.
#[derive(Debug, Clone, PartialEq)]
pub enum UserDefault {
    /// `$me`: whoever fills the form.
    Me,
    Username(String),
}

/// What a datetime field falls back to when its bound image has no EXIF time.
#[derive(Debug, Clone, PartialEq)]
pub enum ExifFallback {
    Now,
    At(DateTime<Utc>),
    None,
}

/// Structured form of `$exif.created_at:<image_field>|<fallback>`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExifBinding {
    pub image_field: String,
    pub fallback: ExifFallback,
}

impl ExifBinding {
    /// Parse the token; returns `Ok(None)` when `token` is not an EXIF default at all.
    pub fn parse(token: &str) -> Result<Option<Self>> {
        let Some(caps) = EXIF_DEFAULT.captures(token) else {
            return Ok(None);
        };
        let image_field = caps[1].trim().to_string();
        let fallback = match caps.get(2).map(|m| m.as_str().trim()) {
            None | Some("") => ExifFallback::None,
            Some(NOW_TOKEN) => ExifFallback::Now,
            Some(literal) => ExifFallback::At(parse_utc_datetime(literal)?),
        };
        Ok(Some(Self {
            image_field,
            fallback,
        }))
    }

    pub fn to_token(&self) -> String {
        match &self.fallback {
            ExifFallback::None => format!("$exif.created_at:{}", self.image_field),
            ExifFallback::Now => format!("$exif.created_at:{}|{}", self.image_field, NOW_TOKEN),
            ExifFallback::At(at) => {
                format!("$exif.created_at:{}|{}", self.image_field, date_to_utc(at))
            }
        }
    }
}

/// Default of a `datetime` field.
#[derive(Debug, Clone, PartialEq)]
pub enum DatetimeDefault {
    Now,
    At(DateTime<Utc>),
    Exif(ExifBinding),
}

impl DatetimeDefault {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw == NOW_TOKEN {
            return Ok(Self::Now);
        }
        if let Some(binding) = ExifBinding::parse(raw)? {
            return Ok(Self::Exif(binding));
        }
        Ok(Self::At(parse_utc_datetime(raw)?))
    }

    pub fn to_token(&self) -> String {
        match self {
            Self::Now => NOW_TOKEN.to_string(),
            Self::At(at) => date_to_utc(at),
            Self::Exif(binding) => binding.to_token(),
        }
    }
}

// =============================================================================
// FIELD SPEC
// =============================================================================

/// Type-specific part of a field definition.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSpec {
    String {
        options: StringOptions,
        default: Option<String>,
    },
    Markdown {
        default: Option<String>,
    },
    Boolean {
        default: Option<bool>,
    },
    Select {
        options: SelectOptions,
        default: Option<String>,
    },
    Tags {
        default: Option<Vec<String>>,
    },
    User {
        default: Option<UserDefault>,
    },
    Datetime {
        options: DatetimeOptions,
        default: Option<DatetimeDefault>,
    },
    Numeric {
        options: NumericOptions,
        default: Option<f64>,
    },
    Image {
        options: ImageOptions,
    },
    /// A type this client does not know yet; handled like a plain string.
    Unknown {
        type_name: String,
        options: JsonValue,
        default: JsonValue,
    },
}

impl FieldSpec {
    /// Tag used for registry lookups. Unknown types report `String`.
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::String { .. } | Self::Unknown { .. } => FieldType::String,
            Self::Markdown { .. } => FieldType::Markdown,
            Self::Boolean { .. } => FieldType::Boolean,
            Self::Select { .. } => FieldType::Select,
            Self::Tags { .. } => FieldType::Tags,
            Self::User { .. } => FieldType::User,
            Self::Datetime { .. } => FieldType::Datetime,
            Self::Numeric { .. } => FieldType::Numeric,
            Self::Image { .. } => FieldType::Image,
        }
    }

    /// Wire tag, preserving the original name of unknown types.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Unknown { type_name, .. } => type_name,
            other => other.field_type().as_str(),
        }
    }

    /// EXIF binding declared by this field's default, if any.
    pub fn exif_binding(&self) -> Option<&ExifBinding> {
        match self {
            Self::Datetime {
                default: Some(DatetimeDefault::Exif(binding)),
                ..
            } => Some(binding),
            _ => None,
        }
    }

    /// Empty spec of the given type, used by the field definition editor.
    pub fn empty(field_type: FieldType) -> Self {
        match field_type {
            FieldType::String => Self::String {
                options: StringOptions::default(),
                default: None,
            },
            FieldType::Markdown => Self::Markdown { default: None },
            FieldType::Boolean => Self::Boolean { default: None },
            FieldType::Select => Self::Select {
                options: SelectOptions::default(),
                default: None,
            },
            FieldType::Tags => Self::Tags { default: None },
            FieldType::User => Self::User { default: None },
            FieldType::Datetime => Self::Datetime {
                options: DatetimeOptions::default(),
                default: None,
            },
            FieldType::Numeric => Self::Numeric {
                options: NumericOptions::default(),
                default: None,
            },
            FieldType::Image => Self::Image {
                options: ImageOptions::default(),
            },
        }
    }
}

/// Definition of one field within a space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSpaceField", into = "RawSpaceField")]
pub struct SpaceField {
    pub name: String,
    pub required: bool,
    pub spec: FieldSpec,
}

impl SpaceField {
    pub fn new(name: impl Into<String>, spec: FieldSpec) -> Self {
        Self {
            name: name.into(),
            required: false,
            spec,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn field_type(&self) -> FieldType {
        self.spec.field_type()
    }

    /// Check cross-option constraints that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_field(&self.name, "name cannot be empty"));
        }
        match &self.spec {
            FieldSpec::String { options, default } => {
                if let (Some(min), Some(max)) = (options.min_length, options.max_length) {
                    if min > max {
                        return Err(Error::invalid_field(
                            &self.name,
                            format!("min_length {} exceeds max_length {}", min, max),
                        ));
                    }
                }
                if let (Some(max), Some(default)) = (options.max_length, default) {
                    if default.chars().count() > max {
                        return Err(Error::invalid_field(
                            &self.name,
                            "default is longer than max_length",
                        ));
                    }
                }
            }
            FieldSpec::Select { options, default } => {
                if let Some(default) = default {
                    if !options.values.contains(default) {
                        return Err(Error::invalid_field(
                            &self.name,
                            format!("default '{}' is not one of the select values", default),
                        ));
                    }
                }
                for (map, entries) in &options.value_maps {
                    if let Some(stray) = entries.keys().find(|k| !options.values.contains(k)) {
                        return Err(Error::invalid_field(
                            &self.name,
                            format!("value map '{}' references unknown value '{}'", map, stray),
                        ));
                    }
                }
            }
            FieldSpec::Numeric { options, default } => {
                if let (Some(min), Some(max)) = (options.min, options.max) {
                    if min > max {
                        return Err(Error::invalid_field(
                            &self.name,
                            format!("min {} exceeds max {}", min, max),
                        ));
                    }
                }
                if let Some(value) = default {
                    if options.kind == NumericKind::Int && value.fract() != 0.0 {
                        return Err(Error::invalid_field(
                            &self.name,
                            "default of an int field must be a whole number",
                        ));
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}

// =============================================================================
// WIRE SHAPE
// =============================================================================

/// Field definition exactly as the API sends it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSpaceField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub options: JsonValue,
    #[serde(default)]
    pub default: JsonValue,
}

fn options_from<T: DeserializeOwned + Default>(name: &str, value: JsonValue) -> Result<T> {
    match value {
        JsonValue::Null => Ok(T::default()),
        JsonValue::Object(ref map) if map.is_empty() => Ok(T::default()),
        other => serde_json::from_value(other)
            .map_err(|e| Error::invalid_field(name, format!("options: {}", e))),
    }
}

fn string_default(name: &str, value: &JsonValue) -> Result<Option<String>> {
    match value {
        JsonValue::Null => Ok(None),
        JsonValue::String(s) => Ok(Some(s.clone())),
        other => Err(Error::invalid_field(
            name,
            format!("default must be a string, got {}", other),
        )),
    }
}

fn bool_default(name: &str, value: &JsonValue) -> Result<Option<bool>> {
    match value {
        JsonValue::Null => Ok(None),
        JsonValue::Bool(b) => Ok(Some(*b)),
        JsonValue::String(s) if s == "true" => Ok(Some(true)),
        JsonValue::String(s) if s == "false" => Ok(Some(false)),
        other => Err(Error::invalid_field(
            name,
            format!("default must be a boolean, got {}", other),
        )),
    }
}

fn numeric_default(name: &str, value: &JsonValue) -> Result<Option<f64>> {
    match value {
        JsonValue::Null => Ok(None),
        JsonValue::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| Error::invalid_field(name, "default is not representable")),
        JsonValue::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| Error::invalid_field(name, format!("default '{}' is not a number", s))),
        other => Err(Error::invalid_field(
            name,
            format!("default must be a number, got {}", other),
        )),
    }
}

fn tags_default(name: &str, value: &JsonValue) -> Result<Option<Vec<String>>> {
    match value {
        JsonValue::Null => Ok(None),
        JsonValue::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    Error::invalid_field(name, "tags default must contain only strings")
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Some),
        JsonValue::String(s) => Ok(Some(
            s.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        )),
        other => Err(Error::invalid_field(
            name,
            format!("default must be a list of tags, got {}", other),
        )),
    }
}

impl TryFrom<RawSpaceField> for SpaceField {
    type Error = Error;

    fn try_from(raw: RawSpaceField) -> Result<Self> {
        let name = raw.name;
        let spec = match FieldType::from_tag(&raw.field_type) {
            Some(FieldType::String) => FieldSpec::String {
                options: options_from(&name, raw.options)?,
                default: string_default(&name, &raw.default)?,
            },
            Some(FieldType::Markdown) => FieldSpec::Markdown {
                default: string_default(&name, &raw.default)?,
            },
            Some(FieldType::Boolean) => FieldSpec::Boolean {
                default: bool_default(&name, &raw.default)?,
            },
            Some(FieldType::Select) => FieldSpec::Select {
                options: options_from(&name, raw.options)?,
                default: string_default(&name, &raw.default)?,
            },
            Some(FieldType::Tags) => FieldSpec::Tags {
                default: tags_default(&name, &raw.default)?,
            },
            Some(FieldType::User) => FieldSpec::User {
                default: string_default(&name, &raw.default)?.map(|s| {
                    if s == ME_TOKEN {
                        UserDefault::Me
                    } else {
                        UserDefault::Username(s)
                    }
                }),
            },
            Some(FieldType::Datetime) => FieldSpec::Datetime {
                options: options_from(&name, raw.options)?,
                default: string_default(&name, &raw.default)?
                    .map(|s| DatetimeDefault::parse(&s))
                    .transpose()
                    .map_err(|e| Error::invalid_field(&name, e.message()))?,
            },
            Some(FieldType::Numeric) => FieldSpec::Numeric {
                options: options_from(&name, raw.options)?,
                default: numeric_default(&name, &raw.default)?,
            },
            Some(FieldType::Image) => {
                if !raw.default.is_null() {
                    return Err(Error::invalid_field(&name, "image fields take no default"));
                }
                FieldSpec::Image {
                    options: options_from(&name, raw.options)?,
                }
            }
            None => {
                tracing::debug!(
                    subsystem = "schema",
                    component = "spec",
                    field = %name,
                    field_type = %raw.field_type,
                    "Keeping field of unknown type as string-like"
                );
                FieldSpec::Unknown {
                    type_name: raw.field_type,
                    options: raw.options,
                    default: raw.default,
                }
            }
        };

        let field = SpaceField {
            name,
            required: raw.required,
            spec,
        };
        field.validate()?;
        Ok(field)
    }
}

fn to_json<T: Serialize>(value: &T) -> JsonValue {
    serde_json::to_value(value).unwrap_or(JsonValue::Null)
}

impl From<SpaceField> for RawSpaceField {
    fn from(field: SpaceField) -> Self {
        let field_type = field.spec.type_name().to_string();
        let (options, default) = match field.spec {
            FieldSpec::String { options, default } => (to_json(&options), json!(default)),
            FieldSpec::Markdown { default } => (json!({}), json!(default)),
            FieldSpec::Boolean { default } => (json!({}), json!(default)),
            FieldSpec::Select { options, default } => (to_json(&options), json!(default)),
            FieldSpec::Tags { default } => (json!({}), json!(default)),
            FieldSpec::User { default } => (
                json!({}),
                match default {
                    Some(UserDefault::Me) => json!(ME_TOKEN),
                    Some(UserDefault::Username(u)) => json!(u),
                    None => JsonValue::Null,
                },
            ),
            FieldSpec::Datetime { options, default } => (
                to_json(&options),
                default.map_or(JsonValue::Null, |d| json!(d.to_token())),
            ),
            FieldSpec::Numeric { options, default } => (to_json(&options), json!(default)),
            FieldSpec::Image { options } => (to_json(&options), JsonValue::Null),
            FieldSpec::Unknown {
                options, default, ..
            } => (options, default),
        };
        RawSpaceField {
            name: field.name,
            field_type,
            required: field.required,
            options,
            default,
        }
    }
}
