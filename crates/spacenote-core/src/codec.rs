//! Form value codec.
//!
//! Forms hold typed [`FormValue`]s; the backend's `raw_fields` map only
//! carries strings. Encoding turns every value into a string or omits it.
//! Decoding goes the other way when a form is populated from an existing
//! note. Datetimes always travel as UTC without a zone suffix.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};

use crate::fields::{registry, FieldSpec, TransportRule};
use crate::{Error, Result};

/// Wire format of field values: field name to string.
pub type RawFields = BTreeMap<String, String>;

/// In-memory values of a form, keyed by field name.
pub type FormValues = BTreeMap<String, FormValue>;

/// Typed value held by a form while the user edits it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FormValue {
    #[default]
    Empty,
    Text(String),
    Bool(bool),
    Number(f64),
    List(Vec<String>),
    DateTime(DateTime<Utc>),
    /// Number of an uploaded (possibly still pending) attachment.
    Attachment(i64),
}

impl FormValue {
    /// True for values that encode to nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            FormValue::Empty => true,
            FormValue::Text(s) => s.is_empty(),
            FormValue::List(items) => items.is_empty(),
            FormValue::Number(n) => !n.is_finite(),
            _ => false,
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        FormValue::Text(value.into())
    }

    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FormValue::List(items.into_iter().map(Into::into).collect())
    }
}

/// Format an instant as `YYYY-MM-DDTHH:MM:SS` using its UTC components.
///
/// The input zone is irrelevant: a value picked as 10:00 at +03:00 is sent
/// as 07:00.
pub fn date_to_utc<Tz: TimeZone>(value: &DateTime<Tz>) -> String {
    value
        .with_timezone(&Utc)
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
}

/// Parse a datetime coming from the API or a default.
///
/// Strings without a zone suffix are UTC (`Z` is appended before parsing).
/// A space between date and time is accepted, as are minute precision and
/// bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_utc_datetime(raw: &str) -> Result<DateTime<Utc>> {
    let normalized = raw.trim().replacen(' ', "T", 1);
    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(&format!("{}Z", normalized)) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(&normalized, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(Error::Validation(format!("invalid datetime '{}'", raw)))
}

/// Serde adapter for API datetimes, which arrive without a zone suffix.
///
/// Use with `#[serde(deserialize_with = "utc_datetime::deserialize")]`.
/// Serialization stays chrono's RFC 3339, which this adapter also reads.
pub mod utc_datetime {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_utc_datetime(&raw).map_err(serde::de::Error::custom)
    }

    /// Optional variant; `null` and a missing key both give `None`.
    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer};

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) if !raw.trim().is_empty() => crate::codec::parse_utc_datetime(&raw)
                    .map(Some)
                    .map_err(serde::de::Error::custom),
                _ => Ok(None),
            }
        }
    }
}

/// Encode one value for transport. `None` means "leave the key out".
pub fn encode(value: &FormValue) -> Option<String> {
    match value {
        FormValue::Empty => None,
        FormValue::Text(s) if s.is_empty() => None,
        FormValue::Text(s) => Some(s.clone()),
        FormValue::Bool(b) => Some(b.to_string()),
        FormValue::Number(n) if !n.is_finite() => None,
        FormValue::Number(n) => Some(n.to_string()),
        FormValue::List(items) if items.is_empty() => None,
        FormValue::List(items) => Some(items.join(",")),
        FormValue::DateTime(dt) => Some(date_to_utc(dt)),
        FormValue::Attachment(number) => Some(number.to_string()),
    }
}

fn scalar_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Decode a stored field value (API JSON or an encoded string) into a form value.
///
/// The shape is chosen by the type's transport rule, so decoding mirrors
/// how [`encode`] sends each type.
pub fn decode(spec: &FieldSpec, value: &JsonValue) -> FormValue {
    let rule = registry::transport(spec.field_type());
    if value.is_null() {
        return match rule {
            TransportRule::BoolString => FormValue::Bool(false),
            _ => FormValue::Empty,
        };
    }

    match rule {
        TransportRule::Verbatim => scalar_text(value)
            .map(FormValue::Text)
            .unwrap_or_else(|| FormValue::Text(value.to_string())),
        TransportRule::BoolString => match value {
            JsonValue::Bool(b) => FormValue::Bool(*b),
            JsonValue::String(s) => FormValue::Bool(s == "true"),
            _ => FormValue::Bool(false),
        },
        TransportRule::CommaJoined => match value {
            JsonValue::Array(items) => {
                FormValue::List(items.iter().filter_map(scalar_text).collect())
            }
            JsonValue::String(s) if s.is_empty() => FormValue::List(Vec::new()),
            JsonValue::String(s) => FormValue::List(s.split(',').map(str::to_string).collect()),
            _ => FormValue::List(Vec::new()),
        },
        TransportRule::UtcDateTime => match value.as_str() {
            Some(s) if s.is_empty() => FormValue::Empty,
            Some(s) => match parse_utc_datetime(s) {
                Ok(dt) => FormValue::DateTime(dt),
                Err(_) => {
                    tracing::warn!(
                        subsystem = "forms",
                        component = "codec",
                        value = s,
                        "Stored datetime does not parse, keeping raw text"
                    );
                    FormValue::Text(s.to_string())
                }
            },
            None => FormValue::Empty,
        },
        TransportRule::NumberString => match value {
            JsonValue::Number(n) => n.as_f64().map_or(FormValue::Empty, FormValue::Number),
            JsonValue::String(s) if s.trim().is_empty() => FormValue::Empty,
            JsonValue::String(s) => s
                .trim()
                .parse::<f64>()
                .map(FormValue::Number)
                .unwrap_or_else(|_| FormValue::Text(s.clone())),
            _ => FormValue::Empty,
        },
        TransportRule::AttachmentNumber => match value {
            JsonValue::Number(n) => n.as_i64().map_or(FormValue::Empty, FormValue::Attachment),
            JsonValue::String(s) => s
                .parse::<i64>()
                .map(FormValue::Attachment)
                .unwrap_or(FormValue::Empty),
            _ => FormValue::Empty,
        },
    }
}

/// Encode every non-empty value (create semantics).
pub fn encode_fields(values: &FormValues) -> RawFields {
    values
        .iter()
        .filter_map(|(name, value)| encode(value).map(|encoded| (name.clone(), encoded)))
        .collect()
}

/// Encode only values whose encoding differs from the original (edit semantics).
///
/// A field the user cleared is sent as an empty string so the backend can
/// clear it; untouched fields never appear.
pub fn diff_fields(original: &FormValues, current: &FormValues) -> RawFields {
    let names: BTreeSet<&String> = original.keys().chain(current.keys()).collect();
    let mut changed = RawFields::new();
    for name in names {
        let before = original.get(name).and_then(encode);
        let after = current.get(name).and_then(encode);
        if before != after {
            tracing::trace!(
                subsystem = "forms",
                component = "codec",
                field = %name,
                "Field changed"
            );
            changed.insert(name.clone(), after.unwrap_or_default());
        }
    }
    changed
}
