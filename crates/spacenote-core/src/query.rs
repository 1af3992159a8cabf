//! Compact filter-condition grammar used in the `q` URL parameter.
//!
//! A query is a comma-separated list of `field:operator:value` conditions.
//! The value may itself contain colons (everything after the second colon
//! is rejoined) but never commas; list operators (`in`, `nin`, `all`) pack
//! several values into the single slot separated by `|`.
//!
//! ```
//! use spacenote_core::query::{build_query_string, parse_query, Operator};
//!
//! let conditions = parse_query("note.fields.status:in:open|blocked,note.number:gt:10");
//! assert_eq!(conditions[0].operator, Some(Operator::In));
//! assert_eq!(
//!     build_query_string(&conditions).as_deref(),
//!     Some("note.fields.status:in:open|blocked,note.number:gt:10")
//! );
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;

use crate::defaults::{CONDITION_SEPARATOR, LIST_VALUE_SEPARATOR, TOKEN_SEPARATOR};
use crate::fields::FieldType;
use crate::Error;

// =============================================================================
// OPERATORS
// =============================================================================

/// Comparison operator of a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
    Contains,
    StartsWith,
    EndsWith,
    All,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::In => "in",
            Self::Nin => "nin",
            Self::Contains => "contains",
            Self::StartsWith => "startswith",
            Self::EndsWith => "endswith",
            Self::All => "all",
        }
    }

    /// Short symbol shown on condition badges.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "≠",
            Self::Gt => ">",
            Self::Gte => "≥",
            Self::Lt => "<",
            Self::Lte => "≤",
            Self::In => ":",
            Self::Nin => "∉",
            Self::Contains => "~",
            Self::StartsWith => "^",
            Self::EndsWith => "$",
            Self::All => "∋",
        }
    }

    /// Operators whose value is a `|`-separated list.
    pub fn is_list(&self) -> bool {
        matches!(self, Self::In | Self::Nin | Self::All)
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eq" => Ok(Self::Eq),
            "ne" => Ok(Self::Ne),
            "gt" => Ok(Self::Gt),
            "gte" => Ok(Self::Gte),
            "lt" => Ok(Self::Lt),
            "lte" => Ok(Self::Lte),
            "in" => Ok(Self::In),
            "nin" => Ok(Self::Nin),
            "contains" => Ok(Self::Contains),
            "startswith" => Ok(Self::StartsWith),
            "endswith" => Ok(Self::EndsWith),
            "all" => Ok(Self::All),
            other => Err(Error::InvalidQuery(format!("unknown operator '{}'", other))),
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// FIELD PATHS
// =============================================================================

/// Built-in note attributes addressable as `note.<name>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemField {
    Number,
    Author,
    CreatedAt,
    EditedAt,
    ActivityAt,
}

impl SystemField {
    pub const ALL: [SystemField; 5] = [
        SystemField::Number,
        SystemField::Author,
        SystemField::CreatedAt,
        SystemField::EditedAt,
        SystemField::ActivityAt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Author => "author",
            Self::CreatedAt => "created_at",
            Self::EditedAt => "edited_at",
            Self::ActivityAt => "activity_at",
        }
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Number => FieldType::Numeric,
            Self::Author => FieldType::User,
            Self::CreatedAt | Self::EditedAt | Self::ActivityAt => FieldType::Datetime,
        }
    }
}

const NOTE_PREFIX: &str = "note.";
const CUSTOM_PREFIX: &str = "note.fields.";

/// Target of a condition or sort key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldPath {
    System(SystemField),
    Custom(String),
    /// Anything else; passed through untouched.
    Other(String),
}

impl FieldPath {
    pub fn parse(path: &str) -> Self {
        if let Some(name) = path.strip_prefix(CUSTOM_PREFIX) {
            return Self::Custom(name.to_string());
        }
        if let Some(name) = path.strip_prefix(NOTE_PREFIX) {
            if let Some(system) = SystemField::ALL.iter().find(|s| s.as_str() == name) {
                return Self::System(*system);
            }
        }
        Self::Other(path.to_string())
    }

    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }

    pub fn as_path(&self) -> String {
        match self {
            Self::System(system) => format!("{}{}", NOTE_PREFIX, system.as_str()),
            Self::Custom(name) => format!("{}{}", CUSTOM_PREFIX, name),
            Self::Other(raw) => raw.clone(),
        }
    }

    /// Name shown to users, without the `note.` / `note.fields.` prefix.
    pub fn display_name(&self) -> &str {
        match self {
            Self::System(system) => system.as_str(),
            Self::Custom(name) => name,
            Self::Other(raw) => raw,
        }
    }
}

impl std::fmt::Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_path())
    }
}

/// One `field[:operator[:value]]` condition.
///
/// `operator` is `None` when the text named an operator this client does
/// not know, or named none at all with an empty slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryCondition {
    pub field: String,
    pub operator: Option<Operator>,
    pub value: String,
}

impl QueryCondition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator: Some(operator),
            value: value.into(),
        }
    }

    /// Has field, operator and value.
    pub fn is_complete(&self) -> bool {
        !self.field.is_empty() && self.operator.is_some() && !self.value.is_empty()
    }

    pub fn path(&self) -> FieldPath {
        FieldPath::parse(&self.field)
    }

    /// Human-readable badge text such as `status = open`.
    pub fn badge(&self) -> String {
        let symbol = self.operator.map_or("?", |op| op.symbol());
        format!("{} {} {}", self.path().display_name(), symbol, self.value)
    }
}

/// Parse a single condition. A missing operator slot defaults to `eq`.
pub fn parse_condition(segment: &str) -> QueryCondition {
    let mut tokens = segment.split(TOKEN_SEPARATOR);
    let field = tokens.next().unwrap_or_default().to_string();
    let operator = match tokens.next() {
        None => Some(Operator::Eq),
        Some(token) => match token.parse::<Operator>() {
            Ok(op) => Some(op),
            Err(_) => {
                tracing::debug!(
                    subsystem = "query",
                    component = "grammar",
                    operator = token,
                    "Unrecognised operator in condition"
                );
                None
            }
        },
    };
    let value = tokens
        .collect::<Vec<_>>()
        .join(TOKEN_SEPARATOR.to_string().as_str());
    QueryCondition {
        field,
        operator,
        value,
    }
}

/// Parse a full `q` string. Empty segments are skipped.
pub fn parse_query(query: &str) -> Vec<QueryCondition> {
    query
        .split(CONDITION_SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .map(parse_condition)
        .collect()
}

/// Serialize one condition, or `None` when it is incomplete or unencodable.
pub fn serialize_condition(condition: &QueryCondition) -> Option<String> {
    let operator = condition.operator?;
    if condition.field.is_empty() || condition.value.is_empty() {
        return None;
    }
    if condition.value.contains(CONDITION_SEPARATOR) || condition.field.contains(TOKEN_SEPARATOR)
    {
        tracing::warn!(
            subsystem = "query",
            component = "grammar",
            field = %condition.field,
            "Dropping condition that cannot be encoded"
        );
        return None;
    }
    Some(format!(
        "{}{sep}{}{sep}{}",
        condition.field,
        operator.as_str(),
        condition.value,
        sep = TOKEN_SEPARATOR
    ))
}

/// Serialize conditions for the `q` parameter.
///
/// Returns `None` when nothing survives, meaning the parameter should be
/// removed rather than set to an empty string.
pub fn build_query_string(conditions: &[QueryCondition]) -> Option<String> {
    let parts: Vec<String> = conditions.iter().filter_map(serialize_condition).collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(CONDITION_SEPARATOR.to_string().as_str()))
    }
}

/// Split a list value (`a|b|c`) into its items.
pub fn split_list_value(value: &str) -> Vec<String> {
    value
        .split(LIST_VALUE_SEPARATOR)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_list_value<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(AsRef::as_ref)
        .filter(|item| !item.is_empty())
        .collect::<Vec<_>>()
        .join(LIST_VALUE_SEPARATOR.to_string().as_str())
}

// =============================================================================
// PERSISTED FILTERS
// =============================================================================

/// Condition of a saved filter, as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: JsonValue,
}

impl FilterCondition {
    /// Convert to the compact grammar; JSON arrays become `|`-joined lists.
    pub fn to_query_condition(&self) -> QueryCondition {
        let value = match &self.value {
            JsonValue::Null => String::new(),
            JsonValue::String(s) => s.clone(),
            JsonValue::Array(items) => {
                let items: Vec<String> = items.iter().map(json_scalar).collect();
                join_list_value(&items)
            }
            other => json_scalar(other),
        };
        QueryCondition {
            field: self.field.clone(),
            operator: Some(self.operator),
            value,
        }
    }
}

fn json_scalar(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

/// Sort key of a saved filter; a `-` prefix means descending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub path: FieldPath,
    pub descending: bool,
}

impl SortKey {
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix('-') {
            Some(rest) => Self {
                path: FieldPath::parse(rest),
                descending: true,
            },
            None => Self {
                path: FieldPath::parse(raw),
                descending: false,
            },
        }
    }

    pub fn to_token(&self) -> String {
        if self.descending {
            format!("-{}", self.path.as_path())
        } else {
            self.path.as_path()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_condition_basic() {
        let c = parse_condition("note.fields.status:eq:open");
        assert_eq!(c, QueryCondition::new("note.fields.status", Operator::Eq, "open"));
    }

    #[test]
    fn test_parse_condition_value_with_colons() {
        let c = parse_condition("note.created_at:gte:2024-01-01T10:00:00");
        assert_eq!(c.operator, Some(Operator::Gte));
        assert_eq!(c.value, "2024-01-01T10:00:00");
    }

    #[test]
    fn test_parse_condition_defaults_operator() {
        let c = parse_condition("note.number");
        assert_eq!(c.operator, Some(Operator::Eq));
        assert_eq!(c.value, "");
        assert!(!c.is_complete());
    }

    #[test]
    fn test_parse_condition_unknown_operator() {
        let c = parse_condition("note.number:between:1");
        assert_eq!(c.operator, None);
        assert_eq!(serialize_condition(&c), None);
    }

    #[test]
    fn test_condition_round_trip() {
        let conditions = [
            QueryCondition::new("note.fields.title", Operator::Contains, "a:b"),
            QueryCondition::new("note.fields.labels", Operator::All, "x|y|z"),
            QueryCondition::new("note.author", Operator::Ne, "bob"),
            QueryCondition::new("note.fields.price", Operator::Lte, "9.5"),
        ];
        for c in conditions {
            let encoded = serialize_condition(&c).unwrap();
            assert_eq!(parse_condition(&encoded), c);
        }
    }

    #[test]
    fn test_build_query_string_empty_is_none() {
        assert_eq!(build_query_string(&[]), None);
        assert_eq!(
            build_query_string(&[QueryCondition::default()]),
            None
        );
    }

    #[test]
    fn test_build_query_string_drops_incomplete() {
        let conditions = vec![
            QueryCondition::new("note.fields.status", Operator::In, "open|blocked"),
            QueryCondition::new("", Operator::Eq, "x"),
            QueryCondition::new("note.number", Operator::Gt, ""),
            QueryCondition {
                field: "note.author".into(),
                operator: None,
                value: "bob".into(),
            },
            QueryCondition::new("note.fields.tags", Operator::Nin, "old"),
        ];
        let q = build_query_string(&conditions).unwrap();
        assert_eq!(q, "note.fields.status:in:open|blocked,note.fields.tags:nin:old");
        assert_eq!(parse_query(&q), vec![conditions[0].clone(), conditions[4].clone()]);
    }

    #[test]
    fn test_value_with_comma_dropped() {
        let c = QueryCondition::new("note.fields.title", Operator::Eq, "a,b");
        assert_eq!(serialize_condition(&c), None);
    }

    #[test]
    fn test_parse_query_skips_empty_segments() {
        let parsed = parse_query(",note.number:gt:3,,");
        assert_eq!(parsed, vec![QueryCondition::new("note.number", Operator::Gt, "3")]);
        assert!(parse_query("").is_empty());
    }

    #[test]
    fn test_operator_symbols() {
        let expected = [
            (Operator::Eq, "="),
            (Operator::Ne, "≠"),
            (Operator::Gt, ">"),
            (Operator::Gte, "≥"),
            (Operator::Lt, "<"),
            (Operator::Lte, "≤"),
            (Operator::In, ":"),
            (Operator::Nin, "∉"),
            (Operator::Contains, "~"),
            (Operator::StartsWith, "^"),
            (Operator::EndsWith, "$"),
            (Operator::All, "∋"),
        ];
        for (op, symbol) in expected {
            assert_eq!(op.symbol(), symbol);
            assert_eq!(op.as_str().parse::<Operator>().unwrap(), op);
        }
    }

    #[test]
    fn test_field_path_parsing() {
        assert_eq!(
            FieldPath::parse("note.created_at"),
            FieldPath::System(SystemField::CreatedAt)
        );
        assert_eq!(
            FieldPath::parse("note.fields.status"),
            FieldPath::Custom("status".into())
        );
        assert_eq!(
            FieldPath::parse("note.unknown"),
            FieldPath::Other("note.unknown".into())
        );
        assert_eq!(FieldPath::parse("note.fields.status").display_name(), "status");
        assert_eq!(FieldPath::parse("note.activity_at").display_name(), "activity_at");
        assert_eq!(FieldPath::custom("due").as_path(), "note.fields.due");
    }

    #[test]
    fn test_badge() {
        let c = QueryCondition::new("note.fields.labels", Operator::All, "a|b");
        assert_eq!(c.badge(), "labels ∋ a|b");
    }

    #[test]
    fn test_filter_condition_list_value() {
        let condition: FilterCondition = serde_json::from_value(json!({
            "field": "note.fields.status",
            "operator": "nin",
            "value": ["done", "archived"]
        }))
        .unwrap();
        assert_eq!(
            condition.to_query_condition(),
            QueryCondition::new("note.fields.status", Operator::Nin, "done|archived")
        );

        let numeric = FilterCondition {
            field: "note.number".into(),
            operator: Operator::Gte,
            value: json!(10),
        };
        assert_eq!(numeric.to_query_condition().value, "10");
    }

    #[test]
    fn test_list_value_helpers() {
        assert_eq!(split_list_value("a|b||c"), vec!["a", "b", "c"]);
        assert_eq!(join_list_value(&["a", "", "b"]), "a|b");
        assert!(split_list_value("").is_empty());
    }

    #[test]
    fn test_sort_key() {
        let key = SortKey::parse("-note.created_at");
        assert!(key.descending);
        assert_eq!(key.path, FieldPath::System(SystemField::CreatedAt));
        assert_eq!(key.to_token(), "-note.created_at");
        assert!(!SortKey::parse("note.fields.priority").descending);
    }
}
