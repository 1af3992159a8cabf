//! Core data models for SpaceNote.
//!
//! These types mirror the JSON the backend exchanges and are shared by the
//! form machinery, the client and the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::codec::{parse_utc_datetime, utc_datetime, RawFields};
use crate::fields::{SpaceField, SpaceSchema};
use crate::query::{FilterCondition, QueryCondition, SortKey};
use crate::Error;

// =============================================================================
// USERS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "utc_datetime::option::deserialize"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

/// The logged-in user as returned by the profile endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
}

// =============================================================================
// SPACES
// =============================================================================

/// Named, reusable query definition of a space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub name: String,
    #[serde(default)]
    pub default_columns: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<FilterCondition>,
    #[serde(default)]
    pub sort: Vec<String>,
}

impl Filter {
    pub fn query_conditions(&self) -> Vec<QueryCondition> {
        self.conditions
            .iter()
            .map(FilterCondition::to_query_condition)
            .collect()
    }

    pub fn sort_keys(&self) -> Vec<SortKey> {
        self.sort.iter().map(|s| SortKey::parse(s)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub fields: Vec<SpaceField>,
    #[serde(default)]
    pub filters: Vec<Filter>,
    /// Template name to template source (Liquid / React-live, rendered elsewhere).
    #[serde(default)]
    pub templates: BTreeMap<String, String>,
    /// Fields left out of the create-note form.
    #[serde(default)]
    pub hidden_fields_on_create: Vec<String>,
}

impl Space {
    pub fn schema(&self) -> SpaceSchema {
        SpaceSchema::new(self.fields.clone())
    }

    pub fn filter(&self, name: &str) -> Option<&Filter> {
        self.filters.iter().find(|f| f.name == name)
    }

    pub fn is_member(&self, username: &str) -> bool {
        self.members.iter().any(|m| m == username)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSpaceRequest {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSpaceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden_fields_on_create: Option<Vec<String>>,
}

// =============================================================================
// NOTES & COMMENTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub space_slug: String,
    pub number: i64,
    pub author: String,
    #[serde(deserialize_with = "utc_datetime::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "utc_datetime::option::deserialize"
    )]
    pub edited_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "utc_datetime::option::deserialize"
    )]
    pub activity_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fields: Map<String, JsonValue>,
}

static NULL: JsonValue = JsonValue::Null;

impl Note {
    pub fn field(&self, name: &str) -> &JsonValue {
        self.fields.get(name).unwrap_or(&NULL)
    }
}

/// One page of a note listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotesPage {
    pub items: Vec<Note>,
    pub total: u64,
    pub limit: u32,
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NotePayload {
    pub raw_fields: RawFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub space_slug: String,
    pub note_number: i64,
    pub number: i64,
    pub author: String,
    pub content: String,
    #[serde(deserialize_with = "utc_datetime::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "utc_datetime::option::deserialize"
    )]
    pub edited_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_number: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommentPayload {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_number: Option<i64>,
}

/// Display mode of the note detail page (`view` URL parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteView {
    #[default]
    Default,
    Template,
    Json,
}

impl NoteView {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Template => "template",
            Self::Json => "json",
        }
    }
}

impl FromStr for NoteView {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "default" => Ok(Self::Default),
            "template" => Ok(Self::Template),
            "json" => Ok(Self::Json),
            other => Err(Error::BadRequest(format!("unknown view '{}'", other))),
        }
    }
}

// =============================================================================
// ATTACHMENTS
// =============================================================================

/// Image facts extracted server-side from an upload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exif_created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AttachmentMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageMeta>,
}

impl AttachmentMeta {
    /// EXIF capture time, if present and parseable.
    pub fn exif_created_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.image.as_ref()?.exif_created_at.as_deref()?;
        match parse_utc_datetime(raw) {
            Ok(at) => Some(at),
            Err(_) => {
                tracing::warn!(
                    subsystem = "forms",
                    component = "exif",
                    value = raw,
                    "Ignoring unparseable EXIF timestamp"
                );
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub space_slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_number: Option<i64>,
    pub number: i64,
    pub author: String,
    pub filename: String,
    pub size: u64,
    pub mime_type: String,
    #[serde(deserialize_with = "utc_datetime::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub meta: AttachmentMeta,
}

/// Upload made before its note exists; referenced by number from image fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAttachment {
    pub number: i64,
    pub author: String,
    pub filename: String,
    pub size: u64,
    pub mime_type: String,
    #[serde(deserialize_with = "utc_datetime::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub meta: AttachmentMeta,
}
