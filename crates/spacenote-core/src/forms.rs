//! Note and comment form state.
//!
//! A [`NoteForm`] owns the typed values of one create or edit form. It
//! resolves defaults when opened, applies EXIF bindings when an image is
//! attached, and produces the `raw_fields` payload on submit: every
//! non-empty value when creating, only changed values when editing.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use crate::codec::{decode, diff_fields, encode_fields, FormValue, FormValues};
use crate::fields::{FieldType, SpaceField, SpaceSchema};
use crate::models::{Comment, CommentPayload, Note, NotePayload, PendingAttachment, Space};
use crate::resolver::{apply_exif_bindings, initial_values, ResolveContext};
use crate::validation::{validate_values, FieldError};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit { number: i64 },
}

#[derive(Debug, Clone)]
pub struct NoteForm {
    space_slug: String,
    schema: SpaceSchema,
    /// Fields shown in this form, in schema order.
    visible: Vec<String>,
    mode: FormMode,
    original: FormValues,
    values: FormValues,
    opened_at: DateTime<Utc>,
}

impl NoteForm {
    /// Blank form with resolved defaults. Fields hidden on create are left out.
    pub fn create(space: &Space, ctx: &ResolveContext) -> Self {
        let schema = space.schema();
        let shown: Vec<&SpaceField> = schema
            .fields()
            .iter()
            .filter(|f| !space.hidden_fields_on_create.contains(&f.name))
            .collect();
        let values = initial_values(shown.iter().copied(), ctx);
        let visible = shown.iter().map(|f| f.name.clone()).collect();

        tracing::debug!(
            subsystem = "forms",
            component = "note_form",
            op = "create",
            space = %space.slug,
            fields = values.len(),
            "Opened create form"
        );

        Self {
            space_slug: space.slug.clone(),
            schema,
            visible,
            mode: FormMode::Create,
            original: values.clone(),
            values,
            opened_at: ctx.now,
        }
    }

    /// Form pre-filled from an existing note. `ctx.now` backs `$now`
    /// fallbacks of EXIF bindings applied while editing.
    pub fn edit(space: &Space, note: &Note, ctx: &ResolveContext) -> Self {
        let schema = space.schema();
        let values: FormValues = schema
            .fields()
            .iter()
            .map(|f| (f.name.clone(), decode(&f.spec, note.field(&f.name))))
            .collect();
        let visible = schema.fields().iter().map(|f| f.name.clone()).collect();

        tracing::debug!(
            subsystem = "forms",
            component = "note_form",
            op = "edit",
            space = %space.slug,
            note_number = note.number,
            "Opened edit form"
        );

        Self {
            space_slug: space.slug.clone(),
            schema,
            visible,
            mode: FormMode::Edit {
                number: note.number,
            },
            original: values.clone(),
            values,
            opened_at: ctx.now,
        }
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn space_slug(&self) -> &str {
        &self.space_slug
    }

    pub fn fields(&self) -> impl Iterator<Item = &SpaceField> {
        self.visible
            .iter()
            .filter_map(|name| self.schema.field(name))
    }

    pub fn value(&self, name: &str) -> Option<&FormValue> {
        self.values.get(name)
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    fn visible_field(&self, name: &str) -> Result<&SpaceField> {
        if !self.visible.iter().any(|v| v == name) {
            return Err(Error::UnknownField(name.to_string()));
        }
        self.schema.require_field(name)
    }

    pub fn set(&mut self, name: &str, value: FormValue) -> Result<()> {
        self.visible_field(name)?;
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Set a field from text input, decoding it by the field's type.
    pub fn set_text(&mut self, name: &str, raw: &str) -> Result<()> {
        let field = self.visible_field(name)?;
        let value = decode(&field.spec, &JsonValue::String(raw.to_string()));
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Point an image field at an uploaded attachment and fill any empty
    /// datetime fields bound to it. Returns the names of filled fields.
    pub fn attach_image(&mut self, field: &str, upload: &PendingAttachment) -> Result<Vec<String>> {
        let target = self.visible_field(field)?;
        if target.field_type() != FieldType::Image {
            return Err(Error::invalid_field(field, "not an image field"));
        }
        self.values
            .insert(field.to_string(), FormValue::Attachment(upload.number));

        let filled = apply_exif_bindings(
            &self.schema,
            field,
            Some(&upload.meta),
            self.opened_at,
            &mut self.values,
        );
        tracing::debug!(
            subsystem = "forms",
            component = "note_form",
            op = "attach_image",
            field,
            attachment = upload.number,
            filled = filled.len(),
            "Attached image"
        );
        Ok(filled)
    }

    /// Names of fields whose encoding changed since the form opened.
    pub fn dirty_fields(&self) -> Vec<String> {
        diff_fields(&self.original, &self.values)
            .into_keys()
            .collect()
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty_fields().is_empty()
    }

    /// Check the values that will be sent: all of them when creating,
    /// only changed ones when editing.
    pub fn validate(&self) -> Vec<FieldError> {
        match self.mode {
            FormMode::Create => validate_values(self.fields(), &self.values),
            FormMode::Edit { .. } => {
                let dirty = self.dirty_fields();
                let changed = self
                    .fields()
                    .filter(|f| dirty.iter().any(|name| name == &f.name));
                validate_values(changed, &self.values)
            }
        }
    }

    /// Validate and build the request body.
    pub fn submit(&self) -> Result<NotePayload> {
        let errors = self.validate();
        if !errors.is_empty() {
            let message = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Error::Validation(message));
        }

        let raw_fields = match self.mode {
            FormMode::Create => encode_fields(&self.values),
            FormMode::Edit { .. } => diff_fields(&self.original, &self.values),
        };
        tracing::info!(
            subsystem = "forms",
            component = "note_form",
            op = "submit",
            space = %self.space_slug,
            fields = raw_fields.len(),
            "Note form submitted"
        );
        Ok(NotePayload { raw_fields })
    }
}

/// Comment composer, for a new comment or a reply, or for editing one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommentForm {
    content: String,
    parent_number: Option<i64>,
    original: Option<String>,
    editing: Option<i64>,
}

impl CommentForm {
    pub fn create(parent_number: Option<i64>) -> Self {
        Self {
            parent_number,
            ..Self::default()
        }
    }

    pub fn edit(comment: &Comment) -> Self {
        Self {
            content: comment.content.clone(),
            parent_number: comment.parent_number,
            original: Some(comment.content.clone()),
            editing: Some(comment.number),
        }
    }

    /// Number of the comment being edited, `None` when composing.
    pub fn editing(&self) -> Option<i64> {
        self.editing
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Build the payload. `Ok(None)` means an edit with nothing changed.
    pub fn submit(&self) -> Result<Option<CommentPayload>> {
        let content = self.content.trim();
        if content.is_empty() {
            return Err(Error::Validation("comment cannot be empty".into()));
        }
        if self.original.as_deref().map(str::trim) == Some(content) {
            return Ok(None);
        }
        Ok(Some(CommentPayload {
            content: content.to_string(),
            parent_number: self.parent_number,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn space() -> Space {
        serde_json::from_value(json!({
            "slug": "tasks",
            "title": "Tasks",
            "members": ["alice"],
            "hidden_fields_on_create": ["closed_at"],
            "fields": [
                {"name": "title", "type": "string", "required": true},
                {"name": "status", "type": "select", "options": {"values": ["open", "done"]}},
                {"name": "closed_at", "type": "datetime"}
            ]
        }))
        .unwrap()
    }

    fn ctx() -> ResolveContext {
        ResolveContext::new("alice", Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_create_skips_hidden_fields() {
        let mut form = NoteForm::create(&space(), &ctx());
        let names: Vec<_> = form.fields().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["title", "status"]);
        assert!(matches!(
            form.set("closed_at", FormValue::Empty),
            Err(Error::UnknownField(_))
        ));
    }

    #[test]
    fn test_submit_reports_required() {
        let form = NoteForm::create(&space(), &ctx());
        let err = form.submit().unwrap_err();
        assert!(err.to_string().contains("title: is required"));
    }

    #[test]
    fn test_create_submit_encodes_values() {
        let mut form = NoteForm::create(&space(), &ctx());
        form.set_text("title", "Buy milk").unwrap();
        form.set("status", FormValue::text("open")).unwrap();
        let payload = form.submit().unwrap();
        assert_eq!(payload.raw_fields.len(), 2);
        assert_eq!(payload.raw_fields["status"], "open");
    }

    #[test]
    fn test_edit_submits_only_changes() {
        let note: Note = serde_json::from_value(json!({
            "space_slug": "tasks",
            "number": 3,
            "author": "alice",
            "created_at": "2024-01-01T00:00:00Z",
            "fields": {"title": "Old", "status": "open", "closed_at": null}
        }))
        .unwrap();
        let mut form = NoteForm::edit(&space(), &note, &ctx());
        assert_eq!(form.mode(), FormMode::Edit { number: 3 });
        assert!(!form.is_dirty());

        form.set("status", FormValue::text("done")).unwrap();
        assert_eq!(form.dirty_fields(), ["status"]);
        let payload = form.submit().unwrap();
        assert_eq!(payload.raw_fields.len(), 1);
        assert_eq!(payload.raw_fields["status"], "done");
    }

    #[test]
    fn test_edit_validates_only_changed_fields() {
        // "archived" was removed from the select options after the note was saved.
        let note: Note = serde_json::from_value(json!({
            "space_slug": "tasks",
            "number": 4,
            "author": "alice",
            "created_at": "2024-01-01T00:00:00",
            "fields": {"title": "Old", "status": "archived", "closed_at": null}
        }))
        .unwrap();
        let mut form = NoteForm::edit(&space(), &note, &ctx());
        assert!(form.validate().is_empty());

        form.set_text("title", "New").unwrap();
        let payload = form.submit().unwrap();
        assert_eq!(payload.raw_fields.len(), 1);
        assert_eq!(payload.raw_fields["title"], "New");

        form.set("title", FormValue::Empty).unwrap();
        let err = form.submit().unwrap_err();
        assert!(err.to_string().contains("title: is required"));
    }

    #[test]
    fn test_attach_image_requires_image_field() {
        let mut form = NoteForm::create(&space(), &ctx());
        let upload: PendingAttachment = serde_json::from_value(json!({
            "number": 1,
            "author": "alice",
            "filename": "a.jpg",
            "size": 10,
            "mime_type": "image/jpeg",
            "created_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert!(form.attach_image("title", &upload).is_err());
    }

    #[test]
    fn test_comment_form() {
        let mut form = CommentForm::create(Some(2));
        assert!(form.submit().is_err());
        form.set_content("  looks good  ");
        let payload = form.submit().unwrap().unwrap();
        assert_eq!(payload.content, "looks good");
        assert_eq!(payload.parent_number, Some(2));
    }

    #[test]
    fn test_comment_edit_unchanged_is_noop() {
        let comment: Comment = serde_json::from_value(json!({
            "space_slug": "tasks",
            "note_number": 3,
            "number": 1,
            "author": "alice",
            "content": "first",
            "created_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        let mut form = CommentForm::edit(&comment);
        assert_eq!(form.submit().unwrap(), None);
        form.set_content("second");
        assert_eq!(form.submit().unwrap().unwrap().content, "second");
    }
}
