/// End-to-end checks of the note form pipeline: schema JSON from the API,
/// defaults, user edits, image uploads, and the `raw_fields` payload.
use chrono::{TimeZone, Utc};
use serde_json::json;
use spacenote_core::{FormValue, Note, NoteForm, PendingAttachment, ResolveContext, Space};

fn ctx() -> ResolveContext {
    ResolveContext::new("alice", Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap())
}

fn space() -> Space {
    serde_json::from_value(json!({
        "slug": "journal",
        "title": "Journal",
        "members": ["alice", "bob"],
        "fields": [
            {"name": "mood", "type": "select", "required": true,
             "options": {"values": ["good", "meh", "bad"]}, "default": null},
            {"name": "labels", "type": "tags", "default": null},
            {"name": "photo", "type": "image"},
            {"name": "taken_at", "type": "datetime",
             "default": "$exif.created_at:photo|$now"},
            {"name": "owner", "type": "user", "default": "$me"},
            {"name": "done", "type": "boolean", "default": false}
        ]
    }))
    .expect("space JSON should deserialize")
}

fn upload(exif: Option<&str>) -> PendingAttachment {
    serde_json::from_value(json!({
        "number": 41,
        "author": "alice",
        "filename": "IMG_0001.jpg",
        "size": 204800,
        "mime_type": "image/jpeg",
        "created_at": "2025-03-01T09:00:00Z",
        "meta": {"image": {"width": 4032, "height": 3024, "exif_created_at": exif}}
    }))
    .expect("attachment JSON should deserialize")
}

#[test]
fn test_select_value_submitted_verbatim() {
    let mut form = NoteForm::create(&space(), &ctx());
    assert_eq!(form.value("mood"), Some(&FormValue::Empty));

    form.set("mood", FormValue::text("meh")).unwrap();
    let payload = form.submit().unwrap();
    assert_eq!(
        payload.raw_fields.get("mood").map(String::as_str),
        Some("meh"),
        "select value should be sent exactly as chosen"
    );
}

#[test]
fn test_tags_joined_and_empty_tags_omitted() {
    let mut form = NoteForm::create(&space(), &ctx());
    form.set("mood", FormValue::text("good")).unwrap();

    let payload = form.submit().unwrap();
    assert!(
        !payload.raw_fields.contains_key("labels"),
        "empty tags must be left out of the payload"
    );

    form.set("labels", FormValue::list(["a", "b"])).unwrap();
    let payload = form.submit().unwrap();
    assert_eq!(payload.raw_fields["labels"], "a,b");
}

#[test]
fn test_defaults_resolved_on_open() {
    let form = NoteForm::create(&space(), &ctx());
    assert_eq!(form.value("owner"), Some(&FormValue::text("alice")));
    assert_eq!(form.value("done"), Some(&FormValue::Bool(false)));
    assert_eq!(form.value("taken_at"), Some(&FormValue::Empty));
}

#[test]
fn test_exif_upload_fills_bound_datetime() {
    let mut form = NoteForm::create(&space(), &ctx());
    let filled = form
        .attach_image("photo", &upload(Some("2024-01-01T00:00:00Z")))
        .unwrap();
    assert_eq!(filled, ["taken_at"]);
    assert_eq!(
        form.value("taken_at"),
        Some(&FormValue::DateTime(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        ))
    );

    form.set("mood", FormValue::text("good")).unwrap();
    let payload = form.submit().unwrap();
    assert_eq!(payload.raw_fields["photo"], "41");
    assert_eq!(payload.raw_fields["taken_at"], "2024-01-01T00:00:00");
}

#[test]
fn test_exif_upload_keeps_user_edit() {
    let mut form = NoteForm::create(&space(), &ctx());
    let typed = Utc.with_ymd_and_hms(2023, 8, 15, 18, 30, 0).unwrap();
    form.set("taken_at", FormValue::DateTime(typed)).unwrap();

    let filled = form
        .attach_image("photo", &upload(Some("2024-01-01T00:00:00Z")))
        .unwrap();
    assert!(filled.is_empty());
    assert_eq!(form.value("taken_at"), Some(&FormValue::DateTime(typed)));
}

#[test]
fn test_exif_missing_uses_now_fallback() {
    let mut form = NoteForm::create(&space(), &ctx());
    form.attach_image("photo", &upload(None)).unwrap();
    assert_eq!(
        form.value("taken_at"),
        Some(&FormValue::DateTime(ctx().now))
    );
}

#[test]
fn test_edit_payload_contains_only_changed_field() {
    let note: Note = serde_json::from_value(json!({
        "space_slug": "journal",
        "number": 12,
        "author": "bob",
        "created_at": "2025-01-10T08:00:00Z",
        "fields": {
            "mood": "good",
            "labels": ["x"],
            "photo": null,
            "taken_at": "2025-01-10T07:59:00",
            "owner": "bob",
            "done": false
        }
    }))
    .unwrap();

    let mut form = NoteForm::edit(&space(), &note, &ctx());
    form.set("done", FormValue::Bool(true)).unwrap();

    let payload = form.submit().unwrap();
    assert_eq!(payload.raw_fields.len(), 1);
    assert_eq!(payload.raw_fields["done"], "true");
}

#[test]
fn test_edit_exif_fallback_uses_context_clock() {
    let note: Note = serde_json::from_value(json!({
        "space_slug": "journal",
        "number": 13,
        "author": "bob",
        "created_at": "2025-01-10T08:00:00",
        "fields": {"mood": "good", "photo": null, "taken_at": null, "done": false}
    }))
    .unwrap();

    let mut form = NoteForm::edit(&space(), &note, &ctx());
    let filled = form.attach_image("photo", &upload(None)).unwrap();
    assert_eq!(filled, ["taken_at"]);
    assert_eq!(
        form.value("taken_at"),
        Some(&FormValue::DateTime(ctx().now))
    );

    let payload = form.submit().unwrap();
    assert_eq!(payload.raw_fields["photo"], "41");
    assert_eq!(payload.raw_fields["taken_at"], "2025-03-01T09:00:00");
}
