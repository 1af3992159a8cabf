//! Integration tests for the REST client against a mock backend.

use chrono::{TimeZone, Utc};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use spacenote_client::{
    ClientConfig, NotesQuery, NotificationLevel, RetryPolicy, SpaceNoteClient,
};
use spacenote_core::{CommentForm, Error, NoteForm, NotePayload, ResolveContext, Space};

fn client(server: &MockServer) -> SpaceNoteClient {
    let config = ClientConfig {
        retry: RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
        },
        ..ClientConfig::new(server.uri())
    };
    SpaceNoteClient::new(config).expect("client")
}

fn note_json(number: i64, title: &str) -> serde_json::Value {
    json!({
        "space_slug": "trips",
        "number": number,
        "author": "alice",
        "created_at": "2025-03-01T10:00:00",
        "fields": {"title": title, "status": "open"}
    })
}

fn space_json() -> serde_json::Value {
    json!({
        "slug": "trips",
        "title": "Trips",
        "members": ["alice"],
        "fields": [
            {"name": "title", "type": "string", "required": true},
            {"name": "status", "type": "select", "options": {"values": ["open", "done"]}}
        ]
    })
}

#[tokio::test]
async fn test_error_detail_becomes_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/spaces/missing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"detail": "Space 'missing' not found"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).get_space("missing").await.unwrap_err();
    match err {
        Error::NotFound(message) => assert_eq!(message, "Space 'missing' not found"),
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/profile"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Not authenticated"})))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).profile().await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));
}

#[tokio::test]
async fn test_read_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/spaces"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/spaces"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([space_json()])))
        .expect(1)
        .mount(&server)
        .await;

    let spaces = client(&server).list_spaces().await.unwrap();
    assert_eq!(spaces.len(), 1);
    assert_eq!(spaces[0].slug, "trips");
}

#[tokio::test]
async fn test_mutation_is_sent_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/spaces/trips/notes"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"message": "try later"})))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .create_note("trips", &NotePayload::default())
        .await
        .unwrap_err();
    match err {
        Error::Server(message) => assert_eq!(message, "try later"),
        other => panic!("expected Server, got {:?}", other),
    }
}

#[tokio::test]
async fn test_mutation_invalidates_cached_reads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/spaces/trips/notes/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(note_json(7, "Lisbon")))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/v1/spaces/trips/notes/7"))
        .and(body_json(json!({"raw_fields": {"status": "done"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(note_json(7, "Lisbon")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    client.get_note("trips", 7).await.unwrap();
    // Served from cache.
    client.get_note("trips", 7).await.unwrap();

    let mut payload = NotePayload::default();
    payload.raw_fields.insert("status".into(), "done".into());
    client.update_note("trips", 7, &payload).await.unwrap();

    client.get_note("trips", 7).await.unwrap();
}

#[tokio::test]
async fn test_failed_refetch_keeps_data_and_notifies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/spaces"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([space_json()])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/spaces"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client(&server);
    let mut notifications = client.notifications().subscribe();
    assert_eq!(client.list_spaces().await.unwrap().len(), 1);

    client.cache().invalidate("spaces");
    let stale = client.list_spaces().await.unwrap();
    assert_eq!(stale[0].slug, "trips");

    let toast = notifications.recv().await.unwrap();
    assert_eq!(toast.level, NotificationLevel::Error);
    assert_eq!(toast.message, "HTTP 500 Internal Server Error");
}

#[tokio::test]
async fn test_unauthorized_refetch_clears_cached_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "alice"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/profile"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Session expired"})))
        .mount(&server)
        .await;

    let client = client(&server);
    assert_eq!(client.profile().await.unwrap().username, "alice");

    client.cache().invalidate("profile");
    let err = client.profile().await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));
    assert!(client.cache().is_empty());
}

#[tokio::test]
async fn test_note_timestamps_without_offset_read_as_utc() {
    let server = MockServer::start().await;
    let mut body = note_json(9, "Faro");
    body["edited_at"] = json!("2025-03-01T11:30:00.250000");
    Mock::given(method("GET"))
        .and(path("/api/v1/spaces/trips/notes/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    let note = client(&server).get_note("trips", 9).await.unwrap();
    assert_eq!(note.created_at, Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap());
    let edited = note.edited_at.expect("edited_at");
    assert_eq!(edited.timestamp_millis() % 1000, 250);
    assert_eq!(edited.format("%H:%M:%S").to_string(), "11:30:00");
}

#[tokio::test]
async fn test_notes_listing_sends_paging_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/spaces/trips/notes"))
        .and(query_param("page", "2"))
        .and(query_param("limit", "50"))
        .and(query_param("q", "status:eq:open"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [note_json(51, "Porto")],
            "total": 51,
            "limit": 50,
            "offset": 50
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client(&server)
        .list_notes("trips", &NotesQuery::default().page(2).q("status:eq:open"))
        .await
        .unwrap();
    assert_eq!(page.total, 51);
    assert_eq!(page.items[0].number, 51);
}

#[tokio::test]
async fn test_unchanged_edit_form_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/spaces/trips/notes/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(note_json(3, "Rome")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let space: Space = serde_json::from_value(space_json()).unwrap();
    let note = serde_json::from_value(note_json(3, "Rome")).unwrap();
    let ctx = ResolveContext::new("alice", Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap());
    let form = NoteForm::edit(&space, &note, &ctx);

    let saved = client(&server).submit_note_form(&form).await.unwrap();
    assert_eq!(saved.number, 3);
}

#[tokio::test]
async fn test_comment_form_creates_comment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/spaces/trips/notes/3/comments"))
        .and(body_json(json!({"content": "See you there"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "space_slug": "trips",
            "note_number": 3,
            "number": 1,
            "author": "alice",
            "content": "See you there",
            "created_at": "2025-03-02T08:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut form = CommentForm::create(None);
    form.set_content("  See you there ");
    let comment = client(&server)
        .submit_comment_form("trips", 3, &form)
        .await
        .unwrap()
        .expect("comment created");
    assert_eq!(comment.number, 1);
}

#[tokio::test]
async fn test_import_rejects_invalid_json_locally() {
    let server = MockServer::start().await;

    let err = client(&server).import_space("{not json").await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_export_passes_include_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/spaces/trips/export"))
        .and(query_param("include_data", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"space": space_json(), "notes": []})))
        .expect(1)
        .mount(&server)
        .await;

    let exported = client(&server).export_space("trips", true).await.unwrap();
    assert_eq!(exported["space"]["slug"], "trips");
}
