use tracing::debug;

use spacenote_core::defaults::{NOTES_FIRST_PAGE, NOTES_PAGE_LIMIT};
use spacenote_core::{FormMode, Note, NoteForm, NotePayload, NotesPage, Result};

use crate::client::{seg, Params, SpaceNoteClient};

/// Parameters of a note listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesQuery {
    /// 1-based.
    pub page: u32,
    pub limit: u32,
    /// Saved filter name.
    pub filter: Option<String>,
    /// Ad-hoc query string (`field:op:value,...`).
    pub q: Option<String>,
}

impl Default for NotesQuery {
    fn default() -> Self {
        Self {
            page: NOTES_FIRST_PAGE,
            limit: NOTES_PAGE_LIMIT,
            filter: None,
            q: None,
        }
    }
}

impl NotesQuery {
    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(NOTES_FIRST_PAGE);
        self
    }

    pub fn filter(mut self, name: impl Into<String>) -> Self {
        self.filter = Some(name.into());
        self
    }

    pub fn q(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    fn params(&self) -> Params {
        let mut params: Params = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(filter) = self.filter.as_deref().filter(|f| !f.is_empty()) {
            params.push(("filter", filter.to_string()));
        }
        if let Some(q) = self.q.as_deref().filter(|q| !q.is_empty()) {
            params.push(("q", q.to_string()));
        }
        params
    }
}

pub(crate) fn notes_path(slug: &str) -> String {
    format!("spaces/{}/notes", seg(slug))
}

impl SpaceNoteClient {
    pub async fn list_notes(&self, slug: &str, query: &NotesQuery) -> Result<NotesPage> {
        self.query("list_notes", &notes_path(slug), query.params())
            .await
    }

    pub async fn get_note(&self, slug: &str, number: i64) -> Result<Note> {
        self.query(
            "get_note",
            &format!("{}/{}", notes_path(slug), number),
            Vec::new(),
        )
        .await
    }

    pub async fn create_note(&self, slug: &str, payload: &NotePayload) -> Result<Note> {
        self.mutate_json(
            "create_note",
            self.post(&notes_path(slug)).json(payload),
            &[notes_path(slug)],
        )
        .await
    }

    /// Partial update: only the fields in `payload` change.
    pub async fn update_note(&self, slug: &str, number: i64, payload: &NotePayload) -> Result<Note> {
        self.mutate_json(
            "update_note",
            self.patch(&format!("{}/{}", notes_path(slug), number))
                .json(payload),
            &[notes_path(slug)],
        )
        .await
    }

    pub async fn delete_note(&self, slug: &str, number: i64) -> Result<()> {
        self.mutate_unit(
            "delete_note",
            self.delete(&format!("{}/{}", notes_path(slug), number)),
            &[notes_path(slug)],
        )
        .await
    }

    /// Validate and send a note form. An edit with no changes sends
    /// nothing and returns the note as it is.
    pub async fn submit_note_form(&self, form: &NoteForm) -> Result<Note> {
        let payload = form.submit()?;
        let slug = form.space_slug();
        match form.mode() {
            FormMode::Create => self.create_note(slug, &payload).await,
            FormMode::Edit { number } if payload.raw_fields.is_empty() => {
                debug!(
                    subsystem = "client",
                    component = "notes",
                    space = slug,
                    number,
                    "Edit has no changes, nothing to send"
                );
                self.get_note(slug, number).await
            }
            FormMode::Edit { number } => self.update_note(slug, number, &payload).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = NotesQuery::default().params();
        assert_eq!(
            params,
            vec![("page", "1".to_string()), ("limit", "50".to_string())]
        );
    }

    #[test]
    fn test_empty_filter_and_q_omitted() {
        let params = NotesQuery::default().filter("").q("").params();
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_page_is_clamped() {
        assert_eq!(NotesQuery::default().page(0).page, 1);
        let params = NotesQuery::default()
            .page(3)
            .filter("open")
            .q("status:eq:new")
            .params();
        assert_eq!(params[0], ("page", "3".to_string()));
        assert_eq!(params[2], ("filter", "open".to_string()));
        assert_eq!(params[3], ("q", "status:eq:new".to_string()));
    }
}
