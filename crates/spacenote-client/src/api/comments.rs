use spacenote_core::{Comment, CommentForm, CommentPayload, Result};

use crate::api::notes::notes_path;
use crate::client::SpaceNoteClient;

fn comments_path(slug: &str, note: i64) -> String {
    format!("{}/{}/comments", notes_path(slug), note)
}

impl SpaceNoteClient {
    pub async fn list_comments(&self, slug: &str, note: i64) -> Result<Vec<Comment>> {
        self.query("list_comments", &comments_path(slug, note), Vec::new())
            .await
    }

    /// Comments change a note's activity time, so note listings are
    /// invalidated as well.
    pub async fn create_comment(
        &self,
        slug: &str,
        note: i64,
        payload: &CommentPayload,
    ) -> Result<Comment> {
        self.mutate_json(
            "create_comment",
            self.post(&comments_path(slug, note)).json(payload),
            &[notes_path(slug)],
        )
        .await
    }

    pub async fn update_comment(
        &self,
        slug: &str,
        note: i64,
        number: i64,
        payload: &CommentPayload,
    ) -> Result<Comment> {
        self.mutate_json(
            "update_comment",
            self.patch(&format!("{}/{}", comments_path(slug, note), number))
                .json(payload),
            &[notes_path(slug)],
        )
        .await
    }

    pub async fn delete_comment(&self, slug: &str, note: i64, number: i64) -> Result<()> {
        self.mutate_unit(
            "delete_comment",
            self.delete(&format!("{}/{}", comments_path(slug, note), number)),
            &[notes_path(slug)],
        )
        .await
    }

    /// Send a comment form. `Ok(None)` when an edit left the text unchanged.
    pub async fn submit_comment_form(
        &self,
        slug: &str,
        note: i64,
        form: &CommentForm,
    ) -> Result<Option<Comment>> {
        let Some(payload) = form.submit()? else {
            return Ok(None);
        };
        let comment = match form.editing() {
            Some(number) => self.update_comment(slug, note, number, &payload).await?,
            None => self.create_comment(slug, note, &payload).await?,
        };
        Ok(Some(comment))
    }
}
