//! File uploads.
//!
//! Uploads for a note form that is not yet saved go to the pending area;
//! the returned number is what an image or file field stores, and the
//! server links the attachment when the note is saved.

use reqwest::multipart::{Form, Part};

use spacenote_core::{Attachment, Error, PendingAttachment, Result};

use crate::api::notes::notes_path;
use crate::client::{seg, SpaceNoteClient};

/// A file ready to upload.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    fn into_form(self) -> Result<Form> {
        let part = Part::bytes(self.bytes)
            .file_name(self.filename)
            .mime_str(&self.mime_type)
            .map_err(|e| {
                Error::Validation(format!("invalid MIME type '{}': {}", self.mime_type, e))
            })?;
        Ok(Form::new().part("file", part))
    }
}

impl SpaceNoteClient {
    /// Upload to the pending area. The result carries server-extracted
    /// image metadata used for EXIF default bindings.
    pub async fn upload_pending(&self, upload: Upload) -> Result<PendingAttachment> {
        let form = upload.into_form()?;
        self.mutate_json(
            "upload_pending",
            self.post("attachments/pending").multipart(form),
            &["attachments/pending".to_string()],
        )
        .await
    }

    pub async fn list_pending(&self) -> Result<Vec<PendingAttachment>> {
        self.query("list_pending", "attachments/pending", Vec::new())
            .await
    }

    pub async fn list_attachments(&self, slug: &str) -> Result<Vec<Attachment>> {
        self.query(
            "list_attachments",
            &format!("spaces/{}/attachments", seg(slug)),
            Vec::new(),
        )
        .await
    }

    pub async fn list_note_attachments(&self, slug: &str, note: i64) -> Result<Vec<Attachment>> {
        self.query(
            "list_note_attachments",
            &format!("{}/{}/attachments", notes_path(slug), note),
            Vec::new(),
        )
        .await
    }

    /// Upload to a space, not bound to a note.
    pub async fn upload_to_space(&self, slug: &str, upload: Upload) -> Result<Attachment> {
        let form = upload.into_form()?;
        let path = format!("spaces/{}/attachments", seg(slug));
        self.mutate_json("upload_to_space", self.post(&path).multipart(form), &[path.clone()])
            .await
    }

    pub async fn upload_to_note(&self, slug: &str, note: i64, upload: Upload) -> Result<Attachment> {
        let form = upload.into_form()?;
        self.mutate_json(
            "upload_to_note",
            self.post(&format!("{}/{}/attachments", notes_path(slug), note))
                .multipart(form),
            &[
                format!("spaces/{}/attachments", seg(slug)),
                notes_path(slug),
            ],
        )
        .await
    }
}
