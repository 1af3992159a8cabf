//! Endpoint wrappers, one module per resource. Each adds methods to
//! [`SpaceNoteClient`](crate::SpaceNoteClient).

mod attachments;
mod auth;
mod comments;
mod export;
mod notes;
mod spaces;
mod users;

pub use attachments::Upload;
pub use notes::NotesQuery;
