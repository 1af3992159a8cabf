//! # spacenote-client
//!
//! Async client for the SpaceNote REST API.
//!
//! - [`SpaceNoteClient`]: session-cookie HTTP client with one method per endpoint
//! - [`QueryCache`]: per-key read cache with prefix invalidation
//! - [`RetryPolicy`]: backoff for failed reads
//! - [`ImageLoader`]: polls image variants the server is still generating
//! - [`NotificationBus`]: broadcast of user-facing notifications

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod image;
pub mod notifications;
pub mod retry;

pub use api::NotesQuery;
pub use api::Upload;
pub use cache::{Fetched, QueryCache};
pub use client::SpaceNoteClient;
pub use config::{ClientConfig, ConfigError};
pub use error::{ErrorDisposition, RequestKind};
pub use image::{ImageLoader, ImageProbe, ImageSource, ImageState, PollPolicy};
pub use notifications::{Notification, NotificationBus, NotificationLevel};
pub use retry::RetryPolicy;
