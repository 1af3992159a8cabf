//! # spacenote-core
//!
//! Core types and pure logic for the SpaceNote client.
//!
//! This crate holds the field model, the per-type registry, default value
//! resolution, the form value codec, the filter query grammar, and the form
//! and drawer state that the client and CLI crates build on. It performs no I/O.

pub mod codec;
pub mod defaults;
pub mod drawer;
pub mod error;
pub mod fields;
pub mod forms;
pub mod models;
pub mod query;
pub mod resolver;
pub mod validation;
pub mod widgets;

// Re-export commonly used types at crate root
pub use codec::{FormValue, FormValues, RawFields};
pub use drawer::{AdhocFilterDrawer, ConditionId, DraftCondition};
pub use error::{Error, ErrorCode, Result};
pub use fields::{FieldSpec, FieldType, SpaceField, SpaceSchema};
pub use forms::{CommentForm, FormMode, NoteForm};
pub use models::*;
pub use query::{FieldPath, FilterCondition, Operator, QueryCondition, SortKey, SystemField};
pub use resolver::ResolveContext;
pub use validation::FieldError;
pub use widgets::{DisplayContext, DisplayValue, FieldDraft, InputWidget, OptionEditor};
