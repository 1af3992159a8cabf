//! Field definitions, the per-type registry, and schema lookups.

pub mod registry;
pub mod schema;
pub mod spec;

pub use registry::{DefaultShape, OptionKey, TransportRule};
pub use schema::{DatetimeBinding, SpaceSchema};
pub use spec::{
    DatetimeDefault, DatetimeKind, DatetimeOptions, ExifBinding, ExifFallback, FieldSpec,
    FieldType, ImageOptions, NumericKind, NumericOptions, RawSpaceField, SelectOptions,
    SpaceField, StringKind, StringOptions, UserDefault, ME_TOKEN, NOW_TOKEN,
};
