//! Field lookups over one space's schema.

use std::collections::BTreeMap;

use crate::query::FieldPath;
use crate::{Error, Result};

use super::registry;
use super::spec::{ExifFallback, FieldType, SpaceField};

/// A datetime field that takes its value from an image upload.
#[derive(Debug, Clone, PartialEq)]
pub struct DatetimeBinding {
    pub datetime_field: String,
    pub fallback: ExifFallback,
}

/// The fields of a space, with EXIF bindings resolved up front.
#[derive(Debug, Clone, Default)]
pub struct SpaceSchema {
    fields: Vec<SpaceField>,
    exif_bindings: BTreeMap<String, Vec<DatetimeBinding>>,
}

impl SpaceSchema {
    pub fn new(fields: Vec<SpaceField>) -> Self {
        let mut exif_bindings: BTreeMap<String, Vec<DatetimeBinding>> = BTreeMap::new();
        for field in &fields {
            let Some(binding) = field.spec.exif_binding() else {
                continue;
            };
            let target_is_image = fields
                .iter()
                .any(|f| f.name == binding.image_field && f.field_type() == FieldType::Image);
            if !target_is_image {
                tracing::warn!(
                    subsystem = "schema",
                    component = "exif",
                    field = %field.name,
                    image_field = %binding.image_field,
                    "EXIF default points at a missing or non-image field"
                );
                continue;
            }
            exif_bindings
                .entry(binding.image_field.clone())
                .or_default()
                .push(DatetimeBinding {
                    datetime_field: field.name.clone(),
                    fallback: binding.fallback.clone(),
                });
        }
        Self {
            fields,
            exif_bindings,
        }
    }

    pub fn fields(&self) -> &[SpaceField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&SpaceField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn require_field(&self, name: &str) -> Result<&SpaceField> {
        self.field(name)
            .ok_or_else(|| Error::UnknownField(name.to_string()))
    }

    /// Datetime fields bound to uploads of `image_field`.
    pub fn bindings_for(&self, image_field: &str) -> &[DatetimeBinding] {
        self.exif_bindings
            .get(image_field)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Type of the field a condition path addresses, if known.
    pub fn field_type_at(&self, path: &FieldPath) -> Option<FieldType> {
        match path {
            FieldPath::System(system) => Some(system.field_type()),
            FieldPath::Custom(name) => self.field(name).map(SpaceField::field_type),
            FieldPath::Other(_) => None,
        }
    }

    /// Every path a filter condition may target: system fields first, then
    /// custom fields whose type has operators.
    pub fn filterable_paths(&self) -> Vec<FieldPath> {
        crate::query::SystemField::ALL
            .iter()
            .copied()
            .map(FieldPath::System)
            .chain(
                self.fields
                    .iter()
                    .filter(|f| registry::is_filterable(f.field_type()))
                    .map(|f| FieldPath::Custom(f.name.clone())),
            )
            .collect()
    }
}
