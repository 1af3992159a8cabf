//! Initial values for new-note forms.
//!
//! Defaults are resolved once when a form opens: literal defaults are used
//! as-is, `$me` and `$now` are taken from the [`ResolveContext`], and
//! EXIF-bound datetime fields start empty until their image is uploaded.

use chrono::{DateTime, Utc};

use crate::codec::{FormValue, FormValues};
use crate::fields::{
    DatetimeDefault, ExifFallback, FieldSpec, SpaceField, SpaceSchema, UserDefault,
};
use crate::models::AttachmentMeta;

/// Run-time facts defaults may refer to.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveContext {
    pub current_username: String,
    pub now: DateTime<Utc>,
}

impl ResolveContext {
    pub fn new(current_username: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            current_username: current_username.into(),
            now,
        }
    }

    /// Context for `username` at the current wall-clock time.
    pub fn now_for(current_username: impl Into<String>) -> Self {
        Self::new(current_username, Utc::now())
    }
}

/// Empty value of the right shape for a field without a default.
pub fn empty_value(spec: &FieldSpec) -> FormValue {
    match spec {
        FieldSpec::Boolean { .. } => FormValue::Bool(false),
        FieldSpec::String { .. } | FieldSpec::Markdown { .. } | FieldSpec::Unknown { .. } => {
            FormValue::Text(String::new())
        }
        FieldSpec::Tags { .. } => FormValue::List(Vec::new()),
        FieldSpec::Select { .. }
        | FieldSpec::User { .. }
        | FieldSpec::Datetime { .. }
        | FieldSpec::Numeric { .. }
        | FieldSpec::Image { .. } => FormValue::Empty,
    }
}

/// Value a field starts with in a create form.
pub fn resolve_default(field: &SpaceField, ctx: &ResolveContext) -> FormValue {
    let resolved = match &field.spec {
        FieldSpec::String {
            default: Some(text),
            ..
        }
        | FieldSpec::Markdown {
            default: Some(text),
        }
        | FieldSpec::Select {
            default: Some(text),
            ..
        } => FormValue::Text(text.clone()),
        FieldSpec::Boolean { default: Some(b) } => FormValue::Bool(*b),
        FieldSpec::Tags { default: Some(tags) } => FormValue::List(tags.clone()),
        FieldSpec::User {
            default: Some(UserDefault::Me),
        } => FormValue::Text(ctx.current_username.clone()),
        FieldSpec::User {
            default: Some(UserDefault::Username(username)),
        } => FormValue::Text(username.clone()),
        FieldSpec::Datetime {
            default: Some(DatetimeDefault::Now),
            ..
        } => FormValue::DateTime(ctx.now),
        FieldSpec::Datetime {
            default: Some(DatetimeDefault::At(at)),
            ..
        } => FormValue::DateTime(*at),
        FieldSpec::Numeric {
            default: Some(n), ..
        } => FormValue::Number(*n),
        FieldSpec::Unknown { default, .. } => match default.as_str() {
            Some(text) => FormValue::Text(text.to_string()),
            None => empty_value(&field.spec),
        },
        // EXIF-bound datetimes stay empty until an upload arrives.
        other => empty_value(other),
    };

    tracing::trace!(
        subsystem = "forms",
        component = "resolver",
        field = %field.name,
        value = ?resolved,
        "Resolved default"
    );
    resolved
}

/// Initial values for every field of a create form.
pub fn initial_values<'a, I>(fields: I, ctx: &ResolveContext) -> FormValues
where
    I: IntoIterator<Item = &'a SpaceField>,
{
    fields
        .into_iter()
        .map(|field| (field.name.clone(), resolve_default(field, ctx)))
        .collect()
}

/// Timestamp an EXIF-bound field takes from an upload: the capture time if
/// the image carried one, otherwise the binding's fallback.
pub fn resolve_exif(
    fallback: &ExifFallback,
    meta: Option<&AttachmentMeta>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    meta.and_then(AttachmentMeta::exif_created_at)
        .or(match fallback {
            ExifFallback::Now => Some(now),
            ExifFallback::At(at) => Some(*at),
            ExifFallback::None => None,
        })
}

/// Fill datetime fields bound to `image_field` after an upload.
///
/// Only fields that are still empty are written, so a value the user typed
/// is never replaced. Returns the names of the fields that were filled.
pub fn apply_exif_bindings(
    schema: &SpaceSchema,
    image_field: &str,
    meta: Option<&AttachmentMeta>,
    now: DateTime<Utc>,
    values: &mut FormValues,
) -> Vec<String> {
    let mut filled = Vec::new();
    for binding in schema.bindings_for(image_field) {
        let current = values.get(&binding.datetime_field);
        if current.is_some_and(|v| !v.is_empty()) {
            tracing::debug!(
                subsystem = "forms",
                component = "exif",
                field = %binding.datetime_field,
                "Bound datetime already set, leaving it"
            );
            continue;
        }
        if let Some(at) = resolve_exif(&binding.fallback, meta, now) {
            values.insert(binding.datetime_field.clone(), FormValue::DateTime(at));
            filled.push(binding.datetime_field.clone());
        }
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{
        DatetimeOptions, ExifBinding, ImageOptions, NumericOptions, SelectOptions,
        StringOptions,
    };
    use crate::models::ImageMeta;
    use chrono::TimeZone;

    fn ctx() -> ResolveContext {
        ResolveContext::new("alice", Utc.with_ymd_and_hms(2025, 7, 4, 12, 0, 0).unwrap())
    }

    fn photo_schema(fallback: ExifFallback) -> SpaceSchema {
        SpaceSchema::new(vec![
            SpaceField::new(
                "photo",
                FieldSpec::Image {
                    options: ImageOptions::default(),
                },
            ),
            SpaceField::new(
                "taken_at",
                FieldSpec::Datetime {
                    options: DatetimeOptions::default(),
                    default: Some(DatetimeDefault::Exif(ExifBinding {
                        image_field: "photo".into(),
                        fallback,
                    })),
                },
            ),
        ])
    }

    fn exif_meta(raw: &str) -> AttachmentMeta {
        AttachmentMeta {
            image: Some(ImageMeta {
                exif_created_at: Some(raw.into()),
                ..ImageMeta::default()
            }),
        }
    }

    #[test]
    fn test_null_defaults_are_type_empty() {
        let ctx = ctx();
        let cases = [
            (FieldSpec::Boolean { default: None }, FormValue::Bool(false)),
            (
                FieldSpec::String {
                    options: StringOptions::default(),
                    default: None,
                },
                FormValue::text(""),
            ),
            (FieldSpec::Markdown { default: None }, FormValue::text("")),
            (FieldSpec::Tags { default: None }, FormValue::List(vec![])),
            (
                FieldSpec::Numeric {
                    options: NumericOptions::default(),
                    default: None,
                },
                FormValue::Empty,
            ),
            (
                FieldSpec::Select {
                    options: SelectOptions::default(),
                    default: None,
                },
                FormValue::Empty,
            ),
            (FieldSpec::User { default: None }, FormValue::Empty),
        ];
        for (spec, expected) in cases {
            assert_eq!(resolve_default(&SpaceField::new("f", spec), &ctx), expected);
        }
    }

    #[test]
    fn test_me_and_now_tokens() {
        let ctx = ctx();
        let user = SpaceField::new(
            "assignee",
            FieldSpec::User {
                default: Some(UserDefault::Me),
            },
        );
        assert_eq!(resolve_default(&user, &ctx), FormValue::text("alice"));

        let when = SpaceField::new(
            "when",
            FieldSpec::Datetime {
                options: DatetimeOptions::default(),
                default: Some(DatetimeDefault::Now),
            },
        );
        assert_eq!(resolve_default(&when, &ctx), FormValue::DateTime(ctx.now));
    }

    #[test]
    fn test_literal_defaults() {
        let ctx = ctx();
        let qty = SpaceField::new(
            "qty",
            FieldSpec::Numeric {
                options: NumericOptions::default(),
                default: Some(2.0),
            },
        );
        assert_eq!(resolve_default(&qty, &ctx), FormValue::Number(2.0));

        let tags = SpaceField::new(
            "labels",
            FieldSpec::Tags {
                default: Some(vec!["inbox".into()]),
            },
        );
        assert_eq!(resolve_default(&tags, &ctx), FormValue::list(["inbox"]));
    }

    #[test]
    fn test_exif_field_starts_empty() {
        let schema = photo_schema(ExifFallback::Now);
        let values = initial_values(schema.fields(), &ctx());
        assert_eq!(values.get("taken_at"), Some(&FormValue::Empty));
    }

    #[test]
    fn test_exif_upload_populates_empty_field() {
        let schema = photo_schema(ExifFallback::Now);
        let ctx = ctx();
        let mut values = initial_values(schema.fields(), &ctx);
        let meta = exif_meta("2024-01-01T00:00:00Z");

        let filled = apply_exif_bindings(&schema, "photo", Some(&meta), ctx.now, &mut values);
        assert_eq!(filled, vec!["taken_at".to_string()]);
        assert_eq!(
            values.get("taken_at"),
            Some(&FormValue::DateTime(
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            ))
        );
    }

    #[test]
    fn test_exif_upload_does_not_overwrite_user_value() {
        let schema = photo_schema(ExifFallback::Now);
        let ctx = ctx();
        let mut values = initial_values(schema.fields(), &ctx);
        let typed = Utc.with_ymd_and_hms(2020, 5, 5, 5, 5, 5).unwrap();
        values.insert("taken_at".into(), FormValue::DateTime(typed));

        let meta = exif_meta("2024-01-01T00:00:00Z");
        let filled = apply_exif_bindings(&schema, "photo", Some(&meta), ctx.now, &mut values);
        assert!(filled.is_empty());
        assert_eq!(values.get("taken_at"), Some(&FormValue::DateTime(typed)));
    }

    #[test]
    fn test_exif_fallbacks() {
        let ctx = ctx();
        let literal = Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap();

        assert_eq!(resolve_exif(&ExifFallback::Now, None, ctx.now), Some(ctx.now));
        assert_eq!(
            resolve_exif(&ExifFallback::At(literal), Some(&AttachmentMeta::default()), ctx.now),
            Some(literal)
        );
        assert_eq!(resolve_exif(&ExifFallback::None, None, ctx.now), None);
    }

    #[test]
    fn test_upload_to_unbound_image_changes_nothing() {
        let schema = photo_schema(ExifFallback::Now);
        let ctx = ctx();
        let mut values = initial_values(schema.fields(), &ctx);
        let before = values.clone();
        assert!(apply_exif_bindings(&schema, "other", None, ctx.now, &mut values).is_empty());
        assert_eq!(values, before);
    }
}
