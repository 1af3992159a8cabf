//! Client-side checks of form values against their field definitions.
//!
//! The backend remains the authority; these checks only catch what the
//! field options already make obvious, so the form can flag it inline.

use serde::Serialize;

use crate::codec::{parse_utc_datetime, FormValue, FormValues};
use crate::fields::{FieldSpec, NumericKind, SpaceField};

/// A problem with one field's value, shown next to its input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check one value. Empty values only fail when the field is required.
pub fn validate_value(field: &SpaceField, value: &FormValue) -> Result<(), FieldError> {
    if value.is_empty() {
        if field.required {
            return Err(FieldError::new(&field.name, "is required"));
        }
        return Ok(());
    }

    let name = field.name.as_str();
    match (&field.spec, value) {
        (FieldSpec::String { options, .. }, FormValue::Text(text)) => {
            let len = text.chars().count();
            if let Some(min) = options.min_length {
                if len < min {
                    return Err(FieldError::new(
                        name,
                        format!("must be at least {} characters", min),
                    ));
                }
            }
            if let Some(max) = options.max_length {
                if len > max {
                    return Err(FieldError::new(
                        name,
                        format!("must be at most {} characters", max),
                    ));
                }
            }
            Ok(())
        }
        (FieldSpec::Select { options, .. }, FormValue::Text(choice)) => {
            if options.values.is_empty() || options.values.contains(choice) {
                Ok(())
            } else {
                Err(FieldError::new(
                    name,
                    format!("'{}' is not an allowed value", choice),
                ))
            }
        }
        (FieldSpec::Numeric { options, .. }, FormValue::Number(n)) => {
            if options.kind == NumericKind::Int && n.fract() != 0.0 {
                return Err(FieldError::new(name, "must be a whole number"));
            }
            if options.min.is_some_and(|min| *n < min) {
                return Err(FieldError::new(
                    name,
                    format!("must be at least {}", options.min.unwrap_or_default()),
                ));
            }
            if options.max.is_some_and(|max| *n > max) {
                return Err(FieldError::new(
                    name,
                    format!("must be at most {}", options.max.unwrap_or_default()),
                ));
            }
            Ok(())
        }
        (FieldSpec::Numeric { .. }, FormValue::Text(text)) => {
            Err(FieldError::new(name, format!("'{}' is not a number", text)))
        }
        (FieldSpec::Datetime { .. }, FormValue::Text(text)) => parse_utc_datetime(text)
            .map(|_| ())
            .map_err(|_| FieldError::new(name, format!("'{}' is not a valid date", text))),
        (FieldSpec::Boolean { .. }, FormValue::Bool(_))
        | (FieldSpec::Tags { .. }, FormValue::List(_))
        | (FieldSpec::Datetime { .. }, FormValue::DateTime(_))
        | (FieldSpec::Image { .. }, FormValue::Attachment(_))
        | (FieldSpec::User { .. }, FormValue::Text(_))
        | (FieldSpec::Markdown { .. }, FormValue::Text(_))
        | (FieldSpec::Unknown { .. }, _) => Ok(()),
        (spec, other) => Err(FieldError::new(
            name,
            format!("{:?} is not a valid {} value", other, spec.type_name()),
        )),
    }
}

/// Check every field of a form. Fields missing from `values` count as empty.
pub fn validate_values<'a, I>(fields: I, values: &FormValues) -> Vec<FieldError>
where
    I: IntoIterator<Item = &'a SpaceField>,
{
    fields
        .into_iter()
        .filter_map(|field| {
            let value = values.get(&field.name).unwrap_or(&FormValue::Empty);
            validate_value(field, value).err()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{DatetimeOptions, NumericOptions, SelectOptions, StringOptions};

    fn select(values: &[&str]) -> SpaceField {
        SpaceField::new(
            "status",
            FieldSpec::Select {
                options: SelectOptions {
                    values: values.iter().map(|v| v.to_string()).collect(),
                    ..SelectOptions::default()
                },
                default: None,
            },
        )
    }

    #[test]
    fn test_required_empty_fails() {
        let field = select(&["a"]).required();
        let err = validate_value(&field, &FormValue::Empty).unwrap_err();
        assert_eq!(err.to_string(), "status: is required");
        assert!(validate_value(&select(&["a"]), &FormValue::Empty).is_ok());
    }

    #[test]
    fn test_select_membership() {
        let field = select(&["open", "closed"]);
        assert!(validate_value(&field, &FormValue::text("open")).is_ok());
        assert!(validate_value(&field, &FormValue::text("other")).is_err());
    }

    #[test]
    fn test_string_length_bounds() {
        let field = SpaceField::new(
            "code",
            FieldSpec::String {
                options: StringOptions {
                    min_length: Some(2),
                    max_length: Some(4),
                    ..StringOptions::default()
                },
                default: None,
            },
        );
        assert!(validate_value(&field, &FormValue::text("a")).is_err());
        assert!(validate_value(&field, &FormValue::text("abc")).is_ok());
        assert!(validate_value(&field, &FormValue::text("abcde")).is_err());
    }

    #[test]
    fn test_numeric_bounds_and_kind() {
        let field = SpaceField::new(
            "qty",
            FieldSpec::Numeric {
                options: NumericOptions {
                    kind: NumericKind::Int,
                    min: Some(1.0),
                    max: Some(5.0),
                },
                default: None,
            },
        );
        assert!(validate_value(&field, &FormValue::Number(3.0)).is_ok());
        assert!(validate_value(&field, &FormValue::Number(2.5)).is_err());
        assert!(validate_value(&field, &FormValue::Number(0.0)).is_err());
        assert!(validate_value(&field, &FormValue::Number(6.0)).is_err());
        assert!(validate_value(&field, &FormValue::text("many")).is_err());
    }

    #[test]
    fn test_datetime_text_must_parse() {
        let field = SpaceField::new(
            "due",
            FieldSpec::Datetime {
                options: DatetimeOptions::default(),
                default: None,
            },
        );
        assert!(validate_value(&field, &FormValue::text("2024-02-02")).is_ok());
        assert!(validate_value(&field, &FormValue::text("soon")).is_err());
    }

    #[test]
    fn test_validate_values_collects_all() {
        let fields = vec![select(&["a"]).required(), {
            let mut f = select(&["b"]);
            f.name = "other".into();
            f
        }];
        let mut values = FormValues::new();
        values.insert("other".into(), FormValue::text("zzz"));
        let errors = validate_values(&fields, &values);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "status");
        assert_eq!(errors[1].field, "other");
    }
}
