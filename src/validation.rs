//! Validation annotations and the schema constraints they imply.

use crate::model::{Parameter, Schema};
use serde::{Deserialize, Serialize};

fn inclusive_default() -> bool {
    true
}

/// A validation constraint declared on a parameter or model field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Validation {
    NotNull,
    NotBlank,
    NotEmpty,
    Min {
        value: f64,
    },
    Max {
        value: f64,
    },
    DecimalMin {
        value: f64,
        #[serde(default = "inclusive_default")]
        inclusive: bool,
    },
    DecimalMax {
        value: f64,
        #[serde(default = "inclusive_default")]
        inclusive: bool,
    },
    Positive,
    PositiveOrZero,
    Negative,
    NegativeOrZero,
    Size {
        #[serde(default)]
        min: Option<u64>,
        #[serde(default)]
        max: Option<u64>,
    },
    Pattern {
        regexp: String,
    },
    Email,
}

impl Validation {
    /// Not-null, not-blank and not-empty all demand a value
    pub fn is_required_family(&self) -> bool {
        matches!(
            self,
            Validation::NotNull | Validation::NotBlank | Validation::NotEmpty
        )
    }
}

pub fn has_required_family(validations: &[Validation]) -> bool {
    validations.iter().any(Validation::is_required_family)
}

/// Writes numeric and string constraints onto `schema`.
///
/// Reference schemas are left untouched: siblings of `$ref` are ignored by OpenAPI 3.0 readers,
/// and writing them would alter the shared component.
pub fn apply_to_schema(schema: &mut Schema, validations: &[Validation]) {
    if schema.reference.is_some() {
        return;
    }
    for validation in validations {
        match validation {
            Validation::Min { value } => schema.minimum = Some(*value),
            Validation::Max { value } => schema.maximum = Some(*value),
            Validation::DecimalMin { value, inclusive } => {
                schema.minimum = Some(*value);
                if !inclusive {
                    schema.exclusive_minimum = Some(true);
                }
            }
            Validation::DecimalMax { value, inclusive } => {
                schema.maximum = Some(*value);
                if !inclusive {
                    schema.exclusive_maximum = Some(true);
                }
            }
            Validation::Positive => {
                schema.minimum = Some(0.0);
                schema.exclusive_minimum = Some(true);
            }
            Validation::PositiveOrZero => schema.minimum = Some(0.0),
            Validation::Negative => {
                schema.maximum = Some(0.0);
                schema.exclusive_maximum = Some(true);
            }
            Validation::NegativeOrZero => schema.maximum = Some(0.0),
            Validation::Size { min, max } => {
                if schema.is_array() {
                    schema.min_items = min.or(schema.min_items);
                    schema.max_items = max.or(schema.max_items);
                } else if schema.schema_type.as_deref() == Some("string") {
                    schema.min_length = min.or(schema.min_length);
                    schema.max_length = max.or(schema.max_length);
                }
            }
            Validation::Pattern { regexp } => schema.pattern = Some(regexp.clone()),
            Validation::Email => schema.format = Some("email".to_string()),
            Validation::NotNull | Validation::NotBlank | Validation::NotEmpty => {}
        }
    }
}

/// Applies validations to a parameter: the required family forces `required`, the rest
/// constrain its schema.
pub fn apply_to_parameter(parameter: &mut Parameter, validations: &[Validation]) {
    if has_required_family(validations) {
        parameter.required = Some(true);
    }
    if let Some(schema) = parameter.schema.as_mut() {
        apply_to_schema(schema, validations);
    }
}

/// Whether a body parameter makes the request body required.
///
/// A required-family validation always does. Otherwise the parameter must be mandatory and
/// carry at least one annotation or validation; a bare parameter leaves `required` unset.
pub fn body_required(validations: &[Validation], optional: bool, annotated: bool) -> bool {
    has_required_family(validations) || (!optional && annotated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_not_null_forces_required() {
        let mut parameter = Parameter {
            name: Some("q".to_string()),
            required: Some(false),
            schema: Some(Schema::string()),
            ..Default::default()
        };
        apply_to_parameter(&mut parameter, &[Validation::NotNull]);
        assert_eq!(parameter.required, Some(true));
    }

    #[test]
    fn test_exclusive_decimal_bounds() {
        let mut schema = Schema::of_type("number");
        apply_to_schema(
            &mut schema,
            &[
                Validation::DecimalMin {
                    value: 1.5,
                    inclusive: false,
                },
                Validation::DecimalMax {
                    value: 9.0,
                    inclusive: true,
                },
            ],
        );
        assert_eq!(schema.minimum, Some(1.5));
        assert_eq!(schema.exclusive_minimum, Some(true));
        assert_eq!(schema.maximum, Some(9.0));
        assert_eq!(schema.exclusive_maximum, None);
    }

    #[test]
    fn test_size_targets_items_for_arrays_and_length_for_strings() {
        let size = [Validation::Size {
            min: Some(1),
            max: Some(5),
        }];

        let mut array = Schema::array(Schema::string());
        apply_to_schema(&mut array, &size);
        assert_eq!((array.min_items, array.max_items), (Some(1), Some(5)));
        assert_eq!(array.min_length, None);

        let mut text = Schema::string();
        apply_to_schema(&mut text, &size);
        assert_eq!((text.min_length, text.max_length), (Some(1), Some(5)));

        let mut number = Schema::with_format("integer", "int64");
        apply_to_schema(&mut number, &size);
        assert_eq!(number, Schema::with_format("integer", "int64"));

        let mut object = Schema::object();
        apply_to_schema(&mut object, &size);
        assert_eq!(object, Schema::object());
    }

    #[test]
    fn test_positive_is_exclusive_zero() {
        let mut schema = Schema::of_type("integer");
        apply_to_schema(&mut schema, &[Validation::Positive]);
        assert_eq!(schema.minimum, Some(0.0));
        assert_eq!(schema.exclusive_minimum, Some(true));
    }

    #[test]
    fn test_reference_schema_is_not_constrained() {
        let mut schema = Schema::reference("User");
        apply_to_schema(&mut schema, &[Validation::Min { value: 3.0 }]);
        assert_eq!(schema, Schema::reference("User"));
    }

    #[test]
    fn test_deserialize_from_yaml() {
        let validations: Vec<Validation> = serde_yaml::from_str(
            "- kind: not_blank\n- kind: size\n  max: 20\n- kind: decimal_min\n  value: 0.5\n",
        )
        .unwrap();
        assert_eq!(
            validations,
            vec![
                Validation::NotBlank,
                Validation::Size {
                    min: None,
                    max: Some(20)
                },
                Validation::DecimalMin {
                    value: 0.5,
                    inclusive: true
                },
            ]
        );
    }

    #[test]
    fn test_body_required() {
        assert!(body_required(&[], false, true));
        assert!(!body_required(&[], false, false));
        assert!(!body_required(&[], true, true));
        assert!(body_required(&[Validation::NotEmpty], true, true));
    }
}
