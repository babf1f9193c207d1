//! Operator-facing input fields of the intrusion form
//!
//! Each field carries its label, help text, accepted values and the value
//! the form starts with. Input surfaces use this to prompt and to check
//! operator input; the reconciliation pipeline never looks at it.

use crate::error::{ArtifactError, RecordError};
use crate::models::FeatureRecord;
use crate::schema::FeatureSchema;
use serde::Serialize;

/// Accepted values of a field
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// Whole number, at least `min`
    Count { min: f64 },
    /// Real number in `[min, max]`
    Ratio { min: f64, max: f64 },
    /// One of a fixed set of values
    Choice { options: &'static [f64] },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub kind: FieldKind,
    pub default: f64,
}

impl FieldSpec {
    /// Check an operator-supplied value against the field's bounds
    pub fn check(&self, value: f64) -> Result<(), RecordError> {
        match self.kind {
            FieldKind::Count { min } => {
                if !value.is_finite() || value < min {
                    Err(RecordError::OutOfRange {
                        feature: self.key.to_string(),
                        value,
                        min,
                        max: f64::INFINITY,
                    })
                } else if value.fract() != 0.0 {
                    Err(RecordError::NotWholeNumber {
                        feature: self.key.to_string(),
                        value,
                    })
                } else {
                    Ok(())
                }
            }
            FieldKind::Ratio { min, max } => {
                if value >= min && value <= max {
                    Ok(())
                } else {
                    Err(RecordError::OutOfRange {
                        feature: self.key.to_string(),
                        value,
                        min,
                        max,
                    })
                }
            }
            FieldKind::Choice { options } => {
                if options.contains(&value) {
                    Ok(())
                } else {
                    Err(RecordError::NotAChoice {
                        feature: self.key.to_string(),
                        value,
                        allowed: options.to_vec(),
                    })
                }
            }
        }
    }
}

/// The six traffic features collected by the form, in form order
pub const TRAFFIC_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        key: "count",
        label: "Count",
        description: "Number of connections to the same host in a short time.",
        kind: FieldKind::Count { min: 0.0 },
        default: 5.0,
    },
    FieldSpec {
        key: "src_bytes",
        label: "Source Bytes",
        description: "Data sent from source to destination (in bytes).",
        kind: FieldKind::Count { min: 0.0 },
        default: 500.0,
    },
    FieldSpec {
        key: "logged_in",
        label: "Logged In",
        description: "User logged in? (1 = Yes, 0 = No)",
        kind: FieldKind::Choice {
            options: &[0.0, 1.0],
        },
        default: 0.0,
    },
    FieldSpec {
        key: "srv_serror_rate",
        label: "Service Error Rate",
        description: "Percentage of connections with errors.",
        kind: FieldKind::Ratio { min: 0.0, max: 1.0 },
        default: 0.2,
    },
    FieldSpec {
        key: "dst_bytes",
        label: "Destination Bytes",
        description: "Data sent from destination to source.",
        kind: FieldKind::Count { min: 0.0 },
        default: 1000.0,
    },
    FieldSpec {
        key: "srv_count",
        label: "Service Count",
        description: "Number of connections to the same service.",
        kind: FieldKind::Count { min: 0.0 },
        default: 10.0,
    },
];

pub fn find_field(key: &str) -> Option<&'static FieldSpec> {
    TRAFFIC_FIELDS.iter().find(|f| f.key == key)
}

/// Schema in form order
pub fn traffic_schema() -> Result<FeatureSchema, ArtifactError> {
    FeatureSchema::new(TRAFFIC_FIELDS.iter().map(|f| f.key))
}

/// Record holding every field's initial form value
pub fn default_record() -> FeatureRecord {
    TRAFFIC_FIELDS.iter().map(|f| (f.key, f.default)).collect()
}

/// Check every catalogued value in `record`; names outside the catalogue are
/// left to the reconciliation policy.
pub fn check_record(record: &FeatureRecord) -> Result<(), RecordError> {
    for field in TRAFFIC_FIELDS {
        if let Some(value) = record.get(field.key) {
            field.check(value)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_pass_their_own_checks() {
        for field in TRAFFIC_FIELDS {
            assert!(field.check(field.default).is_ok(), "{}", field.key);
        }
        assert!(check_record(&default_record()).is_ok());
    }

    #[test]
    fn test_traffic_schema_matches_form_order() {
        let schema = traffic_schema().unwrap();
        assert_eq!(
            schema.names(),
            &[
                "count",
                "src_bytes",
                "logged_in",
                "srv_serror_rate",
                "dst_bytes",
                "srv_count"
            ]
        );
    }

    #[test]
    fn test_count_rejects_negative_and_fractional() {
        let field = find_field("count").unwrap();
        assert!(field.check(0.0).is_ok());
        assert!(field.check(-1.0).is_err());
        assert!(field.check(f64::NAN).is_err());
    }

    #[test]
    fn test_fractional_count_is_not_reported_out_of_range() {
        let field = find_field("count").unwrap();
        let err = field.check(2.5).unwrap_err();
        assert_eq!(
            err,
            RecordError::NotWholeNumber {
                feature: "count".to_string(),
                value: 2.5
            }
        );
        assert_eq!(err.to_string(), "count must be a whole number, got 2.5");
    }

    #[test]
    fn test_ratio_bounds() {
        let field = find_field("srv_serror_rate").unwrap();
        assert!(field.check(0.0).is_ok());
        assert!(field.check(1.0).is_ok());
        assert!(matches!(
            field.check(1.5),
            Err(RecordError::OutOfRange { max, .. }) if max == 1.0
        ));
    }

    #[test]
    fn test_choice_field() {
        let field = find_field("logged_in").unwrap();
        assert!(field.check(1.0).is_ok());
        assert!(matches!(
            field.check(2.0),
            Err(RecordError::NotAChoice { .. })
        ));
    }

    #[test]
    fn test_check_record_ignores_uncatalogued_names() {
        let record = FeatureRecord::new().with("count", 3.0).with("bogus_field", -99.0);
        assert!(check_record(&record).is_ok());
    }
}
