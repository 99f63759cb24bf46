use super::draft::ApplicationDraft;
use super::schema::{FieldSpec, FieldType};

/// Why a field's value was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ViolationReason {
    Missing,
    NotANumber,
    BelowMin { min: f64 },
    AboveMax { max: f64 },
}

/// One field-level validation failure, labelled for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub field: String,
    pub reason: ViolationReason,
}

impl Violation {
    /// User-facing message for this violation.
    pub fn message(&self) -> String {
        match &self.reason {
            ViolationReason::Missing => format!("Missing required field: {}", self.field),
            ViolationReason::NotANumber => format!("{} must be a number", self.field),
            ViolationReason::BelowMin { min } => format!("{} must be >= {min}", self.field),
            ViolationReason::AboveMax { max } => format!("{} must be <= {max}", self.field),
        }
    }
}

/// Ordered outcome of one validation pass over a draft.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn first_missing(&self) -> Option<&Violation> {
        self.violations
            .iter()
            .find(|violation| violation.reason == ViolationReason::Missing)
    }

    /// First type or range violation, in schema order.
    pub fn first_range(&self) -> Option<&Violation> {
        self.violations
            .iter()
            .find(|violation| violation.reason != ViolationReason::Missing)
    }

    /// Single user-facing notice for a failed attempt: all missing labels
    /// first, otherwise the first type/range message.
    pub fn notice(&self) -> Option<String> {
        let missing: Vec<&str> = self
            .violations
            .iter()
            .filter(|violation| violation.reason == ViolationReason::Missing)
            .map(|violation| violation.field.as_str())
            .collect();
        if !missing.is_empty() {
            return Some(format!(
                "Please fill in required fields: {}",
                missing.join(", ")
            ));
        }
        self.first_range().map(Violation::message)
    }
}

/// Pure validation of a draft against its schema.
///
/// Deterministic and side-effect free: re-running on identical inputs yields
/// identical reports. A required blank yields `Missing` and nothing else for
/// that field; blanks on non-required fields are skipped entirely; any
/// non-blank value of a number field must parse to a finite float and sit
/// inside the declared bounds.
pub fn validate(schema: &[FieldSpec], draft: &ApplicationDraft) -> ValidationReport {
    let mut violations = Vec::new();

    for field in schema {
        let raw = draft.value_or_empty(&field.name);
        if raw.trim().is_empty() {
            if field.required {
                violations.push(Violation {
                    field: field.label.clone(),
                    reason: ViolationReason::Missing,
                });
            }
            continue;
        }

        if field.field_type == FieldType::Number {
            match raw.trim().parse::<f64>() {
                Ok(value) if value.is_finite() => {
                    if let Some(min) = field.min {
                        if value < min {
                            violations.push(Violation {
                                field: field.label.clone(),
                                reason: ViolationReason::BelowMin { min },
                            });
                        }
                    }
                    if let Some(max) = field.max {
                        if value > max {
                            violations.push(Violation {
                                field: field.label.clone(),
                                reason: ViolationReason::AboveMax { max },
                            });
                        }
                    }
                }
                _ => violations.push(Violation {
                    field: field.label.clone(),
                    reason: ViolationReason::NotANumber,
                }),
            }
        }
    }

    ValidationReport { violations }
}
