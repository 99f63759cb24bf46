use std::collections::BTreeMap;

use serde::Serialize;

use super::draft::ApplicationDraft;
use super::schema::{FieldSpec, FieldType, OptionSpec, OptionValue};

/// Value shipped to the evaluation service after type coercion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SubmittedValue {
    Number(f64),
    Text(String),
}

/// A coerced draft, keyed by field name, ready for submission.
pub type SubmittedRecord = BTreeMap<String, SubmittedValue>;

/// Coerce each draft value to its field's declared type.
///
/// Must only run on a draft that already passed validation. Number fields
/// fall back to `0` when the raw value does not parse; validation has
/// already range-checked every required number, so the fallback is only
/// reachable through blank optional fields.
pub fn coerce(schema: &[FieldSpec], draft: &ApplicationDraft) -> SubmittedRecord {
    let mut record = SubmittedRecord::new();

    for field in schema {
        let raw = draft.value_or_empty(&field.name);
        let value = match field.field_type {
            FieldType::Number => {
                let parsed = raw.trim().parse::<f64>().unwrap_or_else(|_| {
                    tracing::debug!(field = %field.name, %raw, "coercing unparseable number to 0");
                    0.0
                });
                SubmittedValue::Number(parsed)
            }
            FieldType::Select => resolve_option(field, raw),
            FieldType::Text => SubmittedValue::Text(raw.to_string()),
        };
        record.insert(field.name.clone(), value);
    }

    record
}

/// Resolve a raw select value against the field's options: value equality
/// wins over label equality, and the raw string stands when neither matches.
/// A label colliding with a different option's value is ambiguous; it is
/// flagged rather than silently resolved.
fn resolve_option(field: &FieldSpec, raw: &str) -> SubmittedValue {
    let options = match field.options.as_deref() {
        Some(options) => options,
        None => return SubmittedValue::Text(raw.to_string()),
    };

    let by_value = options.iter().position(|option| match option {
        OptionSpec::Pair { value, .. } => value.matches_raw(raw),
        OptionSpec::Plain(label) => label == raw,
    });
    let by_label = options.iter().position(|option| option.label() == raw);

    if let (Some(value_idx), Some(label_idx)) = (by_value, by_label) {
        if value_idx != label_idx {
            tracing::warn!(
                field = %field.name,
                %raw,
                "select value matches one option's value and another option's label"
            );
        }
    }

    let resolved = by_value.or(by_label).map(|idx| &options[idx]);
    match resolved {
        Some(OptionSpec::Pair { value, .. }) => match value {
            OptionValue::Number(n) => SubmittedValue::Number(*n),
            OptionValue::Text(text) => SubmittedValue::Text(text.clone()),
        },
        Some(OptionSpec::Plain(label)) => SubmittedValue::Text(label.clone()),
        None => SubmittedValue::Text(raw.to_string()),
    }
}
