use std::collections::BTreeMap;

use super::schema::FieldSpec;

/// Raw form values keyed by schema field name.
///
/// A draft always agrees with its schema on the field-name set: it is built
/// from the schema in one step and re-built whenever the schema changes,
/// never merged. Every value starts as the empty string regardless of the
/// field's declared type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationDraft {
    values: BTreeMap<String, String>,
}

impl ApplicationDraft {
    /// Initialize one empty entry per schema field.
    pub fn for_schema(schema: &[FieldSpec]) -> Self {
        let values = schema
            .iter()
            .map(|field| (field.name.clone(), String::new()))
            .collect();
        Self { values }
    }

    /// Overwrite exactly one entry; unknown names are rejected so the draft
    /// can never drift from the schema.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<(), UnknownDraftField> {
        match self.values.get_mut(name) {
            Some(slot) => {
                *slot = value.into();
                Ok(())
            }
            None => Err(UnknownDraftField(name.to_string())),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn value_or_empty(&self, name: &str) -> &str {
        self.get(name).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// Raised when an edit names a field outside the active schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("field {0:?} is not part of the active schema")]
pub struct UnknownDraftField(pub String);
