//! Field-scoped validation error collection.
//!
//! The workflow engine validates a whole candidate payload before writing
//! anything. Every unmet requirement is recorded against its field name,
//! so the caller can re-render a form with all messages at once instead of
//! discovering them one at a time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An ordered map of field name → validation messages.
///
/// `BTreeMap` keeps iteration deterministic, which keeps rendered error
/// summaries and test assertions stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    /// Create an empty error collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Whether any field has a recorded error.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of fields with at least one error.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether the given field has a recorded error.
    pub fn contains(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    /// Messages recorded against a field, if any.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.errors.get(field).map(|v| v.as_slice())
    }

    /// Iterate over (field, messages) pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// A single-line summary of all messages, for logs and error text.
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|(field, msgs)| format!("{}: {}", field, msgs.join("; ")))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Convert into a validation result: `Ok(())` when empty.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_add_and_lookup() {
        let mut errors = FieldErrors::new();
        errors.add("proposal_lead", "Proposal Lead is required");
        errors.add("lead_unit", "Lead Unit is required");

        assert_eq!(errors.len(), 2);
        assert!(errors.contains("proposal_lead"));
        assert!(!errors.contains("result_date"));
        assert_eq!(
            errors.get("lead_unit"),
            Some(&["Lead Unit is required".to_string()][..])
        );
    }

    #[test]
    fn test_summary_is_deterministic() {
        let mut errors = FieldErrors::new();
        errors.add("result_date", "Result date is required");
        errors.add("currency", "Please select a currency.");

        // BTreeMap ordering: currency before result_date.
        assert_eq!(
            errors.summary(),
            "currency: Please select a currency., result_date: Result date is required"
        );
    }

    #[test]
    fn test_multiple_messages_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("result_date", "Result date is required");
        errors.add("result_date", "Result date cannot be in the future");
        assert_eq!(errors.get("result_date").map(|m| m.len()), Some(2));
        assert_eq!(errors.len(), 1);
    }
}
