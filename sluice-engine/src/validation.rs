//! Data quality validation
//!
//! Rules that parse are handed to the validator, but they are not evaluated
//! yet: every record is reported valid.

use sluice_core::domain::node::ValidationRule;
use sluice_core::domain::record::RecordSet;
use tracing::debug;

/// Result of validating a record set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors_count: u64,
    pub valid_records: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, records: &RecordSet, rules: &[ValidationRule]) -> ValidationReport {
        let active = rules.iter().filter(|rule| rule.is_active).count();
        debug!(
            "Validating {} records against {} active rules",
            records.len(),
            active
        );

        // TODO: evaluate not_null/unique/range rules and count failures by severity
        ValidationReport {
            errors_count: 0,
            valid_records: records.len() as u64,
        }
    }
}
