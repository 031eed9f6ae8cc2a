//! Required-field checks.
//!
//! Ingress runs these before an envelope is built; consumers run them again
//! on the delivered payload. Both sides report the full list of required
//! fields so callers see the same message regardless of which one failed.

use crate::error::CoreError;

/// Return `true` if `value` is present and not blank.
pub fn is_present(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Ensure every `(name, value)` pair is present and not blank.
///
/// On failure the error message names all required fields, e.g.
/// `"Required fields: to, subject, body"`.
pub fn require_fields(fields: &[(&'static str, Option<&str>)]) -> Result<(), CoreError> {
    if fields.iter().all(|(_, value)| is_present(*value)) {
        return Ok(());
    }

    let names: Vec<&str> = fields.iter().map(|(name, _)| *name).collect();
    Err(CoreError::Validation(format!(
        "Required fields: {}",
        names.join(", ")
    )))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_present_passes() {
        assert!(require_fields(&[("to", Some("a@b.com")), ("subject", Some("S"))]).is_ok());
    }

    #[test]
    fn missing_field_names_all_required_fields() {
        let err = require_fields(&[("to", Some("+1555")), ("message", None)]).unwrap_err();
        assert_eq!(err.to_string(), "Required fields: to, message");
    }

    #[test]
    fn blank_values_count_as_missing() {
        assert!(!is_present(Some("")));
        assert!(!is_present(Some("   ")));
        assert!(require_fields(&[("title", Some(" "))]).is_err());
    }
}
