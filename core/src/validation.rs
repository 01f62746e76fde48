use crate::error::{DexError, Result};
use crate::ids;

/// Field-level validation for task inputs, independent of graph state.
pub struct TaskValidator;

impl TaskValidator {
    /// Task names must be non-empty (after trimming) and at most 200 chars.
    pub fn validate_name(name: &str) -> Result<()> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DexError::validation("name cannot be empty"));
        }
        if trimmed.len() > 200 {
            return Err(DexError::validation(
                "name must be at most 200 characters long",
            ));
        }
        Ok(())
    }

    /// Descriptions may be empty; when present they are capped at 10,000
    /// characters to keep the active store file reasonably sized.
    pub fn validate_description(description: &str) -> Result<()> {
        if description.len() > 10_000 {
            return Err(DexError::validation(
                "description must be at most 10,000 characters long",
            ));
        }
        Ok(())
    }

    /// Priority must fall in `[0, 100]`; lower is higher priority.
    pub fn validate_priority(priority: i32) -> Result<()> {
        if !(0..=100).contains(&priority) {
            return Err(DexError::validation(
                "priority must be between 0 and 100 inclusive",
            ));
        }
        Ok(())
    }

    /// Externally supplied ids (import) must match `^[0-9a-z]{8}$`.
    pub fn validate_id_format(id: &str) -> Result<()> {
        if !ids::is_valid_id(id) {
            return Err(DexError::validation(format!(
                "'{id}' is not a valid task id; expected 8 characters from [0-9a-z]"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names_pass() {
        assert!(TaskValidator::validate_name("Implement login").is_ok());
        assert!(TaskValidator::validate_name("A").is_ok());
    }

    #[test]
    fn invalid_names_are_rejected() {
        assert!(TaskValidator::validate_name("").is_err());
        assert!(TaskValidator::validate_name("   ").is_err());
        assert!(TaskValidator::validate_name(&"a".repeat(201)).is_err());
    }

    #[test]
    fn empty_description_is_allowed() {
        assert!(TaskValidator::validate_description("").is_ok());
    }

    #[test]
    fn overlong_description_is_rejected() {
        assert!(TaskValidator::validate_description(&"a".repeat(10_001)).is_err());
    }

    #[test]
    fn priority_bounds_are_enforced() {
        assert!(TaskValidator::validate_priority(0).is_ok());
        assert!(TaskValidator::validate_priority(100).is_ok());
        assert!(TaskValidator::validate_priority(-1).is_err());
        assert!(TaskValidator::validate_priority(101).is_err());
    }

    #[test]
    fn id_format_validation_matches_generator_output() {
        assert!(TaskValidator::validate_id_format("abc12345").is_ok());
        assert!(TaskValidator::validate_id_format("ABC12345").is_err());
        assert!(TaskValidator::validate_id_format("short").is_err());
    }
}
