//! Input validation applied before anything is written.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{0} title is required")]
    EmptyTitle(&'static str),

    #[error("Invalid email address: '{0}'")]
    InvalidEmail(String),

    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),
}

/// Trim a title and reject it when nothing is left.
///
/// # Examples
/// ```
/// use db::validation::normalize_title;
///
/// assert_eq!(normalize_title("Board", "  Sprint 1 ").unwrap(), "Sprint 1");
/// assert!(normalize_title("Board", "   ").is_err());
/// ```
pub fn normalize_title(entity: &'static str, raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(ValidationError::EmptyTitle(entity))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Blank descriptions are stored as NULL.
pub fn normalize_description(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

/// Minimal shape check: one `@` with something on both sides and a dot in the domain.
pub fn normalize_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if valid {
        Ok(email)
    } else {
        Err(ValidationError::InvalidEmail(raw.trim().to_string()))
    }
}

pub fn validate_password(password: &str, min_length: usize) -> Result<(), ValidationError> {
    if password.chars().count() < min_length {
        Err(ValidationError::PasswordTooShort(min_length))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_title_trims() {
        assert_eq!(normalize_title("Task", "\tWrite docs\n").unwrap(), "Write docs");
    }

    #[test]
    fn test_normalize_title_rejects_blank() {
        assert_eq!(
            normalize_title("Task", ""),
            Err(ValidationError::EmptyTitle("Task"))
        );
        let err = normalize_title("Board", "  ").unwrap_err();
        assert_eq!(err.to_string(), "Board title is required");
    }

    #[test]
    fn test_normalize_description() {
        assert_eq!(normalize_description(None), None);
        assert_eq!(normalize_description(Some("   ")), None);
        assert_eq!(
            normalize_description(Some(" notes ")),
            Some("notes".to_string())
        );
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(" Ada@Example.com ").unwrap(), "ada@example.com");
        assert!(normalize_email("ada").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("ada@example").is_err());
        assert!(normalize_email("ada@@example.com").is_err());
        assert!(normalize_email("ada@example.").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret", 6).is_ok());
        assert_eq!(
            validate_password("short", 6),
            Err(ValidationError::PasswordTooShort(6))
        );
    }
}
