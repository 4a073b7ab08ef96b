//! Error type shared by the store and the recurrence calculator.

/// Errors raised while storing or evaluating birthdays.
#[derive(Debug, Clone, PartialEq)]
pub enum BirthdayError {
    /// A stored or supplied date is not a valid `YYYY-MM-DD` calendar date
    InvalidDate { input: String, reason: String },
    /// The name was empty after trimming
    EmptyName,
    /// Remove-by-name matched zero or several records; nothing was deleted
    AmbiguousDelete { name: String, matches: usize },
    /// The underlying SQLite call failed
    Database(String),
}

impl BirthdayError {
    /// True for errors caused by the caller's input rather than the service.
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, BirthdayError::Database(_))
    }
}

impl std::fmt::Display for BirthdayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BirthdayError::InvalidDate { input, reason } => {
                write!(f, "Invalid date '{}': {}", input, reason)
            }
            BirthdayError::EmptyName => write!(f, "Name must not be empty"),
            BirthdayError::AmbiguousDelete { name, matches: 0 } => {
                write!(f, "No birthday found for '{}'", name)
            }
            BirthdayError::AmbiguousDelete { name, matches } => write!(
                f,
                "Found {} birthdays named '{}', add the date to pick one",
                matches, name
            ),
            BirthdayError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for BirthdayError {}

impl From<rusqlite::Error> for BirthdayError {
    fn from(e: rusqlite::Error) -> Self {
        BirthdayError::Database(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_delete_messages() {
        let none = BirthdayError::AmbiguousDelete {
            name: "Ricardo".to_string(),
            matches: 0,
        };
        assert_eq!(none.to_string(), "No birthday found for 'Ricardo'");

        let two = BirthdayError::AmbiguousDelete {
            name: "Ricardo".to_string(),
            matches: 2,
        };
        assert!(two.to_string().starts_with("Found 2 birthdays"));
        assert!(two.is_caller_error());
    }

    #[test]
    fn test_database_error_is_not_caller_error() {
        let e: BirthdayError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(!e.is_caller_error());
    }
}
