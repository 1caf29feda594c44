//! Defines the app level error type and the stable kind tags reported to tool callers.

use crate::transaction::ValidationError;

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// An input failed validation.
    ///
    /// The wrapped error names the offending field and is safe to show to the
    /// caller verbatim.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The session token is missing, expired or does not belong to any user.
    #[error("invalid or expired token")]
    Unauthenticated,

    /// The user provided an invalid combination of username and password.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging. When
    /// communicating with the caller this error should be replaced with a
    /// general error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The username is already taken by another user.
    #[error("the username \"{0}\" is already taken")]
    DuplicateUsername(String),

    /// The requested resource was not found.
    ///
    /// For transactions this is also returned when the transaction belongs to
    /// another user, so that callers cannot probe for the existence of other
    /// users' data.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// A result could not be converted to JSON.
    #[error("could not serialize the result: {0}")]
    SerializationError(String),

    /// A configuration value was rejected, e.g. a log file that cannot be opened.
    #[error("invalid configuration: {0}")]
    ConfigurationError(String),
}

impl Error {
    /// A short, stable tag identifying the class of error.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::Unauthenticated => "unauthenticated",
            Error::InvalidCredentials => "invalid_credentials",
            Error::TooWeak(_) => "weak_password",
            Error::DuplicateUsername(_) => "duplicate_username",
            Error::NotFound => "not_found",
            Error::SqlError(_) | Error::DatabaseLockError | Error::HashingError(_) => {
                "repository_error"
            }
            Error::SerializationError(_) => "internal_error",
            Error::InvalidTimezoneError(_) | Error::ConfigurationError(_) => {
                "configuration_error"
            }
        }
    }

    /// The message that may be shown to the caller.
    ///
    /// Internal failures are replaced with a generic message, the details
    /// only go to the logs.
    pub fn public_message(&self) -> String {
        match self {
            Error::SqlError(_)
            | Error::DatabaseLockError
            | Error::HashingError(_)
            | Error::SerializationError(_) => {
                "An unexpected error occurred, check the logs for more details.".to_owned()
            }
            error => error.to_string(),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Error, transaction::ValidationError};

    #[test]
    fn no_rows_maps_to_not_found() {
        let error: Error = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(error, Error::NotFound);
        assert_eq!(error.kind(), "not_found");
    }

    #[test]
    fn validation_error_keeps_field_in_message() {
        let error: Error = ValidationError::new("amount", "must be greater than zero").into();

        assert_eq!(error.kind(), "validation_error");
        assert_eq!(
            error.public_message(),
            "invalid amount: must be greater than zero"
        );
    }

    #[test]
    fn sql_errors_are_hidden_from_callers() {
        let error = Error::SqlError(rusqlite::Error::InvalidQuery);

        assert_eq!(error.kind(), "repository_error");
        assert!(!error.public_message().contains("SQL"));
    }
}
