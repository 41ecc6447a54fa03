//! Error taxonomy shared by every screen operation.
//!
//! Validation errors never reach the network. Remote errors are logged where
//! they happen and turned into short user-facing messages by the screens.
//! The IPC layer flattens everything to `String`.

use thiserror::Error;
use uuid::Uuid;

/// Locally detected input problems. Reported before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Enter the cashier name")]
    MissingCashierName,
    #[error("Select the date")]
    MissingDate,
    #[error("The date cannot be later than today")]
    FutureDate,
    #[error("Add at least one pizza")]
    NoLines,
    #[error("Complete every pizza field")]
    IncompleteLine { line: usize },
    #[error("At least one pizza must remain")]
    LastLine,
    #[error("Too many pizzas in one record")]
    TooManyLines,
    #[error("Pizza line {0} does not exist")]
    NoSuchLine(usize),
    #[error("Enter a valid number of pizzas that arrived at central")]
    InvalidArrivedCount,
    #[error("This record has already been validated")]
    AlreadyValidated,
    #[error("Select a record first")]
    NoRecordSelected,
    #[error("E-mail and password are required")]
    MissingCredentials,
    #[error("Invalid branch filter: {0}")]
    InvalidBranchFilter(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Bad credentials, expired or revoked session.
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("not signed in")]
    NotSignedIn,

    /// The signed-in profile cannot perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("backend error (HTTP {status}): {message}")]
    Remote { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    /// A mutation returned no rows. Row-level policies deny silently this way.
    #[error("the update did not affect any row")]
    NoRowsAffected,

    #[error("line items could not be saved and record {record_id} could not be removed: {cause}")]
    OrphanedRecord { record_id: Uuid, cause: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Short text for the person at the screen. Detail stays in the logs.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(v) => v.to_string(),
            AppError::Auth(_) => "Invalid user or password".to_string(),
            AppError::NotSignedIn => "Your session has ended, sign in again".to_string(),
            AppError::Forbidden(_) => "Your profile is not allowed to do this".to_string(),
            AppError::NoRowsAffected => {
                "The update could not be verified (check access policies)".to_string()
            }
            AppError::Network(_) => "Cannot reach the server, check the connection".to_string(),
            AppError::Config(msg) => format!("The application is not configured: {msg}"),
            AppError::Remote { .. } | AppError::OrphanedRecord { .. } | AppError::Storage(_) => {
                "Unexpected error, try again".to_string()
            }
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Storage(format!("sqlite: {e}"))
    }
}

impl From<keyring::Error> for AppError {
    fn from(e: keyring::Error) -> Self {
        AppError::Storage(format!("keyring: {e}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Storage(format!("io: {e}"))
    }
}

impl From<zip::result::ZipError> for AppError {
    fn from(e: zip::result::ZipError) -> Self {
        AppError::Storage(format!("zip: {e}"))
    }
}

impl From<rust_xlsxwriter::XlsxError> for AppError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        AppError::Storage(format!("xlsx: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_pass_their_text_through() {
        let err = AppError::from(ValidationError::MissingCashierName);
        assert!(err.is_validation());
        assert_eq!(err.user_message(), "Enter the cashier name");
    }

    #[test]
    fn silent_denial_message_differs_from_generic_failure() {
        let denied = AppError::NoRowsAffected.user_message();
        let failed = AppError::Remote {
            status: 500,
            message: "boom".into(),
        }
        .user_message();
        assert_ne!(denied, failed);
        assert!(denied.contains("access policies"));
    }

    #[test]
    fn auth_message_does_not_leak_backend_detail() {
        let err = AppError::Auth("invalid_grant: Invalid login credentials".into());
        assert_eq!(err.user_message(), "Invalid user or password");
    }
}
