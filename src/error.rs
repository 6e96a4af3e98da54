//! Error types for the option engine.
//!
//! Validation errors are user-facing and recoverable; configuration errors
//! signal a deployment or data-integrity defect and are not. Read paths never
//! produce either kind - malformed stored data degrades silently.

use thiserror::Error;
use uuid::Uuid;

use crate::models::OptionType;

/// Result type alias for option engine operations.
pub type OptionResult<T> = Result<T, OptionError>;

#[derive(Debug, Error)]
pub enum OptionError {
    /// User-facing validation failure; show the message back to the user.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Deployment/data-integrity defect, e.g. a custom option referencing an
    /// unregistered provider identifier.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Failure in the persistence collaborator.
    #[error("repository error: {0}")]
    Repository(#[from] anyhow::Error),
}

/// A user-facing validation failure.
///
/// Carries two independent strings: `message` is displayable to the user,
/// `log_message` identifies the offending key/type for internal logs. They
/// are built separately, not derived from one template.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
    log_message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>, log_message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            log_message: log_message.into(),
        }
    }

    /// Two or more submitted options share the same key.
    pub fn duplicate_key(key: &str) -> Self {
        Self::new(
            format!("An option with the key '{}' is already added.", key),
            format!("Duplicate option key '{}' in the submitted option set.", key),
        )
    }

    /// An option value cannot be coerced to its declared type.
    pub fn invalid_value(key: &str, option_type: OptionType) -> Self {
        Self::new(
            format!(
                "Option '{}' has an invalid {} value.",
                key,
                option_type.label()
            ),
            format!(
                "Failed to coerce value of option '{}' to type {}.",
                key,
                option_type.label()
            ),
        )
    }

    /// An attempt to delete an option definition marked as non-deletable.
    pub fn cannot_delete_option(key: &str, id: Uuid) -> Self {
        Self::new(
            format!("Option '{}' cannot be deleted.", key),
            format!("Cannot delete option {}, because it's marked as non-deletable.", id),
        )
    }

    /// The user-displayable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The internal log message.
    pub fn log_message(&self) -> &str {
        &self.log_message
    }
}

/// Why a string value could not be coerced to its declared option type.
///
/// Coercion failure is a routine outcome on user input, so it is modeled as a
/// result rather than driven through panics or downcasting. Save paths turn
/// it into a [`ValidationError`]; read paths swallow it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("not a valid integer: '{0}'")]
    InvalidInteger(String),

    #[error("not a valid number: '{0}'")]
    InvalidFloat(String),

    #[error("not a valid ISO date: '{0}'")]
    InvalidDate(String),

    #[error("not a valid boolean: '{0}'")]
    InvalidBoolean(String),

    #[error("custom option provider rejected value: {0}")]
    Provider(String),
}
