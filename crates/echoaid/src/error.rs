//! Error types for echoaid.
//!
//! This module defines the crate-wide error type. Failures of the external AI
//! collaborator have their own type, [`AiError`](crate::ai::AiError), which is
//! wrapped here when it crosses into the application layer.

use std::path::PathBuf;
use thiserror::Error;

use crate::ai::AiError;
use crate::request::RequestStatus;

/// The main error type for echoaid operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Request Lifecycle Errors ===
    /// No request with the given identifier is known.
    #[error("request not found: {id}")]
    RequestNotFound {
        /// The identifier that was looked up.
        id: String,
    },

    /// A status change would move a request backwards.
    #[error("cannot move request {id} from {from} to {to}")]
    InvalidTransition {
        /// The request identifier.
        id: String,
        /// Current status.
        from: RequestStatus,
        /// Requested status.
        to: RequestStatus,
    },

    /// Only pending requests can be accepted by a volunteer.
    #[error("request {id} is {status} and cannot be accepted")]
    NotAcceptable {
        /// The request identifier.
        id: String,
        /// Current status.
        status: RequestStatus,
    },

    /// The submitted draft is incomplete.
    #[error("{message}")]
    InvalidDraft {
        /// User-facing explanation.
        message: String,
    },

    /// A pulse was attempted while the cooldown window is still open.
    #[error("pulse cooldown active: {remaining_secs}s remaining")]
    PulseCooldown {
        /// Whole seconds until the next pulse is allowed.
        remaining_secs: u64,
    },

    /// A pulse for this request is already being sent.
    #[error("a pulse is already being sent")]
    PulseInFlight,

    /// The action is not offered for the request's verification tier.
    #[error("{action} is not available for {tier} requests")]
    VerificationGate {
        /// The gated action.
        action: &'static str,
        /// The tier that blocked it.
        tier: String,
    },

    // === Collaborator Errors ===
    /// Urgency scoring of a request failed.
    #[error("failed to analyze emergency request: {0}")]
    Analysis(#[source] AiError),

    /// A grounded information lookup failed.
    #[error("failed to get grounded information: {0}")]
    Lookup(#[source] AiError),

    /// The chatbot could not produce a reply.
    #[error("chat failed: {0}")]
    Chat(#[source] AiError),

    /// Location detection failed.
    #[error("could not get location: {0}")]
    Geolocation(String),

    // === Auth Errors ===
    /// Login failed.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Signup with an email that is already registered.
    #[error("user with email {email} already exists")]
    UserExists {
        /// The conflicting email.
        email: String,
    },

    /// Signup details were rejected.
    #[error("{message}")]
    InvalidSignup {
        /// User-facing explanation.
        message: String,
    },

    /// The operation needs a signed-in user.
    #[error("not signed in")]
    NotAuthenticated,

    /// The signed-in user does not have a role allowed here.
    #[error("role {role} may not {action}")]
    Forbidden {
        /// The user's role.
        role: String,
        /// What was attempted.
        action: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for echoaid operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a request-not-found error.
    #[must_use]
    pub fn request_not_found(id: impl Into<String>) -> Self {
        Self::RequestNotFound { id: id.into() }
    }

    /// Create an invalid draft error.
    #[must_use]
    pub fn invalid_draft(message: impl Into<String>) -> Self {
        Self::InvalidDraft {
            message: message.into(),
        }
    }

    /// Create a geolocation error.
    #[must_use]
    pub fn geolocation(message: impl Into<String>) -> Self {
        Self::Geolocation(message.into())
    }

    /// Check if this error came from the AI collaborator.
    #[must_use]
    pub fn is_collaborator_error(&self) -> bool {
        matches!(self, Self::Analysis(_) | Self::Lookup(_) | Self::Chat(_))
    }

    /// Check if retrying the same operation later may succeed.
    ///
    /// Collaborator and storage failures are transient; validation, auth and
    /// lifecycle failures are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Analysis(_)
                | Self::Lookup(_)
                | Self::Chat(_)
                | Self::Geolocation(_)
                | Self::DatabaseQuery(_)
                | Self::Io(_)
                | Self::PulseCooldown { .. }
                | Self::PulseInFlight
        )
    }

    /// Message suitable for showing to the person using the app.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Analysis(_) => {
                "Failed to analyze emergency request. Please try again.".to_string()
            }
            Self::Lookup(_) => {
                "Failed to get information from web search. Please try again.".to_string()
            }
            Self::Chat(_) => "Sorry, I am having trouble connecting. Please try again.".to_string(),
            Self::Geolocation(_) => {
                "Could not get your location. Please enter it manually.".to_string()
            }
            Self::InvalidCredentials => "Invalid email or password".to_string(),
            Self::UserExists { .. } => "User with this email already exists".to_string(),
            other => other.to_string(),
        }
    }
}
