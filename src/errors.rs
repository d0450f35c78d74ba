use serde_json::Value;
use std::fmt;

use crate::workflow_state::Slot;

/// Application-specific error types.
///
/// Two classes matter to callers: local validation failures, raised before
/// any network call, and remote failures (an error status from the backend or
/// a transport problem). See [`AppError::is_local`].
#[derive(Debug)]
pub enum AppError {
    /// Local input validation failed. No request was sent.
    Validation(String),
    /// A request for this slot is already in flight.
    Busy(Slot),
    /// The backend answered with a non-success status.
    Remote {
        /// HTTP status code.
        status: u16,
        /// Response body. Non-JSON bodies are kept as a JSON string.
        body: Value,
    },
    /// The request could not be completed (connection, timeout, body read).
    Transport(String),
    /// The backend answered with a success status but an unexpected body.
    MalformedResponse(String),
    /// Local file system error while saving an export.
    Io(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// True for errors raised before any network call was made.
    pub fn is_local(&self) -> bool {
        match self {
            AppError::Validation(_) | AppError::Busy(_) => true,
            AppError::WithContext { source, .. } => source.is_local(),
            _ => false,
        }
    }

    /// Text shown to the user for this error, verbatim.
    ///
    /// Remote errors show the backend payload as pretty JSON, transport and
    /// parsing errors are prefixed with `Error:`.
    pub fn display_body(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Busy(slot) => format!("A {} request is already running.", slot.label()),
            AppError::Remote { body, .. } => match body {
                Value::String(text) => text.clone(),
                other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
            },
            AppError::Transport(msg) | AppError::MalformedResponse(msg) | AppError::Io(msg) => {
                format!("Error: {}", msg)
            }
            AppError::WithContext { source, .. } => source.display_body(),
        }
    }

    /// The `message` field of a structured remote error, if the backend sent one.
    pub fn remote_message(&self) -> Option<String> {
        match self {
            AppError::Remote { body, .. } => body
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string),
            AppError::WithContext { source, .. } => source.remote_message(),
            _ => None,
        }
    }

    /// Alert text for a failed export.
    pub fn export_notice(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Busy(_) => self.display_body(),
            AppError::Remote { status, .. } => match self.remote_message() {
                Some(message) => format!("Export failed: {}", message),
                None => format!("Export failed: HTTP {}", status),
            },
            AppError::Transport(msg) | AppError::MalformedResponse(msg) | AppError::Io(msg) => {
                format!("Export error: {}", msg)
            }
            AppError::WithContext { source, .. } => source.export_notice(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::Busy(slot) => write!(f, "Request already in flight: {}", slot.label()),
            AppError::Remote { status, body } => write!(f, "Backend returned {}: {}", status, body),
            AppError::Transport(msg) => write!(f, "Transport error: {}", msg),
            AppError::MalformedResponse(msg) => write!(f, "Malformed response: {}", msg),
            AppError::Io(msg) => write!(f, "I/O error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

// Make AppError cloneable for WithContext variant
impl Clone for AppError {
    fn clone(&self) -> Self {
        match self {
            AppError::Validation(msg) => AppError::Validation(msg.clone()),
            AppError::Busy(slot) => AppError::Busy(*slot),
            AppError::Remote { status, body } => AppError::Remote {
                status: *status,
                body: body.clone(),
            },
            AppError::Transport(msg) => AppError::Transport(msg.clone()),
            AppError::MalformedResponse(msg) => AppError::MalformedResponse(msg.clone()),
            AppError::Io(msg) => AppError::Io(msg.clone()),
            AppError::WithContext { source, context } => AppError::WithContext {
                source: source.clone(),
                context: context.clone(),
            },
        }
    }
}

impl From<reqwest::Error> for AppError {
    /// Converts a `reqwest::Error` into an `AppError`.
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::MalformedResponse(err.to_string())
        } else {
            AppError::Transport(err.to_string())
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

/// Extension for std::io::Error to add context
impl<T> ResultExt<T> for Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::from(e)),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::from(e)),
            context: f(),
        })
    }
}
