/*!
 * Error types for the reelsmith pipeline.
 *
 * This module contains the error taxonomy used across the crate,
 * using the thiserror crate for ergonomic error definitions:
 * - `TemplateError`: prompt template loading, rendering and validation
 * - `GenerationError`: script and media generation collaborators
 * - `PersistenceError`: content store failures
 * - `StageError`: the request-fatal error reported in a batch result
 */

use thiserror::Error;

use crate::content::{ContentStatus, StageKind};

/// Errors that can occur when working with chat provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

/// Errors raised by the template engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    /// The template source could not be parsed
    #[error("Failed to load templates: {0}")]
    Load(String),

    /// No template with the requested name
    #[error("Template '{name}' not found. Available templates: {available:?}")]
    NotFound {
        name: String,
        available: Vec<String>,
    },

    /// A placeholder had no matching variable
    #[error("Missing data for key: {key}")]
    MissingVariable { key: String },

    /// The rendered prompt failed validation
    #[error("Rendered prompt for template '{name}' is invalid: {reason}")]
    InvalidPrompt { name: String, reason: String },
}

/// Errors raised by script and media generation collaborators
#[derive(Error, Debug)]
pub enum GenerationError {
    /// Error from the underlying chat provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The model reply could not be turned into a script
    #[error("Invalid script: {0}")]
    InvalidScript(String),

    /// A generation service reported a failure
    #[error("{stage} generation failed: {message}")]
    Service { stage: StageKind, message: String },

    /// The collaborator did not answer in time
    #[error("{stage} generation timed out after {millis}ms")]
    Timeout { stage: StageKind, millis: u64 },
}

impl GenerationError {
    /// Shorthand for a service failure
    pub fn service(stage: StageKind, message: impl Into<String>) -> Self {
        Self::Service {
            stage,
            message: message.into(),
        }
    }
}

/// Errors raised by a content store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistenceError {
    /// The backing database failed
    #[error("Database error: {0}")]
    Database(String),

    /// The record does not exist
    #[error("Content {0} not found")]
    NotFound(i64),

    /// The update would move the status backwards
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: ContentStatus,
        to: ContentStatus,
    },
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Database(error.to_string())
    }
}

impl From<anyhow::Error> for PersistenceError {
    fn from(error: anyhow::Error) -> Self {
        Self::Database(format!("{:#}", error))
    }
}

/// Error that ends the processing of a single request
#[derive(Error, Debug)]
pub enum StageError {
    /// The prompt could not be rendered
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// A mandatory generation stage failed
    #[error("Generation error during {stage}: {source}")]
    Generation {
        stage: StageKind,
        #[source]
        source: GenerationError,
    },

    /// A mandatory persistence step failed
    #[error("Persistence error during {stage}: {source}")]
    Persistence {
        stage: StageKind,
        #[source]
        source: PersistenceError,
    },
}

impl StageError {
    /// The stage at which the request was abandoned
    pub fn stage(&self) -> StageKind {
        match self {
            Self::Template(_) => StageKind::Render,
            Self::Generation { stage, .. } => *stage,
            Self::Persistence { stage, .. } => *stage,
        }
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the template engine
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Error from a content store
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
