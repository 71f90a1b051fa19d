use thiserror::Error;

use crate::locale::{Language, Messages};
use crate::measurements::MeasurementError;
use crate::upload::{UploadError, UploadSlot};

/// Errors returned by stylist operations.
#[derive(Error, Debug)]
pub enum StylistError {
    /// An upload was rejected by the upload policy.
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// The measurement form is incomplete or malformed.
    #[error(transparent)]
    Measurement(#[from] MeasurementError),

    /// One or more required images were never selected.
    #[error("Missing required uploads: {}", format_slots(.0))]
    MissingUploads(Vec<UploadSlot>),

    /// A service returned a non-success HTTP status.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// Network-level request failure with context.
    #[error("{context}: {source}")]
    Network {
        context: String,
        source: reqwest::Error,
    },

    /// The workflow provider answered but reported no usable result.
    #[error("Workflow returned code {code}: {message}")]
    Workflow { code: i64, message: String },

    /// The hairstyle phase failed and hairstyle errors are configured as fatal.
    #[error("Hairstyle recommendation failed: {0}")]
    Hairstyle(Box<StylistError>),

    /// The response was missing expected fields.
    #[error("{0}")]
    InvalidResponse(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The submission was cancelled or superseded by a newer one.
    #[error("Request cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for StylistError {
    fn from(err: anyhow::Error) -> Self {
        StylistError::Other(err.to_string())
    }
}

impl StylistError {
    pub fn is_cancelled(&self) -> bool {
        match self {
            StylistError::Cancelled => true,
            StylistError::Hairstyle(inner) => inner.is_cancelled(),
            _ => false,
        }
    }

    /// Whether repeating the same request could plausibly succeed.
    ///
    /// Transport failures, throttling, server-side errors and empty workflow
    /// results are retried; client errors and malformed payloads are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            StylistError::Network { source, .. } => !source.is_builder(),
            StylistError::Http { status, .. } => {
                *status >= 500 || *status == 429 || *status == 408
            }
            StylistError::Workflow { .. } => true,
            _ => false,
        }
    }

    /// The banner text shown to the user for this error.
    ///
    /// Validation errors map to their dedicated localized strings. Server
    /// and transport failures never show raw server text; their details go
    /// to the log and the user sees the localized "processing failed" text.
    pub fn user_message(&self, messages: &Messages, lang: Language) -> String {
        match self {
            StylistError::Upload(UploadError::TooLarge { .. }) => {
                messages.file_too_large.get(lang).to_string()
            }
            StylistError::Upload(UploadError::UnsupportedType { .. }) => {
                messages.file_type_not_allowed.get(lang).to_string()
            }
            StylistError::Upload(UploadError::Read { .. }) => {
                messages.upload_failed.get(lang).to_string()
            }
            StylistError::MissingUploads(_) => messages.missing_uploads.get(lang).to_string(),
            StylistError::Measurement(_) => messages.missing_measurement.get(lang).to_string(),
            StylistError::Hairstyle(_) => messages.hairstyle_failed.get(lang).to_string(),
            StylistError::Cancelled => String::new(),
            StylistError::Other(msg) if msg.is_empty() => {
                messages.general_error.get(lang).to_string()
            }
            _ => messages.processing_failed.get(lang).to_string(),
        }
    }
}

fn format_slots(slots: &[UploadSlot]) -> String {
    slots
        .iter()
        .map(|s| s.field_name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, StylistError>;
