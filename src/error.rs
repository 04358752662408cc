//! Error types for PDF assembly.
//!
//! [`AssembleError`] names *what* went wrong at a specific stage (dispatch,
//! decode, serialisation, persistence). Every public entry point wraps it in
//! [`GenerateError`], which carries the stable `Failed to generate PDF:`
//! prefix while keeping the stage error reachable through
//! [`GenerateError::kind`] and [`std::error::Error::source`].

use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A failure at one stage of the assembly pipeline.
///
/// All variants are fatal to the in-flight call; nothing is retried.
#[derive(Debug, Error)]
pub enum AssembleError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The caller supplied an empty image sequence.
    #[error("No images provided for PDF generation")]
    NoImages,

    /// More images than the configured upload limit.
    #[error("Too many images: {count} provided, at most {limit} allowed")]
    TooManyImages { count: usize, limit: usize },

    /// A single image exceeds the configured byte limit.
    #[error("Image '{name}' is {size} bytes, larger than the {limit} byte limit")]
    ImageTooLarge {
        name: String,
        size: usize,
        limit: usize,
    },

    // ── Format / decode errors ────────────────────────────────────────────
    /// The declared format tag is unknown, or known but without a decoder.
    #[error(
        "Unsupported image format: {extension}{}",
        .remediation.map(|hint| format!(". {hint}")).unwrap_or_default()
    )]
    UnsupportedFormat {
        extension: String,
        remediation: Option<&'static str>,
    },

    /// The image bytes could not be decoded with the declared format.
    #[error("Failed to decode image '{name}': {detail}")]
    Decode { name: String, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The assembled document could not be encoded.
    #[error("Failed to serialize PDF: {0}")]
    Serialization(String),

    /// The encoded document could not be written to the output location.
    #[error("Failed to write PDF to '{}': {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The caller cancelled the request before it completed.
    #[error("PDF generation was cancelled")]
    Cancelled,
}

impl AssembleError {
    /// `true` for errors caused by the shape of the request rather than the
    /// content of an individual image.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::NoImages | Self::TooManyImages { .. } | Self::ImageTooLarge { .. }
        )
    }

    pub(crate) fn decode(name: &str, detail: impl ToString) -> Self {
        Self::Decode {
            name: name.to_string(),
            detail: detail.to_string(),
        }
    }
}

/// The single outward-facing failure of every assembly call.
#[derive(Debug, Error)]
#[error("Failed to generate PDF: {source}")]
pub struct GenerateError {
    #[from]
    source: AssembleError,
}

impl GenerateError {
    /// The stage error that caused this failure.
    pub fn kind(&self) -> &AssembleError {
        &self.source
    }

    pub fn into_kind(self) -> AssembleError {
        self.source
    }

    /// JSON-shaped `{ "message": ... }` body for transport layers.
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            message: self.to_string(),
        }
    }
}

/// Error body handed to callers that speak JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}
