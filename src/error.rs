//! Error types for the pdf2mindmap library.
//!
//! Two error types reflect two distinct failure sources:
//!
//! * [`MindMapError`] — **Request-fatal**: the mind map cannot be produced
//!   (bad upload, missing credential, model refused or failed). Exactly one
//!   is returned per request; the HTTP layer maps each variant to a status
//!   code in [`crate::server`].
//!
//! * [`ValidationError`] — the model answered, but its reply is not a usable
//!   tree: either the text is not JSON at all ([`ValidationError::Decode`])
//!   or the JSON does not have the Branch shape ([`ValidationError::Schema`]).
//!   Produced by [`crate::pipeline::validate`] and wrapped into
//!   [`MindMapError::Validation`].

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2mindmap library.
#[derive(Debug, Error)]
pub enum MindMapError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// No API key for the external model was configured.
    #[error("API key not configured. Cannot connect to AI service.")]
    MissingCredential,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Upload errors ─────────────────────────────────────────────────────
    /// The multipart body carried no `file` field.
    #[error("No file uploaded. Send the PDF as multipart field 'file'.")]
    MissingFile,

    /// The multipart body could not be read.
    #[error("Malformed upload: {0}")]
    MalformedUpload(String),

    /// The request body exceeded the configured upload limit.
    #[error("Upload exceeds the {limit_bytes} byte limit")]
    UploadTooLarge { limit_bytes: usize },

    /// The declared content type is not `application/pdf`.
    #[error("Invalid file type. Please upload a PDF.")]
    InvalidContentType { declared: Option<String> },

    /// The upload was declared as a PDF but its bytes are not one.
    #[error("Uploaded file is not a valid PDF: {reason}")]
    NotAPdf { reason: String },

    /// Local input file was not found at the given path.
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    // ── Model errors ──────────────────────────────────────────────────────
    /// The model refused to process the document.
    #[error("Content generation blocked. Please check the PDF content. Details: {reason}")]
    ContentBlocked { reason: String },

    /// The model API returned an error or an unusable reply.
    #[error("Model API error{}: {message}", http_suffix(.status))]
    ModelApi {
        status: Option<u16>,
        message: String,
    },

    /// The model call did not complete within the configured timeout.
    #[error("Model call timed out after {secs}s")]
    ModelTimeout { secs: u64 },

    // ── Reply errors ──────────────────────────────────────────────────────
    /// The model reply could not be decoded or did not match the schema.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn http_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

/// Why a model reply could not be turned into a [`crate::output::Branch`].
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The reply text is not well-formed JSON.
    #[error("Failed to parse JSON response from AI model: {0}")]
    Decode(#[source] serde_json::Error),

    /// The reply is JSON, but a node does not have the Branch shape.
    #[error("Invalid structure received from AI model: {path}: {problem}")]
    Schema { path: String, problem: SchemaProblem },
}

impl ValidationError {
    /// True for [`ValidationError::Decode`].
    pub fn is_decode(&self) -> bool {
        matches!(self, ValidationError::Decode(_))
    }

    /// True for [`ValidationError::Schema`].
    pub fn is_schema(&self) -> bool {
        matches!(self, ValidationError::Schema { .. })
    }
}

/// A single schema violation found while reading a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaProblem {
    /// The node itself is not a JSON object.
    NotAnObject { found: &'static str },
    /// A required field is absent.
    MissingField { field: &'static str },
    /// A field is present with the wrong JSON type.
    WrongType {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}

impl fmt::Display for SchemaProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaProblem::NotAnObject { found } => {
                write!(f, "expected an object, found {found}")
            }
            SchemaProblem::MissingField { field } => write!(f, "field `{field}` is required"),
            SchemaProblem::WrongType {
                field,
                expected,
                found,
            } => write!(f, "field `{field}` must be {expected}, found {found}"),
        }
    }
}
