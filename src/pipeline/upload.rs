//! Upload intake: the PDF as received, and the checks run before any model call.
//!
//! Uploads arrive either as a multipart field (HTTP) or as a local path (CLI).
//! Both end up as an [`UploadedFile`]. [`UploadedFile::check`] rejects
//! anything that is not declared as `application/pdf`, plus (when
//! [`ServiceConfig::require_pdf_magic`] is set) bodies that do not start with
//! the `%PDF` magic bytes. Rejection happens before the model is contacted.

use crate::config::ServiceConfig;
use crate::error::MindMapError;
use axum::body::Bytes;
use std::path::Path;
use tracing::{debug, warn};

/// The only content type accepted for uploads.
pub const PDF_MIME: &str = "application/pdf";

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A received file, held in memory for the duration of one request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-supplied file name, if any.
    pub file_name: Option<String>,
    /// Declared content type, if any.
    pub content_type: Option<String>,
    /// Raw file bytes.
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn new(
        file_name: Option<String>,
        content_type: Option<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name,
            content_type,
            bytes: bytes.into(),
        }
    }

    /// Read a local file. `.pdf` files are declared as `application/pdf`;
    /// anything else gets no content type and will fail [`Self::check`].
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, MindMapError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => MindMapError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => MindMapError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => MindMapError::Internal(format!("Failed to read '{}': {e}", path.display())),
        })?;

        let content_type = has_pdf_extension(path).then(|| PDF_MIME.to_string());
        debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());

        Ok(Self {
            file_name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
            content_type,
            bytes: Bytes::from(bytes),
        })
    }

    /// Display name for logs.
    pub fn display_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or("<unnamed>")
    }

    /// Size of the upload in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Reject uploads that must not reach the model.
    pub fn check(&self, config: &ServiceConfig) -> Result<(), MindMapError> {
        if !is_pdf_content_type(self.content_type.as_deref()) {
            warn!(
                "Rejected '{}': content type {:?} is not {}",
                self.display_name(),
                self.content_type,
                PDF_MIME
            );
            return Err(MindMapError::InvalidContentType {
                declared: self.content_type.clone(),
            });
        }

        if self.is_empty() {
            warn!("Rejected '{}': empty file", self.display_name());
            return Err(MindMapError::NotAPdf {
                reason: "file is empty".into(),
            });
        }

        if config.require_pdf_magic && !self.bytes.starts_with(PDF_MAGIC) {
            let head: Vec<u8> = self.bytes.iter().take(4).copied().collect();
            warn!(
                "Rejected '{}': missing %PDF header (first bytes {:?})",
                self.display_name(),
                head
            );
            return Err(MindMapError::NotAPdf {
                reason: format!("missing %PDF header, first bytes {head:?}"),
            });
        }

        Ok(())
    }
}

/// True when `declared` is `application/pdf`, ignoring case and parameters.
pub fn is_pdf_content_type(declared: Option<&str>) -> bool {
    declared
        .and_then(|ct| ct.split(';').next())
        .map(|essence| essence.trim().eq_ignore_ascii_case(PDF_MIME))
        .unwrap_or(false)
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}
