//! Mind-map generation entry points.
//!
//! [`generate_mindmap`] is the whole request flow minus HTTP: check the
//! upload, call the model once, validate the reply. The HTTP handler in
//! [`crate::server`] and the `mindmapd generate` command both go through it.

use crate::config::ServiceConfig;
use crate::error::MindMapError;
use crate::output::Branch;
use crate::pipeline::llm::{GeminiClient, GenerativeModel};
use crate::pipeline::upload::UploadedFile;
use crate::pipeline::validate;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info};

/// How many characters of an undecodable reply to log.
const RAW_LOG_CHARS: usize = 500;

/// Generate a mind map for an uploaded PDF.
///
/// # Errors
/// - [`MindMapError::InvalidContentType`] / [`MindMapError::NotAPdf`] —
///   rejected before the model is called
/// - [`MindMapError::ContentBlocked`], [`MindMapError::ModelApi`],
///   [`MindMapError::ModelTimeout`] — from the model call
/// - [`MindMapError::Validation`] — the reply is not valid JSON or not a tree
pub async fn generate_mindmap(
    model: &dyn GenerativeModel,
    upload: &UploadedFile,
    config: &ServiceConfig,
) -> Result<Branch, MindMapError> {
    let start = Instant::now();
    info!(
        "Generating mind map for '{}' ({} bytes, content type {:?})",
        upload.display_name(),
        upload.len(),
        upload.content_type
    );

    // ── Step 1: Reject non-PDF uploads ───────────────────────────────────
    upload.check(config)?;

    // ── Step 2: Single model call ────────────────────────────────────────
    let reply = model.generate(config.prompt(), &upload.bytes).await?;
    debug!("Received {} chars from {}", reply.text.len(), model.model_name());

    // ── Step 3: Decode, backfill ids, validate ───────────────────────────
    let tree = validate::parse_mind_map(&reply.text).map_err(|e| {
        if e.is_decode() {
            error!("Failed to decode model reply: {}", e);
            error!("Raw reply text: {}...", preview(&reply.text));
        } else {
            error!("Model reply failed schema validation: {}", e);
            error!("Reply causing validation error: {}", preview(&reply.text));
        }
        MindMapError::from(e)
    })?;

    info!(
        "Mind map for '{}' ready: {} branches, depth {}, {} in / {} out tokens, {}ms",
        upload.display_name(),
        tree.node_count(),
        tree.depth(),
        reply.input_tokens,
        reply.output_tokens,
        start.elapsed().as_millis()
    );
    Ok(tree)
}

/// Generate a mind map for a local PDF file using the configured Gemini model.
///
/// # Example
/// ```rust,no_run
/// use pdf2mindmap::{generate_from_path, ServiceConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ServiceConfig::builder()
///     .api_key(std::env::var("GOOGLE_API_KEY")?)
///     .build()?;
/// let tree = generate_from_path("paper.pdf", &config).await?;
/// println!("{}: {} branches", tree.topic, tree.node_count());
/// # Ok(())
/// # }
/// ```
pub async fn generate_from_path(
    path: impl AsRef<Path>,
    config: &ServiceConfig,
) -> Result<Branch, MindMapError> {
    let model = GeminiClient::from_config(config)?;
    let upload = UploadedFile::from_path(path).await?;
    generate_mindmap(&model, &upload, config).await
}

fn preview(text: &str) -> String {
    text.chars().take(RAW_LOG_CHARS).collect()
}
