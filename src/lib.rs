//! # pdf2mindmap
//!
//! Turn a PDF into a hierarchical mind map using a generative-language model.
//!
//! The model (Google Gemini by default) reads the PDF and answers with a JSON
//! tree of topics and summaries. This crate checks the upload, makes that one
//! call, and turns the reply into a typed [`Branch`] tree. It backfills any
//! missing node ids and rejects replies that are not valid JSON or not
//! tree-shaped.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF upload
//!  │
//!  ├─ 1. Upload    content type must be application/pdf (plus %PDF magic)
//!  ├─ 2. Model     one generateContent call, JSON response requested
//!  ├─ 3. Decode    reply text → JSON            (DecodeError)
//!  ├─ 4. Backfill  UUID v4 for nodes without id
//!  └─ 5. Validate  JSON → Branch tree           (SchemaError)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2mindmap::{build_router, AppState, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::builder()
//!         .api_key(std::env::var("GOOGLE_API_KEY").unwrap_or_default())
//!         .build()?;
//!     let app = build_router(AppState::from_config(config)?)?;
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `mindmapd` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ServiceConfig, ServiceConfigBuilder};
pub use error::{MindMapError, SchemaProblem, ValidationError};
pub use generate::{generate_from_path, generate_mindmap};
pub use output::Branch;
pub use pipeline::llm::{GeminiClient, GenerativeModel, ModelReply};
pub use pipeline::upload::UploadedFile;
pub use pipeline::validate::parse_mind_map;
pub use server::{build_router, AppState};
