//! Pipeline stages for PDF-to-mind-map generation.
//!
//! ## Data Flow
//!
//! ```text
//! upload ──▶ llm ──▶ validate
//! (checks)  (model)  (decode → backfill ids → schema)
//! ```
//!
//! 1. [`upload`]   — hold the received PDF and reject anything that is not one
//!    before the model is contacted
//! 2. [`llm`]      — the single model call; the only stage with network I/O
//! 3. [`validate`] — pure function from reply text to a typed
//!    [`crate::output::Branch`] tree

pub mod llm;
pub mod upload;
pub mod validate;
