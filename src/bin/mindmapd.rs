//! `mindmapd` — HTTP service and one-shot CLI for pdf2mindmap.
//!
//! A thin shim over the library crate that maps CLI flags and environment
//! variables to `ServiceConfig`, then either serves the HTTP API or converts
//! a single local PDF.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pdf2mindmap::{build_router, generate_from_path, AppState, ServiceConfig};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve the API on the default address
  GOOGLE_API_KEY=... mindmapd

  # Serve on all interfaces, port 9000
  mindmapd serve --bind 0.0.0.0:9000

  # Upload a PDF to a running server
  curl -F "file=@paper.pdf;type=application/pdf" http://127.0.0.1:8000/generate_mindmap/

  # One-shot: print the mind map for a local file
  mindmapd generate paper.pdf --pretty

ENVIRONMENT VARIABLES:
  GOOGLE_API_KEY          Gemini API key (required for generation; 503 without it)
  MINDMAP_MODEL           Model ID (default: gemini-2.0-flash)
  MINDMAP_API_BASE        API base URL
  MINDMAP_TIMEOUT         Model call timeout in seconds (default: 600)
  MINDMAP_BIND            Listen address for `serve` (default: 127.0.0.1:8000)
  MINDMAP_CORS_ORIGINS    Comma-separated CORS allow-list
  RUST_LOG                Log filter, overrides --verbose / --quiet
"#;

/// Generate hierarchical mind maps from PDF documents.
#[derive(Parser, Debug)]
#[command(
    name = "mindmapd",
    version,
    about = "Generate hierarchical mind maps from PDF documents using Gemini",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    service: ServiceArgs,

    /// Address to listen on when serving.
    #[arg(long, global = true, env = "MINDMAP_BIND", default_value = "127.0.0.1:8000")]
    bind: SocketAddr,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "MINDMAP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "MINDMAP_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API (default).
    Serve,
    /// Generate a mind map for a local PDF and print it as JSON.
    Generate {
        /// Path to the PDF file.
        input: PathBuf,

        /// Pretty-print the JSON.
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Args, Debug)]
struct ServiceArgs {
    /// Gemini API key.
    #[arg(long, global = true, env = "GOOGLE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model ID.
    #[arg(long, global = true, env = "MINDMAP_MODEL", default_value = pdf2mindmap::config::DEFAULT_MODEL)]
    model: String,

    /// Base URL of the Generative Language API.
    #[arg(long, global = true, env = "MINDMAP_API_BASE", default_value = pdf2mindmap::config::DEFAULT_API_BASE_URL)]
    api_base: String,

    /// Model call timeout in seconds.
    #[arg(long, global = true, env = "MINDMAP_TIMEOUT", default_value_t = 600)]
    timeout: u64,

    /// Sampling temperature (0.0–2.0). Model default when unset.
    #[arg(long, global = true, env = "MINDMAP_TEMPERATURE")]
    temperature: Option<f32>,

    /// Path to a text file containing a custom prompt.
    #[arg(long, global = true, env = "MINDMAP_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Largest accepted upload in bytes.
    #[arg(long, global = true, env = "MINDMAP_MAX_UPLOAD", default_value_t = 20 * 1024 * 1024)]
    max_upload: usize,

    /// Accept uploads that do not start with the %PDF header.
    #[arg(long, global = true, env = "MINDMAP_SKIP_MAGIC_CHECK")]
    skip_magic_check: bool,

    /// CORS allow-list (comma-separated). Defaults to local dev servers.
    #[arg(long, global = true, env = "MINDMAP_CORS_ORIGINS", value_delimiter = ',')]
    cors_origins: Vec<String>,
}

impl ServiceArgs {
    fn into_config(self) -> Result<ServiceConfig> {
        let mut builder = ServiceConfig::builder()
            .api_key_opt(self.api_key)
            .model(self.model)
            .api_base_url(self.api_base)
            .request_timeout_secs(self.timeout)
            .max_upload_bytes(self.max_upload)
            .require_pdf_magic(!self.skip_magic_check);

        if let Some(t) = self.temperature {
            builder = builder.temperature(t);
        }
        if let Some(path) = self.system_prompt {
            let prompt = std::fs::read_to_string(&path)
                .with_context(|| format!("Cannot read prompt file {}", path.display()))?;
            builder = builder.system_prompt(prompt);
        }
        if !self.cors_origins.is_empty() {
            builder = builder.allowed_origins(self.cors_origins);
        }

        builder.build().context("Invalid configuration")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = cli.service.into_config()?;
    if !config.has_credential() {
        warn!("GOOGLE_API_KEY environment variable not set.");
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, cli.bind).await,
        Command::Generate { input, pretty } => generate(config, input, pretty).await,
    }
}

async fn serve(config: ServiceConfig, bind: SocketAddr) -> Result<()> {
    info!("Model: {}, timeout: {}s", config.model, config.request_timeout_secs);
    info!("CORS origins: {}", config.allowed_origins.join(", "));

    let state = AppState::from_config(config).context("Failed to initialise service state")?;
    let app = build_router(state).context("Failed to build router")?;

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Cannot listen on {bind}"))?;
    info!("Server listening on http://{}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn generate(config: ServiceConfig, input: PathBuf, pretty: bool) -> Result<()> {
    let tree = generate_from_path(&input, &config)
        .await
        .with_context(|| format!("Failed to generate mind map for {}", input.display()))?;

    let json = if pretty {
        serde_json::to_string_pretty(&tree)?
    } else {
        serde_json::to_string(&tree)?
    };

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{json}")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
