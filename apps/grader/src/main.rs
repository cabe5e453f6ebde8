//! # Grader
//!
//! The main binary for the mango maturity grading pipeline.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                  apps/grader (THE BINARY)              │
//! │                                                        │
//! │   ┌─────────────┐    ┌─────────────┐    ┌───────────┐  │
//! │   │    CLI      │    │  HTTP API   │    │  Config   │  │
//! │   │   (clap)    │    │   (axum)    │    │  (toml)   │  │
//! │   └──────┬──────┘    └──────┬──────┘    └─────┬─────┘  │
//! │          └──────────────────┼─────────────────┘        │
//! │                             ▼                          │
//! │                     ┌───────────────┐                  │
//! │                     │  grader-core  │                  │
//! │                     │ (THE PIPELINE)│                  │
//! │                     └───────────────┘                  │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! grader server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! grader grade -f mango.jpg --explain
//! grader stages
//! grader stage ripe
//! ```

use clap::Parser;
use grader::cli;
use grader::config::{AppConfig, LogFormat, LoggingConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "grader=info,grader_core=info,tower_http=debug";
const VERBOSE_FILTER: &str = "grader=debug,grader_core=debug,tower_http=debug";

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // Logging settings come from the config file, so load it first and
    // report a bad file only once tracing is up.
    let config = AppConfig::load_with_env(&cli.config);
    let logging = config
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    init_tracing(&logging, cli.verbose);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli, config).await {
        tracing::error!(kind = e.kind(), "Error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing. `RUST_LOG` wins over the configured filter.
fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let fallback = match (&logging.filter, verbose) {
        (_, true) => VERBOSE_FILTER.to_string(),
        (Some(filter), false) => filter.clone(),
        (None, false) => DEFAULT_FILTER.to_string(),
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| fallback.into());

    match logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
   ▄████  ██▀███   ▄▄▄      ▓█████▄ ▓█████  ██▀███
  ██▒ ▀█▒▓██ ▒ ██▒▒████▄    ▒██▀ ██▌▓█   ▀ ▓██ ▒ ██▒
 ▒██░▄▄▄░▓██ ░▄█ ▒▒██  ▀█▄  ░██   █▌▒███   ▓██ ░▄█ ▒
 ░▓█  ██▓▒██▀▀█▄  ░██▄▄▄▄██ ░▓█▄   ▌▒▓█  ▄ ▒██▀▀█▄
 ░▒▓███▀▒░██▓ ▒██▒ ▓█   ▓██▒░▒████▓ ░▒████▒░██▓ ▒██▒

  Mango Maturity Grader v{}

  Score • Classify • Explain
"#,
        env!("CARGO_PKG_VERSION")
    );
}
