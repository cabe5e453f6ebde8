//! # Grader CLI Module
//!
//! This module implements the CLI interface for the grader.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `grade` - Grade an image file
//! - `stages` - List the stage catalog
//! - `stage` - Show one stage

mod commands;

use crate::config::AppConfig;
use clap::{Parser, Subcommand};
use grader_core::GraderError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Mango maturity grader
///
/// Grades fruit images into five ripeness stages and explains the decision.
#[derive(Parser, Debug)]
#[command(name = "grader")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "grader.toml")]
    pub config: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides the config file)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Grade an image file
    Grade {
        /// Path to the image (PNG or JPEG)
        #[arg(short, long)]
        file: PathBuf,

        /// Print the explanation: features, contributions, heatmap, rationale
        #[arg(short, long)]
        explain: bool,
    },

    /// List every maturity stage
    Stages,

    /// Show one maturity stage
    Stage {
        /// Stage identifier, e.g. "mature_green" or "ripe"
        name: String,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments and loaded configuration.
pub async fn execute(cli: Cli, mut config: AppConfig) -> Result<(), GraderError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port }) => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            cmd_server(&config).await
        }
        Some(Commands::Grade { file, explain }) => {
            cmd_grade(&config, &file, explain, json_mode).await
        }
        Some(Commands::Stages) | None => cmd_stages(json_mode),
        Some(Commands::Stage { name }) => cmd_stage(&name, json_mode),
    }
}
