//! CLI module for the relay
//!
//! Provides command-line interface parsing for the relay-server binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod chat;
pub mod init;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Relay - streaming retrieval-augmented chat relay
#[derive(Parser, Debug)]
#[command(
    name = "relay-server",
    version,
    about = "Relay - streaming retrieval-augmented chat relay",
    long_about = "Relays a chat conversation to a hosted language model and streams the reply\n\
                  back, optionally augmenting the prompt with context retrieved from a vector index.\n\n\
                  Run without arguments to start the server, or use 'init' to write a starter config.",
    after_help = "EXAMPLES:\n    \
                  relay-server init                    # Write relay.toml and .env.example\n    \
                  relay-server ingest report.pdf       # Chunk, embed and upsert a document\n    \
                  relay-server                         # Start the server (requires relay.toml)\n    \
                  relay-server chat                    # Chat with a running server from the terminal\n    \
                  relay-server --config my.toml serve  # Use a custom config file"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "relay.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Ingest documents into the configured vector index
    ///
    /// PDFs are converted to text, other files are read as UTF-8. Without
    /// arguments the documents listed under `rag.documents` are ingested.
    Ingest {
        /// Documents to ingest
        paths: Vec<PathBuf>,
    },

    /// Chat with a running server from the terminal
    Chat {
        /// Base URL of the relay server (defaults to the configured bind address)
        #[arg(short, long, env = "RELAY_URL")]
        url: Option<String>,
    },

    /// Write a starter relay.toml and .env.example
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite existing files
        #[arg(short, long)]
        force: bool,

        /// Completion and embedding provider to configure (openai or ollama)
        #[arg(long, default_value = "openai")]
        provider: String,

        /// Host address for the server
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port for the server
        #[arg(long, default_value = "3000")]
        port: u16,
    },

    /// Show configuration information
    Config {
        /// Validate the configuration file, including referenced env vars
        #[arg(long)]
        validate: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
