//! Init command implementation
//!
//! Writes a starter `relay.toml`, an `.env.example` naming the credentials
//! it references, and a `.gitignore` that keeps `.env` out of version control.

use super::output::Output;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of the init operation
pub enum InitResult {
    /// Initialization completed successfully
    Success,
    /// relay.toml already exists and `force` was not given
    AlreadyExists,
    /// An error occurred during initialization
    Error(String),
}

/// Configuration for the init command
pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
    /// Completion and embedding provider to configure (openai or ollama)
    pub provider: String,
    /// Host address for the server
    pub host: String,
    /// Port for the server
    pub port: u16,
}

/// Run the init command
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing relay configuration");

    if !matches!(config.provider.as_str(), "openai" | "ollama") {
        output.error(&format!(
            "Unknown provider '{}' (expected openai or ollama)",
            config.provider
        ));
        return InitResult::Error(format!("unknown provider: {}", config.provider));
    }

    let base_path = &config.path;
    let config_path = base_path.join("relay.toml");
    if config_path.exists() && !config.force {
        output.warning("relay.toml already exists!");
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    if !base_path.exists() {
        if let Err(e) = fs::create_dir_all(base_path) {
            output.error(&format!("Failed to create {}: {}", base_path.display(), e));
            return InitResult::Error(e.to_string());
        }
    }

    output.subheader("Creating configuration files");

    let toml_content = generate_relay_toml(&config);
    if let Err(e) = write_file(&config_path, &toml_content, config.force) {
        output.error(&format!("Failed to create relay.toml: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("config", "relay.toml");

    let env_example_path = base_path.join(".env.example");
    if let Err(e) = write_file(&env_example_path, &generate_env_example(&config), config.force) {
        output.error(&format!("Failed to create .env.example: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.created("env", ".env.example");

    let gitignore_path = base_path.join(".gitignore");
    if gitignore_path.exists() {
        output.skipped(".gitignore", "already exists");
    } else if let Err(e) = write_file(&gitignore_path, generate_gitignore(), false) {
        output.warning(&format!("Failed to create .gitignore: {}", e));
    } else {
        output.created("file", ".gitignore");
    }

    output.complete("Relay configuration written");

    output.header("Next Steps");
    output.newline();
    output.info("1. Set up environment variables:");
    output.command("cp .env.example .env");
    if config.provider == "openai" {
        output.command("# Edit .env and set OPENAI_API_KEY and PINECONE_API_KEY");
    } else {
        output.command("# Edit .env and set PINECONE_API_KEY");
        output.newline();
        output.info("   Start Ollama (if not running):");
        output.command("ollama serve");
        output.command("ollama pull llama3.2 && ollama pull nomic-embed-text");
    }
    output.newline();

    output.info("2. Ingest your documents:");
    output.command("relay-server ingest path/to/document.pdf");
    output.newline();

    output.info("3. Start the server:");
    output.command("relay-server");

    output.hint(&format!(
        "Chat UI will be available at http://{}:{}",
        config.host, config.port
    ));

    InitResult::Success
}

fn write_file(path: &Path, content: &str, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Ok(());
    }
    fs::write(path, content)
}

/// Render a commented relay.toml for the chosen provider.
pub fn generate_relay_toml(config: &InitConfig) -> String {
    let (completion_section, embedding_section) = if config.provider == "ollama" {
        (
            r#"[completion.provider]
type = "ollama"
base_url = "http://localhost:11434"
model = "llama3.2""#,
            r#"[embedding]
type = "ollama"
base_url = "http://localhost:11434"
model = "nomic-embed-text""#,
        )
    } else {
        (
            r#"[completion.provider]
type = "openai"
api_key_env = "OPENAI_API_KEY"
api_base = "https://api.openai.com/v1"
model = "gpt-4o""#,
            r#"[embedding]
type = "openai"
api_key_env = "OPENAI_API_KEY"
model = "text-embedding-ada-002""#,
        )
    };

    format!(
        r#"# Relay server configuration
# Generated by: relay-server init
#
# Credentials are read from the environment variables named by *_env keys.
# A .env file in the working directory is loaded on start-up.

[server]
host = "{host}"
port = {port}
log_level = "info"      # overridden by RUST_LOG when set
log_format = "pretty"   # "pretty" or "json"
max_body_bytes = 1048576

[assistant]
system_prompt = "You are an expert stock market assistant. Answer any questions about stock market provided. You always answer questions based only on the context that you have been provided."
greeting = "Hi! I'm the Headstarter support assistant. How can I help you today?"

[completion]
timeout_secs = 120

{completion_section}

{embedding_section}

# Use type = "memory" for a process-local index (contents are lost on exit)
[vector_index]
type = "pinecone"
api_key_env = "PINECONE_API_KEY"
index_name = "openaichatbot"
# host = "https://openaichatbot-xxxx.svc.us-east-1.pinecone.io"

[rag]
enabled = true
top_k = 5
chunk_size = 2000
chunk_overlap = 100
encoding = "p50k_base"
retrieval_timeout_secs = 30
require_context = false
documents = []
ingest_on_startup = false
"#,
        host = config.host,
        port = config.port,
        completion_section = completion_section,
        embedding_section = embedding_section,
    )
}

fn generate_env_example(config: &InitConfig) -> String {
    let openai = if config.provider == "openai" {
        "# REQUIRED: OpenAI API key (chat completions and embeddings)\nOPENAI_API_KEY=sk-...\n\n"
    } else {
        ""
    };

    format!(
        r#"# Relay Environment Variables
# Copy this file to .env and fill in the values.

{openai}# REQUIRED: Pinecone API key (vector index)
PINECONE_API_KEY=your-pinecone-key

# Optional: Logging level (trace, debug, info, warn, error)
RUST_LOG=info,relay=debug

# Optional: relay URL used by `relay-server chat`
# RELAY_URL=http://127.0.0.1:{port}
"#,
        openai = openai,
        port = config.port,
    )
}

fn generate_gitignore() -> &'static str {
    r#"# Environment
.env
.env.local
.env.*.local

# Rust
/target/

# OS
.DS_Store
Thumbs.db
"#
}
