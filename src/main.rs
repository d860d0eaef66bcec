use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use relay::{
    AppState, Ingestor, RelayConfig,
    api::routes::create_router,
    cli::{
        Cli, Commands,
        init::{self, InitConfig, InitResult},
        output::Output,
    },
    client::ChatClient,
    utils::{
        http::http_client,
        toml_config::{LogFormat, VectorIndexConfig},
    },
};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    match cli.command {
        Some(Commands::Init {
            path,
            force,
            provider,
            host,
            port,
        }) => {
            let config = InitConfig {
                path,
                force,
                provider,
                host,
                port,
            };
            match init::run(config, &output) {
                InitResult::Success | InitResult::AlreadyExists => Ok(()),
                InitResult::Error(e) => Err(anyhow::anyhow!(e)),
            }
        }
        Some(Commands::Config { validate }) => show_config(&cli.config, validate, &output),
        Some(Commands::Chat { url }) => {
            let config = RelayConfig::load_unchecked(&cli.config).unwrap_or_default();
            init_tracing("warn", LogFormat::Pretty, cli.verbose);

            let base_url = url.unwrap_or_else(|| format!("http://{}", config.bind_addr()));
            let client = ChatClient::new(http_client()?, &base_url);

            output.banner();
            relay::cli::chat::run(&client, &config.assistant.greeting, &output).await?;
            Ok(())
        }
        Some(Commands::Ingest { paths }) => {
            let config = load_config(&cli.config)?;
            init_tracing(&config.server.log_level, config.server.log_format, cli.verbose);
            ingest(&config, paths, &output).await
        }
        Some(Commands::Serve) | None => {
            let config = load_config(&cli.config)?;
            init_tracing(&config.server.log_level, config.server.log_format, cli.verbose);
            serve(config).await
        }
    }
}

fn load_config(path: &Path) -> Result<RelayConfig> {
    RelayConfig::load(path).with_context(|| {
        format!(
            "Failed to load {} (run `relay-server init` to create one)",
            path.display()
        )
    })
}

/// `RUST_LOG` wins over the configured level; `--verbose` forces debug.
fn init_tracing(level: &str, format: LogFormat, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    let layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
    };

    tracing_subscriber::registry().with(layer).init();
}

async fn serve(config: RelayConfig) -> Result<()> {
    let bind_addr = config.bind_addr();
    let ingest_on_startup = config.rag.enabled && config.rag.ingest_on_startup;

    let state = AppState::from_config(config)
        .await
        .context("Failed to initialize upstream clients")?;

    if ingest_on_startup {
        if let Some(retriever) = state.relay.retriever() {
            let ingestor = Ingestor::from_config(
                &state.config.rag,
                retriever.embedder().clone(),
                retriever.index().clone(),
            )?;
            let report = ingestor
                .ingest_paths(&state.config.rag.documents)
                .await
                .context("Start-up ingestion failed")?;
            tracing::info!(
                documents = report.documents,
                chunks = report.chunks,
                upserted = report.upserted,
                "Start-up ingestion complete"
            );
        }
    }

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    tracing::info!("Relay listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

async fn ingest(config: &RelayConfig, paths: Vec<PathBuf>, output: &Output) -> Result<()> {
    let paths = if paths.is_empty() {
        config.rag.documents.clone()
    } else {
        paths
    };
    if paths.is_empty() {
        anyhow::bail!("No documents given and rag.documents is empty");
    }

    if matches!(config.vector_index, Some(VectorIndexConfig::Memory)) {
        output.warning("vector_index.type = \"memory\" does not persist; records are lost on exit");
    }

    output.banner();
    output.header("Ingesting documents");
    for path in &paths {
        output.list_item(&path.display().to_string());
    }

    let (embedder, index) = relay::build_retrieval(config, http_client()?).await?;
    let ingestor = Ingestor::from_config(&config.rag, embedder, index.clone())?;
    let report = ingestor.ingest_paths(&paths).await?;

    output.newline();
    output.success("Ingestion complete");
    output.kv("documents", &report.documents.to_string());
    output.kv("chunks", &report.chunks.to_string());
    output.kv("upserted", &report.upserted.to_string());
    match index.count().await {
        Ok(total) => output.kv("index records", &total.to_string()),
        Err(e) => output.warning(&format!("Could not read index stats: {}", e)),
    }

    Ok(())
}

fn show_config(path: &Path, validate: bool, output: &Output) -> Result<()> {
    output.banner();

    let config = if validate {
        let config = load_config(path)?;
        output.success(&format!("{} is valid", path.display()));
        config
    } else {
        RelayConfig::load_unchecked(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    };

    output.header("Effective configuration");
    output.kv("file", &path.display().to_string());
    output.kv("bind", &config.bind_addr());
    output.kv("completion model", config.completion.provider.model());
    output.kv("retrieval", if config.rag.enabled { "enabled" } else { "disabled" });
    output.newline();
    println!("{}", toml::to_string_pretty(&config)?);

    if !validate {
        output.hint("Run with --validate to check value ranges and referenced env vars");
    }
    Ok(())
}
