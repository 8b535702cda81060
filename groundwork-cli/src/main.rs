use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use groundwork_core::chat::AnswerKind;
use groundwork_core::config::Config;
use groundwork_core::provider;
use groundwork_core::rag::{IngestReport, FILENAME_METADATA_KEY};
use groundwork_core::server::{Client, Server, TransportError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "groundwork")]
#[command(about = "Ask questions about your own documents", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the server on the configured socket")]
    Serve,

    #[command(about = "Add a file or directory to the knowledge base")]
    Ingest {
        path: PathBuf,

        #[arg(long, help = "Document id (single files only; defaults to the path)")]
        id: Option<String>,

        #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        metadata: Vec<(String, String)>,
    },

    #[command(about = "Show the chunks most similar to a query")]
    Search {
        query: String,

        #[arg(short = 'k', long, help = "Maximum number of results (defaults to storage.top_k)")]
        max_results: Option<usize>,
    },

    #[command(about = "Answer a question from the knowledge base")]
    Ask { question: String },

    #[command(about = "Send a message to the model without retrieval")]
    Chat { message: String },

    #[command(about = "Show knowledge base statistics")]
    Stats,

    #[command(about = "Remove everything from the knowledge base")]
    Reset,

    #[command(about = "Configuration commands")]
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    #[command(about = "Show current configuration")]
    Show,
}

fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let client = Client::new(&config.server.socket_path);

    match cli.command {
        Commands::Serve => serve(config).await,
        Commands::Ingest { path, id, metadata } => {
            ingest(&client, &config, &path, id, metadata.into_iter().collect()).await
        }
        Commands::Search { query, max_results } => search(&client, &query, max_results).await,
        Commands::Ask { question } => ask(&client, &question).await,
        Commands::Chat { message } => {
            let reply = client.chat(&message).await.map_err(server_error)?;
            println!("{reply}");
            Ok(())
        }
        Commands::Stats => stats(&client).await,
        Commands::Reset => {
            let report = client.reset().await.map_err(server_error)?;
            println!(
                "{} Removed {} chunk(s)",
                "✓".green().bold(),
                report.removed_chunks
            );
            Ok(())
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => show_config(&config),
        },
    }
}

/// Loads the config file, or falls back to defaults when it does not exist.
fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::load(path).with_context(|| format!("Failed to load config from {}", path.display()))
    } else {
        Ok(Config::default())
    }
}

/// Attaches a hint when the server is not running.
fn server_error(err: TransportError) -> anyhow::Error {
    match err {
        TransportError::Io(e) if matches!(e.kind(), std::io::ErrorKind::NotFound | std::io::ErrorKind::ConnectionRefused) => {
            anyhow::Error::new(e).context("Could not reach the server. Is `groundwork serve` running?")
        }
        other => other.into(),
    }
}

async fn serve(config: Config) -> Result<()> {
    let provider = provider::create_provider(&config).context("Failed to create provider")?;
    println!(
        "{} Serving {} via {} on {}",
        "→".blue(),
        config.llm.model.cyan(),
        config.llm.base_url,
        config.server.socket_path.bold()
    );
    Server::new(config, provider)
        .start()
        .await
        .context("Server failed")
}

async fn ingest(
    client: &Client,
    config: &Config,
    path: &Path,
    id: Option<String>,
    metadata: HashMap<String, String>,
) -> Result<()> {
    if !path.is_dir() {
        let report = client.ingest_file(path, id, metadata).await.map_err(server_error)?;
        print_ingested(&report);
        return Ok(());
    }
    if id.is_some() {
        bail!("--id can only be used with a single file");
    }

    let report = client
        .ingest_directory(path, &config.rag.indexer, &metadata)
        .await
        .map_err(server_error)
        .with_context(|| format!("Stopped ingesting {}", path.display()))?;

    for ingested in &report.ingested {
        print_ingested(ingested);
    }
    for skipped in &report.skipped {
        println!("{} {}: {}", "✗".yellow(), skipped.path.display(), skipped.reason);
    }
    println!(
        "{} Ingested {} file(s), skipped {}",
        "✓".green().bold(),
        report.ingested.len(),
        report.skipped.len()
    );
    Ok(())
}

fn print_ingested(report: &IngestReport) {
    println!(
        "{} {} ({} chunk(s))",
        "✓".green().bold(),
        report.document_id.cyan(),
        report.chunk_count
    );
}

async fn search(client: &Client, query: &str, max_results: Option<usize>) -> Result<()> {
    let hits = client.search(query, max_results).await.map_err(server_error)?;
    if hits.is_empty() {
        println!("{}", "No results. Is the knowledge base empty?".yellow());
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        let source = hit
            .metadata
            .get(FILENAME_METADATA_KEY)
            .unwrap_or(&hit.id);
        println!("{} {} {}", format!("[{}]", i + 1).bold(), source.cyan(), format!("{:.3}", hit.score).dimmed());
        println!("{}", hit.text);
        println!();
    }
    Ok(())
}

async fn ask(client: &Client, question: &str) -> Result<()> {
    let answer = client.ask(question).await.map_err(server_error)?;
    match &answer.kind {
        AnswerKind::Grounded => {}
        AnswerKind::NoContext => println!("{}", "Knowledge base has nothing on this.".yellow()),
        AnswerKind::Fallback { reason } => {
            println!("{} {}", "Model unavailable, showing retrieved text:".yellow(), reason.dimmed())
        }
    }
    println!("{}", answer.text);
    Ok(())
}

async fn stats(client: &Client) -> Result<()> {
    let stats = client.stats().await.map_err(server_error)?;

    println!("{}", "Knowledge Base:".bold().green());
    println!("  Documents: {}", stats.documents.len());
    println!("  Chunks:    {}", stats.chunk_count);
    for doc in &stats.documents {
        println!("  {} {} ({} chunk(s))", "•".cyan(), doc.document_id, doc.chunk_count);
    }
    Ok(())
}

fn show_config(config: &Config) -> Result<()> {
    let embedding_dim = config
        .rag
        .expected_dim()
        .map(|d| d.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!("{}", "Current Configuration:".bold().green());
    println!();
    println!("{}", "LLM:".bold());
    println!("  Provider:       {:?}", config.llm.provider);
    println!("  Model:          {}", config.llm.model.cyan());
    println!("  Base URL:       {}", config.llm.base_url);
    println!("  API Key Env:    {}", config.llm.api_key_env);
    println!("  Temperature:    {}", config.llm.temperature);
    println!();
    println!("{}", "RAG:".bold());
    println!("  Embedding Model: {}", config.rag.embedding_model.cyan());
    println!("  Embedding Dim:   {}", embedding_dim);
    println!("  Chunk Size:      {} tokens", config.rag.chunk_size);
    println!("  Batch Size:      {}", config.rag.batch_size);
    println!("  Top K:           {}", config.storage.top_k);
    println!();
    println!("{}", "Server:".bold());
    println!("  Socket:          {}", config.server.socket_path);

    Ok(())
}
