use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use client_pulse::config::{AppConfig, OracleSettings, PROVIDER_ANTHROPIC, PROVIDER_LEXICON};
use client_pulse::db::Database;
use client_pulse::digest::{build_digest, render_markdown, write_csv, Digest};
use client_pulse::ingest::{IngestRequest, Ingestor};
use client_pulse::logging::{init_logging, OperationTimer};
use client_pulse::metrics::PipelineMetrics;
use client_pulse::models::{ClientUpdate, Metadata, NewClient};
use client_pulse::oracle::{AnthropicOracle, LexiconOracle, Oracle};
use client_pulse::pipeline::{AnalysisService, AnalysisSettings};
use client_pulse::response_time::estimate_response_time;
use client_pulse::validation::InputValidator;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Extra configuration file, read after the default locations
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, overriding the configured level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and apply migrations
    InitDb,
    /// Print the effective configuration as YAML
    Config,
    /// Register a client
    AddClient {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Company name
        #[arg(short, long)]
        company: String,

        /// Contact email
        #[arg(short, long)]
        email: String,
    },
    /// List clients, least healthy first
    ListClients,
    /// Edit a client's profile
    UpdateClient {
        /// Client id
        #[arg(long)]
        id: i64,

        /// New display name
        #[arg(short, long)]
        name: Option<String>,

        /// New company name
        #[arg(short, long)]
        company: Option<String>,

        /// New contact email
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Delete a client with its messages and signals
    DeleteClient {
        /// Client id
        #[arg(long)]
        id: i64,
    },
    /// Ingest messages from a JSON file (one object or an array)
    Ingest {
        /// Path to the JSON payload
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Analyze one client
    Analyze {
        /// Client id
        #[arg(long)]
        client: i64,
    },
    /// Analyze every client
    AnalyzeAll,
    /// Estimate a client's typical response time
    ResponseTime {
        /// Client id
        #[arg(long)]
        client: i64,
    },
    /// Build the digest of unaddressed signals
    Digest {
        /// Output format (markdown, json or csv); defaults to the configured format
        #[arg(short, long)]
        format: Option<String>,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Write into the configured digest directory
        #[arg(long)]
        save: bool,
    },
    /// Mark a signal as addressed
    AddressSignal {
        /// Signal id
        #[arg(long)]
        id: i64,
    },
    /// Show portfolio statistics
    Stats,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IngestPayload {
    Many(Vec<IngestRequest>),
    One(Box<IngestRequest>),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load_from(cli.config.as_deref())?;

    // Initialize logging; the guard flushes the file writer on exit
    let log_level = cli.log_level.clone().unwrap_or_else(|| config.get_log_level());
    let _log_guard = init_logging(
        Some(&log_level),
        config.logging.format == "json",
        config.logging.file_path.as_deref().map(Path::new),
    )?;

    info!("Starting client-pulse");

    if let Commands::Config = cli.command {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    // Initialize database with configuration
    InputValidator::validate_database_url(&config.database.url)?;
    let db = Database::with_pool_settings(
        &config.database.url,
        config.database.max_connections,
        Duration::from_secs(config.database.connection_timeout_secs),
    )?;
    let metrics = Arc::new(PipelineMetrics::new());

    // Process command
    match cli.command {
        Commands::Config => {}
        Commands::InitDb => println!("Database ready at {}", config.database.url),
        Commands::AddClient {
            name,
            company,
            email,
        } => add_client(&db, name, company, email)?,
        Commands::ListClients => list_clients(&db)?,
        Commands::UpdateClient {
            id,
            name,
            company,
            email,
        } => update_client(&db, id, name, company, email)?,
        Commands::DeleteClient { id } => delete_client(&db, id)?,
        Commands::Ingest { file } => ingest_file(&db, &metrics, &file)?,
        Commands::Analyze { client } => {
            let service = analysis_service(&config, db, Arc::clone(&metrics))?;
            let outcome = service.analyze_client(client).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::AnalyzeAll => {
            let service = analysis_service(&config, db, Arc::clone(&metrics))?;
            let report = service.analyze_all().await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::ResponseTime { client } => response_time(&config, &db, client)?,
        Commands::Digest { format, out, save } => {
            let format = format.unwrap_or_else(|| config.digest.default_format.clone());
            digest(&config, &db, &metrics, &format, out, save)?;
        }
        Commands::AddressSignal { id } => {
            let signal = db.mark_signal_addressed(id)?;
            println!("Signal {} addressed: {}", signal.id, signal.title);
        }
        Commands::Stats => {
            let stats = db.stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    info!(summary = %metrics.summary(), "client-pulse finished");
    Ok(())
}

/// Pick the oracle named by the configuration
fn build_oracle(settings: &OracleSettings) -> Result<Arc<dyn Oracle>> {
    let oracle: Arc<dyn Oracle> = match settings.provider.as_str() {
        PROVIDER_ANTHROPIC => Arc::new(AnthropicOracle::new(settings)?),
        PROVIDER_LEXICON => Arc::new(LexiconOracle::new(settings.check_in_after_days)?),
        other => anyhow::bail!("Unknown oracle provider: {other}"),
    };
    info!(provider = %settings.provider, "Oracle selected");
    Ok(oracle)
}

fn analysis_service(
    config: &AppConfig,
    db: Database,
    metrics: Arc<PipelineMetrics>,
) -> Result<AnalysisService> {
    InputValidator::validate_message_window(config.analysis.message_window)?;
    let oracle = build_oracle(&config.oracle)?;
    Ok(AnalysisService::new(
        db,
        oracle,
        AnalysisSettings::from(config),
        metrics,
    ))
}

fn add_client(db: &Database, name: String, company: String, email: String) -> Result<()> {
    InputValidator::validate_client_name(&name)?;
    InputValidator::validate_company(&company)?;
    InputValidator::validate_email(&email)?;

    if db.find_client_by_email(&email)?.is_some() {
        anyhow::bail!("A client with email {email} already exists");
    }

    let client = db.create_client(&NewClient {
        name,
        company,
        email,
        metadata: Metadata::new(),
    })?;
    println!("Created client {} ({})", client.id, client.name);
    Ok(())
}

fn list_clients(db: &Database) -> Result<()> {
    let clients = db.list_clients()?;
    if clients.is_empty() {
        println!("No clients yet");
        return Ok(());
    }

    for client in clients {
        let contact = client
            .last_contact_date
            .map_or_else(|| "never".to_string(), |d| d.format("%Y-%m-%d").to_string());
        println!(
            "{:>4}  {:>3}  {:<12}  {} ({})  last contact: {}",
            client.id, client.health_score, client.status, client.name, client.company, contact
        );
    }
    Ok(())
}

fn update_client(
    db: &Database,
    id: i64,
    name: Option<String>,
    company: Option<String>,
    email: Option<String>,
) -> Result<()> {
    if let Some(name) = &name {
        InputValidator::validate_client_name(name)?;
    }
    if let Some(company) = &company {
        InputValidator::validate_company(company)?;
    }
    if let Some(email) = &email {
        InputValidator::validate_email(email)?;
    }

    let client = db.update_client(
        id,
        &ClientUpdate {
            name,
            company,
            email,
            metadata: None,
        },
    )?;
    println!("Updated client {} ({})", client.id, client.name);
    Ok(())
}

fn delete_client(db: &Database, id: i64) -> Result<()> {
    if db.delete_client(id)? {
        println!("Deleted client {id}");
    } else {
        warn!(client_id = id, "No client to delete");
        println!("No client with id {id}");
    }
    Ok(())
}

fn ingest_file(db: &Database, metrics: &Arc<PipelineMetrics>, file: &Path) -> Result<()> {
    InputValidator::validate_file_path(file)?;
    let timer = OperationTimer::new("ingest");

    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let requests = match serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", file.display()))?
    {
        IngestPayload::Many(requests) => requests,
        IngestPayload::One(request) => vec![*request],
    };

    let ingestor = Ingestor::new(db.clone(), Arc::clone(metrics))?;
    let summary = ingestor.ingest_all(requests);
    timer.finish();

    println!(
        "Ingested {} message(s), {} duplicate(s), {} failed",
        summary.inserted, summary.duplicates, summary.failed
    );
    Ok(())
}

fn response_time(config: &AppConfig, db: &Database, client_id: i64) -> Result<()> {
    let client = db.require_client(client_id)?;
    let messages = db.recent_messages(client_id, config.analysis.message_window)?;

    match estimate_response_time(&messages) {
        Some(hours) => println!("{}: typical response time {hours:.1} hours", client.name),
        None => println!("{}: not enough back-and-forth to estimate", client.name),
    }
    Ok(())
}

fn digest(
    config: &AppConfig,
    db: &Database,
    metrics: &PipelineMetrics,
    format: &str,
    out: Option<PathBuf>,
    save: bool,
) -> Result<()> {
    let digest = build_digest(&db.unaddressed_signals_by_client()?, Utc::now());
    metrics.record_digest(&digest);
    info!(entries = digest.len(), "Digest built");

    let (rendered, extension) = render_digest(&digest, format)?;

    let target = match (out, save) {
        (Some(path), _) => Some(path),
        (None, true) => {
            let directory = PathBuf::from(&config.digest.output_directory);
            std::fs::create_dir_all(&directory)?;
            Some(directory.join(format!(
                "digest-{}.{extension}",
                digest.generated_at.format("%Y-%m-%d")
            )))
        }
        (None, false) => None,
    };

    match target {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Digest written to {}", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn render_digest(digest: &Digest, format: &str) -> Result<(String, &'static str)> {
    match format.to_lowercase().as_str() {
        "markdown" | "md" => Ok((render_markdown(digest), "md")),
        "json" => Ok((serde_json::to_string_pretty(digest)? + "\n", "json")),
        "csv" => {
            let mut buffer = Vec::new();
            write_csv(digest, &mut buffer)?;
            Ok((String::from_utf8(buffer)?, "csv"))
        }
        other => anyhow::bail!("Invalid digest format: {other}. Use markdown, json or csv"),
    }
}
