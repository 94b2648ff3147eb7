use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vnexsus::config::EngineConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "vnexsus",
    version,
    about = "Medical event extraction and ground-truth conformity scoring",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the config file
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Engine configuration (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disease code index (JSON) used to remap deprecated codes
    #[arg(long, global = true)]
    code_index: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one extraction against its reference
    Evaluate {
        /// Extraction document (.json) or plain text
        #[arg(short, long)]
        extraction: PathBuf,

        /// Reference (ground truth) text
        #[arg(short, long)]
        reference: PathBuf,

        /// Include the date audit
        #[arg(long, default_value = "false")]
        audit: bool,

        /// Reference day for the future-date audit (YYYY-MM-DD, default today)
        #[arg(long)]
        today: Option<String>,
    },

    /// Score a JSON array of cases and aggregate
    Batch {
        /// Cases file (`[{caseId, caseType, extraction, reference}]`)
        #[arg(short, long)]
        input: PathBuf,

        /// Evaluate cases on worker threads
        #[arg(long, default_value = "false")]
        parallel: bool,

        /// Reuse results of identical cases
        #[arg(long, default_value = "false")]
        cache: bool,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Flag document dates against anchor dates
    Flags {
        /// Extraction document (.json) or plain text
        #[arg(short, long)]
        document: PathBuf,

        /// Anchor dates (YYYY-MM-DD), repeatable
        #[arg(short, long, required = true)]
        anchor: Vec<String>,
    },

    /// Bind, score and filter the events of a document
    Score {
        /// Extraction document (.json) or plain text
        #[arg(short, long)]
        document: PathBuf,

        /// Minimum relevance kept (CRITICAL, HIGH, MEDIUM, LOW, FILTER)
        #[arg(long, default_value = "LOW")]
        min_relevance: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    let format = cli.log_format.as_deref().unwrap_or(&config.logging.format);
    setup_tracing(format, &config.logging.level, cli.verbose)?;

    let engine = commands::build_engine(config.clone(), cli.code_index.as_deref())?;

    match cli.command {
        Commands::Evaluate {
            extraction,
            reference,
            audit,
            today,
        } => {
            tracing::info!(
                extraction = %extraction.display(),
                reference = %reference.display(),
                audit,
                "Starting evaluate command"
            );
            commands::evaluate(&engine, &extraction, &reference, audit, today.as_deref())?;
        }

        Commands::Batch {
            input,
            parallel,
            cache,
            output,
        } => {
            tracing::info!(input = %input.display(), parallel, cache, "Starting batch command");
            commands::batch(engine, config.batch, &input, parallel, cache, output.as_deref()).await?;
        }

        Commands::Flags { document, anchor } => {
            tracing::info!(document = %document.display(), anchors = anchor.len(), "Starting flags command");
            commands::flags(&engine, &document, &anchor)?;
        }

        Commands::Score {
            document,
            min_relevance,
        } => {
            tracing::info!(document = %document.display(), min_relevance = %min_relevance, "Starting score command");
            commands::score(&engine, &document, &min_relevance)?;
        }
    }

    Ok(())
}

/// TOML file when given, environment overlay always
fn load_config(path: Option<&std::path::Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => {
            let mut config = EngineConfig::from_file(path)?;
            config.apply_env()?;
            config
        }
        None => EngineConfig::from_env()?,
    };
    Ok(config)
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("vnexsus=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("vnexsus={level},warn"))?
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
