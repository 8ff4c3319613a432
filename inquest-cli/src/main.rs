//! Inquest CLI — run the plan-execute-verify research pipeline from a
//! terminal.

mod eval;
mod render;

use anyhow::Context;
use clap::Parser;
use inquest_core::config::ProviderKind;
use inquest_core::error::LlmError;
use inquest_core::{build_model, InquestConfig, ResearchPipeline};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Inquest: verifiable research runs with cited answers
#[derive(Parser, Debug)]
#[command(name = "inquest", version, about, long_about = None)]
struct Cli {
    /// Question to research
    question: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// LLM model to use
    #[arg(short, long)]
    model: Option<String>,

    /// Use the keyless offline provider
    #[arg(long)]
    mock: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Generate and print a research plan without executing it
    Plan {
        /// Question to plan for
        question: String,
    },
    /// Run the pipeline over a file of evaluation prompts
    Eval {
        /// JSON file of prompts: [{"id", "category", "query"}, ...]
        #[arg(long)]
        prompts: PathBuf,

        /// Emit machine-readable JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    // Human-readable stderr plus a JSON file log.
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "inquest", "inquest")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "inquest.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let mut config = InquestConfig::load(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("configuration error: {e}"))?;
    if let Some(model) = cli.model {
        config.llm.model = model;
    }
    if cli.mock {
        config.llm.provider = ProviderKind::Mock;
    }

    let model = build_model(&config.llm).map_err(|e| match e {
        LlmError::NoCredential { provider } => anyhow::anyhow!(
            "no API key for provider '{provider}': set {} or pass --mock for an offline run",
            config.llm.api_key_env
        ),
        other => anyhow::anyhow!(other),
    })?;
    let pipeline = ResearchPipeline::new(model.clone(), &config);

    match cli.command {
        Some(Commands::Plan { question }) => {
            let planner = inquest_core::Planner::new(model);
            let plan = planner.plan(&question).await?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Some(Commands::Eval { prompts, json }) => {
            eval::run_eval(&pipeline, &prompts, json).await?;
        }
        None => {
            let question = cli
                .question
                .context("provide a question, or use a subcommand (see --help)")?;
            let outcome = pipeline.run(&question).await?;
            render::print_outcome(&outcome);
        }
    }

    Ok(())
}
