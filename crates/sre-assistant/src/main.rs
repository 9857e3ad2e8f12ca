//! sre-assistant - AI SRE Assistant
//!
//! Runs the log-to-insight pipeline over a subscription event read from a
//! file or stdin, and offers helpers to build and inspect events locally.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use sre_assistant::{AssistantConfig, Pipeline};
use sre_logs::{encode_payload, InboundEvent, LogBatch, LogEvent, MessageType};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "sre-assistant")]
#[command(about = "AI SRE Assistant - log triage and chat notification")]
#[command(version)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one subscription event and print the invocation report
    Run {
        /// Path to the event JSON, or `-` for stdin
        #[arg(short, long, default_value = "-")]
        event: PathBuf,

        #[command(flatten)]
        config: AssistantConfig,
    },

    /// Wrap plain log lines into a subscription event
    Encode {
        /// Log group name
        #[arg(long)]
        group: String,

        /// Log stream name
        #[arg(long)]
        stream: String,

        /// File with one log message per line, or `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Produce a control message instead of a data message
        #[arg(long)]
        control: bool,
    },

    /// Print the inference request an event would produce, without sending it
    Prompt {
        /// Path to the event JSON, or `-` for stdin
        #[arg(short, long, default_value = "-")]
        event: PathBuf,

        #[command(flatten)]
        config: AssistantConfig,
    },
}

/// Default log levels for the workspace crates; `RUST_LOG` adds to these.
const DEFAULT_DIRECTIVES: [&str; 4] = [
    "sre_assistant=info",
    "sre_logs=info",
    "sre_observe=info",
    "sre_notify=info",
];

fn log_filter() -> anyhow::Result<EnvFilter> {
    let mut filter = EnvFilter::from_default_env();
    for directive in DEFAULT_DIRECTIVES {
        filter = filter.add_directive(directive.parse()?);
    }
    Ok(filter)
}

fn init_tracing(json: bool) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(log_filter()?)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().with_writer(std::io::stderr)))
        .init();

    Ok(())
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json)?;

    match cli.command {
        Commands::Run { event, config } => {
            run_event(&event, config).await?;
        }

        Commands::Encode {
            group,
            stream,
            input,
            control,
        } => {
            encode_event(group, stream, &input, control)?;
        }

        Commands::Prompt { event, config } => {
            show_prompt(&event, config)?;
        }
    }

    Ok(())
}

async fn run_event(path: &Path, config: AssistantConfig) -> anyhow::Result<()> {
    info!(
        model = %config.model_id,
        max_lines = config.max_lines,
        delivery = config.delivery_enabled(),
        "starting sre-assistant"
    );

    let raw = read_input(path)?;
    let pipeline = Pipeline::from_config(config)?;

    match pipeline.handle_json(&raw).await {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Err(e) => {
            error!(kind = e.kind(), "invocation aborted");
            Err(e.into())
        }
    }
}

fn encode_event(
    group: String,
    stream: String,
    path: &Path,
    control: bool,
) -> anyhow::Result<()> {
    let now = Utc::now().timestamp_millis();

    let mut batch = LogBatch::new(group, stream);
    if control {
        batch = batch
            .with_message_type(MessageType::ControlMessage)
            .with_event(
                LogEvent::new("CWL CONTROL MESSAGE: Checking health of destination")
                    .with_timestamp(now),
            );
    } else {
        let raw = read_input(path)?;
        for (i, line) in raw.lines().enumerate() {
            batch = batch.with_event(LogEvent::new(line).with_id(i.to_string()).with_timestamp(now));
        }
    }

    let event = encode_payload(&batch)?;
    println!("{}", serde_json::to_string_pretty(&event)?);
    Ok(())
}

fn show_prompt(path: &Path, config: AssistantConfig) -> anyhow::Result<()> {
    let raw = read_input(path)?;
    let event: InboundEvent = serde_json::from_str(&raw).context("parsing event envelope")?;

    let pipeline = Pipeline::from_config(config)?;
    let prepared = pipeline.prepare(&event)?;

    info!(
        log_group = %prepared.batch.log_group,
        lines = prepared.lines.len(),
        "built inference request"
    );
    println!("{}", serde_json::to_string_pretty(&prepared.request)?);
    Ok(())
}
