//! CDEvents CLI - generate and deliver CI/CD lifecycle events
//!
//! The `cdevents` command builds CDEvents from flags and either prints them or
//! sends them to one or more destinations.
//!
//! ## Commands
//!
//! - `generate <domain> <phase>`: print the event in the chosen output mode
//! - `send <domain> <phase>`: deliver the event with bounded retry
//!
//! Domains: `pipeline`, `task`, `build`, `service`, `test`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::{debug, warn};

use cdevents_core::{
    init_tracing, level_for_verbosity, parse_duration, parse_header, CancellationToken,
    CustomData, Domain, EventFactory, EventParams, GeneratedEvent, OutputFormat, OutputFormatter,
    RetryingSender, Settings, TransportFactory,
};

#[derive(Parser, Debug)]
#[command(name = "cdevents")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate and send CDEvents", long_about = None)]
struct Cli {
    /// Config file, TOML or YAML (default: ~/.cdevents-cli.toml or ~/.cdevents-cli.yaml)
    #[arg(long, env = "CDEVENTS_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Output mode: structured, structured-readable or envelope
    #[arg(short, long, global = true)]
    output: Option<OutputFormat>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate an event and print it
    Generate {
        #[command(subcommand)]
        event: EventCommand,
    },

    /// Generate an event and deliver it
    Send {
        #[command(flatten)]
        delivery: DeliveryArgs,

        #[command(subcommand)]
        event: EventCommand,
    },
}

#[derive(Args, Debug)]
struct DeliveryArgs {
    /// Destination: console, http(s)://..., file://... (repeat to fan out)
    #[arg(short = 't', long = "target", global = true)]
    targets: Vec<String>,

    /// Retries after the first attempt
    #[arg(short, long, global = true)]
    retries: Option<u32>,

    /// Deadline for the whole delivery, e.g. 30s, 500ms, 2m
    #[arg(long, value_parser = parse_duration, global = true)]
    timeout: Option<Duration>,

    /// Base delay between retries, doubled each time
    #[arg(long, value_parser = parse_duration, global = true)]
    backoff: Option<Duration>,

    /// Extra HTTP header as key=value (repeatable)
    #[arg(
        short = 'H',
        long = "header",
        visible_alias = "headers",
        value_parser = parse_header,
        global = true
    )]
    headers: Vec<(String, String)>,

    /// Deliver to all targets concurrently
    #[arg(long, global = true)]
    parallel: bool,
}

#[derive(Subcommand, Debug)]
enum EventCommand {
    /// Pipeline run events (queued, started, finished)
    Pipeline {
        phase: String,

        #[command(flatten)]
        common: EventArgs,
    },

    /// Task run events (started, finished)
    Task {
        phase: String,

        /// Pipeline run the task belongs to
        #[arg(short, long)]
        pipeline: Option<String>,

        #[command(flatten)]
        common: EventArgs,
    },

    /// Build events (queued, started, finished)
    Build {
        phase: String,

        #[command(flatten)]
        common: EventArgs,
    },

    /// Service events (deployed, published, removed, rolledback, upgraded)
    Service {
        phase: String,

        /// Environment the service runs in
        #[arg(short, long)]
        environment: Option<String>,

        #[command(flatten)]
        common: EventArgs,
    },

    /// Test events (testcase-*, testsuite-*, testoutput-published)
    Test {
        phase: String,

        #[command(flatten)]
        common: EventArgs,
    },
}

#[derive(Args, Debug, Clone)]
struct EventArgs {
    /// Subject ID
    #[arg(short, long)]
    id: String,

    /// Subject name
    #[arg(short, long)]
    name: String,

    /// Event source (default: cdevents-cli/<hostname>)
    #[arg(short, long)]
    source: Option<String>,

    /// Subject URL
    #[arg(short, long, default_value = "")]
    url: String,

    /// Outcome for finished events (success, failure, error, cancel)
    #[arg(long, default_value = "")]
    outcome: String,

    /// Error details for finished events
    #[arg(long, default_value = "")]
    errors: String,

    /// Custom data as JSON: {"data": ..., "contentType": "..."}
    #[arg(long)]
    custom_json: Option<String>,

    /// Custom data as YAML, same shape as --custom-json
    #[arg(long)]
    custom_yaml: Option<String>,

    /// Custom data field as key=value (repeatable)
    #[arg(long = "custom")]
    custom: Vec<String>,

    /// Content type of the custom data
    #[arg(long)]
    custom_content_type: Option<String>,
}

impl EventCommand {
    fn domain(&self) -> Domain {
        match self {
            EventCommand::Pipeline { .. } => Domain::PipelineRun,
            EventCommand::Task { .. } => Domain::TaskRun,
            EventCommand::Build { .. } => Domain::Build,
            EventCommand::Service { .. } => Domain::Service,
            EventCommand::Test { .. } => Domain::Test,
        }
    }

    fn phase(&self) -> &str {
        match self {
            EventCommand::Pipeline { phase, .. }
            | EventCommand::Task { phase, .. }
            | EventCommand::Build { phase, .. }
            | EventCommand::Service { phase, .. }
            | EventCommand::Test { phase, .. } => phase,
        }
    }

    fn common(&self) -> &EventArgs {
        match self {
            EventCommand::Pipeline { common, .. }
            | EventCommand::Task { common, .. }
            | EventCommand::Build { common, .. }
            | EventCommand::Service { common, .. }
            | EventCommand::Test { common, .. } => common,
        }
    }

    fn params(&self) -> Result<EventParams> {
        let common = self.common();
        let mut params = EventParams::new(&common.id, &common.name)
            .with_url(&common.url)
            .with_outcome(&common.outcome)
            .with_errors(&common.errors)
            .with_custom_data(common.custom_data()?);

        match self {
            EventCommand::Task {
                pipeline: Some(pipeline),
                ..
            } => params = params.with_pipeline_run(pipeline),
            EventCommand::Service {
                environment: Some(environment),
                ..
            } => params = params.with_environment(environment),
            _ => {}
        }
        Ok(params)
    }
}

impl EventArgs {
    /// Merge every custom-data flag; later sources win per key.
    fn custom_data(&self) -> Result<Option<CustomData>> {
        let mut parts = Vec::new();

        if let Some(json) = &self.custom_json {
            parts.extend(CustomData::from_json(json).context("invalid --custom-json")?);
        }
        if let Some(yaml) = &self.custom_yaml {
            parts.extend(CustomData::from_yaml(yaml).context("invalid --custom-yaml")?);
        }
        parts.extend(CustomData::from_key_values(&self.custom).context("invalid --custom")?);
        if let Some(content_type) = &self.custom_content_type {
            parts.push(CustomData::default().with_content_type(content_type));
        }

        Ok(parts.into_iter().reduce(CustomData::merge))
    }
}

// ============================================================================
// Settings
// ============================================================================

fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;

    if let Some(output) = cli.output {
        settings.output = output;
    }

    let (event, delivery) = match &cli.command {
        Commands::Generate { event } => (event, None),
        Commands::Send { event, delivery } => (event, Some(delivery)),
    };

    if let Some(source) = &event.common().source {
        settings.source = source.clone();
    }

    if let Some(delivery) = delivery {
        if !delivery.targets.is_empty() {
            settings.targets = delivery.targets.clone();
        }
        if let Some(retries) = delivery.retries {
            settings.retries = retries;
        }
        if let Some(timeout) = delivery.timeout {
            settings.timeout = timeout;
        }
        if let Some(backoff) = delivery.backoff {
            settings.backoff = backoff;
        }
        settings.headers.extend(delivery.headers.iter().cloned());
        settings.parallel_fanout |= delivery.parallel;
    }

    debug!(?settings, "resolved settings");
    Ok(settings)
}

// ============================================================================
// Commands
// ============================================================================

fn build_event(settings: &Settings, command: &EventCommand) -> Result<GeneratedEvent> {
    let factory = EventFactory::new(&settings.source);
    let domain = command.domain();
    factory
        .construct(domain, command.phase(), command.params()?)
        .with_context(|| format!("Failed to create {} event", domain))
}

fn cmd_generate(settings: &Settings, command: &EventCommand) -> Result<String> {
    let generated = build_event(settings, command)?;
    OutputFormatter::new(settings.output)
        .render(&generated)
        .context("Failed to format output")
}

async fn cmd_send(
    settings: &Settings,
    command: &EventCommand,
    cancel: CancellationToken,
) -> Result<Option<String>> {
    let generated = build_event(settings, command)?;

    let transport = TransportFactory::new(settings.http_options())
        .resolve_all(&settings.targets, settings.parallel_fanout)
        .context("Failed to create transport")?;
    let destination = transport.destination();

    let attempts = RetryingSender::new(settings.retry_policy())
        .with_cancellation(cancel)
        .send_with_retry(transport.as_ref(), &generated.event)
        .await
        .with_context(|| format!("Failed to send event to {}", destination))?;

    // the console transport prints its own confirmation
    if destination == "console" {
        return Ok(None);
    }
    Ok(Some(format!(
        "Event {} sent to {} ({} attempt{})",
        generated.event.id(),
        destination,
        attempts,
        if attempts == 1 { "" } else { "s" }
    )))
}

fn spawn_ctrl_c_handler(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling delivery");
            token.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_json, level_for_verbosity(cli.verbose));

    let settings = resolve_settings(&cli)?;

    match &cli.command {
        Commands::Generate { event } => {
            println!("{}", cmd_generate(&settings, event)?);
        }
        Commands::Send { event, .. } => {
            let cancel = CancellationToken::new();
            spawn_ctrl_c_handler(cancel.clone());
            if let Some(confirmation) = cmd_send(&settings, event, cancel).await? {
                println!("{}", confirmation);
            }
        }
    }

    Ok(())
}
