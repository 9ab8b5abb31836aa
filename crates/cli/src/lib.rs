//! # Reports CLI
//!
//! Command line and JSON Command API over the fleet reports core.
//!
//! ```text
//! reports <subcommand>          reports command --json '{...}'
//!        │                                │
//!        └──────────> CommandRequest <────┘
//!                           │
//!                    CommandHandler ──> Services (report, versions, resync, health, capabilities)
//!                           │                 │
//!                    CommandResponse     CommandContext (config, sources, mirror, cache, fetcher)
//! ```
//!
//! stdout carries exactly one JSON response; logs go to stderr.

use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use command::{
    CommandAction, CommandContext, CommandRequest, CommandResponse, ReportPayload,
    RequestOptions, ResyncPayload, VersionsPayload,
};
use config::{ConfigOverrides, ReportsConfig, SourceKind};
use reports_assembler::ReportFilters;
use reports_protocol::{serialize_json, serialize_json_pretty};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

pub mod cache;
pub mod command;
pub mod config;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "reports")]
#[command(about = "Fleet inventory and health reports", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,

    /// TOML config file (overrides REPORTS_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Primary dataset store
    #[arg(long, global = true, value_enum)]
    source: Option<SourceKind>,

    /// Directory of `<name>.csv` files for the local source
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// SQLite mirror database
    #[arg(long, global = true)]
    sqlite: Option<PathBuf>,

    /// Directory for the file cache backend
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Cache TTL in seconds (0 disables caching)
    #[arg(long, global = true)]
    cache_ttl_seconds: Option<u64>,

    /// Cache backend: file|memory
    #[arg(long, global = true)]
    cache_backend: Option<String>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            source: self.source,
            data_dir: self.data_dir.clone(),
            sqlite: self.sqlite.clone(),
            cache_dir: self.cache_dir.clone(),
            cache_ttl_seconds: self.cache_ttl_seconds,
            cache_backend: self.cache_backend.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a JSON Command API request
    Command(CommandArgs),

    /// Assemble one report
    Report(ReportArgs),

    /// Correlate inventory versions with the published release tables
    Versions(VersionsArgs),

    /// Copy datasets from the primary source into the SQLite mirror
    Resync(ResyncArgs),

    /// Check that the configured sources answer
    Health(OutputArgs),
}

#[derive(Args)]
struct CommandArgs {
    /// Inline JSON payload (mutually exclusive with --file)
    #[arg(long, conflicts_with = "file")]
    json: Option<String>,

    /// Path to file containing JSON payload
    #[arg(long)]
    file: Option<PathBuf>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Clone, Copy)]
struct OutputArgs {
    /// Pretty-print JSON response
    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct ReportArgs {
    /// Report kind, e.g. firmware, network-utilization, monthly
    kind: String,

    #[arg(long)]
    location: Option<String>,

    #[arg(long)]
    customer: Option<String>,

    /// Report name (monthly report)
    #[arg(long)]
    report: Option<String>,

    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    month: Option<u32>,

    #[arg(long)]
    year: Option<i32>,

    /// Drop rows marked "Missing" (monthly report)
    #[arg(long)]
    exclude_missing: bool,

    /// Bypass the report cache
    #[arg(long)]
    no_cache: bool,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct VersionsArgs {
    /// hosts | vcenter | catalog
    view: String,

    #[arg(long)]
    location: Option<String>,

    /// Bypass the report cache
    #[arg(long)]
    no_cache: bool,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct ResyncArgs {
    /// Comma-separated tables (default: [resync] tables from the config)
    #[arg(long, value_delimiter = ',')]
    tables: Vec<String>,

    #[command(flatten)]
    output: OutputArgs,
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = ReportsConfig::resolve(cli.config.as_deref(), &cli.overrides())?;
    if let Some(path) = &config.path {
        log::debug!("Loaded config from {}", path.display());
    }
    let ctx = CommandContext::open(config)?;

    let (request, output) = match cli.command {
        Commands::Command(args) => {
            let raw = read_payload(&args)?;
            let request: CommandRequest =
                serde_json::from_str(&raw).context("Invalid JSON passed to --json/--file")?;
            (request, args.output)
        }
        Commands::Report(args) => report_request(args)?,
        Commands::Versions(args) => versions_request(args)?,
        Commands::Resync(args) => resync_request(args)?,
        Commands::Health(output) => {
            let request = request_for(CommandAction::Health, serde_json::json!({}), None);
            (request, output)
        }
    };

    run_command(request, output, &ctx).await
}

fn request_for(
    action: CommandAction,
    payload: serde_json::Value,
    options: Option<RequestOptions>,
) -> CommandRequest {
    CommandRequest {
        action,
        payload,
        options,
    }
}

fn no_cache(flag: bool) -> Option<RequestOptions> {
    flag.then(|| RequestOptions { no_cache: true })
}

fn report_request(args: ReportArgs) -> Result<(CommandRequest, OutputArgs)> {
    let payload = ReportPayload {
        kind: args.kind,
        filters: ReportFilters {
            location: args.location,
            customer: args.customer,
            report: args.report,
            month: args.month,
            year: args.year,
            exclude_missing: args.exclude_missing,
        },
    };
    let request = request_for(
        CommandAction::Report,
        serde_json::to_value(payload)?,
        no_cache(args.no_cache),
    );
    Ok((request, args.output))
}

fn versions_request(args: VersionsArgs) -> Result<(CommandRequest, OutputArgs)> {
    let payload = VersionsPayload {
        view: args.view,
        location: args.location,
    };
    let request = request_for(
        CommandAction::Versions,
        serde_json::to_value(payload)?,
        no_cache(args.no_cache),
    );
    Ok((request, args.output))
}

fn resync_request(args: ResyncArgs) -> Result<(CommandRequest, OutputArgs)> {
    let payload = ResyncPayload {
        tables: (!args.tables.is_empty()).then_some(args.tables),
    };
    let request = request_for(CommandAction::Resync, serde_json::to_value(payload)?, None);
    Ok((request, args.output))
}

async fn run_command(
    request: CommandRequest,
    output: OutputArgs,
    ctx: &CommandContext,
) -> Result<()> {
    let action = request.action;
    let response = command::execute(request, ctx).await;

    let text = if output.pretty {
        serialize_json_pretty(&response)?
    } else {
        serialize_json(&response)?
    };
    print_stdout(&text)?;

    if failed(action, &response) {
        std::process::exit(1);
    }
    Ok(())
}

/// Command errors, failed resyncs, and unready health checks exit non-zero.
fn failed(action: CommandAction, response: &CommandResponse) -> bool {
    if response.is_error() {
        return true;
    }
    match action {
        CommandAction::Resync => response.data["status"] == "failed",
        CommandAction::Health => response.data["status"] == "not_ready",
        _ => false,
    }
}

fn read_payload(args: &CommandArgs) -> Result<String> {
    if let Some(raw) = &args.json {
        return Ok(raw.clone());
    }
    if let Some(path) = &args.file {
        return fs::read_to_string(path)
            .with_context(|| format!("Failed to read JSON from {}", path.display()));
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read JSON from stdin")?;

    if buffer.trim().is_empty() {
        anyhow::bail!("Command request is empty. Provide --json, --file, or pipe JSON via stdin.");
    }

    Ok(buffer)
}
