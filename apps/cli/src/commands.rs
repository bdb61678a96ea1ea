//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::Result;
use creatorlens_classifier::{Classifier, GeminiClient, GenerationParams};
use creatorlens_core::pipeline::{
    PipelineConfig, ProgressReporter, RunMode, RunSummary, Services, run_pipeline,
};
use creatorlens_fetcher::{ContentSource, NeynarClient};
use creatorlens_shared::{
    AppConfig, RetryPolicy, config_file_path, init_config, load_config, load_config_from,
    resolve_api_key,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// CreatorLens: classify creators by what they post, alongside what they earn.
#[derive(Parser)]
#[command(
    name = "creatorlens",
    version,
    about = "Classify Farcaster creators with Gemini and merge in their earnings.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.creatorlens/creatorlens.toml.
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Fetch missing casts, classify every linked creator, write the results.
    Run(RunArgs),

    /// Classify again from cached casts only; no Farcaster calls.
    Reclassify(RunArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Overrides for the `[defaults]` config section.
#[derive(Args, Debug, Default)]
pub(crate) struct RunArgs {
    /// Creator earnings dataset (JSON array).
    #[arg(long)]
    pub creators: Option<PathBuf>,

    /// Output file for the enriched results.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Directory holding cached casts.
    #[arg(long)]
    pub casts_dir: Option<PathBuf>,

    /// Maximum simultaneous requests per stage.
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Popular casts fetched per creator.
    #[arg(long)]
    pub cast_limit: Option<usize>,

    /// Number of top earners to print.
    #[arg(long)]
    pub top: Option<usize>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "creatorlens=info",
        1 => "creatorlens=debug",
        _ => "creatorlens=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_file.as_deref();
    match cli.command {
        Command::Run(args) => {
            let config = resolve_config(config_path)?;
            cmd_run(&config, &args, RunMode::Full).await
        }
        Command::Reclassify(args) => {
            let config = resolve_config(config_path)?;
            cmd_run(&config, &args, RunMode::Reclassify).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    Ok(match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    })
}

/// Merge CLI overrides over the loaded config.
fn pipeline_config(config: &AppConfig, args: &RunArgs, mode: RunMode) -> PipelineConfig {
    let defaults = &config.defaults;
    PipelineConfig {
        creators_file: args
            .creators
            .clone()
            .unwrap_or_else(|| PathBuf::from(&defaults.creators_file)),
        output_file: args
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(&defaults.output_file)),
        casts_dir: args
            .casts_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(&defaults.casts_dir)),
        concurrency: args.concurrency.unwrap_or(defaults.concurrency),
        cast_limit: args.cast_limit.unwrap_or(defaults.cast_limit),
        top_earners: args.top.unwrap_or(defaults.top_earners),
        mode,
    }
}

/// Build the service handles. Every credential is resolved before any
/// client is constructed.
fn build_services(config: &AppConfig, mode: RunMode) -> Result<Services> {
    let gemini_key = resolve_api_key(&config.gemini.api_key_env)?;
    let neynar_key = match mode {
        RunMode::Full => Some(resolve_api_key(&config.neynar.api_key_env)?),
        RunMode::Reclassify => None,
    };

    let retry = RetryPolicy::from(&config.retry);

    let source = match neynar_key {
        Some(key) => {
            let client = NeynarClient::new(
                &config.neynar.base_url,
                &key,
                Duration::from_secs(config.neynar.timeout_secs),
                retry,
            )?;
            Some(Arc::new(client) as Arc<dyn ContentSource>)
        }
        None => None,
    };

    let gemini = GeminiClient::new(&config.gemini.base_url, &config.gemini.model, gemini_key)?;
    let classifier = Classifier::new(
        Arc::new(gemini),
        GenerationParams::from(&config.gemini),
        retry,
    );

    Ok(Services { source, classifier })
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(config: &AppConfig, args: &RunArgs, mode: RunMode) -> Result<()> {
    let services = build_services(config, mode)?;
    let pipeline = pipeline_config(config, args, mode);

    info!(
        creators = %pipeline.creators_file.display(),
        output = %pipeline.output_file.display(),
        concurrency = pipeline.concurrency,
        ?mode,
        "starting classification run"
    );

    let reporter = CliProgress::new();
    let summary = run_pipeline(&pipeline, &services, &reporter).await?;

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("  Classification run complete!");
    println!("  Run:       {}", summary.run_id);
    println!("  Creators:  {}", summary.subjects);
    if let Some(ingest) = &summary.ingest {
        println!(
            "  Casts:     {} fetched, {} cached, {} not found, {} failed",
            ingest.fetched,
            ingest.cached,
            ingest.user_not_found,
            ingest.content_fetch_failed + ingest.errors
        );
    }
    let skipped = summary.skipped_uncached + summary.skipped_empty + summary.unreadable;
    if skipped > 0 {
        println!(
            "  Skipped:   {} ({} uncached, {} without casts, {} unreadable)",
            skipped, summary.skipped_uncached, summary.skipped_empty, summary.unreadable
        );
    }
    println!("  Results:   {}", summary.output_file.display());
    println!("  Time:      {:.1}s", summary.elapsed.as_secs_f64());
    println!();
    for line in summary.report.to_string().lines() {
        println!("  {line}");
    }
    println!();
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter: a spinner between stages, a bar during them.
struct CliProgress {
    current: Mutex<ProgressBar>,
}

impl CliProgress {
    fn new() -> Self {
        Self {
            current: Mutex::new(Self::spinner()),
        }
    }

    fn spinner() -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner
    }

    fn bar(name: &str, total: usize) -> ProgressBar {
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) =
            ProgressStyle::with_template("{prefix:>12.cyan} [{bar:30}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_prefix(name.to_string());
        bar
    }

    /// Swap in a new indicator, clearing the previous one.
    fn replace(&self, next: ProgressBar) {
        if let Ok(mut current) = self.current.lock() {
            current.finish_and_clear();
            *current = next;
        }
    }

    fn with_current(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(current) = self.current.lock() {
            f(&current);
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.replace(Self::spinner());
        self.with_current(|spinner| spinner.set_message(name.to_string()));
    }

    fn stage_started(&self, name: &str, total: usize) {
        self.replace(Self::bar(name, total));
    }

    fn subject_done(&self, username: &str, current: usize, _total: usize) {
        self.with_current(|bar| {
            bar.set_position(current as u64);
            bar.set_message(format!("@{username}"));
        });
    }

    fn done(&self, _summary: &RunSummary) {
        self.with_current(ProgressBar::finish_and_clear);
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let source = match path {
        Some(path) => path.display().to_string(),
        None => config_file_path()?.display().to_string(),
    };
    println!("# {source}");
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
