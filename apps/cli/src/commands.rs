//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info, warn};

use linklens_core::{AddLinkResult, Enricher, ProgressReporter};
use linklens_shared::{AppConfig, EnrichmentRequest, init_config, load_config};
use linklens_storage::Storage;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// LinkLens: save links and enrich them with categories, insights and comments.
#[derive(Parser)]
#[command(
    name = "linklens",
    version,
    about = "Extract link metadata and enrich saved content with a generative model.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.linklens/linklens.toml).
    #[arg(long, global = true, env = "LINKLENS_CONFIG")]
    pub config: Option<PathBuf>,

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
    /// Extract title, description, thumbnail and source type from a URL.
    Parse {
        /// Page URL.
        url: String,
    },

    /// Save a link: extract its metadata, store it and classify it.
    Add {
        /// Page URL.
        url: String,
    },

    /// Classify content into the category taxonomy.
    Classify(RequestArgs),

    /// Produce a deep insight (served from storage when one exists).
    Insight(RequestArgs),

    /// Draft comment suggestions.
    Comment(RequestArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Content fields shared by the enrichment commands.
#[derive(Args, Debug, Default)]
pub(crate) struct RequestArgs {
    /// Stored content id; missing fields are filled from the record.
    #[arg(long)]
    pub id: Option<String>,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub summary: Option<String>,

    #[arg(long)]
    pub url: Option<String>,

    /// The user's own draft (comment only).
    #[arg(long)]
    pub draft: Option<String>,

    /// Read the full request as JSON from a file (`-` for stdin).
    /// Flags given alongside override its fields.
    #[arg(long, value_name = "PATH")]
    pub request: Option<PathBuf>,
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

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "linklens=info",
        1 => "linklens=debug",
        _ => "linklens=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
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
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Parse { url } => cmd_parse(config_path, &url).await,
        Command::Add { url } => cmd_add(config_path, &url).await,
        Command::Classify(args) => cmd_classify(config_path, args).await,
        Command::Insight(args) => cmd_insight(config_path, args).await,
        Command::Comment(args) => cmd_comment(config_path, args).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => linklens_shared::load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

async fn open_storage(config: &AppConfig) -> Result<Arc<Storage>> {
    let db_path = config.storage.resolved_db_path()?;
    debug!(path = %db_path.display(), "opening storage");
    Ok(Arc::new(Storage::open(&db_path).await?))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_parse(config_path: Option<&Path>, url: &str) -> Result<()> {
    let config = resolve_config(config_path)?;
    let enricher = Enricher::from_config(&config)?;

    info!(url, "parsing link");
    let spinner = spinner("Fetching page metadata");
    let response = enricher.parse_link(url).await;
    spinner.finish_and_clear();

    print_json(&response)?;
    if !response.success {
        return Err(eyre!(
            "could not parse {url}: {}",
            response.message.unwrap_or_default()
        ));
    }
    Ok(())
}

async fn cmd_add(config_path: Option<&Path>, url: &str) -> Result<()> {
    let config = resolve_config(config_path)?;
    let storage = open_storage(&config).await?;
    let enricher = Enricher::from_config(&config)?;

    info!(url, "adding link");
    let reporter = CliProgress::new();
    let result = enricher
        .add_link(&storage, url, &reporter)
        .await
        .wrap_err_with(|| format!("failed to add {url}"))?;

    print_json(&result)
}

async fn cmd_classify(config_path: Option<&Path>, args: RequestArgs) -> Result<()> {
    let config = resolve_config(config_path)?;
    let req = build_request(args)?;
    let enricher = enricher_for(&config, &req).await?;

    let spinner = spinner("Classifying");
    let result = enricher.classify(&req).await;
    spinner.finish_and_clear();

    print_json(&result)
}

async fn cmd_insight(config_path: Option<&Path>, args: RequestArgs) -> Result<()> {
    let config = resolve_config(config_path)?;
    let req = build_request(args)?;
    let enricher = enricher_for(&config, &req).await?;

    let spinner = spinner("Generating insight");
    let result = enricher.insight(&req).await;
    spinner.finish_and_clear();

    print_json(&result)
}

async fn cmd_comment(config_path: Option<&Path>, args: RequestArgs) -> Result<()> {
    let config = resolve_config(config_path)?;
    let req = build_request(args)?;
    let enricher = enricher_for(&config, &req).await?;

    let spinner = spinner("Drafting comments");
    let result = enricher.assist_comment(&req).await;
    spinner.finish_and_clear();

    print_json(&result)
}

/// Build the enricher, attaching the store when the request names a content
/// id. An unavailable store only costs hydration and caching.
async fn enricher_for(config: &AppConfig, req: &EnrichmentRequest) -> Result<Enricher> {
    let enricher = Enricher::from_config(config)?;
    if req.content_id.is_none() {
        return Ok(enricher);
    }
    match open_storage(config).await {
        Ok(storage) => Ok(enricher.with_store(storage)),
        Err(e) => {
            warn!(error = %e, "storage unavailable; continuing without stored records");
            Ok(enricher)
        }
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Request assembly
// ---------------------------------------------------------------------------

/// Merge an optional JSON request file with flag values (flags win).
fn build_request(args: RequestArgs) -> Result<EnrichmentRequest> {
    let mut req = match &args.request {
        Some(path) => read_request(path)?,
        None => EnrichmentRequest::default(),
    };

    let overrides = [
        (&mut req.content_id, args.id),
        (&mut req.title, args.title),
        (&mut req.description, args.description),
        (&mut req.summary, args.summary),
        (&mut req.url, args.url),
        (&mut req.user_draft, args.draft),
    ];
    for (slot, value) in overrides {
        if value.is_some() {
            *slot = value;
        }
    }
    Ok(req)
}

fn read_request(path: &Path) -> Result<EnrichmentRequest> {
    let text = if path.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).wrap_err("failed to read request from stdin")?
    } else {
        std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read {}", path.display()))?
    };
    serde_json::from_str(&text).wrap_err("request is not a valid JSON enrichment request")
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        Self {
            spinner: spinner("Starting"),
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _result: &AddLinkResult) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_enrichment_flags() {
        let cli = Cli::try_parse_from([
            "linklens",
            "comment",
            "--title",
            "Designing Data Pipelines",
            "--draft",
            "liked it",
            "-v",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Command::Comment(args) => {
                assert_eq!(args.title.as_deref(), Some("Designing Data Pipelines"));
                assert_eq!(args.draft.as_deref(), Some("liked it"));
            }
            _ => panic!("expected comment command"),
        }
    }

    #[test]
    fn flags_override_request_file() {
        let path = std::env::temp_dir().join(format!("ll_req_{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"{"title": "From file", "description": "File description", "contentId": "c9"}"#,
        )
        .unwrap();

        let req = build_request(RequestArgs {
            title: Some("From flag".into()),
            request: Some(path.clone()),
            ..Default::default()
        })
        .unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(req.title.as_deref(), Some("From flag"));
        assert_eq!(req.description.as_deref(), Some("File description"));
        assert_eq!(req.content_id.as_deref(), Some("c9"));
    }
}
