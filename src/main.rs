//! Channel Archiver - Export channel history into a markdown archive.
//!
//! Reads a channel's message history from a `SQLite` dump, writes one
//! markdown file per post (raw and, optionally, enriched with a generated
//! title and hashtags), downloads attachments, and keeps a JSON summary that
//! incremental updates merge into.
//!
//! QUICK START:
//!   channel-archiver init --database dump.db --channel @name
//!   channel-archiver export             # Full export
//!   channel-archiver update             # New posts since the last run
//!   channel-archiver summary --limit 10 # Most recent posts

mod application;
mod cli;
mod domain;
mod infrastructure;

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{
    format_export_result, format_posts_json, format_posts_table, format_stats,
    format_update_result, recent_posts, ExportEngine, OutputFormat, PostEnricher,
};
use cli::{parse_format, Cli, Commands, SourceArgs};
use domain::{AppConfig, AppError, ChannelHandle, RunStatus};
use infrastructure::{
    config_file_path, ensure_config_exists, load_config, save_config, ChannelSource,
    ExportLayout, OllamaEnricher, SqliteChannelSource, SummaryStore,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main application logic.
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Export { source } => {
            let config = prepare_config(config_path, &source)?;
            cmd_export(&config).await?;
        }
        Commands::Update { source } => {
            let config = prepare_config(config_path, &source)?;
            cmd_update(&config).await?;
        }
        Commands::Summary { limit, format, dir } => {
            let format = parse_format(&format).map_err(|message| AppError::Config { message })?;
            let config = prepare_config(config_path, &dir_only(dir))?;
            cmd_summary(&config, limit, format)?;
        }
        Commands::Stats { dir } => {
            let config = prepare_config(config_path, &dir_only(dir))?;
            cmd_stats(&config)?;
        }
        Commands::Init { force, source } => {
            cmd_init(config_path, force, &source)?;
        }
        Commands::Paths => {
            let config = load_config(config_path)?;
            cmd_paths(config_path, &config);
        }
    }

    Ok(())
}

fn dir_only(dir: Option<std::path::PathBuf>) -> SourceArgs {
    SourceArgs {
        dir,
        ..Default::default()
    }
}

/// Load the config, apply CLI overrides and validate.
fn prepare_config(path: Option<&Path>, overrides: &SourceArgs) -> anyhow::Result<AppConfig> {
    let mut config = load_config(path)?;
    overrides.apply(&mut config);
    config
        .validate()
        .map_err(|message| AppError::Config { message })?;
    Ok(config)
}

/// Open the channel dump, check it and resolve the configured channel.
async fn connect(config: &AppConfig) -> anyhow::Result<(Arc<dyn ChannelSource>, ChannelHandle)> {
    let database = config.source.database.as_deref().ok_or_else(|| AppError::Config {
        message: "No channel database configured (set [source] database or pass --database)"
            .into(),
    })?;
    let identifier = config.source.channel.trim();
    if identifier.is_empty() {
        bail!(AppError::Config {
            message: "No channel configured (set [source] channel or pass --channel)".into(),
        });
    }

    let source: Arc<dyn ChannelSource> = Arc::new(SqliteChannelSource::open(database)?);

    if !source.authenticate().await? {
        bail!(AppError::Authentication {
            message: format!("{} is not a usable channel dump", database.display()),
        });
    }

    let channel = source
        .resolve_channel(identifier)
        .await?
        .ok_or_else(|| AppError::ChannelNotFound {
            identifier: identifier.to_string(),
        })?;

    tracing::info!(channel = %channel.title, id = channel.id, "Resolved channel");
    Ok((source, channel))
}

fn build_engine(config: &AppConfig, source: Arc<dyn ChannelSource>) -> anyhow::Result<ExportEngine> {
    let engine = ExportEngine::new(source, config.export.clone());
    if !config.enrichment.enabled {
        return Ok(engine);
    }

    let enricher = OllamaEnricher::new(config.enrichment.clone())
        .context("Failed to set up enrichment")?;
    Ok(engine.with_enricher(PostEnricher::new(Arc::new(enricher), &config.enrichment)))
}

/// Full export command.
async fn cmd_export(config: &AppConfig) -> anyhow::Result<()> {
    let (source, channel) = connect(config).await?;
    let engine = build_engine(config, source)?;

    let span = tracing::info_span!("export", channel = %channel.title);
    let summary = engine
        .export(&channel, span)
        .await
        .context("Export failed")?;

    println!("{}", format_export_result(&summary));
    Ok(())
}

/// Incremental update command.
async fn cmd_update(config: &AppConfig) -> anyhow::Result<()> {
    let store = SummaryStore::new(&config.export.root);
    let Some(cutoff) = store.load().and_then(|s| s.latest_post_time()) else {
        bail!(
            "No usable export summary at {}. Run `channel-archiver export` first",
            store.path().display()
        );
    };

    let (source, channel) = connect(config).await?;
    let engine = build_engine(config, source)?;

    let span = tracing::info_span!("update", channel = %channel.title);
    let update = engine.update(&channel, cutoff, span).await;

    println!("{}", format_update_result(&update));
    if update.status == RunStatus::Failed {
        bail!(
            "Update failed: {}",
            update.error_message.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn load_summary(config: &AppConfig) -> anyhow::Result<domain::ExportSummary> {
    let store = SummaryStore::new(&config.export.root);
    store
        .load()
        .with_context(|| format!("No usable export summary at {}", store.path().display()))
}

/// List recent posts command.
fn cmd_summary(config: &AppConfig, limit: usize, format: OutputFormat) -> anyhow::Result<()> {
    let summary = load_summary(config)?;
    let posts = recent_posts(&summary, limit);

    let output = match format {
        OutputFormat::Table => format_posts_table(&posts),
        OutputFormat::Json => format_posts_json(&posts).map_err(AppError::json_parse)?,
    };

    println!("{output}");
    Ok(())
}

/// Show statistics command.
fn cmd_stats(config: &AppConfig) -> anyhow::Result<()> {
    let summary = load_summary(config)?;
    println!("{}", format_stats(&summary));
    Ok(())
}

/// Write the configuration file command.
fn cmd_init(path: Option<&Path>, force: bool, source: &SourceArgs) -> anyhow::Result<()> {
    let path = path.map_or_else(config_file_path, Path::to_path_buf);
    let customized = source.channel.is_some() || source.database.is_some() || source.dir.is_some();

    if path.exists() && !force {
        println!(
            "{} Config already exists at {} (use --force to overwrite)",
            "ℹ".blue(),
            path.display()
        );
        return Ok(());
    }

    if customized {
        let mut config = if path.exists() {
            load_config(Some(path.as_path()))?
        } else {
            AppConfig::default()
        };
        source.apply(&mut config);
        save_config(&config, &path)?;
    } else {
        if force && path.exists() {
            std::fs::remove_file(&path)
                .map_err(|e| AppError::io(format!("Failed to replace {}", path.display()), e))?;
        }
        ensure_config_exists(&path)?;
    }

    println!("{} Wrote config to {}", "✓".green(), path.display());
    Ok(())
}

/// Show config and export paths command.
fn cmd_paths(config_path: Option<&Path>, config: &AppConfig) {
    let config_file = config_path.map_or_else(config_file_path, Path::to_path_buf);
    let layout = ExportLayout::new(&config.export.root);

    println!("{}", "📂 Channel Archiver Paths".bold());
    println!();
    println!("  Config:    {}", mark_existing(&config_file));
    if let Some(database) = &config.source.database {
        println!("  Database:  {}", mark_existing(database));
    }
    println!("  Export:    {}", mark_existing(layout.root()));
    println!("  Summary:   {}", mark_existing(&layout.summary_path()));
    println!("  Raw:       {}", layout.raw_dir().display());
    println!("  Processed: {}", layout.processed_dir().display());
    println!("  Media:     {}", layout.media_dir().display());
}

fn mark_existing(path: &Path) -> String {
    if path.exists() {
        format!("{} {}", path.display(), "✓".green())
    } else {
        format!("{} {}", path.display(), "(missing)".dimmed())
    }
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
