//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::application::OutputFormat;
use crate::domain::AppConfig;

/// Channel Archiver - Export channel history to markdown with a JSON summary.
///
/// Run `export` once, then `update` to pick up new posts.
#[derive(Parser, Debug)]
#[command(name = "channel-archiver")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.channel-archiver/config.toml).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides shared by the run commands.
#[derive(Args, Debug, Default, Clone)]
pub struct SourceArgs {
    /// Channel id, @username or part of the title.
    #[arg(long)]
    pub channel: Option<String>,

    /// `SQLite` channel dump to read from.
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Export root directory.
    #[arg(short, long)]
    pub dir: Option<PathBuf>,
}

impl SourceArgs {
    /// Apply the given flags on top of the loaded configuration.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(channel) = &self.channel {
            config.source.channel.clone_from(channel);
        }
        if let Some(database) = &self.database {
            config.source.database = Some(database.clone());
        }
        if let Some(dir) = &self.dir {
            config.export.root.clone_from(dir);
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export the full channel history and rewrite summary.json.
    Export {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Fetch posts newer than the last export and merge them in.
    Update {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// List the most recent archived posts.
    Summary {
        /// Maximum number of posts to show.
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Output format: table or json.
        #[arg(short, long, default_value = "table")]
        format: String,

        /// Export root directory.
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Show statistics about the archive.
    Stats {
        /// Export root directory.
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Write a default configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Show the config file and export layout paths.
    Paths,
}

/// Parse a `--format` argument.
///
/// # Errors
/// Returns the parse message for unknown formats.
pub fn parse_format(format: &str) -> Result<OutputFormat, String> {
    format.parse()
}
