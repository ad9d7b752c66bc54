use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::model::PageId;

/// Command line interface for crosslink
#[derive(Parser, Debug)]
#[command(
  author,
  version,
  about = "Crosslink: automatic wiki links between world-building pages"
)]
pub struct Cli {
  /// Subcommand to execute (see [`Commands`])
  #[command(subcommand)]
  pub command: Commands,

  /// Enable verbose debug logging
  #[arg(short, long, global = true)]
  pub verbose: bool,

  /// Path to configuration file(s) (TOML or JSON, can be specified multiple
  /// times) Multiple files are merged in order, with later files overriding
  /// earlier ones
  #[arg(
    short = 'c',
    long = "config-file",
    global = true,
    action = clap::ArgAction::Append
  )]
  pub config_files: Vec<PathBuf>,

  /// Override configuration values (KEY=VALUE format, can be used multiple
  /// times)
  #[arg(long = "config", global = true, action = clap::ArgAction::Append)]
  pub config_overrides: Vec<String>,
}

/// All supported subcommands for the crosslink CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
  /// Initialize a new crosslink configuration file
  Init {
    /// Path to create the configuration file at
    #[arg(short, long, default_value = "crosslink.toml")]
    output: PathBuf,

    /// Format of the configuration file.
    #[arg(short = 'F', long, default_value = "toml", value_parser = ["toml", "json"])]
    format: String,

    /// Force overwrite if file already exists
    #[arg(short, long)]
    force: bool,
  },

  /// Insert links into a page, or into every page with --all.
  Link {
    /// Page to link.
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    page: Option<PageId>,

    /// Relink the whole corpus.
    #[arg(short, long)]
    all: bool,

    /// Number of threads to use with --all.
    #[arg(short = 'p', long = "jobs")]
    jobs: Option<usize>,
  },

  /// Handle a newly created page: link it, then link existing pages to it.
  LinkNew {
    /// The new page.
    page: PageId,
  },

  /// Delete a page: clean up references and links, then remove it.
  Delete {
    /// Page to delete.
    page: PageId,
  },

  /// Unwrap every link pointing at a page.
  Retract {
    /// Target page; it need not exist anymore.
    page: PageId,
  },

  /// Remove a page from every page_ref list scoped to its concept.
  Cleanup {
    /// Referenced page.
    page: PageId,
  },
}

impl Cli {
  /// Parse command line arguments into a [`Cli`] struct.
  #[must_use]
  pub fn parse_args() -> Self {
    Self::parse()
  }
}
