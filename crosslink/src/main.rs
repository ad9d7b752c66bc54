use std::{fs, sync::Arc};

use color_eyre::eyre::{Context, Result, bail};
use crosslink::{
  cli::{Cli, Commands},
  dispatch::{Dispatcher, Operation, dispatcher_from_config},
  engine::Crosslinker,
  model::PageId,
  store::{DocumentStore, JsonStore},
  triggers,
};
use crosslink_config::Config;
use log::{LevelFilter, info, warn};

type Engine = Crosslinker<Arc<JsonStore>>;

fn main() -> Result<()> {
  color_eyre::install()?;

  let cli = Cli::parse_args();

  // Initialize logging first so we can log during command handling
  env_logger::Builder::new()
    .filter_level(if cli.verbose {
      LevelFilter::Debug
    } else {
      LevelFilter::Info
    })
    .write_style(env_logger::WriteStyle::Always)
    .init();

  if let Commands::Init {
    output,
    format,
    force,
  } = &cli.command
  {
    if output.exists() && !force {
      bail!(
        "Configuration file already exists: {}. Use --force to overwrite.",
        output.display()
      );
    }

    if let Some(parent) = output.parent()
      && !parent.as_os_str().is_empty()
      && !parent.exists()
    {
      fs::create_dir_all(parent).wrap_err_with(|| {
        format!("Failed to create directory: {}", parent.display())
      })?;
      info!("Created directory: {}", parent.display());
    }

    Config::generate_default_config(format, output).wrap_err_with(|| {
      format!(
        "Failed to generate configuration file: {}",
        output.display()
      )
    })?;
    return Ok(());
  }

  let config = Config::load(&cli.config_files, &cli.config_overrides)
    .wrap_err("Failed to load configuration")?;

  let store = Arc::new(JsonStore::open(&config.corpus_path).wrap_err_with(
    || format!("Failed to open corpus {}", config.corpus_path.display()),
  )?);
  let engine = Arc::new(Crosslinker::new(Arc::clone(&store), &config.links));

  match cli.command {
    Commands::Init { .. } => Ok(()),
    Commands::Link {
      all: true, jobs, ..
    } => relink_all(&engine, jobs),
    Commands::Link {
      page: Some(page), ..
    } => {
      let dispatcher = dispatcher_from_config(&config.dispatch, engine)?;
      triggers::on_page_edited(dispatcher.as_ref(), page)?;
      finish(dispatcher.as_ref())
    },
    Commands::Link { page: None, .. } => {
      bail!("Either a page id or --all is required")
    },
    Commands::LinkNew { page } => {
      let dispatcher = dispatcher_from_config(&config.dispatch, engine)?;
      triggers::on_page_created(dispatcher.as_ref(), page)?;
      finish(dispatcher.as_ref())
    },
    Commands::Retract { page } => {
      let dispatcher = dispatcher_from_config(&config.dispatch, engine)?;
      dispatcher.dispatch(Operation::RetractLinksToDeletedPage, page)?;
      finish(dispatcher.as_ref())
    },
    Commands::Cleanup { page } => {
      let dispatcher = dispatcher_from_config(&config.dispatch, engine)?;
      dispatcher.dispatch(Operation::CleanupReferencesToDeletedPage, page)?;
      finish(dispatcher.as_ref())
    },
    Commands::Delete { page } => delete_page(&engine, &store, page),
  }
}

fn finish(dispatcher: &dyn Dispatcher) -> Result<()> {
  dispatcher
    .flush()
    .wrap_err_with(|| format!("{} dispatch did not complete", dispatcher.mode()))
}

/// Relink the whole corpus on a pool of `jobs` threads.
fn relink_all(engine: &Engine, jobs: Option<usize>) -> Result<()> {
  let thread_count = jobs.unwrap_or_else(num_cpus::get);
  rayon::ThreadPoolBuilder::new()
    .num_threads(thread_count)
    .build_global()?;

  let report = engine.relink_all()?;
  info!("Relinked corpus: {report}");
  Ok(())
}

/// Deletion always runs inline: the page must still be in the corpus while
/// its references are cleaned up, and it is removed only afterwards.
fn delete_page(
  engine: &Engine,
  store: &JsonStore,
  page: PageId,
) -> Result<()> {
  if store.get_page(page)?.is_none() {
    warn!("Page {page} is not in the corpus, retracting stale links only");
  }

  let mut report = engine.cleanup_references_to_deleted_page(page)?;
  report += engine.retract_links_to_deleted_page(page)?;

  if store.delete_page(page)?.is_some() {
    info!("Deleted page {page}");
  }
  info!("Cleaned up after page {page}: {report}");
  Ok(())
}
