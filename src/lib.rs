pub mod config;
pub mod model;
pub mod pager;
pub mod remote;
pub mod storage;
pub mod task;
pub mod ui;

use anyhow::{Context, Result, anyhow, bail};
use clap::{ArgAction, Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use config::{PASSWORD_ENV, PhotoSearchConfig};
use model::types::FileItem;
use pager::PhotoPager;
use remote::{HttpSearchOperation, SearchOperation};
use storage::FileStore;
use task::TaskHandle;
use ui::time_parser::parse_cursor;
use ui::{PhotoView, Screen, UiLoop};

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(
    name = "photo-search",
    version,
    about = "Page through the photos and videos on a remote server"
)]
pub struct Cli {
    /// Path to the config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// More logging on stderr (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch pages of the photo listing, newest first
    Browse {
        /// Grid columns; the page size is a multiple of this
        #[arg(long)]
        columns: Option<usize>,

        /// How many pages to fetch at most
        #[arg(long, default_value_t = 1)]
        pages: usize,

        /// Start below this time ("-7d", "2024-05-01", unix seconds, ...)
        #[arg(long, allow_hyphen_values = true)]
        before: Option<String>,

        /// One JSON object per file instead of a table
        #[arg(long)]
        json: bool,

        /// Path to the file cache (defaults to the platform data dir)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Skip the debounce delay before each request
        #[arg(long)]
        no_debounce: bool,
    },
    /// List files from the local cache without contacting the server
    Cached {
        /// How many files to list, newest first
        #[arg(long, default_value_t = 50)]
        limit: usize,

        /// Show only this remote path
        #[arg(long, conflicts_with = "limit")]
        path: Option<String>,

        /// One JSON object per file instead of a table
        #[arg(long)]
        json: bool,

        /// Path to the file cache (defaults to the platform data dir)
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum ConfigAction {
    /// Print where the config file lives
    Path,
    /// Print the effective configuration
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

struct BrowseOptions {
    columns: Option<usize>,
    pages: usize,
    before: Option<String>,
    json: bool,
    db: Option<PathBuf>,
    no_debounce: bool,
}

pub fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => PhotoSearchConfig::config_path()?,
    };

    match cli.command {
        Commands::Browse {
            columns,
            pages,
            before,
            json,
            db,
            no_debounce,
        } => run_browse(
            &config_path,
            BrowseOptions {
                columns,
                pages,
                before,
                json,
                db,
                no_debounce,
            },
        ),
        Commands::Cached {
            limit,
            path,
            json,
            db,
        } => run_cached(&config_path, limit, path.as_deref(), json, db),
        Commands::Config { action } => run_config(&config_path, action),
    }
}

fn run_config(path: &Path, action: ConfigAction) -> Result<()> {
    let mut out = std::io::stdout().lock();
    match action {
        ConfigAction::Path => writeln!(out, "{}", path.display())?,
        ConfigAction::Show => {
            let config = PhotoSearchConfig::load_from(path)
                .with_context(|| format!("loading {}", path.display()))?;
            write!(out, "{}", toml::to_string_pretty(&config)?)?;
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            PhotoSearchConfig::default()
                .save_to(path)
                .with_context(|| format!("writing {}", path.display()))?;
            writeln!(out, "wrote {}", path.display())?;
        }
    }
    Ok(())
}

/// Stands in for the hosting screen when running headless.
#[derive(Default)]
struct ConsoleScreen {
    loading: AtomicBool,
}

impl Screen for ConsoleScreen {
    fn set_loading_indicator(&self, loading: bool) {
        if self.loading.swap(loading, Ordering::AcqRel) != loading {
            tracing::debug!(loading, "loading_indicator");
        }
    }
}

fn run_browse(config_path: &Path, opts: BrowseOptions) -> Result<()> {
    let _ = dotenvy::dotenv();
    let config = PhotoSearchConfig::load_from(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let account = config.server.account(std::env::var(PASSWORD_ENV).ok())?;
    let store = Arc::new(open_store(opts.db, &account.name())?);

    let operation: Arc<dyn SearchOperation> = Arc::new(HttpSearchOperation::new(
        config.server.search_path.clone(),
        config.search.mime_filter(),
        config.server.timeout(),
    )?);

    let mut settings = config.search.task_settings();
    if opts.no_debounce {
        settings.debounce = Duration::ZERO;
    }
    let columns = opts.columns.unwrap_or(config.search.default_columns).max(1);
    let page_timeout = settings.debounce + config.server.timeout() + Duration::from_secs(5);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    let ui = UiLoop::new();

    let view = Arc::new(PhotoView::new());
    let screen: Arc<dyn Screen> = Arc::new(ConsoleScreen::default());
    view.attach_screen(&screen);
    if let Some(before) = &opts.before {
        let cursor = parse_cursor(before).ok_or_else(|| anyhow!("could not parse --before {before:?}"))?;
        view.adapter().seed_watermark(cursor);
    }

    let mut pager = PhotoPager::new(
        Arc::clone(&view),
        account,
        Arc::clone(&operation),
        store,
        runtime.handle().clone(),
        ui.handle(),
    )
    .with_settings(settings, config.search.prefetch_rows);

    let mut out = std::io::stdout().lock();
    for page in 1..=opts.pages {
        let shown = view.adapter().len();
        screen.set_loading_indicator(true);
        if !pager.load_more(columns) {
            break;
        }
        let finished = ui.run_until(page_timeout, || {
            pager.current().is_some_and(TaskHandle::is_finished)
        });
        if !finished {
            pager.shutdown();
            bail!("page {page} did not finish within {page_timeout:?}");
        }

        if let Some(result) = pager.current().and_then(TaskHandle::try_result)
            && let Some(err) = result.error
        {
            return Err(anyhow!(err).context(format!("fetching page {page}")));
        }

        let items = view.adapter().current_items();
        for item in items.iter().skip(shown) {
            print_item(&mut out, item, opts.json)?;
        }
        if view.has_no_more_results() {
            tracing::info!(pages = page, total = items.len(), "browse_exhausted");
            break;
        }
    }

    drop(pager);
    runtime.shutdown_timeout(Duration::from_secs(1));
    Ok(())
}

fn run_cached(
    config_path: &Path,
    limit: usize,
    path: Option<&str>,
    json: bool,
    db: Option<PathBuf>,
) -> Result<()> {
    let config = PhotoSearchConfig::load_from(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let account = config.server.account(None)?;
    let store = open_store(db, &account.name())?;

    let items = match path {
        Some(path) => store
            .file_by_path(path)?
            .map(|item| vec![item])
            .ok_or_else(|| anyhow!("{path} is not in the cache"))?,
        None => store.recent_files(limit)?,
    };
    let mut out = std::io::stdout().lock();
    for item in &items {
        print_item(&mut out, item, json)?;
    }
    tracing::debug!(account = %account.name(), shown = items.len(), "cached_listing");
    Ok(())
}

fn open_store(db: Option<PathBuf>, account: &str) -> Result<FileStore> {
    let db_path = match db {
        Some(path) => path,
        None => default_db_path()?,
    };
    FileStore::open(&db_path, account)
}

fn print_item(out: &mut impl Write, item: &FileItem, json: bool) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string(item)?)?;
        return Ok(());
    }
    let when = chrono::DateTime::from_timestamp_millis(item.modified_ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".into());
    writeln!(out, "{when}  {:<12}  {}", item.mime_type, item.remote_path)?;
    Ok(())
}

fn default_db_path() -> Result<PathBuf> {
    Ok(default_data_dir()?.join("files.db"))
}

fn default_data_dir() -> Result<PathBuf> {
    directories::ProjectDirs::from("com", "photo-search", "photo-search")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| anyhow!("could not determine a data directory; pass --db"))
}
