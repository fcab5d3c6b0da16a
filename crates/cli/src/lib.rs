use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use dirscope_lister::{
    EngineConfig, Lister, ScanError, ScanFilters, ScanRequest, SortKey, SortOrder,
};
use dirscope_protocol::ErrorEnvelope;
use serde::Serialize;
use serde_json::{json, Value};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

const MIN_BATCH_SIZE: usize = 1;
const MAX_BATCH_SIZE: usize = 1_000;

#[derive(Parser)]
#[command(name = "dirscope")]
#[command(about = "Bounded, paginated directory listings as JSON", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// Listing cache directory (overrides DIRSCOPE_CACHE_DIR)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Cache TTL in seconds (overrides DIRSCOPE_CACHE_TTL_SECS)
    #[arg(long, global = true)]
    cache_ttl_seconds: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// List one batch of a directory plus a summary of the whole listing
    Scan(ScanArgs),

    /// Print the batch offsets needed to page through a directory
    Info(InfoArgs),

    /// Manage the listing cache
    Cache(CacheArgs),
}

#[derive(Args)]
struct ScanArgs {
    /// Directory to list
    directory: String,

    /// Entries per batch
    #[arg(long, short = 'n', default_value_t = 20)]
    batch_size: usize,

    /// Index of the first entry to print
    #[arg(long, default_value_t = 0)]
    offset: usize,

    /// Descent depth (1..=3)
    #[arg(long, short = 'd', default_value_t = 1)]
    max_depth: usize,

    /// Include dot-prefixed entries
    #[arg(long, short = 'a')]
    all: bool,

    /// Only list files with this extension (repeatable)
    #[arg(long = "type", short = 't', value_name = "EXT")]
    types: Vec<String>,

    /// Sort key
    #[arg(long, value_enum, default_value_t = SortArg::Name)]
    sort_by: SortArg,

    /// Sort order
    #[arg(long, value_enum, default_value_t = OrderArg::Asc)]
    order: OrderArg,

    /// Always walk the directory, ignoring cached results
    #[arg(long)]
    no_cache: bool,

    /// Print name, kind, size and extension only
    #[arg(long)]
    metadata_only: bool,
}

#[derive(Args)]
struct InfoArgs {
    /// Directory to plan
    directory: String,

    /// Batch size the plan is computed for
    #[arg(long, short = 'n', default_value_t = 20)]
    batch_size: usize,

    /// Descent depth (1..=3)
    #[arg(long, short = 'd', default_value_t = 1)]
    max_depth: usize,

    /// Include dot-prefixed entries
    #[arg(long, short = 'a')]
    all: bool,
}

#[derive(Args)]
struct CacheArgs {
    #[command(subcommand)]
    action: CacheAction,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Delete every cached listing
    Clear,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Name,
    Size,
    Modified,
    Type,
}

impl From<SortArg> for SortKey {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Name => Self::Name,
            SortArg::Size => Self::Size,
            SortArg::Modified => Self::Modified,
            SortArg::Type => Self::Type,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OrderArg {
    Asc,
    Desc,
}

impl From<OrderArg> for SortOrder {
    fn from(value: OrderArg) -> Self {
        match value {
            OrderArg::Asc => Self::Asc,
            OrderArg::Desc => Self::Desc,
        }
    }
}

pub fn main_entry() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Error);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let mut config = EngineConfig::from_env();
    if let Some(dir) = cli.cache_dir {
        config.cache_dir = Some(dir);
    }
    if let Some(ttl) = cli.cache_ttl_seconds {
        config.cache_ttl = Duration::from_secs(ttl);
    }
    let lister = Lister::new(config);

    match execute(&lister, cli.command) {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            let mut envelope = ErrorEnvelope::new(err.code(), err.to_string());
            if let Some(processed) = err.entries_processed() {
                envelope = envelope.with_details(json!({
                    "partial": true,
                    "entriesProcessed": processed,
                }));
            }
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "error": envelope }))?
            );
            Ok(ExitCode::from(1))
        }
    }
}

fn execute(lister: &Lister, command: Commands) -> Result<Value, ScanError> {
    match command {
        Commands::Scan(args) => {
            let filters = ScanFilters::new(
                args.max_depth,
                args.all,
                &args.types,
                args.sort_by.into(),
                args.order.into(),
            );
            let request = ScanRequest {
                directory: args.directory,
                filters,
                batch_size: args.batch_size.clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE),
                offset: args.offset,
                use_cache: !args.no_cache,
                memory_limit_mb: None,
            };
            if args.metadata_only {
                to_json(&lister.scan_metadata_only(&request)?)
            } else {
                to_json(&lister.scan(&request)?)
            }
        }
        Commands::Info(args) => {
            let filters = ScanFilters::new(
                args.max_depth,
                args.all,
                Vec::<String>::new(),
                SortKey::Name,
                SortOrder::Asc,
            );
            let batch_size = args.batch_size.clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE);
            to_json(&lister.pagination_info(&args.directory, &filters, batch_size)?)
        }
        Commands::Cache(CacheArgs {
            action: CacheAction::Clear,
        }) => {
            let removed = lister.cache().clear()?;
            let dir = lister
                .cache()
                .persist_dir()
                .map(|dir| dir.to_string_lossy().into_owned());
            log::info!("Removed {removed} cached listing(s)");
            Ok(json!({ "removed": removed, "cacheDir": dir }))
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, ScanError> {
    Ok(serde_json::to_value(value).map_err(io::Error::from)?)
}
