//! stockcache CLI: read, quote and cache management commands.
//!
//! Commands:
//! - `read`: read a ticker from one source (or all) through the cache
//! - `quote`: print the current delayed live quote
//! - `cache status`: list cache records from their metadata sidecars

mod logging;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stockcache_core::config::ReaderConfig;
use stockcache_core::data::cache::write_csv;
use stockcache_core::data::{
    CacheFormat, DataReader, FileCache, GoogleQuoteProvider, LiveQuoteProvider, MemoryCache,
    ProviderRegistry, RequestedEnd, Series, SourceSelection, SyntheticProvider,
};
use tracing::warn;

#[derive(Parser)]
#[command(
    name = "stockcache",
    about = "stockcache CLI: daily market data with a local cache"
)]
struct Cli {
    /// Cache directory. Defaults to ~/stock-data.
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Reader configuration TOML file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cache file format: csv or parquet.
    #[arg(long, global = true)]
    format: Option<CacheFormat>,

    /// Log level (overridden by RUST_LOG).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read daily data for a ticker, fetching only what the cache lacks.
    Read {
        /// Instrument ticker (e.g., GOOG).
        ticker: String,

        /// Source: yahoo, google, google-realtime, quandl, or all.
        #[arg(long, default_value = "yahoo")]
        source: String,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Ignore cached data and refetch the whole range.
        #[arg(long, default_value_t = false)]
        no_cache: bool,

        /// Return the vendor series instead of the reference series.
        #[arg(long, default_value_t = false)]
        no_reference: bool,

        /// Serve every vendor from `<TICKER>.<vendor>.csv` files in this directory.
        #[arg(long)]
        import_dir: Option<PathBuf>,

        /// Use deterministic synthetic data instead of network vendors.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Keep the cache in memory for this run only.
        #[arg(long, default_value_t = false)]
        ephemeral: bool,

        /// Write the series as CSV to this file instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the delayed live quote for a ticker.
    Quote {
        /// Instrument ticker.
        ticker: String,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List every cache record with its date range and bar count.
    Status {
        /// Print the metadata as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(&cli.log_level, cli.log_json);

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Read {
            ticker,
            source,
            end,
            no_cache,
            no_reference,
            import_dir,
            synthetic,
            ephemeral,
            output,
        } => {
            let opts = ReadOptions {
                no_cache,
                no_reference,
                import_dir,
                synthetic,
                ephemeral,
            };
            run_read(config, &ticker, &source, end.as_deref(), opts, output.as_deref())
        }
        Commands::Quote { ticker } => run_quote(&config, &ticker),
        Commands::Cache { action } => match action {
            CacheAction::Status { json } => run_cache_status(&config, json),
        },
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join("stock-data"))
        .unwrap_or_else(|| PathBuf::from("stock-data"))
}

/// Config file (or defaults), then global flag overrides.
fn load_config(cli: &Cli) -> Result<ReaderConfig> {
    let mut config = match &cli.config {
        Some(path) => ReaderConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ReaderConfig::new(default_cache_dir()),
    };
    if let Some(dir) = &cli.cache_dir {
        config.cache.dir = dir.clone();
    }
    if let Some(format) = cli.format {
        config.cache.format = format;
    }
    Ok(config)
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD"))
}

struct ReadOptions {
    no_cache: bool,
    no_reference: bool,
    import_dir: Option<PathBuf>,
    synthetic: bool,
    ephemeral: bool,
}

fn run_read(
    mut config: ReaderConfig,
    ticker: &str,
    source: &str,
    end: Option<&str>,
    opts: ReadOptions,
    output: Option<&Path>,
) -> Result<()> {
    let selection: SourceSelection = source.parse()?;
    let end = RequestedEnd::from(end.map(parse_date).transpose()?);

    if opts.no_cache {
        config.enable_cache = false;
    }
    if opts.no_reference {
        config.use_reference = false;
    }
    if opts.import_dir.is_some() {
        config.import_dir = opts.import_dir;
    }

    let mut reader = DataReader::from_config(config)?;
    if opts.ephemeral {
        reader = reader.with_cache(Box::new(MemoryCache::new()));
    }
    if opts.synthetic {
        warn!(%ticker, "using synthetic data; results are not real market prices");
        let mut registry = ProviderRegistry::new();
        registry.fill_missing(Arc::new(SyntheticProvider::new()));
        reader = reader.with_providers(registry).without_live_quotes();
    }

    let series = reader
        .read_selection(ticker, selection, end)
        .with_context(|| format!("reading {ticker} from {source}"))?;

    let Some(series) = series else {
        println!("No data for {ticker}: no sources were read.");
        return Ok(());
    };

    match output {
        Some(path) => {
            let file = fs::File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            write_csv(file, &series)?;
            print_summary(&mut io::stdout(), ticker, source, &series)?;
            println!("Written to: {}", path.display());
        }
        None => {
            print_summary(&mut io::stderr(), ticker, source, &series)?;
            write_csv(io::stdout().lock(), &series)?;
        }
    }
    Ok(())
}

fn print_summary(out: &mut dyn Write, ticker: &str, source: &str, series: &Series) -> Result<()> {
    let range = match (series.first_date(), series.last_date()) {
        (Some(first), Some(last)) => format!("{first} to {last}"),
        _ => "(empty)".to_string(),
    };
    writeln!(out, "=== {ticker} ({source}) ===")?;
    writeln!(out, "Period:  {range}")?;
    writeln!(out, "Bars:    {}", series.len())?;
    if let Some(last) = series.bars().last() {
        let cell = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
        writeln!(
            out,
            "Last:    close {}  adj close {}",
            cell(last.close),
            cell(last.adj_close)
        )?;
    }
    Ok(())
}

fn run_quote(config: &ReaderConfig, ticker: &str) -> Result<()> {
    let provider = GoogleQuoteProvider::new(&config.http)?;
    match provider.fetch(ticker) {
        Some(quote) => println!("{ticker} {} {:.2}", quote.timestamp, quote.price),
        None => println!("{ticker}: no live quote"),
    }
    Ok(())
}

fn run_cache_status(config: &ReaderConfig, json: bool) -> Result<()> {
    let cache_dir = &config.cache.dir;
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    let cache = FileCache::new(config.cache.clone());
    let metas = cache.status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&metas)?);
        return Ok(());
    }

    if metas.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    println!("Cache: {}", cache_dir.display());
    println!("Records: {}", metas.len());
    println!();
    println!(
        "{:<10} {:<16} {:<25} {:>8} {:<8}",
        "Ticker", "Source", "Date Range", "Bars", "Format"
    );
    println!("{}", "-".repeat(71));
    for meta in &metas {
        let range = match (meta.start_date, meta.end_date) {
            (Some(start), Some(end)) => format!("{start} to {end}"),
            _ => "(empty)".to_string(),
        };
        println!(
            "{:<10} {:<16} {:<25} {:>8} {:<8}",
            meta.ticker,
            meta.source.id(),
            range,
            meta.bar_count,
            meta.format.extension()
        );
    }

    Ok(())
}
