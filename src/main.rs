//! PTT Harvest main entry point
//!
//! This is the command-line interface for the PTT Harvest sub-forum crawler.

use clap::Parser;
use ptt_harvest::anonymise::{AnonymiseMethod, UserAnonymiser, DEFAULT_ID_LENGTH, DEFAULT_SEED};
use ptt_harvest::config::{load_config_with_hash, resolve_subforums, Config};
use ptt_harvest::crawler::{BoardUrls, Coordinator};
use ptt_harvest::output::{
    combined_file, comments_file, data_file, mapping_file, CsvOutput, OutputHandler,
    SplitCsvOutput, SqliteOutput,
};
use ptt_harvest::record::CrawlResult;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// PTT Harvest: a sub-forum crawler
///
/// Walks every index page of the configured sub-forums, extracts posts with
/// their comments, drops announcements, news digests and reposts, and writes
/// the result as CSV and optionally SQLite.
#[derive(Parser, Debug)]
#[command(name = "ptt-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A PTT sub-forum crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Crawl only this sub-forum (repeatable); overrides the config list
    #[arg(short, long = "subforum", value_name = "NAME")]
    subforums: Vec<String>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let mut config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    resolve_subforums(&mut config, cli.subforums)?;

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else {
        handle_crawl(&config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ptt_harvest=info,warn"),
            1 => EnvFilter::new("ptt_harvest=debug,info"),
            2 => EnvFilter::new("ptt_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== PTT Harvest Dry Run ===\n");

    println!("HTTP Configuration:");
    println!("  Timeout: {}s", config.http.timeout_secs);
    println!("  Attempts per request: {}", config.http.max_retries);
    println!(
        "  Backoff between attempts: {}-{}ms",
        config.http.backoff_min_ms, config.http.backoff_max_ms
    );
    println!("  Headers: {}", config.http.headers.len());

    println!("\nCrawler Configuration:");
    println!("  URL workers: {}", config.crawler.url_workers);
    println!("  Post workers: {}", config.crawler.post_workers);
    println!(
        "  Minimum content length: {}",
        config.crawler.min_content_length
    );

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);
    println!("  CSV: {}", config.output.csv);
    match &config.output.sqlite_path {
        Some(path) => println!("  SQLite: {}", path),
        None => println!("  SQLite: disabled"),
    }
    if config.output.anonymise_authors {
        println!("  Anonymise users: {}", config.output.anonymise_method);
    } else {
        println!("  Anonymise users: no");
    }

    println!("\nSub-forums ({}):", config.forum.subforums.len());
    for subforum in &config.forum.subforums {
        let board = BoardUrls::new(&config.forum.base_url, subforum)?;
        println!("  - {} ({})", subforum, board.entry());
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the main crawl operation
///
/// A failed sub-forum is logged and skipped; the rest still run. One
/// anonymiser covers the whole run so ids stay unique across sub-forums.
async fn handle_crawl(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let coordinator = Coordinator::new(config)?;
    let directory = Path::new(&config.output.directory);
    let mut sqlite = match &config.output.sqlite_path {
        Some(path) => Some(SqliteOutput::new(Path::new(path))?),
        None => None,
    };
    let mut anonymiser = if config.output.anonymise_authors {
        Some(open_anonymiser(config, &mapping_file(directory))?)
    } else {
        None
    };

    let total = config.forum.subforums.len();
    let mut results = Vec::new();

    for subforum in &config.forum.subforums {
        let result = match coordinator.crawl(subforum).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Crawl of {} failed: {}", subforum, e);
                continue;
            }
        };

        tracing::info!(
            "{}: {} posts, {} comments",
            subforum,
            result.len(),
            result.comment_count()
        );

        let result = match anonymiser.as_mut() {
            Some(anonymiser) => anonymiser.anonymise_result(&result),
            None => result,
        };

        if config.output.csv {
            CsvOutput::new(data_file(directory, subforum)).write(&result)?;
        }
        if let Some(db) = sqlite.as_mut() {
            db.write(&result)?;
        }

        results.push(result);
    }

    tracing::info!("{} of {} sub-forums crawled", results.len(), total);

    if let Some(anonymiser) = &anonymiser {
        anonymiser.save_mapping(&mapping_file(directory))?;
    }

    if config.output.csv && total > 1 && results.len() == total {
        SplitCsvOutput::new(combined_file(directory), comments_file(directory))
            .write(&CrawlResult::concat(results))?;
    }

    Ok(())
}

/// Builds the run's anonymiser, extending the mapping saved by earlier runs
fn open_anonymiser(
    config: &Config,
    mapping_path: &Path,
) -> Result<UserAnonymiser, Box<dyn std::error::Error>> {
    let method: AnonymiseMethod = config.output.anonymise_method.parse()?;
    let mut anonymiser = UserAnonymiser::new(method, DEFAULT_SEED, DEFAULT_ID_LENGTH);

    if mapping_path.exists() {
        anonymiser.load_mapping(mapping_path)?;
    }
    Ok(anonymiser)
}
