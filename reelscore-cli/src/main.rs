//! reelscore CLI
//!
//! Unified movie scores from Rotten Tomatoes, Metacritic and IMDb.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{warn, Level};
use tracing_subscriber::FmtSubscriber;

use reelscore_core::{default_sites, OverrideTable, Site, Source};
use reelscore_fetch::{page, ContentKind, FetchConfig, HttpFetcher, PageFetcher, SessionFetcher};
use reelscore_runtime::{load_titles, ranked, run_batch, AggregateError, Aggregator, AggregatorConfig, ExecutionMode};
use reelscore_server::{serve, shutdown_signal, ServerConfig};
use reelscore_sources::site_extractors;

#[derive(Parser)]
#[command(name = "reelscore")]
#[command(author, version, about = "Unified movie scores from Rotten Tomatoes, Metacritic and IMDb", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1", global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on (or set PORT env var)
        #[arg(short, long, env = "PORT", default_value = "3000")]
        port: u16,

        /// Seconds before a score request is answered with 500
        #[arg(long, default_value = "60")]
        request_timeout: u64,

        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// Score a single title
    Query {
        /// Movie title
        #[arg(short, long)]
        title: String,

        /// Print the full JSON result
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// Score every title in a list file
    Batch {
        /// Title list, one per line (# comments allowed)
        #[arg(short, long)]
        input: PathBuf,

        /// Output JSON file
        #[arg(short, long)]
        output: PathBuf,

        /// Also write scored titles sorted by unified score
        #[arg(long)]
        ranked: Option<PathBuf>,

        /// Pause between titles in milliseconds
        #[arg(long, default_value = "2000")]
        pause_ms: u64,

        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// Check that each review site is reachable
    Status {
        #[command(flatten)]
        fetch: FetchArgs,
    },
}

/// Outbound fetch and aggregation options shared by every command
#[derive(Args, Clone)]
struct FetchArgs {
    /// Per-attempt timeout in seconds
    #[arg(long, default_value = "10")]
    timeout: u64,

    /// Attempts per URL
    #[arg(long, default_value = "3")]
    retries: u32,

    /// Backoff unit in milliseconds (wait before attempt i+1 is i * unit)
    #[arg(long, default_value = "1000")]
    backoff_ms: u64,

    /// Pause after each successful fetch in milliseconds
    #[arg(long, default_value = "500")]
    politeness_ms: u64,

    /// Outbound proxy, e.g. socks5h://127.0.0.1:9050 (or set REELSCORE_PROXY)
    #[arg(long, env = "REELSCORE_PROXY")]
    proxy: Option<String>,

    /// Share one cookie-keeping session across all requests
    #[arg(long)]
    session: bool,

    /// Query the sources one after another instead of concurrently
    #[arg(long)]
    sequential: bool,

    /// Pause between sources in sequential mode, in milliseconds
    #[arg(long, default_value = "1000")]
    sequential_pause_ms: u64,

    /// Only accept search results whose title matches
    #[arg(long)]
    strict: bool,

    /// TOML file of known scores that replace scraping for listed titles
    #[arg(long)]
    overrides: Option<PathBuf>,

    /// Rotten Tomatoes base URL, e.g. a local mirror
    #[arg(long)]
    rt_url: Option<String>,

    /// Metacritic base URL
    #[arg(long)]
    metacritic_url: Option<String>,

    /// IMDb base URL
    #[arg(long)]
    imdb_url: Option<String>,
}

impl FetchArgs {
    fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            timeout: Duration::from_secs(self.timeout),
            max_attempts: self.retries,
            base_delay: Duration::from_millis(self.backoff_ms),
            politeness_delay: Duration::from_millis(self.politeness_ms),
            proxy: self.proxy.clone(),
        }
    }

    fn sites(&self) -> Vec<Site> {
        default_sites()
            .into_iter()
            .map(|site| {
                let base_url = match site.source {
                    Source::RottenTomatoes => &self.rt_url,
                    Source::Metacritic => &self.metacritic_url,
                    Source::Imdb => &self.imdb_url,
                };
                match base_url {
                    Some(url) => site.with_base_url(url),
                    None => site,
                }
            })
            .collect()
    }

    fn fetcher(&self) -> Result<Arc<dyn PageFetcher>> {
        let config = self.fetch_config();
        if self.session {
            Ok(Arc::new(SessionFetcher::new(config)))
        } else {
            Ok(Arc::new(HttpFetcher::new(config)?))
        }
    }

    fn aggregator(&self, fetcher: Arc<dyn PageFetcher>) -> Result<Aggregator> {
        let overrides = match &self.overrides {
            Some(path) => OverrideTable::load(path)
                .with_context(|| format!("Failed to load overrides from {}", path.display()))?,
            None => OverrideTable::new(),
        };

        let mode = if self.sequential {
            ExecutionMode::Sequential {
                pause: Duration::from_millis(self.sequential_pause_ms),
            }
        } else {
            ExecutionMode::Concurrent
        };

        Ok(Aggregator::new(
            site_extractors(fetcher, self.sites(), self.strict),
            AggregatorConfig { mode, overrides },
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    match cli.command {
        Commands::Serve {
            host,
            port,
            request_timeout,
            fetch,
        } => {
            let config = ServerConfig {
                host,
                port,
                request_timeout: Duration::from_secs(request_timeout),
            };
            run_server(&config, &fetch).await?;
        }
        Commands::Query { title, json, fetch } => {
            run_query(&title, json, &fetch).await?;
        }
        Commands::Batch {
            input,
            output,
            ranked,
            pause_ms,
            fetch,
        } => {
            run_batch_file(input, output, ranked, Duration::from_millis(pause_ms), &fetch).await?;
        }
        Commands::Status { fetch } => {
            check_status(&fetch).await?;
        }
    }

    Ok(())
}

async fn run_server(config: &ServerConfig, fetch: &FetchArgs) -> Result<()> {
    let fetcher = fetch.fetcher()?;
    let aggregator = Arc::new(fetch.aggregator(fetcher.clone())?);

    let result = serve(config, aggregator, shutdown_signal()).await;

    // Release the shared session whether or not the server exited cleanly
    fetcher.close().await;
    result?;
    Ok(())
}

async fn run_query(title: &str, json: bool, fetch: &FetchArgs) -> Result<()> {
    let fetcher = fetch.fetcher()?;
    let aggregator = fetch.aggregator(fetcher.clone())?;

    let outcome = aggregator.score(title).await;
    fetcher.close().await;

    let result = match outcome {
        Ok(result) => result,
        Err(AggregateError::Empty { .. }) => {
            println!("No scores found for {:?}. Try a different title.", title.trim());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("🎬 {}\n", result.movie_title);
    for source in aggregator.sources() {
        let marker = if result.overridden.contains(&source) { " (override)" } else { "" };
        match result.scores.get(source) {
            Some(rating) => println!("   {:<16} {}{}", source.name(), rating, marker),
            None => println!("   {:<16} -", source.name()),
        }
    }
    println!(
        "\n⭐ Unified score: {} (from {} of {} sources)",
        result.unified_score,
        result.valid_scores,
        aggregator.sources().len()
    );

    Ok(())
}

async fn run_batch_file(
    input: PathBuf,
    output: PathBuf,
    ranked_output: Option<PathBuf>,
    pause: Duration,
    fetch: &FetchArgs,
) -> Result<()> {
    let titles = load_titles(&input).with_context(|| format!("Failed to read {}", input.display()))?;
    println!("📋 {} titles from {}", titles.len(), input.display());

    let fetcher = fetch.fetcher()?;
    let aggregator = fetch.aggregator(fetcher.clone())?;

    // Checkpoint after every title
    let entries = run_batch(&aggregator, &titles, pause, |so_far| {
        if let Err(e) = write_json(&output, so_far) {
            warn!("Failed to save progress to {}: {:#}", output.display(), e);
        }
    })
    .await;
    fetcher.close().await;

    write_json(&output, &entries)?;
    let scored = entries.iter().filter(|e| e.result.is_some()).count();
    println!("✅ Scored {}/{} titles, saved to {}", scored, entries.len(), output.display());

    if let Some(path) = ranked_output {
        let sorted = ranked(&entries);
        write_json(&path, &sorted)?;
        println!("🏆 Ranked results saved to {}", path.display());

        for entry in sorted.iter().take(10) {
            if let Some(score) = entry.unified_score() {
                println!("   {:>3}  {}", score, entry.title);
            }
        }
    }

    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(value)?)
        .with_context(|| format!("Failed to write {}", path.display()))
}

async fn check_status(fetch: &FetchArgs) -> Result<()> {
    println!("🔌 Checking review sites...\n");

    let fetcher = fetch.fetcher()?;
    for site in fetch.sites() {
        match fetcher.fetch(&site.base_url, ContentKind::Html).await {
            Ok(body) => {
                let title = page::title(&body).unwrap_or_else(|| "untitled".to_string());
                println!("✅ {:<16} reachable: {} ({} bytes)", site.source.name(), title, body.len());
            }
            Err(e) => println!("❌ {:<16} {}", site.source.name(), e),
        }
    }
    fetcher.close().await;

    Ok(())
}
