use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use indicatif::MultiProgress;
use tmdb_harvester::pool::SuspendingWriter;
use tmdb_harvester::{
    ApiClient, ApiConfig, DiscoverOptions, DuplicatePolicy, IdHarvestOptions, RetryPolicy,
    ReviewHarvestOptions, TableColumns,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Harvests movie ids and reviews from the TMDB API.
///
/// Reads API_KEY (required), MOVIE_ID_URL and TMDB_API_BASE from the
/// environment or a .env file in the working directory.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover movie ids released over the last N years.
    Ids(IdsArgs),
    /// Fetch reviews for every id in an id file.
    Reviews(ReviewsArgs),
}

#[derive(Args, Debug)]
struct IdsArgs {
    #[arg(short, long, default_value_t = 20)]
    years: u32,

    #[arg(short, long, default_value_t = 4)]
    chunk_years: u32,

    #[arg(short, long, default_value_t = 12)]
    workers: usize,

    #[arg(long, default_value_t = 300)]
    page_delay_ms: u64,

    #[arg(long, default_value_t = 500)]
    page_limit: u32,

    /// Drop ids already returned by another window.
    #[arg(long)]
    dedupe: bool,

    #[arg(short, long, default_value = "movie_id.txt")]
    output: PathBuf,

    #[arg(long)]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct ReviewsArgs {
    #[arg(short, long, default_value = "movie_id.txt")]
    input: PathBuf,

    #[arg(short, long, default_value = "movie_reviews.csv")]
    output: PathBuf,

    #[arg(short, long, default_value_t = 10)]
    workers: usize,

    #[arg(long, default_value_t = 3)]
    max_attempts: u32,

    #[arg(long, default_value_t = 1000)]
    backoff_ms: u64,

    /// Write only movie_id and review.
    #[arg(long)]
    no_rating: bool,

    /// Add a status column: found, no_reviews or failed.
    #[arg(long)]
    with_status: bool,

    #[arg(long)]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let bars = MultiProgress::new();
    let log_bars = bars.clone();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(move || SuspendingWriter::stderr(&log_bars))
        .init();

    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = ApiConfig::from_env()?;
    let client = ApiClient::new(&config)?;

    match cli.command {
        Command::Ids(args) => run_ids(&client, &bars, args).await,
        Command::Reviews(args) => run_reviews(&client, &bars, args).await,
    }
}

async fn run_ids(client: &ApiClient, bars: &MultiProgress, args: IdsArgs) -> Result<()> {
    let options = IdHarvestOptions {
        years: args.years,
        chunk_years: args.chunk_years,
        workers: args.workers,
        duplicates: if args.dedupe {
            DuplicatePolicy::Dedupe
        } else {
            DuplicatePolicy::Preserve
        },
        discover: DiscoverOptions {
            page_delay: Duration::from_millis(args.page_delay_ms),
            page_limit: args.page_limit,
            ..DiscoverOptions::default()
        },
        progress: (!args.no_progress).then(|| bars.clone()),
    };

    let today = chrono::Local::now().date_naive();
    let movie_ids = tmdb_harvester::harvest_movie_ids(client, today, &options).await?;
    tmdb_harvester::write_movie_ids(&args.output, &movie_ids)?;

    Ok(())
}

async fn run_reviews(client: &ApiClient, bars: &MultiProgress, args: ReviewsArgs) -> Result<()> {
    let movie_ids = tmdb_harvester::read_movie_ids(&args.input)?;
    info!(count = movie_ids.len(), path = %args.input.display(), "read movie ids");

    let options = ReviewHarvestOptions {
        workers: args.workers,
        retry: RetryPolicy {
            max_attempts: args.max_attempts,
            base_delay: Duration::from_millis(args.backoff_ms),
        },
        progress: (!args.no_progress).then(|| bars.clone()),
    };
    let reviews = tmdb_harvester::harvest_reviews(client, &movie_ids, &options).await;

    let columns = TableColumns {
        rating: !args.no_rating,
        status: args.with_status,
    };
    tmdb_harvester::write_reviews_csv(&args.output, &reviews, columns)?;

    Ok(())
}
