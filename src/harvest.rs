use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use indicatif::MultiProgress;
use tracing::info;

use crate::client::ApiClient;
use crate::discover::{DiscoverOptions, fetch_movie_ids};
use crate::error::Result;
use crate::pool::{progress_bar, run_pool};
use crate::review::{MovieReviews, RetryPolicy, fetch_reviews};
use crate::window::generate_date_windows;

/// What to do with ids seen in more than one window. Adjacent windows share
/// their boundary date, so a movie released on it is returned twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    #[default]
    Preserve,
    /// Keep the first occurrence of each id.
    Dedupe,
}

impl DuplicatePolicy {
    pub fn apply(self, ids: Vec<i64>) -> Vec<i64> {
        match self {
            DuplicatePolicy::Preserve => ids,
            DuplicatePolicy::Dedupe => {
                let mut seen = HashSet::with_capacity(ids.len());
                ids.into_iter().filter(|id| seen.insert(*id)).collect()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct IdHarvestOptions {
    pub years: u32,
    pub chunk_years: u32,
    pub workers: usize,
    pub duplicates: DuplicatePolicy,
    pub discover: DiscoverOptions,
    /// Where to draw the progress bar. `None` runs silently.
    pub progress: Option<MultiProgress>,
}

impl Default for IdHarvestOptions {
    fn default() -> Self {
        Self {
            years: 20,
            chunk_years: 4,
            workers: 12,
            duplicates: DuplicatePolicy::default(),
            discover: DiscoverOptions::default(),
            progress: None,
        }
    }
}

/// Discovers every movie released in the `years` before `today`.
pub async fn harvest_movie_ids(
    client: &ApiClient,
    today: NaiveDate,
    options: &IdHarvestOptions,
) -> Result<Vec<i64>> {
    let windows = generate_date_windows(today, options.years, options.chunk_years)?;
    info!(windows = windows.len(), workers = options.workers, "fetching movie ids");

    let discover = Arc::new(options.discover.clone());
    let progress = progress_bar(windows.len(), "Fetching Movie IDs", options.progress.as_ref());

    let batches = run_pool(
        windows,
        options.workers,
        &progress,
        |window| {
            let client = client.clone();
            let discover = Arc::clone(&discover);
            async move { fetch_movie_ids(&client, window, &discover).await }
        },
        |_| Vec::new(),
    )
    .await;

    let movie_ids = options.duplicates.apply(batches.into_iter().flatten().collect());
    info!(
        count = movie_ids.len(),
        years = options.years,
        chunk_years = options.chunk_years,
        "collected movie ids"
    );
    Ok(movie_ids)
}

#[derive(Debug, Clone)]
pub struct ReviewHarvestOptions {
    pub workers: usize,
    pub retry: RetryPolicy,
    pub progress: Option<MultiProgress>,
}

impl Default for ReviewHarvestOptions {
    fn default() -> Self {
        Self {
            workers: 10,
            retry: RetryPolicy::default(),
            progress: None,
        }
    }
}

/// Fetches reviews for every id. Repeated ids are looked up once; the
/// result is keyed and ordered by movie id.
pub async fn harvest_reviews(
    client: &ApiClient,
    movie_ids: &[i64],
    options: &ReviewHarvestOptions,
) -> BTreeMap<i64, MovieReviews> {
    let mut unique = HashSet::with_capacity(movie_ids.len());
    let movie_ids: Vec<i64> = movie_ids
        .iter()
        .copied()
        .filter(|id| unique.insert(*id))
        .collect();
    info!(movies = movie_ids.len(), workers = options.workers, "fetching reviews");

    let retry = Arc::new(options.retry.clone());
    let progress = progress_bar(movie_ids.len(), "Fetching Reviews", options.progress.as_ref());

    let results = run_pool(
        movie_ids,
        options.workers,
        &progress,
        |movie_id| {
            let client = client.clone();
            let retry = Arc::clone(&retry);
            async move { fetch_reviews(&client, movie_id, &retry).await }
        },
        |movie_id| MovieReviews::failed(*movie_id),
    )
    .await;

    results
        .into_iter()
        .map(|reviews| (reviews.movie_id, reviews))
        .collect()
}
