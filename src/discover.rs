//! Paginated discovery of movie ids by release-date window.
//!
//! A window whose result set is larger than the API will page through is
//! bisected one year after its start and each half is fetched on its own.

use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::client::ApiClient;
use crate::error::{HarvestError, Result};
use crate::window::{DAYS_PER_YEAR, DateWindow};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub struct DiscoverOptions {
    /// Pause between successive page requests of one window.
    pub page_delay: Duration,
    /// Deepest page the API serves. A window reporting more is bisected.
    pub page_limit: u32,
    /// Offset from the window start where an oversized window is split.
    pub split_days: u64,
}

impl Default for DiscoverOptions {
    fn default() -> Self {
        Self {
            page_delay: Duration::from_millis(300),
            page_limit: 500,
            split_days: DAYS_PER_YEAR,
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DiscoverPage {
    pub total_pages: u32,
    pub total_results: u64,
    pub results: Vec<MovieSummary>,
    pub total_ranges: Option<u32>,
}

#[derive(Default, Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MovieSummary {
    pub id: Option<i64>,
}

impl DiscoverPage {
    /// Whether this window holds more results than `page_limit` pages can
    /// reach.
    pub fn is_oversized(&self, page_limit: u32) -> bool {
        self.total_ranges.is_some_and(|ranges| ranges >= page_limit)
            || self.total_pages > page_limit
    }

    pub fn movie_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.results.iter().filter_map(|movie| movie.id)
    }

    fn last_page(&self) -> u32 {
        self.total_pages.max(1)
    }
}

pub async fn fetch_discover_page(
    client: &ApiClient,
    window: DateWindow,
    page: u32,
) -> Result<DiscoverPage> {
    let start = window.start.format(DATE_FORMAT).to_string();
    let end = window.end.format(DATE_FORMAT).to_string();
    let page = page.to_string();

    let response = client
        .http()
        .get(client.discover_url())
        .query(&[
            ("primary_release_date.gte", start.as_str()),
            ("primary_release_date.lte", end.as_str()),
            ("page", page.as_str()),
            ("include_adult", "true"),
        ])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(HarvestError::Status {
            status,
            url: response.url().to_string(),
        });
    }

    Ok(response.json::<DiscoverPage>().await?)
}

/// Collects every movie id released within `window`.
///
/// Failures stop the window early and return what was gathered so far.
/// If a page reports an oversized result set, ids already gathered for this
/// window are dropped and the two halves are fetched in its place.
pub fn fetch_movie_ids<'a>(
    client: &'a ApiClient,
    window: DateWindow,
    options: &'a DiscoverOptions,
) -> BoxFuture<'a, Vec<i64>> {
    async move {
        let mut movie_ids = Vec::new();
        let mut page = 1;

        loop {
            let data = match fetch_discover_page(client, window, page).await {
                Ok(data) => data,
                Err(e) => {
                    warn!(
                        %window,
                        page,
                        error = %e,
                        "discover request failed, keeping partial results"
                    );
                    break;
                }
            };

            if data.is_oversized(options.page_limit) {
                if let Some((older, newer)) = window.split_after(options.split_days) {
                    info!(
                        %window,
                        total_pages = data.total_pages,
                        total_results = data.total_results,
                        "too many results, splitting window"
                    );
                    let mut ids = fetch_movie_ids(client, older, options).await;
                    ids.extend(fetch_movie_ids(client, newer, options).await);
                    return ids;
                }
                if page == 1 {
                    warn!(
                        %window,
                        page_limit = options.page_limit,
                        "window too short to split, results beyond the page limit are skipped"
                    );
                }
            }

            movie_ids.extend(data.movie_ids());

            let last_page = data.last_page().min(options.page_limit);
            if page >= last_page {
                break;
            }

            page += 1;
            if !options.page_delay.is_zero() {
                tokio::time::sleep(options.page_delay).await;
            }
        }

        debug!(%window, count = movie_ids.len(), "window done");
        movie_ids
    }
    .boxed()
}
