//! Review lookups for a single movie, with backoff on rate limiting.

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::client::ApiClient;

/// Placeholder written wherever a value is unavailable.
pub const NA: &str = "NA";

#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub content: String,
    pub rating: Option<f64>,
}

impl Review {
    pub fn placeholder() -> Self {
        Self {
            content: NA.to_string(),
            rating: None,
        }
    }

    pub fn rating_text(&self) -> String {
        self.rating.map_or_else(|| NA.to_string(), |r| r.to_string())
    }
}

/// Outcome of the lookup, kept apart from the rows so an empty movie can be
/// told from a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Found,
    NoReviews,
    Failed,
}

impl FetchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStatus::Found => "found",
            FetchStatus::NoReviews => "no_reviews",
            FetchStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All rows for one movie. `reviews` is never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieReviews {
    pub movie_id: i64,
    pub status: FetchStatus,
    pub reviews: Vec<Review>,
}

impl MovieReviews {
    pub fn failed(movie_id: i64) -> Self {
        Self {
            movie_id,
            status: FetchStatus::Failed,
            reviews: vec![Review::placeholder()],
        }
    }

    pub fn from_payload(movie_id: i64, payload: ReviewsPayload) -> Self {
        let reviews: Vec<Review> = payload
            .results
            .into_iter()
            .map(|item| Review {
                content: item.content.unwrap_or_else(|| NA.to_string()),
                rating: item.author_details.and_then(|a| a.rating),
            })
            .collect();

        if reviews.is_empty() {
            return Self {
                movie_id,
                status: FetchStatus::NoReviews,
                reviews: vec![Review::placeholder()],
            };
        }

        Self {
            movie_id,
            status: FetchStatus::Found,
            reviews,
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReviewsPayload {
    pub results: Vec<ReviewItem>,
}

#[derive(Default, Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReviewItem {
    pub content: Option<String>,
    pub author_details: Option<AuthorDetails>,
}

#[derive(Default, Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AuthorDetails {
    pub rating: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first request.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Wait after failed attempt `attempt` (1-based): `base_delay * attempt`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

enum Attempt {
    Done(MovieReviews),
    Retry(String),
}

async fn try_fetch(client: &ApiClient, movie_id: i64) -> Attempt {
    let response = match client.http().get(client.reviews_url(movie_id)).send().await {
        Ok(response) => response,
        Err(e) => return Attempt::Retry(e.to_string()),
    };

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Attempt::Retry(format!("status {status}"));
    }
    if !status.is_success() {
        warn!(movie_id, %status, "failed to fetch reviews");
        return Attempt::Done(MovieReviews::failed(movie_id));
    }

    match response.json::<ReviewsPayload>().await {
        Ok(payload) => Attempt::Done(MovieReviews::from_payload(movie_id, payload)),
        Err(e) => {
            warn!(movie_id, error = %e, "undecodable reviews response");
            Attempt::Done(MovieReviews::failed(movie_id))
        }
    }
}

/// Fetches the first page of reviews for `movie_id`.
///
/// Rate-limit responses and transport errors are retried up to
/// `policy.max_attempts` times in total. Anything else that goes wrong
/// yields a single placeholder row with [`FetchStatus::Failed`].
pub async fn fetch_reviews(
    client: &ApiClient,
    movie_id: i64,
    policy: &RetryPolicy,
) -> MovieReviews {
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        match try_fetch(client, movie_id).await {
            Attempt::Done(reviews) => return reviews,
            Attempt::Retry(reason) if attempt < max_attempts => {
                let wait = policy.backoff(attempt);
                debug!(movie_id, attempt, ?wait, %reason, "retrying reviews");
                tokio::time::sleep(wait).await;
            }
            Attempt::Retry(reason) => {
                warn!(movie_id, attempts = max_attempts, %reason, "giving up on reviews");
            }
        }
    }

    MovieReviews::failed(movie_id)
}
