mod common;

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::NaiveDate;
use common::{client_for, discover_page};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget};
use serde_json::json;
use tmdb_harvester::pool::{SuspendingWriter, progress_bar, run_pool};
use tmdb_harvester::{
    ApiConfig, ConfigError, DiscoverOptions, DuplicatePolicy, FetchStatus, IdHarvestOptions,
    RetryPolicy, ReviewHarvestOptions, harvest_movie_ids, harvest_reviews,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn id_options(duplicates: DuplicatePolicy) -> IdHarvestOptions {
    IdHarvestOptions {
        years: 8,
        chunk_years: 4,
        workers: 2,
        duplicates,
        discover: DiscoverOptions {
            page_delay: Duration::ZERO,
            ..DiscoverOptions::default()
        },
        progress: None,
    }
}

async fn mount_two_windows(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/discover/movie"))
        .and(query_param("primary_release_date.gte", "2020-01-02"))
        .and(query_param("primary_release_date.lte", "2024-01-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(discover_page(1, 1, [1, 2])))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/discover/movie"))
        .and(query_param("primary_release_date.gte", "2016-01-03"))
        .and(query_param("primary_release_date.lte", "2020-01-02"))
        .respond_with(ResponseTemplate::new(200).set_body_json(discover_page(1, 1, [2, 3])))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_harvest_ids_preserves_duplicates() {
    let server = MockServer::start().await;
    mount_two_windows(&server).await;

    let client = client_for(&server);
    let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut ids = harvest_movie_ids(&client, today, &id_options(DuplicatePolicy::Preserve))
        .await
        .unwrap();
    ids.sort_unstable();

    assert_eq!(ids, vec![1, 2, 2, 3]);
}

#[tokio::test]
async fn test_harvest_ids_dedupe() {
    let server = MockServer::start().await;
    mount_two_windows(&server).await;

    let client = client_for(&server);
    let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut ids = harvest_movie_ids(&client, today, &id_options(DuplicatePolicy::Dedupe))
        .await
        .unwrap();
    ids.sort_unstable();

    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn test_duplicate_policy_keeps_first_occurrence() {
    let ids = vec![5, 3, 5, 1, 3];
    assert_eq!(DuplicatePolicy::Preserve.apply(ids.clone()), vec![5, 3, 5, 1, 3]);
    assert_eq!(DuplicatePolicy::Dedupe.apply(ids), vec![5, 3, 1]);
}

#[tokio::test]
async fn test_harvest_reviews_one_entry_per_id() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/movie/1/reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "content": "a", "author_details": { "rating": 5.0 } },
                { "content": "b", "author_details": { "rating": 9.0 } },
            ],
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/movie/2/reviews"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [] })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/movie/3/reviews"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let options = ReviewHarvestOptions {
        workers: 3,
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        },
        progress: None,
    };
    let reviews = harvest_reviews(&client, &[3, 1, 2, 1], &options).await;

    assert_eq!(reviews.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(reviews[&1].reviews.len(), 2);
    assert_eq!(reviews[&2].status, FetchStatus::NoReviews);
    assert_eq!(reviews[&3].status, FetchStatus::Failed);
    assert_eq!(reviews[&3].reviews.len(), 1);
}

#[tokio::test]
async fn test_pool_respects_worker_bound() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let results = run_pool(
        (0..20).collect::<Vec<u32>>(),
        3,
        &ProgressBar::hidden(),
        |item| {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                item * 2
            }
        },
        |_| 0,
    )
    .await;

    let mut results = results;
    results.sort_unstable();
    assert_eq!(results, (0..20).map(|i| i * 2).collect::<Vec<u32>>());
    assert!(peak.load(Ordering::SeqCst) <= 3);
}

#[tokio::test]
async fn test_pool_substitutes_fallback_for_panicked_item() {
    let progress = ProgressBar::hidden();
    let mut results = run_pool(
        vec![1i64, 2, 3],
        2,
        &progress,
        |item| async move {
            if item == 2 {
                panic!("boom");
            }
            item
        },
        |item| -item,
    )
    .await;
    results.sort_unstable();

    assert_eq!(results, vec![-2, 1, 3]);
    assert_eq!(progress.position(), 3);
}

#[test]
fn test_log_writer_passes_lines_through_while_bar_is_active() {
    let bars = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
    let bar = progress_bar(4, "Fetching Reviews", Some(&bars));
    bar.inc(1);

    let mut writer = SuspendingWriter::new(bars.clone(), Vec::new());
    writer.write_all(b"INFO window done\n").unwrap();
    writer.flush().unwrap();

    assert_eq!(writer.into_inner(), b"INFO window done\n");
    assert_eq!(bar.length(), Some(4));
    assert_eq!(bar.position(), 1);
}

#[test]
fn test_progress_bar_hidden_without_target() {
    let bar = progress_bar(4, "Fetching Movie IDs", None);
    assert!(bar.is_hidden());
}

#[test]
fn test_config_requires_api_key() {
    let err = ApiConfig::from_lookup(|_| None).unwrap_err();
    assert!(matches!(err, ConfigError::Missing("API_KEY")));

    let err =
        ApiConfig::from_lookup(|key| (key == "API_KEY").then(|| "  ".to_string())).unwrap_err();
    assert!(matches!(err, ConfigError::Missing("API_KEY")));
}

#[test]
fn test_config_defaults_and_overrides() {
    let config = ApiConfig::from_lookup(|key| match key {
        "API_KEY" => Some("secret".to_string()),
        _ => None,
    })
    .unwrap();
    assert_eq!(config.api_key, "secret");
    assert_eq!(config.discover_url, "https://api.themoviedb.org/3/discover/movie");

    let config = ApiConfig::from_lookup(|key| match key {
        "API_KEY" => Some("secret".to_string()),
        "MOVIE_ID_URL" => Some("http://localhost:9000/discover".to_string()),
        "TMDB_API_BASE" => Some("http://localhost:9000/3/".to_string()),
        _ => None,
    })
    .unwrap();
    assert_eq!(config.discover_url, "http://localhost:9000/discover");
    assert_eq!(config.api_base, "http://localhost:9000/3");
}
