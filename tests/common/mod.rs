#![allow(dead_code)]

use serde_json::{Value, json};
use tmdb_harvester::{ApiClient, ApiConfig};
use wiremock::MockServer;

pub const API_KEY: &str = "test-key";

pub fn client_for(server: &MockServer) -> ApiClient {
    let config = ApiConfig::new(API_KEY, server.uri());
    ApiClient::new(&config).unwrap()
}

pub fn discover_page(page: u32, total_pages: u32, ids: impl IntoIterator<Item = i64>) -> Value {
    let results: Vec<Value> = ids
        .into_iter()
        .map(|id| json!({ "id": id, "title": format!("Movie {id}") }))
        .collect();
    json!({
        "page": page,
        "total_pages": total_pages,
        "total_results": results.len(),
        "results": results,
    })
}
