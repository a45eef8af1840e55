pub mod client;
pub mod config;
pub mod discover;
pub mod error;
pub mod harvest;
pub mod output;
pub mod pool;
pub mod review;
pub mod window;

pub use client::ApiClient;
pub use config::{ApiConfig, ConfigError};
pub use discover::{DiscoverOptions, DiscoverPage, fetch_movie_ids};
pub use error::{HarvestError, Result};
pub use harvest::{
    DuplicatePolicy, IdHarvestOptions, ReviewHarvestOptions, harvest_movie_ids, harvest_reviews,
};
pub use output::{TableColumns, read_movie_ids, write_movie_ids, write_reviews_csv};
pub use review::{FetchStatus, MovieReviews, NA, RetryPolicy, Review, fetch_reviews};
pub use window::{DateWindow, generate_date_windows};
