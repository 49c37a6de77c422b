//! Validated value types shared across the ballot crates.

mod api_url;

pub use api_url::ApiUrl;
