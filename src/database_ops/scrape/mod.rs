pub mod provider;

use anyhow::Result;
use async_trait::async_trait;

use crate::database_ops::models::Product;
use crate::normalization::SearchTerm;

pub use provider::{HttpScraper, ScrapeSource};

/// Live product source consulted when the database has nothing for a term.
#[async_trait]
pub trait ProductFetcher: Send + Sync {
    async fn fetch(&self, term: &SearchTerm) -> Result<Vec<Product>>;
}
