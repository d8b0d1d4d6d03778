// Storage seams for the retrieval flow and the basket handler.

use anyhow::Result;
use async_trait::async_trait;

use crate::database_ops::models::Product;
use crate::normalization::SearchTerm;

/// Source of product transactions. One transaction spans the whole
/// read-or-scrape-then-write sequence of a search.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn ProductTx>>;

    /// Connectivity check used by `/health`.
    async fn ping(&self) -> Result<()>;
}

/// Operations available inside a product transaction. Dropping the
/// transaction without calling [`ProductTx::commit`] rolls it back.
#[async_trait]
pub trait ProductTx: Send {
    /// Products previously linked to `term`. Empty means "not cached".
    async fn products_for_term(&mut self, term: &SearchTerm) -> Result<Vec<Product>>;

    /// Upsert products keyed by their url.
    async fn add_products(&mut self, products: &[Product]) -> Result<()>;

    /// Record `term` and link it to the given (already persisted) products.
    async fn add_search_term(&mut self, term: &SearchTerm, products: &[Product]) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait BasketStore: Send + Sync {
    async fn add_to_basket(&self, client_id: &str, product: &Product) -> Result<()>;
}
