//! Cache-then-scrape product retrieval. The database acts as the cache and
//! the scraper as the source of truth; a miss is scraped and written back in
//! the same transaction.
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::database_ops::models::Product;
use crate::database_ops::scrape::ProductFetcher;
use crate::database_ops::store::{ProductStore, ProductTx};
use crate::normalization::SearchTerm;
use crate::util::timing::SlowOp;

/// Where a result set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Database,
    Scraped,
    /// Neither the database nor the scraper had anything; not an error.
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Retrieved {
    pub origin: Origin,
    pub products: Vec<Product>,
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("failed to get products from database: {0:#}")]
    Lookup(#[source] anyhow::Error),
    #[error("failed to get products from web scraping: {0:#}")]
    Scrape(#[source] anyhow::Error),
    #[error("failed to persist scraped products: {0:#}")]
    Persist(#[source] anyhow::Error),
    #[error("transaction failed: {0:#}")]
    Transaction(#[source] anyhow::Error),
}

#[derive(Clone)]
pub struct ProductRetrieval {
    store: Arc<dyn ProductStore>,
    fetcher: Arc<dyn ProductFetcher>,
}

impl ProductRetrieval {
    pub fn new(store: Arc<dyn ProductStore>, fetcher: Arc<dyn ProductFetcher>) -> Self {
        Self { store, fetcher }
    }

    pub fn store(&self) -> &Arc<dyn ProductStore> {
        &self.store
    }

    #[instrument(skip_all, fields(term = %term))]
    pub async fn retrieve(&self, term: &SearchTerm) -> Result<Retrieved, RetrievalError> {
        let _timer = SlowOp::start(format!("product retrieval for {term}"));

        let mut tx = self
            .store
            .begin()
            .await
            .map_err(RetrievalError::Transaction)?;

        let cached = tx
            .products_for_term(term)
            .await
            .map_err(RetrievalError::Lookup)?;
        if !cached.is_empty() {
            info!(count = cached.len(), "products found in database");
            commit(tx).await?;
            return Ok(Retrieved {
                origin: Origin::Database,
                products: cached,
            });
        }

        info!("no products matched in database, now web scraping");
        // Dropping `tx` on the error paths below rolls it back.
        let scraped = self
            .fetcher
            .fetch(term)
            .await
            .map_err(RetrievalError::Scrape)?;

        if scraped.is_empty() {
            warn!("no products found");
            commit(tx).await?;
            return Ok(Retrieved {
                origin: Origin::NotFound,
                products: Vec::new(),
            });
        }

        tx.add_products(&scraped)
            .await
            .map_err(RetrievalError::Persist)?;
        tx.add_search_term(term, &scraped)
            .await
            .map_err(RetrievalError::Persist)?;
        commit(tx).await?;

        info!(count = scraped.len(), "scraped products stored");
        Ok(Retrieved {
            origin: Origin::Scraped,
            products: scraped,
        })
    }
}

async fn commit(tx: Box<dyn ProductTx>) -> Result<(), RetrievalError> {
    tx.commit().await.map_err(RetrievalError::Transaction)
}

/// In-memory fakes shared by the orchestration and HTTP tests.
#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::database_ops::store::BasketStore;

    pub fn product(name: &str, price: f64) -> Product {
        Product {
            name: name.to_string(),
            price,
            currency: "EUR".into(),
            url: format!("https://shop.test/{}", name.replace(' ', "-")),
            image_url: None,
            source: "shop".into(),
        }
    }

    #[derive(Default)]
    pub struct Calls {
        pub begin: AtomicUsize,
        pub lookups: AtomicUsize,
        pub add_products: AtomicUsize,
        pub add_search_term: AtomicUsize,
        pub commits: AtomicUsize,
    }

    #[derive(Default)]
    pub struct FakeStore {
        pub terms: Arc<Mutex<HashMap<String, Vec<Product>>>>,
        pub calls: Arc<Calls>,
        pub fail_lookup: bool,
        pub fail_add_products: bool,
        pub fail_add_search_term: bool,
        pub down: bool,
        pub baskets: Mutex<Vec<(String, Product)>>,
        pub fail_basket: bool,
    }

    impl FakeStore {
        pub fn with_term(term: &str, products: Vec<Product>) -> Self {
            let store = Self::default();
            store
                .terms
                .lock()
                .unwrap()
                .insert(SearchTerm::normalize(term).as_str().to_string(), products);
            store
        }

        pub fn count(&self, f: impl Fn(&Calls) -> &AtomicUsize) -> usize {
            f(&self.calls).load(Ordering::SeqCst)
        }
    }

    struct FakeTx {
        calls: Arc<Calls>,
        cached: HashMap<String, Vec<Product>>,
        fail_lookup: bool,
        fail_add_products: bool,
        fail_add_search_term: bool,
        staged: Vec<Product>,
        store_terms: Arc<Mutex<HashMap<String, Vec<Product>>>>,
    }

    #[async_trait]
    impl ProductStore for FakeStore {
        async fn begin(&self) -> Result<Box<dyn ProductTx>> {
            if self.down {
                return Err(anyhow!("database unavailable"));
            }
            self.calls.begin.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeTx {
                calls: self.calls.clone(),
                cached: self.terms.lock().unwrap().clone(),
                fail_lookup: self.fail_lookup,
                fail_add_products: self.fail_add_products,
                fail_add_search_term: self.fail_add_search_term,
                staged: Vec::new(),
                store_terms: self.terms.clone(),
            }))
        }

        async fn ping(&self) -> Result<()> {
            if self.down {
                Err(anyhow!("database unavailable"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl ProductTx for FakeTx {
        async fn products_for_term(&mut self, term: &SearchTerm) -> Result<Vec<Product>> {
            self.calls.lookups.fetch_add(1, Ordering::SeqCst);
            if self.fail_lookup {
                return Err(anyhow!("relation \"products\" does not exist"));
            }
            Ok(self.cached.get(term.as_str()).cloned().unwrap_or_default())
        }

        async fn add_products(&mut self, products: &[Product]) -> Result<()> {
            self.calls.add_products.fetch_add(1, Ordering::SeqCst);
            if self.fail_add_products {
                return Err(anyhow!("duplicate key value"));
            }
            self.staged = products.to_vec();
            Ok(())
        }

        async fn add_search_term(&mut self, term: &SearchTerm, _products: &[Product]) -> Result<()> {
            self.calls.add_search_term.fetch_add(1, Ordering::SeqCst);
            if self.fail_add_search_term {
                return Err(anyhow!("insert into search_terms failed"));
            }
            let staged = std::mem::take(&mut self.staged);
            self.cached.insert(term.as_str().to_string(), staged);
            Ok(())
        }

        async fn commit(self: Box<Self>) -> Result<()> {
            self.calls.commits.fetch_add(1, Ordering::SeqCst);
            let FakeTx {
                cached,
                store_terms,
                ..
            } = *self;
            *store_terms.lock().unwrap() = cached;
            Ok(())
        }
    }

    #[async_trait]
    impl BasketStore for FakeStore {
        async fn add_to_basket(&self, client_id: &str, product: &Product) -> Result<()> {
            if self.fail_basket {
                return Err(anyhow!("insert failed"));
            }
            self.baskets
                .lock()
                .unwrap()
                .push((client_id.to_string(), product.clone()));
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct FakeFetcher {
        pub results: Vec<Product>,
        pub fail: bool,
        pub calls: AtomicUsize,
    }

    impl FakeFetcher {
        pub fn returning(results: Vec<Product>) -> Self {
            Self {
                results,
                ..Self::default()
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProductFetcher for FakeFetcher {
        async fn fetch(&self, _term: &SearchTerm) -> Result<Vec<Product>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(anyhow!("connection reset"));
            }
            Ok(self.results.clone())
        }
    }
}
