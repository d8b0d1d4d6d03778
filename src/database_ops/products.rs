use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgConnection, Postgres, QueryBuilder, Transaction};
use std::collections::HashSet;
use tracing::debug;

use crate::database_ops::db::Db;
use crate::database_ops::models::Product;
use crate::database_ops::store::{BasketStore, ProductStore, ProductTx};
use crate::normalization::SearchTerm;

/// Postgres-backed implementation of the product and basket stores.
#[derive(Clone)]
pub struct PgStore {
    db: Db,
}

impl PgStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

pub struct PgProductTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ProductStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn ProductTx>> {
        let tx = self
            .db
            .pool
            .begin()
            .await
            .context("failed to begin transaction")?;
        Ok(Box::new(PgProductTx { tx }))
    }

    async fn ping(&self) -> Result<()> {
        self.db.ping().await
    }
}

#[async_trait]
impl ProductTx for PgProductTx {
    async fn products_for_term(&mut self, term: &SearchTerm) -> Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, Product>(
            r#"
            SELECT p.name, p.price, p.currency, p.url, p.image_url, p.source
            FROM products p
            JOIN search_term_products stp ON stp.product_id = p.id
            JOIN search_terms st ON st.id = stp.search_term_id
            WHERE st.term = $1
            ORDER BY p.price ASC, p.id ASC
            "#,
        )
        .bind(term.as_str())
        .fetch_all(&mut *self.tx)
        .await
        .with_context(|| format!("failed to query products for {term}"))?;
        debug!(term = %term, count = rows.len(), "database lookup");
        Ok(rows)
    }

    async fn add_products(&mut self, products: &[Product]) -> Result<()> {
        upsert_products(&mut *self.tx, products)
            .await
            .context("failed to add products")?;
        Ok(())
    }

    async fn add_search_term(&mut self, term: &SearchTerm, products: &[Product]) -> Result<()> {
        let term_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO search_terms (term) VALUES ($1)
            ON CONFLICT (term) DO UPDATE SET term = EXCLUDED.term
            RETURNING id
            "#,
        )
        .bind(term.as_str())
        .fetch_one(&mut *self.tx)
        .await
        .with_context(|| format!("failed to add search term {term}"))?;

        let urls: Vec<String> = products.iter().map(|p| p.url.clone()).collect();
        let linked = sqlx::query(
            r#"
            INSERT INTO search_term_products (search_term_id, product_id)
            SELECT $1, p.id FROM products p WHERE p.url = ANY($2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(term_id)
        .bind(&urls)
        .execute(&mut *self.tx)
        .await
        .context("failed to link search term to products")?;
        debug!(term = %term, term_id, linked = linked.rows_affected(), "search term stored");
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.context("failed to commit")?;
        Ok(())
    }
}

#[async_trait]
impl BasketStore for PgStore {
    async fn add_to_basket(&self, client_id: &str, product: &Product) -> Result<()> {
        let mut tx = self.db.pool.begin().await?;
        let product_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO products (name, price, currency, url, image_url, source)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (url) DO UPDATE SET
                name = EXCLUDED.name,
                price = EXCLUDED.price,
                currency = EXCLUDED.currency,
                image_url = COALESCE(EXCLUDED.image_url, products.image_url),
                source = EXCLUDED.source,
                updated_at = now()
            RETURNING id
            "#,
        )
        .bind(&product.name)
        .bind(product.price)
        .bind(&product.currency)
        .bind(&product.url)
        .bind(&product.image_url)
        .bind(&product.source)
        .fetch_one(&mut *tx)
        .await
        .context("failed to upsert basket product")?;

        sqlx::query("INSERT INTO baskets (client_id, product_id) VALUES ($1, $2)")
            .bind(client_id)
            .bind(product_id)
            .execute(&mut *tx)
            .await
            .context("failed to insert basket row")?;
        tx.commit().await?;
        Ok(())
    }
}

// A single multi-row upsert; ON CONFLICT cannot touch the same row twice, so
// repeated urls keep their first occurrence.
async fn upsert_products(conn: &mut PgConnection, products: &[Product]) -> Result<u64> {
    let unique = dedupe_by_url(products);
    if unique.is_empty() {
        return Ok(0);
    }

    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO products (name, price, currency, url, image_url, source) ",
    );
    qb.push_values(unique, |mut b, p| {
        b.push_bind(&p.name)
            .push_bind(p.price)
            .push_bind(&p.currency)
            .push_bind(&p.url)
            .push_bind(&p.image_url)
            .push_bind(&p.source);
    });
    qb.push(
        " ON CONFLICT (url) DO UPDATE SET \
         name = EXCLUDED.name, \
         price = EXCLUDED.price, \
         currency = EXCLUDED.currency, \
         image_url = COALESCE(EXCLUDED.image_url, products.image_url), \
         source = EXCLUDED.source, \
         updated_at = now()",
    );
    let res = qb.build().execute(conn).await?;
    Ok(res.rows_affected())
}

fn dedupe_by_url(products: &[Product]) -> Vec<&Product> {
    let mut seen = HashSet::new();
    products
        .iter()
        .filter(|p| seen.insert(p.url.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(url: &str, price: f64) -> Product {
        Product {
            name: format!("item {url}"),
            price,
            currency: "EUR".into(),
            url: url.into(),
            image_url: None,
            source: "shop".into(),
        }
    }

    #[test]
    fn dedupe_keeps_first_listing_per_url() {
        let list = vec![product("a", 1.0), product("b", 2.0), product("a", 3.0)];
        let unique = dedupe_by_url(&list);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].price, 1.0);
        assert_eq!(unique[1].url, "b");
    }
}
