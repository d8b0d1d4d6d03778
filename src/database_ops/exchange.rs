use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

/// Conversion entry relative to the euro.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurrencyRate {
    pub rate: f64,
    pub symbol: &'static str,
}

/// Country name → rate. Ordered so responses are deterministic.
pub type CurrencyTable = BTreeMap<&'static str, CurrencyRate>;

#[async_trait]
pub trait CurrencyProvider: Send + Sync {
    async fn rates(&self) -> CurrencyTable;
}

/// Hardcoded rates served until a live source is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticRates;

impl StaticRates {
    pub fn table() -> CurrencyTable {
        BTreeMap::from([
            ("Canada", CurrencyRate { rate: 1.44, symbol: "C$" }),
            ("India", CurrencyRate { rate: 89.42, symbol: "₹" }),
            ("Costa Rica", CurrencyRate { rate: 588.03, symbol: "₡" }),
            ("Australia", CurrencyRate { rate: 1.63, symbol: "A$" }),
            ("UK", CurrencyRate { rate: 0.86, symbol: "£" }),
            ("Euro", CurrencyRate { rate: 1.0, symbol: "€" }),
            ("Poland", CurrencyRate { rate: 4.46, symbol: "zł" }),
        ])
    }
}

#[async_trait]
impl CurrencyProvider for StaticRates {
    async fn rates(&self) -> CurrencyTable {
        Self::table()
    }
}
