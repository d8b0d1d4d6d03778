use serde::{Deserialize, Serialize};

/// A product listing, either read back from the database or scraped.
/// `url` identifies the listing across both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub name: String,
    pub price: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub url: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub source: String,
}

fn default_currency() -> String {
    "EUR".to_string()
}
