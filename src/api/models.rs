// API request/response models (DTOs)

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::database_ops::exchange::CurrencyTable;
use crate::database_ops::models::Product;

/// `search_term` may arrive in the query string or an urlencoded form body.
#[derive(Debug, Default, PartialEq)]
pub struct SearchParams {
    pub search_term: Option<String>,
}

impl SearchParams {
    /// Takes the first `search_term` pair; repeated or unrelated keys are ignored.
    pub fn from_urlencoded(input: &[u8]) -> Self {
        let search_term = form_urlencoded::parse(input)
            .find(|(key, _)| key == "search_term")
            .map(|(_, value)| value.into_owned());
        Self { search_term }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<Product>,
    pub currency: CurrencyTable,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_search_term_wins() {
        let params = SearchParams::from_urlencoded(b"search_term=a&search_term=b");
        assert_eq!(params.search_term.as_deref(), Some("a"));
    }

    #[test]
    fn decodes_plus_and_percent_escapes() {
        let params = SearchParams::from_urlencoded(b"page=2&search_term=tom+%26+jerry");
        assert_eq!(params.search_term.as_deref(), Some("tom & jerry"));
        assert_eq!(SearchParams::from_urlencoded(b"q=x"), SearchParams::default());
    }
}
