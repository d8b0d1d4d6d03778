pub mod api;
pub mod database_ops;
pub mod normalization;
pub mod orchestrator;
pub mod telemetry;

pub mod util {
    pub mod client_log;
    pub mod env;
    pub mod timing;
}

pub use database_ops::models::Product;
pub use normalization::search_term::SearchTerm;
pub use orchestrator::{Origin, ProductRetrieval, RetrievalError, Retrieved};
