pub mod db;
pub mod exchange;
pub mod models;
pub mod products;
pub mod scrape;
pub mod store;
