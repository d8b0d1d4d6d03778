pub mod search_term;

pub use search_term::SearchTerm;
