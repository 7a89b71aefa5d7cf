//! Deterministic normalization of scraped product data: size charts, user
//! measurements and fabric composition.

pub mod chart;
pub mod headers;
pub mod selector;
pub mod stretch;
pub mod units;
pub mod vocabulary;
