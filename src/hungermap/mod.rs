// src/hungermap/mod.rs

//! HungerMap API payloads and the incremental update filter.

pub mod filter;
pub mod types;

pub use filter::{select_updated, CountrySelection};
pub use types::{CountryList, CountryRecord, Metric, MetricKey, Metrics, RegionRecord};
