// src/history/mod.rs

//! Watermark bookkeeping: which HungerMap release was last processed per country.

pub mod state;
pub mod store;

pub use state::{Watermarks, DEFAULT_KEY};
pub use store::StateStore;
