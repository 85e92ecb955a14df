// src/process/mod.rs

//! Flattening HungerMap records into HXL-tagged tables.

pub mod date_parser;
pub mod long;
pub mod rows;
pub mod utils;
pub mod write;

pub use long::{to_long, LongRow};
pub use rows::{
    build_rows, AdminLevel, CountryRows, LookbackWindow, ReferencePeriod, Row, RowBuilder,
    HXL_TAGS,
};
pub use write::write_csv;
