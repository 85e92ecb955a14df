pub mod catalog;
pub mod config;
pub mod country;
pub mod dataset;
pub mod fetch;
pub mod history;
pub mod hungermap;
pub mod pipeline;
pub mod process;
