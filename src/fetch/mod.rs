// src/fetch/mod.rs

//! Blocking HTTP JSON retrieval with optional save/replay of response bodies.

use std::path::PathBuf;
use thiserror::Error;

pub mod retriever;
pub mod urls;

pub use retriever::{FetchMode, Retriever};

/// Failures of a single retrieval. Callers decide whether the data was
/// required (propagate) or optional (downgrade).
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("building HTTP client")]
    Client(#[source] reqwest::Error),
    #[error("GET {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("GET {url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("no saved data for {url} at `{}`", path.display())]
    MissingSaved { url: String, path: PathBuf },
    #[error("I/O on `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("decoding JSON from {url}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}
