//! Client for the LGTM stack: readiness probes, pushes, and queries.

pub mod client;
pub mod integration;
pub mod models;
pub mod payloads;

pub use client::LgtmClient;
pub use integration::run_integration_test;
pub use models::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LgtmError {
    #[error("{service} request failed: {source}")]
    Request {
        service: LgtmService,
        #[source]
        source: reqwest::Error,
    },
    #[error("{service} answered with status {status}: {body}")]
    Status {
        service: LgtmService,
        status: u16,
        body: String,
    },
    #[error("{service} returned an unreadable body: {source}")]
    Decode {
        service: LgtmService,
        #[source]
        source: reqwest::Error,
    },
}
