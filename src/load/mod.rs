//! Worker-pool load tests.
//!
//! [`run_load_test`] drives a [`Workload`] from a fixed number of tokio tasks
//! until a deadline passes, then joins them and reports totals.

pub mod runner;
pub mod workloads;

pub use runner::{run_load_test, LoadTestConfig, LoadTestReport, Workload};
pub use workloads::{
    DashboardLoadWorkload, LogsScaleWorkload, MetricsScaleWorkload, TracesScaleWorkload,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("Workload has nothing to do: {0}")]
    NoTargets(String),
}
