pub mod client;
pub mod probe;

pub use client::RouterClient;
pub use probe::{ApiState, ProbeOutcome, check_health};

use async_trait::async_trait;
use thiserror::Error;

use crate::mount::{ClusterInfo, MountTable};

/// Failure fetching a resource from the router metastore
#[derive(Debug, Error)]
pub enum MetastoreError {
    /// Connection, TLS or timeout failure
    #[error("request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The router answered with something other than 200
    #[error("errors on requesting url of [{url}], status code: [{status}]")]
    Status { url: String, status: u16 },

    /// The body could not be decoded into the expected shape
    #[error("unexpected response body from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Read access to the router metastore
///
/// Commands depend on this rather than on the HTTP client so they can be
/// driven by an in-memory table in tests.
#[async_trait]
pub trait MetastoreApi: Send + Sync {
    /// Fetch the current mount table snapshot
    async fn list_mounts(&self) -> Result<MountTable, MetastoreError>;

    /// Fetch metadata for every mounted cluster
    async fn list_clusters(&self) -> Result<Vec<ClusterInfo>, MetastoreError>;
}
