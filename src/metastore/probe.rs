//! Health check of the router metastore API.
//!
//! Each probe calls one endpoint a fixed number of times in sequence and
//! reports the mean latency. The probes for the two endpoints run
//! concurrently and their results are joined through a bounded channel.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use super::MetastoreApi;

pub const MOUNT_LIST_API: &str = "mount list";
pub const CLUSTER_LIST_API: &str = "cluster list";

/// Result of one probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Every call succeeded; mean latency per call
    Ok { avg: Duration },
    /// A call failed and the probe stopped there
    Failed { error: String },
}

/// Probe report for one API endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiState {
    pub api_name: &'static str,
    pub outcome: ProbeOutcome,
    /// Number of calls the probe was asked to make
    pub number: u32,
}

impl ApiState {
    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, ProbeOutcome::Ok { .. })
    }

    /// `OK` or `FAIL`
    pub fn state_label(&self) -> &'static str {
        if self.is_ok() { "OK" } else { "FAIL" }
    }

    /// Mean latency in whole milliseconds, `-1` for a failed probe
    pub fn avg_millis(&self) -> i64 {
        match &self.outcome {
            ProbeOutcome::Ok { avg } => avg.as_millis() as i64,
            ProbeOutcome::Failed { .. } => -1,
        }
    }

    /// Table cell such as `12(ms)/5`
    pub fn avg_time_cell(&self) -> String {
        format!("{}(ms)/{}", self.avg_millis(), self.number)
    }
}

/// Run `action` `number` times in sequence and return the mean duration
///
/// Stops at the first error.
pub async fn time_repeated<F, Fut, T, E>(mut action: F, number: u32) -> Result<Duration, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let start = Instant::now();
    for _ in 0..number {
        action().await?;
    }
    Ok(start.elapsed() / number.max(1))
}

fn outcome_of<E: std::fmt::Display>(result: Result<Duration, E>) -> ProbeOutcome {
    match result {
        Ok(avg) => ProbeOutcome::Ok { avg },
        Err(e) => ProbeOutcome::Failed {
            error: e.to_string(),
        },
    }
}

/// Probe both metastore endpoints concurrently
///
/// Results are sorted by API name.
pub async fn check_health(api: Arc<dyn MetastoreApi>, number: u32) -> Vec<ApiState> {
    let (tx, mut rx) = mpsc::channel::<ApiState>(2);

    let mounts = {
        let api = Arc::clone(&api);
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = time_repeated(|| api.list_mounts(), number).await;
            let state = ApiState {
                api_name: MOUNT_LIST_API,
                outcome: outcome_of(result),
                number,
            };
            let _ = tx.send(state).await;
        })
    };

    let clusters = {
        let api = Arc::clone(&api);
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = time_repeated(|| api.list_clusters(), number).await;
            let state = ApiState {
                api_name: CLUSTER_LIST_API,
                outcome: outcome_of(result),
                number,
            };
            let _ = tx.send(state).await;
        })
    };

    // Only the task senders remain, so recv ends once both probes report
    drop(tx);

    let mut states = Vec::with_capacity(2);
    while let Some(state) = rx.recv().await {
        tracing::debug!(api = state.api_name, state = state.state_label(), "Probe finished");
        states.push(state);
    }

    // A probe whose task panicked has not reported a row
    for (api_name, handle) in [(MOUNT_LIST_API, mounts), (CLUSTER_LIST_API, clusters)] {
        let joined = handle.await;
        if states.iter().any(|s| s.api_name == api_name) {
            continue;
        }
        let error = match joined {
            Err(e) => format!("probe task failed: {e}"),
            Ok(()) => "probe task did not report".to_string(),
        };
        tracing::warn!(api = api_name, %error, "Probe finished without a result");
        states.push(ApiState {
            api_name,
            outcome: ProbeOutcome::Failed { error },
            number,
        });
    }
    states.sort_by(|a, b| a.api_name.cmp(b.api_name));
    states
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metastore::MetastoreError;
    use crate::mount::{ClusterInfo, MountEntry, MountTable};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingApi {
        mount_calls: AtomicUsize,
        cluster_calls: AtomicUsize,
        fail_clusters: bool,
    }

    #[async_trait]
    impl MetastoreApi for CountingApi {
        async fn list_mounts(&self) -> Result<MountTable, MetastoreError> {
            self.mount_calls.fetch_add(1, Ordering::SeqCst);
            Ok(MountTable::new(vec![MountEntry::new("c1/a", "hdfs://c1/a", "c1")]))
        }

        async fn list_clusters(&self) -> Result<Vec<ClusterInfo>, MetastoreError> {
            self.cluster_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_clusters {
                return Err(MetastoreError::Status {
                    url: "http://router/cluster/meta/list".to_string(),
                    status: 503,
                });
            }
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_time_repeated_counts_calls() {
        let mut calls = 0;
        let avg = time_repeated(
            || {
                calls += 1;
                async { Ok::<_, String>(()) }
            },
            4,
        )
        .await
        .unwrap();

        assert_eq!(calls, 4);
        assert!(avg < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_time_repeated_stops_at_first_error() {
        let mut calls = 0;
        let result = time_repeated(
            || {
                calls += 1;
                let n = calls;
                async move { if n == 2 { Err("boom") } else { Ok(()) } }
            },
            5,
        )
        .await;

        assert_eq!(result, Err("boom"));
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn test_check_health_reports_both_apis() {
        let api = Arc::new(CountingApi {
            mount_calls: AtomicUsize::new(0),
            cluster_calls: AtomicUsize::new(0),
            fail_clusters: false,
        });

        let states = check_health(api.clone(), 3).await;

        assert_eq!(states.len(), 2);
        assert_eq!(states[0].api_name, CLUSTER_LIST_API);
        assert_eq!(states[1].api_name, MOUNT_LIST_API);
        assert!(states.iter().all(|s| s.is_ok()));
        assert!(states.iter().all(|s| s.avg_time_cell().ends_with("(ms)/3")));
        assert_eq!(api.mount_calls.load(Ordering::SeqCst), 3);
        assert_eq!(api.cluster_calls.load(Ordering::SeqCst), 3);
    }

    struct PanickingApi;

    #[async_trait]
    impl MetastoreApi for PanickingApi {
        async fn list_mounts(&self) -> Result<MountTable, MetastoreError> {
            Ok(MountTable::default())
        }

        async fn list_clusters(&self) -> Result<Vec<ClusterInfo>, MetastoreError> {
            panic!("cluster decoder blew up");
        }
    }

    #[tokio::test]
    async fn test_check_health_keeps_row_for_panicked_task() {
        let states = check_health(Arc::new(PanickingApi), 2).await;

        assert_eq!(states.len(), 2);
        assert_eq!(states[0].api_name, CLUSTER_LIST_API);
        assert_eq!(states[0].state_label(), "FAIL");
        assert_eq!(states[0].avg_time_cell(), "-1(ms)/2");
        assert!(matches!(
            &states[0].outcome,
            ProbeOutcome::Failed { error } if error.starts_with("probe task failed")
        ));
        assert!(states[1].is_ok());
    }

    #[tokio::test]
    async fn test_check_health_marks_failure() {
        let api = Arc::new(CountingApi {
            mount_calls: AtomicUsize::new(0),
            cluster_calls: AtomicUsize::new(0),
            fail_clusters: true,
        });

        let states = check_health(api.clone(), 5).await;

        let cluster = states.iter().find(|s| s.api_name == CLUSTER_LIST_API).unwrap();
        assert_eq!(cluster.state_label(), "FAIL");
        assert_eq!(cluster.avg_time_cell(), "-1(ms)/5");
        assert_eq!(api.cluster_calls.load(Ordering::SeqCst), 1);

        let mounts = states.iter().find(|s| s.api_name == MOUNT_LIST_API).unwrap();
        assert_eq!(mounts.state_label(), "OK");
        assert_eq!(api.mount_calls.load(Ordering::SeqCst), 5);
    }
}
