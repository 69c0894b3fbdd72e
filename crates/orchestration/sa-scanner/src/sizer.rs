//! Aggregate bucket-size estimation via the external `aws` CLI.
//!
//! The listing command is given a hard upper wait bound; exceeding it yields
//! the unknown-size sentinel instead of blocking the caller. This is the one
//! explicit timeout in the system - there is no retry on top of it.

use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Sentinel reported when the size cannot be determined within the bound.
pub const UNKNOWN_SIZE: &str = "Unknown Size";

/// Upper wait bound for the external listing command.
pub const SIZE_ESTIMATE_BOUND: Duration = Duration::from_secs(8);

/// Source of human-readable aggregate bucket-size strings.
#[async_trait]
pub trait SizeEstimator: Send + Sync {
    /// Estimate the total size of a bucket. Never fails: degraded results
    /// return [`UNKNOWN_SIZE`].
    async fn estimate(&self, bucket: &str) -> String;
}

/// Estimator shelling out to `aws s3 ls --summarize`.
pub struct AwsCliSizeEstimator {
    bound: Duration,
}

impl AwsCliSizeEstimator {
    pub fn new() -> Self {
        Self {
            bound: SIZE_ESTIMATE_BOUND,
        }
    }
}

impl Default for AwsCliSizeEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SizeEstimator for AwsCliSizeEstimator {
    async fn estimate(&self, bucket: &str) -> String {
        bounded_estimate(self.bound, run_aws_ls(bucket)).await
    }
}

/// Await `fut` for at most `bound`; timeout or absence of output degrades to
/// the sentinel.
pub(crate) async fn bounded_estimate<F>(bound: Duration, fut: F) -> String
where
    F: Future<Output = Option<String>>,
{
    match timeout(bound, fut).await {
        Ok(Some(size)) => size,
        Ok(None) => UNKNOWN_SIZE.to_string(),
        Err(_) => {
            debug!(bound_secs = bound.as_secs(), "Size estimate timed out");
            UNKNOWN_SIZE.to_string()
        }
    }
}

async fn run_aws_ls(bucket: &str) -> Option<String> {
    let output = Command::new("aws")
        .args([
            "s3",
            "ls",
            "--summarize",
            "--human-readable",
            "--recursive",
            "--no-sign-request",
            &format!("s3://{bucket}"),
        ])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }
    parse_summary(&String::from_utf8_lossy(&output.stdout))
}

/// Extract the size from the summarized listing's last line, e.g.
/// `   Total Size: 4.4 MiB` -> `4.4 MiB`.
pub(crate) fn parse_summary(stdout: &str) -> Option<String> {
    let last = stdout.lines().rev().find(|l| !l.trim().is_empty())?;
    let (_, size) = last.split_once(':')?;
    let size = size.trim();
    if size.is_empty() {
        None
    } else {
        Some(size.to_string())
    }
}
