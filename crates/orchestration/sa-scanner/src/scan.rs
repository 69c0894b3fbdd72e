//! Scan orchestration: fans bucket names across a bounded worker pool and
//! runs the resolve/probe pipeline per bucket.

use std::fmt;
use std::sync::Arc;

use futures::{stream, Stream, StreamExt};
use tracing::warn;

use crate::bucket::{Bucket, BucketExists, Capability};
use crate::prober::{capabilities_to_probe, Prober};
use crate::resolver::Resolver;
use crate::sizer::SizeEstimator;
use crate::stats::ScanStats;

/// Configuration for a scan run.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Worker pool size for bucket fan-out.
    pub threads: usize,
    /// Enable write-side checks (potentially destructive).
    pub dangerous: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            dangerous: false,
        }
    }
}

impl ScanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_dangerous(mut self, dangerous: bool) -> Self {
        self.dangerous = dangerous;
        self
    }
}

/// Explicit per-bucket result, collected by the orchestrator. A failure is a
/// variant, never an escaping error: one bucket's outcome cannot affect its
/// siblings.
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    /// The name failed validation; no network call was issued.
    InvalidName { name: String },
    /// The bucket does not exist (or its host is unresolvable).
    NotFound { name: String },
    /// The bucket exists; permissions summarized per identity.
    Exists {
        name: String,
        region: String,
        summary: String,
        /// Aggregate size estimate, when the bucket was openly listable.
        size: Option<String>,
    },
    /// The pipeline failed for this bucket alone.
    Failed { name: String, error: String },
}

impl ScanOutcome {
    /// Fold this outcome into run statistics.
    pub fn record(&self, stats: &mut ScanStats) {
        match self {
            ScanOutcome::InvalidName { .. } => stats.record_invalid_name(),
            ScanOutcome::NotFound { .. } => stats.record_not_found(),
            ScanOutcome::Exists { .. } => stats.record_existing(),
            ScanOutcome::Failed { name, error } => {
                stats.record_error(format!("{name}: {error}"));
            }
        }
    }
}

impl fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanOutcome::InvalidName { name } => write!(f, "{name} | bucket_invalid_name"),
            ScanOutcome::NotFound { name } => write!(f, "{name} | bucket_not_exist"),
            ScanOutcome::Exists {
                name,
                summary,
                size,
                ..
            } => {
                write!(f, "{name} | bucket_exists | {summary}")?;
                if let Some(size) = size {
                    write!(f, " | {size}")?;
                }
                Ok(())
            }
            ScanOutcome::Failed { name, error } => write!(f, "{name} | error: {error}"),
        }
    }
}

/// Coordinates resolver, probers and sizer across a bounded worker pool.
///
/// The two identity-bound probers are shared read-only; each worker owns its
/// `Bucket` value for the duration of the pipeline, so no locking on bucket
/// state is needed.
pub struct Scanner {
    resolver: Arc<Resolver>,
    anonymous: Arc<Prober>,
    authenticated: Arc<Prober>,
    sizer: Arc<dyn SizeEstimator>,
    config: ScanConfig,
}

impl Scanner {
    pub fn new(
        resolver: Arc<Resolver>,
        anonymous: Arc<Prober>,
        authenticated: Arc<Prober>,
        sizer: Arc<dyn SizeEstimator>,
        config: ScanConfig,
    ) -> Self {
        Self {
            resolver,
            anonymous,
            authenticated,
            sizer,
            config,
        }
    }

    /// Scan bucket names with bounded concurrency, yielding outcomes in
    /// completion order. The batch always drains: a failed bucket yields a
    /// `Failed` outcome and its siblings proceed.
    pub fn scan_stream(&self, names: Vec<String>) -> impl Stream<Item = ScanOutcome> + '_ {
        stream::iter(names)
            .map(move |name| self.scan_one(name))
            .buffer_unordered(self.config.threads.max(1))
    }

    /// Convenience wrapper collecting all outcomes and run statistics.
    pub async fn scan(&self, names: Vec<String>) -> (Vec<ScanOutcome>, ScanStats) {
        let mut stats = ScanStats::new();
        let outcomes: Vec<ScanOutcome> = self.scan_stream(names).collect().await;
        for outcome in &outcomes {
            outcome.record(&mut stats);
        }
        stats.complete();
        (outcomes, stats)
    }

    /// Run one bucket's pipeline to completion:
    /// name validation -> existence -> ACL probes -> read/write probes.
    async fn scan_one(&self, name: String) -> ScanOutcome {
        let mut bucket = match Bucket::new(&name) {
            Ok(bucket) => bucket,
            Err(_) => return ScanOutcome::InvalidName { name },
        };

        if let Err(e) = self.resolver.resolve(&mut bucket).await {
            return ScanOutcome::Failed {
                name,
                error: e.to_string(),
            };
        }
        if bucket.exists == BucketExists::No {
            return ScanOutcome::NotFound { name };
        }

        for prober in [&self.anonymous, &self.authenticated] {
            if !prober.is_enabled() {
                continue;
            }
            if let Err(e) = prober.check_read_acl(&mut bucket).await {
                warn!(bucket = %bucket.name, identity = prober.identity().label(), error = %e,
                    "ACL probe failed; capability left unknown");
            }
        }

        for prober in [&self.anonymous, &self.authenticated] {
            if !prober.is_enabled() {
                continue;
            }
            for capability in capabilities_to_probe(
                &bucket.permissions,
                prober.identity(),
                self.config.dangerous,
            ) {
                let result = match capability {
                    Capability::Read => prober.check_read(&mut bucket).await,
                    Capability::Write => prober.check_write(&mut bucket).await,
                    Capability::WriteAcl => {
                        prober.check_write_acl(&bucket);
                        Ok(())
                    }
                    _ => Ok(()),
                };
                if let Err(e) = result {
                    warn!(bucket = %bucket.name, identity = prober.identity().label(),
                        capability = capability.label(), error = %e,
                        "Probe failed; capability left unknown");
                }
            }
        }

        let size = if bucket.publicly_listable {
            Some(self.sizer.estimate(&bucket.name).await)
        } else {
            None
        };

        let summary = bucket.permission_summary(self.authenticated.is_enabled());
        ScanOutcome::Exists {
            name,
            region: bucket.region,
            summary,
            size,
        }
    }
}
