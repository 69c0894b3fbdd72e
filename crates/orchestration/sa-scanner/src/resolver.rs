//! Bucket existence and region resolution.

use std::sync::Arc;

use sa_error::{Result, ScanError};
use tracing::debug;

use crate::bucket::{Bucket, BucketExists};
use crate::provider::{HeadOutcome, ProbeTransport};

/// Redirect budget before a region-correction loop is treated as an
/// unhandled response.
const MAX_REDIRECTS: u32 = 3;

/// Resolves bucket existence and region via a single lightweight probe,
/// re-probing against the corrected region when a redirect names one.
pub struct Resolver {
    transport: Arc<dyn ProbeTransport>,
}

impl Resolver {
    pub fn new(transport: Arc<dyn ProbeTransport>) -> Self {
        Self { transport }
    }

    /// Resolve `bucket.exists` and `bucket.region`.
    ///
    /// A redirect replaces the bucket's region, resets the permission matrix
    /// (prior probes are invalid against the old region) and re-probes. Any
    /// status outside the handled set fails this bucket's pipeline with
    /// [`ScanError::UnhandledResponse`]; the caller isolates that from
    /// sibling buckets.
    pub async fn resolve(&self, bucket: &mut Bucket) -> Result<()> {
        for _ in 0..=MAX_REDIRECTS {
            let outcome = self
                .transport
                .head_bucket(&bucket.name, &bucket.region)
                .await?;
            debug!(bucket = %bucket.name, region = %bucket.region, ?outcome, "Existence probe");

            match outcome {
                HeadOutcome::Ok => {
                    bucket.exists = BucketExists::Yes;
                    bucket.publicly_listable = true;
                    return Ok(());
                }
                HeadOutcome::Forbidden => {
                    // Bucket is real; listing is merely denied at this layer.
                    bucket.exists = BucketExists::Yes;
                    return Ok(());
                }
                HeadOutcome::NotFound | HeadOutcome::Unresolvable => {
                    bucket.exists = BucketExists::No;
                    return Ok(());
                }
                HeadOutcome::Redirect(region) => {
                    debug!(bucket = %bucket.name, from = %bucket.region, to = %region, "Region corrected");
                    bucket.region = region;
                    bucket.permissions.reset();
                    continue;
                }
                HeadOutcome::Other(status) => {
                    return Err(ScanError::UnhandledResponse {
                        status,
                        bucket: bucket.name.clone(),
                        region: bucket.region.clone(),
                    });
                }
            }
        }

        // Redirect loop exceeded the budget.
        Err(ScanError::UnhandledResponse {
            status: 301,
            bucket: bucket.name.clone(),
            region: bucket.region.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::{Capability, Identity, Permission};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Transport returning a scripted sequence of outcomes, recording the
    /// regions it was probed with.
    struct ScriptedTransport {
        outcomes: Mutex<Vec<HeadOutcome>>,
        calls: AtomicU32,
        regions_seen: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(outcomes: Vec<HeadOutcome>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes),
                calls: AtomicU32::new(0),
                regions_seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ProbeTransport for ScriptedTransport {
        async fn head_bucket(&self, _bucket: &str, region: &str) -> Result<HeadOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.regions_seen.lock().unwrap().push(region.to_string());
            Ok(self.outcomes.lock().unwrap().remove(0))
        }
    }

    async fn resolve_with(outcomes: Vec<HeadOutcome>) -> (Bucket, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new(outcomes));
        let resolver = Resolver::new(transport.clone());
        let mut bucket = Bucket::new("some-bucket").unwrap();
        resolver.resolve(&mut bucket).await.unwrap();
        (bucket, transport)
    }

    #[tokio::test]
    async fn test_success_marks_exists_and_listable() {
        let (bucket, transport) = resolve_with(vec![HeadOutcome::Ok]).await;
        assert_eq!(bucket.exists, BucketExists::Yes);
        assert!(bucket.publicly_listable);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_forbidden_still_exists() {
        let (bucket, _) = resolve_with(vec![HeadOutcome::Forbidden]).await;
        assert_eq!(bucket.exists, BucketExists::Yes);
        assert!(!bucket.publicly_listable);
    }

    #[tokio::test]
    async fn test_not_found_and_unresolvable_terminate() {
        let (bucket, _) = resolve_with(vec![HeadOutcome::NotFound]).await;
        assert_eq!(bucket.exists, BucketExists::No);

        let (bucket, _) = resolve_with(vec![HeadOutcome::Unresolvable]).await;
        assert_eq!(bucket.exists, BucketExists::No);
    }

    #[tokio::test]
    async fn test_redirect_reprobes_corrected_region_and_resets_matrix() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            HeadOutcome::Redirect("eu-west-1".to_string()),
            HeadOutcome::Ok,
        ]));
        let resolver = Resolver::new(transport.clone());
        let mut bucket = Bucket::new("some-bucket").unwrap();
        // A stale cell must be invalidated by the region correction.
        bucket
            .permissions
            .set(Identity::Anonymous, Capability::Read, Permission::Denied);

        resolver.resolve(&mut bucket).await.unwrap();

        assert_eq!(bucket.region, "eu-west-1");
        assert_eq!(bucket.exists, BucketExists::Yes);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
        let regions = transport.regions_seen.lock().unwrap();
        assert_eq!(regions.as_slice(), ["us-east-1", "eu-west-1"]);
        assert_eq!(
            bucket.permissions.get(Identity::Anonymous, Capability::Read),
            Permission::Unknown
        );
    }

    #[tokio::test]
    async fn test_unhandled_status_is_an_error() {
        let transport = Arc::new(ScriptedTransport::new(vec![HeadOutcome::Other(418)]));
        let resolver = Resolver::new(transport);
        let mut bucket = Bucket::new("teapot-bucket").unwrap();

        let err = resolver.resolve(&mut bucket).await.unwrap_err();
        match err {
            ScanError::UnhandledResponse { status, bucket, .. } => {
                assert_eq!(status, 418);
                assert_eq!(bucket, "teapot-bucket");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_redirect_loop_exhausts_budget() {
        let redirects = (0..5)
            .map(|i| HeadOutcome::Redirect(format!("region-{i}")))
            .collect();
        let transport = Arc::new(ScriptedTransport::new(redirects));
        let resolver = Resolver::new(transport);
        let mut bucket = Bucket::new("bouncing-bucket").unwrap();

        let err = resolver.resolve(&mut bucket).await.unwrap_err();
        assert!(matches!(err, ScanError::UnhandledResponse { .. }));
    }
}
