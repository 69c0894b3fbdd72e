//! Object enumeration with pagination.

use std::sync::Arc;

use async_stream::try_stream;
use futures::{pin_mut, Stream, StreamExt};
use sa_error::Result;
use tracing::debug;

use crate::bucket::{Bucket, BucketObject};
use crate::provider::StorageProvider;
use crate::retry::{with_retry, RetryConfig};

/// List every object in a bucket as a lazy stream, transparently continuing
/// across result pages until the listing is exhausted.
///
/// A failed page fetch is retried with backoff; objects already yielded from
/// earlier pages are unaffected. Directory markers (keys ending in `/`) are
/// skipped.
pub fn list_objects(
    provider: Arc<dyn StorageProvider>,
    bucket: impl Into<String>,
    region: impl Into<String>,
    retry: RetryConfig,
) -> impl Stream<Item = Result<BucketObject>> {
    let bucket = bucket.into();
    let region = region.into();

    try_stream! {
        let mut token: Option<String> = None;

        loop {
            let page = with_retry(&retry, "list_page", || {
                let provider = provider.clone();
                let bucket = bucket.clone();
                let region = region.clone();
                let token = token.clone();
                async move { provider.list_page(&bucket, &region, token.as_deref()).await }
            })
            .await?;

            debug!(bucket = %bucket, objects = page.objects.len(), "Listed page");

            for obj in page.objects {
                if obj.key.ends_with('/') || obj.key.is_empty() {
                    continue;
                }
                yield obj;
            }

            match page.next_token {
                Some(t) => token = Some(t),
                None => break,
            }
        }
    }
}

/// Enumerate all objects into `bucket.objects`.
pub async fn enumerate_objects(
    provider: Arc<dyn StorageProvider>,
    bucket: &mut Bucket,
    retry: RetryConfig,
) -> Result<()> {
    let stream = list_objects(provider, bucket.name.clone(), bucket.region.clone(), retry);
    pin_mut!(stream);

    while let Some(obj) = stream.next().await {
        bucket.objects.push(obj?);
    }
    Ok(())
}
