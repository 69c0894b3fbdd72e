//! Dump orchestration: enumerate a readable bucket and download its objects
//! concurrently into a destination tree.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use futures::{pin_mut, stream, Stream, StreamExt};
use sa_error::{Result, ScanError};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::bucket::{Bucket, BucketExists, BucketObject, Capability, Identity, Permission};
use crate::enumerate::enumerate_objects;
use crate::prober::Prober;
use crate::provider::StorageProvider;
use crate::resolver::Resolver;
use crate::retry::RetryConfig;
use crate::stats::{format_bytes, DumpStats};

/// Configuration for a dump run.
#[derive(Debug, Clone)]
pub struct DumpConfig {
    /// Destination directory; must pre-exist.
    pub dest: PathBuf,
    /// Worker pool size for bucket fan-out.
    pub threads: usize,
    /// Concurrent object downloads within one bucket (the nested pool,
    /// sized independently of the bucket pool).
    pub downloads: usize,
    /// Log every downloaded object.
    pub verbose: bool,
    /// Retry policy for listing pages.
    pub retry: RetryConfig,
}

impl DumpConfig {
    pub fn new(dest: impl Into<PathBuf>) -> Self {
        Self {
            dest: dest.into(),
            threads: 4,
            downloads: 8,
            verbose: false,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_downloads(mut self, downloads: usize) -> Self {
        self.downloads = downloads;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Per-bucket dump result.
#[derive(Debug, Clone)]
pub enum DumpOutcome {
    InvalidName {
        name: String,
    },
    NotFound {
        name: String,
    },
    /// No identity has read access; nothing was attempted.
    NoReadPermission {
        name: String,
    },
    /// Enumeration and downloads ran to completion; `objects_failed > 0`
    /// means partial completion.
    Completed {
        name: String,
        identity: Identity,
        objects_total: usize,
        objects_failed: usize,
        bytes_downloaded: u64,
    },
    Failed {
        name: String,
        error: String,
    },
}

impl DumpOutcome {
    /// Fold this outcome into run statistics.
    pub fn record(&self, stats: &mut DumpStats) {
        match self {
            DumpOutcome::Completed {
                objects_total,
                objects_failed,
                bytes_downloaded,
                ..
            } => {
                stats.buckets_dumped += 1;
                stats.objects_downloaded += objects_total - objects_failed;
                stats.objects_failed += objects_failed;
                stats.bytes_downloaded += bytes_downloaded;
            }
            DumpOutcome::Failed { name, error } => {
                stats.buckets_skipped += 1;
                stats.record_error(format!("{name}: {error}"));
            }
            // An unreadable bucket is an error result, not a quiet skip: a
            // run that dumped nothing must not exit clean.
            DumpOutcome::NoReadPermission { name } => {
                stats.buckets_skipped += 1;
                stats.record_error(format!("{name}: no read permissions"));
            }
            _ => stats.buckets_skipped += 1,
        }
    }
}

// Line-oriented like the scan output; byte totals render human-readable.
impl fmt::Display for DumpOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DumpOutcome::InvalidName { name } => write!(f, "{name} | bucket_invalid_name"),
            DumpOutcome::NotFound { name } => write!(f, "{name} | bucket_not_exist"),
            DumpOutcome::NoReadPermission { name } => {
                write!(f, "{name} | error: no read permissions")
            }
            DumpOutcome::Completed {
                name,
                objects_total,
                objects_failed,
                bytes_downloaded,
                ..
            } => write!(
                f,
                "{name} | dumped {}/{objects_total} objects ({})",
                objects_total - objects_failed,
                format_bytes(*bytes_downloaded)
            ),
            DumpOutcome::Failed { name, error } => write!(f, "{name} | error: {error}"),
        }
    }
}

/// Coordinates per-bucket dumps: existence, identity selection, enumeration
/// and the nested download pool.
pub struct Dumper {
    resolver: Arc<Resolver>,
    anonymous: Arc<Prober>,
    authenticated: Arc<Prober>,
    config: DumpConfig,
}

impl Dumper {
    pub fn new(
        resolver: Arc<Resolver>,
        anonymous: Arc<Prober>,
        authenticated: Arc<Prober>,
        config: DumpConfig,
    ) -> Self {
        Self {
            resolver,
            anonymous,
            authenticated,
            config,
        }
    }

    /// Dump several buckets with bounded concurrency, yielding outcomes in
    /// completion order.
    pub fn dump_stream(&self, names: Vec<String>) -> impl Stream<Item = DumpOutcome> + '_ {
        stream::iter(names)
            .map(move |name| self.dump_one(name))
            .buffer_unordered(self.config.threads.max(1))
    }

    /// Run one bucket's dump pipeline to completion.
    pub async fn dump_one(&self, name: String) -> DumpOutcome {
        let mut bucket = match Bucket::new(&name) {
            Ok(bucket) => bucket,
            Err(_) => return DumpOutcome::InvalidName { name },
        };

        if let Err(e) = self.resolver.resolve(&mut bucket).await {
            return DumpOutcome::Failed {
                name,
                error: e.to_string(),
            };
        }
        if bucket.exists == BucketExists::No {
            return DumpOutcome::NotFound { name };
        }

        let Some((identity, provider)) = self.select_reader(&mut bucket).await else {
            return DumpOutcome::NoReadPermission { name };
        };
        info!(bucket = %bucket.name, identity = identity.label(), "Enumerating bucket objects");

        if let Err(e) = enumerate_objects(
            provider.clone(),
            &mut bucket,
            self.config.retry.clone(),
        )
        .await
        {
            return DumpOutcome::Failed {
                name,
                error: e.to_string(),
            };
        }
        info!(
            bucket = %bucket.name,
            objects = bucket.objects.len(),
            bytes = bucket.total_object_bytes(),
            "Enumeration complete"
        );

        let (objects_failed, bytes_downloaded) = self
            .download_all(&bucket, identity, provider)
            .await;

        DumpOutcome::Completed {
            name,
            identity,
            objects_total: bucket.objects.len(),
            objects_failed,
            bytes_downloaded,
        }
    }

    /// Pick the identity to dump under: authenticated when its read is
    /// allowed, else anonymous, else none. The anonymous prober is never
    /// invoked when the authenticated identity already has read access.
    async fn select_reader(
        &self,
        bucket: &mut Bucket,
    ) -> Option<(Identity, Arc<dyn StorageProvider>)> {
        if self.authenticated.is_enabled() {
            if let Err(e) = self.authenticated.check_read(bucket).await {
                warn!(bucket = %bucket.name, error = %e, "Authenticated read probe failed");
            }
            if bucket.permissions.get(Identity::Authenticated, Capability::Read)
                == Permission::Allowed
            {
                return Some((Identity::Authenticated, self.authenticated.provider()?));
            }
        }

        if let Err(e) = self.anonymous.check_read(bucket).await {
            warn!(bucket = %bucket.name, error = %e, "Anonymous read probe failed");
        }
        if bucket.permissions.get(Identity::Anonymous, Capability::Read) == Permission::Allowed {
            return Some((Identity::Anonymous, self.anonymous.provider()?));
        }

        None
    }

    /// Download every enumerated object through the nested worker pool.
    /// Individual failures are logged and counted; the rest proceed.
    async fn download_all(
        &self,
        bucket: &Bucket,
        identity: Identity,
        provider: Arc<dyn StorageProvider>,
    ) -> (usize, u64) {
        let dest_root = self.config.dest.join(&bucket.name);
        let verbose = self.config.verbose;

        let downloads = stream::iter(bucket.objects.clone())
            .map(|obj| {
                let provider = provider.clone();
                let name = bucket.name.clone();
                let region = bucket.region.clone();
                let dest_root = dest_root.clone();
                async move {
                    let result =
                        download_object(provider.as_ref(), &name, &region, &obj, &dest_root).await;
                    (obj, result)
                }
            })
            .buffer_unordered(self.config.downloads.max(1));
        pin_mut!(downloads);

        let mut failed = 0usize;
        let mut bytes = 0u64;
        while let Some((obj, result)) = downloads.next().await {
            match result {
                Ok(written) => {
                    bytes += written;
                    if verbose {
                        info!(bucket = %bucket.name, identity = identity.label(),
                            key = %obj.key, bytes = written, "Downloaded object");
                    }
                }
                Err(e) => {
                    warn!(bucket = %bucket.name, key = %obj.key, error = %e,
                        "Object download failed");
                    failed += 1;
                }
            }
        }
        (failed, bytes)
    }
}

/// Download one object to its place under `dest_root`, creating intermediate
/// directories as needed.
async fn download_object(
    provider: &dyn StorageProvider,
    bucket: &str,
    region: &str,
    obj: &BucketObject,
    dest_root: &Path,
) -> Result<u64> {
    let path = sanitize_key(dest_root, &obj.key)
        .ok_or_else(|| ScanError::UnsafeObjectKey(obj.key.clone()))?;

    let data = provider.download(bucket, region, &obj.key).await?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(&path, &data).await?;
    debug!(key = %obj.key, path = %path.display(), "Wrote object");
    Ok(data.len() as u64)
}

/// Reconstruct an object key as a relative path under `root`, neutralizing
/// path traversal: absolute keys, drive prefixes and `..` components are
/// rejected outright rather than normalized.
pub fn sanitize_key(root: &Path, key: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(key).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if relative.as_os_str().is_empty() {
        return None;
    }
    Some(root.join(relative))
}
