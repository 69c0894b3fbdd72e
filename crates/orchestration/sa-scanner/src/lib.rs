//! sa-scanner - S3 bucket auditing for s3audit.
//!
//! This crate answers, for a list of candidate bucket names:
//!
//! - Does the bucket exist, and in which region?
//! - What can an anonymous caller do with it, and what can the operator's
//!   configured credentials do? (read ACL, read, write, write ACL)
//! - Roughly how much data does a publicly listable bucket hold?
//!
//! and, for readable buckets, dumps their contents to a local directory.
//! Buckets are processed by a bounded worker pool; one bucket's failure
//! never aborts its siblings.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sa_scanner::{Prober, Resolver, ScanConfig, Scanner};
//! use sa_scanner::s3::{create_sdk_config, HttpProbeTransport, S3Config, SdkProvider};
//! use sa_scanner::sizer::AwsCliSizeEstimator;
//!
//! let s3_config = S3Config::new();
//! let anon_sdk = create_sdk_config(&s3_config, true).await;
//! let anon = Arc::new(SdkProvider::new(anon_sdk, false));
//!
//! let scanner = Scanner::new(
//!     Arc::new(Resolver::new(Arc::new(HttpProbeTransport::new(None)?))),
//!     Arc::new(Prober::anonymous(anon)),
//!     Arc::new(Prober::authenticated(None)),
//!     Arc::new(AwsCliSizeEstimator::new()),
//!     ScanConfig::new().with_threads(8),
//! );
//!
//! let (outcomes, stats) = scanner.scan(vec!["public-test-bucket".to_string()]).await;
//! eprintln!("Scanned {} buckets", stats.buckets_scanned);
//! ```

pub mod bucket;
pub mod dump;
pub mod enumerate;
pub mod prober;
pub mod provider;
pub mod resolver;
pub mod retry;
pub mod s3;
pub mod scan;
pub mod sizer;
pub mod stats;

pub use bucket::{
    validate_bucket_name, Bucket, BucketExists, BucketObject, Capability, Identity, Permission,
    PermissionMatrix, DEFAULT_REGION,
};
pub use dump::{DumpConfig, DumpOutcome, Dumper};
pub use enumerate::{enumerate_objects, list_objects};
pub use prober::{capabilities_to_probe, Prober, SkipReason};
pub use provider::{
    AclAnswer, AclGrant, GranteeGroup, HeadOutcome, ObjectPage, ProbeAnswer, ProbeTransport,
    StorageProvider,
};
pub use resolver::Resolver;
pub use retry::{with_retry, RetryConfig};
pub use scan::{ScanConfig, ScanOutcome, Scanner};
pub use sizer::{AwsCliSizeEstimator, SizeEstimator, UNKNOWN_SIZE};
pub use stats::{format_bytes, DumpStats, ScanStats};
