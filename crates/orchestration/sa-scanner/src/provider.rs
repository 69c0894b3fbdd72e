//! Provider traits: the seam between probing/orchestration logic and the
//! storage backend.
//!
//! Two capabilities are abstracted:
//! - [`ProbeTransport`] - the lightweight existence/region HEAD probe
//! - [`StorageProvider`] - identity-bound ACL, listing, write and download
//!   operations
//!
//! Production implementations live in [`crate::s3`]; tests substitute mocks
//! carrying call counters.

use async_trait::async_trait;
use bytes::Bytes;
use sa_error::Result;

use crate::bucket::{BucketObject, Capability, Identity};

/// Interpreted outcome of a single existence probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadOutcome {
    /// Bucket exists and anonymous listing is open at the HTTP layer.
    Ok,
    /// Wrong region; the payload names the correct one.
    Redirect(String),
    /// Bucket exists but listing is denied at this layer.
    Forbidden,
    /// Definitely not a bucket.
    NotFound,
    /// Hostname did not resolve or the connection failed; an unresolvable
    /// host cannot be a real bucket.
    Unresolvable,
    /// Any other status; fatal for this bucket's pipeline.
    Other(u16),
}

/// Lightweight metadata probe against a bucket's virtual-hosted endpoint.
#[async_trait]
pub trait ProbeTransport: Send + Sync {
    /// Issue one header-only request against `bucket` in `region` and
    /// interpret the response.
    async fn head_bucket(&self, bucket: &str, region: &str) -> Result<HeadOutcome>;
}

/// A single ACL grant as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclGrant {
    pub grantee: GranteeGroup,
    pub capability: Capability,
}

/// Grantee groups relevant to the audit. Grants to specific principals are
/// mapped to `Other` and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GranteeGroup {
    AllUsers,
    AuthenticatedUsers,
    Other,
}

impl GranteeGroup {
    /// The identity whose matrix row a grant to this group populates.
    pub fn identity(&self) -> Option<Identity> {
        match self {
            GranteeGroup::AllUsers => Some(Identity::Anonymous),
            GranteeGroup::AuthenticatedUsers => Some(Identity::Authenticated),
            GranteeGroup::Other => None,
        }
    }
}

/// Answer to an ACL read: the full grant list when readable, or denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AclAnswer {
    Allowed(Vec<AclGrant>),
    Denied,
}

/// Answer to a read or write capability probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeAnswer {
    Allowed,
    Denied,
}

/// One page of an object listing.
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    pub objects: Vec<BucketObject>,
    /// Continuation token; `None` means the listing is exhausted.
    pub next_token: Option<String>,
}

/// Identity-bound storage operations used by the prober, enumerator and
/// dump orchestrator.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Read the bucket ACL. Access denial is an answer, not an error.
    async fn read_acl(&self, bucket: &str, region: &str) -> Result<AclAnswer>;

    /// Probe read capability with a minimal listing request.
    async fn try_read(&self, bucket: &str, region: &str) -> Result<ProbeAnswer>;

    /// Probe write capability by writing and removing a probe object.
    async fn try_write(&self, bucket: &str, region: &str) -> Result<ProbeAnswer>;

    /// Fetch one listing page, continuing from `token` when given.
    async fn list_page(
        &self,
        bucket: &str,
        region: &str,
        token: Option<&str>,
    ) -> Result<ObjectPage>;

    /// Download one object's contents.
    async fn download(&self, bucket: &str, region: &str, key: &str) -> Result<Bytes>;
}
