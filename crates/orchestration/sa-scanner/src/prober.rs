//! Identity-bound permission probing.
//!
//! Two long-lived [`Prober`] instances exist per process: one bound to
//! anonymous access, one bound to the operator's configured credentials.
//! Each is an immutable strategy object passed explicitly into orchestrator
//! calls; they hold no per-bucket state and are safely shared across workers.

use std::sync::Arc;

use sa_error::Result;
use tracing::{debug, warn};

use crate::bucket::{Bucket, Capability, Identity, Permission, PermissionMatrix};
use crate::provider::{AclAnswer, ProbeAnswer, StorageProvider};

/// Why a capability cell was left unprobed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Full control is already allowed for this identity.
    FullControl,
    /// The cell was already resolved by an earlier step (e.g. an ACL grant).
    AlreadyKnown,
    /// No authenticated credentials are configured.
    NoCredentials,
    /// The check has no implementation yet; distinct from denied.
    NotImplemented,
}

/// Pure decision table: which capabilities are still worth probing for an
/// identity, given the current matrix state.
///
/// Full control short-circuits the remaining probes for that identity;
/// cells already resolved (for instance by an ACL grant) are not re-probed.
/// Write-side capabilities are only probed in dangerous mode.
pub fn capabilities_to_probe(
    matrix: &PermissionMatrix,
    identity: Identity,
    dangerous: bool,
) -> Vec<Capability> {
    if matrix.get(identity, Capability::FullControl) == Permission::Allowed {
        return Vec::new();
    }

    let mut candidates = vec![Capability::Read];
    if dangerous {
        candidates.push(Capability::Write);
        candidates.push(Capability::WriteAcl);
    }
    candidates
        .into_iter()
        .filter(|c| matrix.get(identity, *c) == Permission::Unknown)
        .collect()
}

/// Probes one bucket's capabilities under one fixed identity, mutating its
/// permission matrix. Network errors leave the cell `Unknown` and surface
/// the cause to the caller; they are never coerced to `Denied`.
pub struct Prober {
    identity: Identity,
    provider: Option<Arc<dyn StorageProvider>>,
}

impl Prober {
    /// Prober bound to unsigned requests.
    pub fn anonymous(provider: Arc<dyn StorageProvider>) -> Self {
        Self {
            identity: Identity::Anonymous,
            provider: Some(provider),
        }
    }

    /// Prober bound to the operator's credentials. Pass `None` when no
    /// credentials are configured; every check then short-circuits, leaving
    /// cells `Unknown` with a distinct "no credentials" reason.
    pub fn authenticated(provider: Option<Arc<dyn StorageProvider>>) -> Self {
        Self {
            identity: Identity::Authenticated,
            provider,
        }
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    /// Whether this prober can issue requests at all.
    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// The provider this prober is bound to, for enumeration and download
    /// under the same identity.
    pub fn provider(&self) -> Option<Arc<dyn StorageProvider>> {
        self.provider.clone()
    }

    fn provider_or_skip(&self) -> Option<&Arc<dyn StorageProvider>> {
        match &self.provider {
            Some(p) => Some(p),
            None => {
                debug!(
                    identity = self.identity.label(),
                    reason = ?SkipReason::NoCredentials,
                    "Probe skipped"
                );
                None
            }
        }
    }

    /// Check ACL-read capability. A readable ACL yields the full grant list,
    /// which populates grant-derived cells for both grantee groups.
    pub async fn check_read_acl(&self, bucket: &mut Bucket) -> Result<()> {
        let Some(provider) = self.provider_or_skip() else {
            return Ok(());
        };

        match provider.read_acl(&bucket.name, &bucket.region).await? {
            AclAnswer::Allowed(grants) => {
                bucket
                    .permissions
                    .set(self.identity, Capability::ReadAcl, Permission::Allowed);
                for grant in grants {
                    if let Some(identity) = grant.grantee.identity() {
                        bucket
                            .permissions
                            .set(identity, grant.capability, Permission::Allowed);
                    }
                }
            }
            AclAnswer::Denied => {
                bucket
                    .permissions
                    .set(self.identity, Capability::ReadAcl, Permission::Denied);
            }
        }
        Ok(())
    }

    /// Check read capability with a minimal listing probe.
    pub async fn check_read(&self, bucket: &mut Bucket) -> Result<()> {
        let Some(provider) = self.provider_or_skip() else {
            return Ok(());
        };

        let permission = match provider.try_read(&bucket.name, &bucket.region).await? {
            ProbeAnswer::Allowed => Permission::Allowed,
            ProbeAnswer::Denied => Permission::Denied,
        };
        bucket
            .permissions
            .set(self.identity, Capability::Read, permission);
        Ok(())
    }

    /// Check write capability by writing and removing a probe object.
    /// Only invoked in dangerous mode.
    pub async fn check_write(&self, bucket: &mut Bucket) -> Result<()> {
        let Some(provider) = self.provider_or_skip() else {
            return Ok(());
        };

        let permission = match provider.try_write(&bucket.name, &bucket.region).await? {
            ProbeAnswer::Allowed => Permission::Allowed,
            ProbeAnswer::Denied => Permission::Denied,
        };
        bucket
            .permissions
            .set(self.identity, Capability::Write, permission);
        Ok(())
    }

    /// Contract point for the WriteACP check. There is no probe for it yet;
    /// the cell is left `Unknown` so reporting can distinguish "not checked"
    /// from "denied".
    pub fn check_write_acl(&self, bucket: &Bucket) {
        warn!(
            bucket = %bucket.name,
            identity = self.identity.label(),
            reason = ?SkipReason::NotImplemented,
            "WriteACP check not implemented"
        );
    }
}
