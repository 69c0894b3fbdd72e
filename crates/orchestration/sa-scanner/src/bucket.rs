//! Bucket model: name validation, existence state, and the permission matrix.

use sa_error::{Result, ScanError};

/// Default region probed before a redirect reveals the true one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Existence of a bucket, resolved exactly once per pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketExists {
    /// Not yet resolved.
    Unknown,
    /// Bucket exists (reachable or forbidden-but-present).
    Yes,
    /// Definitively not a bucket (404 or unresolvable host).
    No,
}

/// Caller context under which a probe or download executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    /// Unsigned requests (the AllUsers grantee group).
    Anonymous,
    /// Requests signed with the operator's configured credentials
    /// (the AuthenticatedUsers grantee group).
    Authenticated,
}

impl Identity {
    /// Grantee-group label used in result lines.
    pub fn label(&self) -> &'static str {
        match self {
            Identity::Anonymous => "AllUsers",
            Identity::Authenticated => "AuthUsers",
        }
    }

    fn index(&self) -> usize {
        match self {
            Identity::Anonymous => 0,
            Identity::Authenticated => 1,
        }
    }
}

/// One access right being tested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ReadAcl,
    Read,
    Write,
    WriteAcl,
    /// Superset implying read and write; derived from ACL grants and used to
    /// short-circuit redundant probes.
    FullControl,
}

impl Capability {
    /// Label used in permission summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Capability::ReadAcl => "ReadACP",
            Capability::Read => "Read",
            Capability::Write => "Write",
            Capability::WriteAcl => "WriteACP",
            Capability::FullControl => "FullControl",
        }
    }

    fn index(&self) -> usize {
        match self {
            Capability::ReadAcl => 0,
            Capability::Read => 1,
            Capability::Write => 2,
            Capability::WriteAcl => 3,
            Capability::FullControl => 4,
        }
    }

    const ALL: [Capability; 5] = [
        Capability::ReadAcl,
        Capability::Read,
        Capability::Write,
        Capability::WriteAcl,
        Capability::FullControl,
    ];
}

/// Result of a single capability cell. `Unknown` covers "not yet probed",
/// "skipped", and "probe errored" - it is never conflated with `Denied`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Permission {
    #[default]
    Unknown,
    Allowed,
    Denied,
}

/// Permission matrix keyed by (identity, capability).
///
/// Each cell transitions `Unknown -> {Allowed, Denied}` at most once per scan
/// pass; later writes are ignored. A region correction invalidates prior
/// probes, so the resolver calls [`PermissionMatrix::reset`] before
/// re-resolving.
#[derive(Debug, Clone, Default)]
pub struct PermissionMatrix {
    cells: [[Permission; 5]; 2],
}

impl PermissionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, identity: Identity, capability: Capability) -> Permission {
        self.cells[identity.index()][capability.index()]
    }

    /// Write a cell. Only the first write per pass takes effect.
    pub fn set(&mut self, identity: Identity, capability: Capability, permission: Permission) {
        let cell = &mut self.cells[identity.index()][capability.index()];
        if *cell == Permission::Unknown {
            *cell = permission;
        }
    }

    /// Clear every cell back to `Unknown` after a region correction.
    pub fn reset(&mut self) {
        self.cells = Default::default();
    }

    /// Capabilities currently `Allowed` for an identity, in a fixed order.
    pub fn allowed(&self, identity: Identity) -> Vec<Capability> {
        Capability::ALL
            .iter()
            .copied()
            .filter(|c| self.get(identity, *c) == Permission::Allowed)
            .collect()
    }
}

/// A single object discovered during enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketObject {
    pub key: String,
    pub size: u64,
}

/// A named remote object-storage container being audited.
///
/// A `Bucket` value is created per input name at the start of a scan/dump
/// pass, owned by exactly one worker for the duration of its pipeline, and
/// discarded after its result line is emitted.
#[derive(Debug, Clone)]
pub struct Bucket {
    pub name: String,
    pub exists: BucketExists,
    pub region: String,
    pub permissions: PermissionMatrix,
    /// True when the existence probe succeeded outright (anonymous listing
    /// is open at the HTTP layer), as opposed to forbidden-but-present.
    pub publicly_listable: bool,
    /// Objects discovered during enumeration; empty until the dump path runs.
    pub objects: Vec<BucketObject>,
}

impl Bucket {
    /// Create a bucket from a name, rejecting invalid names before any
    /// network call.
    pub fn new(name: &str) -> Result<Self> {
        if !validate_bucket_name(name) {
            return Err(ScanError::InvalidName(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            exists: BucketExists::Unknown,
            region: DEFAULT_REGION.to_string(),
            permissions: PermissionMatrix::new(),
            publicly_listable: false,
            objects: Vec::new(),
        })
    }

    /// Sum of the sizes of all enumerated objects, in bytes.
    pub fn total_object_bytes(&self) -> u64 {
        self.objects.iter().map(|o| o.size).sum()
    }

    /// Human-readable permission summary for result lines, e.g.
    /// `AllUsers: [Read, ReadACP] | AuthUsers: [not checked (no credentials)]`.
    ///
    /// Identities with no `Allowed` capability report `[none found]`; a
    /// disabled authenticated prober reports `[not checked (no credentials)]`
    /// so that skipped is never mistaken for denied.
    pub fn permission_summary(&self, authenticated_checked: bool) -> String {
        let mut parts = Vec::with_capacity(2);
        for identity in [Identity::Anonymous, Identity::Authenticated] {
            if identity == Identity::Authenticated && !authenticated_checked {
                parts.push(format!("{}: [not checked (no credentials)]", identity.label()));
                continue;
            }
            let allowed = self.permissions.allowed(identity);
            if allowed.is_empty() {
                parts.push(format!("{}: [none found]", identity.label()));
            } else {
                let caps: Vec<&str> = allowed.iter().map(|c| c.label()).collect();
                parts.push(format!("{}: [{}]", identity.label(), caps.join(", ")));
            }
        }
        parts.join(" | ")
    }
}

/// Validate a bucket name against the provider's naming rules:
/// 3-63 characters, lowercase letters, digits, dots and hyphens, starting and
/// ending with a letter or digit, no `..`, and not formatted like an IPv4
/// address.
pub fn validate_bucket_name(name: &str) -> bool {
    let len = name.len();
    if !(3..=63).contains(&len) {
        return false;
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
    {
        return false;
    }
    let first = name.as_bytes()[0];
    let last = name.as_bytes()[len - 1];
    if !first.is_ascii_alphanumeric() || !last.is_ascii_alphanumeric() {
        return false;
    }
    if name.contains("..") {
        return false;
    }
    // Names shaped like an IPv4 address are reserved.
    let octets: Vec<&str> = name.split('.').collect();
    if octets.len() == 4 && octets.iter().all(|o| o.parse::<u8>().is_ok()) {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(validate_bucket_name("public-test-bucket"));
        assert!(validate_bucket_name("abc"));
        assert!(validate_bucket_name("my.logs.2024"));
        assert!(validate_bucket_name(&"a".repeat(63)));
    }

    #[test]
    fn test_invalid_names() {
        assert!(!validate_bucket_name("ab")); // too short
        assert!(!validate_bucket_name(&"a".repeat(64))); // too long
        assert!(!validate_bucket_name("Invalid_Bucket")); // uppercase + underscore
        assert!(!validate_bucket_name("-leading-dash"));
        assert!(!validate_bucket_name("trailing-dot."));
        assert!(!validate_bucket_name("double..dot"));
        assert!(!validate_bucket_name("192.168.1.1")); // IPv4-shaped
        assert!(!validate_bucket_name("has space"));
    }

    #[test]
    fn test_bucket_new_rejects_invalid_name() {
        let err = Bucket::new("Invalid_Bucket").unwrap_err();
        assert!(matches!(err, ScanError::InvalidName(_)));
    }

    #[test]
    fn test_bucket_new_initial_state() {
        let bucket = Bucket::new("public-test-bucket").unwrap();
        assert_eq!(bucket.exists, BucketExists::Unknown);
        assert_eq!(bucket.region, DEFAULT_REGION);
        assert!(bucket.objects.is_empty());
        assert_eq!(
            bucket.permissions.get(Identity::Anonymous, Capability::Read),
            Permission::Unknown
        );
    }

    #[test]
    fn test_matrix_write_once() {
        let mut matrix = PermissionMatrix::new();
        matrix.set(Identity::Anonymous, Capability::Read, Permission::Allowed);
        // Second write is ignored.
        matrix.set(Identity::Anonymous, Capability::Read, Permission::Denied);
        assert_eq!(
            matrix.get(Identity::Anonymous, Capability::Read),
            Permission::Allowed
        );
    }

    #[test]
    fn test_matrix_reset() {
        let mut matrix = PermissionMatrix::new();
        matrix.set(Identity::Authenticated, Capability::Write, Permission::Denied);
        matrix.reset();
        assert_eq!(
            matrix.get(Identity::Authenticated, Capability::Write),
            Permission::Unknown
        );
        // After reset the cell is writable again.
        matrix.set(Identity::Authenticated, Capability::Write, Permission::Allowed);
        assert_eq!(
            matrix.get(Identity::Authenticated, Capability::Write),
            Permission::Allowed
        );
    }

    #[test]
    fn test_permission_summary_anonymous_read() {
        let mut bucket = Bucket::new("public-test-bucket").unwrap();
        bucket
            .permissions
            .set(Identity::Anonymous, Capability::ReadAcl, Permission::Allowed);
        bucket
            .permissions
            .set(Identity::Anonymous, Capability::Read, Permission::Allowed);

        let summary = bucket.permission_summary(false);
        assert!(summary.contains("AllUsers: [ReadACP, Read]"));
        assert!(summary.contains("AuthUsers: [not checked (no credentials)]"));
    }

    #[test]
    fn test_permission_summary_denied_is_not_listed() {
        let mut bucket = Bucket::new("locked-bucket").unwrap();
        bucket
            .permissions
            .set(Identity::Anonymous, Capability::Read, Permission::Denied);
        let summary = bucket.permission_summary(true);
        assert!(summary.contains("AllUsers: [none found]"));
        assert!(summary.contains("AuthUsers: [none found]"));
    }

    #[test]
    fn test_total_object_bytes() {
        let mut bucket = Bucket::new("data-bucket").unwrap();
        bucket.objects.push(BucketObject {
            key: "a".to_string(),
            size: 100,
        });
        bucket.objects.push(BucketObject {
            key: "b".to_string(),
            size: 28,
        });
        assert_eq!(bucket.total_object_bytes(), 128);
    }
}
