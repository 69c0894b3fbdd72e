//! SDK-backed [`StorageProvider`].
//!
//! One `SdkProvider` exists per identity (anonymous, authenticated); the
//! identity is baked into the loaded SDK configuration. Clients are built per
//! request region from the shared base configuration, so a bucket whose
//! region was corrected by the resolver is always addressed correctly.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Grant, Permission as S3Permission};
use aws_sdk_s3::Client;
use bytes::Bytes;
use rand::Rng;
use sa_error::{Result, ScanError};
use tracing::{debug, warn};

use crate::bucket::{BucketObject, Capability};
use crate::provider::{AclAnswer, AclGrant, GranteeGroup, ObjectPage, ProbeAnswer, StorageProvider};
use crate::s3::client::client_for_region;

const ALL_USERS_URI: &str = "http://acs.amazonaws.com/groups/global/AllUsers";
const AUTH_USERS_URI: &str = "http://acs.amazonaws.com/groups/global/AuthenticatedUsers";

/// [`StorageProvider`] implementation over the AWS SDK.
pub struct SdkProvider {
    sdk_config: SdkConfig,
    path_style: bool,
}

impl SdkProvider {
    /// Wrap a loaded SDK configuration. `path_style` should be set when a
    /// custom endpoint is configured.
    pub fn new(sdk_config: SdkConfig, path_style: bool) -> Self {
        Self {
            sdk_config,
            path_style,
        }
    }

    fn client(&self, region: &str) -> Client {
        client_for_region(&self.sdk_config, region, self.path_style)
    }
}

#[async_trait]
impl StorageProvider for SdkProvider {
    async fn read_acl(&self, bucket: &str, region: &str) -> Result<AclAnswer> {
        let result = self
            .client(region)
            .get_bucket_acl()
            .bucket(bucket)
            .send()
            .await;

        match result {
            Ok(output) => {
                let grants = output.grants().iter().filter_map(map_grant).collect();
                Ok(AclAnswer::Allowed(grants))
            }
            Err(e) if is_access_denied(&e) => Ok(AclAnswer::Denied),
            Err(e) => Err(provider_error("get_bucket_acl", bucket, e)),
        }
    }

    async fn try_read(&self, bucket: &str, region: &str) -> Result<ProbeAnswer> {
        let result = self
            .client(region)
            .list_objects_v2()
            .bucket(bucket)
            .max_keys(0)
            .send()
            .await;

        match result {
            Ok(_) => Ok(ProbeAnswer::Allowed),
            Err(e) if is_access_denied(&e) => Ok(ProbeAnswer::Denied),
            Err(e) => Err(provider_error("list_objects_v2", bucket, e)),
        }
    }

    async fn try_write(&self, bucket: &str, region: &str) -> Result<ProbeAnswer> {
        // Probe object with a random suffix so concurrent audits of the same
        // bucket never collide.
        let key = format!("s3audit-probe-{:08x}.txt", rand::rng().random::<u32>());
        let client = self.client(region);

        let result = client
            .put_object()
            .bucket(bucket)
            .key(&key)
            .body(ByteStream::from_static(b"s3audit write probe"))
            .send()
            .await;

        match result {
            Ok(_) => {
                debug!(bucket, key = %key, "Write probe succeeded, removing probe object");
                if let Err(e) = client.delete_object().bucket(bucket).key(&key).send().await {
                    warn!(bucket, key = %key, error = %DisplayErrorContext(&e),
                        "Failed to remove write-probe object");
                }
                Ok(ProbeAnswer::Allowed)
            }
            Err(e) if is_access_denied(&e) => Ok(ProbeAnswer::Denied),
            Err(e) => Err(provider_error("put_object", bucket, e)),
        }
    }

    async fn list_page(
        &self,
        bucket: &str,
        region: &str,
        token: Option<&str>,
    ) -> Result<ObjectPage> {
        let output = self
            .client(region)
            .list_objects_v2()
            .bucket(bucket)
            .set_continuation_token(token.map(String::from))
            .send()
            .await
            .map_err(|e| provider_error("list_objects_v2", bucket, e))?;

        let objects = output
            .contents()
            .iter()
            .filter_map(|o| {
                Some(BucketObject {
                    key: o.key()?.to_string(),
                    size: o.size().unwrap_or(0).max(0) as u64,
                })
            })
            .collect();

        Ok(ObjectPage {
            objects,
            next_token: output.next_continuation_token().map(String::from),
        })
    }

    async fn download(&self, bucket: &str, region: &str, key: &str) -> Result<Bytes> {
        let output = self
            .client(region)
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| provider_error("get_object", bucket, e))?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| ScanError::Provider(format!("reading body of {bucket}/{key}: {e}")))?;
        Ok(data.into_bytes())
    }
}

/// Whether a service error means "you may not", as opposed to a transport or
/// server failure. Denial is an answer for the permission matrix; everything
/// else propagates.
fn is_access_denied<E: ProvideErrorMetadata>(err: &E) -> bool {
    matches!(
        err.code(),
        Some("AccessDenied" | "AllAccessDisabled" | "UnauthorizedAccess" | "InvalidAccessKeyId")
    )
}

fn provider_error<E>(operation: &str, bucket: &str, err: E) -> ScanError
where
    E: std::error::Error + Send + Sync + 'static,
{
    ScanError::Provider(format!(
        "{operation} on {bucket}: {}",
        DisplayErrorContext(&err)
    ))
}

/// Map an SDK grant to the audit's model. Grants to specific canonical users
/// are irrelevant here and map to [`GranteeGroup::Other`]; grants without a
/// group URI or a known permission are dropped.
fn map_grant(grant: &Grant) -> Option<AclGrant> {
    let uri = grant.grantee()?.uri()?;
    let grantee = match uri {
        ALL_USERS_URI => GranteeGroup::AllUsers,
        AUTH_USERS_URI => GranteeGroup::AuthenticatedUsers,
        _ => GranteeGroup::Other,
    };
    let capability = match grant.permission()? {
        S3Permission::Read => Capability::Read,
        S3Permission::Write => Capability::Write,
        S3Permission::ReadAcp => Capability::ReadAcl,
        S3Permission::WriteAcp => Capability::WriteAcl,
        S3Permission::FullControl => Capability::FullControl,
        _ => return None,
    };
    Some(AclGrant { grantee, capability })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::types::{Grantee, Type};

    fn group_grant(uri: &str, permission: S3Permission) -> Grant {
        Grant::builder()
            .grantee(
                Grantee::builder()
                    .r#type(Type::Group)
                    .uri(uri)
                    .build()
                    .unwrap(),
            )
            .permission(permission)
            .build()
    }

    #[test]
    fn test_map_grant_group_uris() {
        let grant = group_grant(ALL_USERS_URI, S3Permission::Read);
        assert_eq!(
            map_grant(&grant),
            Some(AclGrant {
                grantee: GranteeGroup::AllUsers,
                capability: Capability::Read,
            })
        );

        let grant = group_grant(AUTH_USERS_URI, S3Permission::FullControl);
        assert_eq!(
            map_grant(&grant),
            Some(AclGrant {
                grantee: GranteeGroup::AuthenticatedUsers,
                capability: Capability::FullControl,
            })
        );
    }

    #[test]
    fn test_map_grant_unknown_group_is_other() {
        let grant = group_grant("http://acs.amazonaws.com/groups/s3/LogDelivery", S3Permission::Write);
        assert_eq!(map_grant(&grant).unwrap().grantee, GranteeGroup::Other);
    }

    #[test]
    fn test_map_grant_without_uri_is_dropped() {
        let grant = Grant::builder()
            .grantee(
                Grantee::builder()
                    .r#type(Type::CanonicalUser)
                    .id("abc123")
                    .build()
                    .unwrap(),
            )
            .permission(S3Permission::Read)
            .build();
        assert_eq!(map_grant(&grant), None);
    }
}
