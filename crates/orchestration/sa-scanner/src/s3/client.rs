//! S3 client configuration and creation.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::config::ProvideCredentials;
use aws_sdk_s3::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for S3 access.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct S3Config {
    /// AWS region override; buckets carry their resolved region per request
    pub region: Option<String>,

    /// Custom endpoint URL (for LocalStack or S3-compatible stores)
    pub endpoint: Option<String>,

    /// Explicit AWS access key (optional)
    pub access_key: Option<String>,

    /// Explicit AWS secret key (optional)
    pub secret_key: Option<String>,

    /// AWS profile name (optional)
    pub profile: Option<String>,
}

impl S3Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom endpoint (for LocalStack).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the AWS region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set explicit credentials.
    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    /// Set the AWS profile.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }
}

/// Load an SDK configuration from `config`.
///
/// With `anonymous` set, the credential chain is disabled entirely and every
/// request goes out unsigned; otherwise the usual chain applies (explicit
/// keys, profile, environment, instance metadata).
pub async fn create_sdk_config(config: &S3Config, anonymous: bool) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());

    if let Some(region) = &config.region {
        loader = loader.region(Region::new(region.clone()));
    }

    if let Some(endpoint) = &config.endpoint {
        loader = loader.endpoint_url(endpoint);
    }

    if anonymous {
        loader = loader.no_credentials();
    } else {
        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            let credentials =
                aws_sdk_s3::config::Credentials::new(access_key, secret_key, None, None, "s3audit");
            loader = loader.credentials_provider(credentials);
        }
        if let Some(profile) = &config.profile {
            loader = loader.profile_name(profile);
        }
    }

    loader.load().await
}

/// Whether the loaded configuration can actually produce credentials.
/// Used to decide if the authenticated prober is enabled at all.
pub async fn has_credentials(sdk_config: &SdkConfig) -> bool {
    let Some(provider) = sdk_config.credentials_provider() else {
        return false;
    };
    match provider.provide_credentials().await {
        Ok(_) => true,
        Err(e) => {
            debug!(error = %e, "No usable AWS credentials");
            false
        }
    }
}

/// Build a client against `region`, reusing the loaded base configuration.
/// Path-style addressing is enabled when a custom endpoint is in play.
pub fn client_for_region(sdk_config: &SdkConfig, region: &str, path_style: bool) -> Client {
    let builder = aws_sdk_s3::config::Builder::from(sdk_config)
        .region(Region::new(region.to_string()));
    let conf = if path_style {
        builder.force_path_style(true).build()
    } else {
        builder.build()
    };
    Client::from_conf(conf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_s3_config_builder() {
        let config = S3Config::new()
            .with_endpoint("http://localhost:4566")
            .with_region("eu-west-1")
            .with_profile("audit");

        assert_eq!(config.endpoint, Some("http://localhost:4566".to_string()));
        assert_eq!(config.region, Some("eu-west-1".to_string()));
        assert_eq!(config.profile, Some("audit".to_string()));
    }

    #[test]
    fn test_s3_config_with_credentials() {
        let config = S3Config::new().with_credentials("access", "secret");

        assert_eq!(config.access_key, Some("access".to_string()));
        assert_eq!(config.secret_key, Some("secret".to_string()));
    }

    #[tokio::test]
    async fn test_anonymous_config_has_no_credentials() {
        let sdk_config = create_sdk_config(&S3Config::new(), true).await;
        assert!(!has_credentials(&sdk_config).await);
    }
}
