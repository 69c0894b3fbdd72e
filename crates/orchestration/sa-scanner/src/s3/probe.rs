//! Raw HTTP existence probe.
//!
//! Existence and region are resolved with a header-only request against the
//! bucket's virtual-hosted endpoint, issued outside the SDK so that redirects
//! stay visible: the SDK follows region corrections transparently, but the
//! `x-amz-bucket-region` header on the 301 is exactly the signal the resolver
//! needs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::redirect::Policy;
use sa_error::{Result, ScanError};
use tracing::debug;

use crate::provider::{HeadOutcome, ProbeTransport};

const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// [`ProbeTransport`] backed by plain unsigned HEAD requests.
pub struct HttpProbeTransport {
    http: reqwest::Client,
    /// Custom endpoint for S3-compatible stores; probed path-style.
    endpoint: Option<String>,
}

impl HttpProbeTransport {
    pub fn new(endpoint: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .redirect(Policy::none())
            .timeout(PROBE_TIMEOUT)
            .build()
            .map_err(|e| ScanError::Provider(format!("HTTP client: {e}")))?;
        Ok(Self { http, endpoint })
    }
}

#[async_trait]
impl ProbeTransport for HttpProbeTransport {
    async fn head_bucket(&self, bucket: &str, region: &str) -> Result<HeadOutcome> {
        let url = probe_url(bucket, region, self.endpoint.as_deref());
        let response = match self.http.head(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                // DNS failure or refused connection: the virtual-hosted name
                // does not exist, so neither does the bucket.
                debug!(bucket, url = %url, error = %e, "Existence probe unreachable");
                return Ok(HeadOutcome::Unresolvable);
            }
        };

        let region_header = response
            .headers()
            .get("x-amz-bucket-region")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok(interpret_status(response.status().as_u16(), region_header))
    }
}

/// The virtual-hosted probe URL, or a path-style one against a custom
/// endpoint.
fn probe_url(bucket: &str, region: &str, endpoint: Option<&str>) -> String {
    match endpoint {
        Some(base) => format!("{}/{bucket}", base.trim_end_matches('/')),
        None => format!("http://{bucket}.s3.{region}.amazonaws.com"),
    }
}

/// Map a probe status to its interpretation. A redirect without the region
/// header cannot be followed and is treated as unhandled.
fn interpret_status(status: u16, region_header: Option<String>) -> HeadOutcome {
    match status {
        200 => HeadOutcome::Ok,
        301 | 307 => match region_header {
            Some(region) => HeadOutcome::Redirect(region),
            None => HeadOutcome::Other(status),
        },
        403 => HeadOutcome::Forbidden,
        404 => HeadOutcome::NotFound,
        other => HeadOutcome::Other(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_url_virtual_hosted() {
        assert_eq!(
            probe_url("public-test-bucket", "us-east-1", None),
            "http://public-test-bucket.s3.us-east-1.amazonaws.com"
        );
    }

    #[test]
    fn test_probe_url_custom_endpoint_is_path_style() {
        assert_eq!(
            probe_url("public-test-bucket", "us-east-1", Some("http://localhost:4566/")),
            "http://localhost:4566/public-test-bucket"
        );
    }

    #[test]
    fn test_interpret_status() {
        assert_eq!(interpret_status(200, None), HeadOutcome::Ok);
        assert_eq!(interpret_status(403, None), HeadOutcome::Forbidden);
        assert_eq!(interpret_status(404, None), HeadOutcome::NotFound);
        assert_eq!(
            interpret_status(301, Some("eu-west-1".to_string())),
            HeadOutcome::Redirect("eu-west-1".to_string())
        );
        // A redirect that names no region cannot be followed.
        assert_eq!(interpret_status(301, None), HeadOutcome::Other(301));
        assert_eq!(interpret_status(503, None), HeadOutcome::Other(503));
    }
}
