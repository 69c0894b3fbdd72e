//! Production S3 backends for the provider traits.
//!
//! - [`client`] - SDK configuration and client construction, anonymous and
//!   credentialed
//! - [`probe`] - raw HTTP existence/region probe ([`crate::provider::ProbeTransport`])
//! - [`provider`] - SDK-backed [`crate::provider::StorageProvider`]

pub mod client;
pub mod probe;
pub mod provider;

pub use client::{create_sdk_config, has_credentials, S3Config};
pub use probe::HttpProbeTransport;
pub use provider::SdkProvider;
