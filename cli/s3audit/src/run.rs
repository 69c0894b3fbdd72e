//! Main execution logic for the s3audit CLI.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use futures::{pin_mut, StreamExt};
use sa_error::ScanError;
use sa_scanner::s3::{create_sdk_config, has_credentials, HttpProbeTransport, S3Config, SdkProvider};
use sa_scanner::sizer::AwsCliSizeEstimator;
use sa_scanner::{
    DumpConfig, DumpStats, Dumper, Prober, Resolver, ScanConfig, ScanStats, Scanner,
};
use tracing::{info, warn, Level};
use tracing_subscriber::fmt;

use crate::args::{BucketInput, Cli, LogLevel};

/// Initialize logging.
pub fn init_logging(level: LogLevel) -> Result<()> {
    let level: Level = level.into();

    let subscriber = fmt::Subscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr); // Log to stderr so stdout is clean for result lines

    subscriber.init();

    Ok(())
}

/// Resolve the bucket names to audit from CLI input. File input is trimmed,
/// blank lines are skipped and duplicates are dropped, preserving order.
pub fn load_bucket_names(input: &BucketInput) -> Result<Vec<String>> {
    if let Some(name) = &input.bucket {
        return Ok(vec![name.clone()]);
    }

    // The argument group guarantees one of the two is present.
    let path = input
        .buckets_file
        .as_ref()
        .ok_or_else(|| ScanError::Config("no bucket input given".to_string()))?;
    let contents = std::fs::read_to_string(path).map_err(|e| {
        ScanError::Config(format!("cannot read buckets file {}: {e}", path.display()))
    })?;

    let mut seen = HashSet::new();
    let names: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter(|l| seen.insert(l.to_string()))
        .map(String::from)
        .collect();

    if names.is_empty() {
        return Err(ScanError::Config(format!(
            "buckets file {} contains no names",
            path.display()
        ))
        .into());
    }
    Ok(names)
}

/// The identity-bound probers and the existence resolver, shared by both
/// subcommands.
pub struct Pipeline {
    pub resolver: Arc<Resolver>,
    pub anonymous: Arc<Prober>,
    pub authenticated: Arc<Prober>,
}

/// Build the probe pipeline from CLI arguments. The authenticated prober is
/// only enabled when the credential chain actually yields credentials.
pub async fn build_pipeline(args: &Cli) -> Result<Pipeline> {
    let mut s3_config = S3Config::new();
    if let Some(region) = &args.region {
        s3_config = s3_config.with_region(region);
    }
    if let Some(endpoint) = &args.endpoint {
        s3_config = s3_config.with_endpoint(endpoint);
    }
    if let (Some(access_key), Some(secret_key)) = (&args.access_key, &args.secret_key) {
        s3_config = s3_config.with_credentials(access_key, secret_key);
    }
    if let Some(profile) = &args.profile {
        s3_config = s3_config.with_profile(profile);
    }

    let path_style = s3_config.endpoint.is_some();

    let anon_config = create_sdk_config(&s3_config, true).await;
    let anonymous = Arc::new(Prober::anonymous(Arc::new(SdkProvider::new(
        anon_config, path_style,
    ))));

    let auth_config = create_sdk_config(&s3_config, false).await;
    let authenticated = if has_credentials(&auth_config).await {
        info!("AWS credentials found; authenticated checks enabled");
        Arc::new(Prober::authenticated(Some(Arc::new(SdkProvider::new(
            auth_config,
            path_style,
        )))))
    } else {
        warn!("No AWS credentials found; authenticated checks will be skipped. Run `aws configure` to enable them.");
        Arc::new(Prober::authenticated(None))
    };

    let resolver = Arc::new(Resolver::new(Arc::new(HttpProbeTransport::new(
        args.endpoint.clone(),
    )?)));

    Ok(Pipeline {
        resolver,
        anonymous,
        authenticated,
    })
}

/// Execute the scan subcommand, printing one result line per bucket as it
/// completes.
pub async fn execute_scan(args: &Cli, input: &BucketInput, dangerous: bool) -> Result<ScanStats> {
    let names = load_bucket_names(input)?;
    let pipeline = build_pipeline(args).await?;

    let scanner = Scanner::new(
        pipeline.resolver,
        pipeline.anonymous,
        pipeline.authenticated,
        Arc::new(AwsCliSizeEstimator::new()),
        ScanConfig::new()
            .with_threads(args.threads)
            .with_dangerous(dangerous),
    );

    let mut stats = ScanStats::new();
    let outcomes = scanner.scan_stream(names);
    pin_mut!(outcomes);
    while let Some(outcome) = outcomes.next().await {
        println!("{outcome}");
        outcome.record(&mut stats);
    }
    stats.complete();
    Ok(stats)
}

/// Execute the dump subcommand.
pub async fn execute_dump(
    args: &Cli,
    input: &BucketInput,
    dump_dir: &Path,
    downloads: usize,
    verbose: bool,
) -> Result<DumpStats> {
    if !dump_dir.is_dir() {
        return Err(ScanError::Config(format!(
            "dump directory {} does not exist",
            dump_dir.display()
        ))
        .into());
    }

    let names = load_bucket_names(input)?;
    let pipeline = build_pipeline(args).await?;

    let dumper = Dumper::new(
        pipeline.resolver,
        pipeline.anonymous,
        pipeline.authenticated,
        DumpConfig::new(dump_dir)
            .with_threads(args.threads)
            .with_downloads(downloads)
            .with_verbose(verbose),
    );

    let mut stats = DumpStats::new();
    let outcomes = dumper.dump_stream(names);
    pin_mut!(outcomes);
    while let Some(outcome) = outcomes.next().await {
        println!("{outcome}");
        outcome.record(&mut stats);
    }
    stats.complete();
    Ok(stats)
}
