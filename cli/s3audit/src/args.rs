//! CLI argument definitions for s3audit.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Audit S3 buckets for existence, permissions and contents.
///
/// Scan results go to stdout, one line per bucket; logs go to stderr.
///
/// ## Examples
///
/// Check a single bucket:
///   s3audit scan --bucket my-target-bucket
///
/// Check a list of buckets with write probes enabled:
///   s3audit scan --buckets-file names.txt --dangerous
///
/// Dump every readable bucket from a list:
///   s3audit dump --buckets-file names.txt --dump-dir ./loot
#[derive(Parser, Debug)]
#[command(name = "s3audit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    // === S3 Configuration ===
    /// Custom S3 endpoint URL (for LocalStack or S3-compatible stores)
    #[arg(long, global = true, env = "S3AUDIT_ENDPOINT")]
    pub endpoint: Option<String>,

    /// AWS region for the first existence probe
    #[arg(long, global = true, env = "AWS_REGION")]
    pub region: Option<String>,

    /// AWS access key ID
    #[arg(long, global = true, env = "AWS_ACCESS_KEY_ID")]
    pub access_key: Option<String>,

    /// AWS secret access key
    #[arg(long, global = true, env = "AWS_SECRET_ACCESS_KEY")]
    pub secret_key: Option<String>,

    /// AWS profile name
    #[arg(long, global = true, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    // === Parallelism Options ===
    /// Buckets processed concurrently (must be >= 1)
    #[arg(long, global = true, default_value = "4", value_parser = parse_positive_usize)]
    pub threads: usize,

    // === Logging Options ===
    /// Log level
    #[arg(long, global = true, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check bucket existence, region and per-identity permissions
    Scan {
        #[command(flatten)]
        input: BucketInput,

        /// Enable write and write-ACL probes (creates and deletes a probe
        /// object in writable buckets)
        #[arg(long)]
        dangerous: bool,
    },

    /// Download the contents of readable buckets
    Dump {
        #[command(flatten)]
        input: BucketInput,

        /// Destination directory; must already exist
        #[arg(long)]
        dump_dir: PathBuf,

        /// Concurrent object downloads per bucket (must be >= 1)
        #[arg(long, default_value = "8", value_parser = parse_positive_usize)]
        downloads: usize,

        /// Log every downloaded object
        #[arg(long, short)]
        verbose: bool,
    },
}

/// Exactly one source of bucket names.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct BucketInput {
    /// A single bucket name
    #[arg(long)]
    pub bucket: Option<String>,

    /// File with one bucket name per line
    #[arg(long)]
    pub buckets_file: Option<PathBuf>,
}

/// Log level argument.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    /// Trace level (most verbose)
    Trace,
    /// Debug level
    Debug,
    /// Info level (default)
    Info,
    /// Warning level
    Warn,
    /// Error level (least verbose)
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Parse a positive usize (>= 1).
fn parse_positive_usize(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if value < 1 {
        return Err(format!("{} is not in 1..", value));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_scan_requires_exactly_one_input_source() {
        assert!(Cli::try_parse_from(["s3audit", "scan"]).is_err());
        assert!(Cli::try_parse_from([
            "s3audit",
            "scan",
            "--bucket",
            "a-bucket",
            "--buckets-file",
            "names.txt",
        ])
        .is_err());
        assert!(Cli::try_parse_from(["s3audit", "scan", "--bucket", "a-bucket"]).is_ok());
    }

    #[test]
    fn test_dump_requires_dump_dir() {
        assert!(Cli::try_parse_from(["s3audit", "dump", "--bucket", "a-bucket"]).is_err());
        let cli = Cli::try_parse_from([
            "s3audit",
            "dump",
            "--bucket",
            "a-bucket",
            "--dump-dir",
            "./out",
        ])
        .unwrap();
        match cli.command {
            Command::Dump { dump_dir, .. } => assert_eq!(dump_dir, PathBuf::from("./out")),
            _ => panic!("expected dump subcommand"),
        }
    }

    #[test]
    fn test_threads_rejects_zero() {
        assert!(
            Cli::try_parse_from(["s3audit", "scan", "--bucket", "a-bucket", "--threads", "0"])
                .is_err()
        );
    }
}
