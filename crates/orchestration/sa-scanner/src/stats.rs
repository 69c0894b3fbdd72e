//! Statistics for scan and dump runs.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Statistics collected during a scan run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanStats {
    /// When the scan started
    pub started_at: Option<DateTime<Utc>>,

    /// When the scan completed
    pub completed_at: Option<DateTime<Utc>>,

    /// Total bucket names consumed
    pub buckets_scanned: usize,

    /// Names rejected before any network call
    pub invalid_names: usize,

    /// Buckets that resolved to not-existing
    pub buckets_not_found: usize,

    /// Buckets confirmed to exist
    pub buckets_existing: usize,

    /// Per-bucket failures (the batch still drained)
    pub errors: Vec<String>,
}

impl ScanStats {
    /// Create a new stats tracker with the current time as start time.
    pub fn new() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    /// Mark the run as complete with the current time.
    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    pub fn record_invalid_name(&mut self) {
        self.buckets_scanned += 1;
        self.invalid_names += 1;
    }

    pub fn record_not_found(&mut self) {
        self.buckets_scanned += 1;
        self.buckets_not_found += 1;
    }

    pub fn record_existing(&mut self) {
        self.buckets_scanned += 1;
        self.buckets_existing += 1;
    }

    pub fn record_error(&mut self, error: impl ToString) {
        self.buckets_scanned += 1;
        self.errors.push(error.to_string());
    }

    /// Duration of the run, once complete.
    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Statistics collected during a dump run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DumpStats {
    /// When the dump started
    pub started_at: Option<DateTime<Utc>>,

    /// When the dump completed
    pub completed_at: Option<DateTime<Utc>>,

    /// Buckets whose contents were (at least partially) dumped
    pub buckets_dumped: usize,

    /// Buckets skipped (invalid, missing, or unreadable)
    pub buckets_skipped: usize,

    /// Objects written to disk
    pub objects_downloaded: usize,

    /// Objects that failed to download
    pub objects_failed: usize,

    /// Total bytes written
    pub bytes_downloaded: u64,

    /// Per-bucket failures
    pub errors: Vec<String>,
}

impl DumpStats {
    pub fn new() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    pub fn record_error(&mut self, error: impl ToString) {
        self.errors.push(error.to_string());
    }

    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty() || self.objects_failed > 0
    }
}

/// Format bytes as human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 bytes");
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_scan_stats_new() {
        let stats = ScanStats::new();
        assert!(stats.started_at.is_some());
        assert!(stats.completed_at.is_none());
        assert_eq!(stats.buckets_scanned, 0);
    }

    #[test]
    fn test_scan_stats_counters() {
        let mut stats = ScanStats::new();
        stats.record_existing();
        stats.record_existing();
        stats.record_not_found();
        stats.record_invalid_name();
        stats.record_error("boom");

        assert_eq!(stats.buckets_scanned, 5);
        assert_eq!(stats.buckets_existing, 2);
        assert_eq!(stats.buckets_not_found, 1);
        assert_eq!(stats.invalid_names, 1);
        assert!(stats.has_errors());
    }

    #[test]
    fn test_scan_stats_duration() {
        let mut stats = ScanStats::new();
        stats.complete();
        assert!(stats.duration().unwrap().num_milliseconds() >= 0);
    }

    #[test]
    fn test_dump_stats_partial_failure_counts_as_errors() {
        let mut stats = DumpStats::new();
        assert!(!stats.has_errors());
        stats.objects_failed = 1;
        assert!(stats.has_errors());
    }
}
