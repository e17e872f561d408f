//! Upload counters.
//!
//! Counts texture uploads and their accumulated wall-clock cost against a
//! fixed ceiling. Once the ceiling is reached the uploader stops for good and
//! [`UploadStats::take_summary`] hands out the summary exactly once. Nothing
//! here can be reset or reconfigured after construction.

use std::time::Duration;

use bevy_ecs::prelude::Resource;
use serde::Serialize;

#[derive(Resource, Debug, Clone)]
pub struct UploadStats {
    ceiling: u64,
    count: u64,
    total_cost: Duration,
    summary_taken: bool,
}

/// Totals reported when the ceiling is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSummary {
    pub count: u64,
    pub total: Duration,
    pub average: Duration,
}

#[derive(Serialize)]
struct SummaryReport<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    count: u64,
    cost: f64,
    per: f64,
}

impl UploadSummary {
    /// One-line JSON report, tagged with the backend name. `cost` and `per`
    /// are in milliseconds.
    pub fn to_json(&self, backend: &str) -> String {
        let kind = format!("{}-texture", backend);
        let report = SummaryReport {
            kind: &kind,
            count: self.count,
            cost: self.total.as_secs_f64() * 1000.0,
            per: self.average.as_secs_f64() * 1000.0,
        };
        serde_json::to_string(&report).unwrap_or_default()
    }
}

impl Default for UploadStats {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CEILING)
    }
}

impl UploadStats {
    pub const DEFAULT_CEILING: u64 = 100_000;

    pub fn new(ceiling: u64) -> Self {
        Self {
            ceiling,
            count: 0,
            total_cost: Duration::ZERO,
            summary_taken: false,
        }
    }

    pub fn ceiling(&self) -> u64 {
        self.ceiling
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn total_cost(&self) -> Duration {
        self.total_cost
    }

    /// True once no more uploads are allowed.
    pub fn is_exhausted(&self) -> bool {
        self.count >= self.ceiling
    }

    /// Account for one upload costing `cost`. Ignored once exhausted.
    pub fn record(&mut self, cost: Duration) {
        if self.is_exhausted() {
            return;
        }
        self.count += 1;
        self.total_cost += cost;
    }

    /// Current totals.
    pub fn summary(&self) -> UploadSummary {
        let average = match u32::try_from(self.count) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.total_cost / n,
            Err(_) => Duration::from_secs_f64(self.total_cost.as_secs_f64() / self.count as f64),
        };
        UploadSummary {
            count: self.count,
            total: self.total_cost,
            average,
        }
    }

    /// The summary, the first time this is called after exhaustion.
    pub fn take_summary(&mut self) -> Option<UploadSummary> {
        if !self.is_exhausted() || self.summary_taken {
            return None;
        }
        self.summary_taken = true;
        Some(self.summary())
    }

    pub fn summary_taken(&self) -> bool {
        self.summary_taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_is_taken_once_after_ceiling() {
        let mut stats = UploadStats::new(2);
        stats.record(Duration::from_millis(2));
        assert!(stats.take_summary().is_none());
        stats.record(Duration::from_millis(4));
        let summary = stats.take_summary().unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.total, Duration::from_millis(6));
        assert_eq!(summary.average, Duration::from_millis(3));
        assert!(stats.take_summary().is_none());
    }

    #[test]
    fn record_after_ceiling_is_ignored() {
        let mut stats = UploadStats::new(1);
        stats.record(Duration::from_millis(1));
        stats.record(Duration::from_millis(1));
        assert_eq!(stats.count(), 1);
        assert_eq!(stats.total_cost(), Duration::from_millis(1));
    }

    #[test]
    fn zero_ceiling_is_exhausted_from_start() {
        let mut stats = UploadStats::new(0);
        assert!(stats.is_exhausted());
        let summary = stats.take_summary().unwrap();
        assert_eq!(summary.count, 0);
        assert_eq!(summary.average, Duration::ZERO);
    }

    #[test]
    fn json_report_keys_are_in_milliseconds() {
        let summary = UploadSummary {
            count: 4,
            total: Duration::from_millis(10),
            average: Duration::from_micros(2500),
        };
        let json: serde_json::Value = serde_json::from_str(&summary.to_json("headless")).unwrap();
        assert_eq!(json["type"], "headless-texture");
        assert_eq!(json["count"], 4);
        assert!((json["cost"].as_f64().unwrap() - 10.0).abs() < 1e-9);
        assert!((json["per"].as_f64().unwrap() - 2.5).abs() < 1e-9);
    }
}
