//! Collection Metrics
//!
//! Per-run counters and timings, logged at the end of a collection run and
//! used to flag runs whose training data looks unusable.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// Metrics for a single collection run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionMetrics {
    pub owner_id: String,
    pub run_id: String,
    pub timestamp: i64,

    // Performance metrics
    pub total_duration_ms: u64,
    pub author_fetch_ms: u64,
    pub extraction_ms: u64,

    // Snapshot shape
    pub friends_collected: usize,
    pub wall_posts: usize,

    // Sampling and extraction
    pub posts_sampled: usize,
    pub posts_skipped: usize,
    pub records_produced: usize,
    pub positive_labels: usize,

    // Author resolution
    pub authors_fetched: usize,
    pub authors_failed: usize,
}

impl Default for CollectionMetrics {
    fn default() -> Self {
        Self {
            owner_id: String::new(),
            run_id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().timestamp(),
            total_duration_ms: 0,
            author_fetch_ms: 0,
            extraction_ms: 0,
            friends_collected: 0,
            wall_posts: 0,
            posts_sampled: 0,
            posts_skipped: 0,
            records_produced: 0,
            positive_labels: 0,
            authors_fetched: 0,
            authors_failed: 0,
        }
    }
}

impl CollectionMetrics {
    pub fn for_owner(owner_id: &str) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            ..Self::default()
        }
    }

    pub fn log_summary(&self) {
        info!("📊 Collection run {} for {}:", self.run_id, self.owner_id);
        info!(
            "    Snapshot: {} friends, {} wall posts",
            self.friends_collected, self.wall_posts
        );
        info!(
            "    Sampled {} posts, skipped {}, produced {} records ({} positive)",
            self.posts_sampled, self.posts_skipped, self.records_produced, self.positive_labels
        );
        info!(
            "    Authors: {} fetched, {} failed",
            self.authors_fetched, self.authors_failed
        );
        info!(
            "    Timings: authors {}ms, extraction {}ms, total {}ms",
            self.author_fetch_ms, self.extraction_ms, self.total_duration_ms
        );
    }
}

/// Performance timer for tracking operation duration
pub struct PerformanceTimer {
    start: Instant,
    label: String,
}

impl PerformanceTimer {
    pub fn new(label: &str) -> Self {
        Self {
            start: Instant::now(),
            label: label.to_string(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    pub fn log_if_slow(&self, threshold_ms: u64) {
        let elapsed = self.elapsed_ms();
        if elapsed > threshold_ms {
            tracing::warn!(
                "⚠️ Slow operation: {} took {}ms (threshold: {}ms)",
                self.label,
                elapsed,
                threshold_ms
            );
        }
    }
}

impl Drop for PerformanceTimer {
    fn drop(&mut self) {
        let elapsed = self.elapsed_ms();
        tracing::debug!("⏱️ {} completed in {}ms", self.label, elapsed);
    }
}

/// Training data quality checks
pub struct DatasetAnalyzer;

impl DatasetAnalyzer {
    /// Share of positive labels (0-1)
    pub fn label_balance(positive: usize, total: usize) -> f32 {
        if total == 0 {
            return 0.0;
        }
        positive as f32 / total as f32
    }

    /// Share of distinct authors that could not be fetched (0-1)
    pub fn author_failure_rate(fetched: usize, failed: usize) -> f32 {
        let total = fetched + failed;
        if total == 0 {
            return 0.0;
        }
        failed as f32 / total as f32
    }

    /// Detect problems that make a run's training data suspect
    pub fn detect_issues(metrics: &CollectionMetrics) -> Vec<String> {
        let mut issues = Vec::new();

        if metrics.records_produced == 0 {
            issues.push("No training records produced".to_string());
            return issues;
        }

        // A single-class set teaches the classifier nothing
        let balance = Self::label_balance(metrics.positive_labels, metrics.records_produced);
        if balance < 0.05 || balance > 0.95 {
            issues.push(format!("Label imbalance: {:.2}% positive", balance * 100.0));
        }

        let failure_rate = Self::author_failure_rate(metrics.authors_fetched, metrics.authors_failed);
        if failure_rate > 0.25 {
            issues.push(format!(
                "High author failure rate: {:.2}%",
                failure_rate * 100.0
            ));
        }

        if metrics.posts_sampled > 0
            && metrics.posts_skipped * 2 > metrics.posts_sampled
        {
            issues.push(format!(
                "Most sampled posts skipped: {}/{}",
                metrics.posts_skipped, metrics.posts_sampled
            ));
        }

        issues
    }
}
