//! Configuration for the resolution pipeline.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Configuration shared by all pipeline stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Bounded worker pool size for per-entity work (document fetch,
    /// search, synthesis). Default: 5.
    pub concurrency: usize,

    /// Per-call deadline for a synthesis request, in seconds.
    ///
    /// A timed-out entity degrades to undetermined enrichment; it never
    /// blocks the run. Default: 60.
    pub synthesis_timeout_secs: u64,

    /// Per-call deadline for a web search, in seconds. Default: 30.
    pub search_timeout_secs: u64,

    /// Maximum search snippets included in an evidence pack. Default: 5.
    pub search_result_limit: usize,

    /// Recency window for the `recent_activity` signal, in days.
    ///
    /// A filing within this window of run time counts as recent.
    /// Default: 730 (two years).
    pub recency_window_days: i64,

    /// Skip entities already carrying enrichment from a prior run.
    ///
    /// Default: true (idempotent re-runs).
    pub skip_enriched: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            synthesis_timeout_secs: 60,
            search_timeout_secs: 30,
            search_result_limit: 5,
            recency_window_days: 730,
            skip_enriched: true,
        }
    }
}

impl PipelineConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker pool size.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the synthesis deadline.
    pub fn with_synthesis_timeout_secs(mut self, secs: u64) -> Self {
        self.synthesis_timeout_secs = secs;
        self
    }

    /// Set the recency window.
    pub fn with_recency_window_days(mut self, days: i64) -> Self {
        self.recency_window_days = days;
        self
    }

    /// Force re-enrichment of entities that already carry enrichment.
    pub fn force_refresh(mut self) -> Self {
        self.skip_enriched = false;
        self
    }

    /// Recency window as a chrono duration.
    pub fn recency_window(&self) -> Duration {
        Duration::days(self.recency_window_days)
    }

    /// Synthesis deadline as a std duration.
    pub fn synthesis_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.synthesis_timeout_secs)
    }

    /// Search deadline as a std duration.
    pub fn search_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.search_timeout_secs)
    }
}
