//! Forwarder metrics
//!
//! `record_*` functions feed the global `metrics` recorder (Prometheus when
//! installed, no-op otherwise). `SessionAggregator` keeps an in-memory view
//! across runs for the end-of-session summary.

use std::time::Duration;

use metrics::{counter, gauge, histogram};

/// Record a successful send and the progress it produced
pub fn record_post_sent(last_index: usize, caption_index: usize) {
    counter!("postrelay_posts_sent_total").increment(1);
    gauge!("postrelay_last_index").set(last_index as f64);
    gauge!("postrelay_caption_index").set(caption_index as f64);
}

/// Record a skipped item
pub fn record_post_skipped(reason: &str) {
    counter!("postrelay_posts_skipped_total", "reason" => reason.to_string()).increment(1);
}

/// Record a rate-limit signal and the pause it caused
pub fn record_rate_limited(wait: Duration) {
    counter!("postrelay_rate_limited_total").increment(1);
    histogram!("postrelay_rate_limit_wait_secs").record(wait.as_secs_f64());
}

/// Record a progress write that failed after a successful send
pub fn record_progress_write_failure() {
    counter!("postrelay_progress_write_failures_total").increment(1);
}

/// Record the terminal state of a run
pub fn record_run_finished(outcome: &str) {
    counter!("postrelay_runs_total", "outcome" => outcome.to_string()).increment(1);
}

/// Aggregates run results over a session
#[derive(Debug, Clone, Default)]
pub struct SessionAggregator {
    /// Runs by outcome label
    pub runs: std::collections::BTreeMap<String, u64>,

    /// Posts sent over all runs
    pub total_sent: u64,

    /// Items skipped over all runs
    pub total_skipped: u64,

    /// Rate-limit signals over all runs
    pub total_rate_limited: u64,

    /// Sends per run
    pub sent_per_run: RunningStats,

    /// Run durations in seconds
    pub duration_secs: RunningStats,
}

impl SessionAggregator {
    /// Create a new aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one finished run into the session
    pub fn update(
        &mut self,
        outcome: &str,
        sent: u64,
        skipped: u64,
        rate_limited: u64,
        duration: Duration,
    ) {
        *self.runs.entry(outcome.to_string()).or_insert(0) += 1;
        self.total_sent += sent;
        self.total_skipped += skipped;
        self.total_rate_limited += rate_limited;
        self.sent_per_run.push(sent as f64);
        self.duration_secs.push(duration.as_secs_f64());
    }

    /// Number of runs folded in
    pub fn run_count(&self) -> u64 {
        self.runs.values().sum()
    }

    /// Generate summary report
    pub fn summary(&self) -> SessionSummary {
        let attempted = self.total_sent + self.total_skipped;
        SessionSummary {
            runs: self.runs.clone(),
            total_sent: self.total_sent,
            total_skipped: self.total_skipped,
            total_rate_limited: self.total_rate_limited,
            skip_rate: if attempted > 0 {
                self.total_skipped as f64 / attempted as f64 * 100.0
            } else {
                0.0
            },
            sent_per_run: StatsSummary::from(&self.sent_per_run),
            duration_secs: StatsSummary::from(&self.duration_secs),
        }
    }
}

/// Session summary
#[derive(Debug, Clone, Default)]
pub struct SessionSummary {
    pub runs: std::collections::BTreeMap<String, u64>,
    pub total_sent: u64,
    pub total_skipped: u64,
    pub total_rate_limited: u64,
    pub skip_rate: f64,
    pub sent_per_run: StatsSummary,
    pub duration_secs: StatsSummary,
}

impl std::fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Session Summary ===")?;
        let runs: u64 = self.runs.values().sum();
        write!(f, "Runs: {runs}")?;
        for (outcome, count) in &self.runs {
            write!(f, " {outcome}={count}")?;
        }
        writeln!(f)?;
        writeln!(f, "Posts sent: {}", self.total_sent)?;
        writeln!(
            f,
            "Items skipped: {} ({:.2}%)",
            self.total_skipped, self.skip_rate
        )?;
        writeln!(f, "Rate limited: {}", self.total_rate_limited)?;
        writeln!(f, "Sent per run: {}", self.sent_per_run)?;
        writeln!(f, "Run duration (s): {}", self.duration_secs)?;
        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a sample
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}
