//! Distribution and retry reporting.
//!
//! Consumes only the counters the placement core exposes (weights,
//! disabled flags, per-item assigned counts, rebalance stats) and renders
//! them as tables or JSON.

use anyhow::Result;
use baler_placement::{Bucket, RebalanceStats};
use serde::Serialize;

use crate::cli::OutputFormat;

/// One row of the distribution table.
#[derive(Debug, Serialize)]
pub struct DistributionRow {
    /// Item id.
    pub item: u32,
    /// Current weight.
    pub weight: u32,
    /// Weight fraction against the current total.
    pub fraction: f64,
    /// Objects currently assigned.
    pub assigned: u64,
    /// Percentage deviation from the expected count, when defined.
    pub deviation_pct: Option<f64>,
    /// Whether the item is excluded from fresh selections.
    pub disabled: bool,
}

/// Distribution snapshot for one simulation phase.
#[derive(Debug, Serialize)]
pub struct DistributionReport {
    /// Phase label.
    pub phase: String,
    /// Total objects in the bucket.
    pub object_count: u64,
    /// Per-item rows, in item order.
    pub rows: Vec<DistributionRow>,
    /// Rebalance counters, for phases that rebalanced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rebalance: Option<RebalanceStats>,
}

impl DistributionReport {
    /// Snapshot the bucket's current distribution.
    pub fn snapshot(phase: &str, bucket: &Bucket, rebalance: Option<RebalanceStats>) -> Self {
        let object_count = bucket.object_count();
        let total_weight: u64 = bucket.items().iter().map(|item| u64::from(item.weight())).sum();
        let rows = bucket
            .items()
            .iter()
            .map(|item| {
                let fraction = if total_weight == 0 {
                    0.0
                } else {
                    f64::from(item.weight()) / total_weight as f64
                };
                let expected = fraction * object_count as f64;
                let deviation_pct = if expected > 0.0 {
                    let diff = item.assigned() as f64 - expected;
                    // Rounding noise below one object is reported as exact.
                    if diff.round() == 0.0 { Some(0.0) } else { Some(100.0 * diff / expected) }
                } else {
                    None
                };
                DistributionRow {
                    item: item.id(),
                    weight: item.weight(),
                    fraction,
                    assigned: item.assigned(),
                    deviation_pct,
                    disabled: item.disabled(),
                }
            })
            .collect();
        Self { phase: phase.to_string(), object_count, rows, rebalance }
    }

    /// Render in the requested format.
    pub fn print(&self, format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Text => {
                println!("=== {} ===", self.phase);
                println!("{:>6} {:>8} {:>9} {:>10} {:>8}", "item", "weight", "fraction", "count", "diff%");
                for row in &self.rows {
                    let marker = if row.disabled { "*" } else { " " };
                    let diff = row
                        .deviation_pct
                        .map_or_else(|| "     -".to_string(), |d| format!("{d:>6.2}"));
                    println!(
                        "{marker}{:>5} {:>8} {:>9.4} {:>10} {diff}",
                        row.item, row.weight, row.fraction, row.assigned
                    );
                }
                if let Some(stats) = self.rebalance {
                    println!("expected: {}, moved: {}", stats.expected_moves, stats.moved);
                }
                println!();
            }
            OutputFormat::Json => println!("{}", serde_json::to_string(self)?),
        }
        Ok(())
    }
}

/// Attempt-count histogram for the reject-and-retry selector.
#[derive(Debug, Default, Serialize)]
pub struct AttemptHistogram {
    counts: Vec<u64>,
}

impl AttemptHistogram {
    /// Record one placement's attempt count.
    pub fn record(&mut self, attempts: u32) {
        let slot = attempts as usize;
        if self.counts.len() <= slot {
            self.counts.resize(slot + 1, 0);
        }
        self.counts[slot] += 1;
    }

    /// Render in the requested format.
    pub fn print(&self, format: OutputFormat) -> Result<()> {
        let total: u64 = self.counts.iter().sum();
        if total == 0 {
            return Ok(());
        }
        match format {
            OutputFormat::Text => {
                println!("--- retry attempts ---");
                for (attempts, &count) in self.counts.iter().enumerate().skip(1) {
                    if count > 0 {
                        let pct = 100.0 * count as f64 / total as f64;
                        println!("{attempts:>3}: {count:>10} ({pct:.2}%)");
                    }
                }
                println!();
            }
            OutputFormat::Json => println!("{}", serde_json::to_string(self)?),
        }
        Ok(())
    }
}
