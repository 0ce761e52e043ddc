//! Time-domain noise gate.
//!
//! Each sub-filter turns the aligned stream into a list of excluded time
//! ranges. The gate applies them in a fixed order (manual, STA/LTA, noise
//! threshold, saturation, warmup/cooldown) and clears the use flag of every
//! window overlapping a range. A sub-filter that fails is skipped; the rest
//! still run.

mod amplitude;
mod manual;
mod sta_lta;
mod trim;

pub use amplitude::{NoiseThresholdFilter, SaturationFilter};
pub use manual::ManualFilter;
pub use sta_lta::StaLtaFilter;
pub use trim::TrimFilter;

use serde::{Deserialize, Serialize};

use super::context::RunContext;
use super::stream::AlignedStream;
use super::window::{ExclusionReason, WindowTable};
use crate::config::{NoiseGateConfig, TimeRange};
use crate::error::Result;

/// A source of excluded time ranges
pub trait WindowFilter: Send + Sync {
    fn name(&self) -> &'static str;

    fn reason(&self) -> ExclusionReason;

    /// Ranges in seconds from the aligned stream start
    fn excluded_ranges(&self, stream: &AlignedStream) -> Result<Vec<TimeRange>>;
}

/// What one sub-filter did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOutcome {
    pub filter: String,
    pub reason: ExclusionReason,
    pub ranges: Vec<TimeRange>,
    /// Windows that were in use before this filter ran and are not after
    pub newly_excluded: usize,
    /// Windows overlapping any range, including ones already excluded
    pub flagged: usize,
    /// Set when the filter failed and was skipped
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseGateReport {
    pub filters: Vec<FilterOutcome>,
    pub windows_before: usize,
    pub windows_after: usize,
    /// `false` when any sub-filter failed
    pub success: bool,
}

impl NoiseGateReport {
    pub fn failed_filters(&self) -> impl Iterator<Item = &FilterOutcome> {
        self.filters.iter().filter(|f| f.error.is_some())
    }
}

pub struct NoiseGate {
    filters: Vec<Box<dyn WindowFilter>>,
}

impl NoiseGate {
    /// Build the configured sub-filters in application order
    pub fn new(config: NoiseGateConfig) -> Self {
        let mut filters: Vec<Box<dyn WindowFilter>> = Vec::new();
        if !config.manual.is_empty() {
            filters.push(Box::new(ManualFilter::new(config.manual)));
        }
        if let Some(sta_lta) = config.sta_lta {
            filters.push(Box::new(StaLtaFilter::new(sta_lta)));
        }
        if let Some(noise) = config.noise_threshold {
            filters.push(Box::new(NoiseThresholdFilter::new(noise)));
        }
        if let Some(saturation) = config.saturation {
            filters.push(Box::new(SaturationFilter::new(saturation)));
        }
        if let Some(trim) = config.trim {
            filters.push(Box::new(TrimFilter::new(trim)));
        }
        Self { filters }
    }

    pub fn filter_names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    pub fn apply(
        &self,
        table: &mut WindowTable,
        stream: &AlignedStream,
        ctx: &mut RunContext,
    ) -> NoiseGateReport {
        let windows_before = table.used_count();
        let mut outcomes = Vec::with_capacity(self.filters.len());
        let mut success = true;

        for filter in &self.filters {
            match filter.excluded_ranges(stream) {
                Ok(ranges) => {
                    let flagged = table
                        .windows
                        .iter()
                        .filter(|w| ranges.iter().any(|r| r.overlaps(w.start, w.end)))
                        .count();
                    let newly_excluded: usize = ranges
                        .iter()
                        .map(|r| table.exclude_overlapping(r, filter.reason()))
                        .sum();
                    ctx.debug(format!(
                        "{}: {} ranges, {} windows flagged, {} newly excluded",
                        filter.name(),
                        ranges.len(),
                        flagged,
                        newly_excluded
                    ));
                    outcomes.push(FilterOutcome {
                        filter: filter.name().to_string(),
                        reason: filter.reason(),
                        ranges,
                        newly_excluded,
                        flagged,
                        error: None,
                    });
                }
                Err(e) => {
                    success = false;
                    ctx.warn(format!("{} filter skipped: {}", filter.name(), e));
                    outcomes.push(FilterOutcome {
                        filter: filter.name().to_string(),
                        reason: filter.reason(),
                        ranges: Vec::new(),
                        newly_excluded: 0,
                        flagged: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let windows_after = table.used_count();
        ctx.info(format!(
            "noise gate kept {} of {} windows",
            windows_after, windows_before
        ));

        NoiseGateReport {
            filters: outcomes,
            windows_before,
            windows_after,
            success,
        }
    }
}

/// Contiguous runs where `flags` is set, at least `min_len` long, as `[start, end)` indices
pub(crate) fn runs(flags: impl IntoIterator<Item = bool>, min_len: usize) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut start = None;
    let mut len = 0;
    for (i, flag) in flags.into_iter().enumerate() {
        len = i + 1;
        match (flag, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                if i - s >= min_len {
                    out.push((s, i));
                }
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        if len - s >= min_len {
            out.push((s, len));
        }
    }
    out
}

/// Sample-index runs to time ranges
pub(crate) fn to_ranges(runs: &[(usize, usize)], sample_rate: f64) -> Vec<TimeRange> {
    runs.iter()
        .map(|&(s, e)| TimeRange::new(s as f64 / sample_rate, e as f64 / sample_rate))
        .collect()
}
