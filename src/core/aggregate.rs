// src/core/aggregate.rs
//
// Aggregate H/V curves over used windows and RMSE-based outlier removal.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::dsp::stats::{columnwise, log_std, median, percentile, rmse, std_dev};
use super::window::{CurveId, ExclusionReason, Window, WindowTable};
use crate::config::OutlierRule;
use crate::error::{HvsrError, Result};

/// Median curve and spread envelopes for one curve family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateCurve {
    pub curve_id: CurveId,
    pub median: Vec<f64>,
    /// Linear standard deviation
    pub std: Vec<f64>,
    /// Standard deviation of log10 values
    pub log_std: Vec<f64>,
    pub plus_std: Vec<f64>,
    pub minus_std: Vec<f64>,
    pub plus_log_std: Vec<f64>,
    pub minus_log_std: Vec<f64>,
    pub window_count: usize,
}

pub struct AggregateCurveBuilder;

impl AggregateCurveBuilder {
    /// Aggregate a set of equal-length curves
    pub fn from_curves(curve_id: CurveId, curves: &[&[f64]]) -> Result<AggregateCurve> {
        if curves.is_empty() {
            return Err(HvsrError::insufficient_windows(format!("{} aggregate", curve_id)));
        }

        let median_curve = columnwise(curves, |col| median(col));
        let std = columnwise(curves, |col| std_dev(col));
        let log_std = columnwise(curves, |col| log_std(col));

        let plus_std = median_curve.iter().zip(&std).map(|(m, s)| m + s).collect();
        let minus_std = median_curve.iter().zip(&std).map(|(m, s)| m - s).collect();
        let plus_log_std = median_curve
            .iter()
            .zip(&log_std)
            .map(|(m, s)| m * s.exp())
            .collect();
        let minus_log_std = median_curve
            .iter()
            .zip(&log_std)
            .map(|(m, s)| m / s.exp())
            .collect();

        Ok(AggregateCurve {
            curve_id,
            median: median_curve,
            std,
            log_std,
            plus_std,
            minus_std,
            plus_log_std,
            minus_log_std,
            window_count: curves.len(),
        })
    }

    pub fn build(table: &WindowTable, curve_id: CurveId) -> Result<AggregateCurve> {
        Self::from_curves(curve_id, &table.used_curves(curve_id))
    }

    /// Aggregate every curve family present in the table
    pub fn build_all(table: &WindowTable) -> Result<BTreeMap<CurveId, AggregateCurve>> {
        table
            .curve_ids()
            .into_iter()
            .map(|id| Self::build(table, id).map(|curve| (id, curve)))
            .collect()
    }
}

/// Result of one outlier pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    pub reason: ExclusionReason,
    /// RMSE cut-off per compared curve (one per channel for the PSD pass)
    pub thresholds: Vec<f64>,
    pub candidates: usize,
    /// Candidates above the cut-off, including ones excluded by an earlier identical pass
    pub outliers: usize,
    pub newly_excluded: usize,
    pub windows_after: usize,
}

/// RMSE-against-median outlier removal.
///
/// A pass considers windows that are either in use or excluded only by this
/// same pass, so running it again reproduces the same median, cut-off and
/// decisions.
pub struct OutlierRemover {
    rule: OutlierRule,
}

impl OutlierRemover {
    pub fn new(rule: OutlierRule) -> Self {
        Self { rule }
    }

    /// Per-window H/V curves of `curve_id`
    pub fn remove_hv(&self, table: &mut WindowTable, curve_id: CurveId) -> Result<OutlierReport> {
        self.run(table, ExclusionReason::HvOutlier, 1, |w, _| w.curve(curve_id))
    }

    /// Per-channel PSDs; a window is an outlier if any channel is
    pub fn remove_psd(&self, table: &mut WindowTable) -> Result<OutlierReport> {
        self.run(table, ExclusionReason::PsdOutlier, 3, |w, channel| {
            let psd = match channel {
                0 => &w.psd.z,
                1 => &w.psd.n,
                _ => &w.psd.e,
            };
            Some(psd.as_slice())
        })
    }

    fn threshold(&self, rmses: &[f64]) -> f64 {
        if self.rule.use_percentile {
            percentile(rmses, self.rule.threshold)
        } else {
            self.rule.threshold
        }
    }

    fn run<F>(&self, table: &mut WindowTable, reason: ExclusionReason, channels: usize, curve: F) -> Result<OutlierReport>
    where
        F: Fn(&Window, usize) -> Option<&[f64]>,
    {
        let stage = format!("{} removal", reason.description());
        let candidates: Vec<usize> = table
            .windows
            .iter()
            .enumerate()
            .filter(|(_, w)| w.excluded_only_by(reason))
            .map(|(i, _)| i)
            .collect();
        if candidates.len() < 2 {
            return Err(HvsrError::insufficient_windows(stage));
        }

        let mut is_outlier = vec![false; candidates.len()];
        let mut thresholds = Vec::with_capacity(channels);
        for channel in 0..channels {
            let curves: Vec<&[f64]> = candidates
                .iter()
                .map(|&i| curve(&table.windows[i], channel))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| HvsrError::insufficient_windows(stage.clone()))?;
            let reference = columnwise(&curves, |col| median(col));
            let rmses: Vec<f64> = curves.iter().map(|c| rmse(c, &reference)).collect();
            let cutoff = self.threshold(&rmses);
            for (flag, &r) in is_outlier.iter_mut().zip(&rmses) {
                *flag |= r > cutoff;
            }
            thresholds.push(cutoff);
        }

        // May exclude every candidate; aggregation then reports the empty set
        let outliers = is_outlier.iter().filter(|&&o| o).count();

        let mut newly_excluded = 0;
        for (k, &i) in candidates.iter().enumerate() {
            if is_outlier[k] && table.windows[i].exclude(reason) {
                newly_excluded += 1;
            }
        }

        Ok(OutlierReport {
            reason,
            thresholds,
            candidates: candidates.len(),
            outliers,
            newly_excluded,
            windows_after: table.used_count(),
        })
    }
}
