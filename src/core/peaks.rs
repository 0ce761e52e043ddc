// src/core/peaks.rs
//
// Peak candidates on H/V curves and best-peak selection.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::validation::CriterionOutcome;
use super::window::{CurveId, WindowTable};
use crate::config::{Band, HvsrConfig, PeakSelection};

/// Validation results attached to a peak by the validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakValidation {
    /// Highest frequency in [f0/4, f0) where A0/A(f) > 2
    pub f_minus: Option<f64>,
    /// Lowest frequency in (f0, 4 f0] where A0/A(f) > 2
    pub f_plus: Option<f64>,
    /// Std of per-window peak frequencies; `None` without windows
    pub sigma_f: Option<f64>,
    /// Std of log10 per-window amplitude at f0
    pub sigma_a: Option<f64>,
    /// Criteria passed, 0..=9
    pub score: u8,
    /// Outcomes of all 9 criteria in order
    pub criteria: Vec<CriterionOutcome>,
    pub passed: bool,
}

/// A local maximum of an H/V curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub f0: f64,
    pub a0: f64,
    /// Bin index on the shared frequency axis
    pub index: usize,
    pub validation: Option<PeakValidation>,
}

impl Peak {
    pub fn new(f0: f64, a0: f64, index: usize) -> Self {
        Self {
            f0,
            a0,
            index,
            validation: None,
        }
    }

    pub fn score(&self) -> u8 {
        self.validation.as_ref().map_or(0, |v| v.score)
    }

    pub fn passed(&self) -> bool {
        self.validation.as_ref().is_some_and(|v| v.passed)
    }
}

/// Order by score then amplitude, best first
pub fn rank(peaks: &mut [Peak]) {
    peaks.sort_by(|a, b| {
        b.score()
            .cmp(&a.score())
            .then_with(|| b.a0.partial_cmp(&a.a0).unwrap_or(Ordering::Equal))
    });
}

/// Indices strictly greater than both neighbours
pub fn local_maxima(values: &[f64]) -> Vec<usize> {
    if values.len() < 3 {
        return Vec::new();
    }
    (1..values.len() - 1)
        .filter(|&i| values[i] > values[i - 1] && values[i] > values[i + 1])
        .collect()
}

pub struct PeakSelector {
    band: Band,
    peak_band: Band,
    min_amplitude: f64,
}

impl PeakSelector {
    pub fn new(band: Band, peak_band: Band, min_amplitude: f64) -> Self {
        Self {
            peak_band: peak_band.clip_to(&band),
            band,
            min_amplitude,
        }
    }

    pub fn from_config(config: &HvsrConfig) -> Self {
        Self::new(config.window.band, config.peaks.peak_band, config.peaks.min_amplitude)
    }

    fn in_bands(&self, freq: f64) -> bool {
        self.band.contains(freq) && self.peak_band.contains(freq)
    }

    /// Local maxima in both bands, above the amplitude floor
    pub fn candidates(&self, freqs: &[f64], curve: &[f64]) -> Vec<Peak> {
        local_maxima(curve)
            .into_iter()
            .filter(|&i| self.in_bands(freqs[i]) && curve[i] > self.min_amplitude)
            .map(|i| Peak::new(freqs[i], curve[i], i))
            .collect()
    }

    /// Highest local maximum in both bands, ignoring the amplitude floor
    pub fn highest_maximum(&self, freqs: &[f64], curve: &[f64]) -> Option<f64> {
        local_maxima(curve)
            .into_iter()
            .filter(|&i| self.in_bands(freqs[i]))
            .max_by(|&a, &b| curve[a].partial_cmp(&curve[b]).unwrap_or(Ordering::Equal))
            .map(|i| freqs[i])
    }

    /// Local maximum in both bands nearest `target`, ignoring the amplitude floor
    pub fn nearest_maximum(&self, freqs: &[f64], curve: &[f64], target: f64) -> Option<f64> {
        local_maxima(curve)
            .into_iter()
            .map(|i| freqs[i])
            .filter(|&f| self.in_bands(f))
            .min_by(|a, b| {
                (a - target)
                    .abs()
                    .partial_cmp(&(b - target).abs())
                    .unwrap_or(Ordering::Equal)
            })
    }

    /// Per used window, the peak frequency nearest `f0`
    pub fn window_peak_frequencies(&self, table: &WindowTable, curve_id: CurveId, f0: f64) -> Vec<f64> {
        let freqs = table.frequencies.as_slice();
        table
            .used()
            .filter_map(|w| w.curve(curve_id))
            .filter_map(|curve| self.nearest_maximum(freqs, curve, f0))
            .collect()
    }

    /// Pick the best candidate. Under `Score` the candidates must already be validated.
    pub fn select(&self, candidates: &[Peak], policy: PeakSelection) -> Option<Peak> {
        let by_amplitude = |a: &&Peak, b: &&Peak| a.a0.partial_cmp(&b.a0).unwrap_or(Ordering::Equal);
        match policy {
            PeakSelection::MaxAmplitude => candidates.iter().max_by(by_amplitude).cloned(),
            PeakSelection::NearestFrequency(target) => candidates
                .iter()
                .min_by(|a, b| {
                    (a.f0 - target)
                        .abs()
                        .partial_cmp(&(b.f0 - target).abs())
                        .unwrap_or(Ordering::Equal)
                })
                .cloned(),
            PeakSelection::Score => {
                let mut ranked = candidates.to_vec();
                rank(&mut ranked);
                ranked.into_iter().next()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis() -> Vec<f64> {
        (1..=100).map(|i| i as f64 / 10.0).collect()
    }

    fn curve_with(peaks: &[(usize, f64)]) -> Vec<f64> {
        let mut c = vec![1.0; 100];
        for &(i, a) in peaks {
            c[i] = a;
        }
        c
    }

    #[test]
    fn test_plateau_is_not_a_maximum() {
        assert_eq!(local_maxima(&[1.0, 2.0, 2.0, 1.0]), Vec::<usize>::new());
        assert_eq!(local_maxima(&[1.0, 3.0, 2.0, 4.0, 1.0]), vec![1, 3]);
    }

    #[test]
    fn test_candidates_respect_bands_and_floor() {
        let selector = PeakSelector::new(Band::new(0.5, 8.0), Band::new(1.0, 20.0), 1.5);
        let curve = curve_with(&[(4, 5.0), (19, 3.0), (49, 1.2), (89, 9.0)]);
        let peaks = selector.candidates(&axis(), &curve);
        // 0.5 Hz is outside the sub-band, 5 Hz below the floor, 9 Hz outside the band
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].f0, 2.0);
    }

    #[test]
    fn test_selection_policies() {
        let selector = PeakSelector::new(Band::new(0.1, 10.0), Band::new(0.1, 10.0), 1.0);
        let curve = curve_with(&[(9, 4.0), (49, 6.0), (79, 3.0)]);
        let peaks = selector.candidates(&axis(), &curve);
        assert_eq!(selector.select(&peaks, PeakSelection::MaxAmplitude).unwrap().f0, 5.0);
        assert_eq!(
            selector.select(&peaks, PeakSelection::NearestFrequency(7.0)).unwrap().f0,
            8.0
        );
        assert!(selector.select(&[], PeakSelection::MaxAmplitude).is_none());
    }

    #[test]
    fn test_rank_breaks_ties_by_amplitude() {
        let mut peaks = vec![Peak::new(1.0, 2.0, 0), Peak::new(2.0, 5.0, 1), Peak::new(3.0, 3.0, 2)];
        rank(&mut peaks);
        let order: Vec<f64> = peaks.iter().map(|p| p.f0).collect();
        assert_eq!(order, vec![2.0, 3.0, 1.0]);
    }

    #[test]
    fn test_nearest_maximum() {
        let selector = PeakSelector::new(Band::new(0.1, 10.0), Band::new(0.1, 10.0), 1.0);
        let curve = curve_with(&[(9, 4.0), (29, 1.1), (79, 3.0)]);
        assert_eq!(selector.nearest_maximum(&axis(), &curve, 2.5), Some(3.0));
        assert_eq!(selector.highest_maximum(&axis(), &curve), Some(1.0));
    }
}
