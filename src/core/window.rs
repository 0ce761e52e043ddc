// src/core/window.rs
//
// Time windows, the shared frequency axis and the window table that every
// stage after the windower reads and narrows.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TimeRange;
use crate::error::{HvsrError, Result};

/// Identifies one H/V curve family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum CurveId {
    /// Both measured horizontals combined
    Hv,
    /// Radial component rotated to this azimuth (degrees from north)
    Azimuth(u16),
}

impl fmt::Display for CurveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurveId::Hv => write!(f, "HV"),
            CurveId::Azimuth(deg) => write!(f, "R{:03}", deg),
        }
    }
}

impl From<CurveId> for String {
    fn from(id: CurveId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for CurveId {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        if value == "HV" {
            return Ok(CurveId::Hv);
        }
        value
            .strip_prefix('R')
            .and_then(|deg| deg.parse::<u16>().ok())
            .map(CurveId::Azimuth)
            .ok_or_else(|| format!("unknown curve id: {}", value))
    }
}

/// Why a window stopped being used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExclusionReason {
    DataGap,
    Manual,
    StaLta,
    NoiseThreshold,
    Saturation,
    WarmupCooldown,
    PsdOutlier,
    HvOutlier,
}

impl ExclusionReason {
    pub fn description(&self) -> &'static str {
        match self {
            ExclusionReason::DataGap => "data gap",
            ExclusionReason::Manual => "manual exclusion",
            ExclusionReason::StaLta => "STA/LTA trigger",
            ExclusionReason::NoiseThreshold => "noise threshold",
            ExclusionReason::Saturation => "saturation",
            ExclusionReason::WarmupCooldown => "warmup/cooldown",
            ExclusionReason::PsdOutlier => "PSD outlier",
            ExclusionReason::HvOutlier => "H/V outlier",
        }
    }
}

/// Strictly increasing frequencies shared by every curve of an analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrequencyAxis(Vec<f64>);

impl FrequencyAxis {
    pub fn new(freqs: Vec<f64>) -> Result<Self> {
        if freqs.len() < 2 {
            return Err(HvsrError::InvalidConfig(format!(
                "frequency axis needs at least 2 bins, got {}",
                freqs.len()
            )));
        }
        if freqs.windows(2).any(|w| !(w[1] > w[0])) || freqs[0] <= 0.0 {
            return Err(HvsrError::InvalidConfig(
                "frequency axis must be positive and strictly increasing".to_string(),
            ));
        }
        Ok(Self(freqs))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn low(&self) -> f64 {
        self.0[0]
    }

    pub fn high(&self) -> f64 {
        self.0[self.0.len() - 1]
    }

    pub fn nearest_index(&self, freq: f64) -> usize {
        self.0
            .iter()
            .enumerate()
            .min_by(|a, b| {
                (a.1 - freq)
                    .abs()
                    .partial_cmp(&(b.1 - freq).abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Width of each bin: distance to the next frequency, the last bin reusing the previous width
    pub fn bin_widths(&self) -> Vec<f64> {
        let n = self.0.len();
        (0..n)
            .map(|j| {
                if j + 1 < n {
                    self.0[j + 1] - self.0[j]
                } else {
                    self.0[j] - self.0[j - 1]
                }
            })
            .collect()
    }
}

/// Per-channel power spectra of one window, in dB
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelPsd {
    pub z: Vec<f64>,
    pub n: Vec<f64>,
    pub e: Vec<f64>,
    /// Rotated radial spectra by azimuth
    #[serde(default)]
    pub radial: BTreeMap<u16, Vec<f64>>,
}

/// One fixed-length time window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub index: usize,
    /// Seconds from the aligned stream start
    pub start: f64,
    pub end: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub psd: ChannelPsd,
    pub hv: BTreeMap<CurveId, Vec<f64>>,
    pub use_window: bool,
    /// Every sub-filter that flagged this window, in application order
    pub exclusions: Vec<ExclusionReason>,
}

impl Window {
    pub fn new(index: usize, start: f64, end: f64, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            index,
            start,
            end,
            start_time,
            end_time,
            psd: ChannelPsd::default(),
            hv: BTreeMap::new(),
            use_window: true,
            exclusions: Vec::new(),
        }
    }

    /// Clear the use flag; returns `true` if the window was in use before
    pub fn exclude(&mut self, reason: ExclusionReason) -> bool {
        let was_used = self.use_window;
        self.use_window = false;
        if !self.exclusions.contains(&reason) {
            self.exclusions.push(reason);
        }
        was_used
    }

    pub fn curve(&self, id: CurveId) -> Option<&[f64]> {
        self.hv.get(&id).map(|c| c.as_slice())
    }

    /// Excluded only for `reason` (or not at all)
    pub(crate) fn excluded_only_by(&self, reason: ExclusionReason) -> bool {
        self.exclusions.iter().all(|&r| r == reason)
    }
}

/// All windows of one recording, ordered by start time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowTable {
    pub frequencies: FrequencyAxis,
    /// Window length in seconds
    pub window_length: f64,
    pub windows: Vec<Window>,
}

impl WindowTable {
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn used(&self) -> impl Iterator<Item = &Window> {
        self.windows.iter().filter(|w| w.use_window)
    }

    pub fn used_count(&self) -> usize {
        self.used().count()
    }

    pub fn use_mask(&self) -> Vec<bool> {
        self.windows.iter().map(|w| w.use_window).collect()
    }

    /// Curves of `id` from windows still in use
    pub fn used_curves(&self, id: CurveId) -> Vec<&[f64]> {
        self.used().filter_map(|w| w.curve(id)).collect()
    }

    pub fn curve_ids(&self) -> Vec<CurveId> {
        self.windows
            .first()
            .map(|w| w.hv.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Flag every window overlapping `range`; returns how many were newly excluded
    pub fn exclude_overlapping(&mut self, range: &TimeRange, reason: ExclusionReason) -> usize {
        self.windows
            .iter_mut()
            .filter(|w| range.overlaps(w.start, w.end))
            .map(|w| w.exclude(reason))
            .filter(|&newly| newly)
            .count()
    }

    /// Explicit full reset: every window back in use, attributions cleared
    pub fn reset(&mut self) {
        for w in &mut self.windows {
            w.use_window = true;
            w.exclusions.clear();
        }
    }

    /// Exclusion counts per reason (a window may count under several reasons)
    pub fn exclusion_summary(&self) -> BTreeMap<String, usize> {
        let mut summary = BTreeMap::new();
        for w in &self.windows {
            for r in &w.exclusions {
                *summary.entry(r.description().to_string()).or_insert(0) += 1;
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    pub(crate) fn table(n: usize) -> WindowTable {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let windows = (0..n)
            .map(|i| {
                let start = i as f64 * 10.0;
                Window::new(i, start, start + 10.0, t0, t0)
            })
            .collect();
        WindowTable {
            frequencies: FrequencyAxis::new(vec![1.0, 2.0, 3.0]).unwrap(),
            window_length: 10.0,
            windows,
        }
    }

    #[test]
    fn test_curve_id_string_round_trip() {
        for id in [CurveId::Hv, CurveId::Azimuth(45)] {
            let s: String = id.into();
            assert_eq!(CurveId::try_from(s).unwrap(), id);
        }
        assert_eq!(CurveId::Azimuth(5).to_string(), "R005");
        assert!(CurveId::try_from("bogus".to_string()).is_err());
    }

    #[test]
    fn test_exclusion_never_widens() {
        let mut table = table(5);
        let newly = table.exclude_overlapping(&TimeRange::new(5.0, 25.0), ExclusionReason::Manual);
        assert_eq!(newly, 3);
        let again = table.exclude_overlapping(&TimeRange::new(0.0, 15.0), ExclusionReason::StaLta);
        assert_eq!(again, 0);
        assert_eq!(table.used_count(), 2);
        assert_eq!(
            table.windows[0].exclusions,
            vec![ExclusionReason::Manual, ExclusionReason::StaLta]
        );
    }

    #[test]
    fn test_range_touching_boundary_does_not_overlap() {
        let mut table = table(3);
        table.exclude_overlapping(&TimeRange::new(10.0, 20.0), ExclusionReason::Manual);
        assert_eq!(table.use_mask(), vec![true, false, true]);
    }

    #[test]
    fn test_reset_restores_all() {
        let mut table = table(3);
        table.exclude_overlapping(&TimeRange::new(0.0, 30.0), ExclusionReason::Manual);
        table.reset();
        assert_eq!(table.used_count(), 3);
        assert!(table.windows.iter().all(|w| w.exclusions.is_empty()));
    }

    #[test]
    fn test_axis_rejects_unsorted() {
        assert!(FrequencyAxis::new(vec![1.0, 1.0, 2.0]).is_err());
        let axis = FrequencyAxis::new(vec![1.0, 2.0, 4.0]).unwrap();
        assert_eq!(axis.bin_widths(), vec![1.0, 2.0, 2.0]);
        assert_eq!(axis.nearest_index(3.1), 2);
    }
}
