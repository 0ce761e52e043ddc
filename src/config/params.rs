// src/config/params.rs
//
// Per-stage processing parameters. Each stage receives its own struct by
// value; no stage reads another stage's configuration.

use serde::{Deserialize, Serialize};

use crate::core::combine::CombineMethod;
use crate::core::dsp::smoothing::SmoothingMethod;
use crate::error::{HvsrError, Result};

/// Frequency band `[low, high]` in Hz
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub low: f64,
    pub high: f64,
}

impl Band {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, freq: f64) -> bool {
        freq >= self.low && freq <= self.high
    }

    /// Intersect with `outer`, so the result always lies inside it
    pub fn clip_to(&self, outer: &Band) -> Band {
        let low = self.low.max(outer.low).min(outer.high);
        let high = self.high.min(outer.high).max(low);
        Band { low, high }
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        if !(self.low.is_finite() && self.high.is_finite()) || self.low <= 0.0 || self.low >= self.high {
            return Err(HvsrError::InvalidConfig(format!(
                "{} must satisfy 0 < low < high, got [{}, {}]",
                name, self.low, self.high
            )));
        }
        Ok(())
    }
}

impl Default for Band {
    fn default() -> Self {
        Self { low: 0.4, high: 40.0 }
    }
}

/// Time range in seconds relative to the trimmed recording start
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Half-open overlap test against `[start, end)`
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        self.start < end && start < self.end
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// SpectralWindower parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window length in seconds
    pub window_length: f64,
    /// Fractional overlap between consecutive windows, in [0, 1)
    pub overlap: f64,
    /// Number of log-spaced output bins; `None` keeps native FFT bins
    pub resample_bins: Option<usize>,
    pub smoothing: SmoothingMethod,
    /// Analysis band
    pub band: Band,
    /// Azimuths (degrees clockwise from north) for rotated radial curves
    pub azimuths: Vec<u16>,
    /// Relative window-count difference between channels that triggers a warning
    pub mismatch_tolerance: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_length: 60.0,
            overlap: 0.0,
            resample_bins: Some(512),
            smoothing: SmoothingMethod::KonnoOhmachi { bandwidth: 40.0 },
            band: Band::default(),
            azimuths: Vec::new(),
            mismatch_tolerance: 0.05,
        }
    }
}

impl WindowConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.window_length.is_finite() && self.window_length > 0.0) {
            return Err(HvsrError::InvalidConfig(format!(
                "window_length must be positive, got {}",
                self.window_length
            )));
        }
        if !(0.0..1.0).contains(&self.overlap) {
            return Err(HvsrError::InvalidConfig(format!(
                "overlap must lie in [0, 1), got {}",
                self.overlap
            )));
        }
        if matches!(self.resample_bins, Some(n) if n < 2) {
            return Err(HvsrError::InvalidConfig(
                "resample_bins must be at least 2".to_string(),
            ));
        }
        if self.mismatch_tolerance < 0.0 {
            return Err(HvsrError::InvalidConfig(
                "mismatch_tolerance must be non-negative".to_string(),
            ));
        }
        if self.azimuths.iter().any(|&a| a >= 360) {
            return Err(HvsrError::InvalidConfig(
                "azimuths must lie in [0, 360)".to_string(),
            ));
        }
        self.smoothing.validate()?;
        self.band.validate("band")
    }

    /// Seconds between consecutive window starts
    pub fn step(&self) -> f64 {
        self.window_length * (1.0 - self.overlap)
    }
}

/// Short-term/long-term average antitrigger
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaLtaConfig {
    pub sta: f64,
    pub lta: f64,
    /// Trigger turns off below this ratio
    pub lower: f64,
    /// Trigger turns on above this ratio
    pub upper: f64,
}

impl Default for StaLtaConfig {
    fn default() -> Self {
        Self {
            sta: 1.0,
            lta: 30.0,
            lower: 8.0,
            upper: 16.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SaturationConfig {
    /// Fraction of the channel maximum counted as saturated
    pub sat_percent: f64,
    /// Minimum run length in seconds
    pub min_win_size: f64,
}

impl Default for SaturationConfig {
    fn default() -> Self {
        Self {
            sat_percent: 0.995,
            min_win_size: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseThresholdConfig {
    /// Fraction of the maximum moving average counted as noisy
    pub noise_percent: f64,
    /// Moving-average window in seconds
    pub lta: f64,
    pub min_win_size: f64,
}

impl Default for NoiseThresholdConfig {
    fn default() -> Self {
        Self {
            noise_percent: 0.80,
            lta: 30.0,
            min_win_size: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrimConfig {
    pub warmup_time: f64,
    pub cooldown_time: f64,
}

/// NoiseGate parameters; `None` disables a sub-filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseGateConfig {
    pub manual: Vec<TimeRange>,
    pub sta_lta: Option<StaLtaConfig>,
    pub noise_threshold: Option<NoiseThresholdConfig>,
    pub saturation: Option<SaturationConfig>,
    pub trim: Option<TrimConfig>,
}

impl Default for NoiseGateConfig {
    fn default() -> Self {
        Self {
            manual: Vec::new(),
            sta_lta: Some(StaLtaConfig::default()),
            noise_threshold: None,
            saturation: None,
            trim: None,
        }
    }
}

impl NoiseGateConfig {
    /// Gate with every sub-filter disabled
    pub fn disabled() -> Self {
        Self {
            manual: Vec::new(),
            sta_lta: None,
            noise_threshold: None,
            saturation: None,
            trim: None,
        }
    }
}

/// RMSE cut-off, either absolute or as a percentile of the RMSE distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierRule {
    pub threshold: f64,
    pub use_percentile: bool,
}

impl OutlierRule {
    pub fn percentile(p: f64) -> Self {
        Self {
            threshold: p,
            use_percentile: true,
        }
    }

    pub fn absolute(rmse: f64) -> Self {
        Self {
            threshold: rmse,
            use_percentile: false,
        }
    }
}

impl Default for OutlierRule {
    fn default() -> Self {
        Self::percentile(98.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    /// Per-channel pass over the raw PSDs
    pub psd: Option<OutlierRule>,
    /// Post-hoc pass over the per-window H/V curves
    pub hv: Option<OutlierRule>,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            psd: None,
            hv: Some(OutlierRule::default()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveConfig {
    pub method: CombineMethod,
}

/// How the single best peak is picked from the candidates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PeakSelection {
    MaxAmplitude,
    NearestFrequency(f64),
    Score,
}

impl Default for PeakSelection {
    fn default() -> Self {
        Self::MaxAmplitude
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakConfig {
    /// Peak-search sub-band, clipped to the analysis band before use
    pub peak_band: Band,
    pub selection: PeakSelection,
    /// Candidates must exceed this H/V amplitude
    pub min_amplitude: f64,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            peak_band: Band::default(),
            selection: PeakSelection::default(),
            min_amplitude: 1.0,
        }
    }
}

/// Complete processing configuration for one analysis run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HvsrConfig {
    pub window: WindowConfig,
    pub noise: NoiseGateConfig,
    pub outliers: OutlierConfig,
    pub curve: CurveConfig,
    pub peaks: PeakConfig,
}

impl HvsrConfig {
    pub fn validate(&self) -> Result<()> {
        self.window.validate()?;
        self.peaks.peak_band.validate("peak_band")?;
        for rule in [self.outliers.psd, self.outliers.hv].into_iter().flatten() {
            if rule.use_percentile && !(0.0..=100.0).contains(&rule.threshold) {
                return Err(HvsrError::InvalidConfig(format!(
                    "outlier percentile must lie in [0, 100], got {}",
                    rule.threshold
                )));
            }
            if !rule.use_percentile && rule.threshold < 0.0 {
                return Err(HvsrError::InvalidConfig(
                    "outlier RMSE threshold must be non-negative".to_string(),
                ));
            }
        }
        if let Some(sl) = &self.noise.sta_lta {
            if sl.sta <= 0.0 || sl.lta <= sl.sta || sl.lower > sl.upper {
                return Err(HvsrError::InvalidConfig(format!(
                    "sta/lta needs 0 < sta < lta and lower <= upper, got {:?}",
                    sl
                )));
            }
        }
        Ok(())
    }

    /// Peak-search band clipped into the analysis band
    pub fn effective_peak_band(&self) -> Band {
        self.peaks.peak_band.clip_to(&self.window.band)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}
