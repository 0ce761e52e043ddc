// src/config/profiles.rs
//
// Site-condition presets and a fluent builder over HvsrConfig

use serde::{Deserialize, Serialize};

use super::params::{
    Band, HvsrConfig, NoiseThresholdConfig, OutlierRule, PeakSelection, SaturationConfig,
    StaLtaConfig, TimeRange, TrimConfig,
};
use crate::core::combine::CombineMethod;
use crate::core::dsp::smoothing::SmoothingMethod;

/// Preset configurations for common recording conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingPreset {
    /// Balanced defaults for free-field ambient noise
    Standard,
    /// Deep sediment sites where f0 may sit well below 1 Hz
    LongPeriod,
    /// Urban recordings with traffic transients and clipping
    Urban,
    /// Short survey recordings (10-20 minutes)
    Quick,
}

impl ProcessingPreset {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "standard" => Some(Self::Standard),
            "longperiod" | "long-period" | "long_period" => Some(Self::LongPeriod),
            "urban" => Some(Self::Urban),
            "quick" => Some(Self::Quick),
            _ => None,
        }
    }

    pub fn all() -> Vec<Self> {
        vec![Self::Standard, Self::LongPeriod, Self::Urban, Self::Quick]
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Standard => "Balanced defaults for free-field ambient noise",
            Self::LongPeriod => "Long windows and a low band for deep sediments",
            Self::Urban => "Aggressive transient and saturation rejection",
            Self::Quick => "Short windows for short survey recordings",
        }
    }

    pub fn config(&self) -> HvsrConfig {
        match self {
            Self::Standard => HvsrConfig::default(),
            Self::LongPeriod => long_period(),
            Self::Urban => urban(),
            Self::Quick => quick(),
        }
    }
}

fn long_period() -> HvsrConfig {
    let mut config = HvsrConfig::default();
    config.window.window_length = 120.0;
    config.window.overlap = 0.5;
    config.window.band = Band::new(0.1, 20.0);
    config.peaks.peak_band = Band::new(0.1, 10.0);
    // Long LTA so slow microseism swells don't trip the trigger
    config.noise.sta_lta = Some(StaLtaConfig {
        sta: 5.0,
        lta: 120.0,
        ..StaLtaConfig::default()
    });
    config
}

fn urban() -> HvsrConfig {
    let mut config = HvsrConfig::default();
    config.window.window_length = 30.0;
    config.window.overlap = 0.25;
    config.window.band = Band::new(0.5, 40.0);
    config.noise.sta_lta = Some(StaLtaConfig {
        lower: 2.0,
        upper: 4.0,
        ..StaLtaConfig::default()
    });
    config.noise.saturation = Some(SaturationConfig::default());
    config.noise.noise_threshold = Some(NoiseThresholdConfig::default());
    config.noise.trim = Some(TrimConfig {
        warmup_time: 30.0,
        cooldown_time: 30.0,
    });
    config.outliers.psd = Some(OutlierRule::percentile(95.0));
    config
}

fn quick() -> HvsrConfig {
    let mut config = HvsrConfig::default();
    config.window.window_length = 20.0;
    config.window.overlap = 0.5;
    config.window.resample_bins = Some(256);
    config.window.band = Band::new(1.0, 40.0);
    config.peaks.peak_band = Band::new(1.0, 40.0);
    config
}

/// Builder for custom configurations
pub struct ConfigBuilder {
    config: HvsrConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: HvsrConfig::default(),
        }
    }

    pub fn from_preset(preset: ProcessingPreset) -> Self {
        Self {
            config: preset.config(),
        }
    }

    pub fn from_config(config: HvsrConfig) -> Self {
        Self { config }
    }

    pub fn window_length(mut self, seconds: f64) -> Self {
        self.config.window.window_length = seconds;
        self
    }

    pub fn overlap(mut self, fraction: f64) -> Self {
        self.config.window.overlap = fraction;
        self
    }

    pub fn resample_bins(mut self, bins: Option<usize>) -> Self {
        self.config.window.resample_bins = bins;
        self
    }

    pub fn smoothing(mut self, method: SmoothingMethod) -> Self {
        self.config.window.smoothing = method;
        self
    }

    pub fn band(mut self, low: f64, high: f64) -> Self {
        self.config.window.band = Band::new(low, high);
        self
    }

    pub fn peak_band(mut self, low: f64, high: f64) -> Self {
        self.config.peaks.peak_band = Band::new(low, high);
        self
    }

    pub fn azimuths(mut self, azimuths: Vec<u16>) -> Self {
        self.config.window.azimuths = azimuths;
        self
    }

    pub fn combine(mut self, method: CombineMethod) -> Self {
        self.config.curve.method = method;
        self
    }

    pub fn exclude(mut self, start: f64, end: f64) -> Self {
        self.config.noise.manual.push(TimeRange::new(start, end));
        self
    }

    pub fn sta_lta(mut self, sta_lta: Option<StaLtaConfig>) -> Self {
        self.config.noise.sta_lta = sta_lta;
        self
    }

    pub fn saturation(mut self, saturation: Option<SaturationConfig>) -> Self {
        self.config.noise.saturation = saturation;
        self
    }

    pub fn noise_threshold(mut self, threshold: Option<NoiseThresholdConfig>) -> Self {
        self.config.noise.noise_threshold = threshold;
        self
    }

    pub fn trim(mut self, warmup_time: f64, cooldown_time: f64) -> Self {
        self.config.noise.trim = Some(TrimConfig {
            warmup_time,
            cooldown_time,
        });
        self
    }

    pub fn psd_outliers(mut self, rule: Option<OutlierRule>) -> Self {
        self.config.outliers.psd = rule;
        self
    }

    pub fn hv_outliers(mut self, rule: Option<OutlierRule>) -> Self {
        self.config.outliers.hv = rule;
        self
    }

    pub fn selection(mut self, selection: PeakSelection) -> Self {
        self.config.peaks.selection = selection;
        self
    }

    pub fn min_peak_amplitude(mut self, amplitude: f64) -> Self {
        self.config.peaks.min_amplitude = amplitude;
        self
    }

    pub fn build(self) -> HvsrConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        for preset in ProcessingPreset::all() {
            assert!(preset.config().validate().is_ok(), "{:?}", preset);
        }
    }

    #[test]
    fn test_preset_lookup() {
        assert_eq!(ProcessingPreset::from_name("Urban"), Some(ProcessingPreset::Urban));
        assert_eq!(ProcessingPreset::from_name("long-period"), Some(ProcessingPreset::LongPeriod));
        assert_eq!(ProcessingPreset::from_name("bogus"), None);
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::from_preset(ProcessingPreset::Quick)
            .window_length(45.0)
            .combine(CombineMethod::VectorSummation)
            .exclude(10.0, 20.0)
            .hv_outliers(None)
            .build();

        assert_eq!(config.window.window_length, 45.0);
        assert_eq!(config.curve.method, CombineMethod::VectorSummation);
        assert_eq!(config.noise.manual, vec![TimeRange::new(10.0, 20.0)]);
        assert!(config.outliers.hv.is_none());
        assert_eq!(config.window.resample_bins, Some(256));
    }
}
