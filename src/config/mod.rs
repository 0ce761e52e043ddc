//! Configuration module for hvsrcheckr

mod params;
mod profiles;

pub use params::{
    Band, CurveConfig, HvsrConfig, NoiseGateConfig, NoiseThresholdConfig, OutlierConfig,
    OutlierRule, PeakConfig, PeakSelection, SaturationConfig, StaLtaConfig, TimeRange,
    TrimConfig, WindowConfig,
};
pub use profiles::{ConfigBuilder, ProcessingPreset};
