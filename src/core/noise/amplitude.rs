// Amplitude-based sub-filters: saturation and noise threshold

use super::{runs, to_ranges, WindowFilter};
use crate::config::{NoiseThresholdConfig, SaturationConfig, TimeRange};
use crate::core::dsp::stats::{moving_average, peak_amplitude};
use crate::core::stream::AlignedStream;
use crate::core::window::ExclusionReason;
use crate::error::{HvsrError, Result};

fn check_fraction(name: &str, value: f64) -> Result<()> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(HvsrError::InvalidConfig(format!(
            "{} must lie in (0, 1], got {}",
            name, value
        )))
    }
}

fn min_run(seconds: f64, sample_rate: f64) -> usize {
    ((seconds * sample_rate).round() as usize).max(1)
}

/// Excludes runs where |x| sits near the channel's maximum
pub struct SaturationFilter {
    config: SaturationConfig,
}

impl SaturationFilter {
    pub fn new(config: SaturationConfig) -> Self {
        Self { config }
    }
}

impl WindowFilter for SaturationFilter {
    fn name(&self) -> &'static str {
        "saturation"
    }

    fn reason(&self) -> ExclusionReason {
        ExclusionReason::Saturation
    }

    fn excluded_ranges(&self, stream: &AlignedStream) -> Result<Vec<TimeRange>> {
        check_fraction("sat_percent", self.config.sat_percent)?;
        let min_len = min_run(self.config.min_win_size, stream.sample_rate);

        let mut ranges = Vec::new();
        for channel in &stream.channels {
            let threshold = self.config.sat_percent * peak_amplitude(&channel.samples);
            if threshold <= 0.0 {
                continue;
            }
            let flagged = runs(channel.samples.iter().map(|s| s.abs() > threshold), min_len);
            ranges.extend(to_ranges(&flagged, stream.sample_rate));
        }
        Ok(ranges)
    }
}

/// Excludes runs where the moving-average amplitude approaches its maximum
pub struct NoiseThresholdFilter {
    config: NoiseThresholdConfig,
}

impl NoiseThresholdFilter {
    pub fn new(config: NoiseThresholdConfig) -> Self {
        Self { config }
    }
}

impl WindowFilter for NoiseThresholdFilter {
    fn name(&self) -> &'static str {
        "noise threshold"
    }

    fn reason(&self) -> ExclusionReason {
        ExclusionReason::NoiseThreshold
    }

    fn excluded_ranges(&self, stream: &AlignedStream) -> Result<Vec<TimeRange>> {
        check_fraction("noise_percent", self.config.noise_percent)?;
        if !(self.config.lta > 0.0) {
            return Err(HvsrError::InvalidConfig(format!(
                "noise threshold lta must be positive, got {}",
                self.config.lta
            )));
        }
        let window = min_run(self.config.lta, stream.sample_rate);
        let min_len = min_run(self.config.min_win_size, stream.sample_rate);

        let mut ranges = Vec::new();
        for channel in &stream.channels {
            let abs: Vec<f64> = channel.samples.iter().map(|s| s.abs()).collect();
            let envelope = moving_average(&abs, window);
            let threshold = self.config.noise_percent * envelope.iter().copied().fold(0.0, f64::max);
            if threshold <= 0.0 {
                continue;
            }
            let flagged = runs(envelope.iter().map(|&v| v > threshold), min_len);
            ranges.extend(to_ranges(&flagged, stream.sample_rate));
        }
        Ok(ranges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::stream::{Component, SampleStream, Trace};
    use chrono::{TimeZone, Utc};

    fn aligned(z: Vec<f64>) -> AlignedStream {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let n = z.len();
        SampleStream::new(
            "test",
            vec![
                Trace::new(Component::Z, 10.0, t0, z),
                Trace::new(Component::N, 10.0, t0, vec![0.0; n]),
                Trace::new(Component::E, 10.0, t0, vec![0.0; n]),
            ],
        )
        .align()
        .unwrap()
    }

    #[test]
    fn test_clipped_segment_is_found() {
        let mut z: Vec<f64> = (0..1000).map(|i| (i as f64 * 0.3).sin() * 0.5).collect();
        for s in &mut z[400..430] {
            *s = 1.0;
        }
        let filter = SaturationFilter::new(SaturationConfig::default());
        let ranges = filter.excluded_ranges(&aligned(z)).unwrap();
        assert_eq!(ranges, vec![TimeRange::new(40.0, 43.0)]);
    }

    #[test]
    fn test_single_spike_is_too_short() {
        let mut z = vec![0.1; 1000];
        z[500] = 1.0;
        let filter = SaturationFilter::new(SaturationConfig::default());
        assert!(filter.excluded_ranges(&aligned(z)).unwrap().is_empty());
    }

    #[test]
    fn test_noisy_stretch_is_found() {
        let mut z: Vec<f64> = (0..3000).map(|i| if i % 2 == 0 { 0.1 } else { -0.1 }).collect();
        for s in &mut z[1500..1800] {
            *s *= 20.0;
        }
        let filter = NoiseThresholdFilter::new(NoiseThresholdConfig {
            lta: 5.0,
            ..NoiseThresholdConfig::default()
        });
        let ranges = filter.excluded_ranges(&aligned(z)).unwrap();
        assert_eq!(ranges.len(), 1);
        assert!(ranges[0].start >= 145.0 && ranges[0].end <= 185.0);
    }

    #[test]
    fn test_bad_fraction_fails() {
        let filter = SaturationFilter::new(SaturationConfig {
            sat_percent: 1.5,
            ..SaturationConfig::default()
        });
        assert!(filter.excluded_ranges(&aligned(vec![1.0; 100])).is_err());
    }
}
