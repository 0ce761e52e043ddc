// Warmup and cooldown trimming

use super::WindowFilter;
use crate::config::{TimeRange, TrimConfig};
use crate::core::stream::AlignedStream;
use crate::core::window::ExclusionReason;
use crate::error::{HvsrError, Result};

pub struct TrimFilter {
    config: TrimConfig,
}

impl TrimFilter {
    pub fn new(config: TrimConfig) -> Self {
        Self { config }
    }

    pub fn ranges_for(&self, duration: f64) -> Result<Vec<TimeRange>> {
        let TrimConfig {
            warmup_time,
            cooldown_time,
        } = self.config;
        if !(warmup_time >= 0.0 && cooldown_time >= 0.0) {
            return Err(HvsrError::InvalidConfig(format!(
                "warmup/cooldown must be non-negative, got {} / {}",
                warmup_time, cooldown_time
            )));
        }

        let mut ranges = Vec::new();
        if warmup_time > 0.0 {
            ranges.push(TimeRange::new(0.0, warmup_time.min(duration)));
        }
        if cooldown_time > 0.0 {
            ranges.push(TimeRange::new((duration - cooldown_time).max(0.0), duration));
        }
        Ok(ranges)
    }
}

impl WindowFilter for TrimFilter {
    fn name(&self) -> &'static str {
        "warmup/cooldown"
    }

    fn reason(&self) -> ExclusionReason {
        ExclusionReason::WarmupCooldown
    }

    fn excluded_ranges(&self, stream: &AlignedStream) -> Result<Vec<TimeRange>> {
        self.ranges_for(stream.duration_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_ends() {
        let filter = TrimFilter::new(TrimConfig {
            warmup_time: 30.0,
            cooldown_time: 20.0,
        });
        assert_eq!(
            filter.ranges_for(600.0).unwrap(),
            vec![TimeRange::new(0.0, 30.0), TimeRange::new(580.0, 600.0)]
        );
    }

    #[test]
    fn test_zero_is_noop() {
        let filter = TrimFilter::new(TrimConfig::default());
        assert!(filter.ranges_for(600.0).unwrap().is_empty());
    }

    #[test]
    fn test_negative_fails() {
        let filter = TrimFilter::new(TrimConfig {
            warmup_time: -1.0,
            cooldown_time: 0.0,
        });
        assert!(filter.ranges_for(600.0).is_err());
    }
}
