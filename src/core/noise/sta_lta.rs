//! Classic STA/LTA antitrigger.
//!
//! The characteristic function is the squared, de-meaned amplitude. STA and
//! LTA are trailing means over `sta` and `lta` seconds; the ratio is zero
//! until a full LTA window is available or when the LTA is zero. A trigger
//! turns on when the ratio rises above `upper` and off once it falls below
//! `lower`; everything between is excluded.

use super::WindowFilter;
use crate::config::{StaLtaConfig, TimeRange};
use crate::core::dsp::stats::mean;
use crate::core::stream::AlignedStream;
use crate::core::window::ExclusionReason;
use crate::error::{HvsrError, Result};

pub struct StaLtaFilter {
    config: StaLtaConfig,
}

impl StaLtaFilter {
    pub fn new(config: StaLtaConfig) -> Self {
        Self { config }
    }

    /// STA/LTA ratio for every sample
    pub fn ratio(samples: &[f64], sta_len: usize, lta_len: usize) -> Vec<f64> {
        let offset = mean(samples);
        let mut prefix = Vec::with_capacity(samples.len() + 1);
        prefix.push(0.0);
        for &x in samples {
            let d = x - offset;
            let last = prefix[prefix.len() - 1];
            prefix.push(last + d * d);
        }

        (0..samples.len())
            .map(|i| {
                if i + 1 < lta_len {
                    return 0.0;
                }
                let sta = (prefix[i + 1] - prefix[i + 1 - sta_len]) / sta_len as f64;
                let lta = (prefix[i + 1] - prefix[i + 1 - lta_len]) / lta_len as f64;
                if lta > 0.0 {
                    sta / lta
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// `[on, off)` sample intervals of the trigger
    pub fn triggers(ratio: &[f64], lower: f64, upper: f64) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        let mut on: Option<usize> = None;
        for (i, &r) in ratio.iter().enumerate() {
            match on {
                None if r > upper => on = Some(i),
                Some(start) if r < lower => {
                    out.push((start, i));
                    on = None;
                }
                _ => {}
            }
        }
        if let Some(start) = on {
            out.push((start, ratio.len()));
        }
        out
    }
}

impl WindowFilter for StaLtaFilter {
    fn name(&self) -> &'static str {
        "sta/lta"
    }

    fn reason(&self) -> ExclusionReason {
        ExclusionReason::StaLta
    }

    fn excluded_ranges(&self, stream: &AlignedStream) -> Result<Vec<TimeRange>> {
        let sr = stream.sample_rate;
        let sta_len = (self.config.sta * sr).round() as usize;
        let lta_len = (self.config.lta * sr).round() as usize;
        if sta_len == 0 || lta_len <= sta_len {
            return Err(HvsrError::InvalidConfig(format!(
                "sta/lta windows of {} and {} samples are unusable",
                sta_len, lta_len
            )));
        }
        if self.config.lower > self.config.upper {
            return Err(HvsrError::InvalidConfig(format!(
                "sta/lta lower threshold {} exceeds upper {}",
                self.config.lower, self.config.upper
            )));
        }

        let mut ranges = Vec::new();
        for channel in &stream.channels {
            let ratio = Self::ratio(&channel.samples, sta_len, lta_len);
            for (on, off) in Self::triggers(&ratio, self.config.lower, self.config.upper) {
                ranges.push(TimeRange::new(on as f64 / sr, off as f64 / sr));
            }
        }
        Ok(ranges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_signal_has_unit_ratio() {
        let samples: Vec<f64> = (0..2000).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let ratio = StaLtaFilter::ratio(&samples, 10, 100);
        assert_eq!(ratio[50], 0.0);
        assert!(ratio[100..].iter().all(|&r| (r - 1.0).abs() < 1e-9));
        assert!(StaLtaFilter::triggers(&ratio, 8.0, 16.0).is_empty());
    }

    #[test]
    fn test_burst_triggers() {
        let mut samples: Vec<f64> = (0..3000).map(|i| if i % 2 == 0 { 0.01 } else { -0.01 }).collect();
        for s in &mut samples[2000..2020] {
            *s *= 1000.0;
        }
        let ratio = StaLtaFilter::ratio(&samples, 10, 500);
        let triggers = StaLtaFilter::triggers(&ratio, 8.0, 16.0);
        assert_eq!(triggers.len(), 1);
        let (on, off) = triggers[0];
        assert!((2000..2010).contains(&on));
        assert!(off > 2020);
    }

    #[test]
    fn test_zero_signal_never_triggers() {
        let ratio = StaLtaFilter::ratio(&[0.0; 500], 5, 50);
        assert!(ratio.iter().all(|&r| r == 0.0));
    }

    #[test]
    fn test_open_trigger_runs_to_end() {
        let ratio = [0.0, 20.0, 10.0, 9.0];
        assert_eq!(StaLtaFilter::triggers(&ratio, 8.0, 16.0), vec![(1, 4)]);
    }
}
