//! Welch power spectral density with windowing

use std::sync::Arc;

use realfft::{RealFftPlanner, RealToComplex};

use super::windows::{create_window, WindowType};
use crate::error::{HvsrError, Result};

/// Fraction of each Welch sub-segment shared with the next one
const SEGMENT_OVERLAP: f64 = 0.75;

/// Largest power of two that is <= `n` (n >= 1)
pub fn prev_power_of_two(n: usize) -> usize {
    if n == 0 {
        return 1;
    }
    1 << (usize::BITS - 1 - n.leading_zeros())
}

/// Welch PSD estimator for fixed-length windows.
///
/// Each window is split into sub-segments of `nfft` samples (a quarter of
/// the window rounded down to a power of two) with 75% overlap. Segments
/// are linearly detrended and tapered before the FFT; the one-sided
/// densities are averaged.
pub struct PsdEstimator {
    nfft: usize,
    step: usize,
    sample_rate: f64,
    window: Vec<f64>,
    window_power: f64,
    fft: Arc<dyn RealToComplex<f64>>,
}

impl PsdEstimator {
    pub fn new(window_samples: usize, sample_rate: f64, window_type: WindowType) -> Self {
        let target = (window_samples / 4).max(16).min(window_samples.max(1));
        let nfft = prev_power_of_two(target).max(2);
        let step = ((nfft as f64 * (1.0 - SEGMENT_OVERLAP)).round() as usize).max(1);
        let window = create_window(nfft, window_type);
        let window_power = window.iter().map(|w| w * w).sum::<f64>();
        let mut planner = RealFftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(nfft);

        Self {
            nfft,
            step,
            sample_rate,
            window,
            window_power,
            fft,
        }
    }

    pub fn nfft(&self) -> usize {
        self.nfft
    }

    /// One-sided frequency bins, DC through Nyquist
    pub fn frequencies(&self) -> Vec<f64> {
        let df = self.sample_rate / self.nfft as f64;
        (0..=self.nfft / 2).map(|k| k as f64 * df).collect()
    }

    /// Averaged one-sided power spectral density of `samples` (linear units²/Hz)
    pub fn welch(&self, samples: &[f64]) -> Result<Vec<f64>> {
        let n_freq = self.nfft / 2 + 1;
        let mut accum = vec![0.0; n_freq];
        if samples.len() < self.nfft {
            return Err(HvsrError::Fft(format!(
                "segment of {} samples is shorter than nfft {}",
                samples.len(),
                self.nfft
            )));
        }

        let mut input = self.fft.make_input_vec();
        let mut spectrum = self.fft.make_output_vec();
        let scale = 1.0 / (self.sample_rate * self.window_power);
        let mut segments = 0usize;

        let mut start = 0;
        while start + self.nfft <= samples.len() {
            let segment = &samples[start..start + self.nfft];
            let (slope, intercept) = linear_fit(segment);
            for (i, (dst, &s)) in input.iter_mut().zip(segment).enumerate() {
                *dst = (s - (slope * i as f64 + intercept)) * self.window[i];
            }

            self.fft
                .process(&mut input, &mut spectrum)
                .map_err(|e| HvsrError::Fft(e.to_string()))?;

            for (k, (a, c)) in accum.iter_mut().zip(spectrum.iter()).enumerate() {
                let mut p = c.norm_sqr() * scale;
                if k != 0 && !(self.nfft % 2 == 0 && k == self.nfft / 2) {
                    p *= 2.0;
                }
                *a += p;
            }
            segments += 1;
            start += self.step;
        }

        let inv = 1.0 / segments as f64;
        for v in &mut accum {
            *v *= inv;
        }
        Ok(accum)
    }
}

/// Least-squares line through `(i, data[i])`
fn linear_fit(data: &[f64]) -> (f64, f64) {
    let n = data.len() as f64;
    if data.len() < 2 {
        return (0.0, data.first().copied().unwrap_or(0.0));
    }
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = data.iter().sum::<f64>() / n;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, &y) in data.iter().enumerate() {
        let dx = i as f64 - mean_x;
        sxy += dx * (y - mean_y);
        sxx += dx * dx;
    }
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    (slope, mean_y - slope * mean_x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_prev_power_of_two() {
        assert_eq!(prev_power_of_two(1), 1);
        assert_eq!(prev_power_of_two(1500), 1024);
        assert_eq!(prev_power_of_two(1024), 1024);
    }

    #[test]
    fn test_welch_detects_sine() {
        let fs = 100.0;
        let samples: Vec<f64> = (0..6000)
            .map(|i| (2.0 * PI * 5.0 * i as f64 / fs).sin())
            .collect();
        let estimator = PsdEstimator::new(samples.len(), fs, WindowType::Hann);
        let freqs = estimator.frequencies();
        let psd = estimator.welch(&samples).unwrap();

        assert_eq!(psd.len(), freqs.len());
        let peak = psd
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert!((freqs[peak] - 5.0).abs() < 0.2);
    }

    #[test]
    fn test_welch_removes_trend() {
        let samples: Vec<f64> = (0..2048).map(|i| 3.0 + 0.01 * i as f64).collect();
        let estimator = PsdEstimator::new(samples.len(), 50.0, WindowType::Hann);
        let psd = estimator.welch(&samples).unwrap();
        assert!(psd.iter().all(|&p| p < 1e-12));
    }
}
