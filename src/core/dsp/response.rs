//! Pole/zero instrument response used to calibrate channel spectra

use std::f64::consts::PI;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Smallest |H(f)|² used when dividing out the response
const MIN_POWER_GAIN: f64 = 1e-30;

/// Instrument response in pole/zero form (Laplace, rad/s)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelResponse {
    pub poles: Vec<Complex64>,
    pub zeros: Vec<Complex64>,
    /// A0 normalization factor of the pole/zero stage
    pub normalization: f64,
    /// Overall sensitivity (counts per physical unit)
    pub sensitivity: f64,
}

impl ChannelResponse {
    /// Flat response with the given sensitivity
    pub fn flat(sensitivity: f64) -> Self {
        Self {
            poles: Vec::new(),
            zeros: Vec::new(),
            normalization: 1.0,
            sensitivity,
        }
    }

    /// Complex response at `freq` Hz
    pub fn evaluate(&self, freq: f64) -> Complex64 {
        let s = Complex64::new(0.0, 2.0 * PI * freq);
        let num = self.zeros.iter().fold(Complex64::new(1.0, 0.0), |acc, z| acc * (s - z));
        let den = self.poles.iter().fold(Complex64::new(1.0, 0.0), |acc, p| acc * (s - p));
        let h = if den.norm_sqr() > 0.0 { num / den } else { Complex64::new(0.0, 0.0) };
        h * self.normalization * self.sensitivity
    }

    /// |H(f)|²
    pub fn power_gain(&self, freq: f64) -> f64 {
        self.evaluate(freq).norm_sqr()
    }

    /// Divide a power spectrum by |H(f)|² in place
    pub fn remove_from(&self, freqs: &[f64], psd: &mut [f64]) {
        for (p, &f) in psd.iter_mut().zip(freqs) {
            *p /= self.power_gain(f).max(MIN_POWER_GAIN);
        }
    }
}
