//! Frequency-domain smoothing of spectra sampled on an increasing axis

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::{HvsrError, Result};

/// Smoothing applied to each window's spectra after resampling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SmoothingMethod {
    None,
    /// Konno & Ohmachi (1998) log-symmetric window with bandwidth coefficient `b`
    KonnoOhmachi { bandwidth: f64 },
    /// Boxcar of fixed width in Hz
    Constant { width_hz: f64 },
    /// Boxcar whose width is a percentage of the centre frequency
    Proportional { percent: f64 },
}

impl SmoothingMethod {
    pub fn validate(&self) -> Result<()> {
        let (name, value) = match *self {
            SmoothingMethod::None => return Ok(()),
            SmoothingMethod::KonnoOhmachi { bandwidth } => ("bandwidth", bandwidth),
            SmoothingMethod::Constant { width_hz } => ("width_hz", width_hz),
            SmoothingMethod::Proportional { percent } => ("percent", percent),
        };
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(HvsrError::InvalidConfig(format!(
                "smoothing {} must be positive, got {}",
                name, value
            )))
        }
    }

    /// Mirror a frequency about an edge in the space the kernel is defined in
    fn mirror(&self, edge: f64, f: f64) -> f64 {
        match self {
            SmoothingMethod::Constant { .. } => 2.0 * edge - f,
            _ => edge * edge / f,
        }
    }

    /// Kernel weight of `f` for a window centred on `fc`; `None` outside the support
    fn weight(&self, f: f64, fc: f64) -> Option<f64> {
        match *self {
            SmoothingMethod::None => (f == fc).then_some(1.0),
            SmoothingMethod::KonnoOhmachi { bandwidth } => {
                let x = bandwidth * (f / fc).log10();
                if x.abs() >= PI {
                    None
                } else if x.abs() < 1e-9 {
                    Some(1.0)
                } else {
                    Some((x.sin() / x).powi(4))
                }
            }
            SmoothingMethod::Constant { width_hz } => {
                ((f - fc).abs() <= width_hz / 2.0).then_some(1.0)
            }
            SmoothingMethod::Proportional { percent } => {
                ((f - fc).abs() <= fc * percent / 200.0).then_some(1.0)
            }
        }
    }
}

/// Smooth `values` sampled at increasing `freqs`.
///
/// Both ends are reflect-padded (mirrored about the first and last
/// frequency) so the kernel sees a full neighbourhood at the band edges.
pub fn smooth(freqs: &[f64], values: &[f64], method: &SmoothingMethod) -> Vec<f64> {
    let n = freqs.len().min(values.len());
    if n < 2 || matches!(method, SmoothingMethod::None) {
        return values.to_vec();
    }

    let pad = n - 1;
    let mut pf = Vec::with_capacity(n + 2 * pad);
    let mut pv = Vec::with_capacity(n + 2 * pad);
    for i in (1..=pad).rev() {
        pf.push(method.mirror(freqs[0], freqs[i]));
        pv.push(values[i]);
    }
    pf.extend_from_slice(&freqs[..n]);
    pv.extend_from_slice(&values[..n]);
    for i in 1..=pad {
        pf.push(method.mirror(freqs[n - 1], freqs[n - 1 - i]));
        pv.push(values[n - 1 - i]);
    }

    (0..n)
        .map(|i| {
            let c = pad + i;
            let fc = pf[c];
            let mut sum = values[i];
            let mut weights = 1.0;

            let mut j = c;
            while j > 0 {
                j -= 1;
                match method.weight(pf[j], fc) {
                    Some(w) => {
                        sum += w * pv[j];
                        weights += w;
                    }
                    None => break,
                }
            }
            for j in c + 1..pf.len() {
                match method.weight(pf[j], fc) {
                    Some(w) => {
                        sum += w * pv[j];
                        weights += w;
                    }
                    None => break,
                }
            }
            sum / weights
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dsp::interp::log_axis;

    #[test]
    fn test_flat_spectrum_unchanged() {
        let freqs = log_axis(0.5, 20.0, 128);
        let values = vec![-120.0; 128];
        for method in [
            SmoothingMethod::KonnoOhmachi { bandwidth: 40.0 },
            SmoothingMethod::Constant { width_hz: 1.0 },
            SmoothingMethod::Proportional { percent: 10.0 },
        ] {
            let out = smooth(&freqs, &values, &method);
            assert!(out.iter().all(|&v| (v + 120.0).abs() < 1e-9), "{:?}", method);
        }
    }

    #[test]
    fn test_konno_ohmachi_widens_spike() {
        let freqs = log_axis(0.5, 20.0, 256);
        let mut values = vec![0.0; 256];
        values[128] = 100.0;
        let out = smooth(&freqs, &values, &SmoothingMethod::KonnoOhmachi { bandwidth: 20.0 });

        assert!(out[128] < 100.0);
        assert!(out[127] > 0.0 && out[129] > 0.0);
        let far = out[0] + out[255];
        assert!(far.abs() < 1e-9);
    }

    #[test]
    fn test_edge_stays_close_to_signal() {
        // A linear ramp in log-frequency stays close to itself at the left edge
        let freqs = log_axis(1.0, 10.0, 100);
        let values: Vec<f64> = freqs.iter().map(|f| f.log10()).collect();
        let out = smooth(&freqs, &values, &SmoothingMethod::Proportional { percent: 5.0 });
        assert!((out[0] - values[0]).abs() < 0.02);
    }

    #[test]
    fn test_rejects_nonpositive_width() {
        assert!(SmoothingMethod::Constant { width_hz: 0.0 }.validate().is_err());
        assert!(SmoothingMethod::None.validate().is_ok());
    }
}
