// src/core/combine.rs
//
// Per-window H/V curves from the channel PSDs.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::dsp::{db_to_power, POWER_FLOOR};
use super::window::{CurveId, Window, WindowTable};

/// Rule for merging the two horizontal amplitudes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CombineMethod {
    /// (h1 + h2) / 2
    ArithmeticMean,
    /// sqrt(h1 * h2)
    #[default]
    GeometricMean,
    /// sqrt(h1² + h2²)
    VectorSummation,
    /// sqrt((h1² + h2²) / 2)
    QuadraticMean,
    /// max(h1, h2)
    MaximumHorizontal,
}

impl CombineMethod {
    pub fn combine(&self, h1: f64, h2: f64) -> f64 {
        match self {
            CombineMethod::ArithmeticMean => (h1 + h2) / 2.0,
            CombineMethod::GeometricMean => (h1 * h2).sqrt(),
            CombineMethod::VectorSummation => (h1 * h1 + h2 * h2).sqrt(),
            CombineMethod::QuadraticMean => ((h1 * h1 + h2 * h2) / 2.0).sqrt(),
            CombineMethod::MaximumHorizontal => h1.max(h2),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().replace(['-', '_'], " ").as_str() {
            "arithmetic" | "arithmetic mean" => Some(Self::ArithmeticMean),
            "geometric" | "geometric mean" => Some(Self::GeometricMean),
            "vector" | "vector summation" => Some(Self::VectorSummation),
            "quadratic" | "quadratic mean" => Some(Self::QuadraticMean),
            "max" | "maximum" | "maximum horizontal" => Some(Self::MaximumHorizontal),
            _ => None,
        }
    }
}

/// Spectral amplitude of a dB power value over a bin
fn amplitude(db: f64, width: f64) -> f64 {
    (db_to_power(db) * width).max(POWER_FLOOR).sqrt()
}

pub struct CurveCombiner {
    method: CombineMethod,
}

impl CurveCombiner {
    pub fn new(method: CombineMethod) -> Self {
        Self { method }
    }

    pub fn method(&self) -> CombineMethod {
        self.method
    }

    /// Fill the H/V curves of every window, used or not
    pub fn combine(&self, table: &mut WindowTable) {
        let widths = table.frequencies.bin_widths();
        table
            .windows
            .par_iter_mut()
            .for_each(|w| self.combine_window(w, &widths));
    }

    pub fn combine_window(&self, window: &mut Window, widths: &[f64]) {
        let psd = &window.psd;
        let vertical: Vec<f64> = psd.z.iter().zip(widths).map(|(&v, &w)| amplitude(v, w)).collect();

        let hv: Vec<f64> = psd
            .n
            .iter()
            .zip(&psd.e)
            .zip(widths)
            .zip(&vertical)
            .map(|(((&n, &e), &w), &v)| self.method.combine(amplitude(n, w), amplitude(e, w)) / v)
            .collect();

        let radial: Vec<(u16, Vec<f64>)> = psd
            .radial
            .iter()
            .map(|(&azimuth, spectrum)| {
                let curve = spectrum
                    .iter()
                    .zip(widths)
                    .zip(&vertical)
                    .map(|((&r, &w), &v)| amplitude(r, w) / v)
                    .collect();
                (azimuth, curve)
            })
            .collect();

        window.hv.clear();
        window.hv.insert(CurveId::Hv, hv);
        for (azimuth, curve) in radial {
            window.hv.insert(CurveId::Azimuth(azimuth), curve);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::window::{ChannelPsd, FrequencyAxis};
    use chrono::Utc;

    fn flat_window(db: f64, bins: usize) -> Window {
        let mut w = Window::new(0, 0.0, 60.0, Utc::now(), Utc::now());
        w.psd = ChannelPsd {
            z: vec![db; bins],
            n: vec![db; bins],
            e: vec![db; bins],
            radial: [(45u16, vec![db; bins])].into_iter().collect(),
        };
        w
    }

    fn table(db: f64) -> WindowTable {
        WindowTable {
            frequencies: FrequencyAxis::new(vec![1.0, 2.0, 4.0, 8.0]).unwrap(),
            window_length: 60.0,
            windows: vec![flat_window(db, 4)],
        }
    }

    #[test]
    fn test_identical_channels_give_unity() {
        let mut t = table(-120.0);
        CurveCombiner::new(CombineMethod::GeometricMean).combine(&mut t);
        let hv = t.windows[0].curve(CurveId::Hv).unwrap();
        assert!(hv.iter().all(|&x| (x - 1.0).abs() < 1e-12));
        let radial = t.windows[0].curve(CurveId::Azimuth(45)).unwrap();
        assert!(radial.iter().all(|&x| (x - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_mean_rules_give_unity_on_flat_spectra() {
        for method in [
            CombineMethod::ArithmeticMean,
            CombineMethod::QuadraticMean,
            CombineMethod::MaximumHorizontal,
        ] {
            let mut t = table(-120.0);
            CurveCombiner::new(method).combine(&mut t);
            let hv = t.windows[0].curve(CurveId::Hv).unwrap();
            assert!(hv.iter().all(|&x| (x - 1.0).abs() < 1e-12), "{:?} gave {:?}", method, hv);
        }
    }

    #[test]
    fn test_vector_summation_gives_root_two() {
        let mut t = table(-120.0);
        CurveCombiner::new(CombineMethod::VectorSummation).combine(&mut t);
        let hv = t.windows[0].curve(CurveId::Hv).unwrap();
        assert!(hv.iter().all(|&x| (x - 2f64.sqrt()).abs() < 1e-12));
    }

    #[test]
    fn test_floor_prevents_division_by_zero() {
        let mut t = table(-400.0);
        CurveCombiner::new(CombineMethod::ArithmeticMean).combine(&mut t);
        let hv = t.windows[0].curve(CurveId::Hv).unwrap();
        assert!(hv.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_rules() {
        assert_eq!(CombineMethod::ArithmeticMean.combine(1.0, 3.0), 2.0);
        assert_eq!(CombineMethod::GeometricMean.combine(1.0, 4.0), 2.0);
        assert_eq!(CombineMethod::VectorSummation.combine(3.0, 4.0), 5.0);
        assert_eq!(CombineMethod::MaximumHorizontal.combine(3.0, 4.0), 4.0);
        assert!((CombineMethod::QuadraticMean.combine(1.0, 7.0) - 5.0).abs() < 1e-12);
        assert_eq!(CombineMethod::from_name("vector-summation"), Some(CombineMethod::VectorSummation));
    }
}
