//! Taper window implementations

use std::f64::consts::PI;

/// Taper types used ahead of the FFT
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowType {
    Hann,
}

/// Create a symmetric taper of `size` points
pub fn create_window(size: usize, window_type: WindowType) -> Vec<f64> {
    if size <= 1 {
        return vec![1.0; size];
    }
    let m = (size - 1) as f64;
    (0..size)
        .map(|i| {
            let x = i as f64;
            match window_type {
                WindowType::Hann => 0.5 * (1.0 - (2.0 * PI * x / m).cos()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_window() {
        let window = create_window(5, WindowType::Hann);
        assert!(window[0].abs() < 1e-12);
        assert!((window[2] - 1.0).abs() < 1e-12);
        assert!(window[4].abs() < 1e-12);
    }
}
