//! Frequency-axis construction and interpolation

/// `n` logarithmically spaced points from `low` to `high` inclusive
pub fn log_axis(low: f64, high: f64, n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![low];
    }
    let (l0, l1) = (low.ln(), high.ln());
    let step = (l1 - l0) / (n - 1) as f64;
    (0..n)
        .map(|i| {
            if i == n - 1 {
                high
            } else {
                (l0 + step * i as f64).exp()
            }
        })
        .collect()
}

/// Piecewise-linear interpolation of `(x, y)` at `x_new`.
/// `x` must be increasing; points outside it take the edge values.
pub fn interp_linear(x_new: &[f64], x: &[f64], y: &[f64]) -> Vec<f64> {
    if x.is_empty() {
        return vec![f64::NAN; x_new.len()];
    }
    let last = x.len() - 1;
    let mut j = 0;
    x_new
        .iter()
        .map(|&xq| {
            if xq <= x[0] {
                return y[0];
            }
            if xq >= x[last] {
                return y[last];
            }
            while j + 1 < last && x[j + 1] < xq {
                j += 1;
            }
            // x_new is usually sorted; restart the scan if it is not
            if x[j] > xq {
                j = 0;
                while j + 1 < last && x[j + 1] < xq {
                    j += 1;
                }
            }
            let (x0, x1) = (x[j], x[j + 1]);
            let t = if x1 > x0 { (xq - x0) / (x1 - x0) } else { 0.0 };
            y[j] + t * (y[j + 1] - y[j])
        })
        .collect()
}

/// Interpolate `values` (sampled at positive `freqs`) onto `target` linearly in log-frequency
pub fn interp_log_freq(target: &[f64], freqs: &[f64], values: &[f64]) -> Vec<f64> {
    let log_target: Vec<f64> = target.iter().map(|f| f.ln()).collect();
    let log_freqs: Vec<f64> = freqs.iter().map(|f| f.ln()).collect();
    interp_linear(&log_target, &log_freqs, values)
}
