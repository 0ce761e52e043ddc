//! Statistical helpers shared by the gating, aggregation and validation stages

use std::cmp::Ordering;

/// Compute median of a slice (sorts in place)
pub fn median(data: &mut [f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }

    data.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let mid = data.len() / 2;
    if data.len() % 2 == 0 {
        (data[mid - 1] + data[mid]) / 2.0
    } else {
        data[mid]
    }
}

pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population standard deviation (ddof = 0)
pub fn std_dev(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    let m = mean(data);
    let var = data.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / data.len() as f64;
    var.sqrt()
}

/// Standard deviation of `log10(x)`; non-positive values are skipped
pub fn log_std(data: &[f64]) -> f64 {
    let logs: Vec<f64> = data.iter().filter(|&&x| x > 0.0).map(|x| x.log10()).collect();
    std_dev(&logs)
}

/// Percentile with linear interpolation between closest ranks, `p` in [0, 100]
pub fn percentile(data: &[f64], p: f64) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Root mean square error between two equal-length curves
pub fn rmse(curve: &[f64], reference: &[f64]) -> f64 {
    let n = curve.len().min(reference.len());
    if n == 0 {
        return 0.0;
    }
    let sum_sq: f64 = curve
        .iter()
        .zip(reference)
        .map(|(a, b)| (a - b) * (a - b))
        .sum();
    (sum_sq / n as f64).sqrt()
}

/// Centered moving average; edges average over the part of the window that exists
pub fn moving_average(data: &[f64], window_size: usize) -> Vec<f64> {
    if data.is_empty() || window_size <= 1 {
        return data.to_vec();
    }

    let mut prefix = Vec::with_capacity(data.len() + 1);
    prefix.push(0.0);
    for &x in data {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + x);
    }

    let half = window_size / 2;
    (0..data.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + window_size - half).min(data.len());
            (prefix[hi] - prefix[lo]) / (hi - lo) as f64
        })
        .collect()
}

/// Peak absolute amplitude
pub fn peak_amplitude(samples: &[f64]) -> f64 {
    samples.iter().map(|s| s.abs()).fold(0.0f64, f64::max)
}

/// Elementwise statistic across equal-length curves
pub fn columnwise<F>(curves: &[&[f64]], mut stat: F) -> Vec<f64>
where
    F: FnMut(&mut Vec<f64>) -> f64,
{
    let width = curves.first().map(|c| c.len()).unwrap_or(0);
    let mut column = Vec::with_capacity(curves.len());
    (0..width)
        .map(|j| {
            column.clear();
            column.extend(curves.iter().map(|c| c[j]));
            stat(&mut column)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_even_odd() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), 2.5);
        assert!(median(&mut []).is_nan());
    }

    #[test]
    fn test_percentile_matches_linear_rank() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&data, 0.0), 1.0);
        assert_eq!(percentile(&data, 100.0), 5.0);
        assert!((percentile(&data, 98.0) - 4.92).abs() < 1e-12);
    }

    #[test]
    fn test_log_std_of_constant_is_zero() {
        assert_eq!(log_std(&[2.0, 2.0, 2.0]), 0.0);
        assert!((log_std(&[1.0, 100.0]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_moving_average_flat() {
        let data = vec![2.0; 10];
        let avg = moving_average(&data, 4);
        assert_eq!(avg.len(), 10);
        assert!(avg.iter().all(|&v| (v - 2.0).abs() < 1e-12));
    }

    #[test]
    fn test_columnwise_median() {
        let a = [1.0, 10.0];
        let b = [3.0, 20.0];
        let c = [2.0, 30.0];
        let curves: [&[f64]; 3] = [&a, &b, &c];
        let med = columnwise(&curves, |col| median(col));
        assert_eq!(med, vec![2.0, 20.0]);
    }
}
