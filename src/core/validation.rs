//! SESAME (2004) reliability and clarity criteria.
//!
//! Every criterion is a pure function returning a [`CriterionOutcome`];
//! [`PeakValidator`] runs all nine in order and derives the score and the
//! composite decision (3/3 curve criteria and at least 5/6 peak criteria).

use std::fmt;

use serde::{Deserialize, Serialize};

use super::aggregate::AggregateCurve;
use super::dsp::stats::{log_std, std_dev};
use super::peaks::{Peak, PeakValidation};

/// Minimum A0/A(f) ratio for the clarity criteria
const CLARITY_RATIO: f64 = 2.0;
/// Tolerance on the envelope peak frequencies
const ENVELOPE_TOLERANCE: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Criterion {
    /// f0 > 10 / Lw
    WindowLength,
    /// Lw · nw · f0 > 200
    SignificantCycles,
    /// log-std below 2 (or 3) across [f0/2, 2 f0]
    CurveStability,
    /// clear trough in [f0/4, f0)
    ClarityBelow,
    /// clear trough in (f0, 4 f0]
    ClarityAbove,
    /// A0 > 2
    PeakAmplitude,
    /// ± envelope peaks within 5% of f0
    EnvelopeAgreement,
    /// σf < ε(f0) · f0
    FrequencyStability,
    /// σA < θ(f0)
    AmplitudeStability,
}

impl Criterion {
    pub const ALL: [Criterion; 9] = [
        Criterion::WindowLength,
        Criterion::SignificantCycles,
        Criterion::CurveStability,
        Criterion::ClarityBelow,
        Criterion::ClarityAbove,
        Criterion::PeakAmplitude,
        Criterion::EnvelopeAgreement,
        Criterion::FrequencyStability,
        Criterion::AmplitudeStability,
    ];

    /// 1-based position in the battery
    pub fn number(&self) -> usize {
        Self::ALL.iter().position(|c| c == self).map_or(0, |i| i + 1)
    }

    /// Criteria 1-3 judge the curve, 4-9 the peak
    pub fn is_curve_criterion(&self) -> bool {
        self.number() <= 3
    }

    pub fn name(&self) -> &'static str {
        match self {
            Criterion::WindowLength => "window length",
            Criterion::SignificantCycles => "significant cycles",
            Criterion::CurveStability => "curve stability",
            Criterion::ClarityBelow => "clarity below f0",
            Criterion::ClarityAbove => "clarity above f0",
            Criterion::PeakAmplitude => "peak amplitude",
            Criterion::EnvelopeAgreement => "envelope agreement",
            Criterion::FrequencyStability => "frequency stability",
            Criterion::AmplitudeStability => "amplitude stability",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.number(), self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionOutcome {
    pub criterion: Criterion,
    pub passed: bool,
    pub message: String,
}

impl CriterionOutcome {
    fn new(criterion: Criterion, passed: bool, message: String) -> Self {
        Self {
            criterion,
            passed,
            message,
        }
    }
}

fn band_index(f0: f64) -> usize {
    if f0 < 0.2 {
        0
    } else if f0 < 0.5 {
        1
    } else if f0 < 1.0 {
        2
    } else if f0 <= 2.0 {
        3
    } else {
        4
    }
}

/// Relative frequency tolerance ε(f0)
pub fn epsilon(f0: f64) -> f64 {
    [0.25, 0.20, 0.15, 0.10, 0.05][band_index(f0)]
}

/// Log-amplitude tolerance θ(f0)
pub fn theta(f0: f64) -> f64 {
    [0.48, 0.40, 0.30, 0.25, 0.20][band_index(f0)]
}

pub fn window_length_test(f0: f64, window_length: f64) -> CriterionOutcome {
    let limit = 10.0 / window_length;
    CriterionOutcome::new(
        Criterion::WindowLength,
        f0 > limit,
        format!("f0 = {:.3} Hz vs 10/Lw = {:.3} Hz", f0, limit),
    )
}

pub fn significant_cycles_test(f0: f64, window_length: f64, window_count: usize) -> CriterionOutcome {
    let nc = window_length * window_count as f64 * f0;
    CriterionOutcome::new(
        Criterion::SignificantCycles,
        nc > 200.0,
        format!("nc = {:.0} from {} windows of {} s (needs > 200)", nc, window_count, window_length),
    )
}

pub fn curve_stability_test(f0: f64, freqs: &[f64], log_std: &[f64]) -> CriterionOutcome {
    let limit = if f0 >= 0.5 { 2.0 } else { 3.0 };
    let worst = freqs
        .iter()
        .zip(log_std)
        .filter(|(&f, _)| f >= f0 / 2.0 && f <= 2.0 * f0)
        .map(|(_, &s)| s)
        .fold(f64::NEG_INFINITY, f64::max);
    let passed = worst.is_infinite() || worst < limit;
    CriterionOutcome::new(
        Criterion::CurveStability,
        passed,
        format!("max log-std {:.3} in [{:.3}, {:.3}] Hz (limit {})", worst, f0 / 2.0, 2.0 * f0, limit),
    )
}

/// Criterion 4 and the frequency f- it found
pub fn clarity_below_test(f0: f64, a0: f64, freqs: &[f64], curve: &[f64]) -> (CriterionOutcome, Option<f64>) {
    let found = freqs
        .iter()
        .zip(curve)
        .filter(|(&f, &a)| f >= f0 / 4.0 && f < f0 && a > 0.0 && a0 / a > CLARITY_RATIO)
        .map(|(&f, _)| f)
        .last();
    let message = match found {
        Some(f) => format!("A0/A > 2 at f- = {:.3} Hz", f),
        None => format!("no A0/A > 2 in [{:.3}, {:.3}) Hz", f0 / 4.0, f0),
    };
    (CriterionOutcome::new(Criterion::ClarityBelow, found.is_some(), message), found)
}

/// Criterion 5 and the frequency f+ it found
pub fn clarity_above_test(f0: f64, a0: f64, freqs: &[f64], curve: &[f64]) -> (CriterionOutcome, Option<f64>) {
    let found = freqs
        .iter()
        .zip(curve)
        .find(|(&f, &a)| f > f0 && f <= 4.0 * f0 && a > 0.0 && a0 / a > CLARITY_RATIO)
        .map(|(&f, _)| f);
    let message = match found {
        Some(f) => format!("A0/A > 2 at f+ = {:.3} Hz", f),
        None => format!("no A0/A > 2 in ({:.3}, {:.3}] Hz", f0, 4.0 * f0),
    };
    (CriterionOutcome::new(Criterion::ClarityAbove, found.is_some(), message), found)
}

pub fn amplitude_test(a0: f64) -> CriterionOutcome {
    CriterionOutcome::new(
        Criterion::PeakAmplitude,
        a0 > CLARITY_RATIO,
        format!("A0 = {:.3} (needs > 2)", a0),
    )
}

pub fn envelope_test(f0: f64, plus_peak: Option<f64>, minus_peak: Option<f64>) -> CriterionOutcome {
    let within = |f: Option<f64>| f.is_some_and(|f| (f - f0).abs() <= ENVELOPE_TOLERANCE * f0);
    let fmt_peak = |f: Option<f64>| f.map_or("none".to_string(), |f| format!("{:.3} Hz", f));
    CriterionOutcome::new(
        Criterion::EnvelopeAgreement,
        within(plus_peak) && within(minus_peak),
        format!(
            "+σ peak {}, -σ peak {} (f0 ± 5% = [{:.3}, {:.3}] Hz)",
            fmt_peak(plus_peak),
            fmt_peak(minus_peak),
            f0 * (1.0 - ENVELOPE_TOLERANCE),
            f0 * (1.0 + ENVELOPE_TOLERANCE)
        ),
    )
}

pub fn frequency_stability_test(f0: f64, sigma_f: Option<f64>) -> CriterionOutcome {
    let limit = epsilon(f0) * f0;
    let (passed, message) = match sigma_f {
        Some(s) => (s < limit, format!("σf = {:.4} Hz vs ε·f0 = {:.4} Hz", s, limit)),
        None => (false, "σf undefined: no per-window peaks".to_string()),
    };
    CriterionOutcome::new(Criterion::FrequencyStability, passed, message)
}

pub fn amplitude_stability_test(f0: f64, sigma_a: Option<f64>) -> CriterionOutcome {
    let limit = theta(f0);
    let (passed, message) = match sigma_a {
        Some(s) => (s < limit, format!("σA = {:.4} vs θ = {:.2}", s, limit)),
        None => (false, "σA undefined: no per-window amplitudes".to_string()),
    };
    CriterionOutcome::new(Criterion::AmplitudeStability, passed, message)
}

/// Composite decision: every curve criterion and at least 5 of the 6 peak criteria
pub fn composite(outcomes: &[CriterionOutcome]) -> bool {
    let curve_ok = outcomes
        .iter()
        .filter(|o| o.criterion.is_curve_criterion())
        .all(|o| o.passed);
    let peak_passed = outcomes
        .iter()
        .filter(|o| !o.criterion.is_curve_criterion() && o.passed)
        .count();
    curve_ok && peak_passed >= 5
}

/// Everything the battery needs beyond the peak itself
#[derive(Debug, Clone)]
pub struct ValidationInput<'a> {
    pub freqs: &'a [f64],
    pub aggregate: &'a AggregateCurve,
    pub window_length: f64,
    /// Windows the aggregate was built from
    pub window_count: usize,
    /// Per used window, the peak frequency nearest f0
    pub window_peaks: &'a [f64],
    /// Per used window, the H/V amplitude at the f0 bin
    pub window_amplitudes: &'a [f64],
    pub plus_peak: Option<f64>,
    pub minus_peak: Option<f64>,
}

pub struct PeakValidator;

impl PeakValidator {
    /// Run all nine criteria and return the validated peak
    pub fn validate(peak: &Peak, input: &ValidationInput<'_>) -> Peak {
        let (f0, a0) = (peak.f0, peak.a0);
        let curve = &input.aggregate.median;
        let sigma_f = Some(std_dev(input.window_peaks)).filter(|s| s.is_finite());
        let sigma_a = Some(log_std(input.window_amplitudes)).filter(|s| s.is_finite());

        let (below, f_minus) = clarity_below_test(f0, a0, input.freqs, curve);
        let (above, f_plus) = clarity_above_test(f0, a0, input.freqs, curve);
        let criteria = vec![
            window_length_test(f0, input.window_length),
            significant_cycles_test(f0, input.window_length, input.window_count),
            curve_stability_test(f0, input.freqs, &input.aggregate.log_std),
            below,
            above,
            amplitude_test(a0),
            envelope_test(f0, input.plus_peak, input.minus_peak),
            frequency_stability_test(f0, sigma_f),
            amplitude_stability_test(f0, sigma_a),
        ];

        let score = criteria.iter().filter(|c| c.passed).count() as u8;
        let passed = composite(&criteria);

        Peak {
            validation: Some(PeakValidation {
                f_minus,
                f_plus,
                sigma_f,
                sigma_a,
                score,
                criteria,
                passed,
            }),
            ..peak.clone()
        }
    }
}
