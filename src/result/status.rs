//! Per-stage status flags and the peak verdict

use serde::{Deserialize, Serialize};

use crate::core::peaks::Peak;

/// Pipeline stage, used to attribute failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Fetch,
    NoiseRemoval,
    Ppsd,
    OutlierRemoval,
    HvComputation,
    PeakCheck,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Fetch,
        Stage::NoiseRemoval,
        Stage::Ppsd,
        Stage::OutlierRemoval,
        Stage::HvComputation,
        Stage::PeakCheck,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::NoiseRemoval => "noise removal",
            Stage::Ppsd => "ppsd",
            Stage::OutlierRemoval => "outlier removal",
            Stage::HvComputation => "hv computation",
            Stage::PeakCheck => "peak check",
        }
    }

    /// Stages whose failure is recovered instead of failing the site
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Stage::NoiseRemoval | Stage::OutlierRemoval)
    }
}

/// Whether each stage completed successfully
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStatus {
    pub fetch: bool,
    pub noise_removal: bool,
    pub ppsd: bool,
    pub outlier_removal: bool,
    pub hv_computation: bool,
    pub peak_check: bool,
}

impl Default for ProcessingStatus {
    fn default() -> Self {
        // Recoverable stages start true and are cleared on failure
        Self {
            fetch: false,
            noise_removal: true,
            ppsd: false,
            outlier_removal: true,
            hv_computation: false,
            peak_check: false,
        }
    }
}

impl ProcessingStatus {
    pub fn set(&mut self, stage: Stage, ok: bool) {
        let flag = match stage {
            Stage::Fetch => &mut self.fetch,
            Stage::NoiseRemoval => &mut self.noise_removal,
            Stage::Ppsd => &mut self.ppsd,
            Stage::OutlierRemoval => &mut self.outlier_removal,
            Stage::HvComputation => &mut self.hv_computation,
            Stage::PeakCheck => &mut self.peak_check,
        };
        *flag = ok;
    }

    pub fn get(&self, stage: Stage) -> bool {
        match stage {
            Stage::Fetch => self.fetch,
            Stage::NoiseRemoval => self.noise_removal,
            Stage::Ppsd => self.ppsd,
            Stage::OutlierRemoval => self.outlier_removal,
            Stage::HvComputation => self.hv_computation,
            Stage::PeakCheck => self.peak_check,
        }
    }

    /// Overall success ignores the recoverable stages
    pub fn overall(&self) -> bool {
        Stage::ALL.iter().all(|&s| s.is_recoverable() || self.get(s))
    }

    pub fn failed_stages(&self) -> Vec<Stage> {
        Stage::ALL.into_iter().filter(|&s| !self.get(s)).collect()
    }
}

/// Final judgement on the best peak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeakVerdict {
    /// Curve and peak criteria satisfied
    Reliable,
    /// Curve is reliable but the peak is not clear
    CurveOnly,
    Unreliable,
    NoPeak,
}

impl PeakVerdict {
    pub fn from_peak(peak: Option<&Peak>) -> Self {
        let Some(validation) = peak.and_then(|p| p.validation.as_ref()) else {
            return PeakVerdict::NoPeak;
        };
        let curve_ok = validation
            .criteria
            .iter()
            .filter(|c| c.criterion.is_curve_criterion())
            .all(|c| c.passed);
        match (validation.passed, curve_ok) {
            (true, _) => PeakVerdict::Reliable,
            (false, true) => PeakVerdict::CurveOnly,
            (false, false) => PeakVerdict::Unreliable,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            PeakVerdict::Reliable => "✓",
            PeakVerdict::CurveOnly => "⚠",
            PeakVerdict::Unreliable => "✗",
            PeakVerdict::NoPeak => "?",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PeakVerdict::Reliable => "reliable curve with a clear peak",
            PeakVerdict::CurveOnly => "reliable curve, peak not clear",
            PeakVerdict::Unreliable => "curve not reliable",
            PeakVerdict::NoPeak => "no best peak identified",
        }
    }
}
