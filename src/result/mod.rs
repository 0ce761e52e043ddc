//! Result types for single-site and batch runs

mod status;

pub use status::{PeakVerdict, ProcessingStatus, Stage};

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::HvsrConfig;
use crate::core::aggregate::{AggregateCurve, OutlierReport};
use crate::core::noise::NoiseGateReport;
use crate::core::peaks::Peak;
use crate::core::window::{CurveId, WindowTable};
use crate::error::Result;

/// Everything one site analysis produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteResult {
    pub site: String,
    pub run_id: Uuid,
    pub started: DateTime<Utc>,
    pub elapsed_secs: f64,
    pub config: HvsrConfig,
    pub windows: WindowTable,
    /// Default H/V plus one per azimuth
    pub aggregates: BTreeMap<CurveId, AggregateCurve>,
    /// Validated candidates on the default curve, best first
    pub peaks: Vec<Peak>,
    pub best_peak: Option<Peak>,
    /// Best peak of each azimuthal curve
    pub azimuth_peaks: BTreeMap<CurveId, Peak>,
    pub verdict: PeakVerdict,
    pub noise_report: Option<NoiseGateReport>,
    pub outlier_reports: Vec<OutlierReport>,
    pub warnings: Vec<String>,
    pub status: ProcessingStatus,
}

impl SiteResult {
    pub fn hv_curve(&self) -> Option<&AggregateCurve> {
        self.aggregates.get(&CurveId::Hv)
    }

    pub fn windows_used(&self) -> usize {
        self.windows.used_count()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A site whose analysis could not finish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteFailure {
    pub site: String,
    pub stage: Stage,
    pub error: String,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SiteOutcome {
    Completed(Box<SiteResult>),
    Failed(SiteFailure),
}

impl SiteOutcome {
    pub fn result(&self) -> Option<&SiteResult> {
        match self {
            SiteOutcome::Completed(result) => Some(result.as_ref()),
            SiteOutcome::Failed(_) => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, SiteOutcome::Completed(_))
    }
}

/// Output of one invocation: a single site or a keyed batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HvsrOutput {
    Single(Box<SiteResult>),
    Batch(BTreeMap<String, SiteOutcome>),
}

impl HvsrOutput {
    /// Completed site results in site order
    pub fn results(&self) -> Vec<&SiteResult> {
        match self {
            HvsrOutput::Single(result) => vec![result.as_ref()],
            HvsrOutput::Batch(sites) => sites.values().filter_map(|o| o.result()).collect(),
        }
    }

    pub fn failures(&self) -> Vec<&SiteFailure> {
        match self {
            HvsrOutput::Single(_) => Vec::new(),
            HvsrOutput::Batch(sites) => sites
                .values()
                .filter_map(|o| match o {
                    SiteOutcome::Failed(f) => Some(f),
                    SiteOutcome::Completed(_) => None,
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
