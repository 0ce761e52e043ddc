// src/core/stream.rs
//
// Calibrated three-component sample stream supplied by the reader layer,
// and the time-aligned view the pipeline stages work on.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::dsp::ChannelResponse;
use crate::error::{HvsrError, Result};

/// Ground-motion component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Component {
    Z,
    N,
    E,
}

impl Component {
    pub const ALL: [Component; 3] = [Component::Z, Component::N, Component::E];

    pub fn label(&self) -> &'static str {
        match self {
            Component::Z => "Z",
            Component::N => "N",
            Component::E => "E",
        }
    }

    fn index(&self) -> usize {
        match self {
            Component::Z => 0,
            Component::N => 1,
            Component::E => 2,
        }
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One calibrated channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub component: Component,
    /// Samples per second
    pub sample_rate: f64,
    pub start_time: DateTime<Utc>,
    pub data: Vec<f64>,
    /// `true` marks a missing (gap) sample
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<Vec<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ChannelResponse>,
}

impl Trace {
    pub fn new(component: Component, sample_rate: f64, start_time: DateTime<Utc>, data: Vec<f64>) -> Self {
        Self {
            component,
            sample_rate,
            start_time,
            data,
            mask: None,
            response: None,
        }
    }

    pub fn with_mask(mut self, mask: Vec<bool>) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn with_response(mut self, response: ChannelResponse) -> Self {
        self.response = Some(response);
        self
    }

    pub fn duration_secs(&self) -> f64 {
        self.data.len() as f64 / self.sample_rate
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + seconds(self.duration_secs())
    }
}

/// Three-component recording for one site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleStream {
    pub site: String,
    pub traces: Vec<Trace>,
}

impl SampleStream {
    pub fn new(site: impl Into<String>, traces: Vec<Trace>) -> Self {
        Self {
            site: site.into(),
            traces,
        }
    }

    pub fn trace(&self, component: Component) -> Option<&Trace> {
        self.traces.iter().find(|t| t.component == component)
    }

    /// Check the stream holds exactly one Z, N and E trace at a common sample rate
    pub fn validate(&self) -> Result<()> {
        if self.traces.len() != 3 {
            return Err(HvsrError::InvalidStream(format!(
                "expected 3 traces, found {}",
                self.traces.len()
            )));
        }
        for component in Component::ALL {
            if self.traces.iter().filter(|t| t.component == component).count() != 1 {
                return Err(HvsrError::InvalidStream(format!(
                    "expected exactly one {} trace",
                    component
                )));
            }
        }

        let rate = self.traces[0].sample_rate;
        for trace in &self.traces {
            if !(trace.sample_rate.is_finite() && trace.sample_rate > 0.0) {
                return Err(HvsrError::InvalidStream(format!(
                    "{} trace has invalid sample rate {}",
                    trace.component, trace.sample_rate
                )));
            }
            if (trace.sample_rate - rate).abs() > 1e-9 * rate {
                return Err(HvsrError::InvalidStream(format!(
                    "sample rates differ: {} vs {} Hz",
                    rate, trace.sample_rate
                )));
            }
            if trace.data.is_empty() {
                return Err(HvsrError::InvalidStream(format!(
                    "{} trace is empty",
                    trace.component
                )));
            }
            if let Some(mask) = &trace.mask {
                if mask.len() != trace.data.len() {
                    return Err(HvsrError::InvalidStream(format!(
                        "{} mask has {} entries for {} samples",
                        trace.component,
                        mask.len(),
                        trace.data.len()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Trim every trace to the span all three cover
    pub fn align(&self) -> Result<AlignedStream> {
        self.validate()?;

        let start = self.traces.iter().map(|t| t.start_time).max();
        let end = self.traces.iter().map(|t| t.end_time()).min();
        let (start, end) = match (start, end) {
            (Some(s), Some(e)) if e > s => (s, e),
            _ => {
                return Err(HvsrError::InvalidStream(
                    "traces do not overlap in time".to_string(),
                ))
            }
        };

        let sample_rate = self.traces[0].sample_rate;
        let span = to_secs(end - start);
        let mut channels: Vec<AlignedChannel> = Component::ALL
            .iter()
            .filter_map(|&c| self.trace(c))
            .map(|trace| {
                let offset = (to_secs(start - trace.start_time) * sample_rate).round() as usize;
                let len = ((span * sample_rate).floor() as usize).min(trace.data.len().saturating_sub(offset));
                let samples = trace.data[offset..offset + len].to_vec();
                let gaps = trace
                    .mask
                    .as_ref()
                    .map(|m| m[offset..offset + len].to_vec())
                    .unwrap_or_default();
                AlignedChannel {
                    component: trace.component,
                    samples,
                    gaps,
                    response: trace.response.clone(),
                }
            })
            .collect();
        channels.sort_by_key(|c| c.component.index());

        Ok(AlignedStream {
            site: self.site.clone(),
            start_time: start,
            sample_rate,
            channels,
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// One channel trimmed to the common span
#[derive(Debug, Clone)]
pub struct AlignedChannel {
    pub component: Component,
    pub samples: Vec<f64>,
    /// Empty when the channel has no gaps
    pub gaps: Vec<bool>,
    pub response: Option<ChannelResponse>,
}

impl AlignedChannel {
    pub fn has_gap(&self, start: usize, end: usize) -> bool {
        if self.gaps.is_empty() {
            return false;
        }
        let end = end.min(self.gaps.len());
        self.gaps[start.min(end)..end].iter().any(|&g| g)
    }

    /// Samples with gaps zero-filled
    pub fn filled(&self, start: usize, end: usize) -> Vec<f64> {
        let seg = &self.samples[start..end];
        if self.gaps.is_empty() {
            return seg.to_vec();
        }
        seg.iter()
            .zip(&self.gaps[start..end])
            .map(|(&s, &g)| if g { 0.0 } else { s })
            .collect()
    }
}

/// Time-aligned Z/N/E channels; sample `i` of every channel is at `start_time + i / sample_rate`
#[derive(Debug, Clone)]
pub struct AlignedStream {
    pub site: String,
    pub start_time: DateTime<Utc>,
    pub sample_rate: f64,
    /// Always ordered Z, N, E
    pub channels: Vec<AlignedChannel>,
}

impl AlignedStream {
    pub fn channel(&self, component: Component) -> &AlignedChannel {
        &self.channels[component.index()]
    }

    /// Samples in the shortest channel
    pub fn len(&self) -> usize {
        self.channels.iter().map(|c| c.samples.len()).min().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duration_secs(&self) -> f64 {
        self.len() as f64 / self.sample_rate
    }

    pub fn time_at(&self, offset_secs: f64) -> DateTime<Utc> {
        self.start_time + seconds(offset_secs)
    }
}

pub(crate) fn seconds(secs: f64) -> Duration {
    Duration::microseconds((secs * 1e6).round() as i64)
}

fn to_secs(d: Duration) -> f64 {
    d.num_microseconds().map(|us| us as f64 / 1e6).unwrap_or(0.0)
}
