//! Core HVSR processing stages and DSP utilities

pub mod aggregate;
pub mod analyzer;
pub mod combine;
pub mod context;
pub mod dsp;
pub mod noise;
pub mod peaks;
pub mod stream;
pub mod validation;
pub mod window;
pub mod windower;

pub use aggregate::{AggregateCurve, AggregateCurveBuilder, OutlierRemover, OutlierReport};
pub use analyzer::{insert_site, AnalyzerBuilder, HvsrAnalyzer};
pub use combine::{CombineMethod, CurveCombiner};
pub use context::RunContext;
pub use noise::{NoiseGate, NoiseGateReport, WindowFilter};
pub use peaks::{Peak, PeakSelector, PeakValidation};
pub use stream::{AlignedStream, Component, SampleStream, Trace};
pub use validation::{Criterion, CriterionOutcome, PeakValidator, ValidationInput};
pub use window::{CurveId, ExclusionReason, FrequencyAxis, Window, WindowTable};
pub use windower::SpectralWindower;
