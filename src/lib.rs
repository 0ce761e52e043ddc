//! hvsrcheckr - Horizontal-to-vertical spectral ratio analysis
//!
//! Estimates a site's fundamental resonance from three-component ambient
//! noise recordings and checks the resulting peak against the SESAME
//! reliability and clarity criteria.
//!
//! ## Features
//!
//! - **Windowed Welch spectra**: per-window PSDs with detrending, tapering,
//!   instrument calibration, resampling and smoothing
//! - **Noise gate**: manual ranges, STA/LTA antitrigger, saturation, noise
//!   threshold and warmup/cooldown trimming
//! - **Outlier rejection**: curve-distance passes on PSDs and H/V curves
//! - **Azimuthal curves**: H/V on rotated horizontals
//! - **Peak validation**: all nine SESAME criteria with per-criterion messages
//! - **Batch runs**: independent sites in parallel, failures kept per site
//!
//! ## Module Structure
//!
//! - `core` - Pipeline stages and DSP utilities
//! - `cli` - Command-line interface
//! - `config` - Processing presets and configuration
//! - `result` - Site results, batch output and stage status
//! - `testgen` - Synthetic three-component recordings
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hvsrcheckr::{HvsrAnalyzer, ProcessingPreset, RunContext, SampleStream};
//!
//! let stream = SampleStream::load(path)?;
//! let analyzer = HvsrAnalyzer::builder()
//!     .preset(ProcessingPreset::Urban)
//!     .configure(|c| c.exclude(0.0, 120.0))
//!     .build()?;
//!
//! let mut ctx = RunContext::new(stream.site.clone());
//! let result = analyzer.analyze(&stream, &mut ctx)?;
//! if let Some(peak) = &result.best_peak {
//!     println!("f0 = {:.2} Hz, score {}/9", peak.f0, peak.score());
//! }
//! ```
//!
//! ## Processing Presets
//!
//! | Preset     | Use Case                      | Key Adjustments                     |
//! |------------|-------------------------------|-------------------------------------|
//! | Standard   | Free-field ambient noise      | Balanced defaults                   |
//! | LongPeriod | Deep sediments, f0 < 1 Hz     | 120 s windows, band from 0.1 Hz     |
//! | Urban      | Traffic, clipping             | Saturation, threshold, PSD outliers |
//! | Quick      | Short surveys                 | 20 s windows, 256 resampled bins    |

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod result;
pub mod testgen;

pub use config::{ConfigBuilder, HvsrConfig, PeakSelection, ProcessingPreset};
pub use crate::core::{
    AggregateCurve, AnalyzerBuilder, Component, CurveId, HvsrAnalyzer, Peak, RunContext,
    SampleStream, Trace, WindowTable,
};
pub use error::{HvsrError, Result};
pub use result::{HvsrOutput, PeakVerdict, ProcessingStatus, SiteOutcome, SiteResult, Stage};
