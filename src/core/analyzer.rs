// src/core/analyzer.rs
//
// High-level HVSR analysis API with builder pattern. Runs the stage chain
// for one site and loops over sites for batches.

use std::collections::BTreeMap;
use std::path::Path;

use rayon::prelude::*;

use super::aggregate::{AggregateCurve, AggregateCurveBuilder, OutlierRemover};
use super::combine::CurveCombiner;
use super::context::RunContext;
use super::noise::NoiseGate;
use super::peaks::{rank, Peak, PeakSelector};
use super::stream::SampleStream;
use super::validation::{PeakValidator, ValidationInput};
use super::window::{CurveId, WindowTable};
use super::windower::SpectralWindower;
use crate::config::{ConfigBuilder, HvsrConfig, ProcessingPreset};
use crate::error::{HvsrError, Result};
use crate::result::{
    HvsrOutput, PeakVerdict, ProcessingStatus, SiteFailure, SiteOutcome, SiteResult, Stage,
};

/// Builder for HvsrAnalyzer configuration
pub struct AnalyzerBuilder {
    config: ConfigBuilder,
}

impl AnalyzerBuilder {
    pub fn new() -> Self {
        Self {
            config: ConfigBuilder::new(),
        }
    }

    pub fn preset(mut self, preset: ProcessingPreset) -> Self {
        self.config = ConfigBuilder::from_preset(preset);
        self
    }

    /// Adjust the configuration in place
    pub fn configure(mut self, f: impl FnOnce(ConfigBuilder) -> ConfigBuilder) -> Self {
        self.config = f(self.config);
        self
    }

    pub fn build(self) -> Result<HvsrAnalyzer> {
        HvsrAnalyzer::with_config(self.config.build())
    }
}

impl Default for AnalyzerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Failure of one stage, before it is attributed to a site
struct StageError {
    stage: Stage,
    error: HvsrError,
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, StageError>;
}

impl<T> AtStage<T> for Result<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, StageError> {
        self.map_err(|error| StageError { stage, error })
    }
}

/// Runs the HVSR pipeline with a fixed configuration
#[derive(Debug, Clone)]
pub struct HvsrAnalyzer {
    config: HvsrConfig,
}

impl HvsrAnalyzer {
    /// Analyzer with default configuration
    pub fn new() -> Self {
        Self {
            config: HvsrConfig::default(),
        }
    }

    pub fn with_config(config: HvsrConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn from_config_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::with_config(HvsrConfig::from_json(&text)?)
    }

    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::new()
    }

    pub fn config(&self) -> &HvsrConfig {
        &self.config
    }

    /// Analyze one site; fatal stage errors are returned
    pub fn analyze(&self, stream: &SampleStream, ctx: &mut RunContext) -> Result<SiteResult> {
        self.run(stream, ctx).map_err(|e| e.error)
    }

    /// Analyze one site with its own context, capturing a failure instead of returning it
    pub fn analyze_outcome(&self, stream: &SampleStream) -> SiteOutcome {
        let mut ctx = RunContext::new(stream.site.clone());
        match self.run(stream, &mut ctx) {
            Ok(result) => SiteOutcome::Completed(Box::new(result)),
            Err(StageError { stage, error }) => {
                ctx.warn(format!("{} failed: {}", stage.name(), error));
                SiteOutcome::Failed(SiteFailure {
                    site: stream.site.clone(),
                    stage,
                    error: error.to_string(),
                    warnings: ctx.into_warnings(),
                })
            }
        }
    }

    /// Analyze independent sites in parallel; one site failing does not stop the rest
    pub fn analyze_batch(&self, streams: &[SampleStream]) -> HvsrOutput {
        self.analyze_batch_with(streams, |_| {})
    }

    /// `analyze_batch` calling `on_done` as each site finishes
    pub fn analyze_batch_with<F>(&self, streams: &[SampleStream], on_done: F) -> HvsrOutput
    where
        F: Fn(&SiteOutcome) + Sync,
    {
        let outcomes: Vec<(String, SiteOutcome)> = streams
            .par_iter()
            .map(|s| {
                let outcome = self.analyze_outcome(s);
                on_done(&outcome);
                (s.site.clone(), outcome)
            })
            .collect();
        HvsrOutput::Batch(collect_sites(outcomes))
    }

    /// `Single` for one stream, `Batch` otherwise
    pub fn analyze_all(&self, streams: &[SampleStream]) -> Result<HvsrOutput> {
        match streams {
            [single] => {
                let mut ctx = RunContext::new(single.site.clone());
                Ok(HvsrOutput::Single(Box::new(self.analyze(single, &mut ctx)?)))
            }
            _ => Ok(self.analyze_batch(streams)),
        }
    }

    fn run(&self, stream: &SampleStream, ctx: &mut RunContext) -> std::result::Result<SiteResult, StageError> {
        let config = &self.config;
        let mut status = ProcessingStatus::default();
        ctx.info(format!("analysis started (run {})", ctx.run_id()));

        config.validate().at(Stage::Fetch)?;
        let aligned = stream.align().at(Stage::Fetch)?;
        status.set(Stage::Fetch, true);

        let mut table = SpectralWindower::new(config.window.clone())
            .process(&aligned, ctx)
            .at(Stage::Ppsd)?;
        status.set(Stage::Ppsd, true);

        let noise_report = NoiseGate::new(config.noise.clone()).apply(&mut table, &aligned, ctx);
        status.set(Stage::NoiseRemoval, noise_report.success);

        let mut outlier_reports = Vec::new();
        if let Some(rule) = config.outliers.psd {
            match OutlierRemover::new(rule).remove_psd(&mut table) {
                Ok(report) => {
                    ctx.info(format!("PSD outlier pass excluded {} windows", report.newly_excluded));
                    outlier_reports.push(report);
                }
                Err(e) => {
                    ctx.warn(format!("PSD outlier pass skipped: {}", e));
                    status.set(Stage::OutlierRemoval, false);
                }
            }
        }

        CurveCombiner::new(config.curve.method).combine(&mut table);

        if let Some(rule) = config.outliers.hv {
            match OutlierRemover::new(rule).remove_hv(&mut table, CurveId::Hv) {
                Ok(report) => {
                    ctx.info(format!("H/V outlier pass excluded {} windows", report.newly_excluded));
                    outlier_reports.push(report);
                }
                Err(e) => {
                    ctx.warn(format!("H/V outlier pass skipped: {}", e));
                    status.set(Stage::OutlierRemoval, false);
                }
            }
        }

        let aggregates = AggregateCurveBuilder::build_all(&table).at(Stage::HvComputation)?;
        status.set(Stage::HvComputation, true);
        ctx.info(format!("{} of {} windows used", table.used_count(), table.len()));

        let selector = PeakSelector::from_config(config);
        let mut peaks = Vec::new();
        let mut azimuth_peaks = BTreeMap::new();
        for (&id, aggregate) in &aggregates {
            let mut candidates = self.validated_candidates(&selector, &table, aggregate);
            let best = selector.select(&candidates, config.peaks.selection);
            if id == CurveId::Hv {
                rank(&mut candidates);
                peaks = candidates;
            } else if let Some(best) = best {
                azimuth_peaks.insert(id, best);
            }
        }
        let best_peak = selector.select(&peaks, config.peaks.selection);
        let verdict = PeakVerdict::from_peak(best_peak.as_ref());
        status.set(Stage::PeakCheck, true);

        match &best_peak {
            Some(p) => ctx.info(format!(
                "f0 = {:.3} Hz, A0 = {:.2}, score {}/9, {}",
                p.f0,
                p.a0,
                p.score(),
                verdict.description()
            )),
            None => ctx.info(verdict.description()),
        }

        Ok(SiteResult {
            site: stream.site.clone(),
            run_id: ctx.run_id(),
            started: ctx.started(),
            elapsed_secs: ctx.elapsed_secs(),
            config: config.clone(),
            windows: table,
            aggregates,
            peaks,
            best_peak,
            azimuth_peaks,
            verdict,
            noise_report: Some(noise_report),
            outlier_reports,
            warnings: ctx.warnings().to_vec(),
            status,
        })
    }

    fn validated_candidates(&self, selector: &PeakSelector, table: &WindowTable, aggregate: &AggregateCurve) -> Vec<Peak> {
        let freqs = table.frequencies.as_slice();
        let id = aggregate.curve_id;
        let plus_peak = selector.highest_maximum(freqs, &aggregate.plus_log_std);
        let minus_peak = selector.highest_maximum(freqs, &aggregate.minus_log_std);

        selector
            .candidates(freqs, &aggregate.median)
            .iter()
            .map(|peak| {
                let window_peaks = selector.window_peak_frequencies(table, id, peak.f0);
                let window_amplitudes: Vec<f64> = table
                    .used_curves(id)
                    .iter()
                    .map(|c| c[peak.index])
                    .collect();
                let input = ValidationInput {
                    freqs,
                    aggregate,
                    window_length: table.window_length,
                    window_count: aggregate.window_count,
                    window_peaks: &window_peaks,
                    window_amplitudes: &window_amplitudes,
                    plus_peak,
                    minus_peak,
                };
                PeakValidator::validate(peak, &input)
            })
            .collect()
    }
}

impl Default for HvsrAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Key outcomes by site name; repeated names get a numeric suffix
fn collect_sites(outcomes: Vec<(String, SiteOutcome)>) -> BTreeMap<String, SiteOutcome> {
    let mut sites = BTreeMap::new();
    for (site, outcome) in outcomes {
        insert_site(&mut sites, site, outcome);
    }
    sites
}

/// Insert under `site`, or `site#2`, `site#3`, ... if the name is taken.
/// Returns the key used.
pub fn insert_site(sites: &mut BTreeMap<String, SiteOutcome>, site: String, outcome: SiteOutcome) -> String {
    let mut key = site.clone();
    let mut n = 2;
    while sites.contains_key(&key) {
        key = format!("{}#{}", site, n);
        n += 1;
    }
    if key != site {
        log::warn!("duplicate site name {}, stored as {}", site, key);
    }
    sites.insert(key.clone(), outcome);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_sites_are_kept() {
        let failure = |site: &str| {
            SiteOutcome::Failed(SiteFailure {
                site: site.to_string(),
                stage: Stage::Fetch,
                error: "x".to_string(),
                warnings: Vec::new(),
            })
        };
        let sites = collect_sites(vec![
            ("A".to_string(), failure("A")),
            ("A".to_string(), failure("A")),
            ("B".to_string(), failure("B")),
        ]);
        let keys: Vec<&str> = sites.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["A", "A#2", "B"]);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = HvsrConfig::default();
        config.window.overlap = 1.5;
        assert!(HvsrAnalyzer::with_config(config).is_err());
    }
}
