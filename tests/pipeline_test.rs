// tests/pipeline_test.rs
//
// End-to-end runs of the analyzer on synthetic three-component sites.

mod test_utils;

use hvsrcheckr::config::{ProcessingPreset, TimeRange};
use hvsrcheckr::core::{CurveId, ExclusionReason, HvsrAnalyzer, RunContext};
use hvsrcheckr::error::HvsrError;
use hvsrcheckr::result::{HvsrOutput, SiteOutcome, SiteResult, Stage};
use hvsrcheckr::testgen::SyntheticSite;
use test_utils::*;

#[test]
fn test_synthetic_resonance_is_recovered() {
    let stream = synthetic("SYN01");
    let analyzer = HvsrAnalyzer::new();
    let mut ctx = RunContext::new("SYN01");
    let result = analyzer.analyze(&stream, &mut ctx).unwrap();

    let peak = result.best_peak.as_ref().expect("resonance should give a peak");
    assert_close(peak.f0, 2.0, 0.10, "f0");
    assert!(peak.a0 > 2.0, "A0 too low: {}", peak.a0);
    assert!(peak.validation.is_some());
    assert_eq!(result.windows.len(), 10);
    assert!(result.status.overall());
    assert!(result.hv_curve().is_some());
}

#[test]
fn test_analysis_is_deterministic() {
    let stream = synthetic("DET");
    let analyzer = HvsrAnalyzer::new();
    let a = analyzer.analyze(&stream, &mut RunContext::new("DET")).unwrap();
    let b = analyzer.analyze(&stream, &mut RunContext::new("DET")).unwrap();

    assert_eq!(a.windows.use_mask(), b.windows.use_mask());
    assert_eq!(a.aggregates, b.aggregates);
    assert_eq!(a.best_peak, b.best_peak);
    assert_ne!(a.run_id, b.run_id);
}

#[test]
fn test_site_result_json_round_trip() {
    let stream = SyntheticSite::new("JSON").with_duration(300.0).generate();
    let analyzer = HvsrAnalyzer::builder()
        .preset(ProcessingPreset::Quick)
        .build()
        .unwrap();
    let result = analyzer.analyze(&stream, &mut RunContext::new("JSON")).unwrap();

    let json = result.to_json().unwrap();
    let parsed = SiteResult::from_json(&json).unwrap();
    assert_eq!(parsed, result);
}

#[test]
fn test_full_manual_exclusion_fails_site() {
    let stream = synthetic("GONE");
    let analyzer = HvsrAnalyzer::builder()
        .configure(|c| c.exclude(0.0, 600.0))
        .build()
        .unwrap();

    let err = analyzer
        .analyze(&stream, &mut RunContext::new("GONE"))
        .unwrap_err();
    assert!(matches!(err, HvsrError::InsufficientWindows { .. }), "{}", err);

    match analyzer.analyze_outcome(&stream) {
        SiteOutcome::Failed(failure) => {
            assert_eq!(failure.stage, Stage::HvComputation);
            assert!(!failure.warnings.is_empty());
        }
        SiteOutcome::Completed(_) => panic!("site with no windows should fail"),
    }
}

#[test]
fn test_batch_continues_past_failing_site() {
    let good = SyntheticSite::new("GOOD").with_duration(300.0).generate();
    let mut short = SyntheticSite::new("SHORT").with_duration(300.0).generate();
    for trace in &mut short.traces {
        trace.data.truncate(100);
    }

    let analyzer = HvsrAnalyzer::builder()
        .preset(ProcessingPreset::Quick)
        .build()
        .unwrap();
    let output = analyzer.analyze_batch(&[good, short]);

    let HvsrOutput::Batch(sites) = &output else {
        panic!("two streams should give a batch");
    };
    assert_eq!(sites.len(), 2);
    assert!(sites["GOOD"].is_completed());
    match &sites["SHORT"] {
        SiteOutcome::Failed(failure) => assert_eq!(failure.stage, Stage::Ppsd),
        SiteOutcome::Completed(_) => panic!("two seconds of data cannot fill a window"),
    }
    assert_eq!(output.results().len(), 1);
    assert_eq!(output.failures().len(), 1);
}

#[test]
fn test_single_stream_gives_single_output() {
    let stream = SyntheticSite::new("ONE").with_duration(300.0).generate();
    let analyzer = HvsrAnalyzer::builder()
        .preset(ProcessingPreset::Quick)
        .build()
        .unwrap();
    let output = analyzer.analyze_all(&[stream]).unwrap();
    assert!(matches!(output, HvsrOutput::Single(_)));
}

#[test]
fn test_gap_window_is_excluded() {
    let stream = SyntheticSite::new("GAP").with_gap(130.0, 131.0).generate();
    let analyzer = HvsrAnalyzer::with_config(bare_config()).unwrap();
    let result = analyzer.analyze(&stream, &mut RunContext::new("GAP")).unwrap();

    let gapped: Vec<usize> = result
        .windows
        .windows
        .iter()
        .filter(|w| w.exclusions.contains(&ExclusionReason::DataGap))
        .map(|w| w.index)
        .collect();
    assert_eq!(gapped, vec![2]);
    assert_eq!(result.windows_used(), 9);
}

#[test]
fn test_azimuth_curves_follow_default_curve() {
    let stream = synthetic("AZI");
    let analyzer = HvsrAnalyzer::builder()
        .configure(|c| c.azimuths(vec![0, 45, 90]))
        .build()
        .unwrap();
    let result = analyzer.analyze(&stream, &mut RunContext::new("AZI")).unwrap();

    assert_eq!(result.aggregates.len(), 4);
    for az in [0u16, 45, 90] {
        let peak = result
            .azimuth_peaks
            .get(&CurveId::Azimuth(az))
            .expect("azimuthal peak");
        assert_close(peak.f0, 2.0, 0.15, "azimuthal f0");
    }
}

#[test]
fn test_manual_ranges_match_windows() {
    let stream = synthetic("MAN");
    let mut config = bare_config();
    config.noise.manual = vec![TimeRange::new(0.0, 60.0), TimeRange::new(300.0, 330.0)];
    let analyzer = HvsrAnalyzer::with_config(config).unwrap();
    let result = analyzer.analyze(&stream, &mut RunContext::new("MAN")).unwrap();

    let excluded: Vec<usize> = result
        .windows
        .windows
        .iter()
        .filter(|w| !w.use_window)
        .map(|w| w.index)
        .collect();
    assert_eq!(excluded, vec![0, 5]);
    assert!(result.status.noise_removal);
}
