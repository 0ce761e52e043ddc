// tests/noise_gate_test.rs
//
// Noise gate behaviour on synthetic recordings.

mod test_utils;

use hvsrcheckr::config::{NoiseGateConfig, SaturationConfig, StaLtaConfig, TimeRange, TrimConfig};
use hvsrcheckr::core::{ExclusionReason, HvsrAnalyzer, NoiseGate, RunContext};
use hvsrcheckr::testgen::SyntheticSite;
use test_utils::*;

fn sta_lta_only() -> NoiseGateConfig {
    NoiseGateConfig {
        sta_lta: Some(StaLtaConfig {
            sta: 1.0,
            lta: 30.0,
            lower: 8.0,
            upper: 16.0,
        }),
        ..NoiseGateConfig::disabled()
    }
}

#[test]
fn test_stationary_noise_excludes_nothing() {
    let stream = synthetic("FLAT");
    let config = bare_config();
    let mut table = combined_table(&stream, &config);
    let aligned = stream.align().unwrap();

    let report = NoiseGate::new(sta_lta_only()).apply(&mut table, &aligned, &mut RunContext::new("FLAT"));

    assert!(report.success);
    assert_eq!(report.windows_before, 10);
    assert_eq!(report.windows_after, 10);
    assert_eq!(report.filters.len(), 1);
    assert!(report.filters[0].ranges.is_empty());
}

#[test]
fn test_transient_window_is_excluded() {
    let stream = SyntheticSite::new("BURST")
        .with_transient(300.2, 0.5, 30.0)
        .generate();
    let config = bare_config();
    let mut table = combined_table(&stream, &config);
    let aligned = stream.align().unwrap();

    let report = NoiseGate::new(sta_lta_only()).apply(&mut table, &aligned, &mut RunContext::new("BURST"));

    assert!(report.success);
    assert_eq!(report.windows_after, 9);
    let excluded: Vec<usize> = table
        .windows
        .iter()
        .filter(|w| w.exclusions.contains(&ExclusionReason::StaLta))
        .map(|w| w.index)
        .collect();
    assert_eq!(excluded, vec![5]);
}

#[test]
fn test_gate_is_deterministic() {
    let stream = SyntheticSite::new("REPEAT")
        .with_transient(100.0, 0.5, 30.0)
        .generate();
    let config = NoiseGateConfig {
        manual: vec![TimeRange::new(400.0, 410.0)],
        trim: Some(TrimConfig {
            warmup_time: 30.0,
            cooldown_time: 30.0,
        }),
        ..sta_lta_only()
    };
    let aligned = stream.align().unwrap();

    let mut first = combined_table(&stream, &bare_config());
    let mut second = first.clone();
    let gate = NoiseGate::new(config);
    let a = gate.apply(&mut first, &aligned, &mut RunContext::new("REPEAT"));
    let b = gate.apply(&mut second, &aligned, &mut RunContext::new("REPEAT"));

    assert_eq!(a, b);
    assert_eq!(first.use_mask(), second.use_mask());
    assert_eq!(gate.filter_names(), vec!["manual", "sta/lta", "warmup/cooldown"]);
}

#[test]
fn test_later_filters_see_earlier_exclusions() {
    let stream = synthetic("ORDER");
    let config = NoiseGateConfig {
        manual: vec![TimeRange::new(0.0, 30.0)],
        trim: Some(TrimConfig {
            warmup_time: 30.0,
            cooldown_time: 0.0,
        }),
        ..NoiseGateConfig::disabled()
    };
    let mut table = combined_table(&stream, &bare_config());
    let aligned = stream.align().unwrap();

    let report = NoiseGate::new(config).apply(&mut table, &aligned, &mut RunContext::new("ORDER"));

    assert_eq!(report.filters[0].newly_excluded, 1);
    assert_eq!(report.filters[1].flagged, 1);
    assert_eq!(report.filters[1].newly_excluded, 0);
    assert_eq!(
        table.windows[0].exclusions,
        vec![ExclusionReason::Manual, ExclusionReason::WarmupCooldown]
    );
}

#[test]
fn test_failing_filter_is_skipped() {
    let stream = synthetic("BADMAN");
    let mut config = bare_config();
    config.noise = NoiseGateConfig {
        manual: vec![TimeRange::new(50.0, 10.0)],
        saturation: Some(SaturationConfig::default()),
        ..NoiseGateConfig::disabled()
    };
    let analyzer = HvsrAnalyzer::with_config(config).unwrap();
    let result = analyzer.analyze(&stream, &mut RunContext::new("BADMAN")).unwrap();

    assert!(!result.status.noise_removal);
    assert!(result.status.overall());
    let report = result.noise_report.as_ref().unwrap();
    let failed: Vec<&str> = report.failed_filters().map(|f| f.filter.as_str()).collect();
    assert_eq!(failed, vec!["manual"]);
    assert!(result.warnings.iter().any(|w| w.contains("manual")));
    assert!(result.best_peak.is_some());
}
