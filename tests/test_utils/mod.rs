// tests/test_utils/mod.rs
//
// Shared helpers for the integration suites: synthetic sites, quick
// analyzers, scratch directories and the CLI binary.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use hvsrcheckr::config::{HvsrConfig, NoiseGateConfig, OutlierConfig};
use hvsrcheckr::core::combine::CurveCombiner;
use hvsrcheckr::core::{RunContext, SampleStream, SpectralWindower, WindowTable};
use hvsrcheckr::testgen::SyntheticSite;
use uuid::Uuid;

pub fn get_binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_hvsrcheckr"))
}

pub fn run_hvsrcheckr<P: AsRef<std::ffi::OsStr>>(input: P) -> Command {
    let mut cmd = Command::new(get_binary_path());
    cmd.arg("--input").arg(input);
    cmd
}

/// Fresh scratch directory under the system temp dir
pub fn scratch_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hvsrcheckr-{}-{}", label, Uuid::new_v4()));
    fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

pub fn write_stream(dir: &Path, stream: &SampleStream) -> PathBuf {
    let path = dir.join(format!("{}.json", stream.site));
    fs::write(&path, stream.to_json().expect("serialize stream")).expect("write stream");
    path
}

/// Default synthetic site: 600 s at 50 Hz with a 2 Hz resonance
pub fn synthetic(site: &str) -> SampleStream {
    SyntheticSite::new(site).generate()
}

/// Config with every noise sub-filter and outlier pass disabled
pub fn bare_config() -> HvsrConfig {
    HvsrConfig {
        noise: NoiseGateConfig::disabled(),
        outliers: OutlierConfig {
            psd: None,
            hv: None,
        },
        ..HvsrConfig::default()
    }
}

/// Windowed and combined table for a stream, before any gating
pub fn combined_table(stream: &SampleStream, config: &HvsrConfig) -> WindowTable {
    let aligned = stream.align().expect("align stream");
    let mut ctx = RunContext::new(stream.site.clone());
    let mut table = SpectralWindower::new(config.window.clone())
        .process(&aligned, &mut ctx)
        .expect("window stream");
    CurveCombiner::new(config.curve.method).combine(&mut table);
    table
}

pub fn assert_close(actual: f64, expected: f64, rel: f64, what: &str) {
    let err = (actual - expected).abs() / expected.abs().max(f64::MIN_POSITIVE);
    assert!(
        err <= rel,
        "{}: expected {} within {:.1}%, got {}",
        what,
        expected,
        rel * 100.0,
        actual
    );
}
