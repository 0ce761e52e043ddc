//! CLI argument parsing with preset support

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser};

use crate::config::{Band, ConfigBuilder, HvsrConfig, PeakSelection, ProcessingPreset, TimeRange};
use crate::core::combine::CombineMethod;

#[derive(Parser, Debug)]
#[command(name = "hvsrcheckr")]
#[command(version, about = "HVSR site-resonance analysis with SESAME peak validation")]
pub struct Args {
    /// Sample-stream JSON file or a directory of them
    #[arg(short, long, required_unless_present_any = ["synthetic", "list_presets"])]
    pub input: Option<PathBuf>,

    /// JSON configuration file (overrides the preset)
    #[arg(short, long, env = "HVSRCHECKR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Processing preset (standard, long-period, urban, quick)
    #[arg(short, long, default_value = "standard")]
    pub preset: String,

    /// Window length in seconds
    #[arg(long)]
    pub window_length: Option<f64>,

    /// Window overlap fraction in [0, 1)
    #[arg(long)]
    pub overlap: Option<f64>,

    /// Analysis band as LOW:HIGH Hz
    #[arg(long, value_parser = parse_band)]
    pub band: Option<Band>,

    /// Peak-search band as LOW:HIGH Hz
    #[arg(long, value_parser = parse_band)]
    pub peak_band: Option<Band>,

    /// Horizontal combination (arithmetic, geometric, vector, quadratic, max)
    #[arg(long)]
    pub combine: Option<String>,

    /// Exclude START:END seconds (can repeat)
    #[arg(long = "exclude", value_parser = parse_range)]
    pub exclude: Vec<TimeRange>,

    /// Extra azimuth in degrees for a rotated curve (can repeat)
    #[arg(long = "azimuth")]
    pub azimuths: Vec<u16>,

    /// Disable the STA/LTA antitrigger
    #[arg(long)]
    pub no_sta_lta: bool,

    /// Peak selection: max, score, or a frequency in Hz
    #[arg(long)]
    pub select: Option<String>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    /// Write JSON results to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Analyze a generated synthetic site instead of input files
    #[arg(long)]
    pub synthetic: bool,

    /// List available presets and exit
    #[arg(long)]
    pub list_presets: bool,

    /// Verbose output (repeat for debug logging)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

fn parse_pair(s: &str) -> Result<(f64, f64), String> {
    let (a, b) = s
        .split_once(':')
        .ok_or_else(|| format!("expected A:B, got {}", s))?;
    let a: f64 = a.trim().parse().map_err(|_| format!("invalid number: {}", a))?;
    let b: f64 = b.trim().parse().map_err(|_| format!("invalid number: {}", b))?;
    Ok((a, b))
}

fn parse_band(s: &str) -> Result<Band, String> {
    let (low, high) = parse_pair(s)?;
    let band = Band::new(low, high);
    band.validate("band").map_err(|e| e.to_string())?;
    Ok(band)
}

fn parse_range(s: &str) -> Result<TimeRange, String> {
    parse_pair(s).map(|(start, end)| TimeRange::new(start, end))
}

pub fn parse_selection(s: &str) -> Result<PeakSelection> {
    match s.to_ascii_lowercase().as_str() {
        "max" | "max-amplitude" | "amplitude" => Ok(PeakSelection::MaxAmplitude),
        "score" => Ok(PeakSelection::Score),
        other => other
            .parse::<f64>()
            .map(PeakSelection::NearestFrequency)
            .map_err(|_| anyhow!("unknown peak selection: {}", s)),
    }
}

impl Args {
    /// Resolve preset, config file and overrides into one configuration
    pub fn build_config(&self) -> Result<HvsrConfig> {
        let preset = ProcessingPreset::from_name(&self.preset)
            .ok_or_else(|| anyhow!("unknown preset: {}", self.preset))?;

        let base = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                HvsrConfig::from_json(&text)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => preset.config(),
        };

        let mut builder = ConfigBuilder::from_config(base);
        if let Some(length) = self.window_length {
            builder = builder.window_length(length);
        }
        if let Some(overlap) = self.overlap {
            builder = builder.overlap(overlap);
        }
        if let Some(band) = self.band {
            builder = builder.band(band.low, band.high);
        }
        if let Some(band) = self.peak_band {
            builder = builder.peak_band(band.low, band.high);
        }
        if let Some(name) = &self.combine {
            let method = CombineMethod::from_name(name)
                .ok_or_else(|| anyhow!("unknown combination rule: {}", name))?;
            builder = builder.combine(method);
        }
        for range in &self.exclude {
            builder = builder.exclude(range.start, range.end);
        }
        if !self.azimuths.is_empty() {
            builder = builder.azimuths(self.azimuths.clone());
        }
        if self.no_sta_lta {
            builder = builder.sta_lta(None);
        }
        if let Some(select) = &self.select {
            builder = builder.selection(parse_selection(select)?);
        }

        let config = builder.build();
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

/// Print available presets
pub fn print_presets() {
    println!("Available processing presets:\n");
    for preset in ProcessingPreset::all() {
        let config = preset.config();
        println!("  {:?} - {}", preset, preset.description());
        println!(
            "    Window: {} s, overlap {:.0}%",
            config.window.window_length,
            config.window.overlap * 100.0
        );
        println!(
            "    Band: {}-{} Hz, peak band {}-{} Hz",
            config.window.band.low,
            config.window.band.high,
            config.peaks.peak_band.low,
            config.peaks.peak_band.high
        );
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("hvsrcheckr").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_overrides_apply() {
        let args = parse(&[
            "--synthetic",
            "--preset=quick",
            "--window-length=30",
            "--band=0.5:20",
            "--exclude=0:60",
            "--combine=vector",
        ]);
        let config = args.build_config().unwrap();
        assert_eq!(config.window.window_length, 30.0);
        assert_eq!(config.window.band, Band::new(0.5, 20.0));
        assert_eq!(config.noise.manual, vec![TimeRange::new(0.0, 60.0)]);
        assert_eq!(config.curve.method, CombineMethod::VectorSummation);
    }

    #[test]
    fn test_selection_parsing() {
        assert_eq!(parse_selection("score").unwrap(), PeakSelection::Score);
        assert_eq!(parse_selection("2.5").unwrap(), PeakSelection::NearestFrequency(2.5));
        assert!(parse_selection("best").is_err());
    }

    #[test]
    fn test_input_required_without_synthetic() {
        assert!(Args::try_parse_from(["hvsrcheckr"]).is_err());
    }

    #[test]
    fn test_unknown_preset() {
        let args = parse(&["--synthetic", "--preset=loud"]);
        assert!(args.build_config().is_err());
    }
}
