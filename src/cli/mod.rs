// src/cli/mod.rs
//
// Command-line interface module

mod args;
mod output;

pub use args::{parse_selection, print_presets, Args};
pub use output::{format_failure, format_result, format_summary, print_output, write_json};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use colorful::Colorful;
use indicatif::{ProgressBar, ProgressStyle};
use walkdir::WalkDir;

use crate::core::{insert_site, HvsrAnalyzer, RunContext, SampleStream};
use crate::result::{HvsrOutput, SiteFailure, SiteOutcome, Stage};
use crate::testgen::SyntheticSite;

/// Sample-stream files under `path` (a file or a directory)
pub fn collect_stream_files(path: &Path) -> Result<Vec<PathBuf>> {
    let is_stream = |p: &Path| {
        p.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"))
    };

    let mut files = Vec::new();
    if path.is_file() {
        files.push(path.to_path_buf());
    } else if path.is_dir() {
        for entry in WalkDir::new(path)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_file() && is_stream(entry.path()) {
                files.push(entry.path().to_path_buf());
            }
        }
    } else {
        bail!("input not found: {}", path.display());
    }
    Ok(files)
}

/// Load every file; unreadable ones become failures at the fetch stage
fn load_streams(files: &[PathBuf]) -> (Vec<SampleStream>, Vec<SiteFailure>) {
    let mut streams = Vec::new();
    let mut failures = Vec::new();
    for file in files {
        match SampleStream::load(file) {
            Ok(stream) => streams.push(stream),
            Err(e) => {
                log::warn!("skipping {}: {}", file.display(), e);
                let site = file
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file.display().to_string());
                failures.push(SiteFailure {
                    site,
                    stage: Stage::Fetch,
                    error: e.to_string(),
                    warnings: Vec::new(),
                });
            }
        }
    }
    (streams, failures)
}

/// Add load failures to the batch without replacing any analysed site
fn merge_failures(sites: &mut BTreeMap<String, SiteOutcome>, failures: Vec<SiteFailure>) {
    for failure in failures {
        insert_site(sites, failure.site.clone(), SiteOutcome::Failed(failure));
    }
}

fn analyze_with_progress(analyzer: &HvsrAnalyzer, streams: &[SampleStream]) -> Result<HvsrOutput> {
    let progress = ProgressBar::new(streams.len() as u64).with_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} sites ({elapsed})")?
            .progress_chars("=> "),
    );
    let output = analyzer.analyze_batch_with(streams, |_| progress.inc(1));
    progress.finish_and_clear();
    Ok(output)
}

/// Run the CLI
pub fn run(args: &Args) -> Result<()> {
    if args.list_presets {
        print_presets();
        return Ok(());
    }

    let config = args.build_config()?;
    let analyzer = HvsrAnalyzer::with_config(config).context("building analyzer")?;

    let (streams, load_failures) = if args.synthetic {
        (vec![SyntheticSite::default().generate()], Vec::new())
    } else {
        let input = args
            .input
            .as_deref()
            .context("--input is required unless --synthetic is given")?;
        let files = collect_stream_files(input)?;
        if files.is_empty() {
            println!("{}", "No sample-stream files found!".red());
            return Ok(());
        }
        log::info!("found {} stream file(s)", files.len());
        load_streams(&files)
    };

    let output = match (streams.as_slice(), load_failures.is_empty()) {
        ([single], true) => {
            let mut ctx = RunContext::new(single.site.clone());
            let result = analyzer
                .analyze(single, &mut ctx)
                .with_context(|| format!("analyzing site {}", single.site))?;
            HvsrOutput::Single(Box::new(result))
        }
        _ => {
            let mut output = analyze_with_progress(&analyzer, &streams)?;
            if let HvsrOutput::Batch(sites) = &mut output {
                merge_failures(sites, load_failures);
            }
            output
        }
    };

    if args.json || args.output.is_some() {
        write_json(&output, args.output.as_deref())?;
        if let Some(path) = &args.output {
            println!("Results written to {}", path.display());
        }
    }
    if !args.json {
        print_output(&output, args.verbose > 0);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hvsrcheckr-cli-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_collect_only_json_streams() {
        let dir = temp_dir("collect");
        std::fs::write(dir.join("b.json"), "{}").unwrap();
        std::fs::write(dir.join("a.JSON"), "{}").unwrap();
        std::fs::write(dir.join("notes.txt"), "x").unwrap();

        let files = collect_stream_files(&dir).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.JSON", "b.json"]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unreadable_file_is_fetch_failure() {
        let dir = temp_dir("load");
        let bad = dir.join("broken.json");
        std::fs::write(&bad, "not json").unwrap();

        let (streams, failures) = load_streams(&[bad]);
        assert!(streams.is_empty());
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].site, "broken");
        assert_eq!(failures[0].stage, Stage::Fetch);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_failure_sharing_a_site_name_is_kept() {
        let failure = |error: &str| SiteFailure {
            site: "A".to_string(),
            stage: Stage::Fetch,
            error: error.to_string(),
            warnings: Vec::new(),
        };
        let mut sites = BTreeMap::new();
        sites.insert("A".to_string(), SiteOutcome::Failed(failure("analysed")));

        merge_failures(&mut sites, vec![failure("unreadable")]);

        assert_eq!(sites.len(), 2);
        let SiteOutcome::Failed(first) = &sites["A"] else { unreachable!() };
        assert_eq!(first.error, "analysed");
        let SiteOutcome::Failed(second) = &sites["A#2"] else { unreachable!() };
        assert_eq!(second.error, "unreadable");
    }

    #[test]
    fn test_missing_input_errors() {
        assert!(collect_stream_files(Path::new("/nonexistent/hvsr/input")).is_err());
    }
}
