//! Output formatting for CLI results

use std::path::Path;

use anyhow::{Context, Result};
use colorful::Colorful;

use crate::core::peaks::Peak;
use crate::result::{HvsrOutput, PeakVerdict, SiteFailure, SiteOutcome, SiteResult};

fn verdict_line(verdict: PeakVerdict) -> String {
    let text = format!("{} {}", verdict.symbol(), verdict.description());
    let text = text.as_str();
    match verdict {
        PeakVerdict::Reliable => text.green().to_string(),
        PeakVerdict::CurveOnly => text.yellow().to_string(),
        PeakVerdict::Unreliable => text.red().to_string(),
        PeakVerdict::NoPeak => text.dim().to_string(),
    }
}

/// Format one site result for terminal output
pub fn format_result(result: &SiteResult, verbose: bool) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{} {}\n",
        result.site.as_str().bold(),
        format!("[run {}]", result.run_id).as_str().dim()
    ));
    output.push_str(&format!(
        "  Windows: {} of {} used ({:.0} s each)\n",
        result.windows_used(),
        result.windows.len(),
        result.windows.window_length
    ));

    match &result.best_peak {
        Some(peak) => {
            output.push_str(&format!(
                "  f0 = {:.3} Hz, A0 = {:.2}, score {}/9\n",
                peak.f0,
                peak.a0,
                peak.score()
            ));
            output.push_str(&format!("  {}\n", verdict_line(result.verdict)));
            output.push_str(&format_criteria(peak, verbose));
        }
        None => output.push_str(&format!("  {}\n", verdict_line(result.verdict))),
    }

    for (id, peak) in &result.azimuth_peaks {
        output.push_str(&format!(
            "  {}: f0 = {:.3} Hz, A0 = {:.2}, score {}/9\n",
            id,
            peak.f0,
            peak.a0,
            peak.score()
        ));
    }

    let failed = result.status.failed_stages();
    if !failed.is_empty() {
        let names: Vec<&str> = failed.iter().map(|s| s.name()).collect();
        output.push_str(&format!("  {}\n", format!("Stages with errors: {}", names.join(", ")).as_str().yellow()));
    }

    if verbose {
        let summary = result.windows.exclusion_summary();
        if !summary.is_empty() {
            output.push_str("\n  Exclusions:\n");
            for (reason, count) in summary {
                output.push_str(&format!("    {:<28} {}\n", reason, count));
            }
        }
        for report in &result.outlier_reports {
            output.push_str(&format!(
                "    {:<28} {} of {} candidates\n",
                report.reason.description(),
                report.outliers,
                report.candidates
            ));
        }
    }

    for warning in &result.warnings {
        output.push_str(&format!("  {} {}\n", "!".yellow(), warning));
    }

    output
}

fn format_criteria(peak: &Peak, verbose: bool) -> String {
    let Some(validation) = &peak.validation else {
        return String::new();
    };
    let mut output = String::new();
    for outcome in &validation.criteria {
        if outcome.passed && !verbose {
            continue;
        }
        let mark = if outcome.passed {
            "✓".green()
        } else {
            "✗".red()
        };
        output.push_str(&format!("    {} {}\n", mark, outcome.criterion));
        if verbose || !outcome.passed {
            output.push_str(&format!("      {}\n", outcome.message.as_str().dim()));
        }
    }
    output
}

pub fn format_failure(failure: &SiteFailure) -> String {
    let mut output = format!(
        "{} {}\n  {}\n",
        failure.site.as_str().bold(),
        format!("✗ failed at {}", failure.stage.name()).as_str().red(),
        failure.error
    );
    for warning in &failure.warnings {
        output.push_str(&format!("  {} {}\n", "!".yellow(), warning));
    }
    output
}

/// One line per site, plus totals
pub fn format_summary(output: &HvsrOutput) -> String {
    let HvsrOutput::Batch(sites) = output else {
        return String::new();
    };
    let mut text = format!("{}\n", "Summary".bold());
    let mut reliable = 0;
    for (key, outcome) in sites {
        match outcome {
            SiteOutcome::Completed(result) => {
                if result.verdict == PeakVerdict::Reliable {
                    reliable += 1;
                }
                let f0 = result
                    .best_peak
                    .as_ref()
                    .map_or_else(|| "-".to_string(), |p| format!("{:.3} Hz", p.f0));
                text.push_str(&format!(
                    "  {:<16} {:>12}  {}\n",
                    key,
                    f0,
                    verdict_line(result.verdict)
                ));
            }
            SiteOutcome::Failed(failure) => {
                text.push_str(&format!(
                    "  {:<16} {:>12}  {}\n",
                    key,
                    "-",
                    format!("failed at {}", failure.stage.name()).as_str().red()
                ));
            }
        }
    }
    text.push_str(&format!(
        "\n  {} sites, {} reliable, {} failed\n",
        sites.len(),
        reliable,
        output.failures().len()
    ));
    text
}

/// Print an output to the terminal
pub fn print_output(output: &HvsrOutput, verbose: bool) {
    match output {
        HvsrOutput::Single(result) => print!("{}", format_result(result, verbose)),
        HvsrOutput::Batch(sites) => {
            for outcome in sites.values() {
                match outcome {
                    SiteOutcome::Completed(result) => println!("{}", format_result(result, verbose)),
                    SiteOutcome::Failed(failure) => println!("{}", format_failure(failure)),
                }
            }
            print!("{}", format_summary(output));
        }
    }
}

/// Write JSON to a file, or stdout when no path is given
pub fn write_json(output: &HvsrOutput, path: Option<&Path>) -> Result<()> {
    let json = output.to_json().context("serializing results")?;
    match path {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("writing {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}
