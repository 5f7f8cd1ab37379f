//! Run every renewal request in a directory
//!
//! Rates each `*.json` request in parallel and writes one summary row per
//! case. Failed cases are reported in the summary rather than aborting the run.

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use renewal_engine::{run, RenewalOutcome, RenewalRequest};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "run_cases")]
#[command(about = "Rate a directory of renewal requests", long_about = None)]
struct Args {
    /// Directory containing request JSON files
    #[arg(short, long, default_value = "cases")]
    dir: PathBuf,

    /// Summary CSV to write
    #[arg(short, long, default_value = "renewal_summary.csv")]
    output: PathBuf,
}

/// One row of the summary file
#[derive(Debug, Serialize)]
struct SummaryRow {
    file: String,
    case_id: String,
    carrier: String,
    mode: &'static str,
    current_premium_pmpm: Option<f64>,
    renewal_premium_pmpm: Option<f64>,
    rate_change: Option<f64>,
    warnings: usize,
    error: Option<String>,
}

fn evaluate(path: &Path) -> SummaryRow {
    let file = path.file_name().map(|f| f.to_string_lossy().to_string()).unwrap_or_default();
    let mut row = SummaryRow {
        file,
        case_id: String::new(),
        carrier: String::new(),
        mode: "",
        current_premium_pmpm: None,
        renewal_premium_pmpm: None,
        rate_change: None,
        warnings: 0,
        error: None,
    };

    let request = match fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|json| RenewalRequest::from_json(&json).map_err(|e| e.to_string()))
    {
        Ok(request) => request,
        Err(e) => {
            row.error = Some(e);
            return row;
        }
    };
    row.case_id = request.case_id().to_string();
    row.carrier = request.carrier().to_string();

    match run(request) {
        Ok(outcome) => {
            row.mode = match outcome {
                RenewalOutcome::Single(_) => "single",
                RenewalOutcome::MultiPlan(_) => "multi_plan",
            };
            row.current_premium_pmpm = Some(outcome.current_premium_pmpm());
            row.renewal_premium_pmpm = Some(outcome.final_premium_pmpm());
            row.rate_change = Some(outcome.rate_change());
            row.warnings = outcome.warnings().len();
        }
        Err(e) => {
            log::error!("{}: {}", row.case_id, e);
            row.error = Some(e.to_string());
        }
    }
    row
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let start = Instant::now();
    let mut paths: Vec<PathBuf> = fs::read_dir(&args.dir)
        .with_context(|| format!("reading {}", args.dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().map_or(false, |ext| ext == "json"))
        .collect();
    paths.sort();
    println!("Found {} requests in {}", paths.len(), args.dir.display());

    // Calculators share nothing, so cases run independently
    let rows: Vec<SummaryRow> = paths.par_iter().map(|p| evaluate(p)).collect();

    let mut writer = csv::Writer::from_path(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    let failed = rows.iter().filter(|r| r.error.is_some()).count();
    println!("Rated {} cases ({} failed) in {:?}", rows.len() - failed, failed, start.elapsed());
    println!("Summary written to {}", args.output.display());

    Ok(())
}
