//! Renewal Engine CLI
//!
//! Command-line interface for running a renewal case file

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use renewal_engine::claims::{load_claimants, load_claims};
use renewal_engine::{run, CalculationLine, LineValue, RenewalOutcome, RenewalRequest, RenewalResult};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "renewal_engine")]
#[command(about = "Group health renewal rating", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rate a renewal request and print the audit table
    Calculate {
        /// Request file (JSON, single or multi_plan mode)
        #[arg(short, long)]
        request: PathBuf,

        /// Monthly claims CSV replacing the request's claims (single mode only)
        #[arg(long)]
        claims: Option<PathBuf>,

        /// Large-claimant CSV replacing the request's claimants (single mode only)
        #[arg(long)]
        claimants: Option<PathBuf>,

        /// Write the full outcome as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Calculate { request, claims, claimants, output } => {
            calculate(request, claims, claimants, output)
        }
    }
}

fn calculate(
    request_path: PathBuf,
    claims: Option<PathBuf>,
    claimants: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<()> {
    let json = fs::read_to_string(&request_path)
        .with_context(|| format!("reading request {}", request_path.display()))?;
    let mut request = RenewalRequest::from_json(&json)
        .with_context(|| format!("parsing request {}", request_path.display()))?;

    if claims.is_some() || claimants.is_some() {
        let Some(input) = request.single_input_mut() else {
            bail!("--claims and --claimants apply to single-case requests only");
        };
        if let Some(path) = claims {
            input.claims = load_claims(&path).map_err(|e| anyhow!("loading claims {}: {}", path.display(), e))?;
        }
        if let Some(path) = claimants {
            input.large_claimants =
                load_claimants(&path).map_err(|e| anyhow!("loading claimants {}: {}", path.display(), e))?;
        }
    }

    println!("Renewal Engine v{}", env!("CARGO_PKG_VERSION"));
    println!("======================\n");
    println!("Case: {} ({})", request.case_id(), request.carrier());
    println!();

    let outcome = run(request).context("renewal calculation failed")?;

    match &outcome {
        RenewalOutcome::Single(result) => print_result(result),
        RenewalOutcome::MultiPlan(composite) => {
            for plan in &composite.plans {
                println!("Plan {} (enrollment {:.0})", plan.plan_id, plan.enrollment);
                print_result(&plan.result);
                println!();
            }
            println!("Composite:");
            println!("  Weighted Enrollment: {:.0}", composite.total_enrollment);
        }
    }

    println!("\nSummary:");
    println!("  Current Premium PMPM: ${:.2}", outcome.current_premium_pmpm());
    println!("  Renewal Premium PMPM: ${:.2}", outcome.final_premium_pmpm());
    println!("  Rate Change: {:+.2}%", outcome.rate_change() * 100.0);

    let warnings = outcome.warnings();
    if !warnings.is_empty() {
        println!("\nData Quality Warnings:");
        for warning in warnings {
            println!("  [{:?}] {}", warning.kind, warning.message);
        }
    }

    if let Some(path) = output {
        let body = serde_json::to_string_pretty(&outcome)?;
        fs::write(&path, body).with_context(|| format!("writing {}", path.display()))?;
        println!("\nFull results written to: {}", path.display());
    }

    Ok(())
}

fn print_result(result: &RenewalResult) {
    println!(
        "{:>3} {:<38} {:>14} {:>14} {:>14} {:>14}",
        "#", "Line", "Medical", "Rx", "Total", "Prior Total"
    );
    println!("{}", "-".repeat(102));
    for line in &result.calculations {
        println!("{}", format_line(line));
    }
    println!(
        "Credibility {:.4}, {} current months{}",
        result.data_quality.credibility,
        result.summary.months.current,
        match result.summary.months.prior {
            Some(months) => format!(", {} prior months", months),
            None => String::new(),
        }
    );
}

fn format_line(line: &CalculationLine) -> String {
    let head = format!("{:>3} {:<38}", line.number, line.label);
    match &line.value {
        LineValue::Amount(p) => format!(
            "{} {:>14.2} {:>14.2} {:>14.2} {:>14}",
            head,
            p.current.medical(),
            p.current.rx(),
            p.current.total(),
            p.prior.map(|f| format!("{:.2}", f.total())).unwrap_or_default()
        ),
        LineValue::Factor(p) => format!(
            "{} {:>14.6} {:>14.6} {:>14} {:>14}",
            head,
            p.current.medical,
            p.current.rx,
            "",
            p.prior.map(|f| format!("{:.6}/{:.6}", f.medical, f.rx)).unwrap_or_default()
        ),
        LineValue::Scalar(p) => format!(
            "{} {:>14} {:>14} {:>14.4} {:>14}",
            head,
            "",
            "",
            p.current,
            p.prior.map(|v| format!("{:.4}", v)).unwrap_or_default()
        ),
        LineValue::Dual { pmpm, annual } => format!(
            "{} {:>14.2} {:>14.2} {:>14.2} {:>14}",
            head,
            pmpm.medical(),
            pmpm.rx(),
            pmpm.total(),
            format!("${:.0}/yr", annual.total())
        ),
    }
}
