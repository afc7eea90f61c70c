//! Sensitivity sweep over the built-in sample contract
//!
//! Scales each input by every multiplier in parallel and writes contractor
//! NPV, IRR and government take per point

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use psc_fiscal::{dataset, SensitivityParameter, SensitivityRunner};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Regime {
    CostRecovery,
    GrossSplit,
}

#[derive(Parser, Debug)]
#[command(name = "sensitivity_sweep")]
#[command(about = "Parallel sensitivity sweep over the sample PSC")]
struct Cli {
    #[arg(long, value_enum, default_value_t = Regime::CostRecovery)]
    regime: Regime,

    /// Comma-separated multipliers
    #[arg(long, value_delimiter = ',', default_values_t = [0.5, 0.75, 1.0, 1.25, 1.5])]
    multipliers: Vec<f64>,

    #[arg(long, default_value_t = 0.1)]
    discount_rate: f64,

    #[arg(long, default_value = "sensitivity_output.csv")]
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let (contract, args) = match cli.regime {
        Regime::CostRecovery => dataset::sample_cost_recovery()?,
        Regime::GrossSplit => dataset::sample_gross_split()?,
    };
    let runner = SensitivityRunner::new(contract, args).with_discount_rate(cli.discount_rate);

    let start = Instant::now();
    let points = runner.run_all(&cli.multipliers)?;
    println!(
        "Ran {} evaluations ({} parameters x {} multipliers) in {:?}",
        points.len(),
        SensitivityParameter::ALL.len(),
        cli.multipliers.len(),
        start.elapsed()
    );

    let mut writer =
        csv::Writer::from_path(&cli.output).with_context(|| format!("creating {}", cli.output.display()))?;
    for point in &points {
        writer.serialize(point)?;
    }
    writer.flush()?;

    println!("{:>10} {:>6} {:>14} {:>8}", "Parameter", "Mult", "NPV", "IRR");
    println!("{}", "-".repeat(42));
    for point in &points {
        let irr = point
            .contractor_irr
            .map(|r| format!("{:.2}%", r * 100.0))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "{:>10} {:>6.2} {:>14.2} {:>8}",
            point.parameter.as_str(), point.multiplier, point.contractor_npv, irr
        );
    }
    println!("\nWritten {} points to {}", points.len(), cli.output.display());
    Ok(())
}
