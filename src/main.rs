//! PSC Fiscal CLI
//!
//! Command-line interface for evaluating PSC contracts and transitions

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use psc_fiscal::{
    dataset, CaseFile, ContractResult, ContractSummary, LimitMethod, TransitionCase, TransitionResult, YearRow,
};

#[derive(Parser, Debug)]
#[command(name = "psc_fiscal")]
#[command(about = "Evaluate Cost Recovery and Gross Split PSC economics")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a case and write the per-year consolidated cash flow
    Run(RunArgs),
    /// Print scalar indicators of a case
    Summary(SummaryArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Sample {
    CostRecovery,
    GrossSplit,
    Transition,
}

#[derive(Args, Debug)]
struct CaseInput {
    /// JSON case file for a single contract
    #[arg(long, conflicts_with = "transition")]
    case: Option<PathBuf>,

    /// JSON case file for two contracts in sequence
    #[arg(long)]
    transition: Option<PathBuf>,

    /// Built-in sample used when no case file is given
    #[arg(long, value_enum, default_value_t = Sample::CostRecovery)]
    sample: Sample,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    input: CaseInput,

    #[arg(long, default_value = "psc_output.csv")]
    output: PathBuf,

    /// Print the full result as JSON instead of the table
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct SummaryArgs {
    #[command(flatten)]
    input: CaseInput,

    #[arg(long, default_value_t = 0.1)]
    discount_rate: f64,

    /// e.g. "Maximum NPV"; defaults to maximum cumulative cash flow
    #[arg(long)]
    limit_method: Option<String>,
}

enum Evaluation {
    Contract(ContractResult),
    Transition(Box<TransitionResult>),
}

impl Evaluation {
    fn rows(&self) -> Vec<YearRow> {
        match self {
            Evaluation::Contract(r) => r.to_rows(),
            Evaluation::Transition(r) => r.to_rows(),
        }
    }

    fn summary(&self, discount_rate: f64, limit_method: LimitMethod) -> Result<ContractSummary> {
        Ok(match self {
            Evaluation::Contract(r) => r.summary(discount_rate, limit_method)?,
            Evaluation::Transition(r) => r.summary(discount_rate, limit_method)?,
        })
    }

    fn to_json(&self) -> Result<String> {
        Ok(match self {
            Evaluation::Contract(r) => serde_json::to_string_pretty(r)?,
            Evaluation::Transition(r) => serde_json::to_string_pretty(r)?,
        })
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn evaluate(input: &CaseInput) -> Result<Evaluation> {
    if let Some(path) = &input.transition {
        let (transition, args) = TransitionCase::from_json(&read(path)?)?.into_transition()?;
        return Ok(Evaluation::Transition(Box::new(transition.run(&args)?)));
    }

    let (contract, args) = match &input.case {
        Some(path) => CaseFile::from_json(&read(path)?)?.into_contract()?,
        None => match input.sample {
            Sample::CostRecovery => dataset::sample_cost_recovery()?,
            Sample::GrossSplit => dataset::sample_gross_split()?,
            Sample::Transition => {
                let (transition, args) = dataset::sample_transition()?;
                return Ok(Evaluation::Transition(Box::new(transition.run(&args)?)));
            }
        },
    };
    log::info!("running {} contract", contract.kind());
    Ok(Evaluation::Contract(contract.run(&args)?))
}

fn write_csv(path: &Path, rows: &[YearRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn run(args: &RunArgs) -> Result<()> {
    let evaluation = evaluate(&args.input)?;
    if args.json {
        println!("{}", evaluation.to_json()?);
        return Ok(());
    }

    let rows = evaluation.rows();
    println!("PSC Fiscal v{}", env!("CARGO_PKG_VERSION"));
    println!("==================\n");
    println!(
        "{:>5} {:>14} {:>14} {:>14} {:>14} {:>14} {:>14}",
        "Year", "Revenue", "Recovery", "Tax", "CtrTake", "GovTake", "Cashflow"
    );
    println!("{}", "-".repeat(100));
    for row in &rows {
        println!(
            "{:>5} {:>14.2} {:>14.2} {:>14.2} {:>14.2} {:>14.2} {:>14.2}",
            row.year,
            row.revenue,
            row.recovery,
            row.tax,
            row.contractor_take,
            row.government_take,
            row.cashflow,
        );
    }

    write_csv(&args.output, &rows)?;
    println!("\nFull results written to: {}", args.output.display());
    Ok(())
}

fn summary(args: &SummaryArgs) -> Result<()> {
    let limit_method = match &args.limit_method {
        Some(raw) => raw.parse::<LimitMethod>()?,
        None => LimitMethod::default(),
    };
    let evaluation = evaluate(&args.input)?;
    let s = evaluation.summary(args.discount_rate, limit_method)?;

    println!("Summary ({}..{}):", s.start_year, s.end_year);
    println!("  Total Revenue: {:.2}", s.total_revenue);
    println!("  Total Capital: {:.2}", s.total_capital);
    println!("  Total Non-Capital: {:.2}", s.total_non_capital);
    println!("  Contractor Take: {:.2}", s.contractor_take);
    println!("  Government Take: {:.2}", s.government_take);
    println!("  Contractor NPV @ {:.1}%: {:.2}", args.discount_rate * 100.0, s.contractor_npv);
    match s.contractor_irr {
        Some(irr) => println!("  Contractor IRR: {:.2}%", irr * 100.0),
        None => println!("  Contractor IRR: n/a"),
    }
    match s.contractor_pot {
        Some(pot) => println!("  Payout Time: {pot:.2} years"),
        None => println!("  Payout Time: n/a"),
    }
    println!("  Economic Limit ({limit_method}): {}", s.econ_limit_year);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Run(args) => run(args),
        Command::Summary(args) => summary(args),
    }
}
