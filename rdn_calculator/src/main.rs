use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use rdn_calculator::data_loader::load_prices_csv;
use rdn_calculator::report::monthly_breakdown;
use rdn_calculator::{
    CalculationRequest, CalculatorError, ErrorReport, PortfolioResult, RawParams, StorageCalculator,
};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rdn_calculator")]
#[command(about = "Optimal daily charge/discharge cycles for energy storage on day-ahead (RDN) prices")]
struct Args {
    /// Calculation request JSON ({"params": ..., "prices": [...]}); read from stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Hourly prices as CSV (date,hour,price_rdn_pln_mwh) instead of a request document
    #[arg(long, conflicts_with = "input")]
    prices_csv: Option<PathBuf>,

    /// Parameters JSON to use together with --prices-csv
    #[arg(long, requires = "prices_csv")]
    params: Option<PathBuf>,

    /// Override the maximum number of cycles per day
    #[arg(long)]
    max_cycles: Option<i64>,

    /// Override the minimum spread per cycle (PLN)
    #[arg(long)]
    min_spread: Option<f64>,

    /// Override the round-trip efficiency (0-1)
    #[arg(short, long)]
    efficiency: Option<f64>,

    /// Override the tie policy
    #[arg(long, value_enum)]
    tie_policy: Option<TieArg>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Attach the monthly and hourly report to JSON output
    #[arg(long)]
    report: bool,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
    Summary,
}

#[derive(Clone, ValueEnum)]
enum TieArg {
    Earliest,
    Latest,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(err) = run(&args) {
        println!("{}", error_json(&err));
        std::process::exit(1);
    }
}

/// `{"error": ..., "type": ...}` for a failed run, typed when the cause is a
/// calculator error.
fn error_json(err: &anyhow::Error) -> serde_json::Value {
    let report = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<CalculatorError>())
        .map_or_else(
            || ErrorReport {
                error: format!("{err:#}"),
                error_type: "Error".to_string(),
            },
            CalculatorError::report,
        );
    serde_json::to_value(&report)
        .unwrap_or_else(|_| serde_json::json!({"error": report.error, "type": report.error_type}))
}

fn run(args: &Args) -> Result<()> {
    let mut request = load_request(args)?;
    apply_overrides(&mut request.params, args);

    let calculator = StorageCalculator::new(request.config());
    let series = request.series();
    info!(
        "Loaded {} price records over {} days",
        request.prices.len(),
        series.len()
    );

    let result = if args.report {
        calculator.calculate_with_report(&series)
    } else {
        calculator.calculate(&series)
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &result)?;
            writeln!(out)?;
        }
        OutputFormat::Csv => write_cycles_csv(&result, &mut out)?,
        OutputFormat::Summary => write_summary(&result, calculator.config(), &mut out)?,
    }

    Ok(())
}

fn load_request(args: &Args) -> Result<CalculationRequest> {
    if let Some(csv_path) = &args.prices_csv {
        let params = match &args.params {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("Failed to open {}", path.display()))?;
                serde_json::from_reader::<_, RawParams>(BufReader::new(file))
                    .map_err(CalculatorError::InvalidParams)?
            }
            None => RawParams::default(),
        };
        let prices = load_prices_csv(csv_path)?;
        return Ok(CalculationRequest { params, prices });
    }

    match &args.input {
        Some(path) => Ok(CalculationRequest::from_path(path)?),
        None => Ok(CalculationRequest::from_reader(io::stdin().lock())?),
    }
}

fn apply_overrides(params: &mut RawParams, args: &Args) {
    if let Some(max_cycles) = args.max_cycles {
        params.max_cycles_per_day = Some(max_cycles);
    }
    if let Some(min_spread) = args.min_spread {
        params.min_spread_pln_mwh = Some(min_spread);
    }
    if let Some(efficiency) = args.efficiency {
        params.efficiency = Some(efficiency);
    }
    if let Some(tie_policy) = &args.tie_policy {
        let name = match tie_policy {
            TieArg::Earliest => "earliest",
            TieArg::Latest => "latest",
        };
        params.tie_policy = Some(name.to_string());
    }
}

fn write_cycles_csv<W: Write>(result: &PortfolioResult, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    for cycle in &result.cycles {
        writer.serialize(cycle)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_summary<W: Write>(
    result: &PortfolioResult,
    config: &rdn_calculator::StorageConfig,
    mut out: W,
) -> Result<()> {
    let kpi = &result.kpi;
    let financial = &result.financial;
    let period = match (result.metadata.start_date, result.metadata.end_date) {
        (Some(start), Some(end)) => format!("{start} to {end}"),
        _ => "no price data".to_string(),
    };

    writeln!(out, "RDN Storage Arbitrage Summary")?;
    writeln!(out, "=============================")?;
    writeln!(out, "Period: {period} ({} days)", result.metadata.total_days)?;
    writeln!(
        out,
        "Storage: {} MW / {} MWh, SoC {:.0}%-{:.0}%, usable {:.2} MWh",
        kpi.power_mw,
        kpi.capacity_mwh,
        kpi.soc_min * 100.0,
        kpi.soc_max * 100.0,
        kpi.usable_mwh
    )?;
    writeln!(out, "Efficiency: {:.1}%", kpi.efficiency * 100.0)?;
    writeln!(out, "Max cycles per day: {}", kpi.max_cycles)?;
    writeln!(out)?;
    writeln!(
        out,
        "Cycles: {} ({:.2}/day)",
        result.metadata.total_cycles, kpi.avg_cycles_per_day
    )?;
    writeln!(out, "Average spread per cycle: {:.2} PLN", kpi.avg_spread_per_cycle_pln)?;
    writeln!(
        out,
        "Effective spread: {:.2} PLN/MWh",
        kpi.effective_avg_spread_pln_mwh
    )?;
    writeln!(
        out,
        "Energy bought/sold/lost: {:.2} / {:.2} / {:.2} MWh",
        kpi.total_energy_bought_mwh, kpi.total_energy_sold_mwh, kpi.energy_loss_mwh
    )?;
    writeln!(out)?;
    writeln!(out, "Revenue: {:.2} PLN", financial.revenue_pln)?;
    writeln!(out, "Distribution cost: {:.2} PLN", financial.distribution_cost_pln)?;
    writeln!(out, "Profit: {:.2} PLN", financial.profit_pln)?;

    let months = monthly_breakdown(&result.cycles, config);
    if !months.is_empty() {
        writeln!(out)?;
        writeln!(out, "By month:")?;
        for month in months {
            writeln!(
                out,
                "  {}-{:02}: {} cycles, revenue {:.2} PLN, profit {:.2} PLN",
                month.year, month.month, month.cycle_count, month.revenue_pln, month.profit_pln
            )?;
        }
    }

    Ok(())
}
