use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::PathBuf;

mod batch_processor;

use batch_processor::{BatchProcessor, SUMMARY_FILE};

#[derive(Parser)]
#[command(name = "rdn_batch_processor")]
#[command(about = "Run saved RDN storage calculation requests in parallel")]
struct Args {
    /// Glob pattern for request files, e.g. "requests/**/*.json"
    #[arg(short, long)]
    pattern: String,

    /// Directory for the per-request results and the batch summary
    #[arg(short, long, default_value = "batch_results")]
    output_dir: PathBuf,

    /// Worker threads (defaults to all cores)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Attach the monthly and hourly report to every result
    #[arg(long)]
    report: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads.unwrap_or_else(num_cpus::get))
        .build_global()?;

    let processor = BatchProcessor::new(args.output_dir.clone())?.with_report(args.report);
    let outcomes = processor.process_pattern(&args.pattern)?;

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    let profit: f64 = outcomes.iter().filter_map(|o| o.profit_pln).sum();
    info!("Total profit across batch: {:.2} PLN", profit);

    println!("Processed {} requests ({} failed)", outcomes.len(), failed);
    println!(
        "Summary written to {}",
        args.output_dir.join(SUMMARY_FILE).display()
    );

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
