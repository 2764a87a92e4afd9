use anyhow::{anyhow, Context, Result};
use clap::Parser;
use data_pipeline::compare::{compare_series, latest_export_dir, read_series, CompareOptions};
use models::MonthKey;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "compare-exports",
    author,
    version,
    about = "Compare an exported monthly series against a reference series",
    long_about = None
)]
struct Args {
    /// Reference series file (same `data.analytics.series` layout)
    #[arg(short, long)]
    reference: PathBuf,

    /// Series file under test; defaults to the "all" file of the latest export
    #[arg(short, long)]
    test: Option<PathBuf>,

    /// First period to compare (YYYY/MM)
    #[arg(long, default_value = "2023/01")]
    since: MonthKey,

    /// Smallest absolute difference to list
    #[arg(long, default_value_t = 1.0)]
    threshold: f64,

    /// Print the report as JSON instead of text
    #[arg(long)]
    json: bool,
}

fn resolve_test_file(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }

    let settings = settings_loader::load_export_settings()?;
    let dir = latest_export_dir(&settings.export_root, &settings.export_dir_prefix)?
        .ok_or_else(|| {
            anyhow!(
                "no {}* directory under {}",
                settings.export_dir_prefix,
                settings.export_root.display()
            )
        })?;
    tracing::info!(dir = %dir.display(), "using latest export");
    Ok(dir.join(&settings.file_names.all))
}

fn main() -> Result<()> {
    logger::init();
    let args = Args::parse();

    let test_path = resolve_test_file(args.test)?;
    let test = read_series(&test_path)?;
    let reference = read_series(&args.reference)?;

    let options = CompareOptions {
        since: args.since,
        threshold: args.threshold,
    };
    let report = compare_series(&test, &reference, &options);

    if args.json {
        let out = serde_json::to_string_pretty(&report).context("serializing report")?;
        println!("{out}");
        return Ok(());
    }

    println!("Test file     : {}", test_path.display());
    println!("Reference file: {}", args.reference.display());
    println!(
        "Compared {} months from {} ({} exact matches)",
        report.compared, options.since, report.matched
    );
    println!("Accuracy: {}%", report.accuracy.round());
    println!("Total difference: {}", report.total_difference.round());
    println!("Months with significant differences (>= {}):", options.threshold);
    for diff in &report.months_with_differences {
        println!(
            "{}: Difference: {}, Test: {}, Compared: {}",
            diff.period,
            diff.difference.round(),
            diff.test_value.round(),
            diff.reference_value.round()
        );
    }
    Ok(())
}
