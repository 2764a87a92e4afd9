use accounting_client::AccountingClient;
use anyhow::{Context, Result};
use chrono::Local;

fn main() -> Result<()> {
    logger::init();

    let settings = settings_loader::load_export_settings().context("loading export settings")?;
    let client = AccountingClient::new(&settings.endpoint)?;
    tracing::info!(
        endpoint = %client.endpoint(),
        root = %settings.export_root.display(),
        "starting export"
    );

    // Captured once: names the output directory and bounds every series.
    let today = Local::now().date_naive();

    let summary = data_pipeline::run(&settings, &client, today)?;
    tracing::info!(
        fetched = summary.fetched,
        aggregated = summary.aggregated,
        months = summary.months,
        files = summary.files.len(),
        "done"
    );

    println!("Data exported to {}", summary.output_dir.display());
    Ok(())
}
