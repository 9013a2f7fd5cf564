mod bootstrap;

use std::path::Path;

use anyhow::{bail, Result};
use eis_core::settings::Settings;
use eis_data::aggregator::AggregationPolicy;
use eis_data::export::write_measurement_csv;
use eis_runtime::loader::{load_exports, resolve_plot_inputs};
use eis_runtime::pipeline::{BatchPipeline, ErrorPolicy};
use eis_ui::app::App;
use eis_ui::charts::RenderKind;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    let app_dir = bootstrap::ensure_directories()?;

    // The viewer owns the terminal, so plot mode logs to a file only.
    let plot = settings.mode == "plot";
    let log_file = settings
        .log_file
        .clone()
        .or_else(|| plot.then(|| bootstrap::default_log_file(&app_dir)));
    bootstrap::setup_logging(&settings.log_level, log_file.as_deref(), !plot)?;

    tracing::info!("EIS tool v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Mode: {}, Chart: {}, Policy: {}, Theme: {}",
        settings.mode,
        settings.chart,
        settings.policy,
        settings.theme
    );

    let input = settings
        .input
        .clone()
        .unwrap_or_else(bootstrap::discover_input_dir);

    match settings.mode.as_str() {
        "batch" => run_batch(&settings, &input).await,
        "plot" => run_plot(&settings, &input).await,
        unknown => bail!("Unknown mode: {unknown}"),
    }
}

async fn run_batch(settings: &Settings, input: &Path) -> Result<()> {
    let policy: AggregationPolicy = settings.policy.parse()?;
    let on_error: ErrorPolicy = settings.on_error.parse()?;
    let pipeline = BatchPipeline::new(policy, on_error, settings.extension.clone(), settings.folders);

    let report = pipeline.run(input).await?;
    let sidecar = report.persist(&settings.output)?;

    println!("{}", report.summary());
    println!("Combined table: {}", settings.output.display());
    println!("Report: {}", sidecar.display());
    for failure in &report.failures {
        eprintln!("  skipped {}: {}", failure.path.display(), failure.message);
    }
    Ok(())
}

async fn run_plot(settings: &Settings, input: &Path) -> Result<()> {
    let paths = resolve_plot_inputs(input, &settings.extension)?;
    let loaded = load_exports(paths).await?;

    for failure in &loaded.failures {
        eprintln!("skipped {}: {}", failure.path.display(), failure.message);
    }

    let Some(first) = loaded.exports.first() else {
        bail!(
            "No parsable *.{} exports found in {}",
            settings.extension,
            input.display()
        );
    };

    if let Some(path) = &settings.export_table {
        write_measurement_csv(&first.table, path)?;
        println!("Measurement table: {}", path.display());
    }

    let app = App::new(&settings.theme, initial_chart(&settings.chart));
    app.run_charts(loaded.exports).await?;
    Ok(())
}

/// Chart kind to open with. A saved name that no longer matches a kind falls
/// back to Nyquist.
fn initial_chart(name: &str) -> RenderKind {
    RenderKind::from_name(name).unwrap_or_else(|| {
        tracing::warn!("Unknown chart {name:?}, showing nyquist");
        RenderKind::Nyquist
    })
}
