mod bootstrap;
mod report;

use anyhow::{Context, Result};
use insights_core::settings::Settings;
use insights_data::reader::{issue_tables, load_issues};
use insights_runtime::orchestrator::InsightsOrchestrator;
use insights_runtime::pipeline::{derive_tables, DerivedTables, ViewOptions};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Issue Insights v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "View: {}, Unit: {}, Prefix: {}, Timezone: {}",
        settings.view,
        settings.unit,
        settings.label_prefix,
        settings.timezone
    );

    let data_path = settings
        .input
        .clone()
        .or_else(bootstrap::discover_data_path)
        .context("No issue exports found; pass --input <file or directory>")?;

    let options = ViewOptions {
        unit: settings.time_unit(),
        label_prefix: settings.label_prefix.clone(),
        timezone: settings.tz(),
    };

    if !settings.watch {
        let issues = load_issues(&data_path)?;
        let derived = derive_tables(&issue_tables(&issues), &options, 1);
        print!("{}", report::render(&derived, &settings.view, &settings.format)?);
        return Ok(());
    }

    tracing::info!("Watching {} every {}s", data_path.display(), settings.refresh_rate);

    let orchestrator =
        InsightsOrchestrator::new(u64::from(settings.refresh_rate), data_path, options);
    let (mut rx, handle) = orchestrator.start();
    let mut last_shown: Option<DerivedTables> = None;

    loop {
        tokio::select! {
            received = rx.recv() => {
                let Some(derived) = received else { break };
                if last_shown.as_ref().is_some_and(|prev| same_content(prev, &derived)) {
                    tracing::debug!(generation = derived.generation, "no changes since last render");
                    continue;
                }
                print!("{}", report::render(&derived, &settings.view, &settings.format)?);
                last_shown = Some(derived);
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received; shutting down refresh task");
                break;
            }
        }
    }

    handle.abort();
    Ok(())
}

/// Whether two results would render identically.
fn same_content(a: &DerivedTables, b: &DerivedTables) -> bool {
    a.options == b.options
        && a.labels == b.labels
        && a.timeseries == b.timeseries
        && a.summary == b.summary
        && a.conformance == b.conformance
}
