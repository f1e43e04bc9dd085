//! Call Center Statistics Viewer
//!
//! A GUI application for browsing the Tokyo COVID-19 call-center statistics.

use eframe::egui;
use std::sync::{Arc, Mutex};
use tokio::runtime::Runtime;
use tracing::{error, warn};

use callstats::analysis::{DataSource, HttpDataSource};
use callstats::app::{start, App, AppWrapper};
use callstats::config::Config;
use callstats::utils::init_tracing;

fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "using default configuration");
        Config::default()
    });
    let source: Arc<dyn DataSource> = Arc::new(HttpDataSource::new(&config)?);

    // Initialize the Tokio runtime
    let rt = Runtime::new()?;
    rt.block_on(async {
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([1200.0, 800.0])
                .with_min_inner_size([800.0, 600.0])
                .with_title("COVID-19 Call Center Statistics"),
            ..Default::default()
        };

        if let Err(e) = eframe::run_native(
            "COVID-19 Call Center Statistics",
            options,
            Box::new(move |cc| {
                let app: Arc<Mutex<App>> = Arc::new(Mutex::new(App::with_config(config)));
                start(Arc::clone(&app), Arc::clone(&source), cc.egui_ctx.clone());
                Ok(Box::new(AppWrapper { app, source }) as Box<dyn eframe::App>)
            }),
        ) {
            error!("Error running application: {}", e);
        }
    });

    Ok(())
}
