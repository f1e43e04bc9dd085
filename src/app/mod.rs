mod state;
mod ui;

pub use state::{run_fetch, App, FetchRequest};
pub use ui::{draw_ui, start};

use eframe::App as EApp;
use std::sync::{Arc, Mutex};
use tracing::error;

use crate::analysis::DataSource;

/// Thread-safe wrapper around App for use with eframe
pub struct AppWrapper {
    pub app: Arc<Mutex<App>>,
    pub source: Arc<dyn DataSource>,
}

impl EApp for AppWrapper {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Ok(mut app) = self.app.lock() {
            draw_ui(&mut app, ctx, Arc::clone(&self.app), Arc::clone(&self.source));
        } else {
            error!("Failed to acquire app lock in update");
        }
    }
}
