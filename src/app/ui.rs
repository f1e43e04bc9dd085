use egui::{ComboBox, Context};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use super::state::{run_fetch, FetchRequest};
use super::App;
use crate::analysis::{fetch_many, DataSource};
use crate::plotting::{generate_chart_async, save_png};
use crate::types::{ChartKind, GroupMode};

/// Draw the main application UI
pub fn draw_ui(
    app: &mut App,
    ctx: &Context,
    app_arc: Arc<Mutex<App>>,
    source: Arc<dyn DataSource>,
) {
    egui::SidePanel::left("side_panel").show(ctx, |ui| {
        ui.heading("Selection");
        ui.separator();

        // Year selection
        ui.label("Year:");
        let mut year = app.selection.year.clone();
        ComboBox::new("year_selector", "")
            .selected_text(&year)
            .show_ui(ui, |ui| {
                for option in &app.config.years {
                    ui.selectable_value(&mut year, option.clone(), option);
                }
            });
        if year != app.selection.year {
            let request = app.select_year(&year);
            spawn_fetch(request, ctx, app_arc.clone(), source.clone());
        }

        // Month selection
        ui.label("Month:");
        let mut month = app.selection.month.clone();
        ComboBox::new("month_selector", "")
            .selected_text(
                month
                    .as_ref()
                    .map(|m| format!("{}月", m))
                    .unwrap_or_else(|| "All".to_string()),
            )
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut month, None, "All");
                for m in 1..=12 {
                    ui.selectable_value(&mut month, Some(m.to_string()), format!("{}月", m));
                }
            });
        if month != app.selection.month {
            let request = match month {
                Some(month) => app.select_month(&month),
                None => app.select_whole_year(),
            };
            spawn_fetch(request, ctx, app_arc.clone(), source.clone());
        }

        // Grouping only applies within a month
        if app.selection.month.is_some() {
            ui.label("Group by:");
            let mut group = app.selection.group;
            ComboBox::new("group_selector", "")
                .selected_text(group.as_str())
                .show_ui(ui, |ui| {
                    for option in GroupMode::SELECTABLE {
                        ui.selectable_value(&mut group, option, option.as_str());
                    }
                });
            if group != app.selection.group {
                let request = app.select_group(group);
                spawn_fetch(request, ctx, app_arc.clone(), source.clone());
            }
        }

        ui.separator();

        // View selection buttons
        for kind in ChartKind::ALL {
            if ui.selectable_label(app.view == kind, kind.title()).clicked() {
                app.select_view(kind);
            }
        }

        ui.separator();
        ui.label("Export path:");
        ui.text_edit_singleline(&mut app.export_path);
        if ui.button("Export PNG").clicked() {
            match &app.chart {
                Some(chart) => match save_png(chart, Path::new(&app.export_path)) {
                    Ok(()) => info!(path = %app.export_path, "chart exported"),
                    Err(e) => app.error_message = Some(format!("Export failed: {}", e)),
                },
                None => app.error_message = Some("Nothing to export yet".to_string()),
            }
        }
    });

    egui::CentralPanel::default().show(ctx, |ui| {
        ui.heading("COVID-19 Call Center Statistics");
        ui.separator();

        if app.is_loading {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Loading...");
            });
        }
        if let Some(message) = &app.error_message {
            ui.colored_label(egui::Color32::LIGHT_RED, message);
        }

        ui.label(format!("Records: {}", app.records.len()));
        ui.label(format!("Total consultations: {}", app.total_count()));
        ui.separator();

        if !app.is_loading {
            if let Some(texture) = &app.chart_texture {
                ui.add(egui::Image::new(texture).shrink_to_fit());
            }
        }
    });

    // Update chart if needed
    if app.update_needed {
        app.update_needed = false;
        spawn_chart(app, ctx, app_arc);
    }
    load_chart_texture(app, ctx);
}

/// Start the initial fetch for the current selection and prefetch the
/// remaining configured years.
pub fn start(app_arc: Arc<Mutex<App>>, source: Arc<dyn DataSource>, ctx: Context) {
    let (request, prefetch) = match app_arc.lock() {
        Ok(mut app) => {
            let request = app.request_current();
            (request, app.prefetch_requests())
        }
        Err(_) => return,
    };
    spawn_fetch(request, &ctx, app_arc.clone(), source.clone());

    tokio::spawn(async move {
        let periods: Vec<_> = prefetch.iter().map(|r| r.period).collect();
        let results = fetch_many(source.as_ref(), &periods).await;
        if let Ok(mut app) = app_arc.lock() {
            for (request, (_, result)) in prefetch.into_iter().zip(results) {
                app.commit_fetch(request.key, result);
            }
        }
        ctx.request_repaint();
    });
}

fn spawn_fetch(
    request: Option<FetchRequest>,
    ctx: &Context,
    app_arc: Arc<Mutex<App>>,
    source: Arc<dyn DataSource>,
) {
    let Some(request) = request else {
        return;
    };
    let ctx = ctx.clone();
    tokio::spawn(async move {
        run_fetch(app_arc, source, request).await;
        ctx.request_repaint();
    });
}

fn spawn_chart(app: &App, ctx: &Context, app_arc: Arc<Mutex<App>>) {
    let request = app.chart_request();
    let ctx = ctx.clone();
    tokio::spawn(async move {
        match generate_chart_async(request.clone()).await {
            Ok(chart) => {
                if let Ok(mut app) = app_arc.lock() {
                    app.commit_chart(&request, chart);
                }
            }
            Err(e) => {
                warn!(error = %e, "chart rendering failed");
                if let Ok(mut app) = app_arc.lock() {
                    app.error_message = Some(format!("Plotting error: {}", e));
                }
            }
        }
        ctx.request_repaint();
    });
}

fn load_chart_texture(app: &mut App, ctx: &Context) {
    if app.chart_texture.is_some() {
        return;
    }
    if let Some(chart) = &app.chart {
        let size = [chart.width as usize, chart.height as usize];
        let texture = ctx.load_texture(
            "chart_texture",
            egui::ColorImage::from_rgb(size, &chart.pixels),
            egui::TextureOptions::LINEAR,
        );
        app.chart_texture = Some(texture);
    }
}
