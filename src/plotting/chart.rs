use chrono::{Datelike, NaiveDate};
use lru::LruCache;
use once_cell::sync::Lazy;
use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex as TokioMutex;
use tracing::debug;

use super::styles::{ChartStyle, ChartTheme};
use crate::analysis::DayIndex;
use crate::error::{Result, StatsError};
use crate::types::{Bucket, ChartKind, Period, WEEKDAY_NAMES};
use crate::utils::format_count;

/// Legend and axis label of the plotted series.
pub const SERIES_LABEL: &str = "相談件数";

const CACHE_TTL: Duration = Duration::from_secs(300);

// Rendered charts keyed by a hash of their request
static CHART_CACHE: Lazy<TokioMutex<LruCache<u64, (Arc<RenderedChart>, Instant)>>> =
    Lazy::new(|| {
        TokioMutex::new(LruCache::new(
            NonZeroUsize::new(10).unwrap_or(NonZeroUsize::MIN),
        ))
    });

/// Everything a renderer needs, detached from the app state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChartRequest {
    pub kind: ChartKind,
    pub title: String,
    /// Ordered series for the line and pie charts
    pub buckets: Vec<Bucket>,
    /// Every date of the period with its count, for the calendar
    pub calendar: Vec<(NaiveDate, u64)>,
    pub width: u32,
    pub height: u32,
}

impl ChartRequest {
    pub fn new(
        kind: ChartKind,
        title: impl Into<String>,
        buckets: &[Bucket],
        period: Option<Period>,
        index: &DayIndex,
    ) -> Self {
        let calendar = match (kind, period) {
            (ChartKind::Calendar, Some(period)) => {
                period.days().map(|d| (d, index.count_for(d))).collect()
            }
            _ => Vec::new(),
        };
        let buckets = match kind {
            ChartKind::Calendar => Vec::new(),
            _ => buckets.to_vec(),
        };

        Self {
            kind,
            title: title.into(),
            buckets,
            calendar,
            width: 960,
            height: 540,
        }
    }

    fn cache_key(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// An RGB pixel buffer produced by a renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedChart {
    pub width: u32,
    pub height: u32,
    /// Row-major RGB8 pixels, `width * height * 3` bytes
    pub pixels: Vec<u8>,
}

/// A calendar cell position: week column and weekday row (Sunday = 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub column: u32,
    pub row: u32,
}

fn plot_err<E: std::fmt::Display>(e: E) -> StatsError {
    StatsError::Plot(e.to_string())
}

/// Render a chart, reusing a recent rendering of an identical request
pub async fn generate_chart_async(request: ChartRequest) -> Result<Arc<RenderedChart>> {
    let cache_key = request.cache_key();

    if let Some((chart, rendered_at)) = CHART_CACHE.lock().await.get(&cache_key) {
        if rendered_at.elapsed() < CACHE_TTL {
            debug!(kind = ?request.kind, "chart cache hit");
            return Ok(chart.clone());
        }
    }

    let chart = tokio::task::spawn_blocking(move || render_chart(&request))
        .await
        .map_err(plot_err)??;
    let chart = Arc::new(chart);

    CHART_CACHE
        .lock()
        .await
        .put(cache_key, (chart.clone(), Instant::now()));

    Ok(chart)
}

/// Render a chart into an in-memory RGB buffer
pub fn render_chart(request: &ChartRequest) -> Result<RenderedChart> {
    let theme = ChartTheme::default();
    let style = ChartStyle::default();
    let (width, height) = (request.width, request.height);
    let mut pixels = vec![0u8; width as usize * height as usize * 3];

    {
        let root = BitMapBackend::with_buffer(&mut pixels, (width, height)).into_drawing_area();
        root.fill(&theme.background_color).map_err(plot_err)?;

        match request.kind {
            ChartKind::Line => draw_line_chart(&root, request, &theme, &style)?,
            ChartKind::Pie => draw_pie_chart(&root, request, &theme, &style)?,
            ChartKind::Calendar => draw_calendar(&root, request, &theme, &style)?,
        }

        root.present().map_err(plot_err)?;
    }

    Ok(RenderedChart {
        width,
        height,
        pixels,
    })
}

/// Write a rendered chart to `path` as PNG
pub fn save_png(chart: &RenderedChart, path: &Path) -> Result<()> {
    let image = image::RgbImage::from_raw(chart.width, chart.height, chart.pixels.clone())
        .ok_or_else(|| StatsError::Plot("pixel buffer does not match chart size".to_string()))?;
    image.save(path)?;
    Ok(())
}

fn draw_empty(
    root: &DrawingArea<BitMapBackend, Shift>,
    title: &str,
    theme: &ChartTheme,
) -> Result<()> {
    let area = root
        .titled(title, ("sans-serif", 30.0).into_font().color(&theme.text_color))
        .map_err(plot_err)?;
    let (w, h) = area.dim_in_pixel();
    area.draw(&Text::new(
        "No data",
        ((w / 2) as i32, (h / 2) as i32),
        ("sans-serif", 20.0)
            .into_font()
            .color(&theme.text_color)
            .pos(Pos::new(HPos::Center, VPos::Center)),
    ))
    .map_err(plot_err)?;
    Ok(())
}

fn draw_line_chart(
    root: &DrawingArea<BitMapBackend, Shift>,
    request: &ChartRequest,
    theme: &ChartTheme,
    style: &ChartStyle,
) -> Result<()> {
    if request.buckets.is_empty() {
        return draw_empty(root, &request.title, theme);
    }

    let labels: Vec<String> = request.buckets.iter().map(|b| b.label.clone()).collect();
    let points: Vec<(f64, f64)> = request
        .buckets
        .iter()
        .enumerate()
        .map(|(i, b)| (i as f64, b.sum as f64))
        .collect();
    let max_val = value_ceiling(request.buckets.iter().map(|b| b.sum));

    let mut chart = ChartBuilder::on(root)
        .caption(
            &request.title,
            ("sans-serif", 30.0).into_font().color(&theme.text_color),
        )
        .margin(style.margin)
        .set_all_label_area_size(style.label_area_size)
        .build_cartesian_2d(-0.5f64..(labels.len() as f64 - 0.5), 0f64..max_val)
        .map_err(plot_err)?;

    // Point scale: only integer positions carry a bucket label
    let step = (labels.len() / 12).max(1);
    let x_label_formatter = |x: &f64| {
        let rounded = x.round();
        if (x - rounded).abs() > 1e-6 || rounded < 0.0 {
            return String::new();
        }
        let idx = rounded as usize;
        if idx < labels.len() && idx % step == 0 {
            labels[idx].clone()
        } else {
            String::new()
        }
    };
    let y_label_formatter = |y: &f64| format_count(*y);

    chart
        .configure_mesh()
        .light_line_style(TRANSPARENT)
        .bold_line_style(theme.grid_color)
        .axis_style(theme.axis_color)
        .x_labels(labels.len().min(24))
        .y_desc(SERIES_LABEL)
        .label_style(
            ("sans-serif", style.font_size as f64)
                .into_font()
                .color(&theme.text_color),
        )
        .x_label_formatter(&x_label_formatter)
        .y_label_formatter(&y_label_formatter)
        .draw()
        .map_err(plot_err)?;

    let line_color = theme.line_color;
    chart
        .draw_series(LineSeries::new(
            points.clone(),
            line_color.stroke_width(style.line_width),
        ))
        .map_err(plot_err)?
        .label(SERIES_LABEL)
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], line_color));

    chart
        .draw_series(
            points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 5, line_color.filled())),
        )
        .map_err(plot_err)?;

    chart
        .configure_series_labels()
        .background_style(theme.background_color.mix(0.8))
        .border_style(theme.axis_color)
        .label_font(
            ("sans-serif", style.font_size as f64)
                .into_font()
                .color(&theme.text_color),
        )
        .position(SeriesLabelPosition::UpperRight)
        .draw()
        .map_err(plot_err)?;

    Ok(())
}

fn draw_pie_chart(
    root: &DrawingArea<BitMapBackend, Shift>,
    request: &ChartRequest,
    theme: &ChartTheme,
    style: &ChartStyle,
) -> Result<()> {
    let sizes = slice_sizes(&request.buckets);
    if sizes.iter().sum::<f64>() <= 0.0 {
        return draw_empty(root, &request.title, theme);
    }

    let area = root
        .titled(
            &request.title,
            ("sans-serif", 30.0).into_font().color(&theme.text_color),
        )
        .map_err(plot_err)?;
    let (w, h) = area.dim_in_pixel();
    let center = ((w / 2) as i32, (h / 2) as i32);
    let radius = w.min(h) as f64 * 0.35;

    let palette = theme.palette();
    let colors: Vec<RGBColor> = (0..sizes.len())
        .map(|i| palette[i % palette.len()])
        .collect();
    let labels: Vec<String> = request.buckets.iter().map(|b| b.label.clone()).collect();

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.start_angle(-90.0);
    pie.label_style(
        ("sans-serif", style.font_size as f64)
            .into_font()
            .color(&theme.text_color),
    );
    pie.percentages(("sans-serif", style.font_size as f64 * 0.8).into_font().color(&BLACK));
    area.draw(&pie).map_err(plot_err)?;

    Ok(())
}

fn draw_calendar(
    root: &DrawingArea<BitMapBackend, Shift>,
    request: &ChartRequest,
    theme: &ChartTheme,
    style: &ChartStyle,
) -> Result<()> {
    if request.calendar.is_empty() {
        return draw_empty(root, &request.title, theme);
    }

    let area = root
        .titled(
            &request.title,
            ("sans-serif", 30.0).into_font().color(&theme.text_color),
        )
        .map_err(plot_err)?;
    let (w, h) = area.dim_in_pixel();

    let cells = calendar_cells(request.calendar.iter().map(|(date, _)| *date));
    let columns = cells.last().map(|c| c.column + 1).unwrap_or(1) as i32;
    let max = request.calendar.iter().map(|(_, count)| *count).max().unwrap_or(0);

    let margin = style.margin as i32;
    let label_width = 40;
    let top = 28;
    let cell = ((w as i32 - label_width - margin) / columns)
        .min((h as i32 - top - margin) / 7)
        .max(4);
    let small_font = ("sans-serif", style.font_size as f64 * 0.8)
        .into_font()
        .color(&theme.text_color);

    for (row, name) in WEEKDAY_NAMES.iter().enumerate() {
        let short: String = name.chars().take(1).collect();
        area.draw(&Text::new(
            short,
            (margin, top + row as i32 * cell + cell / 2),
            small_font.pos(Pos::new(HPos::Left, VPos::Center)),
        ))
        .map_err(plot_err)?;
    }

    for (cell_pos, (date, count)) in cells.iter().zip(&request.calendar) {
        let x0 = label_width + cell_pos.column as i32 * cell;
        let y0 = top + cell_pos.row as i32 * cell;

        if date.day() == 1 {
            area.draw(&Text::new(
                format!("{}月", date.month()),
                (x0, top / 2),
                small_font.pos(Pos::new(HPos::Left, VPos::Center)),
            ))
            .map_err(plot_err)?;
        }

        area.draw(&Rectangle::new(
            [(x0 + 1, y0 + 1), (x0 + cell - 1, y0 + cell - 1)],
            theme.heat_color(*count, max).filled(),
        ))
        .map_err(plot_err)?;

        // Month-sized grids have room for the day number and its count
        if cell >= 36 {
            area.draw(&Text::new(
                date.day().to_string(),
                (x0 + 4, y0 + 4),
                small_font.pos(Pos::new(HPos::Left, VPos::Top)),
            ))
            .map_err(plot_err)?;
            area.draw(&Text::new(
                count.to_string(),
                (x0 + cell / 2, y0 + cell * 2 / 3),
                small_font.pos(Pos::new(HPos::Center, VPos::Center)),
            ))
            .map_err(plot_err)?;
        }
    }

    Ok(())
}

/// Lay out consecutive dates in week columns, Sunday on the first row.
pub fn calendar_cells(dates: impl Iterator<Item = NaiveDate>) -> Vec<CalendarCell> {
    let mut cells = Vec::new();
    let mut first: Option<NaiveDate> = None;

    for date in dates {
        let start = *first.get_or_insert(date);
        let offset = start.weekday().num_days_from_sunday() as i64;
        let position = (offset + (date - start).num_days()).max(0) as u32;
        cells.push(CalendarCell {
            date,
            column: position / 7,
            row: date.weekday().num_days_from_sunday(),
        });
    }

    cells
}

/// Pie slice sizes in bucket order.
pub fn slice_sizes(buckets: &[Bucket]) -> Vec<f64> {
    buckets.iter().map(|b| b.sum as f64).collect()
}

/// Upper bound of the value axis with 10% headroom.
pub fn value_ceiling(values: impl Iterator<Item = u64>) -> f64 {
    let max = values.max().unwrap_or(0).max(1) as f64;
    max * 1.1
}
