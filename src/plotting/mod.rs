mod chart;
pub mod styles;


pub use chart::{
    calendar_cells, generate_chart_async, render_chart, save_png, slice_sizes, value_ceiling,
    CalendarCell, ChartRequest, RenderedChart, SERIES_LABEL,
};
