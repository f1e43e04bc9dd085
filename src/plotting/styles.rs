use plotters::style::{RGBAColor, RGBColor};

/// Chart theme configuration
pub struct ChartTheme {
    pub background_color: RGBColor,
    pub text_color: RGBAColor,
    pub grid_color: RGBAColor,
    pub axis_color: RGBAColor,
    pub line_color: RGBColor,
    /// Calendar cell colour for a zero count
    pub heat_low: RGBColor,
    /// Calendar cell colour for the period maximum
    pub heat_high: RGBColor,
}

impl Default for ChartTheme {
    fn default() -> Self {
        Self {
            background_color: RGBColor(18, 18, 18),
            text_color: RGBAColor(255, 255, 255, 0.8),
            grid_color: RGBAColor(255, 255, 255, 0.15),
            axis_color: RGBAColor(255, 255, 255, 0.8),
            // hsl(32, 70%, 50%)
            line_color: RGBColor(217, 133, 38),
            heat_low: RGBColor(40, 40, 40),
            heat_high: RGBColor(230, 126, 34),
        }
    }
}

impl ChartTheme {
    /// Slice colours for the pie chart, cycled when there are more buckets.
    pub fn palette(&self) -> [RGBColor; 8] {
        [
            RGBColor(232, 193, 160),
            RGBColor(244, 117, 96),
            RGBColor(241, 225, 91),
            RGBColor(232, 168, 56),
            RGBColor(97, 205, 187),
            RGBColor(151, 227, 213),
            RGBColor(135, 206, 250),
            RGBColor(100, 149, 237),
        ]
    }

    /// Interpolate between `heat_low` and `heat_high` by `count / max`.
    pub fn heat_color(&self, count: u64, max: u64) -> RGBColor {
        if max == 0 {
            return self.heat_low;
        }
        let t = (count as f64 / max as f64).clamp(0.0, 1.0);
        let mix = |lo: u8, hi: u8| (lo as f64 + (hi as f64 - lo as f64) * t).round() as u8;
        RGBColor(
            mix(self.heat_low.0, self.heat_high.0),
            mix(self.heat_low.1, self.heat_high.1),
            mix(self.heat_low.2, self.heat_high.2),
        )
    }
}

/// Chart style configuration
pub struct ChartStyle {
    pub line_width: u32,
    pub font_size: u32,
    pub margin: u32,
    pub label_area_size: u32,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            line_width: 2,
            font_size: 15,
            margin: 10,
            label_area_size: 50,
        }
    }
}
