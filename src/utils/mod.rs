use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initializes the global tracing subscriber, honouring `RUST_LOG`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let mut filter = EnvFilter::from_default_env();
        if let Ok(directive) = "callstats=info".parse() {
            filter = filter.add_directive(directive);
        }

        fmt().with_env_filter(filter).init();
    });
}

/// Format a count with K/M suffixes for axis labels
pub fn format_count(value: f64) -> String {
    if value.abs() >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if value.abs() >= 1_000.0 {
        format!("{:.1}K", value / 1_000.0)
    } else {
        format!("{:.0}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(12.0), "12");
        assert_eq!(format_count(1_500.0), "1.5K");
        assert_eq!(format_count(2_340_000.0), "2.3M");
    }
}
