pub const DEFAULT_CURRENCY: &str = "usd";

/// Round to two decimal places, half away from zero on the cents value.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value * 100.0).round() / 100.0
}

pub fn to_minor_units(value: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    (value * 100.0).round() as i64
}

pub fn from_minor_units(cents: i64) -> f64 {
    round2(cents as f64 / 100.0)
}

pub fn format_usd(value: f64) -> String {
    format!("${:.2}", round2(value))
}
