//! Lenient numeric parsing and canonical rendering for price/area bounds.

/// Parse a loosely formatted number (`"3000000"`, `"3.000.000"`, `"2,5"`, `" 22 "`).
///
/// Returns `None` for empty input, placeholders and non-finite values.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let dots = cleaned.matches('.').count();
    let commas = cleaned.matches(',').count();
    let normalized = match (dots, commas) {
        // "3.000.000" uses dots as thousands separators
        (d, 0) if d > 1 => cleaned.replace('.', ""),
        (0, c) if c > 1 => cleaned.replace(',', ""),
        // "2,5" uses a decimal comma
        (0, 1) => cleaned.replace(',', "."),
        (_, c) if c > 0 => cleaned.replace(',', ""),
        _ => cleaned,
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Render a bound as a canonical string: integral values carry no fraction.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
