/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// A cleaned cell, or `None` when the cell is blank.
pub fn non_empty(raw: &str) -> Option<String> {
    let c = clean_str(raw);
    if c.is_empty() {
        None
    } else {
        Some(c)
    }
}

/// Parse a cell as a finite number. Blank or unparseable cells are missing.
pub fn parse_number(raw: &str) -> Option<f64> {
    let c = clean_str(raw);
    if c.is_empty() {
        return None;
    }
    c.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Render a number the way it was most likely written: integral values
/// without a trailing `.0`.
pub fn format_number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{:.0}", v)
    } else {
        v.to_string()
    }
}
