//! Revenue (`total`) derivation.
//!
//! If the source has no revenue column, or any non-blank cell of it holds a
//! character other than an ASCII digit, revenue is recomputed per row as
//! `quantity * unit_price`. Otherwise the existing text is kept, with every
//! `.` removed before parsing: producers write `.` as a thousands separator,
//! so `1.500` means fifteen hundred.
//!
//! Known limitation: this is not decimal-separator detection. A true decimal
//! such as `15.5` would become `155` if it ever reached the strip step.
//!
//! A revenue column whose cells are all blank counts as clean: there is no
//! offending cell. Every row then keeps its (missing) value and ends up with
//! revenue `0`, not `quantity * unit_price`.

use crate::process::utils::clean_str;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static NON_DIGIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9]").expect("non-digit pattern should compile"));

/// Which branch of the policy produced the revenue column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RevenueSource {
    /// `quantity * unit_price`
    Recomputed,
    /// The file's own column, thousands dots stripped.
    Existing,
}

/// True when every non-blank cell is made of digits only.
pub fn column_is_clean<'a, I>(cells: I) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    cells
        .into_iter()
        .map(clean_str)
        .filter(|c| !c.is_empty())
        .all(|c| !NON_DIGIT.is_match(&c))
}

/// Remove every literal `.` so that `1.500` reads as `1500`.
pub fn strip_thousands(raw: &str) -> String {
    clean_str(raw).replace('.', "")
}

/// Parse an existing revenue cell under the thousands-strip rule.
pub fn parse_existing(raw: &str) -> Option<f64> {
    let s = strip_thousands(raw);
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `quantity * unit_price`, missing if either side is missing.
pub fn recompute(quantity: Option<f64>, unit_price: Option<f64>) -> Option<f64> {
    Some(quantity? * unit_price?)
}

/// Apply the policy to a whole column. `existing` is the raw revenue column
/// if the source has one. The result is never missing: anything that is
/// still unparseable after derivation becomes `0`.
pub fn derive(
    existing: Option<&[&str]>,
    quantity: &[Option<f64>],
    unit_price: &[Option<f64>],
) -> (Vec<f64>, RevenueSource) {
    match existing {
        Some(cells) if column_is_clean(cells.iter().copied()) => {
            let values = cells
                .iter()
                .map(|c| parse_existing(c).unwrap_or(0.0))
                .collect();
            (values, RevenueSource::Existing)
        }
        _ => {
            let values = quantity
                .iter()
                .zip(unit_price)
                .map(|(q, p)| recompute(*q, *p).unwrap_or(0.0))
                .collect();
            (values, RevenueSource::Recomputed)
        }
    }
}
