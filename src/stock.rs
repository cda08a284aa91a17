//! Per-product inventory reconciliation.
//!
//! Runs over the whole normalized table, never the filtered subset: stock on
//! hand does not depend on which dates or regions the user is looking at.

use crate::process::{NormalizedTable, Transaction};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

/// One product's stock position, truncated to whole units for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockLine {
    pub product: String,
    pub initial_stock: i64,
    pub sold: i64,
    /// Negative means more was sold than was ever recorded in stock.
    pub remaining_stock: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockReport {
    /// Every product, ordered by name.
    pub lines: Vec<StockLine>,
    /// Products with `remaining_stock <= threshold`.
    pub low_stock: Vec<StockLine>,
    pub threshold: i64,
}

#[derive(Default)]
struct Tally {
    initial: Option<f64>,
    sold: f64,
}

/// Truncate toward zero, `0` for anything not finite.
fn whole(v: f64) -> i64 {
    if v.is_finite() {
        v.trunc() as i64
    } else {
        0
    }
}

fn tally(rows: &[Transaction]) -> BTreeMap<&str, Tally> {
    let mut out: BTreeMap<&str, Tally> = BTreeMap::new();
    for row in rows {
        let Some(product) = row.product.as_deref() else {
            continue;
        };
        let t = out.entry(product).or_default();
        // first recorded value in source order is authoritative
        if t.initial.is_none() {
            t.initial = row.initial_stock;
        }
        if let Some(q) = row.quantity {
            t.sold += q;
        }
    }
    out
}

/// Sold, initial and remaining stock per product.
///
/// Quantities are summed as decimals and only then truncated. A product
/// whose initial stock was never recorded shows `0` initial and `0`
/// remaining rather than a made-up deficit.
pub fn reconcile(table: &NormalizedTable) -> Vec<StockLine> {
    tally(&table.rows)
        .into_iter()
        .map(|(product, t)| {
            let (initial, remaining) = match t.initial {
                Some(i) => (whole(i), whole(i - t.sold)),
                None => (0, 0),
            };
            StockLine {
                product: product.to_string(),
                initial_stock: initial,
                sold: whole(t.sold),
                remaining_stock: remaining,
            }
        })
        .collect()
}

pub fn low_stock(lines: &[StockLine], threshold: i64) -> Vec<StockLine> {
    lines
        .iter()
        .filter(|l| l.remaining_stock <= threshold)
        .cloned()
        .collect()
}

pub fn report(table: &NormalizedTable, threshold: i64) -> StockReport {
    let lines = reconcile(table);
    let low = low_stock(&lines, threshold);
    debug!(products = lines.len(), low = low.len(), "reconciled stock");
    StockReport {
        lines,
        low_stock: low,
        threshold,
    }
}
