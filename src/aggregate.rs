//! Revenue views over the filtered table. All functions are pure; sums over
//! an empty group are `0`.
//!
//! Ranking ties (equal summed revenue) keep the order in which the products
//! first appear in the input, so the same input always ranks the same way.

use crate::process::Transaction;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub total_revenue: f64,
    pub transaction_count: usize,
    /// `None` only for an empty input, which callers short-circuit before.
    pub top_product: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranked {
    pub product: String,
    pub revenue: f64,
}

pub fn total_revenue(rows: &[Transaction]) -> f64 {
    rows.iter().map(|r| r.revenue).sum()
}

/// Revenue summed under `key`; rows whose key is missing are left out.
fn sum_by<F>(rows: &[Transaction], key: F) -> BTreeMap<String, f64>
where
    F: Fn(&Transaction) -> Option<&String>,
{
    let mut out: BTreeMap<String, f64> = BTreeMap::new();
    for row in rows {
        if let Some(k) = key(row) {
            *out.entry(k.clone()).or_insert(0.0) += row.revenue;
        }
    }
    out
}

fn by_revenue_desc(a: &Ranked, b: &Ranked) -> Ordering {
    b.revenue.total_cmp(&a.revenue)
}

/// Revenue per product, in order of each product's first row.
fn sum_by_product_first_seen(rows: &[Transaction]) -> Vec<Ranked> {
    let mut slots: HashMap<&str, usize> = HashMap::new();
    let mut out: Vec<Ranked> = Vec::new();
    for row in rows {
        let Some(product) = row.product.as_deref() else {
            continue;
        };
        let slot = *slots.entry(product).or_insert_with(|| {
            out.push(Ranked {
                product: product.to_string(),
                revenue: 0.0,
            });
            out.len() - 1
        });
        out[slot].revenue += row.revenue;
    }
    out
}

/// Products by summed revenue, highest first. Ties stay in first-seen order.
pub fn product_ranking(rows: &[Transaction]) -> Vec<Ranked> {
    let mut ranked = sum_by_product_first_seen(rows);
    // stable sort: equal revenue keeps first-appearance order
    ranked.sort_by(by_revenue_desc);
    ranked
}

pub fn top_n_products(rows: &[Transaction], n: usize) -> Vec<Ranked> {
    let mut ranked = product_ranking(rows);
    ranked.truncate(n);
    ranked
}

pub fn top_product(rows: &[Transaction]) -> Option<String> {
    product_ranking(rows).into_iter().next().map(|r| r.product)
}

pub fn kpis(rows: &[Transaction]) -> Kpis {
    Kpis {
        total_revenue: total_revenue(rows),
        transaction_count: rows.len(),
        top_product: top_product(rows),
    }
}

/// `(month, revenue)` pairs, months ascending.
pub fn monthly_series(rows: &[Transaction]) -> Vec<(String, f64)> {
    sum_by(rows, |r| Some(&r.month)).into_iter().collect()
}

pub fn category_breakdown(rows: &[Transaction]) -> BTreeMap<String, f64> {
    sum_by(rows, |r| r.category.as_ref())
}

pub fn region_breakdown(rows: &[Transaction]) -> BTreeMap<String, f64> {
    sum_by(rows, |r| r.region.as_ref())
}
