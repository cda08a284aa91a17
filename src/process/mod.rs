// src/process/mod.rs
pub mod date_parser;
pub mod raw_table;
pub mod revenue;
pub mod schema;
pub mod utils;

use crate::error::Result;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub use raw_table::{load_csv, RawTable};
pub use revenue::RevenueSource;
pub use schema::{ColumnIndex, ColumnMapping};

/// One cleaned sale. `date` is always present; rows without one never get here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub product: Option<String>,
    pub region: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<f64>,
    pub unit_price: Option<f64>,
    pub initial_stock: Option<f64>,
    /// Never missing; see `revenue::derive`.
    pub revenue: f64,
    /// `YYYY-MM` bucket of `date`.
    pub month: String,
}

/// Counts of cells that degraded to missing while cleaning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleaningStats {
    pub source_rows: usize,
    pub dropped_bad_date: usize,
    pub bad_quantity: usize,
    pub bad_unit_price: usize,
    pub bad_initial_stock: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedTable {
    /// Surviving rows, in source order.
    pub rows: Vec<Transaction>,
    pub revenue_source: RevenueSource,
    pub stats: CleaningStats,
}

impl NormalizedTable {
    pub fn empty() -> Self {
        Self {
            rows: Vec::new(),
            revenue_source: RevenueSource::Recomputed,
            stats: CleaningStats::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parse a numeric column, counting non-blank cells that failed.
fn parse_numeric_column(raw: &RawTable, col: usize) -> (Vec<Option<f64>>, usize) {
    let mut bad = 0;
    let values = (0..raw.len())
        .map(|r| {
            let cell = raw.cell(r, col);
            let v = utils::parse_number(cell);
            if v.is_none() && !cell.trim().is_empty() {
                bad += 1;
            }
            v
        })
        .collect();
    (values, bad)
}

fn text_column(raw: &RawTable, col: Option<usize>) -> Vec<Option<String>> {
    match col {
        Some(c) => (0..raw.len()).map(|r| utils::non_empty(raw.cell(r, c))).collect(),
        None => vec![None; raw.len()],
    }
}

/// Turn a raw table into typed transactions.
///
/// Bad cells never fail the call: dates and numbers that do not parse become
/// missing, revenue falls back to `0`, and rows without a date are dropped.
/// The only error is a required column being absent from the headers. A
/// table with no headers at all (source produced nothing) normalizes to an
/// empty table.
#[instrument(level = "info", skip(raw, mapping), fields(rows = raw.len()))]
pub fn normalize(raw: &RawTable, mapping: &ColumnMapping) -> Result<NormalizedTable> {
    if raw.is_absent() {
        warn!("source produced no table; treating as empty");
        return Ok(NormalizedTable::empty());
    }
    let idx = mapping.resolve(&raw.headers)?;
    let n = raw.len();

    let dates: Vec<Option<NaiveDate>> = (0..n)
        .map(|r| date_parser::parse_date(&utils::clean_str(raw.cell(r, idx.date))))
        .collect();
    let (quantity, bad_quantity) = parse_numeric_column(raw, idx.quantity);
    let (initial_stock, bad_initial_stock) = parse_numeric_column(raw, idx.initial_stock);
    let (unit_price, bad_unit_price) = match idx.unit_price {
        Some(c) => parse_numeric_column(raw, c),
        None => (vec![None; n], 0),
    };

    // The clean-column check looks at every source row, dated or not.
    let existing: Option<Vec<&str>> = idx
        .revenue
        .map(|c| (0..n).map(|r| raw.cell(r, c)).collect());
    let (revenue, revenue_source) =
        revenue::derive(existing.as_deref(), &quantity, &unit_price);
    debug!(?revenue_source, "derived revenue");

    let products = text_column(raw, Some(idx.product));
    let regions = text_column(raw, idx.region);
    let categories = text_column(raw, idx.category);

    let mut rows = Vec::with_capacity(n);
    let mut dropped_bad_date = 0;
    for r in 0..n {
        let Some(date) = dates[r] else {
            dropped_bad_date += 1;
            continue;
        };
        rows.push(Transaction {
            date,
            product: products[r].clone(),
            region: regions[r].clone(),
            category: categories[r].clone(),
            quantity: quantity[r],
            unit_price: unit_price[r],
            initial_stock: initial_stock[r],
            revenue: revenue[r],
            month: date_parser::month_bucket(date),
        });
    }

    let stats = CleaningStats {
        source_rows: n,
        dropped_bad_date,
        bad_quantity,
        bad_unit_price,
        bad_initial_stock,
    };
    if dropped_bad_date > 0 {
        warn!(dropped = dropped_bad_date, "dropped rows with unparseable dates");
    }
    info!(kept = rows.len(), ?stats, "normalized");

    Ok(NormalizedTable {
        rows,
        revenue_source,
        stats,
    })
}

/// Remembers the last normalization, keyed by the raw table's fingerprint,
/// so that re-running the dashboard with new filter values skips cleaning.
#[derive(Debug, Default)]
pub struct NormalizeCache {
    mapping: ColumnMapping,
    last: Option<(String, Arc<NormalizedTable>)>,
}

impl NormalizeCache {
    pub fn new(mapping: ColumnMapping) -> Self {
        Self {
            mapping,
            last: None,
        }
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    pub fn get_or_normalize(&mut self, raw: &RawTable) -> Result<Arc<NormalizedTable>> {
        let key = raw.fingerprint();
        if let Some((k, table)) = &self.last {
            if *k == key {
                debug!("normalize cache hit");
                return Ok(Arc::clone(table));
            }
        }
        let table = Arc::new(normalize(raw, &self.mapping)?);
        self.last = Some((key, Arc::clone(&table)));
        Ok(table)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    pub(crate) fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,salesdash=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    pub(crate) fn table(csv: &str) -> RawTable {
        load_csv(Cursor::new(csv.to_string())).unwrap()
    }

    #[test]
    fn recomputes_revenue_without_total_column() {
        init_test_logging();
        let raw = table(
            "tanggal,produk,wilayah,kategori,qty,harga,stok_awal\n\
             2024-01-05,Widget,West,Toys,3,1500,50\n",
        );
        let t = normalize(&raw, &ColumnMapping::default()).unwrap();
        assert_eq!(t.revenue_source, RevenueSource::Recomputed);
        assert_eq!(t.rows[0].revenue, 4500.0);
        assert_eq!(t.rows[0].month, "2024-01");
    }

    #[test]
    fn rows_with_bad_dates_are_dropped() {
        let raw = table(
            "tanggal,produk,qty,harga,stok_awal\n\
             2024-01-05,Widget,1,10,5\n\
             not-a-date,Widget,1,10,5\n\
             ,Widget,1,10,5\n",
        );
        let t = normalize(&raw, &ColumnMapping::default()).unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.stats.dropped_bad_date, 2);
        assert_eq!(t.stats.source_rows, 3);
    }

    #[test]
    fn bad_numbers_become_missing_and_revenue_zero() {
        let raw = table(
            "tanggal,produk,qty,harga,stok_awal\n\
             2024-01-05,Widget,two,10,abc\n",
        );
        let t = normalize(&raw, &ColumnMapping::default()).unwrap();
        let row = &t.rows[0];
        assert_eq!(row.quantity, None);
        assert_eq!(row.initial_stock, None);
        assert_eq!(row.revenue, 0.0);
        assert_eq!(t.stats.bad_quantity, 1);
        assert_eq!(t.stats.bad_initial_stock, 1);
    }

    #[test]
    fn clean_total_column_is_kept() {
        let raw = table(
            "tanggal,produk,qty,harga,stok_awal,total\n\
             2024-01-05,Widget,3,1500,50,9999\n\
             2024-01-06,Widget,1,1500,50,\n",
        );
        let t = normalize(&raw, &ColumnMapping::default()).unwrap();
        assert_eq!(t.revenue_source, RevenueSource::Existing);
        assert_eq!(t.rows[0].revenue, 9999.0);
        assert_eq!(t.rows[1].revenue, 0.0);
    }

    #[test]
    fn all_blank_total_column_is_kept_as_zero() {
        let raw = table(
            "tanggal,produk,qty,harga,stok_awal,total\n\
             2024-01-05,Widget,3,1500,50,\n\
             2024-01-06,Widget,1,1500,50,\n\
             2024-01-07,Gadget,2,5000,10,\n",
        );
        let t = normalize(&raw, &ColumnMapping::default()).unwrap();
        // nothing to reject, so the blank column wins over qty * price
        assert_eq!(t.revenue_source, RevenueSource::Existing);
        let revenue: Vec<f64> = t.rows.iter().map(|r| r.revenue).collect();
        assert_eq!(revenue, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn unclean_total_column_is_recomputed() {
        let raw = table(
            "tanggal,produk,qty,harga,stok_awal,total\n\
             2024-01-05,Widget,3,1500,50,4.500\n",
        );
        let t = normalize(&raw, &ColumnMapping::default()).unwrap();
        assert_eq!(t.revenue_source, RevenueSource::Recomputed);
        assert_eq!(t.rows[0].revenue, 4500.0);
    }

    #[test]
    fn normalizing_twice_keeps_revenue() {
        let raw = table(
            "date,product,quantity,unit_price,initial_stock,revenue\n\
             2024-01-05,Widget,3,1500,50,4500\n\
             2024-02-05,Gadget,1,5000,10,5000\n",
        );
        let once = normalize(&raw, &ColumnMapping::default()).unwrap();
        let again = normalize(&raw, &ColumnMapping::default()).unwrap();
        let a: Vec<f64> = once.rows.iter().map(|r| r.revenue).collect();
        let b: Vec<f64> = again.rows.iter().map(|r| r.revenue).collect();
        assert_eq!(a, vec![4500.0, 5000.0]);
        assert_eq!(a, b);
    }

    #[test]
    fn missing_required_column_halts() {
        let raw = table("tanggal,produk,qty,harga\n2024-01-05,Widget,1,10\n");
        let err = normalize(&raw, &ColumnMapping::default()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn absent_source_is_an_empty_table() {
        let t = normalize(&RawTable::default(), &ColumnMapping::default()).unwrap();
        assert!(t.is_empty());
    }

    #[test]
    fn cache_reuses_identical_input() {
        let raw = table("tanggal,produk,qty,stok_awal\n2024-01-05,Widget,1,5\n");
        let mut cache = NormalizeCache::new(ColumnMapping::default());
        let a = cache.get_or_normalize(&raw).unwrap();
        let b = cache.get_or_normalize(&raw.clone()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let other = table("tanggal,produk,qty,stok_awal\n2024-01-06,Widget,1,5\n");
        let c = cache.get_or_normalize(&other).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
