use crate::process::{NormalizedTable, Transaction};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, instrument};

/// Inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Earliest to latest date in the table, `None` when it has no rows.
    pub fn spanning(table: &NormalizedTable) -> Option<Self> {
        let start = table.rows.iter().map(|r| r.date).min()?;
        let end = table.rows.iter().map(|r| r.date).max()?;
        Some(Self { start, end })
    }
}

/// What the UI offers for selection: distinct values in order of first
/// appearance (blanks excluded) and the full date span.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOptions {
    pub regions: Vec<String>,
    pub categories: Vec<String>,
    pub range: Option<DateRange>,
}

fn distinct<'a>(values: impl Iterator<Item = Option<&'a String>>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .flatten()
        .filter(|v| seen.insert(*v))
        .cloned()
        .collect()
}

impl FilterOptions {
    pub fn from_table(table: &NormalizedTable) -> Self {
        Self {
            regions: distinct(table.rows.iter().map(|r| r.region.as_ref())),
            categories: distinct(table.rows.iter().map(|r| r.category.as_ref())),
            range: DateRange::spanning(table),
        }
    }
}

/// The user's predicates. Sets are taken literally: an empty set lets
/// nothing through. Defaulting to "everything" when the user has not
/// deselected anything is the caller's job, see [`FilterParams::all`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    pub range: DateRange,
    pub regions: BTreeSet<String>,
    pub categories: BTreeSet<String>,
}

impl FilterParams {
    /// Every region, every category, the full date span.
    /// `None` when the table is empty and there is nothing to select.
    pub fn all(table: &NormalizedTable) -> Option<Self> {
        let opts = FilterOptions::from_table(table);
        Some(Self {
            range: opts.range?,
            regions: opts.regions.into_iter().collect(),
            categories: opts.categories.into_iter().collect(),
        })
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        self.range.contains(tx.date)
            && tx.region.as_ref().is_some_and(|r| self.regions.contains(r))
            && tx
                .category
                .as_ref()
                .is_some_and(|c| self.categories.contains(c))
    }
}

/// Non-empty working subset of the normalized table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredTable {
    rows: Vec<Transaction>,
}

impl FilteredTable {
    pub fn rows(&self) -> &[Transaction] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Always false; an empty subset is reported as `FilterOutcome::NoMatch`.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<Transaction> {
        self.rows
    }
}

/// Either nothing matched, or a non-empty subset. Callers must branch on it.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutcome {
    NoMatch,
    Matched(FilteredTable),
}

impl FilterOutcome {
    pub fn is_empty(&self) -> bool {
        matches!(self, FilterOutcome::NoMatch)
    }

    /// The matching rows, empty for `NoMatch`.
    pub fn rows(&self) -> &[Transaction] {
        match self {
            FilterOutcome::NoMatch => &[],
            FilterOutcome::Matched(t) => t.rows(),
        }
    }
}

/// Produce the working subset. Revenue is re-asserted to be a finite number.
#[instrument(level = "debug", skip_all, fields(rows = table.len()))]
pub fn apply(table: &NormalizedTable, params: &FilterParams) -> FilterOutcome {
    let rows: Vec<Transaction> = table
        .rows
        .iter()
        .filter(|tx| params.matches(tx))
        .map(|tx| Transaction {
            revenue: if tx.revenue.is_finite() { tx.revenue } else { 0.0 },
            ..tx.clone()
        })
        .collect();

    debug!(matched = rows.len(), "filtered");
    if rows.is_empty() {
        FilterOutcome::NoMatch
    } else {
        FilterOutcome::Matched(FilteredTable { rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::tests::table;
    use crate::process::{normalize, ColumnMapping};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample() -> NormalizedTable {
        let raw = table(
            "tanggal,produk,wilayah,kategori,qty,harga,stok_awal\n\
             2024-01-05,Widget,West,Toys,2,1000,50\n\
             2024-01-20,Widget,West,Toys,3,1000,50\n\
             2024-02-01,Gadget,East,Tech,1,5000,10\n\
             2024-02-03,Gizmo,,Tech,1,100,10\n",
        );
        normalize(&raw, &ColumnMapping::default()).unwrap()
    }

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn options_are_distinct_in_first_seen_order() {
        let opts = FilterOptions::from_table(&sample());
        assert_eq!(opts.regions, vec!["West", "East"]);
        assert_eq!(opts.categories, vec!["Toys", "Tech"]);
        assert_eq!(
            opts.range,
            Some(DateRange::new(ymd(2024, 1, 5), ymd(2024, 2, 3)))
        );
    }

    #[test]
    fn all_params_pass_every_row_with_known_region_and_category() {
        let t = sample();
        let params = FilterParams::all(&t).unwrap();
        let out = apply(&t, &params);
        // the Gizmo row has no region and can never be selected
        assert_eq!(out.rows().len(), 3);
    }

    #[test]
    fn date_range_is_inclusive_at_both_ends() {
        let t = sample();
        let mut params = FilterParams::all(&t).unwrap();
        params.range = DateRange::new(ymd(2024, 1, 5), ymd(2024, 1, 20));
        let out = apply(&t, &params);
        assert_eq!(out.rows().len(), 2);
    }

    #[test]
    fn unknown_region_yields_explicit_no_match() {
        let t = sample();
        let mut params = FilterParams::all(&t).unwrap();
        params.regions = set(&["North"]);
        let out = apply(&t, &params);
        assert!(out.is_empty());
        assert_eq!(out, FilterOutcome::NoMatch);
        assert!(out.rows().is_empty());
    }

    #[test]
    fn empty_selection_means_nothing() {
        let t = sample();
        let mut params = FilterParams::all(&t).unwrap();
        params.categories.clear();
        assert!(apply(&t, &params).is_empty());
    }

    #[test]
    fn empty_table_has_no_default_params() {
        assert!(FilterParams::all(&NormalizedTable::empty()).is_none());
    }
}
