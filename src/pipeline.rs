use crate::aggregate;
use crate::error::Result;
use crate::filter::{self, FilterOptions, FilterOutcome, FilterParams};
use crate::process::{ColumnMapping, NormalizeCache, NormalizedTable, RawTable};
use crate::report::{DashboardReport, SalesSummary, SalesView};
use crate::stock::{self, DEFAULT_LOW_STOCK_THRESHOLD};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub top_n: usize,
    pub low_stock_threshold: i64,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            top_n: 10,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }
}

/// Result of one dashboard run. `filtered` is kept for export.
#[derive(Debug, Clone)]
pub struct DashboardRun {
    pub table: Arc<NormalizedTable>,
    pub filtered: FilterOutcome,
    pub report: DashboardReport,
}

pub fn summarize(outcome: &FilterOutcome, top_n: usize) -> SalesView {
    match outcome {
        FilterOutcome::NoMatch => SalesView::NoMatch,
        FilterOutcome::Matched(t) => {
            let rows = t.rows();
            SalesView::Summary(SalesSummary {
                kpis: aggregate::kpis(rows),
                monthly_series: aggregate::monthly_series(rows),
                category_breakdown: aggregate::category_breakdown(rows),
                region_breakdown: aggregate::region_breakdown(rows),
                top_products: aggregate::top_n_products(rows, top_n),
            })
        }
    }
}

/// Filter and aggregate an already-normalized table.
///
/// `params = None` means the user has not narrowed anything: every region,
/// every category, the whole date span. Stock is always reconciled over the
/// full table, whatever the filter matched.
pub fn build(
    table: Arc<NormalizedTable>,
    params: Option<FilterParams>,
    opts: ReportOptions,
) -> DashboardRun {
    let params = params.or_else(|| FilterParams::all(&table));
    let filtered = match &params {
        Some(p) => filter::apply(&table, p),
        None => FilterOutcome::NoMatch,
    };
    let report = DashboardReport {
        source: None,
        options: FilterOptions::from_table(&table),
        params,
        revenue_source: table.revenue_source,
        cleaning: table.stats,
        sales: summarize(&filtered, opts.top_n),
        stock: stock::report(&table, opts.low_stock_threshold),
    };
    info!(
        rows = table.len(),
        matched = filtered.rows().len(),
        "built dashboard"
    );
    DashboardRun {
        table,
        filtered,
        report,
    }
}

/// Holds the normalize cache across re-runs with different filter values.
#[derive(Debug, Default)]
pub struct Dashboard {
    cache: NormalizeCache,
    opts: ReportOptions,
}

impl Dashboard {
    pub fn new(mapping: ColumnMapping, opts: ReportOptions) -> Self {
        Self {
            cache: NormalizeCache::new(mapping),
            opts,
        }
    }

    /// Normalize (cached by content), then filter and aggregate.
    pub fn run(&mut self, raw: &RawTable, params: Option<FilterParams>) -> Result<DashboardRun> {
        let table = self.cache.get_or_normalize(raw)?;
        Ok(build(table, params, self.opts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::tests::{init_test_logging, table};

    const SCENARIO: &str = "tanggal,produk,wilayah,kategori,qty,harga,stok_awal\n\
        2024-01-05,Widget,West,Toys,2,1000,50\n\
        2024-01-20,Widget,West,Toys,3,1000,50\n\
        2024-02-01,Gadget,East,Tech,1,5000,10\n";

    fn summary(run: &DashboardRun) -> &SalesSummary {
        match &run.report.sales {
            SalesView::Summary(s) => s,
            SalesView::NoMatch => panic!("expected matches"),
        }
    }

    #[test]
    fn end_to_end_scenario() {
        init_test_logging();
        let mut dash = Dashboard::default();
        let run = dash.run(&table(SCENARIO), None).unwrap();
        let s = summary(&run);

        assert_eq!(s.kpis.total_revenue, 10000.0);
        assert_eq!(s.kpis.transaction_count, 3);
        assert_eq!(s.kpis.top_product.as_deref(), Some("Widget"));
        assert_eq!(
            s.monthly_series,
            vec![
                ("2024-01".to_string(), 5000.0),
                ("2024-02".to_string(), 5000.0)
            ]
        );

        let widget = run
            .report
            .stock
            .lines
            .iter()
            .find(|l| l.product == "Widget")
            .unwrap();
        assert_eq!(
            (widget.sold, widget.initial_stock, widget.remaining_stock),
            (5, 50, 45)
        );
        assert_eq!(run.filtered.rows().len(), 3);
    }

    #[test]
    fn empty_filter_still_reconciles_stock() {
        let mut dash = Dashboard::default();
        let raw = table(SCENARIO);
        let mut params = FilterParams::all(&dash.run(&raw, None).unwrap().table).unwrap();
        params.regions = ["Nowhere".to_string()].into_iter().collect();

        let run = dash.run(&raw, Some(params)).unwrap();
        assert_eq!(run.report.sales, SalesView::NoMatch);
        assert!(run.filtered.is_empty());
        assert_eq!(run.report.stock.lines.len(), 2);
    }

    #[test]
    fn stock_ignores_the_date_filter() {
        let mut dash = Dashboard::default();
        let raw = table(SCENARIO);
        let mut params = FilterParams::all(&dash.run(&raw, None).unwrap().table).unwrap();
        params.range.end = params.range.start;

        let run = dash.run(&raw, Some(params)).unwrap();
        assert_eq!(summary(&run).kpis.transaction_count, 1);
        let widget = &run.report.stock.lines[1];
        assert_eq!(widget.product, "Widget");
        assert_eq!(widget.sold, 5);
    }

    #[test]
    fn absent_source_behaves_like_no_match() {
        let mut dash = Dashboard::default();
        let run = dash.run(&RawTable::default(), None).unwrap();
        assert_eq!(run.report.sales, SalesView::NoMatch);
        assert!(run.report.params.is_none());
        assert!(run.report.stock.lines.is_empty());
    }

    #[test]
    fn missing_column_is_surfaced() {
        let mut dash = Dashboard::default();
        let err = dash
            .run(&table("tanggal,produk,qty\n2024-01-05,Widget,1\n"), None)
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
