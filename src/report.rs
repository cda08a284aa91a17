use crate::aggregate::{Kpis, Ranked};
use crate::filter::{FilterOptions, FilterParams};
use crate::process::{CleaningStats, RevenueSource};
use crate::stock::{StockLine, StockReport};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Revenue views over the filtered subset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesSummary {
    pub kpis: Kpis,
    pub monthly_series: Vec<(String, f64)>,
    pub category_breakdown: BTreeMap<String, f64>,
    pub region_breakdown: BTreeMap<String, f64>,
    pub top_products: Vec<Ranked>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SalesView {
    /// The filter matched nothing; no revenue views were computed.
    NoMatch,
    Summary(SalesSummary),
}

/// Everything the dashboard shows for one set of filter values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub source: Option<String>,
    pub options: FilterOptions,
    pub params: Option<FilterParams>,
    pub revenue_source: RevenueSource,
    pub cleaning: CleaningStats,
    pub sales: SalesView,
    pub stock: StockReport,
}

/// `Rp 1,234,567`: whole rupiah, comma thousands separators.
pub fn format_rupiah(amount: f64) -> String {
    let rounded = amount.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if negative {
        format!("Rp -{}", grouped)
    } else {
        format!("Rp {}", grouped)
    }
}

fn stock_table(out: &mut String, lines: &[StockLine]) {
    let width = lines
        .iter()
        .map(|l| l.product.chars().count())
        .max()
        .unwrap_or(0)
        .max("Produk".len());
    let _ = writeln!(
        out,
        "  {:<width$}  {:>10}  {:>10}  {:>10}",
        "Produk", "Stok Awal", "Terjual", "Sisa Stok"
    );
    for l in lines {
        let _ = writeln!(
            out,
            "  {:<width$}  {:>10}  {:>10}  {:>10}",
            l.product, l.initial_stock, l.sold, l.remaining_stock
        );
    }
}

/// Plain-text rendering for the terminal.
pub fn render_text(report: &DashboardReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Dashboard Penjualan");
    if let Some(src) = &report.source {
        let _ = writeln!(out, "File aktif: {}", src);
    }
    if let Some(p) = &report.params {
        let _ = writeln!(out, "Rentang tanggal: {} .. {}", p.range.start, p.range.end);
    }
    let _ = writeln!(out);

    match &report.sales {
        SalesView::NoMatch => {
            let _ = writeln!(out, "Tidak ada data ditemukan dengan filter yang dipilih.");
        }
        SalesView::Summary(s) => {
            let _ = writeln!(out, "Total Penjualan : {}", format_rupiah(s.kpis.total_revenue));
            let _ = writeln!(out, "Jumlah Transaksi: {}", s.kpis.transaction_count);
            let _ = writeln!(
                out,
                "Produk Terlaris : {}",
                s.kpis.top_product.as_deref().unwrap_or("Tidak ada")
            );
            let _ = writeln!(out, "\nPenjualan per Bulan");
            for (month, revenue) in &s.monthly_series {
                let _ = writeln!(out, "  {}  {}", month, format_rupiah(*revenue));
            }
            let _ = writeln!(out, "\nPenjualan per Kategori");
            for (k, v) in &s.category_breakdown {
                let _ = writeln!(out, "  {}  {}", k, format_rupiah(*v));
            }
            let _ = writeln!(out, "\nPenjualan per Wilayah");
            for (k, v) in &s.region_breakdown {
                let _ = writeln!(out, "  {}  {}", k, format_rupiah(*v));
            }
            let _ = writeln!(out, "\nTop {} Produk Terlaris", s.top_products.len());
            for (i, r) in s.top_products.iter().enumerate() {
                let _ = writeln!(out, "  {:>2}. {}  {}", i + 1, r.product, format_rupiah(r.revenue));
            }
        }
    }

    let _ = writeln!(out, "\nSisa Stok per Produk");
    stock_table(&mut out, &report.stock.lines);
    if !report.stock.low_stock.is_empty() {
        let _ = writeln!(
            out,
            "\nAda produk dengan stok menipis (<= {} unit)",
            report.stock.threshold
        );
        stock_table(&mut out, &report.stock.low_stock);
    }
    out
}
