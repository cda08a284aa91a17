use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Accepted header names for each canonical field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub date: Vec<String>,
    pub product: Vec<String>,
    pub quantity: Vec<String>,
    pub unit_price: Vec<String>,
    pub initial_stock: Vec<String>,
    pub region: Vec<String>,
    pub category: Vec<String>,
    pub revenue: Vec<String>,
}

fn aliases(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            date: aliases(&["tanggal", "date"]),
            product: aliases(&["produk", "product"]),
            quantity: aliases(&["qty", "quantity"]),
            unit_price: aliases(&["harga", "unit_price"]),
            initial_stock: aliases(&["stok_awal", "initial_stock"]),
            region: aliases(&["wilayah", "region"]),
            category: aliases(&["kategori", "category"]),
            revenue: aliases(&["total", "revenue"]),
        }
    }
}

/// Positions of the canonical fields within a particular file's headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndex {
    pub date: usize,
    pub product: usize,
    pub quantity: usize,
    pub initial_stock: usize,
    pub unit_price: Option<usize>,
    pub region: Option<usize>,
    pub category: Option<usize>,
    pub revenue: Option<usize>,
}

fn find(headers: &[String], names: &[String]) -> Option<usize> {
    headers.iter().position(|h| {
        let h = h.trim();
        names.iter().any(|n| n.trim().eq_ignore_ascii_case(h))
    })
}

fn require(headers: &[String], field: &str, names: &[String]) -> Result<usize> {
    find(headers, names).ok_or_else(|| PipelineError::missing_column(field, names))
}

impl ColumnMapping {
    /// Locate every field in `headers`. Absent required columns are a hard error.
    pub fn resolve(&self, headers: &[String]) -> Result<ColumnIndex> {
        let idx = ColumnIndex {
            date: require(headers, "date", &self.date)?,
            product: require(headers, "product", &self.product)?,
            quantity: require(headers, "quantity", &self.quantity)?,
            initial_stock: require(headers, "initial_stock", &self.initial_stock)?,
            unit_price: find(headers, &self.unit_price),
            region: find(headers, &self.region),
            category: find(headers, &self.category),
            revenue: find(headers, &self.revenue),
        };
        debug!(?idx, "resolved columns");
        Ok(idx)
    }
}
