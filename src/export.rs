//! Flat-row export of the filtered table. Spreadsheet and PDF encoders sit
//! outside this crate; they consume `rows` or the CSV written here.

use crate::process::utils::format_number;
use crate::process::Transaction;
use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, Date32Array, Float64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use chrono::{Datelike, NaiveDate};
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};
use serde::Serialize;
use std::{fs::File, io::Write, path::Path, sync::Arc};
use tracing::info;

pub const COLUMNS: [&str; 9] = [
    "date",
    "product",
    "region",
    "category",
    "quantity",
    "unit_price",
    "initial_stock",
    "revenue",
    "month",
];

/// One exported line: every field already rendered as text, blanks for missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub date: String,
    pub product: String,
    pub region: String,
    pub category: String,
    pub quantity: String,
    pub unit_price: String,
    pub initial_stock: String,
    pub revenue: String,
    pub month: String,
}

fn opt_num(v: Option<f64>) -> String {
    v.map(format_number).unwrap_or_default()
}

pub fn rows(transactions: &[Transaction]) -> Vec<ExportRow> {
    transactions
        .iter()
        .map(|t| ExportRow {
            date: t.date.format("%Y-%m-%d").to_string(),
            product: t.product.clone().unwrap_or_default(),
            region: t.region.clone().unwrap_or_default(),
            category: t.category.clone().unwrap_or_default(),
            quantity: opt_num(t.quantity),
            unit_price: opt_num(t.unit_price),
            initial_stock: opt_num(t.initial_stock),
            revenue: format_number(t.revenue),
            month: t.month.clone(),
        })
        .collect()
}

/// Write `transactions` as a headed CSV.
pub fn write_csv<W: Write>(writer: W, transactions: &[Transaction]) -> Result<()> {
    let mut w = csv::Writer::from_writer(writer);
    for row in rows(transactions) {
        w.serialize(row).context("writing CSV row")?;
    }
    w.flush().context("flushing CSV")?;
    Ok(())
}

pub fn to_csv_bytes(transactions: &[Transaction]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_csv(&mut buf, transactions)?;
    Ok(buf)
}

fn schema() -> Schema {
    Schema::new(vec![
        Field::new("date", DataType::Date32, false),
        Field::new("product", DataType::Utf8, true),
        Field::new("region", DataType::Utf8, true),
        Field::new("category", DataType::Utf8, true),
        Field::new("quantity", DataType::Float64, true),
        Field::new("unit_price", DataType::Float64, true),
        Field::new("initial_stock", DataType::Float64, true),
        Field::new("revenue", DataType::Float64, false),
        Field::new("month", DataType::Utf8, false),
    ])
}

const EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Days since 1970-01-01, arrow's Date32 encoding.
fn epoch_days(d: NaiveDate) -> i32 {
    d.num_days_from_ce() - EPOCH_DAYS_FROM_CE
}

pub fn to_record_batch(transactions: &[Transaction]) -> Result<RecordBatch> {
    let t = transactions;
    let cols: Vec<ArrayRef> = vec![
        Arc::new(Date32Array::from_iter_values(t.iter().map(|r| epoch_days(r.date)))),
        Arc::new(StringArray::from_iter(t.iter().map(|r| r.product.as_deref()))),
        Arc::new(StringArray::from_iter(t.iter().map(|r| r.region.as_deref()))),
        Arc::new(StringArray::from_iter(t.iter().map(|r| r.category.as_deref()))),
        Arc::new(Float64Array::from_iter(t.iter().map(|r| r.quantity))),
        Arc::new(Float64Array::from_iter(t.iter().map(|r| r.unit_price))),
        Arc::new(Float64Array::from_iter(t.iter().map(|r| r.initial_stock))),
        Arc::new(Float64Array::from_iter_values(t.iter().map(|r| r.revenue))),
        Arc::new(StringArray::from_iter_values(t.iter().map(|r| r.month.as_str()))),
    ];
    RecordBatch::try_new(Arc::new(schema()), cols).context("building export record batch")
}

/// Write `transactions` to a Parquet file and return its size in bytes.
pub fn write_parquet(path: &Path, transactions: &[Transaction]) -> Result<u64> {
    let batch = to_record_batch(transactions)?;
    let file =
        File::create(path).with_context(|| format!("creating file {}", path.display()))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .context("creating parquet writer")?;
    writer.write(&batch).context("writing batch to parquet")?;
    writer.close().context("closing parquet writer")?;

    let size = std::fs::metadata(path)
        .with_context(|| format!("getting metadata for {}", path.display()))?
        .len();
    info!(path = %path.display(), rows = transactions.len(), size, "exported parquet");
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::tests::table;
    use crate::process::{load_csv, normalize, ColumnMapping, RevenueSource};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn sample() -> Vec<Transaction> {
        let raw = table(
            "tanggal,produk,wilayah,kategori,qty,harga,stok_awal\n\
             2024-01-05,Widget,West,Toys,3,1500,50\n\
             2024-02-01,Gadget,,Tech,,5000,10\n",
        );
        normalize(&raw, &ColumnMapping::default()).unwrap().rows
    }

    #[test]
    fn csv_has_header_and_blank_missing_cells() -> Result<()> {
        let text = String::from_utf8(to_csv_bytes(&sample())?)?;
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(COLUMNS.join(",").as_str()));
        assert_eq!(
            lines.next(),
            Some("2024-01-05,Widget,West,Toys,3,1500,50,4500,2024-01")
        );
        assert_eq!(lines.next(), Some("2024-02-01,Gadget,,Tech,,5000,10,0,2024-02"));
        Ok(())
    }

    #[test]
    fn exported_csv_normalizes_to_the_same_revenue() -> Result<()> {
        let first = sample();
        let raw = load_csv(Cursor::new(to_csv_bytes(&first)?))?;
        let again = normalize(&raw, &ColumnMapping::default())?;
        assert_eq!(again.revenue_source, RevenueSource::Existing);
        let a: Vec<f64> = first.iter().map(|r| r.revenue).collect();
        let b: Vec<f64> = again.rows.iter().map(|r| r.revenue).collect();
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn parquet_round_trips_row_count() -> Result<()> {
        let tmp = tempdir()?;
        let path = tmp.path().join("penjualan.parquet");
        let size = write_parquet(&path, &sample())?;
        assert!(size > 0);

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path)?)?.build()?;
        let total: usize = reader.map(|b| b.map(|b| b.num_rows())).sum::<Result<usize, _>>()?;
        assert_eq!(total, 2);
        Ok(())
    }

    #[test]
    fn epoch_days_matches_arrow_encoding() {
        assert_eq!(epoch_days(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap()), 1);
    }
}
