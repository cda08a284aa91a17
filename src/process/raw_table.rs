use crate::error::Result;
use csv::ReaderBuilder;
use sha2::{Digest, Sha256};
use std::io::Read;
use tracing::{debug, instrument};

/// A loosely-typed table exactly as the data source produced it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    /// Column names from the header row, as written in the file.
    pub headers: Vec<String>,
    /// Each data row, one String per field. Rows may be shorter than `headers`.
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// No header row at all: the source produced nothing usable.
    pub fn is_absent(&self) -> bool {
        self.headers.is_empty() && self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Field `col` of row `row`; missing trailing fields read as blank.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// SHA-256 over headers and cells, used to key cached normalizations.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for h in &self.headers {
            hasher.update(h.as_bytes());
            hasher.update([0x1f]);
        }
        hasher.update([0x1e]);
        for row in &self.rows {
            for cell in row {
                hasher.update(cell.as_bytes());
                hasher.update([0x1f]);
            }
            hasher.update([0x1e]);
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Read a headed CSV into a `RawTable`. Ragged rows are kept as-is.
#[instrument(level = "debug", skip(reader))]
pub fn load_csv<R: Read>(reader: R) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    debug!(columns = headers.len(), rows = rows.len(), "loaded csv");
    Ok(RawTable { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn loads_headers_and_rows() {
        let csv = "\u{feff}tanggal,produk,qty\n2024-01-05,Widget,2\n\n2024-01-06,Gadget\n";
        let t = load_csv(Cursor::new(csv)).unwrap();
        assert_eq!(t.headers, vec!["tanggal", "produk", "qty"]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.cell(1, 1), "Gadget");
        assert_eq!(t.cell(1, 2), "");
        assert_eq!(t.cell(9, 0), "");
    }

    #[test]
    fn empty_input_is_absent() {
        let t = load_csv(Cursor::new("")).unwrap();
        assert!(t.is_absent());
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = RawTable::new(vec!["a".into()], vec![vec!["1".into()]]);
        let b = RawTable::new(vec!["a".into()], vec![vec!["2".into()]]);
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
