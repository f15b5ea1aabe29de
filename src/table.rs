//! Delimited-text tables: header-bearing input loader and header-less output table.

use crate::config::Partition;
use crate::error::PipelineError;
use csv::{ReaderBuilder, WriterBuilder};

/// Rows as read from a delimited source. Empty and missing trailing fields are `None`.
#[derive(Clone, Debug, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell accessor treating out-of-range columns as null.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(col)).and_then(|c| c.as_deref())
    }
}

/// Load a header-bearing delimited document. `.zst` inputs are decompressed first.
pub fn read_delimited(partition: Partition, key: &str, bytes: &[u8]) -> Result<RawTable, PipelineError> {
    let malformed = |detail: String| PipelineError::MalformedInput { partition, detail };

    let decoded;
    let body: &[u8] = if key.ends_with(".zst") {
        decoded = zstd::stream::decode_all(bytes).map_err(|e| malformed(format!("zstd decode {}: {}", key, e)))?;
        &decoded
    } else {
        bytes
    };

    let mut rdr = ReaderBuilder::new().has_headers(true).flexible(true).from_reader(body);
    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| malformed(format!("header of {}: {}", key, e)))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| malformed(format!("{}: {}", key, e)))?;
        let row = (0..headers.len())
            .map(|i| record.get(i).filter(|v| !v.is_empty()).map(str::to_string))
            .collect();
        rows.push(row);
    }
    Ok(RawTable { headers, rows })
}

/// A projected, header-less output table (every cell already rendered).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutputTable {
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

impl OutputTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Serialize rows without a header line, `\n`-terminated.
pub fn write_delimited(rows: &[Vec<String>]) -> csv::Result<Vec<u8>> {
    let mut w = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    for row in rows {
        w.write_record(row)?;
    }
    w.into_inner().map_err(|e| e.into_error().into())
}
