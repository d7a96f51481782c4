//! CSV export of the collected rows.
//!
//! Comma-delimited, CRLF line endings, fields quoted only when they contain
//! a delimiter, quote or line break.

use crate::error::{Error, Result};
use std::io::Write;
use std::path::Path;

/// Write `rows` (header included) to `writer`, one record per row.
pub fn write_rows<W: Write>(writer: W, rows: &[Vec<String>]) -> std::io::Result<()> {
    let mut csv = csv::WriterBuilder::new().flexible(true).from_writer(writer);
    for row in rows {
        csv.write_record(row)?;
    }
    csv.flush()
}

/// Create (or truncate) `path` and write `rows` to it.
///
/// The parent directory must already exist. A failure part way through can
/// leave a partial file behind.
pub fn export_csv(path: &Path, rows: &[Vec<String>]) -> Result<()> {
    let io_err = |source| Error::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = std::fs::File::create(path).map_err(io_err)?;
    write_rows(file, rows).map_err(io_err)
}
