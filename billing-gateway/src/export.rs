//! Tabular transaction export.
//!
//! Vault queries answer with comma-delimited text: a header line naming the
//! columns, then one line per record. The gateway chooses the column order, so
//! every export is read through the [`ColumnIndex`] built from its own header.
//!
//! # Examples
//!
//! ```
//! use billing_gateway::TabularExport;
//!
//! let export = TabularExport::new("transid,amount\n025-0000083216,1200\n");
//! let parsed = export.parse().unwrap();
//!
//! let row = parsed.rows().next().unwrap();
//! assert_eq!(row.get("amount"), Some("1200"));
//! assert_eq!(row.get("transid"), Some("025-0000083216"));
//! ```

use std::collections::HashMap;

use tracing::warn;

use crate::error::{GatewayError, Result};

const DELIMITER: char = ',';

/// Raw export body as returned by a vault query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularExport {
    body: String,
}

impl TabularExport {
    /// Wraps a response body.
    #[must_use]
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    /// The body verbatim.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.body
    }

    /// Number of non-blank lines after the header.
    #[must_use]
    pub fn data_line_count(&self) -> usize {
        content_lines(&self.body).skip(1).count()
    }

    /// True when at least one data line follows the header.
    #[must_use]
    pub fn has_rows(&self) -> bool {
        self.data_line_count() > 0
    }

    /// Parses the header and splits every data line.
    ///
    /// Lines whose field count differs from the header are not returned as
    /// rows; they are listed in [`ParsedExport::malformed`] and logged.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnexpectedResponse`] if the body has no header line.
    pub fn parse(&self) -> Result<ParsedExport<'_>> {
        let mut lines = content_lines(&self.body);
        let Some((_, header)) = lines.next() else {
            return Err(GatewayError::UnexpectedResponse("export has no header line".to_owned()));
        };
        let columns = ColumnIndex::from_header(header);

        let mut rows = Vec::new();
        let mut malformed = Vec::new();
        for (line_number, line) in lines {
            let values: Vec<&str> = line.split(DELIMITER).map(str::trim).collect();
            if values.len() == columns.width() {
                rows.push(values);
            } else {
                warn!(
                    line = line_number,
                    expected = columns.width(),
                    found = values.len(),
                    "skipping malformed export line"
                );
                malformed.push(MalformedRow {
                    line: line_number,
                    expected: columns.width(),
                    found: values.len(),
                });
            }
        }

        Ok(ParsedExport { columns, rows, malformed })
    }
}

/// Non-blank lines with their 1-based line numbers.
fn content_lines(body: &str) -> impl Iterator<Item = (usize, &str)> {
    body.lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty())
}

/// Column name to position map derived from an export header.
///
/// Names are trimmed and lowercased. When a name repeats, the first position wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnIndex {
    positions: HashMap<String, usize>,
    width: usize,
}

impl ColumnIndex {
    /// Builds the index from a header line.
    #[must_use]
    pub fn from_header(header: &str) -> Self {
        let mut positions = HashMap::new();
        let mut width = 0;
        for (idx, name) in header.split(DELIMITER).enumerate() {
            positions.entry(name.trim().to_ascii_lowercase()).or_insert(idx);
            width = idx + 1;
        }
        Self { positions, width }
    }

    /// Position of a column.
    #[must_use]
    pub fn position(&self, column: &str) -> Option<usize> {
        self.positions.get(&column.to_ascii_lowercase()).copied()
    }

    /// Returns true if the header names the column.
    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    /// Number of columns in the header.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }
}

/// A data line rejected because its field count differs from the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MalformedRow {
    /// 1-based line number in the export body.
    pub line: usize,
    /// Field count of the header.
    pub expected: usize,
    /// Field count of the line.
    pub found: usize,
}

/// Export split into header index and well-formed rows.
#[derive(Debug, Clone)]
pub struct ParsedExport<'a> {
    columns: ColumnIndex,
    rows: Vec<Vec<&'a str>>,
    malformed: Vec<MalformedRow>,
}

impl ParsedExport<'_> {
    /// Header index.
    #[must_use]
    pub const fn columns(&self) -> &ColumnIndex {
        &self.columns
    }

    /// Well-formed rows in body order.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|values| Row { columns: &self.columns, values })
    }

    /// Number of well-formed rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Lines skipped for a field-count mismatch.
    #[must_use]
    pub fn malformed(&self) -> &[MalformedRow] {
        &self.malformed
    }
}

/// One well-formed export row, addressed by column name.
#[derive(Debug, Clone, Copy)]
pub struct Row<'r> {
    columns: &'r ColumnIndex,
    values: &'r [&'r str],
}

impl<'r> Row<'r> {
    /// Value of a column; empty cells and unknown columns are `None`.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&'r str> {
        self.columns
            .position(column)
            .and_then(|idx| self.values.get(idx).copied())
            .filter(|value| !value.is_empty())
    }

    /// First non-empty value among several candidate columns.
    #[must_use]
    pub fn get_any(&self, columns: &[&str]) -> Option<&'r str> {
        columns.iter().find_map(|column| self.get(column))
    }
}
