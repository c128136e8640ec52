//! Register data structures

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// One normalized record of the document register
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterRow {
    /// 1-based spreadsheet row the record was read from
    pub sheet_row: u32,
    pub report_title: String,
    /// Identifier with its fixed-width suffix stripped
    pub doc_number: String,
    pub version: String,
    pub submitter: String,
    pub submission_date: NaiveDateTime,
}

impl RegisterRow {
    /// Stable identity of this row, independent of any filtering
    pub fn id(&self) -> RowId {
        RowId {
            sheet_row: self.sheet_row,
            doc_number: self.doc_number.clone(),
        }
    }
}

/// Ordered set of register rows, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Register {
    rows: Vec<RegisterRow>,
}

impl Register {
    pub fn new(rows: Vec<RegisterRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[RegisterRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisterRow> {
        self.rows.iter()
    }

    /// Most recent submission date in the register
    pub fn latest_submission(&self) -> Option<NaiveDateTime> {
        self.rows.iter().map(|r| r.submission_date).max()
    }

    /// Keep only the rows matching `predicate`, preserving order
    pub fn narrow<F>(&self, mut predicate: F) -> Register
    where
        F: FnMut(&RegisterRow) -> bool,
    {
        Register {
            rows: self.rows.iter().filter(|r| predicate(r)).cloned().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Register {
    type Item = &'a RegisterRow;
    type IntoIter = std::slice::Iter<'a, RegisterRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Row identity: doc number plus the spreadsheet row it came from.
///
/// Rendered as `<doc_number>#<sheet_row>`, e.g. `NEX-RPT-0042#17`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RowId {
    pub sheet_row: u32,
    pub doc_number: String,
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.doc_number, self.sheet_row)
    }
}

impl FromStr for RowId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (doc_number, row) = s
            .rsplit_once('#')
            .ok_or_else(|| format!("expected <doc_number>#<row>, got '{s}'"))?;
        let sheet_row = row
            .parse::<u32>()
            .map_err(|_| format!("invalid row number in '{s}'"))?;
        if doc_number.is_empty() {
            return Err(format!("missing doc number in '{s}'"));
        }
        Ok(RowId {
            sheet_row,
            doc_number: doc_number.to_string(),
        })
    }
}
