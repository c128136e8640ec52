//! Document register reader using calamine

use crate::config::{ColumnLayout, column_index};
use crate::error::{ForepageError, Result};
use calamine::{Data, Range, Reader, open_workbook_auto};
use chrono::{NaiveDate, NaiveDateTime};
use std::path::Path;
use tracing::{debug, info};

pub mod register;

pub use register::{Register, RegisterRow, RowId};

/// Resolved 0-based column positions
#[derive(Debug, Clone, Copy)]
struct Columns {
    title: u32,
    identifier: u32,
    version: u32,
    submitter: u32,
    date: u32,
}

impl Columns {
    fn resolve(layout: &ColumnLayout) -> Result<Self> {
        let index = |letters: &str| {
            column_index(letters)
                .ok_or_else(|| ForepageError::Config(format!("invalid column '{letters}'")))
        };
        Ok(Self {
            title: index(&layout.title)?,
            identifier: index(&layout.identifier)?,
            version: index(&layout.version)?,
            submitter: index(&layout.submitter)?,
            date: index(&layout.date)?,
        })
    }

    fn rightmost(&self) -> u32 {
        [
            self.title,
            self.identifier,
            self.version,
            self.submitter,
            self.date,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

/// Read the first worksheet of a register file into normalized rows.
///
/// The sheet has no header row. Rows without a genuine date/time in the
/// date column, or whose identifier is too short to carry a doc number,
/// are dropped.
pub fn read_register<P: AsRef<Path>>(path: P, layout: &ColumnLayout) -> Result<Register> {
    let path = path.as_ref();
    let columns = Columns::resolve(layout)?;

    let mut workbook = open_workbook_auto(path)
        .map_err(|e| ForepageError::parse(path, format!("failed to open workbook: {e}")))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ForepageError::parse(path, "workbook has no worksheets"))?
        .map_err(|e| ForepageError::parse(path, format!("failed to read worksheet: {e}")))?;

    let rows = parse_rows(&range, columns, layout.suffix_len)
        .map_err(|message| ForepageError::parse(path, message))?;

    Ok(Register::new(rows))
}

fn parse_rows(
    range: &Range<Data>,
    columns: Columns,
    suffix_len: usize,
) -> std::result::Result<Vec<RegisterRow>, String> {
    let (Some(start), Some(end)) = (range.start(), range.end()) else {
        return Err("worksheet is empty".to_string());
    };

    if end.1 < columns.rightmost() {
        return Err(format!(
            "expected at least {} columns, found {}",
            columns.rightmost() + 1,
            end.1 + 1
        ));
    }

    let mut rows = Vec::new();
    let mut dropped = 0usize;

    for row in start.0..=end.0 {
        let cell = |col: u32| range.get_value((row, col));

        let Some(submission_date) = cell(columns.date).and_then(cell_timestamp) else {
            debug!(row = row + 1, "dropping row without a timestamp");
            dropped += 1;
            continue;
        };

        let identifier = cell_text(cell(columns.identifier));
        let Some(doc_number) = derive_doc_number(&identifier, suffix_len) else {
            debug!(row = row + 1, identifier = %identifier, "dropping row without a doc number");
            dropped += 1;
            continue;
        };

        rows.push(RegisterRow {
            sheet_row: row + 1,
            report_title: cell_text(cell(columns.title)),
            doc_number,
            version: cell_text(cell(columns.version)),
            submitter: cell_text(cell(columns.submitter)),
            submission_date,
        });
    }

    info!(kept = rows.len(), dropped, "parsed document register");
    Ok(rows)
}

/// Strip the fixed-width suffix (e.g. ".pdf") from an identifier.
///
/// Returns `None` when nothing would be left.
pub fn derive_doc_number(identifier: &str, suffix_len: usize) -> Option<String> {
    let count = identifier.chars().count();
    if count <= suffix_len {
        return None;
    }
    Some(identifier.chars().take(count - suffix_len).collect())
}

/// Timestamp of a date/time typed cell; anything else is not a timestamp
fn cell_timestamp(data: &Data) -> Option<NaiveDateTime> {
    match data {
        Data::DateTime(dt) if dt.is_datetime() => dt.as_datetime(),
        Data::DateTimeIso(s) => parse_iso_datetime(s),
        _ => None,
    }
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn cell_text(data: Option<&Data>) -> String {
    match data {
        None | Some(Data::Empty) | Some(Data::Error(_)) => String::new(),
        Some(Data::String(s)) => s.trim().to_string(),
        Some(Data::Int(i)) => i.to_string(),
        Some(Data::Float(f)) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Some(Data::Bool(b)) => b.to_string(),
        Some(Data::DateTime(dt)) => dt
            .as_datetime()
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| dt.as_f64().to_string()),
        Some(Data::DateTimeIso(s)) | Some(Data::DurationIso(s)) => s.trim().to_string(),
    }
}
