//! Per-row include flags for the rows on display

use crate::error::{ForepageError, Result};
use crate::reader::{Register, RegisterRow, RowId};
use std::collections::BTreeMap;

/// One include flag per displayed row, keyed by stable row identity.
///
/// Every row starts selected. Toggling an id that is not on display is an
/// error (`ForepageError::UnknownRow`); the flag set never grows or shrinks
/// after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    flags: BTreeMap<RowId, bool>,
}

impl Selection {
    /// Pre-select every row of `register`
    pub fn new(register: &Register) -> Self {
        Self {
            flags: register.iter().map(|row| (row.id(), true)).collect(),
        }
    }

    /// Flip a row's flag and return the new value
    pub fn toggle(&mut self, id: &RowId) -> Result<bool> {
        let flag = self.flag_mut(id)?;
        *flag = !*flag;
        Ok(*flag)
    }

    pub fn set(&mut self, id: &RowId, include: bool) -> Result<()> {
        *self.flag_mut(id)? = include;
        Ok(())
    }

    pub fn select_all(&mut self) {
        self.flags.values_mut().for_each(|f| *f = true);
    }

    pub fn clear(&mut self) {
        self.flags.values_mut().for_each(|f| *f = false);
    }

    pub fn is_selected(&self, id: &RowId) -> Option<bool> {
        self.flags.get(id).copied()
    }

    /// Number of rows on display
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn selected_count(&self) -> usize {
        self.flags.values().filter(|f| **f).count()
    }

    /// Ids of every displayed row, in sheet order
    pub fn ids(&self) -> impl Iterator<Item = &RowId> {
        self.flags.keys()
    }

    /// Included rows of `register`, in file order
    pub fn selected_rows(&self, register: &Register) -> Vec<RegisterRow> {
        register
            .iter()
            .filter(|row| self.flags.get(&row.id()).copied().unwrap_or(false))
            .cloned()
            .collect()
    }

    fn flag_mut(&mut self, id: &RowId) -> Result<&mut bool> {
        self.flags
            .get_mut(id)
            .ok_or_else(|| ForepageError::UnknownRow(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn register() -> Register {
        let rows = ["A", "B", "A"]
            .iter()
            .enumerate()
            .map(|(i, doc)| RegisterRow {
                sheet_row: i as u32 + 3,
                report_title: format!("Report {doc}"),
                doc_number: doc.to_string(),
                version: "1".to_string(),
                submitter: "QA".to_string(),
                submission_date: NaiveDate::from_ymd_opt(2025, 1, 2)
                    .unwrap()
                    .and_hms_opt(10, 0, 0)
                    .unwrap(),
            })
            .collect();
        Register::new(rows)
    }

    #[test]
    fn test_all_rows_preselected() {
        let reg = register();
        let selection = Selection::new(&reg);
        assert_eq!(selection.len(), 3);
        assert_eq!(selection.selected_count(), 3);
        assert_eq!(selection.selected_rows(&reg), reg.rows().to_vec());
    }

    #[test]
    fn test_toggle_by_identity() {
        let reg = register();
        let mut selection = Selection::new(&reg);

        // Same doc number, different rows: only the targeted one flips
        let second_a = reg.rows()[2].id();
        assert!(!selection.toggle(&second_a).unwrap());
        assert_eq!(selection.is_selected(&reg.rows()[0].id()), Some(true));

        let rows = selection.selected_rows(&reg);
        let sheet_rows: Vec<_> = rows.iter().map(|r| r.sheet_row).collect();
        assert_eq!(sheet_rows, vec![3, 4]);

        assert!(selection.toggle(&second_a).unwrap());
        assert_eq!(selection.selected_count(), 3);
    }

    #[test]
    fn test_unknown_row_is_error() {
        let reg = register();
        let mut selection = Selection::new(&reg);
        let unknown = RowId {
            sheet_row: 99,
            doc_number: "A".to_string(),
        };

        assert!(matches!(
            selection.toggle(&unknown),
            Err(ForepageError::UnknownRow(_))
        ));
        assert!(selection.set(&unknown, true).is_err());
        assert_eq!(selection.len(), 3);
    }

    #[test]
    fn test_clear_and_select_all() {
        let reg = register();
        let mut selection = Selection::new(&reg);

        selection.clear();
        assert_eq!(selection.selected_count(), 0);
        assert!(selection.selected_rows(&reg).is_empty());

        selection.set(&reg.rows()[1].id(), true).unwrap();
        assert_eq!(selection.selected_rows(&reg)[0].doc_number, "B");

        selection.select_all();
        assert_eq!(selection.selected_count(), 3);
    }
}
