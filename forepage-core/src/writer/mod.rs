//! Writer module: one forepage document per selected register row

mod docx_template;

pub use docx_template::{Fields, ForepageTemplate};

use crate::error::{ForepageError, Result};
use crate::reader::RegisterRow;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Date rendering used on the forepage ("05 Jan 2025")
pub const SUBMISSION_DATE_FORMAT: &str = "%d %b %Y";

/// A forepage written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub path: PathBuf,
    pub doc_number: String,
}

impl RenderedDocument {
    /// Base file name, used as the archive entry name
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Rendered documents whose files are removed when the batch is dropped.
///
/// Whatever happens after rendering (archive built, archive failed, render
/// aborted halfway) the per-row files never outlive the batch. Removal
/// failures are logged and otherwise ignored.
#[derive(Debug, Default)]
pub struct RenderedBatch {
    documents: Vec<RenderedDocument>,
}

impl RenderedBatch {
    /// Take ownership of existing files; they are deleted with the batch
    #[cfg(test)]
    pub(crate) fn from_paths(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let documents = paths
            .into_iter()
            .map(|path| RenderedDocument {
                doc_number: path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                path,
            })
            .collect();
        Self { documents }
    }

    pub fn documents(&self) -> &[RenderedDocument] {
        &self.documents
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.documents.iter().map(|d| d.path.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn push(&mut self, document: RenderedDocument) {
        self.documents.push(document);
    }
}

impl Drop for RenderedBatch {
    fn drop(&mut self) {
        for document in &self.documents {
            match fs::remove_file(&document.path) {
                Ok(()) => debug!(path = %document.path.display(), "removed rendered document"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(
                    path = %document.path.display(),
                    error = %e,
                    "failed to remove rendered document"
                ),
            }
        }
    }
}

/// Placeholder values for one row
pub fn row_fields(row: &RegisterRow) -> Fields {
    let mut fields = Fields::new();
    fields.insert("report_title", row.report_title.clone());
    fields.insert("doc_number", row.doc_number.clone());
    fields.insert(
        "submission_date",
        row.submission_date
            .format(SUBMISSION_DATE_FORMAT)
            .to_string(),
    );
    fields.insert("version", row.version.clone());
    fields.insert("submitter", row.submitter.clone());
    fields
}

/// Render one forepage per row into `out_dir`.
///
/// Files are named after the doc number; a name already used in the batch
/// (or already present in `out_dir`) gets `_2`, `_3`, ... appended, so no
/// document is ever overwritten. If any row fails, the files written so far
/// are removed before the error is returned.
pub fn render_forepages(
    rows: &[RegisterRow],
    template: &ForepageTemplate,
    out_dir: &Path,
) -> Result<RenderedBatch> {
    if rows.is_empty() {
        return Err(ForepageError::EmptySelection);
    }

    fs::create_dir_all(out_dir)
        .map_err(|_| ForepageError::InvalidFolder(out_dir.to_path_buf()))?;

    let mut batch = RenderedBatch::default();
    let mut taken = HashSet::new();

    for row in rows {
        let content = template
            .render(&row_fields(row))
            .map_err(|e| ForepageError::render(&row.doc_number, e))?;

        let file_name = unique_file_name(&row.doc_number, out_dir, &mut taken);
        let path = out_dir.join(&file_name);
        let document = RenderedDocument {
            path,
            doc_number: row.doc_number.clone(),
        };
        write_document(&mut batch, document, &content)
            .map_err(|e| ForepageError::render(&row.doc_number, e))?;
        debug!(doc_number = %row.doc_number, file = %file_name, "rendered forepage");
    }

    info!(count = batch.len(), dir = %out_dir.display(), "rendered forepages");
    Ok(batch)
}

/// Track `document` in the batch, then write it, so a half-written file
/// is removed with the batch
fn write_document(
    batch: &mut RenderedBatch,
    document: RenderedDocument,
    content: &[u8],
) -> std::io::Result<()> {
    let path = document.path.clone();
    batch.push(document);
    fs::write(path, content)
}

fn unique_file_name(doc_number: &str, out_dir: &Path, taken: &mut HashSet<String>) -> String {
    let stem = sanitize_file_stem(doc_number);
    let mut candidate = format!("{stem}.docx");
    let mut n = 2;
    while taken.contains(&candidate) || out_dir.join(&candidate).exists() {
        candidate = format!("{stem}_{n}.docx");
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

/// Replace characters that are not allowed in file names on common systems
fn sanitize_file_stem(doc_number: &str) -> String {
    let stem: String = doc_number
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if stem.is_empty() || stem.chars().all(|c| c == '.') {
        "forepage".to_string()
    } else {
        stem
    }
}
