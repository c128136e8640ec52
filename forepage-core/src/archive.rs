//! Packaging rendered forepages into a single ZIP deliverable

use crate::error::{ForepageError, Result};
use crate::writer::RenderedBatch;
use chrono::NaiveDateTime;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// The downloadable archive: file name plus ZIP bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForepageArchive {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl ForepageArchive {
    /// Save the archive into `folder` under its generated name.
    ///
    /// An existing file of that name is never replaced.
    pub fn write_to(&self, folder: &Path) -> Result<PathBuf> {
        let path = folder.join(&self.filename);
        let archive_err = |e: io::Error| ForepageError::Archive(format!("{}: {e}", path.display()));

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(archive_err)?;
        if let Err(e) = file.write_all(&self.bytes) {
            drop(file);
            if let Err(remove_err) = fs::remove_file(&path) {
                warn!(path = %path.display(), error = %remove_err, "failed to remove partial archive");
            }
            return Err(archive_err(e));
        }
        Ok(path)
    }
}

/// `forepages_<YYYYMMDDHHMMSS>.zip`
pub fn archive_filename(now: NaiveDateTime) -> String {
    format!("forepages_{}.zip", now.format("%Y%m%d%H%M%S"))
}

/// Compress every document of `batch` into one flat archive.
///
/// Entries are the documents' base names, in batch order. The batch is
/// consumed: its files are deleted when this returns, on success and on
/// failure alike.
pub fn build_archive(batch: RenderedBatch, now: NaiveDateTime) -> Result<ForepageArchive> {
    let mut zip_writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for document in batch.documents() {
        let name = document.file_name();
        let archive_err =
            |e: &dyn std::fmt::Display| ForepageError::Archive(format!("{name}: {e}"));

        let mut file = File::open(&document.path).map_err(|e| archive_err(&e))?;
        zip_writer
            .start_file(name.as_str(), options)
            .map_err(|e| archive_err(&e))?;
        io::copy(&mut file, &mut zip_writer).map_err(|e| archive_err(&e))?;
    }

    let bytes = zip_writer
        .finish()
        .map_err(|e| ForepageError::Archive(e.to_string()))?
        .into_inner();

    let archive = ForepageArchive {
        filename: archive_filename(now),
        bytes,
    };
    info!(
        entries = batch.len(),
        size = archive.bytes.len(),
        filename = %archive.filename,
        "built forepage archive"
    );

    Ok(archive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Read;
    use zip::ZipArchive;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 5)
            .unwrap()
            .and_hms_opt(9, 7, 3)
            .unwrap()
    }

    #[test]
    fn test_archive_filename() {
        assert_eq!(archive_filename(now()), "forepages_20250105090703.zip");
    }

    #[test]
    fn test_flat_entries_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir_all(&nested).unwrap();
        let a = dir.path().join("A-1.docx");
        let b = nested.join("B-2.docx");
        fs::write(&a, b"first").unwrap();
        fs::write(&b, b"second").unwrap();

        let batch = RenderedBatch::from_paths(vec![a.clone(), b.clone()]);
        let archive = build_archive(batch, now()).unwrap();

        assert!(!a.exists());
        assert!(!b.exists());

        let mut zip = ZipArchive::new(Cursor::new(archive.bytes)).unwrap();
        assert_eq!(zip.len(), 2);
        let mut entry = zip.by_name("B-2.docx").unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Deflated);
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        assert_eq!(content, "second");
    }

    #[test]
    fn test_failure_still_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("present.docx");
        let missing = dir.path().join("missing.docx");
        fs::write(&present, b"content").unwrap();

        let batch = RenderedBatch::from_paths(vec![present.clone(), missing]);
        let result = build_archive(batch, now());
        assert!(matches!(result, Err(ForepageError::Archive(_))));
        assert!(!present.exists());
    }

    #[test]
    fn test_write_to() {
        let dir = tempfile::tempdir().unwrap();
        let archive = ForepageArchive {
            filename: archive_filename(now()),
            bytes: vec![1, 2, 3],
        };
        let path = archive.write_to(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("forepages_20250105090703.zip"));
        assert_eq!(fs::read(path).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_write_to_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let first = ForepageArchive {
            filename: archive_filename(now()),
            bytes: vec![1, 2, 3],
        };
        let second = ForepageArchive {
            filename: first.filename.clone(),
            bytes: vec![9, 9],
        };
        let path = first.write_to(dir.path()).unwrap();

        let err = second.write_to(dir.path()).unwrap_err();
        assert!(matches!(err, ForepageError::Archive(_)));
        assert_eq!(fs::read(path).unwrap(), vec![1, 2, 3]);
    }
}
