//! Error taxonomy for the forepage pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Every hard failure a pipeline step can surface to the caller.
///
/// Cleanup problems are deliberately absent: they are logged where they
/// happen and never replace the outcome of the step that triggered them.
#[derive(Debug, Error)]
pub enum ForepageError {
    /// The remote register could not be retrieved or written locally
    #[error("failed to fetch document register: {0}")]
    Fetch(String),

    /// The local register is unreadable or has an unexpected layout
    #[error("failed to parse document register {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("forepage template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    /// The template exists but is not a usable word-processing document
    #[error("invalid forepage template {}: {message}", path.display())]
    InvalidTemplate { path: PathBuf, message: String },

    #[error("no submissions selected, select at least one submission")]
    EmptySelection,

    /// A row's fields could not be substituted into the template
    #[error("failed to render forepage for {doc_number}: {message}")]
    Render { doc_number: String, message: String },

    #[error("failed to build forepage archive: {0}")]
    Archive(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid or non-writable folder: {}", .0.display())]
    InvalidFolder(PathBuf),

    #[error("unknown register row: {0}")]
    UnknownRow(String),

    #[error("cannot {action} while {stage}")]
    InvalidTransition {
        stage: &'static str,
        action: &'static str,
    },
}

impl ForepageError {
    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ForepageError::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn render(doc_number: impl Into<String>, message: impl ToString) -> Self {
        ForepageError::Render {
            doc_number: doc_number.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ForepageError>;
