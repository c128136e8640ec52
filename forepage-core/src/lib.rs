//! forepage-core: document register to forepage pipeline
//!
//! Downloads the document register, narrows it to a submission period,
//! tracks which rows the user wants, and renders one forepage per selected
//! row from a `.docx` template, bundled into a single ZIP archive.

pub mod archive;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod reader;
pub mod selection;
pub mod session;
pub mod writer;

pub use archive::{ForepageArchive, archive_filename, build_archive};
pub use config::ForepageConfig;
pub use error::{ForepageError, Result};
pub use fetcher::{FileFetcher, HttpFetcher, RegisterFetcher};
pub use filter::{Period, filter_period, suggested_period};
pub use reader::{Register, RegisterRow, RowId, read_register};
pub use selection::Selection;
pub use session::{PeriodOutcome, Session, Stage, generate_archive};
pub use writer::{ForepageTemplate, RenderedBatch, RenderedDocument, render_forepages};
