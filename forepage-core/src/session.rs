//! Session state machine for the scan -> period -> selection -> generate flow

use crate::archive::{ForepageArchive, build_archive};
use crate::config::ForepageConfig;
use crate::error::{ForepageError, Result};
use crate::fetcher::{RegisterFetcher, register_path, validate_folder};
use crate::filter::{Period, filter_period, suggested_period};
use crate::reader::{Register, RegisterRow, RowId, read_register};
use crate::selection::Selection;
use crate::writer::{ForepageTemplate, render_forepages};
use chrono::{Local, NaiveDateTime, TimeDelta, Timelike};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Where the user is in the flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AwaitingFolder,
    RegisterLoaded,
    PeriodConfirmed,
    Generating,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::AwaitingFolder => "awaiting folder",
            Stage::RegisterLoaded => "register loaded",
            Stage::PeriodConfirmed => "period confirmed",
            Stage::Generating => "generating",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of confirming a period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodOutcome {
    /// Rows are on display, all pre-selected
    Confirmed { rows: usize },
    /// Nothing was submitted in the period; pick another one
    Empty,
}

/// All state of one user session, passed explicitly to every step
pub struct Session {
    config: ForepageConfig,
    stage: Stage,
    register_file: Option<PathBuf>,
    register: Register,
    shown: Register,
    selection: Selection,
    clock: fn() -> NaiveDateTime,
    last_stamp: Option<NaiveDateTime>,
}

impl Session {
    pub fn new(config: ForepageConfig) -> Self {
        Self {
            config,
            stage: Stage::AwaitingFolder,
            register_file: None,
            register: Register::default(),
            shown: Register::default(),
            selection: Selection::default(),
            clock: local_now,
            last_stamp: None,
        }
    }

    /// Replace the time source used for generated file names
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ForepageConfig {
        &self.config
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Local copy of the register from the last scan
    pub fn register_file(&self) -> Option<&Path> {
        self.register_file.as_deref()
    }

    /// Full register from the last scan
    pub fn register(&self) -> &Register {
        &self.register
    }

    /// Rows of the confirmed period
    pub fn shown(&self) -> &Register {
        &self.shown
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selected_rows(&self) -> Vec<RegisterRow> {
        self.selection.selected_rows(&self.shown)
    }

    /// Default range for the period prompt
    pub fn suggested_period(&self) -> Option<Period> {
        suggested_period(&self.register, self.config.period.lookback_days)
    }

    /// Download the register into `folder` and load it.
    ///
    /// On failure the session is left as it was, so the scan can be retried.
    pub fn scan(&mut self, folder: &Path, fetcher: &dyn RegisterFetcher) -> Result<&Register> {
        if self.stage == Stage::Generating {
            return Err(self.invalid("scan the register"));
        }
        validate_folder(folder)?;

        let dest = register_path(folder, self.next_stamp(), &self.config.source.file_suffix);
        info!(source = %fetcher.describe(), dest = %dest.display(), "scanning register");
        fetcher.fetch(&dest)?;
        let register = read_register(&dest, &self.config.layout)?;

        self.register_file = Some(dest);
        self.register = register;
        self.shown = Register::default();
        self.selection = Selection::default();
        self.stage = Stage::RegisterLoaded;
        Ok(&self.register)
    }

    /// Narrow the loaded register to `period` and pre-select every row.
    ///
    /// An empty period is not an error: the session stays in (or returns to)
    /// `RegisterLoaded` and the caller asks for another period.
    pub fn confirm_period(&mut self, period: Period) -> Result<PeriodOutcome> {
        if !matches!(
            self.stage,
            Stage::RegisterLoaded | Stage::PeriodConfirmed | Stage::Done
        ) {
            return Err(self.invalid("confirm a period"));
        }

        let shown = filter_period(&self.register, period);
        if shown.is_empty() {
            self.shown = Register::default();
            self.selection = Selection::default();
            self.stage = Stage::RegisterLoaded;
            return Ok(PeriodOutcome::Empty);
        }

        self.selection = Selection::new(&shown);
        self.shown = shown;
        self.stage = Stage::PeriodConfirmed;
        Ok(PeriodOutcome::Confirmed {
            rows: self.shown.len(),
        })
    }

    pub fn toggle(&mut self, id: &RowId) -> Result<bool> {
        self.require_period("change the selection")?;
        self.selection.toggle(id)
    }

    pub fn set_selected(&mut self, id: &RowId, include: bool) -> Result<()> {
        self.require_period("change the selection")?;
        self.selection.set(id, include)
    }

    /// Render the selected rows with the configured template and package
    /// them into the archive.
    ///
    /// On failure the session returns to `PeriodConfirmed` with the same
    /// selection, ready for another attempt.
    pub fn generate(&mut self) -> Result<ForepageArchive> {
        self.require_period("generate forepages")?;

        let rows = self.selected_rows();
        if rows.is_empty() {
            return Err(ForepageError::EmptySelection);
        }
        let template = ForepageTemplate::load(&self.config.template.path)?;

        let now = self.next_stamp();
        self.stage = Stage::Generating;
        match generate_archive(&rows, &template, now) {
            Ok(archive) => {
                self.shown = Register::default();
                self.selection = Selection::default();
                self.stage = Stage::Done;
                Ok(archive)
            }
            Err(e) => {
                self.stage = Stage::PeriodConfirmed;
                Err(e)
            }
        }
    }

    /// Forget everything and wait for a folder again
    pub fn reset(&mut self) {
        self.register_file = None;
        self.register = Register::default();
        self.shown = Register::default();
        self.selection = Selection::default();
        self.stage = Stage::AwaitingFolder;
    }

    /// Second-resolution timestamp for generated file names, strictly later
    /// than any stamp this session handed out before
    fn next_stamp(&mut self) -> NaiveDateTime {
        let now = (self.clock)();
        let now = now.with_nanosecond(0).unwrap_or(now);
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + TimeDelta::seconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }

    fn require_period(&self, action: &'static str) -> Result<()> {
        if self.stage == Stage::PeriodConfirmed {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn invalid(&self, action: &'static str) -> ForepageError {
        ForepageError::InvalidTransition {
            stage: self.stage.as_str(),
            action,
        }
    }
}

/// Render `rows` into a private scratch directory and archive them.
///
/// Every call gets its own directory, so concurrent generations never
/// share intermediate files.
pub fn generate_archive(
    rows: &[RegisterRow],
    template: &ForepageTemplate,
    now: NaiveDateTime,
) -> Result<ForepageArchive> {
    if rows.is_empty() {
        return Err(ForepageError::EmptySelection);
    }

    let scratch = tempfile::Builder::new()
        .prefix("forepages-")
        .tempdir()
        .map_err(|e| ForepageError::Archive(format!("cannot create scratch directory: {e}")))?;

    let result = render_forepages(rows, template, scratch.path())
        .and_then(|batch| build_archive(batch, now));

    let scratch_path = scratch.path().to_path_buf();
    if let Err(e) = scratch.close() {
        warn!(dir = %scratch_path.display(), error = %e, "failed to remove scratch directory");
    }

    result
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}
