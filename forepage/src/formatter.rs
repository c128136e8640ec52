//! Output formatters for register rows and generated archives

use anyhow::Result;
use colored::*;
use forepage_core::writer::SUBMISSION_DATE_FORMAT;
use forepage_core::{ForepageArchive, Period, Session};
use std::path::Path;

/// Print the rows of the confirmed period, marking excluded ones
pub fn print_rows_human(session: &Session, period: Period) {
    println!("{}", format!("Submissions {period}").bold());
    println!();

    let shown = session.shown();
    if shown.is_empty() {
        println!(
            "{}",
            "No submissions in this period, pick another one.".yellow()
        );
        return;
    }

    for row in shown {
        let id = row.id();
        let selected = session.selection().is_selected(&id).unwrap_or(false);
        let mark = if selected {
            "[x]".green().bold()
        } else {
            "[ ]".bright_black()
        };
        println!(
            "  {} {} {} {}",
            mark,
            row.doc_number.cyan().bold(),
            row.submission_date
                .format(SUBMISSION_DATE_FORMAT)
                .to_string()
                .bright_black(),
            row.report_title
        );
        println!("      {} {}", "id:".bright_black(), id.to_string().bright_black());
    }

    println!();
    println!("{}", "Summary:".bold().underline());
    println!("  {} {}", "Shown:".bold(), shown.len());
    println!(
        "  {} {}",
        "Selected:".green().bold(),
        session.selection().selected_count()
    );
}

/// Print the rows of the confirmed period in JSON format
pub fn print_rows_json(session: &Session, period: Period) -> Result<()> {
    let rows: Vec<_> = session
        .shown()
        .iter()
        .map(|row| {
            let id = row.id();
            serde_json::json!({
                "id": id.to_string(),
                "selected": session.selection().is_selected(&id).unwrap_or(false),
                "row": row,
            })
        })
        .collect();

    let output = serde_json::json!({
        "period": period,
        "register_file": session.register_file().map(|p| p.display().to_string()),
        "rows": rows,
        "summary": {
            "loaded": session.register().len(),
            "shown": session.shown().len(),
            "selected": session.selection().selected_count(),
        }
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub fn print_archive_human(saved: &Path, archive: &ForepageArchive) {
    println!(
        "{} {}",
        "✓ Forepages written to".green().bold(),
        saved.display().to_string().cyan()
    );
    println!("  {} {} bytes", "Size:".bold(), archive.bytes.len());
}

pub fn print_archive_json(saved: &Path, archive: &ForepageArchive) -> Result<()> {
    let output = serde_json::json!({
        "filename": archive.filename,
        "path": saved.display().to_string(),
        "size": archive.bytes.len(),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
