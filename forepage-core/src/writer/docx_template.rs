//! DOCX template rendering: placeholder substitution inside the XML parts

use crate::error::{ForepageError, Result};
use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Write};
use std::path::Path;
use std::sync::OnceLock;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Main body part every word-processing document carries
const DOCUMENT_PART: &str = "word/document.xml";

/// Field values keyed by placeholder name
pub type Fields = BTreeMap<&'static str, String>;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid placeholder regex")
    })
}

/// One entry of the template package
#[derive(Debug, Clone)]
struct TemplatePart {
    name: String,
    data: Vec<u8>,
    compression: CompressionMethod,
    is_dir: bool,
}

impl TemplatePart {
    /// Parts whose text may carry placeholders
    fn is_text_part(&self) -> bool {
        let name = self.name.as_str();
        name == DOCUMENT_PART
            || (name.starts_with("word/header") && name.ends_with(".xml"))
            || (name.starts_with("word/footer") && name.ends_with(".xml"))
    }
}

/// A `.docx` template loaded once and rendered any number of times
#[derive(Debug, Clone)]
pub struct ForepageTemplate {
    parts: Vec<TemplatePart>,
}

impl ForepageTemplate {
    /// Read every part of the template package into memory
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ForepageError::TemplateNotFound(path.to_path_buf()));
        }
        let invalid = |message: String| ForepageError::InvalidTemplate {
            path: path.to_path_buf(),
            message,
        };

        let file =
            File::open(path).map_err(|_| ForepageError::TemplateNotFound(path.to_path_buf()))?;
        let mut archive =
            ZipArchive::new(BufReader::new(file)).map_err(|e| invalid(e.to_string()))?;

        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i).map_err(|e| invalid(e.to_string()))?;
            let mut data = Vec::new();
            file.read_to_end(&mut data)
                .map_err(|e| invalid(format!("{}: {e}", file.name())))?;
            parts.push(TemplatePart {
                name: file.name().to_string(),
                data,
                compression: file.compression(),
                is_dir: file.is_dir(),
            });
        }

        if !parts.iter().any(|p| p.name == DOCUMENT_PART) {
            return Err(invalid(format!("missing {DOCUMENT_PART}")));
        }

        Ok(Self { parts })
    }

    /// Placeholder names used anywhere in the template
    pub fn placeholders(&self) -> HashSet<String> {
        let mut names = HashSet::new();
        for part in self.parts.iter().filter(|p| p.is_text_part()) {
            let Ok(xml) = std::str::from_utf8(&part.data) else {
                continue;
            };
            if let Ok(paragraphs) = paragraph_texts(xml) {
                for text in paragraphs {
                    for caps in placeholder_pattern().captures_iter(&text) {
                        names.insert(caps[1].to_string());
                    }
                }
            }
        }
        names
    }

    /// Render the template with `fields` into a complete `.docx` package
    pub fn render(&self, fields: &Fields) -> std::result::Result<Vec<u8>, String> {
        for (name, value) in fields {
            if value.chars().any(|c| !is_xml_char(c)) {
                return Err(format!(
                    "field '{name}' contains characters not allowed in a document"
                ));
            }
        }

        let mut zip_writer = ZipWriter::new(Cursor::new(Vec::new()));

        for part in &self.parts {
            let method = match part.compression {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            let options = SimpleFileOptions::default().compression_method(method);

            if part.is_dir {
                zip_writer
                    .add_directory(part.name.as_str(), options)
                    .map_err(|e| e.to_string())?;
                continue;
            }

            zip_writer
                .start_file(part.name.as_str(), options)
                .map_err(|e| e.to_string())?;

            if part.is_text_part() {
                let xml = std::str::from_utf8(&part.data)
                    .map_err(|e| format!("{} is not UTF-8: {e}", part.name))?;
                let rendered = substitute_placeholders(xml, fields)
                    .map_err(|e| format!("{}: {e}", part.name))?;
                zip_writer
                    .write_all(rendered.as_bytes())
                    .map_err(|e| e.to_string())?;
            } else {
                // Copy part as is
                zip_writer
                    .write_all(&part.data)
                    .map_err(|e| e.to_string())?;
            }
        }

        let cursor = zip_writer.finish().map_err(|e| e.to_string())?;
        Ok(cursor.into_inner())
    }
}

/// Text runs of one paragraph: indices of the text events inside `<w:t>`
/// and of their opening tags
#[derive(Debug, Default)]
struct ParagraphRuns {
    text_events: Vec<usize>,
    start_tags: Vec<usize>,
}

/// Parsed part, owned, plus the paragraphs found in it
struct PartEvents {
    events: Vec<Event<'static>>,
    texts: Vec<Option<String>>,
    paragraphs: Vec<ParagraphRuns>,
}

fn collect_events(xml: &str) -> std::result::Result<PartEvents, String> {
    let mut reader = Reader::from_str(xml);
    let mut events = Vec::new();
    let mut texts = Vec::new();
    let mut paragraphs = Vec::new();
    // Paragraphs nest through text boxes
    let mut open: Vec<ParagraphRuns> = Vec::new();
    let mut text_start: Option<usize> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("error at position {}: {e}", reader.error_position()))?;
        let index = events.len();
        let mut text = None;

        match &event {
            Event::Start(e) if e.local_name().as_ref() == b"p" => {
                open.push(ParagraphRuns::default());
            }
            Event::End(e) if e.local_name().as_ref() == b"p" => {
                if let Some(runs) = open.pop() {
                    paragraphs.push(runs);
                }
            }
            Event::Start(e) if e.local_name().as_ref() == b"t" => {
                text_start = Some(index);
            }
            Event::End(e) if e.local_name().as_ref() == b"t" => {
                text_start = None;
            }
            Event::Text(e) => {
                if let (Some(start), Some(runs)) = (text_start, open.last_mut()) {
                    runs.text_events.push(index);
                    runs.start_tags.push(start);
                    text = Some(e.unescape().map_err(|e| e.to_string())?.into_owned());
                }
            }
            Event::Eof => break,
            _ => {}
        }

        events.push(event.into_owned());
        texts.push(text);
    }

    Ok(PartEvents {
        events,
        texts,
        paragraphs,
    })
}

/// Full text of every paragraph, used to discover placeholders
fn paragraph_texts(xml: &str) -> std::result::Result<Vec<String>, String> {
    let parsed = collect_events(xml)?;
    Ok(parsed
        .paragraphs
        .iter()
        .map(|runs| {
            runs.text_events
                .iter()
                .filter_map(|i| parsed.texts[*i].as_deref())
                .collect::<String>()
        })
        .collect())
}

/// Replace every `{{ name }}` in the part with its field value.
///
/// Word splits text into runs freely, so a placeholder may span several
/// `<w:t>` elements of one paragraph. The value lands in the run holding the
/// opening braces; the rest of the placeholder is removed from later runs.
pub(crate) fn substitute_placeholders(
    xml: &str,
    fields: &Fields,
) -> std::result::Result<String, String> {
    let PartEvents {
        events,
        texts,
        paragraphs,
    } = collect_events(xml)?;

    let mut replaced: HashMap<usize, String> = HashMap::new();
    let mut preserve_space: HashSet<usize> = HashSet::new();

    for runs in &paragraphs {
        let mut run_texts: Vec<String> = runs
            .text_events
            .iter()
            .map(|i| texts[*i].clone().unwrap_or_default())
            .collect();

        if !replace_in_runs(&mut run_texts, fields)? {
            continue;
        }

        for ((event_index, start_index), new_text) in runs
            .text_events
            .iter()
            .zip(&runs.start_tags)
            .zip(run_texts)
        {
            if new_text.starts_with(char::is_whitespace) || new_text.ends_with(char::is_whitespace)
            {
                preserve_space.insert(*start_index);
            }
            replaced.insert(*event_index, new_text);
        }
    }

    let mut writer = Writer::new(Cursor::new(Vec::new()));
    for (index, event) in events.into_iter().enumerate() {
        match (event, replaced.get(&index)) {
            (Event::Text(_), Some(text)) => {
                writer
                    .write_event(Event::Text(BytesText::new(text)))
                    .map_err(|e| e.to_string())?;
            }
            (Event::Start(mut start), _)
                if preserve_space.contains(&index)
                    && start.name().as_ref() == b"w:t"
                    && !start
                        .attributes()
                        .flatten()
                        .any(|a| a.key.as_ref() == b"xml:space") =>
            {
                start.push_attribute(("xml:space", "preserve"));
                writer
                    .write_event(Event::Start(start))
                    .map_err(|e| e.to_string())?;
            }
            (Event::Eof, _) => break,
            (event, _) => {
                writer.write_event(event).map_err(|e| e.to_string())?;
            }
        }
    }

    String::from_utf8(writer.into_inner().into_inner()).map_err(|e| e.to_string())
}

/// Substitute placeholders across the texts of one paragraph.
///
/// Returns whether anything was replaced.
fn replace_in_runs(runs: &mut [String], fields: &Fields) -> std::result::Result<bool, String> {
    let full: String = runs.concat();
    let matches: Vec<(usize, usize, String)> = placeholder_pattern()
        .captures_iter(&full)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some((whole.start(), whole.end(), caps[1].to_string()))
        })
        .collect();

    if matches.is_empty() {
        return Ok(false);
    }

    let mut starts = Vec::with_capacity(runs.len());
    let mut offset = 0;
    for run in runs.iter() {
        starts.push(offset);
        offset += run.len();
    }
    // Run holding byte `pos` of the paragraph text
    let locate = |pos: usize| starts.iter().rposition(|s| *s <= pos).unwrap_or(0);

    // Back to front so earlier offsets stay valid
    for (start, end, name) in matches.into_iter().rev() {
        let value = fields
            .get(name.as_str())
            .ok_or_else(|| format!("template references unknown field '{name}'"))?;

        let first = locate(start);
        let last = locate(end - 1);
        let head = start - starts[first];
        let tail = end - starts[last];

        if first == last {
            let run = &runs[first];
            runs[first] = format!("{}{}{}", &run[..head], value, &run[tail..]);
        } else {
            runs[last] = runs[last][tail..].to_string();
            for run in &mut runs[first + 1..last] {
                run.clear();
            }
            runs[first].truncate(head);
            runs[first].push_str(value);
        }
    }

    Ok(true)
}

/// Characters allowed by XML 1.0
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r')
        || ('\u{20}'..='\u{D7FF}').contains(&c)
        || ('\u{E000}'..='\u{FFFD}').contains(&c)
        || ('\u{10000}'..='\u{10FFFF}').contains(&c)
}
