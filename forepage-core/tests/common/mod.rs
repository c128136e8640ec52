#![allow(dead_code)]

use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Excel serial of 2025-01-01 00:00 (1900 date system)
pub const JAN_1_2025: f64 = 45658.0;

/// Content of the date column (M) of a fixture row
#[derive(Debug, Clone, Copy)]
pub enum DateCell<'a> {
    Serial(f64),
    Text(&'a str),
    Error,
    Blank,
}

#[derive(Debug, Clone, Copy)]
pub struct FixtureRow<'a> {
    pub title: &'a str,
    pub identifier: &'a str,
    pub date: DateCell<'a>,
}

impl<'a> FixtureRow<'a> {
    pub fn new(title: &'a str, identifier: &'a str, date: DateCell<'a>) -> Self {
        Self {
            title,
            identifier,
            date,
        }
    }
}

// Helper to create a minimal XLSX register: title in B, identifier in I,
// version in K, submitter in L, date in M, no header row
pub fn create_mock_register(path: &Path, rows: &[FixtureRow]) -> anyhow::Result<()> {
    let mut strings: Vec<String> = Vec::new();
    let mut string_index = |s: &str| -> usize {
        if let Some(i) = strings.iter().position(|x| x == s) {
            i
        } else {
            strings.push(s.to_string());
            strings.len() - 1
        }
    };

    let mut sheet_data = String::new();
    for (i, row) in rows.iter().enumerate() {
        let r = i + 1;
        sheet_data.push_str(&format!(r#"<row r="{r}">"#));
        sheet_data.push_str(&format!(
            r#"<c r="B{r}" t="s"><v>{}</v></c>"#,
            string_index(row.title)
        ));
        sheet_data.push_str(&format!(
            r#"<c r="I{r}" t="s"><v>{}</v></c>"#,
            string_index(row.identifier)
        ));
        sheet_data.push_str(&format!(r#"<c r="K{r}"><v>{}</v></c>"#, r % 3 + 1));
        sheet_data.push_str(&format!(
            r#"<c r="L{r}" t="s"><v>{}</v></c>"#,
            string_index("Design team")
        ));
        match row.date {
            DateCell::Serial(serial) => {
                sheet_data.push_str(&format!(r#"<c r="M{r}" s="1"><v>{serial}</v></c>"#))
            }
            DateCell::Text(text) => sheet_data.push_str(&format!(
                r#"<c r="M{r}" t="s"><v>{}</v></c>"#,
                string_index(text)
            )),
            DateCell::Error => {
                sheet_data.push_str(&format!(r#"<c r="M{r}" t="e"><v>#N/A</v></c>"#))
            }
            DateCell::Blank => {}
        }
        // Unrelated trailing column keeps the used range wide even when M is blank
        sheet_data.push_str(&format!(r#"<c r="N{r}"><v>0</v></c>"#));
        sheet_data.push_str("</row>");
    }

    let file = File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>
</Types>"#)?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#)?;

    zip.start_file("xl/workbook.xml", options)?;
    zip.write_all(br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheets><sheet name="Register" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#)?;

    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    zip.write_all(br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>
</Relationships>"#)?;

    // Style 1 uses built-in format 22 (m/d/yy h:mm), a date-time format
    zip.start_file("xl/styles.xml", options)?;
    zip.write_all(br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="22" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs>
</styleSheet>"#)?;

    zip.start_file("xl/sharedStrings.xml", options)?;
    let mut sst = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{0}" uniqueCount="{0}">"#,
        strings.len()
    );
    for s in &strings {
        sst.push_str(&format!("<si><t>{}</t></si>", xml_escape(s)));
    }
    sst.push_str("</sst>");
    zip.write_all(sst.as_bytes())?;

    zip.start_file("xl/worksheets/sheet1.xml", options)?;
    zip.write_all(
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{sheet_data}</sheetData></worksheet>"#
        )
        .as_bytes(),
    )?;

    zip.finish()?;
    Ok(())
}

/// Minimal `.docx` whose body holds the given paragraph XML
pub fn create_mock_template(path: &Path, paragraphs: &str) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#)?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#)?;

    zip.start_file("word/document.xml", options)?;
    zip.write_all(
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{paragraphs}</w:body></w:document>"#
        )
        .as_bytes(),
    )?;

    zip.finish()?;
    Ok(())
}

/// The usual forepage: title, doc number and date, with the title split
/// across runs the way word processors store edited text
pub fn create_forepage_template(path: &Path) -> anyhow::Result<()> {
    create_mock_template(
        path,
        "<w:p><w:r><w:t>{{ report_</w:t></w:r><w:r><w:t>title }}</w:t></w:r></w:p>\
         <w:p><w:r><w:t>Document No. {{ doc_number }}</w:t></w:r></w:p>\
         <w:p><w:r><w:t>Submitted {{submission_date}}</w:t></w:r></w:p>",
    )
}

/// Text of `word/document.xml` inside a `.docx` package
pub fn document_xml(docx: &[u8]) -> anyhow::Result<String> {
    let mut zip = ZipArchive::new(Cursor::new(docx))?;
    let mut part = zip.by_name("word/document.xml")?;
    let mut content = String::new();
    part.read_to_string(&mut content)?;
    Ok(content)
}

/// Entry names of a ZIP archive, in order
pub fn entry_names(bytes: &[u8]) -> anyhow::Result<Vec<String>> {
    let mut zip = ZipArchive::new(Cursor::new(bytes))?;
    let mut names = Vec::new();
    for i in 0..zip.len() {
        names.push(zip.by_index(i)?.name().to_string());
    }
    Ok(names)
}

/// Raw bytes of one archive entry
pub fn entry_bytes(bytes: &[u8], name: &str) -> anyhow::Result<Vec<u8>> {
    let mut zip = ZipArchive::new(Cursor::new(bytes))?;
    let mut entry = zip.by_name(name)?;
    let mut content = Vec::new();
    entry.read_to_end(&mut content)?;
    Ok(content)
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
