//! XLSX/XLSM container I/O.
//!
//! Loading goes through calamine and reads every sheet's last computed
//! values. Saving never rebuilds the container: the original archive is
//! patched entry by entry, rewriting only worksheet parts and raw-copying
//! everything else, so `xl/vbaProject.bin` and any other macro payload
//! survive byte-for-byte. Rewritten cells use inline strings, which avoids
//! touching the shared string table; cell styles on rewritten sheets are
//! lost.

use crate::book::Workbook;
use crate::cell::CellValue;
use crate::error::{Result, SheetError};
use crate::sheet::Sheet;
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx, XlsxError};
use indexmap::IndexMap;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

/// Sheet names Excel refuses: these characters, empty names, or anything
/// longer than 31 characters.
const FORBIDDEN_NAME_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

fn data_to_cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Null,
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::String(s) => CellValue::String(s.clone()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => CellValue::Date(ndt),
            None => CellValue::Float(dt.as_f64()),
        },
        // ISO dates come back from our own patched output
        Data::DateTimeIso(s) => match CellValue::normalize(s) {
            CellValue::Date(dt) => CellValue::Date(dt),
            _ => CellValue::String(s.clone()),
        },
        Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(e) => CellValue::String(e.to_string()),
    }
}

fn header_name(data: &Data, index: usize) -> String {
    let value = data_to_cell_value(data);
    if value.is_null() {
        format!("Column{}", index + 1)
    } else {
        value.as_str()
    }
}

impl Workbook {
    /// Decode every sheet of an `.xlsx`/`.xlsm` byte stream.
    ///
    /// Sheet order and names are preserved verbatim; the first row of each
    /// sheet becomes its column header (empty header cells get positional
    /// names). Formula cells arrive as their last computed value.
    ///
    /// # Errors
    ///
    /// `Load` when the bytes are not a readable container of the expected
    /// format (corrupt, wrong format, password-protected).
    pub fn from_xlsx_bytes(bytes: &[u8]) -> Result<Self> {
        let cursor = Cursor::new(bytes.to_vec());
        let mut workbook: Xlsx<Cursor<Vec<u8>>> = open_workbook_from_rs(cursor)
            .map_err(|e: XlsxError| SheetError::Load(e.to_string()))?;

        let sheet_names = workbook.sheet_names().to_owned();
        let mut book = Workbook::new();

        for sheet_name in sheet_names {
            let range = workbook
                .worksheet_range(&sheet_name)
                .map_err(|e| SheetError::Load(e.to_string()))?;

            let mut rows_iter = range.rows();
            let columns: Vec<String> = match rows_iter.next() {
                Some(header) => header
                    .iter()
                    .enumerate()
                    .map(|(i, d)| header_name(d, i))
                    .collect(),
                None => Vec::new(),
            };

            let rows: Vec<Vec<CellValue>> = rows_iter
                .map(|row| row.iter().map(data_to_cell_value).collect())
                .collect();

            book.add_sheet(&sheet_name, Sheet::from_rows(&sheet_name, columns, rows))?;
        }

        Ok(book)
    }

    /// Load a workbook from a file path
    pub fn from_xlsx_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_xlsx_bytes(&bytes)
    }

    /// Serialize the workbook back into its original container bytes.
    ///
    /// Every worksheet part named by a sheet in this workbook is rewritten
    /// from the in-memory data; all other archive entries (macros, styles,
    /// relationships, content types) are copied through untouched.
    ///
    /// # Errors
    ///
    /// `InvalidSheetName` for a name the container format refuses; `Save`
    /// when a sheet has no worksheet part in the original archive or the
    /// container metadata cannot be read.
    pub fn save_preserving_macros(&self, original: &[u8]) -> Result<Vec<u8>> {
        for name in self.sheet_names() {
            validate_sheet_name(name)?;
        }

        let mut archive = ZipArchive::new(Cursor::new(original))?;
        let parts = worksheet_parts(&mut archive)?;

        let mut rewrite: HashMap<String, &Sheet> = HashMap::new();
        for (name, sheet) in self.sheets() {
            let path = parts.get(name.as_str()).ok_or_else(|| {
                SheetError::Save(format!(
                    "sheet {name:?} has no worksheet part in the original container"
                ))
            })?;
            rewrite.insert(path.clone(), sheet);
        }

        let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(original.len())));
        for i in 0..archive.len() {
            let entry = archive.by_index_raw(i)?;
            let entry_name = entry.name().to_string();

            if let Some(sheet) = rewrite.get(entry_name.as_str()) {
                let options =
                    FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
                writer.start_file(&entry_name, options)?;
                writer.write_all(write_sheet_xml(sheet).as_bytes())?;
            } else {
                writer.raw_copy_file(entry)?;
            }
        }

        let cursor = writer.finish()?;
        Ok(cursor.into_inner())
    }
}

/// Check a sheet name against the container format's rules
pub fn validate_sheet_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("must not be empty".to_string())
    } else if name.chars().count() > 31 {
        Some("exceeds 31 characters".to_string())
    } else {
        name.chars()
            .find(|c| FORBIDDEN_NAME_CHARS.contains(c))
            .map(|c| format!("contains forbidden character {c:?}"))
    };

    match reason {
        Some(reason) => Err(SheetError::InvalidSheetName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Map each sheet name to its worksheet part path inside the archive.
///
/// Combines `xl/workbook.xml` (name, relationship id, order) with
/// `xl/_rels/workbook.xml.rels` (relationship id, target path).
fn worksheet_parts<RS: Read + Seek>(archive: &mut ZipArchive<RS>) -> Result<IndexMap<String, String>> {
    let targets = relationship_targets(archive)?;

    let file = archive
        .by_name("xl/workbook.xml")
        .map_err(|_| SheetError::Save("container has no xl/workbook.xml".to_string()))?;
    let mut xml = quick_xml::Reader::from_reader(BufReader::new(file));
    xml.trim_text(true);

    let mut parts = IndexMap::new();
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e) | Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"sheet" {
                    let mut name = String::new();
                    let mut r_id = String::new();

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"name" => {
                                name = String::from_utf8_lossy(&attr.value).into_owned();
                            }
                            key if key.ends_with(b":id") || key == b"id" => {
                                r_id = String::from_utf8_lossy(&attr.value).into_owned();
                            }
                            _ => {}
                        }
                    }

                    if !name.is_empty() {
                        // Fall back to the conventional path when the rels
                        // file is absent
                        let path = targets.get(&r_id).cloned().unwrap_or_else(|| {
                            format!("xl/worksheets/sheet{}.xml", parts.len() + 1)
                        });
                        parts.insert(name, path);
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    if parts.is_empty() {
        return Err(SheetError::Save(
            "no worksheets declared in container metadata".to_string(),
        ));
    }
    Ok(parts)
}

/// Relationship id -> worksheet part path, from xl/_rels/workbook.xml.rels
fn relationship_targets<RS: Read + Seek>(
    archive: &mut ZipArchive<RS>,
) -> Result<HashMap<String, String>> {
    let mut targets = HashMap::new();

    let Ok(file) = archive.by_name("xl/_rels/workbook.xml.rels") else {
        return Ok(targets); // relationships file is optional
    };
    let mut xml = quick_xml::Reader::from_reader(BufReader::new(file));
    xml.trim_text(true);

    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e) | Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    let mut id = String::new();
                    let mut target = String::new();
                    let mut rel_type = String::new();

                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"Id" => id = String::from_utf8_lossy(&attr.value).into_owned(),
                            b"Target" => {
                                target = String::from_utf8_lossy(&attr.value).into_owned();
                            }
                            b"Type" => {
                                rel_type = String::from_utf8_lossy(&attr.value).into_owned();
                            }
                            _ => {}
                        }
                    }

                    if rel_type.contains("worksheet") && !id.is_empty() && !target.is_empty() {
                        // Targets are relative to xl/ unless absolute
                        let full_path = match target.strip_prefix('/') {
                            Some(stripped) => stripped.to_string(),
                            None => format!("xl/{target}"),
                        };
                        targets.insert(id, full_path);
                    }
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(targets)
}

/// Generate worksheet XML for a sheet: header row first, then data rows.
///
/// Strings are written inline (`t="inlineStr"`) so the shared string table
/// never needs rebuilding; dates are written as ISO 8601 (`t="d"`).
fn write_sheet_xml(sheet: &Sheet) -> String {
    let mut out = String::with_capacity(4096);
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push('\n');
    out.push_str(
        r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    );
    out.push_str("<sheetData>");

    if !sheet.columns().is_empty() {
        out.push_str("<row r=\"1\">");
        for (c, name) in sheet.columns().iter().enumerate() {
            write_cell(&mut out, 0, c, &CellValue::String(name.clone()));
        }
        out.push_str("</row>");

        for (r, row) in sheet.rows().iter().enumerate() {
            out.push_str(&format!("<row r=\"{}\">", r + 2));
            for (c, cell) in row.iter().enumerate() {
                write_cell(&mut out, r + 1, c, cell);
            }
            out.push_str("</row>");
        }
    }

    out.push_str("</sheetData></worksheet>");
    out
}

/// Write a single `<c>` element; empty cells are omitted entirely
fn write_cell(out: &mut String, row: usize, col: usize, cell: &CellValue) {
    let cell_ref = format!("{}{}", col_to_letter(col), row + 1);
    match cell {
        CellValue::Null => {}
        CellValue::Bool(b) => {
            let v = if *b { "1" } else { "0" };
            out.push_str(&format!("<c r=\"{cell_ref}\" t=\"b\"><v>{v}</v></c>"));
        }
        CellValue::Int(i) => {
            out.push_str(&format!("<c r=\"{cell_ref}\"><v>{i}</v></c>"));
        }
        CellValue::Float(f) => {
            out.push_str(&format!("<c r=\"{cell_ref}\"><v>{f}</v></c>"));
        }
        CellValue::Date(dt) => {
            let iso = dt.format("%Y-%m-%dT%H:%M:%S");
            out.push_str(&format!("<c r=\"{cell_ref}\" t=\"d\"><v>{iso}</v></c>"));
        }
        CellValue::String(s) => {
            out.push_str(&format!(
                "<c r=\"{cell_ref}\" t=\"inlineStr\"><is><t>{}</t></is></c>",
                xml_escape(s)
            ));
        }
    }
}

/// 0-based column index to Excel letters (0 -> A, 26 -> AA)
fn col_to_letter(mut col: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (col % 26) as u8);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
