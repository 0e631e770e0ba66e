//! Table extraction: locates the soil temperature table in the page and turns
//! each `<tr>` into a row of normalized text cells.

use crate::domain::model::{RawDocument, RawRow};
use crate::utils::error::{EtlError, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// Zero-based position of the soil temperature table among all `<table>`
/// elements of the page, nested tables included.
///
/// This couples the extractor to the current layout of the CHMI page. When
/// the page gains or loses a table before the target one, runs fail with
/// [`EtlError::StructureError`] or [`EtlError::SchemaMismatchError`].
pub const TARGET_TABLE_INDEX: usize = 2;

/// Degree-Celsius suffixes seen on the page. `Â°C` is the UTF-8 degree sign
/// read as Latin-1; `degC` is what transliteration makes of `°C`.
const UNIT_SUFFIXES: [&str; 4] = ["Â°C", "°C", "℃", "degC"];

fn decimal_comma() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d),(\d)").expect("static decimal comma pattern"))
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| EtlError::ProcessingError {
        message: format!("invalid CSS selector '{}': {:?}", css, e),
    })
}

/// Extracts every row of the target table, header row included.
pub fn extract(doc: &RawDocument) -> Result<Vec<RawRow>> {
    let document = Html::parse_document(&doc.body);

    let table_sel = selector("table")?;
    let tables: Vec<ElementRef> = document.select(&table_sel).collect();
    tracing::debug!("Found {} tables on {}", tables.len(), doc.url);

    let table = tables
        .get(TARGET_TABLE_INDEX)
        .ok_or_else(|| EtlError::StructureError {
            url: doc.url.clone(),
            expected: TARGET_TABLE_INDEX + 1,
            found: tables.len(),
        })?;

    let row_sel = selector("tr")?;
    let cell_sel = selector("td, th")?;

    let rows = table
        .select(&row_sel)
        .enumerate()
        .map(|(index, row)| {
            let cells = row
                .select(&cell_sel)
                .map(|cell| normalize_cell(&cell.text().collect::<String>()))
                .filter(|cell| !cell.is_empty())
                .collect();
            RawRow::new(index, cells)
        })
        .collect();

    Ok(rows)
}

/// Normalizes one cell: trims, turns decimal commas into points, strips the
/// temperature unit and transliterates to ASCII.
pub fn normalize_cell(raw: &str) -> String {
    let text = decimal_comma().replace_all(raw.trim(), "$1.$2");
    let text = strip_unit_suffix(&text);
    let text = transliterate(text);
    strip_unit_suffix(&text).to_string()
}

fn strip_unit_suffix(text: &str) -> &str {
    let trimmed = text.trim_end();
    UNIT_SUFFIXES
        .iter()
        .find_map(|suffix| trimmed.strip_suffix(suffix))
        .map(str::trim_end)
        .unwrap_or(trimmed)
        .trim_start()
}

/// ASCII transliteration. Already-ASCII input comes back unchanged.
pub fn transliterate(text: &str) -> String {
    if text.is_ascii() {
        return text.to_string();
    }
    deunicode::deunicode(text).trim().to_string()
}
