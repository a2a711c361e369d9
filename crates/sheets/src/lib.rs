//! # maxrag-sheets: Spreadsheet Extraction Plugin
//!
//! This crate provides extraction of `.xls` and `.xlsx` workbooks for the
//! `maxrag` ecosystem. Every sheet is rendered as CSV under a
//! `--- <sheet name> ---` header, in workbook order, until the accumulated text
//! passes the character ceiling.

use async_trait::async_trait;
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use maxrag::extract::{ExtractError, ExtractLimits, Extractor, RawExtraction};
use std::io::Cursor;
use thiserror::Error;
use tracing::{debug, info, instrument};

// --- Error Definitions ---

#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Failed to open workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("Failed to read sheet '{sheet}': {reason}")]
    Sheet { sheet: String, reason: String },
    #[error("Failed to write CSV: {0}")]
    Csv(String),
    #[error("Spreadsheet extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<csv::Error> for SheetError {
    fn from(err: csv::Error) -> Self {
        SheetError::Csv(err.to_string())
    }
}

/// A helper to convert the plugin error into the core `ExtractError`.
fn to_extract_error(filename: &str, err: SheetError) -> ExtractError {
    match err {
        SheetError::Task(e) => ExtractError::Internal(e.to_string()),
        other => ExtractError::parse(filename, other),
    }
}

// --- Rendering ---

/// Text of the sheets visited and their names, in workbook order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetText {
    pub text: String,
    pub sheets: Vec<String>,
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 => format!("{f:.0}"),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#ERR:{e:?}"),
    }
}

/// Renders one sheet as CSV, one record per row.
pub fn range_to_csv(range: &Range<Data>) -> Result<String, SheetError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    for row in range.rows() {
        writer.write_record(row.iter().map(cell_to_string))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| SheetError::Csv(e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Appends sheets in order, stopping after the first one that pushes the text
/// past `max_chars`. Sheets are pulled lazily so unread ones are never parsed.
pub fn render_sheets<I>(sheets: I, max_chars: usize) -> Result<SheetText, SheetError>
where
    I: IntoIterator<Item = Result<(String, Range<Data>), SheetError>>,
{
    let mut rendered = SheetText::default();
    for sheet in sheets {
        let (name, range) = sheet?;
        let csv = range_to_csv(&range)?;
        rendered.text.push_str(&format!("\n--- {name} ---\n{csv}\n"));
        rendered.sheets.push(name);

        if rendered.text.chars().count() > max_chars {
            debug!(
                "Stopping after sheet {}: character ceiling reached",
                rendered.sheets.len()
            );
            break;
        }
    }
    Ok(rendered)
}

/// Opens the workbook from memory and renders its sheets synchronously.
pub fn extract_workbook_text(data: Vec<u8>, max_chars: usize) -> Result<SheetText, SheetError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(data))?;
    let names = workbook.sheet_names().to_vec();
    let sheets = names.into_iter().map(|name| {
        workbook
            .worksheet_range(&name)
            .map(|range| (name.clone(), range))
            .map_err(|e| SheetError::Sheet {
                sheet: name,
                reason: e.to_string(),
            })
    });
    render_sheets(sheets, max_chars)
}

// --- Extractor Implementation ---

/// The `Extractor` implementation for Excel workbooks.
#[derive(Debug, Clone, Copy, Default)]
pub struct SheetExtractor;

#[async_trait]
impl Extractor for SheetExtractor {
    fn extensions(&self) -> &'static [&'static str] {
        &[".xls", ".xlsx"]
    }

    #[instrument(skip(self, bytes, limits), fields(bytes = bytes.len()))]
    async fn extract(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        limits: ExtractLimits,
    ) -> Result<RawExtraction, ExtractError> {
        let rendered =
            tokio::task::spawn_blocking(move || extract_workbook_text(bytes, limits.max_chars))
                .await
                .map_err(SheetError::from)
                .and_then(|inner| inner)
                .map_err(|e| to_extract_error(filename, e))?;

        info!(
            "Rendered {} sheets from '{}'.",
            rendered.sheets.len(),
            filename
        );

        Ok(RawExtraction {
            text: rendered.text,
            pages: None,
            sheets: rendered.sheets,
        })
    }
}
