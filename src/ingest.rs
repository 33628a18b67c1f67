//! Loading movement records from CSV or JSON
//!
//! CSV follows the upstream export header
//! `data,unidade,material,tipo,quantidade,responsavel` (English column names
//! `date,unit,material,operation,quantity,owner` are accepted as well).
//! Empty cells are missing values. JSON is an array of objects with the same
//! field names.

use crate::record::MovementRecord;
use chrono::NaiveDate;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV header is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("CSV line {line}: {message}")]
    Row { line: usize, message: String },

    #[error("input is empty")]
    Empty,
}

pub type Result<T> = std::result::Result<T, IngestError>;

/// Input encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum InputFormat {
    Csv,
    Json,
}

impl InputFormat {
    /// Guess from the file extension; anything but `.json` is CSV
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => InputFormat::Json,
            _ => InputFormat::Csv,
        }
    }
}

/// Load records from a file
pub fn load_records<P: AsRef<Path>>(path: P, format: Option<InputFormat>) -> Result<Vec<MovementRecord>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let format = format.unwrap_or_else(|| InputFormat::from_path(path));
    let records = parse_records(&contents, format)?;
    tracing::debug!(
        path = %path.display(),
        records = records.len(),
        "loaded movement records"
    );
    Ok(records)
}

pub fn parse_records(contents: &str, format: InputFormat) -> Result<Vec<MovementRecord>> {
    match format {
        InputFormat::Csv => parse_csv(contents),
        InputFormat::Json => Ok(serde_json::from_str(contents)?),
    }
}

const COLUMNS: [(&str, &str); 6] = [
    ("data", "date"),
    ("unidade", "unit"),
    ("material", "material"),
    ("tipo", "operation"),
    ("quantidade", "quantity"),
    ("responsavel", "owner"),
];

/// Parse CSV text into records
pub fn parse_csv(contents: &str) -> Result<Vec<MovementRecord>> {
    let mut lines = contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header) = lines.next().ok_or(IngestError::Empty)?;
    let header: Vec<String> = split_fields(header.trim_start_matches('\u{feff}'))
        .into_iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let mut positions = [0usize; 6];
    for (slot, (native, english)) in positions.iter_mut().zip(COLUMNS) {
        *slot = header
            .iter()
            .position(|h| h == native || h == english)
            .ok_or(IngestError::MissingColumn(native))?;
    }

    lines
        .map(|(number, line)| {
            parse_row(&split_fields(line), &positions).map_err(|message| IngestError::Row {
                line: number + 1,
                message,
            })
        })
        .collect()
}

fn parse_row(fields: &[String], positions: &[usize; 6]) -> std::result::Result<MovementRecord, String> {
    let cell = |i: usize| {
        fields
            .get(positions[i])
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
    };
    let required = |i: usize| cell(i).ok_or_else(|| format!("missing {}", COLUMNS[i].1));

    let date_text = required(0)?;
    let date = NaiveDate::parse_from_str(date_text.get(..10).unwrap_or(date_text), "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{}': {}", date_text, e))?;

    let quantity = match cell(4) {
        None => None,
        Some(text) if text.eq_ignore_ascii_case("nan") => None,
        Some(text) => {
            let q = text
                .parse::<f64>()
                .map_err(|e| format!("invalid quantity '{}': {}", text, e))?;
            if !q.is_finite() {
                return Err(format!("invalid quantity '{}': not a finite number", text));
            }
            Some(q)
        }
    };

    Ok(MovementRecord {
        date,
        unit: required(1)?.parse()?,
        material: required(2)?.parse()?,
        operation: required(3)?.parse()?,
        quantity,
        owner: cell(5).map(str::to_string),
    })
}

/// Split one CSV line, honouring double-quoted fields
fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}
