// ============================================================
// CSV PARSER
// ============================================================
// Decode uploaded bytes, validate the equipment header and coerce rows

use csv::{ReaderBuilder, StringRecord, Trim};
use encoding_rs::WINDOWS_1252;

use crate::domain::equipment::{
    EquipmentRow, COLUMN_FLOWRATE, COLUMN_NAME, COLUMN_PRESSURE, COLUMN_TEMPERATURE, COLUMN_TYPE,
    REQUIRED_COLUMNS,
};
use crate::domain::error::AppError;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Parser for comma-separated equipment uploads
#[derive(Debug, Default)]
pub struct CsvParser;

/// Positions of the required columns within the header record
struct ColumnIndex {
    name: usize,
    equipment_type: usize,
    flowrate: usize,
    pressure: usize,
    temperature: usize,
}

impl CsvParser {
    /// Create a new CSV parser with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse raw upload bytes into equipment rows
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<Vec<EquipmentRow>, AppError> {
        let content = decode(bytes);
        self.parse_content(&content)
    }

    /// Parse CSV content from string
    pub fn parse_content(&self, content: &str) -> Result<Vec<EquipmentRow>, AppError> {
        if content.trim().is_empty() {
            return Err(AppError::ValidationError("CSV file is empty".to_string()));
        }

        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(false)
            .from_reader(content.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| AppError::ParseError(format!("Failed to read CSV headers: {}", e)))?
            .clone();

        let columns = locate_columns(&headers)?;

        let mut rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            // Row numbers are 1-based and count the header line.
            let line = index + 2;
            let record = result.map_err(|e| {
                AppError::ParseError(format!("Failed to parse CSV row {}: {}", line, e))
            })?;
            rows.push(self.parse_row(line, &columns, &record)?);
        }

        Ok(rows)
    }

    fn parse_row(
        &self,
        line: usize,
        columns: &ColumnIndex,
        record: &StringRecord,
    ) -> Result<EquipmentRow, AppError> {
        let text = |idx: usize| record.get(idx).unwrap_or("").to_string();

        Ok(EquipmentRow {
            name: text(columns.name),
            equipment_type: text(columns.equipment_type),
            flowrate: parse_number(line, COLUMN_FLOWRATE, record.get(columns.flowrate))?,
            pressure: parse_number(line, COLUMN_PRESSURE, record.get(columns.pressure))?,
            temperature: parse_number(line, COLUMN_TEMPERATURE, record.get(columns.temperature))?,
        })
    }
}

/// Decode as UTF-8 (without BOM), falling back to Windows-1252
fn decode(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(content) => content.to_string(),
        Err(_) => {
            let (content, _, _) = WINDOWS_1252.decode(bytes);
            content.into_owned()
        }
    }
}

fn locate_columns(headers: &StringRecord) -> Result<ColumnIndex, AppError> {
    let position = |column: &str| headers.iter().position(|h| h.trim() == column);

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| position(column).is_none())
        .collect();

    if !missing.is_empty() {
        return Err(AppError::ValidationError(format!(
            "Missing columns: {}",
            missing.join(", ")
        )));
    }

    let index = |column: &str| {
        position(column).ok_or_else(|| {
            AppError::Internal(format!("Column {} vanished after validation", column))
        })
    };

    Ok(ColumnIndex {
        name: index(COLUMN_NAME)?,
        equipment_type: index(COLUMN_TYPE)?,
        flowrate: index(COLUMN_FLOWRATE)?,
        pressure: index(COLUMN_PRESSURE)?,
        temperature: index(COLUMN_TEMPERATURE)?,
    })
}

fn parse_number(line: usize, column: &str, value: Option<&str>) -> Result<f64, AppError> {
    let raw = value.unwrap_or("").trim();
    raw.parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
        .ok_or_else(|| {
            AppError::ParseError(format!(
                "Row {}: could not convert '{}' in column '{}' to a number",
                line, raw, column
            ))
        })
}
