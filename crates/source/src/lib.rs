//! Dataset sources.
//!
//! Provides the `DatasetSource` trait and its CSV, spreadsheet and JSON
//! implementations.
//! Loading happens once at startup; everything downstream works on the
//! resulting in-memory `Dataset`.

use calamine::{open_workbook_auto, DataType, Reader};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tryout_model::{CellValue, Dataset, Record};

/// Errors from loading a dataset.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read {}: {}", path.display(), source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Unsupported file format: {0:?} (expected .csv, .tsv, .xlsx, .xls or .json)")]
    UnsupportedFormat(String),

    #[error("Input is not a table: {0}")]
    NotATable(String),
}

/// Trait for dataset sources (CSV, JSON, ...).
pub trait DatasetSource {
    /// Load the whole table.
    fn load(&self) -> Result<Dataset, SourceError>;

    /// Get the source name for logging.
    fn name(&self) -> &'static str;
}

fn open_file(path: &Path) -> Result<File, SourceError> {
    File::open(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Make headers unique and non-blank.
///
/// Blank headers become `Unnamed: <i>`; repeats get `.1`, `.2`, ... appended,
/// so every column keeps a distinct name.
fn dedupe_headers(raw: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut headers = Vec::new();

    for (index, header) in raw.into_iter().enumerate() {
        let base = if header.trim().is_empty() {
            format!("Unnamed: {}", index)
        } else {
            header.trim().to_string()
        };

        let mut name = base.clone();
        let mut suffix = 0;
        while seen.contains(&name) {
            suffix += 1;
            name = format!("{}.{}", base, suffix);
        }

        seen.insert(name.clone());
        headers.push(name);
    }

    headers
}

/// A delimited text file with a header row.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    delimiter: u8,
}

impl CsvSource {
    /// Create a comma-separated source.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Parse a table from any reader using this source's settings.
    ///
    /// Fields that are not valid UTF-8 (legacy code-page exports) are decoded
    /// lossily instead of failing the whole load.
    pub fn read_from<R: Read>(&self, reader: R) -> Result<Dataset, SourceError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let columns = dedupe_headers(reader.byte_headers()?.iter().map(decode_field));

        let mut records = Vec::new();
        let mut row = csv::ByteRecord::new();
        while reader.read_byte_record(&mut row)? {
            records.push(Record::new(
                row.iter().map(|field| CellValue::text(decode_field(field))).collect(),
            ));
        }

        Ok(Dataset::new(columns, records))
    }
}

fn decode_field(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

impl DatasetSource for CsvSource {
    fn load(&self) -> Result<Dataset, SourceError> {
        let dataset = self.read_from(open_file(&self.path)?)?;
        tracing::info!(
            path = %self.path.display(),
            rows = dataset.len(),
            columns = dataset.columns().len(),
            "Loaded CSV dataset"
        );
        Ok(dataset)
    }

    fn name(&self) -> &'static str {
        "csv"
    }
}

/// The first worksheet of a spreadsheet workbook (.xlsx, .xls).
///
/// The first row holds the headers; fully blank rows are skipped.
#[derive(Debug, Clone)]
pub struct XlsxSource {
    path: PathBuf,
}

impl XlsxSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Build a table from worksheet rows.
    pub fn from_rows<'a>(
        rows: impl IntoIterator<Item = &'a [DataType]>,
    ) -> Result<Dataset, SourceError> {
        let mut rows = rows.into_iter();
        let header = rows
            .next()
            .ok_or_else(|| SourceError::NotATable("the worksheet is empty".to_string()))?;

        let columns = dedupe_headers(header.iter().map(|cell| sheet_cell(cell).to_string()));
        let records = rows
            .map(|row| row.iter().map(sheet_cell).collect::<Vec<_>>())
            .filter(|cells| !cells.iter().all(CellValue::is_empty))
            .map(Record::new)
            .collect();

        Ok(Dataset::new(columns, records))
    }
}

fn sheet_cell(cell: &DataType) -> CellValue {
    match cell {
        DataType::Empty => CellValue::Empty,
        DataType::Int(n) => CellValue::Number(*n as f64),
        DataType::Float(n) => CellValue::Number(*n),
        DataType::String(s) => CellValue::text(s.trim()),
        other => CellValue::text(other.to_string().trim()),
    }
}

impl DatasetSource for XlsxSource {
    fn load(&self) -> Result<Dataset, SourceError> {
        let mut workbook = open_workbook_auto(&self.path)?;

        let sheet = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| SourceError::NotATable("the workbook has no worksheets".to_string()))?;

        let range = workbook
            .worksheet_range(&sheet)
            .ok_or_else(|| SourceError::NotATable(format!("worksheet {:?} is missing", sheet)))??;

        let dataset = Self::from_rows(range.rows())?;
        tracing::info!(
            path = %self.path.display(),
            sheet = %sheet,
            rows = dataset.len(),
            columns = dataset.columns().len(),
            "Loaded spreadsheet dataset"
        );
        Ok(dataset)
    }

    fn name(&self) -> &'static str {
        "xlsx"
    }
}

/// A JSON array of row objects.
///
/// Column order is the order keys are first seen across rows.
#[derive(Debug, Clone)]
pub struct JsonSource {
    path: PathBuf,
}

impl JsonSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Parse a table from JSON text.
    pub fn parse(text: &str) -> Result<Dataset, SourceError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    fn from_value(value: serde_json::Value) -> Result<Dataset, SourceError> {
        let serde_json::Value::Array(rows) = value else {
            return Err(SourceError::NotATable("expected a JSON array of objects".to_string()));
        };

        let mut objects = Vec::with_capacity(rows.len());
        for (index, row) in rows.into_iter().enumerate() {
            match row {
                serde_json::Value::Object(map) => objects.push(map),
                other => {
                    return Err(SourceError::NotATable(format!(
                        "row {} is {}, not an object",
                        index,
                        json_kind(&other)
                    )))
                }
            }
        }

        let mut columns: Vec<String> = Vec::new();
        for object in &objects {
            for key in object.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }

        let records = objects
            .iter()
            .map(|object| {
                Record::new(
                    columns
                        .iter()
                        .map(|c| object.get(c).map(json_cell).unwrap_or_default())
                        .collect(),
                )
            })
            .collect();

        Ok(Dataset::new(columns, records))
    }
}

fn json_cell(value: &serde_json::Value) -> CellValue {
    match value {
        serde_json::Value::Null => CellValue::Empty,
        serde_json::Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or_default(),
        serde_json::Value::String(s) => CellValue::text(s.trim()),
        other => CellValue::Text(other.to_string()),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

impl DatasetSource for JsonSource {
    fn load(&self) -> Result<Dataset, SourceError> {
        let mut text = String::new();
        open_file(&self.path)?
            .read_to_string(&mut text)
            .map_err(|source| SourceError::Io {
                path: self.path.clone(),
                source,
            })?;

        let dataset = Self::parse(&text)?;
        tracing::info!(
            path = %self.path.display(),
            rows = dataset.len(),
            columns = dataset.columns().len(),
            "Loaded JSON dataset"
        );
        Ok(dataset)
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

/// Pick a source for `path` by file extension.
pub fn open_source(path: &Path) -> Result<Box<dyn DatasetSource>, SourceError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let source: Box<dyn DatasetSource> = match extension.as_str() {
        "csv" => Box::new(CsvSource::new(path)),
        "tsv" => Box::new(CsvSource::new(path).with_delimiter(b'\t')),
        "xlsx" | "xls" => Box::new(XlsxSource::new(path)),
        "json" => Box::new(JsonSource::new(path)),
        _ => return Err(SourceError::UnsupportedFormat(extension)),
    };

    tracing::debug!(path = %path.display(), source = source.name(), "Selected dataset source");
    Ok(source)
}
