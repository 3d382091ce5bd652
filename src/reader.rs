//! Spreadsheet input: the first sheet of a workbook (xlsx, xlsm, xlsb, xls,
//! ods) or a CSV file, exposed as a single pass over its data rows.

use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader};
use tracing::debug;

use crate::error::{IngestError, IngestResult};
use crate::models::{CellValue, RawRow};

enum RowSource {
    Sheet {
        range: Range<Data>,
        next: usize,
    },
    Csv {
        records: csv::StringRecordsIntoIter<Box<dyn Read + Send>>,
        line: usize,
    },
}

/// Iterator over the data rows of a spreadsheet; the header row is skipped.
pub struct SpreadsheetReader {
    source: RowSource,
}

impl SpreadsheetReader {
    pub fn from_path(path: &Path) -> IngestResult<Self> {
        if is_csv_name(&path.to_string_lossy()) {
            let file = File::open(path)
                .map_err(|e| IngestError::MalformedSpreadsheet(format!("{}: {e}", path.display())))?;
            return Ok(Self::csv(Box::new(file)));
        }

        let mut workbook = open_workbook_auto(path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| IngestError::MalformedSpreadsheet("el libro no tiene hojas".to_string()))??;
        Ok(Self::sheet(range))
    }

    /// Reads an uploaded file held in memory. `file_name` is only used to
    /// recognise CSV uploads; workbook formats are detected from content.
    pub fn from_bytes(bytes: Vec<u8>, file_name: Option<&str>) -> IngestResult<Self> {
        if file_name.is_some_and(is_csv_name) {
            return Ok(Self::csv(Box::new(Cursor::new(bytes))));
        }

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| IngestError::MalformedSpreadsheet("el libro no tiene hojas".to_string()))??;
        Ok(Self::sheet(range))
    }

    fn sheet(range: Range<Data>) -> Self {
        debug!(height = range.height(), width = range.width(), "sheet loaded");
        Self {
            source: RowSource::Sheet { range, next: 1 },
        }
    }

    fn csv(input: Box<dyn Read + Send>) -> Self {
        let records = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(input)
            .into_records();
        Self {
            source: RowSource::Csv { records, line: 1 },
        }
    }
}

impl Iterator for SpreadsheetReader {
    type Item = IngestResult<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.source {
            RowSource::Sheet { range, next } => {
                let row = range.rows().nth(*next)?;
                *next += 1;
                Some(Ok(RawRow {
                    line: *next + range.start().map_or(0, |(r, _)| r as usize),
                    cells: row.iter().map(convert_cell).collect(),
                }))
            }
            RowSource::Csv { records, line } => {
                let record = records.next()?;
                *line += 1;
                Some(record.map_err(IngestError::from).map(|record| RawRow {
                    line: *line,
                    cells: record
                        .iter()
                        .map(|field| {
                            if field.is_empty() {
                                CellValue::Empty
                            } else {
                                CellValue::Text(field.to_string())
                            }
                        })
                        .collect(),
                }))
            }
        }
    }
}

fn is_csv_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Float(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}
