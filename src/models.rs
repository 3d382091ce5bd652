use chrono::NaiveDateTime;
use serde::Serialize;

/// One cell as read from a spreadsheet, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// Text bound into the store for this cell. `None` only for `Empty`.
    pub fn to_sql_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Int(i) => Some(i.to_string()),
            CellValue::Float(f) => Some(format_float(*f)),
            CellValue::Bool(true) => Some("TRUE".to_string()),
            CellValue::Bool(false) => Some("FALSE".to_string()),
            CellValue::DateTime(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}

fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Cells of one data row, positionally aligned to a survey schema.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 1-based row number in the source sheet (header is row 1).
    pub line: usize,
    pub cells: Vec<CellValue>,
}

/// A row with every absent cell replaced by the placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow {
    pub line: usize,
    pub cells: Vec<CellValue>,
}

impl NormalizedRow {
    pub fn width(&self) -> usize {
        self.cells.len()
    }
}

/// Result of one upload, handed straight to whatever renders it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestionOutcome {
    pub success: bool,
    pub message: String,
    pub rows_loaded: usize,
    /// Where the caller should send the user next.
    pub redirect_to: String,
}

/// Full dump of a report table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn integral_floats_render_without_fraction() {
        assert_eq!(CellValue::Float(4.0).to_sql_text().as_deref(), Some("4"));
        assert_eq!(CellValue::Float(3.25).to_sql_text().as_deref(), Some("3.25"));
        assert_eq!(CellValue::Int(-12).to_sql_text().as_deref(), Some("-12"));
    }

    #[test]
    fn text_is_bound_verbatim() {
        let cell = CellValue::Text("  Ingeniería ".to_string());
        assert_eq!(cell.to_sql_text().as_deref(), Some("  Ingeniería "));
        assert_eq!(CellValue::Empty.to_sql_text(), None);
    }

    #[test]
    fn datetimes_render_iso() {
        let dt = NaiveDate::from_ymd_opt(2024, 5, 17)
            .and_then(|d| d.and_hms_opt(14, 3, 0))
            .unwrap();
        assert_eq!(
            CellValue::DateTime(dt).to_sql_text().as_deref(),
            Some("2024-05-17 14:03:00")
        );
    }
}
