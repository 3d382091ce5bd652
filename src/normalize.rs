use crate::error::{IngestError, IngestResult};
use crate::models::{CellValue, NormalizedRow, RawRow};
use crate::surveys::SurveyTableSchema;

/// Stored in place of every absent cell, so no column ever receives NULL.
pub const PLACEHOLDER: &str = " ";

pub fn normalize(row: RawRow) -> NormalizedRow {
    NormalizedRow {
        line: row.line,
        cells: row
            .cells
            .into_iter()
            .map(|cell| match cell {
                CellValue::Empty => CellValue::Text(PLACEHOLDER.to_string()),
                other => other,
            })
            .collect(),
    }
}

/// Rejects a row whose width differs from the schema's column count.
pub fn check_width(row: &NormalizedRow, schema: &SurveyTableSchema) -> IngestResult<()> {
    if row.width() != schema.width() {
        return Err(IngestError::RowWidth {
            row: row.line,
            expected: schema.width(),
            found: row.width(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn absent_cells_become_placeholder() {
        let row = RawRow {
            line: 2,
            cells: vec![CellValue::Empty, text("x"), CellValue::Empty],
        };
        let normalized = normalize(row);
        assert_eq!(normalized.cells, vec![text(" "), text("x"), text(" ")]);
        assert_eq!(normalized.line, 2);
    }

    #[test]
    fn present_values_pass_through_uncoerced() {
        let row = RawRow {
            line: 5,
            cells: vec![CellValue::Float(4.0), text(""), text("  a "), CellValue::Bool(false)],
        };
        let normalized = normalize(row.clone());
        assert_eq!(normalized.cells, row.cells);
    }

    #[test]
    fn width_must_match_schema() {
        let schema = SurveyTableSchema::new("t", &["A", "B"], 1);
        let ok = NormalizedRow {
            line: 2,
            cells: vec![text("1"), text("2"), text("3")],
        };
        assert!(check_width(&ok, &schema).is_ok());

        let short = NormalizedRow {
            line: 7,
            cells: vec![text("1")],
        };
        match check_width(&short, &schema) {
            Err(IngestError::RowWidth {
                row,
                expected,
                found,
            }) => {
                assert_eq!((row, expected, found), (7, 3, 1));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
