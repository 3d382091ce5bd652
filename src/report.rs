use std::future::Future;

use rust_xlsxwriter::{Format, Workbook};
use tracing::info;

use crate::db::SurveyStore;
use crate::error::IngestResult;
use crate::models::{CellValue, ReportTable};
use crate::surveys::{ReportKind, XLSX_MIME_TYPE};

pub const CONNECTION_FAILURE_TEXT: &str = "Error de conexión a la base de datos";

/// A finished download: bytes plus what the response needs to carry them.
#[derive(Debug, Clone)]
pub struct ReportDownload {
    pub file_name: &'static str,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Header row of column names, then every row as-is. No index column.
pub fn build_workbook(table: &ReportTable) -> IngestResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let datetime_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

    for (col, name) in table.columns.iter().enumerate() {
        worksheet.write_string(0, col as u16, name)?;
    }

    for (row_idx, cells) in table.rows.iter().enumerate() {
        let row = (row_idx + 1) as u32;
        for (col_idx, cell) in cells.iter().enumerate() {
            let col = col_idx as u16;
            match cell {
                CellValue::Empty => {}
                CellValue::Text(s) => {
                    worksheet.write_string(row, col, s)?;
                }
                CellValue::Int(i) => {
                    worksheet.write_number(row, col, *i as f64)?;
                }
                CellValue::Float(f) => {
                    worksheet.write_number(row, col, *f)?;
                }
                CellValue::Bool(b) => {
                    worksheet.write_boolean(row, col, *b)?;
                }
                CellValue::DateTime(dt) => {
                    worksheet.write_datetime_with_format(row, col, dt, &datetime_format)?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Full dump of one report table as an xlsx download.
pub async fn export<S, F, Fut>(kind: ReportKind, connect: F) -> IngestResult<ReportDownload>
where
    S: SurveyStore,
    F: FnOnce() -> Fut,
    Fut: Future<Output = IngestResult<S>>,
{
    let mut store = connect().await?;
    let table = store.fetch_table(kind.table_name()).await?;
    let bytes = build_workbook(&table)?;
    info!(
        table = kind.table_name(),
        rows = table.rows.len(),
        size = bytes.len(),
        "report exported"
    );
    Ok(ReportDownload {
        file_name: kind.download_name(),
        mime_type: XLSX_MIME_TYPE,
        bytes,
    })
}
