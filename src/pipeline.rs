use std::future::Future;

use tracing::{error, info, warn};

use crate::config::{ReplaceStrategy, StoreConfig};
use crate::db::SurveyStore;
use crate::error::{IngestError, IngestResult};
use crate::models::{IngestionOutcome, NormalizedRow};
use crate::normalize::{check_width, normalize};
use crate::reader::SpreadsheetReader;
use crate::surveys::{SurveyKind, SurveyTableSchema};

pub const SUCCESS_MESSAGE: &str = "Carga exitosa. Los datos se han subido correctamente.";
pub const FAILURE_PREFIX: &str = "Error durante la carga de datos";

/// An uploaded file, fully buffered.
#[derive(Debug, Clone)]
pub struct Upload {
    pub bytes: Vec<u8>,
    pub file_name: Option<String>,
}

/// Reads every data row, fills absent cells and checks widths. Nothing is
/// written anywhere; a bad file is rejected here.
pub fn prepare_rows(
    reader: SpreadsheetReader,
    schema: &SurveyTableSchema,
) -> IngestResult<Vec<NormalizedRow>> {
    let mut rows = Vec::new();
    for raw in reader {
        let row = normalize(raw?);
        check_width(&row, schema)?;
        rows.push(row);
    }
    Ok(rows)
}

/// Parse, then connect, then replace the table. Returns rows inserted.
pub async fn load<S, F, Fut>(
    upload: Upload,
    schema: &SurveyTableSchema,
    strategy: ReplaceStrategy,
    connect: F,
) -> IngestResult<u64>
where
    S: SurveyStore,
    F: FnOnce() -> Fut,
    Fut: Future<Output = IngestResult<S>>,
{
    let reader = SpreadsheetReader::from_bytes(upload.bytes, upload.file_name.as_deref())?;
    let rows = prepare_rows(reader, schema)?;
    info!(table = schema.table_name, rows = rows.len(), "upload parsed");

    let mut store = connect().await?;
    let inserted = store.replace_rows(schema, &rows, strategy).await?;
    info!(table = schema.table_name, inserted, ?strategy, "table replaced");
    Ok(inserted)
}

/// One upload for one survey. Every failure becomes a user-facing outcome.
pub async fn ingest<S, F, Fut>(
    kind: SurveyKind,
    upload: Upload,
    config: &StoreConfig,
    connect: F,
) -> IngestionOutcome
where
    S: SurveyStore,
    F: FnOnce() -> Fut,
    Fut: Future<Output = IngestResult<S>>,
{
    let schema = kind.schema();
    match load(upload, &schema, config.strategy, connect).await {
        Ok(inserted) => IngestionOutcome {
            success: true,
            message: SUCCESS_MESSAGE.to_string(),
            rows_loaded: inserted as usize,
            redirect_to: kind.status_page().to_string(),
        },
        Err(err) => {
            if err.before_mutation() {
                warn!(survey = kind.key(), error = %err, "upload rejected, table untouched");
            } else {
                error!(
                    survey = kind.key(),
                    error = %err,
                    strategy = ?config.strategy,
                    "upload failed after the table was modified"
                );
            }
            failure(kind, config, &err)
        }
    }
}

fn failure(kind: SurveyKind, config: &StoreConfig, err: &IngestError) -> IngestionOutcome {
    IngestionOutcome {
        success: false,
        message: format!("{FAILURE_PREFIX}: {err}"),
        rows_loaded: 0,
        redirect_to: kind.dashboard_url(&config.dashboard_base_url),
    }
}
