use thiserror::Error;

/// Failures of the ingestion pipeline and the report exporter.
#[derive(Error, Debug)]
pub enum IngestError {
    /// The upload could not be opened or parsed as a spreadsheet.
    #[error("archivo no válido: {0}")]
    MalformedSpreadsheet(String),

    /// The store could not be reached.
    #[error("no se pudo conectar a la base de datos: {0}")]
    Connection(#[source] sqlx::Error),

    /// Row width does not match the schema; raised before the table is touched.
    #[error("la fila {row} tiene {found} columnas, se esperaban {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// Clearing the target table failed.
    #[error("no se pudo vaciar la tabla {table}: {source}")]
    Clear {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    /// An insert failed after the table was cleared.
    #[error("error insertando la fila {row}: {source}")]
    Insert {
        row: usize,
        #[source]
        source: sqlx::Error,
    },

    /// The final commit failed; nothing from this upload was kept.
    #[error("no se pudo confirmar la carga: {0}")]
    Commit(#[source] sqlx::Error),

    #[error("error exportando el informe: {0}")]
    Export(String),
}

impl IngestError {
    /// True when the store was never mutated by the failed operation.
    pub fn before_mutation(&self) -> bool {
        matches!(
            self,
            IngestError::MalformedSpreadsheet(_)
                | IngestError::Connection(_)
                | IngestError::RowWidth { .. }
        )
    }
}

impl From<calamine::Error> for IngestError {
    fn from(err: calamine::Error) -> Self {
        IngestError::MalformedSpreadsheet(err.to_string())
    }
}

impl From<csv::Error> for IngestError {
    fn from(err: csv::Error) -> Self {
        IngestError::MalformedSpreadsheet(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for IngestError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        IngestError::Export(err.to_string())
    }
}

pub type IngestResult<T> = Result<T, IngestError>;
