use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Column, Connection, Executor, PgConnection, Row, TypeInfo};
use tracing::{debug, info};

use crate::config::{ReplaceStrategy, StoreConfig};
use crate::error::{IngestError, IngestResult};
use crate::models::{CellValue, NormalizedRow, ReportTable};
use crate::surveys::SurveyTableSchema;

/// What the pipeline and the exporter need from the relational store.
pub trait SurveyStore {
    /// Makes `rows` the entire content of `schema.table_name`, in order.
    async fn replace_rows(
        &mut self,
        schema: &SurveyTableSchema,
        rows: &[NormalizedRow],
        strategy: ReplaceStrategy,
    ) -> IngestResult<u64>;

    /// Every row of `table`, with its column names.
    async fn fetch_table(&mut self, table: &str) -> IngestResult<ReportTable>;
}

/// A single Postgres connection, opened per operation and closed on drop.
pub struct PgSurveyStore {
    conn: PgConnection,
}

pub async fn connect(config: &StoreConfig) -> IngestResult<PgSurveyStore> {
    let options = config
        .connect_options()
        .map_err(|e| IngestError::Connection(sqlx::Error::Configuration(e.into())))?;
    let conn = PgConnection::connect_with(&options)
        .await
        .map_err(IngestError::Connection)?;
    info!(
        environment = ?config.environment,
        host = %config.display_host(),
        database = %config.database,
        "connected to store"
    );
    Ok(PgSurveyStore { conn })
}

impl SurveyStore for PgSurveyStore {
    async fn replace_rows(
        &mut self,
        schema: &SurveyTableSchema,
        rows: &[NormalizedRow],
        strategy: ReplaceStrategy,
    ) -> IngestResult<u64> {
        let table = schema.table_name;
        let insert = insert_statement(schema);
        let clear_err = |source: sqlx::Error| IngestError::Clear {
            table: table.to_string(),
            source,
        };

        match strategy {
            ReplaceStrategy::Atomic => {
                let mut tx = self.conn.begin().await.map_err(IngestError::Connection)?;
                sqlx::query(&lock_statement(table))
                    .execute(&mut *tx)
                    .await
                    .map_err(clear_err)?;
                sqlx::query(&truncate_statement(table))
                    .execute(&mut *tx)
                    .await
                    .map_err(clear_err)?;
                debug!(table, "table locked and truncated");

                let inserted = insert_all(&mut tx, &insert, rows).await?;
                tx.commit().await.map_err(IngestError::Commit)?;
                Ok(inserted)
            }
            ReplaceStrategy::TruncateFirst => {
                // Committed on its own: prior rows are gone even if an insert fails.
                sqlx::query(&truncate_statement(table))
                    .execute(&mut self.conn)
                    .await
                    .map_err(clear_err)?;
                debug!(table, "table truncated");

                let mut tx = self.conn.begin().await.map_err(IngestError::Connection)?;
                let inserted = insert_all(&mut tx, &insert, rows).await?;
                tx.commit().await.map_err(IngestError::Commit)?;
                Ok(inserted)
            }
        }
    }

    async fn fetch_table(&mut self, table: &str) -> IngestResult<ReportTable> {
        let probe = format!("SELECT * FROM {}", quote_ident(table));
        let described = (&mut self.conn)
            .describe(probe.as_str())
            .await
            .map_err(IngestError::Connection)?;

        let columns: Vec<(String, ColumnKind)> = described
            .columns()
            .iter()
            .map(|c| {
                (
                    c.name().to_string(),
                    ColumnKind::from_type_name(c.type_info().name()),
                )
            })
            .collect();

        let sql = select_statement(table, &columns);
        let rows = sqlx::query(&sql)
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| IngestError::Export(e.to_string()))?;

        let mut report = ReportTable {
            columns: columns.iter().map(|(name, _)| name.clone()).collect(),
            rows: Vec::with_capacity(rows.len()),
        };
        for row in &rows {
            let mut cells = Vec::with_capacity(columns.len());
            for (idx, (_, kind)) in columns.iter().enumerate() {
                cells.push(decode_cell(row, idx, *kind)?);
            }
            report.rows.push(cells);
        }

        info!(table, rows = report.rows.len(), "report table fetched");
        Ok(report)
    }
}

async fn insert_all(
    conn: &mut PgConnection,
    insert: &str,
    rows: &[NormalizedRow],
) -> IngestResult<u64> {
    let mut inserted = 0u64;
    for row in rows {
        let mut query = sqlx::query(insert);
        for cell in &row.cells {
            query = query.bind(cell.to_sql_text());
        }
        query
            .execute(&mut *conn)
            .await
            .map_err(|source| IngestError::Insert {
                row: row.line,
                source,
            })?;
        inserted += 1;
    }
    Ok(inserted)
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn insert_statement(schema: &SurveyTableSchema) -> String {
    let columns = schema
        .columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let markers = (1..=schema.width())
        .map(|n| format!("${n}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {} ({columns}) VALUES ({markers})",
        quote_ident(schema.table_name)
    )
}

/// Identity columns restart so the reloaded rows get fresh ids.
pub fn truncate_statement(table: &str) -> String {
    format!("TRUNCATE TABLE {} RESTART IDENTITY", quote_ident(table))
}

pub fn lock_statement(table: &str) -> String {
    format!("LOCK TABLE {} IN ACCESS EXCLUSIVE MODE", quote_ident(table))
}

/// How a column is read back for export. Types without a native mapping
/// are cast to text in the export query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Text,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Bool,
    Date,
    Timestamp,
    TimestampTz,
    CastToText,
}

impl ColumnKind {
    fn from_type_name(type_name: &str) -> Self {
        match type_name {
            "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" => ColumnKind::Text,
            "INT2" => ColumnKind::Int2,
            "INT4" => ColumnKind::Int4,
            "INT8" => ColumnKind::Int8,
            "FLOAT4" => ColumnKind::Float4,
            "FLOAT8" => ColumnKind::Float8,
            "BOOL" => ColumnKind::Bool,
            "DATE" => ColumnKind::Date,
            "TIMESTAMP" => ColumnKind::Timestamp,
            "TIMESTAMPTZ" => ColumnKind::TimestampTz,
            _ => ColumnKind::CastToText,
        }
    }
}

fn select_statement(table: &str, columns: &[(String, ColumnKind)]) -> String {
    if columns.is_empty() {
        return format!("SELECT * FROM {}", quote_ident(table));
    }
    let list = columns
        .iter()
        .map(|(name, kind)| {
            let ident = quote_ident(name);
            match kind {
                ColumnKind::CastToText => format!("{ident}::text AS {ident}"),
                _ => ident,
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT {list} FROM {}", quote_ident(table))
}

fn decode_cell(row: &PgRow, idx: usize, kind: ColumnKind) -> IngestResult<CellValue> {
    fn get<'r, T>(row: &'r PgRow, idx: usize) -> IngestResult<Option<T>>
    where
        T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    {
        row.try_get::<Option<T>, _>(idx)
            .map_err(|e| IngestError::Export(e.to_string()))
    }

    let cell = match kind {
        ColumnKind::Int2 => get::<i16>(row, idx)?.map(|v| CellValue::Int(v.into())),
        ColumnKind::Int4 => get::<i32>(row, idx)?.map(|v| CellValue::Int(v.into())),
        ColumnKind::Int8 => get::<i64>(row, idx)?.map(CellValue::Int),
        ColumnKind::Float4 => get::<f32>(row, idx)?.map(|v| CellValue::Float(v.into())),
        ColumnKind::Float8 => get::<f64>(row, idx)?.map(CellValue::Float),
        ColumnKind::Bool => get::<bool>(row, idx)?.map(CellValue::Bool),
        ColumnKind::Date => get::<NaiveDate>(row, idx)?
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(CellValue::DateTime),
        ColumnKind::Timestamp => get::<NaiveDateTime>(row, idx)?.map(CellValue::DateTime),
        ColumnKind::TimestampTz => {
            get::<DateTime<Utc>>(row, idx)?.map(|v| CellValue::DateTime(v.naive_utc()))
        }
        ColumnKind::Text | ColumnKind::CastToText => get::<String>(row, idx)?.map(CellValue::Text),
    };
    Ok(cell.unwrap_or(CellValue::Empty))
}
