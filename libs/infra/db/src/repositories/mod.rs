// [libs/infra/db/src/repositories/mod.rs]
/*!
 * =================================================================
 * APARATO: REPOSITORY ACCESS MATRIX (V10.0 - SOBERANO)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: REGISTRO ÚNICO DE AUTORIDADES DE PERSISTENCIA
 *
 * # Logic:
 * Cada repositorio es la autoridad exclusiva de escritura sobre su
 * familia de tablas. Los helpers de mapeo comparten la disciplina
 * de marcas temporales RFC3339 y vectores JSON del Ledger.
 * =================================================================
 */

pub mod agent;
pub mod benchmark;
pub mod hashlist;
pub mod job;
pub mod preset;
pub mod resources;
pub mod sync;
pub mod task;

pub use agent::AgentRepository;
pub use benchmark::BenchmarkRepository;
pub use hashlist::{CrackIngestReport, HashlistRepository};
pub use job::{JobExecutionRepository, PreemptionVictim, ReleasedInterval};
pub use preset::PresetRepository;
pub use resources::{BinaryMeta, ResourceRepository, RuleMeta, StoredFileMeta, WordlistMeta};
pub use sync::SyncRepository;
pub use task::TaskRepository;

use crate::errors::DbError;
use chrono::{DateTime, Utc};
use libsql::{Row, Value};

/// Proyecta un entero opcional hacia el sistema de tipos del Ledger.
pub(crate) fn nullable_integer(value: Option<i64>) -> Value {
    match value {
        Some(magnitude) => Value::Integer(magnitude),
        None => Value::Null,
    }
}

/// Proyecta un texto opcional hacia el sistema de tipos del Ledger.
pub(crate) fn nullable_text(value: Option<String>) -> Value {
    match value {
        Some(text) => Value::Text(text),
        None => Value::Null,
    }
}

/// Extrae una columna DATETIME nullable como instante UTC.
pub(crate) fn parse_timestamp_column(data_row: &Row, index: i32) -> Option<DateTime<Utc>> {
    data_row
        .get::<Option<String>>(index)
        .ok()
        .flatten()
        .and_then(|raw_timestamp| {
            DateTime::parse_from_rfc3339(&raw_timestamp)
                .ok()
                .map(|parsed| parsed.with_timezone(&Utc))
        })
}

/// Extrae una columna DATETIME obligatoria como instante UTC.
pub(crate) fn parse_required_timestamp(data_row: &Row, index: i32) -> Result<DateTime<Utc>, DbError> {
    let raw_timestamp: String = data_row.get(index)?;
    DateTime::parse_from_rfc3339(&raw_timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|fault| {
            DbError::MappingError(format!("timestamp column {}: {}", index, fault))
        })
}

/// Decodifica un vector JSON de identificadores enteros.
pub(crate) fn parse_id_vector(raw_json: &str) -> Result<Vec<i64>, DbError> {
    serde_json::from_str(raw_json)
        .map_err(|fault| DbError::MappingError(format!("id vector payload: {}", fault)))
}

/// Decodifica una columna TEXT con un UUID obligatorio.
pub(crate) fn parse_uuid_column(data_row: &Row, index: i32) -> Result<uuid::Uuid, DbError> {
    let raw_identifier: String = data_row.get(index)?;
    uuid::Uuid::parse_str(&raw_identifier)
        .map_err(|fault| DbError::MappingError(format!("uuid column {}: {}", index, fault)))
}

/// Decodifica una columna TEXT con un UUID opcional.
pub(crate) fn parse_optional_uuid_column(data_row: &Row, index: i32) -> Option<uuid::Uuid> {
    data_row
        .get::<Option<String>>(index)
        .ok()
        .flatten()
        .and_then(|raw_identifier| uuid::Uuid::parse_str(&raw_identifier).ok())
}
