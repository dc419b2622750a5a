// [libs/infra/db/src/repositories/preset.rs]
//! =================================================================
//! APARATO: PRESET JOB REPOSITORY (V6.0)
//! CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
//! RESPONSABILIDAD: PERSISTENCIA DE PLANTILLAS INMUTABLES DE ATAQUE
//! =================================================================

use crate::errors::DbError;
use crate::repositories::{
    nullable_integer, nullable_text, parse_id_vector, parse_required_timestamp, parse_uuid_column,
};
use crate::LedgerClient;
use kraken_domain_models::{AttackMode, PresetJob};
use libsql::{params, Row};
use tracing::instrument;
use uuid::Uuid;

const PRESET_COLUMNS: &str = "id, name, attack_mode, priority, binary_version_id, wordlist_ids, \
     rule_ids, mask, chunk_duration_seconds, allow_high_priority_override, max_agents, keyspace, \
     created_at";

/// Autoridad única de persistencia de plantillas de ataque.
pub struct PresetRepository {
    database_client: LedgerClient,
}

impl PresetRepository {
    pub fn new(client: LedgerClient) -> Self {
        Self {
            database_client: client,
        }
    }

    #[instrument(skip(self, preset))]
    pub async fn insert_preset(&self, preset: &PresetJob) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        database_connection
            .execute(
                "INSERT INTO preset_jobs
                 (id, name, attack_mode, priority, binary_version_id, wordlist_ids, rule_ids,
                  mask, chunk_duration_seconds, allow_high_priority_override, max_agents,
                  keyspace, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    preset.id.to_string(),
                    preset.name.clone(),
                    preset.attack_mode.as_label(),
                    preset.priority,
                    preset.binary_version_id,
                    serde_json::to_string(&preset.wordlist_ids)
                        .map_err(|e| DbError::MappingError(e.to_string()))?,
                    serde_json::to_string(&preset.rule_ids)
                        .map_err(|e| DbError::MappingError(e.to_string()))?,
                    nullable_text(preset.mask.clone()),
                    preset.chunk_duration_seconds,
                    preset.allow_high_priority_override as i64,
                    preset.max_agents,
                    nullable_integer(preset.keyspace),
                    preset.created_at.to_rfc3339()
                ],
            )
            .await?;
        Ok(())
    }

    pub async fn fetch_preset(&self, preset_identifier: &Uuid) -> Result<PresetJob, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let sql_query = format!("SELECT {} FROM preset_jobs WHERE id = ?1", PRESET_COLUMNS);
        let mut query_results = database_connection
            .query(&sql_query, params![preset_identifier.to_string()])
            .await?;
        let data_row = query_results.next().await?.ok_or(DbError::JobNotFound)?;
        map_row_to_preset(&data_row)
    }
}

fn map_row_to_preset(data_row: &Row) -> Result<PresetJob, DbError> {
    let attack_mode_label: String = data_row.get(2)?;
    let wordlist_ids_json: String = data_row.get(5)?;
    let rule_ids_json: String = data_row.get(6)?;

    Ok(PresetJob {
        id: parse_uuid_column(data_row, 0)?,
        name: data_row.get(1)?,
        attack_mode: AttackMode::from_label(&attack_mode_label)
            .ok_or_else(|| DbError::MappingError(format!("attack mode '{}'", attack_mode_label)))?,
        priority: data_row.get::<i64>(3)?,
        binary_version_id: data_row.get::<i64>(4)?,
        wordlist_ids: parse_id_vector(&wordlist_ids_json)?,
        rule_ids: parse_id_vector(&rule_ids_json)?,
        mask: data_row.get::<Option<String>>(7)?,
        chunk_duration_seconds: data_row.get::<i64>(8)?,
        allow_high_priority_override: data_row.get::<i64>(9)? != 0,
        max_agents: data_row.get::<i64>(10)?,
        keyspace: data_row.get::<Option<i64>>(11)?,
        created_at: parse_required_timestamp(data_row, 12)?,
    })
}
