// [libs/infra/db/src/repositories/sync.rs]
/*!
 * =================================================================
 * APARATO: AGENT HASHLIST SYNC REPOSITORY (V9.0)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: ESTADO PERSISTIDO DE COPIAS DE HASHLIST POR AGENTE
 *
 * # Logic:
 * La fila (agente, hashlist) es la fuente de verdad de la puerta de
 * sincronización: el reconciliador jamás despacha una tarea sobre
 * una lista cuya fila no esté 'in_sync'.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::parse_timestamp_column;
use crate::LedgerClient;
use chrono::{DateTime, Utc};
use kraken_domain_models::{AgentHashlistSync, SyncStatus};
use libsql::{params, Row};
use tracing::{instrument, warn};

const SYNC_COLUMNS: &str =
    "agent_id, hashlist_id, version_hash, status, retry_count, last_synced_at";

/// Autoridad única del Ledger de sincronización de archivos.
pub struct SyncRepository {
    database_client: LedgerClient,
}

impl SyncRepository {
    pub fn new(client: LedgerClient) -> Self {
        Self {
            database_client: client,
        }
    }

    pub async fn fetch_sync(
        &self,
        agent_identifier: i64,
        hashlist_identifier: i64,
    ) -> Result<Option<AgentHashlistSync>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let sql_query = format!(
            "SELECT {} FROM agent_hashlist_sync WHERE agent_id = ?1 AND hashlist_id = ?2",
            SYNC_COLUMNS
        );
        let mut query_results = database_connection
            .query(&sql_query, params![agent_identifier, hashlist_identifier])
            .await?;
        match query_results.next().await? {
            Some(data_row) => Ok(Some(map_row_to_sync(&data_row)?)),
            None => Ok(None),
        }
    }

    /// Marca la fila como 'syncing' al emitir la orden de descarga.
    #[instrument(skip(self))]
    pub async fn mark_syncing(
        &self,
        agent_identifier: i64,
        hashlist_identifier: i64,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        database_connection
            .execute(
                "INSERT INTO agent_hashlist_sync (agent_id, hashlist_id, status)
                 VALUES (?1, ?2, 'syncing')
                 ON CONFLICT(agent_id, hashlist_id)
                 DO UPDATE SET status = 'syncing'",
                params![agent_identifier, hashlist_identifier],
            )
            .await?;
        Ok(())
    }

    /// Sella la fila como 'in_sync' tras el acuse del agente.
    pub async fn mark_in_sync(
        &self,
        agent_identifier: i64,
        hashlist_identifier: i64,
        version_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        database_connection
            .execute(
                "INSERT INTO agent_hashlist_sync
                 (agent_id, hashlist_id, version_hash, status, retry_count, last_synced_at)
                 VALUES (?1, ?2, ?3, 'in_sync', 0, ?4)
                 ON CONFLICT(agent_id, hashlist_id)
                 DO UPDATE SET version_hash = ?3,
                               status = 'in_sync',
                               retry_count = 0,
                               last_synced_at = ?4",
                params![
                    agent_identifier,
                    hashlist_identifier,
                    version_hash,
                    now.to_rfc3339()
                ],
            )
            .await?;
        Ok(())
    }

    /// Invalida la copia del agente (la lista mutó en el servidor).
    pub async fn mark_stale(
        &self,
        agent_identifier: i64,
        hashlist_identifier: i64,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        database_connection
            .execute(
                "UPDATE agent_hashlist_sync SET status = 'stale'
                 WHERE agent_id = ?1 AND hashlist_id = ?2",
                params![agent_identifier, hashlist_identifier],
            )
            .await?;
        Ok(())
    }

    /**
     * Acumula un fallo de sincronización y devuelve el contador
     * resultante. Al exceder el presupuesto, la fila queda 'failed' y
     * el agente excluido de esa lista hasta acción del operador.
     */
    pub async fn record_sync_failure(
        &self,
        agent_identifier: i64,
        hashlist_identifier: i64,
        max_retries: i64,
    ) -> Result<i64, DbError> {
        let database_connection = self.database_client.get_connection()?;
        database_connection
            .execute(
                "INSERT INTO agent_hashlist_sync (agent_id, hashlist_id, status, retry_count)
                 VALUES (?1, ?2, 'stale', 1)
                 ON CONFLICT(agent_id, hashlist_id)
                 DO UPDATE SET retry_count = retry_count + 1",
                params![agent_identifier, hashlist_identifier],
            )
            .await?;

        let mut query_results = database_connection
            .query(
                "SELECT retry_count FROM agent_hashlist_sync
                 WHERE agent_id = ?1 AND hashlist_id = ?2",
                params![agent_identifier, hashlist_identifier],
            )
            .await?;
        let data_row = query_results.next().await?.ok_or(DbError::InvalidState)?;
        let retry_count = data_row.get::<i64>(0)?;

        if retry_count >= max_retries {
            database_connection
                .execute(
                    "UPDATE agent_hashlist_sync SET status = 'failed'
                     WHERE agent_id = ?1 AND hashlist_id = ?2",
                    params![agent_identifier, hashlist_identifier],
                )
                .await?;
            warn!(
                "🛑 [SYNC_EXCLUDED]: Agent {} exhausted sync budget for hashlist {}.",
                agent_identifier, hashlist_identifier
            );
        }
        Ok(retry_count)
    }

    /// Listas que el agente no puede sincronizar (presupuesto agotado).
    pub async fn failed_hashlists_for_agent(
        &self,
        agent_identifier: i64,
    ) -> Result<Vec<i64>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(
                "SELECT hashlist_id FROM agent_hashlist_sync
                 WHERE agent_id = ?1 AND status = 'failed'",
                params![agent_identifier],
            )
            .await?;
        let mut failed_collection = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            failed_collection.push(data_row.get::<i64>(0)?);
        }
        Ok(failed_collection)
    }

    /// Purga las filas de un agente eliminado de la flota.
    pub async fn purge_for_agent(&self, agent_identifier: i64) -> Result<u64, DbError> {
        let database_connection = self.database_client.get_connection()?;
        Ok(database_connection
            .execute(
                "DELETE FROM agent_hashlist_sync WHERE agent_id = ?1",
                params![agent_identifier],
            )
            .await?)
    }
}

fn map_row_to_sync(data_row: &Row) -> Result<AgentHashlistSync, DbError> {
    let status_label: String = data_row.get(3)?;
    Ok(AgentHashlistSync {
        agent_id: data_row.get::<i64>(0)?,
        hashlist_id: data_row.get::<i64>(1)?,
        version_hash: data_row.get(2)?,
        status: SyncStatus::from_label(&status_label)
            .ok_or_else(|| DbError::MappingError(format!("sync status '{}'", status_label)))?,
        retry_count: data_row.get::<i64>(4)?,
        last_synced_at: parse_timestamp_column(data_row, 5),
    })
}
