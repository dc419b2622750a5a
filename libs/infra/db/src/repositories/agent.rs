// [libs/infra/db/src/repositories/agent.rs]
/*!
 * =================================================================
 * APARATO: AGENT FLEET REPOSITORY (V14.0 - GOLD MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: REGISTRO PERSISTIDO DE NODOS Y SUS CREDENCIALES
 *
 * # Logic:
 * El repositorio custodia la identidad de la flota: credenciales del
 * handshake, dispositivos declarados, horario autorizado y el pulso
 * vital (last_heartbeat) que gobierna la detección de desconexión.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::{nullable_text, parse_optional_uuid_column, parse_timestamp_column};
use crate::LedgerClient;
use chrono::{DateTime, Utc};
use kraken_domain_models::{Agent, AgentStatus, DeviceProfile, WeeklyWindow};
use libsql::{params, Row};
use tracing::{info, instrument, warn};

const AGENT_COLUMNS: &str = "id, name, status, owner_id, devices_json, schedule_json, \
     last_heartbeat, consecutive_failures";

/// Autoridad única de persistencia de la flota de agentes.
pub struct AgentRepository {
    database_client: LedgerClient,
}

impl AgentRepository {
    pub fn new(client: LedgerClient) -> Self {
        Self {
            database_client: client,
        }
    }

    /// Registra un agente aprovisionado (la inscripción vive fuera del núcleo).
    #[instrument(skip(self, agent, api_key))]
    pub async fn insert_agent(&self, agent: &Agent, api_key: &str) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        database_connection
            .execute(
                "INSERT INTO agents
                 (id, name, status, owner_id, api_key, devices_json, schedule_json,
                  last_heartbeat, consecutive_failures)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    agent.id,
                    agent.name.clone(),
                    agent.status.as_label(),
                    nullable_text(agent.owner_id.map(|identifier| identifier.to_string())),
                    api_key,
                    serde_json::to_string(&agent.devices)
                        .map_err(|e| DbError::MappingError(e.to_string()))?,
                    serde_json::to_string(&agent.schedule)
                        .map_err(|e| DbError::MappingError(e.to_string()))?,
                    nullable_text(agent.last_heartbeat.map(|timestamp| timestamp.to_rfc3339())),
                    agent.consecutive_failures
                ],
            )
            .await?;
        Ok(())
    }

    pub async fn fetch_agent(&self, agent_identifier: i64) -> Result<Agent, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let sql_query = format!("SELECT {} FROM agents WHERE id = ?1", AGENT_COLUMNS);
        let mut query_results = database_connection
            .query(&sql_query, params![agent_identifier])
            .await?;
        let data_row = query_results.next().await?.ok_or(DbError::AgentNotFound)?;
        map_row_to_agent(&data_row)
    }

    /**
     * Verifica la credencial presentada en el handshake 'hello'.
     *
     * # Errors:
     * - `AgentNotFound`: identificador no registrado.
     * - `CredentialsRejected`: la llave no coincide con la bóveda.
     */
    pub async fn verify_credentials(
        &self,
        agent_identifier: i64,
        presented_api_key: &str,
    ) -> Result<Agent, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(
                "SELECT api_key FROM agents WHERE id = ?1",
                params![agent_identifier],
            )
            .await?;
        let data_row = query_results.next().await?.ok_or(DbError::AgentNotFound)?;
        let stored_api_key: String = data_row.get(0)?;

        if stored_api_key != presented_api_key {
            warn!(
                "🛡️ [AUTH_VETO]: Agent {} presented an invalid credential.",
                agent_identifier
            );
            return Err(DbError::CredentialsRejected);
        }
        self.fetch_agent(agent_identifier).await
    }

    pub async fn set_status(
        &self,
        agent_identifier: i64,
        status: AgentStatus,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        let rows_affected = database_connection
            .execute(
                "UPDATE agents SET status = ?2 WHERE id = ?1",
                params![agent_identifier, status.as_label()],
            )
            .await?;
        if rows_affected == 0 {
            return Err(DbError::AgentNotFound);
        }
        info!(
            "🔄 [FLEET]: Agent {} transitioned to '{}'.",
            agent_identifier,
            status.as_label()
        );
        Ok(())
    }

    /// Registra el pulso vital de un agente.
    pub async fn record_heartbeat(
        &self,
        agent_identifier: i64,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        database_connection
            .execute(
                "UPDATE agents SET last_heartbeat = ?2 WHERE id = ?1",
                params![agent_identifier, now.to_rfc3339()],
            )
            .await?;
        Ok(())
    }

    /// Actualiza el inventario de dispositivos declarado por el agente.
    pub async fn update_devices(
        &self,
        agent_identifier: i64,
        devices: &[DeviceProfile],
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        database_connection
            .execute(
                "UPDATE agents SET devices_json = ?2 WHERE id = ?1",
                params![
                    agent_identifier,
                    serde_json::to_string(devices)
                        .map_err(|e| DbError::MappingError(e.to_string()))?
                ],
            )
            .await?;
        Ok(())
    }

    /// Acumula un fallo consecutivo del agente.
    pub async fn record_failure(&self, agent_identifier: i64) -> Result<i64, DbError> {
        let database_connection = self.database_client.get_connection()?;
        database_connection
            .execute(
                "UPDATE agents SET consecutive_failures = consecutive_failures + 1 WHERE id = ?1",
                params![agent_identifier],
            )
            .await?;
        let mut query_results = database_connection
            .query(
                "SELECT consecutive_failures FROM agents WHERE id = ?1",
                params![agent_identifier],
            )
            .await?;
        let data_row = query_results.next().await?.ok_or(DbError::AgentNotFound)?;
        Ok(data_row.get::<i64>(0)?)
    }

    pub async fn reset_failures(&self, agent_identifier: i64) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        database_connection
            .execute(
                "UPDATE agents SET consecutive_failures = 0 WHERE id = ?1",
                params![agent_identifier],
            )
            .await?;
        Ok(())
    }

    /// Agentes activos cuyo pulso expiró antes del umbral dado.
    pub async fn stale_heartbeat_agents(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<i64>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(
                "SELECT id FROM agents
                 WHERE status = 'active'
                   AND last_heartbeat IS NOT NULL
                   AND last_heartbeat < ?1",
                params![cutoff.to_rfc3339()],
            )
            .await?;
        let mut stale_identifiers = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            stale_identifiers.push(data_row.get::<i64>(0)?);
        }
        Ok(stale_identifiers)
    }
}

fn map_row_to_agent(data_row: &Row) -> Result<Agent, DbError> {
    let status_label: String = data_row.get(2)?;
    let devices_json: String = data_row.get(4)?;
    let schedule_json: String = data_row.get(5)?;

    let devices: Vec<DeviceProfile> = serde_json::from_str(&devices_json)
        .map_err(|fault| DbError::MappingError(format!("devices payload: {}", fault)))?;
    let schedule: Vec<WeeklyWindow> = serde_json::from_str(&schedule_json)
        .map_err(|fault| DbError::MappingError(format!("schedule payload: {}", fault)))?;

    Ok(Agent {
        id: data_row.get::<i64>(0)?,
        name: data_row.get(1)?,
        status: AgentStatus::from_label(&status_label)
            .ok_or_else(|| DbError::MappingError(format!("agent status '{}'", status_label)))?,
        owner_id: parse_optional_uuid_column(data_row, 3),
        devices,
        schedule,
        last_heartbeat: parse_timestamp_column(data_row, 6),
        consecutive_failures: data_row.get::<i64>(7)?,
    })
}
