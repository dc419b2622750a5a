// [libs/infra/db/src/repositories/job.rs]
/*!
 * =================================================================
 * APARATO: JOB EXECUTION OMNISCIENT REPOSITORY (V31.0 - GOLD MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: ESTADOS, FRONTERAS DE DESPACHO Y PROGRESO AGREGADO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ATOMIC FRONTIER: El avance de keyspace es un único UPDATE
 *    condicional por fila de trabajo. Dos decisiones concurrentes
 *    jamás pueden solapar intervalos.
 * 2. HOLE LEDGER: Los intervalos liberados por desconexión quedan
 *    registrados y se re-emiten antes de avanzar la frontera.
 * 3. NOMINAL PURITY: Nomenclatura nominal absoluta, sin abreviaciones.
 *
 * # Mathematical Proof (State Machine Determinism):
 * Cada transición usa predicados de estado excluyentes en la
 * cláusula WHERE. Una ejecución 'completed' nunca vuelve a recibir
 * avances de frontera ni volúmenes procesados.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::{
    nullable_integer, nullable_text, parse_id_vector, parse_optional_uuid_column,
    parse_required_timestamp, parse_timestamp_column, parse_uuid_column,
};
use crate::LedgerClient;
use chrono::{DateTime, Utc};
use kraken_domain_models::{AttackMode, Hashlist, JobExecution, JobExecutionStatus, PresetJob};
use kraken_domain_scheduling::KeyspaceVerdict;
use libsql::{params, Row};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Proyección canónica de columnas de una ejecución.
const JOB_COLUMNS: &str = "id, preset_job_id, hashlist_id, name, status, priority, max_agents, \
     attack_mode, base_keyspace, multiplication_factor, effective_keyspace, uses_rule_splitting, \
     rule_split_count, dispatched_keyspace, processed_keyspace, next_base_offset, next_rule_offset, \
     overall_progress_percent, allow_high_priority_override, wordlist_ids, rule_ids, mask, \
     binary_version_id, chunk_duration_seconds, interrupted_by, error_message, created_at, \
     started_at, completed_at, updated_at";

/// Intervalo liberado pendiente de re-emisión (hueco de keyspace).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleasedInterval {
    pub keyspace_start: i64,
    pub keyspace_end: i64,
    pub rule_start_index: Option<i64>,
    pub rule_end_index: Option<i64>,
    pub effective_size: i64,
}

/// Tarea en ejecución seleccionada como víctima de preempción.
#[derive(Debug, Clone)]
pub struct PreemptionVictim {
    pub task_id: Uuid,
    pub job_execution_id: Uuid,
    pub agent_id: i64,
    pub job_priority: i64,
}

/// Autoridad única de persistencia del ciclo de vida de ejecuciones.
pub struct JobExecutionRepository {
    database_client: LedgerClient,
}

impl JobExecutionRepository {
    pub fn new(client: LedgerClient) -> Self {
        Self {
            database_client: client,
        }
    }

    // --- ESTRATO DE GÉNESIS ---

    /**
     * Materializa una ejecución concreta desde una plantilla.
     *
     * Si el veredicto de keyspace no está disponible (reglas dinámicas),
     * la ejecución nace 'pending' sin cifras y ninguna tarea despacha
     * hasta que el cálculo asíncrono las complete.
     */
    #[instrument(skip(self, preset, hashlist, keyspace_verdict))]
    pub async fn create_from_preset(
        &self,
        preset: &PresetJob,
        hashlist: &Hashlist,
        execution_name: &str,
        keyspace_verdict: Option<&KeyspaceVerdict>,
        now: DateTime<Utc>,
    ) -> Result<JobExecution, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let execution_identifier = Uuid::new_v4();

        let (base, factor, effective, uses_split) = match keyspace_verdict {
            Some(verdict) => (
                Some(verdict.base_keyspace),
                Some(verdict.multiplication_factor),
                Some(verdict.effective_keyspace),
                verdict.uses_rule_splitting,
            ),
            None => (None, None, None, false),
        };

        let rule_split_count = if uses_split {
            factor.unwrap_or(0)
        } else {
            0
        };

        let sql_statement = format!(
            "INSERT INTO job_executions ({}) VALUES \
             (?1, ?2, ?3, ?4, 'pending', ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 0, 0, 0, 0, 0.0, \
              ?13, ?14, ?15, ?16, ?17, ?18, NULL, NULL, ?19, NULL, NULL, ?19)",
            JOB_COLUMNS
        );

        database_connection
            .execute(
                &sql_statement,
                params![
                    execution_identifier.to_string(),
                    preset.id.to_string(),
                    hashlist.id,
                    execution_name,
                    preset.priority,
                    preset.max_agents,
                    preset.attack_mode.as_label(),
                    nullable_integer(base),
                    nullable_integer(factor),
                    nullable_integer(effective),
                    uses_split as i64,
                    rule_split_count,
                    preset.allow_high_priority_override as i64,
                    serde_json::to_string(&preset.wordlist_ids)
                        .map_err(|e| DbError::MappingError(e.to_string()))?,
                    serde_json::to_string(&preset.rule_ids)
                        .map_err(|e| DbError::MappingError(e.to_string()))?,
                    nullable_text(preset.mask.clone()),
                    preset.binary_version_id,
                    preset.chunk_duration_seconds,
                    now.to_rfc3339()
                ],
            )
            .await?;

        info!(
            "🧬 [JOB_GENESIS]: Execution {} materialized from preset {}.",
            execution_identifier, preset.id
        );

        self.fetch_job(&execution_identifier).await
    }

    /**
     * Completa las cifras de keyspace de una ejecución pendiente
     * (cierre del cálculo asíncrono de reglas dinámicas).
     */
    #[instrument(skip(self, keyspace_verdict))]
    pub async fn set_keyspace_figures(
        &self,
        job_identifier: &Uuid,
        keyspace_verdict: &KeyspaceVerdict,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        let rule_split_count = if keyspace_verdict.uses_rule_splitting {
            keyspace_verdict.multiplication_factor
        } else {
            0
        };

        let rows_affected = database_connection
            .execute(
                "UPDATE job_executions
                 SET base_keyspace = ?2,
                     multiplication_factor = ?3,
                     effective_keyspace = ?4,
                     uses_rule_splitting = ?5,
                     rule_split_count = ?6,
                     updated_at = ?7
                 WHERE id = ?1 AND status = 'pending' AND effective_keyspace IS NULL",
                params![
                    job_identifier.to_string(),
                    keyspace_verdict.base_keyspace,
                    keyspace_verdict.multiplication_factor,
                    keyspace_verdict.effective_keyspace,
                    keyspace_verdict.uses_rule_splitting as i64,
                    rule_split_count,
                    now.to_rfc3339()
                ],
            )
            .await?;

        if rows_affected == 0 {
            return Err(DbError::InvalidState);
        }
        Ok(())
    }

    // --- ESTRATO DE LECTURA ---

    pub async fn fetch_job(&self, job_identifier: &Uuid) -> Result<JobExecution, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let sql_query = format!("SELECT {} FROM job_executions WHERE id = ?1", JOB_COLUMNS);

        let mut query_results = database_connection
            .query(&sql_query, params![job_identifier.to_string()])
            .await?;

        let data_row = query_results.next().await?.ok_or(DbError::JobNotFound)?;
        map_row_to_job_execution(&data_row)
    }

    /**
     * Devuelve las ejecuciones activas en orden estricto de despacho:
     * override primero, prioridad descendente, antigüedad ascendente.
     * Las listas excluidas (agente incapaz de sincronizarlas) se
     * filtran antes de devolver el lote.
     */
    pub async fn pick_next_ready(
        &self,
        excluding_hashlists: &[i64],
        limit_count: i64,
    ) -> Result<Vec<JobExecution>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let sql_query = format!(
            "SELECT {} FROM job_executions
             WHERE (status IN ('pending', 'running')
                    OR (status = 'paused' AND interrupted_by IS NOT NULL))
               AND effective_keyspace IS NOT NULL
             ORDER BY allow_high_priority_override DESC, priority DESC, created_at ASC
             LIMIT ?1",
            JOB_COLUMNS
        );

        let mut query_results = database_connection
            .query(&sql_query, params![limit_count + excluding_hashlists.len() as i64])
            .await?;

        let mut ready_queue = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            let execution = map_row_to_job_execution(&data_row)?;
            if excluding_hashlists.contains(&execution.hashlist_id) {
                continue;
            }
            ready_queue.push(execution);
            if ready_queue.len() as i64 >= limit_count {
                break;
            }
        }
        Ok(ready_queue)
    }

    /// Ejecuciones pendientes cuyo keyspace sigue sin calcular.
    pub async fn jobs_awaiting_keyspace(&self) -> Result<Vec<JobExecution>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let sql_query = format!(
            "SELECT {} FROM job_executions
             WHERE status = 'pending' AND effective_keyspace IS NULL",
            JOB_COLUMNS
        );

        let mut query_results = database_connection.query(&sql_query, ()).await?;
        let mut pending_collection = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            pending_collection.push(map_row_to_job_execution(&data_row)?);
        }
        Ok(pending_collection)
    }

    /// Ejecuciones activas sobre una hashlist concreta.
    pub async fn active_jobs_on_hashlist(
        &self,
        hashlist_identifier: i64,
    ) -> Result<Vec<JobExecution>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let sql_query = format!(
            "SELECT {} FROM job_executions
             WHERE hashlist_id = ?1 AND status IN ('pending', 'running', 'paused')",
            JOB_COLUMNS
        );

        let mut query_results = database_connection
            .query(&sql_query, params![hashlist_identifier])
            .await?;

        let mut active_collection = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            active_collection.push(map_row_to_job_execution(&data_row)?);
        }
        Ok(active_collection)
    }

    /// Agentes distintos con tareas vivas de esta ejecución.
    pub async fn count_active_agents(&self, job_identifier: &Uuid) -> Result<i64, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(
                "SELECT COUNT(DISTINCT agent_id) FROM job_tasks
                 WHERE job_execution_id = ?1
                   AND agent_id IS NOT NULL
                   AND status IN ('assigned', 'running', 'reconnect_pending')",
                params![job_identifier.to_string()],
            )
            .await?;

        let data_row = query_results.next().await?.ok_or(DbError::JobNotFound)?;
        Ok(data_row.get::<i64>(0)?)
    }

    // --- ESTRATO DE FRONTERA DE DESPACHO ---

    /**
     * Avanza atómicamente la frontera de despacho de un trabajo.
     *
     * # Errors:
     * - `DispatchOverflow`: el delta excedería el keyspace efectivo.
     * - `InvalidState`: la ejecución no está en un estado despachable.
     */
    #[instrument(skip(self))]
    pub async fn advance_dispatch(
        &self,
        job_identifier: &Uuid,
        effective_delta: i64,
        base_offset_advance: i64,
        rule_offset_advance: i64,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;

        let rows_affected = database_connection
            .execute(
                "UPDATE job_executions
                 SET dispatched_keyspace = dispatched_keyspace + ?2,
                     next_base_offset = next_base_offset + ?3,
                     next_rule_offset = next_rule_offset + ?4,
                     status = CASE WHEN status IN ('pending', 'paused') THEN 'running' ELSE status END,
                     interrupted_by = NULL,
                     started_at = COALESCE(started_at, ?5),
                     updated_at = ?5
                 WHERE id = ?1
                   AND status IN ('pending', 'running', 'paused')
                   AND effective_keyspace IS NOT NULL
                   AND dispatched_keyspace + ?2 <= effective_keyspace",
                params![
                    job_identifier.to_string(),
                    effective_delta,
                    base_offset_advance,
                    rule_offset_advance,
                    now.to_rfc3339()
                ],
            )
            .await?;

        if rows_affected == 0 {
            return self.diagnose_advance_failure(job_identifier, effective_delta).await;
        }

        debug!(
            "📐 [FRONTIER]: Job {} advanced by {} effective units.",
            job_identifier, effective_delta
        );
        Ok(())
    }

    /**
     * Libera el intervalo de una tarea perdida: registra el hueco y
     * descuenta su volumen efectivo de la contabilidad de despacho.
     */
    #[instrument(skip(self, interval))]
    pub async fn release_dispatch(
        &self,
        job_identifier: &Uuid,
        interval: &ReleasedInterval,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        let database_transaction = database_connection.transaction().await?;

        database_transaction
            .execute(
                "INSERT INTO job_keyspace_holes
                 (id, job_execution_id, keyspace_start, keyspace_end,
                  rule_start_index, rule_end_index, released_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    Uuid::new_v4().to_string(),
                    job_identifier.to_string(),
                    interval.keyspace_start,
                    interval.keyspace_end,
                    nullable_integer(interval.rule_start_index),
                    nullable_integer(interval.rule_end_index),
                    now.to_rfc3339()
                ],
            )
            .await?;

        let rows_affected = database_transaction
            .execute(
                "UPDATE job_executions
                 SET dispatched_keyspace = dispatched_keyspace - ?2,
                     updated_at = ?3
                 WHERE id = ?1 AND dispatched_keyspace >= ?2",
                params![
                    job_identifier.to_string(),
                    interval.effective_size,
                    now.to_rfc3339()
                ],
            )
            .await?;

        if rows_affected == 0 {
            return Err(DbError::InvalidState);
        }

        database_transaction.commit().await?;
        warn!(
            "🕳️ [HOLE_RELEASED]: Job {} reclaimed {} effective units for re-issue.",
            job_identifier, interval.effective_size
        );
        Ok(())
    }

    /**
     * Reclama el primer hueco pendiente del trabajo, restituyendo su
     * volumen a la contabilidad de despacho. Los huecos se agotan
     * antes de avanzar la frontera.
     */
    pub async fn claim_released_interval(
        &self,
        job_identifier: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<ReleasedInterval>, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut hole_results = database_connection
            .query(
                "SELECT id, keyspace_start, keyspace_end, rule_start_index, rule_end_index
                 FROM job_keyspace_holes
                 WHERE job_execution_id = ?1
                 ORDER BY released_at ASC, keyspace_start ASC
                 LIMIT 1",
                params![job_identifier.to_string()],
            )
            .await?;

        let hole_row = match hole_results.next().await? {
            Some(data_row) => data_row,
            None => return Ok(None),
        };

        let hole_identifier: String = hole_row.get(0)?;
        let keyspace_start: i64 = hole_row.get(1)?;
        let keyspace_end: i64 = hole_row.get(2)?;
        let rule_start_index = hole_row.get::<Option<i64>>(3)?;
        let rule_end_index = hole_row.get::<Option<i64>>(4)?;

        let mut figure_results = database_connection
            .query(
                "SELECT base_keyspace, multiplication_factor FROM job_executions WHERE id = ?1",
                params![job_identifier.to_string()],
            )
            .await?;
        let figure_row = figure_results.next().await?.ok_or(DbError::JobNotFound)?;
        let base_keyspace = figure_row.get::<Option<i64>>(0)?.unwrap_or(0);
        let multiplication_factor = figure_row.get::<Option<i64>>(1)?.unwrap_or(1);

        let effective_size = match (rule_start_index, rule_end_index) {
            (Some(rule_start), Some(rule_end)) => {
                base_keyspace.saturating_mul(rule_end - rule_start + 1)
            }
            _ => (keyspace_end - keyspace_start).saturating_mul(multiplication_factor),
        };

        let database_transaction = database_connection.transaction().await?;

        database_transaction
            .execute(
                "DELETE FROM job_keyspace_holes WHERE id = ?1",
                params![hole_identifier],
            )
            .await?;

        let rows_affected = database_transaction
            .execute(
                "UPDATE job_executions
                 SET dispatched_keyspace = dispatched_keyspace + ?2,
                     status = CASE WHEN status IN ('pending', 'paused') THEN 'running' ELSE status END,
                     interrupted_by = NULL,
                     updated_at = ?3
                 WHERE id = ?1
                   AND status IN ('pending', 'running', 'paused')
                   AND dispatched_keyspace + ?2 <= effective_keyspace",
                params![
                    job_identifier.to_string(),
                    effective_size,
                    now.to_rfc3339()
                ],
            )
            .await?;

        if rows_affected == 0 {
            return Err(DbError::InvalidState);
        }

        database_transaction.commit().await?;

        Ok(Some(ReleasedInterval {
            keyspace_start,
            keyspace_end,
            rule_start_index,
            rule_end_index,
            effective_size,
        }))
    }

    // --- ESTRATO DE PROGRESO Y CIERRE ---

    /// Acredita volumen efectivo certificado como procesado.
    pub async fn add_processed_volume(
        &self,
        job_identifier: &Uuid,
        effective_delta: i64,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        database_connection
            .execute(
                "UPDATE job_executions
                 SET processed_keyspace = processed_keyspace + ?2, updated_at = ?3
                 WHERE id = ?1",
                params![job_identifier.to_string(), effective_delta, now.to_rfc3339()],
            )
            .await?;
        Ok(())
    }

    /**
     * Recalcula el porcentaje global de avance de la ejecución:
     * (procesado + Σ en-vuelo × progreso) / efectivo.
     */
    pub async fn recompute_overall_progress(
        &self,
        job_identifier: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<f64, DbError> {
        let execution = self.fetch_job(job_identifier).await?;
        let effective_keyspace = match execution.effective_keyspace {
            Some(effective) if effective > 0 => effective as f64,
            _ => return Ok(0.0),
        };

        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(
                "SELECT keyspace_start, keyspace_end, rule_start_index, rule_end_index,
                        progress_percent
                 FROM job_tasks
                 WHERE job_execution_id = ?1 AND status IN ('assigned', 'running', 'reconnect_pending')",
                params![job_identifier.to_string()],
            )
            .await?;

        let base_keyspace = execution.base_keyspace.unwrap_or(0);
        let multiplication_factor = execution.multiplication_factor.unwrap_or(1);

        let mut in_flight_weighted_volume = 0.0_f64;
        while let Some(data_row) = query_results.next().await? {
            let keyspace_start: i64 = data_row.get(0)?;
            let keyspace_end: i64 = data_row.get(1)?;
            let rule_start_index = data_row.get::<Option<i64>>(2)?;
            let rule_end_index = data_row.get::<Option<i64>>(3)?;
            let task_progress_percent: f64 = data_row.get(4)?;

            let task_effective_size = match (rule_start_index, rule_end_index) {
                (Some(rule_start), Some(rule_end)) => {
                    base_keyspace.saturating_mul(rule_end - rule_start + 1)
                }
                _ => (keyspace_end - keyspace_start).saturating_mul(multiplication_factor),
            };

            in_flight_weighted_volume +=
                task_effective_size as f64 * (task_progress_percent / 100.0);
        }

        let overall_percent = ((execution.processed_keyspace as f64 + in_flight_weighted_volume)
            / effective_keyspace
            * 100.0)
            .clamp(0.0, 100.0);

        database_connection
            .execute(
                "UPDATE job_executions SET overall_progress_percent = ?2, updated_at = ?3
                 WHERE id = ?1",
                params![job_identifier.to_string(), overall_percent, now.to_rfc3339()],
            )
            .await?;

        Ok(overall_percent)
    }

    /**
     * Sella la ejecución cuando todo el keyspace efectivo fue
     * procesado y no queda ninguna tarea no terminal.
     */
    #[instrument(skip(self))]
    pub async fn complete_job_if_done(
        &self,
        job_identifier: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let rows_affected = database_connection
            .execute(
                "UPDATE job_executions
                 SET status = 'completed',
                     overall_progress_percent = 100.0,
                     completed_at = ?2,
                     updated_at = ?2
                 WHERE id = ?1
                   AND status IN ('pending', 'running', 'paused')
                   AND effective_keyspace IS NOT NULL
                   AND processed_keyspace >= effective_keyspace
                   AND NOT EXISTS (
                       SELECT 1 FROM job_tasks
                       WHERE job_execution_id = ?1
                         AND status IN ('pending', 'assigned', 'running', 'reconnect_pending')
                   )",
                params![job_identifier.to_string(), now.to_rfc3339()],
            )
            .await?;

        if rows_affected > 0 {
            info!("✅ [JOB_SEALED]: Execution {} completed bit-perfectly.", job_identifier);
        }
        Ok(rows_affected > 0)
    }

    // --- ESTRATO DE TRANSICIONES DE ESTADO ---

    /// Pausa una ejecución, opcionalmente registrando quién la desalojó.
    pub async fn pause_job(
        &self,
        job_identifier: &Uuid,
        interrupted_by: Option<&Uuid>,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        let rows_affected = database_connection
            .execute(
                "UPDATE job_executions
                 SET status = 'paused', interrupted_by = ?2, updated_at = ?3
                 WHERE id = ?1 AND status IN ('pending', 'running')",
                params![
                    job_identifier.to_string(),
                    nullable_text(interrupted_by.map(|identifier| identifier.to_string())),
                    now.to_rfc3339()
                ],
            )
            .await?;
        if rows_affected == 0 {
            return Err(DbError::InvalidState);
        }
        Ok(())
    }

    /// Reanuda una ejecución pausada por el operador.
    pub async fn resume_job(&self, job_identifier: &Uuid, now: DateTime<Utc>) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        let rows_affected = database_connection
            .execute(
                "UPDATE job_executions
                 SET status = CASE WHEN started_at IS NULL THEN 'pending' ELSE 'running' END,
                     interrupted_by = NULL,
                     updated_at = ?2
                 WHERE id = ?1 AND status = 'paused'",
                params![job_identifier.to_string(), now.to_rfc3339()],
            )
            .await?;
        if rows_affected == 0 {
            return Err(DbError::InvalidState);
        }
        Ok(())
    }

    /// Cancela una ejecución activa por orden de mando.
    pub async fn cancel_job(&self, job_identifier: &Uuid, now: DateTime<Utc>) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        let rows_affected = database_connection
            .execute(
                "UPDATE job_executions
                 SET status = 'cancelled', completed_at = ?2, updated_at = ?2
                 WHERE id = ?1 AND status IN ('pending', 'running', 'paused')",
                params![job_identifier.to_string(), now.to_rfc3339()],
            )
            .await?;
        if rows_affected == 0 {
            return Err(DbError::InvalidState);
        }
        Ok(())
    }

    /// Marca la ejecución como fallida con su causa agregada.
    pub async fn fail_job(
        &self,
        job_identifier: &Uuid,
        error_message: &str,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        let rows_affected = database_connection
            .execute(
                "UPDATE job_executions
                 SET status = 'failed', error_message = ?2, completed_at = ?3, updated_at = ?3
                 WHERE id = ?1 AND status IN ('pending', 'running', 'paused')",
                params![job_identifier.to_string(), error_message, now.to_rfc3339()],
            )
            .await?;
        if rows_affected == 0 {
            return Err(DbError::InvalidState);
        }
        warn!("💀 [JOB_FAILED]: Execution {} sealed as failed.", job_identifier);
        Ok(())
    }

    /// Marca una ejecución completada aunque reste keyspace (lista
    /// íntegramente crackeada). Si nunca despachó, queda cancelada.
    pub async fn finish_for_exhausted_hashlist(
        &self,
        job_identifier: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<JobExecutionStatus, DbError> {
        let execution = self.fetch_job(job_identifier).await?;
        let terminal_status = if execution.dispatched_keyspace > 0 {
            JobExecutionStatus::Completed
        } else {
            JobExecutionStatus::Cancelled
        };

        let database_connection = self.database_client.get_connection()?;
        let rows_affected = database_connection
            .execute(
                "UPDATE job_executions
                 SET status = ?2, completed_at = ?3, updated_at = ?3
                 WHERE id = ?1 AND status IN ('pending', 'running', 'paused')",
                params![
                    job_identifier.to_string(),
                    terminal_status.as_label(),
                    now.to_rfc3339()
                ],
            )
            .await?;
        if rows_affected == 0 {
            return Err(DbError::InvalidState);
        }
        Ok(terminal_status)
    }

    // --- ESTRATO DE PREEMPCIÓN ---

    /**
     * Selecciona la víctima de preempción: tarea viva cuyo trabajo no
     * es override, con menor prioridad, arranque más antiguo y, como
     * desempate final, menor identificador de tarea.
     */
    pub async fn select_preemption_victim(&self) -> Result<Option<PreemptionVictim>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(
                "SELECT job_tasks.id, job_tasks.job_execution_id, job_tasks.agent_id,
                        job_executions.priority
                 FROM job_tasks
                 JOIN job_executions ON job_executions.id = job_tasks.job_execution_id
                 WHERE job_tasks.status IN ('assigned', 'running')
                   AND job_tasks.agent_id IS NOT NULL
                   AND job_executions.allow_high_priority_override = 0
                   AND job_executions.status = 'running'
                 ORDER BY job_executions.priority ASC,
                          job_tasks.started_at ASC,
                          job_tasks.id ASC
                 LIMIT 1",
                (),
            )
            .await?;

        let data_row = match query_results.next().await? {
            Some(row) => row,
            None => return Ok(None),
        };

        Ok(Some(PreemptionVictim {
            task_id: parse_uuid_column(&data_row, 0)?,
            job_execution_id: parse_uuid_column(&data_row, 1)?,
            agent_id: data_row.get::<i64>(2)?,
            job_priority: data_row.get::<i64>(3)?,
        }))
    }

    /// Agrega las causas de fallo de las tareas para el sellado del trabajo.
    pub async fn aggregate_task_failures(
        &self,
        job_identifier: &Uuid,
    ) -> Result<String, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(
                "SELECT DISTINCT error_message FROM job_tasks
                 WHERE job_execution_id = ?1 AND error_message IS NOT NULL",
                params![job_identifier.to_string()],
            )
            .await?;

        let mut failure_causes = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            if let Some(cause) = data_row.get::<Option<String>>(0)? {
                failure_causes.push(cause);
            }
        }

        if failure_causes.is_empty() {
            failure_causes.push("task retry budget exhausted".to_string());
        }
        Ok(failure_causes.join("; "))
    }

    // --- ESTRATO DE DIAGNÓSTICO ---

    /// Analiza por qué fue rechazado un avance de frontera.
    async fn diagnose_advance_failure(
        &self,
        job_identifier: &Uuid,
        effective_delta: i64,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(
                "SELECT status, dispatched_keyspace, effective_keyspace
                 FROM job_executions WHERE id = ?1",
                params![job_identifier.to_string()],
            )
            .await?;

        if let Some(data_row) = query_results.next().await? {
            let current_status: String = data_row.get(0)?;
            let dispatched: i64 = data_row.get(1)?;
            let effective = data_row.get::<Option<i64>>(2)?;

            if let Some(effective_magnitude) = effective {
                if dispatched + effective_delta > effective_magnitude {
                    warn!(
                        "🛑 [FRONTIER_REJECTED]: Job {} overflow attempt ({} + {} > {}).",
                        job_identifier, dispatched, effective_delta, effective_magnitude
                    );
                    return Err(DbError::DispatchOverflow);
                }
            }
            debug!(
                "🛑 [FRONTIER_REJECTED]: Job {} not dispatchable in status '{}'.",
                job_identifier, current_status
            );
            return Err(DbError::InvalidState);
        }
        Err(DbError::JobNotFound)
    }
}

/// Mapea una fila del Ledger a la entidad de dominio.
fn map_row_to_job_execution(data_row: &Row) -> Result<JobExecution, DbError> {
    let status_label: String = data_row.get(4)?;
    let attack_mode_label: String = data_row.get(7)?;
    let wordlist_ids_json: String = data_row.get(19)?;
    let rule_ids_json: String = data_row.get(20)?;

    Ok(JobExecution {
        id: parse_uuid_column(data_row, 0)?,
        preset_job_id: parse_uuid_column(data_row, 1)?,
        hashlist_id: data_row.get::<i64>(2)?,
        name: data_row.get(3)?,
        status: JobExecutionStatus::from_label(&status_label)
            .ok_or_else(|| DbError::MappingError(format!("job status '{}'", status_label)))?,
        priority: data_row.get::<i64>(5)?,
        max_agents: data_row.get::<i64>(6)?,
        attack_mode: AttackMode::from_label(&attack_mode_label)
            .ok_or_else(|| DbError::MappingError(format!("attack mode '{}'", attack_mode_label)))?,
        base_keyspace: data_row.get::<Option<i64>>(8)?,
        multiplication_factor: data_row.get::<Option<i64>>(9)?,
        effective_keyspace: data_row.get::<Option<i64>>(10)?,
        uses_rule_splitting: data_row.get::<i64>(11)? != 0,
        rule_split_count: data_row.get::<i64>(12)?,
        dispatched_keyspace: data_row.get::<i64>(13)?,
        processed_keyspace: data_row.get::<i64>(14)?,
        next_base_offset: data_row.get::<i64>(15)?,
        next_rule_offset: data_row.get::<i64>(16)?,
        overall_progress_percent: data_row.get::<f64>(17)?,
        allow_high_priority_override: data_row.get::<i64>(18)? != 0,
        wordlist_ids: parse_id_vector(&wordlist_ids_json)?,
        rule_ids: parse_id_vector(&rule_ids_json)?,
        mask: data_row.get::<Option<String>>(21)?,
        binary_version_id: data_row.get::<i64>(22)?,
        chunk_duration_seconds: data_row.get::<i64>(23)?,
        interrupted_by: parse_optional_uuid_column(data_row, 24),
        error_message: data_row.get::<Option<String>>(25)?,
        created_at: parse_required_timestamp(data_row, 26)?,
        started_at: parse_timestamp_column(data_row, 27),
        completed_at: parse_timestamp_column(data_row, 28),
        updated_at: parse_required_timestamp(data_row, 29)?,
    })
}
