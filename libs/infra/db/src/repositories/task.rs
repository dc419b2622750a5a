// [libs/infra/db/src/repositories/task.rs]
/*!
 * =================================================================
 * APARATO: JOB TASK REPOSITORY (V19.0 - GOLD MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: CICLO DE VIDA PERSISTIDO DE LA UNIDAD DE DESPACHO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. IDEMPOTENT SEALING: El sellado de una tarea es un UPDATE con
 *    predicado de estados no terminales. Un segundo reporte del
 *    mismo cierre es una operación nula.
 * 2. MONOTONE PROGRESS: Un reporte de progreso con volumen menor al
 *    almacenado se ignora (reordenamiento de red).
 * 3. NOMINAL PURITY: Nomenclatura nominal absoluta.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::{
    nullable_integer, nullable_text, parse_timestamp_column, parse_uuid_column,
};
use crate::LedgerClient;
use chrono::{DateTime, Utc};
use kraken_domain_models::{JobTask, TaskStatus};
use libsql::{params, Row};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Proyección canónica de columnas de una tarea.
const TASK_COLUMNS: &str = "id, job_execution_id, agent_id, status, keyspace_start, keyspace_end, \
     rule_start_index, rule_end_index, chunk_duration_seconds, progress_percent, \
     keyspace_processed, benchmark_speed, low_confidence, retry_count, error_message, \
     assigned_at, started_at, completed_at";

/// Autoridad única de persistencia de tareas de despacho.
pub struct TaskRepository {
    database_client: LedgerClient,
}

impl TaskRepository {
    pub fn new(client: LedgerClient) -> Self {
        Self {
            database_client: client,
        }
    }

    // --- ESTRATO DE GÉNESIS Y ASIGNACIÓN ---

    /// Persiste una tarea recién dimensionada en estado 'assigned'.
    #[instrument(skip(self, task))]
    pub async fn create_assigned(&self, task: &JobTask) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        let sql_statement = format!(
            "INSERT INTO job_tasks ({}) VALUES \
             (?1, ?2, ?3, 'assigned', ?4, ?5, ?6, ?7, ?8, 0.0, 0, ?9, ?10, ?11, NULL, ?12, NULL, NULL)",
            TASK_COLUMNS
        );

        database_connection
            .execute(
                &sql_statement,
                params![
                    task.id.to_string(),
                    task.job_execution_id.to_string(),
                    nullable_integer(task.agent_id),
                    task.keyspace_start,
                    task.keyspace_end,
                    nullable_integer(task.rule_start_index),
                    nullable_integer(task.rule_end_index),
                    task.chunk_duration_seconds,
                    task.benchmark_speed,
                    task.low_confidence as i64,
                    task.retry_count,
                    nullable_text(task.assigned_at.map(|timestamp| timestamp.to_rfc3339()))
                ],
            )
            .await?;

        debug!(
            "📦 [TASK_GENESIS]: Task {} persisted for agent {:?}.",
            task.id, task.agent_id
        );
        Ok(())
    }

    /// Re-asigna una tarea huérfana ('pending' sin agente) a un agente.
    pub async fn assign_pending_to_agent(
        &self,
        task_identifier: &Uuid,
        agent_identifier: i64,
        benchmark_speed: i64,
        low_confidence: bool,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        let rows_affected = database_connection
            .execute(
                "UPDATE job_tasks
                 SET status = 'assigned',
                     agent_id = ?2,
                     benchmark_speed = ?3,
                     low_confidence = ?4,
                     assigned_at = ?5
                 WHERE id = ?1 AND status = 'pending' AND agent_id IS NULL",
                params![
                    task_identifier.to_string(),
                    agent_identifier,
                    benchmark_speed,
                    low_confidence as i64,
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

    pub async fn fetch_task(&self, task_identifier: &Uuid) -> Result<JobTask, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let sql_query = format!("SELECT {} FROM job_tasks WHERE id = ?1", TASK_COLUMNS);
        let mut query_results = database_connection
            .query(&sql_query, params![task_identifier.to_string()])
            .await?;
        let data_row = query_results.next().await?.ok_or(DbError::TaskNotFound)?;
        map_row_to_job_task(&data_row)
    }

    /// Tareas en vuelo de todo el sistema (siembra del caché al arranque).
    pub async fn fetch_all_in_flight(&self) -> Result<Vec<JobTask>, DbError> {
        self.fetch_by_status_clause("status IN ('assigned', 'running', 'reconnect_pending')", ())
            .await
    }

    /// Tareas en vuelo de un agente concreto.
    pub async fn in_flight_for_agent(&self, agent_identifier: i64) -> Result<Vec<JobTask>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let sql_query = format!(
            "SELECT {} FROM job_tasks
             WHERE agent_id = ?1 AND status IN ('assigned', 'running', 'reconnect_pending')",
            TASK_COLUMNS
        );
        let mut query_results = database_connection
            .query(&sql_query, params![agent_identifier])
            .await?;
        let mut task_collection = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            task_collection.push(map_row_to_job_task(&data_row)?);
        }
        Ok(task_collection)
    }

    /// Primera tarea huérfana re-encolada de una ejecución, si existe.
    pub async fn fetch_orphaned_pending(
        &self,
        job_identifier: &Uuid,
    ) -> Result<Option<JobTask>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let sql_query = format!(
            "SELECT {} FROM job_tasks
             WHERE job_execution_id = ?1 AND status = 'pending' AND agent_id IS NULL
             ORDER BY keyspace_start ASC, rule_start_index ASC
             LIMIT 1",
            TASK_COLUMNS
        );
        let mut query_results = database_connection
            .query(&sql_query, params![job_identifier.to_string()])
            .await?;
        match query_results.next().await? {
            Some(data_row) => Ok(Some(map_row_to_job_task(&data_row)?)),
            None => Ok(None),
        }
    }

    pub async fn tasks_for_job(&self, job_identifier: &Uuid) -> Result<Vec<JobTask>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let sql_query = format!(
            "SELECT {} FROM job_tasks WHERE job_execution_id = ?1 ORDER BY assigned_at ASC",
            TASK_COLUMNS
        );
        let mut query_results = database_connection
            .query(&sql_query, params![job_identifier.to_string()])
            .await?;
        let mut task_collection = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            task_collection.push(map_row_to_job_task(&data_row)?);
        }
        Ok(task_collection)
    }

    // --- ESTRATO DE PROGRESO ---

    /**
     * Registra un reporte de progreso con guardia de monotonía y de
     * propiedad. Devuelve `false` si el reporte fue ignorado (volumen
     * antiguo reordenado, tarea terminal o agente ajeno).
     */
    pub async fn record_progress(
        &self,
        task_identifier: &Uuid,
        reporting_agent: i64,
        keyspace_processed: i64,
        progress_percent: f64,
        observed_speed: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let rows_affected = database_connection
            .execute(
                "UPDATE job_tasks
                 SET keyspace_processed = ?3,
                     progress_percent = ?4,
                     benchmark_speed = ?5,
                     status = CASE WHEN status = 'assigned' THEN 'running' ELSE status END,
                     started_at = COALESCE(started_at, ?6)
                 WHERE id = ?1
                   AND agent_id = ?2
                   AND status IN ('assigned', 'running')
                   AND keyspace_processed <= ?3",
                params![
                    task_identifier.to_string(),
                    reporting_agent,
                    keyspace_processed,
                    progress_percent,
                    observed_speed,
                    now.to_rfc3339()
                ],
            )
            .await?;
        Ok(rows_affected > 0)
    }

    // --- ESTRATO DE CIERRE ---

    /**
     * Sella una tarea con su veredicto terminal. Idempotente: un
     * segundo sellado del mismo identificador devuelve `false` y no
     * altera el Ledger.
     */
    #[instrument(skip(self, error_message))]
    pub async fn complete_task(
        &self,
        task_identifier: &Uuid,
        terminal_status: TaskStatus,
        final_processed: i64,
        error_message: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        if !terminal_status.is_terminal() {
            return Err(DbError::InvalidState);
        }

        let database_connection = self.database_client.get_connection()?;
        let rows_affected = database_connection
            .execute(
                "UPDATE job_tasks
                 SET status = ?2,
                     keyspace_processed = MAX(keyspace_processed, ?3),
                     progress_percent = CASE WHEN ?2 = 'completed' THEN 100.0 ELSE progress_percent END,
                     error_message = COALESCE(?4, error_message),
                     completed_at = ?5
                 WHERE id = ?1
                   AND status IN ('pending', 'assigned', 'running', 'reconnect_pending')",
                params![
                    task_identifier.to_string(),
                    terminal_status.as_label(),
                    final_processed,
                    nullable_text(error_message.map(str::to_string)),
                    now.to_rfc3339()
                ],
            )
            .await?;

        if rows_affected > 0 {
            info!(
                "🏁 [TASK_SEALED]: Task {} closed as '{}'.",
                task_identifier,
                terminal_status.as_label()
            );
        }
        Ok(rows_affected > 0)
    }

    /**
     * Re-encola una tarea fallida conservando su intervalo y sumando
     * un reintento. Devuelve el contador de reintentos resultante.
     */
    pub async fn requeue_for_retry(
        &self,
        task_identifier: &Uuid,
        failure_cause: Option<&str>,
    ) -> Result<i64, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let rows_affected = database_connection
            .execute(
                "UPDATE job_tasks
                 SET status = 'pending',
                     agent_id = NULL,
                     progress_percent = 0.0,
                     keyspace_processed = 0,
                     retry_count = retry_count + 1,
                     error_message = COALESCE(?2, error_message),
                     assigned_at = NULL,
                     started_at = NULL,
                     completed_at = NULL
                 WHERE id = ?1",
                params![
                    task_identifier.to_string(),
                    nullable_text(failure_cause.map(str::to_string))
                ],
            )
            .await?;

        if rows_affected == 0 {
            return Err(DbError::TaskNotFound);
        }

        let mut query_results = database_connection
            .query(
                "SELECT retry_count FROM job_tasks WHERE id = ?1",
                params![task_identifier.to_string()],
            )
            .await?;
        let data_row = query_results.next().await?.ok_or(DbError::TaskNotFound)?;
        let retry_count = data_row.get::<i64>(0)?;

        warn!(
            "♻️ [TASK_REQUEUED]: Task {} back in queue (retry {}).",
            task_identifier, retry_count
        );
        Ok(retry_count)
    }

    // --- ESTRATO DE DESCONEXIÓN Y RECUPERACIÓN ---

    /// Suspende las tareas vivas de un agente desconectado.
    pub async fn mark_reconnect_pending_for_agent(
        &self,
        agent_identifier: i64,
    ) -> Result<Vec<Uuid>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(
                "UPDATE job_tasks
                 SET status = 'reconnect_pending'
                 WHERE agent_id = ?1 AND status IN ('assigned', 'running')
                 RETURNING id",
                params![agent_identifier],
            )
            .await?;

        let mut suspended_identifiers = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            suspended_identifiers.push(parse_uuid_column(&data_row, 0)?);
        }
        Ok(suspended_identifiers)
    }

    /// Restaura las tareas suspendidas de un agente que reconectó en gracia.
    pub async fn restore_reconnect_pending(
        &self,
        agent_identifier: i64,
    ) -> Result<Vec<Uuid>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(
                "UPDATE job_tasks
                 SET status = 'running'
                 WHERE agent_id = ?1 AND status = 'reconnect_pending'
                 RETURNING id",
                params![agent_identifier],
            )
            .await?;

        let mut restored_identifiers = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            restored_identifiers.push(parse_uuid_column(&data_row, 0)?);
        }
        Ok(restored_identifiers)
    }

    // --- MOTOR INTERNO ---

    async fn fetch_by_status_clause(
        &self,
        status_clause: &str,
        query_params: impl libsql::params::IntoParams,
    ) -> Result<Vec<JobTask>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let sql_query = format!(
            "SELECT {} FROM job_tasks WHERE {}",
            TASK_COLUMNS, status_clause
        );
        let mut query_results = database_connection.query(&sql_query, query_params).await?;
        let mut task_collection = Vec::new();
        while let Some(data_row) = query_results.next().await? {
            task_collection.push(map_row_to_job_task(&data_row)?);
        }
        Ok(task_collection)
    }
}

/// Mapea una fila del Ledger a la entidad de dominio.
fn map_row_to_job_task(data_row: &Row) -> Result<JobTask, DbError> {
    let status_label: String = data_row.get(3)?;

    Ok(JobTask {
        id: parse_uuid_column(data_row, 0)?,
        job_execution_id: parse_uuid_column(data_row, 1)?,
        agent_id: data_row.get::<Option<i64>>(2)?,
        status: TaskStatus::from_label(&status_label)
            .ok_or_else(|| DbError::MappingError(format!("task status '{}'", status_label)))?,
        keyspace_start: data_row.get::<i64>(4)?,
        keyspace_end: data_row.get::<i64>(5)?,
        rule_start_index: data_row.get::<Option<i64>>(6)?,
        rule_end_index: data_row.get::<Option<i64>>(7)?,
        chunk_duration_seconds: data_row.get::<i64>(8)?,
        progress_percent: data_row.get::<f64>(9)?,
        keyspace_processed: data_row.get::<i64>(10)?,
        benchmark_speed: data_row.get::<i64>(11)?,
        low_confidence: data_row.get::<i64>(12)? != 0,
        retry_count: data_row.get::<i64>(13)?,
        error_message: data_row.get::<Option<String>>(14)?,
        assigned_at: parse_timestamp_column(data_row, 15),
        started_at: parse_timestamp_column(data_row, 16),
        completed_at: parse_timestamp_column(data_row, 17),
    })
}
