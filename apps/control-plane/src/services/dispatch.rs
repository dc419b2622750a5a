// [apps/control-plane/src/services/dispatch.rs]
/*!
 * =================================================================
 * APARATO: DISPATCH & COMPLETION SERVICE (V21.0 - GOLD MASTER)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: ENTREGA DE TAREAS, INGESTA DE PROGRESO Y CIERRES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. NARROW DISPATCHER: La capacidad de envío hacia agentes es un
 *    trait estrecho. El directorio de enlaces lo implementa; este
 *    servicio y el reconciliador solo lo consumen.
 * 2. SINGLE WRITER: El efecto colateral de lista íntegramente
 *    crackeada vive aquí, manteniendo un único escritor del estado
 *    terminal de trabajos.
 * 3. IDEMPOTENT INGESTION: Cierres duplicados y cracks repetidos
 *    son operaciones nulas certificadas.
 *
 * # Mathematical Proof (Completion Accounting):
 * Cada cierre 'completed' acredita exactamente una vez el volumen
 * efectivo de su tarea, porque el sellado idempotente en el Ledger
 * devuelve 'primera aplicación' una única vez por tarea.
 * =================================================================
 */

use crate::state::{AppState, InFlightEntry};
use kraken_domain_models::{
    CrackEntry, Hashlist, JobExecution, JobTask, RealTimeEvent, ServerMessage, StopReason,
    TaskAssignment, TaskOutcome, TaskStatus,
};
use kraken_infra_db::repositories::ReleasedInterval;
use kraken_infra_db::DbError;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::signal_bus::ReconcileSignal;

/// Fallos de la capacidad de envío hacia un agente.
#[derive(Error, Debug)]
pub enum DispatchFault {
    /// El agente no posee sesión viva en el directorio.
    #[error("[L4_DISPATCH_FAULT]: AGENT_LINK_ABSENT -> agent {0}")]
    LinkAbsent(i64),

    /// El buffer de salida del agente está colmado.
    #[error("[L4_DISPATCH_FAULT]: OUTBOUND_CHANNEL_SATURATED -> agent {0}")]
    ChannelSaturated(i64),
}

/**
 * Capacidad estrecha de envío consumida por el scheduling.
 * El manejador de WebSocket la implementa y no posee lógica de
 * despacho propia.
 */
pub trait Dispatcher: Send + Sync {
    fn dispatch_to_agent(
        &self,
        agent_identifier: i64,
        message: ServerMessage,
    ) -> Result<(), DispatchFault>;
}

/// Servicio de entrega y cierre de tareas (escritor único de estados
/// terminales derivados de ingesta).
pub struct DispatchService {
    application_shared_state: AppState,
}

impl DispatchService {
    #[must_use]
    pub fn new(application_state: AppState) -> Self {
        Self {
            application_shared_state: application_state,
        }
    }

    // --- ESTRATO DE ENTREGA ---

    /**
     * Entrega una tarea recién persistida a su agente. Devuelve
     * `false` si el enlace rechazó el mensaje; en ese caso la tarea
     * vuelve a la cola huérfana conservando su intervalo.
     */
    #[instrument(skip(self, execution, task, hashlist), fields(task = %task.id))]
    pub async fn deliver_assignment(
        &self,
        execution: &JobExecution,
        task: &JobTask,
        hashlist: &Hashlist,
    ) -> anyhow::Result<bool> {
        let state = &self.application_shared_state;
        let now = state.clock.now();

        let agent_identifier = task
            .agent_id
            .ok_or_else(|| anyhow::anyhow!("assignment without agent"))?;

        let assignment = TaskAssignment {
            task_id: task.id,
            job_execution_id: execution.id,
            attack_mode: execution.attack_mode,
            hash_type: hashlist.hash_type,
            hashlist_id: hashlist.id,
            hashlist_version: hashlist.version_hash.clone(),
            binary_version_id: execution.binary_version_id,
            wordlist_ids: execution.wordlist_ids.clone(),
            rule_ids: execution.rule_ids.clone(),
            mask: execution.mask.clone(),
            keyspace_start: task.keyspace_start,
            keyspace_end: task.keyspace_end,
            rule_start_index: task.rule_start_index,
            rule_end_index: task.rule_end_index,
            chunk_duration_s: task.chunk_duration_seconds,
        };

        match state
            .dispatcher
            .dispatch_to_agent(agent_identifier, ServerMessage::AssignTask(assignment))
        {
            Ok(()) => {
                state.inflight_registry.insert(InFlightEntry {
                    task_id: task.id,
                    agent_id: agent_identifier,
                    job_execution_id: execution.id,
                    hashlist_id: hashlist.id,
                    chunk_duration_seconds: task.chunk_duration_seconds,
                    created_at: now,
                    last_progress_at: now,
                });

                state.event_bus.broadcast_event(RealTimeEvent::TaskDispatched {
                    task_id: task.id,
                    agent_id: agent_identifier,
                });

                info!(
                    "🚀 [DISPATCH]: Task {} engaged on agent {} ([{}, {}) × rules {:?}..{:?}).",
                    task.id,
                    agent_identifier,
                    task.keyspace_start,
                    task.keyspace_end,
                    task.rule_start_index,
                    task.rule_end_index
                );
                Ok(true)
            }
            Err(dispatch_fault) => {
                warn!(
                    "⚠️ [DISPATCH_FAULT]: Delivery rejected for task {}: {}. Re-queuing interval.",
                    task.id, dispatch_fault
                );
                state
                    .task_repository
                    .requeue_for_retry(&task.id, Some("delivery channel unavailable"))
                    .await?;
                Ok(false)
            }
        }
    }

    // --- ESTRATO DE INGESTA DE PROGRESO ---

    /**
     * Ingesta un reporte de progreso validando propiedad y monotonía.
     * Reportes reordenados con volumen antiguo se descartan.
     */
    #[instrument(skip(self), fields(task = %task_identifier))]
    pub async fn ingest_progress(
        &self,
        reporting_agent: i64,
        task_identifier: Uuid,
        keyspace_processed: i64,
        progress_percent: f64,
        observed_speed: i64,
    ) -> anyhow::Result<()> {
        let state = &self.application_shared_state;
        let now = state.clock.now();

        match state.inflight_registry.get(&task_identifier) {
            Some(entry) if entry.agent_id == reporting_agent => {}
            Some(entry) => {
                warn!(
                    "🛡️ [PROGRESS_VETO]: Agent {} reported task {} owned by agent {}.",
                    reporting_agent, task_identifier, entry.agent_id
                );
                return Ok(());
            }
            None => {
                debug!(
                    "💤 [PROGRESS_IGNORED]: Task {} not in flight (already sealed?).",
                    task_identifier
                );
                return Ok(());
            }
        }

        let progress_applied = state
            .task_repository
            .record_progress(
                &task_identifier,
                reporting_agent,
                keyspace_processed,
                progress_percent.clamp(0.0, 100.0),
                observed_speed,
                now,
            )
            .await?;

        if progress_applied {
            state.inflight_registry.touch_progress(&task_identifier, now);
            if let Some(entry) = state.inflight_registry.get(&task_identifier) {
                state
                    .job_repository
                    .recompute_overall_progress(&entry.job_execution_id, now)
                    .await?;
            }
        }
        Ok(())
    }

    // --- ESTRATO DE CIERRE ---

    /**
     * Ingesta el veredicto terminal de una tarea. Idempotente: el
     * segundo reporte del mismo cierre no altera progreso ni estado.
     */
    #[instrument(skip(self, error_detail), fields(task = %task_identifier))]
    pub async fn ingest_completion(
        &self,
        reporting_agent: i64,
        task_identifier: Uuid,
        outcome: TaskOutcome,
        final_processed: i64,
        error_detail: Option<String>,
    ) -> anyhow::Result<()> {
        let state = &self.application_shared_state;
        let now = state.clock.now();

        let task = match state.task_repository.fetch_task(&task_identifier).await {
            Ok(task) => task,
            Err(DbError::TaskNotFound) => {
                warn!("❓ [COMPLETE_UNKNOWN]: Task {} not in the Ledger.", task_identifier);
                return Ok(());
            }
            Err(other_fault) => return Err(other_fault.into()),
        };

        if task.agent_id != Some(reporting_agent) {
            warn!(
                "🛡️ [COMPLETE_VETO]: Agent {} attempted to seal task {} owned by {:?}.",
                reporting_agent, task_identifier, task.agent_id
            );
            return Ok(());
        }

        let terminal_status = match outcome {
            TaskOutcome::Completed => TaskStatus::Completed,
            TaskOutcome::Failed => TaskStatus::Failed,
            TaskOutcome::Cancelled => TaskStatus::Cancelled,
        };

        let first_application = state
            .task_repository
            .complete_task(
                &task_identifier,
                terminal_status,
                final_processed,
                error_detail.as_deref(),
                now,
            )
            .await?;

        if !first_application {
            debug!(
                "♻️ [COMPLETE_DEDUP]: Task {} already sealed. No-op.",
                task_identifier
            );
            return Ok(());
        }

        state.inflight_registry.remove(&task_identifier);
        let execution = state.job_repository.fetch_job(&task.job_execution_id).await?;

        match outcome {
            TaskOutcome::Completed => {
                let effective_volume = task.effective_size(
                    execution.base_keyspace.unwrap_or(0),
                    execution.multiplication_factor.unwrap_or(1),
                );

                state
                    .job_repository
                    .add_processed_volume(&execution.id, effective_volume, now)
                    .await?;
                state
                    .job_repository
                    .recompute_overall_progress(&execution.id, now)
                    .await?;
                state.agent_repository.reset_failures(reporting_agent).await?;

                if state
                    .job_repository
                    .complete_job_if_done(&execution.id, now)
                    .await?
                {
                    state.event_bus.broadcast_event(RealTimeEvent::JobStateChanged {
                        job_execution_id: execution.id,
                        status: kraken_domain_models::JobExecutionStatus::Completed,
                    });
                }
            }
            TaskOutcome::Failed => {
                state.agent_repository.record_failure(reporting_agent).await?;

                if task.retry_count < state.config.max_task_retries {
                    state
                        .task_repository
                        .requeue_for_retry(&task_identifier, error_detail.as_deref())
                        .await?;
                } else {
                    let aggregated_cause = state
                        .job_repository
                        .aggregate_task_failures(&execution.id)
                        .await?;

                    self.stop_all_tasks_for_job(&execution.id, StopReason::ServerError)
                        .await?;

                    if let Err(transition_fault) = state
                        .job_repository
                        .fail_job(&execution.id, &aggregated_cause, now)
                        .await
                    {
                        warn!(
                            "⚠️ [FAIL_BYPASS]: Job {} not failable: {}",
                            execution.id, transition_fault
                        );
                    } else {
                        state.event_bus.broadcast_event(RealTimeEvent::JobStateChanged {
                            job_execution_id: execution.id,
                            status: kraken_domain_models::JobExecutionStatus::Failed,
                        });
                    }
                }
            }
            TaskOutcome::Cancelled => {
                state
                    .job_repository
                    .recompute_overall_progress(&execution.id, now)
                    .await?;
            }
        }

        state.signal_bus.emit(ReconcileSignal::TaskTerminal);
        Ok(())
    }

    // --- ESTRATO DE INGESTA DE CRACKS ---

    /**
     * Ingesta un reporte de cracks deduplicado por (lista, hash) y
     * dispara el efecto de lista íntegramente crackeada.
     */
    #[instrument(skip(self, entries), fields(hashlist = hashlist_identifier, batch = entries.len()))]
    pub async fn ingest_crack_report(
        &self,
        reporting_agent: i64,
        task_identifier: Uuid,
        hashlist_identifier: i64,
        entries: Vec<CrackEntry>,
    ) -> anyhow::Result<()> {
        let state = &self.application_shared_state;
        let now = state.clock.now();

        if let Some(entry) = state.inflight_registry.get(&task_identifier) {
            if entry.agent_id != reporting_agent {
                warn!(
                    "🛡️ [CRACK_VETO]: Agent {} reported cracks for task {} owned by {}.",
                    reporting_agent, task_identifier, entry.agent_id
                );
                return Ok(());
            }
        }

        let hashlist = state
            .hashlist_repository
            .fetch_hashlist(hashlist_identifier)
            .await?;
        let ingest_report = state
            .hashlist_repository
            .ingest_cracks(hashlist_identifier, &entries, now)
            .await?;

        if ingest_report.newly_cracked > 0 {
            if !hashlist.exclude_from_potfile {
                if let Err(potfile_fault) = state
                    .potfile_writer
                    .append_cracks(&ingest_report.fresh_entries)
                    .await
                {
                    // I/O transitorio: el Ledger ya custodia los cracks.
                    warn!("⚠️ [POTFILE_BYPASS]: Append deferred: {}", potfile_fault);
                }
            }

            state.event_bus.broadcast_event(RealTimeEvent::CracksIngested {
                hashlist_id: hashlist_identifier,
                newly_cracked: ingest_report.newly_cracked,
            });
        }

        if ingest_report.fully_cracked {
            self.execute_hashlist_completion(hashlist_identifier).await?;
        }
        Ok(())
    }

    /**
     * Efecto centralizado de lista íntegramente crackeada: sella la
     * lista, detiene todas las tareas en vuelo de sus campañas y
     * finaliza cada ejecución activa.
     */
    #[instrument(skip(self))]
    pub async fn execute_hashlist_completion(
        &self,
        hashlist_identifier: i64,
    ) -> anyhow::Result<()> {
        let state = &self.application_shared_state;
        let now = state.clock.now();

        info!(
            "🏆 [HASHLIST_EXHAUSTED]: Hashlist {} fully cracked. Halting campaigns.",
            hashlist_identifier
        );

        state
            .hashlist_repository
            .mark_completed(hashlist_identifier)
            .await?;
        state.event_bus.broadcast_event(RealTimeEvent::HashlistFullyCracked {
            hashlist_id: hashlist_identifier,
        });

        let active_executions = state
            .job_repository
            .active_jobs_on_hashlist(hashlist_identifier)
            .await?;

        for execution in active_executions {
            self.stop_all_tasks_for_job(&execution.id, StopReason::HashlistFullyCracked)
                .await?;

            match state
                .job_repository
                .finish_for_exhausted_hashlist(&execution.id, now)
                .await
            {
                Ok(terminal_status) => {
                    state.event_bus.broadcast_event(RealTimeEvent::JobStateChanged {
                        job_execution_id: execution.id,
                        status: terminal_status,
                    });
                }
                Err(transition_fault) => warn!(
                    "⚠️ [EXHAUST_BYPASS]: Job {} not finishable: {}",
                    execution.id, transition_fault
                ),
            }
        }

        state.signal_bus.emit(ReconcileSignal::HashlistCompleted);
        Ok(())
    }

    /**
     * Detiene y sella como canceladas todas las tareas no terminales
     * de una ejecución, notificando a los agentes propietarios.
     */
    pub async fn stop_all_tasks_for_job(
        &self,
        job_identifier: &Uuid,
        reason: StopReason,
    ) -> anyhow::Result<()> {
        let state = &self.application_shared_state;
        let now = state.clock.now();

        let job_tasks = state.task_repository.tasks_for_job(job_identifier).await?;
        for task in job_tasks.iter().filter(|task| !task.status.is_terminal()) {
            if let Some(agent_identifier) = task.agent_id {
                if let Err(dispatch_fault) = state.dispatcher.dispatch_to_agent(
                    agent_identifier,
                    ServerMessage::StopTask {
                        task_id: task.id,
                        reason,
                    },
                ) {
                    debug!(
                        "💤 [STOP_UNDELIVERED]: Agent {} unreachable for stop: {}",
                        agent_identifier, dispatch_fault
                    );
                }
            }

            state
                .task_repository
                .complete_task(&task.id, TaskStatus::Cancelled, task.keyspace_processed, None, now)
                .await?;
            state.inflight_registry.remove(&task.id);
            state.event_bus.broadcast_event(RealTimeEvent::TaskStopped {
                task_id: task.id,
                reason,
            });
        }
        Ok(())
    }
}

/// Proyección del intervalo de una tarea para su liberación como hueco.
pub fn released_interval_from_task(task: &JobTask, execution: &JobExecution) -> ReleasedInterval {
    ReleasedInterval {
        keyspace_start: task.keyspace_start,
        keyspace_end: task.keyspace_end,
        rule_start_index: task.rule_start_index,
        rule_end_index: task.rule_end_index,
        effective_size: task.effective_size(
            execution.base_keyspace.unwrap_or(0),
            execution.multiplication_factor.unwrap_or(1),
        ),
    }
}
