// [apps/control-plane/src/services/recovery.rs]
/*!
 * =================================================================
 * APARATO: PREEMPTION & RECOVERY SERVICE (V18.0 - TYPE SOBERANO)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE SERVICE (ESTRATO L4)
 * RESPONSABILIDAD: VIGILANCIA DE LATIDOS, GRACIA Y PROGRESO ESTANCADO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. GRACE DISCIPLINE: Un agente caído conserva sus tareas en
 *    'reconnect_pending' durante la gracia; al expirar, los
 *    intervalos se liberan como huecos re-emitibles.
 * 2. STALL SHIELD: Una tarea sin progreso durante N × duración de
 *    chunk se cancela y re-encola con cargo a su presupuesto de
 *    reintentos.
 * 3. PANOPTICON SYNC: Telemetría enriquecida por cada recuperación.
 *
 * # Mathematical Proof (Release Compensation):
 * Liberar una tarea descuenta exactamente su volumen efectivo de
 * 'dispatched_keyspace' y registra el hueco equivalente: el avance
 * neto del trabajo queda igual que antes del despacho perdido.
 * =================================================================
 */

use crate::services::dispatch::{released_interval_from_task, Dispatcher};
use crate::services::signal_bus::ReconcileSignal;
use crate::services::with_bounded_retry;
use crate::state::AppState;
use chrono::{DateTime, Utc};
use kraken_domain_models::{AgentStatus, RealTimeEvent, ServerMessage, StopReason, TaskStatus};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

/// Ciclo de vigilancia táctica del daemon de recuperación.
const RECOVERY_SURVEILLANCE_INTERVAL_SECONDS: u64 = 15;

/// Plazo máximo de una solicitud de benchmark sin respuesta.
const BENCHMARK_FLAG_TIMEOUT_SECONDS: i64 = 300;

/// Cadencia (en ticks) de la evicción de benchmarks vencidos.
const BENCHMARK_JANITOR_CADENCE_TICKS: u64 = 240;

/**
 * Corta el enlace de un agente y suspende sus tareas en vuelo.
 * Compartido por el watchdog de latidos y el cierre de socket.
 */
pub async fn quarantine_agent_link(
    state: &AppState,
    agent_identifier: i64,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    state.agent_directory.sever_link(agent_identifier, now);

    let suspended_tasks = state
        .task_repository
        .mark_reconnect_pending_for_agent(agent_identifier)
        .await?;

    if !suspended_tasks.is_empty() {
        warn!(
            "🕸️ [QUARANTINE]: Agent {} suspended with {} in-flight task(s) awaiting grace.",
            agent_identifier,
            suspended_tasks.len()
        );
    }

    if let Err(status_fault) = state
        .agent_repository
        .set_status(agent_identifier, AgentStatus::Inactive)
        .await
    {
        warn!("⚠️ [QUARANTINE_STATUS_BYPASS]: {}", status_fault);
    }

    state.event_bus.broadcast_event(RealTimeEvent::AgentLinkChanged {
        agent_id: agent_identifier,
        connected: false,
    });
    state.signal_bus.emit(ReconcileSignal::AgentStateChanged);
    Ok(())
}

/**
 * Daemon encargado de la supervivencia del despacho: detecta agentes
 * zombies, expira gracias de reconexión y re-encola trabajo estancado.
 */
pub struct RecoveryService {
    application_shared_state: AppState,
}

impl RecoveryService {
    #[must_use]
    pub fn new(application_state: AppState) -> Self {
        Self {
            application_shared_state: application_state,
        }
    }

    /**
     * Inicia el bucle de vigilancia perpetua en el reactor de Tokio.
     *
     * # Reliability:
     * Utiliza 'MissedTickBehavior::Skip' para que los ciclos no se
     * acumulen ante bloqueos temporales de I/O en el Ledger.
     */
    pub async fn spawn_recovery_daemon(self) {
        let mut surveillance_ticker =
            interval(Duration::from_secs(RECOVERY_SURVEILLANCE_INTERVAL_SECONDS));
        surveillance_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("🩺 [RECOVERY]: Fleet survival guardian V18.0 active.");

        let mut tick_ordinal: u64 = 0;
        loop {
            surveillance_ticker.tick().await;
            tick_ordinal = tick_ordinal.wrapping_add(1);

            if let Err(recovery_fault) = self.execute_recovery_sequence(tick_ordinal).await {
                error!("❌ [RECOVERY_FAULT]: Sequence collapsed: {}", recovery_fault);
            }
        }
    }

    /**
     * Ejecuta una secuencia completa de recuperación. Pública para el
     * Proving Grounds, que la conduce con el reloj congelado.
     */
    #[instrument(skip(self))]
    pub async fn execute_recovery_sequence(&self, tick_ordinal: u64) -> anyhow::Result<()> {
        self.enforce_heartbeat_watchdog().await?;
        self.release_expired_reconnect_grace().await?;
        self.recover_stalled_progress().await?;
        self.clear_unanswered_benchmark_flags();

        if tick_ordinal % BENCHMARK_JANITOR_CADENCE_TICKS == 0 {
            let state = &self.application_shared_state;
            let retention_cutoff = state.clock.now() - state.config.benchmark_retention();
            let purged = state
                .benchmark_repository
                .cleanup_older_than(retention_cutoff)
                .await?;
            if purged > 0 {
                info!("🗑️ [RECOVERY_JANITOR]: {} benchmark samples evicted.", purged);
            }
        }
        Ok(())
    }

    // --- VIGILANCIA 1: LATIDOS ---

    /// Declara desconectados a los agentes con silencio de latido.
    async fn enforce_heartbeat_watchdog(&self) -> anyhow::Result<()> {
        let state = &self.application_shared_state;
        let now = state.clock.now();
        let silence_cutoff = now - state.config.heartbeat_timeout();

        let silent_agents = with_bounded_retry("stale heartbeat scan", || {
            state.agent_repository.stale_heartbeat_agents(silence_cutoff)
        })
        .await?;

        for agent_identifier in silent_agents {
            if state.agent_directory.is_connected(agent_identifier) {
                warn!(
                    "💀 [HEARTBEAT_SILENCE]: Agent {} missed its pulse budget. Quarantining.",
                    agent_identifier
                );
                quarantine_agent_link(state, agent_identifier, now).await?;
            }
        }
        Ok(())
    }

    // --- VIGILANCIA 2: GRACIA DE RECONEXIÓN ---

    /**
     * Expira la gracia de agentes caídos: sella sus tareas como
     * canceladas y libera los intervalos como huecos re-emitibles.
     */
    async fn release_expired_reconnect_grace(&self) -> anyhow::Result<()> {
        let state = &self.application_shared_state;
        let now = state.clock.now();
        let grace_window = state.config.reconnect_grace();

        for agent_identifier in state.agent_directory.disconnected_agent_identifiers() {
            let elapsed = match state.agent_directory.disconnect_elapsed(agent_identifier, now) {
                Some(elapsed) => elapsed,
                None => continue,
            };
            if elapsed <= grace_window {
                continue;
            }

            let abandoned_tasks = state
                .task_repository
                .in_flight_for_agent(agent_identifier)
                .await?;

            info!(
                "⚰️ [GRACE_EXPIRED]: Agent {} gone for {}s. Releasing {} task(s).",
                agent_identifier,
                elapsed.num_seconds(),
                abandoned_tasks.len()
            );

            for task in abandoned_tasks {
                let execution = state.job_repository.fetch_job(&task.job_execution_id).await?;

                state
                    .task_repository
                    .complete_task(
                        &task.id,
                        TaskStatus::Cancelled,
                        task.keyspace_processed,
                        Some("agent reconnect grace expired"),
                        now,
                    )
                    .await?;
                state.inflight_registry.remove(&task.id);

                state
                    .job_repository
                    .release_dispatch(
                        &execution.id,
                        &released_interval_from_task(&task, &execution),
                        now,
                    )
                    .await?;

                state.event_bus.broadcast_event(RealTimeEvent::TaskStopped {
                    task_id: task.id,
                    reason: StopReason::Timeout,
                });
            }

            state.agent_directory.clear_disconnect_mark(agent_identifier);
            state.signal_bus.emit(ReconcileSignal::TaskTerminal);
        }
        Ok(())
    }

    // --- VIGILANCIA 3: PROGRESO ESTANCADO ---

    /**
     * Cancela y re-encola tareas cuyo último progreso excede la
     * ventana de estancamiento (multiplicador × duración de chunk).
     */
    async fn recover_stalled_progress(&self) -> anyhow::Result<()> {
        let state = &self.application_shared_state;
        let now = state.clock.now();

        let stalled_entries = state
            .inflight_registry
            .stale_entries(now, state.config.progress_stale_multiplier);

        for stalled_entry in stalled_entries {
            warn!(
                "🐌 [PROGRESS_STALL]: Task {} silent beyond budget on agent {}.",
                stalled_entry.task_id, stalled_entry.agent_id
            );

            if let Err(dispatch_fault) = state.dispatcher.dispatch_to_agent(
                stalled_entry.agent_id,
                ServerMessage::StopTask {
                    task_id: stalled_entry.task_id,
                    reason: StopReason::Timeout,
                },
            ) {
                debug!("💤 [STALL_STOP_UNDELIVERED]: {}", dispatch_fault);
            }

            let task = state.task_repository.fetch_task(&stalled_entry.task_id).await?;
            state.inflight_registry.remove(&stalled_entry.task_id);

            if task.retry_count < state.config.max_task_retries {
                state
                    .task_repository
                    .requeue_for_retry(&stalled_entry.task_id, Some("progress stalled beyond budget"))
                    .await?;
            } else {
                state
                    .task_repository
                    .complete_task(
                        &stalled_entry.task_id,
                        TaskStatus::Failed,
                        task.keyspace_processed,
                        Some("progress stalled beyond retry budget"),
                        now,
                    )
                    .await?;

                let aggregated_cause = state
                    .job_repository
                    .aggregate_task_failures(&stalled_entry.job_execution_id)
                    .await?;
                if let Err(fail_fault) = state
                    .job_repository
                    .fail_job(&stalled_entry.job_execution_id, &aggregated_cause, now)
                    .await
                {
                    warn!("⚠️ [STALL_FAIL_BYPASS]: {}", fail_fault);
                }
            }

            state.signal_bus.emit(ReconcileSignal::TaskTerminal);
        }
        Ok(())
    }

    // --- VIGILANCIA 4: BENCHMARKS SIN RESPUESTA ---

    fn clear_unanswered_benchmark_flags(&self) {
        let state = &self.application_shared_state;
        let expired_agents = state.agent_directory.clear_stale_benchmark_flags(
            state.clock.now(),
            chrono::Duration::seconds(BENCHMARK_FLAG_TIMEOUT_SECONDS),
        );
        for agent_identifier in expired_agents {
            warn!(
                "⏱️ [BENCHMARK_TIMEOUT]: Agent {} never answered its measurement order.",
                agent_identifier
            );
            state.signal_bus.emit(ReconcileSignal::AgentStateChanged);
        }
    }
}
