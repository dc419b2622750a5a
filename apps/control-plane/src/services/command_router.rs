// [apps/control-plane/src/services/command_router.rs]
/*!
 * =================================================================
 * APARATO: TACTICAL COMMAND ROUTER (V6.0 - SILICON ALIGNMENT)
 * CLASIFICACIÓN: SERVICE LAYER (ESTRATO L4)
 * RESPONSABILIDAD: INTERPRETACIÓN Y EJECUCIÓN DE MANDOS DE OPERADOR
 *
 * VISION HIPER-HOLÍSTICA:
 * Actúa como el intérprete entre el enlace de operador (WebSocket) y
 * el núcleo de despacho. Garantiza que cada directiva se transforme
 * en una transición de estado auditada y trazable; el despacho en sí
 * permanece en manos exclusivas del reconciliador.
 * =================================================================
 */

use crate::services::dispatch::DispatchService;
use crate::services::ignition::ignite_job_execution;
use crate::services::signal_bus::ReconcileSignal;
use crate::state::AppState;
use anyhow::Context;
use kraken_domain_models::{JobExecutionStatus, RealTimeEvent, StopReason};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Gramática de mando distribuido del plano de control.
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "action", content = "payload")]
pub enum ControlCommand {
    /// Materializa una ejecución desde una plantilla.
    IgniteJob {
        preset_id: Uuid,
        hashlist_id: i64,
        name: Option<String>,
    },
    /// Suspende el despacho de nuevas tareas de una ejecución.
    PauseJob { job_execution_id: Uuid },
    /// Reanuda una ejecución pausada por el operador.
    ResumeJob { job_execution_id: Uuid },
    /// Cancela una ejecución y detiene sus tareas en vuelo.
    CancelJob { job_execution_id: Uuid },
    /// Evicción inmediata de benchmarks más allá de la retención.
    PurgeBenchmarks,
}

pub struct CommandRouter;

impl CommandRouter {
    /**
     * Procesa una directiva entrante y orquesta la transición.
     *
     * # Errors:
     * Una directiva malformada o una transición ilegal devuelven un
     * error contenido a la sesión de operador emisora.
     */
    #[instrument(skip(state, raw_json), fields(packet_len = raw_json.len()))]
    pub async fn dispatch(state: &AppState, raw_json: &str) -> anyhow::Result<()> {
        let command: ControlCommand = serde_json::from_str(raw_json)
            .context("STRATUM_L4_FAULT: Malformed operator directive received.")?;
        Self::execute(state, command).await
    }

    /// Ejecuta una directiva ya parseada (compartido con la API REST).
    pub async fn execute(state: &AppState, command: ControlCommand) -> anyhow::Result<()> {
        let now = state.clock.now();

        match command {
            ControlCommand::IgniteJob {
                preset_id,
                hashlist_id,
                name,
            } => {
                let execution =
                    ignite_job_execution(state, preset_id, hashlist_id, name).await?;
                info!(
                    "🧨 [C2_COMMAND]: Execution {} ignited from preset {}.",
                    execution.id, preset_id
                );
            }

            ControlCommand::PauseJob { job_execution_id } => {
                info!("⏸️ [C2_COMMAND]: Pausing execution {}.", job_execution_id);
                state
                    .job_repository
                    .pause_job(&job_execution_id, None, now)
                    .await?;
                state.event_bus.broadcast_event(RealTimeEvent::JobStateChanged {
                    job_execution_id,
                    status: JobExecutionStatus::Paused,
                });
            }

            ControlCommand::ResumeJob { job_execution_id } => {
                info!("▶️ [C2_COMMAND]: Resuming execution {}.", job_execution_id);
                state.job_repository.resume_job(&job_execution_id, now).await?;
                state.signal_bus.emit(ReconcileSignal::JobPriorityChanged);
            }

            ControlCommand::CancelJob { job_execution_id } => {
                warn!("🛑 [C2_COMMAND]: Cancelling execution {}.", job_execution_id);
                DispatchService::new(state.clone())
                    .stop_all_tasks_for_job(&job_execution_id, StopReason::JobCancelled)
                    .await?;
                state.job_repository.cancel_job(&job_execution_id, now).await?;
                state.event_bus.broadcast_event(RealTimeEvent::JobStateChanged {
                    job_execution_id,
                    status: JobExecutionStatus::Cancelled,
                });
                state.signal_bus.emit(ReconcileSignal::TaskTerminal);
            }

            ControlCommand::PurgeBenchmarks => {
                warn!("🔥 [C2_COMMAND]: Administrative benchmark purge initiated.");
                let retention_cutoff = now - state.config.benchmark_retention();
                state
                    .benchmark_repository
                    .cleanup_older_than(retention_cutoff)
                    .await?;
            }
        }

        Ok(())
    }
}
