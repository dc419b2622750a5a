// [apps/control-plane/src/handlers/ops.rs]
/*!
 * =================================================================
 * APARATO: OPERATOR SURFACE HANDLER (V10.0)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: IGNICIÓN DE CAMPAÑAS Y VISIBILIDAD DE FLOTA
 *
 * # Logic:
 * La superficie REST del operador transforma peticiones en las
 * mismas directivas del router de mando. Ninguna ruta despacha
 * trabajo: las transiciones despiertan al reconciliador.
 * =================================================================
 */

use crate::services::command_router::{CommandRouter, ControlCommand};
use crate::services::ignition::ignite_job_execution;
use crate::state::AppState;
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::{error, instrument};
use uuid::Uuid;

/// Payload de ignición de una ejecución desde plantilla.
#[derive(Debug, Deserialize)]
pub struct IgniteJobPayload {
    pub preset_id: Uuid,
    pub hashlist_id: i64,
    pub name: Option<String>,
}

/// Instantánea de flota para la consola de operadores.
#[derive(Debug, Serialize)]
pub struct FleetStatusReport {
    pub connected_agents: Vec<i64>,
    pub in_flight_tasks: usize,
    pub ready_jobs: Vec<ReadyJobSummary>,
}

#[derive(Debug, Serialize)]
pub struct ReadyJobSummary {
    pub id: Uuid,
    pub name: String,
    pub status: String,
    pub priority: i64,
    pub overall_progress_percent: f64,
}

pub struct OperationsHandler;

impl OperationsHandler {
    /**
     * Endpoint: POST /api/v1/jobs/ignite
     * Materializa una ejecución y despierta al reconciliador.
     */
    #[instrument(skip(application_state, payload), fields(preset = %payload.preset_id))]
    pub async fn handle_ignite_job(
        State(application_state): State<AppState>,
        Json(payload): Json<IgniteJobPayload>,
    ) -> impl IntoResponse {
        match ignite_job_execution(
            &application_state,
            payload.preset_id,
            payload.hashlist_id,
            payload.name,
        )
        .await
        {
            Ok(execution) => (StatusCode::CREATED, Json(execution)).into_response(),
            Err(ignition_fault) => {
                error!("❌ [IGNITION_FAULT]: {}", ignition_fault);
                (StatusCode::UNPROCESSABLE_ENTITY, ignition_fault.to_string()).into_response()
            }
        }
    }

    /// Endpoint: POST /api/v1/jobs/:id/pause
    pub async fn handle_pause_job(
        State(application_state): State<AppState>,
        Path(job_execution_id): Path<Uuid>,
    ) -> impl IntoResponse {
        Self::route_command(
            &application_state,
            ControlCommand::PauseJob { job_execution_id },
        )
        .await
    }

    /// Endpoint: POST /api/v1/jobs/:id/resume
    pub async fn handle_resume_job(
        State(application_state): State<AppState>,
        Path(job_execution_id): Path<Uuid>,
    ) -> impl IntoResponse {
        Self::route_command(
            &application_state,
            ControlCommand::ResumeJob { job_execution_id },
        )
        .await
    }

    /// Endpoint: POST /api/v1/jobs/:id/cancel
    pub async fn handle_cancel_job(
        State(application_state): State<AppState>,
        Path(job_execution_id): Path<Uuid>,
    ) -> impl IntoResponse {
        Self::route_command(
            &application_state,
            ControlCommand::CancelJob { job_execution_id },
        )
        .await
    }

    /**
     * Endpoint: GET /api/v1/status
     * Instantánea íntegra de la flota y la cola de campañas.
     */
    #[instrument(skip(application_state))]
    pub async fn handle_fleet_status(
        State(application_state): State<AppState>,
    ) -> impl IntoResponse {
        let ready_jobs = match application_state.job_repository.pick_next_ready(&[], 50).await {
            Ok(queue) => queue
                .into_iter()
                .map(|execution| ReadyJobSummary {
                    id: execution.id,
                    name: execution.name,
                    status: execution.status.as_label().to_string(),
                    priority: execution.priority,
                    overall_progress_percent: execution.overall_progress_percent,
                })
                .collect(),
            Err(query_fault) => {
                error!("❌ [STATUS_FAULT]: {}", query_fault);
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };

        let report = FleetStatusReport {
            connected_agents: application_state
                .agent_directory
                .connected_agent_identifiers(),
            in_flight_tasks: application_state.inflight_registry.total_in_flight(),
            ready_jobs,
        };

        (StatusCode::OK, Json(report)).into_response()
    }

    /// Endpoint: GET /healthz
    pub async fn handle_health_probe() -> impl IntoResponse {
        (StatusCode::OK, "OK")
    }

    async fn route_command(
        application_state: &AppState,
        command: ControlCommand,
    ) -> axum::response::Response {
        match CommandRouter::execute(application_state, command).await {
            Ok(()) => StatusCode::ACCEPTED.into_response(),
            Err(command_fault) => {
                error!("❌ [COMMAND_FAULT]: {}", command_fault);
                (StatusCode::CONFLICT, command_fault.to_string()).into_response()
            }
        }
    }
}
