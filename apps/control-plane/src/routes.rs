// [apps/control-plane/src/routes.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN ROUTING MATRIX (V12.0 - GATEWAY ALIGNED)
 * CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
 * RESPONSABILIDAD: TOPOLOGÍA DE RED DEL PLANO DE CONTROL
 *
 * VISION HIPER-HOLÍSTICA:
 * La topología soporta:
 * 1. WebSocket de Agentes (canal persistente bidireccional).
 * 2. WebSocket de Operadores (eventos en tiempo real y mando).
 * 3. REST Táctico (ignición y transiciones de campañas).
 * 4. Pasarela de Descargas (Range-ready, ETag de integridad).
 * =================================================================
 */

use crate::handlers::{agent_link, events_link, files::FileGatewayHandler, ops::OperationsHandler};
use crate::state::AppState;
use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

pub fn create_control_plane_router(application_shared_state: AppState) -> Router {
    // Escudo de red: CORS para la consola de operadores.
    let network_security_shield = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::RANGE])
        .max_age(Duration::from_secs(3600));

    // ESTRATO TÁCTICO: Operaciones sobre campañas.
    let campaign_operations_stratum = Router::new()
        .route("/jobs/ignite", post(OperationsHandler::handle_ignite_job))
        .route("/jobs/:id/pause", post(OperationsHandler::handle_pause_job))
        .route("/jobs/:id/resume", post(OperationsHandler::handle_resume_job))
        .route("/jobs/:id/cancel", post(OperationsHandler::handle_cancel_job))
        .route("/status", get(OperationsHandler::handle_fleet_status));

    Router::new()
        // Canal persistente de agentes
        .route("/ws/agent", get(agent_link::establish_agent_uplink))
        // Canal de consolas de operador
        .route("/ws/events", get(events_link::establish_operator_uplink))
        // Pasarela de archivos distribuibles
        .route(
            "/files/:kind/:category/:filename",
            get(FileGatewayHandler::download_distributable),
        )
        // Superficie REST de operador
        .nest("/api/v1", campaign_operations_stratum)
        // Sonda de vida del proceso
        .route("/healthz", get(OperationsHandler::handle_health_probe))
        .layer(network_security_shield)
        .with_state(application_shared_state)
}
