// [apps/control-plane/src/handlers/events_link.rs]
/*!
 * =================================================================
 * APARATO: OPERATOR NEURAL SOCKET (V11.0 - ZENITH GOLD MASTER)
 * CLASIFICACIÓN: API HANDLER (ESTRATO L4)
 * RESPONSABILIDAD: ENLACE FULL-DUPLEX DE CONSOLAS DE OPERADOR
 *
 * # Mathematical Proof (Asynchronous Determinism):
 * La sesión usa un canal mpsc interno para desacoplar la recepción
 * de red de la ejecución lógica: el procesamiento de una directiva
 * pesada en el Ledger no bloquea el flujo de eventos en tiempo real.
 * =================================================================
 */

use crate::services::command_router::CommandRouter;
use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Intervalo de latido (Keep-Alive) hacia la consola.
const KEEPALIVE_INTERVAL_SECONDS: u64 = 25;

/// Capacidad del buffer de mando interno.
const COMMAND_BUFFER_CAPACITY: usize = 32;

/**
 * Punto de entrada para la negociación del enlace de operador.
 */
#[instrument(skip(websocket_upgrade, application_state))]
pub async fn establish_operator_uplink(
    websocket_upgrade: WebSocketUpgrade,
    State(application_state): State<AppState>,
) -> impl IntoResponse {
    debug!("🔌 [OPERATOR_UPGRADE]: Negotiating protocol transition for console...");
    websocket_upgrade.on_upgrade(move |socket| handle_operator_session(socket, application_state))
}

/**
 * Orquestador de la sesión de consola: Triple Tarea (worker interno,
 * downstream de eventos, upstream de directivas).
 */
async fn handle_operator_session(socket: WebSocket, application_state: AppState) {
    let (mut socket_sender, mut socket_receiver) = socket.split();
    let mut event_bus_subscriber = application_state.event_bus.subscribe();

    let session_identifier = Uuid::new_v4().to_string();
    info!("⚡ [CONSOLE_OPEN]: Operator session {} established.", session_identifier);

    // --- CANAL DE MANDO INTERNO (DESACOPLAMIENTO) ---
    let (command_transmission_sender, mut command_reception_receiver) =
        mpsc::channel::<String>(COMMAND_BUFFER_CAPACITY);

    // --- TAREA 1: WORKER TÁCTICO INTERNO ---
    let application_state_for_worker = application_state.clone();
    let session_identifier_worker = session_identifier.clone();
    let mut worker_execution_task = tokio::spawn(async move {
        while let Some(command_payload) = command_reception_receiver.recv().await {
            if let Err(execution_fault) =
                CommandRouter::dispatch(&application_state_for_worker, &command_payload).await
            {
                error!(
                    "⚠️ [C2_FAULT]: Directive rejected in session {}: {}",
                    session_identifier_worker, execution_fault
                );
            }
        }
    });

    // --- TAREA 2: DOWNSTREAM (Server -> Console) ---
    let session_identifier_downstream = session_identifier.clone();
    let mut downstream_transmission_task = tokio::spawn(async move {
        let mut keepalive_timer = interval(Duration::from_secs(KEEPALIVE_INTERVAL_SECONDS));

        loop {
            tokio::select! {
                _ = keepalive_timer.tick() => {
                    if socket_sender.send(Message::Ping(vec![])).await.is_err() {
                        break;
                    }
                },

                bus_reception = event_bus_subscriber.recv() => {
                    match bus_reception {
                        Ok(real_time_event) => {
                            match serde_json::to_string(&real_time_event) {
                                Ok(event_frame) => {
                                    if socket_sender.send(Message::Text(event_frame)).await.is_err() {
                                        warn!(
                                            "⚠️ [CONSOLE_SEVERED]: Session {} lost downstream.",
                                            session_identifier_downstream
                                        );
                                        break;
                                    }
                                }
                                Err(serialization_fault) => {
                                    error!("💀 [EVENT_FRAME_FAULT]: {}", serialization_fault);
                                }
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(missed_frames)) => {
                            warn!(
                                "🐢 [CONSOLE_LAG]: Session {} skipped {} frames.",
                                session_identifier_downstream, missed_frames
                            );
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                            break;
                        }
                    }
                },
            }
        }
    });

    // --- TAREA 3: UPSTREAM (Console -> Server) ---
    let session_identifier_upstream = session_identifier.clone();
    let mut upstream_ingestion_task = tokio::spawn(async move {
        while let Some(network_read) = socket_receiver.next().await {
            match network_read {
                Ok(Message::Text(raw_directive)) => {
                    if command_transmission_sender.send(raw_directive).await.is_err() {
                        error!(
                            "❌ [COMMAND_QUEUE_FAULT]: Buffer collapsed for {}.",
                            session_identifier_upstream
                        );
                        break;
                    }
                }
                Ok(Message::Close(_)) => break,
                Err(_) => break,
                _ => {}
            }
        }
    });

    // --- LIMPIEZA ATÓMICA DE SESIÓN ---
    tokio::select! {
        _ = (&mut downstream_transmission_task) => {
            upstream_ingestion_task.abort();
            worker_execution_task.abort();
        },
        _ = (&mut upstream_ingestion_task) => {
            downstream_transmission_task.abort();
            worker_execution_task.abort();
        },
        _ = (&mut worker_execution_task) => {
            downstream_transmission_task.abort();
            upstream_ingestion_task.abort();
        },
    };

    info!("💀 [CONSOLE_TERMINATED]: Session {} resources released.", session_identifier);
}
