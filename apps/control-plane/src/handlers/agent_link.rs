// [apps/control-plane/src/handlers/agent_link.rs]
/*!
 * =================================================================
 * APARATO: AGENT NEURAL UPLINK HANDLER (V24.0 - ZENITH GOLD MASTER)
 * CLASIFICACIÓN: API HANDLER (ESTRATO L4)
 * RESPONSABILIDAD: SESIÓN PERSISTENTE FULL-DUPLEX POR AGENTE
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. RESOURCE SOVEREIGNTY: Orquestación de doble tarea (escritor y
 *    lector) con limpieza determinista vía AbortHandles.
 * 2. ORDERING DISCIPLINE: Los mensajes entrantes se procesan en
 *    orden de llegada; los salientes drenan un único canal FIFO.
 *    Los manejadores de ingesta jamás despachan: señalizan al
 *    reconciliador.
 * 3. ZERO ABBREVIATIONS: Erradicación de 'tx', 'rx' y 'ws' por
 *    descriptores nominales de la física del sistema.
 *
 * # Mathematical Proof (Session State Machine):
 * disconnected --hello--> authenticating --ok--> connected.
 * La sesión exige 'hello' como primer mensaje dentro del plazo de
 * handshake; cualquier otra trama colapsa la negociación sin tocar
 * el estado de la flota.
 * =================================================================
 */

use crate::services::benchmark_registry::BenchmarkRegistryService;
use crate::services::dispatch::{DispatchService, Dispatcher};
use crate::services::hashlist_sync::HashlistSyncService;
use crate::services::recovery::quarantine_agent_link;
use crate::services::signal_bus::ReconcileSignal;
use crate::state::{AppState, InFlightEntry};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::stream::SplitStream;
use futures::{sink::SinkExt, stream::StreamExt};
use kraken_domain_models::{
    Agent, AgentMessage, AgentStatus, DeviceStatusReport, RealTimeEvent, ServerMessage,
    WireEnvelope,
};
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, error, info, instrument, warn};

/// Plazo del handshake 'hello' antes de abortar la negociación.
const HELLO_HANDSHAKE_TIMEOUT_SECONDS: u64 = 10;

/// Intervalo de latido físico (Ping) del socket.
/// Sintonizado para prevenir cierres por inactividad en proxies L7.
const KEEPALIVE_INTERVAL_SECONDS: u64 = 25;

/**
 * Punto de entrada para la negociación del uplink de agente.
 * Realiza la transición de protocolo HTTP a WebSocket (RFC 6455).
 */
#[instrument(skip(websocket_upgrade, application_state))]
pub async fn establish_agent_uplink(
    websocket_upgrade: WebSocketUpgrade,
    State(application_state): State<AppState>,
) -> impl IntoResponse {
    debug!("🔌 [AGENT_UPGRADE]: Negotiating protocol transition for incoming agent...");
    websocket_upgrade.on_upgrade(move |socket| handle_agent_session(socket, application_state))
}

/**
 * Orquestador soberano de la sesión de agente: handshake, doble
 * tarea (escritor FIFO + lector en orden de llegada) y cuarentena.
 */
async fn handle_agent_session(socket: WebSocket, application_state: AppState) {
    let (mut socket_sender, mut socket_receiver) = socket.split();

    // --- FASE 1: HANDSHAKE 'HELLO' ---
    let authenticated_agent = match negotiate_hello_handshake(
        &application_state,
        &mut socket_receiver,
    )
    .await
    {
        Some(agent) => agent,
        None => {
            let _ = socket_sender.close().await;
            return;
        }
    };
    let agent_identifier = authenticated_agent.id;

    info!("⚡ [UPLINK_OPEN]: Agent {} session established.", agent_identifier);

    // --- FASE 2: REGISTRO DE ENLACE Y RECUPERACIÓN EN GRACIA ---
    let mut outbound_reception_channel = application_state
        .agent_directory
        .register_link(agent_identifier);

    if let Err(restoration_fault) =
        restore_session_state(&application_state, agent_identifier).await
    {
        error!(
            "❌ [SESSION_RESTORE_FAULT]: Agent {}: {}",
            agent_identifier, restoration_fault
        );
    }

    let greeting_directive = ServerMessage::ConfigUpdate {
        heartbeat_interval_s: application_state.config.heartbeat_interval_s,
        chunk_duration_s_default: application_state.config.default_chunk_duration_s,
    };
    if let Err(greeting_fault) = application_state
        .agent_directory
        .dispatch_to_agent(agent_identifier, greeting_directive)
    {
        warn!("⚠️ [GREETING_FAULT]: {}", greeting_fault);
    }

    application_state
        .event_bus
        .broadcast_event(RealTimeEvent::AgentLinkChanged {
            agent_id: agent_identifier,
            connected: true,
        });
    application_state
        .signal_bus
        .emit(ReconcileSignal::AgentStateChanged);

    // --- TAREA 1: ESCRITOR FIFO (Server -> Agent) ---
    let clock_for_writer = application_state.clock.clone();
    let mut outbound_writer_task = tokio::spawn(async move {
        let mut keepalive_timer = interval(Duration::from_secs(KEEPALIVE_INTERVAL_SECONDS));

        loop {
            tokio::select! {
                // Brazo 1: pulso físico de vida (Ping-Pong)
                _ = keepalive_timer.tick() => {
                    if socket_sender.send(Message::Ping(vec![])).await.is_err() {
                        break;
                    }
                },

                // Brazo 2: drenaje del canal FIFO de salida
                outbound_message = outbound_reception_channel.recv() => {
                    match outbound_message {
                        Some(server_message) => {
                            let sealed_envelope =
                                WireEnvelope::seal(server_message, clock_for_writer.now());
                            match serde_json::to_string(&sealed_envelope) {
                                Ok(wire_frame) => {
                                    if socket_sender.send(Message::Text(wire_frame)).await.is_err() {
                                        break;
                                    }
                                }
                                Err(serialization_fault) => {
                                    error!("💀 [WIRE_FAULT]: Outbound frame rejected: {}", serialization_fault);
                                }
                            }
                        }
                        None => break,
                    }
                },
            }
        }
    });

    // --- TAREA 2: LECTOR EN ORDEN DE LLEGADA (Agent -> Server) ---
    let application_state_for_reader = application_state.clone();
    let mut inbound_ingestion_task = tokio::spawn(async move {
        while let Some(network_read_result) = socket_receiver.next().await {
            match network_read_result {
                Ok(Message::Text(raw_frame)) => {
                    let envelope: WireEnvelope<AgentMessage> =
                        match serde_json::from_str(&raw_frame) {
                            Ok(parsed_envelope) => parsed_envelope,
                            Err(grammar_fault) => {
                                // Fallo de agente: sesión terminada y
                                // nodo marcado en error.
                                error!(
                                    "💀 [AGENT_FAULT]: Agent {} emitted malformed frame: {}",
                                    agent_identifier, grammar_fault
                                );
                                let _ = application_state_for_reader
                                    .agent_repository
                                    .set_status(agent_identifier, AgentStatus::Error)
                                    .await;
                                break;
                            }
                        };

                    if let Err(ingestion_fault) = process_agent_message(
                        &application_state_for_reader,
                        agent_identifier,
                        envelope.body,
                    )
                    .await
                    {
                        warn!(
                            "⚠️ [INGEST_FAULT]: Agent {} message deferred: {}",
                            agent_identifier, ingestion_fault
                        );
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("🔌 [SOCKET_CLOSE]: Agent {} sent termination.", agent_identifier);
                    break;
                }
                Err(physical_layer_fault) => {
                    warn!(
                        "❌ [UPLINK_FAULT]: Agent {} network error: {}",
                        agent_identifier, physical_layer_fault
                    );
                    break;
                }
                _ => {} // Binary y Pong se descartan en este estrato.
            }
        }
    });

    // --- LIMPIEZA ATÓMICA DE SESIÓN ---
    tokio::select! {
        _ = (&mut outbound_writer_task) => {
            inbound_ingestion_task.abort();
        },
        _ = (&mut inbound_ingestion_task) => {
            outbound_writer_task.abort();
        },
    };

    let disconnection_instant = application_state.clock.now();
    if let Err(quarantine_fault) =
        quarantine_agent_link(&application_state, agent_identifier, disconnection_instant).await
    {
        error!(
            "❌ [QUARANTINE_FAULT]: Agent {}: {}",
            agent_identifier, quarantine_fault
        );
    }

    info!(
        "💀 [UPLINK_TERMINATED]: Agent {} session resources released.",
        agent_identifier
    );
}

/**
 * Exige y valida el primer mensaje 'hello' de la sesión.
 * Cualquier desviación de protocolo o credencial aborta en silencio.
 */
async fn negotiate_hello_handshake(
    application_state: &AppState,
    socket_receiver: &mut SplitStream<WebSocket>,
) -> Option<Agent> {
    let first_frame = tokio::time::timeout(
        Duration::from_secs(HELLO_HANDSHAKE_TIMEOUT_SECONDS),
        socket_receiver.next(),
    )
    .await;

    let raw_frame = match first_frame {
        Ok(Some(Ok(Message::Text(raw_frame)))) => raw_frame,
        Ok(_) => {
            warn!("🛡️ [HANDSHAKE_VETO]: Non-text first frame. Session rejected.");
            return None;
        }
        Err(_) => {
            warn!("⏱️ [HANDSHAKE_TIMEOUT]: No hello within budget. Session rejected.");
            return None;
        }
    };

    let envelope: WireEnvelope<AgentMessage> = match serde_json::from_str(&raw_frame) {
        Ok(parsed_envelope) => parsed_envelope,
        Err(grammar_fault) => {
            warn!("🛡️ [HANDSHAKE_VETO]: Malformed hello: {}", grammar_fault);
            return None;
        }
    };

    let (agent_identifier, api_key, agent_version, declared_devices) = match envelope.body {
        AgentMessage::Hello {
            agent_id,
            api_key,
            version,
            devices,
            ..
        } => (agent_id, api_key, version, devices),
        _ => {
            warn!("🛡️ [HANDSHAKE_VETO]: First frame was not 'hello'.");
            return None;
        }
    };

    let agent = match application_state
        .agent_repository
        .verify_credentials(agent_identifier, &api_key)
        .await
    {
        Ok(agent) => agent,
        Err(credential_fault) => {
            warn!(
                "🛡️ [AUTH_VETO]: Agent {} rejected: {}",
                agent_identifier, credential_fault
            );
            return None;
        }
    };

    if agent.status == AgentStatus::Disabled {
        warn!("🛡️ [AUTH_VETO]: Agent {} is administratively disabled.", agent_identifier);
        return None;
    }

    let now = application_state.clock.now();
    let _ = application_state
        .agent_repository
        .update_devices(agent_identifier, &declared_devices)
        .await;
    let _ = application_state
        .agent_repository
        .record_heartbeat(agent_identifier, now)
        .await;
    let _ = application_state
        .agent_repository
        .set_status(agent_identifier, AgentStatus::Active)
        .await;

    debug!(
        "🤝 [HANDSHAKE_SEALED]: Agent {} (version {}) authenticated with {} device(s).",
        agent_identifier,
        agent_version,
        declared_devices.len()
    );
    Some(agent)
}

/**
 * Restaura el estado de sesión de un agente que reconectó dentro de
 * la gracia: sus tareas suspendidas vuelven a 'running' y el caché
 * caliente se rehidrata.
 */
async fn restore_session_state(
    application_state: &AppState,
    agent_identifier: i64,
) -> anyhow::Result<()> {
    let now = application_state.clock.now();

    let restored_tasks = application_state
        .task_repository
        .restore_reconnect_pending(agent_identifier)
        .await?;

    if !restored_tasks.is_empty() {
        info!(
            "🔄 [GRACE_RECOVERY]: Agent {} reclaimed {} suspended task(s).",
            agent_identifier,
            restored_tasks.len()
        );
    }

    for task in application_state
        .task_repository
        .in_flight_for_agent(agent_identifier)
        .await?
    {
        let execution = application_state
            .job_repository
            .fetch_job(&task.job_execution_id)
            .await?;

        application_state.inflight_registry.insert(InFlightEntry {
            task_id: task.id,
            agent_id: agent_identifier,
            job_execution_id: task.job_execution_id,
            hashlist_id: execution.hashlist_id,
            chunk_duration_seconds: task.chunk_duration_seconds,
            created_at: task.assigned_at.unwrap_or(now),
            last_progress_at: now,
        });
    }

    Ok(())
}

/**
 * Ruteo semántico de mensajes entrantes hacia los servicios de
 * ingesta. Ninguna rama despacha trabajo: todas señalizan.
 */
async fn process_agent_message(
    application_state: &AppState,
    agent_identifier: i64,
    message: AgentMessage,
) -> anyhow::Result<()> {
    match message {
        AgentMessage::Hello { .. } => {
            debug!("♻️ [PROTOCOL]: Redundant hello from agent {} ignored.", agent_identifier);
            Ok(())
        }

        AgentMessage::Heartbeat {
            active_task_ids, ..
        } => {
            let now = application_state.clock.now();
            application_state
                .agent_repository
                .record_heartbeat(agent_identifier, now)
                .await?;

            let tracked_count = application_state
                .inflight_registry
                .entries_for_agent(agent_identifier)
                .len();
            if tracked_count != active_task_ids.len() {
                debug!(
                    "🩺 [HEARTBEAT_DRIFT]: Agent {} reports {} task(s), ledger tracks {}.",
                    agent_identifier,
                    active_task_ids.len(),
                    tracked_count
                );
            }
            Ok(())
        }

        AgentMessage::BenchmarkResult {
            attack_mode,
            hash_type,
            speed_hps,
        } => {
            BenchmarkRegistryService::new(application_state.clone())
                .record_result(agent_identifier, attack_mode, hash_type, speed_hps)
                .await
        }

        AgentMessage::TaskProgress {
            task_id,
            keyspace_processed,
            percent,
            speed_hps,
        } => {
            DispatchService::new(application_state.clone())
                .ingest_progress(agent_identifier, task_id, keyspace_processed, percent, speed_hps)
                .await
        }

        AgentMessage::TaskComplete {
            task_id,
            outcome,
            final_processed,
            error,
        } => {
            DispatchService::new(application_state.clone())
                .ingest_completion(agent_identifier, task_id, outcome, final_processed, error)
                .await
        }

        AgentMessage::CrackReport {
            task_id,
            hashlist_id,
            entries,
        } => {
            DispatchService::new(application_state.clone())
                .ingest_crack_report(agent_identifier, task_id, hashlist_id, entries)
                .await
        }

        AgentMessage::FileSyncComplete {
            kind,
            id,
            version_hash,
        } => {
            HashlistSyncService::new(application_state.clone())
                .handle_sync_complete(agent_identifier, kind, id, &version_hash)
                .await
        }

        AgentMessage::FileSyncFailed { kind, id, reason } => {
            HashlistSyncService::new(application_state.clone())
                .handle_sync_failure(agent_identifier, kind, id, &reason)
                .await
        }

        AgentMessage::DeviceStatusChanged { devices } => {
            apply_device_status_mutation(application_state, agent_identifier, &devices).await
        }
    }
}

/// Sincroniza el inventario de dispositivos con el reporte del agente.
async fn apply_device_status_mutation(
    application_state: &AppState,
    agent_identifier: i64,
    device_reports: &[DeviceStatusReport],
) -> anyhow::Result<()> {
    let mut agent = application_state
        .agent_repository
        .fetch_agent(agent_identifier)
        .await?;

    for report in device_reports {
        if let Some(device) = agent
            .devices
            .iter_mut()
            .find(|device| device.index == report.index)
        {
            device.enabled = report.enabled;
        }
    }

    application_state
        .agent_repository
        .update_devices(agent_identifier, &agent.devices)
        .await?;
    application_state
        .signal_bus
        .emit(ReconcileSignal::AgentStateChanged);
    Ok(())
}
