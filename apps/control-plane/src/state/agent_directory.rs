// [apps/control-plane/src/state/agent_directory.rs]
/*!
 * =================================================================
 * APARATO: AGENT LINK DIRECTORY (V12.0 - FIFO SOVEREIGN)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L1-APP)
 * RESPONSABILIDAD: REGISTRO VIVO DE ENLACES Y CAPACIDAD DE DESPACHO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. NARROW CAPABILITY: El directorio implementa la capacidad
 *    'Dispatcher' que consume el reconciliador. El manejador de
 *    WebSocket posee el canal; ninguna lógica de scheduling vive aquí.
 * 2. FIFO GUARANTEE: Un único canal mpsc por agente preserva el
 *    orden de envío; 'stop_task' jamás se reordena tras un
 *    'assign_task' posterior.
 *
 * # Mathematical Proof (Send Ordering):
 * Todo mensaje saliente hacia un agente atraviesa exactamente un
 * canal mpsc cuyo consumidor único es el escritor de socket de la
 * sesión. La linealidad del canal induce la linealidad del cable.
 * =================================================================
 */

use crate::services::dispatch::{DispatchFault, Dispatcher};
use chrono::{DateTime, Utc};
use kraken_domain_models::ServerMessage;
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Capacidad del buffer de salida por agente.
const OUTBOUND_CHANNEL_CAPACITY: usize = 64;

/// Enlace vivo de un agente conectado.
struct AgentLink {
    outbound_sender: mpsc::Sender<ServerMessage>,
    benchmarking_since: Option<DateTime<Utc>>,
}

pub struct AgentDirectory {
    live_links: RwLock<HashMap<i64, AgentLink>>,
    /// Marcas de desconexión pendientes de gracia de reconexión.
    disconnect_marks: RwLock<HashMap<i64, DateTime<Utc>>>,
}

impl Default for AgentDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentDirectory {
    pub fn new() -> Self {
        Self {
            live_links: RwLock::new(HashMap::new()),
            disconnect_marks: RwLock::new(HashMap::new()),
        }
    }

    /**
     * Registra el enlace de una sesión recién autenticada y devuelve
     * el receptor que el escritor de socket debe drenar.
     */
    pub fn register_link(&self, agent_identifier: i64) -> mpsc::Receiver<ServerMessage> {
        let (outbound_sender, outbound_receiver) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);

        let mut links_guard = self.live_links.write().expect("DIRECTORY_LOCK_POISONED");
        links_guard.insert(
            agent_identifier,
            AgentLink {
                outbound_sender,
                benchmarking_since: None,
            },
        );

        let mut marks_guard = self.disconnect_marks.write().expect("DIRECTORY_LOCK_POISONED");
        marks_guard.remove(&agent_identifier);

        debug!("🔗 [DIRECTORY]: Agent {} link registered.", agent_identifier);
        outbound_receiver
    }

    /// Corta el enlace vivo y sella la marca de desconexión.
    pub fn sever_link(&self, agent_identifier: i64, now: DateTime<Utc>) {
        let mut links_guard = self.live_links.write().expect("DIRECTORY_LOCK_POISONED");
        links_guard.remove(&agent_identifier);

        let mut marks_guard = self.disconnect_marks.write().expect("DIRECTORY_LOCK_POISONED");
        marks_guard.insert(agent_identifier, now);

        warn!("🔌 [DIRECTORY]: Agent {} link severed.", agent_identifier);
    }

    pub fn is_connected(&self, agent_identifier: i64) -> bool {
        let links_guard = self.live_links.read().expect("DIRECTORY_LOCK_POISONED");
        links_guard.contains_key(&agent_identifier)
    }

    pub fn connected_agent_identifiers(&self) -> Vec<i64> {
        let links_guard = self.live_links.read().expect("DIRECTORY_LOCK_POISONED");
        links_guard.keys().copied().collect()
    }

    /// Tiempo transcurrido desde la desconexión, si el agente está caído.
    pub fn disconnect_elapsed(
        &self,
        agent_identifier: i64,
        now: DateTime<Utc>,
    ) -> Option<chrono::Duration> {
        let marks_guard = self.disconnect_marks.read().expect("DIRECTORY_LOCK_POISONED");
        marks_guard
            .get(&agent_identifier)
            .map(|disconnected_at| now - *disconnected_at)
    }

    /// Agentes con marca de desconexión vigente.
    pub fn disconnected_agent_identifiers(&self) -> Vec<i64> {
        let marks_guard = self.disconnect_marks.read().expect("DIRECTORY_LOCK_POISONED");
        marks_guard.keys().copied().collect()
    }

    pub fn clear_disconnect_mark(&self, agent_identifier: i64) {
        let mut marks_guard = self.disconnect_marks.write().expect("DIRECTORY_LOCK_POISONED");
        marks_guard.remove(&agent_identifier);
    }

    // --- ESTRATO DE BENCHMARKING EN VUELO ---

    pub fn mark_benchmarking(&self, agent_identifier: i64, now: DateTime<Utc>) {
        let mut links_guard = self.live_links.write().expect("DIRECTORY_LOCK_POISONED");
        if let Some(link) = links_guard.get_mut(&agent_identifier) {
            link.benchmarking_since = Some(now);
        }
    }

    pub fn clear_benchmarking(&self, agent_identifier: i64) {
        let mut links_guard = self.live_links.write().expect("DIRECTORY_LOCK_POISONED");
        if let Some(link) = links_guard.get_mut(&agent_identifier) {
            link.benchmarking_since = None;
        }
    }

    pub fn is_benchmarking(&self, agent_identifier: i64) -> bool {
        let links_guard = self.live_links.read().expect("DIRECTORY_LOCK_POISONED");
        links_guard
            .get(&agent_identifier)
            .map(|link| link.benchmarking_since.is_some())
            .unwrap_or(false)
    }

    /// Limpia solicitudes de benchmark sin respuesta dentro del plazo.
    pub fn clear_stale_benchmark_flags(
        &self,
        now: DateTime<Utc>,
        request_timeout: chrono::Duration,
    ) -> Vec<i64> {
        let mut links_guard = self.live_links.write().expect("DIRECTORY_LOCK_POISONED");
        let mut expired_agents = Vec::new();
        for (agent_identifier, link) in links_guard.iter_mut() {
            if let Some(requested_at) = link.benchmarking_since {
                if now - requested_at > request_timeout {
                    link.benchmarking_since = None;
                    expired_agents.push(*agent_identifier);
                }
            }
        }
        expired_agents
    }
}

impl Dispatcher for AgentDirectory {
    /**
     * Encola un mensaje saliente preservando el orden FIFO por agente.
     *
     * # Errors:
     * - `LinkAbsent`: el agente no tiene sesión viva.
     * - `ChannelSaturated`: el buffer de salida está colmado; la
     *   sesión se considera degradada y el llamador decide.
     */
    fn dispatch_to_agent(
        &self,
        agent_identifier: i64,
        message: ServerMessage,
    ) -> Result<(), DispatchFault> {
        let links_guard = self.live_links.read().expect("DIRECTORY_LOCK_POISONED");
        let link = links_guard
            .get(&agent_identifier)
            .ok_or(DispatchFault::LinkAbsent(agent_identifier))?;

        link.outbound_sender.try_send(message).map_err(|send_fault| {
            warn!(
                "🐢 [DIRECTORY]: Outbound buffer rejected message for agent {}: {}",
                agent_identifier, send_fault
            );
            DispatchFault::ChannelSaturated(agent_identifier)
        })
    }
}
