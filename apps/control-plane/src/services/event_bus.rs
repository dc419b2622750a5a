// [apps/control-plane/src/services/event_bus.rs]
/*!
 * =================================================================
 * APARATO: NEURAL EVENT BUS SERVICE (V14.0 - BROADCASTER MASTER)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: DIFUSIÓN SOBERANA DE SEÑALES EN TIEMPO REAL
 *
 * # Mathematical Proof (Signal Propagation):
 * El Bus garantiza un tiempo de despacho O(1) independientemente del
 * número de receptores. La pérdida de un suscriptor no afecta el
 * determinismo del reactor asíncrono principal (Lock-Free Emission).
 * =================================================================
 */

use kraken_domain_models::{RealTimeEvent, SystemLog};
use tokio::sync::broadcast;
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

/// Capacidad del canal de difusión soberano.
/// Sintonizado para absorber ráfagas masivas sin disparar 'Lagging'.
const SOVEREIGN_CHANNEL_CAPACITY: usize = 4096;

/**
 * Orquestador central de señales en tiempo real hacia operadores.
 */
#[derive(Debug, Clone)]
pub struct EventBus {
    internal_transmission_channel: broadcast::Sender<RealTimeEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(SOVEREIGN_CHANNEL_CAPACITY);
        Self {
            internal_transmission_channel: sender,
        }
    }

    /// Genera un nuevo receptor para el túnel de WebSockets de operador.
    pub fn subscribe(&self) -> broadcast::Receiver<RealTimeEvent> {
        self.internal_transmission_channel.subscribe()
    }

    /// Difunde un evento táctico a todas las consolas suscritas.
    pub fn broadcast_event(&self, event_artifact: RealTimeEvent) {
        match self.internal_transmission_channel.send(event_artifact) {
            Ok(subscriber_count) => {
                if subscriber_count == 0 {
                    // Silencio nominal: sin operadores observando.
                    trace!("💤 [EVENT_BUS]: Signal discarded. No active neural links.");
                } else {
                    trace!("📡 [EVENT_BUS]: Signal broadcasted to {} active links.", subscriber_count);
                }
            }
            Err(_) => {
                error!("💀 [EVENT_BUS_FATAL]: Internal transmission channel collapsed.");
            }
        }
    }

    /**
     * Inyecta una entrada en el flujo de logs unificado, con ruteo
     * semántico por severidad hacia el rastro de tracing.
     */
    pub fn emit_system_log(&self, forensic_log: SystemLog) {
        match forensic_log.severity.as_str() {
            "CRITICAL" | "ERROR" => {
                error!(target: "panopticon", "[{}] {}", forensic_log.stratum, forensic_log.message)
            }
            "WARN" => {
                warn!(target: "panopticon", "[{}] {}", forensic_log.stratum, forensic_log.message)
            }
            _ => {
                debug!(target: "panopticon", "[{}] {}", forensic_log.stratum, forensic_log.message)
            }
        }

        self.broadcast_event(RealTimeEvent::SystemLogEmission(forensic_log));
    }

    /// Atajo para rastro forense con identidad y marca frescas.
    pub fn emit_forensic_trace(&self, stratum: &str, severity: &str, message: String, timestamp: String) {
        self.emit_system_log(SystemLog {
            id: Uuid::new_v4().to_string(),
            timestamp,
            stratum: stratum.to_string(),
            severity: severity.to_string(),
            message,
            metadata: None,
        });
    }
}
