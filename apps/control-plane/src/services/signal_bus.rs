// [apps/control-plane/src/services/signal_bus.rs]
/*!
 * =================================================================
 * APARATO: RECONCILER SIGNAL BUS (V5.0 - COALESCING MASTER)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: CANAL ÚNICO DE DESPERTAR DEL RECONCILIADOR
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SINGLE CONSUMER: Solo el reconciliador drena el canal. Las
 *    sesiones de agente, los manejadores HTTP y los daemons emiten
 *    señales; jamás despachan por sí mismos.
 * 2. LOSSY BY DESIGN: Las señales son niveles, no datos. Si el
 *    buffer está colmado, descartar es correcto: el reconciliador
 *    ya tiene un despertar pendiente que coalescerá el resto.
 * =================================================================
 */

use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::trace;

/// Capacidad del canal de señales. Colmarlo solo implica coalescencia.
const SIGNAL_CHANNEL_CAPACITY: usize = 1024;

/// Causas de despertar del bucle reconciliador.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileSignal {
    JobCreated,
    JobPriorityChanged,
    AgentStateChanged,
    TaskTerminal,
    BenchmarkArrived,
    FileSyncAcknowledged,
    HashlistCompleted,
    KeyspaceRecalcRequested,
    Tick,
}

pub struct SignalBus {
    transmission_sender: mpsc::Sender<ReconcileSignal>,
    /// Receptor entregado una única vez al reconciliador.
    claimable_receiver: Mutex<Option<mpsc::Receiver<ReconcileSignal>>>,
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalBus {
    pub fn new() -> Self {
        let (transmission_sender, reception_receiver) = mpsc::channel(SIGNAL_CHANNEL_CAPACITY);
        Self {
            transmission_sender,
            claimable_receiver: Mutex::new(Some(reception_receiver)),
        }
    }

    /// Emite una señal de despertar sin bloquear jamás al emisor.
    pub fn emit(&self, signal: ReconcileSignal) {
        if self.transmission_sender.try_send(signal).is_err() {
            // Canal colmado: el reconciliador ya tiene trabajo encolado.
            trace!("💤 [SIGNAL_BUS]: Signal {:?} coalesced into pending wakeups.", signal);
        }
    }

    /**
     * Entrega el receptor exclusivo del canal. Solo el reconciliador
     * puede reclamarlo; una segunda reclamación devuelve None.
     */
    pub fn claim_receiver(&self) -> Option<mpsc::Receiver<ReconcileSignal>> {
        let mut receiver_guard = self
            .claimable_receiver
            .lock()
            .expect("SIGNAL_BUS_LOCK_POISONED");
        receiver_guard.take()
    }
}
