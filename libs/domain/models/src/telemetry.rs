// [libs/domain/models/src/telemetry.rs]
/*!
 * =================================================================
 * APARATO: TELEMETRY & REAL-TIME EVENT MODELS (V8.2)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATOS DE SEÑALES EN TIEMPO REAL PARA OPERADORES
 *
 * # Logic:
 * Estos tipos viajan por el bus de difusión hacia las sesiones de
 * operador. No participan en decisiones de despacho: son rastro
 * forense y visualización, nunca fuente de verdad.
 * =================================================================
 */

use crate::job::JobExecutionStatus;
use crate::wire::StopReason;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use typeshare::typeshare;
use uuid::Uuid;

/// Entrada del flujo de logs unificado del plano de control.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemLog {
    pub id: String,
    pub timestamp: String,
    /// Estrato de origen (ej: "L4_RECONCILER", "L4_AGENT_LINK").
    pub stratum: String,
    pub severity: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Señales difundidas en tiempo real hacia las consolas de operador.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum RealTimeEvent {
    /// Transición de estado de una ejecución de campaña.
    JobStateChanged {
        #[typeshare(serialized_as = "String")]
        job_execution_id: Uuid,
        status: JobExecutionStatus,
    },
    /// Una tarea fue entregada a un agente.
    TaskDispatched {
        #[typeshare(serialized_as = "String")]
        task_id: Uuid,
        #[typeshare(serialized_as = "number")]
        agent_id: i64,
    },
    /// Una tarea en vuelo recibió orden de detención.
    TaskStopped {
        #[typeshare(serialized_as = "String")]
        task_id: Uuid,
        reason: StopReason,
    },
    /// Ingesta de cracks deduplicados sobre una hashlist.
    CracksIngested {
        #[typeshare(serialized_as = "number")]
        hashlist_id: i64,
        #[typeshare(serialized_as = "number")]
        newly_cracked: i64,
    },
    /// Una hashlist alcanzó el 100% de hashes crackeados.
    HashlistFullyCracked {
        #[typeshare(serialized_as = "number")]
        hashlist_id: i64,
    },
    /// Un agente estableció o perdió su enlace persistente.
    AgentLinkChanged {
        #[typeshare(serialized_as = "number")]
        agent_id: i64,
        connected: bool,
    },
    /// Emisión de una entrada del log unificado.
    SystemLogEmission(SystemLog),
}
