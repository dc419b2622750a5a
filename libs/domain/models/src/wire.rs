// [libs/domain/models/src/wire.rs]
/*!
 * =================================================================
 * APARATO: AGENT WIRE PROTOCOL CONTRACTS (V14.0 - PRODUCTION MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: GRAMÁTICA SOBERANA DEL CANAL AGENTE <-> SERVIDOR
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ENVELOPE DISCIPLINE: Todo mensaje viaja como
 *    { type, id, ts, payload } mediante etiquetado adyacente de
 *    Serde aplanado dentro del sobre de transporte.
 * 2. TYPESHARE SYNERGY: Discriminadores snake_case estables para
 *    el agente y el Dashboard, sin deriva de contrato.
 * 3. NOMINAL PRECISION: Cada payload transporta exactamente los
 *    campos que el despacho y la ingesta necesitan.
 *
 * # Mathematical Proof (Ordering Contract):
 * El canal garantiza FIFO por agente en ambas direcciones. El sobre
 * transporta un identificador único por mensaje, de modo que la capa
 * de ingesta pueda auditar duplicados sin inspeccionar el payload.
 * =================================================================
 */

use crate::agent::DeviceProfile;
use crate::attack::AttackMode;
use crate::hashlist::CrackEntry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;
use uuid::Uuid;

/// Sobre de transporte común a ambas direcciones del canal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireEnvelope<MessageBody> {
    pub id: Uuid,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub body: MessageBody,
}

impl<MessageBody> WireEnvelope<MessageBody> {
    /// Sella un cuerpo de mensaje con identidad y marca temporal frescas.
    pub fn seal(body: MessageBody, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            ts: timestamp,
            body,
        }
    }
}

/// Clase de archivo distribuible hacia los agentes.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Hashlist,
    Wordlist,
    Rule,
    Binary,
}

impl FileKind {
    /// Segmento de ruta usado por la pasarela de descargas.
    pub fn as_path_segment(&self) -> &'static str {
        match self {
            FileKind::Hashlist => "hashlist",
            FileKind::Wordlist => "wordlist",
            FileKind::Rule => "rule",
            FileKind::Binary => "binary",
        }
    }

    pub fn from_path_segment(segment: &str) -> Option<Self> {
        match segment {
            "hashlist" => Some(FileKind::Hashlist),
            "wordlist" => Some(FileKind::Wordlist),
            "rule" => Some(FileKind::Rule),
            "binary" => Some(FileKind::Binary),
            _ => None,
        }
    }
}

/// Causa nominal de una orden de detención de tarea.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Preempted,
    JobCancelled,
    HashlistFullyCracked,
    ServerError,
    Timeout,
}

/// Veredicto final de una tarea reportado por el agente.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    Completed,
    Failed,
    Cancelled,
}

/// Telemetría puntual de un dispositivo del agente.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceStatusReport {
    #[typeshare(serialized_as = "number")]
    pub index: i64,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_c: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub util_pct: Option<f64>,
}

/// Parámetros completos de una tarea lista para ejecutar en el agente.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAssignment {
    #[typeshare(serialized_as = "String")]
    pub task_id: Uuid,
    #[typeshare(serialized_as = "String")]
    pub job_execution_id: Uuid,
    pub attack_mode: AttackMode,
    #[typeshare(serialized_as = "number")]
    pub hash_type: i64,
    #[typeshare(serialized_as = "number")]
    pub hashlist_id: i64,
    /// Huella de la versión de hashlist que la tarea exige poseer.
    pub hashlist_version: String,
    #[typeshare(serialized_as = "number")]
    pub binary_version_id: i64,
    #[typeshare(serialized_as = "Vec<number>")]
    pub wordlist_ids: Vec<i64>,
    #[typeshare(serialized_as = "Vec<number>")]
    pub rule_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask: Option<String>,
    #[typeshare(serialized_as = "number")]
    pub keyspace_start: i64,
    #[typeshare(serialized_as = "number")]
    pub keyspace_end: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[typeshare(serialized_as = "number")]
    pub rule_start_index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[typeshare(serialized_as = "number")]
    pub rule_end_index: Option<i64>,
    #[typeshare(serialized_as = "number")]
    pub chunk_duration_s: i64,
}

/// Mensajes emitidos por el servidor hacia un agente.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    RunBenchmark {
        attack_mode: AttackMode,
        #[typeshare(serialized_as = "number")]
        hash_type: i64,
        #[typeshare(serialized_as = "number")]
        binary_version_id: i64,
        #[typeshare(serialized_as = "number")]
        timeout_s: i64,
    },
    AssignTask(TaskAssignment),
    StopTask {
        #[typeshare(serialized_as = "String")]
        task_id: Uuid,
        reason: StopReason,
    },
    FileSyncRequired {
        kind: FileKind,
        #[typeshare(serialized_as = "number")]
        id: i64,
        url: String,
        expected_hash: String,
        #[typeshare(serialized_as = "number")]
        size_bytes: i64,
    },
    ConfigUpdate {
        #[typeshare(serialized_as = "number")]
        heartbeat_interval_s: i64,
        #[typeshare(serialized_as = "number")]
        chunk_duration_s_default: i64,
    },
}

/// Mensajes emitidos por un agente hacia el servidor.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum AgentMessage {
    Hello {
        #[typeshare(serialized_as = "number")]
        agent_id: i64,
        api_key: String,
        version: String,
        devices: Vec<DeviceProfile>,
        capabilities: Vec<String>,
    },
    Heartbeat {
        #[typeshare(serialized_as = "Vec<String>")]
        active_task_ids: Vec<Uuid>,
        device_status: Vec<DeviceStatusReport>,
    },
    BenchmarkResult {
        attack_mode: AttackMode,
        #[typeshare(serialized_as = "number")]
        hash_type: i64,
        #[typeshare(serialized_as = "number")]
        speed_hps: i64,
    },
    TaskProgress {
        #[typeshare(serialized_as = "String")]
        task_id: Uuid,
        #[typeshare(serialized_as = "number")]
        keyspace_processed: i64,
        percent: f64,
        #[typeshare(serialized_as = "number")]
        speed_hps: i64,
    },
    TaskComplete {
        #[typeshare(serialized_as = "String")]
        task_id: Uuid,
        outcome: TaskOutcome,
        #[typeshare(serialized_as = "number")]
        final_processed: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    CrackReport {
        #[typeshare(serialized_as = "String")]
        task_id: Uuid,
        #[typeshare(serialized_as = "number")]
        hashlist_id: i64,
        entries: Vec<CrackEntry>,
    },
    FileSyncComplete {
        kind: FileKind,
        #[typeshare(serialized_as = "number")]
        id: i64,
        version_hash: String,
    },
    FileSyncFailed {
        kind: FileKind,
        #[typeshare(serialized_as = "number")]
        id: i64,
        reason: String,
    },
    DeviceStatusChanged {
        devices: Vec<DeviceStatusReport>,
    },
}
