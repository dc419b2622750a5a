// [libs/domain/models/src/task.rs]
/*!
 * =================================================================
 * APARATO: JOB TASK DOMAIN MODEL (V10.3 - PRODUCTION MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATO DE LA UNIDAD ATÓMICA DE DESPACHO
 *
 * # Mathematical Proof (Interval Integrity):
 * Cada tarea cubre un intervalo semiabierto [keyspace_start,
 * keyspace_end) del keyspace base, o un rango inclusivo de índices
 * de regla bajo rule-splitting. La unión de intervalos de tareas no
 * canceladas de un trabajo es un prefijo de [0, base_keyspace) sin
 * solapes; los huecos dejados por tareas liberadas se re-emiten
 * antes de avanzar la frontera.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;
use uuid::Uuid;

/// Estados del ciclo de vida de una tarea despachada.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Assigned,
    Running,
    Completed,
    Failed,
    Cancelled,
    ReconnectPending,
}

impl TaskStatus {
    /// Una tarea terminal ya no ocupa slot de agente ni keyspace en vuelo.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Assigned => "assigned",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::ReconnectPending => "reconnect_pending",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "pending" => Some(TaskStatus::Pending),
            "assigned" => Some(TaskStatus::Assigned),
            "running" => Some(TaskStatus::Running),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            "cancelled" => Some(TaskStatus::Cancelled),
            "reconnect_pending" => Some(TaskStatus::ReconnectPending),
            _ => None,
        }
    }
}

/// Unidad de trabajo despachada a un único agente.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobTask {
    #[typeshare(serialized_as = "String")]
    pub id: Uuid,
    #[typeshare(serialized_as = "String")]
    pub job_execution_id: Uuid,
    /// Agente propietario. Nulo mientras la tarea espera re-asignación.
    #[typeshare(serialized_as = "number")]
    pub agent_id: Option<i64>,
    pub status: TaskStatus,
    /// Intervalo semiabierto sobre el keyspace base.
    #[typeshare(serialized_as = "number")]
    pub keyspace_start: i64,
    #[typeshare(serialized_as = "number")]
    pub keyspace_end: i64,
    /// Rango inclusivo de reglas cuando el trabajo usa rule-splitting.
    #[typeshare(serialized_as = "number")]
    pub rule_start_index: Option<i64>,
    #[typeshare(serialized_as = "number")]
    pub rule_end_index: Option<i64>,
    #[typeshare(serialized_as = "number")]
    pub chunk_duration_seconds: i64,
    pub progress_percent: f64,
    #[typeshare(serialized_as = "number")]
    pub keyspace_processed: i64,
    /// Velocidad observada o estimada al dimensionar el chunk.
    #[typeshare(serialized_as = "number")]
    pub benchmark_speed: i64,
    /// Marcada cuando el chunk fue dimensionado con el piso de velocidad.
    pub low_confidence: bool,
    #[typeshare(serialized_as = "number")]
    pub retry_count: i64,
    pub error_message: Option<String>,
    #[typeshare(serialized_as = "String")]
    pub assigned_at: Option<DateTime<Utc>>,
    #[typeshare(serialized_as = "String")]
    pub started_at: Option<DateTime<Utc>>,
    #[typeshare(serialized_as = "String")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobTask {
    /// Volumen efectivo cubierto por la tarea dado el factor del trabajo.
    ///
    /// Sin rule-splitting el intervalo base se multiplica por el factor
    /// completo; bajo rule-splitting cada slice de reglas recorre el
    /// keyspace base íntegro.
    pub fn effective_size(&self, base_keyspace: i64, multiplication_factor: i64) -> i64 {
        match (self.rule_start_index, self.rule_end_index) {
            (Some(rule_start), Some(rule_end)) => {
                base_keyspace.saturating_mul(rule_end - rule_start + 1)
            }
            _ => (self.keyspace_end - self.keyspace_start).saturating_mul(multiplication_factor),
        }
    }
}
