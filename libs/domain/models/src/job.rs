// [libs/domain/models/src/job.rs]
/*!
 * =================================================================
 * APARATO: JOB EXECUTION DOMAIN MODEL (V12.0 - PRODUCTION MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATO SOBERANO DE EJECUCIONES DE CAMPAÑA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DUAL FRONTIER: La contabilidad de despacho se expresa en
 *    unidades efectivas mientras la frontera de avance vive en
 *    unidades base (o índices de regla bajo rule-splitting).
 * 2. NOMINAL PRECISION: Nomenclatura nominal absoluta en campos
 *    de keyspace para erradicar ambigüedades de unidad.
 *
 * # Mathematical Proof (Dispatch Accounting):
 * effective_keyspace = base_keyspace × multiplication_factor.
 * En todo instante: 0 ≤ processed_keyspace ≤ dispatched_keyspace
 * ≤ effective_keyspace, con dispatched_keyspace expresado en
 * unidades efectivas para que la desigualdad sea homogénea.
 * =================================================================
 */

use crate::attack::AttackMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;
use uuid::Uuid;

/// Estados del ciclo de vida de una ejecución.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum JobExecutionStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl JobExecutionStatus {
    /// Un trabajo es "activo" mientras pueda volver a despachar.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            JobExecutionStatus::Pending | JobExecutionStatus::Running | JobExecutionStatus::Paused
        )
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            JobExecutionStatus::Pending => "pending",
            JobExecutionStatus::Running => "running",
            JobExecutionStatus::Paused => "paused",
            JobExecutionStatus::Completed => "completed",
            JobExecutionStatus::Failed => "failed",
            JobExecutionStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "pending" => Some(JobExecutionStatus::Pending),
            "running" => Some(JobExecutionStatus::Running),
            "paused" => Some(JobExecutionStatus::Paused),
            "completed" => Some(JobExecutionStatus::Completed),
            "failed" => Some(JobExecutionStatus::Failed),
            "cancelled" => Some(JobExecutionStatus::Cancelled),
            _ => None,
        }
    }
}

/// Ejecución concreta de una plantilla contra una lista de hashes.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobExecution {
    #[typeshare(serialized_as = "String")]
    pub id: Uuid,
    #[typeshare(serialized_as = "String")]
    pub preset_job_id: Uuid,
    #[typeshare(serialized_as = "number")]
    pub hashlist_id: i64,
    pub name: String,
    pub status: JobExecutionStatus,
    #[typeshare(serialized_as = "number")]
    pub priority: i64,
    #[typeshare(serialized_as = "number")]
    pub max_agents: i64,
    pub attack_mode: AttackMode,
    /// Keyspace antes de la multiplicación por reglas.
    #[typeshare(serialized_as = "number")]
    pub base_keyspace: Option<i64>,
    #[typeshare(serialized_as = "number")]
    pub multiplication_factor: Option<i64>,
    /// base_keyspace × multiplication_factor, en unidades efectivas.
    #[typeshare(serialized_as = "number")]
    pub effective_keyspace: Option<i64>,
    pub uses_rule_splitting: bool,
    #[typeshare(serialized_as = "number")]
    pub rule_split_count: i64,
    /// Volumen efectivo ya despachado a agentes.
    #[typeshare(serialized_as = "number")]
    pub dispatched_keyspace: i64,
    /// Volumen efectivo certificado como procesado.
    #[typeshare(serialized_as = "number")]
    pub processed_keyspace: i64,
    /// Frontera de avance en unidades base (modo sin rule-splitting).
    #[typeshare(serialized_as = "number")]
    pub next_base_offset: i64,
    /// Frontera de avance en índices de regla (modo rule-splitting).
    #[typeshare(serialized_as = "number")]
    pub next_rule_offset: i64,
    pub overall_progress_percent: f64,
    pub allow_high_priority_override: bool,
    #[typeshare(serialized_as = "Vec<number>")]
    pub wordlist_ids: Vec<i64>,
    #[typeshare(serialized_as = "Vec<number>")]
    pub rule_ids: Vec<i64>,
    pub mask: Option<String>,
    #[typeshare(serialized_as = "number")]
    pub binary_version_id: i64,
    #[typeshare(serialized_as = "number")]
    pub chunk_duration_seconds: i64,
    /// Trabajo que desalojó a esta ejecución, si fue interrumpida.
    #[typeshare(serialized_as = "String")]
    pub interrupted_by: Option<Uuid>,
    pub error_message: Option<String>,
    #[typeshare(serialized_as = "String")]
    pub created_at: DateTime<Utc>,
    #[typeshare(serialized_as = "String")]
    pub started_at: Option<DateTime<Utc>>,
    #[typeshare(serialized_as = "String")]
    pub completed_at: Option<DateTime<Utc>>,
    #[typeshare(serialized_as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl JobExecution {
    /// Keyspace efectivo aún no despachado. Cero mientras el cálculo
    /// asíncrono de keyspace siga pendiente.
    pub fn remaining_effective_keyspace(&self) -> i64 {
        self.effective_keyspace
            .map(|effective| (effective - self.dispatched_keyspace).max(0))
            .unwrap_or(0)
    }

    /// El cálculo de keyspace está completo y el trabajo puede despachar.
    pub fn has_keyspace_computed(&self) -> bool {
        self.base_keyspace.is_some()
            && self.multiplication_factor.is_some()
            && self.effective_keyspace.is_some()
    }
}
