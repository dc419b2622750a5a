// [libs/domain/models/src/preset.rs]
/*!
 * =================================================================
 * APARATO: PRESET JOB TEMPLATE MODEL (V7.0 - PRODUCTION MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATO INMUTABLE DE PLANTILLAS DE ATAQUE
 *
 * # Logic:
 * Un PresetJob es autorado por administradores y nunca muta tras su
 * publicación. Las ejecuciones concretas (JobExecution) copian sus
 * parámetros en el momento de la ignición, de modo que la edición
 * posterior de una plantilla jamás altere campañas en vuelo.
 * =================================================================
 */

use crate::attack::AttackMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;
use uuid::Uuid;

/// Plantilla reutilizable de ataque autorada por administradores.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetJob {
    /// Identificador único universal de la plantilla.
    #[typeshare(serialized_as = "String")]
    pub id: Uuid,
    pub name: String,
    pub attack_mode: AttackMode,
    /// Prioridad base heredada por las ejecuciones (mayor gana).
    #[typeshare(serialized_as = "number")]
    pub priority: i64,
    /// Versión del binario de cracking requerida por la plantilla.
    #[typeshare(serialized_as = "number")]
    pub binary_version_id: i64,
    /// Diccionarios en orden posicional (0, 1 o 2 según el modo).
    #[typeshare(serialized_as = "Vec<number>")]
    pub wordlist_ids: Vec<i64>,
    /// Archivos de reglas en orden de aplicación.
    #[typeshare(serialized_as = "Vec<number>")]
    pub rule_ids: Vec<i64>,
    pub mask: Option<String>,
    /// Duración objetivo de cada chunk despachado (mínimo 60s).
    #[typeshare(serialized_as = "number")]
    pub chunk_duration_seconds: i64,
    /// Autoriza a esta plantilla a desalojar trabajo de menor prioridad.
    pub allow_high_priority_override: bool,
    /// Tope de agentes simultáneos (0 = ilimitado).
    #[typeshare(serialized_as = "number")]
    pub max_agents: i64,
    /// Keyspace efectivo cacheado si ya fue calculado.
    #[typeshare(serialized_as = "number")]
    pub keyspace: Option<i64>,
    #[typeshare(serialized_as = "String")]
    pub created_at: DateTime<Utc>,
}
