// [libs/domain/models/src/benchmark.rs]
//! =================================================================
//! APARATO: BENCHMARK SAMPLE MODEL (V4.0)
//! CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
//! RESPONSABILIDAD: MUESTRA DE RENDIMIENTO POR (AGENTE, MODO, HASH)
//! =================================================================

use crate::attack::AttackMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// Muestra de velocidad medida para una combinación concreta.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkSample {
    #[typeshare(serialized_as = "number")]
    pub agent_id: i64,
    pub attack_mode: AttackMode,
    #[typeshare(serialized_as = "number")]
    pub hash_type: i64,
    #[typeshare(serialized_as = "number")]
    pub speed_hashes_per_second: i64,
    #[typeshare(serialized_as = "String")]
    pub measured_at: DateTime<Utc>,
    /// Expiración de frescura (por defecto 14 días tras la medición).
    #[typeshare(serialized_as = "String")]
    pub valid_until: DateTime<Utc>,
}

impl BenchmarkSample {
    /// Una muestra es fresca mientras no haya expirado su ventana.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.valid_until
    }
}
