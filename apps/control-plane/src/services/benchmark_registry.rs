// [apps/control-plane/src/services/benchmark_registry.rs]
/*!
 * =================================================================
 * APARATO: BENCHMARK REGISTRY SERVICE (V10.0)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: FRESCURA DE VELOCIDADES Y SOLICITUDES DE MEDICIÓN
 *
 * # Logic:
 * El reconciliador jamás dimensiona un chunk con una muestra vencida
 * sin antes pedir una medición fresca. Tras un viaje de ida y vuelta
 * fallido, el dimensionado cae al piso de velocidad configurado y la
 * tarea resultante queda marcada como de baja confianza.
 * =================================================================
 */

use crate::state::AppState;
use chrono::{DateTime, Utc};
use kraken_domain_models::{AttackMode, BenchmarkSample};
use tracing::{debug, instrument};

use super::signal_bus::ReconcileSignal;

/// Veredicto de resolución de velocidad para una combinación.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedResolution {
    /// Muestra vigente: apta para dimensionar sin reservas.
    Fresh(i64),
    /// Muestra vencida: utilizable solo como estimación degradada.
    Stale(i64),
    /// Sin muestra registrada para la combinación.
    Missing,
}

pub struct BenchmarkRegistryService {
    application_shared_state: AppState,
}

impl BenchmarkRegistryService {
    #[must_use]
    pub fn new(application_state: AppState) -> Self {
        Self {
            application_shared_state: application_state,
        }
    }

    /// Registra el resultado de una medición reportada por el agente.
    #[instrument(skip(self))]
    pub async fn record_result(
        &self,
        agent_identifier: i64,
        attack_mode: AttackMode,
        hash_type: i64,
        speed_hashes_per_second: i64,
    ) -> anyhow::Result<()> {
        let state = &self.application_shared_state;
        let measured_at = state.clock.now();

        let sample = BenchmarkSample {
            agent_id: agent_identifier,
            attack_mode,
            hash_type,
            speed_hashes_per_second,
            measured_at,
            valid_until: measured_at + state.config.benchmark_staleness(),
        };
        state.benchmark_repository.record_speed(&sample).await?;

        state.agent_directory.clear_benchmarking(agent_identifier);
        state.signal_bus.emit(ReconcileSignal::BenchmarkArrived);
        Ok(())
    }

    /// Resuelve la velocidad utilizable para la combinación dada.
    pub async fn resolve_speed(
        &self,
        agent_identifier: i64,
        attack_mode: AttackMode,
        hash_type: i64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<SpeedResolution> {
        let sample = self
            .application_shared_state
            .benchmark_repository
            .fetch_speed(agent_identifier, attack_mode, hash_type)
            .await?;

        Ok(match sample {
            Some(sample) if sample.is_fresh(now) => {
                SpeedResolution::Fresh(sample.speed_hashes_per_second)
            }
            Some(sample) => SpeedResolution::Stale(sample.speed_hashes_per_second),
            None => SpeedResolution::Missing,
        })
    }

    /// Evicción de muestras más antiguas que la ventana de retención.
    pub async fn evict_expired(&self) -> anyhow::Result<u64> {
        let state = &self.application_shared_state;
        let retention_cutoff = state.clock.now() - state.config.benchmark_retention();
        let purged = state
            .benchmark_repository
            .cleanup_older_than(retention_cutoff)
            .await?;
        if purged > 0 {
            debug!("🗑️ [BENCHMARK_JANITOR]: {} samples evicted.", purged);
        }
        Ok(purged)
    }
}
