// [libs/infra/db/src/repositories/benchmark.rs]
/*!
 * =================================================================
 * APARATO: BENCHMARK SAMPLE REPOSITORY (V8.0)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: MUESTRAS DE VELOCIDAD POR COMBINACIÓN TÁCTICA
 *
 * # Logic:
 * Una muestra por (agente, modo de ataque, tipo de hash). El upsert
 * conserva siempre la medición más reciente; la retención evita que
 * el Ledger acumule muestras muertas de hardware retirado.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::parse_required_timestamp;
use crate::LedgerClient;
use chrono::{DateTime, Utc};
use kraken_domain_models::{AttackMode, BenchmarkSample};
use libsql::{params, Row};
use tracing::{debug, info, instrument};

const BENCHMARK_COLUMNS: &str =
    "agent_id, attack_mode, hash_type, speed_hashes_per_second, measured_at, valid_until";

/// Autoridad única de persistencia de muestras de rendimiento.
pub struct BenchmarkRepository {
    database_client: LedgerClient,
}

impl BenchmarkRepository {
    pub fn new(client: LedgerClient) -> Self {
        Self {
            database_client: client,
        }
    }

    /// Upsert de la muestra más reciente para la combinación.
    #[instrument(skip(self, sample))]
    pub async fn record_speed(&self, sample: &BenchmarkSample) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        database_connection
            .execute(
                "INSERT INTO benchmarks
                 (agent_id, attack_mode, hash_type, speed_hashes_per_second, measured_at, valid_until)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(agent_id, attack_mode, hash_type)
                 DO UPDATE SET speed_hashes_per_second = ?4,
                               measured_at = ?5,
                               valid_until = ?6",
                params![
                    sample.agent_id,
                    sample.attack_mode.as_label(),
                    sample.hash_type,
                    sample.speed_hashes_per_second,
                    sample.measured_at.to_rfc3339(),
                    sample.valid_until.to_rfc3339()
                ],
            )
            .await?;

        debug!(
            "📊 [BENCHMARK]: Agent {} sampled at {} H/s for ({}, {}).",
            sample.agent_id,
            sample.speed_hashes_per_second,
            sample.attack_mode.as_label(),
            sample.hash_type
        );
        Ok(())
    }

    /// Última muestra conocida para la combinación, si existe.
    pub async fn fetch_speed(
        &self,
        agent_identifier: i64,
        attack_mode: AttackMode,
        hash_type: i64,
    ) -> Result<Option<BenchmarkSample>, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let sql_query = format!(
            "SELECT {} FROM benchmarks
             WHERE agent_id = ?1 AND attack_mode = ?2 AND hash_type = ?3",
            BENCHMARK_COLUMNS
        );
        let mut query_results = database_connection
            .query(
                &sql_query,
                params![agent_identifier, attack_mode.as_label(), hash_type],
            )
            .await?;
        match query_results.next().await? {
            Some(data_row) => Ok(Some(map_row_to_benchmark(&data_row)?)),
            None => Ok(None),
        }
    }

    /// Evicción de muestras más antiguas que la ventana de retención.
    pub async fn cleanup_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let purged_count = database_connection
            .execute(
                "DELETE FROM benchmarks WHERE measured_at < ?1",
                params![cutoff.to_rfc3339()],
            )
            .await?;
        if purged_count > 0 {
            info!(
                "🗑️ [BENCHMARK_CLEANUP]: Evicted {} samples beyond retention.",
                purged_count
            );
        }
        Ok(purged_count)
    }
}

fn map_row_to_benchmark(data_row: &Row) -> Result<BenchmarkSample, DbError> {
    let attack_mode_label: String = data_row.get(1)?;
    Ok(BenchmarkSample {
        agent_id: data_row.get::<i64>(0)?,
        attack_mode: AttackMode::from_label(&attack_mode_label)
            .ok_or_else(|| DbError::MappingError(format!("attack mode '{}'", attack_mode_label)))?,
        hash_type: data_row.get::<i64>(2)?,
        speed_hashes_per_second: data_row.get::<i64>(3)?,
        measured_at: parse_required_timestamp(data_row, 4)?,
        valid_until: parse_required_timestamp(data_row, 5)?,
    })
}
