// [tests/mirror/libs/infra/db/benchmark_registry.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL REGISTRO DE BENCHMARKS (V3.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: UPSERT POR COMBINACIÓN, FRESCURA Y RETENCIÓN
 * =================================================================
 */

use chrono::{Duration, Utc};
use kraken_domain_models::{AttackMode, BenchmarkSample};
use kraken_infra_db::repositories::BenchmarkRepository;
use kraken_infra_db::LedgerClient;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn certify_upsert_staleness_and_retention() {
        println!("\n📊 [INICIO]: Auditoría del registro de benchmarks...");

        let database_client =
            LedgerClient::connect("file:mem_benchmarks_v3?mode=memory&cache=shared", None)
                .await
                .expect("CRITICAL_FAULT: Failed to anchor in-memory ledger.");
        let benchmark_repository = BenchmarkRepository::new(database_client.clone());

        let measured_at = Utc::now();
        let initial_sample = BenchmarkSample {
            agent_id: 1,
            attack_mode: AttackMode::Straight,
            hash_type: 1000,
            speed_hashes_per_second: 2_500_000_000,
            measured_at,
            valid_until: measured_at + Duration::days(14),
        };
        benchmark_repository.record_speed(&initial_sample).await.unwrap();

        // 1. FRESCURA: vigente dentro de la ventana, vencida fuera.
        let fetched = benchmark_repository
            .fetch_speed(1, AttackMode::Straight, 1000)
            .await
            .unwrap()
            .expect("SAMPLE_FAULT: Recorded sample vanished.");
        assert_eq!(fetched.speed_hashes_per_second, 2_500_000_000);
        assert!(fetched.is_fresh(measured_at + Duration::days(1)));
        assert!(!fetched.is_fresh(measured_at + Duration::days(15)));

        // 2. UPSERT: la re-medición sustituye la muestra, no la duplica.
        let remeasured_at = measured_at + Duration::hours(6);
        benchmark_repository
            .record_speed(&BenchmarkSample {
                speed_hashes_per_second: 3_100_000_000,
                measured_at: remeasured_at,
                valid_until: remeasured_at + Duration::days(14),
                ..initial_sample.clone()
            })
            .await
            .unwrap();

        let replaced = benchmark_repository
            .fetch_speed(1, AttackMode::Straight, 1000)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(replaced.speed_hashes_per_second, 3_100_000_000);

        // 3. AISLAMIENTO POR COMBINACIÓN: otro modo no colisiona.
        benchmark_repository
            .record_speed(&BenchmarkSample {
                attack_mode: AttackMode::BruteForce,
                speed_hashes_per_second: 9_000_000_000,
                ..initial_sample.clone()
            })
            .await
            .unwrap();
        let straight_untouched = benchmark_repository
            .fetch_speed(1, AttackMode::Straight, 1000)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(straight_untouched.speed_hashes_per_second, 3_100_000_000);

        // 4. RETENCIÓN: la evicción elimina muestras antiguas.
        let purged = benchmark_repository
            .cleanup_older_than(remeasured_at + Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(purged, 2, "Both samples predate the cutoff.");
        assert!(benchmark_repository
            .fetch_speed(1, AttackMode::Straight, 1000)
            .await
            .unwrap()
            .is_none());

        println!("🏁 [INFORME]: Registro de benchmarks certificado. Veredicto: GOLD_MASTER");
    }
}
