// [tests/mirror/libs/infra/db/dispatch_release.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE LIBERACIÓN DE INTERVALOS (V4.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DEL LEDGER DE HUECOS Y COMPENSACIÓN
 *
 * # Mathematical Proof (Release Compensation Law):
 * Avanzar n unidades y liberar la tarea resultante deja
 * 'dispatched_keyspace' exactamente en su valor previo; reclamar el
 * hueco lo restituye. El volumen neto en vuelo siempre iguala la
 * suma de tareas vivas.
 * =================================================================
 */

use chrono::Utc;
use kraken_domain_models::{AttackMode, Hashlist, HashlistStatus, PresetJob};
use kraken_domain_scheduling::KeyspaceVerdict;
use kraken_infra_db::repositories::{
    HashlistRepository, JobExecutionRepository, ReleasedInterval,
};
use kraken_infra_db::LedgerClient;
use uuid::Uuid;

fn forge_preset() -> PresetJob {
    PresetJob {
        id: Uuid::new_v4(),
        name: "release-audit".into(),
        attack_mode: AttackMode::Straight,
        priority: 10,
        binary_version_id: 1,
        wordlist_ids: vec![1],
        rule_ids: vec![],
        mask: None,
        chunk_duration_seconds: 300,
        allow_high_priority_override: false,
        max_agents: 0,
        keyspace: None,
        created_at: Utc::now(),
    }
}

fn forge_hashlist(hashlist_identifier: i64) -> Hashlist {
    Hashlist {
        id: hashlist_identifier,
        name: "release-targets".into(),
        hash_type: 0,
        total_hashes: 0,
        cracked_hashes: 0,
        status: HashlistStatus::Ready,
        exclude_from_potfile: false,
        client_id: None,
        version_hash: "v1".into(),
        file_name: "release.txt".into(),
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /**
     * CERTIFICACIÓN: avance -> liberación -> reclamo sobre la
     * dimensión base deja la contabilidad bit-perfecta.
     */
    #[tokio::test]
    async fn certify_base_interval_release_and_reclaim() {
        println!("\n🕳️  [INICIO]: Auditoría del Ledger de huecos (dimensión base)...");

        let database_client =
            LedgerClient::connect("file:mem_release_base_v4?mode=memory&cache=shared", None)
                .await
                .expect("CRITICAL_FAULT: Failed to anchor in-memory ledger.");
        let job_repository = JobExecutionRepository::new(database_client.clone());
        let hashlist_repository = HashlistRepository::new(database_client.clone());
        let now = Utc::now();

        let hashlist = forge_hashlist(1);
        hashlist_repository.insert_hashlist(&hashlist, "data/release.txt").await.unwrap();

        let verdict = KeyspaceVerdict {
            base_keyspace: 10_000,
            multiplication_factor: 1,
            effective_keyspace: 10_000,
            uses_rule_splitting: false,
        };
        let execution = job_repository
            .create_from_preset(&forge_preset(), &hashlist, "release-1", Some(&verdict), now)
            .await
            .unwrap();

        job_repository.advance_dispatch(&execution.id, 1_000, 1_000, 0, now).await.unwrap();
        let pre_release = job_repository.fetch_job(&execution.id).await.unwrap();
        assert_eq!(pre_release.dispatched_keyspace, 1_000);

        // Liberación: el agente desapareció con [0, 1000) en vuelo.
        let lost_interval = ReleasedInterval {
            keyspace_start: 0,
            keyspace_end: 1_000,
            rule_start_index: None,
            rule_end_index: None,
            effective_size: 1_000,
        };
        job_repository.release_dispatch(&execution.id, &lost_interval, now).await.unwrap();

        let post_release = job_repository.fetch_job(&execution.id).await.unwrap();
        assert_eq!(post_release.dispatched_keyspace, 0, "Compensation law violated.");
        assert_eq!(post_release.next_base_offset, 1_000, "Frontier must not rewind.");

        // Reclamo: el hueco se re-emite antes de avanzar la frontera.
        let reclaimed = job_repository
            .claim_released_interval(&execution.id, now)
            .await
            .unwrap()
            .expect("HOLE_FAULT: Released interval vanished.");
        assert_eq!(reclaimed.keyspace_start, 0);
        assert_eq!(reclaimed.keyspace_end, 1_000);
        assert_eq!(reclaimed.effective_size, 1_000);

        let post_reclaim = job_repository.fetch_job(&execution.id).await.unwrap();
        assert_eq!(post_reclaim.dispatched_keyspace, 1_000);

        // El Ledger de huecos queda vacío tras el reclamo.
        assert!(job_repository
            .claim_released_interval(&execution.id, now)
            .await
            .unwrap()
            .is_none());

        println!("🏁 [INFORME]: Compensación base certificada. Veredicto: GOLD_MASTER");
    }

    /**
     * CERTIFICACIÓN: la compensación respeta la dimensión de reglas
     * (cada slice recorre el keyspace base íntegro).
     */
    #[tokio::test]
    async fn certify_rule_slice_release_and_reclaim() {
        let database_client =
            LedgerClient::connect("file:mem_release_rules_v4?mode=memory&cache=shared", None)
                .await
                .expect("CRITICAL_FAULT: Failed to anchor in-memory ledger.");
        let job_repository = JobExecutionRepository::new(database_client.clone());
        let hashlist_repository = HashlistRepository::new(database_client.clone());
        let now = Utc::now();

        let hashlist = forge_hashlist(2);
        hashlist_repository.insert_hashlist(&hashlist, "data/release2.txt").await.unwrap();

        let verdict = KeyspaceVerdict {
            base_keyspace: 1_000,
            multiplication_factor: 500,
            effective_keyspace: 500_000,
            uses_rule_splitting: true,
        };
        let execution = job_repository
            .create_from_preset(&forge_preset(), &hashlist, "release-2", Some(&verdict), now)
            .await
            .unwrap();

        // Slice de reglas [0, 99]: 100 reglas × 1000 base = 100.000 efectivas.
        job_repository.advance_dispatch(&execution.id, 100_000, 0, 100, now).await.unwrap();

        let lost_slice = ReleasedInterval {
            keyspace_start: 0,
            keyspace_end: 1_000,
            rule_start_index: Some(0),
            rule_end_index: Some(99),
            effective_size: 100_000,
        };
        job_repository.release_dispatch(&execution.id, &lost_slice, now).await.unwrap();

        let post_release = job_repository.fetch_job(&execution.id).await.unwrap();
        assert_eq!(post_release.dispatched_keyspace, 0);
        assert_eq!(post_release.next_rule_offset, 100, "Rule frontier must not rewind.");

        let reclaimed = job_repository
            .claim_released_interval(&execution.id, now)
            .await
            .unwrap()
            .expect("HOLE_FAULT: Rule slice vanished.");
        assert_eq!(reclaimed.rule_start_index, Some(0));
        assert_eq!(reclaimed.rule_end_index, Some(99));
        assert_eq!(reclaimed.effective_size, 100_000, "Slice effective volume drifted.");

        let post_reclaim = job_repository.fetch_job(&execution.id).await.unwrap();
        assert_eq!(post_reclaim.dispatched_keyspace, 100_000);
    }
}
