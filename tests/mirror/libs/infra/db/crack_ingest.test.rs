// [tests/mirror/libs/infra/db/crack_ingest.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE INGESTA DE CRACKS (V5.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: LEY DE DEDUPLICACIÓN Y MONOTONÍA DEL CONTADOR
 *
 * # Mathematical Proof (Deduplication Law):
 * Reportar dos veces el mismo (lista, hash, plaintext) deja el
 * almacenamiento y los contadores exactamente iguales que una sola
 * ingesta. El contador de cracks es monótono no decreciente y jamás
 * supera el total de objetivos.
 * =================================================================
 */

use chrono::Utc;
use kraken_domain_models::{CrackEntry, Hashlist, HashlistStatus};
use kraken_infra_db::repositories::HashlistRepository;
use kraken_infra_db::LedgerClient;

fn crack(hash: &str, plaintext: &str) -> CrackEntry {
    CrackEntry {
        hash: hash.to_string(),
        plaintext: plaintext.to_string(),
        username: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn certify_deduplication_and_full_crack_detection() {
        println!("\n🎯 [INICIO]: Auditoría de la ley de deduplicación de cracks...");

        let database_client =
            LedgerClient::connect("file:mem_crack_ingest_v5?mode=memory&cache=shared", None)
                .await
                .expect("CRITICAL_FAULT: Failed to anchor in-memory ledger.");
        let hashlist_repository = HashlistRepository::new(database_client.clone());
        let now = Utc::now();

        let hashlist = Hashlist {
            id: 9,
            name: "triad-targets".into(),
            hash_type: 0,
            total_hashes: 0,
            cracked_hashes: 0,
            status: HashlistStatus::Ready,
            exclude_from_potfile: false,
            client_id: None,
            version_hash: "v1".into(),
            file_name: "triad.txt".into(),
            created_at: now,
        };
        hashlist_repository.insert_hashlist(&hashlist, "data/triad.txt").await.unwrap();
        hashlist_repository
            .register_hash_batch(9, &["aaa111", "bbb222", "ccc333"])
            .await
            .unwrap();

        let registered = hashlist_repository.fetch_hashlist(9).await.unwrap();
        assert_eq!(registered.total_hashes, 3);

        // 1. RÁFAGA INICIAL: dos cracks frescos.
        println!("   🧪 Fase 1: Ingesta inicial...");
        let first_burst = hashlist_repository
            .ingest_cracks(9, &[crack("aaa111", "summer2026"), crack("bbb222", "kraken!")], now)
            .await
            .unwrap();
        assert_eq!(first_burst.newly_cracked, 2);
        assert!(!first_burst.fully_cracked);
        assert_eq!(first_burst.fresh_entries.len(), 2);

        // 2. LEY DE DEDUPLICACIÓN: la repetición es una operación nula.
        println!("   🧪 Fase 2: Reporte duplicado...");
        let duplicate_burst = hashlist_repository
            .ingest_cracks(9, &[crack("aaa111", "summer2026"), crack("bbb222", "kraken!")], now)
            .await
            .unwrap();
        assert_eq!(duplicate_burst.newly_cracked, 0, "Dedup law violated.");
        assert!(duplicate_burst.fresh_entries.is_empty());

        let after_duplicate = hashlist_repository.fetch_hashlist(9).await.unwrap();
        assert_eq!(after_duplicate.cracked_hashes, 2, "Counter drifted on duplicate.");

        // 3. CIERRE TOTAL: el tercer crack agota la lista.
        println!("   🧪 Fase 3: Crack final...");
        let final_burst = hashlist_repository
            .ingest_cracks(9, &[crack("ccc333", "P@ssw0rd")], now)
            .await
            .unwrap();
        assert_eq!(final_burst.newly_cracked, 1);
        assert!(final_burst.fully_cracked, "Exhausted list not detected.");

        let exhausted = hashlist_repository.fetch_hashlist(9).await.unwrap();
        assert_eq!(exhausted.cracked_hashes, exhausted.total_hashes);
        assert!(exhausted.is_fully_cracked());

        // 4. MONOTONÍA: nada des-crackea un hash ni infla el contador.
        let post_exhaustion = hashlist_repository
            .ingest_cracks(9, &[crack("ccc333", "P@ssw0rd")], now)
            .await
            .unwrap();
        assert_eq!(post_exhaustion.newly_cracked, 0);
        let final_state = hashlist_repository.fetch_hashlist(9).await.unwrap();
        assert_eq!(final_state.cracked_hashes, 3);

        hashlist_repository.mark_completed(9).await.unwrap();
        let completed = hashlist_repository.fetch_hashlist(9).await.unwrap();
        assert_eq!(completed.status, HashlistStatus::Completed);

        println!("🏁 [INFORME]: Ley de deduplicación certificada. Veredicto: GOLD_MASTER");
    }

    /// Los usernames viajan con el crack y sobreviven la deduplicación.
    #[tokio::test]
    async fn certify_username_bearing_entries() {
        let database_client =
            LedgerClient::connect("file:mem_crack_users_v5?mode=memory&cache=shared", None)
                .await
                .expect("CRITICAL_FAULT: Failed to anchor in-memory ledger.");
        let hashlist_repository = HashlistRepository::new(database_client.clone());
        let now = Utc::now();

        let hashlist = Hashlist {
            id: 11,
            name: "with-users".into(),
            hash_type: 1000,
            total_hashes: 0,
            cracked_hashes: 0,
            status: HashlistStatus::Ready,
            exclude_from_potfile: true,
            client_id: None,
            version_hash: "v1".into(),
            file_name: "users.txt".into(),
            created_at: now,
        };
        hashlist_repository.insert_hashlist(&hashlist, "data/users.txt").await.unwrap();
        hashlist_repository.register_hash_batch(11, &["ddd444"]).await.unwrap();

        let burst = hashlist_repository
            .ingest_cracks(
                11,
                &[CrackEntry {
                    hash: "ddd444".into(),
                    plaintext: "winter".into(),
                    username: Some("svc-backup".into()),
                }],
                now,
            )
            .await
            .unwrap();

        assert_eq!(burst.newly_cracked, 1);
        assert!(burst.fully_cracked);
        assert_eq!(burst.fresh_entries[0].username.as_deref(), Some("svc-backup"));
    }
}
