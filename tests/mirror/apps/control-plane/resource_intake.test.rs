// [tests/mirror/apps/control-plane/resource_intake.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE INGESTA DE RECURSOS (V4.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: CONTEO DE LÍNEAS, HUELLA SHA-256 Y SERVIDO
 *
 * # Mathematical Proof (Fingerprint Parity):
 * La huella registrada debe igualar bit a bit el SHA-256 del archivo
 * en disco: es la misma huella que viaja como ETag en la pasarela y
 * como versión en la puerta de sincronización.
 * =================================================================
 */

use chrono::{TimeZone, Utc};
use kraken_control_plane::clock::{FrozenClock, SharedClock};
use kraken_control_plane::config::ControlPlaneConfig;
use kraken_control_plane::services::{fingerprint_file, ResourceIntakeService};
use kraken_control_plane::state::AppState;
use kraken_domain_models::FileKind;
use kraken_infra_db::LedgerClient;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::sync::Arc;

async fn forge_state(memory_url: &str) -> AppState {
    let database_client = LedgerClient::connect(memory_url, None)
        .await
        .expect("CRITICAL_FAULT: Failed to anchor in-memory ledger.");

    let frozen_clock = Arc::new(FrozenClock::starting_at(
        Utc.with_ymd_and_hms(2026, 3, 5, 11, 0, 0).unwrap(),
    ));
    let shared_clock: SharedClock = frozen_clock.clone();

    AppState::new(database_client, ControlPlaneConfig::default(), shared_clock)
}

#[cfg(test)]
mod tests {
    use super::*;

    /**
     * CERTIFICACIÓN: el conteo vía mmap y la huella SHA-256 del
     * registro coinciden con el archivo físico.
     */
    #[tokio::test]
    async fn certify_wordlist_fingerprint_and_registration() {
        println!("\n📚 [INICIO]: Auditoría de ingesta de diccionarios...");

        let intake_directory = tempfile::tempdir().expect("INFRA_FAULT: tempdir unavailable.");
        let wordlist_path = intake_directory.path().join("rockyou-mini.txt");

        // Cinco candidatos; el último sin salto de línea final.
        let wordlist_payload = b"password\n123456\nkraken\nletmein\ndragon";
        {
            let mut file_handle = std::fs::File::create(&wordlist_path).unwrap();
            file_handle.write_all(wordlist_payload).unwrap();
        }

        let expected_hash = hex::encode(Sha256::digest(wordlist_payload));

        let fingerprint = fingerprint_file(&wordlist_path)
            .expect("CRITICAL_FAULT: Fingerprint engine collapsed.");
        assert_eq!(fingerprint.line_count, 5, "Tail line without newline lost.");
        assert_eq!(fingerprint.content_hash, expected_hash);
        assert_eq!(fingerprint.size_bytes, wordlist_payload.len() as i64);

        let state = forge_state("file:mem_intake_wordlist_v4?mode=memory&cache=shared").await;
        let intake_service = ResourceIntakeService::new(state.clone());

        let registered = intake_service
            .register_wordlist(1, "rockyou-mini", &wordlist_path)
            .await
            .unwrap();
        assert_eq!(registered.line_count, 5);
        assert_eq!(registered.content_hash, expected_hash);

        // El calculador consume el mismo conteo desde el Ledger.
        let fetched = state.resource_repository.fetch_wordlist(1).await.unwrap();
        assert_eq!(fetched.line_count, 5);

        // La pasarela resuelve el servido por (clase, nombre de archivo).
        let served = state
            .resource_repository
            .resolve_served_file(FileKind::Wordlist, "rockyou-mini.txt")
            .await
            .unwrap();
        assert_eq!(served.content_hash, expected_hash);
        assert_eq!(served.size_bytes, wordlist_payload.len() as i64);

        println!("🏁 [INFORME]: Huella de diccionario certificada. Veredicto: GOLD_MASTER");
    }

    /**
     * CERTIFICACIÓN: reglas estáticas obtienen cardinalidad; reglas
     * dinámicas quedan pendientes de la sonda del binario.
     */
    #[tokio::test]
    async fn certify_rule_intake_static_and_dynamic() {
        let intake_directory = tempfile::tempdir().unwrap();
        let rule_path = intake_directory.path().join("best64-mini.rule");
        std::fs::write(&rule_path, b":\nu\nl\nc\n").unwrap();

        let state = forge_state("file:mem_intake_rules_v4?mode=memory&cache=shared").await;
        let intake_service = ResourceIntakeService::new(state.clone());

        let static_rule = intake_service
            .register_rule_file(1, "best64-mini", &rule_path, false)
            .await
            .unwrap();
        assert_eq!(static_rule.rule_count, Some(4));

        let dynamic_rule = intake_service
            .register_rule_file(2, "generated-rules", &rule_path, true)
            .await
            .unwrap();
        assert_eq!(dynamic_rule.rule_count, None, "Dynamic rule must defer its count.");

        // La sonda sella después la cardinalidad resuelta.
        state.resource_repository.set_rule_count(2, 77).await.unwrap();
        let sealed = state.resource_repository.fetch_rule(2).await.unwrap();
        assert_eq!(sealed.rule_count, Some(77));
    }

    /**
     * CERTIFICACIÓN: la versión de una hashlist registrada es la
     * huella del archivo y el total refleja los objetivos cargados.
     */
    #[tokio::test]
    async fn certify_hashlist_intake_version_hash() {
        let intake_directory = tempfile::tempdir().unwrap();
        let hashlist_path = intake_directory.path().join("clients.txt");
        let hashlist_payload = b"aaa111\nbbb222\nccc333\n";
        std::fs::write(&hashlist_path, hashlist_payload).unwrap();

        let expected_hash = hex::encode(Sha256::digest(hashlist_payload));

        let state = forge_state("file:mem_intake_hashlist_v4?mode=memory&cache=shared").await;
        let intake_service = ResourceIntakeService::new(state.clone());

        let registered = intake_service
            .register_hashlist(
                7,
                "client-ntlm",
                1000,
                &hashlist_path,
                &["aaa111", "bbb222", "ccc333"],
                false,
            )
            .await
            .unwrap();

        assert_eq!(registered.version_hash, expected_hash);
        assert_eq!(registered.total_hashes, 3);
        assert_eq!(registered.cracked_hashes, 0);

        let served = state
            .resource_repository
            .resolve_served_file(FileKind::Hashlist, "clients.txt")
            .await
            .unwrap();
        assert_eq!(served.content_hash, expected_hash);
    }
}
