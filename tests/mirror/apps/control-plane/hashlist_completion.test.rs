// [tests/mirror/apps/control-plane/hashlist_completion.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE LISTA ÍNTEGRAMENTE CRACKEADA (V5.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: EFECTO CENTRALIZADO DE EXHAUSTIÓN DE OBJETIVOS
 *
 * # Mathematical Proof (Exhaustion Side Effect):
 * Cuando cracked = total, en un solo paso de ingesta toda campaña
 * activa sobre la lista queda terminal, toda tarea en vuelo recibe
 * stop_task(hashlist_fully_cracked) y ningún despacho posterior
 * toca la lista. El potfile recibe cada par exactamente una vez.
 * =================================================================
 */

use chrono::{TimeZone, Utc};
use kraken_control_plane::clock::{FrozenClock, SharedClock};
use kraken_control_plane::config::ControlPlaneConfig;
use kraken_control_plane::services::{
    BenchmarkRegistryService, DispatchService, ReconcilerService,
};
use kraken_control_plane::state::AppState;
use kraken_domain_models::{
    Agent, AgentStatus, AttackMode, CrackEntry, DeviceProfile, Hashlist, HashlistStatus,
    JobExecution, JobExecutionStatus, PresetJob, ServerMessage, StopReason, TaskAssignment,
};
use kraken_domain_scheduling::{compute_keyspace, AttackResources};
use kraken_infra_db::LedgerClient;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

const TARGET_HASH_TYPE: i64 = 1000;

async fn forge_state(memory_url: &str, potfile_path: std::path::PathBuf) -> (AppState, Arc<FrozenClock>) {
    let database_client = LedgerClient::connect(memory_url, None)
        .await
        .expect("CRITICAL_FAULT: Failed to anchor in-memory ledger.");

    let frozen_clock = Arc::new(FrozenClock::starting_at(
        Utc.with_ymd_and_hms(2026, 3, 4, 10, 0, 0).unwrap(),
    ));
    let shared_clock: SharedClock = frozen_clock.clone();

    let mut config = ControlPlaneConfig::default();
    config.potfile_path = potfile_path;

    (
        AppState::new(database_client, config, shared_clock),
        frozen_clock,
    )
}

async fn enroll_linked_agent(
    state: &AppState,
    agent_identifier: i64,
) -> mpsc::Receiver<ServerMessage> {
    let now = state.clock.now();
    let agent = Agent {
        id: agent_identifier,
        name: format!("forge-{}", agent_identifier),
        status: AgentStatus::Active,
        owner_id: None,
        devices: vec![DeviceProfile {
            index: 0,
            name: "RTX 4090".into(),
            class: "gpu-high".into(),
            enabled: true,
        }],
        schedule: vec![],
        last_heartbeat: Some(now),
        consecutive_failures: 0,
    };
    state
        .agent_repository
        .insert_agent(&agent, "forge-key")
        .await
        .unwrap();
    state
        .sync_repository
        .mark_in_sync(agent_identifier, 5, "v1", now)
        .await
        .unwrap();
    BenchmarkRegistryService::new(state.clone())
        .record_result(agent_identifier, AttackMode::Straight, TARGET_HASH_TYPE, 1_000_000)
        .await
        .unwrap();
    state.agent_directory.register_link(agent_identifier)
}

async fn seed_campaign(
    state: &AppState,
    hashlist: &Hashlist,
    priority: i64,
    campaign_name: &str,
) -> JobExecution {
    let verdict = compute_keyspace(
        AttackMode::Straight,
        &AttackResources {
            wordlist_line_counts: vec![1_000_000],
            rule_counts: vec![],
            mask: None,
        },
        &state.config.rule_split_policy(),
    )
    .unwrap();

    let preset = PresetJob {
        id: Uuid::new_v4(),
        name: campaign_name.to_string(),
        attack_mode: AttackMode::Straight,
        priority,
        binary_version_id: 1,
        wordlist_ids: vec![1],
        rule_ids: vec![],
        mask: None,
        chunk_duration_seconds: 300,
        allow_high_priority_override: false,
        max_agents: 0,
        keyspace: None,
        created_at: state.clock.now(),
    };

    state
        .job_repository
        .create_from_preset(&preset, hashlist, campaign_name, Some(&verdict), state.clock.now())
        .await
        .unwrap()
}

fn expect_assignment(message: ServerMessage) -> TaskAssignment {
    match message {
        ServerMessage::AssignTask(assignment) => assignment,
        other => panic!("INTEGRITY_COLLAPSE: expected assign_task, got {:?}", other),
    }
}

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

    /**
     * CERTIFICACIÓN: dos campañas activas sobre la misma lista; un
     * reporte con el 100% de los objetivos detiene ambas en un paso.
     */
    #[tokio::test]
    async fn certify_full_crack_halts_every_campaign() {
        println!("\n🏆 [INICIO]: Auditoría de exhaustión de hashlist...");

        let potfile_directory = tempfile::tempdir().expect("INFRA_FAULT: tempdir unavailable.");
        let potfile_path = potfile_directory.path().join("kraken.potfile");
        let (state, _frozen_clock) = forge_state(
            "file:mem_hashlist_exhaustion_v5?mode=memory&cache=shared",
            potfile_path.clone(),
        )
        .await;

        // GÉNESIS: lista de 3 objetivos compartida por dos campañas.
        let now = state.clock.now();
        let hashlist = Hashlist {
            id: 5,
            name: "shared-targets".into(),
            hash_type: TARGET_HASH_TYPE,
            total_hashes: 0,
            cracked_hashes: 0,
            status: HashlistStatus::Ready,
            exclude_from_potfile: false,
            client_id: None,
            version_hash: "v1".into(),
            file_name: "shared.txt".into(),
            created_at: now,
        };
        state
            .hashlist_repository
            .insert_hashlist(&hashlist, "data/shared.txt")
            .await
            .unwrap();
        state
            .hashlist_repository
            .register_hash_batch(5, &["aaa111", "bbb222", "ccc333"])
            .await
            .unwrap();
        let hashlist = state.hashlist_repository.fetch_hashlist(5).await.unwrap();

        let first_campaign = seed_campaign(&state, &hashlist, 10, "wordlist-pass").await;
        let second_campaign = seed_campaign(&state, &hashlist, 5, "slow-pass").await;

        let mut first_agent_channel = enroll_linked_agent(&state, 1).await;
        let mut second_agent_channel = enroll_linked_agent(&state, 2).await;

        let mut reconciler = ReconcilerService::new(state.clone()).unwrap();
        reconciler.execute_reconciliation_pass().await.unwrap();

        let first_assignment =
            expect_assignment(first_agent_channel.try_recv().expect("Campaign 1 never dispatched."));
        let second_assignment = expect_assignment(
            second_agent_channel.try_recv().expect("Campaign 2 never dispatched."),
        );
        assert_eq!(first_assignment.job_execution_id, first_campaign.id);
        assert_eq!(second_assignment.job_execution_id, second_campaign.id);

        // REPORTE TOTAL: los tres objetivos caen en una sola ráfaga.
        println!("   🧪 Fase 1: Reporte del 100% de objetivos...");
        let dispatch_service = DispatchService::new(state.clone());
        dispatch_service
            .ingest_crack_report(
                1,
                first_assignment.task_id,
                5,
                vec![
                    crack("aaa111", "summer2026"),
                    crack("bbb222", "kraken!"),
                    crack("ccc333", "P@ssw0rd"),
                ],
            )
            .await
            .unwrap();

        // Ambas campañas terminales; ambas tareas detenidas por exhaustión.
        let sealed_first = state.job_repository.fetch_job(&first_campaign.id).await.unwrap();
        let sealed_second = state.job_repository.fetch_job(&second_campaign.id).await.unwrap();
        assert_eq!(sealed_first.status, JobExecutionStatus::Completed);
        assert_eq!(sealed_second.status, JobExecutionStatus::Completed);

        for (channel_label, channel) in [
            ("agent-1", &mut first_agent_channel),
            ("agent-2", &mut second_agent_channel),
        ] {
            match channel.try_recv() {
                Ok(ServerMessage::StopTask { reason, .. }) => {
                    assert_eq!(
                        reason,
                        StopReason::HashlistFullyCracked,
                        "{} received the wrong stop cause.",
                        channel_label
                    );
                }
                other => panic!(
                    "INTEGRITY_COLLAPSE: {} expected stop_task, got {:?}",
                    channel_label, other
                ),
            }
        }

        let exhausted = state.hashlist_repository.fetch_hashlist(5).await.unwrap();
        assert_eq!(exhausted.status, HashlistStatus::Completed);
        assert!(exhausted.is_fully_cracked());

        // SIN DESPACHOS POSTERIORES sobre la lista agotada.
        println!("   🧪 Fase 2: Silencio post-exhaustión...");
        reconciler.execute_reconciliation_pass().await.unwrap();
        assert!(first_agent_channel.try_recv().is_err());
        assert!(second_agent_channel.try_recv().is_err());

        // POTFILE: cada par exactamente una vez, incluso re-reportado.
        println!("   🧪 Fase 3: Idempotencia del potfile...");
        dispatch_service
            .ingest_crack_report(
                1,
                first_assignment.task_id,
                5,
                vec![crack("aaa111", "summer2026")],
            )
            .await
            .unwrap();

        let potfile_content = std::fs::read_to_string(&potfile_path)
            .expect("POTFILE_FAULT: Aggregate store missing.");
        let potfile_lines: Vec<&str> = potfile_content.lines().collect();
        assert_eq!(potfile_lines.len(), 3, "Potfile must hold each pair once.");
        assert!(potfile_content.contains("aaa111:summer2026"));
        assert!(potfile_content.contains("bbb222:kraken!"));
        assert!(potfile_content.contains("ccc333:P@ssw0rd"));

        let unchanged = state.hashlist_repository.fetch_hashlist(5).await.unwrap();
        assert_eq!(unchanged.cracked_hashes, 3, "Re-report mutated the counter.");

        println!("🏁 [INFORME]: Exhaustión certificada. Veredicto: GOLD_MASTER");
    }
}
