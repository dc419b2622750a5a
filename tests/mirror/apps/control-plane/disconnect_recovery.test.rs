// [tests/mirror/apps/control-plane/disconnect_recovery.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE RECUPERACIÓN POR DESCONEXIÓN (V6.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: GRACIA DE RECONEXIÓN, LIBERACIÓN Y RE-EMISIÓN
 *
 * # Mathematical Proof (Grace Discipline):
 * Un agente caído conserva su tarea suspendida durante la gracia.
 * Al expirar, el intervalo regresa íntegro al Ledger de huecos y la
 * contabilidad de despacho queda como antes del envío perdido. El
 * reloj congelado conduce los temporizadores sin dormir hilos.
 * =================================================================
 */

use chrono::{Duration, TimeZone, Utc};
use kraken_control_plane::clock::{FrozenClock, SharedClock};
use kraken_control_plane::config::ControlPlaneConfig;
use kraken_control_plane::services::{
    quarantine_agent_link, BenchmarkRegistryService, DispatchService, ReconcilerService,
    RecoveryService,
};
use kraken_control_plane::state::AppState;
use kraken_domain_models::{
    Agent, AgentStatus, AttackMode, DeviceProfile, Hashlist, HashlistStatus, PresetJob,
    ServerMessage, TaskAssignment, TaskStatus,
};
use kraken_domain_scheduling::{compute_keyspace, AttackResources};
use kraken_infra_db::LedgerClient;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

const TARGET_HASH_TYPE: i64 = 1000;

async fn forge_state(memory_url: &str) -> (AppState, Arc<FrozenClock>) {
    let database_client = LedgerClient::connect(memory_url, None)
        .await
        .expect("CRITICAL_FAULT: Failed to anchor in-memory ledger.");

    let frozen_clock = Arc::new(FrozenClock::starting_at(
        Utc.with_ymd_and_hms(2026, 3, 3, 7, 30, 0).unwrap(),
    ));
    let shared_clock: SharedClock = frozen_clock.clone();

    (
        AppState::new(database_client, ControlPlaneConfig::default(), shared_clock),
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
        .mark_in_sync(agent_identifier, 1, "v1", now)
        .await
        .unwrap();
    BenchmarkRegistryService::new(state.clone())
        .record_result(agent_identifier, AttackMode::Straight, TARGET_HASH_TYPE, 1_000_000)
        .await
        .unwrap();
    state.agent_directory.register_link(agent_identifier)
}

fn expect_assignment(message: ServerMessage) -> TaskAssignment {
    match message {
        ServerMessage::AssignTask(assignment) => assignment,
        other => panic!("INTEGRITY_COLLAPSE: expected assign_task, got {:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /**
     * CERTIFICACIÓN: desconexión en vuelo -> reconnect_pending ->
     * gracia expirada -> liberación -> re-emisión al siguiente agente.
     */
    #[tokio::test]
    async fn certify_grace_expiry_releases_and_reissues_interval() {
        println!("\n⚰️  [INICIO]: Auditoría de gracia de reconexión...");

        let (state, frozen_clock) =
            forge_state("file:mem_disconnect_grace_v6?mode=memory&cache=shared").await;

        // GÉNESIS: lista objetivo + campaña de un millón de líneas.
        let hashlist = Hashlist {
            id: 1,
            name: "grace-targets".into(),
            hash_type: TARGET_HASH_TYPE,
            total_hashes: 0,
            cracked_hashes: 0,
            status: HashlistStatus::Ready,
            exclude_from_potfile: false,
            client_id: None,
            version_hash: "v1".into(),
            file_name: "grace.txt".into(),
            created_at: state.clock.now(),
        };
        state
            .hashlist_repository
            .insert_hashlist(&hashlist, "data/grace.txt")
            .await
            .unwrap();
        state
            .hashlist_repository
            .register_hash_batch(1, &["aaa111", "bbb222", "ccc333"])
            .await
            .unwrap();
        let hashlist = state.hashlist_repository.fetch_hashlist(1).await.unwrap();

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
            name: "grace-sweep".into(),
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
            created_at: state.clock.now(),
        };
        let execution = state
            .job_repository
            .create_from_preset(&preset, &hashlist, "grace-sweep", Some(&verdict), state.clock.now())
            .await
            .unwrap();

        let mut first_agent_channel = enroll_linked_agent(&state, 1).await;
        let mut reconciler = ReconcilerService::new(state.clone()).unwrap();

        // DESPACHO NOMINAL
        reconciler.execute_reconciliation_pass().await.unwrap();
        let assignment =
            expect_assignment(first_agent_channel.try_recv().expect("No assignment emitted."));
        assert_eq!(assignment.keyspace_start, 0);
        assert_eq!(assignment.keyspace_end, 1_000_000);

        // PROGRESO AL 40% + GUARDIA DE MONOTONÍA
        println!("   🧪 Fase 1: Progreso parcial y monotonía...");
        let dispatch_service = DispatchService::new(state.clone());
        dispatch_service
            .ingest_progress(1, assignment.task_id, 400_000, 40.0, 1_000_000)
            .await
            .unwrap();

        // Un reporte reordenado con volumen menor debe ignorarse.
        dispatch_service
            .ingest_progress(1, assignment.task_id, 300_000, 30.0, 1_000_000)
            .await
            .unwrap();
        let monotone_task = state.task_repository.fetch_task(&assignment.task_id).await.unwrap();
        assert_eq!(monotone_task.keyspace_processed, 400_000, "Monotone guard violated.");
        assert_eq!(monotone_task.status, TaskStatus::Running);

        // DESCONEXIÓN: la tarea queda suspendida, no cancelada.
        println!("   🧪 Fase 2: Cuarentena y suspensión...");
        quarantine_agent_link(&state, 1, state.clock.now()).await.unwrap();
        let suspended_task = state.task_repository.fetch_task(&assignment.task_id).await.unwrap();
        assert_eq!(suspended_task.status, TaskStatus::ReconnectPending);

        let mid_grace = state.job_repository.fetch_job(&execution.id).await.unwrap();
        assert_eq!(mid_grace.dispatched_keyspace, 1_000_000, "Grace must preserve accounting.");

        // GRACIA EXPIRADA: 301s > 300s de presupuesto.
        println!("   🧪 Fase 3: Expiración de gracia y liberación...");
        frozen_clock.advance(Duration::seconds(301));
        RecoveryService::new(state.clone())
            .execute_recovery_sequence(1)
            .await
            .unwrap();

        let released_task = state.task_repository.fetch_task(&assignment.task_id).await.unwrap();
        assert_eq!(released_task.status, TaskStatus::Cancelled);

        let post_release = state.job_repository.fetch_job(&execution.id).await.unwrap();
        assert_eq!(post_release.dispatched_keyspace, 0, "Release compensation violated.");

        // RE-EMISIÓN: un segundo agente hereda el intervalo íntegro.
        println!("   🧪 Fase 4: Re-emisión al agente de reemplazo...");
        let mut second_agent_channel = enroll_linked_agent(&state, 2).await;

        reconciler.execute_reconciliation_pass().await.unwrap();
        let reissued =
            expect_assignment(second_agent_channel.try_recv().expect("Interval never re-issued."));
        assert_eq!(reissued.keyspace_start, 0);
        assert_eq!(reissued.keyspace_end, 1_000_000);
        assert_ne!(reissued.task_id, assignment.task_id, "Re-issue must be a fresh task.");

        let post_reissue = state.job_repository.fetch_job(&execution.id).await.unwrap();
        assert_eq!(post_reissue.dispatched_keyspace, 1_000_000);

        // El canal del agente caído no recibió directiva alguna.
        assert!(first_agent_channel.try_recv().is_err());

        println!("🏁 [INFORME]: Gracia y re-emisión certificadas. Veredicto: GOLD_MASTER");
    }
}
