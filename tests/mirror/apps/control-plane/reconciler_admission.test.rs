// [tests/mirror/apps/control-plane/reconciler_admission.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL RECONCILIADOR (V7.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L4-MIRROR
 * RESPONSABILIDAD: BENCHMARK GATE, DESPACHO Y PREEMPCIÓN EN UN PASE
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DETERMINISTIC DRIVE: Los pases del reconciliador se conducen a
 *    mano con el reloj congelado; ningún temporizador real participa.
 * 2. WIRE EVIDENCE: El canal FIFO del agente es la evidencia: cada
 *    directiva emitida se inspecciona en orden de envío.
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
    Agent, AgentStatus, AttackMode, DeviceProfile, Hashlist, HashlistStatus, JobExecution,
    JobExecutionStatus, PresetJob, ServerMessage, StopReason, TaskAssignment, TaskOutcome,
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
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
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
        .expect("DB_INSERT_FAULT: Agent enrollment failed.");
    state.agent_directory.register_link(agent_identifier)
}

async fn seed_target_hashlist(state: &AppState, hashlist_identifier: i64) -> Hashlist {
    let hashlist = Hashlist {
        id: hashlist_identifier,
        name: "campaign-targets".into(),
        hash_type: TARGET_HASH_TYPE,
        total_hashes: 0,
        cracked_hashes: 0,
        status: HashlistStatus::Ready,
        exclude_from_potfile: false,
        client_id: None,
        version_hash: "v1".into(),
        file_name: format!("targets-{}.txt", hashlist_identifier),
        created_at: state.clock.now(),
    };
    state
        .hashlist_repository
        .insert_hashlist(&hashlist, "data/targets.txt")
        .await
        .unwrap();
    state
        .hashlist_repository
        .register_hash_batch(hashlist_identifier, &["aaa111", "bbb222", "ccc333"])
        .await
        .unwrap();
    state
        .hashlist_repository
        .fetch_hashlist(hashlist_identifier)
        .await
        .unwrap()
}

async fn seed_campaign(
    state: &AppState,
    hashlist: &Hashlist,
    wordlist_lines: i64,
    priority: i64,
    allow_override: bool,
    campaign_name: &str,
) -> JobExecution {
    let verdict = compute_keyspace(
        AttackMode::Straight,
        &AttackResources {
            wordlist_line_counts: vec![wordlist_lines],
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
        allow_high_priority_override: allow_override,
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

#[cfg(test)]
mod tests {
    use super::*;

    /**
     * CERTIFICACIÓN: Un par (agente, modo, hash) sin benchmark fresco
     * primero mide y después despacha con la velocidad reportada;
     * el chunk se recorta al diccionario íntegro y el cierre sella la
     * campaña completa.
     */
    #[tokio::test]
    async fn certify_benchmark_gate_then_clamped_dispatch() {
        println!("\n🧠 [INICIO]: Auditoría del gate de benchmark y despacho...");

        let (state, _frozen_clock) =
            forge_state("file:mem_reconciler_gate_v7?mode=memory&cache=shared").await;
        let mut agent_channel = enroll_linked_agent(&state, 1).await;

        let hashlist = seed_target_hashlist(&state, 1).await;
        state
            .sync_repository
            .mark_in_sync(1, hashlist.id, "v1", state.clock.now())
            .await
            .unwrap();
        let execution = seed_campaign(&state, &hashlist, 1_000_000, 10, false, "sweep-alpha").await;

        let mut reconciler = ReconcilerService::new(state.clone()).unwrap();

        // PASE 1: sin muestra -> orden de medición, cero despacho.
        println!("   🧪 Fase 1: Primer pase exige benchmark...");
        reconciler.execute_reconciliation_pass().await.unwrap();

        match agent_channel.try_recv() {
            Ok(ServerMessage::RunBenchmark {
                attack_mode,
                hash_type,
                ..
            }) => {
                assert_eq!(attack_mode, AttackMode::Straight);
                assert_eq!(hash_type, TARGET_HASH_TYPE);
            }
            other => panic!("INTEGRITY_COLLAPSE: expected run_benchmark, got {:?}", other),
        }
        assert!(agent_channel.try_recv().is_err(), "No task may dispatch before measuring.");
        assert!(state.agent_directory.is_benchmarking(1));

        let untouched = state.job_repository.fetch_job(&execution.id).await.unwrap();
        assert_eq!(untouched.dispatched_keyspace, 0);

        // PASE 2: la medición sigue en vuelo -> silencio absoluto.
        reconciler.execute_reconciliation_pass().await.unwrap();
        assert!(agent_channel.try_recv().is_err());

        // RESULTADO DE MEDICIÓN: despierta y habilita el despacho.
        println!("   🧪 Fase 2: Resultado de benchmark habilita despacho...");
        BenchmarkRegistryService::new(state.clone())
            .record_result(1, AttackMode::Straight, TARGET_HASH_TYPE, 1_000_000)
            .await
            .unwrap();
        assert!(!state.agent_directory.is_benchmarking(1));

        reconciler.execute_reconciliation_pass().await.unwrap();
        let assignment = expect_assignment(agent_channel.try_recv().expect("No assignment emitted."));

        // 1M H/s × 300s = 300M ideal, recortado al millón de líneas.
        assert_eq!(assignment.keyspace_start, 0);
        assert_eq!(assignment.keyspace_end, 1_000_000);
        assert_eq!(assignment.rule_start_index, None);
        assert_eq!(assignment.hashlist_id, hashlist.id);
        assert_eq!(assignment.hashlist_version, "v1");

        let dispatched = state.job_repository.fetch_job(&execution.id).await.unwrap();
        assert_eq!(dispatched.status, JobExecutionStatus::Running);
        assert_eq!(dispatched.dispatched_keyspace, 1_000_000);

        // CIERRE: un único task_complete sella la campaña íntegra.
        println!("   🧪 Fase 3: Cierre de campaña...");
        DispatchService::new(state.clone())
            .ingest_completion(1, assignment.task_id, TaskOutcome::Completed, 1_000_000, None)
            .await
            .unwrap();

        let sealed = state.job_repository.fetch_job(&execution.id).await.unwrap();
        assert_eq!(sealed.status, JobExecutionStatus::Completed);
        assert_eq!(sealed.processed_keyspace, 1_000_000);

        println!("🏁 [INFORME]: Gate y despacho certificados. Veredicto: GOLD_MASTER");
    }

    /**
     * CERTIFICACIÓN: Un trabajo override listo sin capacidad ociosa
     * desaloja en un pase a la víctima de menor prioridad; la víctima
     * reanuda desde su hueco cuando la capacidad regresa.
     */
    #[tokio::test]
    async fn certify_high_priority_preemption_and_victim_resume() {
        println!("\n⚔️  [INICIO]: Auditoría de preempción de alta prioridad...");

        let (state, _frozen_clock) =
            forge_state("file:mem_reconciler_preempt_v7?mode=memory&cache=shared").await;
        let mut agent_channel = enroll_linked_agent(&state, 1).await;

        let hashlist = seed_target_hashlist(&state, 1).await;
        state
            .sync_repository
            .mark_in_sync(1, hashlist.id, "v1", state.clock.now())
            .await
            .unwrap();
        BenchmarkRegistryService::new(state.clone())
            .record_result(1, AttackMode::Straight, TARGET_HASH_TYPE, 1_000_000)
            .await
            .unwrap();

        let victim_execution =
            seed_campaign(&state, &hashlist, 500_000, 10, false, "background-sweep").await;

        let mut reconciler = ReconcilerService::new(state.clone()).unwrap();
        reconciler.execute_reconciliation_pass().await.unwrap();

        let victim_assignment =
            expect_assignment(agent_channel.try_recv().expect("Victim never dispatched."));
        assert!(agent_channel.try_recv().is_err());

        // El trabajo override nace con la flota saturada.
        println!("   🧪 Fase 1: Ignición del trabajo override...");
        let override_execution =
            seed_campaign(&state, &hashlist, 500_000, 50, true, "urgent-sweep").await;

        reconciler.execute_reconciliation_pass().await.unwrap();

        // Orden FIFO en el cable: stop de la víctima antes del assign nuevo.
        match agent_channel.try_recv() {
            Ok(ServerMessage::StopTask { task_id, reason }) => {
                assert_eq!(task_id, victim_assignment.task_id);
                assert_eq!(reason, StopReason::Preempted);
            }
            other => panic!("INTEGRITY_COLLAPSE: expected stop_task, got {:?}", other),
        }
        let override_assignment =
            expect_assignment(agent_channel.try_recv().expect("Override job never dispatched."));
        assert_eq!(override_assignment.job_execution_id, override_execution.id);

        let paused_victim = state.job_repository.fetch_job(&victim_execution.id).await.unwrap();
        assert_eq!(paused_victim.status, JobExecutionStatus::Paused);
        assert_eq!(paused_victim.interrupted_by, Some(override_execution.id));
        assert_eq!(
            paused_victim.dispatched_keyspace, 0,
            "Victim interval must be released for re-issue."
        );

        // El override termina: la víctima reclama su hueco original.
        println!("   🧪 Fase 2: Reanudación de la víctima...");
        DispatchService::new(state.clone())
            .ingest_completion(
                1,
                override_assignment.task_id,
                TaskOutcome::Completed,
                500_000,
                None,
            )
            .await
            .unwrap();

        let sealed_override = state.job_repository.fetch_job(&override_execution.id).await.unwrap();
        assert_eq!(sealed_override.status, JobExecutionStatus::Completed);

        reconciler.execute_reconciliation_pass().await.unwrap();
        let resumed_assignment =
            expect_assignment(agent_channel.try_recv().expect("Victim never resumed."));
        assert_eq!(resumed_assignment.job_execution_id, victim_execution.id);
        assert_eq!(resumed_assignment.keyspace_start, victim_assignment.keyspace_start);
        assert_eq!(resumed_assignment.keyspace_end, victim_assignment.keyspace_end);

        let resumed_victim = state.job_repository.fetch_job(&victim_execution.id).await.unwrap();
        assert_eq!(resumed_victim.status, JobExecutionStatus::Running);
        assert_eq!(resumed_victim.interrupted_by, None);
        assert_eq!(resumed_victim.dispatched_keyspace, 500_000);

        DispatchService::new(state.clone())
            .ingest_completion(1, resumed_assignment.task_id, TaskOutcome::Completed, 500_000, None)
            .await
            .unwrap();
        let sealed_victim = state.job_repository.fetch_job(&victim_execution.id).await.unwrap();
        assert_eq!(sealed_victim.status, JobExecutionStatus::Completed);

        println!("🏁 [INFORME]: Preempción certificada. Veredicto: GOLD_MASTER");
    }
}
