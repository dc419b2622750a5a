// [tests/mirror/libs/infra/db/job_lifecycle.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DE CICLO DE VIDA DE EJECUCIONES (V6.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L3-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE FRONTERA ATÓMICA Y SELLADO IDEMPOTENTE
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. FRONTIER GUARD: Certifica que el avance de despacho rechaza
 *    cualquier delta que exceda el keyspace efectivo.
 * 2. IDEMPOTENT SEAL: Un segundo cierre de la misma tarea deja el
 *    progreso del trabajo bit-perfecto.
 *
 * # Mathematical Proof (Dispatch Invariant):
 * En todo instante: procesado ≤ despachado ≤ efectivo. El Ledger
 * actúa como semáforo atómico mediante UPDATEs condicionales.
 * =================================================================
 */

use chrono::Utc;
use kraken_domain_models::{
    AttackMode, Hashlist, HashlistStatus, JobExecutionStatus, JobTask, PresetJob, TaskStatus,
};
use kraken_domain_scheduling::KeyspaceVerdict;
use kraken_infra_db::repositories::{HashlistRepository, JobExecutionRepository, TaskRepository};
use kraken_infra_db::{DbError, LedgerClient};
use uuid::Uuid;

fn forge_preset(priority: i64, allow_override: bool) -> PresetJob {
    PresetJob {
        id: Uuid::new_v4(),
        name: "dictionary-sweep".into(),
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
        created_at: Utc::now(),
    }
}

fn forge_hashlist(hashlist_identifier: i64) -> Hashlist {
    Hashlist {
        id: hashlist_identifier,
        name: "corporate-ntlm".into(),
        hash_type: 1000,
        total_hashes: 0,
        cracked_hashes: 0,
        status: HashlistStatus::Ready,
        exclude_from_potfile: false,
        client_id: None,
        version_hash: "v1".into(),
        file_name: "corporate.txt".into(),
        created_at: Utc::now(),
    }
}

fn forge_assigned_task(
    job_identifier: Uuid,
    agent_identifier: i64,
    keyspace_start: i64,
    keyspace_end: i64,
) -> JobTask {
    JobTask {
        id: Uuid::new_v4(),
        job_execution_id: job_identifier,
        agent_id: Some(agent_identifier),
        status: TaskStatus::Assigned,
        keyspace_start,
        keyspace_end,
        rule_start_index: None,
        rule_end_index: None,
        chunk_duration_seconds: 300,
        progress_percent: 0.0,
        keyspace_processed: 0,
        benchmark_speed: 1_000_000,
        low_confidence: false,
        retry_count: 0,
        error_message: None,
        assigned_at: Some(Utc::now()),
        started_at: None,
        completed_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /**
     * CERTIFICACIÓN: [pending -> running -> completed] con frontera
     * atómica, rechazo de desborde y cierre idempotente de tareas.
     */
    #[tokio::test]
    async fn certify_dispatch_frontier_and_idempotent_sealing() {
        println!("\n🗄️  [INICIO]: Auditoría del ciclo de vida de ejecuciones...");
        let mut accumulated_anomalies_count = 0u32;

        let database_client =
            LedgerClient::connect("file:mem_job_lifecycle_v6?mode=memory&cache=shared", None)
                .await
                .expect("CRITICAL_FAULT: Failed to anchor in-memory ledger.");

        let job_repository = JobExecutionRepository::new(database_client.clone());
        let task_repository = TaskRepository::new(database_client.clone());
        let hashlist_repository = HashlistRepository::new(database_client.clone());

        let now = Utc::now();
        let hashlist = forge_hashlist(1);
        hashlist_repository
            .insert_hashlist(&hashlist, "data/hashlists/corporate.txt")
            .await
            .expect("DB_INSERT_FAULT: Hashlist genesis failed.");

        let verdict = KeyspaceVerdict {
            base_keyspace: 1_000,
            multiplication_factor: 1,
            effective_keyspace: 1_000,
            uses_rule_splitting: false,
        };

        let execution = job_repository
            .create_from_preset(&forge_preset(10, false), &hashlist, "sweep-1", Some(&verdict), now)
            .await
            .expect("DB_INSERT_FAULT: Execution genesis failed.");

        assert_eq!(execution.status, JobExecutionStatus::Pending);
        assert_eq!(execution.effective_keyspace, Some(1_000));

        // 1. AVANCE NOMINAL: pending -> running
        println!("   🧪 Fase 1: Avance atómico de frontera...");
        job_repository
            .advance_dispatch(&execution.id, 400, 400, 0, now)
            .await
            .expect("FRONTIER_FAULT: Legal advance rejected.");

        let advanced = job_repository.fetch_job(&execution.id).await.unwrap();
        assert_eq!(advanced.status, JobExecutionStatus::Running);
        assert_eq!(advanced.dispatched_keyspace, 400);
        assert_eq!(advanced.next_base_offset, 400);
        assert!(advanced.started_at.is_some());

        // 2. GUARDIA DE DESBORDE: 400 + 700 > 1000
        println!("   🧪 Fase 2: Rechazo de desborde de keyspace...");
        match job_repository.advance_dispatch(&execution.id, 700, 700, 0, now).await {
            Err(DbError::DispatchOverflow) => {
                println!("      ✅ Desborde rechazado con veredicto semántico.");
            }
            other => {
                println!("      ❌ FALLO: El Ledger aceptó un avance ilegal: {:?}", other.is_ok());
                accumulated_anomalies_count += 1;
            }
        }

        // 3. SELLADO IDEMPOTENTE DE TAREAS
        println!("   🧪 Fase 3: Cierre idempotente...");
        let first_task = forge_assigned_task(execution.id, 1, 0, 400);
        task_repository.create_assigned(&first_task).await.unwrap();

        let first_application = task_repository
            .complete_task(&first_task.id, TaskStatus::Completed, 400, None, now)
            .await
            .unwrap();
        assert!(first_application, "First seal must apply.");
        job_repository
            .add_processed_volume(&execution.id, 400, now)
            .await
            .unwrap();

        let duplicate_application = task_repository
            .complete_task(&first_task.id, TaskStatus::Completed, 400, None, now)
            .await
            .unwrap();
        if duplicate_application {
            println!("      ❌ FALLO: El Ledger aplicó dos veces el mismo cierre.");
            accumulated_anomalies_count += 1;
        }

        let after_duplicate = job_repository.fetch_job(&execution.id).await.unwrap();
        assert_eq!(after_duplicate.processed_keyspace, 400, "Duplicate seal mutated progress.");

        // 4. CIERRE DEL TRABAJO SOLO CON TODO PROCESADO
        let premature_seal = job_repository.complete_job_if_done(&execution.id, now).await.unwrap();
        assert!(!premature_seal, "Job sealed with pending keyspace.");

        job_repository.advance_dispatch(&execution.id, 600, 600, 0, now).await.unwrap();
        let second_task = forge_assigned_task(execution.id, 1, 400, 1_000);
        task_repository.create_assigned(&second_task).await.unwrap();
        task_repository
            .complete_task(&second_task.id, TaskStatus::Completed, 600, None, now)
            .await
            .unwrap();
        job_repository.add_processed_volume(&execution.id, 600, now).await.unwrap();

        let final_seal = job_repository.complete_job_if_done(&execution.id, now).await.unwrap();
        assert!(final_seal, "Fully processed job refused to seal.");

        let sealed = job_repository.fetch_job(&execution.id).await.unwrap();
        assert_eq!(sealed.status, JobExecutionStatus::Completed);
        assert_eq!(sealed.processed_keyspace, 1_000);
        assert!(sealed.completed_at.is_some());
        assert!((sealed.overall_progress_percent - 100.0).abs() < f64::EPSILON);

        assert_eq!(
            accumulated_anomalies_count, 0,
            "La integridad del ciclo de vida ha sido comprometida."
        );
        println!("🏁 [INFORME]: Ciclo de vida certificado. Veredicto: GOLD_MASTER");
    }

    /**
     * CERTIFICACIÓN: Legalidad de transiciones de estado del trabajo.
     */
    #[tokio::test]
    async fn certify_status_machine_legality() {
        let database_client =
            LedgerClient::connect("file:mem_job_transitions_v6?mode=memory&cache=shared", None)
                .await
                .expect("CRITICAL_FAULT: Failed to anchor in-memory ledger.");

        let job_repository = JobExecutionRepository::new(database_client.clone());
        let hashlist_repository = HashlistRepository::new(database_client.clone());
        let now = Utc::now();

        let hashlist = forge_hashlist(2);
        hashlist_repository
            .insert_hashlist(&hashlist, "data/hashlists/corp2.txt")
            .await
            .unwrap();

        let verdict = KeyspaceVerdict {
            base_keyspace: 500,
            multiplication_factor: 1,
            effective_keyspace: 500,
            uses_rule_splitting: false,
        };
        let execution = job_repository
            .create_from_preset(&forge_preset(5, false), &hashlist, "sweep-2", Some(&verdict), now)
            .await
            .unwrap();

        // resume sobre un trabajo no pausado es ilegal.
        assert!(matches!(
            job_repository.resume_job(&execution.id, now).await,
            Err(DbError::InvalidState)
        ));

        // pause -> resume preserva la semántica pending/running.
        job_repository.pause_job(&execution.id, None, now).await.unwrap();
        let paused = job_repository.fetch_job(&execution.id).await.unwrap();
        assert_eq!(paused.status, JobExecutionStatus::Paused);

        job_repository.resume_job(&execution.id, now).await.unwrap();
        let resumed = job_repository.fetch_job(&execution.id).await.unwrap();
        assert_eq!(resumed.status, JobExecutionStatus::Pending, "Never-started job resumes to pending.");

        // cancel sella y bloquea avances posteriores.
        job_repository.cancel_job(&execution.id, now).await.unwrap();
        assert!(matches!(
            job_repository.advance_dispatch(&execution.id, 10, 10, 0, now).await,
            Err(DbError::InvalidState)
        ));

        // fail sobre un trabajo ya cancelado es ilegal.
        assert!(matches!(
            job_repository.fail_job(&execution.id, "late fault", now).await,
            Err(DbError::InvalidState)
        ));
    }
}
