// [apps/control-plane/src/services/reconciler.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN RECONCILER SERVICE (V27.0 - GOLD MASTER)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: BUCLE ÚNICO DE DECISIONES DE DESPACHO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SINGLE WRITER: Un único bucle cooperativo posee todas las
 *    decisiones de despacho y todo avance de frontera de keyspace.
 *    El resto del sistema solo emite señales de despertar.
 * 2. COALESCING WAKEUPS: Las señales acumuladas entre pases se
 *    drenan en bloque; un pase absorbe cualquier ráfaga.
 * 3. BOUNDED ITERATION: Cada pase respeta un presupuesto de tiempo
 *    y cede el reactor, garantizando latencia estable de señales.
 *
 * # Mathematical Proof (No Overlapping Intervals):
 * Toda mutación de 'dispatched_keyspace' ocurre en este bucle a
 * través de UPDATEs condicionales por fila de trabajo. Al no existir
 * un segundo escritor, dos chunks del mismo trabajo jamás comparten
 * intervalo.
 * =================================================================
 */

use crate::services::benchmark_registry::{BenchmarkRegistryService, SpeedResolution};
use crate::services::dispatch::{released_interval_from_task, DispatchService, Dispatcher};
use crate::services::hashlist_sync::{HashlistSyncService, SyncGateVerdict};
use crate::services::ignition::resolve_keyspace_verdict;
use crate::services::signal_bus::ReconcileSignal;
use crate::state::AppState;
use chrono::{DateTime, Utc};
use kraken_domain_models::{
    JobExecution, JobExecutionStatus, JobTask, RealTimeEvent, ServerMessage, StopReason,
    TaskStatus,
};
use kraken_domain_scheduling::{plan_next_chunk, JobFrontier};
use kraken_infra_db::DbError;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Candidatos de trabajo examinados por agente y pase.
const CANDIDATE_WALK_LIMIT: i64 = 16;

/// Plazo concedido al agente para una medición de benchmark.
const BENCHMARK_DIRECTIVE_TIMEOUT_SECONDS: i64 = 180;

/// Veredicto de un intento de despacho (agente, trabajo).
enum AgentDecision {
    /// Tarea entregada: el agente queda ocupado.
    Dispatched,
    /// El agente quedó consumido este pase (benchmark o sync en vuelo).
    AgentConsumed,
    /// El trabajo no es viable para este agente: probar el siguiente.
    NextJob,
}

/**
 * Bucle reconciliador: el único dueño del despacho distribuido.
 */
pub struct ReconcilerService {
    application_shared_state: AppState,
    signal_receiver: mpsc::Receiver<ReconcileSignal>,
    /// Última asignación por agente (guardia anti-inanición).
    last_assignment_memory: HashMap<i64, Uuid>,
    /// Solicitudes de benchmark emitidas por combinación táctica.
    benchmark_attempt_memory: HashMap<(i64, String, i64), u32>,
}

impl ReconcilerService {
    /**
     * Construye el reconciliador reclamando el receptor exclusivo del
     * bus de señales.
     */
    pub fn new(application_state: AppState) -> anyhow::Result<Self> {
        let signal_receiver = application_state
            .signal_bus
            .claim_receiver()
            .ok_or_else(|| anyhow::anyhow!("signal receiver already claimed"))?;

        Ok(Self {
            application_shared_state: application_state,
            signal_receiver,
            last_assignment_memory: HashMap::new(),
            benchmark_attempt_memory: HashMap::new(),
        })
    }

    /**
     * Inicia el bucle perpetuo en el reactor de Tokio.
     *
     * # Reliability:
     * Un pase fallido se registra y el bucle continúa: el colapso de
     * un trabajo jamás detiene el despacho global.
     */
    pub async fn spawn_reconciler_daemon(mut self) {
        let tick_seconds = self.application_shared_state.config.reconciler_tick_s.max(1) as u64;
        let mut reconciliation_ticker = interval(Duration::from_secs(tick_seconds));
        reconciliation_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "🧠 [RECONCILER]: Single-writer dispatch loop active (tick {}s).",
            tick_seconds
        );

        loop {
            tokio::select! {
                _ = reconciliation_ticker.tick() => {},
                received_signal = self.signal_receiver.recv() => {
                    match received_signal {
                        Some(signal) => debug!("⏰ [RECONCILER]: Wakeup by {:?}.", signal),
                        None => {
                            error!("💀 [RECONCILER_FATAL]: Signal channel collapsed. Loop ends.");
                            break;
                        }
                    }
                }
            }

            // Coalescencia: drena la ráfaga acumulada antes del pase.
            while self.signal_receiver.try_recv().is_ok() {}

            if let Err(pass_fault) = self.execute_reconciliation_pass().await {
                error!("❌ [RECONCILER_FAULT]: Pass collapsed: {}. Loop continues.", pass_fault);
            }
        }
    }

    /**
     * Ejecuta un pase completo de reconciliación (agentes ↔ trabajos).
     * Público para el Proving Grounds, que conduce pases de forma
     * determinista sin el bucle temporal.
     */
    #[instrument(skip(self))]
    pub async fn execute_reconciliation_pass(&mut self) -> anyhow::Result<()> {
        let pass_started = Instant::now();
        let iteration_deadline = Duration::from_secs(
            self.application_shared_state.config.reconciler_deadline_s.max(1) as u64,
        );
        let now = self.application_shared_state.clock.now();

        // 0. CIERRE DE CÁLCULOS DE KEYSPACE DIFERIDOS
        self.resolve_pending_keyspaces(now).await;

        // 1. ADMISIÓN DE ALTA PRIORIDAD (PREEMPCIÓN)
        if let Err(admission_fault) = self.enforce_high_priority_admission(now).await {
            warn!("⚠️ [ADMISSION_FAULT]: {}", admission_fault);
        }

        // 2. DESPACHO A AGENTES OCIOSOS
        let idle_agents = self.snapshot_idle_agents(now).await?;
        for agent_identifier in idle_agents {
            if pass_started.elapsed() >= iteration_deadline {
                debug!("⏳ [RECONCILER]: Iteration deadline reached. Yielding.");
                break;
            }

            if let Err(agent_fault) = self.dispatch_for_agent(agent_identifier, now).await {
                warn!(
                    "⚠️ [AGENT_PASS_FAULT]: Agent {} skipped this pass: {}",
                    agent_identifier, agent_fault
                );
            }
        }

        Ok(())
    }

    // --- FASE 0: KEYSPACE DIFERIDO ---

    /// Cierra el cálculo de keyspace de ejecuciones pendientes
    /// (evento "recalc requested" consumido por el reconciliador).
    async fn resolve_pending_keyspaces(&self, now: DateTime<Utc>) {
        let state = &self.application_shared_state;

        let awaiting_executions = match state.job_repository.jobs_awaiting_keyspace().await {
            Ok(collection) => collection,
            Err(query_fault) => {
                warn!("⚠️ [KEYSPACE_SCAN_FAULT]: {}", query_fault);
                return;
            }
        };

        for execution in awaiting_executions {
            let verdict_result = resolve_keyspace_verdict(
                state,
                execution.attack_mode,
                &execution.wordlist_ids,
                &execution.rule_ids,
                execution.mask.clone(),
                execution.binary_version_id,
                true,
            )
            .await;

            match verdict_result {
                Ok(Some(verdict)) => {
                    if let Err(seal_fault) = state
                        .job_repository
                        .set_keyspace_figures(&execution.id, &verdict, now)
                        .await
                    {
                        warn!(
                            "⚠️ [KEYSPACE_SEAL_FAULT]: Job {}: {}",
                            execution.id, seal_fault
                        );
                    } else {
                        info!(
                            "📐 [KEYSPACE_SEALED]: Job {} figures resolved (effective {}).",
                            execution.id, verdict.effective_keyspace
                        );
                    }
                }
                Ok(None) => {
                    debug!("🔬 [KEYSPACE_WAIT]: Job {} still unresolved.", execution.id);
                }
                Err(calculation_fault) => {
                    // Fallo de trabajo en el origen: sellado sin tareas.
                    warn!(
                        "💀 [KEYSPACE_FAULT]: Job {} rejected: {}",
                        execution.id, calculation_fault
                    );
                    if let Err(seal_fault) = state
                        .job_repository
                        .fail_job(&execution.id, &calculation_fault.to_string(), now)
                        .await
                    {
                        warn!("⚠️ [FAIL_SEAL_FAULT]: Job {}: {}", execution.id, seal_fault);
                    }
                }
            }
        }
    }

    // --- FASE 1: ADMISIÓN DE ALTA PRIORIDAD ---

    /**
     * Garantiza que un trabajo override listo obtenga capacidad en un
     * pase: si no hay agentes ociosos, desaloja a la víctima de menor
     * prioridad no-override más antigua.
     */
    async fn enforce_high_priority_admission(&mut self, now: DateTime<Utc>) -> anyhow::Result<()> {
        let state = &self.application_shared_state;

        let ready_queue = state.job_repository.pick_next_ready(&[], CANDIDATE_WALK_LIMIT).await?;
        let override_executions: Vec<&JobExecution> = ready_queue
            .iter()
            .filter(|execution| {
                execution.allow_high_priority_override
                    && execution.remaining_effective_keyspace() > 0
            })
            .collect();

        if override_executions.is_empty() {
            return Ok(());
        }

        // Con capacidad ociosa disponible, el orden del despacho normal
        // ya sirve primero a los trabajos override.
        if !self.snapshot_idle_agents(now).await?.is_empty() {
            return Ok(());
        }

        for override_execution in override_executions {
            let victim = match state.job_repository.select_preemption_victim().await? {
                Some(victim) => victim,
                None => break,
            };

            if victim.job_priority >= override_execution.priority {
                break;
            }

            info!(
                "⚔️ [PREEMPTION]: Job {} (prio {}) evicting task {} of job {} (prio {}).",
                override_execution.id,
                override_execution.priority,
                victim.task_id,
                victim.job_execution_id,
                victim.job_priority
            );

            if let Err(dispatch_fault) = state.dispatcher.dispatch_to_agent(
                victim.agent_id,
                ServerMessage::StopTask {
                    task_id: victim.task_id,
                    reason: StopReason::Preempted,
                },
            ) {
                debug!("💤 [PREEMPT_STOP_UNDELIVERED]: {}", dispatch_fault);
            }

            let victim_task = state.task_repository.fetch_task(&victim.task_id).await?;
            let victim_execution = state
                .job_repository
                .fetch_job(&victim.job_execution_id)
                .await?;

            state
                .task_repository
                .complete_task(
                    &victim.task_id,
                    TaskStatus::Cancelled,
                    victim_task.keyspace_processed,
                    Some("preempted by higher priority job"),
                    now,
                )
                .await?;
            state.inflight_registry.remove(&victim.task_id);

            state
                .job_repository
                .release_dispatch(
                    &victim.job_execution_id,
                    &released_interval_from_task(&victim_task, &victim_execution),
                    now,
                )
                .await?;

            if let Err(pause_fault) = state
                .job_repository
                .pause_job(&victim.job_execution_id, Some(&override_execution.id), now)
                .await
            {
                warn!(
                    "⚠️ [PREEMPT_PAUSE_BYPASS]: Job {}: {}",
                    victim.job_execution_id, pause_fault
                );
            }

            state.event_bus.broadcast_event(RealTimeEvent::TaskStopped {
                task_id: victim.task_id,
                reason: StopReason::Preempted,
            });
            state.event_bus.broadcast_event(RealTimeEvent::JobStateChanged {
                job_execution_id: victim.job_execution_id,
                status: JobExecutionStatus::Paused,
            });
        }

        Ok(())
    }

    // --- FASE 2: DESPACHO ---

    /// Instantánea de agentes elegibles y sin trabajo en vuelo.
    async fn snapshot_idle_agents(&self, now: DateTime<Utc>) -> anyhow::Result<Vec<i64>> {
        let state = &self.application_shared_state;
        let mut idle_collection = Vec::new();

        for agent_identifier in state.agent_directory.connected_agent_identifiers() {
            if state.agent_directory.is_benchmarking(agent_identifier) {
                continue;
            }
            if !state
                .inflight_registry
                .entries_for_agent(agent_identifier)
                .is_empty()
            {
                continue;
            }

            match state.agent_repository.fetch_agent(agent_identifier).await {
                Ok(agent) if agent.is_dispatch_eligible(now) => {
                    idle_collection.push(agent_identifier);
                }
                Ok(_) => {}
                Err(fetch_fault) => warn!(
                    "⚠️ [FLEET_SCAN_FAULT]: Agent {} unreadable: {}",
                    agent_identifier, fetch_fault
                ),
            }
        }

        idle_collection.sort_unstable();
        Ok(idle_collection)
    }

    /// Busca trabajo viable para un agente ocioso y lo despacha.
    async fn dispatch_for_agent(
        &mut self,
        agent_identifier: i64,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let state = self.application_shared_state.clone();
        let sync_service = HashlistSyncService::new(state.clone());

        let excluded_hashlists = sync_service.excluded_hashlists(agent_identifier).await?;
        let mut candidate_queue = state
            .job_repository
            .pick_next_ready(&excluded_hashlists, CANDIDATE_WALK_LIMIT)
            .await?;

        // Guardia anti-inanición: no repetir el mismo par (agente,
        // trabajo) dos veces seguidas si existe otra opción viable.
        if candidate_queue.len() > 1 {
            if let Some(last_assigned_job) = self.last_assignment_memory.get(&agent_identifier) {
                if candidate_queue
                    .first()
                    .map(|front| &front.id == last_assigned_job)
                    .unwrap_or(false)
                {
                    let repeated_front = candidate_queue.remove(0);
                    candidate_queue.push(repeated_front);
                }
            }
        }

        for execution in candidate_queue {
            match self
                .try_dispatch_job_to_agent(agent_identifier, &execution, now)
                .await?
            {
                AgentDecision::Dispatched => {
                    self.last_assignment_memory
                        .insert(agent_identifier, execution.id);
                    return Ok(());
                }
                AgentDecision::AgentConsumed => return Ok(()),
                AgentDecision::NextJob => continue,
            }
        }
        Ok(())
    }

    /// Intenta despachar un trabajo concreto a un agente concreto.
    async fn try_dispatch_job_to_agent(
        &mut self,
        agent_identifier: i64,
        execution: &JobExecution,
        now: DateTime<Utc>,
    ) -> anyhow::Result<AgentDecision> {
        let state = self.application_shared_state.clone();

        // a. TOPE DE AGENTES (0 = ilimitado)
        if execution.max_agents > 0 {
            let active_agents = state.job_repository.count_active_agents(&execution.id).await?;
            if active_agents >= execution.max_agents {
                return Ok(AgentDecision::NextJob);
            }
        }

        let hashlist = state
            .hashlist_repository
            .fetch_hashlist(execution.hashlist_id)
            .await?;

        // b. RESOLUCIÓN DE VELOCIDAD (C1)
        let registry = BenchmarkRegistryService::new(state.clone());
        let resolution = registry
            .resolve_speed(agent_identifier, execution.attack_mode, hashlist.hash_type, now)
            .await?;

        let attempt_key = (
            agent_identifier,
            execution.attack_mode.as_label().to_string(),
            hashlist.hash_type,
        );

        let (sizing_speed, low_confidence) = match resolution {
            SpeedResolution::Fresh(fresh_speed) => {
                self.benchmark_attempt_memory.remove(&attempt_key);
                (fresh_speed, false)
            }
            stale_or_missing => {
                let prior_attempts = self
                    .benchmark_attempt_memory
                    .get(&attempt_key)
                    .copied()
                    .unwrap_or(0);

                if prior_attempts == 0 {
                    let benchmark_directive = ServerMessage::RunBenchmark {
                        attack_mode: execution.attack_mode,
                        hash_type: hashlist.hash_type,
                        binary_version_id: execution.binary_version_id,
                        timeout_s: BENCHMARK_DIRECTIVE_TIMEOUT_SECONDS,
                    };

                    if state
                        .dispatcher
                        .dispatch_to_agent(agent_identifier, benchmark_directive)
                        .is_ok()
                    {
                        state.agent_directory.mark_benchmarking(agent_identifier, now);
                        self.benchmark_attempt_memory.insert(attempt_key, 1);
                        debug!(
                            "📊 [BENCHMARK_ORDERED]: Agent {} measuring ({}, {}).",
                            agent_identifier,
                            execution.attack_mode.as_label(),
                            hashlist.hash_type
                        );
                    }
                    return Ok(AgentDecision::AgentConsumed);
                }

                // Viaje de ida y vuelta agotado: dimensionado degradado.
                match stale_or_missing {
                    SpeedResolution::Stale(stale_speed) => (stale_speed, true),
                    _ => (state.config.default_speed_floor, true),
                }
            }
        };

        // c. PUERTA DE SINCRONIZACIÓN (C4)
        let sync_service = HashlistSyncService::new(state.clone());
        match sync_service.ensure_synced(agent_identifier, &hashlist).await? {
            SyncGateVerdict::InSync => {}
            SyncGateVerdict::Queued => return Ok(AgentDecision::AgentConsumed),
            SyncGateVerdict::Excluded => return Ok(AgentDecision::NextJob),
        }

        let dispatch_service = DispatchService::new(state.clone());
        let chunk_duration_seconds = if execution.chunk_duration_seconds > 0 {
            execution.chunk_duration_seconds
        } else {
            state.config.default_chunk_duration_s
        };

        // d.1 TAREAS HUÉRFANAS RE-ENCOLADAS (reintento / re-emisión)
        if let Some(orphaned_task) = state
            .task_repository
            .fetch_orphaned_pending(&execution.id)
            .await?
        {
            state
                .task_repository
                .assign_pending_to_agent(
                    &orphaned_task.id,
                    agent_identifier,
                    sizing_speed,
                    low_confidence,
                    now,
                )
                .await?;
            let refreshed_task = state.task_repository.fetch_task(&orphaned_task.id).await?;
            let delivered = dispatch_service
                .deliver_assignment(execution, &refreshed_task, &hashlist)
                .await?;
            return Ok(if delivered {
                AgentDecision::Dispatched
            } else {
                AgentDecision::AgentConsumed
            });
        }

        // d.2 HUECOS LIBERADOS (re-emisión antes de avanzar frontera)
        if let Some(reclaimed_interval) = state
            .job_repository
            .claim_released_interval(&execution.id, now)
            .await?
        {
            let reissued_task = JobTask {
                id: Uuid::new_v4(),
                job_execution_id: execution.id,
                agent_id: Some(agent_identifier),
                status: TaskStatus::Assigned,
                keyspace_start: reclaimed_interval.keyspace_start,
                keyspace_end: reclaimed_interval.keyspace_end,
                rule_start_index: reclaimed_interval.rule_start_index,
                rule_end_index: reclaimed_interval.rule_end_index,
                chunk_duration_seconds,
                progress_percent: 0.0,
                keyspace_processed: 0,
                benchmark_speed: sizing_speed,
                low_confidence,
                retry_count: 0,
                error_message: None,
                assigned_at: Some(now),
                started_at: None,
                completed_at: None,
            };

            state.task_repository.create_assigned(&reissued_task).await?;
            let delivered = dispatch_service
                .deliver_assignment(execution, &reissued_task, &hashlist)
                .await?;
            return Ok(if delivered {
                AgentDecision::Dispatched
            } else {
                AgentDecision::AgentConsumed
            });
        }

        // d.3 FRONTERA: PLANIFICACIÓN DEL PRÓXIMO CHUNK (C3)
        let frontier = JobFrontier {
            base_keyspace: execution.base_keyspace.unwrap_or(0),
            multiplication_factor: execution.multiplication_factor.unwrap_or(1).max(1),
            uses_rule_splitting: execution.uses_rule_splitting,
            next_base_offset: execution.next_base_offset,
            next_rule_offset: execution.next_rule_offset,
        };

        let chunk_plan = match plan_next_chunk(
            &frontier,
            sizing_speed,
            chunk_duration_seconds,
            &state.config.chunk_policy(),
        ) {
            Some(plan) => plan,
            None => {
                // Frontera agotada: intenta sellar si nada queda vivo.
                state
                    .job_repository
                    .complete_job_if_done(&execution.id, now)
                    .await?;
                return Ok(AgentDecision::NextJob);
            }
        };

        let effective_volume =
            chunk_plan.effective_size(frontier.base_keyspace, frontier.multiplication_factor);

        match state
            .job_repository
            .advance_dispatch(
                &execution.id,
                effective_volume,
                chunk_plan.base_offset_advance(),
                chunk_plan.rule_offset_advance(),
                now,
            )
            .await
        {
            Ok(()) => {}
            Err(DbError::DispatchOverflow) | Err(DbError::InvalidState) => {
                return Ok(AgentDecision::NextJob);
            }
            Err(other_fault) => return Err(other_fault.into()),
        }

        if chunk_plan.completes_dispatch {
            debug!(
                "🏁 [FRONTIER_EXHAUSTED]: Job {} dispatching its final chunk.",
                execution.id
            );
        }

        let frontier_task = JobTask {
            id: Uuid::new_v4(),
            job_execution_id: execution.id,
            agent_id: Some(agent_identifier),
            status: TaskStatus::Assigned,
            keyspace_start: chunk_plan.keyspace_start,
            keyspace_end: chunk_plan.keyspace_end,
            rule_start_index: chunk_plan.rule_start_index,
            rule_end_index: chunk_plan.rule_end_index,
            chunk_duration_seconds,
            progress_percent: 0.0,
            keyspace_processed: 0,
            benchmark_speed: sizing_speed,
            low_confidence,
            retry_count: 0,
            error_message: None,
            assigned_at: Some(now),
            started_at: None,
            completed_at: None,
        };

        state.task_repository.create_assigned(&frontier_task).await?;
        let delivered = dispatch_service
            .deliver_assignment(execution, &frontier_task, &hashlist)
            .await?;

        Ok(if delivered {
            AgentDecision::Dispatched
        } else {
            AgentDecision::AgentConsumed
        })
    }
}
