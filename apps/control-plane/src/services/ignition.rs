// [apps/control-plane/src/services/ignition.rs]
/*!
 * =================================================================
 * APARATO: JOB IGNITION SERVICE (V8.0)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: MATERIALIZACIÓN DE EJECUCIONES DESDE PLANTILLAS
 *
 * # Logic:
 * La ignición calcula el keyspace de forma síncrona cuando todos los
 * recursos declaran cardinalidad estática. Ante un archivo de reglas
 * dinámico, la ejecución nace 'pending' sin cifras y el
 * reconciliador cierra el cálculo con la sonda del binario.
 * =================================================================
 */

use crate::services::cracker_probe::KeyspaceProbeService;
use crate::services::signal_bus::ReconcileSignal;
use crate::state::AppState;
use anyhow::Context;
use kraken_domain_models::{AttackMode, JobExecution, JobExecutionStatus, RealTimeEvent};
use kraken_domain_scheduling::{compute_keyspace, AttackResources, KeyspaceVerdict};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/**
 * Materializa una ejecución concreta de una plantilla sobre una lista.
 *
 * # Errors:
 * Rechaza composiciones ilegales o listas no operativas antes de
 * persistir nada (fallo de trabajo en el origen, sin tareas).
 */
#[instrument(skip(state, execution_name))]
pub async fn ignite_job_execution(
    state: &AppState,
    preset_identifier: Uuid,
    hashlist_identifier: i64,
    execution_name: Option<String>,
) -> anyhow::Result<JobExecution> {
    let now = state.clock.now();

    let preset = state
        .preset_repository
        .fetch_preset(&preset_identifier)
        .await
        .context("preset template not found")?;
    let hashlist = state
        .hashlist_repository
        .fetch_hashlist(hashlist_identifier)
        .await
        .context("target hashlist not found")?;

    anyhow::ensure!(
        matches!(
            hashlist.status,
            kraken_domain_models::HashlistStatus::Ready
        ),
        "hashlist {} is not ready for campaigns (status '{}')",
        hashlist.id,
        hashlist.status.as_label()
    );

    // Cálculo síncrono cuando la cardinalidad es íntegramente estática.
    let keyspace_verdict = resolve_keyspace_verdict(
        state,
        preset.attack_mode,
        &preset.wordlist_ids,
        &preset.rule_ids,
        preset.mask.clone(),
        preset.binary_version_id,
        false,
    )
    .await?;

    let nominal_name = execution_name
        .unwrap_or_else(|| format!("{} · {}", preset.name, hashlist.name));

    let execution = state
        .job_repository
        .create_from_preset(
            &preset,
            &hashlist,
            &nominal_name,
            keyspace_verdict.as_ref(),
            now,
        )
        .await?;

    if keyspace_verdict.is_none() {
        info!(
            "🔬 [IGNITION]: Execution {} awaits asynchronous keyspace resolution.",
            execution.id
        );
        state.signal_bus.emit(ReconcileSignal::KeyspaceRecalcRequested);
    }

    state.event_bus.broadcast_event(RealTimeEvent::JobStateChanged {
        job_execution_id: execution.id,
        status: JobExecutionStatus::Pending,
    });
    state.signal_bus.emit(ReconcileSignal::JobCreated);

    Ok(execution)
}

/**
 * Resuelve el veredicto de keyspace de un vector de ataque.
 *
 * Devuelve `None` cuando un archivo de reglas dinámico sigue sin
 * cardinalidad y la sonda no está autorizada en este contexto.
 */
pub async fn resolve_keyspace_verdict(
    state: &AppState,
    attack_mode: AttackMode,
    wordlist_identifiers: &[i64],
    rule_identifiers: &[i64],
    mask: Option<String>,
    binary_version_identifier: i64,
    allow_probe: bool,
) -> anyhow::Result<Option<KeyspaceVerdict>> {
    let mut wordlist_line_counts = Vec::with_capacity(wordlist_identifiers.len());
    let mut primary_wordlist_path = None;
    for wordlist_identifier in wordlist_identifiers {
        let wordlist = state
            .resource_repository
            .fetch_wordlist(*wordlist_identifier)
            .await
            .with_context(|| format!("wordlist {} missing", wordlist_identifier))?;
        if primary_wordlist_path.is_none() {
            primary_wordlist_path = Some(wordlist.file_path.clone());
        }
        wordlist_line_counts.push(wordlist.line_count);
    }

    let mut rule_counts = Vec::with_capacity(rule_identifiers.len());
    for rule_identifier in rule_identifiers {
        let rule = state
            .resource_repository
            .fetch_rule(*rule_identifier)
            .await
            .with_context(|| format!("rule file {} missing", rule_identifier))?;

        match rule.rule_count {
            Some(static_count) => rule_counts.push(static_count),
            None if allow_probe => {
                // Cardinalidad dinámica: consulta al binario de cracking.
                let binary = state
                    .resource_repository
                    .fetch_binary(binary_version_identifier)
                    .await
                    .context("cracker binary missing for keyspace probe")?;
                let wordlist_path = primary_wordlist_path
                    .clone()
                    .context("dynamic rule probe requires a wordlist")?;

                let probed_keyspace = KeyspaceProbeService::probe_straight_keyspace(
                    &binary.file_path,
                    &wordlist_path,
                    &rule.file_path,
                )
                .await?;

                let contribution = KeyspaceProbeService::derive_rule_contribution(
                    probed_keyspace,
                    wordlist_line_counts.first().copied().unwrap_or(0),
                );
                state
                    .resource_repository
                    .set_rule_count(*rule_identifier, contribution)
                    .await?;
                rule_counts.push(contribution);
            }
            None => {
                warn!(
                    "🔬 [KEYSPACE_DEFERRED]: Rule file {} is dynamic; probe deferred.",
                    rule_identifier
                );
                return Ok(None);
            }
        }
    }

    let resources = AttackResources {
        wordlist_line_counts,
        rule_counts,
        mask,
    };

    let verdict = compute_keyspace(attack_mode, &resources, &state.config.rule_split_policy())?;
    Ok(Some(verdict))
}
