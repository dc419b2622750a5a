// [apps/control-plane/src/services/hashlist_sync.rs]
/*!
 * =================================================================
 * APARATO: HASHLIST SYNC SERVICE (V13.0 - GATE SOVEREIGN)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: PUERTA DE SINCRONIZACIÓN PREVIA AL DESPACHO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. HARD GATE: Ninguna tarea sobre una hashlist viaja a un agente
 *    cuya fila de sincronización no esté 'in_sync' con la versión
 *    vigente.
 * 2. BUDGETED RETRIES: Tres fallos de descarga excluyen al agente de
 *    esa lista hasta acción del operador.
 *
 * # Mathematical Proof (Version Convergence):
 * La comparación es por huella de contenido, no por marca temporal.
 * Un acuse con huella distinta a la vigente no sella 'in_sync':
 * el siguiente pase re-emite la orden con la versión actual.
 * =================================================================
 */

use crate::services::dispatch::Dispatcher;
use crate::state::AppState;
use kraken_domain_models::{FileKind, Hashlist, ServerMessage, SyncStatus};
use tracing::{debug, info, instrument, warn};

use super::signal_bus::ReconcileSignal;

/// Veredicto de la puerta de sincronización para un (agente, lista).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncGateVerdict {
    /// El agente posee la versión vigente: despacho autorizado.
    InSync,
    /// Descarga en curso u ordenada: decisión diferida.
    Queued,
    /// Presupuesto de reintentos agotado: agente excluido de la lista.
    Excluded,
}

pub struct HashlistSyncService {
    application_shared_state: AppState,
}

impl HashlistSyncService {
    #[must_use]
    pub fn new(application_state: AppState) -> Self {
        Self {
            application_shared_state: application_state,
        }
    }

    /**
     * Evalúa la puerta de sincronización y, de ser necesario, emite
     * la orden de descarga hacia el agente.
     */
    #[instrument(skip(self, hashlist), fields(agent = agent_identifier, hashlist = hashlist.id))]
    pub async fn ensure_synced(
        &self,
        agent_identifier: i64,
        hashlist: &Hashlist,
    ) -> anyhow::Result<SyncGateVerdict> {
        let state = &self.application_shared_state;

        let sync_row = state
            .sync_repository
            .fetch_sync(agent_identifier, hashlist.id)
            .await?;

        match sync_row {
            Some(row) if row.status == SyncStatus::Failed => {
                return Ok(SyncGateVerdict::Excluded);
            }
            Some(row)
                if row.status == SyncStatus::InSync
                    && row.version_hash == hashlist.version_hash =>
            {
                return Ok(SyncGateVerdict::InSync);
            }
            Some(row) if row.status == SyncStatus::Syncing => {
                // Orden ya emitida: el acuse despertará al reconciliador.
                return Ok(SyncGateVerdict::Queued);
            }
            _ => {}
        }

        state
            .sync_repository
            .mark_syncing(agent_identifier, hashlist.id)
            .await?;

        let download_url = format!(
            "{}/files/hashlist/{}/{}",
            state.config.public_base_url, hashlist.id, hashlist.file_name
        );

        let sync_directive = ServerMessage::FileSyncRequired {
            kind: FileKind::Hashlist,
            id: hashlist.id,
            url: download_url,
            expected_hash: hashlist.version_hash.clone(),
            size_bytes: 0,
        };

        if let Err(dispatch_fault) = state
            .dispatcher
            .dispatch_to_agent(agent_identifier, sync_directive)
        {
            warn!(
                "⚠️ [SYNC_UNDELIVERED]: Download order rejected for agent {}: {}",
                agent_identifier, dispatch_fault
            );
        } else {
            info!(
                "📥 [SYNC_ORDERED]: Agent {} fetching hashlist {} (version {}).",
                agent_identifier, hashlist.id, hashlist.version_hash
            );
        }

        Ok(SyncGateVerdict::Queued)
    }

    /// Acuse de descarga completada emitido por el agente.
    #[instrument(skip(self, version_hash))]
    pub async fn handle_sync_complete(
        &self,
        agent_identifier: i64,
        kind: FileKind,
        resource_identifier: i64,
        version_hash: &str,
    ) -> anyhow::Result<()> {
        let state = &self.application_shared_state;

        if kind != FileKind::Hashlist {
            debug!(
                "📦 [SYNC_ACK]: Agent {} confirmed {} {} (untracked kind).",
                agent_identifier,
                kind.as_path_segment(),
                resource_identifier
            );
            return Ok(());
        }

        let current_hashlist = state
            .hashlist_repository
            .fetch_hashlist(resource_identifier)
            .await?;

        if current_hashlist.version_hash == version_hash {
            state
                .sync_repository
                .mark_in_sync(
                    agent_identifier,
                    resource_identifier,
                    version_hash,
                    state.clock.now(),
                )
                .await?;
            info!(
                "✅ [SYNC_SEALED]: Agent {} in sync with hashlist {}.",
                agent_identifier, resource_identifier
            );
        } else {
            // El agente descargó una versión ya obsoleta.
            state
                .sync_repository
                .mark_stale(agent_identifier, resource_identifier)
                .await?;
            warn!(
                "♻️ [SYNC_DRIFT]: Agent {} acknowledged outdated hashlist {} version.",
                agent_identifier, resource_identifier
            );
        }

        state.signal_bus.emit(ReconcileSignal::FileSyncAcknowledged);
        Ok(())
    }

    /// Fallo de descarga reportado por el agente.
    #[instrument(skip(self, failure_reason))]
    pub async fn handle_sync_failure(
        &self,
        agent_identifier: i64,
        kind: FileKind,
        resource_identifier: i64,
        failure_reason: &str,
    ) -> anyhow::Result<()> {
        let state = &self.application_shared_state;

        if kind != FileKind::Hashlist {
            warn!(
                "⚠️ [SYNC_FAULT]: Agent {} failed fetching {} {}: {}",
                agent_identifier,
                kind.as_path_segment(),
                resource_identifier,
                failure_reason
            );
            return Ok(());
        }

        let accumulated_retries = state
            .sync_repository
            .record_sync_failure(
                agent_identifier,
                resource_identifier,
                state.config.sync_max_retries,
            )
            .await?;

        warn!(
            "⚠️ [SYNC_FAULT]: Agent {} failed hashlist {} sync ({}/{}): {}",
            agent_identifier,
            resource_identifier,
            accumulated_retries,
            state.config.sync_max_retries,
            failure_reason
        );

        state.signal_bus.emit(ReconcileSignal::FileSyncAcknowledged);
        Ok(())
    }

    /// Listas vetadas para el agente (presupuesto de descarga agotado).
    pub async fn excluded_hashlists(&self, agent_identifier: i64) -> anyhow::Result<Vec<i64>> {
        Ok(self
            .application_shared_state
            .sync_repository
            .failed_hashlists_for_agent(agent_identifier)
            .await?)
    }
}
