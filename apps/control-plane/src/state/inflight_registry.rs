// [apps/control-plane/src/state/inflight_registry.rs]
/*!
 * =================================================================
 * APARATO: IN-FLIGHT TASK REGISTRY (V8.0 - WRITE-THROUGH CACHE)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L1-APP)
 * RESPONSABILIDAD: MEMORIA CALIENTE DE TAREAS DESPACHADAS
 *
 * # Logic:
 * El Ledger es la fuente de verdad; este registro es un caché puro
 * write-through reconstruido en el arranque desde las filas
 * 'assigned', 'running' y 'reconnect_pending'. Toda mutación
 * persiste primero en el Ledger y después aquí.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// Entrada caliente de una tarea en vuelo.
#[derive(Debug, Clone)]
pub struct InFlightEntry {
    pub task_id: Uuid,
    pub agent_id: i64,
    pub job_execution_id: Uuid,
    pub hashlist_id: i64,
    pub chunk_duration_seconds: i64,
    pub created_at: DateTime<Utc>,
    pub last_progress_at: DateTime<Utc>,
}

pub struct InFlightRegistry {
    hot_entries: RwLock<HashMap<Uuid, InFlightEntry>>,
}

impl Default for InFlightRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self {
            hot_entries: RwLock::new(HashMap::with_capacity(256)),
        }
    }

    /// Reconstrucción completa del caché en el arranque.
    pub fn seed(&self, persisted_entries: Vec<InFlightEntry>) {
        let mut entries_guard = self.hot_entries.write().expect("INFLIGHT_LOCK_POISONED");
        entries_guard.clear();
        for entry in persisted_entries {
            entries_guard.insert(entry.task_id, entry);
        }
    }

    pub fn insert(&self, entry: InFlightEntry) {
        let mut entries_guard = self.hot_entries.write().expect("INFLIGHT_LOCK_POISONED");
        entries_guard.insert(entry.task_id, entry);
    }

    pub fn remove(&self, task_identifier: &Uuid) -> Option<InFlightEntry> {
        let mut entries_guard = self.hot_entries.write().expect("INFLIGHT_LOCK_POISONED");
        entries_guard.remove(task_identifier)
    }

    pub fn get(&self, task_identifier: &Uuid) -> Option<InFlightEntry> {
        let entries_guard = self.hot_entries.read().expect("INFLIGHT_LOCK_POISONED");
        entries_guard.get(task_identifier).cloned()
    }

    /// Sella una marca de progreso fresco para la vigilancia de estancamiento.
    pub fn touch_progress(&self, task_identifier: &Uuid, now: DateTime<Utc>) {
        let mut entries_guard = self.hot_entries.write().expect("INFLIGHT_LOCK_POISONED");
        if let Some(entry) = entries_guard.get_mut(task_identifier) {
            entry.last_progress_at = now;
        }
    }

    pub fn entries_for_agent(&self, agent_identifier: i64) -> Vec<InFlightEntry> {
        let entries_guard = self.hot_entries.read().expect("INFLIGHT_LOCK_POISONED");
        entries_guard
            .values()
            .filter(|entry| entry.agent_id == agent_identifier)
            .cloned()
            .collect()
    }

    pub fn entries_for_job(&self, job_identifier: &Uuid) -> Vec<InFlightEntry> {
        let entries_guard = self.hot_entries.read().expect("INFLIGHT_LOCK_POISONED");
        entries_guard
            .values()
            .filter(|entry| &entry.job_execution_id == job_identifier)
            .cloned()
            .collect()
    }

    pub fn count_for_job(&self, job_identifier: &Uuid) -> usize {
        let entries_guard = self.hot_entries.read().expect("INFLIGHT_LOCK_POISONED");
        entries_guard
            .values()
            .filter(|entry| &entry.job_execution_id == job_identifier)
            .count()
    }

    /**
     * Tareas cuyo último progreso excede la ventana de estancamiento
     * (multiplicador × duración de chunk propia de cada tarea).
     */
    pub fn stale_entries(&self, now: DateTime<Utc>, stale_multiplier: i64) -> Vec<InFlightEntry> {
        let entries_guard = self.hot_entries.read().expect("INFLIGHT_LOCK_POISONED");
        entries_guard
            .values()
            .filter(|entry| {
                let stale_window = chrono::Duration::seconds(
                    stale_multiplier * entry.chunk_duration_seconds.max(1),
                );
                now - entry.last_progress_at > stale_window
            })
            .cloned()
            .collect()
    }

    pub fn total_in_flight(&self) -> usize {
        let entries_guard = self.hot_entries.read().expect("INFLIGHT_LOCK_POISONED");
        entries_guard.len()
    }
}
