// [libs/domain/models/src/sync.rs]
//! =================================================================
//! APARATO: AGENT HASHLIST SYNC MODEL (V5.1)
//! CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
//! RESPONSABILIDAD: ESTADO DE SINCRONIZACIÓN DE ARCHIVOS POR AGENTE
//! =================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// Estado de la copia local de una hashlist en un agente.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SyncStatus {
    InSync,
    Syncing,
    Stale,
    Failed,
}

impl SyncStatus {
    pub fn as_label(&self) -> &'static str {
        match self {
            SyncStatus::InSync => "in_sync",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Stale => "stale",
            SyncStatus::Failed => "failed",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "in_sync" => Some(SyncStatus::InSync),
            "syncing" => Some(SyncStatus::Syncing),
            "stale" => Some(SyncStatus::Stale),
            "failed" => Some(SyncStatus::Failed),
            _ => None,
        }
    }
}

/// Registro de qué versión de una hashlist posee un agente.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentHashlistSync {
    #[typeshare(serialized_as = "number")]
    pub agent_id: i64,
    #[typeshare(serialized_as = "number")]
    pub hashlist_id: i64,
    /// Huella de contenido de la copia que el agente reporta poseer.
    pub version_hash: String,
    pub status: SyncStatus,
    #[typeshare(serialized_as = "number")]
    pub retry_count: i64,
    #[typeshare(serialized_as = "String")]
    pub last_synced_at: Option<DateTime<Utc>>,
}
