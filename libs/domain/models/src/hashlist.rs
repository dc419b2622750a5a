// [libs/domain/models/src/hashlist.rs]
/*!
 * =================================================================
 * APARATO: HASHLIST DOMAIN MODELS (V9.1 - PRODUCTION MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATOS DE LISTAS DE HASHES Y CRACKS
 *
 * # Mathematical Proof (Crack Monotonicity):
 * El contador 'cracked_hashes' solo crece y nunca supera
 * 'total_hashes'. Un hash crackeado jamás regresa al estado previo:
 * la deduplicación por (hashlist, hash) convierte los reportes
 * repetidos en operaciones nulas.
 * =================================================================
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;
use uuid::Uuid;

/// Estados del ciclo de vida de una lista de hashes.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HashlistStatus {
    Uploading,
    Processing,
    Ready,
    Error,
    Completed,
}

impl HashlistStatus {
    pub fn as_label(&self) -> &'static str {
        match self {
            HashlistStatus::Uploading => "uploading",
            HashlistStatus::Processing => "processing",
            HashlistStatus::Ready => "ready",
            HashlistStatus::Error => "error",
            HashlistStatus::Completed => "completed",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "uploading" => Some(HashlistStatus::Uploading),
            "processing" => Some(HashlistStatus::Processing),
            "ready" => Some(HashlistStatus::Ready),
            "error" => Some(HashlistStatus::Error),
            "completed" => Some(HashlistStatus::Completed),
            _ => None,
        }
    }
}

/// Conjunto nominal de hashes objetivo de una campaña.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hashlist {
    #[typeshare(serialized_as = "number")]
    pub id: i64,
    pub name: String,
    /// Número de modo de hash del motor de cracking.
    #[typeshare(serialized_as = "number")]
    pub hash_type: i64,
    #[typeshare(serialized_as = "number")]
    pub total_hashes: i64,
    #[typeshare(serialized_as = "number")]
    pub cracked_hashes: i64,
    pub status: HashlistStatus,
    /// Excluye los cracks de esta lista del potfile global.
    pub exclude_from_potfile: bool,
    #[typeshare(serialized_as = "String")]
    pub client_id: Option<Uuid>,
    /// Huella de contenido usada para la sincronización con agentes.
    pub version_hash: String,
    pub file_name: String,
    #[typeshare(serialized_as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Hashlist {
    /// Una lista está íntegramente crackeada cuando no queda objetivo vivo.
    pub fn is_fully_cracked(&self) -> bool {
        self.total_hashes > 0 && self.cracked_hashes >= self.total_hashes
    }
}

/// Entrada individual de un reporte de cracks emitido por un agente.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrackEntry {
    pub hash: String,
    pub plaintext: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}
