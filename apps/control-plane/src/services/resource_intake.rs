// [apps/control-plane/src/services/resource_intake.rs]
/*!
 * =================================================================
 * APARATO: RESOURCE INTAKE SERVICE (V6.0)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: REGISTRO DE RECURSOS CON CONTEO Y HUELLA EXACTOS
 *
 * # Performance:
 * Los diccionarios masivos se recorren vía mapeo de memoria: el
 * conteo de líneas es un barrido O(n) sin copiar el archivo a RAM
 * del proceso. La huella SHA-256 sella la versión servida por la
 * pasarela (ETag) y la puerta de sincronización.
 * =================================================================
 */

use crate::state::AppState;
use anyhow::Context;
use kraken_domain_models::{Hashlist, HashlistStatus};
use kraken_infra_db::repositories::{RuleMeta, WordlistMeta};
use memmap2::Mmap;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::path::Path;
use tracing::{info, instrument};

/// Huella de contenido y métricas físicas de un archivo en disco.
#[derive(Debug, Clone)]
pub struct FileFingerprint {
    pub line_count: i64,
    pub content_hash: String,
    pub size_bytes: i64,
}

/**
 * Calcula líneas, huella SHA-256 y tamaño de un archivo mediante
 * mapeo de memoria.
 *
 * # Errors:
 * Falla si el archivo no existe o el mapeo es rechazado por el SO.
 */
pub fn fingerprint_file(file_path: &Path) -> anyhow::Result<FileFingerprint> {
    let file_handle = File::open(file_path)
        .with_context(|| format!("resource open failed: {}", file_path.display()))?;

    // El mapeo es de solo lectura; el SO pagina bajo demanda.
    let mapped_region = unsafe { Mmap::map(&file_handle) }
        .with_context(|| format!("resource mmap failed: {}", file_path.display()))?;

    let mut newline_count: i64 = 0;
    for byte in mapped_region.iter() {
        if *byte == b'\n' {
            newline_count += 1;
        }
    }
    // Última línea sin salto final.
    if !mapped_region.is_empty() && mapped_region[mapped_region.len() - 1] != b'\n' {
        newline_count += 1;
    }

    let mut digest_engine = Sha256::new();
    digest_engine.update(&mapped_region[..]);
    let content_hash = hex::encode(digest_engine.finalize());

    Ok(FileFingerprint {
        line_count: newline_count,
        content_hash,
        size_bytes: mapped_region.len() as i64,
    })
}

pub struct ResourceIntakeService {
    application_shared_state: AppState,
}

impl ResourceIntakeService {
    #[must_use]
    pub fn new(application_state: AppState) -> Self {
        Self {
            application_shared_state: application_state,
        }
    }

    /// Registra un diccionario con su cardinalidad y huella exactas.
    #[instrument(skip(self, nominal_name))]
    pub async fn register_wordlist(
        &self,
        wordlist_identifier: i64,
        nominal_name: &str,
        file_path: &Path,
    ) -> anyhow::Result<WordlistMeta> {
        let fingerprint = fingerprint_file(file_path)?;

        let wordlist = WordlistMeta {
            id: wordlist_identifier,
            name: nominal_name.to_string(),
            file_name: file_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            file_path: file_path.to_string_lossy().into_owned(),
            line_count: fingerprint.line_count,
            content_hash: fingerprint.content_hash,
            size_bytes: fingerprint.size_bytes,
        };

        self.application_shared_state
            .resource_repository
            .register_wordlist(&wordlist)
            .await?;

        info!(
            "📚 [INTAKE]: Wordlist '{}' registered with {} lines.",
            nominal_name, wordlist.line_count
        );
        Ok(wordlist)
    }

    /**
     * Registra un archivo de reglas. Un archivo marcado dinámico se
     * persiste sin cardinalidad: la sonda del binario la resolverá.
     */
    #[instrument(skip(self, nominal_name))]
    pub async fn register_rule_file(
        &self,
        rule_identifier: i64,
        nominal_name: &str,
        file_path: &Path,
        is_dynamic: bool,
    ) -> anyhow::Result<RuleMeta> {
        let fingerprint = fingerprint_file(file_path)?;

        let rule = RuleMeta {
            id: rule_identifier,
            name: nominal_name.to_string(),
            file_name: file_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            file_path: file_path.to_string_lossy().into_owned(),
            rule_count: if is_dynamic {
                None
            } else {
                Some(fingerprint.line_count)
            },
            content_hash: fingerprint.content_hash,
            size_bytes: fingerprint.size_bytes,
        };

        self.application_shared_state
            .resource_repository
            .register_rule(&rule)
            .await?;

        info!(
            "📏 [INTAKE]: Rule file '{}' registered ({}).",
            nominal_name,
            rule.rule_count
                .map(|count| format!("{} rules", count))
                .unwrap_or_else(|| "dynamic cardinality".to_string())
        );
        Ok(rule)
    }

    /// Registra una hashlist procesada lista para campañas.
    #[instrument(skip(self, nominal_name, hash_values))]
    pub async fn register_hashlist(
        &self,
        hashlist_identifier: i64,
        nominal_name: &str,
        hash_type: i64,
        file_path: &Path,
        hash_values: &[&str],
        exclude_from_potfile: bool,
    ) -> anyhow::Result<Hashlist> {
        let fingerprint = fingerprint_file(file_path)?;
        let now = self.application_shared_state.clock.now();

        let hashlist = Hashlist {
            id: hashlist_identifier,
            name: nominal_name.to_string(),
            hash_type,
            total_hashes: 0,
            cracked_hashes: 0,
            status: HashlistStatus::Ready,
            exclude_from_potfile,
            client_id: None,
            version_hash: fingerprint.content_hash,
            file_name: file_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            created_at: now,
        };

        self.application_shared_state
            .hashlist_repository
            .insert_hashlist(&hashlist, &file_path.to_string_lossy())
            .await?;
        self.application_shared_state
            .hashlist_repository
            .register_hash_batch(hashlist_identifier, hash_values)
            .await?;

        info!(
            "🎯 [INTAKE]: Hashlist '{}' registered with {} target(s).",
            nominal_name,
            hash_values.len()
        );

        Ok(self
            .application_shared_state
            .hashlist_repository
            .fetch_hashlist(hashlist_identifier)
            .await?)
    }
}
