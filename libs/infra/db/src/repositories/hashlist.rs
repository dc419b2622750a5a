// [libs/infra/db/src/repositories/hashlist.rs]
/*!
 * =================================================================
 * APARATO: HASHLIST & CRACK INGESTION REPOSITORY (V16.0 - GOLD MASTER)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: LISTAS OBJETIVO, DEDUPLICACIÓN Y CONTADOR DE CRACKS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. IDEMPOTENT INGESTION: La clave primaria (hashlist, hash) vuelve
 *    nulos los reportes repetidos; el contador solo acredita
 *    inserciones reales.
 * 2. MONOTONE COUNTER: cracked_hashes jamás decrece ni supera
 *    total_hashes.
 *
 * # Mathematical Proof (Deduplication Law):
 * Ingestar dos veces el mismo (hashlist, hash, plaintext) deja el
 * almacenamiento y los contadores exactamente iguales que una sola
 * ingesta: INSERT OR IGNORE acredita cero filas en la repetición.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::{nullable_text, parse_optional_uuid_column, parse_required_timestamp};
use crate::LedgerClient;
use chrono::{DateTime, Utc};
use kraken_domain_models::{CrackEntry, Hashlist, HashlistStatus};
use libsql::{params, Row};
use tracing::{debug, info, instrument};

/// Resultado de una ráfaga de ingesta de cracks.
#[derive(Debug, Clone)]
pub struct CrackIngestReport {
    /// Cracks acreditados por primera vez en esta ráfaga.
    pub newly_cracked: i64,
    /// La lista alcanzó el 100% tras esta ráfaga.
    pub fully_cracked: bool,
    /// Entradas realmente nuevas (alimentan el potfile).
    pub fresh_entries: Vec<CrackEntry>,
}

const HASHLIST_COLUMNS: &str = "id, name, hash_type, total_hashes, cracked_hashes, status, \
     exclude_from_potfile, client_id, version_hash, file_name, created_at";

/// Autoridad única de persistencia de listas objetivo y sus cracks.
pub struct HashlistRepository {
    database_client: LedgerClient,
}

impl HashlistRepository {
    pub fn new(client: LedgerClient) -> Self {
        Self {
            database_client: client,
        }
    }

    /// Registra una lista objetivo ya procesada y lista para campañas.
    #[instrument(skip(self, hashlist, file_path))]
    pub async fn insert_hashlist(&self, hashlist: &Hashlist, file_path: &str) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        database_connection
            .execute(
                "INSERT INTO hashlists
                 (id, name, hash_type, total_hashes, cracked_hashes, status,
                  exclude_from_potfile, client_id, version_hash, file_name, file_path, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    hashlist.id,
                    hashlist.name.clone(),
                    hashlist.hash_type,
                    hashlist.total_hashes,
                    hashlist.cracked_hashes,
                    hashlist.status.as_label(),
                    hashlist.exclude_from_potfile as i64,
                    nullable_text(hashlist.client_id.map(|identifier| identifier.to_string())),
                    hashlist.version_hash.clone(),
                    hashlist.file_name.clone(),
                    file_path,
                    hashlist.created_at.to_rfc3339()
                ],
            )
            .await?;
        Ok(())
    }

    pub async fn fetch_hashlist(&self, hashlist_identifier: i64) -> Result<Hashlist, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let sql_query = format!(
            "SELECT {} FROM hashlists WHERE id = ?1",
            HASHLIST_COLUMNS
        );
        let mut query_results = database_connection
            .query(&sql_query, params![hashlist_identifier])
            .await?;
        let data_row = query_results
            .next()
            .await?
            .ok_or(DbError::HashlistNotFound)?;
        map_row_to_hashlist(&data_row)
    }

    /// Registra los hashes objetivo de una lista y ajusta su total.
    pub async fn register_hash_batch(
        &self,
        hashlist_identifier: i64,
        hash_values: &[&str],
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut inserted_count = 0i64;
        for hash_value in hash_values {
            inserted_count += database_connection
                .execute(
                    "INSERT OR IGNORE INTO hashes (hashlist_id, hash_value) VALUES (?1, ?2)",
                    params![hashlist_identifier, *hash_value],
                )
                .await? as i64;
        }
        database_connection
            .execute(
                "UPDATE hashlists SET total_hashes = total_hashes + ?2 WHERE id = ?1",
                params![hashlist_identifier, inserted_count],
            )
            .await?;
        Ok(())
    }

    /**
     * Ingesta una ráfaga de cracks con deduplicación por (lista, hash).
     *
     * # Performance:
     * Inserciones O(1) indexadas por clave primaria compuesta. Solo
     * las filas realmente nuevas acreditan el contador.
     */
    #[instrument(skip(self, entries), fields(batch = entries.len()))]
    pub async fn ingest_cracks(
        &self,
        hashlist_identifier: i64,
        entries: &[CrackEntry],
        now: DateTime<Utc>,
    ) -> Result<CrackIngestReport, DbError> {
        let database_connection = self.database_client.get_connection()?;

        let mut fresh_entries = Vec::new();
        for entry in entries {
            let rows_affected = database_connection
                .execute(
                    "INSERT OR IGNORE INTO hash_cracks
                     (hashlist_id, hash_value, plaintext, username, cracked_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        hashlist_identifier,
                        entry.hash.clone(),
                        entry.plaintext.clone(),
                        nullable_text(entry.username.clone()),
                        now.to_rfc3339()
                    ],
                )
                .await?;
            if rows_affected > 0 {
                fresh_entries.push(entry.clone());
            }
        }

        let newly_cracked = fresh_entries.len() as i64;
        if newly_cracked > 0 {
            database_connection
                .execute(
                    "UPDATE hashlists
                     SET cracked_hashes = MIN(total_hashes, cracked_hashes + ?2)
                     WHERE id = ?1",
                    params![hashlist_identifier, newly_cracked],
                )
                .await?;
        }

        let mut query_results = database_connection
            .query(
                "SELECT total_hashes, cracked_hashes FROM hashlists WHERE id = ?1",
                params![hashlist_identifier],
            )
            .await?;
        let data_row = query_results
            .next()
            .await?
            .ok_or(DbError::HashlistNotFound)?;
        let total_hashes: i64 = data_row.get(0)?;
        let cracked_hashes: i64 = data_row.get(1)?;
        let fully_cracked = total_hashes > 0 && cracked_hashes >= total_hashes;

        if newly_cracked > 0 {
            info!(
                "🎯 [CRACK_INGEST]: Hashlist {} credited {} fresh cracks ({}/{}).",
                hashlist_identifier, newly_cracked, cracked_hashes, total_hashes
            );
        } else {
            debug!(
                "♻️ [CRACK_INGEST]: Hashlist {} batch fully deduplicated.",
                hashlist_identifier
            );
        }

        Ok(CrackIngestReport {
            newly_cracked,
            fully_cracked,
            fresh_entries,
        })
    }

    /// Sella la lista como completada (100% de hashes crackeados).
    pub async fn mark_completed(&self, hashlist_identifier: i64) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        database_connection
            .execute(
                "UPDATE hashlists SET status = 'completed' WHERE id = ?1",
                params![hashlist_identifier],
            )
            .await?;
        Ok(())
    }
}

fn map_row_to_hashlist(data_row: &Row) -> Result<Hashlist, DbError> {
    let status_label: String = data_row.get(5)?;
    Ok(Hashlist {
        id: data_row.get::<i64>(0)?,
        name: data_row.get(1)?,
        hash_type: data_row.get::<i64>(2)?,
        total_hashes: data_row.get::<i64>(3)?,
        cracked_hashes: data_row.get::<i64>(4)?,
        status: HashlistStatus::from_label(&status_label)
            .ok_or_else(|| DbError::MappingError(format!("hashlist status '{}'", status_label)))?,
        exclude_from_potfile: data_row.get::<i64>(6)? != 0,
        client_id: parse_optional_uuid_column(data_row, 7),
        version_hash: data_row.get(8)?,
        file_name: data_row.get(9)?,
        created_at: parse_required_timestamp(data_row, 10)?,
    })
}
