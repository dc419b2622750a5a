// [libs/infra/db/src/repositories/resources.rs]
/*!
 * =================================================================
 * APARATO: DISTRIBUTABLE RESOURCE REPOSITORY (V7.0)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: METADATOS DE DICCIONARIOS, REGLAS Y BINARIOS
 *
 * # Logic:
 * Los conteos de líneas y reglas alimentan el calculador de
 * keyspace; las huellas de contenido alimentan la pasarela de
 * descargas (ETag) y la puerta de sincronización. Un rule_count
 * nulo marca un archivo de reglas dinámico cuya cardinalidad se
 * resuelve mediante la sonda del binario de cracking.
 * =================================================================
 */

use crate::errors::DbError;
use crate::repositories::nullable_integer;
use crate::LedgerClient;
use kraken_domain_models::FileKind;
use libsql::{params, Row};
use tracing::instrument;

/// Metadatos de un diccionario registrado.
#[derive(Debug, Clone)]
pub struct WordlistMeta {
    pub id: i64,
    pub name: String,
    pub file_name: String,
    pub file_path: String,
    pub line_count: i64,
    pub content_hash: String,
    pub size_bytes: i64,
}

/// Metadatos de un archivo de reglas registrado.
#[derive(Debug, Clone)]
pub struct RuleMeta {
    pub id: i64,
    pub name: String,
    pub file_name: String,
    pub file_path: String,
    /// Nulo cuando la cardinalidad es dinámica (requiere sonda).
    pub rule_count: Option<i64>,
    pub content_hash: String,
    pub size_bytes: i64,
}

/// Metadatos de una versión de binario de cracking.
#[derive(Debug, Clone)]
pub struct BinaryMeta {
    pub id: i64,
    pub label: String,
    pub file_name: String,
    pub file_path: String,
    pub content_hash: String,
    pub size_bytes: i64,
}

/// Proyección mínima para el servido de archivos.
#[derive(Debug, Clone)]
pub struct StoredFileMeta {
    pub file_path: String,
    pub content_hash: String,
    pub size_bytes: i64,
}

/// Autoridad única de metadatos de recursos distribuibles.
pub struct ResourceRepository {
    database_client: LedgerClient,
}

impl ResourceRepository {
    pub fn new(client: LedgerClient) -> Self {
        Self {
            database_client: client,
        }
    }

    // --- ESTRATO DE REGISTRO ---

    #[instrument(skip(self, wordlist))]
    pub async fn register_wordlist(&self, wordlist: &WordlistMeta) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        database_connection
            .execute(
                "INSERT INTO wordlists (id, name, file_name, file_path, line_count, content_hash, size_bytes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    wordlist.id,
                    wordlist.name.clone(),
                    wordlist.file_name.clone(),
                    wordlist.file_path.clone(),
                    wordlist.line_count,
                    wordlist.content_hash.clone(),
                    wordlist.size_bytes
                ],
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self, rule))]
    pub async fn register_rule(&self, rule: &RuleMeta) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        database_connection
            .execute(
                "INSERT INTO rules (id, name, file_name, file_path, rule_count, content_hash, size_bytes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    rule.id,
                    rule.name.clone(),
                    rule.file_name.clone(),
                    rule.file_path.clone(),
                    nullable_integer(rule.rule_count),
                    rule.content_hash.clone(),
                    rule.size_bytes
                ],
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self, binary))]
    pub async fn register_binary(&self, binary: &BinaryMeta) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        database_connection
            .execute(
                "INSERT INTO binary_versions (id, label, file_name, file_path, content_hash, size_bytes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    binary.id,
                    binary.label.clone(),
                    binary.file_name.clone(),
                    binary.file_path.clone(),
                    binary.content_hash.clone(),
                    binary.size_bytes
                ],
            )
            .await?;
        Ok(())
    }

    // --- ESTRATO DE LECTURA ---

    pub async fn fetch_wordlist(&self, wordlist_identifier: i64) -> Result<WordlistMeta, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(
                "SELECT id, name, file_name, file_path, line_count, content_hash, size_bytes
                 FROM wordlists WHERE id = ?1",
                params![wordlist_identifier],
            )
            .await?;
        let data_row = query_results
            .next()
            .await?
            .ok_or(DbError::ResourceNotFound)?;
        Ok(WordlistMeta {
            id: data_row.get::<i64>(0)?,
            name: data_row.get(1)?,
            file_name: data_row.get(2)?,
            file_path: data_row.get(3)?,
            line_count: data_row.get::<i64>(4)?,
            content_hash: data_row.get(5)?,
            size_bytes: data_row.get::<i64>(6)?,
        })
    }

    pub async fn fetch_rule(&self, rule_identifier: i64) -> Result<RuleMeta, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(
                "SELECT id, name, file_name, file_path, rule_count, content_hash, size_bytes
                 FROM rules WHERE id = ?1",
                params![rule_identifier],
            )
            .await?;
        let data_row = query_results
            .next()
            .await?
            .ok_or(DbError::ResourceNotFound)?;
        Ok(map_row_to_rule(&data_row)?)
    }

    pub async fn fetch_binary(&self, binary_identifier: i64) -> Result<BinaryMeta, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let mut query_results = database_connection
            .query(
                "SELECT id, label, file_name, file_path, content_hash, size_bytes
                 FROM binary_versions WHERE id = ?1",
                params![binary_identifier],
            )
            .await?;
        let data_row = query_results
            .next()
            .await?
            .ok_or(DbError::ResourceNotFound)?;
        Ok(BinaryMeta {
            id: data_row.get::<i64>(0)?,
            label: data_row.get(1)?,
            file_name: data_row.get(2)?,
            file_path: data_row.get(3)?,
            content_hash: data_row.get(4)?,
            size_bytes: data_row.get::<i64>(5)?,
        })
    }

    /// Sella la cardinalidad de un archivo de reglas dinámico.
    pub async fn set_rule_count(
        &self,
        rule_identifier: i64,
        resolved_count: i64,
    ) -> Result<(), DbError> {
        let database_connection = self.database_client.get_connection()?;
        let rows_affected = database_connection
            .execute(
                "UPDATE rules SET rule_count = ?2 WHERE id = ?1",
                params![rule_identifier, resolved_count],
            )
            .await?;
        if rows_affected == 0 {
            return Err(DbError::ResourceNotFound);
        }
        Ok(())
    }

    /**
     * Resuelve los metadatos de servido para la pasarela de descargas.
     * La búsqueda es por (clase, nombre de archivo), exactamente como
     * llegan en la ruta pública.
     */
    pub async fn resolve_served_file(
        &self,
        kind: FileKind,
        file_name: &str,
    ) -> Result<StoredFileMeta, DbError> {
        let database_connection = self.database_client.get_connection()?;
        let sql_query = match kind {
            FileKind::Wordlist => {
                "SELECT file_path, content_hash, size_bytes FROM wordlists WHERE file_name = ?1"
            }
            FileKind::Rule => {
                "SELECT file_path, content_hash, size_bytes FROM rules WHERE file_name = ?1"
            }
            FileKind::Binary => {
                "SELECT file_path, content_hash, size_bytes FROM binary_versions WHERE file_name = ?1"
            }
            FileKind::Hashlist => {
                "SELECT file_path, version_hash, size_bytes FROM hashlists WHERE file_name = ?1"
            }
        };

        let mut query_results = database_connection
            .query(sql_query, params![file_name])
            .await?;
        let data_row = query_results
            .next()
            .await?
            .ok_or(DbError::ResourceNotFound)?;
        Ok(StoredFileMeta {
            file_path: data_row.get(0)?,
            content_hash: data_row.get(1)?,
            size_bytes: data_row.get::<i64>(2)?,
        })
    }
}

fn map_row_to_rule(data_row: &Row) -> Result<RuleMeta, DbError> {
    Ok(RuleMeta {
        id: data_row.get::<i64>(0)?,
        name: data_row.get(1)?,
        file_name: data_row.get(2)?,
        file_path: data_row.get(3)?,
        rule_count: data_row.get::<Option<i64>>(4)?,
        content_hash: data_row.get(5)?,
        size_bytes: data_row.get::<i64>(6)?,
    })
}
