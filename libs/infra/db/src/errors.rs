// [libs/infra/db/src/errors.rs]
/*!
 * =================================================================
 * APARATO: DATABASE ERROR CATALOG (V12.3 - SOBERANO)
 * CLASIFICACIÓN: INFRASTRUCTURE CORE (ESTRATO L3)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE PERSISTENCIA
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. PANOPTICON COMPLIANCE: Formatea los mensajes con prefijos de
 *    estrato para su renderizado cromático en la consola.
 * 2. DISPATCH GUARDS: Distingue el rechazo de avance de keyspace
 *    (DispatchOverflow) de los conflictos de propiedad, porque el
 *    reconciliador reacciona distinto ante cada uno.
 * 3. ZERO ABBREVIATIONS: Nomenclatura nominal absoluta.
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// Error de enlace físico o de red con el motor libSQL.
    #[error("[L3_DB_NET_FAULT]: DATABASE_UPLINK_SEVERED -> {0}")]
    ConnectionError(String),

    /// Fallo en la configuración del entorno (variables vacías o malformadas).
    #[error("[L3_DB_CONFIG_FAULT]: STRATEGIC_ENV_VOID -> {0}")]
    ConfigurationError(String),

    /// Error de sintaxis o ejecución devuelto por el motor libSQL.
    #[error("[L3_DB_QUERY_FAULT]: SQL_QUERY_REJECTED -> {0}")]
    QueryError(#[from] libsql::Error),

    /// Fallo en la transformación de tipos entre SQLite y el Dominio Rust.
    #[error("[L3_DB_MAPPING_FAULT]: DATA_MAPPING_VIOLATION -> {0}")]
    MappingError(String),

    // --- ESTRATO DE CONTROL DE DESPACHO ---

    /// La ejecución solicitada no existe en el Ledger.
    #[error("[L3_JOB_FAULT]: JOB_EXECUTION_NOT_FOUND")]
    JobNotFound,

    /// La tarea solicitada no existe en el Ledger.
    #[error("[L3_TASK_FAULT]: TASK_NOT_FOUND")]
    TaskNotFound,

    /// El avance de despacho excedería el keyspace efectivo del trabajo.
    #[error("[L3_DISPATCH_FAULT]: KEYSPACE_ADVANCE_REJECTED")]
    DispatchOverflow,

    /// Conflicto de propiedad: la tarea pertenece a otro agente.
    #[error("[L3_TASK_FAULT]: OWNERSHIP_VIOLATION")]
    OwnershipConflict,

    /// La entidad no se encuentra en un estado apto para la operación.
    #[error("[L3_STATE_FAULT]: INVALID_STATE_TRANSITION")]
    InvalidState,

    /// Error al comprometer cambios en una secuencia multi-tabla.
    #[error("[L3_DB_FAULT]: TRANSACTION_COLLAPSE")]
    TransactionError,

    // --- ESTRATO DE FLOTA Y RECURSOS ---

    /// El agente solicitado no está registrado.
    #[error("[L3_AGENT_FAULT]: AGENT_NOT_FOUND")]
    AgentNotFound,

    /// La credencial presentada en el handshake no coincide.
    #[error("[L3_AGENT_FAULT]: CREDENTIALS_REJECTED")]
    CredentialsRejected,

    /// La hashlist solicitada no existe.
    #[error("[L3_HASHLIST_FAULT]: HASHLIST_NOT_FOUND")]
    HashlistNotFound,

    /// El recurso de archivo (diccionario, reglas, binario) no existe.
    #[error("[L3_RESOURCE_FAULT]: RESOURCE_NOT_FOUND")]
    ResourceNotFound,
}
