// [libs/infra/db/src/schema.rs]
/**
 * =================================================================
 * APARATO: SOVEREIGN LEDGER SCHEMA (V23.0 - DISPATCH STRATA)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GOBERNANZA ESTRUCTURAL E IDEMPOTENCIA TOTAL
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. DISPATCH LEDGER: Tablas de ejecuciones, tareas y huecos de
 *    keyspace con fronteras duales (base y reglas).
 * 2. FLEET REGISTRY: Agentes, sincronización de hashlists y
 *    benchmarks con unicidad por combinación táctica.
 * 3. IDEMPOTENCIA: Gestión de errores para migraciones en caliente.
 * 4. PERFORMANCE: Índices de aceleración para el despacho masivo.
 * =================================================================
 */

use anyhow::{Context, Result};
use libsql::Connection;
use tracing::{debug, info, instrument, warn};

/**
 * ESTRATO 1: SOLIDIFICACIÓN (Génesis de Tablas)
 * Define las entidades base del plano de control.
 */
const TACTICAL_TABLES: &[(&str, &str)] = &[
    ("TABLE_PRESET_JOBS", r#"
        CREATE TABLE IF NOT EXISTS preset_jobs (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            attack_mode TEXT NOT NULL,
            priority INTEGER NOT NULL DEFAULT 0,
            binary_version_id INTEGER NOT NULL,
            wordlist_ids TEXT NOT NULL DEFAULT '[]',
            rule_ids TEXT NOT NULL DEFAULT '[]',
            mask TEXT,
            chunk_duration_seconds INTEGER NOT NULL DEFAULT 300,
            allow_high_priority_override INTEGER NOT NULL DEFAULT 0,
            max_agents INTEGER NOT NULL DEFAULT 0,
            keyspace INTEGER,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#),
    ("TABLE_HASHLISTS", r#"
        CREATE TABLE IF NOT EXISTS hashlists (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            hash_type INTEGER NOT NULL,
            total_hashes INTEGER NOT NULL DEFAULT 0,
            cracked_hashes INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'ready',
            exclude_from_potfile INTEGER NOT NULL DEFAULT 0,
            client_id TEXT,
            version_hash TEXT NOT NULL DEFAULT '',
            file_name TEXT NOT NULL DEFAULT '',
            file_path TEXT NOT NULL DEFAULT '',
            size_bytes INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#),
    ("TABLE_HASHES", r#"
        CREATE TABLE IF NOT EXISTS hashes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            hashlist_id INTEGER NOT NULL,
            hash_value TEXT NOT NULL,
            username TEXT,
            UNIQUE(hashlist_id, hash_value)
        );
    "#),
    ("TABLE_HASH_CRACKS", r#"
        CREATE TABLE IF NOT EXISTS hash_cracks (
            hashlist_id INTEGER NOT NULL,
            hash_value TEXT NOT NULL,
            plaintext TEXT NOT NULL,
            username TEXT,
            cracked_at DATETIME,
            PRIMARY KEY(hashlist_id, hash_value)
        );
    "#),
    ("TABLE_AGENTS", r#"
        CREATE TABLE IF NOT EXISTS agents (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            owner_id TEXT,
            api_key TEXT NOT NULL,
            devices_json TEXT NOT NULL DEFAULT '[]',
            schedule_json TEXT NOT NULL DEFAULT '[]',
            last_heartbeat DATETIME,
            consecutive_failures INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#),
    ("TABLE_AGENT_HASHLIST_SYNC", r#"
        CREATE TABLE IF NOT EXISTS agent_hashlist_sync (
            agent_id INTEGER NOT NULL,
            hashlist_id INTEGER NOT NULL,
            version_hash TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'stale',
            retry_count INTEGER NOT NULL DEFAULT 0,
            last_synced_at DATETIME,
            PRIMARY KEY(agent_id, hashlist_id)
        );
    "#),
    ("TABLE_BENCHMARKS", r#"
        CREATE TABLE IF NOT EXISTS benchmarks (
            agent_id INTEGER NOT NULL,
            attack_mode TEXT NOT NULL,
            hash_type INTEGER NOT NULL,
            speed_hashes_per_second INTEGER NOT NULL,
            measured_at DATETIME NOT NULL,
            valid_until DATETIME NOT NULL,
            PRIMARY KEY(agent_id, attack_mode, hash_type)
        );
    "#),
    ("TABLE_JOB_EXECUTIONS", r#"
        CREATE TABLE IF NOT EXISTS job_executions (
            id TEXT PRIMARY KEY,
            preset_job_id TEXT NOT NULL,
            hashlist_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            priority INTEGER NOT NULL DEFAULT 0,
            max_agents INTEGER NOT NULL DEFAULT 0,
            attack_mode TEXT NOT NULL,
            base_keyspace INTEGER,
            multiplication_factor INTEGER,
            effective_keyspace INTEGER,
            uses_rule_splitting INTEGER NOT NULL DEFAULT 0,
            rule_split_count INTEGER NOT NULL DEFAULT 0,
            dispatched_keyspace INTEGER NOT NULL DEFAULT 0,
            processed_keyspace INTEGER NOT NULL DEFAULT 0,
            next_base_offset INTEGER NOT NULL DEFAULT 0,
            next_rule_offset INTEGER NOT NULL DEFAULT 0,
            overall_progress_percent REAL NOT NULL DEFAULT 0,
            allow_high_priority_override INTEGER NOT NULL DEFAULT 0,
            wordlist_ids TEXT NOT NULL DEFAULT '[]',
            rule_ids TEXT NOT NULL DEFAULT '[]',
            mask TEXT,
            binary_version_id INTEGER NOT NULL,
            chunk_duration_seconds INTEGER NOT NULL DEFAULT 300,
            interrupted_by TEXT,
            error_message TEXT,
            created_at DATETIME NOT NULL,
            started_at DATETIME,
            completed_at DATETIME,
            updated_at DATETIME NOT NULL
        );
    "#),
    ("TABLE_JOB_TASKS", r#"
        CREATE TABLE IF NOT EXISTS job_tasks (
            id TEXT PRIMARY KEY,
            job_execution_id TEXT NOT NULL,
            agent_id INTEGER,
            status TEXT NOT NULL DEFAULT 'pending',
            keyspace_start INTEGER NOT NULL,
            keyspace_end INTEGER NOT NULL,
            rule_start_index INTEGER,
            rule_end_index INTEGER,
            chunk_duration_seconds INTEGER NOT NULL DEFAULT 300,
            progress_percent REAL NOT NULL DEFAULT 0,
            keyspace_processed INTEGER NOT NULL DEFAULT 0,
            benchmark_speed INTEGER NOT NULL DEFAULT 0,
            low_confidence INTEGER NOT NULL DEFAULT 0,
            retry_count INTEGER NOT NULL DEFAULT 0,
            error_message TEXT,
            assigned_at DATETIME,
            started_at DATETIME,
            completed_at DATETIME
        );
    "#),
    ("TABLE_JOB_KEYSPACE_HOLES", r#"
        CREATE TABLE IF NOT EXISTS job_keyspace_holes (
            id TEXT PRIMARY KEY,
            job_execution_id TEXT NOT NULL,
            keyspace_start INTEGER NOT NULL,
            keyspace_end INTEGER NOT NULL,
            rule_start_index INTEGER,
            rule_end_index INTEGER,
            released_at DATETIME NOT NULL
        );
    "#),
    ("TABLE_WORDLISTS", r#"
        CREATE TABLE IF NOT EXISTS wordlists (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            file_name TEXT NOT NULL,
            file_path TEXT NOT NULL,
            line_count INTEGER NOT NULL DEFAULT 0,
            content_hash TEXT NOT NULL DEFAULT '',
            size_bytes INTEGER NOT NULL DEFAULT 0
        );
    "#),
    ("TABLE_RULES", r#"
        CREATE TABLE IF NOT EXISTS rules (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            file_name TEXT NOT NULL,
            file_path TEXT NOT NULL,
            rule_count INTEGER,
            content_hash TEXT NOT NULL DEFAULT '',
            size_bytes INTEGER NOT NULL DEFAULT 0
        );
    "#),
    ("TABLE_BINARY_VERSIONS", r#"
        CREATE TABLE IF NOT EXISTS binary_versions (
            id INTEGER PRIMARY KEY,
            label TEXT NOT NULL,
            file_name TEXT NOT NULL,
            file_path TEXT NOT NULL,
            content_hash TEXT NOT NULL DEFAULT '',
            size_bytes INTEGER NOT NULL DEFAULT 0
        );
    "#),
];

/**
 * ESTRATO 2: EVOLUCIÓN (Mutaciones de Columna)
 * Asegura que las tablas existentes se adapten a las nuevas capacidades.
 */
const EVOLUTIONARY_STRATA: &[(&str, &str)] = &[
    // --- SOPORTE DE PREEMPCIÓN Y CONFIANZA DE CHUNKS ---
    ("JOB_INTERRUPTED_BY", "ALTER TABLE job_executions ADD COLUMN interrupted_by TEXT"),
    ("TASK_LOW_CONFIDENCE", "ALTER TABLE job_tasks ADD COLUMN low_confidence INTEGER NOT NULL DEFAULT 0"),

    // --- HIGIENE DE FLOTA ---
    ("AGENT_FAILURES", "ALTER TABLE agents ADD COLUMN consecutive_failures INTEGER NOT NULL DEFAULT 0"),
    ("HASHLIST_POTFILE_OPTOUT", "ALTER TABLE hashlists ADD COLUMN exclude_from_potfile INTEGER NOT NULL DEFAULT 0"),
];

/**
 * ESTRATO 3: ENDURECIMIENTO (Índices de Aceleración)
 * Optimiza las consultas calientes del reconciliador.
 */
const ACCELERATION_INDEXES: &[(&str, &str)] = &[
    ("IDX_JOBS_READY", "CREATE INDEX IF NOT EXISTS idx_jobs_ready ON job_executions(status, priority, created_at);"),
    ("IDX_JOBS_HASHLIST", "CREATE INDEX IF NOT EXISTS idx_jobs_hashlist ON job_executions(hashlist_id);"),
    ("IDX_TASKS_JOB", "CREATE INDEX IF NOT EXISTS idx_tasks_job ON job_tasks(job_execution_id, status);"),
    ("IDX_TASKS_AGENT", "CREATE INDEX IF NOT EXISTS idx_tasks_agent ON job_tasks(agent_id, status);"),
    ("IDX_HOLES_JOB", "CREATE INDEX IF NOT EXISTS idx_holes_job ON job_keyspace_holes(job_execution_id, released_at);"),
    ("IDX_SYNC_HASHLIST", "CREATE INDEX IF NOT EXISTS idx_sync_hashlist ON agent_hashlist_sync(hashlist_id, status);"),
];

/**
 * Ejecuta la secuencia maestra de sincronización del esquema estructural.
 *
 * # Errors:
 * Retorna error si alguna tabla base falla en solidificarse, indicando
 * un colapso en el enlace con el motor libSQL.
 */
#[instrument(skip(database_connection))]
pub async fn apply_full_ledger_schema(database_connection: &Connection) -> Result<()> {
    info!("🏗️ [SCHEMA_ENGINE]: Initiating structural synchronization V23.0...");

    solidify_base_strata(database_connection).await?;
    execute_evolutionary_repair(database_connection).await?;
    harden_access_layer(database_connection).await?;

    info!("✅ [SCHEMA_ENGINE]: Dispatch Ledger V23.0 level and certified.");
    Ok(())
}

async fn solidify_base_strata(db: &Connection) -> Result<()> {
    for (identifier, sql) in TACTICAL_TABLES {
        debug!("  ↳ Solidifying: {}", identifier);
        db.execute(*sql, ())
            .await
            .with_context(|| format!("CRITICAL_SOLIDIFICATION_FAULT: {}", identifier))?;
    }
    Ok(())
}

async fn execute_evolutionary_repair(db: &Connection) -> Result<()> {
    for (identifier, sql) in EVOLUTIONARY_STRATA {
        match db.execute(*sql, ()).await {
            Ok(_) => info!("  🟢 [REPAIR_OK]: Applied evolutionary stratum {}", identifier),
            Err(e) => {
                let message = e.to_string();
                if message.contains("duplicate column name") {
                    debug!("  ⚪ [REPAIR_SKIP]: {} already level.", identifier);
                } else {
                    warn!("  ⚠️ [REPAIR_BYPASS]: {} check incomplete: {}", identifier, message);
                }
            }
        }
    }
    Ok(())
}

async fn harden_access_layer(db: &Connection) -> Result<()> {
    for (identifier, sql) in ACCELERATION_INDEXES {
        debug!("  ↳ Hardening: {}", identifier);
        db.execute(*sql, ())
            .await
            .with_context(|| format!("CRITICAL_HARDENING_FAULT: {}", identifier))?;
    }
    Ok(())
}
