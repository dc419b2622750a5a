// [apps/control-plane/src/config.rs]
/*!
 * =================================================================
 * APARATO: CONTROL PLANE CONFIGURATION (V7.0 - PRODUCTION MASTER)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L1-APP)
 * RESPONSABILIDAD: ADQUISICIÓN SOBERANA DE PARÁMETROS DE PROCESO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SINGLE ACQUISITION: Las variables de entorno se leen una única
 *    vez en la ignición; el resto del sistema consume la estructura
 *    inmutable compartida.
 * 2. NOMINAL DEFAULTS: Cada parámetro declara su valor nominal de
 *    fábrica junto a su efecto operativo.
 * =================================================================
 */

use kraken_domain_scheduling::{ChunkPolicy, RuleSplitPolicy};
use std::env;
use std::path::PathBuf;

/// Parámetros de proceso del plano de control.
#[derive(Debug, Clone)]
pub struct ControlPlaneConfig {
    // --- RED Y PERSISTENCIA ---
    pub listen_port: u16,
    pub database_url: String,
    pub database_auth_token: Option<String>,
    /// Raíz de almacenamiento de archivos distribuibles.
    pub data_dir: PathBuf,
    /// URL pública anunciada en las órdenes de descarga.
    pub public_base_url: String,
    /// Destino del potfile agregado de cracks.
    pub potfile_path: PathBuf,

    // --- TEMPORIZADORES DE FLOTA ---
    /// Cadencia de latido de los agentes (30s).
    pub heartbeat_interval_s: i64,
    /// Latidos perdidos antes de declarar desconexión (3).
    pub missed_heartbeats_threshold: i64,
    /// Gracia antes de liberar tareas de un agente caído (300s).
    pub reconnect_grace_s: i64,

    // --- BENCHMARKS ---
    /// Ventana de frescura de muestras (14 días).
    pub benchmark_staleness_s: i64,
    /// Retención de muestras antes de la evicción (60 días).
    pub benchmark_retention_s: i64,
    /// Piso de velocidad cuando no hay muestra utilizable (1e6 H/s).
    pub default_speed_floor: i64,

    // --- DESPACHO ---
    /// Duración objetivo de chunk cuando la plantilla la omite (300s).
    pub default_chunk_duration_s: i64,
    /// Multiplicador de estancamiento de progreso (5 × chunk).
    pub progress_stale_multiplier: i64,
    /// Reintentos de tarea antes de sellar el trabajo como fallido (3).
    pub max_task_retries: i64,
    /// Reintentos de sincronización antes de excluir al agente (3).
    pub sync_max_retries: i64,
    /// Factor de reglas que habilita rule-splitting (100).
    pub rule_split_threshold: i64,
    /// Keyspace base que desactiva rule-splitting (1e9).
    pub rule_split_min_base: i64,
    /// Unidades mínimas de keyspace por chunk (1).
    pub min_chunk: i64,

    // --- RECONCILIADOR ---
    /// Tick nominal del bucle reconciliador (5s).
    pub reconciler_tick_s: i64,
    /// Presupuesto de trabajo por iteración (2s).
    pub reconciler_deadline_s: i64,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            listen_port: 3000,
            database_url: String::new(),
            database_auth_token: None,
            data_dir: PathBuf::from("data"),
            public_base_url: "http://localhost:3000".to_string(),
            potfile_path: PathBuf::from("data/kraken.potfile"),
            heartbeat_interval_s: 30,
            missed_heartbeats_threshold: 3,
            reconnect_grace_s: 300,
            benchmark_staleness_s: 14 * 24 * 3600,
            benchmark_retention_s: 60 * 24 * 3600,
            default_speed_floor: 1_000_000,
            default_chunk_duration_s: 300,
            progress_stale_multiplier: 5,
            max_task_retries: 3,
            sync_max_retries: 3,
            rule_split_threshold: 100,
            rule_split_min_base: 1_000_000_000,
            min_chunk: 1,
            reconciler_tick_s: 5,
            reconciler_deadline_s: 2,
        }
    }
}

impl ControlPlaneConfig {
    /**
     * Hidrata la configuración desde el entorno del proceso.
     * Toda variable ausente conserva su valor nominal de fábrica.
     */
    pub fn from_environment() -> Self {
        let factory_defaults = Self::default();

        Self {
            listen_port: parse_env("PORT", factory_defaults.listen_port as i64) as u16,
            database_url: env::var("DATABASE_URL").unwrap_or_default(),
            database_auth_token: env::var("DATABASE_AUTH_TOKEN").ok(),
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(factory_defaults.data_dir),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or(factory_defaults.public_base_url),
            potfile_path: env::var("POTFILE_PATH")
                .map(PathBuf::from)
                .unwrap_or(factory_defaults.potfile_path),
            heartbeat_interval_s: parse_env("HEARTBEAT_INTERVAL_S", factory_defaults.heartbeat_interval_s),
            missed_heartbeats_threshold: parse_env(
                "MISSED_HEARTBEATS_THRESHOLD",
                factory_defaults.missed_heartbeats_threshold,
            ),
            reconnect_grace_s: parse_env("RECONNECT_GRACE_S", factory_defaults.reconnect_grace_s),
            benchmark_staleness_s: parse_env(
                "BENCHMARK_STALENESS_S",
                factory_defaults.benchmark_staleness_s,
            ),
            benchmark_retention_s: parse_env(
                "BENCHMARK_RETENTION_S",
                factory_defaults.benchmark_retention_s,
            ),
            default_speed_floor: parse_env("DEFAULT_SPEED_FLOOR", factory_defaults.default_speed_floor),
            default_chunk_duration_s: parse_env(
                "DEFAULT_CHUNK_DURATION_S",
                factory_defaults.default_chunk_duration_s,
            ),
            progress_stale_multiplier: parse_env(
                "PROGRESS_STALE_MULTIPLIER",
                factory_defaults.progress_stale_multiplier,
            ),
            max_task_retries: parse_env("MAX_TASK_RETRIES", factory_defaults.max_task_retries),
            sync_max_retries: parse_env("SYNC_MAX_RETRIES", factory_defaults.sync_max_retries),
            rule_split_threshold: parse_env("RULE_SPLIT_THRESHOLD", factory_defaults.rule_split_threshold),
            rule_split_min_base: parse_env("RULE_SPLIT_MIN_BASE", factory_defaults.rule_split_min_base),
            min_chunk: parse_env("MIN_CHUNK", factory_defaults.min_chunk),
            reconciler_tick_s: parse_env("RECONCILER_TICK_S", factory_defaults.reconciler_tick_s),
            reconciler_deadline_s: parse_env(
                "RECONCILER_DEADLINE_S",
                factory_defaults.reconciler_deadline_s,
            ),
        }
    }

    // --- VENTANAS DERIVADAS ---

    /// Silencio de latido que declara a un agente desconectado.
    pub fn heartbeat_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.heartbeat_interval_s * self.missed_heartbeats_threshold)
    }

    pub fn reconnect_grace(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.reconnect_grace_s)
    }

    pub fn benchmark_staleness(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.benchmark_staleness_s)
    }

    pub fn benchmark_retention(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.benchmark_retention_s)
    }

    /// Silencio de progreso que cancela y re-encola una tarea.
    pub fn progress_stale_window(&self, chunk_duration_seconds: i64) -> chrono::Duration {
        chrono::Duration::seconds(self.progress_stale_multiplier * chunk_duration_seconds.max(1))
    }

    pub fn rule_split_policy(&self) -> RuleSplitPolicy {
        RuleSplitPolicy {
            split_threshold: self.rule_split_threshold,
            min_base_exemption: self.rule_split_min_base,
        }
    }

    pub fn chunk_policy(&self) -> ChunkPolicy {
        ChunkPolicy {
            min_chunk_size: self.min_chunk,
        }
    }
}

fn parse_env(variable_name: &str, factory_default: i64) -> i64 {
    env::var(variable_name)
        .ok()
        .and_then(|raw_value| raw_value.parse::<i64>().ok())
        .unwrap_or(factory_default)
}
