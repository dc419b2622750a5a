// [apps/control-plane/src/state/mod.rs]
/*!
 * =================================================================
 * APARATO: SOVEREIGN STATE ORCHESTRATOR (V9.0 - SINGULARITY GOLD)
 * CLASIFICACIÓN: APPLICATION STATE (ESTRATO L1-APP)
 * RESPONSABILIDAD: ORQUESTACIÓN DE REPOSITORIOS, CACHÉS Y CANALES
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. EXPLICIT WIRING: Cero singletons globales. Todas las
 *    dependencias se inyectan en la construcción y viajan clonando
 *    este contenedor.
 * 2. NARROW DISPATCHER: El reconciliador consume la capacidad
 *    'Dispatcher' sin conocer la existencia del WebSocket.
 * 3. COMPOSITION ROOT: Centraliza el rastro de los 8 repositorios,
 *    los cachés write-through y los buses de señal y eventos.
 * =================================================================
 */

pub mod agent_directory;
pub mod inflight_registry;

use crate::clock::SharedClock;
use crate::config::ControlPlaneConfig;
use crate::services::dispatch::Dispatcher;
use crate::services::event_bus::EventBus;
use crate::services::potfile::PotfileWriter;
use crate::services::signal_bus::SignalBus;
use kraken_infra_db::repositories::{
    AgentRepository, BenchmarkRepository, HashlistRepository, JobExecutionRepository,
    PresetRepository, ResourceRepository, SyncRepository, TaskRepository,
};
use kraken_infra_db::LedgerClient;
use std::sync::Arc;
use tracing::debug;

pub use agent_directory::AgentDirectory;
pub use inflight_registry::{InFlightEntry, InFlightRegistry};

/**
 * Contenedor de estado compartido (Thread-Safe) del plano de control.
 * Actúa como la placa base donde se conectan todos los estratos.
 */
#[derive(Clone)]
pub struct AppState {
    /// Cliente táctico hacia el Ledger libSQL.
    pub database_client: LedgerClient,
    /// Parámetros de proceso inmutables.
    pub config: Arc<ControlPlaneConfig>,
    /// Fuente única de tiempo inyectada.
    pub clock: SharedClock,

    // --- AUTORIDADES DE PERSISTENCIA (ESTRATO L3) ---
    pub job_repository: Arc<JobExecutionRepository>,
    pub task_repository: Arc<TaskRepository>,
    pub hashlist_repository: Arc<HashlistRepository>,
    pub agent_repository: Arc<AgentRepository>,
    pub benchmark_repository: Arc<BenchmarkRepository>,
    pub preset_repository: Arc<PresetRepository>,
    pub resource_repository: Arc<ResourceRepository>,
    pub sync_repository: Arc<SyncRepository>,

    // --- ESTADO CALIENTE Y CANALES (ESTRATO L1-APP) ---
    /// Registro vivo de enlaces de agente.
    pub agent_directory: Arc<AgentDirectory>,
    /// Capacidad estrecha de envío consumida por el reconciliador.
    pub dispatcher: Arc<dyn Dispatcher>,
    /// Caché write-through de tareas en vuelo.
    pub inflight_registry: Arc<InFlightRegistry>,
    /// Canal de señales de despertar del reconciliador.
    pub signal_bus: Arc<SignalBus>,
    /// Bus de difusión de eventos en tiempo real para operadores.
    pub event_bus: Arc<EventBus>,
    /// Escritor serializado del potfile agregado.
    pub potfile_writer: Arc<PotfileWriter>,
}

impl AppState {
    /**
     * Forja una nueva instancia del Estado Maestro inyectando todas
     * las dependencias desde la raíz de composición.
     */
    pub fn new(
        database_client: LedgerClient,
        config: ControlPlaneConfig,
        clock: SharedClock,
    ) -> Self {
        debug!("🧬 [APP_STATE]: Executing sovereign ignition sequence V9.0...");

        let agent_directory_instance = Arc::new(AgentDirectory::new());
        let potfile_destination = config.potfile_path.clone();

        Self {
            database_client: database_client.clone(),
            config: Arc::new(config),
            clock,

            job_repository: Arc::new(JobExecutionRepository::new(database_client.clone())),
            task_repository: Arc::new(TaskRepository::new(database_client.clone())),
            hashlist_repository: Arc::new(HashlistRepository::new(database_client.clone())),
            agent_repository: Arc::new(AgentRepository::new(database_client.clone())),
            benchmark_repository: Arc::new(BenchmarkRepository::new(database_client.clone())),
            preset_repository: Arc::new(PresetRepository::new(database_client.clone())),
            resource_repository: Arc::new(ResourceRepository::new(database_client.clone())),
            sync_repository: Arc::new(SyncRepository::new(database_client)),

            dispatcher: agent_directory_instance.clone(),
            agent_directory: agent_directory_instance,
            inflight_registry: Arc::new(InFlightRegistry::new()),
            signal_bus: Arc::new(SignalBus::new()),
            event_bus: Arc::new(EventBus::new()),
            potfile_writer: Arc::new(PotfileWriter::new(potfile_destination)),
        }
    }
}
