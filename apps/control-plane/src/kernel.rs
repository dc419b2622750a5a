// [apps/control-plane/src/kernel.rs]
/**
 * =================================================================
 * APARATO: CONTROL PLANE SOVEREIGN KERNEL (V15.0 - GUARD ACTIVE)
 * CLASIFICACIÓN: COMPOSITION ROOT (ESTRATO L1-APP)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 *
 * VISION HIPER-HOLÍSTICA:
 * Actúa como la placa base donde se conectan todos los servicios.
 * La siembra del caché de tareas en vuelo ocurre ANTES de abrir el
 * socket TCP, previniendo estados de carrera donde un agente reporte
 * progreso de una tarea aún no rehidratada.
 * =================================================================
 */

use crate::clock::SharedClock;
use crate::config::ControlPlaneConfig;
use crate::routes::create_control_plane_router;
use crate::services::{ReconcilerService, RecoveryService};
use crate::state::{AppState, InFlightEntry};
use kraken_infra_db::LedgerClient;
use std::net::{IpAddr, SocketAddr};
use tracing::{error, info, instrument, warn};

pub struct ControlPlaneKernel {
    pub server_network_port: u16,
    pub application_shared_state: AppState,
}

impl ControlPlaneKernel {
    /**
     * Realiza la ignición del cliente táctico y el estado neural.
     * Establece la conexión al Ledger antes de levantar servicios.
     */
    #[instrument(skip(config, clock))]
    pub async fn ignite(config: ControlPlaneConfig, clock: SharedClock) -> Self {
        let database_client = LedgerClient::connect(
            &config.database_url,
            config.database_auth_token.clone(),
        )
        .await
        .expect("FATAL: Ledger link collapse. Ignition aborted.");

        let listening_port = config.listen_port;

        Self {
            server_network_port: listening_port,
            application_shared_state: AppState::new(database_client, config, clock),
        }
    }

    /**
     * Lanza todas las operaciones autónomas del plano de control:
     * siembra de cachés, daemons de fondo y servidor Axum.
     */
    pub async fn launch_sovereign_operations(self) {
        let shared_application_state = self.application_shared_state.clone();

        // --- 1. SIEMBRA DEL CACHÉ DE TAREAS EN VUELO ---
        // El Ledger es autoritativo; la memoria caliente se reconstruye
        // desde las filas assigned/running/reconnect_pending.
        if let Err(seeding_fault) = seed_in_flight_cache(&shared_application_state).await {
            error!("❌ [SEED_FAULT]: In-flight cache reconstruction failed: {}", seeding_fault);
            std::process::exit(1);
        }

        // --- 2. BUCLE RECONCILIADOR (ESCRITOR ÚNICO DE DESPACHO) ---
        match ReconcilerService::new(shared_application_state.clone()) {
            Ok(reconciler) => {
                tokio::spawn(async move { reconciler.spawn_reconciler_daemon().await });
            }
            Err(claim_fault) => {
                error!("💀 [KERNEL_COLLAPSE]: Reconciler ignition failed: {}", claim_fault);
                std::process::exit(1);
            }
        }

        // --- 3. GUARDIÁN DE SUPERVIVENCIA (LATIDOS, GRACIA, STALLS) ---
        let recovery_state = shared_application_state.clone();
        tokio::spawn(async move {
            RecoveryService::new(recovery_state).spawn_recovery_daemon().await;
        });

        // --- 4. IGNICIÓN DEL TRANSPORTE HTTP/WS (AXUM) ---
        let control_plane_router = create_control_plane_router(shared_application_state);

        let bind_address = SocketAddr::new(
            "0.0.0.0".parse::<IpAddr>().unwrap(),
            self.server_network_port,
        );

        info!("🚀 [KERNEL_ONLINE]: Control plane listening at {}", bind_address);

        let tcp_listener = tokio::net::TcpListener::bind(bind_address)
            .await
            .expect("CRITICAL_FAULT: Failed to bind network port.");

        if let Err(server_error) = axum::serve(tcp_listener, control_plane_router).await {
            error!("💀 [KERNEL_COLLAPSE]: Runtime failure: {}", server_error);
            std::process::exit(1);
        }
    }
}

/**
 * Reconstruye el caché de tareas en vuelo desde el Ledger.
 */
async fn seed_in_flight_cache(application_state: &AppState) -> anyhow::Result<()> {
    let now = application_state.clock.now();
    let persisted_tasks = application_state
        .task_repository
        .fetch_all_in_flight()
        .await?;

    let mut reconstructed_entries = Vec::with_capacity(persisted_tasks.len());
    for task in persisted_tasks {
        let agent_identifier = match task.agent_id {
            Some(agent_identifier) => agent_identifier,
            None => continue,
        };

        match application_state
            .job_repository
            .fetch_job(&task.job_execution_id)
            .await
        {
            Ok(execution) => reconstructed_entries.push(InFlightEntry {
                task_id: task.id,
                agent_id: agent_identifier,
                job_execution_id: task.job_execution_id,
                hashlist_id: execution.hashlist_id,
                chunk_duration_seconds: task.chunk_duration_seconds,
                created_at: task.assigned_at.unwrap_or(now),
                last_progress_at: now,
            }),
            Err(orphan_fault) => warn!(
                "⚠️ [SEED_ORPHAN]: Task {} without readable job: {}",
                task.id, orphan_fault
            ),
        }
    }

    let reconstructed_count = reconstructed_entries.len();
    application_state.inflight_registry.seed(reconstructed_entries);
    info!(
        "🧬 [SEED_COMPLETE]: {} in-flight task(s) rehydrated from the Ledger.",
        reconstructed_count
    );
    Ok(())
}
