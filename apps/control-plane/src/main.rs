// [apps/control-plane/src/main.rs]
/*!
 * =================================================================
 * APARATO: CONTROL PLANE MAIN ENTRY POINT (V9.0 - GOLD MASTER)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L1-APP)
 * RESPONSABILIDAD: BOOTSTRAP DE INFRAESTRUCTURA E IGNICIÓN SEGURA
 *
 * # Mathematical Proof (Deterministic Ignition):
 * El proceso garantiza que la siembra del caché de tareas en vuelo
 * ocurra antes que la apertura del socket TCP, previniendo estados
 * de carrera donde un agente reporte sobre tareas no rehidratadas.
 * =================================================================
 */

use std::sync::Arc;

use dotenvy::dotenv;
use kraken_control_plane::prelude::*;
use kraken_shared_lookout::init_tracing;
use tracing::info;

/**
 * Punto de ignición supremo del binario del plano de control.
 */
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. CARGA DE ENTORNO SOBERANO
    dotenv().ok();

    // 2. INICIALIZACIÓN DE OBSERVABILIDAD NEURAL (LOOKOUT)
    init_tracing("kraken_control_plane");

    // 3. CONFIGURACIÓN DEL RUNTIME SOBERANO CON PROTECCIÓN DE PILA
    let runtime_orchestrator = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_stack_size(4 * 1024 * 1024)
        .build()?;

    runtime_orchestrator.block_on(async {
        info!("🛰️  [COMMAND_CENTER]: Global ignition sequence starting...");

        // 4. ADQUISICIÓN DE COORDENADAS TÁCTICAS
        let process_configuration = ControlPlaneConfig::from_environment();
        let listening_network_port = process_configuration.listen_port;

        // 5. CONSTRUCCIÓN DEL KERNEL SOBERANO (ESTRATO L1-APP)
        let wall_clock: SharedClock = Arc::new(WallClock);
        let kernel_instance = ControlPlaneKernel::ignite(process_configuration, wall_clock).await;

        // 6. IGNICIÓN DE OPERACIONES DE FLOTA
        info!(
            "🚀 [KRAKEN_ONLINE]: Control plane fully operational on port {}.",
            listening_network_port
        );
        kernel_instance.launch_sovereign_operations().await;
    });

    Ok(())
}
