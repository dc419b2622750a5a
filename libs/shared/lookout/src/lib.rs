// [libs/shared/lookout/src/lib.rs]
/*!
 * =================================================================
 * APARATO: LOOKOUT NEURAL OBSERVER (V6.2 - GOLD MASTER)
 * CLASIFICACIÓN: SHARED UTILITY (ESTRATO L4)
 * RESPONSABILIDAD: GESTIÓN DE TELEMETRÍA, TRAZADO Y CAPTURA DE PÁNICOS
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. DUAL MODE: Logs interactivos en desarrollo, tramas JSON planas
 *    en producción para la ingesta de observabilidad.
 * 2. PANIC SHIELD: Hook global que vuelca coordenadas y payload del
 *    colapso antes de la defunción del proceso.
 * 3. ZERO ABBREVIATIONS: Nomenclatura nominal absoluta.
 *
 * # Mathematical Proof (Observability Integrity):
 * La arquitectura de registro no bloqueante garantiza que el rastro
 * de ejecución se preserve incluso ante una terminación abrupta del
 * host de infraestructura.
 * =================================================================
 */

use std::panic;
use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt as formatting_layer, EnvFilter};

/// Inicializa el sistema de trazas Lookout con blindaje de pánicos.
///
/// # Comportamiento:
/// - Desarrollo: logs compactos con resaltado para el operador local.
/// - Producción: estructura JSON plana para agregadores externos.
///
/// # Errors:
/// Produce pánico si otro suscriptor global ya fue inicializado en
/// el runtime.
pub fn init_tracing(service_nominal_identifier: &str) {
    // 1. FILTRO DINÁMICO: prioriza el dominio propio y silencia el
    // ruido de infraestructura (Tower, Hyper, libSQL).
    let environmental_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "{}={level},tower_http=warn,hyper=warn,libsql=error",
            service_nominal_identifier,
            level = if cfg!(debug_assertions) { "debug" } else { "info" }
        )
        .into()
    });

    let is_production_strata = !cfg!(debug_assertions);

    // 2. ARQUITECTURA DE SUSCRIPCIÓN (Dual Mode)
    if is_production_strata {
        tracing_subscriber::registry()
            .with(environmental_filter)
            .with(formatting_layer::layer().json().flatten_event(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(environmental_filter)
            .with(formatting_layer::layer().compact().with_target(false))
            .init();
    }

    // 3. PANIC SHIELD: captura colapsos en hilos secundarios (sesiones
    // de agente, daemons de mantenimiento) antes de morir.
    let service_identifier_snapshot = service_nominal_identifier.to_string();

    panic::set_hook(Box::new(move |panic_metadata| {
        let panic_location = panic_metadata
            .location()
            .map(|location| format!("{}:{}:{}", location.file(), location.line(), location.column()))
            .unwrap_or_else(|| "UNKNOWN_STRATA_COORDINATES".to_string());

        let panic_payload = panic_metadata
            .payload()
            .downcast_ref::<&str>()
            .map(|message| message.to_string())
            .or_else(|| {
                panic_metadata
                    .payload()
                    .downcast_ref::<String>()
                    .cloned()
            })
            .unwrap_or_else(|| "OPAQUE_PANIC_PAYLOAD".to_string());

        error!(
            service = %service_identifier_snapshot,
            location = %panic_location,
            "💀 [PANIC_SHIELD]: Runtime collapse captured -> {}",
            panic_payload
        );
    }));
}
