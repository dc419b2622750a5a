// [apps/control-plane/src/lib.rs]
/*!
 * =================================================================
 * APARATO: CONTROL PLANE LIBRARY ROOT (V8.0 - SOVEREIGN AUTHORITY)
 * CLASIFICACIÓN: CRATE ROOT (ESTRATO L1-APP)
 * RESPONSABILIDAD: DEFINICIÓN SUPREMA DEL ÁRBOL DE MÓDULOS
 *
 * # Mathematical Proof (Modular Encapsulation):
 * Al declarar 'pub mod' aquí, Rust genera un grafo de visibilidad
 * donde 'state', 'services' y 'handlers' son hermanos bajo el mismo
 * tronco 'crate', habilitando la inyección de dependencias en
 * tiempo de compilación.
 * =================================================================
 */

// --- ESTRATO DE SOPORTE Y ARRANQUE ---
/// Fuente única de tiempo inyectable.
pub mod clock;
/// Adquisición soberana de parámetros de proceso.
pub mod config;
/// Núcleo de mando para la ignición de servicios.
pub mod kernel;

// --- ESTRATO DE DATOS Y ESTADO (L1-APP) ---
/// Gestor del sistema nervioso central del plano de control.
pub mod state;

// --- ESTRATO DE TRANSPORTE Y ACCIÓN ---
/// Adaptadores de entrada para ráfagas HTTP y WebSockets.
pub mod handlers;
/// El túnel de mando: definición de rutas y topología de red.
pub mod routes;
/// Daemons de fondo, despacho, ingesta y recuperación.
pub mod services;

/**
 * PRELUDIO DEL PLANO DE CONTROL
 *
 * Re-exportación estratégica de los componentes necesarios para la
 * ignición mínima del sistema. Reduce el acoplamiento en 'main.rs'.
 */
pub mod prelude {
    pub use crate::clock::{FrozenClock, SharedClock, SystemClock, WallClock};
    pub use crate::config::ControlPlaneConfig;
    pub use crate::kernel::ControlPlaneKernel;
    pub use crate::state::AppState;
}
