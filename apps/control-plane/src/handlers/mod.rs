// [apps/control-plane/src/handlers/mod.rs]
//! =================================================================
//! APARATO: API HANDLER REGISTRY (V7.0)
//! CLASIFICACIÓN: API ADAPTER LAYER (ESTRATO L4)
//! RESPONSABILIDAD: ADAPTADORES DE ENTRADA HTTP Y WEBSOCKET
//! =================================================================

pub mod agent_link;
pub mod events_link;
pub mod files;
pub mod ops;
