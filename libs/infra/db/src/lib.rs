// [libs/infra/db/src/lib.rs]
/*!
 * =================================================================
 * APARATO: TACTICAL LEDGER LIBRARY ROOT (V8.0)
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: EXPOSICIÓN SOBERANA DEL ADAPTADOR DE PERSISTENCIA
 * =================================================================
 */

pub mod client;
pub mod errors;
pub mod repositories;
pub mod schema;

pub use client::LedgerClient;
pub use errors::DbError;
