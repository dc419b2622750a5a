// [apps/control-plane/src/services/mod.rs]
/*!
 * =================================================================
 * APARATO: SERVICE LAYER REGISTRY (V11.0)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: REGISTRO ÚNICO DE SERVICIOS Y REINTENTO ACOTADO
 * =================================================================
 */

pub mod benchmark_registry;
pub mod command_router;
pub mod cracker_probe;
pub mod dispatch;
pub mod event_bus;
pub mod hashlist_sync;
pub mod ignition;
pub mod potfile;
pub mod reconciler;
pub mod recovery;
pub mod resource_intake;
pub mod signal_bus;

pub use benchmark_registry::{BenchmarkRegistryService, SpeedResolution};
pub use command_router::{CommandRouter, ControlCommand};
pub use dispatch::{DispatchFault, DispatchService, Dispatcher};
pub use event_bus::EventBus;
pub use hashlist_sync::{HashlistSyncService, SyncGateVerdict};
pub use reconciler::ReconcilerService;
pub use recovery::{quarantine_agent_link, RecoveryService};
pub use resource_intake::{fingerprint_file, FileFingerprint, ResourceIntakeService};
pub use signal_bus::{ReconcileSignal, SignalBus};

use kraken_infra_db::DbError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Intentos totales ante I/O transitorio.
const TRANSIENT_RETRY_BUDGET: u32 = 3;

/// Un fallo es transitorio cuando reintentar puede sanarlo.
fn is_transient_fault(fault: &DbError) -> bool {
    matches!(fault, DbError::ConnectionError(_) | DbError::QueryError(_))
}

/**
 * Reintento local acotado con jitter (100..500 ms) para operaciones
 * de I/O transitorio. Jamás reintenta fallos semánticos: esos deben
 * propagar su transición de estado.
 */
pub async fn with_bounded_retry<ResultValue, OperationFactory, OperationFuture>(
    operation_label: &str,
    mut operation: OperationFactory,
) -> Result<ResultValue, DbError>
where
    OperationFactory: FnMut() -> OperationFuture,
    OperationFuture: Future<Output = Result<ResultValue, DbError>>,
{
    let mut last_fault: Option<DbError> = None;

    for attempt_ordinal in 1..=TRANSIENT_RETRY_BUDGET {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(fault) if is_transient_fault(&fault) && attempt_ordinal < TRANSIENT_RETRY_BUDGET => {
                let jitter_milliseconds = rand::thread_rng().gen_range(100..=500);
                warn!(
                    "🔁 [TRANSIENT_RETRY]: '{}' attempt {}/{} failed: {}. Backing off {}ms.",
                    operation_label, attempt_ordinal, TRANSIENT_RETRY_BUDGET, fault, jitter_milliseconds
                );
                tokio::time::sleep(Duration::from_millis(jitter_milliseconds)).await;
                last_fault = Some(fault);
            }
            Err(fault) => return Err(fault),
        }
    }

    Err(last_fault.unwrap_or(DbError::TransactionError))
}
