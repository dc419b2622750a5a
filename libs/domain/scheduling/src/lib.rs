// [libs/domain/scheduling/src/lib.rs]
/*!
 * =================================================================
 * APARATO: SCHEDULING CALCULUS LIBRARY ROOT (V5.0)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: MATEMÁTICA PURA DE KEYSPACE Y FRAGMENTACIÓN
 *
 * # Logic:
 * Esta crate no toca red ni disco. Recibe conteos ya resueltos y
 * devuelve veredictos deterministas: el plano de control es quien
 * hidrata los recursos y persiste las decisiones.
 * =================================================================
 */

pub mod chunking;
pub mod errors;
pub mod keyspace;
pub mod mask;

pub use chunking::{plan_next_chunk, ChunkPlan, ChunkPolicy, JobFrontier};
pub use errors::SchedulingError;
pub use keyspace::{compute_keyspace, AttackResources, KeyspaceVerdict, RuleSplitPolicy};
pub use mask::mask_keyspace;
