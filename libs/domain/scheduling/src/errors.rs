// [libs/domain/scheduling/src/errors.rs]
/*!
 * =================================================================
 * APARATO: SCHEDULING ERROR CATALOG (V4.1 - SOBERANO)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: CATALOGACIÓN SEMÁNTICA DE FALLOS DE CÁLCULO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. PANOPTICON COMPLIANCE: Mensajes con prefijos de estrato para
 *    su renderizado cromático en la consola de operadores.
 * 2. ZERO ABBREVIATIONS: Nomenclatura nominal absoluta.
 * =================================================================
 */

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SchedulingError {
    /// La combinación de diccionarios/reglas/máscara viola la
    /// gramática del modo de ataque.
    #[error("[L2_CALC_FAULT]: ILLEGAL_ATTACK_COMPOSITION -> {0}")]
    InvalidComposition(String),

    /// Un recurso declarado produce un keyspace vacío.
    #[error("[L2_CALC_FAULT]: EMPTY_KEYSPACE -> {0}")]
    ZeroKeyspace(String),

    /// El producto base × factor desborda el entero de 64 bits del Ledger.
    #[error("[L2_CALC_FAULT]: KEYSPACE_MAGNITUDE_OVERFLOW")]
    KeyspaceOverflow,

    /// Sintaxis de máscara ilegal en la posición indicada.
    #[error("[L2_MASK_FAULT]: MALFORMED_MASK_TOKEN -> position {position}: {detail}")]
    MaskSyntax { position: usize, detail: String },

    /// Un archivo de reglas dinámico llegó sin conteo resuelto.
    #[error("[L2_CALC_FAULT]: UNRESOLVED_DYNAMIC_RULE -> rule {0}")]
    UnresolvedDynamicRule(i64),
}
