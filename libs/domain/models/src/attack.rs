// [libs/domain/models/src/attack.rs]
/*!
 * =================================================================
 * APARATO: ATTACK MODE TAXONOMY (V3.2 - PRODUCTION MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CLASIFICACIÓN SOBERANA DE MODOS DE ATAQUE
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. TYPESHARE SYNERGY: Mapeo determinista hacia el Frontend para
 *    garantizar paridad de discriminadores en la Tríada.
 * 2. NOMINAL PRECISION: Cada variante expone su número de modo
 *    canónico del motor de cracking y sus reglas de composición.
 *
 * # Mathematical Proof (Composition Legality):
 * Cada modo define una aridad exacta de diccionarios y la presencia
 * obligatoria u prohibida de máscara y reglas. El calculador de
 * keyspace rechaza cualquier combinación fuera de esta gramática.
 * =================================================================
 */

use serde::{Deserialize, Serialize};
use typeshare::typeshare;

/// Familia de generación de candidatos soportada por el plano de control.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AttackMode {
    /// Diccionario lineal con reglas de mutación opcionales.
    Straight,
    /// Producto cartesiano de dos diccionarios.
    Combination,
    /// Enumeración exhaustiva dirigida por máscara.
    BruteForce,
    /// Diccionario seguido de máscara (sufijo generado).
    HybridWordlistMask,
    /// Máscara seguida de diccionario (prefijo generado).
    HybridMaskWordlist,
}

impl AttackMode {
    /// Número de modo canónico del binario de cracking.
    pub fn cracker_mode_number(&self) -> i64 {
        match self {
            AttackMode::Straight => 0,
            AttackMode::Combination => 1,
            AttackMode::BruteForce => 3,
            AttackMode::HybridWordlistMask => 6,
            AttackMode::HybridMaskWordlist => 7,
        }
    }

    /// Aridad exacta de diccionarios que exige la composición.
    pub fn expected_wordlist_count(&self) -> usize {
        match self {
            AttackMode::Straight => 1,
            AttackMode::Combination => 2,
            AttackMode::BruteForce => 0,
            AttackMode::HybridWordlistMask | AttackMode::HybridMaskWordlist => 1,
        }
    }

    /// Indica si la máscara es obligatoria para este modo.
    pub fn requires_mask(&self) -> bool {
        matches!(
            self,
            AttackMode::BruteForce | AttackMode::HybridWordlistMask | AttackMode::HybridMaskWordlist
        )
    }

    /// Indica si el modo admite archivos de reglas de mutación.
    pub fn allows_rules(&self) -> bool {
        matches!(self, AttackMode::Straight)
    }

    /// Etiqueta estable para persistencia en el Ledger Táctico.
    pub fn as_label(&self) -> &'static str {
        match self {
            AttackMode::Straight => "Straight",
            AttackMode::Combination => "Combination",
            AttackMode::BruteForce => "BruteForce",
            AttackMode::HybridWordlistMask => "HybridWordlistMask",
            AttackMode::HybridMaskWordlist => "HybridMaskWordlist",
        }
    }

    /// Reconstruye la variante desde su etiqueta persistida.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Straight" => Some(AttackMode::Straight),
            "Combination" => Some(AttackMode::Combination),
            "BruteForce" => Some(AttackMode::BruteForce),
            "HybridWordlistMask" => Some(AttackMode::HybridWordlistMask),
            "HybridMaskWordlist" => Some(AttackMode::HybridMaskWordlist),
            _ => None,
        }
    }
}
