// [libs/domain/scheduling/src/keyspace.rs]
/*!
 * =================================================================
 * APARATO: KEYSPACE CALCULATOR (V9.0 - PRODUCTION MASTER)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: VEREDICTO SOBERANO DE KEYSPACE POR MODO DE ATAQUE
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. COMPOSITION GUARD: Rechaza en origen toda combinación ilegal
 *    de diccionarios, reglas y máscara antes de persistir nada.
 * 2. RULE-SPLIT PREDICATE: Decide de forma determinista cuándo un
 *    trabajo fragmenta la dimensión de reglas en lugar del keyspace
 *    base.
 *
 * # Mathematical Proof (Effective Keyspace):
 * Straight:    base = líneas(diccionario); factor = Π reglas_i.
 * Combination: base = líneas(d1) × líneas(d2); factor = 1.
 * BruteForce:  base = cardinalidad(máscara); factor = 1.
 * Hybrid*:     base = líneas(diccionario) × cardinalidad(máscara);
 *              factor = 1.
 * Siempre: efectivo = base × factor, evaluado en 128 bits.
 * =================================================================
 */

use crate::errors::SchedulingError;
use crate::mask::mask_keyspace;
use kraken_domain_models::AttackMode;

/// Conteos ya resueltos de los recursos de una plantilla.
///
/// El plano de control hidrata estas magnitudes desde el Ledger (y,
/// para reglas dinámicas, desde la sonda de keyspace del binario)
/// antes de invocar el cálculo.
#[derive(Debug, Clone)]
pub struct AttackResources {
    /// Líneas de cada diccionario, en orden posicional.
    pub wordlist_line_counts: Vec<i64>,
    /// Reglas de cada archivo de reglas, en orden de aplicación.
    pub rule_counts: Vec<i64>,
    pub mask: Option<String>,
}

/// Umbrales que gobiernan la fragmentación por dimensión de reglas.
#[derive(Debug, Clone, Copy)]
pub struct RuleSplitPolicy {
    /// Factor mínimo de reglas para habilitar la fragmentación.
    pub split_threshold: i64,
    /// Keyspace base a partir del cual la fragmentación se desactiva.
    pub min_base_exemption: i64,
}

impl Default for RuleSplitPolicy {
    fn default() -> Self {
        Self {
            split_threshold: 100,
            min_base_exemption: 1_000_000_000,
        }
    }
}

/// Veredicto completo del cálculo de keyspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyspaceVerdict {
    pub base_keyspace: i64,
    pub multiplication_factor: i64,
    pub effective_keyspace: i64,
    pub uses_rule_splitting: bool,
}

/// Calcula base, factor y keyspace efectivo para un modo de ataque.
///
/// # Errors:
/// - `InvalidComposition` si la aridad de recursos viola el modo.
/// - `ZeroKeyspace` si algún recurso declarado está vacío.
/// - `KeyspaceOverflow` si la magnitud desborda 64 bits.
pub fn compute_keyspace(
    attack_mode: AttackMode,
    resources: &AttackResources,
    policy: &RuleSplitPolicy,
) -> Result<KeyspaceVerdict, SchedulingError> {
    validate_composition(attack_mode, resources)?;

    let base_keyspace = match attack_mode {
        AttackMode::Straight => positive_count(resources.wordlist_line_counts[0], "wordlist")?,
        AttackMode::Combination => checked_i64_product(
            positive_count(resources.wordlist_line_counts[0], "left wordlist")?,
            positive_count(resources.wordlist_line_counts[1], "right wordlist")?,
        )?,
        AttackMode::BruteForce => mask_keyspace(resources.mask.as_deref().unwrap_or(""))?,
        AttackMode::HybridWordlistMask | AttackMode::HybridMaskWordlist => checked_i64_product(
            positive_count(resources.wordlist_line_counts[0], "wordlist")?,
            mask_keyspace(resources.mask.as_deref().unwrap_or(""))?,
        )?,
    };

    let multiplication_factor = match attack_mode {
        AttackMode::Straight => resources.rule_counts.iter().try_fold(1i64, |product, count| {
            let rule_count = positive_count(*count, "rule file")?;
            checked_i64_product(product, rule_count)
        })?,
        _ => 1,
    };

    let effective_keyspace = checked_i64_product(base_keyspace, multiplication_factor)?;

    let uses_rule_splitting = attack_mode == AttackMode::Straight
        && multiplication_factor > policy.split_threshold
        && base_keyspace < policy.min_base_exemption;

    Ok(KeyspaceVerdict {
        base_keyspace,
        multiplication_factor,
        effective_keyspace,
        uses_rule_splitting,
    })
}

/// Verifica la gramática de recursos del modo antes de calcular.
fn validate_composition(
    attack_mode: AttackMode,
    resources: &AttackResources,
) -> Result<(), SchedulingError> {
    let expected_wordlists = attack_mode.expected_wordlist_count();
    if resources.wordlist_line_counts.len() != expected_wordlists {
        return Err(SchedulingError::InvalidComposition(format!(
            "{} expects exactly {} wordlist(s), received {}",
            attack_mode.as_label(),
            expected_wordlists,
            resources.wordlist_line_counts.len()
        )));
    }

    if !attack_mode.allows_rules() && !resources.rule_counts.is_empty() {
        return Err(SchedulingError::InvalidComposition(format!(
            "{} does not admit rule files",
            attack_mode.as_label()
        )));
    }

    match (attack_mode.requires_mask(), &resources.mask) {
        (true, None) => Err(SchedulingError::InvalidComposition(format!(
            "{} requires a mask",
            attack_mode.as_label()
        ))),
        (false, Some(_)) => Err(SchedulingError::InvalidComposition(format!(
            "{} does not admit a mask",
            attack_mode.as_label()
        ))),
        _ => Ok(()),
    }
}

fn positive_count(magnitude: i64, resource_label: &str) -> Result<i64, SchedulingError> {
    if magnitude <= 0 {
        return Err(SchedulingError::ZeroKeyspace(format!(
            "{} declares {} entries",
            resource_label, magnitude
        )));
    }
    Ok(magnitude)
}

fn checked_i64_product(left: i64, right: i64) -> Result<i64, SchedulingError> {
    let wide_product = (left as u128)
        .checked_mul(right as u128)
        .ok_or(SchedulingError::KeyspaceOverflow)?;
    if wide_product > i64::MAX as u128 {
        return Err(SchedulingError::KeyspaceOverflow);
    }
    Ok(wide_product as i64)
}
