// [tests/mirror/libs/domain/scheduling/keyspace_calculus.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL CALCULADOR DE KEYSPACE (V4.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE FÓRMULAS Y PREDICADO DE RULE-SPLIT
 *
 * # Mathematical Proof (Formula Parity):
 * Cada modo de ataque posee una fórmula cerrada de keyspace. El test
 * certifica las fórmulas, la gramática de composición y el predicado
 * exacto de fragmentación por dimensión de reglas.
 * =================================================================
 */

use kraken_domain_models::AttackMode;
use kraken_domain_scheduling::{
    compute_keyspace, mask_keyspace, AttackResources, RuleSplitPolicy, SchedulingError,
};

fn resources(
    wordlist_line_counts: Vec<i64>,
    rule_counts: Vec<i64>,
    mask: Option<&str>,
) -> AttackResources {
    AttackResources {
        wordlist_line_counts,
        rule_counts,
        mask: mask.map(str::to_string),
    }
}

#[test]
fn certify_straight_mode_without_rules() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating Straight formula strata...");

    let verdict = compute_keyspace(
        AttackMode::Straight,
        &resources(vec![1_000_000], vec![], None),
        &RuleSplitPolicy::default(),
    )
    .expect("CRITICAL_FAULT: Straight composition rejected.");

    assert_eq!(verdict.base_keyspace, 1_000_000);
    assert_eq!(verdict.multiplication_factor, 1);
    assert_eq!(verdict.effective_keyspace, 1_000_000);
    assert!(!verdict.uses_rule_splitting, "No rules must never split.");

    println!("   ✅ [SUCCESS]: Straight strata certified.");
}

#[test]
fn certify_rule_splitting_predicate() {
    // Cuatro archivos de 10 reglas: factor 10.000 sobre base 100.000.
    let verdict = compute_keyspace(
        AttackMode::Straight,
        &resources(vec![100_000], vec![10, 10, 10, 10], None),
        &RuleSplitPolicy::default(),
    )
    .expect("CRITICAL_FAULT: Rule composition rejected.");

    assert_eq!(verdict.base_keyspace, 100_000);
    assert_eq!(verdict.multiplication_factor, 10_000);
    assert_eq!(verdict.effective_keyspace, 1_000_000_000);
    assert!(
        verdict.uses_rule_splitting,
        "Factor 10_000 > 100 with small base must split the rule dimension."
    );

    // Factor bajo el umbral: sin fragmentación.
    let below_threshold = compute_keyspace(
        AttackMode::Straight,
        &resources(vec![100_000], vec![50], None),
        &RuleSplitPolicy::default(),
    )
    .expect("CRITICAL_FAULT: 50-rule composition rejected.");
    assert_eq!(below_threshold.multiplication_factor, 50);
    assert!(!below_threshold.uses_rule_splitting);

    // Base masiva: la fragmentación se desactiva aunque el factor supere el umbral.
    let massive_base = compute_keyspace(
        AttackMode::Straight,
        &resources(vec![2_000_000_000], vec![200], None),
        &RuleSplitPolicy::default(),
    )
    .expect("CRITICAL_FAULT: Massive-base composition rejected.");
    assert!(!massive_base.uses_rule_splitting);
}

#[test]
fn certify_combination_and_hybrid_formulas() {
    let combination = compute_keyspace(
        AttackMode::Combination,
        &resources(vec![1_000, 2_000], vec![], None),
        &RuleSplitPolicy::default(),
    )
    .expect("CRITICAL_FAULT: Combination composition rejected.");
    assert_eq!(combination.base_keyspace, 2_000_000);
    assert_eq!(combination.multiplication_factor, 1);

    let hybrid = compute_keyspace(
        AttackMode::HybridWordlistMask,
        &resources(vec![5_000], vec![], Some("?d?d")),
        &RuleSplitPolicy::default(),
    )
    .expect("CRITICAL_FAULT: Hybrid composition rejected.");
    assert_eq!(hybrid.base_keyspace, 500_000);
    assert!(!hybrid.uses_rule_splitting, "Hybrid modes never split rules.");
}

#[test]
fn certify_brute_force_mask_cardinalities() {
    assert_eq!(mask_keyspace("?d?d?d").unwrap(), 1_000);
    assert_eq!(mask_keyspace("?l?u").unwrap(), 26 * 26);
    assert_eq!(mask_keyspace("?s").unwrap(), 33);
    assert_eq!(mask_keyspace("?a").unwrap(), 95);
    assert_eq!(mask_keyspace("?b").unwrap(), 256);
    // Literales aportan cardinalidad 1; '??' es el literal '?'.
    assert_eq!(mask_keyspace("pass?d").unwrap(), 10);
    assert_eq!(mask_keyspace("??" ).unwrap(), 1);

    let brute = compute_keyspace(
        AttackMode::BruteForce,
        &resources(vec![], vec![], Some("?l?l?d")),
        &RuleSplitPolicy::default(),
    )
    .expect("CRITICAL_FAULT: BruteForce composition rejected.");
    assert_eq!(brute.base_keyspace, 26 * 26 * 10);
}

#[test]
fn certify_illegal_compositions_are_vetoed() {
    // Straight exige exactamente un diccionario.
    let wordlist_arity = compute_keyspace(
        AttackMode::Straight,
        &resources(vec![1_000, 2_000], vec![], None),
        &RuleSplitPolicy::default(),
    );
    assert!(matches!(
        wordlist_arity,
        Err(SchedulingError::InvalidComposition(_))
    ));

    // Combination no admite reglas.
    let rules_on_combination = compute_keyspace(
        AttackMode::Combination,
        &resources(vec![1_000, 2_000], vec![10], None),
        &RuleSplitPolicy::default(),
    );
    assert!(matches!(
        rules_on_combination,
        Err(SchedulingError::InvalidComposition(_))
    ));

    // BruteForce exige máscara.
    let missing_mask = compute_keyspace(
        AttackMode::BruteForce,
        &resources(vec![], vec![], None),
        &RuleSplitPolicy::default(),
    );
    assert!(matches!(
        missing_mask,
        Err(SchedulingError::InvalidComposition(_))
    ));

    // Straight no admite máscara.
    let mask_on_straight = compute_keyspace(
        AttackMode::Straight,
        &resources(vec![1_000], vec![], Some("?d")),
        &RuleSplitPolicy::default(),
    );
    assert!(matches!(
        mask_on_straight,
        Err(SchedulingError::InvalidComposition(_))
    ));
}

#[test]
fn certify_degenerate_magnitudes_are_vetoed() {
    // Diccionario vacío: keyspace nulo.
    let empty_wordlist = compute_keyspace(
        AttackMode::Straight,
        &resources(vec![0], vec![], None),
        &RuleSplitPolicy::default(),
    );
    assert!(matches!(empty_wordlist, Err(SchedulingError::ZeroKeyspace(_))));

    // Máscara huérfana.
    assert!(matches!(
        mask_keyspace("?d?"),
        Err(SchedulingError::MaskSyntax { .. })
    ));
    assert!(matches!(
        mask_keyspace("?x"),
        Err(SchedulingError::MaskSyntax { .. })
    ));

    // Desborde de 64 bits: ?b elevado a la décima potencia.
    assert!(matches!(
        mask_keyspace("?b?b?b?b?b?b?b?b?b?b"),
        Err(SchedulingError::KeyspaceOverflow)
    ));
}
