// [tests/mirror/libs/domain/scheduling/chunk_planner.test.rs]
/*!
 * =================================================================
 * APARATO: CERTIFICADOR DEL PLANIFICADOR DE CHUNKS (V5.0 - ZENITH)
 * CLASIFICACIÓN: TRINITY EVIDENCE // ESTRATO L2-MIRROR
 * RESPONSABILIDAD: AUDITORÍA DE DIMENSIONADO, CLAMPS Y PARTICIÓN
 *
 * # Mathematical Proof (Partition Integrity):
 * Avanzando la frontera con cada plan emitido, la secuencia de
 * chunks debe particionar exactamente el keyspace (o la dimensión de
 * reglas) sin solapes ni huecos, terminando con 'completes_dispatch'.
 * =================================================================
 */

use kraken_domain_scheduling::{plan_next_chunk, ChunkPolicy, JobFrontier};
use proptest::prelude::*;

fn frontier(base: i64, factor: i64, splits_rules: bool) -> JobFrontier {
    JobFrontier {
        base_keyspace: base,
        multiplication_factor: factor,
        uses_rule_splitting: splits_rules,
        next_base_offset: 0,
        next_rule_offset: 0,
    }
}

#[test]
fn certify_single_chunk_clamped_to_small_wordlist() {
    println!("\n🧪 [PROVING_GROUNDS]: Validating clamp-to-remaining strata...");

    // Diccionario de un millón de líneas, velocidad 1M H/s, 300s:
    // el dimensionado ideal (300M) se recorta al keyspace íntegro.
    let plan = plan_next_chunk(
        &frontier(1_000_000, 1, false),
        1_000_000,
        300,
        &ChunkPolicy::default(),
    )
    .expect("CRITICAL_FAULT: Planner refused a dispatchable frontier.");

    assert_eq!(plan.keyspace_start, 0);
    assert_eq!(plan.keyspace_end, 1_000_000);
    assert_eq!(plan.rule_start_index, None);
    assert!(plan.completes_dispatch, "A full-coverage chunk must seal dispatch.");
    assert_eq!(plan.effective_size(1_000_000, 1), 1_000_000);

    println!("   ✅ [SUCCESS]: Clamp strata certified.");
}

#[test]
fn certify_multiplier_shrinks_base_slice() {
    // Con 50 reglas aplicadas enteras, el slice base se divide por el factor.
    let plan = plan_next_chunk(
        &frontier(10_000_000, 50, false),
        1_000_000,
        300,
        &ChunkPolicy::default(),
    )
    .expect("CRITICAL_FAULT: Planner refused the multiplied frontier.");

    // round(1e6 × 300 / 50) = 6_000_000 unidades base.
    assert_eq!(plan.keyspace_end - plan.keyspace_start, 6_000_000);
    assert_eq!(plan.effective_size(10_000_000, 50), 300_000_000);
    assert!(!plan.completes_dispatch);
}

#[test]
fn certify_rule_dimension_slicing_sequence() {
    // Base 100k, factor 10k, velocidad 5M H/s, 60s:
    // round(3e8 / 1e5) = 3000 reglas por slice.
    let mut walking_frontier = frontier(100_000, 10_000, true);
    let mut covered_rule_ranges = Vec::new();

    loop {
        let plan = match plan_next_chunk(
            &walking_frontier,
            5_000_000,
            60,
            &ChunkPolicy::default(),
        ) {
            Some(plan) => plan,
            None => break,
        };

        let rule_start = plan.rule_start_index.expect("Rule slice lost its start.");
        let rule_end = plan.rule_end_index.expect("Rule slice lost its end.");
        assert_eq!(plan.keyspace_start, 0, "Rule slices traverse the full base.");
        assert_eq!(plan.keyspace_end, 100_000);

        covered_rule_ranges.push((rule_start, rule_end));
        walking_frontier.next_rule_offset += plan.rule_offset_advance();

        if plan.completes_dispatch {
            break;
        }
    }

    assert_eq!(
        covered_rule_ranges,
        vec![(0, 2_999), (3_000, 5_999), (6_000, 8_999), (9_000, 9_999)],
        "The rule dimension must be covered exactly once."
    );
}

#[test]
fn certify_final_small_chunk_is_emitted() {
    // Restan 3 unidades con mínimo 100: el planificador emite el
    // último chunk pequeño en lugar de dejar al agente ocioso.
    let mut tail_frontier = frontier(1_000, 1, false);
    tail_frontier.next_base_offset = 997;

    let plan = plan_next_chunk(
        &tail_frontier,
        10,
        1,
        &ChunkPolicy { min_chunk_size: 100 },
    )
    .expect("CRITICAL_FAULT: Tail chunk refused.");

    assert_eq!(plan.keyspace_start, 997);
    assert_eq!(plan.keyspace_end, 1_000);
    assert!(plan.completes_dispatch);
}

#[test]
fn certify_exhausted_frontier_yields_nothing() {
    let mut exhausted = frontier(1_000, 1, false);
    exhausted.next_base_offset = 1_000;
    assert!(plan_next_chunk(&exhausted, 1_000, 60, &ChunkPolicy::default()).is_none());

    let mut exhausted_rules = frontier(1_000, 500, true);
    exhausted_rules.next_rule_offset = 500;
    assert!(plan_next_chunk(&exhausted_rules, 1_000, 60, &ChunkPolicy::default()).is_none());
}

proptest! {
    /**
     * PROPIEDAD: La secuencia de planes particiona [0, base) sin
     * solapes ni huecos para cualquier combinación de magnitudes.
     */
    #[test]
    fn certify_base_partition_property(
        base in 1i64..50_000,
        factor in 1i64..64,
        speed in 1i64..10_000_000,
        duration in 1i64..900,
    ) {
        let mut walking_frontier = frontier(base, factor, false);
        let mut expected_next_start = 0i64;
        let mut emitted_plans = 0u32;

        loop {
            let plan = match plan_next_chunk(
                &walking_frontier,
                speed,
                duration,
                &ChunkPolicy::default(),
            ) {
                Some(plan) => plan,
                None => break,
            };

            prop_assert_eq!(plan.keyspace_start, expected_next_start);
            prop_assert!(plan.keyspace_end > plan.keyspace_start);
            prop_assert!(plan.keyspace_end <= base);

            expected_next_start = plan.keyspace_end;
            walking_frontier.next_base_offset += plan.base_offset_advance();
            emitted_plans += 1;

            if plan.completes_dispatch {
                prop_assert_eq!(plan.keyspace_end, base);
                break;
            }
            // Cota de seguridad contra no-terminación.
            prop_assert!(emitted_plans < 100_000);
        }

        prop_assert_eq!(expected_next_start, base);
    }
}
