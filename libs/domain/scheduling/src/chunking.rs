// [libs/domain/scheduling/src/chunking.rs]
/*!
 * =================================================================
 * APARATO: CHUNK PLANNER ENGINE (V11.0 - PRODUCTION MASTER)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: DIMENSIONADO DETERMINISTA DEL PRÓXIMO CHUNK
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. PURE PLANNING: El planificador solo lee una instantánea de la
 *    frontera del trabajo. La mutación atómica de la frontera vive
 *    en el Ledger bajo un UPDATE condicional por fila de trabajo.
 * 2. DUAL DIMENSION: Fragmenta el keyspace base o la dimensión de
 *    reglas según el veredicto del calculador.
 *
 * # Mathematical Proof (Chunk Sizing):
 * Sin rule-splitting el tamaño del slice base es
 * clamp(round(velocidad × duración / factor), mínimo, restante).
 * Con rule-splitting el número de reglas por slice es
 * clamp(round(velocidad × duración / base), 1, reglas_restantes),
 * de modo que el volumen efectivo cubierto aproxima en ambos casos
 * velocidad × duración.
 * =================================================================
 */

/// Instantánea de frontera de despacho de un trabajo.
#[derive(Debug, Clone, Copy)]
pub struct JobFrontier {
    pub base_keyspace: i64,
    pub multiplication_factor: i64,
    pub uses_rule_splitting: bool,
    /// Próxima posición no despachada del keyspace base.
    pub next_base_offset: i64,
    /// Próximo índice de regla no despachado.
    pub next_rule_offset: i64,
}

/// Política de dimensionado mínimo de chunks.
#[derive(Debug, Clone, Copy)]
pub struct ChunkPolicy {
    pub min_chunk_size: i64,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self { min_chunk_size: 1 }
    }
}

/// Plan concreto del próximo chunk a despachar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    /// Intervalo semiabierto sobre el keyspace base.
    pub keyspace_start: i64,
    pub keyspace_end: i64,
    /// Rango inclusivo de reglas bajo rule-splitting.
    pub rule_start_index: Option<i64>,
    pub rule_end_index: Option<i64>,
    /// Este plan agota el keyspace pendiente del trabajo.
    pub completes_dispatch: bool,
}

impl ChunkPlan {
    /// Volumen efectivo que cubre el plan dado el contexto del trabajo.
    pub fn effective_size(&self, base_keyspace: i64, multiplication_factor: i64) -> i64 {
        match (self.rule_start_index, self.rule_end_index) {
            (Some(rule_start), Some(rule_end)) => {
                base_keyspace.saturating_mul(rule_end - rule_start + 1)
            }
            _ => (self.keyspace_end - self.keyspace_start).saturating_mul(multiplication_factor),
        }
    }

    /// Avance de frontera base que induce el plan.
    pub fn base_offset_advance(&self) -> i64 {
        if self.rule_start_index.is_some() {
            0
        } else {
            self.keyspace_end - self.keyspace_start
        }
    }

    /// Avance de frontera de reglas que induce el plan.
    pub fn rule_offset_advance(&self) -> i64 {
        match (self.rule_start_index, self.rule_end_index) {
            (Some(rule_start), Some(rule_end)) => rule_end - rule_start + 1,
            _ => 0,
        }
    }
}

/// Dimensiona el próximo chunk contiguo para un agente.
///
/// Devuelve `None` cuando la frontera del trabajo ya no tiene
/// keyspace pendiente. Si el restante es menor que el mínimo pero
/// positivo, emite ese último chunk pequeño en lugar de dejar al
/// agente ocioso.
pub fn plan_next_chunk(
    frontier: &JobFrontier,
    speed_hashes_per_second: i64,
    chunk_duration_seconds: i64,
    policy: &ChunkPolicy,
) -> Option<ChunkPlan> {
    let target_effective_volume =
        (speed_hashes_per_second.max(1) as u128) * (chunk_duration_seconds.max(1) as u128);

    if frontier.uses_rule_splitting {
        plan_rule_slice(frontier, target_effective_volume)
    } else {
        plan_base_slice(frontier, target_effective_volume, policy)
    }
}

fn plan_base_slice(
    frontier: &JobFrontier,
    target_effective_volume: u128,
    policy: &ChunkPolicy,
) -> Option<ChunkPlan> {
    let remaining = frontier.base_keyspace - frontier.next_base_offset;
    if remaining <= 0 {
        return None;
    }

    let multiplier = frontier.multiplication_factor.max(1) as u128;
    let ideal_size = rounded_division(target_effective_volume, multiplier);
    let clamped_size = clamp_to_i64(ideal_size)
        .max(policy.min_chunk_size.max(1))
        .min(remaining);

    let keyspace_start = frontier.next_base_offset;
    let keyspace_end = keyspace_start + clamped_size;

    Some(ChunkPlan {
        keyspace_start,
        keyspace_end,
        rule_start_index: None,
        rule_end_index: None,
        completes_dispatch: keyspace_end >= frontier.base_keyspace,
    })
}

fn plan_rule_slice(frontier: &JobFrontier, target_effective_volume: u128) -> Option<ChunkPlan> {
    let remaining_rules = frontier.multiplication_factor - frontier.next_rule_offset;
    if remaining_rules <= 0 {
        return None;
    }

    let base = frontier.base_keyspace.max(1) as u128;
    let ideal_rule_count = rounded_division(target_effective_volume, base);
    let clamped_rule_count = clamp_to_i64(ideal_rule_count).max(1).min(remaining_rules);

    let rule_start_index = frontier.next_rule_offset;
    let rule_end_index = rule_start_index + clamped_rule_count - 1;

    Some(ChunkPlan {
        // Cada slice de reglas recorre el keyspace base completo.
        keyspace_start: 0,
        keyspace_end: frontier.base_keyspace,
        rule_start_index: Some(rule_start_index),
        rule_end_index: Some(rule_end_index),
        completes_dispatch: rule_end_index + 1 >= frontier.multiplication_factor,
    })
}

fn rounded_division(numerator: u128, denominator: u128) -> u128 {
    (numerator + denominator / 2) / denominator
}

fn clamp_to_i64(magnitude: u128) -> i64 {
    if magnitude > i64::MAX as u128 {
        i64::MAX
    } else {
        magnitude as i64
    }
}
