// [libs/domain/scheduling/src/mask.rs]
/*!
 * =================================================================
 * APARATO: MASK KEYSPACE CALCULATOR (V6.0 - PRODUCTION MASTER)
 * CLASIFICACIÓN: DOMAIN LOGIC (ESTRATO L2)
 * RESPONSABILIDAD: CARDINALIDAD EXACTA DE MÁSCARAS DE FUERZA BRUTA
 *
 * # Mathematical Proof (Mask Cardinality):
 * El keyspace de una máscara es el producto de la cardinalidad de
 * cada posición: ?l=26, ?u=26, ?d=10, ?s=33, ?a=95, ?b=256 y todo
 * literal aporta exactamente 1. La secuencia '??' denota el literal
 * '?'. El producto se evalúa en 128 bits y se rechaza cualquier
 * magnitud que no quepa en el entero de 64 bits del Ledger.
 * =================================================================
 */

use crate::errors::SchedulingError;

/// Cardinalidad de una clase de caracteres del motor de cracking.
fn charset_cardinality(class_token: char) -> Option<u128> {
    match class_token {
        'l' => Some(26),
        'u' => Some(26),
        'd' => Some(10),
        's' => Some(33),
        'a' => Some(95),
        'b' => Some(256),
        _ => None,
    }
}

/// Calcula el keyspace exacto de una máscara de fuerza bruta.
///
/// # Errors:
/// - `MaskSyntax` ante un token '?' huérfano o una clase desconocida.
/// - `ZeroKeyspace` ante una máscara vacía.
/// - `KeyspaceOverflow` si la magnitud desborda 64 bits.
pub fn mask_keyspace(mask: &str) -> Result<i64, SchedulingError> {
    if mask.is_empty() {
        return Err(SchedulingError::ZeroKeyspace("empty mask".into()));
    }

    let mut accumulated_cardinality: u128 = 1;
    let mut character_stream = mask.char_indices().peekable();

    while let Some((position, current_character)) = character_stream.next() {
        let position_cardinality: u128 = if current_character == '?' {
            match character_stream.next() {
                // '??' es el literal '?': cardinalidad 1.
                Some((_, '?')) => 1,
                Some((_, class_token)) => charset_cardinality(class_token).ok_or_else(|| {
                    SchedulingError::MaskSyntax {
                        position,
                        detail: format!("unknown character class '?{}'", class_token),
                    }
                })?,
                None => {
                    return Err(SchedulingError::MaskSyntax {
                        position,
                        detail: "dangling '?' at end of mask".into(),
                    });
                }
            }
        } else {
            1
        };

        accumulated_cardinality = accumulated_cardinality
            .checked_mul(position_cardinality)
            .ok_or(SchedulingError::KeyspaceOverflow)?;

        if accumulated_cardinality > i64::MAX as u128 {
            return Err(SchedulingError::KeyspaceOverflow);
        }
    }

    Ok(accumulated_cardinality as i64)
}
