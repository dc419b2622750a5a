// [apps/control-plane/src/clock.rs]
/*!
 * =================================================================
 * APARATO: INJECTABLE SYSTEM CLOCK (V3.0)
 * CLASIFICACIÓN: APPLICATION SUPPORT (ESTRATO L1-APP)
 * RESPONSABILIDAD: FUENTE ÚNICA DE TIEMPO PARA TODO EL PLANO DE CONTROL
 *
 * # Logic:
 * Todos los temporizadores del sistema (latidos, gracia de
 * reconexión, frescura de benchmarks, progreso estancado) leen el
 * tiempo de este reloj inyectado. El Proving Grounds congela y
 * avanza el reloj para certificar los temporizadores de forma
 * determinista, sin dormir hilos reales.
 * =================================================================
 */

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

/// Fuente de tiempo del plano de control.
pub trait SystemClock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type SharedClock = Arc<dyn SystemClock>;

/// Reloj de pared de producción.
pub struct WallClock;

impl SystemClock for WallClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Reloj congelado para el Proving Grounds: solo avanza por orden explícita.
pub struct FrozenClock {
    frozen_instant: Mutex<DateTime<Utc>>,
}

impl FrozenClock {
    pub fn starting_at(initial_instant: DateTime<Utc>) -> Self {
        Self {
            frozen_instant: Mutex::new(initial_instant),
        }
    }

    /// Avanza el tiempo congelado la magnitud indicada.
    pub fn advance(&self, delta: Duration) {
        let mut instant_guard = self.frozen_instant.lock().expect("FROZEN_CLOCK_POISONED");
        *instant_guard += delta;
    }
}

impl SystemClock for FrozenClock {
    fn now(&self) -> DateTime<Utc> {
        *self.frozen_instant.lock().expect("FROZEN_CLOCK_POISONED")
    }
}
