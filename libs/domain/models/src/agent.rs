// [libs/domain/models/src/agent.rs]
/*!
 * =================================================================
 * APARATO: AGENT DOMAIN MODELS (V11.0 - PRODUCTION MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: CONTRATO SOBERANO DE NODOS DE CÓMPUTO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. SCHEDULE AWARENESS: Ventanas semanales de operación evaluadas
 *    con el reloj inyectado del plano de control.
 * 2. SILICON EVIDENCE: El perfil de dispositivos transporta la
 *    clase de rendimiento reportada en el handshake.
 * =================================================================
 */

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use typeshare::typeshare;
use uuid::Uuid;

/// Estados administrativos de un agente registrado.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AgentStatus {
    Pending,
    Active,
    Inactive,
    Error,
    Disabled,
}

impl AgentStatus {
    pub fn as_label(&self) -> &'static str {
        match self {
            AgentStatus::Pending => "pending",
            AgentStatus::Active => "active",
            AgentStatus::Inactive => "inactive",
            AgentStatus::Error => "error",
            AgentStatus::Disabled => "disabled",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "pending" => Some(AgentStatus::Pending),
            "active" => Some(AgentStatus::Active),
            "inactive" => Some(AgentStatus::Inactive),
            "error" => Some(AgentStatus::Error),
            "disabled" => Some(AgentStatus::Disabled),
            _ => None,
        }
    }
}

/// Dispositivo de cómputo (GPU/CPU) declarado por el agente.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceProfile {
    #[typeshare(serialized_as = "number")]
    pub index: i64,
    pub name: String,
    /// Clase de rendimiento declarada (ej: "gpu-high", "cpu").
    pub class: String,
    pub enabled: bool,
}

/// Ventana semanal de operación autorizada, en minutos desde medianoche UTC.
#[typeshare]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeeklyWindow {
    /// Día ISO de la semana (1 = lunes ... 7 = domingo).
    #[typeshare(serialized_as = "number")]
    pub iso_weekday: u32,
    #[typeshare(serialized_as = "number")]
    pub start_minute: u32,
    #[typeshare(serialized_as = "number")]
    pub end_minute: u32,
}

impl WeeklyWindow {
    fn contains(&self, weekday: Weekday, minute_of_day: u32) -> bool {
        self.iso_weekday == weekday.number_from_monday()
            && minute_of_day >= self.start_minute
            && minute_of_day < self.end_minute
    }
}

/// Nodo de cómputo registrado en el plano de control.
#[typeshare]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    #[typeshare(serialized_as = "number")]
    pub id: i64,
    pub name: String,
    pub status: AgentStatus,
    #[typeshare(serialized_as = "String")]
    pub owner_id: Option<Uuid>,
    pub devices: Vec<DeviceProfile>,
    /// Ventanas de operación. Vacío significa disponibilidad permanente.
    pub schedule: Vec<WeeklyWindow>,
    #[typeshare(serialized_as = "String")]
    pub last_heartbeat: Option<DateTime<Utc>>,
    #[typeshare(serialized_as = "number")]
    pub consecutive_failures: i64,
}

impl Agent {
    /// Evalúa si el agente está dentro de su horario autorizado.
    pub fn is_within_schedule(&self, now: DateTime<Utc>) -> bool {
        if self.schedule.is_empty() {
            return true;
        }
        let minute_of_day = now.hour() * 60 + now.minute();
        self.schedule
            .iter()
            .any(|window| window.contains(now.weekday(), minute_of_day))
    }

    /// Un agente es elegible para despacho solo en estado activo y con
    /// al menos un dispositivo habilitado.
    pub fn is_dispatch_eligible(&self, now: DateTime<Utc>) -> bool {
        self.status == AgentStatus::Active
            && self.is_within_schedule(now)
            && self.devices.iter().any(|device| device.enabled)
    }
}
