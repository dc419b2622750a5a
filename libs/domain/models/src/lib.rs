// [libs/domain/models/src/lib.rs]

pub mod agent;
pub mod attack;
pub mod benchmark;
pub mod hashlist;
pub mod job;
pub mod preset;
pub mod sync;
pub mod task;
pub mod telemetry;
pub mod wire;

pub use agent::{Agent, AgentStatus, DeviceProfile, WeeklyWindow};
pub use attack::AttackMode;
pub use benchmark::BenchmarkSample;
pub use hashlist::{CrackEntry, Hashlist, HashlistStatus};
pub use job::{JobExecution, JobExecutionStatus};
pub use preset::PresetJob;
pub use sync::{AgentHashlistSync, SyncStatus};
pub use task::{JobTask, TaskStatus};
pub use telemetry::{RealTimeEvent, SystemLog};
pub use wire::{
    AgentMessage, DeviceStatusReport, FileKind, ServerMessage, StopReason, TaskAssignment,
    TaskOutcome, WireEnvelope,
};
