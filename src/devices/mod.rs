// devices/mod.rs
mod engine;
mod queue;
mod state;

pub use engine::{Freshness, Outcome, ReconciliationEngine};
pub use queue::DeviceHandle;
pub use state::{DeviceSnapshot, DeviceState, LocalState, RemoteState, SyncStates};
