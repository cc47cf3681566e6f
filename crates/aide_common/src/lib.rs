//! Aide Common - shared wire types for the aide daemon and CLI.
//!
//! Everything that crosses a process boundary (HTTP bodies, the monitor
//! log, dispatch results) is defined here so both sides agree on one format.

pub mod action;
pub mod api;
pub mod envelope;
pub mod error;
pub mod memory;
pub mod snapshot;

pub use action::{stringify_params, ActionDescriptor, ActionKind, Provider, ACTION_SET_VERSION};
pub use api::{ChatRequest, ExecuteRequest, HealthResponse, HistoryResponse, MonitorStartRequest, MonitorState, MonitorStatus, TurnReply};
pub use envelope::{ErrorKind, ResultEnvelope};
pub use error::AideError;
pub use memory::{MemoryEntry, Role};
pub use snapshot::{ActiveWindow, HostInfo, MonitorSnapshot, NetworkCounters, ResourceUsage};

/// Version string shared by daemon and CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default daemon address
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
