//! DOM Observation & Action Layer, plus the Debugger Channel and Tab Registry
//! that carry commands to a real browser (§4.1-4.3, §6).

pub mod actions;
pub mod backend;
pub mod channel;
pub mod formatter;
pub mod inject;
pub mod snapshot;
pub mod tabs;

pub use backend::{ChromiumBackend, MockBackend};
pub use channel::DebuggerChannel;
pub use formatter::format_snapshot;
pub use snapshot::{SelectOption, Snapshot, SnapshotElement};
pub use tabs::{Tab, TabId, TabRegistry, TabStateUpdate, TabStatus};
