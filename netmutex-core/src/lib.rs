//! Core mutex engine: id generation, the sharded registry, and the lease
//! reaper. No networking lives here; `netmutex-server` wires this up to a
//! TCP accept loop.

pub mod identity;
pub mod registry;

pub use identity::new_id;
pub use registry::{spawn_reaper, Registry, REAPER_PERIOD, SHARD_COUNT};
