// Adapters layer: concrete implementations of the domain ports.

pub mod dry_run;
pub mod local_store;

pub use dry_run::{BackendCall, DryRunBackend};
pub use local_store::{FileStore, MemoryStore};
