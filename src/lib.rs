pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliArgs;

pub use adapters::{DryRunBackend, FileStore, MemoryStore};
pub use config::ProviderConfig;
pub use core::{
    auth_provider::{AuthProvider, AuthRequest, SessionState},
    data_provider::{DataProvider, DataRequest, DataResponse},
};
pub use utils::error::{ProviderError, Result};
