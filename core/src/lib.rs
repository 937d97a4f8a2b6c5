//! Core crate for capturing, disabling and restoring groups of platform modules.

pub mod assets;
pub mod config;
pub mod flow;
pub mod group;
pub mod info;
pub mod lock;
pub mod magento;
pub mod prompt;
pub mod registry;
pub mod runner;
pub mod snapshot;

pub use config::Config;
pub use flow::{disable_group, enable_group, group_status, NoOpReason, Outcome};
pub use group::ModuleGroup;
pub use magento::MagentoCli;
pub use prompt::{AutoConfirm, Confirm};
pub use registry::{ModuleEnabler, ModuleRegistry};
pub use runner::{CommandOutput, CommandRunner, ProcessRunner};
pub use snapshot::{CaptureOutcome, CleanupWarning, ModuleSnapshot, SnapshotStore};

use std::path::PathBuf;
use thiserror::Error;

/// Common error type for snapshot bookkeeping and host calls.
#[derive(Debug, Error)]
pub enum Error {
    /// The snapshot (or its directory) could not be read or written.
    #[error("snapshot storage failed at {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// No snapshot exists for the group.
    #[error("no snapshot found for group `{group}` at {path}")]
    NotFound { group: String, path: PathBuf },
    /// The stored snapshot exists but does not have the expected shape.
    #[error("snapshot {path} is corrupt: {reason}")]
    CorruptSnapshot { path: PathBuf, reason: String },
    /// The host refused to enable or disable modules.
    #[error("failed to {action} modules: {message}")]
    Enabler { action: &'static str, message: String },
    /// Another process holds the group lock.
    #[error("snapshot for group `{group}` is locked by another process ({path})")]
    Locked { group: String, path: PathBuf },
    /// Any other failure talking to the host platform.
    #[error("host command failed: {0}")]
    Host(String),
    /// The requested group name is not configured.
    #[error("unknown module group `{0}`")]
    UnknownGroup(String),
    /// An asset option was given something other than `0` or `1`.
    #[error("invalid value `{value}` for {option}: expected 0 or 1")]
    InvalidValue { option: String, value: String },
    /// The config file could not be read, parsed or validated.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenient alias for results returned by the core crate.
pub type Result<T> = std::result::Result<T, Error>;
