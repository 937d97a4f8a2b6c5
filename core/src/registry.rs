//! Seams to the host platform's module list and enable/disable mechanism.

use crate::Result;

/// A module name together with its enabled flag at the time it was read.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ModuleState {
    pub name: String,
    pub enabled: bool,
}

/// Read side of the host module registry.
pub trait ModuleRegistry {
    /// Every module identifier the host knows about, enabled or not.
    fn list_all(&self) -> Result<Vec<String>>;

    fn is_enabled(&self, module: &str) -> Result<bool>;

    /// Snapshot of `modules` with their current flags.
    fn states(&self, modules: &[String]) -> Result<Vec<ModuleState>> {
        modules
            .iter()
            .map(|name| {
                Ok(ModuleState {
                    name: name.clone(),
                    enabled: self.is_enabled(name)?,
                })
            })
            .collect()
    }
}

/// Write side of the host module registry.
pub trait ModuleEnabler {
    /// Enable or disable exactly `modules`. Fails with [`crate::Error::Enabler`].
    fn set_enabled(&self, enabled: bool, modules: &[String]) -> Result<()>;
}
