//! Named, prefix-defined partitions of the module list.

use crate::registry::ModuleRegistry;
use crate::Result;

/// A group of modules selected by name prefix, with its own snapshot file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleGroup {
    pub name: String,
    /// A module belongs to the group when it starts with any of these.
    /// An empty list admits every module not excluded below.
    #[serde(default)]
    pub include_prefixes: Vec<String>,
    #[serde(default)]
    pub exclude_prefixes: Vec<String>,
    /// File name of the snapshot inside the var directory.
    pub state_file: String,
}

impl ModuleGroup {
    pub fn new(name: impl Into<String>, state_file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            include_prefixes: Vec::new(),
            exclude_prefixes: Vec::new(),
            state_file: state_file.into(),
        }
    }

    pub fn include(mut self, prefix: impl Into<String>) -> Self {
        self.include_prefixes.push(prefix.into());
        self
    }

    pub fn exclude(mut self, prefix: impl Into<String>) -> Self {
        self.exclude_prefixes.push(prefix.into());
        self
    }

    pub fn contains(&self, module: &str) -> bool {
        let included = self.include_prefixes.is_empty()
            || self.include_prefixes.iter().any(|p| module.starts_with(p.as_str()));
        included && !self.exclude_prefixes.iter().any(|p| module.starts_with(p.as_str()))
    }

    /// All registry modules in this group, sorted and de-duplicated.
    pub fn members(&self, registry: &dyn ModuleRegistry) -> Result<Vec<String>> {
        let mut names: Vec<String> = registry
            .list_all()?
            .into_iter()
            .filter(|m| self.contains(m))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}

/// Groups available when the configuration does not define any.
pub fn builtin_groups() -> Vec<ModuleGroup> {
    vec![
        ModuleGroup::new("swissup", "swissup_modules_state.json").include("Swissup_"),
        ModuleGroup::new("thirdparty", "thirdparty_modules_state.json")
            .exclude("Swissup_")
            .exclude("Magento_"),
    ]
}
