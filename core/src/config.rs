//! Configuration models and loaders.

use crate::group::{self, ModuleGroup};
use crate::{Error, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// High-level configuration for the toolkit.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Platform installation root; `bin/magento` is resolved against it.
    pub root: PathBuf,
    /// PHP interpreter used to run `bin/magento`.
    pub php: String,
    /// Variable-data directory holding snapshots, relative to `root` unless absolute.
    pub var_dir: PathBuf,
    /// Whether to skip the confirmation prompt before restoring modules.
    pub skip_confirmation: bool,
    /// Module groups known to the toolkit.
    pub groups: Vec<ModuleGroup>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            php: "php".to_string(),
            var_dir: PathBuf::from("var"),
            skip_confirmation: false,
            groups: group::builtin_groups(),
        }
    }
}

impl Config {
    /// Directory the snapshot files live in.
    pub fn snapshot_dir(&self) -> PathBuf {
        if self.var_dir.is_absolute() {
            self.var_dir.clone()
        } else {
            self.root.join(&self.var_dir)
        }
    }

    pub fn group(&self, name: &str) -> Result<&ModuleGroup> {
        self.groups
            .iter()
            .find(|g| g.name == name)
            .ok_or_else(|| Error::UnknownGroup(name.to_string()))
    }

    /// Reject configurations that would let two groups share a snapshot file
    /// or write outside the var directory.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        let mut files = HashSet::new();
        for g in &self.groups {
            if g.name.trim().is_empty() {
                return Err(Error::Config("group name must not be empty".into()));
            }
            if !names.insert(g.name.as_str()) {
                return Err(Error::Config(format!("duplicate group `{}`", g.name)));
            }
            let file = Path::new(&g.state_file);
            if g.state_file.is_empty() || file.file_name() != Some(file.as_os_str()) {
                return Err(Error::Config(format!(
                    "group `{}`: state_file must be a plain file name, got `{}`",
                    g.name, g.state_file
                )));
            }
            if !files.insert(g.state_file.as_str()) {
                return Err(Error::Config(format!(
                    "state file `{}` is shared by more than one group",
                    g.state_file
                )));
            }
        }
        Ok(())
    }
}

/// Parse configuration from TOML text.
///
/// Recognised keys:
/// - `root`, `php`, `var_dir` as strings
/// - `skip_confirmation` as a boolean
/// - `[[groups]]` tables with `name`, `include_prefixes`, `exclude_prefixes`, `state_file`
pub fn parse_config(text: &str) -> Result<Config> {
    let cfg: Config = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load configuration from the provided path.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("read {}: {e}", path.display())))?;
    parse_config(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.snapshot_dir(), PathBuf::from("./var"));
        assert!(cfg.group("swissup").is_ok());
        assert!(cfg.group("thirdparty").is_ok());
    }

    #[test]
    fn loads_groups_and_paths() {
        let cfg = parse_config(
            r#"
            root = "/srv/shop"
            var_dir = "/tmp/state"
            skip_confirmation = true

            [[groups]]
            name = "acme"
            include_prefixes = ["Acme_"]
            state_file = "acme_state.json"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.root, PathBuf::from("/srv/shop"));
        assert_eq!(cfg.snapshot_dir(), PathBuf::from("/tmp/state"));
        assert!(cfg.skip_confirmation);
        assert_eq!(cfg.groups.len(), 1);
        assert!(cfg.group("acme").unwrap().exclude_prefixes.is_empty());
        assert!(matches!(cfg.group("swissup"), Err(Error::UnknownGroup(_))));
    }

    #[test]
    fn rejects_shared_state_file() {
        let err = parse_config(
            r#"
            [[groups]]
            name = "a"
            state_file = "same.json"
            [[groups]]
            name = "b"
            state_file = "same.json"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_state_file_with_directories() {
        let err = parse_config(
            r#"
            [[groups]]
            name = "a"
            state_file = "../escape.json"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn unknown_keys_are_errors() {
        assert!(matches!(parse_config("colour = true"), Err(Error::Config(_))));
    }

    #[test]
    fn load_config_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
