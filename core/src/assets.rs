//! Storefront asset optimisation flags (merge/minify/bundle).

use crate::{Error, Result};

/// A boolean store configuration flag controlling asset optimisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetSetting {
    /// Command-line option name.
    pub option: &'static str,
    pub path: &'static str,
    pub label: &'static str,
}

pub const SETTINGS: [AssetSetting; 6] = [
    AssetSetting { option: "merge-css", path: "dev/css/merge_css_files", label: "CSS Merge" },
    AssetSetting { option: "minify-css", path: "dev/css/minify_files", label: "CSS Minification" },
    AssetSetting { option: "merge-js", path: "dev/js/merge_files", label: "JS Merge" },
    AssetSetting { option: "minify-js", path: "dev/js/minify_files", label: "JS Minification" },
    AssetSetting { option: "bundle-js", path: "dev/js/enable_js_bundling", label: "JS Bundling" },
    AssetSetting { option: "minify-html", path: "dev/template/minify_html", label: "HTML Minification" },
];

/// Cache types invalidated after any flag changes.
pub const CACHE_TYPES: [&str; 4] = ["config", "full_page", "block_html", "layout"];

pub trait ConfigStore {
    /// `None` when the path has no stored value.
    fn get(&self, path: &str) -> Result<Option<bool>>;
    fn save(&self, path: &str, value: bool) -> Result<()>;
}

pub trait CacheCleaner {
    fn clean(&self, cache_type: &str) -> Result<()>;
}

/// Requested changes, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct AssetRequest {
    pub enable_all: bool,
    pub disable_all: bool,
    /// `(option, raw value)` pairs for individually set flags.
    pub values: Vec<(String, String)>,
}

impl AssetRequest {
    /// Resolve into concrete writes. `enable_all` beats `disable_all`, and
    /// either one overrides individual values.
    pub fn changes(&self) -> Result<Vec<(AssetSetting, bool)>> {
        if self.enable_all || self.disable_all {
            return Ok(SETTINGS.iter().map(|s| (*s, self.enable_all)).collect());
        }
        let mut out = Vec::new();
        for setting in SETTINGS.iter() {
            if let Some((option, raw)) = self.values.iter().find(|(o, _)| o == setting.option) {
                out.push((*setting, parse_flag(option, raw)?));
            }
        }
        if let Some((option, _)) = self
            .values
            .iter()
            .find(|(o, _)| !SETTINGS.iter().any(|s| s.option == o.as_str()))
        {
            return Err(Error::Config(format!("unknown asset option `{option}`")));
        }
        Ok(out)
    }
}

fn parse_flag(option: &str, raw: &str) -> Result<bool> {
    match raw.trim() {
        "1" => Ok(true),
        "0" => Ok(false),
        _ => Err(Error::InvalidValue {
            option: option.to_string(),
            value: raw.to_string(),
        }),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingStatus {
    pub setting: AssetSetting,
    pub enabled: bool,
}

#[derive(Debug, Default)]
pub struct AssetReport {
    pub changed: Vec<(AssetSetting, bool)>,
    /// Cache types cleaned, with the failure message for those that could not be.
    pub cache: Vec<(&'static str, Option<String>)>,
    pub current: Vec<SettingStatus>,
}

/// Apply `request`, clean caches if anything changed, and read back the flags.
pub fn apply_assets(
    request: &AssetRequest,
    store: &dyn ConfigStore,
    cache: &dyn CacheCleaner,
) -> Result<AssetReport> {
    let changed = request.changes()?;
    for (setting, value) in &changed {
        tracing::info!(path = setting.path, value, "saving asset setting");
        store.save(setting.path, *value)?;
    }

    let mut cleaned = Vec::new();
    if !changed.is_empty() {
        for cache_type in CACHE_TYPES {
            let failure = match cache.clean(cache_type) {
                Ok(()) => None,
                Err(e) => {
                    tracing::warn!(cache_type, error = %e, "cache clean failed");
                    Some(e.to_string())
                }
            };
            cleaned.push((cache_type, failure));
        }
    }

    Ok(AssetReport {
        changed,
        cache: cleaned,
        current: current_settings(store)?,
    })
}

pub fn current_settings(store: &dyn ConfigStore) -> Result<Vec<SettingStatus>> {
    SETTINGS
        .iter()
        .map(|s| {
            Ok(SettingStatus {
                setting: *s,
                enabled: store.get(s.path)?.unwrap_or(false),
            })
        })
        .collect()
}
