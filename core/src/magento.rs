//! Host adapter that drives the platform through `bin/magento`.

use crate::assets::{CacheCleaner, ConfigStore};
use crate::registry::{ModuleEnabler, ModuleRegistry};
use crate::runner::{CommandOutput, CommandRunner};
use crate::{Error, Result};
use std::cell::RefCell;
use std::collections::BTreeMap;

const ENABLED_HEADER: &str = "List of enabled modules:";
const DISABLED_HEADER: &str = "List of disabled modules:";

/// Parse `bin/magento module:status` output into `name -> enabled`.
pub fn parse_module_status(text: &str) -> Result<BTreeMap<String, bool>> {
    let mut modules = BTreeMap::new();
    let mut section: Option<bool> = None;
    let mut saw_header = false;

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case(ENABLED_HEADER) {
            section = Some(true);
            saw_header = true;
        } else if line.eq_ignore_ascii_case(DISABLED_HEADER) {
            section = Some(false);
            saw_header = true;
        } else if line == "None" {
            continue;
        } else if let Some(enabled) = section {
            modules.insert(line.to_string(), enabled);
        }
    }

    if !saw_header {
        return Err(Error::Host("unexpected module:status output".into()));
    }
    Ok(modules)
}

/// Module registry, enabler, config store and cache cleaner backed by the
/// platform's own CLI.
pub struct MagentoCli<R> {
    runner: R,
    php: String,
    /// `module:status` result, dropped after every enable/disable.
    status: RefCell<Option<BTreeMap<String, bool>>>,
}

impl<R: CommandRunner> MagentoCli<R> {
    pub fn new(runner: R, php: impl Into<String>) -> Self {
        Self {
            runner,
            php: php.into(),
            status: RefCell::new(None),
        }
    }

    fn magento<I, S>(&self, args: I) -> Result<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = vec!["bin/magento".to_string()];
        argv.extend(args.into_iter().map(Into::into));
        self.runner.run(&self.php, &argv)
    }

    fn with_status<T>(&self, f: impl FnOnce(&BTreeMap<String, bool>) -> T) -> Result<T> {
        if self.status.borrow().is_none() {
            let out = self.magento(["module:status"])?;
            if !out.success {
                return Err(Error::Host(format!("module:status: {}", out.message())));
            }
            *self.status.borrow_mut() = Some(parse_module_status(&out.stdout)?);
        }
        let status = self.status.borrow();
        let result = match status.as_ref() {
            Some(map) => Ok(f(map)),
            None => Err(Error::Host("module status unavailable".into())),
        };
        result
    }
}

impl<R: CommandRunner> ModuleRegistry for MagentoCli<R> {
    fn list_all(&self) -> Result<Vec<String>> {
        self.with_status(|m| m.keys().cloned().collect())
    }

    fn is_enabled(&self, module: &str) -> Result<bool> {
        self.with_status(|m| m.get(module).copied().unwrap_or(false))
    }
}

impl<R: CommandRunner> ModuleEnabler for MagentoCli<R> {
    fn set_enabled(&self, enabled: bool, modules: &[String]) -> Result<()> {
        if modules.is_empty() {
            return Ok(());
        }
        let (command, action) = if enabled {
            ("module:enable", "enable")
        } else {
            ("module:disable", "disable")
        };
        // --force skips the dependency check, matching a direct status write.
        let args = [command.to_string(), "--force".to_string()]
            .into_iter()
            .chain(modules.iter().cloned());
        let out = self.magento(args);
        self.status.borrow_mut().take();

        let out = out.map_err(|e| Error::Enabler {
            action,
            message: e.to_string(),
        })?;
        if !out.success {
            return Err(Error::Enabler {
                action,
                message: out.message(),
            });
        }
        Ok(())
    }
}

impl<R: CommandRunner> ConfigStore for MagentoCli<R> {
    fn get(&self, path: &str) -> Result<Option<bool>> {
        let out = self.magento(["config:show", path])?;
        if !out.success {
            // config:show exits non-zero for paths that were never saved.
            return Ok(None);
        }
        let value = out.stdout.trim();
        Ok(Some(!value.is_empty() && value != "0"))
    }

    fn save(&self, path: &str, value: bool) -> Result<()> {
        let flag = if value { "1" } else { "0" };
        let out = self.magento(["config:set", path, flag])?;
        if !out.success {
            return Err(Error::Host(format!("config:set {path}: {}", out.message())));
        }
        Ok(())
    }
}

impl<R: CommandRunner> CacheCleaner for MagentoCli<R> {
    fn clean(&self, cache_type: &str) -> Result<()> {
        let out = self.magento(["cache:clean", cache_type])?;
        if !out.success {
            return Err(Error::Host(format!("cache:clean {cache_type}: {}", out.message())));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    const STATUS: &str = "List of enabled modules:\n\
        Magento_Store\n\
        Swissup_Core\n\
        \n\
        List of disabled modules:\n\
        Swissup_Tm\n";

    /// Replays canned outputs and records every invocation.
    #[derive(Default)]
    struct Scripted {
        replies: RefCell<VecDeque<CommandOutput>>,
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl Scripted {
        fn reply(self, success: bool, stdout: &str) -> Self {
            self.replies.borrow_mut().push_back(CommandOutput {
                success,
                stdout: stdout.to_string(),
                stderr: String::new(),
            });
            self
        }
    }

    impl CommandRunner for &Scripted {
        fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
            let mut call = vec![program.to_string()];
            call.extend(args.iter().cloned());
            self.calls.borrow_mut().push(call);
            self.replies
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| Error::Host("no scripted reply".into()))
        }
    }

    #[test]
    fn parses_both_sections() {
        let status = parse_module_status(STATUS).unwrap();
        assert_eq!(status.get("Magento_Store"), Some(&true));
        assert_eq!(status.get("Swissup_Core"), Some(&true));
        assert_eq!(status.get("Swissup_Tm"), Some(&false));
        assert_eq!(status.len(), 3);
    }

    #[test]
    fn none_placeholder_is_skipped() {
        let status =
            parse_module_status("List of enabled modules:\nA_B\n\nList of disabled modules:\nNone\n")
                .unwrap();
        assert_eq!(status.len(), 1);
    }

    #[test]
    fn rejects_output_without_headers() {
        assert!(matches!(
            parse_module_status("Could not open input file: bin/magento"),
            Err(Error::Host(_))
        ));
    }

    #[test]
    fn status_is_cached_until_modules_change() {
        let script = Scripted::default()
            .reply(true, STATUS)
            .reply(true, "")
            .reply(true, STATUS);
        let cli = MagentoCli::new(&script, "php8.2");

        assert_eq!(cli.list_all().unwrap().len(), 3);
        assert!(cli.is_enabled("Swissup_Core").unwrap());
        assert!(!cli.is_enabled("Unknown_Module").unwrap());
        assert_eq!(script.calls.borrow().len(), 1);

        cli.set_enabled(false, &["Swissup_Core".into()]).unwrap();
        cli.is_enabled("Swissup_Core").unwrap();

        let calls = script.calls.borrow();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], ["php8.2", "bin/magento", "module:status"]);
        assert_eq!(
            calls[1],
            ["php8.2", "bin/magento", "module:disable", "--force", "Swissup_Core"]
        );
    }

    #[test]
    fn failed_enable_is_enabler_error() {
        let script = Scripted::default().reply(false, "Unknown module(s): 'Swissup_Gone'");
        let cli = MagentoCli::new(&script, "php");
        let err = cli.set_enabled(true, &["Swissup_Gone".into()]).unwrap_err();
        assert_eq!(
            script.calls.borrow()[0],
            ["php", "bin/magento", "module:enable", "--force", "Swissup_Gone"]
        );
        match err {
            Error::Enabler { action, message } => {
                assert_eq!(action, "enable");
                assert!(message.contains("Swissup_Gone"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_module_list_runs_nothing() {
        let script = Scripted::default();
        MagentoCli::new(&script, "php").set_enabled(true, &[]).unwrap();
        assert!(script.calls.borrow().is_empty());
    }

    #[test]
    fn config_show_and_set() {
        let script = Scripted::default()
            .reply(true, "1\n")
            .reply(false, "")
            .reply(true, "Value was saved.");
        let cli = MagentoCli::new(&script, "php");

        assert_eq!(cli.get("dev/js/merge_files").unwrap(), Some(true));
        assert_eq!(cli.get("dev/js/minify_files").unwrap(), None);
        cli.save("dev/js/minify_files", false).unwrap();
        assert_eq!(
            script.calls.borrow()[2],
            ["php", "bin/magento", "config:set", "dev/js/minify_files", "0"]
        );
    }
}
