//! Environment diagnostics for support requests.
//!
//! Runs a fixed set of shell commands in the platform root and looks for
//! vendor or core code copied into override folders, which silently shadows
//! the installed packages.

use crate::runner::CommandRunner;
use std::fs;
use std::io;
use std::path::Path;

/// Folders, relative to the platform root, that should stay empty.
pub const OVERRIDE_FOLDERS: [&str; 4] = [
    "app/code/Swissup/",
    "app/design/frontend/Swissup/",
    "app/code/Magento/",
    "app/design/frontend/Magento/",
];

/// One shell command and what the operator sees it as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvCheck {
    pub label: &'static str,
    pub command: String,
}

/// Commands reported by `info`, with `php` substituted for the interpreter.
pub fn env_checks(php: &str) -> Vec<EnvCheck> {
    vec![
        EnvCheck {
            label: "PHP version",
            command: format!("{php} -v | head -n 1 && whereis {php}"),
        },
        EnvCheck {
            label: "Magento version",
            command: format!("{php} bin/magento --version"),
        },
        EnvCheck {
            label: "Composer version",
            command: "composer --version && whereis composer".to_string(),
        },
        EnvCheck {
            label: "Web server user",
            command: "whoami".to_string(),
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub check: EnvCheck,
    /// Trimmed stdout, or the failure message when the command failed.
    pub output: Result<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderState {
    Missing,
    Empty,
    NotEmpty { entries: usize },
    Unreadable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderCheck {
    /// As listed in [`OVERRIDE_FOLDERS`], relative to the root.
    pub folder: &'static str,
    pub state: FolderState,
}

impl FolderCheck {
    pub fn is_warning(&self) -> bool {
        matches!(self.state, FolderState::NotEmpty { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoReport {
    pub environment: Vec<CheckResult>,
    pub overrides: Vec<FolderCheck>,
}

impl InfoReport {
    pub fn warnings(&self) -> impl Iterator<Item = &FolderCheck> {
        self.overrides.iter().filter(|f| f.is_warning())
    }
}

/// Gather every diagnostic. A failing command is recorded and the rest still run.
pub fn collect_info(runner: &dyn CommandRunner, root: &Path, php: &str) -> InfoReport {
    let environment = env_checks(php)
        .into_iter()
        .map(|check| {
            let output = run_shell(runner, &check.command);
            if let Err(e) = &output {
                tracing::warn!(label = check.label, command = %check.command, error = %e, "diagnostic command failed");
            }
            CheckResult { check, output }
        })
        .collect();

    let overrides = OVERRIDE_FOLDERS
        .iter()
        .map(|&folder| {
            let state = folder_state(&root.join(folder));
            if let FolderState::NotEmpty { entries } = state {
                tracing::warn!(folder, entries, "override folder is not empty");
            }
            FolderCheck { folder, state }
        })
        .collect();

    InfoReport {
        environment,
        overrides,
    }
}

fn run_shell(runner: &dyn CommandRunner, command: &str) -> Result<String, String> {
    let args = ["-c".to_string(), command.to_string()];
    match runner.run("sh", &args) {
        Ok(out) if out.success => Ok(out.stdout.trim().to_string()),
        Ok(out) => Err(out.message()),
        Err(e) => Err(e.to_string()),
    }
}

fn folder_state(path: &Path) -> FolderState {
    match fs::read_dir(path) {
        Ok(entries) => match entries.count() {
            0 => FolderState::Empty,
            n => FolderState::NotEmpty { entries: n },
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => FolderState::Missing,
        Err(e) => FolderState::Unreadable(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CommandOutput;
    use crate::{Error, Result};
    use std::cell::RefCell;

    /// Answers `sh -c <command>` by the first key contained in the command.
    #[derive(Default)]
    struct Canned {
        replies: Vec<(&'static str, Option<CommandOutput>)>,
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl Canned {
        fn ok(mut self, key: &'static str, stdout: &str) -> Self {
            let out = CommandOutput {
                success: true,
                stdout: stdout.to_string(),
                stderr: String::new(),
            };
            self.replies.push((key, Some(out)));
            self
        }

        fn fail(mut self, key: &'static str, stderr: &str) -> Self {
            let out = CommandOutput {
                success: false,
                stdout: String::new(),
                stderr: stderr.to_string(),
            };
            self.replies.push((key, Some(out)));
            self
        }

        fn unspawnable(mut self, key: &'static str) -> Self {
            self.replies.push((key, None));
            self
        }
    }

    impl CommandRunner for Canned {
        fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
            let mut call = vec![program.to_string()];
            call.extend(args.iter().cloned());
            self.calls.borrow_mut().push(call);
            let command = args.get(1).cloned().unwrap_or_default();
            match self.replies.iter().find(|(key, _)| command.contains(key)) {
                Some((_, Some(out))) => Ok(out.clone()),
                Some((_, None)) | None => Err(Error::Host(format!("spawn `{program}`: not found"))),
            }
        }
    }

    #[test]
    fn runs_every_command_through_the_shell() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Canned::default()
            .ok("head -n 1", "PHP 8.2.12 (cli)\nphp: /usr/bin/php8.2\n")
            .ok("bin/magento", "Magento CLI 2.4.7\n")
            .fail("composer", "sh: composer: not found")
            .ok("whoami", "www-data\n");

        let report = collect_info(&runner, dir.path(), "php8.2");

        let calls = runner.calls.borrow();
        assert_eq!(calls.len(), 4);
        assert_eq!(
            calls[0],
            ["sh", "-c", "php8.2 -v | head -n 1 && whereis php8.2"]
        );
        assert_eq!(calls[1], ["sh", "-c", "php8.2 bin/magento --version"]);

        let labels: Vec<_> = report.environment.iter().map(|r| r.check.label).collect();
        assert_eq!(
            labels,
            ["PHP version", "Magento version", "Composer version", "Web server user"]
        );
        assert_eq!(
            report.environment[0].output,
            Ok("PHP 8.2.12 (cli)\nphp: /usr/bin/php8.2".to_string())
        );
        assert_eq!(
            report.environment[2].output,
            Err("sh: composer: not found".to_string())
        );
        assert_eq!(report.environment[3].output, Ok("www-data".to_string()));
    }

    #[test]
    fn spawn_failure_is_recorded_and_the_rest_still_run() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Canned::default().unspawnable("whoami").ok("", "ok");

        let report = collect_info(&runner, dir.path(), "php");
        assert_eq!(runner.calls.borrow().len(), 4);
        assert!(report.environment[..3].iter().all(|r| r.output.is_ok()));
        assert!(report.environment[3]
            .output
            .as_ref()
            .is_err_and(|e| e.contains("not found")));
    }

    #[test]
    fn only_non_empty_override_folders_warn() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("app/code/Swissup/Core")).unwrap();
        fs::write(root.join("app/code/Swissup/registration.php"), b"<?php").unwrap();
        fs::create_dir_all(root.join("app/code/Magento")).unwrap();
        fs::create_dir_all(root.join("app/design/frontend")).unwrap();

        let report = collect_info(&Canned::default().ok("", ""), root, "php");

        let states: Vec<_> = report.overrides.iter().map(|f| (f.folder, &f.state)).collect();
        assert_eq!(
            states,
            [
                ("app/code/Swissup/", &FolderState::NotEmpty { entries: 2 }),
                ("app/design/frontend/Swissup/", &FolderState::Missing),
                ("app/code/Magento/", &FolderState::Empty),
                ("app/design/frontend/Magento/", &FolderState::Missing),
            ]
        );
        let warned: Vec<_> = report.warnings().map(|f| f.folder).collect();
        assert_eq!(warned, ["app/code/Swissup/"]);
    }

    #[cfg(unix)]
    #[test]
    fn file_in_place_of_folder_is_unreadable_not_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("app/code")).unwrap();
        fs::write(dir.path().join("app/code/Magento"), b"").unwrap();

        let report = collect_info(&Canned::default().ok("", ""), dir.path(), "php");
        assert!(matches!(report.overrides[2].state, FolderState::Unreadable(_)));
        assert_eq!(report.warnings().count(), 0);
    }
}
