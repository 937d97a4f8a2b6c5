mod logging;
mod report;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use modstate_core::assets::{self, AssetRequest};
use modstate_core::config::{self, Config};
use modstate_core::info;
use modstate_core::{
    disable_group, enable_group, group_status, MagentoCli, Outcome, ProcessRunner, SnapshotStore,
};
use std::io;
use std::path::{Path, PathBuf};

use logging::LogConfig;
use report::TerminalConfirm;

/// Looked up in the working directory when no config path is given.
const DEFAULT_CONFIG_FILE: &str = "modstate.toml";

/// Disable and restore groups of platform modules, and toggle asset optimisation.
#[derive(Debug, Parser)]
#[command(name = "modstate", version, about)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true, env = "MODSTATE_CONFIG")]
    config: Option<PathBuf>,
    /// Platform root, overriding `root` from the config.
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    /// Log filter when RUST_LOG is unset (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    /// Emit logs as JSON.
    #[arg(long, global = true)]
    json_logs: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Save the enabled modules of a group, then disable them.
    Disable {
        #[arg(long)]
        group: String,
    },
    /// Re-enable the modules saved by the last `disable` of a group.
    Enable {
        #[arg(long)]
        group: String,
        /// Do not ask for confirmation.
        #[arg(short = 'n', long)]
        no_interaction: bool,
    },
    /// Show group members and the saved snapshot, if any.
    Status {
        #[arg(long)]
        group: String,
    },
    /// List configured groups.
    Groups,
    /// Manage JS/CSS/HTML merge, minification and bundling settings.
    Assets(AssetArgs),
    /// Print PHP, Magento and Composer details and check override folders.
    Info,
}

#[derive(Debug, Args)]
struct AssetArgs {
    /// Enable/disable CSS merge (1 or 0).
    #[arg(long, value_name = "0|1")]
    merge_css: Option<String>,
    /// Enable/disable CSS minification (1 or 0).
    #[arg(long, value_name = "0|1")]
    minify_css: Option<String>,
    /// Enable/disable JS merge (1 or 0).
    #[arg(long, value_name = "0|1")]
    merge_js: Option<String>,
    /// Enable/disable JS minification (1 or 0).
    #[arg(long, value_name = "0|1")]
    minify_js: Option<String>,
    /// Enable/disable JS bundling (1 or 0).
    #[arg(long, value_name = "0|1")]
    bundle_js: Option<String>,
    /// Enable/disable HTML minification (1 or 0).
    #[arg(long, value_name = "0|1")]
    minify_html: Option<String>,
    /// Enable all optimisation settings.
    #[arg(long)]
    enable_all: bool,
    /// Disable all optimisation settings.
    #[arg(long)]
    disable_all: bool,
}

impl AssetArgs {
    fn into_request(self) -> AssetRequest {
        let values = [
            ("merge-css", self.merge_css),
            ("minify-css", self.minify_css),
            ("merge-js", self.merge_js),
            ("minify-js", self.minify_js),
            ("bundle-js", self.bundle_js),
            ("minify-html", self.minify_html),
        ]
        .into_iter()
        .filter_map(|(option, value)| value.map(|v| (option.to_string(), v)))
        .collect();
        AssetRequest {
            enable_all: self.enable_all,
            disable_all: self.disable_all,
            values,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let log = LogConfig {
        level: cli.log_level.clone(),
        json_format: cli.json_logs,
    };
    if let Err(e) = logging::init_logging(&log) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }

    if let Err(e) = run(cli) {
        tracing::error!(error = %format!("{e:#}"), "command failed");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn resolve_config(explicit: Option<&Path>, root: Option<PathBuf>) -> Result<Config> {
    let mut cfg = match explicit {
        Some(path) => config::load_config(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            config::load_config(DEFAULT_CONFIG_FILE).context("loading modstate.toml")?
        }
        None => Config::default(),
    };
    if let Some(root) = root {
        cfg.root = root;
    }
    Ok(cfg)
}

fn run(cli: Cli) -> Result<()> {
    let cfg = resolve_config(cli.config.as_deref(), cli.root)?;
    tracing::debug!(root = %cfg.root.display(), var = %cfg.snapshot_dir().display(), "configuration loaded");

    let store = SnapshotStore::new(cfg.snapshot_dir());
    let host = MagentoCli::new(ProcessRunner::new(&cfg.root), cfg.php.clone());
    let mut out = io::stdout().lock();

    match cli.command {
        Command::Disable { group } => {
            let group = cfg.group(&group)?;
            match disable_group(group, &store, &host, &host)? {
                Outcome::NoOp(reason) => report::no_op(&mut out, &group.name, &reason)?,
                Outcome::Success(r) => report::disabled(&mut out, &r)?,
            }
        }
        Command::Enable { group, no_interaction } => {
            let group = cfg.group(&group)?;
            let mut confirm = TerminalConfirm {
                interactive: !(no_interaction || cfg.skip_confirmation),
            };
            match enable_group(group, &store, &host, &host, &mut confirm)? {
                Outcome::NoOp(reason) => report::no_op(&mut out, &group.name, &reason)?,
                Outcome::Success(r) => report::enabled(&mut out, &r)?,
            }
        }
        Command::Status { group } => {
            let group = cfg.group(&group)?;
            report::status(&mut out, &group_status(group, &store, &host)?)?;
        }
        Command::Groups => report::groups(&mut out, &cfg)?,
        Command::Assets(args) => {
            let result = assets::apply_assets(&args.into_request(), &host, &host)?;
            report::assets(&mut out, &result)?;
        }
        Command::Info => {
            let runner = ProcessRunner::new(&cfg.root);
            report::info(&mut out, &info::collect_info(&runner, &cfg.root, &cfg.php))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enable_accepts_short_no_interaction() {
        let cli = Cli::try_parse_from(["modstate", "enable", "--group", "swissup", "-n"]).unwrap();
        match cli.command {
            Command::Enable { group, no_interaction } => {
                assert_eq!(group, "swissup");
                assert!(no_interaction);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn group_is_required_and_not_positional() {
        assert!(Cli::try_parse_from(["modstate", "disable"]).is_err());
        assert!(Cli::try_parse_from(["modstate", "disable", "swissup"]).is_err());
    }

    #[test]
    fn asset_options_become_request_values() {
        let cli = Cli::try_parse_from([
            "modstate",
            "assets",
            "--merge-css=1",
            "--minify-js",
            "0",
        ])
        .unwrap();
        let Command::Assets(args) = cli.command else {
            panic!("expected assets");
        };
        let request = args.into_request();
        assert!(!request.enable_all && !request.disable_all);
        assert_eq!(
            request.values,
            vec![
                ("merge-css".to_string(), "1".to_string()),
                ("minify-js".to_string(), "0".to_string()),
            ]
        );
    }

    #[test]
    fn info_takes_no_arguments() {
        let cli = Cli::try_parse_from(["modstate", "info", "--root", "/srv/shop"]).unwrap();
        assert!(matches!(cli.command, Command::Info));
        assert_eq!(cli.root, Some(PathBuf::from("/srv/shop")));
        assert!(Cli::try_parse_from(["modstate", "info", "--group", "swissup"]).is_err());
    }

    #[test]
    fn explicit_config_and_root_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf.toml");
        std::fs::write(&path, "root = \"/srv/a\"\nskip_confirmation = true\n").unwrap();

        let cfg = resolve_config(Some(path.as_path()), None).unwrap();
        assert_eq!(cfg.root, PathBuf::from("/srv/a"));
        assert!(cfg.skip_confirmation);

        let cfg = resolve_config(Some(path.as_path()), Some(PathBuf::from("/srv/b"))).unwrap();
        assert_eq!(cfg.root, PathBuf::from("/srv/b"));
        assert_eq!(cfg.snapshot_dir(), PathBuf::from("/srv/b/var"));
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(resolve_config(Some(dir.path().join("absent.toml").as_path()), None).is_err());
    }
}
