//! Plain-text rendering of flow results for the operator.

use modstate_core::assets::AssetReport;
use modstate_core::flow::{
    DisableReport, EnableReport, GroupStatus, NoOpReason, RestorePlan, SnapshotState,
};
use modstate_core::info::{FolderState, InfoReport};
use modstate_core::prompt::LinePrompt;
use modstate_core::registry::ModuleState;
use modstate_core::{AutoConfirm, Confirm, Config};
use std::io::{self, Write};

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

fn module_table(out: &mut impl Write, rows: &[ModuleState]) -> io::Result<()> {
    writeln!(out, "  {:<40} status", "module")?;
    for row in rows {
        writeln!(out, "  {:<40} {}", row.name, on_off(row.enabled))?;
    }
    Ok(())
}

pub fn no_op(out: &mut impl Write, group: &str, reason: &NoOpReason) -> io::Result<()> {
    match reason {
        NoOpReason::NoModules => writeln!(out, "No `{group}` modules found."),
        NoOpReason::AlreadyDisabled => writeln!(out, "All `{group}` modules are already disabled."),
        NoOpReason::NothingToRestore { path } => {
            writeln!(out, "Nothing to restore: no snapshot at {}.", path.display())?;
            writeln!(
                out,
                "The snapshot is written by `modstate disable --group {group}`; run it first."
            )
        }
        NoOpReason::EmptySnapshot { path } => {
            writeln!(out, "Snapshot {} lists no modules; nothing to enable.", path.display())
        }
        NoOpReason::Declined => writeln!(out, "Operation cancelled."),
    }
}

pub fn disabled(out: &mut impl Write, report: &DisableReport) -> io::Result<()> {
    writeln!(out, "Modules in group `{}` before disabling:", report.group)?;
    module_table(out, &report.before)?;
    writeln!(out)?;
    writeln!(out, "State saved to {} ({} module(s)).", report.state_file.display(), report.disabled.len())?;
    for name in &report.disabled {
        writeln!(out, "  - {name}")?;
    }
    writeln!(out, "Disabled {} module(s).", report.disabled.len())?;
    writeln!(out, "To enable them back, run: modstate enable --group {}", report.group)?;
    writeln!(out, "Remember to run setup:upgrade and cache:flush afterwards.")
}

pub fn enabled(out: &mut impl Write, report: &EnableReport) -> io::Result<()> {
    for name in &report.enabled {
        writeln!(out, "  + {name}")?;
    }
    writeln!(
        out,
        "Enabled {} module(s) of group `{}` (snapshot taken {}).",
        report.enabled.len(),
        report.group,
        report.taken_at
    )?;
    match &report.cleanup_warning {
        None => writeln!(out, "Snapshot {} removed.", report.state_file.display())?,
        Some(w) => writeln!(out, "warning: {w}; it will be replaced by the next disable.")?,
    }
    writeln!(out, "Remember to run setup:upgrade and cache:flush afterwards.")
}

pub fn plan(out: &mut impl Write, plan: &RestorePlan) -> io::Result<()> {
    writeln!(
        out,
        "Snapshot of group `{}` taken {}: {} module(s) to enable.",
        plan.group,
        plan.snapshot.taken_at_display(),
        plan.snapshot.enabled_modules.len()
    )?;
    writeln!(out, "  {:<40} {:<9} will enable", "module", "status")?;
    for row in &plan.rows {
        writeln!(
            out,
            "  {:<40} {:<9} {}",
            row.name,
            on_off(row.enabled_now),
            if row.will_enable { "yes" } else { "-" }
        )?;
    }
    Ok(())
}

pub fn status(out: &mut impl Write, status: &GroupStatus) -> io::Result<()> {
    writeln!(out, "Group `{}`:", status.group)?;
    module_table(out, &status.modules)?;
    writeln!(out)?;
    match &status.snapshot {
        SnapshotState::Absent => writeln!(out, "No snapshot ({}).", status.state_file.display()),
        SnapshotState::Present(s) => writeln!(
            out,
            "Snapshot {} taken {} lists {} module(s): {}",
            status.state_file.display(),
            s.taken_at_display(),
            s.enabled_modules.len(),
            s.enabled_modules.join(", ")
        ),
        SnapshotState::Corrupt(reason) => writeln!(
            out,
            "Snapshot {} is unreadable: {reason}",
            status.state_file.display()
        ),
        SnapshotState::Busy => writeln!(out, "Snapshot is locked by another invocation."),
    }
}

pub fn groups(out: &mut impl Write, config: &Config) -> io::Result<()> {
    let dir = config.snapshot_dir();
    for g in &config.groups {
        let include = if g.include_prefixes.is_empty() {
            "*".to_string()
        } else {
            g.include_prefixes.join(",")
        };
        write!(out, "{:<12} include={include}", g.name)?;
        if !g.exclude_prefixes.is_empty() {
            write!(out, " exclude={}", g.exclude_prefixes.join(","))?;
        }
        writeln!(out, " state={}", dir.join(&g.state_file).display())?;
    }
    Ok(())
}

pub fn assets(out: &mut impl Write, report: &AssetReport) -> io::Result<()> {
    for (setting, value) in &report.changed {
        writeln!(out, "  {:<20} -> {}", setting.label, on_off(*value))?;
    }
    for (cache_type, failure) in &report.cache {
        match failure {
            None => writeln!(out, "  cleaned cache: {cache_type}")?,
            Some(e) => writeln!(out, "  warning: could not clean {cache_type}: {e}")?,
        }
    }
    if !report.changed.is_empty() {
        writeln!(out)?;
    }
    writeln!(out, "  {:<20} {:<9} path", "setting", "status")?;
    for s in &report.current {
        writeln!(out, "  {:<20} {:<9} {}", s.setting.label, on_off(s.enabled), s.setting.path)?;
    }
    Ok(())
}

pub fn info(out: &mut impl Write, report: &InfoReport) -> io::Result<()> {
    for result in &report.environment {
        writeln!(out, "{}:", result.check.label)?;
        match &result.output {
            Ok(text) => {
                for line in text.lines() {
                    writeln!(out, "  {line}")?;
                }
            }
            Err(e) => writeln!(out, "  error running \"{}\": {e}", result.check.command)?,
        }
    }
    writeln!(out)?;
    writeln!(out, "Override folders:")?;
    for f in &report.overrides {
        match &f.state {
            FolderState::Missing => writeln!(out, "  {:<32} missing", f.folder)?,
            FolderState::Empty => writeln!(out, "  {:<32} empty", f.folder)?,
            FolderState::NotEmpty { entries } => writeln!(
                out,
                "  {:<32} warning: not empty ({entries} entries)",
                f.folder
            )?,
            FolderState::Unreadable(e) => writeln!(out, "  {:<32} unreadable: {e}", f.folder)?,
        }
    }
    Ok(())
}

/// Shows the restore plan, then asks on the terminal unless `interactive` is off.
pub struct TerminalConfirm {
    pub interactive: bool,
}

impl Confirm for TerminalConfirm {
    fn confirm(&mut self, restore: &RestorePlan) -> modstate_core::Result<bool> {
        let mut stdout = io::stdout();
        plan(&mut stdout, restore)
            .map_err(|e| modstate_core::Error::Host(format!("write plan: {e}")))?;
        if self.interactive {
            LinePrompt::new(io::stdin().lock(), io::stdout()).confirm(restore)
        } else {
            AutoConfirm.confirm(restore)
        }
    }
}
