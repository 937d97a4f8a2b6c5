//! Disable / enable / status flows for one module group.
//!
//! Each flow holds the group's snapshot session for its whole duration, so
//! two invocations against the same group cannot interleave.

use crate::group::ModuleGroup;
use crate::prompt::Confirm;
use crate::registry::{ModuleEnabler, ModuleRegistry, ModuleState};
use crate::snapshot::{CaptureOutcome, CleanupWarning, ModuleSnapshot, SnapshotStore};
use crate::{Error, Result};
use std::path::PathBuf;

/// Result of a flow that did not fail.
#[derive(Debug)]
pub enum Outcome<T> {
    /// Nothing needed doing; module state is unchanged.
    NoOp(NoOpReason),
    Success(T),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoOpReason {
    /// The registry has no module in this group.
    NoModules,
    AlreadyDisabled,
    /// There is no snapshot; run the disable flow first.
    NothingToRestore { path: PathBuf },
    /// The snapshot exists but lists no module.
    EmptySnapshot { path: PathBuf },
    /// The operator declined the confirmation prompt.
    Declined,
}

#[derive(Debug)]
pub struct DisableReport {
    pub group: String,
    /// Every group member with its state before the disable.
    pub before: Vec<ModuleState>,
    /// The modules that were switched off, as recorded in the snapshot.
    pub disabled: Vec<String>,
    pub state_file: PathBuf,
}

/// What a restore is about to do; shown to the operator before confirming.
#[derive(Debug, Clone)]
pub struct RestorePlan {
    pub group: String,
    pub snapshot: ModuleSnapshot,
    pub rows: Vec<PlanRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanRow {
    pub name: String,
    pub enabled_now: bool,
    pub will_enable: bool,
}

impl RestorePlan {
    pub fn question(&self) -> String {
        format!(
            "Are you sure you want to enable {} module(s) of group `{}`?",
            self.snapshot.enabled_modules.len(),
            self.group
        )
    }
}

#[derive(Debug)]
pub struct EnableReport {
    pub group: String,
    pub enabled: Vec<String>,
    pub taken_at: String,
    pub state_file: PathBuf,
    /// Set when the snapshot could not be deleted after the restore.
    pub cleanup_warning: Option<CleanupWarning>,
}

#[derive(Debug)]
pub enum SnapshotState {
    Absent,
    Present(ModuleSnapshot),
    Corrupt(String),
    /// Another invocation is working on this group right now.
    Busy,
}

#[derive(Debug)]
pub struct GroupStatus {
    pub group: String,
    pub modules: Vec<ModuleState>,
    pub state_file: PathBuf,
    pub snapshot: SnapshotState,
}

/// Record the enabled members of `group`, then disable them.
///
/// If the snapshot cannot be written no module is touched. If the host fails
/// to disable, the snapshot stays so the operator can retry or restore.
pub fn disable_group(
    group: &ModuleGroup,
    store: &SnapshotStore,
    registry: &dyn ModuleRegistry,
    enabler: &dyn ModuleEnabler,
) -> Result<Outcome<DisableReport>> {
    let session = store.session(group)?;

    let members = group.members(registry)?;
    if members.is_empty() {
        tracing::info!(group = %group.name, "no modules in group");
        return Ok(Outcome::NoOp(NoOpReason::NoModules));
    }
    let before = registry.states(&members)?;
    let enabled: Vec<String> = before
        .iter()
        .filter(|m| m.enabled)
        .map(|m| m.name.clone())
        .collect();
    if enabled.is_empty() {
        tracing::info!(group = %group.name, "all modules already disabled");
        return Ok(Outcome::NoOp(NoOpReason::AlreadyDisabled));
    }

    let disabled = match session.capture(&enabled)? {
        CaptureOutcome::Written { snapshot, .. } => snapshot.enabled_modules,
        CaptureOutcome::NothingToCapture => {
            return Ok(Outcome::NoOp(NoOpReason::AlreadyDisabled))
        }
    };

    tracing::info!(group = %group.name, count = disabled.len(), "disabling modules");
    enabler.set_enabled(false, &disabled)?;

    Ok(Outcome::Success(DisableReport {
        group: group.name.clone(),
        before,
        disabled,
        state_file: session.path().to_path_buf(),
    }))
}

/// Re-enable exactly the modules recorded by the last [`disable_group`].
///
/// The snapshot is only removed after the host reports success, so a failed
/// or declined restore can simply be run again.
pub fn enable_group(
    group: &ModuleGroup,
    store: &SnapshotStore,
    registry: &dyn ModuleRegistry,
    enabler: &dyn ModuleEnabler,
    confirm: &mut dyn Confirm,
) -> Result<Outcome<EnableReport>> {
    let session = store.session(group)?;

    let snapshot = match session.load() {
        Ok(s) => s,
        Err(Error::NotFound { path, .. }) => {
            tracing::info!(group = %group.name, "no snapshot to restore");
            return Ok(Outcome::NoOp(NoOpReason::NothingToRestore { path }));
        }
        Err(e) => return Err(e),
    };
    if snapshot.enabled_modules.is_empty() {
        tracing::warn!(group = %group.name, "snapshot lists no modules");
        return Ok(Outcome::NoOp(NoOpReason::EmptySnapshot {
            path: session.path().to_path_buf(),
        }));
    }

    let plan = restore_plan(group, registry, snapshot)?;
    if !confirm.confirm(&plan)? {
        tracing::info!(group = %group.name, "restore declined");
        return Ok(Outcome::NoOp(NoOpReason::Declined));
    }

    let modules = plan.snapshot.enabled_modules;
    tracing::info!(group = %group.name, count = modules.len(), "enabling modules");
    enabler.set_enabled(true, &modules)?;

    let cleanup_warning = session.discard().err();
    Ok(Outcome::Success(EnableReport {
        group: group.name.clone(),
        enabled: modules,
        taken_at: plan.snapshot.taken_at.unwrap_or_else(|| "unknown".into()),
        state_file: session.path().to_path_buf(),
        cleanup_warning,
    }))
}

fn restore_plan(
    group: &ModuleGroup,
    registry: &dyn ModuleRegistry,
    snapshot: ModuleSnapshot,
) -> Result<RestorePlan> {
    let mut names = group.members(registry)?;
    for m in &snapshot.enabled_modules {
        if !names.contains(m) {
            names.push(m.clone());
        }
    }
    let mut rows = Vec::with_capacity(names.len());
    for name in names {
        rows.push(PlanRow {
            enabled_now: registry.is_enabled(&name)?,
            will_enable: snapshot.enabled_modules.contains(&name),
            name,
        });
    }
    Ok(RestorePlan {
        group: group.name.clone(),
        snapshot,
        rows,
    })
}

/// Current member states plus whatever snapshot is on disk.
pub fn group_status(
    group: &ModuleGroup,
    store: &SnapshotStore,
    registry: &dyn ModuleRegistry,
) -> Result<GroupStatus> {
    let members = group.members(registry)?;
    let modules = registry.states(&members)?;

    let snapshot = match store.load(group) {
        Ok(s) => SnapshotState::Present(s),
        Err(Error::NotFound { .. }) => SnapshotState::Absent,
        Err(Error::CorruptSnapshot { reason, .. }) => SnapshotState::Corrupt(reason),
        Err(Error::Locked { .. }) => SnapshotState::Busy,
        Err(e) => return Err(e),
    };

    Ok(GroupStatus {
        group: group.name.clone(),
        modules,
        state_file: store.path_for(group),
        snapshot,
    })
}
