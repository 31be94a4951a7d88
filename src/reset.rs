//! Hard reset / power down through the management layer.
//!
//! One synchronous pass: open a session, discover, walk every resource and its
//! records, set the digital reset control, close. Open and discovery failures
//! are fatal. Resources without records are skipped. A failed RDR lookup ends
//! the walk of that resource only; a failed RPT lookup or a rejected control set
//! ends the whole walk. Nothing is retried.

use crate::config::DEFAULT_RESET_CONTROL;
use crate::error::{MgmtError, Result};
use crate::hpi::{
    Capabilities, ControlNum, ControlState, ControlType, DigitalState, DomainInfo, EntryId,
    HpiProvider, HpiSession, RecordId, ResourceId,
};
use std::fmt;

/// What to do with the chassis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetAction {
    #[default]
    HardReset,
    PowerDown,
}

impl ResetAction {
    /// Digital state written to the reset control.
    pub fn digital_state(self) -> DigitalState {
        match self {
            ResetAction::HardReset => DigitalState::On,
            ResetAction::PowerDown => DigitalState::Off,
        }
    }
}

impl fmt::Display for ResetAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResetAction::HardReset => f.write_str("hard reset"),
            ResetAction::PowerDown => f.write_str("power down"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetOptions {
    pub action: ResetAction,
    /// Number of the digital control that performs the reset.
    pub control_num: ControlNum,
}

impl Default for ResetOptions {
    fn default() -> Self {
        Self {
            action: ResetAction::default(),
            control_num: ControlNum(DEFAULT_RESET_CONTROL),
        }
    }
}

/// Result of one attempt to set a reset control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlOutcome {
    pub resource_id: ResourceId,
    pub record_id: RecordId,
    pub num: ControlNum,
    pub id_string: String,
    pub result: std::result::Result<(), String>,
}

/// Summary of a reset run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResetReport {
    pub domain: DomainInfo,
    pub resources_seen: usize,
    pub controls: Vec<ControlOutcome>,
    /// Resources whose record walk stopped on a failed lookup.
    pub incomplete: Vec<(ResourceId, String)>,
    /// Why the walk ended before the last entry, if it did.
    pub aborted: Option<String>,
}

impl ResetReport {
    /// True when at least one reset control accepted the new state.
    pub fn any_control_set(&self) -> bool {
        self.controls.iter().any(|c| c.result.is_ok())
    }
}

/// Open a session on `provider` and apply `options` to every matching control.
pub fn run_reset(provider: &dyn HpiProvider, options: &ResetOptions) -> Result<ResetReport> {
    let mut session = provider
        .open()
        .map_err(|e| promote(e, MgmtError::session_open))?;
    log::debug!("Management session opened");

    let result = reset_with_session(session.as_mut(), options);

    if let Err(err) = session.close() {
        log::warn!("Closing management session failed: {err}");
    }
    result
}

/// Run discovery and the resource walk on an already open session.
///
/// The caller keeps ownership of the session and closes it.
pub fn reset_with_session(
    session: &mut dyn HpiSession,
    options: &ResetOptions,
) -> Result<ResetReport> {
    session
        .discover()
        .map_err(|e| promote(e, MgmtError::discovery))?;

    let domain = session
        .domain_info()
        .map_err(|e| promote(e, MgmtError::discovery))?;
    log::info!(
        "RptInfo: update count = {}, update time = {:#x}",
        domain.update_count,
        domain.update_timestamp
    );

    let mut report = ResetReport {
        domain,
        ..ResetReport::default()
    };

    if let Err(err) = walk_resources(session, options, &mut report) {
        log::warn!("Resource walk ended early: {err}");
        report.aborted = Some(err.to_string());
    }

    Ok(report)
}

/// Keep session-level errors as they are; wrap anything else in `wrap`.
fn promote(err: MgmtError, wrap: fn(String) -> MgmtError) -> MgmtError {
    if err.is_session_failure() {
        err
    } else {
        wrap(err.to_string())
    }
}

fn walk_resources(
    session: &mut dyn HpiSession,
    options: &ResetOptions,
    report: &mut ResetReport,
) -> Result<()> {
    let mut entry = EntryId::First;
    while entry != EntryId::Last {
        let (rpt, next) = session.rpt_entry(entry)?;
        report.resources_seen += 1;
        log::info!(
            "rptentry[{}] resourceid={} tag: {}",
            rpt.entry_id,
            rpt.resource_id,
            rpt.tag
        );

        if rpt.capabilities.contains(Capabilities::RDR) {
            walk_records(session, rpt.resource_id, options, report)?;
        } else {
            log::debug!("Resource {} has no records", rpt.resource_id);
        }
        entry = next;
    }
    Ok(())
}

fn walk_records(
    session: &mut dyn HpiSession,
    resource: ResourceId,
    options: &ResetOptions,
    report: &mut ResetReport,
) -> Result<()> {
    let mut entry = EntryId::First;
    while entry != EntryId::Last {
        let (rdr, next) = match session.rdr(resource, entry) {
            Ok(found) => found,
            Err(err) if err.is_session_failure() => return Err(err),
            Err(err) => {
                log::warn!("Records of resource {resource} skipped: {err}");
                report.incomplete.push((resource, err.to_string()));
                return Ok(());
            }
        };
        log::debug!("rdr[{entry}] of resource {resource}: {}", rdr.id_string);

        if let Some(control) = rdr.control() {
            log::debug!(
                "Ctl[{}]: {:?} {:?} oem={:#x} {}",
                control.num,
                control.control_type,
                control.output_type,
                control.oem,
                rdr.id_string
            );

            if control.num == options.control_num && control.control_type == ControlType::Digital
            {
                let state = ControlState::Digital(options.action.digital_state());
                let result = session.set_control_state(resource, control.num, state);

                report.controls.push(ControlOutcome {
                    resource_id: resource,
                    record_id: rdr.record_id,
                    num: control.num,
                    id_string: rdr.id_string.clone(),
                    result: result.as_ref().map_err(|e| e.to_string()).copied(),
                });

                result?;
                log::info!(
                    "RDR[{}]: {} via control {} ({})",
                    rdr.record_id,
                    options.action,
                    control.num,
                    rdr.id_string
                );
            }
        }

        entry = next;
    }
    Ok(())
}
