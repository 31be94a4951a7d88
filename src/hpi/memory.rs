//! In-process management domain.
//!
//! `MemoryDomain` holds a resource table described by a TOML file and serves it
//! through the [`HpiSession`] cursor protocol. Control state changes are recorded
//! so the outcome of a run can be inspected. Failures can be injected per domain
//! (`fail_on_open`, `fail_on_discover`) and per control (`fail_set`).
//!
//! ```toml
//! update_count = 2
//!
//! [[resource]]
//! id = 1
//! tag = "Chassis"
//! capabilities = ["reset", "control", "rdr"]
//!
//! [[resource.rdr]]
//! type = "control"
//! id_string = "Chassis Reset"
//! num = 1
//! control_type = "digital"
//! ```

use crate::error::{MgmtError, Result};
use crate::hpi::types::{
    Capabilities, ControlNum, ControlRecord, ControlState, ControlType, DigitalState, DomainInfo,
    EntryId, OutputType, Rdr, RdrKind, RecordId, ResourceId, RptEntry,
};
use crate::hpi::{HpiProvider, HpiSession};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DomainSpec {
    #[serde(default)]
    fail_on_open: bool,
    #[serde(default)]
    fail_on_discover: bool,
    #[serde(default)]
    update_count: u32,
    #[serde(default)]
    update_timestamp: i64,
    #[serde(default)]
    resource: Vec<ResourceSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ResourceSpec {
    id: ResourceId,
    #[serde(default)]
    tag: String,
    #[serde(default)]
    capabilities: Vec<String>,
    #[serde(default)]
    rdr: Vec<RdrSpec>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RdrType {
    Control,
    Sensor,
    Inventory,
    Watchdog,
    Annunciator,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RdrSpec {
    #[serde(rename = "type")]
    rdr_type: RdrType,
    record_id: Option<RecordId>,
    #[serde(default)]
    id_string: String,
    #[serde(default)]
    num: u32,
    control_type: Option<ControlType>,
    #[serde(default)]
    output_type: OutputType,
    #[serde(default)]
    oem: u32,
    /// Initial state of a digital control.
    state: Option<DigitalState>,
    #[serde(default)]
    fail_set: bool,
}

#[derive(Debug)]
struct RecordSlot {
    rdr: Rdr,
    fail_set: bool,
}

#[derive(Debug)]
struct Resource {
    entry: RptEntry,
    records: Vec<RecordSlot>,
    states: HashMap<ControlNum, ControlState>,
}

#[derive(Debug)]
struct DomainState {
    info: DomainInfo,
    fail_on_open: bool,
    fail_on_discover: bool,
    resources: Vec<Resource>,
    control_log: Vec<(ResourceId, ControlNum, ControlState)>,
    open_sessions: usize,
}

/// Entry ids are 1-based positions; `First` is position 0.
fn position(entry: EntryId) -> Option<usize> {
    match entry {
        EntryId::First => Some(0),
        EntryId::Id(0) | EntryId::Last => None,
        EntryId::Id(id) => Some(id as usize - 1),
    }
}

fn next_entry(index: usize, len: usize) -> EntryId {
    if index + 1 < len {
        EntryId::Id(index as u32 + 2)
    } else {
        EntryId::Last
    }
}

impl DomainState {
    fn from_spec(spec: DomainSpec) -> std::result::Result<Self, String> {
        let mut resources = Vec::with_capacity(spec.resource.len());

        for (index, resource) in spec.resource.into_iter().enumerate() {
            let mut capabilities = Capabilities::empty();
            for name in &resource.capabilities {
                capabilities |= Capabilities::from_domain_name(name).ok_or_else(|| {
                    format!("resource {}: unknown capability {name:?}", resource.id)
                })?;
            }

            let mut records = Vec::with_capacity(resource.rdr.len());
            let mut states = HashMap::new();
            for (rdr_index, rdr_spec) in resource.rdr.into_iter().enumerate() {
                let record_id = rdr_spec.record_id.unwrap_or(RecordId(rdr_index as u32 + 1));
                let kind = match rdr_spec.rdr_type {
                    RdrType::Control => {
                        let control_type = rdr_spec.control_type.ok_or_else(|| {
                            format!(
                                "resource {}: control record {record_id} needs control_type",
                                resource.id
                            )
                        })?;
                        if let Some(state) = rdr_spec.state {
                            states.insert(ControlNum(rdr_spec.num), ControlState::Digital(state));
                        }
                        RdrKind::Control(ControlRecord {
                            num: ControlNum(rdr_spec.num),
                            control_type,
                            output_type: rdr_spec.output_type,
                            oem: rdr_spec.oem,
                        })
                    }
                    RdrType::Sensor => RdrKind::Sensor { num: rdr_spec.num },
                    RdrType::Inventory => RdrKind::Inventory { num: rdr_spec.num },
                    RdrType::Watchdog => RdrKind::Watchdog { num: rdr_spec.num },
                    RdrType::Annunciator => RdrKind::Annunciator { num: rdr_spec.num },
                };
                records.push(RecordSlot {
                    rdr: Rdr {
                        record_id,
                        id_string: rdr_spec.id_string,
                        kind,
                    },
                    fail_set: rdr_spec.fail_set,
                });
            }

            resources.push(Resource {
                entry: RptEntry {
                    entry_id: EntryId::Id(index as u32 + 1),
                    resource_id: resource.id,
                    tag: resource.tag,
                    capabilities,
                },
                records,
                states,
            });
        }

        Ok(Self {
            info: DomainInfo {
                update_count: spec.update_count,
                update_timestamp: spec.update_timestamp,
            },
            fail_on_open: spec.fail_on_open,
            fail_on_discover: spec.fail_on_discover,
            resources,
            control_log: Vec::new(),
            open_sessions: 0,
        })
    }

    fn resource(&self, id: ResourceId) -> Result<&Resource> {
        self.resources
            .iter()
            .find(|r| r.entry.resource_id == id)
            .ok_or_else(|| MgmtError::entry_not_found(format!("resource {id}")))
    }
}

/// A management domain held in memory. Clones share the same state.
#[derive(Debug, Clone)]
pub struct MemoryDomain {
    state: Arc<Mutex<DomainState>>,
}

impl MemoryDomain {
    /// Build a domain from its TOML description.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Self::parse(text).map_err(|message| MgmtError::domain_file("<inline>", message))
    }

    /// Load a domain description file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| MgmtError::domain_file(path, e.to_string()))?;
        Self::parse(&text).map_err(|message| MgmtError::domain_file(path, message))
    }

    fn parse(text: &str) -> std::result::Result<Self, String> {
        let spec: DomainSpec = toml::from_str(text).map_err(|e| e.message().to_string())?;
        let state = DomainState::from_spec(spec)?;
        Ok(Self {
            state: Arc::new(Mutex::new(state)),
        })
    }

    /// Current state of a control, if it was ever set or initialized.
    pub fn control_state(&self, resource: ResourceId, num: ControlNum) -> Option<ControlState> {
        let state = self.state.lock();
        state
            .resource(resource)
            .ok()
            .and_then(|r| r.states.get(&num).copied())
    }

    /// Every successful control state change, in order.
    pub fn control_log(&self) -> Vec<(ResourceId, ControlNum, ControlState)> {
        self.state.lock().control_log.clone()
    }

    /// Sessions opened and not yet closed.
    pub fn open_sessions(&self) -> usize {
        self.state.lock().open_sessions
    }
}

impl HpiProvider for MemoryDomain {
    fn open(&self) -> Result<Box<dyn HpiSession>> {
        let mut state = self.state.lock();
        if state.fail_on_open {
            return Err(MgmtError::session_open("domain refused the session"));
        }
        state.open_sessions += 1;
        Ok(Box::new(MemorySession {
            state: Arc::clone(&self.state),
            discovered: false,
            closed: false,
        }))
    }
}

/// Session against a [`MemoryDomain`].
///
/// The RPT is empty until [`discover`](HpiSession::discover) runs.
#[derive(Debug)]
pub struct MemorySession {
    state: Arc<Mutex<DomainState>>,
    discovered: bool,
    closed: bool,
}

impl MemorySession {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(MgmtError::SessionClosed)
        } else {
            Ok(())
        }
    }
}

impl HpiSession for MemorySession {
    fn discover(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.state.lock().fail_on_discover {
            return Err(MgmtError::discovery("domain discovery timed out"));
        }
        self.discovered = true;
        Ok(())
    }

    fn domain_info(&self) -> Result<DomainInfo> {
        self.ensure_open()?;
        Ok(self.state.lock().info)
    }

    fn rpt_entry(&self, entry: EntryId) -> Result<(RptEntry, EntryId)> {
        self.ensure_open()?;
        let state = self.state.lock();
        let len = if self.discovered {
            state.resources.len()
        } else {
            0
        };

        match position(entry) {
            Some(index) if index < len => Ok((
                state.resources[index].entry.clone(),
                next_entry(index, len),
            )),
            _ => Err(MgmtError::entry_not_found(format!("rpt entry {entry}"))),
        }
    }

    fn rdr(&self, resource: ResourceId, entry: EntryId) -> Result<(Rdr, EntryId)> {
        self.ensure_open()?;
        let state = self.state.lock();
        let records = &state.resource(resource)?.records;

        match position(entry) {
            Some(index) if index < records.len() => Ok((
                records[index].rdr.clone(),
                next_entry(index, records.len()),
            )),
            _ => Err(MgmtError::entry_not_found(format!(
                "rdr {entry} of resource {resource}"
            ))),
        }
    }

    fn set_control_state(
        &mut self,
        resource: ResourceId,
        num: ControlNum,
        new_state: ControlState,
    ) -> Result<()> {
        self.ensure_open()?;
        let mut state = self.state.lock();
        let control_set_error = |message: &str| MgmtError::ControlSet {
            resource: resource.0,
            num: num.0,
            message: message.to_string(),
        };

        let target = state
            .resources
            .iter_mut()
            .find(|r| r.entry.resource_id == resource)
            .ok_or_else(|| MgmtError::entry_not_found(format!("resource {resource}")))?;

        let slot = target
            .records
            .iter()
            .find(|slot| slot.rdr.control().is_some_and(|c| c.num == num))
            .ok_or_else(|| control_set_error("no such control"))?;
        let record = slot
            .rdr
            .control()
            .copied()
            .ok_or_else(|| control_set_error("no such control"))?;

        let type_matches = matches!(
            (record.control_type, new_state),
            (ControlType::Digital, ControlState::Digital(_))
                | (ControlType::Discrete, ControlState::Discrete(_))
                | (ControlType::Analog, ControlState::Analog(_))
        );
        if !type_matches {
            return Err(control_set_error("state does not match control type"));
        }
        if slot.fail_set {
            return Err(control_set_error("control rejected the request"));
        }

        target.states.insert(num, new_state);
        state.control_log.push((resource, num, new_state));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.closed = true;
        let mut state = self.state.lock();
        state.open_sessions = state.open_sessions.saturating_sub(1);
        Ok(())
    }
}
