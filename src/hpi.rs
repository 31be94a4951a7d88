//! Platform management abstraction layer.
//!
//! The management library is an external collaborator: this module only defines
//! the calls the tools make against it. [`HpiSession`] is the seam; backends
//! implement it and hand out sessions through [`HpiProvider`].

use crate::config::HpiConfig;
use crate::error::{MgmtError, Result};
use std::path::Path;

pub mod memory;
pub mod types;

pub use memory::{MemoryDomain, MemorySession};
pub use types::{
    Capabilities, ControlNum, ControlRecord, ControlState, ControlType, DigitalState, DomainInfo,
    EntryId, OutputType, Rdr, RdrKind, RecordId, ResourceId, RptEntry,
};

/// An open management session.
///
/// Every call blocks until the domain answers. After [`close`](Self::close) all
/// further calls fail with [`MgmtError::SessionClosed`].
pub trait HpiSession: Send {
    /// Run resource discovery so the RPT reflects the current hardware.
    fn discover(&mut self) -> Result<()>;

    /// RPT bookkeeping (update count and time).
    fn domain_info(&self) -> Result<DomainInfo>;

    /// Fetch the RPT entry at `entry`, together with the id of the next entry.
    fn rpt_entry(&self, entry: EntryId) -> Result<(RptEntry, EntryId)>;

    /// Fetch the RDR at `entry` for `resource`, together with the id of the next record.
    fn rdr(&self, resource: ResourceId, entry: EntryId) -> Result<(Rdr, EntryId)>;

    /// Set the state of control `num` on `resource`.
    fn set_control_state(
        &mut self,
        resource: ResourceId,
        num: ControlNum,
        state: ControlState,
    ) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}

/// Opens sessions against a management domain.
pub trait HpiProvider {
    fn open(&self) -> Result<Box<dyn HpiSession>>;
}

/// Build the provider for the configured domain.
///
/// `domain_override` (from the command line) wins over the config file entry.
pub fn provider_from_config(
    config: &HpiConfig,
    domain_override: Option<&Path>,
) -> Result<Box<dyn HpiProvider>> {
    let path = domain_override
        .or(config.domain_file.as_deref())
        .ok_or_else(|| {
            MgmtError::session_open(
                "no management domain configured (use --domain or hpi.domain_file)",
            )
        })?;

    log::debug!("Using management domain description {}", path.display());
    Ok(Box::new(MemoryDomain::load(path)?))
}
