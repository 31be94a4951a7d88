//! Record types exchanged with a management domain.
//!
//! These mirror the resource presence table (RPT) and resource data record (RDR)
//! shapes of the platform management API, reduced to what the tools read.

use bitflags::bitflags;
use serde::Deserialize;
use std::fmt;

/// Cursor for RPT and RDR walks.
///
/// A lookup at `First` returns the first entry; every lookup also returns the id
/// of the entry after it, which is `Last` for the final entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryId {
    First,
    Id(u32),
    Last,
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryId::First => f.write_str("first"),
            EntryId::Id(id) => write!(f, "{id}"),
            EntryId::Last => f.write_str("last"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct ControlNum(pub u32);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ControlNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// RPT bookkeeping returned after discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DomainInfo {
    pub update_count: u32,
    /// Seconds since the epoch of the last RPT change.
    pub update_timestamp: i64,
}

bitflags! {
    /// Resource capabilities advertised in an RPT entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Capabilities: u32 {
        const RESET   = 0b0000_0001;
        const POWER   = 0b0000_0010;
        const CONTROL = 0b0000_0100;
        const SENSOR  = 0b0000_1000;
        const RDR     = 0b0001_0000;
    }
}

impl Capabilities {
    /// Parse a capability by its lowercase name, as written in domain files.
    pub fn from_domain_name(name: &str) -> Option<Self> {
        match name {
            "reset" => Some(Self::RESET),
            "power" => Some(Self::POWER),
            "control" => Some(Self::CONTROL),
            "sensor" => Some(Self::SENSOR),
            "rdr" => Some(Self::RDR),
            _ => None,
        }
    }
}

/// Resource presence table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RptEntry {
    pub entry_id: EntryId,
    pub resource_id: ResourceId,
    pub tag: String,
    pub capabilities: Capabilities,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlType {
    Digital,
    Discrete,
    Analog,
    Stream,
    Text,
    Oem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputType {
    #[default]
    Generic,
    Led,
    FanSpeed,
    DryContactClosure,
    PowerSupplyInhibit,
    AudibleAlarm,
    FrontPanelLockout,
    PowerInterlock,
    PowerState,
    LcdDisplay,
    Oem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigitalState {
    Off,
    On,
    PulseOff,
    PulseOn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    Digital(DigitalState),
    Discrete(u32),
    Analog(i32),
}

/// Control descriptor carried by a control RDR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlRecord {
    pub num: ControlNum,
    pub control_type: ControlType,
    pub output_type: OutputType,
    pub oem: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RdrKind {
    Control(ControlRecord),
    Sensor { num: u32 },
    Inventory { num: u32 },
    Watchdog { num: u32 },
    Annunciator { num: u32 },
}

/// Resource data record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rdr {
    pub record_id: RecordId,
    pub id_string: String,
    pub kind: RdrKind,
}

impl Rdr {
    /// The control descriptor, if this record describes a control.
    pub fn control(&self) -> Option<&ControlRecord> {
        match &self.kind {
            RdrKind::Control(record) => Some(record),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_names() {
        assert_eq!(Capabilities::from_domain_name("reset"), Some(Capabilities::RESET));
        assert_eq!(Capabilities::from_domain_name("rdr"), Some(Capabilities::RDR));
        assert_eq!(Capabilities::from_domain_name("fru"), None);
    }

    #[test]
    fn rdr_control_accessor() {
        let control = Rdr {
            record_id: RecordId(5),
            id_string: "Chassis Reset".to_string(),
            kind: RdrKind::Control(ControlRecord {
                num: ControlNum(1),
                control_type: ControlType::Digital,
                output_type: OutputType::Generic,
                oem: 0,
            }),
        };
        assert_eq!(control.control().map(|c| c.num), Some(ControlNum(1)));

        let sensor = Rdr {
            record_id: RecordId(6),
            id_string: "Temp".to_string(),
            kind: RdrKind::Sensor { num: 2 },
        };
        assert!(sensor.control().is_none());
    }

    #[test]
    fn entry_id_display() {
        assert_eq!(EntryId::First.to_string(), "first");
        assert_eq!(EntryId::Id(9).to_string(), "9");
        assert_eq!(EntryId::Last.to_string(), "last");
    }
}
