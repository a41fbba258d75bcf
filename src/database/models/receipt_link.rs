use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptLink {
    pub link_id: i64,
    pub receipt_id: i64,
    pub entry_kind: String,
    pub entry_id: i64,
    pub created_at: DateTime<Utc>,
}

/// The kinds of cost entry a receipt can be attached to. Link requests carry
/// one of these tags; anything outside the list is rejected up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Timesheet,
    EquipmentLog,
    SubcontractorEntry,
    OverheadEntry,
    Material,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Timesheet => "timesheet",
            EntryKind::EquipmentLog => "equipment_log",
            EntryKind::SubcontractorEntry => "subcontractor_entry",
            EntryKind::OverheadEntry => "overhead_entry",
            EntryKind::Material => "material",
        }
    }
}

impl FromStr for EntryKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "timesheet" => Ok(EntryKind::Timesheet),
            "equipment_log" => Ok(EntryKind::EquipmentLog),
            "subcontractor_entry" => Ok(EntryKind::SubcontractorEntry),
            "overhead_entry" => Ok(EntryKind::OverheadEntry),
            "material" => Ok(EntryKind::Material),
            _ => Err(()),
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_kind_round_trips_through_str() {
        for kind in [
            EntryKind::Timesheet,
            EntryKind::EquipmentLog,
            EntryKind::SubcontractorEntry,
            EntryKind::OverheadEntry,
            EntryKind::Material,
        ] {
            assert_eq!(kind.as_str().parse::<EntryKind>(), Ok(kind));
        }
    }

    #[test]
    fn unknown_entry_kind_is_rejected() {
        assert!("invoice".parse::<EntryKind>().is_err());
        assert!("".parse::<EntryKind>().is_err());
    }
}
