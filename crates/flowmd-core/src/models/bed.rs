//! Procedure bed models.

use serde::{Deserialize, Serialize};

/// Where a bed is in the procedure cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum BedStatus {
    #[default]
    Available,
    #[serde(rename = "Pre-op")]
    PreOp,
    Procedure,
    #[serde(rename = "Post-op")]
    PostOp,
    Discharge,
}

impl BedStatus {
    /// The next status in the cycle; Discharge wraps to Available.
    pub fn next(&self) -> BedStatus {
        match self {
            BedStatus::Available => BedStatus::PreOp,
            BedStatus::PreOp => BedStatus::Procedure,
            BedStatus::Procedure => BedStatus::PostOp,
            BedStatus::PostOp => BedStatus::Discharge,
            BedStatus::Discharge => BedStatus::Available,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BedStatus::Available => "Available",
            BedStatus::PreOp => "Pre-op",
            BedStatus::Procedure => "Procedure",
            BedStatus::PostOp => "Post-op",
            BedStatus::Discharge => "Discharge",
        }
    }

    /// Checklist a bed starts with on entering this status.
    pub fn checklist(&self) -> Vec<ChecklistItem> {
        let labels: &[&str] = match self {
            BedStatus::PreOp => &["Consent Signed", "Vitals Recorded", "Fast Check (NPO)"],
            BedStatus::PostOp => &[
                "Recovered from Anesthesia",
                "Pain Managed",
                "Post-op Vitals Stable",
            ],
            _ => &[],
        };
        labels
            .iter()
            .enumerate()
            .map(|(i, label)| ChecklistItem {
                id: format!("c{}", i + 1),
                label: label.to_string(),
                completed: false,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChecklistItem {
    pub id: String,
    pub label: String,
    pub completed: bool,
}

/// A procedure bed and its current occupant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Bed {
    pub id: String,
    pub label: String,
    pub status: BedStatus,
    pub patient_name: Option<String>,
    /// Wall-clock time the current occupant arrived, e.g. "10:30 AM"
    pub time_started: Option<String>,
    pub checklist: Vec<ChecklistItem>,
    pub summary: Option<String>,
}

impl Bed {
    pub fn new(index: usize) -> Self {
        Self {
            id: format!("B{}", index),
            label: format!("Bed {}", index),
            status: BedStatus::Available,
            patient_name: None,
            time_started: None,
            checklist: Vec::new(),
            summary: None,
        }
    }

    pub fn is_occupied(&self) -> bool {
        self.status != BedStatus::Available
    }

    pub fn completed_items(&self) -> Vec<String> {
        self.checklist
            .iter()
            .filter(|c| c.completed)
            .map(|c| c.label.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_cycle_wraps() {
        let mut status = BedStatus::Available;
        for _ in 0..5 {
            status = status.next();
        }
        assert_eq!(status, BedStatus::Available);
    }

    #[test]
    fn test_checklists() {
        assert_eq!(BedStatus::PreOp.checklist()[2].label, "Fast Check (NPO)");
        assert_eq!(BedStatus::PostOp.checklist().len(), 3);
        assert!(BedStatus::Procedure.checklist().is_empty());
    }

    #[test]
    fn test_status_serializes_with_hyphen() {
        assert_eq!(serde_json::to_string(&BedStatus::PreOp).unwrap(), "\"Pre-op\"");
        assert_eq!(BedStatus::PostOp.label(), "Post-op");
    }
}
