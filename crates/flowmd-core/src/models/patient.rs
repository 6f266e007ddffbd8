//! Patient models.

use serde::{Deserialize, Serialize};

/// Severity of a condition on the clinical journey.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
    Chronic,
}

/// One dated entry on a patient's clinical journey.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JourneyEntry {
    pub condition: String,
    /// Onset date, YYYY-MM-DD
    pub onset_date: String,
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    #[default]
    Stable,
    Worsening,
}

/// Coverage eligibility as last checked with the payer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Eligibility {
    Verified,
    #[default]
    Pending,
    Denied,
}

/// Status of the patient's most recent claim.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ClaimStatus {
    Draft,
    Submitted,
    Paid,
    #[default]
    #[serde(rename = "None")]
    NotFiled,
}

/// A patient record. Read-only from the session's point of view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub gender: String,
    /// Last visit date, YYYY-MM-DD
    pub last_visit: String,
    /// Flat condition list, used as model input
    pub history: Vec<String>,
    /// Structured history for the timeline
    #[serde(default)]
    pub journey: Vec<JourneyEntry>,
    #[serde(default)]
    pub trend: Trend,
    #[serde(default)]
    pub eligibility: Eligibility,
    #[serde(default)]
    pub claim_status: ClaimStatus,
}

impl Patient {
    /// Create a patient with the required fields and neutral defaults.
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            age: 0,
            gender: String::new(),
            last_visit: String::new(),
            history: Vec::new(),
            journey: Vec::new(),
            trend: Trend::default(),
            eligibility: Eligibility::default(),
            claim_status: ClaimStatus::default(),
        }
    }

    pub fn with_history(mut self, history: &[&str]) -> Self {
        self.history = history.iter().map(|h| h.to_string()).collect();
        self
    }

    /// Every known condition: the flat history plus journey conditions not already in it.
    pub fn conditions(&self) -> Vec<String> {
        let mut out = self.history.clone();
        for entry in &self.journey {
            if !out.iter().any(|c| c.eq_ignore_ascii_case(&entry.condition)) {
                out.push(entry.condition.clone());
            }
        }
        out
    }

    pub fn is_eligible(&self) -> bool {
        self.eligibility == Eligibility::Verified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_patient() {
        let patient = Patient::new("7", "Ada Lovelace");
        assert_eq!(patient.name, "Ada Lovelace");
        assert_eq!(patient.claim_status, ClaimStatus::NotFiled);
        assert!(!patient.is_eligible());
    }

    #[test]
    fn test_conditions_merge_journey() {
        let mut patient = Patient::new("1", "John Doe").with_history(&["Hypertension"]);
        patient.journey = vec![
            JourneyEntry {
                condition: "hypertension".into(),
                onset_date: "2019-04-01".into(),
                severity: Some(Severity::Chronic),
            },
            JourneyEntry {
                condition: "Type 2 Diabetes".into(),
                onset_date: "2021-01-15".into(),
                severity: None,
            },
        ];
        assert_eq!(patient.conditions(), vec!["Hypertension", "Type 2 Diabetes"]);
    }

    #[test]
    fn test_claim_status_serializes_as_none() {
        let json = serde_json::to_string(&ClaimStatus::NotFiled).unwrap();
        assert_eq!(json, "\"None\"");
        let trend: Trend = serde_json::from_str("\"worsening\"").unwrap();
        assert_eq!(trend, Trend::Worsening);
    }
}
