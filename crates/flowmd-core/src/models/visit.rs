//! Visit session models.
//!
//! A [`VisitSession`] holds everything recorded for one patient encounter.
//! Transitions live in [`crate::session`]; this module only defines the data.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

pub use flowmd_llm::{Confidence, Medication};

/// Review of systems labels.
pub const ROS_SYSTEMS: &[&str] = &[
    "Constitutional",
    "Eyes",
    "ENT",
    "Cardiovascular",
    "Respiratory",
    "Gastrointestinal",
    "Genitourinary",
    "Musculoskeletal",
    "Skin",
    "Neurological",
    "Psychiatric",
];

/// Physical examination labels.
pub const EXAM_SYSTEMS: &[&str] = &[
    "General Appearance",
    "HEENT",
    "Neck",
    "Heart",
    "Lungs",
    "Abdomen",
    "Extremities",
    "Skin",
    "Neurological",
    "Psychiatric",
];

/// Recorded state of a finding. An absent entry means unset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FindingState {
    Normal,
    Finding,
}

/// Which finding map a label belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FindingSet {
    Ros,
    Exam,
}

impl FindingSet {
    pub fn labels(&self) -> &'static [&'static str] {
        match self {
            FindingSet::Ros => ROS_SYSTEMS,
            FindingSet::Exam => EXAM_SYSTEMS,
        }
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels().iter().any(|l| *l == label)
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            FindingSet::Ros => "ROS",
            FindingSet::Exam => "Exam",
        }
    }
}

/// A diagnosis the clinician has accepted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfirmedDiagnosis {
    /// ICD-10 code, unique within a session
    pub code: String,
    pub name: String,
}

/// The entity a plan entry was derived from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "key")]
pub enum PlanOrigin {
    /// Keyed by diagnosis code
    Diagnosis(String),
    PlanItem(String),
    Order(String),
    /// Keyed by medication id
    Medication(String),
}

/// One line of the structured plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanEntry {
    pub origin: PlanOrigin,
    pub text: String,
}

/// SOAP segment selector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKey {
    Subjective,
    Objective,
    Assessment,
    Plan,
}

impl SegmentKey {
    pub const ALL: [SegmentKey; 4] = [
        SegmentKey::Subjective,
        SegmentKey::Objective,
        SegmentKey::Assessment,
        SegmentKey::Plan,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SegmentKey::Subjective => "Subjective",
            SegmentKey::Objective => "Objective",
            SegmentKey::Assessment => "Assessment",
            SegmentKey::Plan => "Plan",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SoapSegment {
    pub content: String,
    pub confidence: Confidence,
    pub approved: bool,
}

/// The four-part SOAP draft.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SoapNote {
    pub subjective: SoapSegment,
    pub objective: SoapSegment,
    pub assessment: SoapSegment,
    pub plan: SoapSegment,
}

impl SoapNote {
    pub fn segment(&self, key: SegmentKey) -> &SoapSegment {
        match key {
            SegmentKey::Subjective => &self.subjective,
            SegmentKey::Objective => &self.objective,
            SegmentKey::Assessment => &self.assessment,
            SegmentKey::Plan => &self.plan,
        }
    }

    pub fn segment_mut(&mut self, key: SegmentKey) -> &mut SoapSegment {
        match key {
            SegmentKey::Subjective => &mut self.subjective,
            SegmentKey::Objective => &mut self.objective,
            SegmentKey::Assessment => &mut self.assessment,
            SegmentKey::Plan => &mut self.plan,
        }
    }

    pub fn is_empty(&self) -> bool {
        SegmentKey::ALL
            .iter()
            .all(|k| self.segment(*k).content.trim().is_empty())
    }
}

/// Speaker label as reported by the speech platform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SpeakerRole {
    Clinician,
    Patient,
    #[default]
    Unknown,
}

impl SpeakerRole {
    pub fn label(&self) -> &'static str {
        match self {
            SpeakerRole::Clinician => "Clinician",
            SpeakerRole::Patient => "Patient",
            SpeakerRole::Unknown => "Speaker",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranscriptSegment {
    pub speaker: SpeakerRole,
    pub text: String,
}

/// Everything recorded for one patient encounter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct VisitSession {
    pub patient_id: String,
    /// Selected symptoms; order carries no meaning
    pub symptoms: BTreeSet<String>,
    pub ros_findings: BTreeMap<String, FindingState>,
    pub exam_findings: BTreeMap<String, FindingState>,
    pub confirmed_diagnoses: Vec<ConfirmedDiagnosis>,
    pub plan_items: Vec<String>,
    pub orders: Vec<String>,
    pub medications: Vec<Medication>,
    /// Structured plan lines; the plan buffer is rendered from these
    pub plan_entries: Vec<PlanEntry>,
    pub soap: SoapNote,
    pub manual_notes: String,
    pub transcript: Vec<TranscriptSegment>,
}

impl VisitSession {
    /// An empty session for `patient_id`.
    pub fn new(patient_id: &str) -> Self {
        Self {
            patient_id: patient_id.to_string(),
            ..Default::default()
        }
    }

    pub fn findings(&self, set: FindingSet) -> &BTreeMap<String, FindingState> {
        match set {
            FindingSet::Ros => &self.ros_findings,
            FindingSet::Exam => &self.exam_findings,
        }
    }

    pub fn findings_mut(&mut self, set: FindingSet) -> &mut BTreeMap<String, FindingState> {
        match set {
            FindingSet::Ros => &mut self.ros_findings,
            FindingSet::Exam => &mut self.exam_findings,
        }
    }

    pub fn has_symptom(&self, label: &str) -> bool {
        self.symptoms.contains(label.trim())
    }

    pub fn is_confirmed(&self, code: &str) -> bool {
        self.confirmed_diagnoses.iter().any(|d| d.code == code)
    }

    pub fn transcript_text(&self) -> String {
        self.transcript
            .iter()
            .map(|s| format!("{}: {}", s.speaker.label(), s.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_empty() {
        let session = VisitSession::new("2");
        assert_eq!(session.patient_id, "2");
        assert!(session.symptoms.is_empty());
        assert!(session.soap.is_empty());
        assert_eq!(session.soap.assessment.confidence, Confidence::Low);
        assert!(!session.soap.assessment.approved);
    }

    #[test]
    fn test_finding_set_labels() {
        assert!(FindingSet::Ros.contains("Respiratory"));
        assert!(!FindingSet::Ros.contains("Lungs"));
        assert!(FindingSet::Exam.contains("Lungs"));
    }

    #[test]
    fn test_transcript_text_labels_speakers() {
        let mut session = VisitSession::new("1");
        session.transcript = vec![
            TranscriptSegment {
                speaker: SpeakerRole::Clinician,
                text: "What brings you in?".into(),
            },
            TranscriptSegment {
                speaker: SpeakerRole::Unknown,
                text: "A cough.".into(),
            },
        ];
        assert_eq!(
            session.transcript_text(),
            "Clinician: What brings you in?\nSpeaker: A cough."
        );
    }

    #[test]
    fn test_plan_origin_serialization() {
        let entry = PlanEntry {
            origin: PlanOrigin::Diagnosis("J45.909".into()),
            text: "Confirmed: Asthma (J45.909).".into(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["origin"]["kind"], "Diagnosis");
        assert_eq!(json["origin"]["key"], "J45.909");
    }
}
