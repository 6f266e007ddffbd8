//! Typed model responses and JSON extraction from model output.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Extraction errors.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;

/// Parse a JSON object out of model output into `T`.
///
/// Tolerates leading or trailing prose and code fences around the object.
/// A response that does not match `T`'s shape is an error, never a partial value.
pub fn parse_model_json<T: DeserializeOwned>(text: &str) -> ExtractionResult<T> {
    let json_start = text.find('{').ok_or_else(|| {
        ExtractionError::InvalidFormat("No JSON object found in response".into())
    })?;
    let json_end = text.rfind('}').ok_or_else(|| {
        ExtractionError::InvalidFormat("No closing brace found in response".into())
    })?;
    if json_end < json_start {
        return Err(ExtractionError::InvalidFormat(
            "Closing brace precedes opening brace".into(),
        ));
    }

    let output: T = serde_json::from_str(&text[json_start..=json_end])?;
    Ok(output)
}

/// Deserialize an explicit `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// =========================================================================
// Shared clinical types
// =========================================================================

/// Model-reported confidence for a drafted SOAP segment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Confidence {
    High,
    Medium,
    #[default]
    Low,
}

impl From<String> for Confidence {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" => Confidence::High,
            "medium" | "moderate" => Confidence::Medium,
            _ => Confidence::Low,
        }
    }
}

/// A medication order. `id` is assigned locally; the model never supplies one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Medication {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub frequency: String,
}

impl Medication {
    pub fn new(name: &str, dosage: &str, frequency: &str) -> Self {
        Self {
            id: String::new(),
            name: name.to_string(),
            dosage: dosage.to_string(),
            frequency: frequency.to_string(),
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }
}

/// One ranked candidate diagnosis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DifferentialDiagnosis {
    pub name: String,
    /// Probability in [0, 1]
    pub probability: f64,
    /// ICD-10 code
    #[serde(alias = "icd10")]
    pub code: String,
    #[serde(default)]
    pub reasoning: String,
}

/// A recommended investigation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendedLab {
    pub name: String,
    #[serde(default)]
    pub urgency: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AlertKind {
    Contraindication,
    Caution,
    Interaction,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AlertSeverity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SafetyAlert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub message: String,
    pub severity: AlertSeverity,
}

/// A comparable historical case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimilarCase {
    pub summary: String,
    pub outcome: String,
    /// Similarity in [0, 1]
    pub similarity: f64,
}

/// Derived decision support for the current visit inputs.
///
/// Always recomputed as a whole; never merged with a previous value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClinicalContext {
    #[serde(default)]
    pub differential_diagnoses: Vec<DifferentialDiagnosis>,
    #[serde(default)]
    pub recommended_labs: Vec<RecommendedLab>,
    #[serde(default)]
    pub safety_alerts: Vec<SafetyAlert>,
    #[serde(default)]
    pub insight: String,
    #[serde(default)]
    pub similar_cases: Vec<SimilarCase>,
    #[serde(default)]
    pub related_symptoms: Vec<String>,
}

/// One drafted SOAP segment as returned by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SegmentDraft {
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub confidence: Confidence,
}

/// Result of turning an ambient transcript into a SOAP draft.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TranscriptResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub subjective: SegmentDraft,
    #[serde(default, deserialize_with = "null_as_default")]
    pub objective: SegmentDraft,
    #[serde(default, deserialize_with = "null_as_default")]
    pub assessment: SegmentDraft,
    #[serde(default, deserialize_with = "null_as_default")]
    pub plan: SegmentDraft,
    #[serde(default)]
    pub medications: Vec<Medication>,
    /// Short narrative line appended to the clinician's notes.
    #[serde(default)]
    pub narrative: String,
}

/// Section of the visit record a billing code was justified from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceSection {
    Subjective,
    Objective,
    Assessment,
    Plan,
    Exam,
    History,
}

/// A billing code with the verbatim evidence that supports it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JustifiedCode {
    pub code: String,
    #[serde(default)]
    pub description: String,
    /// Verbatim quote from the visit narrative
    pub evidence: String,
    pub source_section: SourceSection,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum BillingComplexity {
    #[default]
    Low,
    Moderate,
    High,
}

/// Billing codes extracted from a finalized visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ClaimData {
    #[serde(default)]
    pub diagnosis_codes: Vec<JustifiedCode>,
    #[serde(default)]
    pub procedure_codes: Vec<JustifiedCode>,
    #[serde(default)]
    pub estimated_reimbursement: f64,
    #[serde(default)]
    pub payer: String,
    #[serde(default)]
    pub billing_complexity: BillingComplexity,
}

impl ClaimData {
    pub fn is_empty(&self) -> bool {
        self.diagnosis_codes.is_empty() && self.procedure_codes.is_empty()
    }
}

/// Raw scheduling interpretation. Validation happens in the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleProposal {
    #[serde(default)]
    pub patient_name: Option<String>,
    /// YYYY-MM-DD
    #[serde(default)]
    pub date: Option<String>,
    /// HH:MM, 24-hour
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub ambiguous: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

// =========================================================================
// Response envelopes
// =========================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PredictionsResponse {
    #[serde(default)]
    pub predictions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RelatedSymptomsResponse {
    #[serde(default)]
    pub related_symptoms: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlanSuggestionsResponse {
    #[serde(default)]
    pub plan_items: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RegimenResponse {
    #[serde(default)]
    pub medications: Vec<Medication>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SummaryResponse {
    pub summary: String,
}
