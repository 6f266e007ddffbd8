//! Prompts and declared response schemas, one pair per use case.
//!
//! Schemas use the generateContent `responseSchema` dialect (OBJECT, ARRAY,
//! STRING, NUMBER, BOOLEAN).

use serde_json::{json, Value};

/// System instruction shared by every clinical call.
pub const SYSTEM_PROMPT: &str = r#"You are a clinical documentation assistant supporting a licensed clinician during a single patient visit.

Your output is advisory and will be reviewed before it enters the record.
- Answer only with JSON matching the requested schema.
- Prefer standard terminology (ICD-10 for diagnoses, CPT for procedures).
- Never invent findings that are not present in the supplied inputs.
- Quote evidence verbatim when asked for it."#;

fn string() -> Value {
    json!({ "type": "STRING" })
}

fn number() -> Value {
    json!({ "type": "NUMBER" })
}

fn boolean() -> Value {
    json!({ "type": "BOOLEAN" })
}

fn enumeration(values: &[&str]) -> Value {
    json!({ "type": "STRING", "format": "enum", "enum": values })
}

fn array(items: Value) -> Value {
    json!({ "type": "ARRAY", "items": items })
}

fn object(properties: Value) -> Value {
    json!({ "type": "OBJECT", "properties": properties })
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        "none recorded".to_string()
    } else {
        items.join(", ")
    }
}

fn medication_schema() -> Value {
    object(json!({
        "name": string(),
        "dosage": string(),
        "frequency": string(),
    }))
}

fn segment_schema() -> Value {
    object(json!({
        "content": string(),
        "confidence": enumeration(&["high", "medium", "low"]),
    }))
}

fn justified_code_schema() -> Value {
    object(json!({
        "code": string(),
        "description": string(),
        "evidence": string(),
        "sourceSection": enumeration(&["Subjective", "Objective", "Assessment", "Plan", "Exam", "History"]),
    }))
}

// =========================================================================
// Intake predictions
// =========================================================================

pub fn intake_predictions_prompt(history: &[String]) -> String {
    format!(
        "Based on patient history: {}, suggest the 5 most likely symptoms or follow-up concerns for their next visit.",
        bullet_list(history)
    )
}

pub fn intake_predictions_schema() -> Value {
    object(json!({ "predictions": array(string()) }))
}

// =========================================================================
// Related symptoms
// =========================================================================

pub fn related_symptoms_prompt(symptoms: &[String]) -> String {
    format!(
        "The patient reports: {}. List up to 6 additional symptoms the clinician should ask about that commonly co-occur with these.",
        bullet_list(symptoms)
    )
}

pub fn related_symptoms_schema() -> Value {
    object(json!({ "relatedSymptoms": array(string()) }))
}

// =========================================================================
// Clinical context
// =========================================================================

/// Inputs to the clinical context engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextQuery {
    pub symptoms: Vec<String>,
    pub history: Vec<String>,
    /// Rendered as "Label: state"
    pub findings: Vec<String>,
    pub notes: String,
    /// Confirmed diagnosis codes, in confirmation order
    pub diagnoses: Vec<String>,
}

pub fn clinical_context_prompt(query: &ContextQuery) -> String {
    let mut prompt = format!(
        "The patient has these symptoms: {}.\nRelevant history: {}.\nExamination and review of systems: {}.\nAlready confirmed diagnoses: {}.\n",
        bullet_list(&query.symptoms),
        bullet_list(&query.history),
        bullet_list(&query.findings),
        bullet_list(&query.diagnoses),
    );
    if !query.notes.trim().is_empty() {
        prompt.push_str(&format!("Clinician notes: \"{}\"\n", query.notes.trim()));
    }
    prompt.push_str(
        "Act as a clinical context engine. Provide a ranked differential diagnosis with ICD-10 codes and probabilities, \
recommended investigations with urgency, safety alerts, related symptoms to check for, a brief insight, \
and 2 hypothetical similar cases from a historical graph.",
    );
    prompt
}

pub fn clinical_context_schema() -> Value {
    object(json!({
        "differentialDiagnoses": array(object(json!({
            "name": string(),
            "probability": number(),
            "code": string(),
            "reasoning": string(),
        }))),
        "recommendedLabs": array(object(json!({
            "name": string(),
            "urgency": string(),
        }))),
        "safetyAlerts": array(object(json!({
            "type": enumeration(&["Contraindication", "Caution", "Interaction"]),
            "message": string(),
            "severity": enumeration(&["High", "Medium", "Low"]),
        }))),
        "insight": string(),
        "similarCases": array(object(json!({
            "summary": string(),
            "outcome": string(),
            "similarity": number(),
        }))),
        "relatedSymptoms": array(string()),
    }))
}

// =========================================================================
// Plan and regimen suggestions
// =========================================================================

pub fn plan_suggestions_prompt(diagnosis: &str, code: &str, narrative: &str) -> String {
    format!(
        "The clinician confirmed the diagnosis {} ({}).\nVisit narrative: \"{}\"\nSuggest up to 5 concrete plan items (follow-up, education, referrals, orders).",
        diagnosis, code, narrative
    )
}

pub fn plan_suggestions_schema() -> Value {
    object(json!({ "planItems": array(string()) }))
}

pub fn regimen_suggestions_prompt(diagnosis: &str, code: &str, narrative: &str) -> String {
    format!(
        "The clinician confirmed the diagnosis {} ({}).\nVisit narrative: \"{}\"\nSuggest a first-line medication regimen with dosage and frequency. Return an empty list if no medication is indicated.",
        diagnosis, code, narrative
    )
}

pub fn regimen_suggestions_schema() -> Value {
    object(json!({ "medications": array(medication_schema()) }))
}

// =========================================================================
// Ambient transcript
// =========================================================================

pub fn transcript_prompt(transcript: &str) -> String {
    format!(
        "Transform this doctor-patient conversation transcript into a structured clinical SOAP note.\n\
For each segment, estimate your confidence (high/medium/low).\n\
List any medications that were prescribed, and write one sentence summarising the encounter as `narrative`.\n\
Transcript: \"{}\"",
        transcript
    )
}

pub fn transcript_schema() -> Value {
    object(json!({
        "subjective": segment_schema(),
        "objective": segment_schema(),
        "assessment": segment_schema(),
        "plan": segment_schema(),
        "medications": array(medication_schema()),
        "narrative": string(),
    }))
}

// =========================================================================
// Summaries
// =========================================================================

pub fn patient_summary_prompt(narrative: &str) -> String {
    format!(
        "Rewrite this visit record as a short summary for the patient. Use plain language at a sixth-grade reading level, \
explain any diagnosis in one sentence, and list next steps.\nVisit record: \"{}\"",
        narrative
    )
}

pub fn discharge_summary_prompt(patient_name: &str, bed_id: &str, completed: &[String]) -> String {
    format!(
        "Generate a professional, concise discharge summary for patient {} from bed {}.\n\
Checklist completed: {}.\n\
Make it sound clinical and ready for a primary care doctor.",
        patient_name,
        bed_id,
        bullet_list(completed)
    )
}

pub fn summary_schema() -> Value {
    object(json!({ "summary": string() }))
}

// =========================================================================
// Claim extraction
// =========================================================================

pub fn claim_prompt(narrative: &str) -> String {
    let body = if narrative.trim().is_empty() {
        "(no documentation recorded)"
    } else {
        narrative
    };
    format!(
        "Extract billing codes from this visit documentation. For every ICD-10 diagnosis code and CPT procedure code, \
quote the exact supporting text as `evidence` and name the section it came from. Estimate the reimbursement in USD, \
the likely payer, and the MDM complexity. If the documentation supports no codes, return empty lists.\n\
Documentation:\n{}",
        body
    )
}

pub fn claim_schema() -> Value {
    object(json!({
        "diagnosisCodes": array(justified_code_schema()),
        "procedureCodes": array(justified_code_schema()),
        "estimatedReimbursement": number(),
        "payer": string(),
        "billingComplexity": enumeration(&["Low", "Moderate", "High"]),
    }))
}

// =========================================================================
// Scheduling
// =========================================================================

pub fn schedule_prompt(command: &str, today: &str) -> String {
    format!(
        "Today is {}. Interpret this scheduling command: \"{}\".\n\
Return the patient name, the date as YYYY-MM-DD and the time as HH:MM (24-hour). \
If any of the three cannot be determined with certainty, set `ambiguous` to true and explain why in `reason`.",
        today, command
    )
}

pub fn schedule_schema() -> Value {
    object(json!({
        "patientName": string(),
        "date": string(),
        "time": string(),
        "ambiguous": boolean(),
        "reason": string(),
    }))
}
