//! Inference gateway: one typed operation per clinical use case.
//!
//! Each operation normalizes its inputs, builds a prompt and a declared
//! response schema, and runs the call through the shared cache and retry
//! policy. Operations are independent; where one result feeds another, the
//! caller composes them explicitly.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use crate::client::{tasks, GenerativeModel, ModelRequest};
use crate::error::InferenceResult;
use crate::extraction::*;
use crate::prompts::{self, ContextQuery, SYSTEM_PROMPT};
use crate::retry::{call_with_retry, CacheKey, ResponseCache, RetryPolicy};

/// Text shown when a summary cannot be generated.
pub const SUMMARY_FALLBACK: &str = "Summary unavailable.";

/// Text stored on a bed when its discharge summary cannot be generated.
pub const DISCHARGE_FALLBACK: &str = "Error generating summary.";

/// Maximum intake predictions surfaced.
const MAX_PREDICTIONS: usize = 5;

/// Trim, drop empties and deduplicate while keeping first-seen order.
pub fn normalize_items<S: AsRef<str>>(items: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let trimmed = item.as_ref().trim();
        if !trimmed.is_empty() && !out.iter().any(|seen| seen == trimmed) {
            out.push(trimmed.to_string());
        }
    }
    out
}

/// Unwrap an inference result, degrading to `fallback` on failure.
pub fn or_fallback<T>(task: &str, result: InferenceResult<T>, fallback: impl FnOnce() -> T) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(task, "Suggestions unavailable, using fallback: {}", e);
            fallback()
        }
    }
}

pub struct InferenceGateway {
    model: Arc<dyn GenerativeModel>,
    cache: Arc<ResponseCache>,
    policy: RetryPolicy,
}

impl InferenceGateway {
    pub fn new(model: Arc<dyn GenerativeModel>, cache: Arc<ResponseCache>, policy: RetryPolicy) -> Self {
        Self { model, cache, policy }
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn invoke<T>(&self, request: ModelRequest, key: Option<CacheKey>) -> InferenceResult<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let model = self.model.as_ref();
        let request = &request;
        call_with_retry(&self.cache, key.as_ref(), &self.policy, move || async move {
            let text = model.generate(request).await?;
            let parsed = parse_model_json::<T>(&text)?;
            Ok(parsed)
        })
        .await
    }

    fn request(task: &'static str, prompt: String, schema: serde_json::Value) -> ModelRequest {
        ModelRequest {
            task,
            system: Some(SYSTEM_PROMPT.to_string()),
            prompt,
            response_schema: Some(schema),
        }
    }

    /// Likely symptoms or concerns for the next visit, from history alone.
    pub async fn intake_predictions(&self, history: &[String]) -> InferenceResult<Vec<String>> {
        let history = normalize_items(history);
        let key = CacheKey::builder(tasks::INTAKE_PREDICTIONS)
            .set("history", &history)
            .build();
        let request = Self::request(
            tasks::INTAKE_PREDICTIONS,
            prompts::intake_predictions_prompt(&history),
            prompts::intake_predictions_schema(),
        );
        let response: PredictionsResponse = self.invoke(request, Some(key)).await?;
        let mut predictions = normalize_items(&response.predictions);
        predictions.truncate(MAX_PREDICTIONS);
        Ok(predictions)
    }

    pub async fn related_symptoms(&self, symptoms: &[String]) -> InferenceResult<Vec<String>> {
        let symptoms = normalize_items(symptoms);
        if symptoms.is_empty() {
            return Ok(Vec::new());
        }
        let key = CacheKey::builder(tasks::RELATED_SYMPTOMS)
            .set("symptoms", &symptoms)
            .build();
        let request = Self::request(
            tasks::RELATED_SYMPTOMS,
            prompts::related_symptoms_prompt(&symptoms),
            prompts::related_symptoms_schema(),
        );
        let response: RelatedSymptomsResponse = self.invoke(request, Some(key)).await?;
        Ok(normalize_items(&response.related_symptoms)
            .into_iter()
            .filter(|s| !symptoms.iter().any(|known| known.eq_ignore_ascii_case(s)))
            .collect())
    }

    /// Full decision-support context. `None` when no symptoms are selected.
    pub async fn clinical_context(&self, query: &ContextQuery) -> InferenceResult<Option<ClinicalContext>> {
        let query = ContextQuery {
            symptoms: normalize_items(&query.symptoms),
            history: normalize_items(&query.history),
            findings: normalize_items(&query.findings),
            notes: query.notes.trim().to_string(),
            diagnoses: normalize_items(&query.diagnoses),
        };
        if query.symptoms.is_empty() {
            return Ok(None);
        }
        let key = CacheKey::builder(tasks::CLINICAL_CONTEXT)
            .set("symptoms", &query.symptoms)
            .set("history", &query.history)
            .set("findings", &query.findings)
            .list("diagnoses", &query.diagnoses)
            .text("notes", &query.notes)
            .build();
        let request = Self::request(
            tasks::CLINICAL_CONTEXT,
            prompts::clinical_context_prompt(&query),
            prompts::clinical_context_schema(),
        );
        let context: ClinicalContext = self.invoke(request, Some(key)).await?;
        info!(
            "Clinical context: {} differentials, {} alerts",
            context.differential_diagnoses.len(),
            context.safety_alerts.len()
        );
        Ok(Some(context))
    }

    pub async fn plan_suggestions(
        &self,
        diagnosis: &DifferentialDiagnosis,
        narrative: &str,
    ) -> InferenceResult<Vec<String>> {
        let key = CacheKey::builder(tasks::PLAN_SUGGESTIONS)
            .value("code", diagnosis.code.trim())
            .value("name", diagnosis.name.trim())
            .text("narrative", narrative)
            .build();
        let request = Self::request(
            tasks::PLAN_SUGGESTIONS,
            prompts::plan_suggestions_prompt(diagnosis.name.trim(), diagnosis.code.trim(), narrative.trim()),
            prompts::plan_suggestions_schema(),
        );
        let response: PlanSuggestionsResponse = self.invoke(request, Some(key)).await?;
        Ok(normalize_items(&response.plan_items))
    }

    pub async fn regimen_suggestions(
        &self,
        diagnosis: &DifferentialDiagnosis,
        narrative: &str,
    ) -> InferenceResult<Vec<Medication>> {
        let key = CacheKey::builder(tasks::REGIMEN_SUGGESTIONS)
            .value("code", diagnosis.code.trim())
            .value("name", diagnosis.name.trim())
            .text("narrative", narrative)
            .build();
        let request = Self::request(
            tasks::REGIMEN_SUGGESTIONS,
            prompts::regimen_suggestions_prompt(diagnosis.name.trim(), diagnosis.code.trim(), narrative.trim()),
            prompts::regimen_suggestions_schema(),
        );
        let response: RegimenResponse = self.invoke(request, Some(key)).await?;
        Ok(response
            .medications
            .into_iter()
            .filter(|m| !m.name.trim().is_empty())
            .collect())
    }

    /// Draft a SOAP note from an ambient transcript. Never cached.
    pub async fn process_transcript(&self, transcript: &str) -> InferenceResult<TranscriptResult> {
        let request = Self::request(
            tasks::TRANSCRIPT,
            prompts::transcript_prompt(transcript.trim()),
            prompts::transcript_schema(),
        );
        info!("Processing transcript: {} chars", transcript.len());
        self.invoke(request, None).await
    }

    pub async fn patient_summary(&self, narrative: &str) -> InferenceResult<String> {
        let key = CacheKey::builder(tasks::PATIENT_SUMMARY)
            .text("narrative", narrative)
            .build();
        let request = Self::request(
            tasks::PATIENT_SUMMARY,
            prompts::patient_summary_prompt(narrative.trim()),
            prompts::summary_schema(),
        );
        let response: SummaryResponse = self.invoke(request, Some(key)).await?;
        Ok(response.summary)
    }

    /// Billing codes with verbatim evidence from the visit narrative.
    pub async fn extract_claim(&self, narrative: &str) -> InferenceResult<ClaimData> {
        let key = CacheKey::builder(tasks::CLAIM).text("narrative", narrative).build();
        let request = Self::request(
            tasks::CLAIM,
            prompts::claim_prompt(narrative.trim()),
            prompts::claim_schema(),
        );
        let claim: ClaimData = self.invoke(request, Some(key)).await?;
        info!(
            "Claim extracted: {} diagnosis codes, {} procedure codes",
            claim.diagnosis_codes.len(),
            claim.procedure_codes.len()
        );
        Ok(claim)
    }

    pub async fn discharge_summary(
        &self,
        patient_name: &str,
        bed_id: &str,
        completed: &[String],
    ) -> InferenceResult<String> {
        let completed = normalize_items(completed);
        let key = CacheKey::builder(tasks::DISCHARGE_SUMMARY)
            .value("patient", patient_name.trim())
            .value("bed", bed_id.trim())
            .set("completed", &completed)
            .build();
        let request = Self::request(
            tasks::DISCHARGE_SUMMARY,
            prompts::discharge_summary_prompt(patient_name.trim(), bed_id.trim(), &completed),
            prompts::summary_schema(),
        );
        let response: SummaryResponse = self.invoke(request, Some(key)).await?;
        Ok(response.summary)
    }

    /// Interpret a natural-language scheduling command relative to `today` (YYYY-MM-DD).
    pub async fn parse_schedule(&self, command: &str, today: &str) -> InferenceResult<ScheduleProposal> {
        let key = CacheKey::builder(tasks::SCHEDULE)
            .text("command", command.trim())
            .value("today", today)
            .build();
        let request = Self::request(
            tasks::SCHEDULE,
            prompts::schedule_prompt(command.trim(), today),
            prompts::schedule_schema(),
        );
        self.invoke(request, Some(key)).await
    }
}
