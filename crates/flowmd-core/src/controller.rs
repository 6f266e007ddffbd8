//! Visit controller: one patient's session wired to inference, storage and capture.
//!
//! Every mutation applies a session transition and writes the result through
//! to the store. Inputs that feed the clinical context (symptoms, findings,
//! notes, diagnoses) schedule a debounced refresh; only the most recent input
//! ever lands in state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use flowmd_llm::{
    or_fallback, tasks, ClaimData, ClinicalContext, ContextQuery, Debouncer,
    DifferentialDiagnosis, InferenceGateway, SUMMARY_FALLBACK,
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::capture::{CaptureError, CaptureSession, SpeechSource};
use crate::config::FlowMdConfig;
use crate::models::{FindingSet, Medication, Patient, SegmentKey, VisitSession};
use crate::resolver::SymptomNormalizer;
use crate::store::SessionStore;

const EVENT_CAPACITY: usize = 16;

/// Quiet periods for input-driven context refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitTiming {
    pub symptoms: Duration,
    pub notes: Duration,
}

impl Default for VisitTiming {
    fn default() -> Self {
        Self {
            symptoms: Duration::from_millis(1000),
            notes: Duration::from_millis(2000),
        }
    }
}

impl From<&FlowMdConfig> for VisitTiming {
    fn from(config: &FlowMdConfig) -> Self {
        Self {
            symptoms: config.symptom_debounce(),
            notes: config.notes_debounce(),
        }
    }
}

/// Signals for observers outside the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum VisitEvent {
    ContextUpdated,
    ClaimReady {
        patient_id: String,
        claim: ClaimData,
        narrative: String,
    },
}

/// Suggestions produced when a diagnosis is confirmed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagnosisSuggestions {
    pub plan_items: Vec<String>,
    pub medications: Vec<Medication>,
}

/// Everything the controller holds for the visit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisitState {
    pub session: VisitSession,
    pub context: Option<ClinicalContext>,
    pub suggestions: DiagnosisSuggestions,
    pub claim: Option<ClaimData>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Apply `transition` and persist the result while the state lock is held,
/// so the store never sees writes out of order.
pub(crate) fn commit<F>(
    state: &Mutex<VisitState>,
    store: &Mutex<SessionStore>,
    transition: F,
) -> VisitSession
where
    F: FnOnce(VisitSession) -> VisitSession,
{
    commit_and(state, store, transition, |_| ()).0
}

/// [`commit`], then run `after` on the new session before the lock is released.
fn commit_and<F, G, R>(
    state: &Mutex<VisitState>,
    store: &Mutex<SessionStore>,
    transition: F,
    after: G,
) -> (VisitSession, R)
where
    F: FnOnce(VisitSession) -> VisitSession,
    G: FnOnce(&VisitSession) -> R,
{
    let mut state = lock(state);
    let next = transition(std::mem::take(&mut state.session));
    state.session = next;
    lock(store).save_session(&state.session);
    let out = after(&state.session);
    (state.session.clone(), out)
}

pub struct VisitController {
    patient: Patient,
    state: Arc<Mutex<VisitState>>,
    gateway: Arc<InferenceGateway>,
    store: Arc<Mutex<SessionStore>>,
    normalizer: SymptomNormalizer,
    timing: VisitTiming,
    context_refresh: Debouncer,
    /// Bumped on every diagnosis confirmation; only the latest one's
    /// suggestions are kept.
    suggestion_generation: AtomicU64,
    capture: tokio::sync::Mutex<CaptureSession>,
    events: broadcast::Sender<VisitEvent>,
}

impl VisitController {
    /// Open the visit for `patient`, hydrating any saved session.
    pub fn open(
        patient: Patient,
        gateway: Arc<InferenceGateway>,
        store: Arc<Mutex<SessionStore>>,
        speech: Arc<dyn SpeechSource>,
        timing: VisitTiming,
    ) -> Self {
        let session = lock(&store).load_session(&patient.id);
        let state = Arc::new(Mutex::new(VisitState {
            session,
            ..VisitState::default()
        }));
        Self::attach(patient, state, gateway, store, speech, timing)
    }

    /// Drive an already loaded visit state shared with other owners.
    ///
    /// Every writer goes through the same state lock, so no writer can
    /// persist a stale copy over another's changes.
    pub fn attach(
        patient: Patient,
        state: Arc<Mutex<VisitState>>,
        gateway: Arc<InferenceGateway>,
        store: Arc<Mutex<SessionStore>>,
        speech: Arc<dyn SpeechSource>,
        timing: VisitTiming,
    ) -> Self {
        {
            let state = lock(&state);
            info!(
                patient = %patient.id,
                "Visit opened: {} symptoms, {} diagnoses",
                state.session.symptoms.len(),
                state.session.confirmed_diagnoses.len()
            );
        }
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            patient,
            state,
            gateway,
            store,
            normalizer: SymptomNormalizer::default(),
            timing,
            context_refresh: Debouncer::new(timing.symptoms),
            suggestion_generation: AtomicU64::new(0),
            capture: tokio::sync::Mutex::new(CaptureSession::new(speech)),
            events,
        }
    }

    pub fn patient(&self) -> &Patient {
        &self.patient
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VisitEvent> {
        self.events.subscribe()
    }

    pub fn session(&self) -> VisitSession {
        lock(&self.state).session.clone()
    }

    pub fn state(&self) -> VisitState {
        lock(&self.state).clone()
    }

    pub fn context(&self) -> Option<ClinicalContext> {
        lock(&self.state).context.clone()
    }

    fn apply<F>(&self, transition: F) -> VisitSession
    where
        F: FnOnce(VisitSession) -> VisitSession,
    {
        commit(&self.state, &self.store, transition)
    }

    /// Apply `transition` and schedule a context refresh for the resulting
    /// session, both under the state lock so refreshes follow commit order.
    fn apply_and_refresh<F>(&self, quiet: Duration, transition: F) -> VisitSession
    where
        F: FnOnce(VisitSession) -> VisitSession,
    {
        commit_and(&self.state, &self.store, transition, |session| {
            let query = session.context_query(&self.patient.history);
            self.schedule_context_refresh(quiet, query);
        })
        .0
    }

    // =========================================================================
    // Clinical context
    // =========================================================================

    /// Recompute the clinical context for `query` once input has settled for `quiet`.
    fn schedule_context_refresh(&self, quiet: Duration, query: ContextQuery) {
        let gateway = Arc::clone(&self.gateway);
        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        self.context_refresh.schedule_after(
            quiet,
            move || async move { gateway.clinical_context(&query).await },
            move |result| {
                let context = or_fallback(tasks::CLINICAL_CONTEXT, result, || None);
                lock(&state).context = context;
                let _ = events.send(VisitEvent::ContextUpdated);
            },
        );
    }

    pub fn is_context_pending(&self) -> bool {
        self.context_refresh.is_pending()
    }

    // =========================================================================
    // Intake
    // =========================================================================

    /// Toggle a clinician-typed symptom after normalizing it onto the taxonomy.
    pub fn toggle_symptom(&self, raw: &str) -> VisitSession {
        let label = self.normalizer.normalize(raw);
        self.apply_and_refresh(self.timing.symptoms, |s| s.toggle_symptom(&label))
    }

    pub fn toggle_finding(&self, set: FindingSet, label: &str) -> VisitSession {
        self.apply_and_refresh(self.timing.symptoms, |s| s.toggle_finding(set, label))
    }

    pub fn set_manual_notes(&self, text: &str) -> VisitSession {
        self.apply_and_refresh(self.timing.notes, |s| s.set_manual_notes(text))
    }

    /// Symptoms worth asking about next visit, from history alone.
    pub async fn intake_predictions(&self) -> Vec<String> {
        let result = self.gateway.intake_predictions(&self.patient.history).await;
        or_fallback(tasks::INTAKE_PREDICTIONS, result, Vec::new)
    }

    pub async fn related_symptoms(&self) -> Vec<String> {
        let symptoms: Vec<String> = self.session().symptoms.into_iter().collect();
        let result = self.gateway.related_symptoms(&symptoms).await;
        or_fallback(tasks::RELATED_SYMPTOMS, result, Vec::new)
    }

    // =========================================================================
    // Assessment & plan
    // =========================================================================

    /// Confirm a differential and fetch plan and regimen suggestions for it.
    ///
    /// Both suggestion calls run concurrently. Suggestions are kept only if
    /// no later diagnosis was confirmed meanwhile and this one is still
    /// confirmed when they arrive; they are returned either way.
    pub async fn confirm_diagnosis(&self, ddx: &DifferentialDiagnosis) -> DiagnosisSuggestions {
        let generation = self.suggestion_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let session = self.apply_and_refresh(self.timing.symptoms, |s| s.confirm_diagnosis(ddx));

        let narrative = session.narrative();
        let (plan, regimen) = tokio::join!(
            self.gateway.plan_suggestions(ddx, &narrative),
            self.gateway.regimen_suggestions(ddx, &narrative),
        );
        let suggestions = DiagnosisSuggestions {
            plan_items: or_fallback(tasks::PLAN_SUGGESTIONS, plan, Vec::new),
            medications: or_fallback(tasks::REGIMEN_SUGGESTIONS, regimen, Vec::new),
        };

        let mut state = lock(&self.state);
        if self.suggestion_generation.load(Ordering::SeqCst) != generation {
            debug!("Discarding suggestions for {}: superseded", ddx.code);
        } else if state.session.is_confirmed(ddx.code.trim()) {
            state.suggestions = suggestions.clone();
        } else {
            debug!("Diagnosis {} retracted before suggestions arrived", ddx.code);
        }
        suggestions
    }

    pub fn retract_diagnosis(&self, code: &str) -> VisitSession {
        self.apply_and_refresh(self.timing.symptoms, |s| s.retract_diagnosis(code))
    }

    pub fn add_plan_item(&self, item: &str) -> VisitSession {
        self.apply(|s| s.add_plan_item(item))
    }

    pub fn remove_plan_item(&self, item: &str) -> VisitSession {
        self.apply(|s| s.remove_plan_item(item))
    }

    pub fn add_order(&self, order: &str) -> VisitSession {
        self.apply(|s| s.add_order(order))
    }

    pub fn remove_order(&self, order: &str) -> VisitSession {
        self.apply(|s| s.remove_order(order))
    }

    pub fn add_medication(&self, med: Medication) -> VisitSession {
        self.apply(|s| s.add_medication(med))
    }

    pub fn remove_medication(&self, id: &str) -> VisitSession {
        self.apply(|s| s.remove_medication(id))
    }

    pub fn approve_segment(&self, key: SegmentKey) -> VisitSession {
        self.apply(|s| s.approve_segment(key))
    }

    // =========================================================================
    // Ambient capture
    // =========================================================================

    /// Start ambient capture into a fresh transcript.
    ///
    /// Returns `Ok(false)` if already recording.
    pub async fn start_capture(&self) -> Result<bool, CaptureError> {
        let mut capture = self.capture.lock().await;
        if capture.is_recording() {
            return Ok(false);
        }
        if !capture.is_supported() {
            warn!(patient = %self.patient.id, "Speech capture unsupported");
            return Err(CaptureError::SpeechCaptureUnsupported);
        }
        self.apply(VisitSession::clear_transcript);

        let state = Arc::clone(&self.state);
        let store = Arc::clone(&self.store);
        capture.start(move |segment| {
            commit(&state, &store, |s| s.append_transcript(segment));
        })
    }

    /// Stop capture and draft the SOAP note from what was heard.
    ///
    /// Returns whether a draft was applied. A failed draft leaves the
    /// transcript in place so the clinician can retry.
    pub async fn stop_capture(&self) -> bool {
        if !self.capture.lock().await.stop().await {
            return false;
        }
        let transcript = self.session().transcript_text();
        if transcript.trim().is_empty() {
            debug!(patient = %self.patient.id, "Nothing captured");
            return false;
        }
        match self.gateway.process_transcript(&transcript).await {
            Ok(result) => {
                self.apply_and_refresh(self.timing.notes, |s| s.apply_transcript_result(&result));
                true
            }
            Err(e) => {
                warn!(patient = %self.patient.id, "Transcript draft unavailable: {}", e);
                false
            }
        }
    }

    pub async fn is_capturing(&self) -> bool {
        self.capture.lock().await.is_recording()
    }

    // =========================================================================
    // Summaries & finalize
    // =========================================================================

    pub async fn patient_summary(&self) -> String {
        let narrative = self.session().narrative();
        let result = self.gateway.patient_summary(&narrative).await;
        or_fallback(tasks::PATIENT_SUMMARY, result, || SUMMARY_FALLBACK.to_string())
    }

    /// Extract billing codes for the visit and announce them.
    ///
    /// Always yields a claim; an unavailable model gives an empty one.
    pub async fn finalize(&self) -> ClaimData {
        let narrative = self.session().narrative();
        let result = self.gateway.extract_claim(&narrative).await;
        let claim = or_fallback(tasks::CLAIM, result, ClaimData::default);

        lock(&self.state).claim = Some(claim.clone());
        info!(
            patient = %self.patient.id,
            "Visit finalized: {} diagnosis codes, {} procedure codes",
            claim.diagnosis_codes.len(),
            claim.procedure_codes.len()
        );
        let _ = self.events.send(VisitEvent::ClaimReady {
            patient_id: self.patient.id.clone(),
            claim: claim.clone(),
            narrative,
        });
        claim
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    pub fn persistence_warning(&self) -> Option<String> {
        lock(&self.store).persistence_warning().map(String::from)
    }

    /// Leave degraded mode and save the in-memory session if the store is back.
    pub fn retry_persistence(&self) -> bool {
        let state = lock(&self.state);
        let mut store = lock(&self.store);
        store.retry_persistence() && store.save_session(&state.session)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Cancel pending refreshes and abandon any capture in progress.
    pub fn close(&self) {
        self.context_refresh.cancel();
        if let Ok(mut capture) = self.capture.try_lock() {
            capture.cancel();
        }
        debug!(patient = %self.patient.id, "Visit closed");
    }
}

impl Drop for VisitController {
    fn drop(&mut self) {
        self.close();
    }
}
