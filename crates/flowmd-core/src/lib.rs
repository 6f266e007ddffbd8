//! FlowMD Core Library
//!
//! Clinical documentation engine: symptom intake, review of systems and exam
//! findings, AI-assisted assessment and plan, ambient SOAP drafting and claim
//! extraction.
//!
//! # Architecture
//!
//! ```text
//! Intake (symptoms, findings, notes) ──debounce──► Clinical context
//!                │
//!                ▼
//!        VisitSession transitions ──write-through──► SessionStore
//!                │                                       │
//!  Ambient capture ─► Transcript ─► SOAP draft       KeyValueStore
//!                │                                 (SQLite / memory)
//!                ▼
//!      Confirm diagnosis ─► plan + regimen suggestions (concurrent)
//!                │
//!                ▼
//!            Finalize ─► ClaimData ─► ClaimReady ─► Export (JSON / CSV)
//! ```
//!
//! # Core Principle
//!
//! **Model output is advisory.** Every inference call has a safe default;
//! nothing the model returns is applied without a clinician action, except
//! the ambient SOAP draft, which always lands unapproved.
//!
//! # Modules
//!
//! - [`models`]: Domain types (VisitSession, Patient, Bed, etc.)
//! - [`session`]: Visit session state machine
//! - [`store`]: Key-value persistence with versioned session envelopes
//! - [`controller`]: One visit wired to inference, storage and capture
//! - [`capture`]: Ambient transcript capture over a platform speech source
//! - [`resolver`]: Fuzzy symptom and patient name resolution
//! - [`beds`]: Procedure bed board
//! - [`schedule`]: Natural-language scheduling commands
//! - [`export`]: Claim export
//! - [`config`], [`logging`]: Runtime configuration and tracing setup

pub mod beds;
pub mod capture;
pub mod config;
pub mod controller;
pub mod export;
pub mod logging;
pub mod models;
pub mod resolver;
pub mod schedule;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use beds::{BedBoard, DischargeRequest};
pub use capture::{CaptureError, CaptureSession, ScriptedSpeechSource, SpeechEvent, SpeechSource};
pub use config::FlowMdConfig;
pub use controller::{DiagnosisSuggestions, VisitController, VisitEvent, VisitState, VisitTiming};
pub use export::ClaimExport;
pub use models::{
    Bed, BedStatus, FindingSet, FindingState, Patient, SegmentKey, SpeakerRole, Tab, ViewState,
    VisitSession,
};
pub use resolver::{NameMatch, PatientDirectory, SymptomNormalizer};
pub use schedule::{resolve_proposal, schedule_command, Appointment, ScheduleError};
pub use store::{KeyValueStore, MemoryStore, SessionStore, SqliteStore, StoreError};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use flowmd_llm::{
    parse_model_json, ClaimData, DifferentialDiagnosis, InferenceGateway, Medication,
    TranscriptResult,
};
use serde::Serialize;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum FlowMdError {
    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Scheduling command is ambiguous: {0}")]
    ScheduleParseAmbiguous(String),

    #[error("Speech capture is not supported on this platform")]
    SpeechCaptureUnsupported,

    #[error("Speech platform error: {0}")]
    SpeechPlatformError(String),
}

impl From<StoreError> for FlowMdError {
    fn from(e: StoreError) -> Self {
        FlowMdError::PersistenceError(e.to_string())
    }
}

impl From<serde_json::Error> for FlowMdError {
    fn from(e: serde_json::Error) -> Self {
        FlowMdError::SerializationError(e.to_string())
    }
}

impl From<flowmd_llm::ExtractionError> for FlowMdError {
    fn from(e: flowmd_llm::ExtractionError) -> Self {
        FlowMdError::SerializationError(e.to_string())
    }
}

impl From<ScheduleError> for FlowMdError {
    fn from(e: ScheduleError) -> Self {
        match e {
            ScheduleError::Ambiguous(reason) => FlowMdError::ScheduleParseAmbiguous(reason),
        }
    }
}

impl From<CaptureError> for FlowMdError {
    fn from(e: CaptureError) -> Self {
        match e {
            CaptureError::SpeechCaptureUnsupported => FlowMdError::SpeechCaptureUnsupported,
            CaptureError::Platform(msg) => FlowMdError::SpeechPlatformError(msg),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for FlowMdError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        FlowMdError::PersistenceError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a session store at the given path.
#[uniffi::export]
pub fn open_store(path: String) -> Result<Arc<FlowMdCore>, FlowMdError> {
    let store = SqliteStore::open(&path)?;
    Ok(Arc::new(FlowMdCore::new(Box::new(store))))
}

/// Create an in-memory store (for testing).
#[uniffi::export]
pub fn open_store_in_memory() -> Result<Arc<FlowMdCore>, FlowMdError> {
    let store = SqliteStore::open_in_memory()?;
    Ok(Arc::new(FlowMdCore::new(Box::new(store))))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe visit state for FFI.
///
/// Each patient's visit state is loaded once and shared with any
/// [`VisitController`] opened through [`FlowMdCore::open_visit`], so there is
/// one authoritative session per patient. Sessions stay in memory once
/// loaded; a store in degraded mode loses nothing until the process ends.
#[derive(uniffi::Object)]
pub struct FlowMdCore {
    store: Arc<Mutex<SessionStore>>,
    visits: Mutex<HashMap<String, Arc<Mutex<VisitState>>>>,
    directory: PatientDirectory,
    normalizer: SymptomNormalizer,
    beds: Mutex<BedBoard>,
}

impl FlowMdCore {
    /// Wrap `backend`, restoring the saved bed board or seeding the demo one.
    pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
        let mut store = SessionStore::new(backend);
        let beds = store
            .load_beds()
            .map(BedBoard::from_beds)
            .unwrap_or_else(BedBoard::demo);
        Self {
            store: Arc::new(Mutex::new(store)),
            visits: Mutex::new(HashMap::new()),
            directory: PatientDirectory::demo(),
            normalizer: SymptomNormalizer::default(),
            beds: Mutex::new(beds),
        }
    }

    pub fn directory(&self) -> &PatientDirectory {
        &self.directory
    }

    /// Open a controller over the same visit state the FFI methods mutate.
    pub fn open_visit(
        &self,
        patient_id: &str,
        gateway: Arc<InferenceGateway>,
        speech: Arc<dyn SpeechSource>,
        timing: VisitTiming,
    ) -> Result<VisitController, FlowMdError> {
        let patient_id = valid_id(patient_id)?;
        let patient = self
            .directory
            .get(patient_id)
            .cloned()
            .ok_or_else(|| FlowMdError::NotFound(patient_id.to_string()))?;
        let state = self.visit(patient_id)?;
        Ok(VisitController::attach(
            patient,
            state,
            gateway,
            Arc::clone(&self.store),
            speech,
            timing,
        ))
    }

    /// Shared visit state for `patient_id`, hydrated from the store on first use.
    fn visit(&self, patient_id: &str) -> Result<Arc<Mutex<VisitState>>, FlowMdError> {
        let patient_id = valid_id(patient_id)?;
        let mut visits = self.visits.lock()?;
        if let Some(state) = visits.get(patient_id) {
            return Ok(Arc::clone(state));
        }
        let session = self.store.lock()?.load_session(patient_id);
        let state = Arc::new(Mutex::new(VisitState {
            session,
            ..VisitState::default()
        }));
        visits.insert(patient_id.to_string(), Arc::clone(&state));
        Ok(state)
    }

    fn session(&self, patient_id: &str) -> Result<VisitSession, FlowMdError> {
        let state = self.visit(patient_id)?;
        let session = state.lock()?.session.clone();
        Ok(session)
    }

    fn transition<F>(&self, patient_id: &str, f: F) -> Result<FfiVisitSession, FlowMdError>
    where
        F: FnOnce(VisitSession) -> VisitSession,
    {
        let state = self.visit(patient_id)?;
        Ok(controller::commit(&state, &self.store, f).into())
    }

    /// Persist the board after a change; the board stays authoritative in memory.
    fn save_beds(&self, board: &BedBoard) -> Result<(), FlowMdError> {
        self.store.lock()?.save_beds(board.beds());
        Ok(())
    }
}

fn valid_id(patient_id: &str) -> Result<&str, FlowMdError> {
    let trimmed = patient_id.trim();
    if trimmed.is_empty() {
        return Err(FlowMdError::InvalidInput("patient id is empty".to_string()));
    }
    Ok(trimmed)
}

#[uniffi::export]
impl FlowMdCore {
    // =========================================================================
    // Patient Operations
    // =========================================================================

    pub fn list_patients(&self) -> Vec<FfiPatient> {
        self.directory.all().iter().map(FfiPatient::from).collect()
    }

    pub fn get_patient(&self, id: String) -> Option<FfiPatient> {
        self.directory.get(&id).map(FfiPatient::from)
    }

    /// Search patients by fuzzy name match, best first.
    pub fn search_patients(&self, query: String, limit: u32) -> Vec<FfiPatient> {
        self.directory
            .search(&query, limit as usize)
            .into_iter()
            .map(|m| FfiPatient::from(m.patient))
            .collect()
    }

    // =========================================================================
    // Session Operations
    // =========================================================================

    pub fn load_session(&self, patient_id: String) -> Result<FfiVisitSession, FlowMdError> {
        Ok(self.session(&patient_id)?.into())
    }

    /// Toggle a symptom; free-typed labels are normalized onto the taxonomy.
    pub fn toggle_symptom(&self, patient_id: String, label: String) -> Result<FfiVisitSession, FlowMdError> {
        let label = self.normalizer.normalize(&label);
        self.transition(&patient_id, |s| s.toggle_symptom(&label))
    }

    pub fn toggle_finding(
        &self,
        patient_id: String,
        set: FfiFindingSet,
        label: String,
    ) -> Result<FfiVisitSession, FlowMdError> {
        self.transition(&patient_id, |s| s.toggle_finding(set.into(), &label))
    }

    pub fn confirm_diagnosis(
        &self,
        patient_id: String,
        diagnosis: FfiDifferential,
    ) -> Result<FfiVisitSession, FlowMdError> {
        let ddx: DifferentialDiagnosis = diagnosis.into();
        self.transition(&patient_id, |s| s.confirm_diagnosis(&ddx))
    }

    pub fn retract_diagnosis(&self, patient_id: String, code: String) -> Result<FfiVisitSession, FlowMdError> {
        self.transition(&patient_id, |s| s.retract_diagnosis(&code))
    }

    pub fn add_plan_item(&self, patient_id: String, item: String) -> Result<FfiVisitSession, FlowMdError> {
        self.transition(&patient_id, |s| s.add_plan_item(&item))
    }

    pub fn remove_plan_item(&self, patient_id: String, item: String) -> Result<FfiVisitSession, FlowMdError> {
        self.transition(&patient_id, |s| s.remove_plan_item(&item))
    }

    pub fn add_order(&self, patient_id: String, order: String) -> Result<FfiVisitSession, FlowMdError> {
        self.transition(&patient_id, |s| s.add_order(&order))
    }

    pub fn remove_order(&self, patient_id: String, order: String) -> Result<FfiVisitSession, FlowMdError> {
        self.transition(&patient_id, |s| s.remove_order(&order))
    }

    pub fn add_medication(
        &self,
        patient_id: String,
        medication: FfiMedication,
    ) -> Result<FfiVisitSession, FlowMdError> {
        self.transition(&patient_id, |s| s.add_medication(medication.into()))
    }

    pub fn remove_medication(&self, patient_id: String, id: String) -> Result<FfiVisitSession, FlowMdError> {
        self.transition(&patient_id, |s| s.remove_medication(&id))
    }

    pub fn approve_segment(
        &self,
        patient_id: String,
        key: FfiSegmentKey,
    ) -> Result<FfiVisitSession, FlowMdError> {
        self.transition(&patient_id, |s| s.approve_segment(key.into()))
    }

    pub fn set_manual_notes(&self, patient_id: String, text: String) -> Result<FfiVisitSession, FlowMdError> {
        self.transition(&patient_id, |s| s.set_manual_notes(&text))
    }

    /// Apply a transcript draft produced by the model, given as its raw JSON.
    pub fn apply_transcript_json(
        &self,
        patient_id: String,
        result_json: String,
    ) -> Result<FfiVisitSession, FlowMdError> {
        let result: TranscriptResult = parse_model_json(&result_json)?;
        self.transition(&patient_id, |s| s.apply_transcript_result(&result))
    }

    // =========================================================================
    // View State & Persistence
    // =========================================================================

    pub fn load_view_state(&self) -> Result<FfiViewState, FlowMdError> {
        Ok(self.store.lock()?.load_view_state().into())
    }

    /// Returns whether the view state was written.
    pub fn save_view_state(&self, view: FfiViewState) -> Result<bool, FlowMdError> {
        let view = ViewState::try_from(view)?;
        Ok(self.store.lock()?.save_view_state(&view))
    }

    pub fn persistence_warning(&self) -> Result<Option<String>, FlowMdError> {
        Ok(self.store.lock()?.persistence_warning().map(String::from))
    }

    /// Leave degraded mode if the store is back, then save every open
    /// session and the bed board.
    pub fn retry_persistence(&self) -> Result<bool, FlowMdError> {
        let visits: Vec<Arc<Mutex<VisitState>>> = self.visits.lock()?.values().cloned().collect();
        let mut sessions = Vec::with_capacity(visits.len());
        for state in &visits {
            sessions.push(state.lock()?.session.clone());
        }
        let board = self.beds.lock()?;

        let mut store = self.store.lock()?;
        if !store.retry_persistence() {
            return Ok(false);
        }
        let saved = sessions.iter().all(|s| store.save_session(s));
        Ok(saved && store.save_beds(board.beds()))
    }

    // =========================================================================
    // Bed Operations
    // =========================================================================

    pub fn list_beds(&self) -> Result<Vec<FfiBed>, FlowMdError> {
        Ok(self.beds.lock()?.beds().iter().map(FfiBed::from).collect())
    }

    /// Advance a bed. A bed entering Discharge comes back with the request
    /// for its summary; the host generates the text and hands it back with
    /// [`Self::set_bed_summary`].
    pub fn cycle_bed(&self, bed_id: String) -> Result<FfiBedCycle, FlowMdError> {
        let mut board = self.beds.lock()?;
        if board.bed(&bed_id).is_none() {
            return Err(FlowMdError::NotFound(bed_id));
        }
        let discharge = board
            .cycle_status(&bed_id, &beds::started_at_now())
            .map(FfiDischargeRequest::from);
        self.save_beds(&board)?;
        let bed = board
            .bed(&bed_id)
            .ok_or_else(|| FlowMdError::NotFound(bed_id.clone()))?;
        Ok(FfiBedCycle {
            bed: FfiBed::from(bed),
            discharge,
        })
    }

    pub fn set_bed_summary(&self, bed_id: String, summary: String) -> Result<bool, FlowMdError> {
        let mut board = self.beds.lock()?;
        let stored = board.set_summary(&bed_id, summary);
        if stored {
            self.save_beds(&board)?;
        }
        Ok(stored)
    }

    pub fn toggle_checklist_item(&self, bed_id: String, item_id: String) -> Result<bool, FlowMdError> {
        let mut board = self.beds.lock()?;
        let toggled = board.toggle_checklist_item(&bed_id, &item_id);
        if toggled {
            self.save_beds(&board)?;
        }
        Ok(toggled)
    }

    // =========================================================================
    // Export Operations
    // =========================================================================

    /// Export a claim (as returned by finalize) for a patient's visit as JSON.
    pub fn export_claim_json(&self, patient_id: String, claim_json: String) -> Result<String, FlowMdError> {
        Ok(self.claim_export(&patient_id, &claim_json)?.to_json()?)
    }

    /// Export a claim for a patient's visit as CSV.
    pub fn export_claim_csv(&self, patient_id: String, claim_json: String) -> Result<String, FlowMdError> {
        Ok(self.claim_export(&patient_id, &claim_json)?.to_csv())
    }
}

impl FlowMdCore {
    fn claim_export(&self, patient_id: &str, claim_json: &str) -> Result<ClaimExport, FlowMdError> {
        let claim: ClaimData = serde_json::from_str(claim_json)?;
        let session = self.session(patient_id)?;
        Ok(ClaimExport::from_claim(&session.patient_id, &claim, &session.narrative()))
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// Wire name of a serde-tagged enum, e.g. `Trend::Improving` → "improving".
fn wire_label<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(String::from))
        .unwrap_or_default()
}

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub last_visit: String,
    pub history: Vec<String>,
    pub trend: String,
    pub eligibility: String,
    pub claim_status: String,
}

impl From<&Patient> for FfiPatient {
    fn from(patient: &Patient) -> Self {
        Self {
            id: patient.id.clone(),
            name: patient.name.clone(),
            age: patient.age,
            gender: patient.gender.clone(),
            last_visit: patient.last_visit.clone(),
            history: patient.history.clone(),
            trend: wire_label(&patient.trend),
            eligibility: wire_label(&patient.eligibility),
            claim_status: wire_label(&patient.claim_status),
        }
    }
}

#[derive(Debug, Clone, Copy, uniffi::Enum)]
pub enum FfiFindingSet {
    Ros,
    Exam,
}

impl From<FfiFindingSet> for FindingSet {
    fn from(set: FfiFindingSet) -> Self {
        match set {
            FfiFindingSet::Ros => FindingSet::Ros,
            FfiFindingSet::Exam => FindingSet::Exam,
        }
    }
}

#[derive(Debug, Clone, Copy, uniffi::Enum)]
pub enum FfiSegmentKey {
    Subjective,
    Objective,
    Assessment,
    Plan,
}

impl From<FfiSegmentKey> for SegmentKey {
    fn from(key: FfiSegmentKey) -> Self {
        match key {
            FfiSegmentKey::Subjective => SegmentKey::Subjective,
            FfiSegmentKey::Objective => SegmentKey::Objective,
            FfiSegmentKey::Assessment => SegmentKey::Assessment,
            FfiSegmentKey::Plan => SegmentKey::Plan,
        }
    }
}

/// FFI-safe differential diagnosis, as offered by the clinical context.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDifferential {
    pub name: String,
    pub code: String,
    pub probability: f64,
    pub reasoning: String,
}

impl From<FfiDifferential> for DifferentialDiagnosis {
    fn from(d: FfiDifferential) -> Self {
        DifferentialDiagnosis {
            name: d.name,
            probability: d.probability,
            code: d.code,
            reasoning: d.reasoning,
        }
    }
}

/// FFI-safe medication.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedication {
    /// Empty to have one derived
    pub id: String,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
}

impl From<FfiMedication> for Medication {
    fn from(m: FfiMedication) -> Self {
        Medication::new(&m.name, &m.dosage, &m.frequency).with_id(&m.id)
    }
}

impl From<&Medication> for FfiMedication {
    fn from(m: &Medication) -> Self {
        Self {
            id: m.id.clone(),
            name: m.name.clone(),
            dosage: m.dosage.clone(),
            frequency: m.frequency.clone(),
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiFinding {
    pub label: String,
    /// "Normal" or "Finding"
    pub state: String,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiConfirmedDiagnosis {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSoapSegment {
    pub key: String,
    pub content: String,
    pub confidence: String,
    pub approved: bool,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTranscriptSegment {
    pub speaker: String,
    pub text: String,
}

/// FFI-safe visit session, with the rendered plan and narrative.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiVisitSession {
    pub patient_id: String,
    pub symptoms: Vec<String>,
    pub ros_findings: Vec<FfiFinding>,
    pub exam_findings: Vec<FfiFinding>,
    pub confirmed_diagnoses: Vec<FfiConfirmedDiagnosis>,
    pub plan_items: Vec<String>,
    pub orders: Vec<String>,
    pub medications: Vec<FfiMedication>,
    pub soap: Vec<FfiSoapSegment>,
    pub manual_notes: String,
    pub transcript: Vec<FfiTranscriptSegment>,
    pub plan_text: String,
    pub narrative: String,
}

impl From<VisitSession> for FfiVisitSession {
    fn from(session: VisitSession) -> Self {
        let findings = |set: FindingSet| -> Vec<FfiFinding> {
            session
                .findings(set)
                .iter()
                .map(|(label, state)| FfiFinding {
                    label: label.clone(),
                    state: wire_label(state),
                })
                .collect()
        };
        Self {
            patient_id: session.patient_id.clone(),
            symptoms: session.symptoms.iter().cloned().collect(),
            ros_findings: findings(FindingSet::Ros),
            exam_findings: findings(FindingSet::Exam),
            confirmed_diagnoses: session
                .confirmed_diagnoses
                .iter()
                .map(|d| FfiConfirmedDiagnosis {
                    code: d.code.clone(),
                    name: d.name.clone(),
                })
                .collect(),
            plan_items: session.plan_items.clone(),
            orders: session.orders.clone(),
            medications: session.medications.iter().map(FfiMedication::from).collect(),
            soap: SegmentKey::ALL
                .iter()
                .map(|&key| {
                    let segment = session.soap.segment(key);
                    FfiSoapSegment {
                        key: wire_label(&key),
                        content: segment.content.clone(),
                        confidence: wire_label(&segment.confidence),
                        approved: segment.approved,
                    }
                })
                .collect(),
            manual_notes: session.manual_notes.clone(),
            transcript: session
                .transcript
                .iter()
                .map(|t| FfiTranscriptSegment {
                    speaker: t.speaker.label().to_string(),
                    text: t.text.clone(),
                })
                .collect(),
            plan_text: session.plan_text(),
            narrative: session.narrative(),
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiViewState {
    pub active_patient: Option<String>,
    /// One of "symptoms", "notes", "assessment", "plan", "history"
    pub active_tab: String,
}

impl From<ViewState> for FfiViewState {
    fn from(view: ViewState) -> Self {
        Self {
            active_patient: view.active_patient,
            active_tab: wire_label(&view.active_tab),
        }
    }
}

impl TryFrom<FfiViewState> for ViewState {
    type Error = FlowMdError;

    fn try_from(view: FfiViewState) -> Result<Self, Self::Error> {
        let active_tab = Tab::parse(&view.active_tab)
            .ok_or_else(|| FlowMdError::InvalidInput(format!("unknown tab '{}'", view.active_tab)))?;
        Ok(ViewState {
            active_patient: view.active_patient,
            active_tab,
        })
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiChecklistItem {
    pub id: String,
    pub label: String,
    pub completed: bool,
}

/// FFI-safe bed.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBed {
    pub id: String,
    pub label: String,
    pub status: String,
    pub patient_name: Option<String>,
    pub time_started: Option<String>,
    pub checklist: Vec<FfiChecklistItem>,
    pub summary: Option<String>,
    /// Entered Discharge and the summary has not been supplied yet
    pub awaiting_summary: bool,
}

/// Data the host needs to generate a discharge summary.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiDischargeRequest {
    pub bed_id: String,
    pub patient_name: String,
    /// Labels of the checklist items completed before discharge
    pub completed: Vec<String>,
}

impl From<DischargeRequest> for FfiDischargeRequest {
    fn from(request: DischargeRequest) -> Self {
        Self {
            bed_id: request.bed_id,
            patient_name: request.patient_name,
            completed: request.completed,
        }
    }
}

/// Outcome of advancing a bed.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBedCycle {
    pub bed: FfiBed,
    /// Present when the bed just entered Discharge
    pub discharge: Option<FfiDischargeRequest>,
}

impl From<&Bed> for FfiBed {
    fn from(bed: &Bed) -> Self {
        Self {
            id: bed.id.clone(),
            label: bed.label.clone(),
            status: bed.status.label().to_string(),
            patient_name: bed.patient_name.clone(),
            time_started: bed.time_started.clone(),
            checklist: bed
                .checklist
                .iter()
                .map(|c| FfiChecklistItem {
                    id: c.id.clone(),
                    label: c.label.clone(),
                    completed: c.completed,
                })
                .collect(),
            summary: bed.summary.clone(),
            awaiting_summary: bed.status == BedStatus::Discharge && bed.summary.is_none(),
        }
    }
}
