//! Session persistence adapter.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{KeyValueStore, StoreError, StoreResult};
use crate::models::{Bed, SoapNote, ViewState, VisitSession};

/// Version written into every envelope. Entries with any other version load as empty.
pub const SCHEMA_VERSION: u32 = 1;

pub const VIEW_STATE_KEY: &str = "view_state";

pub const BEDS_KEY: &str = "beds";

const HEALTH_KEY: &str = "flowmd_health";

pub fn session_key(patient_id: &str) -> String {
    format!("visit_session_{}", patient_id)
}

pub fn soap_draft_key(patient_id: &str) -> String {
    format!("soap_draft_{}", patient_id)
}

pub fn manual_notes_key(patient_id: &str) -> String {
    format!("manual_notes_{}", patient_id)
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    schema_version: u32,
    saved_at: String,
    data: T,
}

#[derive(Deserialize)]
struct EnvelopeVersion {
    schema_version: u32,
}

/// Namespaced, versioned persistence for visit sessions and view state.
///
/// Reads never fail: a missing, corrupt or foreign-version entry yields the
/// empty default. A backend error switches the store into degraded mode,
/// where writes are skipped until [`retry_persistence`](Self::retry_persistence)
/// succeeds; callers keep working from memory in the meantime.
pub struct SessionStore {
    backend: Box<dyn KeyValueStore>,
    warning: Option<String>,
}

impl SessionStore {
    pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            warning: None,
        }
    }

    /// Why state is not being persisted, if it is not.
    pub fn persistence_warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    pub fn is_degraded(&self) -> bool {
        self.warning.is_some()
    }

    /// Check the backend and leave degraded mode if it responds.
    pub fn retry_persistence(&mut self) -> bool {
        let check = self
            .backend
            .put(HEALTH_KEY, "1")
            .and_then(|_| self.backend.remove(HEALTH_KEY));
        match check {
            Ok(()) => {
                if self.warning.take().is_some() {
                    info!("Persistence restored");
                }
                true
            }
            Err(e) => {
                self.degrade(&e);
                false
            }
        }
    }

    fn degrade(&mut self, error: &StoreError) {
        if self.warning.is_none() {
            warn!("Persistence unavailable, continuing in memory: {}", error);
        }
        self.warning = Some(format!(
            "Changes are not being saved and will be lost on reload ({})",
            error
        ));
    }

    fn read<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                self.degrade(&e);
                return None;
            }
        };
        decode(key, &raw)
    }

    fn write<T: Serialize>(&mut self, key: &str, data: &T) -> StoreResult<()> {
        let envelope = Envelope {
            schema_version: SCHEMA_VERSION,
            saved_at: chrono::Utc::now().to_rfc3339(),
            data,
        };
        let json = serde_json::to_string(&envelope)?;
        self.backend.put(key, &json)
    }

    /// Write `entries` in order unless degraded; the first failure degrades.
    fn write_through(&mut self, entries: &[(String, serde_json::Value)]) -> bool {
        if self.is_degraded() {
            debug!("Skipping write of {} entries while degraded", entries.len());
            return false;
        }
        for (key, value) in entries {
            if let Err(e) = self.write(key, value) {
                self.degrade(&e);
                return false;
            }
        }
        true
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Last saved session for `patient_id`, or an empty one.
    ///
    /// Falls back to the separate SOAP draft and notes keys when no full
    /// session was saved.
    pub fn load_session(&mut self, patient_id: &str) -> VisitSession {
        if let Some(mut session) = self.read::<VisitSession>(&session_key(patient_id)) {
            session.patient_id = patient_id.to_string();
            return session;
        }

        let mut session = VisitSession::new(patient_id);
        if let Some(soap) = self.read::<SoapNote>(&soap_draft_key(patient_id)) {
            session.soap = soap;
        }
        if let Some(notes) = self.read::<String>(&manual_notes_key(patient_id)) {
            session.manual_notes = notes;
        }
        session
    }

    /// Persist `session` under its patient's keys. Returns whether it was written.
    pub fn save_session(&mut self, session: &VisitSession) -> bool {
        let id = &session.patient_id;
        let entries = match (
            serde_json::to_value(session),
            serde_json::to_value(&session.soap),
        ) {
            (Ok(full), Ok(soap)) => vec![
                (session_key(id), full),
                (soap_draft_key(id), soap),
                (
                    manual_notes_key(id),
                    serde_json::Value::String(session.manual_notes.clone()),
                ),
            ],
            (Err(e), _) | (_, Err(e)) => {
                warn!("Failed to serialize session for {}: {}", id, e);
                return false;
            }
        };
        self.write_through(&entries)
    }

    // =========================================================================
    // View state
    // =========================================================================

    pub fn load_view_state(&mut self) -> ViewState {
        self.read(VIEW_STATE_KEY).unwrap_or_default()
    }

    pub fn save_view_state(&mut self, view: &ViewState) -> bool {
        match serde_json::to_value(view) {
            Ok(value) => self.write_through(&[(VIEW_STATE_KEY.to_string(), value)]),
            Err(e) => {
                warn!("Failed to serialize view state: {}", e);
                false
            }
        }
    }

    // =========================================================================
    // Beds
    // =========================================================================

    /// Saved bed board, or `None` if none was saved or it is unreadable.
    pub fn load_beds(&mut self) -> Option<Vec<Bed>> {
        self.read(BEDS_KEY)
    }

    pub fn save_beds(&mut self, beds: &[Bed]) -> bool {
        match serde_json::to_value(beds) {
            Ok(value) => self.write_through(&[(BEDS_KEY.to_string(), value)]),
            Err(e) => {
                warn!("Failed to serialize beds: {}", e);
                false
            }
        }
    }
}

fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Option<T> {
    match serde_json::from_str::<EnvelopeVersion>(raw) {
        Ok(check) if check.schema_version == SCHEMA_VERSION => {}
        Ok(check) => {
            warn!(
                "Ignoring {} written with schema version {}",
                key, check.schema_version
            );
            return None;
        }
        Err(e) => {
            warn!("Ignoring unreadable entry {}: {}", key, e);
            return None;
        }
    }
    match serde_json::from_str::<Envelope<T>>(raw) {
        Ok(envelope) => Some(envelope.data),
        Err(e) => {
            warn!("Ignoring corrupt entry {}: {}", key, e);
            None
        }
    }
}
