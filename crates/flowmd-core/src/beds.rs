//! Procedure bed board.
//!
//! Beds cycle Available → Pre-op → Procedure → Post-op → Discharge →
//! Available. Entering Discharge asks the inference gateway for a discharge
//! summary; the board itself stays synchronous, so the caller runs the
//! returned [`DischargeRequest`] and hands the text back.

use flowmd_llm::{or_fallback, tasks, InferenceGateway, DISCHARGE_FALLBACK};
use tracing::{debug, info};

use crate::models::{Bed, BedStatus};

/// Occupant name used when a bed is taken without one.
pub const DEFAULT_OCCUPANT: &str = "Emergency Patient";

const DEMO_BED_COUNT: usize = 8;

/// A discharge summary still to be generated for a bed.
#[derive(Debug, Clone, PartialEq)]
pub struct DischargeRequest {
    pub bed_id: String,
    pub patient_name: String,
    pub completed: Vec<String>,
}

impl DischargeRequest {
    /// Generate the summary text, degrading to [`DISCHARGE_FALLBACK`].
    pub async fn summarize(&self, gateway: &InferenceGateway) -> String {
        let result = gateway
            .discharge_summary(&self.patient_name, &self.bed_id, &self.completed)
            .await;
        or_fallback(tasks::DISCHARGE_SUMMARY, result, || DISCHARGE_FALLBACK.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BedBoard {
    beds: Vec<Bed>,
}

impl BedBoard {
    pub fn new(count: usize) -> Self {
        Self {
            beds: (1..=count).map(Bed::new).collect(),
        }
    }

    /// Board restored from saved beds.
    pub fn from_beds(beds: Vec<Bed>) -> Self {
        Self { beds }
    }

    /// Eight beds with two occupied, as on a typical morning.
    pub fn demo() -> Self {
        let mut board = Self::new(DEMO_BED_COUNT);
        board.occupy("B2", BedStatus::PostOp, "Jane Smith", "10:30 AM");
        board.occupy("B5", BedStatus::PreOp, "Robert Wilson", "02:15 PM");
        board
    }

    fn occupy(&mut self, bed_id: &str, status: BedStatus, patient: &str, time: &str) {
        if let Some(bed) = self.bed_mut(bed_id) {
            bed.status = status;
            bed.patient_name = Some(patient.to_string());
            bed.time_started = Some(time.to_string());
            bed.checklist = status.checklist();
        }
    }

    pub fn beds(&self) -> &[Bed] {
        &self.beds
    }

    pub fn bed(&self, bed_id: &str) -> Option<&Bed> {
        self.beds.iter().find(|b| b.id == bed_id)
    }

    fn bed_mut(&mut self, bed_id: &str) -> Option<&mut Bed> {
        self.beds.iter_mut().find(|b| b.id == bed_id)
    }

    pub fn occupied_count(&self) -> usize {
        self.beds.iter().filter(|b| b.is_occupied()).count()
    }

    /// Advance a bed to its next status.
    ///
    /// Returns the discharge summary still owed when the bed enters
    /// Discharge. Unknown bed ids are ignored.
    pub fn cycle_status(&mut self, bed_id: &str, started_at: &str) -> Option<DischargeRequest> {
        let bed = self.bed_mut(bed_id)?;
        let next = bed.status.next();
        debug!(bed = bed_id, "{} -> {}", bed.status.label(), next.label());
        bed.status = next;

        if next == BedStatus::Available {
            bed.patient_name = None;
            bed.time_started = None;
            bed.checklist.clear();
            bed.summary = None;
            return None;
        }

        if bed.patient_name.is_none() {
            bed.patient_name = Some(DEFAULT_OCCUPANT.to_string());
        }
        if bed.time_started.is_none() {
            bed.time_started = Some(started_at.to_string());
        }
        let checklist = next.checklist();
        if !checklist.is_empty() {
            bed.checklist = checklist;
        }

        (next == BedStatus::Discharge).then(|| DischargeRequest {
            bed_id: bed.id.clone(),
            patient_name: bed.patient_name.clone().unwrap_or_default(),
            completed: bed.completed_items(),
        })
    }

    /// Store a generated summary. Dropped if the bed has left Discharge since.
    pub fn set_summary(&mut self, bed_id: &str, summary: String) -> bool {
        match self.bed_mut(bed_id) {
            Some(bed) if bed.status == BedStatus::Discharge => {
                info!(bed = bed_id, "Discharge summary ready");
                bed.summary = Some(summary);
                true
            }
            _ => {
                debug!(bed = bed_id, "Discarding stale discharge summary");
                false
            }
        }
    }

    pub fn toggle_checklist_item(&mut self, bed_id: &str, item_id: &str) -> bool {
        let Some(bed) = self.bed_mut(bed_id) else {
            return false;
        };
        match bed.checklist.iter_mut().find(|c| c.id == item_id) {
            Some(item) => {
                item.completed = !item.completed;
                true
            }
            None => false,
        }
    }
}

impl Default for BedBoard {
    fn default() -> Self {
        Self::demo()
    }
}

/// Wall-clock label for a bed's start time, e.g. "02:15 PM".
pub fn started_at_now() -> String {
    chrono::Local::now().format("%I:%M %p").to_string()
}
