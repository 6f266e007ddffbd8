//! Visit session state machine.
//!
//! Every transition takes the session by value and returns the next one.
//! Transitions are total: unknown ids, duplicate adds and out-of-list labels
//! leave the session unchanged.
//!
//! The plan buffer is a view. Confirmed diagnoses, plan items, orders and
//! medications each own one [`PlanEntry`]; removing the entity removes its
//! entry, and [`VisitSession::plan_text`] renders the narrative followed by
//! the entries.

pub mod plan;

use flowmd_llm::{fingerprint, ContextQuery, DifferentialDiagnosis, TranscriptResult};

use crate::models::{
    ConfirmedDiagnosis, FindingSet, FindingState, Medication, PlanEntry, PlanOrigin, SegmentKey,
    SoapSegment, TranscriptSegment, VisitSession,
};

/// Hex digits of the content fingerprint kept in a medication id.
const MEDICATION_ID_HEX: usize = 16;

/// Deterministic id for a medication that arrived without one.
///
/// Derived from the case-folded name, dosage and frequency, so any script
/// yields a distinct id and re-adding the same order is a no-op.
fn medication_id(med: &Medication) -> String {
    let canonical = [&med.name, &med.dosage, &med.frequency]
        .iter()
        .map(|part| part.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase())
        .collect::<Vec<_>>()
        .join("|");
    format!("med-{}", &fingerprint(&canonical)[..MEDICATION_ID_HEX])
}

fn clean(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl VisitSession {
    // =========================================================================
    // Intake
    // =========================================================================

    /// Add `label` if absent, remove it if present.
    pub fn toggle_symptom(mut self, label: &str) -> Self {
        let Some(label) = clean(label) else {
            return self;
        };
        if !self.symptoms.remove(&label) {
            self.symptoms.insert(label);
        }
        self
    }

    /// Cycle a finding: unset, Normal, Finding, unset.
    pub fn toggle_finding(mut self, set: FindingSet, label: &str) -> Self {
        if !set.contains(label) {
            return self;
        }
        let findings = self.findings_mut(set);
        match findings.get(label).copied() {
            None => {
                findings.insert(label.to_string(), FindingState::Normal);
            }
            Some(FindingState::Normal) => {
                findings.insert(label.to_string(), FindingState::Finding);
            }
            Some(FindingState::Finding) => {
                findings.remove(label);
            }
        }
        self
    }

    // =========================================================================
    // Assessment
    // =========================================================================

    /// Accept a differential diagnosis; approves the assessment segment.
    pub fn confirm_diagnosis(mut self, ddx: &DifferentialDiagnosis) -> Self {
        let (Some(code), Some(name)) = (clean(&ddx.code), clean(&ddx.name)) else {
            return self;
        };
        if self.is_confirmed(&code) {
            return self;
        }
        self.plan_entries.push(PlanEntry {
            origin: PlanOrigin::Diagnosis(code.clone()),
            text: plan::diagnosis_line(&name, &code),
        });
        self.confirmed_diagnoses.push(ConfirmedDiagnosis { code, name });
        self.soap.assessment.approved = true;
        self
    }

    /// Withdraw a confirmed diagnosis and its plan line.
    ///
    /// The assessment stays approved; approval is never revoked implicitly.
    pub fn retract_diagnosis(mut self, code: &str) -> Self {
        let code = code.trim();
        let before = self.confirmed_diagnoses.len();
        self.confirmed_diagnoses.retain(|d| d.code != code);
        if self.confirmed_diagnoses.len() != before {
            plan::remove_origin(&mut self.plan_entries, &PlanOrigin::Diagnosis(code.to_string()));
        }
        self
    }

    // =========================================================================
    // Plan
    // =========================================================================

    pub fn add_plan_item(mut self, item: &str) -> Self {
        let Some(item) = clean(item) else {
            return self;
        };
        if self.plan_items.contains(&item) {
            return self;
        }
        self.plan_entries.push(PlanEntry {
            origin: PlanOrigin::PlanItem(item.clone()),
            text: plan::plan_item_line(&item),
        });
        self.plan_items.push(item);
        self
    }

    pub fn remove_plan_item(mut self, item: &str) -> Self {
        let item = item.trim();
        self.plan_items.retain(|i| i != item);
        plan::remove_origin(&mut self.plan_entries, &PlanOrigin::PlanItem(item.to_string()));
        self
    }

    pub fn add_order(mut self, order: &str) -> Self {
        let Some(order) = clean(order) else {
            return self;
        };
        if self.orders.contains(&order) {
            return self;
        }
        self.plan_entries.push(PlanEntry {
            origin: PlanOrigin::Order(order.clone()),
            text: plan::order_line(&order),
        });
        self.orders.push(order);
        self
    }

    pub fn remove_order(mut self, order: &str) -> Self {
        let order = order.trim();
        self.orders.retain(|o| o != order);
        plan::remove_origin(&mut self.plan_entries, &PlanOrigin::Order(order.to_string()));
        self
    }

    /// Add a medication. A missing id is derived from its contents.
    pub fn add_medication(mut self, med: Medication) -> Self {
        if med.name.trim().is_empty() {
            return self;
        }
        let mut med = Medication {
            id: med.id.trim().to_string(),
            name: med.name.trim().to_string(),
            dosage: med.dosage.trim().to_string(),
            frequency: med.frequency.trim().to_string(),
        };
        if med.id.is_empty() {
            med.id = medication_id(&med);
        }
        if self.medications.iter().any(|m| m.id == med.id) {
            return self;
        }
        self.plan_entries.push(PlanEntry {
            origin: PlanOrigin::Medication(med.id.clone()),
            text: plan::medication_line(&med),
        });
        self.medications.push(med);
        self
    }

    pub fn remove_medication(mut self, id: &str) -> Self {
        self.medications.retain(|m| m.id != id);
        plan::remove_origin(&mut self.plan_entries, &PlanOrigin::Medication(id.to_string()));
        self
    }

    // =========================================================================
    // SOAP draft
    // =========================================================================

    /// Overwrite the SOAP draft and medications from an ambient transcript.
    ///
    /// All four segments are replaced and unapproved, including any the
    /// clinician had edited. The narrative line is appended to the notes.
    /// Diagnosis, plan item and order entries are kept.
    pub fn apply_transcript_result(mut self, result: &TranscriptResult) -> Self {
        for (key, draft) in [
            (SegmentKey::Subjective, &result.subjective),
            (SegmentKey::Objective, &result.objective),
            (SegmentKey::Assessment, &result.assessment),
            (SegmentKey::Plan, &result.plan),
        ] {
            *self.soap.segment_mut(key) = SoapSegment {
                content: draft.content.trim().to_string(),
                confidence: draft.confidence,
                approved: false,
            };
        }

        if let Some(line) = clean(&result.narrative) {
            if self.manual_notes.trim().is_empty() {
                self.manual_notes = line;
            } else {
                self.manual_notes = format!("{}\n{}", self.manual_notes.trim_end(), line);
            }
        }

        self.plan_entries
            .retain(|e| !matches!(e.origin, PlanOrigin::Medication(_)));
        self.medications.clear();
        result
            .medications
            .iter()
            .cloned()
            .fold(self, |session, med| session.add_medication(med))
    }

    pub fn approve_segment(mut self, key: SegmentKey) -> Self {
        self.soap.segment_mut(key).approved = true;
        self
    }

    /// Replace the clinician's narrative wholesale.
    pub fn set_manual_notes(mut self, text: &str) -> Self {
        self.manual_notes = text.to_string();
        self
    }

    // =========================================================================
    // Transcript
    // =========================================================================

    pub fn append_transcript(mut self, segment: TranscriptSegment) -> Self {
        let Some(text) = clean(&segment.text) else {
            return self;
        };
        self.transcript.push(TranscriptSegment {
            speaker: segment.speaker,
            text,
        });
        self
    }

    pub fn clear_transcript(mut self) -> Self {
        self.transcript.clear();
        self
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// The plan buffer: plan narrative, then every entity-derived line.
    pub fn plan_text(&self) -> String {
        plan::render(&self.soap.plan.content, &self.plan_entries)
    }

    /// Findings rendered as "ROS Respiratory: Finding".
    pub fn findings_summary(&self) -> Vec<String> {
        [FindingSet::Ros, FindingSet::Exam]
            .into_iter()
            .flat_map(|set| {
                self.findings(set)
                    .iter()
                    .map(move |(label, state)| format!("{} {}: {:?}", set.prefix(), label, state))
            })
            .collect()
    }

    /// Inputs for the clinical context engine.
    pub fn context_query(&self, history: &[String]) -> ContextQuery {
        ContextQuery {
            symptoms: self.symptoms.iter().cloned().collect(),
            history: history.to_vec(),
            findings: self.findings_summary(),
            notes: self.manual_notes.clone(),
            diagnoses: self
                .confirmed_diagnoses
                .iter()
                .map(|d| d.code.clone())
                .collect(),
        }
    }

    /// Full visit narrative used for claim extraction and summaries.
    ///
    /// Empty sections are omitted; an untouched session yields an empty string.
    pub fn narrative(&self) -> String {
        let mut sections: Vec<String> = Vec::new();
        if !self.symptoms.is_empty() {
            let symptoms: Vec<&str> = self.symptoms.iter().map(String::as_str).collect();
            sections.push(format!("Symptoms: {}", symptoms.join(", ")));
        }
        let findings = self.findings_summary();
        if !findings.is_empty() {
            sections.push(format!("Findings: {}", findings.join("; ")));
        }
        for key in [SegmentKey::Subjective, SegmentKey::Objective, SegmentKey::Assessment] {
            let content = self.soap.segment(key).content.trim();
            if !content.is_empty() {
                sections.push(format!("{}: {}", key.label(), content));
            }
        }
        if !self.confirmed_diagnoses.is_empty() {
            let dx: Vec<String> = self
                .confirmed_diagnoses
                .iter()
                .map(|d| format!("{} ({})", d.name, d.code))
                .collect();
            sections.push(format!("Diagnoses: {}", dx.join(", ")));
        }
        let plan = self.plan_text();
        if !plan.is_empty() {
            sections.push(format!("Plan:\n{}", plan));
        }
        if let Some(notes) = clean(&self.manual_notes) {
            sections.push(format!("Notes: {}", notes));
        }
        sections.join("\n")
    }
}
