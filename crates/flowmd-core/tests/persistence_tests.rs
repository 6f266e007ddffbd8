//! Persistence and FFI surface tests against a file-backed SQLite store.

use flowmd_core::{
    open_store, open_store_in_memory, FfiDifferential, FfiFindingSet, FfiMedication,
    FfiSegmentKey, FfiViewState, FlowMdError,
};
use tempfile::TempDir;

fn store_path(dir: &TempDir) -> String {
    dir.path().join("flowmd.db").to_string_lossy().into_owned()
}

fn asthma() -> FfiDifferential {
    FfiDifferential {
        name: "Asthma".into(),
        code: "J45.909".into(),
        probability: 0.8,
        reasoning: "Nocturnal wheeze".into(),
    }
}

#[test]
fn test_session_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);

    {
        let core = open_store(path.clone()).unwrap();
        core.toggle_symptom("2".into(), "sob".into()).unwrap();
        core.toggle_finding("2".into(), FfiFindingSet::Exam, "Lungs".into())
            .unwrap();
        core.confirm_diagnosis("2".into(), asthma()).unwrap();
        core.add_medication(
            "2".into(),
            FfiMedication {
                id: String::new(),
                name: "Albuterol".into(),
                dosage: "90mcg".into(),
                frequency: "PRN".into(),
            },
        )
        .unwrap();
        core.set_manual_notes("2".into(), "Wheezing at night".into())
            .unwrap();
    }

    let core = open_store(path).unwrap();
    let session = core.load_session("2".into()).unwrap();
    assert_eq!(session.symptoms, vec!["Shortness of Breath"]);
    assert_eq!(session.exam_findings.len(), 1);
    assert_eq!(session.exam_findings[0].label, "Lungs");
    assert_eq!(session.exam_findings[0].state, "Normal");
    assert_eq!(session.confirmed_diagnoses[0].code, "J45.909");
    assert_eq!(session.medications[0].name, "Albuterol");
    assert!(!session.medications[0].id.is_empty());
    assert_eq!(session.manual_notes, "Wheezing at night");
    assert!(session.plan_text.contains("Confirmed: Asthma (J45.909)."));
    assert!(session.plan_text.contains("Prescribed: Albuterol 90mcg PRN."));
    assert_eq!(core.persistence_warning().unwrap(), None);
}

#[test]
fn test_sessions_are_per_patient() {
    let core = open_store_in_memory().unwrap();
    core.toggle_symptom("1".into(), "Cough".into()).unwrap();
    core.add_order("1".into(), "Chest X-ray".into()).unwrap();

    let other = core.load_session("3".into()).unwrap();
    assert!(other.symptoms.is_empty());
    assert!(other.orders.is_empty());

    let first = core.load_session("1".into()).unwrap();
    assert_eq!(first.orders, vec!["Chest X-ray"]);

    let removed = core.remove_order("1".into(), "Chest X-ray".into()).unwrap();
    assert!(removed.orders.is_empty());
}

#[test]
fn test_empty_patient_id_is_rejected() {
    let core = open_store_in_memory().unwrap();
    assert!(matches!(
        core.load_session("   ".into()),
        Err(FlowMdError::InvalidInput(_))
    ));
    assert!(matches!(
        core.toggle_symptom(String::new(), "Cough".into()),
        Err(FlowMdError::InvalidInput(_))
    ));
}

#[test]
fn test_view_state_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);
    {
        let core = open_store(path.clone()).unwrap();
        let initial = core.load_view_state().unwrap();
        assert_eq!(initial.active_patient, None);
        assert_eq!(initial.active_tab, "symptoms");

        let saved = core
            .save_view_state(FfiViewState {
                active_patient: Some("4".into()),
                active_tab: "Plan".into(),
            })
            .unwrap();
        assert!(saved);
    }

    let core = open_store(path).unwrap();
    let view = core.load_view_state().unwrap();
    assert_eq!(view.active_patient.as_deref(), Some("4"));
    assert_eq!(view.active_tab, "plan");
}

#[test]
fn test_unknown_tab_is_rejected() {
    let core = open_store_in_memory().unwrap();
    let result = core.save_view_state(FfiViewState {
        active_patient: None,
        active_tab: "billing".into(),
    });
    assert!(matches!(result, Err(FlowMdError::InvalidInput(_))));
}

#[test]
fn test_apply_transcript_json_resets_approval() {
    let core = open_store_in_memory().unwrap();
    core.approve_segment("1".into(), FfiSegmentKey::Subjective)
        .unwrap();

    let json = r#"```json
{
  "subjective": {"content": "Cough for three days.", "confidence": "high"},
  "objective": {"content": "", "confidence": "low"},
  "assessment": {"content": "Likely viral URI.", "confidence": "medium"},
  "plan": {"content": "Supportive care.", "confidence": "medium"},
  "medications": [],
  "narrative": "Patient reports a dry cough."
}
```"#;
    let session = core.apply_transcript_json("1".into(), json.into()).unwrap();
    let subjective = session.soap.iter().find(|s| s.key == "subjective").unwrap();
    assert_eq!(subjective.content, "Cough for three days.");
    assert_eq!(subjective.confidence, "high");
    assert!(!subjective.approved);
    assert_eq!(session.manual_notes, "Patient reports a dry cough.");

    assert!(matches!(
        core.apply_transcript_json("1".into(), "not json".into()),
        Err(FlowMdError::SerializationError(_))
    ));
}

#[test]
fn test_export_claim_json_and_csv() {
    let core = open_store_in_memory().unwrap();
    core.confirm_diagnosis("2".into(), asthma()).unwrap();

    let claim = r#"{
        "diagnosisCodes": [{"code": "J45.909", "description": "Asthma, unspecified",
            "evidence": "Wheezing at night, worse with cold air", "sourceSection": "Subjective"}],
        "procedureCodes": [{"code": "94010", "description": "Spirometry",
            "evidence": "Spirometry", "sourceSection": "Plan"}],
        "estimatedReimbursement": 142.5,
        "payer": "Medicare",
        "billingComplexity": "Moderate"
    }"#;

    let csv = core.export_claim_csv("2".into(), claim.into()).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "export_id,patient_id,kind,code,description,evidence,source_section,payer,exported_at"
    );
    assert_eq!(lines.len(), 3);
    assert!(lines[1].contains(",2,diagnosis,J45.909,"));
    assert!(lines[1].contains("\"Wheezing at night, worse with cold air\""));
    assert!(lines[2].contains(",procedure,94010,"));

    let json = core.export_claim_json("2".into(), claim.into()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["metadata"]["patient_id"], "2");
    assert_eq!(value["lines"].as_array().unwrap().len(), 2);

    assert!(matches!(
        core.export_claim_csv("2".into(), "{".into()),
        Err(FlowMdError::SerializationError(_))
    ));
}

#[test]
fn test_bed_cycle_through_discharge() {
    let core = open_store_in_memory().unwrap();
    let beds = core.list_beds().unwrap();
    assert_eq!(beds.iter().filter(|b| b.status != "Available").count(), 2);

    // B2 starts in Post-op
    core.toggle_checklist_item("B2".into(), "c2".into()).unwrap();
    let cycle = core.cycle_bed("B2".into()).unwrap();
    let bed = cycle.bed;
    assert_eq!(bed.status, "Discharge");
    assert!(bed.awaiting_summary);
    assert_eq!(bed.patient_name.as_deref(), Some("Jane Smith"));
    let request = cycle.discharge.unwrap();
    assert_eq!(request.bed_id, "B2");
    assert_eq!(request.patient_name, "Jane Smith");
    assert_eq!(request.completed, vec!["Pain Managed"]);

    assert!(core
        .set_bed_summary("B2".into(), "Stable for discharge.".into())
        .unwrap());
    let bed = core
        .list_beds()
        .unwrap()
        .into_iter()
        .find(|b| b.id == "B2")
        .unwrap();
    assert!(!bed.awaiting_summary);
    assert_eq!(bed.summary.as_deref(), Some("Stable for discharge."));

    let cycle = core.cycle_bed("B2".into()).unwrap();
    assert!(cycle.discharge.is_none());
    let bed = cycle.bed;
    assert_eq!(bed.status, "Available");
    assert_eq!(bed.patient_name, None);
    assert!(bed.checklist.is_empty());
    assert!(!core.set_bed_summary("B2".into(), "late".into()).unwrap());

    assert!(matches!(
        core.cycle_bed("B99".into()),
        Err(FlowMdError::NotFound(_))
    ));
}

#[test]
fn test_checklist_toggle_via_ffi() {
    let core = open_store_in_memory().unwrap();
    let bed = core.cycle_bed("B1".into()).unwrap().bed;
    assert_eq!(bed.status, "Pre-op");
    assert_eq!(bed.patient_name.as_deref(), Some("Emergency Patient"));
    assert_eq!(bed.checklist.len(), 3);

    assert!(core.toggle_checklist_item("B1".into(), "c1".into()).unwrap());
    let bed = core
        .list_beds()
        .unwrap()
        .into_iter()
        .find(|b| b.id == "B1")
        .unwrap();
    assert!(bed.checklist[0].completed);
    assert!(!core.toggle_checklist_item("B1".into(), "zz".into()).unwrap());
}

#[test]
fn test_bed_board_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = store_path(&dir);
    {
        let core = open_store(path.clone()).unwrap();
        core.cycle_bed("B1".into()).unwrap();
        core.toggle_checklist_item("B1".into(), "c1".into()).unwrap();
        core.cycle_bed("B2".into()).unwrap();
        core.set_bed_summary("B2".into(), "Stable for discharge.".into())
            .unwrap();
    }

    let core = open_store(path).unwrap();
    let beds = core.list_beds().unwrap();
    let b1 = beds.iter().find(|b| b.id == "B1").unwrap();
    assert_eq!(b1.status, "Pre-op");
    assert!(b1.checklist[0].completed);
    let b2 = beds.iter().find(|b| b.id == "B2").unwrap();
    assert_eq!(b2.status, "Discharge");
    assert_eq!(b2.summary.as_deref(), Some("Stable for discharge."));
    assert_eq!(beds.iter().filter(|b| b.status != "Available").count(), 3);
}

#[test]
fn test_patient_search() {
    let core = open_store_in_memory().unwrap();
    assert_eq!(core.list_patients().len(), 4);
    let hits = core.search_patients("Robrt".into(), 3);
    assert_eq!(hits[0].id, "3");
    assert_eq!(core.get_patient("4".into()).unwrap().name, "Sarah Parker");
    assert!(core.get_patient("99".into()).is_none());
}
