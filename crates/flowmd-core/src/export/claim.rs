//! Claim export for billing systems.

use flowmd_llm::{fingerprint, BillingComplexity, ClaimData, JustifiedCode, SourceSection};
use serde::{Deserialize, Serialize};

/// Export of one finalized visit's claim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClaimExport {
    pub metadata: ClaimMetadata,
    pub lines: Vec<ClaimLine>,
    pub estimated_reimbursement: f64,
    pub payer: String,
    pub billing_complexity: BillingComplexity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClaimMetadata {
    pub export_id: String,
    pub patient_id: String,
    pub exported_at: String,
    /// SHA-256 of the narrative the codes were justified against
    pub narrative_hash: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CodeKind {
    Diagnosis,
    Procedure,
}

impl CodeKind {
    fn label(&self) -> &'static str {
        match self {
            CodeKind::Diagnosis => "diagnosis",
            CodeKind::Procedure => "procedure",
        }
    }
}

/// A single billed code with its evidence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClaimLine {
    pub kind: CodeKind,
    pub code: String,
    pub description: String,
    pub evidence: String,
    pub source_section: SourceSection,
}

impl ClaimLine {
    fn from_code(kind: CodeKind, code: &JustifiedCode) -> Self {
        Self {
            kind,
            code: code.code.clone(),
            description: code.description.clone(),
            evidence: code.evidence.clone(),
            source_section: code.source_section,
        }
    }
}

fn section_label(section: SourceSection) -> &'static str {
    match section {
        SourceSection::Subjective => "Subjective",
        SourceSection::Objective => "Objective",
        SourceSection::Assessment => "Assessment",
        SourceSection::Plan => "Plan",
        SourceSection::Exam => "Exam",
        SourceSection::History => "History",
    }
}

impl ClaimExport {
    /// Build an export; diagnosis codes are listed before procedure codes.
    pub fn from_claim(patient_id: &str, claim: &ClaimData, narrative: &str) -> Self {
        let lines = claim
            .diagnosis_codes
            .iter()
            .map(|c| ClaimLine::from_code(CodeKind::Diagnosis, c))
            .chain(
                claim
                    .procedure_codes
                    .iter()
                    .map(|c| ClaimLine::from_code(CodeKind::Procedure, c)),
            )
            .collect();

        Self {
            metadata: ClaimMetadata {
                export_id: uuid::Uuid::new_v4().to_string(),
                patient_id: patient_id.to_string(),
                exported_at: chrono::Utc::now().to_rfc3339(),
                narrative_hash: fingerprint(narrative),
            },
            lines,
            estimated_reimbursement: claim.estimated_reimbursement,
            payer: claim.payer.clone(),
            billing_complexity: claim.billing_complexity,
        }
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format, one row per code.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        csv.push_str("export_id,patient_id,kind,code,description,evidence,source_section,payer,exported_at\n");

        for line in &self.lines {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{}\n",
                escape_csv(&self.metadata.export_id),
                escape_csv(&self.metadata.patient_id),
                line.kind.label(),
                escape_csv(&line.code),
                escape_csv(&line.description),
                escape_csv(&line.evidence),
                section_label(line.source_section),
                escape_csv(&self.payer),
                escape_csv(&self.metadata.exported_at),
            ));
        }

        csv
    }
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
