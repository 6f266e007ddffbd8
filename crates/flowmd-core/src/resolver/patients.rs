//! Patient directory with fuzzy name lookup.

use super::fuzzy_match;
use crate::models::{ClaimStatus, Eligibility, Patient, Trend};

/// Minimum score for a name to count as a match at all.
const MATCH_THRESHOLD: f64 = 0.80;

/// Two candidates closer than this are indistinguishable.
const AMBIGUITY_MARGIN: f64 = 0.05;

/// Outcome of resolving a name against the directory.
#[derive(Debug, Clone, PartialEq)]
pub enum NameMatch<'a> {
    Unique(&'a Patient),
    Ambiguous(Vec<&'a Patient>),
    NotFound,
}

/// A patient with its match score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPatient<'a> {
    pub patient: &'a Patient,
    pub score: f64,
}

/// Read-only set of known patients.
#[derive(Debug, Clone, Default)]
pub struct PatientDirectory {
    patients: Vec<Patient>,
}

impl PatientDirectory {
    pub fn new(patients: Vec<Patient>) -> Self {
        Self { patients }
    }

    /// The demonstration roster.
    pub fn demo() -> Self {
        let mut john = Patient::new("1", "John Doe").with_history(&["Hypertension", "Type 2 Diabetes"]);
        john.age = 45;
        john.gender = "Male".into();
        john.last_visit = "2023-10-12".into();
        john.trend = Trend::Improving;
        john.eligibility = Eligibility::Verified;
        john.claim_status = ClaimStatus::Paid;

        let mut jane = Patient::new("2", "Jane Smith").with_history(&["Seasonal Allergies", "Asthma"]);
        jane.age = 32;
        jane.gender = "Female".into();
        jane.last_visit = "2023-11-05".into();
        jane.trend = Trend::Stable;
        jane.eligibility = Eligibility::Verified;
        jane.claim_status = ClaimStatus::Draft;

        let mut robert =
            Patient::new("3", "Robert Wilson").with_history(&["COPD", "Gout", "CKD Stage 2"]);
        robert.age = 68;
        robert.gender = "Male".into();
        robert.last_visit = "2023-09-20".into();
        robert.trend = Trend::Worsening;
        robert.eligibility = Eligibility::Denied;
        robert.claim_status = ClaimStatus::NotFiled;

        let mut sarah = Patient::new("4", "Sarah Parker").with_history(&["Anxiety", "Insomnia"]);
        sarah.age = 29;
        sarah.gender = "Female".into();
        sarah.last_visit = "2023-11-20".into();
        sarah.trend = Trend::Stable;
        sarah.eligibility = Eligibility::Pending;
        sarah.claim_status = ClaimStatus::NotFiled;

        Self::new(vec![john, jane, robert, sarah])
    }

    pub fn all(&self) -> &[Patient] {
        &self.patients
    }

    pub fn get(&self, id: &str) -> Option<&Patient> {
        self.patients.iter().find(|p| p.id == id)
    }

    /// Score `query` against a name: the full name or any single name part.
    fn score(query: &str, name: &str) -> f64 {
        name.split_whitespace()
            .map(|part| fuzzy_match(query, part))
            .fold(fuzzy_match(query, name), f64::max)
    }

    /// Patients whose name matches `query`, best first.
    pub fn search(&self, query: &str, limit: usize) -> Vec<ScoredPatient<'_>> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }
        let mut scored: Vec<ScoredPatient<'_>> = self
            .patients
            .iter()
            .map(|p| ScoredPatient {
                patient: p,
                score: Self::score(query, &p.name),
            })
            .filter(|s| s.score >= MATCH_THRESHOLD)
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        scored
    }

    /// Resolve a name to exactly one patient if the match is clear.
    pub fn resolve_name(&self, name: &str) -> NameMatch<'_> {
        let matches = self.search(name, usize::MAX);
        match matches.as_slice() {
            [] => NameMatch::NotFound,
            [only] => NameMatch::Unique(only.patient),
            [first, second, ..] if first.score - second.score >= AMBIGUITY_MARGIN => {
                NameMatch::Unique(first.patient)
            }
            [first, ..] => NameMatch::Ambiguous(
                matches
                    .iter()
                    .filter(|m| first.score - m.score < AMBIGUITY_MARGIN)
                    .map(|m| m.patient)
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_roster() {
        let dir = PatientDirectory::demo();
        assert_eq!(dir.all().len(), 4);
        let robert = dir.get("3").unwrap();
        assert_eq!(robert.history, vec!["COPD", "Gout", "CKD Stage 2"]);
        assert_eq!(robert.eligibility, Eligibility::Denied);
    }

    #[test]
    fn test_search_by_first_name_and_typo() {
        let dir = PatientDirectory::demo();
        let hits = dir.search("jane", 5);
        assert_eq!(hits[0].patient.id, "2");
        let hits = dir.search("Robert Wilsen", 5);
        assert_eq!(hits[0].patient.id, "3");
    }

    #[test]
    fn test_resolve_unique_and_not_found() {
        let dir = PatientDirectory::demo();
        assert!(matches!(dir.resolve_name("Sarah Parker"), NameMatch::Unique(p) if p.id == "4"));
        assert_eq!(dir.resolve_name("Zebulon"), NameMatch::NotFound);
        assert_eq!(dir.resolve_name("  "), NameMatch::NotFound);
    }

    #[test]
    fn test_resolve_ambiguous_shared_name() {
        let dir = PatientDirectory::new(vec![
            Patient::new("a", "Jane Smith"),
            Patient::new("b", "Jane Doe"),
        ]);
        match dir.resolve_name("Jane") {
            NameMatch::Ambiguous(candidates) => assert_eq!(candidates.len(), 2),
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }
}
