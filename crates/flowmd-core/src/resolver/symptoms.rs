//! Symptom label normalizer.
//!
//! Handles:
//! - Alias expansion (sob→Shortness of Breath, pyrexia→Fever)
//! - Case folding onto taxonomy labels (cough→Cough)
//! - Typo correction against the taxonomy (Headach→Headache)
//!
//! Labels that match nothing pass through trimmed; free-text symptoms are valid.

use std::collections::HashMap;

use super::fuzzy_match;
use crate::models::{common_symptoms, Symptom};

/// Minimum similarity for a typo to be corrected to a taxonomy label.
const FUZZY_THRESHOLD: f64 = 0.88;

pub struct SymptomNormalizer {
    taxonomy: Vec<Symptom>,
    /// Alias map: lowercase spoken form → taxonomy label
    aliases: HashMap<String, String>,
}

impl Default for SymptomNormalizer {
    fn default() -> Self {
        Self::new(common_symptoms())
    }
}

impl SymptomNormalizer {
    pub fn new(taxonomy: Vec<Symptom>) -> Self {
        Self {
            taxonomy,
            aliases: Self::default_aliases(),
        }
    }

    fn default_aliases() -> HashMap<String, String> {
        [
            ("sob", "Shortness of Breath"),
            ("dyspnea", "Shortness of Breath"),
            ("dyspnoea", "Shortness of Breath"),
            ("short of breath", "Shortness of Breath"),
            ("breathlessness", "Shortness of Breath"),
            ("pyrexia", "Fever"),
            ("febrile", "Fever"),
            ("tired", "Fatigue"),
            ("tiredness", "Fatigue"),
            ("malaise", "Fatigue"),
            ("nauseous", "Nausea"),
            ("coughing", "Cough"),
            ("cephalgia", "Headache"),
            ("myalgia", "Body Ache"),
            ("body aches", "Body Ache"),
            ("chest discomfort", "Chest Pain"),
        ]
        .into_iter()
        .map(|(alias, label)| (alias.to_string(), label.to_string()))
        .collect()
    }

    pub fn taxonomy(&self) -> &[Symptom] {
        &self.taxonomy
    }

    /// Canonical label for `raw`, or `raw` trimmed when nothing matches.
    pub fn normalize(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        let lower = trimmed.to_lowercase();
        if lower.is_empty() {
            return String::new();
        }

        if let Some(label) = self.aliases.get(&lower) {
            return label.clone();
        }

        if let Some(symptom) = self
            .taxonomy
            .iter()
            .find(|s| s.label.to_lowercase() == lower)
        {
            return symptom.label.clone();
        }

        let best = self
            .taxonomy
            .iter()
            .map(|s| (s, fuzzy_match(trimmed, &s.label)))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        match best {
            Some((symptom, score)) if score >= FUZZY_THRESHOLD => symptom.label.clone(),
            _ => trimmed.to_string(),
        }
    }

    /// Category of a (normalized) label, if it is in the taxonomy.
    pub fn category(&self, label: &str) -> Option<&str> {
        self.taxonomy
            .iter()
            .find(|s| s.label == label)
            .map(|s| s.category.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_expansion() {
        let n = SymptomNormalizer::default();
        assert_eq!(n.normalize("SOB"), "Shortness of Breath");
        assert_eq!(n.normalize(" pyrexia "), "Fever");
    }

    #[test]
    fn test_case_folding() {
        let n = SymptomNormalizer::default();
        assert_eq!(n.normalize("chest pain"), "Chest Pain");
    }

    #[test]
    fn test_typo_correction() {
        let n = SymptomNormalizer::default();
        assert_eq!(n.normalize("Headach"), "Headache");
    }

    #[test]
    fn test_unknown_label_passes_through() {
        let n = SymptomNormalizer::default();
        assert_eq!(n.normalize("  Night sweats "), "Night sweats");
        assert_eq!(n.normalize("   "), "");
    }

    #[test]
    fn test_category() {
        let n = SymptomNormalizer::default();
        assert_eq!(n.category("Nausea"), Some("GI"));
        assert_eq!(n.category("Night sweats"), None);
    }
}
