//! Symptom taxonomy.

use serde::{Deserialize, Serialize};

/// A selectable symptom.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Symptom {
    pub id: String,
    pub label: String,
    pub category: String,
}

impl Symptom {
    pub fn new(id: &str, label: &str, category: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            category: category.to_string(),
        }
    }
}

/// The quick-pick symptoms offered at intake.
pub fn common_symptoms() -> Vec<Symptom> {
    vec![
        Symptom::new("s1", "Cough", "Respiratory"),
        Symptom::new("s2", "Fever", "General"),
        Symptom::new("s3", "Fatigue", "General"),
        Symptom::new("s4", "Nausea", "GI"),
        Symptom::new("s5", "Shortness of Breath", "Respiratory"),
        Symptom::new("s6", "Headache", "Neurological"),
        Symptom::new("s7", "Body Ache", "General"),
        Symptom::new("s8", "Chest Pain", "Cardiac"),
    ]
}
