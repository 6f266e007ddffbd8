//! Fuzzy resolution of clinician-typed names.
//!
//! - [`SymptomNormalizer`]: free-typed symptom labels onto the taxonomy
//! - [`PatientDirectory`]: spoken or typed patient names onto records

mod patients;
mod symptoms;

pub use patients::*;
pub use symptoms::*;

use strsim::{jaro_winkler, normalized_levenshtein};

/// Compute fuzzy string similarity using combined metrics.
///
/// Inputs are compared case-insensitively.
pub fn fuzzy_match(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    // Jaro-Winkler favours shared prefixes; Levenshtein overall edit distance
    let jw = jaro_winkler(&a, &b);
    let lev = normalized_levenshtein(&a, &b);
    jw * 0.6 + lev * 0.4
}
