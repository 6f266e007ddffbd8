//! Golden tests for symptom and patient name resolution.

use flowmd_core::resolver::{NameMatch, PatientDirectory, SymptomNormalizer};

/// Test case from golden file.
struct GoldenCase {
    id: &'static str,
    input: &'static str,
    expected: &'static str,
    expected_category: Option<&'static str>,
}

fn get_golden_cases() -> Vec<GoldenCase> {
    vec![
        GoldenCase {
            id: "exact",
            input: "Cough",
            expected: "Cough",
            expected_category: Some("Respiratory"),
        },
        GoldenCase {
            id: "lowercase",
            input: "fever",
            expected: "Fever",
            expected_category: Some("General"),
        },
        GoldenCase {
            id: "abbreviation",
            input: "SOB",
            expected: "Shortness of Breath",
            expected_category: Some("Respiratory"),
        },
        GoldenCase {
            id: "clinical-term",
            input: "dyspnea",
            expected: "Shortness of Breath",
            expected_category: Some("Respiratory"),
        },
        GoldenCase {
            id: "lay-term",
            input: "tired",
            expected: "Fatigue",
            expected_category: Some("General"),
        },
        GoldenCase {
            id: "dropped-letter",
            input: "Headach",
            expected: "Headache",
            expected_category: Some("Neurological"),
        },
        GoldenCase {
            id: "whitespace",
            input: "  chest pain  ",
            expected: "Chest Pain",
            expected_category: Some("Cardiac"),
        },
        GoldenCase {
            id: "free-text",
            input: "Night sweats",
            expected: "Night sweats",
            expected_category: None,
        },
    ]
}

#[test]
fn test_golden_symptom_normalization() {
    let normalizer = SymptomNormalizer::default();

    for case in get_golden_cases() {
        let label = normalizer.normalize(case.input);
        assert_eq!(label, case.expected, "Case {}: label mismatch", case.id);
        assert_eq!(
            normalizer.category(&label),
            case.expected_category,
            "Case {}: category mismatch",
            case.id
        );
    }
}

#[test]
fn test_normalization_is_idempotent() {
    let normalizer = SymptomNormalizer::default();
    for case in get_golden_cases() {
        let once = normalizer.normalize(case.input);
        assert_eq!(normalizer.normalize(&once), once, "Case {}", case.id);
    }
}

#[test]
fn test_golden_patient_names() {
    let directory = PatientDirectory::demo();
    let cases = [
        ("John Doe", Some("1")),
        ("jane", Some("2")),
        ("Robrt Wilson", Some("3")),
        ("Parker", Some("4")),
        ("Mary Jones", None),
    ];
    for (name, expected) in cases {
        let resolved = match directory.resolve_name(name) {
            NameMatch::Unique(p) => Some(p.id.as_str()),
            NameMatch::NotFound => None,
            NameMatch::Ambiguous(c) => panic!("{} was ambiguous: {} candidates", name, c.len()),
        };
        assert_eq!(resolved, expected, "Name {}", name);
    }
}
