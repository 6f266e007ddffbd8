//! Plan line rendering.
//!
//! Entity-derived plan lines are generated here and nowhere else, so the text
//! shown in the plan buffer and the entries that own it cannot drift apart.

use crate::models::{Medication, PlanEntry, PlanOrigin};

pub fn diagnosis_line(name: &str, code: &str) -> String {
    format!("Confirmed: {} ({}).", name, code)
}

pub fn plan_item_line(item: &str) -> String {
    format!("Plan: {}.", item)
}

pub fn order_line(order: &str) -> String {
    format!("Ordered: {}.", order)
}

pub fn medication_line(med: &Medication) -> String {
    let parts: Vec<&str> = [med.name.trim(), med.dosage.trim(), med.frequency.trim()]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect();
    format!("Prescribed: {}.", parts.join(" "))
}

/// Remove every entry derived from `origin`.
pub(crate) fn remove_origin(entries: &mut Vec<PlanEntry>, origin: &PlanOrigin) {
    entries.retain(|e| &e.origin != origin);
}

/// Render the plan buffer: narrative first, then one line per entry.
pub fn render(narrative: &str, entries: &[PlanEntry]) -> String {
    let mut lines: Vec<&str> = Vec::with_capacity(entries.len() + 1);
    let narrative = narrative.trim();
    if !narrative.is_empty() {
        lines.push(narrative);
    }
    lines.extend(entries.iter().map(|e| e.text.as_str()));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_medication_line() {
        let med = Medication::new("Amoxicillin", "500mg", "BID");
        assert_eq!(medication_line(&med), "Prescribed: Amoxicillin 500mg BID.");
    }

    #[test]
    fn test_medication_line_skips_blank_parts() {
        let med = Medication::new("Albuterol", "", "PRN");
        assert_eq!(medication_line(&med), "Prescribed: Albuterol PRN.");
    }

    #[test]
    fn test_render_without_narrative() {
        let entries = vec![PlanEntry {
            origin: PlanOrigin::Order("CBC".into()),
            text: order_line("CBC"),
        }];
        assert_eq!(render("  ", &entries), "Ordered: CBC.");
        assert_eq!(render("Rest.", &entries), "Rest.\nOrdered: CBC.");
    }
}
