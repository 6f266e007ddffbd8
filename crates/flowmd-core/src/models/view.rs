//! Persisted view state.

use serde::{Deserialize, Serialize};

/// Visit workspace tab.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Symptoms,
    Notes,
    Assessment,
    Plan,
    History,
}

impl Tab {
    pub fn parse(s: &str) -> Option<Tab> {
        match s.trim().to_lowercase().as_str() {
            "symptoms" => Some(Tab::Symptoms),
            "notes" => Some(Tab::Notes),
            "assessment" => Some(Tab::Assessment),
            "plan" => Some(Tab::Plan),
            "history" => Some(Tab::History),
            _ => None,
        }
    }
}

/// Which patient is open and which tab is showing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ViewState {
    pub active_patient: Option<String>,
    pub active_tab: Tab,
}
