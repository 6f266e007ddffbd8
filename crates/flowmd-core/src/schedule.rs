//! Natural-language scheduling commands.
//!
//! The model proposes a patient, date and time; nothing is booked unless all
//! three resolve cleanly. Anything less is rejected for the user to rephrase.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use flowmd_llm::{InferenceGateway, ScheduleProposal};
use thiserror::Error;
use tracing::{info, warn};

use crate::resolver::{NameMatch, PatientDirectory};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    #[error("Scheduling command is ambiguous: {0}")]
    Ambiguous(String),
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;

/// A fully resolved booking request.
#[derive(Debug, Clone, PartialEq)]
pub struct Appointment {
    /// `None` for a patient not yet in the directory
    pub patient_id: Option<String>,
    pub patient_name: String,
    pub starts_at: NaiveDateTime,
    pub reason: Option<String>,
}

fn ambiguous(reason: impl Into<String>) -> ScheduleError {
    ScheduleError::Ambiguous(reason.into())
}

fn required<'a>(field: &'a Option<String>, what: &str) -> ScheduleResult<&'a str> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ambiguous(format!("no {} given", what)))
}

/// Validate a model proposal against the directory.
pub fn resolve_proposal(
    proposal: &ScheduleProposal,
    directory: &PatientDirectory,
) -> ScheduleResult<Appointment> {
    if proposal.ambiguous {
        return Err(ambiguous(
            proposal
                .reason
                .clone()
                .unwrap_or_else(|| "command could not be interpreted".to_string()),
        ));
    }

    let name = required(&proposal.patient_name, "patient")?;
    let date_text = required(&proposal.date, "date")?;
    let time_text = required(&proposal.time, "time")?;

    let date = NaiveDate::parse_from_str(date_text, "%Y-%m-%d")
        .map_err(|_| ambiguous(format!("unrecognised date '{}'", date_text)))?;
    let time = NaiveTime::parse_from_str(time_text, "%H:%M")
        .map_err(|_| ambiguous(format!("unrecognised time '{}'", time_text)))?;

    let (patient_id, patient_name) = match directory.resolve_name(name) {
        NameMatch::Unique(patient) => (Some(patient.id.clone()), patient.name.clone()),
        NameMatch::NotFound => (None, name.to_string()),
        NameMatch::Ambiguous(candidates) => {
            let names: Vec<&str> = candidates.iter().map(|p| p.name.as_str()).collect();
            return Err(ambiguous(format!(
                "'{}' matches several patients: {}",
                name,
                names.join(", ")
            )));
        }
    };

    Ok(Appointment {
        patient_id,
        patient_name,
        starts_at: date.and_time(time),
        reason: proposal
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(String::from),
    })
}

/// Interpret `command` relative to `today` and resolve it.
///
/// An unavailable model rejects the command the same way an unclear one does.
pub async fn schedule_command(
    gateway: &InferenceGateway,
    directory: &PatientDirectory,
    command: &str,
    today: NaiveDate,
) -> ScheduleResult<Appointment> {
    if command.trim().is_empty() {
        return Err(ambiguous("empty command"));
    }
    let today = today.format("%Y-%m-%d").to_string();
    let proposal = gateway.parse_schedule(command, &today).await.map_err(|e| {
        warn!("Scheduling command not interpreted: {}", e);
        ambiguous(format!("could not interpret command ({})", e))
    })?;
    let appointment = resolve_proposal(&proposal, directory)?;
    info!(
        "Scheduled {} at {}",
        appointment.patient_id.as_deref().unwrap_or("new patient"),
        appointment.starts_at
    );
    Ok(appointment)
}
