use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::schedule::placement::validate_appointments;
use crate::schedule::{Appointment, Contact, Parties, PinnedRow};

/// Schedule generation request from the frontend or the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub role: String,
    pub hire_date: NaiveDate,
    pub newcomer: Contact,
    pub manager1: Contact,
    #[serde(default)]
    pub manager2: Option<Contact>,
    pub appointments: Vec<Appointment>,
    #[serde(default)]
    pub pinned: Vec<PinnedRow>,
}

impl GenerateRequest {
    pub fn parties(&self) -> Parties {
        Parties {
            newcomer: self.newcomer.clone(),
            manager1: self.manager1.clone(),
            manager2: self.manager2.clone(),
        }
    }

    /// Appointments stable-sorted by their order key, the sequence placement
    /// works through. Equal keys keep the order they were sent in.
    pub fn ordered_appointments(&self) -> Vec<Appointment> {
        let mut appointments = self.appointments.clone();
        appointments.sort_by_key(|a| a.order);
        appointments
    }
}

/// Validates a generation request and returns the normalized parties.
/// Nothing is scheduled when any check fails.
pub fn validate_request(req: &GenerateRequest) -> Result<Parties> {
    let parties = req.parties().validate()?;

    if req.role.trim().is_empty() {
        return Err(ScheduleError::MissingField { field: "role" });
    }
    if req.appointments.is_empty() {
        return Err(ScheduleError::NoAppointmentsForRole {
            role: req.role.trim().to_string(),
        });
    }
    validate_appointments(&req.appointments)?;

    Ok(parties)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GenerateRequest {
        serde_json::from_value(serde_json::json!({
            "role": "Analyst",
            "hire_date": "2024-01-01",
            "newcomer": {"name": "Giannis Andreadakis", "id": "giannis@example.com"},
            "manager1": {"name": "Peter Vassilikos", "id": "peter@example.com"},
            "manager2": {"name": "", "id": ""},
            "appointments": [
                {"role": "Analyst", "title": "Welcome", "duration_minutes": 30}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn blank_second_manager_is_dropped() {
        let parties = validate_request(&request()).unwrap();
        assert_eq!(parties.manager2, None);
        assert!(request().pinned.is_empty());
    }

    #[test]
    fn newcomer_identity_is_required() {
        let mut req = request();
        req.newcomer.name = "  ".to_string();
        assert!(matches!(
            validate_request(&req),
            Err(ScheduleError::MissingField { field: "newcomer name" })
        ));
    }

    #[test]
    fn empty_appointment_list_is_rejected() {
        let mut req = request();
        req.appointments.clear();
        assert!(matches!(
            validate_request(&req),
            Err(ScheduleError::NoAppointmentsForRole { .. })
        ));
    }

    #[test]
    fn appointments_follow_their_order_key() {
        let req: GenerateRequest = serde_json::from_value(serde_json::json!({
            "role": "Analyst",
            "hire_date": "2024-01-01",
            "newcomer": {"name": "Giannis Andreadakis", "id": "giannis@example.com"},
            "manager1": {"name": "Peter Vassilikos", "id": "peter@example.com"},
            "appointments": [
                {"role": "Analyst", "title": "IT setup", "duration_minutes": 60, "order": 2},
                {"role": "Analyst", "title": "Welcome", "duration_minutes": 30, "order": 1},
                {"role": "Analyst", "title": "HR paperwork", "duration_minutes": 45, "order": 2}
            ]
        }))
        .unwrap();
        let titles: Vec<String> = req.ordered_appointments().into_iter().map(|a| a.title).collect();
        assert_eq!(titles, ["Welcome", "IT setup", "HR paperwork"]);
    }

    #[test]
    fn zero_duration_is_rejected() {
        let mut req = request();
        req.appointments[0].duration_minutes = 0;
        assert!(matches!(
            validate_request(&req),
            Err(ScheduleError::InvalidDuration { row: 1, .. })
        ));
    }
}
