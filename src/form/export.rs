use std::io::Write;

use csv::WriterBuilder;
use serde::Serialize;

use crate::error::Result;
use crate::schedule::slot_utils::{format_date, format_time};
use crate::schedule::{Contact, ScheduledEntry};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// One exported schedule line. Field order is the column order downstream
/// spreadsheets rely on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    #[serde(rename = "Newcomer Email")]
    pub newcomer_email: String,
    #[serde(rename = "Newcomer Name")]
    pub newcomer_name: String,
    #[serde(rename = "Role Group")]
    pub role: String,
    #[serde(rename = "RDV Title")]
    pub title: String,
    #[serde(rename = "RDV Description")]
    pub description: String,
    #[serde(rename = "Contact Person1 Email")]
    pub contact1_email: String,
    #[serde(rename = "Contact Person1 Name")]
    pub contact1_name: String,
    #[serde(rename = "Contact Person2 Email")]
    pub contact2_email: String,
    #[serde(rename = "Contact Person2 Name")]
    pub contact2_name: String,
    #[serde(rename = "RDV Date")]
    pub date: String,
    #[serde(rename = "Start Time")]
    pub start: String,
    #[serde(rename = "End Time")]
    pub end: String,
    #[serde(rename = "Duration")]
    pub duration: u32,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Manager1 Email")]
    pub manager1_email: String,
    #[serde(rename = "Manager1 Name")]
    pub manager1_name: String,
    #[serde(rename = "Manager2 Email")]
    pub manager2_email: String,
    #[serde(rename = "Manager2 Name")]
    pub manager2_name: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Hired Date")]
    pub hire_date: String,
}

fn split_contact(contact: Option<&Contact>) -> (String, String) {
    contact
        .map(|c| (c.id.clone(), c.name.clone()))
        .unwrap_or_default()
}

impl From<&ScheduledEntry> for ExportRow {
    fn from(entry: &ScheduledEntry) -> Self {
        let appointment = &entry.appointment;
        let (contact1_email, contact1_name) = split_contact(appointment.contact1.as_ref());
        let (contact2_email, contact2_name) = split_contact(appointment.contact2.as_ref());
        let (manager2_email, manager2_name) = split_contact(entry.manager2.as_ref());

        ExportRow {
            newcomer_email: entry.newcomer.id.clone(),
            newcomer_name: entry.newcomer.name.clone(),
            role: appointment.role.clone(),
            title: appointment.title.clone(),
            description: appointment.description.clone(),
            contact1_email,
            contact1_name,
            contact2_email,
            contact2_name,
            date: format_date(entry.date),
            start: format_time(entry.start),
            end: format_time(entry.end),
            duration: entry.duration_minutes(),
            location: appointment.location.clone(),
            manager1_email: entry.manager1.id.clone(),
            manager1_name: entry.manager1.name.clone(),
            manager2_email,
            manager2_name,
            status: entry.status.to_string(),
            hire_date: format_date(entry.hire_date),
        }
    }
}

pub fn export_rows(entries: &[ScheduledEntry]) -> Vec<ExportRow> {
    entries.iter().map(ExportRow::from).collect()
}

/// Writes the schedule as CSV with a header row
pub fn write_schedule_csv<W: Write>(entries: &[ScheduledEntry], writer: W) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(true).from_writer(writer);
    for row in export_rows(entries) {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// CSV bytes prefixed with a UTF-8 BOM so spreadsheet tools pick the right encoding
pub fn schedule_to_csv_bytes(entries: &[ScheduledEntry]) -> Result<Vec<u8>> {
    let mut buffer = UTF8_BOM.to_vec();
    write_schedule_csv(entries, &mut buffer)?;
    Ok(buffer)
}

/// Download file name, e.g. `Giannis_Andreadakis_schedule.csv`
pub fn export_filename(newcomer_name: &str) -> String {
    let stem: String = newcomer_name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if stem.is_empty() {
        "schedule.csv".to_string()
    } else {
        format!("{}_schedule.csv", stem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{Appointment, EntryStatus};
    use chrono::{NaiveDate, NaiveTime};

    fn entry(manager2: Option<Contact>) -> ScheduledEntry {
        ScheduledEntry {
            appointment: Appointment {
                role: "Analyst".to_string(),
                title: "Welcome".to_string(),
                description: "Meet the team, grab coffee".to_string(),
                duration_minutes: 60,
                location: "HQ".to_string(),
                contact1: Some(Contact::new("Eleni", "eleni@example.com")),
                contact2: None,
                order: 1,
            },
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            start: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            newcomer: Contact::new("Giannis Andreadakis", "giannis@example.com"),
            manager1: Contact::new("Peter Vassilikos", "peter@example.com"),
            manager2,
            status: EntryStatus::PlannedManual,
            hire_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[test]
    fn csv_columns_follow_the_export_contract() {
        let bytes = schedule_to_csv_bytes(&[entry(None)]).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Newcomer Email,Newcomer Name,Role Group,RDV Title,RDV Description,\
             Contact Person1 Email,Contact Person1 Name,Contact Person2 Email,Contact Person2 Name,\
             RDV Date,Start Time,End Time,Duration,Location,Manager1 Email,Manager1 Name,\
             Manager2 Email,Manager2 Name,Status,Hired Date"
        );
        assert_eq!(
            lines.next().unwrap(),
            "giannis@example.com,Giannis Andreadakis,Analyst,Welcome,\"Meet the team, grab coffee\",\
             eleni@example.com,Eleni,,,2024-01-02,10:00,11:00,60,HQ,peter@example.com,Peter Vassilikos,\
             ,,Planned (manual),2024-01-01"
        );
    }

    #[test]
    fn second_manager_is_exported_when_present() {
        let row = ExportRow::from(&entry(Some(Contact::new("Maria", "maria@example.com"))));
        assert_eq!(row.manager2_email, "maria@example.com");
        assert_eq!(row.manager2_name, "Maria");
    }

    #[test]
    fn filename_is_derived_from_newcomer_name() {
        assert_eq!(export_filename("Giannis  Andreadakis"), "Giannis_Andreadakis_schedule.csv");
        assert_eq!(export_filename("../etc"), "etc_schedule.csv");
        assert_eq!(export_filename("  "), "schedule.csv");
    }
}
