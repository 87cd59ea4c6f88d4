use std::io::{self, Write};

use crate::schedule::slot_utils::format_time;
use crate::schedule::{Contact, ScheduledEntry};

/// Formats a person as `Name <id>`
pub fn format_person(contact: &Contact) -> String {
    if contact.id.is_empty() {
        contact.name.clone()
    } else if contact.name.is_empty() {
        contact.id.clone()
    } else {
        format!("{} <{}>", contact.name, contact.id)
    }
}

/// Writes the schedule grouped by day, one line per appointment
pub fn write_schedule<W: Write>(title: &str, entries: &[ScheduledEntry], out: &mut W) -> io::Result<()> {
    writeln!(out, "** {} **", title)?;
    writeln!(out, "Total appointments scheduled: {}", entries.len())?;

    let mut current_date = None;
    for entry in entries {
        if current_date != Some(entry.date) {
            current_date = Some(entry.date);
            writeln!(out)?;
            writeln!(out, "{} ({})", entry.date.format("%Y-%m-%d"), entry.date.format("%A"))?;
        }
        let mut line = format!(
            "  {}-{} {} ({} min)",
            format_time(entry.start),
            format_time(entry.end),
            entry.appointment.title,
            entry.duration_minutes()
        );
        if !entry.appointment.location.is_empty() {
            line.push_str(&format!(" @ {}", entry.appointment.location));
        }
        if let Some(contact) = &entry.appointment.contact1 {
            line.push_str(&format!(" with {}", format_person(contact)));
        }
        if entry.is_manual() {
            line.push_str(" [manual]");
        }
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

/// Prints the schedule to stdout
pub fn print_schedule(title: &str, entries: &[ScheduledEntry]) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_schedule(title, entries, &mut handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{Appointment, EntryStatus};
    use chrono::{NaiveDate, NaiveTime};

    fn entry(day: u32, hour: u32, title: &str, status: EntryStatus) -> ScheduledEntry {
        ScheduledEntry {
            appointment: Appointment {
                role: "Analyst".to_string(),
                title: title.to_string(),
                description: String::new(),
                duration_minutes: 30,
                location: if status == EntryStatus::Planned { "HQ".to_string() } else { String::new() },
                contact1: Some(Contact::new("Eleni", "eleni@example.com")),
                contact2: None,
                order: 0,
            },
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            start: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(hour, 30, 0).unwrap(),
            newcomer: Contact::new("Giannis", "giannis@example.com"),
            manager1: Contact::new("Peter", "peter@example.com"),
            manager2: None,
            status,
            hire_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[test]
    fn schedule_is_grouped_by_day() {
        let entries = vec![
            entry(1, 10, "Welcome", EntryStatus::Planned),
            entry(1, 12, "CEO talk", EntryStatus::PlannedManual),
            entry(2, 9, "IT setup", EntryStatus::Planned),
        ];
        let mut out = Vec::new();
        write_schedule("Giannis", &entries, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("** Giannis **\nTotal appointments scheduled: 3\n"));
        assert!(text.contains("2024-01-01 (Monday)\n  10:00-10:30 Welcome (30 min) @ HQ with Eleni <eleni@example.com>\n"));
        assert!(text.contains("  12:00-12:30 CEO talk (30 min) with Eleni <eleni@example.com> [manual]\n"));
        assert_eq!(text.matches("(Tuesday)").count(), 1);
    }

    #[test]
    fn person_formatting_skips_blank_parts() {
        assert_eq!(format_person(&Contact::new("Eleni", "")), "Eleni");
        assert_eq!(format_person(&Contact::new("", "eleni@example.com")), "eleni@example.com");
    }
}
