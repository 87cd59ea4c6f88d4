use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use super::slot_utils::{hhmm, time_to_minutes};
use crate::error::{Result, ScheduleError};

/// A person referenced by a schedule: display name plus contact identifier (email)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    #[serde(default)]
    pub id: String,
}

impl Contact {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty() && self.id.trim().is_empty()
    }

    /// `None` for a contact whose name and id are both blank
    pub fn non_blank(name: &str, id: &str) -> Option<Self> {
        let contact = Self::new(name.trim(), id.trim());
        (!contact.is_blank()).then_some(contact)
    }
}

/// One onboarding appointment (RDV) from the role template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub role: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub duration_minutes: u32,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub contact1: Option<Contact>,
    #[serde(default)]
    pub contact2: Option<Contact>,
    #[serde(default)]
    pub order: u32,
}

/// The people a generated schedule belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parties {
    pub newcomer: Contact,
    pub manager1: Contact,
    #[serde(default)]
    pub manager2: Option<Contact>,
}

impl Parties {
    /// Newcomer and first manager must carry both a name and a contact id.
    /// A second manager with nothing filled in is dropped.
    pub fn validate(mut self) -> Result<Self> {
        let required = [
            ("newcomer name", &self.newcomer.name),
            ("newcomer email", &self.newcomer.id),
            ("manager 1 name", &self.manager1.name),
            ("manager 1 email", &self.manager1.id),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ScheduleError::MissingField { field });
            }
        }
        if self.manager2.as_ref().is_some_and(Contact::is_blank) {
            self.manager2 = None;
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    #[serde(rename = "Planned")]
    Planned,
    #[serde(rename = "Planned (manual)")]
    PlannedManual,
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryStatus::Planned => write!(f, "Planned"),
            EntryStatus::PlannedManual => write!(f, "Planned (manual)"),
        }
    }
}

/// Half-open wall-clock interval `[start, end)` within one day
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl Interval {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn minutes(&self) -> u32 {
        time_to_minutes(self.end).saturating_sub(time_to_minutes(self.start))
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn covers(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn intersect(&self, other: &Interval) -> Option<Interval> {
        let clipped = Interval::new(self.start.max(other.start), self.end.min(other.end));
        (!clipped.is_empty()).then_some(clipped)
    }

    /// The parts of `self` not touched by any of `busy`, in chronological order
    pub fn subtract(&self, busy: &[Interval]) -> Vec<Interval> {
        let mut sorted: Vec<&Interval> = busy.iter().filter(|b| b.overlaps(self)).collect();
        sorted.sort();

        let mut gaps = Vec::new();
        let mut start = self.start;
        for b in sorted {
            if b.start > start {
                gaps.push(Interval::new(start, b.start));
            }
            start = start.max(b.end);
        }
        if start < self.end {
            gaps.push(Interval::new(start, self.end));
        }
        gaps
    }
}

/// One resolved line of the final onboarding calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledEntry {
    pub appointment: Appointment,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
    pub newcomer: Contact,
    pub manager1: Contact,
    pub manager2: Option<Contact>,
    pub status: EntryStatus,
    pub hire_date: NaiveDate,
}

impl ScheduledEntry {
    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }

    pub fn duration_minutes(&self) -> u32 {
        self.appointment.duration_minutes
    }

    pub fn is_manual(&self) -> bool {
        self.status == EntryStatus::PlannedManual
    }
}

/// A manager-submitted appointment as it arrives from the editing surface,
/// before its date and times are resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedRow {
    #[serde(rename = "Date", alias = "date", default)]
    pub date: String,
    #[serde(rename = "Start", alias = "start", default)]
    pub start: String,
    #[serde(rename = "End", alias = "end", default)]
    pub end: String,
    #[serde(rename = "Title", alias = "title", default)]
    pub title: String,
    #[serde(rename = "Description", alias = "description", default)]
    pub description: String,
    #[serde(rename = "Contact Person 1", alias = "contact1_name", default)]
    pub contact1_name: String,
    #[serde(rename = "Contact Email 1", alias = "contact1_id", default)]
    pub contact1_id: String,
    #[serde(rename = "Contact Person 2", alias = "contact2_name", default)]
    pub contact2_name: String,
    #[serde(rename = "Contact Email 2", alias = "contact2_id", default)]
    pub contact2_id: String,
    #[serde(rename = "Location", alias = "location", default)]
    pub location: Option<String>,
}

/// A pinned appointment with its date and interval resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedAppointment {
    pub date: NaiveDate,
    pub interval: Interval,
    pub title: String,
    pub description: String,
    pub contact1: Option<Contact>,
    pub contact2: Option<Contact>,
    pub location: Option<String>,
}
