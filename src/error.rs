use chrono::NaiveDate;
use thiserror::Error;

/// Everything that can abort a schedule generation request
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("no appointments found for role '{role}'")]
    NoAppointmentsForRole { role: String },

    #[error(
        "{}row {row}: invalid duration '{value}' (expected a positive number of minutes)",
        sheet_prefix(.sheet)
    )]
    InvalidDuration {
        sheet: Option<String>,
        row: usize,
        value: String,
    },

    #[error("pinned row {row}: {field} {reason}")]
    InvalidPinned {
        row: usize,
        field: &'static str,
        reason: String,
    },

    #[error(
        "appointment '{title}' ({duration} min, role '{role}') does not fit any free block between {from} and {to}"
    )]
    Unschedulable {
        title: String,
        role: String,
        duration: u32,
        from: NaiveDate,
        to: NaiveDate,
    },

    #[error(
        "appointment '{title}' ({duration} min, role '{role}') is longer than any free block the calendar offers ({longest} min)"
    )]
    ExceedsLongestBlock {
        title: String,
        role: String,
        duration: u32,
        longest: u32,
    },

    #[error("invalid calendar template: {0}")]
    InvalidCalendar(String),

    #[error("template could not be read: {0}")]
    Template(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn sheet_prefix(sheet: &Option<String>) -> String {
    sheet.as_deref().map(|s| format!("sheet '{}', ", s)).unwrap_or_default()
}

impl ScheduleError {
    /// The request was well formed but the calendar has no room for it
    pub fn is_unschedulable(&self) -> bool {
        matches!(
            self,
            ScheduleError::Unschedulable { .. } | ScheduleError::ExceedsLongestBlock { .. }
        )
    }


    /// Validation errors are the caller's fault; everything else is a capacity or I/O problem
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ScheduleError::MissingField { .. }
                | ScheduleError::NoAppointmentsForRole { .. }
                | ScheduleError::InvalidDuration { .. }
                | ScheduleError::InvalidPinned { .. }
                | ScheduleError::Template(_)
                | ScheduleError::Csv(_)
                | ScheduleError::Json(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
