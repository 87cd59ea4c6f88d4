pub mod types;
pub mod slot_utils;
pub mod calendar;
pub mod placement;
pub mod merge;
pub mod generate;

pub use types::{Appointment, Contact, EntryStatus, Interval, Parties, PinnedAppointment, PinnedRow, ScheduledEntry};
pub use calendar::{CalendarTemplate, DayWindow, LocationWindow, OnboardingCalendar};
pub use placement::{place_appointments, PlacementContext, DEFAULT_MAX_SEARCH_DAYS};
pub use merge::{merge_pinned, resolve_pinned};
pub use generate::generate_schedule;
