use chrono::{Duration, NaiveDate, NaiveTime};
use tracing::{debug, info, instrument};

use super::calendar::CalendarTemplate;
use super::slot_utils::{is_weekend, time_after};
use super::types::{Appointment, EntryStatus, Interval, Parties, ScheduledEntry};
use crate::error::{Result, ScheduleError};

/// Default number of consecutive calendar days a search may run without
/// placing anything before giving up
pub const DEFAULT_MAX_SEARCH_DAYS: u32 = 30;

/// Everything a placement pass needs besides the appointments themselves
pub struct PlacementContext<'a> {
    pub calendar: &'a dyn CalendarTemplate,
    pub hire_date: NaiveDate,
    pub parties: &'a Parties,
    pub max_search_days: u32,
}

impl<'a> PlacementContext<'a> {
    pub fn new(calendar: &'a dyn CalendarTemplate, hire_date: NaiveDate, parties: &'a Parties) -> Self {
        Self {
            calendar,
            hire_date,
            parties,
            max_search_days: DEFAULT_MAX_SEARCH_DAYS,
        }
    }

    pub fn with_max_search_days(mut self, days: u32) -> Self {
        self.max_search_days = days.max(1);
        self
    }

    /// Earliest slot for `appointment` inside `free`, at or after `cursor`.
    /// Appointments at a location with restricted hours only use the part of
    /// `free` inside those hours.
    pub(crate) fn slot_in(&self, free: Interval, cursor: NaiveTime, appointment: &Appointment) -> Option<Interval> {
        let free = match self.calendar.location_window(&appointment.location) {
            Some(limit) => free.intersect(&limit)?,
            None => free,
        };
        let start = cursor.max(free.start);
        let end = time_after(start, appointment.duration_minutes)?;
        (end <= free.end).then(|| Interval::new(start, end))
    }

    /// Longest slot any day could give `appointment`, when the calendar
    /// knows all of its windows
    pub(crate) fn longest_slot_minutes(&self, appointment: &Appointment) -> Option<u32> {
        let limit = self.calendar.location_window(&appointment.location);
        let windows = self.calendar.distinct_windows()?;
        Some(windows.iter().map(|w| w.longest_block_minutes(limit)).max().unwrap_or(0))
    }

    pub(crate) fn entry(
        &self,
        appointment: Appointment,
        date: NaiveDate,
        slot: Interval,
        status: EntryStatus,
    ) -> ScheduledEntry {
        ScheduledEntry {
            appointment,
            date,
            start: slot.start,
            end: slot.end,
            newcomer: self.parties.newcomer.clone(),
            manager1: self.parties.manager1.clone(),
            manager2: self.parties.manager2.clone(),
            status,
            hire_date: self.hire_date,
        }
    }
}

/// Rejects appointments that could never occupy time
pub fn validate_appointments(appointments: &[Appointment]) -> Result<()> {
    for (idx, appointment) in appointments.iter().enumerate() {
        if appointment.duration_minutes == 0 {
            return Err(ScheduleError::InvalidDuration {
                sheet: None,
                row: idx + 1,
                value: appointment.duration_minutes.to_string(),
            });
        }
    }
    Ok(())
}

/// Places appointments first-fit in input order.
///
/// Walks forward from the hire date one calendar day at a time, skipping
/// weekends, and fills each free block of the day until the next appointment
/// no longer fits; that appointment then carries over whole to the next block
/// or day. Appointments are never split and never reordered.
///
/// Fails up front when an appointment is longer than any block the calendar
/// offers, and gives up once `max_search_days` consecutive calendar days have
/// passed without placing anything.
#[instrument(skip_all, fields(hire_date = %ctx.hire_date, appointments = appointments.len()))]
pub fn place_appointments(ctx: &PlacementContext<'_>, appointments: &[Appointment]) -> Result<Vec<ScheduledEntry>> {
    validate_appointments(appointments)?;
    for appointment in appointments {
        if let Some(longest) = ctx.longest_slot_minutes(appointment) {
            if appointment.duration_minutes > longest {
                return Err(ScheduleError::ExceedsLongestBlock {
                    title: appointment.title.clone(),
                    role: appointment.role.clone(),
                    duration: appointment.duration_minutes,
                    longest,
                });
            }
        }
    }

    let mut scheduled = Vec::with_capacity(appointments.len());
    let mut next = 0usize;
    let mut day_offset: u32 = 0;
    let mut stalled_since: Option<NaiveDate> = None;
    let mut last_searched = ctx.hire_date;

    while next < appointments.len() {
        let date = ctx.hire_date + Duration::days(i64::from(day_offset));
        if let Some(since) = stalled_since {
            if (date - since).num_days() >= i64::from(ctx.max_search_days) {
                let stuck = &appointments[next];
                return Err(ScheduleError::Unschedulable {
                    title: stuck.title.clone(),
                    role: stuck.role.clone(),
                    duration: stuck.duration_minutes,
                    from: since,
                    to: last_searched,
                });
            }
        }
        if is_weekend(date) {
            day_offset += 1;
            continue;
        }

        let placed_before = next;
        let window = ctx.calendar.day_window(day_offset);
        for block in window.free_blocks() {
            let mut cursor = block.start;
            while let Some(appointment) = appointments.get(next) {
                let Some(slot) = ctx.slot_in(block, cursor, appointment) else {
                    break;
                };
                debug!(title = %appointment.title, %date, start = %slot.start, end = %slot.end, "placed");
                scheduled.push(ctx.entry(appointment.clone(), date, slot, EntryStatus::Planned));
                cursor = slot.end;
                next += 1;
            }
            if next == appointments.len() {
                break;
            }
        }

        last_searched = date;
        if next == placed_before {
            if stalled_since.is_none() {
                stalled_since = Some(date);
            }
        } else {
            stalled_since = None;
        }
        day_offset += 1;
    }

    info!(
        placed = scheduled.len(),
        last_day = ?scheduled.last().map(|e: &ScheduledEntry| e.date),
        "auto placement finished"
    );
    Ok(scheduled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::calendar::{DayWindow, LocationWindow, OnboardingCalendar};
    use crate::schedule::types::Contact;
    use chrono::NaiveTime;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn parties() -> Parties {
        Parties {
            newcomer: Contact::new("Giannis Andreadakis", "giannis@example.com"),
            manager1: Contact::new("Peter Vassilikos", "peter@example.com"),
            manager2: None,
        }
    }

    fn rdv(title: &str, minutes: u32) -> Appointment {
        Appointment {
            role: "Analyst".to_string(),
            title: title.to_string(),
            description: String::new(),
            duration_minutes: minutes,
            location: "HQ".to_string(),
            contact1: None,
            contact2: None,
            order: 0,
        }
    }

    fn place(hire: NaiveDate, appointments: &[Appointment]) -> Result<Vec<ScheduledEntry>> {
        let calendar = OnboardingCalendar::default();
        let parties = parties();
        let ctx = PlacementContext::new(&calendar, hire, &parties);
        place_appointments(&ctx, appointments)
    }

    #[test]
    fn single_hour_lands_at_start_of_hire_day() {
        let entries = place(monday(), &[rdv("Welcome", 60)]).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].date, monday());
        assert_eq!((entries[0].start, entries[0].end), (t(10, 0), t(11, 0)));
        assert_eq!(entries[0].status, EntryStatus::Planned);
        assert_eq!(entries[0].hire_date, monday());
    }

    #[test]
    fn appointment_that_does_not_fit_carries_to_next_block() {
        let entries = place(monday(), &[rdv("Intro", 60), rdv("Tour", 60), rdv("Lunch talk", 30)]).unwrap();
        assert_eq!((entries[0].start, entries[0].end), (t(10, 0), t(11, 0)));
        // only 30 minutes left before the 11:30 break
        assert_eq!((entries[1].start, entries[1].end), (t(12, 0), t(13, 0)));
        // no look-ahead: the 30-minute RDV did not jump into 11:00-11:30
        assert_eq!((entries[2].start, entries[2].end), (t(13, 0), t(13, 30)));
    }

    #[test]
    fn overflow_rolls_over_the_weekend() {
        let friday = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        // day 0 has blocks of 90, 90, 60, 120 minutes
        let appointments = vec![
            rdv("A", 90),
            rdv("B", 90),
            rdv("C", 60),
            rdv("D", 120),
            rdv("E", 45),
        ];
        let entries = place(friday, &appointments).unwrap();
        assert!(entries[..4].iter().all(|e| e.date == friday));
        let next_monday = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        assert_eq!(entries[4].date, next_monday);
        assert_eq!((entries[4].start, entries[4].end), (t(9, 0), t(9, 45)));
    }

    #[test]
    fn weekend_hire_date_starts_on_monday_with_regular_hours() {
        let saturday = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap();
        let entries = place(saturday, &[rdv("Welcome", 30)]).unwrap();
        assert_eq!(entries[0].date, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
        assert_eq!(entries[0].start, t(9, 0));
    }

    #[test]
    fn empty_input_yields_empty_schedule() {
        assert!(place(monday(), &[]).unwrap().is_empty());
    }

    #[test]
    fn zero_duration_is_rejected() {
        let err = place(monday(), &[rdv("Ok", 30), rdv("Broken", 0)]).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidDuration { row: 2, .. }));
    }

    #[test]
    fn oversized_appointment_is_reported_not_truncated() {
        let err = place(monday(), &[rdv("Coffee", 30), rdv("Full day shadowing", 480)]).unwrap_err();
        match err {
            ScheduleError::ExceedsLongestBlock { title, duration, longest, .. } => {
                assert_eq!(title, "Full day shadowing");
                assert_eq!(duration, 480);
                assert_eq!(longest, 120);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    /// Same one-hour window every day, with no advertised set of windows
    struct ShortDays;

    impl CalendarTemplate for ShortDays {
        fn day_window(&self, _day_index: u32) -> DayWindow {
            DayWindow {
                work_start: t(9, 0),
                work_end: t(10, 0),
                breaks: Vec::new(),
            }
        }
    }

    fn place_with_limit(hire: NaiveDate, days: u32, appointments: &[Appointment]) -> Result<Vec<ScheduledEntry>> {
        let parties = parties();
        let ctx = PlacementContext::new(&ShortDays, hire, &parties).with_max_search_days(days);
        place_appointments(&ctx, appointments)
    }

    #[test]
    fn search_limit_covers_exactly_the_configured_days() {
        let err = place_with_limit(monday(), 3, &[rdv("Too long", 90)]).unwrap_err();
        match err {
            ScheduleError::Unschedulable { from, to, .. } => {
                assert_eq!(from, monday());
                assert_eq!(to, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
            }
            other => panic!("unexpected error: {other}"),
        }

        // Thursday hire: the weekend counts towards the limit, Friday is the last day searched
        let thursday = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();
        let err = place_with_limit(thursday, 3, &[rdv("Too long", 90)]).unwrap_err();
        match err {
            ScheduleError::Unschedulable { from, to, .. } => {
                assert_eq!(from, thursday);
                assert_eq!(to, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    fn at(title: &str, minutes: u32, location: &str) -> Appointment {
        Appointment {
            location: location.to_string(),
            ..rdv(title, minutes)
        }
    }

    fn academy_calendar() -> OnboardingCalendar {
        let mut calendar = OnboardingCalendar::default();
        calendar.location_windows.insert(
            "Cosmos Academy".to_string(),
            LocationWindow {
                work_start: t(15, 0),
                work_end: t(17, 0),
            },
        );
        calendar
    }

    #[test]
    fn restricted_location_is_held_inside_its_window() {
        let calendar = academy_calendar();
        let parties = parties();
        let ctx = PlacementContext::new(&calendar, monday(), &parties);
        let appointments = [
            at("Welcome", 30, "HQ"),
            at("Academy tour", 60, "cosmos academy"),
            at("Badge pickup", 30, "HQ"),
            at("Academy lab", 60, "Cosmos Academy"),
        ];
        let entries = place_appointments(&ctx, &appointments).unwrap();

        assert_eq!((entries[0].start, entries[0].end), (t(10, 0), t(10, 30)));
        // 15:00-15:30 is too short, the next block clipped to 16:00-17:00 holds it
        assert_eq!((entries[1].date, entries[1].start, entries[1].end), (monday(), t(16, 0), t(17, 0)));
        // the restriction resets for the next appointment, no backfilling
        assert_eq!((entries[2].start, entries[2].end), (t(17, 0), t(17, 30)));
        let tuesday = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!((entries[3].date, entries[3].start, entries[3].end), (tuesday, t(16, 0), t(17, 0)));
    }

    #[test]
    fn restricted_location_caps_the_longest_block() {
        let calendar = academy_calendar();
        let parties = parties();
        let ctx = PlacementContext::new(&calendar, monday(), &parties);
        let err = place_appointments(&ctx, &[at("Academy day", 90, "Cosmos Academy")]).unwrap_err();
        assert!(matches!(err, ScheduleError::ExceedsLongestBlock { longest: 60, .. }));

        // without the restriction the default calendar holds it
        assert!(place(monday(), &[at("Academy day", 90, "Cosmos Academy")]).is_ok());
    }

    #[test]
    fn order_and_durations_are_preserved() {
        let appointments: Vec<Appointment> = (0..25).map(|i| rdv(&format!("RDV {i}"), 15 + (i % 4) * 15)).collect();
        let entries = place(monday(), &appointments).unwrap();
        assert_eq!(entries.len(), appointments.len());
        for (entry, source) in entries.iter().zip(&appointments) {
            assert_eq!(entry.appointment.title, source.title);
            assert_eq!(entry.interval().minutes(), source.duration_minutes);
        }
        for pair in entries.windows(2) {
            assert!((pair[0].date, pair[0].end) <= (pair[1].date, pair[1].start));
        }
    }
}
