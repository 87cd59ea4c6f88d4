use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveTime};
use tracing::{debug, info, instrument, warn};

use super::placement::PlacementContext;
use super::slot_utils::{day_index, is_weekend, parse_date, parse_time};
use super::types::{
    Appointment, Contact, EntryStatus, Interval, PinnedAppointment, PinnedRow, ScheduledEntry,
};
use crate::error::{Result, ScheduleError};

/// Occupied intervals per date
#[derive(Debug, Default)]
pub struct Occupancy {
    by_date: BTreeMap<NaiveDate, Vec<Interval>>,
}

impl Occupancy {
    pub fn insert(&mut self, date: NaiveDate, interval: Interval) {
        self.by_date.entry(date).or_default().push(interval);
    }

    pub fn on(&self, date: NaiveDate) -> &[Interval] {
        self.by_date.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn overlaps(&self, date: NaiveDate, interval: &Interval) -> bool {
        self.on(date).iter().any(|busy| busy.overlaps(interval))
    }
}

/// Validates and resolves pinned rows. The first invalid row rejects the
/// whole batch.
pub fn resolve_pinned(rows: &[PinnedRow]) -> Result<Vec<PinnedAppointment>> {
    rows.iter()
        .enumerate()
        .map(|(idx, row)| resolve_row(idx + 1, row))
        .collect()
}

fn resolve_row(row_number: usize, row: &PinnedRow) -> Result<PinnedAppointment> {
    let invalid = |field: &'static str, reason: String| ScheduleError::InvalidPinned {
        row: row_number,
        field,
        reason,
    };

    let date = parse_date(&row.date)
        .ok_or_else(|| invalid("date", format!("'{}' is not a YYYY-MM-DD date", row.date)))?;
    let start = parse_time(&row.start)
        .ok_or_else(|| invalid("start", format!("'{}' is not an HH:MM time", row.start)))?;
    let end = parse_time(&row.end)
        .ok_or_else(|| invalid("end", format!("'{}' is not an HH:MM time", row.end)))?;
    if start >= end {
        return Err(invalid("end", format!("{} must be after start {}", row.end.trim(), row.start.trim())));
    }
    if row.title.trim().is_empty() {
        return Err(invalid("title", "is required".to_string()));
    }

    Ok(PinnedAppointment {
        date,
        interval: Interval::new(start, end),
        title: row.title.trim().to_string(),
        description: row.description.trim().to_string(),
        contact1: Contact::non_blank(&row.contact1_name, &row.contact1_id),
        contact2: Contact::non_blank(&row.contact2_name, &row.contact2_id),
        location: row.location.as_ref().map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
    })
}

/// Merges manager-pinned appointments into an automatically placed schedule.
///
/// Pinned appointments are never moved. Auto entries that collide with one
/// are queued and relocated, in (date, start) order, into the next free time
/// that fits their whole duration; every auto entry ends up in the result
/// exactly once.
#[instrument(skip_all, fields(hire_date = %ctx.hire_date, auto = auto_entries.len(), pinned = pinned.len()))]
pub fn merge_pinned(
    ctx: &PlacementContext<'_>,
    auto_entries: Vec<ScheduledEntry>,
    pinned: &[PinnedRow],
) -> Result<Vec<ScheduledEntry>> {
    let resolved = resolve_pinned(pinned)?;
    let role = auto_entries
        .first()
        .map(|e| e.appointment.role.clone())
        .unwrap_or_default();

    let mut occupied = Occupancy::default();
    let mut pinned_entries = Vec::with_capacity(resolved.len());
    for p in resolved {
        if occupied.overlaps(p.date, &p.interval) {
            warn!(title = %p.title, date = %p.date, "pinned appointments overlap each other");
        }
        occupied.insert(p.date, p.interval);
        pinned_entries.push(pinned_entry(ctx, &role, p));
    }

    let (mut queue, keep): (Vec<ScheduledEntry>, Vec<ScheduledEntry>) = auto_entries
        .into_iter()
        .partition(|e| occupied.overlaps(e.date, &e.interval()));
    for entry in &keep {
        occupied.insert(entry.date, entry.interval());
    }

    queue.sort_by_key(|e| (e.date, e.start));
    let mut relocated = Vec::with_capacity(queue.len());
    for mut entry in queue {
        let (date, slot) = find_free_slot(ctx, &occupied, entry.date, entry.start, &entry.appointment)?;
        debug!(
            title = %entry.appointment.title,
            from = %format!("{} {}", entry.date, entry.start),
            to = %format!("{} {}", date, slot.start),
            "rescheduled"
        );
        occupied.insert(date, slot);
        entry.date = date;
        entry.start = slot.start;
        entry.end = slot.end;
        relocated.push(entry);
    }

    info!(
        pinned = pinned_entries.len(),
        kept = keep.len(),
        rescheduled = relocated.len(),
        "manual merge finished"
    );

    let mut merged = pinned_entries;
    merged.extend(keep);
    merged.extend(relocated);
    merged.sort_by_key(|e| (e.date, e.start));
    Ok(merged)
}

fn pinned_entry(ctx: &PlacementContext<'_>, role: &str, pinned: PinnedAppointment) -> ScheduledEntry {
    let appointment = Appointment {
        role: role.to_string(),
        title: pinned.title,
        description: pinned.description,
        duration_minutes: pinned.interval.minutes(),
        location: pinned.location.unwrap_or_default(),
        contact1: pinned.contact1,
        contact2: pinned.contact2,
        order: 0,
    };
    ctx.entry(appointment, pinned.date, pinned.interval, EntryStatus::PlannedManual)
}

/// First free interval at or after `(from_date, from_time)` that holds the
/// whole appointment. Breaks fully covered by an occupied interval are
/// treated as free time of the covering interval, not as breaks. Searches at
/// most `max_search_days` calendar days starting at `from_date`.
fn find_free_slot(
    ctx: &PlacementContext<'_>,
    occupied: &Occupancy,
    from_date: NaiveDate,
    from_time: NaiveTime,
    appointment: &Appointment,
) -> Result<(NaiveDate, Interval)> {
    let mut date = from_date;
    let mut cursor = from_time;
    let mut last_searched = from_date;

    loop {
        if (date - from_date).num_days() >= i64::from(ctx.max_search_days) {
            return Err(ScheduleError::Unschedulable {
                title: appointment.title.clone(),
                role: appointment.role.clone(),
                duration: appointment.duration_minutes,
                from: from_date,
                to: last_searched,
            });
        }

        if !is_weekend(date) {
            last_searched = date;
            let busy = occupied.on(date);
            let window = ctx
                .calendar
                .day_window(day_index(ctx.hire_date, date))
                .absorbing_breaks(busy);

            for block in window.free_blocks() {
                if block.end <= cursor {
                    continue;
                }
                for gap in block.subtract(busy) {
                    if let Some(slot) = ctx.slot_in(gap, cursor, appointment) {
                        return Ok((date, slot));
                    }
                }
            }
        }

        date += Duration::days(1);
        cursor = NaiveTime::MIN;
    }
}
