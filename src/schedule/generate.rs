use tracing::{info, instrument};

use super::merge::merge_pinned;
use super::placement::{place_appointments, PlacementContext};
use super::types::{Appointment, PinnedRow, ScheduledEntry};
use crate::error::Result;

/// Full generation pass: auto placement, then the manual merge when any
/// pinned rows were submitted.
#[instrument(skip_all, fields(hire_date = %ctx.hire_date, newcomer = %ctx.parties.newcomer.name))]
pub fn generate_schedule(
    ctx: &PlacementContext<'_>,
    appointments: &[Appointment],
    pinned: &[PinnedRow],
) -> Result<Vec<ScheduledEntry>> {
    let auto_entries = place_appointments(ctx, appointments)?;
    let entries = if pinned.is_empty() {
        auto_entries
    } else {
        merge_pinned(ctx, auto_entries, pinned)?
    };
    info!(entries = entries.len(), "schedule generated");
    Ok(entries)
}
