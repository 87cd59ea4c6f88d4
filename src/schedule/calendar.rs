use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::slot_utils::hhmm;
use super::types::Interval;
use crate::error::{Result, ScheduleError};

/// Work window of a single day: when work starts and ends, and the breaks in between
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    #[serde(with = "hhmm")]
    pub work_start: NaiveTime,
    #[serde(with = "hhmm")]
    pub work_end: NaiveTime,
    #[serde(default)]
    pub breaks: Vec<Interval>,
}

impl DayWindow {
    pub fn work_interval(&self) -> Interval {
        Interval::new(self.work_start, self.work_end)
    }

    /// Free blocks between the breaks. Breaks plus a `(work_end, work_end)`
    /// marker act as block boundaries; empty gaps are dropped.
    pub fn free_blocks(&self) -> Vec<Interval> {
        let boundaries = self
            .breaks
            .iter()
            .copied()
            .chain(std::iter::once(Interval::new(self.work_end, self.work_end)));

        let mut blocks = Vec::with_capacity(self.breaks.len() + 1);
        let mut block_start = self.work_start;
        for boundary in boundaries {
            let block = Interval::new(block_start, boundary.start);
            if !block.is_empty() {
                blocks.push(block);
            }
            block_start = boundary.end;
        }
        blocks
    }

    /// Same window with every break that lies entirely inside one of `occupied` removed
    pub fn absorbing_breaks(&self, occupied: &[Interval]) -> DayWindow {
        DayWindow {
            work_start: self.work_start,
            work_end: self.work_end,
            breaks: self
                .breaks
                .iter()
                .filter(|b| !occupied.iter().any(|o| o.covers(b)))
                .copied()
                .collect(),
        }
    }

    /// Length of the longest free block, optionally clipped to `limit`
    pub fn longest_block_minutes(&self, limit: Option<Interval>) -> u32 {
        self.free_blocks()
            .iter()
            .filter_map(|block| match limit {
                Some(limit) => block.intersect(&limit),
                None => Some(*block),
            })
            .map(|block| block.minutes())
            .max()
            .unwrap_or(0)
    }

    fn validate(&self, label: &str) -> Result<()> {
        if self.work_start >= self.work_end {
            return Err(ScheduleError::InvalidCalendar(format!(
                "{}: work start must be before work end",
                label
            )));
        }
        let window = self.work_interval();
        let mut previous_end = self.work_start;
        for (idx, b) in self.breaks.iter().enumerate() {
            if b.is_empty() || !window.covers(b) {
                return Err(ScheduleError::InvalidCalendar(format!(
                    "{}: break {} must be a non-empty interval inside the work window",
                    label,
                    idx + 1
                )));
            }
            if b.start < previous_end {
                return Err(ScheduleError::InvalidCalendar(format!(
                    "{}: breaks must be chronological and non-overlapping (break {})",
                    label,
                    idx + 1
                )));
            }
            previous_end = b.end;
        }
        Ok(())
    }
}

/// Source of per-day work windows. `day_index` is the zero-based calendar
/// day counted from the hire date (weekends included).
pub trait CalendarTemplate {
    fn day_window(&self, day_index: u32) -> DayWindow;

    /// Time of day appointments held at `location` are confined to, if any
    fn location_window(&self, _location: &str) -> Option<Interval> {
        None
    }

    /// Every distinct window `day_window` can return, when that set is known
    fn distinct_windows(&self) -> Option<Vec<DayWindow>> {
        None
    }
}

/// Hours a location can host appointments, e.g. a training centre that only
/// receives newcomers in the afternoon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationWindow {
    #[serde(with = "hhmm")]
    pub work_start: NaiveTime,
    #[serde(with = "hhmm")]
    pub work_end: NaiveTime,
}

impl LocationWindow {
    pub fn interval(&self) -> Interval {
        Interval::new(self.work_start, self.work_end)
    }
}

/// Office hours for onboarding: the hire date has its own, later-starting
/// window, every other day shares the regular one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingCalendar {
    pub first_day: DayWindow,
    pub regular_day: DayWindow,
    /// Keyed by location name, matched case-insensitively. Empty by default.
    #[serde(default)]
    pub location_windows: BTreeMap<String, LocationWindow>,
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

fn window(start: (u32, u32), end: (u32, u32), breaks: &[((u32, u32), (u32, u32))]) -> DayWindow {
    DayWindow {
        work_start: hm(start.0, start.1),
        work_end: hm(end.0, end.1),
        breaks: breaks
            .iter()
            .map(|&(s, e)| Interval::new(hm(s.0, s.1), hm(e.0, e.1)))
            .collect(),
    }
}

impl Default for OnboardingCalendar {
    fn default() -> Self {
        Self {
            first_day: window((10, 0), (18, 0), &[((11, 30), (12, 0)), ((13, 30), (14, 30)), ((15, 30), (16, 0))]),
            regular_day: window((9, 0), (17, 0), &[((10, 30), (11, 0)), ((13, 0), (14, 0)), ((15, 30), (16, 0))]),
            location_windows: BTreeMap::new(),
        }
    }
}

impl OnboardingCalendar {
    /// Loads an alternate office-hours policy from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let calendar: OnboardingCalendar = serde_json::from_str(raw)
            .map_err(|e| ScheduleError::InvalidCalendar(e.to_string()))?;
        calendar.validate()?;
        Ok(calendar)
    }

    pub fn validate(&self) -> Result<()> {
        self.first_day.validate("first day")?;
        self.regular_day.validate("regular day")?;
        for (location, window) in &self.location_windows {
            if location.trim().is_empty() {
                return Err(ScheduleError::InvalidCalendar("location window with a blank location".to_string()));
            }
            if window.interval().is_empty() {
                return Err(ScheduleError::InvalidCalendar(format!(
                    "location '{}': work start must be before work end",
                    location
                )));
            }
        }
        Ok(())
    }
}

impl CalendarTemplate for OnboardingCalendar {
    fn day_window(&self, day_index: u32) -> DayWindow {
        if day_index == 0 {
            self.first_day.clone()
        } else {
            self.regular_day.clone()
        }
    }

    fn location_window(&self, location: &str) -> Option<Interval> {
        let wanted = location.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        self.location_windows
            .iter()
            .find(|(name, _)| name.trim().to_lowercase() == wanted)
            .map(|(_, window)| window.interval())
    }

    fn distinct_windows(&self) -> Option<Vec<DayWindow>> {
        Some(vec![self.first_day.clone(), self.regular_day.clone()])
    }
}
