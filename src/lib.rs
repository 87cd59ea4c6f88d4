//! Onboarding calendar generation: places a role's onboarding appointments
//! into a new hire's working days and merges manager-pinned appointments.

pub mod config;
pub mod display;
pub mod error;
pub mod form;
pub mod logging;
pub mod parser;
pub mod schedule;
pub mod web;

pub use error::{Result, ScheduleError};
