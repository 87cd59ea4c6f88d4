use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_from_rs, Reader, Xlsx};
use csv::{ReaderBuilder, Trim};
use tracing::{debug, info};

use crate::error::{Result, ScheduleError};
use crate::schedule::{Appointment, Contact, PinnedRow};

const XLSX_SIGNATURE: &[u8] = b"PK\x03\x04";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const ROLE: &[&str] = &["role", "role group"];
const TITLE: &[&str] = &["rdv", "rdv title", "title"];
const DESCRIPTION: &[&str] = &["short rdv description", "rdv description", "description"];
const DURATION: &[&str] = &["duration", "duration (min)"];
const LOCATION: &[&str] = &["location"];
const CONTACT1_NAME: &[&str] = &["contact person 1", "contact person1 name"];
const CONTACT1_ID: &[&str] = &["contact email 1", "contact person1 email"];
const CONTACT2_NAME: &[&str] = &["contact person 2", "contact person2 name"];
const CONTACT2_ID: &[&str] = &["contact email 2", "contact person2 email"];
const ORDER: &[&str] = &["order"];

/// Every appointment of an onboarding template, across all roles
#[derive(Debug, Clone, Default)]
pub struct Template {
    appointments: Vec<Appointment>,
}

impl Template {
    pub fn appointments(&self) -> &[Appointment] {
        &self.appointments
    }

    /// Roles in the order they first appear
    pub fn roles(&self) -> Vec<String> {
        let mut roles: Vec<String> = Vec::new();
        for appointment in &self.appointments {
            if !roles.contains(&appointment.role) {
                roles.push(appointment.role.clone());
            }
        }
        roles
    }

    /// The role's appointments sorted by their order key (ties keep file order)
    pub fn for_role(&self, role: &str) -> Result<Vec<Appointment>> {
        let role = role.trim();
        let mut selected: Vec<Appointment> = self
            .appointments
            .iter()
            .filter(|a| a.role == role)
            .cloned()
            .collect();
        if selected.is_empty() {
            return Err(ScheduleError::NoAppointmentsForRole { role: role.to_string() });
        }
        selected.sort_by_key(|a| a.order);
        Ok(selected)
    }
}

/// One spreadsheet row keyed by normalized header
struct RawRow {
    row: usize,
    sheet: Option<String>,
    cells: HashMap<String, String>,
}

impl RawRow {
    fn cell(&self, names: &[&str]) -> &str {
        names
            .iter()
            .find_map(|name| self.cells.get(*name))
            .map(String::as_str)
            .unwrap_or("")
    }

    fn is_blank(&self) -> bool {
        self.cells.values().all(|v| v.is_empty())
    }

    /// `sheet 'Analyst', row 3` for workbooks, `row 3` for CSV
    fn position(&self) -> String {
        match &self.sheet {
            Some(sheet) => format!("sheet '{}', row {}", sheet, self.row),
            None => format!("row {}", self.row),
        }
    }
}

fn normalize_header(header: &str) -> String {
    header.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Parses a whole-number duration in minutes. Spreadsheets hand integers
/// back as floats, so `60.0` is accepted too.
fn parse_duration(sheet: Option<&str>, row: usize, raw: &str) -> Result<u32> {
    let trimmed = raw.trim();
    let minutes = trimmed.parse::<u32>().ok().or_else(|| {
        trimmed
            .parse::<f64>()
            .ok()
            .filter(|v| v.fract() == 0.0 && *v >= 0.0 && *v <= f64::from(u32::MAX))
            .map(|v| v as u32)
    });
    match minutes {
        Some(m) if m > 0 => Ok(m),
        _ => Err(ScheduleError::InvalidDuration {
            sheet: sheet.map(str::to_string),
            row,
            value: raw.to_string(),
        }),
    }
}

fn parse_order(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    trimmed
        .parse::<u32>()
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().filter(|v| v.fract() == 0.0 && *v >= 0.0).map(|v| v as u32))
}

fn to_appointment(raw: &RawRow, position: usize) -> Result<Appointment> {
    let role = match raw.cell(ROLE) {
        "" => raw.sheet.clone().unwrap_or_default(),
        role => role.to_string(),
    };
    if role.is_empty() {
        return Err(ScheduleError::Template(format!("{}: role is missing", raw.position())));
    }
    let title = raw.cell(TITLE);
    if title.is_empty() {
        return Err(ScheduleError::Template(format!("{}: RDV title is missing", raw.position())));
    }

    Ok(Appointment {
        role,
        title: title.to_string(),
        description: raw.cell(DESCRIPTION).to_string(),
        duration_minutes: parse_duration(raw.sheet.as_deref(), raw.row, raw.cell(DURATION))?,
        location: raw.cell(LOCATION).to_string(),
        contact1: Contact::non_blank(raw.cell(CONTACT1_NAME), raw.cell(CONTACT1_ID)),
        contact2: Contact::non_blank(raw.cell(CONTACT2_NAME), raw.cell(CONTACT2_ID)),
        order: parse_order(raw.cell(ORDER)).unwrap_or(position as u32),
    })
}

fn csv_rows(bytes: &[u8]) -> Result<Vec<RawRow>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader.headers()?.iter().map(normalize_header).collect();

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result?;
        let cells = headers
            .iter()
            .cloned()
            .zip(record.iter().map(str::to_string))
            .collect();
        rows.push(RawRow {
            row: idx + 2,
            sheet: None,
            cells,
        });
    }
    Ok(rows)
}

/// Every worksheet is one role's template
fn xlsx_rows(bytes: &[u8]) -> Result<Vec<RawRow>> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
        .map_err(|e: calamine::XlsxError| ScheduleError::Template(e.to_string()))?;

    let mut rows = Vec::new();
    for sheet in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| ScheduleError::Template(format!("sheet '{}': {}", sheet, e)))?;

        let mut sheet_rows = range.rows();
        let Some(header_row) = sheet_rows.next() else {
            debug!(sheet = %sheet, "skipping empty sheet");
            continue;
        };
        let headers: Vec<String> = header_row.iter().map(|c| normalize_header(&c.to_string())).collect();

        for (idx, data_row) in sheet_rows.enumerate() {
            let cells = headers
                .iter()
                .cloned()
                .zip(data_row.iter().map(|c| c.to_string().trim().to_string()))
                .collect();
            rows.push(RawRow {
                row: idx + 2,
                sheet: Some(sheet.trim().to_string()),
                cells,
            });
        }
    }
    Ok(rows)
}

/// Parses an onboarding template from an XLSX workbook (one sheet per role)
/// or a CSV file with a `Role` column.
pub fn parse_template(bytes: &[u8]) -> Result<Template> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let raw_rows = if bytes.starts_with(XLSX_SIGNATURE) {
        xlsx_rows(bytes)?
    } else {
        csv_rows(bytes)?
    };

    let mut appointments = Vec::with_capacity(raw_rows.len());
    for raw in raw_rows.iter().filter(|r| !r.is_blank()) {
        appointments.push(to_appointment(raw, appointments.len() + 1)?);
    }

    let template = Template { appointments };
    info!(
        appointments = template.appointments.len(),
        roles = template.roles().len(),
        "template loaded"
    );
    Ok(template)
}

/// Loads an onboarding template from disk
pub fn load_template<P: AsRef<Path>>(path: P) -> Result<Template> {
    let bytes = std::fs::read(path)?;
    parse_template(&bytes)
}

/// Parses pinned appointments from CSV (`Date, Start, End, Title, ...`)
pub fn parse_pinned(bytes: &[u8]) -> Result<Vec<PinnedRow>> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(bytes);
    let rows = reader.deserialize().collect::<std::result::Result<Vec<PinnedRow>, _>>()?;
    Ok(rows)
}

pub fn load_pinned<P: AsRef<Path>>(path: P) -> Result<Vec<PinnedRow>> {
    let bytes = std::fs::read(path)?;
    parse_pinned(&bytes)
}
