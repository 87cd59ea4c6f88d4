pub mod request;
pub mod export;

pub use request::{GenerateRequest, validate_request};
pub use export::{export_filename, export_rows, schedule_to_csv_bytes, write_schedule_csv, ExportRow};
