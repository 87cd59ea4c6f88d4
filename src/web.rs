use actix_web::{error, http::header, middleware, web, App, HttpResponse, HttpServer, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::ScheduleError;
use crate::form::{export_filename, export_rows, schedule_to_csv_bytes, validate_request, ExportRow, GenerateRequest};
use crate::parser::parse_template;
use crate::schedule::{generate_schedule, Appointment, OnboardingCalendar, PlacementContext, ScheduledEntry};

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const MAX_JSON_BYTES: usize = 2 * 1024 * 1024;

/// Immutable per-process settings. Every request is scheduled independently.
pub struct AppState {
    pub calendar: OnboardingCalendar,
    pub max_search_days: u32,
}

impl AppState {
    pub fn new(calendar: OnboardingCalendar, max_search_days: u32) -> Self {
        Self {
            calendar,
            max_search_days,
        }
    }
}

#[derive(Deserialize)]
pub struct TemplateQuery {
    role: Option<String>,
}

#[derive(Serialize)]
pub struct TemplateResponse {
    success: bool,
    roles: Vec<String>,
    appointments: Vec<Appointment>,
}

#[derive(Serialize)]
pub struct ScheduleResponse {
    success: bool,
    filename: String,
    entries: Vec<ExportRow>,
}

fn error_response(err: &ScheduleError) -> HttpResponse {
    let body = serde_json::json!({"success": false, "error": err.to_string()});
    match err {
        e if e.is_unschedulable() => HttpResponse::UnprocessableEntity().json(body),
        e if e.is_validation() => HttpResponse::BadRequest().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}

fn run_generation(req: &GenerateRequest, state: &AppState) -> std::result::Result<Vec<ScheduledEntry>, ScheduleError> {
    let parties = validate_request(req)?;
    let ctx = PlacementContext::new(&state.calendar, req.hire_date, &parties)
        .with_max_search_days(state.max_search_days);
    generate_schedule(&ctx, &req.ordered_appointments(), &req.pinned)
}

// Template upload: lists roles, and the selected role's appointments when asked
async fn upload_template(query: web::Query<TemplateQuery>, body: web::Bytes) -> Result<HttpResponse> {
    let template = match parse_template(&body) {
        Ok(template) => template,
        Err(e) => {
            warn!(error = %e, "template upload rejected");
            return Ok(error_response(&e));
        }
    };

    let appointments = match query.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(role) => match template.for_role(role) {
            Ok(appointments) => appointments,
            Err(e) => return Ok(error_response(&e)),
        },
        None => Vec::new(),
    };

    Ok(HttpResponse::Ok().json(TemplateResponse {
        success: true,
        roles: template.roles(),
        appointments,
    }))
}

async fn generate(req: web::Json<GenerateRequest>, state: web::Data<AppState>) -> Result<HttpResponse> {
    match run_generation(&req, &state) {
        Ok(entries) => {
            info!(role = %req.role, entries = entries.len(), "schedule served");
            Ok(HttpResponse::Ok().json(ScheduleResponse {
                success: true,
                filename: export_filename(&req.newcomer.name),
                entries: export_rows(&entries),
            }))
        }
        Err(e) => {
            warn!(role = %req.role, error = %e, "schedule generation failed");
            Ok(error_response(&e))
        }
    }
}

async fn generate_csv(req: web::Json<GenerateRequest>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let entries = match run_generation(&req, &state) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(role = %req.role, error = %e, "schedule generation failed");
            return Ok(error_response(&e));
        }
    };
    let csv = schedule_to_csv_bytes(&entries).map_err(error::ErrorInternalServerError)?;

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export_filename(&req.newcomer.name)),
        ))
        .body(csv))
}

async fn index() -> Result<HttpResponse> {
    let html = include_str!("../templates/index.html");
    Ok(HttpResponse::Ok().content_type("text/html").body(html))
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(MAX_JSON_BYTES)
        .error_handler(|err, _req| {
            let body = serde_json::json!({"success": false, "error": err.to_string()});
            error::InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
        })
}

/// Routes and extractor limits, shared by the server and the tests
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(web::PayloadConfig::new(MAX_UPLOAD_BYTES))
        .route("/", web::get().to(index))
        .route("/api/template", web::post().to(upload_template))
        .route("/api/generate", web::post().to(generate))
        .route("/api/generate/csv", web::post().to(generate_csv));
}

pub async fn start_server(config: &AppConfig, state: AppState) -> std::io::Result<()> {
    let app_state = web::Data::new(state);

    info!(bind = %config.bind_address, port = config.port, "starting web server");
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind((config.bind_address.as_str(), config.port))?
    .run()
    .await
}
