use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Appointment, AppointmentStatus, Barber, Service};
use crate::services::appointments::{self, AdminUpdate};
use crate::services::scheduling;
use crate::state::AppState;

// ── Appointments ──

#[derive(Deserialize)]
pub struct AppointmentsQuery {
    pub status: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct AppointmentWithDetails {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub barber: Option<Barber>,
    pub services: Vec<Service>,
}

// GET /api/admin/appointments
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AppointmentsQuery>,
) -> Result<Json<Vec<AppointmentWithDetails>>, AppError> {
    let db = state.db.lock().unwrap();
    auth::require_admin(&headers, &state.config.secret_key, &db)?;

    let appointments = queries::list_appointments(
        &db,
        query.status.as_deref(),
        query.skip.unwrap_or(0),
        query.limit.unwrap_or(100),
    )?;

    let mut response = vec![];
    for appointment in appointments {
        let barber = queries::get_barber_any(&db, appointment.barber_id)?;
        let services = queries::services_for_appointment(&db, appointment.id)?;
        response.push(AppointmentWithDetails {
            appointment,
            barber,
            services,
        });
    }
    Ok(Json(response))
}

// PUT /api/admin/appointments/:id
#[derive(Deserialize)]
pub struct UpdateAppointmentRequest {
    pub status: Option<String>,
    pub notes: Option<String>,
    pub appointment_datetime: Option<NaiveDateTime>,
}

pub async fn update_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<UpdateAppointmentRequest>,
) -> Result<Json<Appointment>, AppError> {
    let status = match body.status.as_deref() {
        Some(s) => Some(
            AppointmentStatus::parse(s)
                .ok_or_else(|| AppError::Validation(format!("unknown status: {s}")))?,
        ),
        None => None,
    };

    let db = state.db.lock().unwrap();
    auth::require_admin(&headers, &state.config.secret_key, &db)?;

    let appointment = appointments::admin_update(
        &db,
        id,
        AdminUpdate {
            status,
            notes: body.notes,
            appointment_datetime: body.appointment_datetime,
        },
    )?;

    Ok(Json(appointment))
}

// ── Barbers ──

#[derive(Deserialize)]
pub struct CreateBarberRequest {
    pub name: String,
    pub description: Option<String>,
    pub working_hours: Option<String>,
}

// POST /api/admin/barbers
pub async fn create_barber(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateBarberRequest>,
) -> Result<Json<Barber>, AppError> {
    let db = state.db.lock().unwrap();
    auth::require_admin(&headers, &state.config.secret_key, &db)?;

    let barber = queries::create_barber(
        &db,
        &body.name,
        body.description.as_deref(),
        body.working_hours.as_deref(),
    )?;
    Ok(Json(barber))
}

// PUT /api/admin/barbers/:id
#[derive(Deserialize)]
pub struct UpdateBarberRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub working_hours: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn update_barber(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<UpdateBarberRequest>,
) -> Result<Json<Barber>, AppError> {
    let db = state.db.lock().unwrap();
    auth::require_admin(&headers, &state.config.secret_key, &db)?;

    let mut barber = queries::get_barber(&db, id)?
        .ok_or_else(|| AppError::NotFound("Barber not found".to_string()))?;

    if let Some(name) = body.name {
        barber.name = name;
    }
    if let Some(description) = body.description {
        barber.description = Some(description);
    }
    if let Some(working_hours) = body.working_hours {
        barber.working_hours = Some(working_hours);
    }
    if let Some(is_active) = body.is_active {
        barber.is_active = is_active;
    }

    queries::update_barber(&db, &barber)?;
    Ok(Json(barber))
}

// DELETE /api/admin/barbers/:id (soft delete)
pub async fn delete_barber(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = state.db.lock().unwrap();
    auth::require_admin(&headers, &state.config.secret_key, &db)?;

    if !queries::deactivate_barber(&db, id)? {
        return Err(AppError::NotFound("Barber not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "message": "Barber deleted successfully" })))
}

// ── Services ──

#[derive(Deserialize)]
pub struct CreateServiceRequest {
    pub barber_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration_minutes: i64,
}

// POST /api/admin/services
pub async fn create_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateServiceRequest>,
) -> Result<Json<Service>, AppError> {
    if body.price < 0.0 {
        return Err(AppError::Validation("price must not be negative".to_string()));
    }
    if body.duration_minutes <= 0 || body.duration_minutes > scheduling::MAX_DURATION_MINUTES {
        return Err(AppError::Validation(format!(
            "duration_minutes must be between 1 and {}",
            scheduling::MAX_DURATION_MINUTES
        )));
    }

    let db = state.db.lock().unwrap();
    auth::require_admin(&headers, &state.config.secret_key, &db)?;

    queries::get_barber(&db, body.barber_id)?
        .ok_or_else(|| AppError::NotFound("Barber not found".to_string()))?;

    let service = queries::create_service(
        &db,
        body.barber_id,
        &body.name,
        body.description.as_deref(),
        body.price,
        body.duration_minutes,
    )?;
    Ok(Json(service))
}

// PUT /api/admin/services/:id
#[derive(Deserialize)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub duration_minutes: Option<i64>,
    pub is_active: Option<bool>,
}

pub async fn update_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<UpdateServiceRequest>,
) -> Result<Json<Service>, AppError> {
    if body.price.is_some_and(|p| p < 0.0) {
        return Err(AppError::Validation("price must not be negative".to_string()));
    }
    if body
        .duration_minutes
        .is_some_and(|d| d <= 0 || d > scheduling::MAX_DURATION_MINUTES)
    {
        return Err(AppError::Validation(format!(
            "duration_minutes must be between 1 and {}",
            scheduling::MAX_DURATION_MINUTES
        )));
    }

    let db = state.db.lock().unwrap();
    auth::require_admin(&headers, &state.config.secret_key, &db)?;

    let mut service = queries::get_service(&db, id)?
        .ok_or_else(|| AppError::NotFound("Service not found".to_string()))?;

    if let Some(name) = body.name {
        service.name = name;
    }
    if let Some(description) = body.description {
        service.description = Some(description);
    }
    if let Some(price) = body.price {
        service.price = price;
    }
    if let Some(duration_minutes) = body.duration_minutes {
        service.duration_minutes = duration_minutes;
    }
    if let Some(is_active) = body.is_active {
        service.is_active = is_active;
    }

    queries::update_service(&db, &service)?;
    Ok(Json(service))
}

// DELETE /api/admin/services/:id (soft delete)
pub async fn delete_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = state.db.lock().unwrap();
    auth::require_admin(&headers, &state.config.secret_key, &db)?;

    if !queries::deactivate_service(&db, id)? {
        return Err(AppError::NotFound("Service not found".to_string()));
    }
    Ok(Json(serde_json::json!({ "message": "Service deleted successfully" })))
}
