use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Appointment, Barber, Service};
use crate::services::appointments::{self, BookingRequest};
use crate::services::{notifications, scheduling};
use crate::state::AppState;

#[derive(Serialize)]
pub struct BarberWithServices {
    #[serde(flatten)]
    pub barber: Barber,
    pub services: Vec<Service>,
}

#[derive(Deserialize)]
pub struct Pagination {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

// GET /api/barbers
pub async fn list_barbers(
    State(state): State<Arc<AppState>>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<BarberWithServices>>, AppError> {
    let db = state.db.lock().unwrap();
    let barbers = queries::list_barbers(&db, page.skip.unwrap_or(0), page.limit.unwrap_or(100))?;

    let mut response = vec![];
    for barber in barbers {
        let services = queries::list_services_by_barber(&db, barber.id)?;
        response.push(BarberWithServices { barber, services });
    }
    Ok(Json(response))
}

// GET /api/barbers/:id
pub async fn get_barber(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<BarberWithServices>, AppError> {
    let db = state.db.lock().unwrap();
    let barber = queries::get_barber(&db, id)?
        .ok_or_else(|| AppError::NotFound("Barber not found".to_string()))?;
    let services = queries::list_services_by_barber(&db, id)?;
    Ok(Json(BarberWithServices { barber, services }))
}

// GET /api/barbers/:id/services
pub async fn list_barber_services(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Service>>, AppError> {
    let db = state.db.lock().unwrap();
    queries::get_barber(&db, id)?
        .ok_or_else(|| AppError::NotFound("Barber not found".to_string()))?;
    Ok(Json(queries::list_services_by_barber(&db, id)?))
}

// GET /api/barbers/:id/available-slots?date=YYYY-MM-DD&duration_minutes=N
#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: String,
    pub duration_minutes: i64,
}

#[derive(Serialize)]
pub struct SlotsResponse {
    pub date: String,
    pub slots: Vec<scheduling::Slot>,
}

pub async fn available_slots(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<SlotsResponse>, AppError> {
    let date = NaiveDate::parse_from_str(&query.date, "%Y-%m-%d")
        .map_err(|_| AppError::Validation("Invalid date format, expected YYYY-MM-DD".to_string()))?;
    if query.duration_minutes <= 0 || query.duration_minutes > scheduling::MAX_DURATION_MINUTES {
        return Err(AppError::Validation(format!(
            "duration_minutes must be between 1 and {}",
            scheduling::MAX_DURATION_MINUTES
        )));
    }

    let db = state.db.lock().unwrap();
    queries::get_barber(&db, id)?
        .ok_or_else(|| AppError::NotFound("Barber not found".to_string()))?;

    let slots = scheduling::available_slots(
        &db,
        id,
        date,
        query.duration_minutes,
        Utc::now().naive_utc(),
    )?;

    Ok(Json(SlotsResponse {
        date: query.date,
        slots,
    }))
}

// POST /api/appointments
#[derive(Deserialize)]
pub struct CreateAppointmentRequest {
    pub barber_id: i64,
    pub service_ids: Vec<i64>,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub appointment_datetime: NaiveDateTime,
    pub notes: Option<String>,
}

pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateAppointmentRequest>,
) -> Result<Json<Appointment>, AppError> {
    let booked = {
        let db = state.db.lock().unwrap();
        appointments::create(
            &db,
            &BookingRequest {
                barber_id: body.barber_id,
                service_ids: &body.service_ids,
                client_name: &body.client_name,
                client_email: &body.client_email,
                client_phone: &body.client_phone,
                appointment_datetime: body.appointment_datetime,
                notes: body.notes.as_deref(),
            },
        )?
    };

    notifications::send_booking_confirmation(
        state.mailer.as_ref(),
        &state.config.frontend_url,
        &booked,
    )
    .await;

    Ok(Json(booked.appointment))
}

// GET /api/appointments/confirm/:token
pub async fn confirm_appointment(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let db = state.db.lock().unwrap();
    let appointment = appointments::confirm_by_token(&db, &token)?;

    Ok(Json(serde_json::json!({
        "message": "Appointment confirmed successfully",
        "appointment_id": appointment.id,
    })))
}

// GET /api/appointments/check/:token
#[derive(Serialize)]
pub struct CheckResponse {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub barber_name: String,
    pub services: Vec<Service>,
    pub can_cancel: bool,
}

pub async fn check_appointment(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<CheckResponse>, AppError> {
    let db = state.db.lock().unwrap();
    let appointment = queries::get_appointment_by_token(&db, &token)?
        .ok_or_else(|| AppError::NotFound("Appointment not found".to_string()))?;

    let barber_name = queries::get_barber_any(&db, appointment.barber_id)?
        .map(|b| b.name)
        .unwrap_or_default();
    let services = queries::services_for_appointment(&db, appointment.id)?;
    let can_cancel = appointments::can_cancel(&appointment, Utc::now().naive_utc());

    Ok(Json(CheckResponse {
        appointment,
        barber_name,
        services,
        can_cancel,
    }))
}

// POST /api/appointments/cancel/:token
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let appointment = {
        let db = state.db.lock().unwrap();
        appointments::cancel_by_token(&db, &token, Utc::now().naive_utc())?
    };

    notifications::send_cancellation_confirmation(
        state.mailer.as_ref(),
        &appointment.client_email,
        &appointment.client_name,
        &appointment
            .appointment_datetime
            .format("%Y-%m-%d %H:%M")
            .to_string(),
    )
    .await;

    Ok(Json(serde_json::json!({
        "message": "Appointment cancelled successfully",
        "appointment_id": appointment.id,
    })))
}
