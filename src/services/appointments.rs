use chrono::{NaiveDateTime, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use crate::db::queries;
use crate::db::queries::NewAppointment;
use crate::errors::AppError;
use crate::models::{Appointment, AppointmentStatus, Barber, Service};
use crate::services::scheduling;

/// Minimum lead time for a client-initiated cancellation.
pub const CANCEL_CUTOFF_SECONDS: i64 = 2 * 60 * 60;

pub struct BookingRequest<'a> {
    pub barber_id: i64,
    pub service_ids: &'a [i64],
    pub client_name: &'a str,
    pub client_email: &'a str,
    pub client_phone: &'a str,
    pub appointment_datetime: NaiveDateTime,
    pub notes: Option<&'a str>,
}

/// Everything a caller needs after a successful booking, including the data
/// the confirmation email is rendered from.
#[derive(Debug)]
pub struct BookedAppointment {
    pub appointment: Appointment,
    pub barber: Barber,
    pub services: Vec<Service>,
    pub total_duration: i64,
    pub total_price: f64,
}

pub fn validate_phone(phone: &str) -> bool {
    let allowed = |c: char| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')');
    if !phone.chars().all(allowed) {
        return false;
    }
    phone.chars().filter(|c| c.is_ascii_digit()).count() >= 7
}

/// Validates the request, checks for schedule conflicts, and persists the
/// appointment with its service associations atomically. Bookings are
/// confirmed on creation; the returned appointment carries the single-use
/// cancellation token.
pub fn create(conn: &Connection, req: &BookingRequest) -> Result<BookedAppointment, AppError> {
    let barber = queries::get_barber(conn, req.barber_id)?
        .ok_or_else(|| AppError::NotFound("Barber not found".to_string()))?;

    if req.service_ids.is_empty() {
        return Err(AppError::Validation(
            "At least one service must be selected".to_string(),
        ));
    }

    if !validate_phone(req.client_phone) {
        return Err(AppError::Validation("Invalid phone number".to_string()));
    }

    let mut services = vec![];
    let mut total_duration = 0i64;
    let mut total_price = 0f64;

    for &service_id in req.service_ids {
        let service = queries::get_service(conn, service_id)?
            .ok_or_else(|| AppError::NotFound(format!("Service {service_id} not found")))?;
        if service.barber_id != req.barber_id {
            return Err(AppError::Validation(format!(
                "Service {service_id} does not belong to this barber"
            )));
        }
        total_duration += service.duration_minutes;
        total_price += service.price;
        services.push(service);
    }

    if scheduling::has_conflict(
        conn,
        req.barber_id,
        req.appointment_datetime,
        total_duration,
        None,
    )? {
        return Err(AppError::SlotUnavailable);
    }

    let now = Utc::now().naive_utc();
    let appointment = queries::create_appointment(
        conn,
        &NewAppointment {
            barber_id: req.barber_id,
            client_name: req.client_name,
            client_email: req.client_email,
            client_phone: req.client_phone,
            appointment_datetime: req.appointment_datetime,
            status: AppointmentStatus::Confirmed,
            token: &Uuid::new_v4().to_string(),
            notes: req.notes,
            confirmed_at: Some(now),
            service_ids: req.service_ids,
        },
    )?;

    Ok(BookedAppointment {
        appointment,
        barber,
        services,
        total_duration,
        total_price,
    })
}

/// Token redemption for the pending-then-confirm flow. Unknown tokens and
/// appointments in any non-pending state both come back as NotFound, so a
/// replayed token fails the same way every time.
pub fn confirm_by_token(conn: &Connection, token: &str) -> Result<Appointment, AppError> {
    let mut appointment = queries::get_appointment_by_token(conn, token)?
        .filter(|a| a.status == AppointmentStatus::Pending)
        .ok_or_else(|| {
            AppError::NotFound("Invalid confirmation token or appointment already confirmed".to_string())
        })?;

    appointment.status = AppointmentStatus::Confirmed;
    appointment.confirmed_at = Some(Utc::now().naive_utc());
    queries::update_appointment(conn, &appointment)?;

    Ok(appointment)
}

pub fn can_cancel(appointment: &Appointment, now: NaiveDateTime) -> bool {
    appointment.status == AppointmentStatus::Confirmed
        && (appointment.appointment_datetime - now).num_seconds() >= CANCEL_CUTOFF_SECONDS
}

/// Cancellation requires a confirmed appointment starting at least two
/// hours from `now`. Wrong status and too-late both collapse into NotFound;
/// the caller cannot tell them apart by design.
pub fn cancel_by_token(
    conn: &Connection,
    token: &str,
    now: NaiveDateTime,
) -> Result<Appointment, AppError> {
    let mut appointment = queries::get_appointment_by_token(conn, token)?
        .filter(|a| can_cancel(a, now))
        .ok_or_else(|| AppError::NotFound("Appointment cannot be cancelled".to_string()))?;

    appointment.status = AppointmentStatus::Cancelled;
    queries::update_appointment(conn, &appointment)?;

    Ok(appointment)
}

pub struct AdminUpdate {
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
    pub appointment_datetime: Option<NaiveDateTime>,
}

/// Operator-only update. Applies any subset of fields without re-running
/// conflict detection: an admin may knowingly move an appointment into an
/// occupied slot.
pub fn admin_update(
    conn: &Connection,
    appointment_id: i64,
    update: AdminUpdate,
) -> Result<Appointment, AppError> {
    let mut appointment = queries::get_appointment(conn, appointment_id)?
        .ok_or_else(|| AppError::NotFound("Appointment not found".to_string()))?;

    if let Some(status) = update.status {
        appointment.status = status;
        if status == AppointmentStatus::Confirmed {
            appointment.confirmed_at = Some(Utc::now().naive_utc());
        }
    }
    if let Some(notes) = update.notes {
        appointment.notes = Some(notes);
    }
    if let Some(datetime) = update.appointment_datetime {
        appointment.appointment_datetime = datetime;
    }

    queries::update_appointment(conn, &appointment)?;

    Ok(appointment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::Duration;

    fn setup() -> (Connection, i64, i64) {
        let conn = db::init_db(":memory:").unwrap();
        let barber = queries::create_barber(&conn, "Mike", None, None).unwrap();
        let service = queries::create_service(&conn, barber.id, "Haircut", None, 25.0, 30).unwrap();
        (conn, barber.id, service.id)
    }

    fn request<'a>(barber_id: i64, service_ids: &'a [i64], when: NaiveDateTime) -> BookingRequest<'a> {
        BookingRequest {
            barber_id,
            service_ids,
            client_name: "Alice",
            client_email: "alice@example.com",
            client_phone: "+1 (555) 010-0199",
            appointment_datetime: when,
            notes: None,
        }
    }

    fn future(minutes: i64) -> NaiveDateTime {
        Utc::now().naive_utc() + Duration::minutes(minutes)
    }

    #[test]
    fn phone_validation() {
        assert!(validate_phone("555-0123"));
        assert!(validate_phone("+1 (555) 010-0199"));
        assert!(!validate_phone("555-abc-0123"));
        assert!(!validate_phone("+1 23"));
        assert!(!validate_phone("555;0123456"));
    }

    #[test]
    fn create_auto_confirms_with_token() {
        let (conn, barber_id, service_id) = setup();
        let booked = create(&conn, &request(barber_id, &[service_id], future(60 * 24))).unwrap();

        assert_eq!(booked.appointment.status, AppointmentStatus::Confirmed);
        assert!(booked.appointment.confirmed_at.is_some());
        assert!(!booked.appointment.token.is_empty());
        assert_eq!(booked.total_duration, 30);
        assert_eq!(booked.total_price, 25.0);

        // Round trip preserves the client fields
        let fetched = queries::get_appointment(&conn, booked.appointment.id)
            .unwrap()
            .unwrap();
        assert_eq!(fetched.client_name, "Alice");
        assert_eq!(fetched.client_email, "alice@example.com");
        assert_eq!(fetched.token, booked.appointment.token);
    }

    #[test]
    fn empty_service_list_rejected() {
        let (conn, barber_id, _) = setup();
        let err = create(&conn, &request(barber_id, &[], future(60))).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(queries::list_appointments(&conn, None, 0, 10).unwrap().is_empty());
    }

    #[test]
    fn foreign_service_rejected() {
        let (conn, barber_id, _) = setup();
        let other = queries::create_barber(&conn, "Sarah", None, None).unwrap();
        let foreign = queries::create_service(&conn, other.id, "Styling", None, 20.0, 25).unwrap();

        let err = create(&conn, &request(barber_id, &[foreign.id], future(60))).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn unknown_barber_rejected() {
        let (conn, _, service_id) = setup();
        let err = create(&conn, &request(999, &[service_id], future(60))).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn double_booking_rejected() {
        let (conn, barber_id, service_id) = setup();
        let when = future(60 * 24);
        create(&conn, &request(barber_id, &[service_id], when)).unwrap();

        let err = create(&conn, &request(barber_id, &[service_id], when)).unwrap_err();
        assert!(matches!(err, AppError::SlotUnavailable));
    }

    #[test]
    fn cancel_boundary_at_two_hours() {
        let (conn, barber_id, service_id) = setup();
        let now = Utc::now().naive_utc();

        let booked = create(
            &conn,
            &request(barber_id, &[service_id], now + Duration::minutes(119)),
        )
        .unwrap();
        assert!(cancel_by_token(&conn, &booked.appointment.token, now).is_err());

        let booked = create(
            &conn,
            &request(barber_id, &[service_id], now + Duration::minutes(180)),
        )
        .unwrap();
        let exactly_two_hours_before =
            booked.appointment.appointment_datetime - Duration::minutes(120);
        cancel_by_token(&conn, &booked.appointment.token, exactly_two_hours_before).unwrap();

        let booked = create(
            &conn,
            &request(barber_id, &[service_id], now + Duration::minutes(240)),
        )
        .unwrap();
        let just_under = booked.appointment.appointment_datetime - Duration::minutes(119);
        assert!(cancel_by_token(&conn, &booked.appointment.token, just_under).is_err());
    }

    #[test]
    fn cancel_token_single_use() {
        let (conn, barber_id, service_id) = setup();
        let now = Utc::now().naive_utc();
        let booked = create(
            &conn,
            &request(barber_id, &[service_id], now + Duration::minutes(300)),
        )
        .unwrap();

        cancel_by_token(&conn, &booked.appointment.token, now).unwrap();
        let err = cancel_by_token(&conn, &booked.appointment.token, now).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn confirm_token_single_use() {
        let (conn, barber_id, service_id) = setup();
        let booked = create(&conn, &request(barber_id, &[service_id], future(300))).unwrap();

        // Auto-confirmed on creation, so the confirm flow treats the token
        // as already redeemed.
        let err = confirm_by_token(&conn, &booked.appointment.token).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        // A pending appointment confirms exactly once.
        let mut appointment = booked.appointment.clone();
        appointment.status = AppointmentStatus::Pending;
        queries::update_appointment(&conn, &appointment).unwrap();

        let confirmed = confirm_by_token(&conn, &appointment.token).unwrap();
        assert_eq!(confirmed.status, AppointmentStatus::Confirmed);
        assert!(confirmed.confirmed_at.is_some());
        assert!(confirm_by_token(&conn, &appointment.token).is_err());
    }

    #[test]
    fn admin_update_skips_conflict_check() {
        let (conn, barber_id, service_id) = setup();
        let when = future(60 * 24);
        let first = create(&conn, &request(barber_id, &[service_id], when)).unwrap();
        let second = create(
            &conn,
            &request(barber_id, &[service_id], when + Duration::hours(2)),
        )
        .unwrap();

        // Move the second appointment on top of the first; allowed for admins.
        let moved = admin_update(
            &conn,
            second.appointment.id,
            AdminUpdate {
                status: None,
                notes: Some("moved by front desk".to_string()),
                appointment_datetime: Some(first.appointment.appointment_datetime),
            },
        )
        .unwrap();

        assert_eq!(
            moved.appointment_datetime,
            first.appointment.appointment_datetime
        );
        assert_eq!(moved.notes.as_deref(), Some("moved by front desk"));
    }

    #[test]
    fn admin_confirm_stamps_confirmed_at() {
        let (conn, barber_id, service_id) = setup();
        let booked = create(&conn, &request(barber_id, &[service_id], future(300))).unwrap();

        let mut appointment = booked.appointment.clone();
        appointment.status = AppointmentStatus::Pending;
        appointment.confirmed_at = None;
        queries::update_appointment(&conn, &appointment).unwrap();

        let updated = admin_update(
            &conn,
            appointment.id,
            AdminUpdate {
                status: Some(AppointmentStatus::Confirmed),
                notes: None,
                appointment_datetime: None,
            },
        )
        .unwrap();
        assert!(updated.confirmed_at.is_some());
    }
}
