use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::Connection;
use serde::Serialize;

use crate::db::queries;

/// Shop-wide booking window. Per-barber `working_hours` strings are stored
/// for display but intentionally not consulted here.
const DAY_START: NaiveTime = match NaiveTime::from_hms_opt(9, 0, 0) {
    Some(t) => t,
    None => unreachable!(),
};
const DAY_END: NaiveTime = match NaiveTime::from_hms_opt(18, 0, 0) {
    Some(t) => t,
    None => unreachable!(),
};
const SLOT_STRIDE_MINUTES: i64 = 30;

/// Longest bookable duration: the full 09:00-18:00 window. Callers must
/// reject anything larger before it reaches interval arithmetic.
pub const MAX_DURATION_MINUTES: i64 = 540;

#[derive(Debug, Clone, Serialize)]
pub struct Slot {
    pub time: String,
    pub datetime: NaiveDateTime,
    pub available: bool,
}

/// Half-open interval overlap against the barber's active appointments.
/// Each existing appointment's end is recomputed from the durations of its
/// services, never read from a stored total. Back-to-back bookings whose
/// endpoints merely touch do not conflict.
pub fn has_conflict(
    conn: &Connection,
    barber_id: i64,
    start: NaiveDateTime,
    duration_minutes: i64,
    exclude_id: Option<i64>,
) -> anyhow::Result<bool> {
    let end = start + Duration::minutes(duration_minutes);

    let existing = queries::active_appointments_for_barber(conn, barber_id)?;

    for (appointment, total_duration) in existing {
        if exclude_id == Some(appointment.id) {
            continue;
        }
        let other_start = appointment.appointment_datetime;
        let other_end = other_start + Duration::minutes(total_duration);

        if start < other_end && end > other_start {
            return Ok(true);
        }
    }

    Ok(false)
}

/// Free start times for `date` at a fixed 30-minute stride within the
/// 09:00-18:00 window. A candidate is kept when the full duration fits
/// before closing, no active appointment overlaps it, and it lies strictly
/// after `now`. Recomputed fresh on every call.
pub fn available_slots(
    conn: &Connection,
    barber_id: i64,
    date: NaiveDate,
    duration_minutes: i64,
    now: NaiveDateTime,
) -> anyhow::Result<Vec<Slot>> {
    let window_end = date.and_time(DAY_END);
    let mut candidate = date.and_time(DAY_START);

    let mut slots = vec![];
    while candidate + Duration::minutes(duration_minutes) <= window_end {
        if candidate > now && !has_conflict(conn, barber_id, candidate, duration_minutes, None)? {
            slots.push(Slot {
                time: candidate.format("%H:%M").to_string(),
                datetime: candidate,
                available: true,
            });
        }
        candidate += Duration::minutes(SLOT_STRIDE_MINUTES);
    }

    Ok(slots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::db::queries::NewAppointment;
    use crate::models::AppointmentStatus;

    fn setup() -> (Connection, i64, i64) {
        let conn = db::init_db(":memory:").unwrap();
        let barber = queries::create_barber(&conn, "Mike", None, None).unwrap();
        let service = queries::create_service(&conn, barber.id, "Haircut", None, 25.0, 30).unwrap();
        (conn, barber.id, service.id)
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn book(conn: &Connection, barber_id: i64, service_ids: &[i64], when: &str) {
        queries::create_appointment(
            conn,
            &NewAppointment {
                barber_id,
                client_name: "Alice",
                client_email: "alice@example.com",
                client_phone: "555-0100",
                appointment_datetime: dt(when),
                status: AppointmentStatus::Confirmed,
                token: &uuid::Uuid::new_v4().to_string(),
                notes: None,
                confirmed_at: Some(dt(when)),
                service_ids,
            },
        )
        .unwrap();
    }

    #[test]
    fn overlapping_booking_conflicts() {
        let (conn, barber_id, service_id) = setup();
        book(&conn, barber_id, &[service_id], "2025-07-01 10:00");

        // 10:15-10:45 overlaps 10:00-10:30
        assert!(has_conflict(&conn, barber_id, dt("2025-07-01 10:15"), 30, None).unwrap());
    }

    #[test]
    fn back_to_back_does_not_conflict() {
        let (conn, barber_id, service_id) = setup();
        book(&conn, barber_id, &[service_id], "2025-07-01 10:00");

        // Starts exactly when the existing one ends
        assert!(!has_conflict(&conn, barber_id, dt("2025-07-01 10:30"), 30, None).unwrap());
        // Ends exactly when the existing one starts
        assert!(!has_conflict(&conn, barber_id, dt("2025-07-01 09:30"), 30, None).unwrap());
    }

    #[test]
    fn conflict_symmetric_under_containment() {
        let (conn, barber_id, service_id) = setup();
        book(&conn, barber_id, &[service_id], "2025-07-01 10:00");

        // A long candidate fully covering the existing interval
        assert!(has_conflict(&conn, barber_id, dt("2025-07-01 09:00"), 180, None).unwrap());
        // A short candidate fully inside it
        assert!(has_conflict(&conn, barber_id, dt("2025-07-01 10:10"), 10, None).unwrap());
    }

    #[test]
    fn duration_summed_across_services() {
        let (conn, barber_id, service_id) = setup();
        let beard = queries::create_service(&conn, barber_id, "Beard Trim", None, 15.0, 20).unwrap();
        // 30 + 20 = 50 minutes, so the appointment runs 10:00-10:50
        book(&conn, barber_id, &[service_id, beard.id], "2025-07-01 10:00");

        assert!(has_conflict(&conn, barber_id, dt("2025-07-01 10:40"), 30, None).unwrap());
        assert!(!has_conflict(&conn, barber_id, dt("2025-07-01 10:50"), 30, None).unwrap());
    }

    #[test]
    fn exclude_skips_own_appointment() {
        let (conn, barber_id, service_id) = setup();
        book(&conn, barber_id, &[service_id], "2025-07-01 10:00");
        let existing = queries::list_appointments(&conn, None, 0, 10).unwrap();
        let id = existing[0].id;

        assert!(!has_conflict(&conn, barber_id, dt("2025-07-01 10:00"), 30, Some(id)).unwrap());
        assert!(has_conflict(&conn, barber_id, dt("2025-07-01 10:00"), 30, None).unwrap());
    }

    #[test]
    fn cancelled_appointments_ignored() {
        let (conn, barber_id, service_id) = setup();
        book(&conn, barber_id, &[service_id], "2025-07-01 10:00");
        let mut appointment = queries::list_appointments(&conn, None, 0, 10).unwrap().remove(0);
        appointment.status = AppointmentStatus::Cancelled;
        queries::update_appointment(&conn, &appointment).unwrap();

        assert!(!has_conflict(&conn, barber_id, dt("2025-07-01 10:00"), 30, None).unwrap());
    }

    #[test]
    fn slots_cover_window_and_respect_duration() {
        let (conn, barber_id, _) = setup();
        let slots = available_slots(
            &conn,
            barber_id,
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            30,
            dt("2025-06-01 00:00"),
        )
        .unwrap();

        // 09:00 through 17:30 inclusive at 30-minute stride
        assert_eq!(slots.len(), 18);
        assert_eq!(slots[0].time, "09:00");
        assert_eq!(slots.last().unwrap().time, "17:30");

        // A 60-minute duration loses the 17:30 candidate
        let hour_slots = available_slots(
            &conn,
            barber_id,
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            60,
            dt("2025-06-01 00:00"),
        )
        .unwrap();
        assert_eq!(hour_slots.last().unwrap().time, "17:00");
    }

    #[test]
    fn booked_slot_excluded_next_slot_kept() {
        let (conn, barber_id, service_id) = setup();
        book(&conn, barber_id, &[service_id], "2025-07-01 09:00");

        let slots = available_slots(
            &conn,
            barber_id,
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            30,
            dt("2025-06-01 00:00"),
        )
        .unwrap();

        let times: Vec<&str> = slots.iter().map(|s| s.time.as_str()).collect();
        assert!(!times.contains(&"09:00"));
        assert!(times.contains(&"09:30"));
    }

    #[test]
    fn past_slots_excluded() {
        let (conn, barber_id, _) = setup();
        let slots = available_slots(
            &conn,
            barber_id,
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            30,
            dt("2025-07-01 12:00"),
        )
        .unwrap();

        // 12:00 itself is not strictly later than now
        assert_eq!(slots[0].time, "12:30");
    }

    #[test]
    fn slots_ascending() {
        let (conn, barber_id, _) = setup();
        let slots = available_slots(
            &conn,
            barber_id,
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            30,
            dt("2025-06-01 00:00"),
        )
        .unwrap();

        for pair in slots.windows(2) {
            assert!(pair[0].datetime < pair[1].datetime);
        }
    }
}
