use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{Admin, Appointment, AppointmentStatus, Barber, Service};

const DT_FMT: &str = "%Y-%m-%d %H:%M:%S";

fn fmt_dt(dt: &NaiveDateTime) -> String {
    dt.format(DT_FMT).to_string()
}

fn parse_dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, DT_FMT).unwrap_or_else(|_| Utc::now().naive_utc())
}

fn parse_opt_dt(s: Option<String>) -> Option<NaiveDateTime> {
    s.and_then(|v| NaiveDateTime::parse_from_str(&v, DT_FMT).ok())
}

// ── Barbers ──

const BARBER_COLS: &str = "id, name, description, working_hours, is_active, created_at, updated_at";

fn parse_barber_row(row: &rusqlite::Row) -> anyhow::Result<Barber> {
    Ok(Barber {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        working_hours: row.get(3)?,
        is_active: row.get::<_, i64>(4)? != 0,
        created_at: parse_dt(&row.get::<_, String>(5)?),
        updated_at: parse_opt_dt(row.get(6)?),
    })
}

/// Active barbers only; inactive ones are invisible to every caller,
/// including admin updates (matching the soft-delete semantics).
pub fn get_barber(conn: &Connection, id: i64) -> anyhow::Result<Option<Barber>> {
    let result = conn.query_row(
        &format!("SELECT {BARBER_COLS} FROM barbers WHERE id = ?1 AND is_active = 1"),
        params![id],
        |row| Ok(parse_barber_row(row)),
    );

    match result {
        Ok(barber) => Ok(Some(barber?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Lookup that ignores the active flag; used where a deactivated barber's
/// details are still needed (admin listings, appointment emails).
pub fn get_barber_any(conn: &Connection, id: i64) -> anyhow::Result<Option<Barber>> {
    let result = conn.query_row(
        &format!("SELECT {BARBER_COLS} FROM barbers WHERE id = ?1"),
        params![id],
        |row| Ok(parse_barber_row(row)),
    );

    match result {
        Ok(barber) => Ok(Some(barber?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_barbers(conn: &Connection, skip: i64, limit: i64) -> anyhow::Result<Vec<Barber>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BARBER_COLS} FROM barbers WHERE is_active = 1 ORDER BY id LIMIT ?1 OFFSET ?2"
    ))?;

    let rows = stmt.query_map(params![limit, skip], |row| Ok(parse_barber_row(row)))?;

    let mut barbers = vec![];
    for row in rows {
        barbers.push(row??);
    }
    Ok(barbers)
}

pub fn create_barber(
    conn: &Connection,
    name: &str,
    description: Option<&str>,
    working_hours: Option<&str>,
) -> anyhow::Result<Barber> {
    conn.execute(
        "INSERT INTO barbers (name, description, working_hours) VALUES (?1, ?2, ?3)",
        params![name, description, working_hours],
    )?;
    let id = conn.last_insert_rowid();
    get_barber(conn, id)?.ok_or_else(|| anyhow::anyhow!("barber {id} missing after insert"))
}

pub fn update_barber(conn: &Connection, barber: &Barber) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE barbers SET name = ?1, description = ?2, working_hours = ?3, is_active = ?4,
         updated_at = ?5 WHERE id = ?6",
        params![
            barber.name,
            barber.description,
            barber.working_hours,
            barber.is_active as i64,
            fmt_dt(&Utc::now().naive_utc()),
            barber.id,
        ],
    )?;
    Ok(())
}

pub fn deactivate_barber(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE barbers SET is_active = 0, updated_at = ?1 WHERE id = ?2 AND is_active = 1",
        params![fmt_dt(&Utc::now().naive_utc()), id],
    )?;
    Ok(count > 0)
}

// ── Services ──

const SERVICE_COLS: &str =
    "id, barber_id, name, description, price, duration_minutes, is_active, created_at, updated_at";

fn parse_service_row(row: &rusqlite::Row) -> anyhow::Result<Service> {
    Ok(Service {
        id: row.get(0)?,
        barber_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        price: row.get(4)?,
        duration_minutes: row.get(5)?,
        is_active: row.get::<_, i64>(6)? != 0,
        created_at: parse_dt(&row.get::<_, String>(7)?),
        updated_at: parse_opt_dt(row.get(8)?),
    })
}

pub fn get_service(conn: &Connection, id: i64) -> anyhow::Result<Option<Service>> {
    let result = conn.query_row(
        &format!("SELECT {SERVICE_COLS} FROM services WHERE id = ?1 AND is_active = 1"),
        params![id],
        |row| Ok(parse_service_row(row)),
    );

    match result {
        Ok(service) => Ok(Some(service?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_services_by_barber(conn: &Connection, barber_id: i64) -> anyhow::Result<Vec<Service>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SERVICE_COLS} FROM services WHERE barber_id = ?1 AND is_active = 1 ORDER BY id"
    ))?;

    let rows = stmt.query_map(params![barber_id], |row| Ok(parse_service_row(row)))?;

    let mut services = vec![];
    for row in rows {
        services.push(row??);
    }
    Ok(services)
}

pub fn create_service(
    conn: &Connection,
    barber_id: i64,
    name: &str,
    description: Option<&str>,
    price: f64,
    duration_minutes: i64,
) -> anyhow::Result<Service> {
    conn.execute(
        "INSERT INTO services (barber_id, name, description, price, duration_minutes)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![barber_id, name, description, price, duration_minutes],
    )?;
    let id = conn.last_insert_rowid();
    get_service(conn, id)?.ok_or_else(|| anyhow::anyhow!("service {id} missing after insert"))
}

/// Writes every mutable field; `barber_id` is deliberately not part of the
/// statement so a service can never move to another barber.
pub fn update_service(conn: &Connection, service: &Service) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE services SET name = ?1, description = ?2, price = ?3, duration_minutes = ?4,
         is_active = ?5, updated_at = ?6 WHERE id = ?7",
        params![
            service.name,
            service.description,
            service.price,
            service.duration_minutes,
            service.is_active as i64,
            fmt_dt(&Utc::now().naive_utc()),
            service.id,
        ],
    )?;
    Ok(())
}

pub fn deactivate_service(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE services SET is_active = 0, updated_at = ?1 WHERE id = ?2 AND is_active = 1",
        params![fmt_dt(&Utc::now().naive_utc()), id],
    )?;
    Ok(count > 0)
}

// ── Appointments ──

const APPOINTMENT_COLS: &str = "id, barber_id, client_name, client_email, client_phone, \
     appointment_datetime, status, token, notes, created_at, updated_at, confirmed_at";

fn parse_appointment_row(row: &rusqlite::Row) -> anyhow::Result<Appointment> {
    let status_str: String = row.get(6)?;
    Ok(Appointment {
        id: row.get(0)?,
        barber_id: row.get(1)?,
        client_name: row.get(2)?,
        client_email: row.get(3)?,
        client_phone: row.get(4)?,
        appointment_datetime: parse_dt(&row.get::<_, String>(5)?),
        status: AppointmentStatus::parse(&status_str).unwrap_or(AppointmentStatus::Pending),
        token: row.get(7)?,
        notes: row.get(8)?,
        created_at: parse_dt(&row.get::<_, String>(9)?),
        updated_at: parse_opt_dt(row.get(10)?),
        confirmed_at: parse_opt_dt(row.get(11)?),
    })
}

pub struct NewAppointment<'a> {
    pub barber_id: i64,
    pub client_name: &'a str,
    pub client_email: &'a str,
    pub client_phone: &'a str,
    pub appointment_datetime: NaiveDateTime,
    pub status: AppointmentStatus,
    pub token: &'a str,
    pub notes: Option<&'a str>,
    pub confirmed_at: Option<NaiveDateTime>,
    pub service_ids: &'a [i64],
}

/// Inserts the appointment and all of its service associations in a single
/// transaction: either everything lands or nothing does.
pub fn create_appointment(conn: &Connection, new: &NewAppointment) -> anyhow::Result<Appointment> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO appointments (barber_id, client_name, client_email, client_phone,
         appointment_datetime, status, token, notes, confirmed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            new.barber_id,
            new.client_name,
            new.client_email,
            new.client_phone,
            fmt_dt(&new.appointment_datetime),
            new.status.as_str(),
            new.token,
            new.notes,
            new.confirmed_at.as_ref().map(fmt_dt),
        ],
    )?;
    let id = tx.last_insert_rowid();

    for service_id in new.service_ids {
        tx.execute(
            "INSERT INTO appointment_services (appointment_id, service_id) VALUES (?1, ?2)",
            params![id, service_id],
        )?;
    }

    tx.commit()?;

    get_appointment(conn, id)?.ok_or_else(|| anyhow::anyhow!("appointment {id} missing after insert"))
}

pub fn get_appointment(conn: &Connection, id: i64) -> anyhow::Result<Option<Appointment>> {
    let result = conn.query_row(
        &format!("SELECT {APPOINTMENT_COLS} FROM appointments WHERE id = ?1"),
        params![id],
        |row| Ok(parse_appointment_row(row)),
    );

    match result {
        Ok(appointment) => Ok(Some(appointment?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_appointment_by_token(
    conn: &Connection,
    token: &str,
) -> anyhow::Result<Option<Appointment>> {
    let result = conn.query_row(
        &format!("SELECT {APPOINTMENT_COLS} FROM appointments WHERE token = ?1"),
        params![token],
        |row| Ok(parse_appointment_row(row)),
    );

    match result {
        Ok(appointment) => Ok(Some(appointment?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_appointments(
    conn: &Connection,
    status_filter: Option<&str>,
    skip: i64,
    limit: i64,
) -> anyhow::Result<Vec<Appointment>> {
    let (sql, params_vec): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match status_filter {
        Some(status) => (
            format!(
                "SELECT {APPOINTMENT_COLS} FROM appointments WHERE status = ?1
                 ORDER BY appointment_datetime DESC LIMIT ?2 OFFSET ?3"
            ),
            vec![
                Box::new(status.to_string()) as Box<dyn rusqlite::types::ToSql>,
                Box::new(limit),
                Box::new(skip),
            ],
        ),
        None => (
            format!(
                "SELECT {APPOINTMENT_COLS} FROM appointments
                 ORDER BY appointment_datetime DESC LIMIT ?1 OFFSET ?2"
            ),
            vec![
                Box::new(limit) as Box<dyn rusqlite::types::ToSql>,
                Box::new(skip),
            ],
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_appointment_row(row)))?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row??);
    }
    Ok(appointments)
}

/// Appointments that count toward conflict detection, each with its total
/// duration recomputed from the services it references.
pub fn active_appointments_for_barber(
    conn: &Connection,
    barber_id: i64,
) -> anyhow::Result<Vec<(Appointment, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.barber_id, a.client_name, a.client_email, a.client_phone,
                a.appointment_datetime, a.status, a.token, a.notes, a.created_at,
                a.updated_at, a.confirmed_at,
                COALESCE(SUM(s.duration_minutes), 0) AS total_duration
         FROM appointments a
         LEFT JOIN appointment_services aps ON aps.appointment_id = a.id
         LEFT JOIN services s ON s.id = aps.service_id
         WHERE a.barber_id = ?1 AND a.status IN ('pending', 'confirmed')
         GROUP BY a.id",
    )?;

    let rows = stmt.query_map(params![barber_id], |row| {
        let total: i64 = row.get(12)?;
        Ok((parse_appointment_row(row), total))
    })?;

    let mut appointments = vec![];
    for row in rows {
        let (appointment, total) = row?;
        appointments.push((appointment?, total));
    }
    Ok(appointments)
}

pub fn services_for_appointment(
    conn: &Connection,
    appointment_id: i64,
) -> anyhow::Result<Vec<Service>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT s.{} FROM services s
         INNER JOIN appointment_services aps ON aps.service_id = s.id
         WHERE aps.appointment_id = ?1 ORDER BY s.id",
        SERVICE_COLS.replace(", ", ", s.")
    ))?;

    let rows = stmt.query_map(params![appointment_id], |row| Ok(parse_service_row(row)))?;

    let mut services = vec![];
    for row in rows {
        services.push(row??);
    }
    Ok(services)
}

pub fn update_appointment(conn: &Connection, appointment: &Appointment) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE appointments SET appointment_datetime = ?1, status = ?2, notes = ?3,
         confirmed_at = ?4, updated_at = ?5 WHERE id = ?6",
        params![
            fmt_dt(&appointment.appointment_datetime),
            appointment.status.as_str(),
            appointment.notes,
            appointment.confirmed_at.as_ref().map(fmt_dt),
            fmt_dt(&Utc::now().naive_utc()),
            appointment.id,
        ],
    )?;
    Ok(())
}

// ── Admins ──

const ADMIN_COLS: &str = "id, username, email, password_hash, is_active, created_at";

fn parse_admin_row(row: &rusqlite::Row) -> anyhow::Result<Admin> {
    Ok(Admin {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        is_active: row.get::<_, i64>(4)? != 0,
        created_at: parse_dt(&row.get::<_, String>(5)?),
    })
}

pub fn get_admin_by_username(conn: &Connection, username: &str) -> anyhow::Result<Option<Admin>> {
    let result = conn.query_row(
        &format!("SELECT {ADMIN_COLS} FROM admins WHERE username = ?1"),
        params![username],
        |row| Ok(parse_admin_row(row)),
    );

    match result {
        Ok(admin) => Ok(Some(admin?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn create_admin(
    conn: &Connection,
    username: &str,
    email: &str,
    password_hash: &str,
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO admins (username, email, password_hash) VALUES (?1, ?2, ?3)",
        params![username, email, password_hash],
    )?;
    Ok(conn.last_insert_rowid())
}
