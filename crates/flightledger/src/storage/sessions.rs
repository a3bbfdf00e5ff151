//! Flight session persistence.
//!
//! Plain row storage for [`Session`]. Nothing here touches aggregate
//! counters; the reconciler pairs these writes with ledger entries inside
//! one transaction.

use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::error::Result;
use crate::session::{Session, SessionFilter, SessionStatus, SessionType};

use super::{opt_hours_to_ticks, parse_timestamp, ticks_to_hours};

const SESSION_COLUMNS: &str = "id, session_type, status, start_time, end_time, duration_hours, \
     actual_flight_hours, actual_simulator_hours, day_hours, night_hours, instrument_hours, \
     single_engine_time, multi_engine_time, student_id, teacher_id, aircraft_id, simulator_id, \
     school_id, departure_airport, arrival_airport, verified_by_instructor, created_at, updated_at";

/// Hour columns converted to ticks, in column order.
struct HourTicks([Option<i64>; 8]);

impl HourTicks {
    fn of(session: &Session) -> Result<Self> {
        Ok(Self([
            opt_hours_to_ticks("durationHours", session.duration_hours)?,
            opt_hours_to_ticks("actualFlightHours", session.actual_flight_hours)?,
            opt_hours_to_ticks("actualSimulatorHours", session.actual_simulator_hours)?,
            opt_hours_to_ticks("dayHours", session.day_hours)?,
            opt_hours_to_ticks("nightHours", session.night_hours)?,
            opt_hours_to_ticks("instrumentHours", session.instrument_hours)?,
            opt_hours_to_ticks("singleEngineTime", session.single_engine_time)?,
            opt_hours_to_ticks("multiEngineTime", session.multi_engine_time)?,
        ]))
    }
}

/// Insert a new session row.
///
/// Hours are stored at fixed-point precision; re-read the row to see the
/// stored values.
///
/// # Errors
///
/// Returns an error if the id is taken, an hour value does not fit, or the
/// insert fails.
pub fn insert_session(conn: &Connection, session: &Session) -> Result<()> {
    let HourTicks(h) = HourTicks::of(session)?;
    conn.execute(
        &format!(
            "INSERT INTO flight_sessions ({SESSION_COLUMNS}) VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, \
              ?18, ?19, ?20, ?21, ?22, ?23)"
        ),
        params![
            session.id,
            session.session_type.as_str(),
            session.status.as_str(),
            session.start_time.map(|t| t.to_rfc3339()),
            session.end_time.map(|t| t.to_rfc3339()),
            h[0],
            h[1],
            h[2],
            h[3],
            h[4],
            h[5],
            h[6],
            h[7],
            session.student_id,
            session.teacher_id,
            session.aircraft_id,
            session.simulator_id,
            session.school_id,
            session.departure_airport,
            session.arrival_airport,
            session.verified_by_instructor,
            session.created_at.to_rfc3339(),
            session.updated_at.to_rfc3339(),
        ],
    )?;
    debug!("Inserted session {}", session.id);
    Ok(())
}

/// Get a session by id.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn get_session(conn: &Connection, id: &str) -> Result<Option<Session>> {
    let session = conn
        .query_row(
            &format!("SELECT {SESSION_COLUMNS} FROM flight_sessions WHERE id = ?1"),
            [id],
            row_to_session,
        )
        .optional()?;
    Ok(session)
}

/// List sessions matching `filter`, newest start time first.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn list_sessions(conn: &Connection, filter: &SessionFilter) -> Result<Vec<Session>> {
    let limit = if filter.limit == 0 {
        -1
    } else {
        i64::try_from(filter.limit).unwrap_or(i64::MAX)
    };

    let mut stmt = conn.prepare(&format!(
        "SELECT {SESSION_COLUMNS} FROM flight_sessions \
         WHERE (?1 IS NULL OR student_id = ?1) \
           AND (?2 IS NULL OR teacher_id = ?2) \
           AND (?3 IS NULL OR aircraft_id = ?3) \
           AND (?4 IS NULL OR school_id = ?4) \
         ORDER BY start_time DESC, created_at DESC LIMIT ?5"
    ))?;

    let sessions = stmt
        .query_map(
            params![
                filter.student_id,
                filter.teacher_id,
                filter.aircraft_id,
                filter.school_id,
                limit,
            ],
            row_to_session,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(sessions)
}

/// Overwrite a session row with `session`.
///
/// The verification flag and creation time are not touched. Returns `false`
/// if no row has that id.
///
/// # Errors
///
/// Returns an error if an hour value does not fit or the update fails.
pub fn update_session(conn: &Connection, session: &Session) -> Result<bool> {
    let HourTicks(h) = HourTicks::of(session)?;
    let affected = conn.execute(
        "UPDATE flight_sessions SET \
         session_type = ?2, status = ?3, start_time = ?4, end_time = ?5, \
         duration_hours = ?6, actual_flight_hours = ?7, actual_simulator_hours = ?8, \
         day_hours = ?9, night_hours = ?10, instrument_hours = ?11, \
         single_engine_time = ?12, multi_engine_time = ?13, \
         student_id = ?14, teacher_id = ?15, aircraft_id = ?16, simulator_id = ?17, \
         school_id = ?18, departure_airport = ?19, arrival_airport = ?20, updated_at = ?21 \
         WHERE id = ?1",
        params![
            session.id,
            session.session_type.as_str(),
            session.status.as_str(),
            session.start_time.map(|t| t.to_rfc3339()),
            session.end_time.map(|t| t.to_rfc3339()),
            h[0],
            h[1],
            h[2],
            h[3],
            h[4],
            h[5],
            h[6],
            h[7],
            session.student_id,
            session.teacher_id,
            session.aircraft_id,
            session.simulator_id,
            session.school_id,
            session.departure_airport,
            session.arrival_airport,
            session.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(affected > 0)
}

/// Set the instructor verification flag.
///
/// Returns `false` if no row has that id.
///
/// # Errors
///
/// Returns an error if the update fails.
pub fn set_verified(conn: &Connection, id: &str, verified: bool) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE flight_sessions SET verified_by_instructor = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, verified, Utc::now().to_rfc3339()],
    )?;
    Ok(affected > 0)
}

/// Delete a session by id.
///
/// Returns `true` if a session was deleted, `false` if not found.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn delete_session(conn: &Connection, id: &str) -> Result<bool> {
    let affected = conn.execute("DELETE FROM flight_sessions WHERE id = ?1", [id])?;
    Ok(affected > 0)
}

fn parse_column<T>(idx: usize, value: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.to_string().into())
    })
}

fn row_to_session(row: &Row) -> rusqlite::Result<Session> {
    let session_type: String = row.get(1)?;
    let status: String = row.get(2)?;
    let start_time: Option<String> = row.get(3)?;
    let end_time: Option<String> = row.get(4)?;
    let created_at: String = row.get(21)?;
    let updated_at: String = row.get(22)?;

    let hours = |idx: usize| -> rusqlite::Result<_> {
        Ok(row.get::<_, Option<i64>>(idx)?.map(ticks_to_hours))
    };

    Ok(Session {
        id: row.get(0)?,
        session_type: parse_column::<SessionType>(1, &session_type)?,
        status: parse_column::<SessionStatus>(2, &status)?,
        start_time: start_time.map(|t| parse_timestamp(3, &t)).transpose()?,
        end_time: end_time.map(|t| parse_timestamp(4, &t)).transpose()?,
        duration_hours: hours(5)?,
        actual_flight_hours: hours(6)?,
        actual_simulator_hours: hours(7)?,
        day_hours: hours(8)?,
        night_hours: hours(9)?,
        instrument_hours: hours(10)?,
        single_engine_time: hours(11)?,
        multi_engine_time: hours(12)?,
        student_id: row.get(13)?,
        teacher_id: row.get(14)?,
        aircraft_id: row.get(15)?,
        simulator_id: row.get(16)?,
        school_id: row.get(17)?,
        departure_airport: row.get(18)?,
        arrival_airport: row.get(19)?,
        verified_by_instructor: row.get(20)?,
        created_at: parse_timestamp(21, &created_at)?,
        updated_at: parse_timestamp(22, &updated_at)?,
    })
}
