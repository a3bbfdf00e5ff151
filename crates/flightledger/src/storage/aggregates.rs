//! Aggregate accessor.
//!
//! Reads and writes the denormalized hour counters on students, teachers
//! and aircraft. Every function takes the connection (or a transaction,
//! through deref) it should run on and never opens a transaction itself.
//! An id that is empty or does not resolve yields `None`/`false`, not an
//! error.

use std::fmt;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::hours::HoursDelta;

use super::{hours_to_ticks, parse_timestamp, ticks_to_hours};

/// The two kinds of person whose hours are tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PilotKind {
    /// A student pilot.
    Student,
    /// An instructor.
    Teacher,
}

impl PilotKind {
    fn table(self) -> &'static str {
        match self {
            Self::Student => "students",
            Self::Teacher => "teachers",
        }
    }
}

impl fmt::Display for PilotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Student => write!(f, "student"),
            Self::Teacher => write!(f, "teacher"),
        }
    }
}

/// Running totals kept on a student or teacher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct PilotTotals {
    pub total_flight_hours: Decimal,
    pub total_simulator_hours: Decimal,
    pub day_hours: Decimal,
    pub night_hours: Decimal,
    pub instrument_hours: Decimal,
    pub single_engine_time: Decimal,
    pub multi_engine_time: Decimal,
}

/// Running totals kept on an aircraft.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AircraftTotals {
    /// Hours on the engine; grows with flight time.
    pub engine_hours: Decimal,
    /// Hours on the airframe.
    pub airframe_hours: Decimal,
}

/// A student or teacher row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pilot {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Owning school.
    pub school_id: Option<String>,
    /// Current counters.
    #[serde(flatten)]
    pub totals: PilotTotals,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the counters or details last changed.
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a student or teacher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPilot {
    /// Caller-chosen id; generated when absent.
    pub id: Option<String>,
    /// Display name.
    pub name: String,
    /// Owning school.
    pub school_id: Option<String>,
    /// Hours carried over from before this ledger existed.
    pub opening: PilotTotals,
}

/// An aircraft row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Aircraft {
    /// Unique identifier.
    pub id: String,
    /// Registration mark.
    pub tail_number: String,
    /// Manufacturer.
    pub make: Option<String>,
    /// Model designation.
    pub model: Option<String>,
    /// Owning school.
    pub school_id: Option<String>,
    /// Current counters.
    #[serde(flatten)]
    pub totals: AircraftTotals,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the counters or details last changed.
    pub updated_at: DateTime<Utc>,
}

/// Input for registering an aircraft.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewAircraft {
    /// Caller-chosen id; generated when absent.
    pub id: Option<String>,
    /// Registration mark.
    pub tail_number: String,
    /// Manufacturer.
    pub make: Option<String>,
    /// Model designation.
    pub model: Option<String>,
    /// Owning school.
    pub school_id: Option<String>,
    /// Hours already on the aircraft when it joins the fleet.
    pub opening: AircraftTotals,
}

const PILOT_COLUMNS: &str = "id, name, school_id, total_flight_hours, total_simulator_hours, \
     day_hours, night_hours, instrument_hours, single_engine_time, multi_engine_time, \
     created_at, updated_at";

const AIRCRAFT_COLUMNS: &str =
    "id, tail_number, make, model, school_id, engine_hours, airframe_hours, created_at, updated_at";

fn resolve(id: &str) -> Option<&str> {
    Some(id).filter(|id| !id.is_empty())
}

fn new_id(id: Option<&String>) -> String {
    id.filter(|id| !id.is_empty())
        .cloned()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

// === Students and teachers ===

/// Register a student or teacher.
///
/// # Errors
///
/// Returns an error if the id is taken, an opening total does not fit, or
/// the insert fails.
pub fn insert_pilot(conn: &Connection, kind: PilotKind, pilot: &NewPilot) -> Result<Pilot> {
    let id = new_id(pilot.id.as_ref());
    let now = Utc::now();
    let t = &pilot.opening;

    conn.execute(
        &format!(
            "INSERT INTO {} ({PILOT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
            kind.table()
        ),
        params![
            id,
            pilot.name,
            pilot.school_id,
            hours_to_ticks("totalFlightHours", t.total_flight_hours)?,
            hours_to_ticks("totalSimulatorHours", t.total_simulator_hours)?,
            hours_to_ticks("dayHours", t.day_hours)?,
            hours_to_ticks("nightHours", t.night_hours)?,
            hours_to_ticks("instrumentHours", t.instrument_hours)?,
            hours_to_ticks("singleEngineTime", t.single_engine_time)?,
            hours_to_ticks("multiEngineTime", t.multi_engine_time)?,
            now.to_rfc3339(),
        ],
    )?;

    get_pilot(conn, kind, &id)?
        .ok_or_else(|| Error::internal(format!("{kind} {id} vanished after insert")))
}

/// Fetch a student or teacher by id.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn get_pilot(conn: &Connection, kind: PilotKind, id: &str) -> Result<Option<Pilot>> {
    let Some(id) = resolve(id) else {
        return Ok(None);
    };
    let pilot = conn
        .query_row(
            &format!("SELECT {PILOT_COLUMNS} FROM {} WHERE id = ?1", kind.table()),
            [id],
            row_to_pilot,
        )
        .optional()?;
    Ok(pilot)
}

/// List students or teachers, optionally for one school, by name.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn list_pilots(
    conn: &Connection,
    kind: PilotKind,
    school_id: Option<&str>,
) -> Result<Vec<Pilot>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PILOT_COLUMNS} FROM {} WHERE (?1 IS NULL OR school_id = ?1) ORDER BY name",
        kind.table()
    ))?;
    let pilots = stmt
        .query_map([school_id], row_to_pilot)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(pilots)
}

/// Read a pilot's current counters.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn load_pilot(conn: &Connection, kind: PilotKind, id: &str) -> Result<Option<PilotTotals>> {
    Ok(get_pilot(conn, kind, id)?.map(|p| p.totals))
}

/// Replace a pilot's counters with `totals`.
///
/// Returns `false` if the id does not resolve.
///
/// # Errors
///
/// Returns an error if a total does not fit or the update fails.
pub fn store_pilot(
    conn: &Connection,
    kind: PilotKind,
    id: &str,
    totals: &PilotTotals,
) -> Result<bool> {
    let Some(id) = resolve(id) else {
        return Ok(false);
    };
    let affected = conn.execute(
        &format!(
            "UPDATE {} SET total_flight_hours = ?2, total_simulator_hours = ?3, \
             day_hours = ?4, night_hours = ?5, instrument_hours = ?6, \
             single_engine_time = ?7, multi_engine_time = ?8, updated_at = ?9 \
             WHERE id = ?1",
            kind.table()
        ),
        params![
            id,
            hours_to_ticks("totalFlightHours", totals.total_flight_hours)?,
            hours_to_ticks("totalSimulatorHours", totals.total_simulator_hours)?,
            hours_to_ticks("dayHours", totals.day_hours)?,
            hours_to_ticks("nightHours", totals.night_hours)?,
            hours_to_ticks("instrumentHours", totals.instrument_hours)?,
            hours_to_ticks("singleEngineTime", totals.single_engine_time)?,
            hours_to_ticks("multiEngineTime", totals.multi_engine_time)?,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(affected > 0)
}

/// Add `delta` to a pilot's counters in a single statement.
///
/// `airframe_hours` is ignored. Returns `false` if the id does not resolve.
/// The new totals are checked before anything is written; run this inside
/// an `IMMEDIATE` transaction so the check and the update see the same row.
///
/// # Errors
///
/// Returns [`Error::HoursOutOfRange`] if a component or a resulting total
/// does not fit, or an error if the update fails.
pub fn increment_pilot(
    conn: &Connection,
    kind: PilotKind,
    id: &str,
    delta: &HoursDelta,
) -> Result<bool> {
    let Some(id) = resolve(id) else {
        return Ok(false);
    };
    let current: Option<[i64; 7]> = conn
        .query_row(
            &format!(
                "SELECT total_flight_hours, total_simulator_hours, day_hours, night_hours, \
                 instrument_hours, single_engine_time, multi_engine_time \
                 FROM {} WHERE id = ?1",
                kind.table()
            ),
            [id],
            |row| {
                Ok([
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                ])
            },
        )
        .optional()?;
    let Some(current) = current else {
        return Ok(false);
    };

    let affected = conn.execute(
        &format!(
            "UPDATE {} SET \
             total_flight_hours = total_flight_hours + ?2, \
             total_simulator_hours = total_simulator_hours + ?3, \
             day_hours = day_hours + ?4, \
             night_hours = night_hours + ?5, \
             instrument_hours = instrument_hours + ?6, \
             single_engine_time = single_engine_time + ?7, \
             multi_engine_time = multi_engine_time + ?8, \
             updated_at = ?9 \
             WHERE id = ?1",
            kind.table()
        ),
        params![
            id,
            checked_step("totalFlightHours", current[0], delta.total_flight_hours)?,
            checked_step("totalSimulatorHours", current[1], delta.total_simulator_hours)?,
            checked_step("dayHours", current[2], delta.day_hours)?,
            checked_step("nightHours", current[3], delta.night_hours)?,
            checked_step("instrumentHours", current[4], delta.instrument_hours)?,
            checked_step("singleEngineTime", current[5], delta.single_engine_time)?,
            checked_step("multiEngineTime", current[6], delta.multi_engine_time)?,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(affected > 0)
}

/// Convert one delta component to ticks, refusing it if the running total
/// would leave the `i64` range.
fn checked_step(field: &'static str, current: i64, delta: Decimal) -> Result<i64> {
    let step = hours_to_ticks(field, delta)?;
    match current.checked_add(step) {
        Some(_) => Ok(step),
        None => Err(Error::HoursOutOfRange {
            field,
            value: ticks_to_hours(current).checked_add(delta).unwrap_or(delta),
        }),
    }
}

fn row_to_pilot(row: &Row) -> rusqlite::Result<Pilot> {
    let created_at: String = row.get(10)?;
    let updated_at: String = row.get(11)?;
    Ok(Pilot {
        id: row.get(0)?,
        name: row.get(1)?,
        school_id: row.get(2)?,
        totals: PilotTotals {
            total_flight_hours: ticks_to_hours(row.get(3)?),
            total_simulator_hours: ticks_to_hours(row.get(4)?),
            day_hours: ticks_to_hours(row.get(5)?),
            night_hours: ticks_to_hours(row.get(6)?),
            instrument_hours: ticks_to_hours(row.get(7)?),
            single_engine_time: ticks_to_hours(row.get(8)?),
            multi_engine_time: ticks_to_hours(row.get(9)?),
        },
        created_at: parse_timestamp(10, &created_at)?,
        updated_at: parse_timestamp(11, &updated_at)?,
    })
}

// === Aircraft ===

/// Register an aircraft.
///
/// # Errors
///
/// Returns an error if the id or tail number is taken, an opening total does
/// not fit, or the insert fails.
pub fn insert_aircraft(conn: &Connection, aircraft: &NewAircraft) -> Result<Aircraft> {
    let id = new_id(aircraft.id.as_ref());
    conn.execute(
        &format!("INSERT INTO aircraft ({AIRCRAFT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)"),
        params![
            id,
            aircraft.tail_number,
            aircraft.make,
            aircraft.model,
            aircraft.school_id,
            hours_to_ticks("engineHours", aircraft.opening.engine_hours)?,
            hours_to_ticks("airframeHours", aircraft.opening.airframe_hours)?,
            Utc::now().to_rfc3339(),
        ],
    )?;

    get_aircraft(conn, &id)?
        .ok_or_else(|| Error::internal(format!("aircraft {id} vanished after insert")))
}

/// Fetch an aircraft by id.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn get_aircraft(conn: &Connection, id: &str) -> Result<Option<Aircraft>> {
    let Some(id) = resolve(id) else {
        return Ok(None);
    };
    let aircraft = conn
        .query_row(
            &format!("SELECT {AIRCRAFT_COLUMNS} FROM aircraft WHERE id = ?1"),
            [id],
            row_to_aircraft,
        )
        .optional()?;
    Ok(aircraft)
}

/// Read an aircraft's current counters.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn load_aircraft(conn: &Connection, id: &str) -> Result<Option<AircraftTotals>> {
    Ok(get_aircraft(conn, id)?.map(|a| a.totals))
}

/// Replace an aircraft's counters with `totals`.
///
/// Returns `false` if the id does not resolve.
///
/// # Errors
///
/// Returns an error if a total does not fit or the update fails.
pub fn store_aircraft(conn: &Connection, id: &str, totals: &AircraftTotals) -> Result<bool> {
    let Some(id) = resolve(id) else {
        return Ok(false);
    };
    let affected = conn.execute(
        "UPDATE aircraft SET engine_hours = ?2, airframe_hours = ?3, updated_at = ?4 WHERE id = ?1",
        params![
            id,
            hours_to_ticks("engineHours", totals.engine_hours)?,
            hours_to_ticks("airframeHours", totals.airframe_hours)?,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(affected > 0)
}

/// Add `delta` to an aircraft's counters in a single statement.
///
/// Engine hours grow by the flight component, airframe hours by the airframe
/// component. Returns `false` if the id does not resolve. Totals are checked
/// the same way as [`increment_pilot`].
///
/// # Errors
///
/// Returns [`Error::HoursOutOfRange`] if a component or a resulting total
/// does not fit, or an error if the update fails.
pub fn increment_aircraft(conn: &Connection, id: &str, delta: &HoursDelta) -> Result<bool> {
    let Some(id) = resolve(id) else {
        return Ok(false);
    };
    let current: Option<(i64, i64)> = conn
        .query_row(
            "SELECT engine_hours, airframe_hours FROM aircraft WHERE id = ?1",
            [id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let Some((engine, airframe)) = current else {
        return Ok(false);
    };

    let affected = conn.execute(
        "UPDATE aircraft SET \
         engine_hours = engine_hours + ?2, \
         airframe_hours = airframe_hours + ?3, \
         updated_at = ?4 \
         WHERE id = ?1",
        params![
            id,
            checked_step("engineHours", engine, delta.total_flight_hours)?,
            checked_step("airframeHours", airframe, delta.airframe_hours)?,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(affected > 0)
}

fn row_to_aircraft(row: &Row) -> rusqlite::Result<Aircraft> {
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;
    Ok(Aircraft {
        id: row.get(0)?,
        tail_number: row.get(1)?,
        make: row.get(2)?,
        model: row.get(3)?,
        school_id: row.get(4)?,
        totals: AircraftTotals {
            engine_hours: ticks_to_hours(row.get(5)?),
            airframe_hours: ticks_to_hours(row.get(6)?),
        },
        created_at: parse_timestamp(7, &created_at)?,
        updated_at: parse_timestamp(8, &updated_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;

    fn hours(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn student(storage: &Storage, id: &str) -> Pilot {
        insert_pilot(
            storage.conn(),
            PilotKind::Student,
            &NewPilot {
                id: Some(id.to_string()),
                name: format!("Student {id}"),
                ..NewPilot::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_insert_and_get_pilot() {
        let storage = Storage::open_in_memory().unwrap();
        let inserted = student(&storage, "s1");

        let fetched = get_pilot(storage.conn(), PilotKind::Student, "s1")
            .unwrap()
            .unwrap();
        assert_eq!(inserted, fetched);
        assert_eq!(fetched.totals, PilotTotals::default());
    }

    #[test]
    fn test_students_and_teachers_are_separate() {
        let storage = Storage::open_in_memory().unwrap();
        student(&storage, "p1");

        assert!(get_pilot(storage.conn(), PilotKind::Teacher, "p1")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_insert_pilot_generates_id() {
        let storage = Storage::open_in_memory().unwrap();
        let pilot = insert_pilot(
            storage.conn(),
            PilotKind::Teacher,
            &NewPilot {
                name: "CFI".to_string(),
                ..NewPilot::default()
            },
        )
        .unwrap();
        assert!(!pilot.id.is_empty());
    }

    #[test]
    fn test_insert_pilot_with_opening_totals() {
        let storage = Storage::open_in_memory().unwrap();
        let pilot = insert_pilot(
            storage.conn(),
            PilotKind::Student,
            &NewPilot {
                id: Some("s1".to_string()),
                name: "Transfer".to_string(),
                school_id: None,
                opening: PilotTotals {
                    total_flight_hours: hours("10"),
                    night_hours: hours("1.2"),
                    ..PilotTotals::default()
                },
            },
        )
        .unwrap();
        assert_eq!(pilot.totals.total_flight_hours, hours("10"));
        assert_eq!(pilot.totals.night_hours, hours("1.2"));
    }

    #[test]
    fn test_missing_and_empty_ids_resolve_to_nothing() {
        let storage = Storage::open_in_memory().unwrap();
        let conn = storage.conn();

        assert!(load_pilot(conn, PilotKind::Student, "nope").unwrap().is_none());
        assert!(load_pilot(conn, PilotKind::Student, "").unwrap().is_none());
        assert!(load_aircraft(conn, "").unwrap().is_none());
        assert!(!increment_pilot(conn, PilotKind::Student, "nope", &HoursDelta::ZERO).unwrap());
        assert!(!increment_aircraft(conn, "", &HoursDelta::ZERO).unwrap());
        assert!(!store_pilot(conn, PilotKind::Teacher, "nope", &PilotTotals::default()).unwrap());
    }

    #[test]
    fn test_store_replaces_counters() {
        let storage = Storage::open_in_memory().unwrap();
        student(&storage, "s1");

        let totals = PilotTotals {
            total_flight_hours: hours("42.5"),
            multi_engine_time: hours("3"),
            ..PilotTotals::default()
        };
        assert!(store_pilot(storage.conn(), PilotKind::Student, "s1", &totals).unwrap());
        assert_eq!(
            load_pilot(storage.conn(), PilotKind::Student, "s1").unwrap(),
            Some(totals)
        );
    }

    #[test]
    fn test_increment_pilot_adds_and_ignores_airframe() {
        let storage = Storage::open_in_memory().unwrap();
        student(&storage, "s1");

        let delta = HoursDelta {
            total_flight_hours: hours("1.5"),
            day_hours: hours("1"),
            night_hours: hours("0.5"),
            airframe_hours: hours("99"),
            ..HoursDelta::ZERO
        };
        assert!(increment_pilot(storage.conn(), PilotKind::Student, "s1", &delta).unwrap());
        assert!(increment_pilot(storage.conn(), PilotKind::Student, "s1", &delta).unwrap());

        let totals = load_pilot(storage.conn(), PilotKind::Student, "s1")
            .unwrap()
            .unwrap();
        assert_eq!(totals.total_flight_hours, hours("3"));
        assert_eq!(totals.day_hours, hours("2"));
        assert_eq!(totals.night_hours, hours("1"));
        assert_eq!(totals.total_simulator_hours, Decimal::ZERO);
    }

    #[test]
    fn test_aircraft_insert_increment_store() {
        let storage = Storage::open_in_memory().unwrap();
        let conn = storage.conn();
        insert_aircraft(
            conn,
            &NewAircraft {
                id: Some("a1".to_string()),
                tail_number: "N12345".to_string(),
                make: Some("Cessna".to_string()),
                model: Some("172S".to_string()),
                school_id: None,
                opening: AircraftTotals {
                    engine_hours: hours("100"),
                    airframe_hours: hours("500"),
                },
            },
        )
        .unwrap();

        let delta = HoursDelta {
            total_flight_hours: hours("1.5"),
            airframe_hours: hours("1.5"),
            day_hours: hours("7"),
            ..HoursDelta::ZERO
        };
        assert!(increment_aircraft(conn, "a1", &delta).unwrap());
        assert_eq!(
            load_aircraft(conn, "a1").unwrap(),
            Some(AircraftTotals {
                engine_hours: hours("101.5"),
                airframe_hours: hours("501.5"),
            })
        );

        assert!(store_aircraft(conn, "a1", &AircraftTotals::default()).unwrap());
        assert_eq!(
            load_aircraft(conn, "a1").unwrap(),
            Some(AircraftTotals::default())
        );
    }

    #[test]
    fn test_increment_refuses_total_overflow() {
        let storage = Storage::open_in_memory().unwrap();
        student(&storage, "s1");

        let delta = HoursDelta {
            total_flight_hours: hours("900000000000000"),
            ..HoursDelta::ZERO
        };
        assert!(increment_pilot(storage.conn(), PilotKind::Student, "s1", &delta).unwrap());

        let err = increment_pilot(storage.conn(), PilotKind::Student, "s1", &delta).unwrap_err();
        assert!(matches!(
            err,
            Error::HoursOutOfRange {
                field: "totalFlightHours",
                ..
            }
        ));
        let totals = load_pilot(storage.conn(), PilotKind::Student, "s1")
            .unwrap()
            .unwrap();
        assert_eq!(totals.total_flight_hours, hours("900000000000000"));

        // Coming back down is still allowed.
        assert!(increment_pilot(storage.conn(), PilotKind::Student, "s1", &-delta).unwrap());
    }

    #[test]
    fn test_increment_aircraft_refuses_total_overflow() {
        let storage = Storage::open_in_memory().unwrap();
        insert_aircraft(
            storage.conn(),
            &NewAircraft {
                id: Some("a1".to_string()),
                tail_number: "N1".to_string(),
                opening: AircraftTotals {
                    engine_hours: hours("900000000000000"),
                    airframe_hours: hours("1"),
                },
                ..NewAircraft::default()
            },
        )
        .unwrap();

        let delta = HoursDelta {
            total_flight_hours: hours("1"),
            airframe_hours: hours("900000000000000"),
            ..HoursDelta::ZERO
        };
        assert!(increment_aircraft(storage.conn(), "a1", &delta).is_ok());
        let err = increment_aircraft(storage.conn(), "a1", &delta).unwrap_err();
        assert!(matches!(
            err,
            Error::HoursOutOfRange {
                field: "airframeHours",
                ..
            }
        ));
        assert_eq!(
            load_aircraft(storage.conn(), "a1").unwrap(),
            Some(AircraftTotals {
                engine_hours: hours("900000000000001"),
                airframe_hours: hours("900000000000001"),
            })
        );
    }

    #[test]
    fn test_duplicate_tail_number_rejected() {
        let storage = Storage::open_in_memory().unwrap();
        let aircraft = NewAircraft {
            tail_number: "G-ABCD".to_string(),
            ..NewAircraft::default()
        };
        insert_aircraft(storage.conn(), &aircraft).unwrap();
        assert!(insert_aircraft(storage.conn(), &aircraft).is_err());
    }

    #[test]
    fn test_list_pilots_filters_by_school() {
        let storage = Storage::open_in_memory().unwrap();
        for (id, school) in [("a", "north"), ("b", "south"), ("c", "north")] {
            insert_pilot(
                storage.conn(),
                PilotKind::Student,
                &NewPilot {
                    id: Some(id.to_string()),
                    name: id.to_uppercase(),
                    school_id: Some(school.to_string()),
                    ..NewPilot::default()
                },
            )
            .unwrap();
        }

        let north = list_pilots(storage.conn(), PilotKind::Student, Some("north")).unwrap();
        assert_eq!(north.len(), 2);
        let all = list_pilots(storage.conn(), PilotKind::Student, None).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].name, "A");
    }

    #[test]
    fn test_pilot_serializes_flat_totals() {
        let storage = Storage::open_in_memory().unwrap();
        let pilot = student(&storage, "s1");
        let json = serde_json::to_value(&pilot).unwrap();
        assert!(json.get("totalFlightHours").is_some());
        assert!(json.get("totals").is_none());
    }
}
