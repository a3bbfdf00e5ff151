//! Ledger applier and reverser.
//!
//! Adds a [`HoursDelta`] to the student, teacher and aircraft a session
//! references. Every call runs in one `IMMEDIATE` transaction: `SQLite`
//! takes the write lock before the first read, so concurrent reconciliations
//! against the same aggregate serialize instead of losing increments.
//! Reversal is application of the negated vector.

use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::hours::HoursDelta;
use crate::storage::aggregates::{self, PilotKind};

/// The aggregates a delta is booked against. Empty ids count as absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Targets<'a> {
    /// Student to credit.
    pub student_id: Option<&'a str>,
    /// Instructor to credit.
    pub teacher_id: Option<&'a str>,
    /// Aircraft to credit.
    pub aircraft_id: Option<&'a str>,
}

impl<'a> Targets<'a> {
    /// Build targets, dropping empty ids.
    #[must_use]
    pub fn new(
        student_id: Option<&'a str>,
        teacher_id: Option<&'a str>,
        aircraft_id: Option<&'a str>,
    ) -> Self {
        let present = |id: Option<&'a str>| id.filter(|id| !id.is_empty());
        Self {
            student_id: present(student_id),
            teacher_id: present(teacher_id),
            aircraft_id: present(aircraft_id),
        }
    }

    /// The same targets without the aircraft.
    #[must_use]
    pub fn without_aircraft(self) -> Self {
        Self {
            aircraft_id: None,
            ..self
        }
    }
}

/// Which targets resolved to an existing aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AppliedTargets {
    /// The student row was updated.
    pub student: bool,
    /// The teacher row was updated.
    pub teacher: bool,
    /// The aircraft row was updated.
    pub aircraft: bool,
}

/// Add `delta` to every target in its own transaction.
///
/// Targets that do not resolve are skipped. Either every resolved aggregate
/// is updated or none is.
///
/// # Errors
///
/// Returns [`Error::LedgerWrite`] if the transaction fails, or
/// [`Error::HoursOutOfRange`] if a component cannot be stored. No counter
/// changes in either case.
pub fn apply_delta(
    conn: &mut Connection,
    delta: &HoursDelta,
    targets: &Targets<'_>,
) -> Result<AppliedTargets> {
    let tx = begin(conn, "apply")?;
    let applied = apply_in(&tx, delta, targets).map_err(|e| e.into_ledger_write("apply"))?;
    commit(tx, "apply")?;
    Ok(applied)
}

/// Subtract `delta` from every target in its own transaction.
///
/// Exactly undoes a previous [`apply_delta`] of the same vector.
///
/// # Errors
///
/// Same as [`apply_delta`].
pub fn reverse_delta(
    conn: &mut Connection,
    delta: &HoursDelta,
    targets: &Targets<'_>,
) -> Result<AppliedTargets> {
    let tx = begin(conn, "reverse")?;
    let applied = reverse_in(&tx, delta, targets).map_err(|e| e.into_ledger_write("reverse"))?;
    commit(tx, "reverse")?;
    Ok(applied)
}

/// Add `delta` to every target inside the caller's transaction.
///
/// # Errors
///
/// Returns an error if a component cannot be stored or an update fails; the
/// caller must then drop its transaction.
pub fn apply_in(
    conn: &Connection,
    delta: &HoursDelta,
    targets: &Targets<'_>,
) -> Result<AppliedTargets> {
    let mut applied = AppliedTargets::default();

    if let Some(id) = targets.student_id {
        applied.student = aggregates::increment_pilot(conn, PilotKind::Student, id, delta)?;
        log_skip(applied.student, "student", id);
    }
    if let Some(id) = targets.teacher_id {
        applied.teacher = aggregates::increment_pilot(conn, PilotKind::Teacher, id, delta)?;
        log_skip(applied.teacher, "teacher", id);
    }
    if let Some(id) = targets.aircraft_id {
        applied.aircraft = aggregates::increment_aircraft(conn, id, delta)?;
        log_skip(applied.aircraft, "aircraft", id);
    }

    debug!(
        "Applied flight={} sim={} airframe={} to {:?}",
        delta.total_flight_hours, delta.total_simulator_hours, delta.airframe_hours, applied
    );
    Ok(applied)
}

/// Subtract `delta` from every target inside the caller's transaction.
///
/// # Errors
///
/// Same as [`apply_in`].
pub fn reverse_in(
    conn: &Connection,
    delta: &HoursDelta,
    targets: &Targets<'_>,
) -> Result<AppliedTargets> {
    apply_in(conn, &-*delta, targets)
}

/// Start an `IMMEDIATE` transaction for a ledger operation.
pub(crate) fn begin<'c>(
    conn: &'c mut Connection,
    operation: &'static str,
) -> Result<Transaction<'c>> {
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|source| Error::LedgerWrite { operation, source })
}

pub(crate) fn commit(tx: Transaction<'_>, operation: &'static str) -> Result<()> {
    tx.commit()
        .map_err(|source| Error::LedgerWrite { operation, source })
}

fn log_skip(resolved: bool, kind: &str, id: &str) {
    if !resolved {
        debug!("Skipping unresolved {} {}", kind, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::aggregates::{
        insert_aircraft, insert_pilot, load_aircraft, load_pilot, AircraftTotals, NewAircraft,
        NewPilot, PilotTotals,
    };
    use crate::storage::Storage;
    use rust_decimal::Decimal;

    fn hours(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn seeded() -> Storage {
        let storage = Storage::open_in_memory().unwrap();
        for (kind, id) in [(PilotKind::Student, "s1"), (PilotKind::Teacher, "t1")] {
            insert_pilot(
                storage.conn(),
                kind,
                &NewPilot {
                    id: Some(id.to_string()),
                    name: id.to_string(),
                    school_id: None,
                    opening: PilotTotals {
                        total_flight_hours: hours("10"),
                        ..PilotTotals::default()
                    },
                },
            )
            .unwrap();
        }
        insert_aircraft(
            storage.conn(),
            &NewAircraft {
                id: Some("a1".to_string()),
                tail_number: "N1".to_string(),
                opening: AircraftTotals {
                    engine_hours: hours("100"),
                    airframe_hours: hours("500"),
                },
                ..NewAircraft::default()
            },
        )
        .unwrap();
        storage
    }

    fn all() -> Targets<'static> {
        Targets::new(Some("s1"), Some("t1"), Some("a1"))
    }

    fn snapshot(storage: &Storage) -> (PilotTotals, PilotTotals, AircraftTotals) {
        let conn = storage.conn();
        (
            load_pilot(conn, PilotKind::Student, "s1").unwrap().unwrap(),
            load_pilot(conn, PilotKind::Teacher, "t1").unwrap().unwrap(),
            load_aircraft(conn, "a1").unwrap().unwrap(),
        )
    }

    fn sample_delta() -> HoursDelta {
        HoursDelta {
            total_flight_hours: hours("1.3333"),
            total_simulator_hours: hours("0.1"),
            day_hours: hours("0.7"),
            night_hours: hours("0.6333"),
            instrument_hours: hours("0.2"),
            single_engine_time: hours("1.3333"),
            multi_engine_time: Decimal::ZERO,
            airframe_hours: hours("1.3333"),
        }
    }

    #[test]
    fn test_targets_drop_empty_ids() {
        let targets = Targets::new(Some(""), Some("t1"), None);
        assert_eq!(targets.student_id, None);
        assert_eq!(targets.teacher_id, Some("t1"));
        assert_eq!(targets.without_aircraft().aircraft_id, None);
    }

    #[test]
    fn test_apply_updates_all_targets() {
        let mut storage = seeded();
        let applied = apply_delta(storage.conn_mut(), &sample_delta(), &all()).unwrap();
        assert_eq!(
            applied,
            AppliedTargets {
                student: true,
                teacher: true,
                aircraft: true
            }
        );

        let (student, teacher, aircraft) = snapshot(&storage);
        assert_eq!(student.total_flight_hours, hours("11.3333"));
        assert_eq!(teacher.night_hours, hours("0.6333"));
        assert_eq!(aircraft.engine_hours, hours("101.3333"));
        assert_eq!(aircraft.airframe_hours, hours("501.3333"));
    }

    #[test]
    fn test_apply_then_reverse_restores_exactly() {
        let mut storage = seeded();
        let before = snapshot(&storage);

        let delta = sample_delta();
        apply_delta(storage.conn_mut(), &delta, &all()).unwrap();
        reverse_delta(storage.conn_mut(), &delta, &all()).unwrap();

        assert_eq!(snapshot(&storage), before);
    }

    #[test]
    fn test_round_trip_with_unrepresentable_fraction() {
        let mut storage = seeded();
        let before = snapshot(&storage);

        let delta = HoursDelta {
            total_flight_hours: Decimal::ONE / Decimal::from(3),
            airframe_hours: hours("0.00005"),
            ..HoursDelta::ZERO
        };
        apply_delta(storage.conn_mut(), &delta, &all()).unwrap();
        reverse_delta(storage.conn_mut(), &delta, &all()).unwrap();

        assert_eq!(snapshot(&storage), before);
    }

    #[test]
    fn test_zero_delta_round_trip() {
        let mut storage = seeded();
        let before = snapshot(&storage);

        apply_delta(storage.conn_mut(), &HoursDelta::ZERO, &all()).unwrap();
        assert_eq!(snapshot(&storage), before);
        reverse_delta(storage.conn_mut(), &HoursDelta::ZERO, &all()).unwrap();
        assert_eq!(snapshot(&storage), before);
    }

    #[test]
    fn test_linearity() {
        let mut storage = seeded();
        let before = snapshot(&storage);
        let delta = sample_delta();

        apply_delta(storage.conn_mut(), &delta, &all()).unwrap();
        apply_delta(storage.conn_mut(), &delta, &all()).unwrap();
        let (student, _, _) = snapshot(&storage);
        assert_eq!(student.total_flight_hours, hours("12.6666"));

        reverse_delta(storage.conn_mut(), &delta, &all()).unwrap();
        reverse_delta(storage.conn_mut(), &delta, &all()).unwrap();
        assert_eq!(snapshot(&storage), before);
    }

    #[test]
    fn test_missing_targets_are_skipped() {
        let mut storage = seeded();
        let targets = Targets::new(Some("s1"), Some("ghost"), Some("nope"));

        let applied = apply_delta(storage.conn_mut(), &sample_delta(), &targets).unwrap();
        assert!(applied.student);
        assert!(!applied.teacher);
        assert!(!applied.aircraft);

        let (student, teacher, aircraft) = snapshot(&storage);
        assert_eq!(student.total_flight_hours, hours("11.3333"));
        assert_eq!(teacher.total_flight_hours, hours("10"));
        assert_eq!(aircraft.engine_hours, hours("100"));
    }

    #[test]
    fn test_no_targets_is_a_no_op() {
        let mut storage = seeded();
        let before = snapshot(&storage);
        let applied =
            apply_delta(storage.conn_mut(), &sample_delta(), &Targets::default()).unwrap();
        assert_eq!(applied, AppliedTargets::default());
        assert_eq!(snapshot(&storage), before);
    }

    #[test]
    fn test_failure_rolls_back_every_target() {
        let mut storage = seeded();
        let before = snapshot(&storage);

        // The aircraft update fails after the pilots were already incremented.
        let delta = HoursDelta {
            total_flight_hours: hours("1"),
            airframe_hours: Decimal::MAX,
            ..HoursDelta::ZERO
        };
        let err = apply_delta(storage.conn_mut(), &delta, &all()).unwrap_err();
        assert!(matches!(err, Error::HoursOutOfRange { .. }));
        assert_eq!(snapshot(&storage), before);
    }

    #[test]
    fn test_overflowing_total_rolls_back_every_target() {
        crate::logging::init_test_logging();
        let mut storage = seeded();

        // Pilots take the small flight component; only the airframe overflows.
        let delta = HoursDelta {
            total_flight_hours: hours("1"),
            airframe_hours: hours("920000000000000"),
            ..HoursDelta::ZERO
        };
        apply_delta(storage.conn_mut(), &delta, &all()).unwrap();
        let before = snapshot(&storage);

        let err = apply_delta(storage.conn_mut(), &delta, &all()).unwrap_err();
        assert!(matches!(
            err,
            Error::HoursOutOfRange {
                field: "airframeHours",
                ..
            }
        ));
        assert_eq!(snapshot(&storage), before);
    }

    #[test]
    fn test_storage_failure_is_a_ledger_write_error() {
        crate::logging::init_test_logging();
        let mut storage = seeded();
        storage
            .conn()
            .execute_batch("ALTER TABLE teachers RENAME TO teachers_old")
            .unwrap();

        let err = apply_delta(storage.conn_mut(), &sample_delta(), &all()).unwrap_err();
        assert!(err.is_ledger_write(), "{err}");

        let student = load_pilot(storage.conn(), PilotKind::Student, "s1")
            .unwrap()
            .unwrap();
        assert_eq!(student.total_flight_hours, hours("10"));
    }
}
