//! End-to-end ledger scenarios against a file-backed database.
//!
//! Covers the worked examples for students and aircraft, the batch and
//! verification flows, and concurrent writers on separate connections.

use std::thread;
use std::time::Duration;

use rust_decimal::Decimal;
use tempfile::TempDir;

use flightledger::storage::aggregates::{
    self, AircraftTotals, NewAircraft, NewPilot, PilotKind, PilotTotals,
};
use flightledger::{
    apply_delta, compute_delta, reverse_delta, BatchOutcome, BatchUpdateItem, Reconciler,
    SessionDraft, SessionPatch, SessionType, Storage, Targets, VerificationOutcome,
};

fn hours(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn open(dir: &TempDir) -> Storage {
    Storage::open(dir.path().join("ledger.db"), Duration::from_secs(30)).unwrap()
}

fn add_student(storage: &Storage, id: &str, flight: &str) {
    aggregates::insert_pilot(
        storage.conn(),
        PilotKind::Student,
        &NewPilot {
            id: Some(id.to_string()),
            name: format!("Student {id}"),
            school_id: None,
            opening: PilotTotals {
                total_flight_hours: hours(flight),
                ..PilotTotals::default()
            },
        },
    )
    .unwrap();
}

fn add_teacher(storage: &Storage, id: &str) {
    aggregates::insert_pilot(
        storage.conn(),
        PilotKind::Teacher,
        &NewPilot {
            id: Some(id.to_string()),
            name: format!("Instructor {id}"),
            ..NewPilot::default()
        },
    )
    .unwrap();
}

fn add_aircraft(storage: &Storage, id: &str, engine: &str, airframe: &str) {
    aggregates::insert_aircraft(
        storage.conn(),
        &NewAircraft {
            id: Some(id.to_string()),
            tail_number: format!("N{id}"),
            opening: AircraftTotals {
                engine_hours: hours(engine),
                airframe_hours: hours(airframe),
            },
            ..NewAircraft::default()
        },
    )
    .unwrap();
}

fn student_flight_hours(storage: &Storage, id: &str) -> Decimal {
    aggregates::load_pilot(storage.conn(), PilotKind::Student, id)
        .unwrap()
        .unwrap()
        .total_flight_hours
}

fn aircraft_totals(storage: &Storage, id: &str) -> AircraftTotals {
    aggregates::load_aircraft(storage.conn(), id)
        .unwrap()
        .unwrap()
}

#[test]
fn student_totals_follow_create_update_delete() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = open(&dir);
    add_student(&storage, "s1", "10");
    let reconciler = Reconciler::default();

    let session = reconciler
        .create_session(
            storage.conn_mut(),
            SessionDraft {
                duration_hours: Some(hours("2")),
                student_id: Some("s1".to_string()),
                ..SessionDraft::new(SessionType::Flight)
            },
        )
        .unwrap();
    assert_eq!(student_flight_hours(&storage, "s1"), hours("12"));

    reconciler
        .update_session(
            storage.conn_mut(),
            &session.id,
            &SessionPatch {
                duration_hours: Some(hours("3")),
                ..SessionPatch::default()
            },
        )
        .unwrap();
    assert_eq!(student_flight_hours(&storage, "s1"), hours("13"));

    reconciler
        .delete_session(storage.conn_mut(), &session.id)
        .unwrap();
    assert_eq!(student_flight_hours(&storage, "s1"), hours("10"));
}

#[test]
fn aircraft_counts_flight_but_not_simulator_time() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = open(&dir);
    add_aircraft(&storage, "a1", "100", "500");
    let reconciler = Reconciler::default();

    reconciler
        .create_session(
            storage.conn_mut(),
            SessionDraft {
                duration_hours: Some(hours("1.5")),
                aircraft_id: Some("a1".to_string()),
                ..SessionDraft::new(SessionType::Flight)
            },
        )
        .unwrap();
    assert_eq!(
        aircraft_totals(&storage, "a1"),
        AircraftTotals {
            engine_hours: hours("101.5"),
            airframe_hours: hours("501.5"),
        }
    );

    reconciler
        .create_session(
            storage.conn_mut(),
            SessionDraft {
                duration_hours: Some(hours("2")),
                aircraft_id: Some("a1".to_string()),
                ..SessionDraft::new(SessionType::Simulator)
            },
        )
        .unwrap();
    assert_eq!(aircraft_totals(&storage, "a1").engine_hours, hours("101.5"));
    assert_eq!(
        aircraft_totals(&storage, "a1").airframe_hours,
        hours("501.5")
    );
}

#[test]
fn many_fractional_cycles_do_not_drift() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = open(&dir);
    add_student(&storage, "s1", "10");
    add_aircraft(&storage, "a1", "100", "500");
    let reconciler = Reconciler::default();

    let session = reconciler
        .create_session(
            storage.conn_mut(),
            SessionDraft {
                duration_hours: Some(hours("0.1")),
                student_id: Some("s1".to_string()),
                aircraft_id: Some("a1".to_string()),
                ..SessionDraft::new(SessionType::Flight)
            },
        )
        .unwrap();

    for step in 1..=50 {
        let patch = SessionPatch {
            duration_hours: Some(Decimal::new(step, 1) / Decimal::from(3)),
            ..SessionPatch::default()
        };
        reconciler
            .update_session(storage.conn_mut(), &session.id, &patch)
            .unwrap();
    }
    reconciler
        .delete_session(storage.conn_mut(), &session.id)
        .unwrap();

    assert_eq!(student_flight_hours(&storage, "s1"), hours("10"));
    assert_eq!(
        aircraft_totals(&storage, "a1"),
        AircraftTotals {
            engine_hours: hours("100"),
            airframe_hours: hours("500"),
        }
    );
}

#[test]
fn direct_apply_and_reverse_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = open(&dir);
    add_student(&storage, "s1", "10");
    add_teacher(&storage, "t1");
    add_aircraft(&storage, "a1", "100", "500");

    let session = flightledger::Session::from_draft(
        SessionDraft {
            duration_hours: Some(hours("1.25")),
            night_hours: Some(hours("0.75")),
            ..SessionDraft::new(SessionType::Flight)
        },
        chrono::Utc::now(),
    );
    let delta = compute_delta(&session);
    let targets = Targets::new(Some("s1"), Some("t1"), Some("a1"));

    let applied = apply_delta(storage.conn_mut(), &delta, &targets).unwrap();
    assert!(applied.student && applied.teacher && applied.aircraft);
    assert_eq!(student_flight_hours(&storage, "s1"), hours("11.25"));

    reverse_delta(storage.conn_mut(), &delta, &targets).unwrap();
    assert_eq!(student_flight_hours(&storage, "s1"), hours("10"));
    assert_eq!(
        aircraft_totals(&storage, "a1").airframe_hours,
        hours("500")
    );
}

#[test]
fn batch_update_reports_missing_session_and_reconciles_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = open(&dir);
    add_student(&storage, "s1", "10");
    let reconciler = Reconciler::default();

    let mut ids = Vec::new();
    for _ in 0..2 {
        let session = reconciler
            .create_session(
                storage.conn_mut(),
                SessionDraft {
                    duration_hours: Some(hours("1")),
                    student_id: Some("s1".to_string()),
                    ..SessionDraft::new(SessionType::Flight)
                },
            )
            .unwrap();
        ids.push(session.id);
    }
    assert_eq!(student_flight_hours(&storage, "s1"), hours("12"));

    let body = format!(
        r#"[
            {{"id": "{}", "durationHours": "2.5"}},
            {{"id": "does-not-exist", "durationHours": 4}},
            {{"id": "{}", "durationHours": 1.5}}
        ]"#,
        ids[0], ids[1]
    );
    let items: Vec<BatchUpdateItem> = serde_json::from_str(&body).unwrap();
    let report = reconciler.batch_update(storage.conn_mut(), &items);

    assert_eq!(report.results[0].outcome, BatchOutcome::Updated);
    assert_eq!(report.results[1].outcome, BatchOutcome::NotFound);
    assert_eq!(report.results[1].id, "does-not-exist");
    assert_eq!(report.results[2].outcome, BatchOutcome::Updated);
    assert_eq!(student_flight_hours(&storage, "s1"), hours("14"));
}

#[test]
fn verification_accrues_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let mut storage = open(&dir);
    add_student(&storage, "s1", "0");
    add_teacher(&storage, "t1");
    add_aircraft(&storage, "a1", "100", "500");
    let reconciler = Reconciler::default();

    let session = reconciler
        .create_session(
            storage.conn_mut(),
            SessionDraft {
                actual_flight_hours: Some(hours("1.2")),
                instrument_hours: Some(hours("0.3")),
                student_id: Some("s1".to_string()),
                teacher_id: Some("t1".to_string()),
                aircraft_id: Some("a1".to_string()),
                ..SessionDraft::new(SessionType::Training)
            },
        )
        .unwrap();
    let aircraft_before = aircraft_totals(&storage, "a1");

    let first = reconciler
        .apply_verification(storage.conn_mut(), &session.id, true)
        .unwrap();
    let second = reconciler
        .apply_verification(storage.conn_mut(), &session.id, true)
        .unwrap();

    assert_eq!(first, VerificationOutcome::Applied);
    assert_eq!(second, VerificationOutcome::AlreadyVerified);
    assert_eq!(student_flight_hours(&storage, "s1"), hours("1.2"));
    let teacher = aggregates::load_pilot(storage.conn(), PilotKind::Teacher, "t1")
        .unwrap()
        .unwrap();
    assert_eq!(teacher.total_flight_hours, hours("1.2"));
    // Instrument time was booked once by create and once by verification.
    assert_eq!(teacher.instrument_hours, hours("0.6"));
    assert_eq!(aircraft_totals(&storage, "a1"), aircraft_before);
    assert_eq!(storage.stats().unwrap().verified_sessions, 1);
}

#[test]
fn concurrent_writers_do_not_lose_increments() {
    const WRITERS: usize = 4;
    const SESSIONS_PER_WRITER: usize = 25;

    let dir = tempfile::tempdir().unwrap();
    let setup = open(&dir);
    add_student(&setup, "s1", "10");
    add_aircraft(&setup, "a1", "100", "500");

    // Open every connection up front; each thread owns one.
    let connections: Vec<Storage> = (0..WRITERS).map(|_| open(&dir)).collect();

    let handles: Vec<_> = connections
        .into_iter()
        .map(|mut storage| {
            thread::spawn(move || {
                let reconciler = Reconciler::default();
                for _ in 0..SESSIONS_PER_WRITER {
                    reconciler
                        .create_session(
                            storage.conn_mut(),
                            SessionDraft {
                                duration_hours: Some(hours("0.1")),
                                student_id: Some("s1".to_string()),
                                aircraft_id: Some("a1".to_string()),
                                ..SessionDraft::new(SessionType::Flight)
                            },
                        )
                        .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // 4 writers x 25 sessions x 0.1 hours
    assert_eq!(student_flight_hours(&setup, "s1"), hours("20"));
    assert_eq!(aircraft_totals(&setup, "a1").engine_hours, hours("110"));
    assert_eq!(setup.stats().unwrap().sessions, 100);
}
