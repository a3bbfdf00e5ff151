//! `SQLite` schema definitions for flightledger.
//!
//! Hour columns are `INTEGER` fixed-point counts of ten-thousandths of an
//! hour (see [`super::HOURS_SCALE`]).

/// SQL statement to create the students table.
pub const CREATE_STUDENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS students (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    school_id TEXT,
    total_flight_hours INTEGER NOT NULL DEFAULT 0,
    total_simulator_hours INTEGER NOT NULL DEFAULT 0,
    day_hours INTEGER NOT NULL DEFAULT 0,
    night_hours INTEGER NOT NULL DEFAULT 0,
    instrument_hours INTEGER NOT NULL DEFAULT 0,
    single_engine_time INTEGER NOT NULL DEFAULT 0,
    multi_engine_time INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create the teachers table. Same counters as students.
pub const CREATE_TEACHERS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS teachers (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    school_id TEXT,
    total_flight_hours INTEGER NOT NULL DEFAULT 0,
    total_simulator_hours INTEGER NOT NULL DEFAULT 0,
    day_hours INTEGER NOT NULL DEFAULT 0,
    night_hours INTEGER NOT NULL DEFAULT 0,
    instrument_hours INTEGER NOT NULL DEFAULT 0,
    single_engine_time INTEGER NOT NULL DEFAULT 0,
    multi_engine_time INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create the aircraft table.
pub const CREATE_AIRCRAFT_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS aircraft (
    id TEXT PRIMARY KEY,
    tail_number TEXT NOT NULL UNIQUE,
    make TEXT,
    model TEXT,
    school_id TEXT,
    engine_hours INTEGER NOT NULL DEFAULT 0,
    airframe_hours INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create the flight sessions table.
///
/// References to students, teachers and aircraft are deliberately not
/// foreign keys.
pub const CREATE_SESSIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS flight_sessions (
    id TEXT PRIMARY KEY,
    session_type TEXT NOT NULL,
    status TEXT NOT NULL,
    start_time TEXT,
    end_time TEXT,
    duration_hours INTEGER,
    actual_flight_hours INTEGER,
    actual_simulator_hours INTEGER,
    day_hours INTEGER,
    night_hours INTEGER,
    instrument_hours INTEGER,
    single_engine_time INTEGER,
    multi_engine_time INTEGER,
    student_id TEXT,
    teacher_id TEXT,
    aircraft_id TEXT,
    simulator_id TEXT,
    school_id TEXT,
    departure_airport TEXT,
    arrival_airport TEXT,
    verified_by_instructor INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// Base schema (version 1), in creation order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_STUDENTS_TABLE,
    CREATE_TEACHERS_TABLE,
    CREATE_AIRCRAFT_TABLE,
    CREATE_SESSIONS_TABLE,
    CREATE_METADATA_TABLE,
];

/// Session lookup indexes (version 2).
pub const SESSION_INDEX_STATEMENTS: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_sessions_student ON flight_sessions(student_id)",
    "CREATE INDEX IF NOT EXISTS idx_sessions_teacher ON flight_sessions(teacher_id)",
    "CREATE INDEX IF NOT EXISTS idx_sessions_aircraft ON flight_sessions(aircraft_id)",
    "CREATE INDEX IF NOT EXISTS idx_sessions_start ON flight_sessions(start_time DESC)",
];

/// Abort any update that leaves a student counter non-integer (version 3).
///
/// `SQLite` turns an overflowing integer sum into a REAL instead of failing.
pub const GUARD_STUDENT_COUNTERS: &str = r"
CREATE TRIGGER IF NOT EXISTS students_counters_integer
AFTER UPDATE ON students
WHEN typeof(NEW.total_flight_hours) <> 'integer'
  OR typeof(NEW.total_simulator_hours) <> 'integer'
  OR typeof(NEW.day_hours) <> 'integer'
  OR typeof(NEW.night_hours) <> 'integer'
  OR typeof(NEW.instrument_hours) <> 'integer'
  OR typeof(NEW.single_engine_time) <> 'integer'
  OR typeof(NEW.multi_engine_time) <> 'integer'
BEGIN
    SELECT RAISE(ABORT, 'student hour counter out of range');
END
";

/// Same guard for teachers (version 3).
pub const GUARD_TEACHER_COUNTERS: &str = r"
CREATE TRIGGER IF NOT EXISTS teachers_counters_integer
AFTER UPDATE ON teachers
WHEN typeof(NEW.total_flight_hours) <> 'integer'
  OR typeof(NEW.total_simulator_hours) <> 'integer'
  OR typeof(NEW.day_hours) <> 'integer'
  OR typeof(NEW.night_hours) <> 'integer'
  OR typeof(NEW.instrument_hours) <> 'integer'
  OR typeof(NEW.single_engine_time) <> 'integer'
  OR typeof(NEW.multi_engine_time) <> 'integer'
BEGIN
    SELECT RAISE(ABORT, 'teacher hour counter out of range');
END
";

/// Same guard for aircraft (version 3).
pub const GUARD_AIRCRAFT_COUNTERS: &str = r"
CREATE TRIGGER IF NOT EXISTS aircraft_counters_integer
AFTER UPDATE ON aircraft
WHEN typeof(NEW.engine_hours) <> 'integer'
  OR typeof(NEW.airframe_hours) <> 'integer'
BEGIN
    SELECT RAISE(ABORT, 'aircraft hour counter out of range');
END
";

/// Counter guards (version 3).
pub const COUNTER_GUARD_STATEMENTS: &[&str] = &[
    GUARD_STUDENT_COUNTERS,
    GUARD_TEACHER_COUNTERS,
    GUARD_AIRCRAFT_COUNTERS,
];
