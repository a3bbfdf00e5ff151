//! Flight session records.
//!
//! A session is one logged training event: a flight, a simulator period, or
//! another training category. The ledger only reads sessions; their hour
//! fields drive the aggregate counters.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::ledger::Targets;

/// The category of a training session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionType {
    /// Time in an aircraft.
    Flight,
    /// Time in a flight simulator.
    Simulator,
    /// Ground or classroom training.
    Training,
    /// A check ride with an examiner.
    Checkride,
    /// Solo flight.
    Solo,
    /// Cross-country flight.
    CrossCountry,
}

impl SessionType {
    /// All session types, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Flight,
        Self::Simulator,
        Self::Training,
        Self::Checkride,
        Self::Solo,
        Self::CrossCountry,
    ];

    /// The stored and wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flight => "FLIGHT",
            Self::Simulator => "SIMULATOR",
            Self::Training => "TRAINING",
            Self::Checkride => "CHECKRIDE",
            Self::Solo => "SOLO",
            Self::CrossCountry => "CROSS_COUNTRY",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for SessionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidSessionType(s.to_string()))
    }
}

/// Scheduling status of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Booked but not flown.
    #[default]
    Scheduled,
    /// Flown.
    Completed,
    /// Called off.
    Canceled,
    /// Moved to another slot.
    Rescheduled,
    /// The student did not turn up.
    NoShow,
    /// Awaiting instructor review.
    PendingReview,
}

impl SessionStatus {
    /// All statuses, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Scheduled,
        Self::Completed,
        Self::Canceled,
        Self::Rescheduled,
        Self::NoShow,
        Self::PendingReview,
    ];

    /// The stored and wire representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::Completed => "COMPLETED",
            Self::Canceled => "CANCELED",
            Self::Rescheduled => "RESCHEDULED",
            Self::NoShow => "NO_SHOW",
            Self::PendingReview => "PENDING_REVIEW",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidSessionStatus(s.to_string()))
    }
}

/// A persisted flight session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Unique identifier.
    pub id: String,
    /// Session category.
    pub session_type: SessionType,
    /// Scheduling status.
    pub status: SessionStatus,
    /// Block-off time.
    pub start_time: Option<DateTime<Utc>>,
    /// Block-on time.
    pub end_time: Option<DateTime<Utc>>,
    /// Logged duration in hours.
    pub duration_hours: Option<Decimal>,
    /// Flight hours confirmed by the instructor.
    pub actual_flight_hours: Option<Decimal>,
    /// Simulator hours confirmed by the instructor.
    pub actual_simulator_hours: Option<Decimal>,
    /// Daytime hours.
    pub day_hours: Option<Decimal>,
    /// Night hours.
    pub night_hours: Option<Decimal>,
    /// Instrument hours.
    pub instrument_hours: Option<Decimal>,
    /// Single-engine time.
    pub single_engine_time: Option<Decimal>,
    /// Multi-engine time.
    pub multi_engine_time: Option<Decimal>,
    /// Student on board, if any.
    pub student_id: Option<String>,
    /// Instructor, if any.
    pub teacher_id: Option<String>,
    /// Aircraft flown, if any.
    pub aircraft_id: Option<String>,
    /// Simulator used, if any.
    pub simulator_id: Option<String>,
    /// Owning school.
    pub school_id: Option<String>,
    /// ICAO code of the departure airport.
    pub departure_airport: Option<String>,
    /// ICAO code of the arrival airport.
    pub arrival_airport: Option<String>,
    /// Whether an instructor has signed the session off.
    pub verified_by_instructor: bool,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last written.
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Build a new session from a draft, assigning an id if the draft has none.
    #[must_use]
    pub fn from_draft(draft: SessionDraft, now: DateTime<Utc>) -> Self {
        let id = draft
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Self {
            id,
            session_type: draft.session_type,
            status: draft.status.unwrap_or_default(),
            start_time: draft.start_time,
            end_time: draft.end_time,
            duration_hours: draft.duration_hours,
            actual_flight_hours: draft.actual_flight_hours,
            actual_simulator_hours: draft.actual_simulator_hours,
            day_hours: draft.day_hours,
            night_hours: draft.night_hours,
            instrument_hours: draft.instrument_hours,
            single_engine_time: draft.single_engine_time,
            multi_engine_time: draft.multi_engine_time,
            student_id: draft.student_id,
            teacher_id: draft.teacher_id,
            aircraft_id: draft.aircraft_id,
            simulator_id: draft.simulator_id,
            school_id: draft.school_id,
            departure_airport: draft.departure_airport,
            arrival_airport: draft.arrival_airport,
            verified_by_instructor: draft.verified_by_instructor,
            created_at: now,
            updated_at: now,
        }
    }

    /// Return the post-update snapshot after applying `patch`.
    ///
    /// Fields absent from the patch keep their current value.
    #[must_use]
    pub fn patched(&self, patch: &SessionPatch, now: DateTime<Utc>) -> Self {
        Self {
            id: self.id.clone(),
            session_type: patch.session_type.unwrap_or(self.session_type),
            status: patch.status.unwrap_or(self.status),
            start_time: patch.start_time.or(self.start_time),
            end_time: patch.end_time.or(self.end_time),
            duration_hours: patch.duration_hours.or(self.duration_hours),
            actual_flight_hours: patch.actual_flight_hours.or(self.actual_flight_hours),
            actual_simulator_hours: patch.actual_simulator_hours.or(self.actual_simulator_hours),
            day_hours: patch.day_hours.or(self.day_hours),
            night_hours: patch.night_hours.or(self.night_hours),
            instrument_hours: patch.instrument_hours.or(self.instrument_hours),
            single_engine_time: patch.single_engine_time.or(self.single_engine_time),
            multi_engine_time: patch.multi_engine_time.or(self.multi_engine_time),
            student_id: keep_or(&patch.student_id, &self.student_id),
            teacher_id: keep_or(&patch.teacher_id, &self.teacher_id),
            aircraft_id: keep_or(&patch.aircraft_id, &self.aircraft_id),
            simulator_id: keep_or(&patch.simulator_id, &self.simulator_id),
            school_id: keep_or(&patch.school_id, &self.school_id),
            departure_airport: keep_or(&patch.departure_airport, &self.departure_airport),
            arrival_airport: keep_or(&patch.arrival_airport, &self.arrival_airport),
            verified_by_instructor: self.verified_by_instructor,
            created_at: self.created_at,
            updated_at: now,
        }
    }

    /// The aggregates this session's hours are booked against.
    #[must_use]
    pub fn targets(&self) -> Targets<'_> {
        Targets::new(
            self.student_id.as_deref(),
            self.teacher_id.as_deref(),
            self.aircraft_id.as_deref(),
        )
    }
}

fn keep_or(new: &Option<String>, old: &Option<String>) -> Option<String> {
    new.clone().or_else(|| old.clone())
}

/// Input for creating a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct SessionDraft {
    /// Caller-chosen id; generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    pub session_type: SessionType,
    #[serde(default)]
    pub status: Option<SessionStatus>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_hours: Option<Decimal>,
    #[serde(default)]
    pub actual_flight_hours: Option<Decimal>,
    #[serde(default)]
    pub actual_simulator_hours: Option<Decimal>,
    #[serde(default)]
    pub day_hours: Option<Decimal>,
    #[serde(default)]
    pub night_hours: Option<Decimal>,
    #[serde(default)]
    pub instrument_hours: Option<Decimal>,
    #[serde(default)]
    pub single_engine_time: Option<Decimal>,
    #[serde(default)]
    pub multi_engine_time: Option<Decimal>,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub teacher_id: Option<String>,
    #[serde(default)]
    pub aircraft_id: Option<String>,
    #[serde(default)]
    pub simulator_id: Option<String>,
    #[serde(default)]
    pub school_id: Option<String>,
    #[serde(default)]
    pub departure_airport: Option<String>,
    #[serde(default)]
    pub arrival_airport: Option<String>,
    /// Stored as given; creating a verified session does not accrue
    /// verification hours.
    #[serde(default)]
    pub verified_by_instructor: bool,
}

impl SessionDraft {
    /// A draft with only the session type set.
    #[must_use]
    pub fn new(session_type: SessionType) -> Self {
        Self {
            id: None,
            session_type,
            status: None,
            start_time: None,
            end_time: None,
            duration_hours: None,
            actual_flight_hours: None,
            actual_simulator_hours: None,
            day_hours: None,
            night_hours: None,
            instrument_hours: None,
            single_engine_time: None,
            multi_engine_time: None,
            student_id: None,
            teacher_id: None,
            aircraft_id: None,
            simulator_id: None,
            school_id: None,
            departure_airport: None,
            arrival_airport: None,
            verified_by_instructor: false,
        }
    }
}

/// A partial update. Absent fields are left unchanged.
///
/// The verification flag is deliberately missing: it only moves through
/// [`crate::Reconciler::apply_verification`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct SessionPatch {
    pub session_type: Option<SessionType>,
    pub status: Option<SessionStatus>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_hours: Option<Decimal>,
    pub actual_flight_hours: Option<Decimal>,
    pub actual_simulator_hours: Option<Decimal>,
    pub day_hours: Option<Decimal>,
    pub night_hours: Option<Decimal>,
    pub instrument_hours: Option<Decimal>,
    pub single_engine_time: Option<Decimal>,
    pub multi_engine_time: Option<Decimal>,
    pub student_id: Option<String>,
    pub teacher_id: Option<String>,
    pub aircraft_id: Option<String>,
    pub simulator_id: Option<String>,
    pub school_id: Option<String>,
    pub departure_airport: Option<String>,
    pub arrival_airport: Option<String>,
}

/// Filter for listing sessions. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFilter {
    /// Only sessions for this student.
    pub student_id: Option<String>,
    /// Only sessions for this instructor.
    pub teacher_id: Option<String>,
    /// Only sessions in this aircraft.
    pub aircraft_id: Option<String>,
    /// Only sessions for this school.
    pub school_id: Option<String>,
    /// Maximum number of rows; 0 means unlimited.
    pub limit: usize,
}
