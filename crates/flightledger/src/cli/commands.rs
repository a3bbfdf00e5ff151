//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand, ValueEnum};
use rust_decimal::Decimal;

use crate::session::{SessionDraft, SessionPatch, SessionStatus, SessionType};
use crate::storage::aggregates::{AircraftTotals, PilotTotals};

/// Student and instructor commands.
#[derive(Debug, Subcommand)]
pub enum PilotCommand {
    /// Register a new person
    Add {
        /// Display name
        name: String,

        /// Identifier to use instead of a generated one
        #[arg(long)]
        id: Option<String>,

        /// Owning school
        #[arg(long)]
        school: Option<String>,

        /// Hours logged before joining the ledger
        #[command(flatten)]
        opening: TotalsArgs,
    },

    /// Show one person and their totals
    Show {
        /// Identifier
        id: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List people
    List {
        /// Only this school
        #[arg(long)]
        school: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

/// Opening hour totals for a student or instructor.
#[derive(Debug, Clone, Args)]
pub struct TotalsArgs {
    /// Flight hours
    #[arg(long, default_value = "0")]
    pub flight: Decimal,

    /// Simulator hours
    #[arg(long, default_value = "0")]
    pub simulator: Decimal,

    /// Daytime hours
    #[arg(long, default_value = "0")]
    pub day: Decimal,

    /// Night hours
    #[arg(long, default_value = "0")]
    pub night: Decimal,

    /// Instrument hours
    #[arg(long, default_value = "0")]
    pub instrument: Decimal,

    /// Single-engine time
    #[arg(long, default_value = "0")]
    pub single_engine: Decimal,

    /// Multi-engine time
    #[arg(long, default_value = "0")]
    pub multi_engine: Decimal,
}

impl From<TotalsArgs> for PilotTotals {
    fn from(args: TotalsArgs) -> Self {
        Self {
            total_flight_hours: args.flight,
            total_simulator_hours: args.simulator,
            day_hours: args.day,
            night_hours: args.night,
            instrument_hours: args.instrument,
            single_engine_time: args.single_engine,
            multi_engine_time: args.multi_engine,
        }
    }
}

/// Aircraft commands.
#[derive(Debug, Subcommand)]
pub enum AircraftCommand {
    /// Register an aircraft
    Add {
        /// Registration mark, e.g. N172SP
        tail_number: String,

        /// Identifier to use instead of a generated one
        #[arg(long)]
        id: Option<String>,

        /// Manufacturer
        #[arg(long)]
        make: Option<String>,

        /// Model designation
        #[arg(long)]
        model: Option<String>,

        /// Owning school
        #[arg(long)]
        school: Option<String>,

        /// Engine hours already on the aircraft
        #[arg(long, default_value = "0")]
        engine_hours: Decimal,

        /// Airframe hours already on the aircraft
        #[arg(long, default_value = "0")]
        airframe_hours: Decimal,
    },

    /// Show one aircraft and its totals
    Show {
        /// Identifier
        id: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

impl AircraftCommand {
    /// Opening totals of an `add` command.
    #[must_use]
    pub fn opening(&self) -> Option<AircraftTotals> {
        match self {
            Self::Add {
                engine_hours,
                airframe_hours,
                ..
            } => Some(AircraftTotals {
                engine_hours: *engine_hours,
                airframe_hours: *airframe_hours,
            }),
            Self::Show { .. } => None,
        }
    }
}

/// Session commands.
#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    /// Record a session and book its hours
    Create {
        /// Session category
        #[arg(long = "type", value_enum)]
        session_type: SessionTypeArg,

        /// Identifier to use instead of a generated one
        #[arg(long)]
        id: Option<String>,

        /// Session fields
        #[command(flatten)]
        fields: SessionArgs,
    },

    /// Show one session
    Show {
        /// Session identifier
        id: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List sessions, newest first
    List {
        /// Only this student
        #[arg(long)]
        student: Option<String>,

        /// Only this instructor
        #[arg(long)]
        teacher: Option<String>,

        /// Only this aircraft
        #[arg(long)]
        aircraft: Option<String>,

        /// Only this school
        #[arg(long)]
        school: Option<String>,

        /// Maximum number of results (0 for all)
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Change a session and re-book its hours
    Update {
        /// Session identifier
        id: String,

        /// New session category
        #[arg(long = "type", value_enum)]
        session_type: Option<SessionTypeArg>,

        /// Fields to change
        #[command(flatten)]
        fields: SessionArgs,
    },

    /// Delete a session and take its hours back out
    Delete {
        /// Session identifier
        id: String,
    },

    /// Apply a JSON array of `{"id": ..., <fields>}` updates
    BatchUpdate {
        /// Path to the JSON file
        file: PathBuf,
    },

    /// Record an instructor sign-off
    Verify {
        /// Session identifier
        id: String,

        /// Ask to withdraw the sign-off (always refused)
        #[arg(long)]
        revoke: bool,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

/// Session fields shared by `create` and `update`.
#[derive(Debug, Clone, Default, Args)]
pub struct SessionArgs {
    /// Scheduling status
    #[arg(long, value_enum)]
    pub status: Option<SessionStatusArg>,

    /// Start time (RFC 3339)
    #[arg(long)]
    pub start: Option<DateTime<Utc>>,

    /// End time (RFC 3339)
    #[arg(long)]
    pub end: Option<DateTime<Utc>>,

    /// Logged duration in hours
    #[arg(long)]
    pub duration: Option<Decimal>,

    /// Flight hours confirmed by the instructor
    #[arg(long)]
    pub actual_flight: Option<Decimal>,

    /// Simulator hours confirmed by the instructor
    #[arg(long)]
    pub actual_simulator: Option<Decimal>,

    /// Daytime hours
    #[arg(long)]
    pub day: Option<Decimal>,

    /// Night hours
    #[arg(long)]
    pub night: Option<Decimal>,

    /// Instrument hours
    #[arg(long)]
    pub instrument: Option<Decimal>,

    /// Single-engine time
    #[arg(long)]
    pub single_engine: Option<Decimal>,

    /// Multi-engine time
    #[arg(long)]
    pub multi_engine: Option<Decimal>,

    /// Student identifier
    #[arg(long)]
    pub student: Option<String>,

    /// Instructor identifier
    #[arg(long)]
    pub teacher: Option<String>,

    /// Aircraft identifier
    #[arg(long)]
    pub aircraft: Option<String>,

    /// Simulator identifier
    #[arg(long)]
    pub simulator: Option<String>,

    /// Owning school
    #[arg(long)]
    pub school: Option<String>,

    /// Departure airport
    #[arg(long)]
    pub from: Option<String>,

    /// Arrival airport
    #[arg(long)]
    pub to: Option<String>,
}

impl SessionArgs {
    /// Build a creation draft.
    #[must_use]
    pub fn into_draft(self, session_type: SessionType, id: Option<String>) -> SessionDraft {
        SessionDraft {
            id,
            status: self.status.map(Into::into),
            start_time: self.start,
            end_time: self.end,
            duration_hours: self.duration,
            actual_flight_hours: self.actual_flight,
            actual_simulator_hours: self.actual_simulator,
            day_hours: self.day,
            night_hours: self.night,
            instrument_hours: self.instrument,
            single_engine_time: self.single_engine,
            multi_engine_time: self.multi_engine,
            student_id: self.student,
            teacher_id: self.teacher,
            aircraft_id: self.aircraft,
            simulator_id: self.simulator,
            school_id: self.school,
            departure_airport: self.from,
            arrival_airport: self.to,
            ..SessionDraft::new(session_type)
        }
    }

    /// Build a patch; flags not given stay unchanged.
    #[must_use]
    pub fn into_patch(self, session_type: Option<SessionType>) -> SessionPatch {
        SessionPatch {
            session_type,
            status: self.status.map(Into::into),
            start_time: self.start,
            end_time: self.end,
            duration_hours: self.duration,
            actual_flight_hours: self.actual_flight,
            actual_simulator_hours: self.actual_simulator,
            day_hours: self.day,
            night_hours: self.night,
            instrument_hours: self.instrument,
            single_engine_time: self.single_engine,
            multi_engine_time: self.multi_engine,
            student_id: self.student,
            teacher_id: self.teacher,
            aircraft_id: self.aircraft,
            simulator_id: self.simulator,
            school_id: self.school,
            departure_airport: self.from,
            arrival_airport: self.to,
        }
    }
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Session type argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SessionTypeArg {
    /// Flight in an aircraft
    Flight,
    /// Simulator session
    Simulator,
    /// Ground training
    Training,
    /// Check ride
    Checkride,
    /// Solo flight
    Solo,
    /// Cross-country flight
    CrossCountry,
}

impl From<SessionTypeArg> for SessionType {
    fn from(arg: SessionTypeArg) -> Self {
        match arg {
            SessionTypeArg::Flight => Self::Flight,
            SessionTypeArg::Simulator => Self::Simulator,
            SessionTypeArg::Training => Self::Training,
            SessionTypeArg::Checkride => Self::Checkride,
            SessionTypeArg::Solo => Self::Solo,
            SessionTypeArg::CrossCountry => Self::CrossCountry,
        }
    }
}

/// Session status argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SessionStatusArg {
    /// Not flown yet
    Scheduled,
    /// Flown
    Completed,
    /// Called off
    Canceled,
    /// Moved to another slot
    Rescheduled,
    /// Student did not turn up
    NoShow,
    /// Awaiting instructor review
    PendingReview,
}

impl From<SessionStatusArg> for SessionStatus {
    fn from(arg: SessionStatusArg) -> Self {
        match arg {
            SessionStatusArg::Scheduled => Self::Scheduled,
            SessionStatusArg::Completed => Self::Completed,
            SessionStatusArg::Canceled => Self::Canceled,
            SessionStatusArg::Rescheduled => Self::Rescheduled,
            SessionStatusArg::NoShow => Self::NoShow,
            SessionStatusArg::PendingReview => Self::PendingReview,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}
