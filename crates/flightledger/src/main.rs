//! `fledger` - CLI for flightledger
//!
//! This binary provides the command-line interface for recording flight
//! sessions and inspecting the hour totals they maintain.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::fmt::Display;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use rust_decimal::Decimal;
use serde::Serialize;

use flightledger::cli::{
    AircraftCommand, Cli, Command, ConfigCommand, OutputFormat, PilotCommand, SessionCommand,
};
use flightledger::storage::aggregates::{self, NewAircraft, NewPilot, Pilot, PilotKind};
use flightledger::storage::sessions;
use flightledger::{
    init_logging, BatchUpdateItem, Config, Error, Reconciler, Session, SessionFilter, Storage,
    VerificationOutcome,
};

/// Exit status for a missing student, teacher, aircraft or session.
const EXIT_NOT_FOUND: u8 = 2;

/// A lookup by id that matched nothing.
#[derive(Debug, thiserror::Error)]
#[error("{kind} not found: {id}")]
struct NotFound {
    kind: String,
    id: String,
}

impl NotFound {
    fn new(kind: impl Display, id: &str) -> Self {
        Self {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            if is_not_found(&e) {
                ExitCode::from(EXIT_NOT_FOUND)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<NotFound>().is_some()
        || err.downcast_ref::<Error>().is_some_and(Error::is_not_found)
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Student(cmd) => handle_pilot(&config, PilotKind::Student, cmd),
        Command::Teacher(cmd) => handle_pilot(&config, PilotKind::Teacher, cmd),
        Command::Aircraft(cmd) => handle_aircraft(&config, cmd),
        Command::Session(cmd) => handle_session(&config, cmd),
        Command::Status(cmd) => handle_status(&config, cmd.json),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn opt<T: Display>(value: Option<&T>) -> String {
    value.map_or_else(|| "-".to_string(), ToString::to_string)
}

// === Students and teachers ===

fn handle_pilot(config: &Config, kind: PilotKind, cmd: PilotCommand) -> Result<()> {
    let storage = Storage::from_config(config)?;

    match cmd {
        PilotCommand::Add {
            name,
            id,
            school,
            opening,
        } => {
            let pilot = aggregates::insert_pilot(
                storage.conn(),
                kind,
                &NewPilot {
                    id,
                    name,
                    school_id: school,
                    opening: opening.into(),
                },
            )?;
            println!("Added {kind} {} ({})", pilot.name, pilot.id);
        }
        PilotCommand::Show { id, json } => {
            let pilot = aggregates::get_pilot(storage.conn(), kind, &id)?
                .ok_or_else(|| NotFound::new(kind, &id))?;
            if json {
                print_json(&pilot)?;
            } else {
                print_pilot(&pilot);
            }
        }
        PilotCommand::List { school, format } => {
            let pilots = aggregates::list_pilots(storage.conn(), kind, school.as_deref())?;
            match format {
                OutputFormat::Json => print_json(&pilots)?,
                OutputFormat::Table => {
                    println!(
                        "{:<36}  {:<24}  {:>9}  {:>9}  {:>9}",
                        "ID", "NAME", "FLIGHT", "SIM", "NIGHT"
                    );
                    for p in &pilots {
                        println!(
                            "{:<36}  {:<24}  {:>9}  {:>9}  {:>9}",
                            p.id,
                            p.name,
                            p.totals.total_flight_hours,
                            p.totals.total_simulator_hours,
                            p.totals.night_hours
                        );
                    }
                }
                OutputFormat::Plain => {
                    for p in &pilots {
                        println!("{}\t{}\t{}", p.id, p.name, p.totals.total_flight_hours);
                    }
                }
            }
        }
    }
    Ok(())
}

fn print_pilot(pilot: &Pilot) {
    let t = &pilot.totals;
    println!("{} ({})", pilot.name, pilot.id);
    println!("  School:           {}", opt(pilot.school_id.as_ref()));
    println!("  Flight hours:     {}", t.total_flight_hours);
    println!("  Simulator hours:  {}", t.total_simulator_hours);
    println!("  Day hours:        {}", t.day_hours);
    println!("  Night hours:      {}", t.night_hours);
    println!("  Instrument hours: {}", t.instrument_hours);
    println!("  Single-engine:    {}", t.single_engine_time);
    println!("  Multi-engine:     {}", t.multi_engine_time);
}

// === Aircraft ===

fn handle_aircraft(config: &Config, cmd: AircraftCommand) -> Result<()> {
    let storage = Storage::from_config(config)?;
    let opening = cmd.opening().unwrap_or_default();

    match cmd {
        AircraftCommand::Add {
            tail_number,
            id,
            make,
            model,
            school,
            ..
        } => {
            let aircraft = aggregates::insert_aircraft(
                storage.conn(),
                &NewAircraft {
                    id,
                    tail_number,
                    make,
                    model,
                    school_id: school,
                    opening,
                },
            )?;
            println!("Added aircraft {} ({})", aircraft.tail_number, aircraft.id);
        }
        AircraftCommand::Show { id, json } => {
            let aircraft = aggregates::get_aircraft(storage.conn(), &id)?
                .ok_or_else(|| NotFound::new("aircraft", &id))?;
            if json {
                print_json(&aircraft)?;
            } else {
                println!("{} ({})", aircraft.tail_number, aircraft.id);
                println!("  Make:           {}", opt(aircraft.make.as_ref()));
                println!("  Model:          {}", opt(aircraft.model.as_ref()));
                println!("  School:         {}", opt(aircraft.school_id.as_ref()));
                println!("  Engine hours:   {}", aircraft.totals.engine_hours);
                println!("  Airframe hours: {}", aircraft.totals.airframe_hours);
            }
        }
    }
    Ok(())
}

// === Sessions ===

fn handle_session(config: &Config, cmd: SessionCommand) -> Result<()> {
    let mut storage = Storage::from_config(config)?;
    let reconciler = Reconciler::from_config(config);

    match cmd {
        SessionCommand::Create {
            session_type,
            id,
            fields,
        } => {
            let draft = fields.into_draft(session_type.into(), id);
            let session = reconciler.create_session(storage.conn_mut(), draft)?;
            println!("Created {} session {}", session.session_type, session.id);
        }
        SessionCommand::Show { id, json } => {
            let session = sessions::get_session(storage.conn(), &id)?
                .ok_or_else(|| Error::session_not_found(&id))?;
            if json {
                print_json(&session)?;
            } else {
                print_session(&session);
            }
        }
        SessionCommand::List {
            student,
            teacher,
            aircraft,
            school,
            limit,
            format,
        } => {
            let filter = SessionFilter {
                student_id: student,
                teacher_id: teacher,
                aircraft_id: aircraft,
                school_id: school,
                limit,
            };
            let found = sessions::list_sessions(storage.conn(), &filter)?;
            print_sessions(&found, format)?;
        }
        SessionCommand::Update {
            id,
            session_type,
            fields,
        } => {
            let patch = fields.into_patch(session_type.map(Into::into));
            let session = reconciler.update_session(storage.conn_mut(), &id, &patch)?;
            println!("Updated session {}", session.id);
        }
        SessionCommand::Delete { id } => {
            let session = reconciler.delete_session(storage.conn_mut(), &id)?;
            println!("Deleted session {}", session.id);
        }
        SessionCommand::BatchUpdate { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let items: Vec<BatchUpdateItem> = serde_json::from_str(&text)
                .with_context(|| format!("invalid batch file {}", file.display()))?;
            let report = reconciler.batch_update(storage.conn_mut(), &items);
            print_json(&report)?;
        }
        SessionCommand::Verify { id, revoke, json } => {
            let outcome = reconciler.apply_verification(storage.conn_mut(), &id, !revoke)?;
            if json {
                print_json(&outcome.report())?;
            } else {
                println!("{}", describe_verification(&id, outcome));
            }
        }
    }
    Ok(())
}

fn describe_verification(id: &str, outcome: VerificationOutcome) -> String {
    match outcome {
        VerificationOutcome::Applied => format!("Session {id} verified"),
        VerificationOutcome::AlreadyVerified => format!("Session {id} is already verified"),
        VerificationOutcome::NotVerified => format!("Session {id} is not verified"),
        VerificationOutcome::OneWay => {
            format!("Session {id} stays verified: sign-offs cannot be withdrawn")
        }
    }
}

fn print_session(s: &Session) {
    let hours = |h: Option<Decimal>| opt(h.as_ref());
    println!("Session {}", s.id);
    println!("  Type:             {}", s.session_type);
    println!("  Status:           {}", s.status);
    println!("  Start:            {}", opt(s.start_time.as_ref()));
    println!("  End:              {}", opt(s.end_time.as_ref()));
    println!("  Duration:         {}", hours(s.duration_hours));
    println!("  Actual flight:    {}", hours(s.actual_flight_hours));
    println!("  Actual simulator: {}", hours(s.actual_simulator_hours));
    println!("  Day / night:      {} / {}", hours(s.day_hours), hours(s.night_hours));
    println!("  Instrument:       {}", hours(s.instrument_hours));
    println!(
        "  SE / ME:          {} / {}",
        hours(s.single_engine_time),
        hours(s.multi_engine_time)
    );
    println!("  Student:          {}", opt(s.student_id.as_ref()));
    println!("  Teacher:          {}", opt(s.teacher_id.as_ref()));
    println!("  Aircraft:         {}", opt(s.aircraft_id.as_ref()));
    println!("  Simulator:        {}", opt(s.simulator_id.as_ref()));
    println!(
        "  Route:            {} -> {}",
        opt(s.departure_airport.as_ref()),
        opt(s.arrival_airport.as_ref())
    );
    println!("  Verified:         {}", s.verified_by_instructor);
}

fn print_sessions(found: &[Session], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(found)?,
        OutputFormat::Table => {
            println!(
                "{:<36}  {:<13}  {:<14}  {:>8}  {:<12}  {:<12}  {:<12}  {}",
                "ID", "TYPE", "STATUS", "HOURS", "STUDENT", "TEACHER", "AIRCRAFT", "VERIFIED"
            );
            for s in found {
                println!(
                    "{:<36}  {:<13}  {:<14}  {:>8}  {:<12}  {:<12}  {:<12}  {}",
                    s.id,
                    s.session_type,
                    s.status,
                    opt(s.duration_hours.as_ref()),
                    opt(s.student_id.as_ref()),
                    opt(s.teacher_id.as_ref()),
                    opt(s.aircraft_id.as_ref()),
                    if s.verified_by_instructor { "yes" } else { "no" }
                );
            }
        }
        OutputFormat::Plain => {
            for s in found {
                println!(
                    "{}\t{}\t{}",
                    s.id,
                    s.session_type,
                    opt(s.duration_hours.as_ref())
                );
            }
        }
    }
    Ok(())
}

// === Status and configuration ===

fn handle_status(config: &Config, json: bool) -> Result<()> {
    let storage = Storage::from_config(config)?;
    let stats = storage.stats()?;

    if json {
        let status = serde_json::json!({
            "database_path": storage.path(),
            "verification_accrual": config.ledger.verification_accrual,
            "stats": stats,
        });
        print_json(&status)?;
    } else {
        println!("fledger status");
        println!("--------------");
        println!("Database:          {}", storage.path().display());
        println!("Size:              {} bytes", stats.db_size_bytes);
        println!("Students:          {}", stats.students);
        println!("Teachers:          {}", stats.teachers);
        println!("Aircraft:          {}", stats.aircraft);
        println!(
            "Sessions:          {} ({} verified)",
            stats.sessions, stats.verified_sessions
        );
        println!(
            "Verification:      {}",
            if config.ledger.verification_accrual {
                "accrues hours"
            } else {
                "flag only"
            }
        );
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                print_json(config)?;
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:        {}", config.database_path().display());
                println!("  Busy timeout (ms):    {}", config.storage.busy_timeout_ms);
                println!();
                println!("[Ledger]");
                println!(
                    "  Verification accrual: {}",
                    config.ledger.verification_accrual
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            Config::load_from(Some(path))?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}
