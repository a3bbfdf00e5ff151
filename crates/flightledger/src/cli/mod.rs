//! Command-line interface for flightledger.
//!
//! This module provides the CLI structure for the `fledger` binary. The
//! handlers live in the binary; this module only parses.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    AircraftCommand, ConfigCommand, OutputFormat, PilotCommand, SessionArgs, SessionCommand,
    SessionStatusArg, SessionTypeArg, StatusCommand, TotalsArgs,
};

/// fledger - Flight-hours ledger for a flight school
///
/// Records training sessions and keeps the running hour totals of students,
/// instructors and aircraft in step with them.
#[derive(Debug, Parser)]
#[command(name = "fledger")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage students
    #[command(subcommand)]
    Student(PilotCommand),

    /// Manage instructors
    #[command(subcommand)]
    Teacher(PilotCommand),

    /// Manage aircraft
    #[command(subcommand)]
    Aircraft(AircraftCommand),

    /// Record and reconcile flight sessions
    #[command(subcommand)]
    Session(SessionCommand),

    /// Show ledger database status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.quiet, self.verbose)
    }
}
