//! Hours delta vectors.
//!
//! A [`HoursDelta`] is the signed adjustment one session makes to the
//! aggregates it references. It is computed, applied and dropped within a
//! single reconciliation call; it is never stored.

use std::ops::Neg;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::session::{Session, SessionType};

/// One signed value per aggregate counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoursDelta {
    /// Added to pilot flight totals and to aircraft engine hours.
    pub total_flight_hours: Decimal,
    /// Added to pilot simulator totals.
    pub total_simulator_hours: Decimal,
    /// Daytime hours.
    pub day_hours: Decimal,
    /// Night hours.
    pub night_hours: Decimal,
    /// Instrument hours.
    pub instrument_hours: Decimal,
    /// Single-engine time.
    pub single_engine_time: Decimal,
    /// Multi-engine time.
    pub multi_engine_time: Decimal,
    /// Aircraft-only; pilots ignore it.
    pub airframe_hours: Decimal,
}

impl HoursDelta {
    /// The zero vector.
    pub const ZERO: Self = Self {
        total_flight_hours: Decimal::ZERO,
        total_simulator_hours: Decimal::ZERO,
        day_hours: Decimal::ZERO,
        night_hours: Decimal::ZERO,
        instrument_hours: Decimal::ZERO,
        single_engine_time: Decimal::ZERO,
        multi_engine_time: Decimal::ZERO,
        airframe_hours: Decimal::ZERO,
    };

    /// Whether every component is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// The vector a session contributes through the create/update/delete
    /// lifecycle.
    ///
    /// Duration counts as flight time (and airframe time) for `FLIGHT`
    /// sessions and as simulator time for `SIMULATOR` sessions; other
    /// categories only carry their breakdown fields. Negative values are
    /// passed through unchanged.
    #[must_use]
    pub fn for_session(session: &Session) -> Self {
        let duration = or_zero(session.duration_hours);
        let flight = if session.session_type == SessionType::Flight {
            duration
        } else {
            Decimal::ZERO
        };
        let simulator = if session.session_type == SessionType::Simulator {
            duration
        } else {
            Decimal::ZERO
        };

        Self {
            total_flight_hours: flight,
            total_simulator_hours: simulator,
            airframe_hours: flight,
            ..Self::breakdown(session)
        }
    }

    /// The vector an instructor sign-off contributes to the student and
    /// teacher.
    ///
    /// Uses the confirmed `actual*` hours rather than the logged duration,
    /// and never touches the aircraft.
    #[must_use]
    pub fn for_verification(session: &Session) -> Self {
        Self {
            total_flight_hours: or_zero(session.actual_flight_hours),
            total_simulator_hours: or_zero(session.actual_simulator_hours),
            ..Self::breakdown(session)
        }
    }

    fn breakdown(session: &Session) -> Self {
        Self {
            day_hours: or_zero(session.day_hours),
            night_hours: or_zero(session.night_hours),
            instrument_hours: or_zero(session.instrument_hours),
            single_engine_time: or_zero(session.single_engine_time),
            multi_engine_time: or_zero(session.multi_engine_time),
            ..Self::ZERO
        }
    }
}

impl Neg for HoursDelta {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            total_flight_hours: -self.total_flight_hours,
            total_simulator_hours: -self.total_simulator_hours,
            day_hours: -self.day_hours,
            night_hours: -self.night_hours,
            instrument_hours: -self.instrument_hours,
            single_engine_time: -self.single_engine_time,
            multi_engine_time: -self.multi_engine_time,
            airframe_hours: -self.airframe_hours,
        }
    }
}

/// Compute the lifecycle delta for a session.
#[must_use]
pub fn compute_delta(session: &Session) -> HoursDelta {
    HoursDelta::for_session(session)
}

fn or_zero(value: Option<Decimal>) -> Decimal {
    value.unwrap_or(Decimal::ZERO)
}
