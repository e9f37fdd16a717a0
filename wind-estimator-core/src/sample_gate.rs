use nalgebra::Vector2;
#[allow(unused_imports)]
use micromath::F32Ext;

use crate::{
    blackboard::{DerivedInfo, NmeaInfo},
    settings::GateSettings,
    units::normalize_bearing,
};

/// One fix as seen by the estimators. Built fresh from the blackboard for
/// every update call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AircraftSample {
    pub time: f64,
    /// (north, east) in m/s
    pub ground_velocity: Vector2<f32>,
    pub true_airspeed: f32,
    /// deg/s
    pub turn_rate: f32,
    pub g_load: Option<f32>,
    pub flying: bool,
    pub circling: bool,
    pub airspeed_available: bool,
    pub airspeed_real: bool,
}

impl AircraftSample {
    /// `None` when ground speed or track is missing.
    pub fn from_blackboard(basic: &NmeaInfo, derived: &DerivedInfo) -> Option<Self> {
        let (north, east) = basic.ground_velocity()?;
        Some(Self {
            time: basic.clock,
            ground_velocity: Vector2::new(north, east),
            true_airspeed: basic.true_airspeed,
            turn_rate: derived.turn_rate,
            g_load: if basic.acceleration.available {
                Some(basic.acceleration.g_load)
            } else {
                None
            },
            flying: derived.flight.flying,
            circling: derived.circling,
            airspeed_available: basic.airspeed_available.is_valid(),
            airspeed_real: basic.airspeed_real,
        })
    }

    pub fn ground_speed(&self) -> f32 {
        self.ground_velocity.norm()
    }

    /// Ground track in degrees.
    pub fn track(&self) -> f32 {
        normalize_bearing(
            self.ground_velocity
                .y
                .atan2(self.ground_velocity.x)
                .to_degrees(),
        )
    }
}

/// Time of the last disqualifying manoeuvre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlackoutTimer {
    blackout_time: f64,
}

impl BlackoutTimer {
    pub const fn new() -> Self {
        Self {
            blackout_time: f64::NEG_INFINITY,
        }
    }

    pub fn trigger(&mut self, now: f64) {
        self.blackout_time = now;
    }

    pub fn clear(&mut self) {
        self.blackout_time = f64::NEG_INFINITY;
    }

    pub fn is_active(&self, now: f64, cooldown: f64) -> bool {
        now < self.blackout_time + cooldown
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Idle,
    Armed,
    BlackedOut,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    NotFlying,
    AirspeedUnavailable,
    AirspeedNotReal,
    AirspeedTooLow,
    TimeWarp,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateVerdict {
    /// The estimator must forget everything.
    Reset(ResetReason),
    /// Keep the estimator state but ignore this sample.
    Rejected,
    Accepted,
}

/// Decides per sample whether the estimator may use it.
///
/// ```text
/// Idle ──flying, airspeed ok──► Armed ──manoeuvre──► BlackedOut
///  ▲                              ▲                       │
///  └──── reset conditions ────────┴──── cooldown over ────┘
/// ```
#[derive(Debug, Clone)]
pub struct SampleGate {
    settings: GateSettings,
    blackout: BlackoutTimer,
    last_time: Option<f64>,
    state: GateState,
}

impl SampleGate {
    pub fn new(settings: GateSettings) -> Self {
        Self {
            settings,
            blackout: BlackoutTimer::new(),
            last_time: None,
            state: GateState::Idle,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn reset(&mut self) {
        self.blackout.clear();
        self.last_time = None;
        self.state = GateState::Idle;
    }

    pub fn check(&mut self, sample: &AircraftSample) -> GateVerdict {
        if let Some(last) = self.last_time {
            if sample.time < last {
                log_info!(
                    "clock went backwards from {} to {}, resetting",
                    last,
                    sample.time
                );
                self.reset();
                self.last_time = Some(sample.time);
                return GateVerdict::Reset(ResetReason::TimeWarp);
            }
        }
        self.last_time = Some(sample.time);

        if let Some(reason) = self.reset_reason(sample) {
            if self.state != GateState::Idle {
                log_debug!("sample gate idle: {:?}", reason);
            }
            self.blackout.clear();
            self.state = GateState::Idle;
            return GateVerdict::Reset(reason);
        }

        if self.is_manoeuvring(sample) {
            self.blackout.trigger(sample.time);
            self.state = GateState::BlackedOut;
            return GateVerdict::Rejected;
        }

        if self
            .blackout
            .is_active(sample.time, self.settings.blackout_duration)
        {
            self.state = GateState::BlackedOut;
            return GateVerdict::Rejected;
        }

        self.state = GateState::Armed;
        GateVerdict::Accepted
    }

    fn reset_reason(&self, sample: &AircraftSample) -> Option<ResetReason> {
        if !sample.flying {
            Some(ResetReason::NotFlying)
        } else if !sample.airspeed_available {
            Some(ResetReason::AirspeedUnavailable)
        } else if !sample.airspeed_real {
            Some(ResetReason::AirspeedNotReal)
        } else if !(sample.true_airspeed >= self.settings.min_true_airspeed) {
            // also catches NaN
            Some(ResetReason::AirspeedTooLow)
        } else {
            None
        }
    }

    fn is_manoeuvring(&self, sample: &AircraftSample) -> bool {
        if sample.turn_rate.abs() > self.settings.max_turn_rate {
            return true;
        }
        match sample.g_load {
            Some(g) => (g - 1.0).abs() > self.settings.max_g_load_deviation,
            None => false,
        }
    }
}
