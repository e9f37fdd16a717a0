use crate::{
    blackboard::{DerivedInfo, NmeaInfo},
    units::bearing_delta,
};

/// m/s
const TAKEOFF_SPEED: f32 = 10.0;
const TAKEOFF_TIME: f64 = 10.0;
/// m/s
const LANDING_SPEED: f32 = 5.0;
const LANDING_TIME: f64 = 30.0;

/// deg/s
const CIRCLING_TURN_RATE: f32 = 4.0;
const CIRCLING_ENTRY_TIME: f64 = 15.0;
const CIRCLING_EXIT_TIME: f64 = 10.0;

/// Track samples further apart than this do not give a turn rate.
const MAX_TRACK_GAP: f64 = 5.0;

/// Derives the flying / circling flags and the turn rate that the sample
/// gate relies on.
#[derive(Debug, Clone, Default)]
pub struct FlightStateComputer {
    last_clock: Option<f64>,
    /// (time of fix, track)
    last_track: Option<(f64, f32)>,
    moving_time: f64,
    stationary_time: f64,
    turning_time: f64,
    straight_time: f64,
}

impl FlightStateComputer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn update(&mut self, basic: &NmeaInfo, derived: &mut DerivedInfo) {
        let now = basic.clock;
        let dt = match self.last_clock {
            Some(last) if now < last => {
                log_info!("clock went backwards from {} to {}", last, now);
                self.reset();
                derived.turn_rate = 0.0;
                derived.circling = false;
                0.0
            }
            Some(last) => now - last,
            None => 0.0,
        };
        self.last_clock = Some(now);

        self.update_turn_rate(basic, derived);
        self.update_flying(basic, derived, dt);
        self.update_circling(derived, dt);
    }

    fn update_turn_rate(&mut self, basic: &NmeaInfo, derived: &mut DerivedInfo) {
        let Some(fix_time) = basic.track_available.last_update() else {
            derived.turn_rate = 0.0;
            self.last_track = None;
            return;
        };

        match self.last_track {
            Some((last_time, last_track)) => {
                let dt = fix_time - last_time;
                if dt <= 0.0 {
                    // same fix seen again
                    return;
                }
                derived.turn_rate = if dt <= MAX_TRACK_GAP {
                    bearing_delta(last_track, basic.track) / dt as f32
                } else {
                    0.0
                };
            }
            None => derived.turn_rate = 0.0,
        }
        self.last_track = Some((fix_time, basic.track));
    }

    fn update_flying(&mut self, basic: &NmeaInfo, derived: &mut DerivedInfo, dt: f64) {
        let mut speed: Option<f32> = None;
        if basic.ground_speed_available.is_valid() {
            speed = Some(basic.ground_speed);
        }
        if basic.airspeed_available.is_valid() {
            speed = Some(speed.map_or(basic.true_airspeed, |s| s.max(basic.true_airspeed)));
        }
        let Some(speed) = speed else {
            return;
        };

        if speed > TAKEOFF_SPEED {
            self.moving_time += dt;
            self.stationary_time = 0.0;
            if !derived.flight.flying && self.moving_time >= TAKEOFF_TIME {
                log_info!("takeoff detected");
                derived.flight.flying = true;
                derived.flight.state_since = basic.clock;
            }
        } else if speed < LANDING_SPEED {
            self.stationary_time += dt;
            self.moving_time = 0.0;
            if derived.flight.flying && self.stationary_time >= LANDING_TIME {
                log_info!("landing detected");
                derived.flight.flying = false;
                derived.flight.state_since = basic.clock;
            }
        } else {
            self.moving_time = 0.0;
            self.stationary_time = 0.0;
        }
    }

    fn update_circling(&mut self, derived: &mut DerivedInfo, dt: f64) {
        if !derived.flight.flying {
            derived.circling = false;
            self.turning_time = 0.0;
            self.straight_time = 0.0;
            return;
        }

        if derived.turn_rate.abs() > CIRCLING_TURN_RATE {
            self.turning_time += dt;
            self.straight_time = 0.0;
            if !derived.circling && self.turning_time >= CIRCLING_ENTRY_TIME {
                log_debug!("circling");
                derived.circling = true;
            }
        } else {
            self.straight_time += dt;
            self.turning_time = 0.0;
            if derived.circling && self.straight_time >= CIRCLING_EXIT_TIME {
                log_debug!("cruising");
                derived.circling = false;
            }
        }
    }
}
