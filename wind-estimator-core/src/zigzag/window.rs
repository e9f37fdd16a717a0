use heapless::Vec;
use nalgebra::Vector2;

use crate::{sample_gate::AircraftSample, units::bearing_delta};

use super::MAX_WINDOW_CAPACITY;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub time: f64,
    /// (north, east) m/s
    pub ground_velocity: Vector2<f32>,
    pub true_airspeed: f32,
    /// ground track in degrees
    pub track: f32,
}

impl Observation {
    pub fn from_sample(sample: &AircraftSample) -> Self {
        Self {
            time: sample.time,
            ground_velocity: sample.ground_velocity,
            true_airspeed: sample.true_airspeed,
            track: sample.track(),
        }
    }

    /// Airspeed implied by the wind vector `x` (pointing where the air goes
    /// after negation, i.e. `tas = |v_gps + x|`).
    pub fn model_airspeed(&self, x: &Vector2<f32>) -> f32 {
        (self.ground_velocity + x).norm()
    }

    pub fn relative_error(&self, x: &Vector2<f32>) -> f32 {
        (self.model_airspeed(x) - self.true_airspeed) / self.true_airspeed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Stored,
    /// Too close in bearing to the newest stored observation.
    BearingTooClose,
    /// Older than the newest stored observation, window restarted with it.
    Restarted,
}

/// Insertion ordered observations with angular spread between neighbours.
#[derive(Debug, Clone)]
pub struct ObservationWindow {
    samples: Vec<Observation, MAX_WINDOW_CAPACITY>,
    capacity: usize,
    min_bearing_change: f32,
}

impl ObservationWindow {
    pub fn new(capacity: usize, min_bearing_change: f32) -> Self {
        Self {
            samples: Vec::new(),
            capacity: capacity.clamp(1, MAX_WINDOW_CAPACITY),
            min_bearing_change,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> + Clone {
        self.samples.iter()
    }

    pub fn push(&mut self, observation: Observation) -> PushOutcome {
        let mut outcome = PushOutcome::Stored;
        if let Some(last) = self.samples.last() {
            if observation.time < last.time {
                self.samples.clear();
                outcome = PushOutcome::Restarted;
            } else if bearing_delta(last.track, observation.track).abs() < self.min_bearing_change {
                return PushOutcome::BearingTooClose;
            }
        }

        if self.is_full() {
            self.samples.remove(0);
        }
        // cannot fail, a slot was freed above
        let _ = self.samples.push(observation);
        outcome
    }

    /// Mean squared relative error of the window for wind `x`.
    pub fn cost(&self, x: &Vector2<f32>) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f32 = self
            .samples
            .iter()
            .map(|o| {
                let e = o.relative_error(x);
                e * e
            })
            .sum();
        sum / self.samples.len() as f32
    }

    /// Drops the oldest observation, then the worst outliers above
    /// `threshold`, never going below `floor` observations.
    pub fn prune(&mut self, x: &Vector2<f32>, threshold: f32, floor: usize) {
        if self.samples.len() > floor {
            self.samples.remove(0);
        }

        while self.samples.len() > floor {
            let worst = self
                .samples
                .iter()
                .enumerate()
                .map(|(i, o)| {
                    let e = o.relative_error(x);
                    (i, e * e)
                })
                .fold(None, |acc: Option<(usize, f32)>, (i, e)| match acc {
                    Some((_, best)) if best >= e => acc,
                    _ => Some((i, e)),
                });
            match worst {
                Some((i, e)) if e > threshold => {
                    self.samples.remove(i);
                }
                _ => break,
            }
        }
    }
}
