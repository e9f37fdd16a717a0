//! Wind from the ground speed variation over one full thermalling circle.
//!
//! While circling, `gs − tas` traces `−w·cos(track − wind_from)` around a
//! constant offset. The mean absolute deviation from that offset gives the
//! amplitude `w`, an iterative phase search against a cosine gives the
//! bearing.

use core::f32::consts::FRAC_PI_2;

use heapless::Vec;
#[allow(unused_imports)]
use micromath::F32Ext;

use crate::{
    blackboard::{DerivedInfo, NmeaInfo, SpeedVector, Validity},
    estimator::{WindEstimator, WindResult},
    settings::CirclingSettings,
    units::{bearing_delta, normalize_bearing},
};

pub const MAX_CIRCLE_SAMPLES: usize = 64;

/// Fit metric every converged phase search stays below.
const UNCONVERGED_FIT: f32 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct CircleSample {
    time: f64,
    track: f32,
    ground_speed: f32,
    /// 0 when no measured airspeed is available
    true_airspeed: f32,
}

impl CircleSample {
    fn speed_difference(&self) -> f32 {
        self.ground_speed - self.true_airspeed
    }
}

/// The newest samples covering one full turn.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Circle {
    samples: usize,
    /// degrees turned, signed
    turn: f32,
    /// largest turn rate deviation relative to the average turn rate
    roundness: f32,
}

#[derive(Debug, Clone)]
pub struct CirclingWind {
    settings: CirclingSettings,
    active: bool,
    use_airspeed: bool,
    /// newest first
    samples: Vec<CircleSample, MAX_CIRCLE_SAMPLES>,
    last_track: Validity,
    last_ground_speed: Validity,
    /// samples to wait for before the next attempt
    suspend: usize,
}

impl CirclingWind {
    pub fn new(settings: CirclingSettings) -> Self {
        Self {
            settings,
            active: false,
            use_airspeed: true,
            samples: Vec::new(),
            last_track: Validity::invalid(),
            last_ground_speed: Validity::invalid(),
            suspend: 0,
        }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    fn restart(&mut self, basic: &NmeaInfo) {
        self.active = true;
        let real_airspeed = basic.airspeed_real && basic.airspeed_available.is_valid();
        if self.use_airspeed && !real_airspeed {
            log_info!("circling wind without true airspeed");
        }
        self.use_airspeed = real_airspeed;
        self.samples.clear();
        self.last_track = Validity::invalid();
        self.last_ground_speed = Validity::invalid();
        self.suspend = 0;
    }

    /// Finds the newest samples making up a full turn, if that turn was
    /// flown evenly enough to be used.
    fn full_circle(&self) -> Option<Circle> {
        let mut turn = 0.0f32;
        let mut samples = 0;
        for (i, pair) in self.samples.windows(2).enumerate() {
            turn += bearing_delta(pair[1].track, pair[0].track);
            if turn.abs() > 360.0 {
                samples = i + 2;
                break;
            }
        }
        if samples <= 8 {
            return None;
        }

        let average = turn / samples as f32;
        let max_deviation = self.samples[..samples]
            .windows(2)
            .map(|pair| (bearing_delta(pair[1].track, pair[0].track) - average).abs())
            .fold(0.0f32, f32::max);
        let roundness = (max_deviation / average).abs();

        (roundness < self.settings.max_roundness).then_some(Circle {
            samples,
            turn,
            roundness,
        })
    }

    fn calc_wind(&self, circle: &Circle) -> WindResult {
        let samples = &self.samples[..circle.samples];
        let n = samples.len();

        let step = (samples[0].time - samples[n - 1].time) / (n - 1) as f64;
        if step > self.settings.max_step_width {
            return WindResult::none();
        }
        let tolerance = step * self.settings.step_uniformity;
        if samples
            .windows(2)
            .any(|pair| (pair[0].time - pair[1].time - step).abs() > tolerance)
        {
            log_debug!("circle sampled unevenly, average step {}s", step);
            return WindResult::none();
        }

        // part of the oldest step that lies beyond the full turn
        let oldest_change = bearing_delta(samples[n - 1].track, samples[n - 2].track);
        let excess = bearing_delta(360.0, circle.turn);
        let excess_fraction = if oldest_change != 0.0 {
            (excess / oldest_change).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let offset = circle_mean(samples, excess_fraction, CircleSample::speed_difference);
        let wind_speed = circle_mean(samples, excess_fraction, |s| {
            (s.speed_difference() - offset).abs()
        }) * FRAC_PI_2;
        if !(wind_speed < self.settings.max_wind_speed) {
            return WindResult::none();
        }

        let mut midpoint = 180.0f32;
        let mut steps = 7;
        let mut width = circle.turn.abs() / 6.0;
        let mut best_fit = UNCONVERGED_FIT;
        for _ in 0..10 {
            let mut probe = midpoint - width * steps as f32 / 2.0;
            for _ in 0..=steps {
                let fit = fit_cosine(samples, wind_speed, offset, probe);
                if fit < best_fit {
                    best_fit = fit;
                    midpoint = probe;
                }
                probe += width;
            }
            steps = 3;
            width /= 2.0;
            if width <= 2.0 {
                break;
            }
        }
        if best_fit > UNCONVERGED_FIT - 1.0 {
            log_debug!("circling wind phase search did not converge");
            return WindResult::none();
        }

        let wind = SpeedVector::new(normalize_bearing(midpoint), wind_speed);
        let quality = estimate_quality(circle.roundness, best_fit, wind_speed);
        log_trace!(
            "circling wind {}/{} m/s, quality {}, roundness {}, fit {}",
            wind.bearing,
            wind.norm,
            quality,
            circle.roundness,
            best_fit
        );
        WindResult::new(quality, wind)
    }
}

impl Default for CirclingWind {
    fn default() -> Self {
        Self::new(CirclingSettings::default())
    }
}

/// Mean over the circle with the oldest sample weighted by `1 − excess`.
fn circle_mean(samples: &[CircleSample], excess: f32, value: impl Fn(&CircleSample) -> f32) -> f32 {
    let sum: f32 = samples.iter().map(&value).sum();
    let oldest = samples.last().map_or(0.0, &value);
    (sum - oldest * excess) / (samples.len() as f32 - excess)
}

/// Sum of squared deviations of the normalised speed difference from
/// `−cos(track − phase)`.
fn fit_cosine(samples: &[CircleSample], amplitude: f32, offset: f32, phase: f32) -> f32 {
    samples
        .iter()
        .map(|s| {
            let angle = normalize_bearing(s.track - phase).to_radians();
            let mut difference = s.speed_difference() - offset;
            if amplitude > 1.0 {
                difference /= amplitude;
            }
            let error = -angle.cos() - difference;
            error * error
        })
        .sum()
}

/// Quality 0..=5 from circle roundness, adjusted by how well the cosine
/// fits. Strong wind skews the ground track, so roundness is judged more
/// leniently above 10 m/s.
pub fn estimate_quality(roundness: f32, fit: f32, wind_speed: f32) -> u8 {
    let skew = if wind_speed > 10.0 { 0.1 } else { 0.0 };
    let mut quality: i32 = if roundness > 0.7 + skew {
        return 0;
    } else if roundness > 0.5 + skew {
        1
    } else if roundness > 0.4 + skew {
        2
    } else if roundness > 0.3 + skew {
        3
    } else if roundness > 0.2 + skew {
        4
    } else {
        5
    };

    if fit > 10.0 {
        quality -= 1;
    }
    if fit < 5.0 {
        quality += 1;
    }
    if fit < 1.0 {
        quality += 1;
    }
    quality.clamp(0, 5) as u8
}

fn went_back(current: &Validity, last: &Validity) -> bool {
    matches!(
        (current.last_update(), last.last_update()),
        (Some(current), Some(last)) if current < last
    )
}

impl WindEstimator for CirclingWind {
    fn update(&mut self, basic: &NmeaInfo, derived: &DerivedInfo) -> WindResult {
        if !derived.circling {
            self.reset();
            return WindResult::none();
        }
        if !self.active {
            self.restart(basic);
        }

        if went_back(&basic.track_available, &self.last_track)
            || went_back(&basic.ground_speed_available, &self.last_ground_speed)
        {
            log_debug!("circling wind restarted after time warp");
            self.restart(basic);
        }

        if !basic.track_available.is_newer_than(&self.last_track)
            || !basic
                .ground_speed_available
                .is_newer_than(&self.last_ground_speed)
        {
            // no new fix
            return WindResult::none();
        }
        self.last_track = basic.track_available;
        self.last_ground_speed = basic.ground_speed_available;

        if self.samples.is_full() {
            self.samples.pop();
        }
        let _ = self.samples.insert(
            0,
            CircleSample {
                time: basic.clock,
                track: basic.track,
                ground_speed: basic.ground_speed,
                true_airspeed: if self.use_airspeed {
                    basic.true_airspeed
                } else {
                    0.0
                },
            },
        );

        if self.suspend > 0 {
            self.suspend -= 1;
            return WindResult::none();
        }

        let Some(circle) = self.full_circle() else {
            return WindResult::none();
        };
        let result = self.calc_wind(&circle);
        // after a good circle wait a quarter turn before the next attempt
        self.suspend = if result.is_valid() {
            circle.samples / 4
        } else {
            0
        };
        result
    }

    fn reset(&mut self) {
        self.active = false;
        self.use_airspeed = true;
        self.samples.clear();
        self.last_track = Validity::invalid();
        self.last_ground_speed = Validity::invalid();
        self.suspend = 0;
    }
}
