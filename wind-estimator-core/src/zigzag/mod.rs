//! Wind from a window of angularly diverse (ground velocity, airspeed) pairs.
//!
//! Once the window is full, the wind `x` minimising
//!
//! ```text
//! Σ ((|v_gps,i + x| − tas_i) / tas_i)²
//! ```
//!
//! is searched with a bounded trust-region method. A poor correlation
//! between observed and modelled airspeed rejects the fit.

mod correlation;
mod optimizer;
mod window;

pub use correlation::pearson;
pub use optimizer::{Minimum, TrustRegion, minimize};
pub use window::{Observation, ObservationWindow, PushOutcome};

#[allow(unused_imports)]
use micromath::F32Ext;
use nalgebra::Vector2;

use crate::{
    blackboard::{DerivedInfo, NmeaInfo, SpeedVector},
    estimator::{WindEstimator, WindResult},
    sample_gate::{AircraftSample, GateVerdict, SampleGate},
    settings::{GateSettings, ZigZagSettings},
};

pub const MAX_WINDOW_CAPACITY: usize = 32;

/// RMS relative error accepted when the correlation is undefined.
const DEGENERATE_FIT_TOLERANCE: f32 = 0.01;

#[derive(Debug, Clone)]
pub struct WindZigZag {
    settings: ZigZagSettings,
    gate: SampleGate,
    window: ObservationWindow,
    last_solution: Option<Vector2<f32>>,
    solve_count: u32,
}

impl WindZigZag {
    pub fn new(gate: GateSettings, settings: ZigZagSettings) -> Self {
        Self {
            settings,
            gate: SampleGate::new(gate),
            window: ObservationWindow::new(settings.window_capacity, settings.min_bearing_change),
            last_solution: None,
            solve_count: 0,
        }
    }

    pub fn window(&self) -> &ObservationWindow {
        &self.window
    }

    /// Number of optimizer runs since the last reset.
    pub fn solve_count(&self) -> u32 {
        self.solve_count
    }

    fn reset_estimate(&mut self) {
        self.window.clear();
        self.last_solution = None;
        self.solve_count = 0;
    }

    fn solve(&mut self, circling: bool) -> WindResult {
        let start = self.last_solution.unwrap_or_else(Vector2::zeros);
        let config = TrustRegion {
            bound: self.settings.max_wind_speed,
            ..TrustRegion::default()
        };
        let window = &self.window;
        let minimum = minimize(|x| window.cost(x), start, &config);
        self.solve_count = self.solve_count.saturating_add(1);

        let x = minimum.x;
        let rms = minimum.value.max(0.0).sqrt();
        let correlation = pearson(
            self.window
                .iter()
                .map(|o| (o.true_airspeed, o.model_airspeed(&x))),
        );

        self.window.prune(
            &x,
            self.settings.outlier_threshold,
            self.settings.retained_floor,
        );

        let wind = SpeedVector::from_components(x.x, x.y);
        let fit_ok = match correlation {
            Some(r) => r >= self.settings.min_correlation,
            None => rms < DEGENERATE_FIT_TOLERANCE,
        };
        if !fit_ok {
            log_debug!(
                "zigzag fit rejected, correlation {:?}, rms {}",
                correlation,
                rms
            );
            return WindResult::new(0, wind);
        }

        self.last_solution = Some(x);
        let quality = quality_from_residual(rms, circling);
        log_trace!(
            "zigzag wind {}/{} m/s, quality {}, {} evaluations",
            wind.bearing,
            wind.norm,
            quality,
            minimum.evaluations
        );
        WindResult::new(quality, wind)
    }
}

/// `clamp(round(−log10(rms)), 1, 5)`, halved while circling.
pub fn quality_from_residual(rms: f32, circling: bool) -> u8 {
    let quality = if rms <= 1e-5 {
        5
    } else {
        let q = (-rms.log10()).round();
        if q.is_nan() { 1 } else { q.clamp(1.0, 5.0) as u8 }
    };
    if circling { (quality / 2).max(1) } else { quality }
}

impl Default for WindZigZag {
    fn default() -> Self {
        Self::new(GateSettings::default(), ZigZagSettings::default())
    }
}

impl WindEstimator for WindZigZag {
    fn update(&mut self, basic: &NmeaInfo, derived: &DerivedInfo) -> WindResult {
        let Some(sample) = AircraftSample::from_blackboard(basic, derived) else {
            self.reset();
            return WindResult::none();
        };

        match self.gate.check(&sample) {
            GateVerdict::Reset(_) => {
                if !self.window.is_empty() {
                    log_debug!("zigzag reset with {} samples", self.window.len());
                }
                self.reset_estimate();
                return WindResult::none();
            }
            GateVerdict::Rejected => return WindResult::none(),
            GateVerdict::Accepted => {}
        }

        if sample.ground_speed() < self.settings.min_ground_speed {
            return WindResult::none();
        }

        match self.window.push(Observation::from_sample(&sample)) {
            PushOutcome::BearingTooClose => return WindResult::none(),
            PushOutcome::Restarted => log_debug!("zigzag window restarted, sample out of order"),
            PushOutcome::Stored => {}
        }

        if !self.window.is_full() {
            return WindResult::none();
        }
        self.solve(sample.circling)
    }

    fn reset(&mut self) {
        self.gate.reset();
        self.reset_estimate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{FlightSimulator, init_logger};
    use approx::assert_relative_eq;

    #[test]
    fn quality_scale() {
        assert_eq!(quality_from_residual(0.0, false), 5);
        assert_eq!(quality_from_residual(0.001, false), 3);
        assert_eq!(quality_from_residual(0.02, false), 2);
        assert_eq!(quality_from_residual(0.5, false), 1);
        assert_eq!(quality_from_residual(0.0, true), 2);
        assert_eq!(quality_from_residual(0.5, true), 1);
    }

    #[test]
    fn narrow_bearing_spread_never_solves() {
        init_logger();
        let mut sim = FlightSimulator::new(5.56, 270.0, 27.8);
        let mut zigzag = WindZigZag::default();

        for i in 0..200 {
            let heading = 100.0 + (i % 5) as f32;
            let (basic, derived) = sim.straight(heading);
            assert_eq!(zigzag.update(&basic, &derived).quality, 0);
        }
        assert_eq!(zigzag.window().len(), 1);
        assert_eq!(zigzag.solve_count(), 0);
    }

    #[test]
    fn solves_once_window_is_full() {
        let mut sim = FlightSimulator::new(5.56, 270.0, 27.8);
        let mut zigzag = WindZigZag::default();

        for i in 0..19 {
            let (basic, derived) = sim.straight(i as f32 * 18.0);
            assert!(!zigzag.update(&basic, &derived).is_valid());
        }
        let (basic, derived) = sim.straight(19.0 * 18.0);
        let result = zigzag.update(&basic, &derived);
        assert_eq!(zigzag.solve_count(), 1);
        assert!(result.quality >= 3);
        assert_relative_eq!(result.wind.norm, 5.56, epsilon = 0.1);
        assert!((result.wind.bearing - 270.0).abs() < 2.0);
        // pruned back below capacity
        assert!(zigzag.window().len() < 20);
    }

    #[test]
    fn slow_ground_speed_is_ignored() {
        let mut sim = FlightSimulator::new(0.0, 0.0, 2.0);
        let mut zigzag = WindZigZag::default();
        for i in 0..30 {
            let (basic, derived) = sim.straight(i as f32 * 30.0);
            assert!(!zigzag.update(&basic, &derived).is_valid());
        }
        assert!(zigzag.window().is_empty());
    }

    #[test]
    fn reset_clears_window() {
        let mut sim = FlightSimulator::new(5.56, 270.0, 27.8);
        let mut zigzag = WindZigZag::default();
        for i in 0..10 {
            let (basic, derived) = sim.straight(i as f32 * 18.0);
            zigzag.update(&basic, &derived);
        }
        assert_eq!(zigzag.window().len(), 10);
        zigzag.reset();
        assert!(zigzag.window().is_empty());
    }
}
