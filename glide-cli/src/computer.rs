use log::{debug, info, warn};
use wind_estimator_core::{
    AnyWindEstimator, CirclingWind, ConditionMonitor, DerivedInfo, FlightStateComputer, NmeaInfo,
    WindEkfGlue, WindEstimator, WindResult, WindSettings, WindZigZag, units::mps_to_kmh,
};

use crate::args::EstimatorKind;

pub fn make_estimators(settings: &WindSettings, kind: EstimatorKind) -> Vec<AnyWindEstimator> {
    let ekf = || AnyWindEstimator::Ekf(WindEkfGlue::new(settings.gate, settings.ekf));
    let zigzag = || AnyWindEstimator::ZigZag(WindZigZag::new(settings.gate, settings.zigzag));
    let circling = || AnyWindEstimator::Circling(CirclingWind::new(settings.circling));
    match kind {
        EstimatorKind::Ekf => vec![ekf()],
        EstimatorKind::Zigzag => vec![zigzag()],
        EstimatorKind::Circling => vec![circling()],
        EstimatorKind::Both => vec![ekf(), zigzag()],
        EstimatorKind::All => vec![ekf(), zigzag(), circling()],
    }
}

/// Owns the merged blackboard and everything derived from it. Runs the
/// estimators once per new GPS fix.
pub struct GlideComputer {
    basic: NmeaInfo,
    derived: DerivedInfo,
    flight_state: FlightStateComputer,
    estimators: Vec<AnyWindEstimator>,
    /// latest valid result per estimator
    results: Vec<Option<WindResult>>,
    monitor: ConditionMonitor,
    last_fix: Option<f64>,
}

impl GlideComputer {
    pub fn new(estimators: Vec<AnyWindEstimator>) -> Self {
        Self {
            basic: NmeaInfo::default(),
            derived: DerivedInfo::default(),
            flight_state: FlightStateComputer::new(),
            results: vec![None; estimators.len()],
            estimators,
            monitor: ConditionMonitor::wind(),
            last_fix: None,
        }
    }

    pub fn basic(&self) -> &NmeaInfo {
        &self.basic
    }

    pub fn derived(&self) -> &DerivedInfo {
        &self.derived
    }

    pub fn results(&self) -> impl Iterator<Item = (&'static str, Option<WindResult>)> + '_ {
        self.estimators
            .iter()
            .map(AnyWindEstimator::name)
            .zip(self.results.iter().copied())
    }

    /// Replaces the blackboard with the single link's view.
    pub fn replace(&mut self, link: &NmeaInfo) {
        self.basic = link.clone();
        self.step();
    }

    /// Merges one link's view into the blackboard.
    pub fn merge(&mut self, link: &NmeaInfo) {
        self.basic.complement(link);
        self.step();
    }

    /// Advances the clock without new data so stale values expire.
    pub fn tick(&mut self, clock: f64) {
        if clock > self.basic.clock {
            self.basic.clock = clock;
        }
        self.basic.expire();
    }

    fn step(&mut self) {
        self.basic.expire();

        let fix = self.basic.track_available.last_update();
        if fix.is_none() || fix == self.last_fix {
            return;
        }
        self.last_fix = fix;

        let was_flying = self.derived.flight.flying;
        self.flight_state.update(&self.basic, &mut self.derived);
        if was_flying != self.derived.flight.flying {
            info!(
                "{} at {:.0}s",
                if self.derived.flight.flying { "takeoff" } else { "landing" },
                self.basic.clock
            );
        }

        for (i, estimator) in self.estimators.iter_mut().enumerate() {
            let result = estimator.update(&self.basic, &self.derived);
            if !result.is_valid() {
                continue;
            }
            info!(
                "{} wind {:.0}° {:.1} km/h, quality {}",
                estimator.name(),
                result.wind.bearing,
                mps_to_kmh(result.wind.norm),
                result.quality
            );
            self.results[i] = Some(result);

            // the first estimator feeds the blackboard
            if i == 0 {
                self.derived.wind = result.wind;
                self.derived.wind_quality = result.quality;
                self.derived.wind_available.update(self.basic.clock);
            }
        }

        if let Some(notification) = self.monitor.update(&self.basic, &self.derived) {
            warn!("{}", notification.message());
        }
        debug!(
            "t={:.1} flying={} circling={} turn rate {:.1}",
            self.basic.clock, self.derived.flight.flying, self.derived.circling, self.derived.turn_rate
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use wind_estimator_core::units::{bearing_delta, kmh_to_mps};

    /// Straight legs at 100 km/h in a 20 km/h westerly.
    fn fly(computer: &mut GlideComputer, seconds: u32) {
        fly_headings(computer, seconds, |t| (((t / 10) * 70) % 360) as f32);
    }

    fn fly_headings(computer: &mut GlideComputer, seconds: u32, heading: impl Fn(u32) -> f32) {
        let tas = kmh_to_mps(100.0);
        let wind_east = kmh_to_mps(20.0);
        let mut basic = NmeaInfo::default();
        for t in 0..seconds {
            let (sin, cos) = heading(t).to_radians().sin_cos();
            let north = tas * cos;
            let east = tas * sin + wind_east;

            basic.clock = t as f64;
            basic.provide_true_airspeed(tas);
            basic.provide_ground_speed(north.hypot(east));
            basic.provide_track(east.atan2(north).to_degrees().rem_euclid(360.0));
            basic.acceleration.g_load = 1.0;
            basic.acceleration.available = true;
            computer.replace(&basic);
        }
    }

    #[test]
    fn both_estimators_publish() {
        let mut computer = GlideComputer::new(make_estimators(
            &WindSettings::default(),
            EstimatorKind::Both,
        ));
        fly(&mut computer, 300);

        assert!(computer.derived().flight.flying);
        assert!(computer.derived().wind_available.is_valid());
        let results: Vec<_> = computer.results().collect();
        assert_eq!(results[0].0, "ekf");
        assert_eq!(results[1].0, "zigzag");

        for (name, result) in results {
            let result = result.unwrap_or_else(|| panic!("{} never published", name));
            assert_abs_diff_eq!(mps_to_kmh(result.wind.norm), 20.0, epsilon = 2.0);
            assert!(bearing_delta(270.0, result.wind.bearing).abs() < 10.0, "{}", name);
        }
    }

    #[test]
    fn thermalling_drives_circling_estimator() {
        let mut computer = GlideComputer::new(make_estimators(
            &WindSettings::default(),
            EstimatorKind::Circling,
        ));
        // cruise for 30 s, then circle right at 18°/s
        fly_headings(&mut computer, 120, |t| {
            if t < 30 { 0.0 } else { ((t - 30) * 18 % 360) as f32 }
        });

        assert!(computer.derived().circling);
        let (name, result) = computer.results().next().unwrap();
        assert_eq!(name, "circling");
        let result = result.expect("no wind from circling");
        assert!(result.quality >= 3);
        assert_abs_diff_eq!(mps_to_kmh(result.wind.norm), 20.0, epsilon = 2.0);
        assert!(bearing_delta(270.0, result.wind.bearing).abs() < 5.0);
    }

    #[test]
    fn repeated_snapshot_is_one_fix() {
        let mut computer =
            GlideComputer::new(make_estimators(&WindSettings::default(), EstimatorKind::Ekf));
        let mut basic = NmeaInfo::default();
        basic.clock = 1.0;
        basic.provide_ground_speed(20.0);
        basic.provide_track(10.0);
        computer.replace(&basic);
        basic.clock = 1.5;
        computer.replace(&basic);
        assert_eq!(computer.last_fix, Some(1.0));
    }
}
