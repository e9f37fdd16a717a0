mod filter;

pub use filter::WindEkf;

use crate::{
    blackboard::{DerivedInfo, NmeaInfo, SpeedVector},
    estimator::{WindEstimator, WindResult},
    sample_gate::{AircraftSample, GateVerdict, SampleGate},
    settings::{EkfSettings, GateSettings},
};

/// Sample gate, publish throttling and quality tiers around [`WindEkf`].
#[derive(Debug, Clone)]
pub struct WindEkfGlue {
    ekf: WindEkf,
    gate: SampleGate,
    settings: EkfSettings,
    /// accepted samples since the last reset
    sample_count: u32,
    /// accepted samples since the last publish
    publish_count: u32,
    last_circling: bool,
}

impl WindEkfGlue {
    pub fn new(gate: GateSettings, settings: EkfSettings) -> Self {
        Self {
            ekf: WindEkf::new(&settings),
            gate: SampleGate::new(gate),
            settings,
            sample_count: 0,
            publish_count: 0,
            last_circling: false,
        }
    }

    pub fn filter(&self) -> &WindEkf {
        &self.ekf
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    fn quality(&self) -> u8 {
        match self.sample_count {
            0..30 => 1,
            30..120 => 2,
            120..600 => 3,
            _ => 4,
        }
    }

    fn reset_estimate(&mut self) {
        self.ekf.reset();
        self.sample_count = 0;
        self.publish_count = 0;
        self.last_circling = false;
    }
}

impl Default for WindEkfGlue {
    fn default() -> Self {
        Self::new(GateSettings::default(), EkfSettings::default())
    }
}

impl WindEstimator for WindEkfGlue {
    fn update(&mut self, basic: &NmeaInfo, derived: &DerivedInfo) -> WindResult {
        let Some(sample) = AircraftSample::from_blackboard(basic, derived) else {
            self.reset();
            return WindResult::none();
        };

        match self.gate.check(&sample) {
            GateVerdict::Reset(_) => {
                if self.sample_count > 0 {
                    log_debug!("wind ekf reset after {} samples", self.sample_count);
                }
                self.reset_estimate();
                return WindResult::none();
            }
            GateVerdict::Rejected => return WindResult::none(),
            GateVerdict::Accepted => {}
        }

        if sample.circling != self.last_circling {
            self.last_circling = sample.circling;
            self.publish_count = 0;
        }

        if self.settings.covariance_prediction {
            self.ekf.predict_covariance();
        }
        if !self.ekf.correct(&sample.ground_velocity, sample.true_airspeed) {
            return WindResult::none();
        }

        self.sample_count = self.sample_count.saturating_add(1);
        self.publish_count += 1;
        if self.publish_count < self.settings.publish_interval {
            return WindResult::none();
        }
        self.publish_count = 0;

        let w = self.ekf.wind_state();
        let wind = SpeedVector::from_components(-w.x, -w.y);
        let quality = self.quality();
        log_trace!(
            "ekf wind {}/{} m/s, quality {}, {} samples",
            wind.bearing,
            wind.norm,
            quality,
            self.sample_count
        );
        WindResult::new(quality, wind)
    }

    fn reset(&mut self) {
        self.gate.reset();
        self.reset_estimate();
    }
}
