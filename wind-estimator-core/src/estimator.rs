use serde::{Deserialize, Serialize};

use crate::{
    blackboard::{DerivedInfo, NmeaInfo, SpeedVector},
    circling::CirclingWind,
    ekf::WindEkfGlue,
    zigzag::WindZigZag,
};

/// Output of one estimator step. `quality == 0` means nothing usable was
/// produced this step.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WindResult {
    pub quality: u8,
    /// Wind vector, bearing is where the wind comes from.
    pub wind: SpeedVector,
}

impl WindResult {
    pub const fn none() -> Self {
        Self {
            quality: 0,
            wind: SpeedVector::zero(),
        }
    }

    pub fn new(quality: u8, wind: SpeedVector) -> Self {
        Self { quality, wind }
    }

    pub fn is_valid(&self) -> bool {
        self.quality > 0
    }
}

pub trait WindEstimator {
    /// Consumes the current blackboard snapshot. Returns
    /// [`WindResult::none`] when nothing is to be published this step.
    fn update(&mut self, basic: &NmeaInfo, derived: &DerivedInfo) -> WindResult;

    /// Forgets all accumulated state. Calling it twice is the same as once.
    fn reset(&mut self);
}

#[derive(Debug, Clone)]
pub enum AnyWindEstimator {
    Ekf(WindEkfGlue),
    ZigZag(WindZigZag),
    /// Only produces results while the circling flag is set.
    Circling(CirclingWind),
}

impl AnyWindEstimator {
    pub fn name(&self) -> &'static str {
        match self {
            AnyWindEstimator::Ekf(_) => "ekf",
            AnyWindEstimator::ZigZag(_) => "zigzag",
            AnyWindEstimator::Circling(_) => "circling",
        }
    }
}

impl WindEstimator for AnyWindEstimator {
    fn update(&mut self, basic: &NmeaInfo, derived: &DerivedInfo) -> WindResult {
        match self {
            AnyWindEstimator::Ekf(e) => e.update(basic, derived),
            AnyWindEstimator::ZigZag(z) => z.update(basic, derived),
            AnyWindEstimator::Circling(c) => c.update(basic, derived),
        }
    }

    fn reset(&mut self) {
        match self {
            AnyWindEstimator::Ekf(e) => e.reset(),
            AnyWindEstimator::ZigZag(z) => z.reset(),
            AnyWindEstimator::Circling(c) => c.reset(),
        }
    }
}
