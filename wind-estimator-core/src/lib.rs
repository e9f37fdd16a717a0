#![cfg_attr(not(any(test, feature = "std")), no_std)]

mod fmt;

pub mod blackboard;
pub mod circling;
pub mod condition_monitor;
pub mod ekf;
pub mod estimator;
pub mod flight_state;
pub mod sample_gate;
pub mod settings;
pub mod units;
pub mod zigzag;

pub use blackboard::{DerivedInfo, NmeaInfo, RadioFrequency, SpeedVector, Validity};
pub use circling::CirclingWind;
pub use condition_monitor::{ConditionMonitor, Notification};
pub use ekf::WindEkfGlue;
pub use estimator::{AnyWindEstimator, WindEstimator, WindResult};
pub use flight_state::FlightStateComputer;
pub use settings::{CirclingSettings, EkfSettings, GateSettings, WindSettings, ZigZagSettings};
pub use zigzag::WindZigZag;

#[cfg(test)]
mod tests;
