use serde::{Deserialize, Serialize};

/// Thresholds shared by both estimators for deciding whether a sample may be
/// used at all.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateSettings {
    /// deg/s, above this the aircraft is manoeuvring
    pub max_turn_rate: f32,
    /// tolerated |g - 1|
    pub max_g_load_deviation: f32,
    /// seconds to keep rejecting samples after a manoeuvre
    pub blackout_duration: f64,
    /// m/s, below this the airspeed is treated as unavailable
    pub min_true_airspeed: f32,
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            max_turn_rate: 20.0,
            max_g_load_deviation: 0.3,
            blackout_duration: 3.0,
            min_true_airspeed: 1.0,
        }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EkfSettings {
    /// (m/s)^2 added to each wind component per step
    pub wind_process_variance: f32,
    pub scale_factor_process_variance: f32,
    pub initial_wind_variance: f32,
    pub initial_scale_factor_variance: f32,
    /// Standard deviation of the airspeed measurement in m/s.
    pub airspeed_noise_std: f32,
    /// Grow the covariance by the process noise before every correction.
    /// Off keeps the filter a pure batch least squares over the flight.
    pub covariance_prediction: bool,
    /// Publish one result every this many accepted samples.
    pub publish_interval: u32,
}

impl Default for EkfSettings {
    fn default() -> Self {
        Self {
            wind_process_variance: 0.1,
            scale_factor_process_variance: 1e-4,
            initial_wind_variance: 100.0,
            initial_scale_factor_variance: 1e-2,
            airspeed_noise_std: 1.0,
            covariance_prediction: false,
            publish_interval: 10,
        }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZigZagSettings {
    /// Number of samples that triggers a solve. Capped at
    /// [`crate::zigzag::MAX_WINDOW_CAPACITY`].
    pub window_capacity: usize,
    /// Never prune below this many samples.
    pub retained_floor: usize,
    /// degrees of ground track change required between stored samples
    pub min_bearing_change: f32,
    /// m/s
    pub min_ground_speed: f32,
    /// Squared relative error above which a sample is dropped after a solve.
    pub outlier_threshold: f32,
    pub min_correlation: f32,
    /// Upper bound on each wind component in m/s.
    pub max_wind_speed: f32,
}

impl Default for ZigZagSettings {
    fn default() -> Self {
        Self {
            window_capacity: 20,
            retained_floor: 5,
            min_bearing_change: 10.0,
            min_ground_speed: 2.5,
            outlier_threshold: 0.0025,
            min_correlation: 0.9,
            max_wind_speed: 30.0,
        }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CirclingSettings {
    /// seconds, circles sampled more sparsely are ignored
    pub max_step_width: f64,
    /// Tolerated deviation of a single step from the average step.
    pub step_uniformity: f64,
    /// Largest turn rate deviation, relative to the average turn rate, for
    /// a circle to be used.
    pub max_roundness: f32,
    /// m/s, larger results are rejected
    pub max_wind_speed: f32,
}

impl Default for CirclingSettings {
    fn default() -> Self {
        Self {
            max_step_width: 2.0,
            step_uniformity: 0.05,
            max_roundness: 0.8,
            max_wind_speed: 30.0,
        }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindSettings {
    pub gate: GateSettings,
    pub ekf: EkfSettings,
    pub zigzag: ZigZagSettings,
    pub circling: CirclingSettings,
}
