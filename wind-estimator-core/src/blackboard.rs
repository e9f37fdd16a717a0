use core::fmt::{Display, Formatter};

#[allow(unused_imports)]
use micromath::F32Ext;
use serde::{Deserialize, Serialize};

use crate::units::normalize_bearing;

/// Clock value of the last update of a blackboard field, `None` while the
/// field has never been provided or has expired.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Validity(Option<f64>);

impl Validity {
    pub const fn invalid() -> Self {
        Self(None)
    }

    pub fn update(&mut self, clock: f64) {
        self.0 = Some(clock);
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }

    pub fn is_valid(&self) -> bool {
        self.0.is_some()
    }

    pub fn last_update(&self) -> Option<f64> {
        self.0
    }

    /// Invalidates the field if it is older than `max_age` seconds, or if the
    /// clock went backwards since it was written.
    pub fn expire(&mut self, now: f64, max_age: f64) {
        if let Some(last) = self.0 {
            if now < last || now - last > max_age {
                self.0 = None;
            }
        }
    }

    /// True when `self` carries a strictly newer value than `other`.
    pub fn is_newer_than(&self, other: &Validity) -> bool {
        match (self.0, other.0) {
            (Some(a), Some(b)) => a > b,
            (Some(_), None) => true,
            _ => false,
        }
    }
}

/// A horizontal vector given as bearing (degrees, `[0, 360)`) and norm (m/s).
///
/// For wind the bearing is the direction the wind blows *from*.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeedVector {
    pub bearing: f32,
    pub norm: f32,
}

impl SpeedVector {
    pub const fn zero() -> Self {
        Self {
            bearing: 0.0,
            norm: 0.0,
        }
    }

    pub fn new(bearing: f32, norm: f32) -> Self {
        Self {
            bearing: normalize_bearing(bearing),
            norm,
        }
    }

    /// Vector pointing along `atan2(east, north)`.
    pub fn from_components(north: f32, east: f32) -> Self {
        let norm = (north * north + east * east).sqrt();
        if norm == 0.0 {
            return Self::zero();
        }
        Self::new(east.atan2(north).to_degrees(), norm)
    }

    pub fn north(&self) -> f32 {
        self.norm * self.bearing.to_radians().cos()
    }

    pub fn east(&self) -> f32 {
        self.norm * self.bearing.to_radians().sin()
    }
}

/// VHF airband frequency in kHz.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RadioFrequency {
    kilohertz: u32,
}

impl RadioFrequency {
    pub const MIN_KILOHERTZ: u32 = 118_000;
    pub const MAX_KILOHERTZ: u32 = 136_990;

    pub const fn from_kilohertz(kilohertz: u32) -> Self {
        Self { kilohertz }
    }

    pub const fn kilohertz(&self) -> u32 {
        self.kilohertz
    }

    pub fn is_in_airband(&self) -> bool {
        (Self::MIN_KILOHERTZ..=Self::MAX_KILOHERTZ).contains(&self.kilohertz)
    }
}

impl Display for RadioFrequency {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:03}", self.kilohertz / 1000, self.kilohertz % 1000)
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Attitude {
    /// degrees, positive right wing down
    pub bank_angle: f32,
    pub bank_angle_available: Validity,
    /// degrees, positive nose up
    pub pitch_angle: f32,
    pub pitch_angle_available: Validity,
    /// magnetic or true heading of the airframe, degrees
    pub heading: f32,
    pub heading_available: Validity,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Acceleration {
    pub g_load: f32,
    pub available: bool,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RadioState {
    pub active_frequency: Option<RadioFrequency>,
    pub standby_frequency: Option<RadioFrequency>,
}

/// Everything the device drivers know about the aircraft. Drivers write
/// into it, the estimators only read.
///
/// Each value comes with a [`Validity`] holding the `clock` at which it was
/// last provided.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NmeaInfo {
    /// Monotonic clock in seconds, set by whoever owns the blackboard
    /// before handing it to a driver.
    pub clock: f64,
    /// Last time any valid frame arrived.
    pub alive: Validity,

    /// Seconds since UTC midnight as reported by the GPS.
    pub time: f64,
    pub time_available: Validity,

    pub location: GeoPoint,
    pub location_available: Validity,
    pub gps_altitude: f32,
    pub gps_altitude_available: Validity,

    /// m/s
    pub ground_speed: f32,
    pub ground_speed_available: Validity,
    /// degrees true
    pub track: f32,
    pub track_available: Validity,

    /// m/s
    pub true_airspeed: f32,
    pub indicated_airspeed: f32,
    pub airspeed_available: Validity,
    /// False when the airspeed was derived (e.g. from ground speed and wind)
    /// rather than measured by a pitot.
    pub airspeed_real: bool,

    pub acceleration: Acceleration,
    pub attitude: Attitude,

    /// Pa
    pub static_pressure: f32,
    pub static_pressure_available: Validity,
    pub pitot_pressure: f32,
    pub pitot_pressure_available: Validity,
    pub dynamic_pressure: f32,
    pub dynamic_pressure_available: Validity,

    /// m
    pub baro_altitude: f32,
    pub baro_altitude_available: Validity,

    /// m/s
    pub total_energy_vario: f32,
    pub total_energy_vario_available: Validity,

    /// Celsius
    pub temperature: f32,
    pub temperature_available: bool,
    /// percent
    pub humidity: f32,
    pub humidity_available: bool,

    /// V
    pub voltage: f32,
    pub voltage_available: Validity,

    /// Averaged wind reported by an external instrument.
    pub external_wind: SpeedVector,
    pub external_wind_available: Validity,
    /// Short term wind reported by an external instrument.
    pub external_instantaneous_wind: SpeedVector,
    pub external_instantaneous_wind_available: Validity,

    pub radio: RadioState,
}

impl NmeaInfo {
    pub fn provide_true_airspeed(&mut self, tas: f32) {
        self.true_airspeed = tas;
        self.indicated_airspeed = tas;
        self.airspeed_available.update(self.clock);
        self.airspeed_real = true;
    }

    pub fn provide_ground_speed(&mut self, ground_speed: f32) {
        self.ground_speed = ground_speed;
        self.ground_speed_available.update(self.clock);
    }

    pub fn provide_track(&mut self, track: f32) {
        self.track = normalize_bearing(track);
        self.track_available.update(self.clock);
    }

    pub fn provide_heading(&mut self, heading: f32) {
        self.attitude.heading = normalize_bearing(heading);
        self.attitude.heading_available.update(self.clock);
    }

    pub fn provide_static_pressure(&mut self, pa: f32) {
        self.static_pressure = pa;
        self.static_pressure_available.update(self.clock);
    }

    pub fn provide_pitot_pressure(&mut self, pa: f32) {
        self.pitot_pressure = pa;
        self.pitot_pressure_available.update(self.clock);
    }

    pub fn provide_dynamic_pressure(&mut self, pa: f32) {
        self.dynamic_pressure = pa;
        self.dynamic_pressure_available.update(self.clock);
    }

    pub fn provide_baro_altitude(&mut self, meters: f32) {
        self.baro_altitude = meters;
        self.baro_altitude_available.update(self.clock);
    }

    pub fn provide_total_energy_vario(&mut self, mps: f32) {
        self.total_energy_vario = mps;
        self.total_energy_vario_available.update(self.clock);
    }

    pub fn provide_voltage(&mut self, volts: f32) {
        self.voltage = volts;
        self.voltage_available.update(self.clock);
    }

    pub fn provide_external_wind(&mut self, wind: SpeedVector) {
        self.external_wind = wind;
        self.external_wind_available.update(self.clock);
    }

    pub fn provide_external_instantaneous_wind(&mut self, wind: SpeedVector) {
        self.external_instantaneous_wind = wind;
        self.external_instantaneous_wind_available.update(self.clock);
    }

    /// Ground velocity as `(north, east)` in m/s, when both speed and track
    /// are known.
    pub fn ground_velocity(&self) -> Option<(f32, f32)> {
        if !self.ground_speed_available.is_valid() || !self.track_available.is_valid() {
            return None;
        }
        let track = self.track.to_radians();
        Some((
            self.ground_speed * track.cos(),
            self.ground_speed * track.sin(),
        ))
    }

    /// Drops values that have not been refreshed recently. Called once per
    /// computation cycle by the owner of the blackboard.
    pub fn expire(&mut self) {
        let now = self.clock;
        self.alive.expire(now, 10.0);
        self.time_available.expire(now, 10.0);
        self.location_available.expire(now, 10.0);
        self.gps_altitude_available.expire(now, 30.0);
        self.ground_speed_available.expire(now, 10.0);
        self.track_available.expire(now, 10.0);
        self.airspeed_available.expire(now, 30.0);
        self.attitude.bank_angle_available.expire(now, 5.0);
        self.attitude.pitch_angle_available.expire(now, 5.0);
        self.attitude.heading_available.expire(now, 5.0);
        self.static_pressure_available.expire(now, 30.0);
        self.pitot_pressure_available.expire(now, 30.0);
        self.dynamic_pressure_available.expire(now, 30.0);
        self.baro_altitude_available.expire(now, 30.0);
        self.total_energy_vario_available.expire(now, 5.0);
        self.voltage_available.expire(now, 300.0);
        self.external_wind_available.expire(now, 600.0);
        self.external_instantaneous_wind_available.expire(now, 600.0);
    }

    /// Fills in everything `other` knows more recently than `self`. Used to
    /// combine the blackboards of several links into one.
    pub fn complement(&mut self, other: &NmeaInfo) {
        if other.clock > self.clock {
            self.clock = other.clock;
        }
        if other.alive.is_newer_than(&self.alive) {
            self.alive = other.alive;
        }
        if other.time_available.is_newer_than(&self.time_available) {
            self.time = other.time;
            self.time_available = other.time_available;
        }
        if other.location_available.is_newer_than(&self.location_available) {
            self.location = other.location;
            self.location_available = other.location_available;
        }
        if other
            .gps_altitude_available
            .is_newer_than(&self.gps_altitude_available)
        {
            self.gps_altitude = other.gps_altitude;
            self.gps_altitude_available = other.gps_altitude_available;
        }
        if other
            .ground_speed_available
            .is_newer_than(&self.ground_speed_available)
        {
            self.ground_speed = other.ground_speed;
            self.ground_speed_available = other.ground_speed_available;
        }
        if other.track_available.is_newer_than(&self.track_available) {
            self.track = other.track;
            self.track_available = other.track_available;
        }
        // a measured airspeed always wins over a derived one
        if other.airspeed_available.is_valid()
            && (other.airspeed_real || !self.airspeed_real || !self.airspeed_available.is_valid())
            && other.airspeed_available.is_newer_than(&self.airspeed_available)
        {
            self.true_airspeed = other.true_airspeed;
            self.indicated_airspeed = other.indicated_airspeed;
            self.airspeed_available = other.airspeed_available;
            self.airspeed_real = other.airspeed_real;
        }
        if other.acceleration.available {
            self.acceleration = other.acceleration;
        }
        if other
            .attitude
            .heading_available
            .is_newer_than(&self.attitude.heading_available)
        {
            self.attitude.heading = other.attitude.heading;
            self.attitude.heading_available = other.attitude.heading_available;
        }
        if other
            .attitude
            .bank_angle_available
            .is_newer_than(&self.attitude.bank_angle_available)
        {
            self.attitude.bank_angle = other.attitude.bank_angle;
            self.attitude.bank_angle_available = other.attitude.bank_angle_available;
        }
        if other
            .attitude
            .pitch_angle_available
            .is_newer_than(&self.attitude.pitch_angle_available)
        {
            self.attitude.pitch_angle = other.attitude.pitch_angle;
            self.attitude.pitch_angle_available = other.attitude.pitch_angle_available;
        }
        if other
            .static_pressure_available
            .is_newer_than(&self.static_pressure_available)
        {
            self.static_pressure = other.static_pressure;
            self.static_pressure_available = other.static_pressure_available;
        }
        if other
            .pitot_pressure_available
            .is_newer_than(&self.pitot_pressure_available)
        {
            self.pitot_pressure = other.pitot_pressure;
            self.pitot_pressure_available = other.pitot_pressure_available;
        }
        if other
            .dynamic_pressure_available
            .is_newer_than(&self.dynamic_pressure_available)
        {
            self.dynamic_pressure = other.dynamic_pressure;
            self.dynamic_pressure_available = other.dynamic_pressure_available;
        }
        if other
            .baro_altitude_available
            .is_newer_than(&self.baro_altitude_available)
        {
            self.baro_altitude = other.baro_altitude;
            self.baro_altitude_available = other.baro_altitude_available;
        }
        if other
            .total_energy_vario_available
            .is_newer_than(&self.total_energy_vario_available)
        {
            self.total_energy_vario = other.total_energy_vario;
            self.total_energy_vario_available = other.total_energy_vario_available;
        }
        if other.temperature_available {
            self.temperature = other.temperature;
            self.temperature_available = true;
        }
        if other.humidity_available {
            self.humidity = other.humidity;
            self.humidity_available = true;
        }
        if other.voltage_available.is_newer_than(&self.voltage_available) {
            self.voltage = other.voltage;
            self.voltage_available = other.voltage_available;
        }
        if other
            .external_wind_available
            .is_newer_than(&self.external_wind_available)
        {
            self.external_wind = other.external_wind;
            self.external_wind_available = other.external_wind_available;
        }
        if other
            .external_instantaneous_wind_available
            .is_newer_than(&self.external_instantaneous_wind_available)
        {
            self.external_instantaneous_wind = other.external_instantaneous_wind;
            self.external_instantaneous_wind_available =
                other.external_instantaneous_wind_available;
        }
        if other.radio.active_frequency.is_some() {
            self.radio.active_frequency = other.radio.active_frequency;
        }
        if other.radio.standby_frequency.is_some() {
            self.radio.standby_frequency = other.radio.standby_frequency;
        }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightState {
    pub flying: bool,
    /// Clock at which the current flying / landed state was entered.
    pub state_since: f64,
}

/// Values computed from [`NmeaInfo`] by the flight-state computer and the
/// wind estimators.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedInfo {
    pub flight: FlightState,
    /// deg/s, positive to the right
    pub turn_rate: f32,
    pub circling: bool,
    pub wind: SpeedVector,
    pub wind_available: Validity,
    /// 0 means no usable estimate, 5 is the best.
    pub wind_quality: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn validity_expires_on_age_and_time_warp() {
        let mut v = Validity::invalid();
        assert!(!v.is_valid());
        v.update(10.0);
        v.expire(15.0, 10.0);
        assert!(v.is_valid());
        v.expire(25.0, 10.0);
        assert!(!v.is_valid());

        v.update(10.0);
        v.expire(5.0, 10.0);
        assert!(!v.is_valid());
    }

    #[test]
    fn speed_vector_components() {
        let west = SpeedVector::from_components(0.0, -5.0);
        assert_relative_eq!(west.bearing, 270.0, epsilon = 1e-3);
        assert_relative_eq!(west.norm, 5.0, epsilon = 1e-5);
        assert_relative_eq!(west.north(), 0.0, epsilon = 1e-5);
        assert_relative_eq!(west.east(), -5.0, epsilon = 1e-5);
        assert_eq!(SpeedVector::from_components(0.0, 0.0), SpeedVector::zero());
    }

    #[test]
    fn frequency_display() {
        let f = RadioFrequency::from_kilohertz(123_450);
        assert!(f.is_in_airband());
        assert_eq!(format!("{}", f), "123.450");
        assert!(!RadioFrequency::from_kilohertz(108_000).is_in_airband());
    }

    #[test]
    fn ground_velocity_requires_speed_and_track() {
        let mut info = NmeaInfo::default();
        info.clock = 1.0;
        info.provide_ground_speed(10.0);
        assert!(info.ground_velocity().is_none());
        info.provide_track(90.0);
        let (n, e) = info.ground_velocity().unwrap();
        assert_relative_eq!(n, 0.0, epsilon = 1e-5);
        assert_relative_eq!(e, 10.0, epsilon = 1e-5);
    }

    #[test]
    fn complement_prefers_newer_and_measured_values() {
        let mut a = NmeaInfo::default();
        a.clock = 5.0;
        a.provide_ground_speed(10.0);
        a.provide_true_airspeed(20.0);

        let mut b = NmeaInfo::default();
        b.clock = 6.0;
        b.provide_ground_speed(12.0);
        b.true_airspeed = 25.0;
        b.airspeed_available.update(6.0);
        b.airspeed_real = false;

        a.complement(&b);
        assert_relative_eq!(a.ground_speed, 12.0);
        assert_relative_eq!(a.true_airspeed, 20.0);
        assert!(a.airspeed_real);
        assert_relative_eq!(a.clock, 6.0);
    }
}
