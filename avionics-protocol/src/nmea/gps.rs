use chrono::{NaiveTime, Timelike};
use nmea::{Nmea, SentenceType};
use wind_estimator_core::{NmeaInfo, blackboard::GeoPoint, units::knots_to_mps};

fn seconds_of_day(time: &NaiveTime) -> f64 {
    time.num_seconds_from_midnight() as f64 + time.nanosecond() as f64 * 1e-9
}

/// Standard GPS sentences, decoded by the `nmea` crate.
#[derive(Default)]
pub struct GpsParser {
    nmea: Nmea,
}

impl GpsParser {
    /// Returns true if `line` was a supported GPS sentence.
    pub fn parse(&mut self, line: &str, info: &mut NmeaInfo) -> bool {
        let sentence = match self.nmea.parse(line) {
            Ok(sentence) => sentence,
            Err(_) => return false,
        };

        match sentence {
            SentenceType::RMC => {
                self.provide_time(info);
                self.provide_location(info);
                if let Some(speed) = self.nmea.speed_over_ground {
                    info.provide_ground_speed(knots_to_mps(speed));
                }
                if let Some(track) = self.nmea.true_course {
                    info.provide_track(track);
                }
                true
            }
            SentenceType::GGA => {
                self.provide_time(info);
                self.provide_location(info);
                if let Some(altitude) = self.nmea.altitude {
                    info.gps_altitude = altitude;
                    info.gps_altitude_available.update(info.clock);
                }
                true
            }
            _ => false,
        }
    }

    fn provide_time(&self, info: &mut NmeaInfo) {
        if let Some(time) = &self.nmea.fix_time {
            info.time = seconds_of_day(time);
            info.time_available.update(info.clock);
        }
    }

    fn provide_location(&self, info: &mut NmeaInfo) {
        if let (Some(latitude), Some(longitude)) = (self.nmea.latitude, self.nmea.longitude) {
            info.location = GeoPoint {
                latitude,
                longitude,
            };
            info.location_available.update(info.clock);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rmc_fills_motion_and_time() {
        let mut parser = GpsParser::default();
        let mut info = NmeaInfo::default();
        info.clock = 10.0;

        assert!(parser.parse(
            "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A",
            &mut info
        ));
        assert_relative_eq!(info.time, 12.0 * 3600.0 + 35.0 * 60.0 + 19.0);
        assert_relative_eq!(info.ground_speed, knots_to_mps(22.4), epsilon = 1e-4);
        assert_relative_eq!(info.track, 84.4, epsilon = 1e-4);
        assert_relative_eq!(info.location.latitude, 48.1173, epsilon = 1e-4);
        assert_relative_eq!(info.location.longitude, 11.516_667, epsilon = 1e-4);
        assert_eq!(info.track_available.last_update(), Some(10.0));
    }

    #[test]
    fn gga_fills_altitude() {
        let mut parser = GpsParser::default();
        let mut info = NmeaInfo::default();

        assert!(parser.parse(
            "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47",
            &mut info
        ));
        assert_relative_eq!(info.gps_altitude, 545.4, epsilon = 1e-3);
        assert!(info.gps_altitude_available.is_valid());
        assert!(!info.ground_speed_available.is_valid());
    }

    #[test]
    fn garbage_is_ignored() {
        let mut parser = GpsParser::default();
        let mut info = NmeaInfo::default();
        assert!(!parser.parse("$GPXYZ,1,2,3*00", &mut info));
        assert_eq!(info, NmeaInfo::default());
    }
}
