use wind_estimator_core::{
    NmeaInfo, SpeedVector,
    units::{hectopascal_to_pascal, kmh_to_mps, knots_to_mps, normalize_bearing},
};

use crate::input_line::NmeaInputLine;

/// `$POV,<type>,<value>,<type>,<value>...`
///
/// Pairs are independent: a value that is missing or out of range is
/// skipped and parsing continues with the next pair.
pub fn parse_pov(mut line: NmeaInputLine<'_>, info: &mut NmeaInfo) -> bool {
    let mut any = false;
    while !line.is_empty() {
        let Some(kind) = line.read_one_char() else {
            break;
        };

        let stored = match kind {
            'E' => line
                .read_checked_range(-50.0..=50.0)
                .map(|v| info.provide_total_energy_vario(v)),
            'H' => line.read_checked_range(0.0..=100.0).map(|v| {
                info.humidity = v;
                info.humidity_available = true;
            }),
            'P' => line
                .read_checked_range(100.0..=1200.0)
                .map(|v| info.provide_static_pressure(hectopascal_to_pascal(v))),
            'Q' => line
                .read_checked_range(0.0..=20_000.0)
                .map(|v| info.provide_dynamic_pressure(v)),
            'R' => line
                .read_checked_range(100.0..=1200.0)
                .map(|v| info.provide_pitot_pressure(hectopascal_to_pascal(v))),
            'S' => line
                .read_checked_range(0.0..=500.0)
                .map(|v| info.provide_true_airspeed(kmh_to_mps(v))),
            'T' => line.read_checked_range(-50.0..=100.0).map(|v| {
                info.temperature = v;
                info.temperature_available = true;
            }),
            'V' => line
                .read_checked_range(0.0..=30.0)
                .map(|v| info.provide_voltage(v)),
            _ => {
                log_trace!("unknown POV field {}", kind);
                line.skip(1);
                None
            }
        };
        any |= stored.is_some();
    }
    any
}

/// `$PLARW,<dir>,<R|T>,<speed>,<N|K|M>,<A|I>,<status>`
///
/// Average wind goes to `external_wind`, instantaneous wind to
/// `external_instantaneous_wind`.
pub fn parse_plarw(mut line: NmeaInputLine<'_>, info: &mut NmeaInfo) -> bool {
    let Some(direction) = line.read_checked_range(0.0f32..=360.0) else {
        return false;
    };
    // relative or true, both treated as true
    line.skip(1);
    let Some(speed) = line.read_checked_range(0.0f32..=500.0) else {
        return false;
    };
    let speed = match line.read_one_char() {
        Some('N') => knots_to_mps(speed),
        Some('K') => kmh_to_mps(speed),
        Some('M') => speed,
        _ => return false,
    };
    let average = match line.read_one_char() {
        Some('A') => true,
        Some('I') => false,
        _ => return false,
    };
    if line.read_one_char() == Some('V') {
        return false;
    }

    let wind = SpeedVector::new(normalize_bearing(direction), speed);
    if average {
        info.provide_external_wind(wind);
    } else {
        info.provide_external_instantaneous_wind(wind);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pov(line: &str) -> (bool, NmeaInfo) {
        let mut info = NmeaInfo::default();
        info.clock = 3.0;
        let mut input = NmeaInputLine::new(line);
        assert!(input.read_compare("$POV"));
        (parse_pov(input, &mut info), info)
    }

    fn plarw(line: &str) -> (bool, NmeaInfo) {
        let mut info = NmeaInfo::default();
        let mut input = NmeaInputLine::new(line);
        assert!(input.read_compare("$PLARW"));
        (parse_plarw(input, &mut info), info)
    }

    #[test]
    fn pov_all_fields() {
        let (ok, info) = pov("$POV,E,-1.5,H,45,P,1013.25,Q,120,R,1014.5,S,108,T,21.5,V,12.6*00");
        assert!(ok);
        assert_relative_eq!(info.total_energy_vario, -1.5);
        assert_relative_eq!(info.humidity, 45.0);
        assert_relative_eq!(info.static_pressure, 101_325.0, epsilon = 0.1);
        assert_relative_eq!(info.dynamic_pressure, 120.0);
        assert_relative_eq!(info.pitot_pressure, 101_450.0, epsilon = 0.1);
        assert_relative_eq!(info.true_airspeed, 30.0, epsilon = 1e-4);
        assert!(info.airspeed_real);
        assert_relative_eq!(info.temperature, 21.5);
        assert_relative_eq!(info.voltage, 12.6);
        assert_eq!(info.voltage_available.last_update(), Some(3.0));
    }

    #[test]
    fn pov_bad_field_keeps_the_rest() {
        let (ok, info) = pov("$POV,S,9999,Z,1,T,abc,E,0.5");
        assert!(ok);
        assert!(!info.airspeed_available.is_valid());
        assert!(!info.temperature_available);
        assert_relative_eq!(info.total_energy_vario, 0.5);

        let (ok, _) = pov("$POV,S,");
        assert!(!ok);
    }

    #[test]
    fn plarw_units_and_kind() {
        let (ok, info) = plarw("$PLARW,270,T,20,K,A,A*3C");
        assert!(ok);
        assert_relative_eq!(info.external_wind.bearing, 270.0);
        assert_relative_eq!(info.external_wind.norm, kmh_to_mps(20.0));
        assert!(!info.external_instantaneous_wind_available.is_valid());

        let (ok, info) = plarw("$PLARW,360,T,10,N,I,A");
        assert!(ok);
        assert_relative_eq!(info.external_instantaneous_wind.bearing, 0.0);
        assert_relative_eq!(info.external_instantaneous_wind.norm, knots_to_mps(10.0));
    }

    #[test]
    fn plarw_rejects_invalid() {
        assert!(!plarw("$PLARW,400,T,10,M,A,A").0);
        assert!(!plarw("$PLARW,90,T,10,X,A,A").0);
        assert!(!plarw("$PLARW,90,T,10,M,Q,A").0);
        assert!(!plarw("$PLARW,90,T,10,M,A,V").0);
        assert!(!plarw("$PLARW,90,T,,M,A,A").0);
    }
}
