use wind_estimator_core::{NmeaInfo, RadioFrequency};

use super::init_logger;
use crate::{
    AnemoiDevice, Ar62xxDevice, Device, NmeaDevice, anemoi::tests::anemoi_frame,
    ar62xx::encode_frequency_command, checksum::append_nmea_checksum,
};

fn nmea_log() -> Vec<u8> {
    let mut log = Vec::new();
    log.extend_from_slice(b"garbage\r\n");
    log.extend_from_slice(
        b"$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A\r\n",
    );
    for body in ["$POV,E,1.2,S,95.5", "$PLARW,250,T,15,K,I,A", "$POV,T,12,P,950"] {
        let mut line = heapless::Vec::<u8, 128>::new();
        line.extend_from_slice(body.as_bytes()).unwrap();
        append_nmea_checksum(&mut line).unwrap();
        log.extend_from_slice(&line);
    }
    log.extend_from_slice(b"$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n");
    log
}

fn anemoi_log() -> Vec<u8> {
    let mut log = vec![0x00, b'$', b'x'];
    log.extend(anemoi_frame(b'W', &[0x00, 0xB4, 20, 0x00, 0xAA, 25, 0x00, 10]));
    log.extend(anemoi_frame(b'S', &[1, 2]));
    log.extend(anemoi_frame(
        b'D',
        &[0x00, 80, 0x00, 95, 0x01, 0x2C, 0x01, 0x27, 12, 3, 0x00, 80],
    ));
    log.extend(anemoi_frame(b'A', &[0x00, 0x05, 0xFE, 0x01, 0x27, 0x00, 0x40]));
    log
}

fn ar62xx_log() -> Vec<u8> {
    let mut log = vec![0x13, 0xA5, 0x00];
    let khz = RadioFrequency::from_kilohertz;
    log.extend_from_slice(&encode_frequency_command(khz(119_100), khz(123_500)).unwrap());
    log.extend_from_slice(&encode_frequency_command(khz(122_475), khz(123_500)).unwrap());
    log
}

/// Replays `log` in chunks of `chunk` bytes.
fn replay(device: &mut impl Device, log: &[u8], chunk: usize) -> NmeaInfo {
    let mut info = NmeaInfo::default();
    info.clock = 1.0;
    for part in log.chunks(chunk) {
        device.data_received(part, &mut info);
    }
    info
}

fn assert_split_invariant<D: Device>(make: impl Fn() -> D, log: &[u8]) -> NmeaInfo {
    init_logger();
    let whole = replay(&mut make(), log, log.len());
    for chunk in 1..log.len() {
        assert_eq!(whole, replay(&mut make(), log, chunk), "chunk size {}", chunk);
    }
    whole
}

#[test]
fn nmea_stream_is_split_invariant() {
    let info = assert_split_invariant(NmeaDevice::new, &nmea_log());
    assert!(info.time_available.is_valid());
    assert!(info.gps_altitude_available.is_valid());
    assert!(info.total_energy_vario_available.is_valid());
    assert!(info.external_instantaneous_wind_available.is_valid());
    assert!(info.temperature_available);
    assert!(info.static_pressure_available.is_valid());
}

#[test]
fn anemoi_stream_is_split_invariant() {
    let info = assert_split_invariant(AnemoiDevice::new, &anemoi_log());
    assert!(info.external_wind_available.is_valid());
    assert!(info.ground_speed_available.is_valid());
    assert!(info.attitude.bank_angle_available.is_valid());
    assert!(info.baro_altitude_available.is_valid());
}

#[test]
fn ar62xx_stream_is_split_invariant() {
    let info = assert_split_invariant(Ar62xxDevice::new, &ar62xx_log());
    assert_eq!(
        info.radio.active_frequency,
        Some(RadioFrequency::from_kilohertz(122_475))
    );
}
