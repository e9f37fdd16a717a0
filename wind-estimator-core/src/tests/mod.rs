#[cfg(feature = "log")]
use log::LevelFilter;

mod scenario;

pub use flight_simulator::FlightSimulator;

pub fn init_logger() {
    #[cfg(feature = "log")]
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Warn)
        .filter(Some("wind_estimator_core"), LevelFilter::Trace)
        .is_test(true)
        .try_init();
}
