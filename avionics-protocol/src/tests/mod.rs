#[cfg(feature = "log")]
use log::LevelFilter;

mod device_streams;

pub fn init_logger() {
    #[cfg(feature = "log")]
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Warn)
        .filter(Some("avionics_protocol"), LevelFilter::Trace)
        .is_test(true)
        .try_init();
}
