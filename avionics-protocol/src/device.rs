use wind_estimator_core::NmeaInfo;

/// A driver for one serial link.
///
/// Bytes arrive in whatever chunks the port hands out. Implementations
/// buffer partial frames internally and write decoded values into `info`
/// using `info.clock` as the update time.
pub trait Device {
    /// Returns true if at least one valid frame was decoded from `data`.
    fn data_received(&mut self, data: &[u8], info: &mut NmeaInfo) -> bool;

    /// Drops any partially received frame.
    fn reset(&mut self);
}
