use crate::{
    blackboard::{DerivedInfo, NmeaInfo, SpeedVector},
    units::{bearing_delta, knots_to_mps},
};

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MonitorKind {
    Wind { last_wind: SpeedVector },
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Notification {
    SignificantWindChange { wind: SpeedVector },
}

impl Notification {
    pub fn message(&self) -> &'static str {
        match self {
            Notification::SignificantWindChange { .. } => "Significant wind change",
        }
    }
}

/// Periodic rule evaluated against the derived state. Checks at most every
/// `check_interval` seconds and notifies at most every
/// `notification_interval` seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionMonitor {
    kind: MonitorKind,
    check_interval: f64,
    notification_interval: f64,
    last_check: Option<f64>,
    last_notification: Option<f64>,
}

impl ConditionMonitor {
    pub fn new(kind: MonitorKind, check_interval: f64, notification_interval: f64) -> Self {
        Self {
            kind,
            check_interval,
            notification_interval,
            last_check: None,
            last_notification: None,
        }
    }

    pub fn wind() -> Self {
        Self::new(
            MonitorKind::Wind {
                last_wind: SpeedVector::zero(),
            },
            10.0,
            300.0,
        )
    }

    pub fn kind(&self) -> &MonitorKind {
        &self.kind
    }

    pub fn update(&mut self, basic: &NmeaInfo, derived: &DerivedInfo) -> Option<Notification> {
        if !derived.flight.flying {
            return None;
        }
        let now = basic.clock;
        if now <= 0.0 {
            return None;
        }

        let restart = match self.last_check {
            Some(last) if now >= last => {
                if now < last + self.check_interval {
                    return None;
                }
                false
            }
            _ => {
                self.last_notification = None;
                true
            }
        };
        self.last_check = Some(now);

        let mut notification = None;
        if !restart && self.check_condition(derived) && self.notification_due(now) {
            self.last_notification = Some(now);
            notification = Some(self.notification(derived));
        }

        if restart || notification.is_some() {
            self.save_last(derived);
        }
        notification
    }

    fn notification_due(&self, now: f64) -> bool {
        match self.last_notification {
            Some(last) if now >= last => now >= last + self.notification_interval,
            _ => true,
        }
    }

    fn check_condition(&self, derived: &DerivedInfo) -> bool {
        match &self.kind {
            MonitorKind::Wind { last_wind } => {
                if !derived.wind_available.is_valid() {
                    return false;
                }
                let wind = derived.wind;
                let speed_change = (wind.norm - last_wind.norm).abs();
                if speed_change > knots_to_mps(5.0) {
                    return true;
                }
                wind.norm > knots_to_mps(10.0)
                    && bearing_delta(last_wind.bearing, wind.bearing).abs() > 45.0
            }
        }
    }

    fn notification(&self, derived: &DerivedInfo) -> Notification {
        match self.kind {
            MonitorKind::Wind { .. } => Notification::SignificantWindChange { wind: derived.wind },
        }
    }

    fn save_last(&mut self, derived: &DerivedInfo) {
        match &mut self.kind {
            MonitorKind::Wind { last_wind } => *last_wind = derived.wind,
        }
    }
}
