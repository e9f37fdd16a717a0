use nalgebra::{Matrix3, RowVector3, Vector2, Vector3};

use crate::settings::EkfSettings;

/// Extended Kalman filter estimating wind and airspeed calibration from GPS
/// ground velocity and true airspeed, without heading.
///
/// State vector  x = [ w_n, w_e, sf ]ᵀ  (units: m s⁻¹, m s⁻¹, –)
/// Measurement z = tas²
///
/// Process model (one step per accepted sample):
///     xₖ₊₁ = xₖ + w,   w ~ 𝒩(0,Q)
///
/// Measurement model, with d = v_gps − (w_n, w_e):
///     h(x) = sf · |d|²
///     H    = ∂h/∂x = [ −2·sf·d_n, −2·sf·d_e, |d|² ]
///
/// The published wind is −(w_n, w_e).
#[derive(Debug, Clone)]
pub struct WindEkf {
    /// Current state estimate
    x: Vector3<f32>,
    /// Estimate covariance
    p: Matrix3<f32>,
    /// Process-noise covariance G Q Gᵀ
    q: Matrix3<f32>,
    /// Prior covariance restored on reset
    p0: Matrix3<f32>,
    airspeed_noise_std: f32,
}

impl WindEkf {
    pub fn new(settings: &EkfSettings) -> Self {
        let q = Matrix3::from_diagonal(&Vector3::new(
            settings.wind_process_variance,
            settings.wind_process_variance,
            settings.scale_factor_process_variance,
        ));
        let p0 = Matrix3::from_diagonal(&Vector3::new(
            settings.initial_wind_variance,
            settings.initial_wind_variance,
            settings.initial_scale_factor_variance,
        ));

        Self {
            x: Self::prior_state(),
            p: p0,
            q,
            p0,
            airspeed_noise_std: settings.airspeed_noise_std,
        }
    }

    fn prior_state() -> Vector3<f32> {
        Vector3::new(0.0, 0.0, 1.0)
    }

    /// Back to the high uncertainty prior: no wind, scale factor 1.
    pub fn reset(&mut self) {
        self.x = Self::prior_state();
        self.p = self.p0;
    }

    /// P₋ = F P Fᵀ + G Q Gᵀ with F = I. The state mean does not move.
    pub fn predict_covariance(&mut self) {
        self.p += self.q;
    }

    /// Serial scalar update with one (ground velocity, tas) pair.
    ///
    /// Returns false and leaves the state untouched when the innovation
    /// covariance is not positive or the result would not be finite.
    pub fn correct(&mut self, ground_velocity: &Vector2<f32>, true_airspeed: f32) -> bool {
        if !(true_airspeed > 0.0) || !true_airspeed.is_finite() {
            return false;
        }

        let sf = self.x[2];
        let d = ground_velocity - self.x.xy();
        let d2 = d.norm_squared();

        let z = true_airspeed * true_airspeed;
        // innovation y = z − h(x̂₋)
        let y = z - sf * d2;

        let h = RowVector3::new(-2.0 * sf * d.x, -2.0 * sf * d.y, d2);

        // var(tas²) ≈ (2·tas·σ)²
        let r = {
            let sigma = 2.0 * true_airspeed * self.airspeed_noise_std;
            sigma * sigma
        };

        let ph = self.p * h.transpose();
        // innovation covariance S = H P₋ Hᵀ + R
        let s = (h * ph)[(0, 0)] + r;
        if !(s > 0.0) || !s.is_finite() {
            log_warn!("skipping wind correction, innovation covariance {}", s);
            return false;
        }

        // Kalman gain K = P₋ Hᵀ S⁻¹
        let k = ph / s;

        let x = self.x + k * y;
        // P = (I − K H) P₋
        let mut p = self.p - k * (h * self.p);
        p = 0.5 * (p + p.transpose());

        if !x.iter().all(|v| v.is_finite()) || !p.iter().all(|v| v.is_finite()) {
            log_warn!("skipping wind correction, non finite result");
            return false;
        }

        self.x = x;
        self.p = p;
        true
    }

    /// Estimated wind state (w_n, w_e). The physical wind is the negation.
    pub fn wind_state(&self) -> Vector2<f32> {
        self.x.xy()
    }

    pub fn scale_factor(&self) -> f32 {
        self.x[2]
    }

    pub fn covariance(&self) -> &Matrix3<f32> {
        &self.p
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn prior() -> WindEkf {
        WindEkf::new(&EkfSettings::default())
    }

    #[test]
    fn starts_at_prior() {
        let ekf = prior();
        assert_eq!(ekf.wind_state(), Vector2::zeros());
        assert_relative_eq!(ekf.scale_factor(), 1.0);
        assert_relative_eq!(ekf.covariance()[(0, 0)], 100.0);
        assert_relative_eq!(ekf.covariance()[(2, 2)], 1e-2);
    }

    #[test]
    fn zero_airspeed_is_refused() {
        let mut ekf = prior();
        assert!(!ekf.correct(&Vector2::new(10.0, 0.0), 0.0));
        assert!(!ekf.correct(&Vector2::new(10.0, 0.0), f32::NAN));
        assert_eq!(ekf.wind_state(), Vector2::zeros());
        assert_eq!(*ekf.covariance(), prior().p0);
    }

    #[test]
    fn zero_innovation_covariance_skips_correction() {
        let mut ekf = WindEkf::new(&EkfSettings {
            airspeed_noise_std: 0.0,
            ..EkfSettings::default()
        });
        let x = ekf.x;
        let p = ekf.p;

        // ground velocity equal to the wind state makes H zero, and with a
        // noiseless airspeed S is exactly zero
        let ground_velocity = ekf.wind_state();
        assert!(!ekf.correct(&ground_velocity, 20.0));
        assert_eq!(ekf.x, x);
        assert_eq!(ekf.p, p);
    }

    #[test]
    fn correction_keeps_covariance_symmetric_and_shrinking() {
        let mut ekf = prior();
        let before = ekf.covariance().trace();
        assert!(ekf.correct(&Vector2::new(25.0, 3.0), 27.0));
        let p = ekf.covariance();
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(p[(i, j)], p[(j, i)], epsilon = 1e-6);
            }
            assert!(p[(i, i)] >= 0.0);
        }
        assert!(p.trace() < before);
    }

    #[test]
    fn covariance_prediction_adds_process_noise() {
        let mut ekf = prior();
        ekf.predict_covariance();
        assert_relative_eq!(ekf.covariance()[(0, 0)], 100.1, epsilon = 1e-4);
        assert_relative_eq!(ekf.covariance()[(2, 2)], 1e-2 + 1e-4, epsilon = 1e-7);
    }

    #[test]
    fn reset_restores_prior() {
        let mut ekf = prior();
        ekf.correct(&Vector2::new(25.0, 3.0), 22.0);
        ekf.reset();
        assert_eq!(ekf.wind_state(), Vector2::zeros());
        assert_eq!(*ekf.covariance(), prior().p0);
    }
}
