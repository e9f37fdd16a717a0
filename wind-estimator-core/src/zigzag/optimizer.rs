use nalgebra::{Matrix2, Vector2};

/// Parameters of the derivative-free trust-region minimiser.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrustRegion {
    pub initial_radius: f32,
    pub final_radius: f32,
    /// Every component of the solution stays within ±bound.
    pub bound: f32,
    pub max_evaluations: usize,
}

impl Default for TrustRegion {
    fn default() -> Self {
        Self {
            initial_radius: 2.0,
            final_radius: 0.01,
            bound: 30.0,
            max_evaluations: 600,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Minimum {
    pub x: Vector2<f32>,
    pub value: f32,
    pub evaluations: usize,
}

/// q(d) = c + gᵀd + ½ dᵀ H d around the current iterate.
#[derive(Debug, Clone, Copy)]
struct QuadraticModel {
    g: Vector2<f32>,
    h: Matrix2<f32>,
}

/// Interpolation stencil, scaled by the trust radius ρ:
/// centre, ±ρe₁, ±ρe₂ and ρ(e₁+e₂). Six points fix the six coefficients of
/// a 2-D quadratic exactly.
const STENCIL: [(f32, f32); 5] = [(1.0, 0.0), (-1.0, 0.0), (0.0, 1.0), (0.0, -1.0), (1.0, 1.0)];

/// Number of directions tried on the trust region boundary when the model
/// Hessian is not positive definite.
const BOUNDARY_DIRECTIONS: usize = 36;

impl QuadraticModel {
    fn fit(f0: f32, f: &[f32; 5], rho: f32) -> Self {
        let [fxp, fxm, fyp, fym, fxy] = *f;
        let gx = (fxp - fxm) / (2.0 * rho);
        let gy = (fyp - fym) / (2.0 * rho);
        let hxx = (fxp + fxm - 2.0 * f0) / (rho * rho);
        let hyy = (fyp + fym - 2.0 * f0) / (rho * rho);
        let hxy = (fxy - f0 - rho * (gx + gy) - 0.5 * rho * rho * (hxx + hyy)) / (rho * rho);
        Self {
            g: Vector2::new(gx, gy),
            h: Matrix2::new(hxx, hxy, hxy, hyy),
        }
    }

    /// Predicted change q(d) − q(0).
    fn change(&self, d: &Vector2<f32>) -> f32 {
        self.g.dot(d) + 0.5 * d.dot(&(self.h * d))
    }

    /// Minimiser of the model within |d| ≤ ρ: the Newton step when it is
    /// inside and the model is convex, otherwise the best boundary point.
    fn step(&self, rho: f32) -> Vector2<f32> {
        let positive_definite = self.h[(0, 0)] > 0.0 && self.h.determinant() > 0.0;
        if positive_definite {
            if let Some(inv) = self.h.try_inverse() {
                let newton = -(inv * self.g);
                if newton.norm() <= rho {
                    return newton;
                }
            }
        }

        let mut best = Vector2::zeros();
        let mut best_change = 0.0;
        for i in 0..BOUNDARY_DIRECTIONS {
            let angle = i as f32 * (core::f32::consts::TAU / BOUNDARY_DIRECTIONS as f32);
            let d = Vector2::new(rho * angle.cos(), rho * angle.sin());
            let change = self.change(&d);
            if change < best_change {
                best_change = change;
                best = d;
            }
        }
        best
    }
}

fn clamp_to_box(x: Vector2<f32>, bound: f32) -> Vector2<f32> {
    x.map(|v| v.clamp(-bound, bound))
}

/// Minimises `f` over the box `[-bound, bound]²` starting at `start`.
///
/// Each iteration samples `f` on a stencil of radius ρ around the iterate,
/// fits a quadratic model and evaluates the model minimiser. The radius is
/// enlarged after a step the model predicted well and halved after a
/// failure, until it drops below `final_radius`.
pub fn minimize(
    mut f: impl FnMut(&Vector2<f32>) -> f32,
    start: Vector2<f32>,
    config: &TrustRegion,
) -> Minimum {
    let mut eval = |x: &Vector2<f32>| {
        let v = f(x);
        if v.is_finite() { v } else { f32::INFINITY }
    };

    let mut x = clamp_to_box(start, config.bound);
    let mut fx = eval(&x);
    let mut evaluations = 1;
    let mut rho = config.initial_radius;

    while rho >= config.final_radius && evaluations + STENCIL.len() + 1 <= config.max_evaluations {
        let mut samples = [0.0f32; 5];
        let mut best_sample: Option<(Vector2<f32>, f32)> = None;
        for (value, (sx, sy)) in samples.iter_mut().zip(STENCIL.iter()) {
            let p = x + Vector2::new(sx * rho, sy * rho);
            *value = eval(&p);
            let inside = clamp_to_box(p, config.bound) == p;
            if inside && *value < best_sample.map_or(fx, |(_, v)| v) {
                best_sample = Some((p, *value));
            }
        }
        evaluations += STENCIL.len();

        if samples.iter().any(|v| !v.is_finite()) || !fx.is_finite() {
            // cannot fit a model through infinities, fall back to the stencil
            match best_sample {
                Some((p, v)) => {
                    x = p;
                    fx = v;
                }
                None => rho *= 0.5,
            }
            continue;
        }

        let model = QuadraticModel::fit(fx, &samples, rho);
        let d = model.step(rho);
        let trial = clamp_to_box(x + d, config.bound);
        let actual_step = trial - x;
        let f_trial = eval(&trial);
        evaluations += 1;

        let predicted = -model.change(&actual_step);
        let improvement = fx - f_trial;
        let ratio = if predicted > 0.0 { improvement / predicted } else { 0.0 };

        let (best_x, best_f) = match best_sample {
            Some((p, v)) if v < f_trial => (p, v),
            _ => (trial, f_trial),
        };

        if best_f < fx {
            x = best_x;
            fx = best_f;
            if ratio > 0.75 && actual_step.norm() > 0.99 * rho {
                rho = (2.0 * rho).min(config.bound);
            } else if ratio < 0.1 {
                rho *= 0.5;
            }
        } else {
            rho *= 0.5;
        }
    }

    Minimum {
        x,
        value: fx,
        evaluations,
    }
}
