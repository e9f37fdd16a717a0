#[allow(unused_imports)]
use micromath::F32Ext;

/// Relative standard deviation below which a series counts as constant.
const DEGENERATE_SPREAD: f32 = 1e-4;

/// Pearson correlation coefficient of paired samples.
///
/// `None` when there are fewer than two pairs or either series is constant,
/// in which case the coefficient is undefined.
pub fn pearson(pairs: impl Iterator<Item = (f32, f32)> + Clone) -> Option<f32> {
    let mut n = 0u32;
    let mut sum_a = 0.0f32;
    let mut sum_b = 0.0f32;
    for (a, b) in pairs.clone() {
        n += 1;
        sum_a += a;
        sum_b += b;
    }
    if n < 2 {
        return None;
    }
    let mean_a = sum_a / n as f32;
    let mean_b = sum_b / n as f32;

    let mut cov = 0.0f32;
    let mut var_a = 0.0f32;
    let mut var_b = 0.0f32;
    for (a, b) in pairs {
        let da = a - mean_a;
        let db = b - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    let is_constant = |var: f32, mean: f32| {
        let spread = DEGENERATE_SPREAD * mean.abs().max(1.0);
        var / n as f32 <= spread * spread
    };
    if is_constant(var_a, mean_a) || is_constant(var_b, mean_b) {
        return None;
    }

    Some(cov / (var_a.sqrt() * var_b.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn perfect_and_inverse_correlation() {
        let a = [1.0f32, 2.0, 3.0, 4.0];
        let up = a.iter().map(|&x| (x, 2.0 * x + 1.0));
        assert_relative_eq!(pearson(up).unwrap(), 1.0, epsilon = 1e-5);
        let down = a.iter().map(|&x| (x, -x));
        assert_relative_eq!(pearson(down).unwrap(), -1.0, epsilon = 1e-5);
    }

    #[test]
    fn constant_series_is_undefined() {
        let a = [1.0f32, 2.0, 3.0];
        assert_eq!(pearson(a.iter().map(|&x| (x, 27.0))), None);
        assert_eq!(pearson(core::iter::once((1.0, 1.0))), None);
    }

    #[test]
    fn uncorrelated_is_small() {
        let pairs = [(1.0f32, 1.0f32), (2.0, -1.0), (3.0, -1.0), (4.0, 1.0)];
        assert_relative_eq!(pearson(pairs.iter().copied()).unwrap(), 0.0, epsilon = 1e-6);
    }
}
