//! Wind-climate statistics: percentiles, mean power density and
//! maximum-likelihood Weibull fitting.

/// Minimum sample count below which no Weibull fit is attempted.
pub const MIN_WEIBULL_SAMPLES: usize = 20;

/// A fitted two-parameter Weibull distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeibullFit {
    /// Shape parameter k (dimensionless).
    pub shape: f64,
    /// Scale parameter c, in the unit of the samples (m/s).
    pub scale: f64,
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Linear-interpolation percentile of an ascending-sorted slice.
///
/// `q` is in percent (e.g. 50 for the median). `None` for an empty slice.
pub fn percentile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Mean wind power density `0.5 * rho * mean(v^3)` in W/m².
pub fn mean_power_density(speeds: &[f64], rho: f64) -> Option<f64> {
    if speeds.is_empty() {
        return None;
    }
    let cubed_mean = speeds.iter().map(|v| v * v * v).sum::<f64>() / speeds.len() as f64;
    Some(0.5 * rho * cubed_mean)
}

/// Fits a two-parameter Weibull distribution (location fixed at zero) to
/// the strictly-positive samples by maximum likelihood.
///
/// The shape parameter solves
/// `sum(x^k ln x) / sum(x^k) - 1/k - mean(ln x) = 0`,
/// found with Newton iteration; the scale follows in closed form. Returns
/// `None` when fewer than [`MIN_WEIBULL_SAMPLES`] positive samples remain
/// or the iteration does not land on a usable root.
pub fn fit_weibull(speeds: &[f64]) -> Option<WeibullFit> {
    let samples: Vec<f64> = speeds
        .iter()
        .copied()
        .filter(|v| v.is_finite() && *v > 0.0)
        .collect();
    if samples.len() < MIN_WEIBULL_SAMPLES {
        return None;
    }

    let n = samples.len() as f64;
    let ln_mean = samples.iter().map(|x| x.ln()).sum::<f64>() / n;

    let mut shape = 1.0_f64;
    for _ in 0..100 {
        let mut sum_xk = 0.0;
        let mut sum_xk_ln = 0.0;
        let mut sum_xk_ln2 = 0.0;
        for &x in &samples {
            let xk = x.powf(shape);
            let lx = x.ln();
            sum_xk += xk;
            sum_xk_ln += xk * lx;
            sum_xk_ln2 += xk * lx * lx;
        }

        let g = sum_xk_ln / sum_xk - 1.0 / shape - ln_mean;
        let g_prime =
            (sum_xk_ln2 * sum_xk - sum_xk_ln * sum_xk_ln) / (sum_xk * sum_xk) + 1.0 / (shape * shape);
        if !g_prime.is_finite() || g_prime == 0.0 {
            return None;
        }

        let mut next = shape - g / g_prime;
        if !next.is_finite() {
            return None;
        }
        // Keep the iterate in the valid domain.
        if next <= 0.0 {
            next = shape / 2.0;
        }
        let converged = (next - shape).abs() < 1e-10 * shape.max(1.0);
        shape = next;
        if converged {
            break;
        }
    }

    if !shape.is_finite() || shape <= 0.0 {
        return None;
    }
    let scale = (samples.iter().map(|x| x.powf(shape)).sum::<f64>() / n).powf(1.0 / shape);
    if !scale.is_finite() || scale <= 0.0 {
        return None;
    }
    Some(WeibullFit { shape, scale })
}
