//! Quadrature rules used by the rate integrals.
//!
//! Three rules are provided. `integrate_adaptive` is a globally adaptive 7/15-point
//! Gauss–Kronrod scheme for vector-valued integrands: every batch entry shares
//! one subdivision tree, and the integrand fills one output slot per entry at
//! each node. `simpson` is the composite Simpson rule on uniformly spaced samples.
//! `filon_trapezoid` integrates a slowly varying amplitude times e^{iωx} on
//! arbitrary nodes, however many oscillations fall between two of them.

use crate::error::DmLimitError;
use num_complex::Complex64;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Kronrod abscissae on [−1, 1] (non-negative half, descending).
const XGK: [f64; 8] = [
    0.991_455_371_120_812_6,
    0.949_107_912_342_758_5,
    0.864_864_423_359_769_1,
    0.741_531_185_599_394_4,
    0.586_087_235_467_691_1,
    0.405_845_151_377_397_2,
    0.207_784_955_007_898_5,
    0.0,
];

/// Kronrod weights matching `XGK`.
const WGK: [f64; 8] = [
    0.022_935_322_010_529_22,
    0.063_092_092_629_978_55,
    0.104_790_010_322_250_2,
    0.140_653_259_715_525_9,
    0.169_004_726_639_267_9,
    0.190_350_578_064_785_4,
    0.204_432_940_075_298_9,
    0.209_482_141_084_727_8,
];

/// Gauss weights for the odd-indexed Kronrod abscissae (`XGK[1]`, `XGK[3]`, `XGK[5]`, `XGK[7]`).
const WG: [f64; 4] = [
    0.129_484_966_168_869_7,
    0.279_705_391_489_276_7,
    0.381_830_050_505_118_9,
    0.417_959_183_673_469_4,
];

/// Fraction of ∫|f| below which a batch entry is considered to have cancelled to zero.
pub(crate) const CANCELLATION_FLOOR: f64 = 1.0e-4;

/// Tolerances and budget of the adaptive Gauss–Kronrod integrator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveOptions {
    /// Absolute error target per batch entry.
    pub epsabs: f64,
    /// Relative error target per batch entry.
    pub epsrel: f64,
    /// Number of equal panels the domain is split into before adapting.
    pub initial_intervals: usize,
    /// Maximum number of intervals in the subdivision tree.
    pub max_subdivisions: usize,
}

impl Default for AdaptiveOptions {
    fn default() -> Self {
        Self {
            epsabs: 0.0,
            epsrel: 1.0e-4,
            initial_intervals: 16,
            max_subdivisions: 4_000,
        }
    }
}

/// One panel of the subdivision tree with its per-entry estimates.
struct Panel {
    a: f64,
    b: f64,
    integral: Vec<f64>,
    abs_integral: Vec<f64>,
    error: Vec<f64>,
    priority: f64,
}

impl PartialEq for Panel {
    fn eq(&self, other: &Self) -> bool {
        self.priority.total_cmp(&other.priority) == Ordering::Equal
    }
}

impl Eq for Panel {}

impl PartialOrd for Panel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Panel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority.total_cmp(&other.priority)
    }
}

/// Applies the 15-point Kronrod rule and embedded 7-point Gauss rule on [a, b].
///
/// `f(x, out)` must write the integrand of every batch entry at `x` into `out`.
fn kronrod_panel<F>(f: &F, a: f64, b: f64, dim: usize, scratch: &mut [f64]) -> Panel
where
    F: Fn(f64, &mut [f64]),
{
    let center = 0.5 * (a + b);
    let half = 0.5 * (b - a);

    let mut kronrod = vec![0.0; dim];
    let mut gauss = vec![0.0; dim];
    let mut abs_integral = vec![0.0; dim];

    f(center, scratch);
    for i in 0..dim {
        kronrod[i] = WGK[7] * scratch[i];
        gauss[i] = WG[3] * scratch[i];
        abs_integral[i] = WGK[7] * scratch[i].abs();
    }

    for k in 0..7 {
        let dx = half * XGK[k];
        let gauss_weight = if k % 2 == 1 { WG[k / 2] } else { 0.0 };
        for x in [center - dx, center + dx] {
            f(x, scratch);
            for i in 0..dim {
                kronrod[i] += WGK[k] * scratch[i];
                gauss[i] += gauss_weight * scratch[i];
                abs_integral[i] += WGK[k] * scratch[i].abs();
            }
        }
    }

    let width = half.abs();
    let mut error = vec![0.0; dim];
    for i in 0..dim {
        kronrod[i] *= half;
        abs_integral[i] *= width;
        error[i] = (kronrod[i] - gauss[i] * half).abs();
    }

    Panel {
        a,
        b,
        integral: kronrod,
        abs_integral,
        error,
        priority: 0.0,
    }
}

fn tolerance(options: &AdaptiveOptions, integral: f64, abs_integral: f64) -> f64 {
    let scale = integral.abs().max(CANCELLATION_FLOOR * abs_integral);
    options.epsabs.max(options.epsrel * scale)
}

/// Integrates a vector-valued function over [a, b] with global adaptive
/// Gauss–Kronrod subdivision.
///
/// Every batch entry must meet `max(epsabs, epsrel·|I|)` before the routine
/// returns. Entries whose integrand cancels almost completely are measured
/// against a small fraction of ∫|f| instead of |I|.
///
/// # Errors
///
/// Returns `DmLimitError::IntegrationNotConverged` when the subdivision budget
/// is exhausted first.
pub fn integrate_adaptive<F>(
    f: F,
    a: f64,
    b: f64,
    dim: usize,
    options: &AdaptiveOptions,
) -> Result<Vec<f64>, DmLimitError>
where
    F: Fn(f64, &mut [f64]),
{
    if dim == 0 || a == b {
        return Ok(vec![0.0; dim]);
    }

    let mut scratch = vec![0.0; dim];
    let initial = options.initial_intervals.max(1);
    let step = (b - a) / initial as f64;

    let mut panels: Vec<Panel> = (0..initial)
        .map(|k| {
            let lo = a + step * k as f64;
            let hi = if k + 1 == initial { b } else { lo + step };
            kronrod_panel(&f, lo, hi, dim, &mut scratch)
        })
        .collect();

    let mut total = vec![0.0; dim];
    let mut total_abs = vec![0.0; dim];
    let mut total_error = vec![0.0; dim];
    for panel in &panels {
        for i in 0..dim {
            total[i] += panel.integral[i];
            total_abs[i] += panel.abs_integral[i];
            total_error[i] += panel.error[i];
        }
    }

    // Per-entry scales are frozen after the first pass so panel priorities stay comparable.
    let scale: Vec<f64> = (0..dim)
        .map(|i| {
            let s = total[i].abs().max(CANCELLATION_FLOOR * total_abs[i]);
            if s > 0.0 { s } else { f64::MIN_POSITIVE }
        })
        .collect();
    let priority = |panel: &Panel| {
        panel
            .error
            .iter()
            .zip(&scale)
            .map(|(e, s)| e / s)
            .fold(0.0, f64::max)
    };

    let mut heap = BinaryHeap::with_capacity(options.max_subdivisions + 2);
    for mut panel in panels.drain(..) {
        panel.priority = priority(&panel);
        heap.push(panel);
    }

    loop {
        let converged = (0..dim)
            .all(|i| total_error[i] <= tolerance(options, total[i], total_abs[i]));
        if converged {
            break;
        }

        if heap.len() >= options.max_subdivisions {
            let worst = (0..dim)
                .map(|i| total_error[i] / scale[i])
                .fold(0.0, f64::max);
            return Err(DmLimitError::IntegrationNotConverged {
                subdivisions: heap.len(),
                error: worst,
            });
        }

        let Some(parent) = heap.pop() else {
            break;
        };
        let mid = 0.5 * (parent.a + parent.b);
        let mut left = kronrod_panel(&f, parent.a, mid, dim, &mut scratch);
        let mut right = kronrod_panel(&f, mid, parent.b, dim, &mut scratch);

        for i in 0..dim {
            total[i] += left.integral[i] + right.integral[i] - parent.integral[i];
            total_abs[i] += left.abs_integral[i] + right.abs_integral[i] - parent.abs_integral[i];
            total_error[i] += left.error[i] + right.error[i] - parent.error[i];
        }

        left.priority = priority(&left);
        right.priority = priority(&right);
        heap.push(left);
        heap.push(right);
    }

    tracing::trace!(panels = heap.len(), entries = dim, "adaptive quadrature converged");

    let mut result = vec![0.0; dim];
    for panel in heap.iter() {
        for i in 0..dim {
            result[i] += panel.integral[i];
        }
    }
    Ok(result)
}

/// Composite Simpson rule for samples `y` taken with uniform spacing `dx`.
///
/// An even number of samples closes the last interval with the trapezoid rule.
pub fn simpson(y: &[f64], dx: f64) -> f64 {
    let n = y.len();
    if n < 2 {
        return 0.0;
    }
    let (odd_end, tail) = if n % 2 == 1 {
        (n, 0.0)
    } else {
        (n - 1, 0.5 * dx * (y[n - 2] + y[n - 1]))
    };
    if odd_end < 3 {
        return tail;
    }

    let mut sum = y[0] + y[odd_end - 1];
    for (k, value) in y[1..odd_end - 1].iter().enumerate() {
        sum += if k % 2 == 0 { 4.0 * value } else { 2.0 * value };
    }
    sum * dx / 3.0 + tail
}

/// Below this panel phase the Filon moments are summed as a power series.
const FILON_SERIES_THRESHOLD: f64 = 1.0;

/// ∫₀¹ (1 − s)·e^{iθs} ds and ∫₀¹ s·e^{iθs} ds.
fn filon_weights(theta: f64) -> (Complex64, Complex64) {
    let (m0, m1) = if theta.abs() < FILON_SERIES_THRESHOLD {
        // ∫₀¹ s^k·e^{iθs} ds = Σ (iθ)ⁿ / (n!·(n + k + 1))
        let i_theta = Complex64::new(0.0, theta);
        let mut term = Complex64::new(1.0, 0.0);
        let mut m0 = Complex64::new(0.0, 0.0);
        let mut m1 = Complex64::new(0.0, 0.0);
        for n in 0..20 {
            m0 += term / (n + 1) as f64;
            m1 += term / (n + 2) as f64;
            term = term * i_theta / (n + 1) as f64;
        }
        (m0, m1)
    } else {
        let i_theta = Complex64::new(0.0, theta);
        let phase = Complex64::from_polar(1.0, theta);
        let m0 = (phase - 1.0) / i_theta;
        let m1 = (phase - m0) / i_theta;
        (m0, m1)
    };
    (m0 - m1, m1)
}

/// Filon–trapezoid rule for ∫ h(x)·e^{iωx} dx over the nodes `x`.
///
/// `h` holds the amplitude at each node and is interpolated linearly between them; the
/// oscillating factor is integrated exactly on every panel. The nodes therefore only need to
/// resolve h, not the period 2π/ω.
pub fn filon_trapezoid(x: &[f64], h: &[Complex64], omega: f64) -> Complex64 {
    debug_assert_eq!(x.len(), h.len());
    x.windows(2)
        .zip(h.windows(2))
        .map(|(nodes, values)| filon_panel(nodes[0], nodes[1], values[0], values[1], omega))
        .sum()
}

/// One panel of `filon_trapezoid`: ∫ h(x)·e^{iωx} dx over [x0, x1] with h linear from h0 to h1.
#[inline]
pub fn filon_panel(x0: f64, x1: f64, h0: Complex64, h1: Complex64, omega: f64) -> Complex64 {
    let width = x1 - x0;
    let (left, right) = filon_weights(omega * width);
    Complex64::from_polar(width, omega * x0) * (h0 * left + h1 * right)
}

/// Logarithmically spaced points from `lo` to `hi` (both included).
///
/// Returns the points together with the uniform spacing in ln x, which is the
/// step to pass to `simpson` when integrating `f(x)·x` over ln x.
pub fn log_grid(lo: f64, hi: f64, points: usize) -> (Vec<f64>, f64) {
    if points < 2 {
        return (vec![lo; points], 0.0);
    }
    let (ln_lo, ln_hi) = (lo.ln(), hi.ln());
    let step = (ln_hi - ln_lo) / (points - 1) as f64;
    let grid = (0..points)
        .map(|k| {
            if k + 1 == points {
                hi
            } else {
                (ln_lo + step * k as f64).exp()
            }
        })
        .collect();
    (grid, step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_log_grid_endpoints_and_step() {
        let (grid, step) = log_grid(1e-3, 1e3, 7);
        assert_eq!(grid.len(), 7);
        assert_relative_eq!(grid[0], 1e-3, max_relative = 1e-14);
        assert_eq!(grid[6], 1e3);
        assert_relative_eq!(grid[3], 1.0, epsilon = 1e-12);
        assert_relative_eq!(step, 10f64.ln(), max_relative = 1e-14);
    }

    #[test]
    fn test_simpson_in_log_space() {
        // ∫_1^e 1/x dx = 1, sampled as f(x)·x over ln x.
        let (grid, step) = log_grid(1.0, std::f64::consts::E, 101);
        let samples: Vec<f64> = grid.iter().map(|x| x.recip() * x).collect();
        assert_relative_eq!(simpson(&samples, step), 1.0, max_relative = 1e-12);
    }

    #[test]
    fn test_filon_is_exact_for_linear_amplitude() {
        // ∫₀^L t·e^{it} dt = e^{iL}·(1 − iL) − 1, on nodes spaced far wider than 2π.
        let length = 250.0;
        let x: Vec<f64> = (0..=7).map(|k| length * k as f64 / 7.0).collect();
        let h: Vec<Complex64> = x.iter().map(|&t| Complex64::new(t, 0.0)).collect();
        let value = filon_trapezoid(&x, &h, 1.0);
        let expected = Complex64::from_polar(1.0, length) * Complex64::new(1.0, -length)
            - Complex64::new(1.0, 0.0);
        assert_relative_eq!(value.re, expected.re, max_relative = 1e-10);
        assert_relative_eq!(value.im, expected.im, max_relative = 1e-10);
    }

    #[test]
    fn test_filon_series_and_closed_form_agree() {
        let below = filon_weights(FILON_SERIES_THRESHOLD * (1.0 - 1e-9));
        let above = filon_weights(FILON_SERIES_THRESHOLD * (1.0 + 1e-9));
        assert_relative_eq!(below.0.re, above.0.re, max_relative = 1e-8);
        assert_relative_eq!(below.0.im, above.0.im, max_relative = 1e-8);
        assert_relative_eq!(below.1.re, above.1.re, max_relative = 1e-8);
        assert_relative_eq!(below.1.im, above.1.im, max_relative = 1e-8);

        let (left, right) = filon_weights(0.0);
        assert_eq!(left, Complex64::new(0.5, 0.0));
        assert_eq!(right, Complex64::new(0.5, 0.0));
    }

    #[test]
    fn test_filon_on_log_grid_with_decaying_amplitude() {
        // ∫₁^200 e^{−ix}/x² dx; the grid spacing near the top is a sizeable fraction of 2π.
        let (x, _) = log_grid(1.0, 200.0, 2_001);
        let h: Vec<Complex64> = x.iter().map(|&t| Complex64::new(t.powi(-2), 0.0)).collect();
        let value = filon_trapezoid(&x, &h, -1.0);

        let reference = integrate_adaptive(
            |u, out| {
                let t = u.exp();
                out[0] = t.cos() / t;
                out[1] = -t.sin() / t;
            },
            0.0,
            200.0f64.ln(),
            2,
            &AdaptiveOptions {
                epsrel: 1e-10,
                initial_intervals: 200,
                max_subdivisions: 20_000,
                ..Default::default()
            },
        )
        .unwrap();
        assert_relative_eq!(value.re, reference[0], epsilon = 1e-5);
        assert_relative_eq!(value.im, reference[1], epsilon = 1e-5);
    }

    #[test]
    fn test_polynomial_is_exact() {
        let options = AdaptiveOptions::default();
        let result = integrate_adaptive(
            |x, out| {
                out[0] = x.powi(3);
                out[1] = 1.0 + x;
            },
            0.0,
            2.0,
            2,
            &options,
        )
        .unwrap();
        assert_relative_eq!(result[0], 4.0, max_relative = 1e-13);
        assert_relative_eq!(result[1], 4.0, max_relative = 1e-13);
    }

    #[test]
    fn test_entries_with_different_scales_all_converge() {
        let options = AdaptiveOptions {
            epsrel: 1e-10,
            ..Default::default()
        };
        let widths = [0.05, 1.0, 30.0];
        let result = integrate_adaptive(
            |x, out| {
                for (slot, w) in out.iter_mut().zip(widths) {
                    *slot = (-(x * x) / (w * w)).exp();
                }
            },
            -100.0,
            100.0,
            widths.len(),
            &options,
        )
        .unwrap();
        for (value, w) in result.iter().zip(widths) {
            let expected = w * std::f64::consts::PI.sqrt() * libm::erf(100.0 / w);
            assert_relative_eq!(*value, expected, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_oscillatory_integrand() {
        let options = AdaptiveOptions {
            epsrel: 1e-10,
            ..Default::default()
        };
        let result =
            integrate_adaptive(|x, out| out[0] = (40.0 * x).cos(), 0.0, 3.0, 1, &options).unwrap();
        assert_relative_eq!(result[0], (120.0f64).sin() / 40.0, max_relative = 1e-8);
    }

    #[test]
    fn test_zero_integrand_converges_immediately() {
        let result =
            integrate_adaptive(|_, out| out[0] = 0.0, 0.0, 1.0, 1, &AdaptiveOptions::default())
                .unwrap();
        assert_eq!(result[0], 0.0);
    }

    #[test]
    fn test_budget_exhaustion_is_an_error() {
        let options = AdaptiveOptions {
            epsrel: 1e-14,
            initial_intervals: 1,
            max_subdivisions: 3,
            ..Default::default()
        };
        let result = integrate_adaptive(|x, out| out[0] = x.abs().sqrt().recip(), 0.0, 1.0, 1, &options);
        assert!(matches!(
            result,
            Err(DmLimitError::IntegrationNotConverged { subdivisions: 3, .. })
        ));
    }

    #[test]
    fn test_simpson_cubic_is_exact() {
        let n = 11;
        let dx = 1.0 / (n - 1) as f64;
        let y: Vec<f64> = (0..n).map(|k| (k as f64 * dx).powi(3)).collect();
        assert_relative_eq!(simpson(&y, dx), 0.25, max_relative = 1e-14);
    }

    #[test]
    fn test_simpson_even_sample_count() {
        let n = 1000;
        let dx = std::f64::consts::PI / (n - 1) as f64;
        let y: Vec<f64> = (0..n).map(|k| (k as f64 * dx).sin()).collect();
        assert_relative_eq!(simpson(&y, dx), 2.0, max_relative = 1e-5);
    }

    #[test]
    fn test_simpson_degenerate_inputs() {
        assert_eq!(simpson(&[], 1.0), 0.0);
        assert_eq!(simpson(&[3.0], 1.0), 0.0);
        assert_relative_eq!(simpson(&[1.0, 3.0], 0.5), 1.0);
    }
}
