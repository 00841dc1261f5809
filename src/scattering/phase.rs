//! The complex phase kernel of the phase detection channel.
//!
//! For momentum transfer q the phase response of the interferometer is the halo average of
//! e^{i·q·Δx·μ} over the direction cosine μ of the transfer relative to the baseline, with the
//! dark-matter wind aligned with the baseline. Writing a = q/(2·mx), b = v_lab, c = q·Δx,
//! κ = c·v₀/b and s± = (a ± b)/v₀, the Gaussian velocity integral closes to
//!
//! K(q) = (v₀·√π / (4b)) · e^{i·c·a/b} · e^{−κ²/4} · [erf(s₊ + iκ/2) − erf(s₋ + iκ/2)].
//!
//! Taken literally the error functions overflow once κ exceeds about 50 while the Gaussian factor
//! underflows. The kernel is instead built from `damped_erf_parts`, which keeps every piece
//! bounded and splits K into a Gaussian term and two edge terms carrying e^{∓i·c} exactly.
//! The edge terms are what survive far above q ~ 1/Δx.

use crate::math::constants::HaloModel;
use crate::math::special::damped_erf_parts;
use crate::types::PhaseComponent;
use num_complex::Complex64;
use std::f64::consts::PI;

/// The kernel at one momentum transfer, split by its dependence on c = q·Δx.
///
/// K(q) = gaussian + upper_edge·e^{−i·c} + lower_edge·e^{i·c}. The edge amplitudes vary on the
/// scale of q itself, while the Gaussian term dies off within a few tens of units of c.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelTerms {
    pub gaussian: Complex64,
    pub upper_edge: Complex64,
    pub lower_edge: Complex64,
}

impl KernelTerms {
    pub const ZERO: Self = Self {
        gaussian: Complex64::new(0.0, 0.0),
        upper_edge: Complex64::new(0.0, 0.0),
        lower_edge: Complex64::new(0.0, 0.0),
    };

    /// Reassembles K at phase argument `c`.
    #[inline]
    pub fn combine(&self, c: f64) -> Complex64 {
        self.gaussian
            + self.upper_edge * Complex64::from_polar(1.0, -c)
            + self.lower_edge * Complex64::from_polar(1.0, c)
    }

    pub fn is_finite(&self) -> bool {
        [self.gaussian, self.upper_edge, self.lower_edge]
            .iter()
            .all(|term| term.re.is_finite() && term.im.is_finite())
    }
}

/// The phase kernel for one dark-matter mass and one experiment baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseKernel {
    inv_two_mass: f64,
    lab_velocity: f64,
    dispersion_velocity: f64,
    baseline: f64,
    prefactor: f64,
    escape_cutoff: Option<f64>,
}

impl PhaseKernel {
    /// Builds the kernel for dark-matter mass `mx` (MeV) and arm separation `baseline` (MeV⁻¹).
    pub fn new(mx: f64, halo: &HaloModel, baseline: f64) -> Self {
        Self {
            inv_two_mass: 0.5 / mx,
            lab_velocity: halo.lab_velocity,
            dispersion_velocity: halo.dispersion_velocity,
            baseline,
            prefactor: halo.dispersion_velocity * PI.sqrt() / (4.0 * halo.lab_velocity),
            escape_cutoff: None,
        }
    }

    /// Zeroes the kernel wherever q/(2·mx) exceeds the escape velocity.
    pub fn with_escape_cutoff(mut self, escape_velocity: f64) -> Self {
        self.escape_cutoff = Some(escape_velocity);
        self
    }

    /// The phase argument c = q·Δx.
    #[inline]
    pub fn phase_argument(&self, q: f64) -> f64 {
        q * self.baseline
    }

    /// The Gaussian and edge terms of K(q).
    ///
    /// With D(z) = e^{−(Im z)²}·erf(z) = smooth + edge·e^{−2i·Re z·Im z}, the rotation e^{i·c·a/b}
    /// turns the upper and lower edge phases into e^{−i·c} and e^{i·c}, so no large angle other
    /// than c itself is ever formed.
    pub fn terms(&self, q: f64) -> KernelTerms {
        let a = q * self.inv_two_mass;
        if let Some(escape_velocity) = self.escape_cutoff {
            if a > escape_velocity {
                return KernelTerms::ZERO;
            }
        }

        let b = self.lab_velocity;
        let v0 = self.dispersion_velocity;
        let c = self.phase_argument(q);
        let half_kappa = 0.5 * c * v0 / b;

        let upper_arg = Complex64::new((a + b) / v0, half_kappa);
        let lower_arg = Complex64::new((a - b) / v0, half_kappa);
        let (upper_smooth, upper_edge) = damped_erf_parts(upper_arg);
        let (lower_smooth, lower_edge) = damped_erf_parts(lower_arg);

        let smooth = upper_smooth - lower_smooth;
        let gaussian = if smooth == 0.0 {
            Complex64::new(0.0, 0.0)
        } else {
            Complex64::from_polar(self.prefactor * smooth, c * a / b)
        };

        KernelTerms {
            gaussian,
            upper_edge: upper_edge * self.prefactor,
            lower_edge: lower_edge * -self.prefactor,
        }
    }

    /// The kernel value K(q).
    pub fn evaluate(&self, q: f64) -> Complex64 {
        self.terms(q).combine(self.phase_argument(q))
    }

    /// The selected component of the kernel, or `None` if it is not finite.
    ///
    /// The split evaluation is finite for any momentum transfer the Faddeeva function accepts;
    /// `None` only marks arguments beyond that range.
    #[inline]
    pub fn component(&self, q: f64, component: PhaseComponent) -> Option<f64> {
        let part = component.of(self.evaluate(q));
        part.is_finite().then_some(part)
    }
}

/// The phase kernel K(q) for mass `mx` and baseline `baseline`.
pub fn phase_kernel(q: f64, mx: f64, halo: &HaloModel, baseline: f64) -> Complex64 {
    PhaseKernel::new(mx, halo, baseline).evaluate(q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::constants::METER_TO_INV_MEV;
    use crate::math::quadrature::{AdaptiveOptions, integrate_adaptive};
    use approx::assert_relative_eq;

    fn toy_halo() -> HaloModel {
        HaloModel {
            density: 1.0,
            escape_velocity: 10.0,
            dispersion_velocity: 1.0,
            lab_velocity: 1.2,
        }
    }

    /// (1/2b)·∫_{a−b}^{a+b} e^{−w²/v₀²}·e^{i·c·(a−w)/b} dw by quadrature.
    fn direct_average(a: f64, b: f64, c: f64, v0: f64, options: &AdaptiveOptions) -> Complex64 {
        let result = integrate_adaptive(
            |w, out| {
                let weight = (-(w * w) / (v0 * v0)).exp();
                let angle = c * (a - w) / b;
                out[0] = weight * angle.cos();
                out[1] = weight * angle.sin();
            },
            a - b,
            a + b,
            2,
            options,
        )
        .unwrap();
        Complex64::new(result[0], result[1]) / (2.0 * b)
    }

    #[test]
    fn test_kernel_matches_direction_average() {
        let halo = toy_halo();
        for &(q, mx, baseline) in &[(0.6, 1.0, 2.0 / 0.6), (0.2, 0.05, 15.0), (1.5, 3.0, 0.4)] {
            let kernel = phase_kernel(q, mx, &halo, baseline);
            let options = AdaptiveOptions {
                epsrel: 1e-12,
                ..Default::default()
            };
            let expected = direct_average(q / (2.0 * mx), 1.2, q * baseline, 1.0, &options);
            assert_relative_eq!(kernel.re, expected.re, epsilon = 1e-10, max_relative = 1e-9);
            assert_relative_eq!(kernel.im, expected.im, epsilon = 1e-10, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_kernel_small_momentum_limit() {
        let halo = HaloModel::default();
        let (v0, b) = (halo.dispersion_velocity, halo.lab_velocity);
        let kernel = phase_kernel(1e-30, 1.0, &halo, 1e10);
        let expected = v0 * PI.sqrt() / (4.0 * b) * 2.0 * libm::erf(b / v0);
        assert_relative_eq!(kernel.re, expected, max_relative = 1e-10);
        assert!(kernel.im.abs() < 1e-15);
    }

    #[test]
    fn test_kernel_far_above_inverse_baseline() {
        // A 25 m baseline with the standard halo: κ/2 ≈ c/2, so erf(s + iκ/2) alone overflows.
        let halo = HaloModel::default();
        let (v0, b) = (halo.dispersion_velocity, halo.lab_velocity);
        let baseline = 25.0 * METER_TO_INV_MEV;
        let mx = 1.0;
        let kernel = PhaseKernel::new(mx, &halo, baseline);
        let options = AdaptiveOptions {
            epsrel: 1e-11,
            initial_intervals: 400,
            max_subdivisions: 50_000,
            ..Default::default()
        };

        for &target in &[60.0, 200.0, 1000.0] {
            let q = target / baseline;
            let value = kernel.evaluate(q);
            let c = kernel.phase_argument(q);
            let expected = direct_average(q / (2.0 * mx), b, c, v0, &options);
            assert!(value.norm() > 1e-6, "kernel vanished at c = {target}");
            assert_relative_eq!(value.re, expected.re, epsilon = 1e-13, max_relative = 1e-8);
            assert_relative_eq!(value.im, expected.im, epsilon = 1e-13, max_relative = 1e-8);
            assert_eq!(kernel.component(q, PhaseComponent::Real), Some(value.re));
        }
    }

    #[test]
    fn test_terms_recombine_to_kernel() {
        let halo = toy_halo();
        let kernel = PhaseKernel::new(0.05, &halo, 15.0);
        let q = 0.2;
        let terms = kernel.terms(q);
        assert!(terms.is_finite());
        let value = terms.combine(kernel.phase_argument(q));
        assert_eq!(value, kernel.evaluate(q));

        // Above the kinematic scale 2·mx·(b + v₀) the Gaussian term vanishes identically.
        let far = kernel.terms(10.0);
        assert_eq!(far.gaussian, Complex64::new(0.0, 0.0));
    }

    #[test]
    fn test_escape_cutoff() {
        let halo = HaloModel::default();
        let mx = 1.0;
        let kernel = PhaseKernel::new(mx, &halo, 10.0).with_escape_cutoff(halo.escape_velocity);
        let above = 2.0 * mx * halo.escape_velocity * 1.01;
        assert_eq!(kernel.evaluate(above), Complex64::new(0.0, 0.0));
        assert_ne!(kernel.evaluate(0.5 * above), Complex64::new(0.0, 0.0));
    }
}
