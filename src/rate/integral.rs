//! Momentum-transfer integrals of the heavy- and light-mediator rates.
//!
//! Every function takes a whole batch of dark-matter masses and returns one integral per mass.
//! `mediator_masses` selects the branch: `None` integrates the contact (heavy) kernel in MeV²,
//! `Some(m_phi)` divides by the propagator (q² + m_φ²)² and yields MeV⁻².

use crate::error::DmLimitError;
use crate::experiment::ExperimentProfile;
use crate::math::constants::FEMTOMETER_TO_INV_MEV;
use crate::math::quadrature::{
    CANCELLATION_FLOOR, filon_panel, integrate_adaptive, log_grid, simpson,
};
use crate::math::special::one_minus_sinc;
use crate::rate::options::RateOptions;
use crate::scattering::{CoherentFormFactor, KernelTerms, PhaseKernel, TruncatedMaxwellian};
use crate::types::{PhaseAccuracy, PhaseComponent};
use ndarray::Array1;
use num_complex::Complex64;
use rayon::prelude::*;
use std::cell::Cell;

#[inline]
fn propagator_sq(q: f64, mediator_mass: f64) -> f64 {
    let p = q * q + mediator_mass * mediator_mass;
    p * p
}

fn form_factor(profile: &ExperimentProfile, options: &RateOptions) -> CoherentFormFactor {
    CoherentFormFactor::new(profile, options.helm_skin_thickness_fm * FEMTOMETER_TO_INV_MEV)
}

/// The decoherence-channel integral ∫ q·(1 − sinc(q·Δx))·F²(q)·η(q, mx) [/(q² + m_φ²)²] dq.
///
/// The lower limit is the experiment's minimum momentum transfer (or `q_floor` when that is not
/// positive). The velocity weight vanishes above the kinematic endpoint 2·mx·v_esc, which is
/// therefore the upper limit; a mass whose endpoint lies below the lower limit integrates to zero.
/// Each mass is mapped onto t ∈ [0, 1] through q = q_lo·(q_max/q_lo)^t so that the whole batch
/// shares one adaptive subdivision tree.
///
/// # Errors
///
/// Returns `DmLimitError::IntegrationNotConverged` if any entry misses its tolerance within the
/// subdivision budget.
pub fn decoherence_integral(
    masses: &Array1<f64>,
    mediator_masses: Option<&Array1<f64>>,
    profile: &ExperimentProfile,
    options: &RateOptions,
) -> Result<Array1<f64>, DmLimitError> {
    let maxwellian = TruncatedMaxwellian::new(&options.halo);
    let form_factor = form_factor(profile, options);
    let baseline = profile.baseline();

    let q_lo = if profile.q_min() > 0.0 {
        profile.q_min()
    } else {
        options.integration.q_floor
    };
    let ln_q_lo = q_lo.ln();
    let spans: Vec<f64> = masses
        .iter()
        .map(|&mx| {
            let q_max = maxwellian.kinematic_endpoint(mx);
            if q_max > q_lo { (q_max / q_lo).ln() } else { 0.0 }
        })
        .collect();

    let integrand = |t: f64, out: &mut [f64]| {
        for (i, slot) in out.iter_mut().enumerate() {
            let span = spans[i];
            if span == 0.0 {
                *slot = 0.0;
                continue;
            }
            let q = (ln_q_lo + t * span).exp();
            let mut value = q
                * one_minus_sinc(q * baseline)
                * form_factor.squared(q)
                * maxwellian.weight(q, masses[i]);
            if let Some(m_phi) = mediator_masses {
                value /= propagator_sq(q, m_phi[i]);
            }
            *slot = value * q * span;
        }
    };

    let result = integrate_adaptive(integrand, 0.0, 1.0, masses.len(), &options.integration.adaptive)?;

    tracing::debug!(
        experiment = profile.name(),
        masses = masses.len(),
        empty = spans.iter().filter(|&&span| span == 0.0).count(),
        light = mediator_masses.is_some(),
        "decoherence integral done"
    );

    Ok(Array1::from_vec(result))
}

/// The phase-channel integral ∫ q·F²(q)·Re/Im K(q) [/(q² + m_φ²)²] dq.
///
/// The domain is 10^{-d}/Δx to 10^{d}/Δx with d = `options.phase.decades`, integrated in ln q.
/// The kernel is split as in `KernelTerms`. The Gaussian term is confined to q·Δx below a few
/// tens and is integrated with composite Simpson on the logarithmic grid (`FastGrid`) or
/// adaptively (`Exact`). The edge terms oscillate as e^{∓i·q·Δx} up to the kinematic scale
/// q ~ 2·mx·(v_lab + v₀), far beyond what any grid in ln q resolves, so both modes integrate
/// them with Filon's rule in q·Δx on the logarithmic grid; `Exact` doubles the grid until the
/// result settles. Kernel values that are not finite contribute zero; how many were replaced is
/// logged at debug level.
///
/// # Errors
///
/// Returns `DmLimitError::IntegrationNotConverged` if exact mode exhausts its budget.
pub fn phase_integral(
    masses: &Array1<f64>,
    mediator_masses: Option<&Array1<f64>>,
    profile: &ExperimentProfile,
    component: PhaseComponent,
    accuracy: PhaseAccuracy,
    options: &RateOptions,
) -> Result<Array1<f64>, DmLimitError> {
    let kernels: Vec<PhaseKernel> = masses
        .iter()
        .map(|&mx| {
            let kernel = PhaseKernel::new(mx, &options.halo, profile.baseline());
            if options.phase.enforce_escape_cutoff {
                kernel.with_escape_cutoff(options.halo.escape_velocity)
            } else {
                kernel
            }
        })
        .collect();

    let scale = 10f64.powf(options.phase.decades);
    let domain = PhaseDomain {
        q_lo: scale.recip() / profile.baseline(),
        q_hi: scale / profile.baseline(),
        form_factor: form_factor(profile, options),
        baseline: profile.baseline(),
    };
    let propagators = |i: usize| mediator_masses.map(|m_phi| m_phi[i]);

    let (values, sanitized) = match accuracy {
        PhaseAccuracy::FastGrid => {
            let grid = domain.grid(options.phase.grid_points());
            let sums = grid.integrate(&kernels, &propagators, component);
            let sanitized = sums.iter().map(|sum| sum.sanitized).sum::<usize>();
            (sums.iter().map(|sum| sum.gaussian + sum.edges).collect(), sanitized)
        }
        PhaseAccuracy::Exact => {
            phase_exact(&kernels, &propagators, &domain, component, options)?
        }
    };

    tracing::debug!(
        experiment = profile.name(),
        masses = masses.len(),
        ?accuracy,
        sanitized,
        "phase integral done"
    );

    Ok(Array1::from_vec(values))
}

/// Integration range and q-dependent weights shared by every mass of a batch.
struct PhaseDomain {
    q_lo: f64,
    q_hi: f64,
    form_factor: CoherentFormFactor,
    baseline: f64,
}

impl PhaseDomain {
    /// q·F²(q) times the Jacobian q of the ln q measure.
    #[inline]
    fn weight(&self, q: f64) -> f64 {
        q * q * self.form_factor.squared(q)
    }

    fn grid(&self, points: usize) -> PhaseGrid {
        let (nodes, step) = log_grid(self.q_lo, self.q_hi, points);
        let weights = nodes.iter().map(|&q| self.weight(q)).collect();
        let phases = nodes.iter().map(|&q| q * self.baseline).collect();
        PhaseGrid {
            nodes,
            step,
            weights,
            phases,
        }
    }
}

/// A logarithmic grid over the phase domain with its weights and phase arguments q·Δx.
struct PhaseGrid {
    nodes: Vec<f64>,
    step: f64,
    weights: Vec<f64>,
    phases: Vec<f64>,
}

/// The grid estimates of one mass.
#[derive(Debug, Clone, Copy)]
struct GridSums {
    gaussian: f64,
    edges: f64,
    /// Estimate of ∫|integrand|, the scale against which cancellation is judged.
    magnitude: f64,
    sanitized: usize,
}

impl PhaseGrid {
    /// Integrates every mass on this grid, one mass per rayon task.
    fn integrate<P>(
        &self,
        kernels: &[PhaseKernel],
        propagators: &P,
        component: PhaseComponent,
    ) -> Vec<GridSums>
    where
        P: Fn(usize) -> Option<f64> + Sync,
    {
        kernels
            .par_iter()
            .enumerate()
            .map(|(i, kernel)| self.integrate_one(kernel, propagators(i), component))
            .collect()
    }

    fn integrate_one(
        &self,
        kernel: &PhaseKernel,
        m_phi: Option<f64>,
        component: PhaseComponent,
    ) -> GridSums {
        let mut gaussian = Vec::with_capacity(self.nodes.len());
        let mut gaussian_abs = Vec::with_capacity(self.nodes.len());
        let mut edges = Complex64::new(0.0, 0.0);
        let mut edges_abs = 0.0;
        let mut previous: Option<(f64, Complex64, Complex64)> = None;
        let mut sanitized = 0;

        for ((&q, &weight), &c) in self.nodes.iter().zip(&self.weights).zip(&self.phases) {
            let mut terms = kernel.terms(q);
            if !terms.is_finite() {
                sanitized += 1;
                terms = KernelTerms::ZERO;
            }
            let weight = match m_phi {
                Some(m_phi) => weight / propagator_sq(q, m_phi),
                None => weight,
            };
            let value = weight * component.of(terms.gaussian);
            gaussian.push(value);
            gaussian_abs.push(value.abs());

            // dln q = dc/c for the integral in c.
            let upper = terms.upper_edge * (weight / c);
            let lower = terms.lower_edge * (weight / c);
            if let Some((c0, upper0, lower0)) = previous {
                edges += filon_panel(c0, c, upper0, upper, -1.0);
                edges += filon_panel(c0, c, lower0, lower, 1.0);
                let left = upper0.norm() + lower0.norm();
                let right = upper.norm() + lower.norm();
                edges_abs += 0.5 * (c - c0) * (left + right);
            }
            previous = Some((c, upper, lower));
        }

        GridSums {
            gaussian: simpson(&gaussian, self.step),
            edges: component.of(edges),
            magnitude: simpson(&gaussian_abs, self.step) + edges_abs,
            sanitized,
        }
    }
}

fn phase_exact<P>(
    kernels: &[PhaseKernel],
    propagators: &P,
    domain: &PhaseDomain,
    component: PhaseComponent,
    options: &RateOptions,
) -> Result<(Vec<f64>, usize), DmLimitError>
where
    P: Fn(usize) -> Option<f64> + Sync,
{
    let sanitized = Cell::new(0usize);
    let integrand = |u: f64, out: &mut [f64]| {
        let q = u.exp();
        let weight = domain.weight(q);
        for (i, (slot, kernel)) in out.iter_mut().zip(kernels).enumerate() {
            let value = component.of(kernel.terms(q).gaussian);
            *slot = if value.is_finite() {
                match propagators(i) {
                    Some(m_phi) => weight * value / propagator_sq(q, m_phi),
                    None => weight * value,
                }
            } else {
                sanitized.set(sanitized.get() + 1);
                0.0
            };
        }
    };
    let gaussian = integrate_adaptive(
        integrand,
        domain.q_lo.ln(),
        domain.q_hi.ln(),
        kernels.len(),
        &options.phase.exact,
    )?;

    let tolerance = |i: usize, sum: &GridSums| {
        let total = (gaussian[i] + sum.edges).abs();
        let scale = total.max(CANCELLATION_FLOOR * sum.magnitude);
        options.phase.exact.epsabs.max(options.phase.exact.epsrel * scale)
    };

    let mut points = options.phase.grid_points();
    let mut sums = domain.grid(points).integrate(kernels, propagators, component);

    for refinement in 1..=options.phase.max_refinements {
        points = 2 * points - 1;
        let refined = domain.grid(points).integrate(kernels, propagators, component);
        let worst = refined
            .iter()
            .zip(&sums)
            .enumerate()
            .map(|(i, (fine, coarse))| {
                let allowed = tolerance(i, fine);
                let change = (fine.edges - coarse.edges).abs();
                if change <= allowed {
                    0.0
                } else if allowed > 0.0 {
                    change / allowed
                } else {
                    f64::INFINITY
                }
            })
            .fold(0.0, f64::max);
        sums = refined;

        tracing::trace!(refinement, points, worst, "phase edge grid refined");
        if worst == 0.0 {
            break;
        }
        if refinement == options.phase.max_refinements {
            return Err(DmLimitError::IntegrationNotConverged {
                subdivisions: points - 1,
                error: worst * options.phase.exact.epsrel,
            });
        }
    }

    let values = gaussian.iter().zip(&sums).map(|(g, sum)| g + sum.edges).collect();
    let grid_sanitized = sums.iter().map(|sum| sum.sanitized).sum::<usize>();
    Ok((values, sanitized.get() + grid_sanitized))
}
