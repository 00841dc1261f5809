//! Special functions needed by the scattering kernels.
//!
//! Real error functions come from `libm`. The complex error function is built
//! on the Faddeeva function w(z) = exp(−z²)·erfc(−iz), evaluated with the
//! Gautschi/Poppe–Wijers scheme (power series near the origin, continued
//! fraction with a Taylor correction elsewhere), which is accurate to roughly
//! 14 significant digits over the upper half plane.

use num_complex::Complex64;
use std::f64::consts::PI;

pub use libm::{erf, erfc};

/// 2/√π.
const TWO_OVER_SQRT_PI: f64 = 1.128_379_167_095_512_6;

/// Below this magnitude the spherical Bessel functions switch to their series.
const SERIES_THRESHOLD: f64 = 1.0e-1;

/// Below this magnitude the complex error function uses its Maclaurin series.
const ERF_SERIES_THRESHOLD: f64 = 1.0e-1;

/// Spherical Bessel function of the first kind, order one.
#[inline]
pub fn spherical_j1(x: f64) -> f64 {
    if x.abs() < SERIES_THRESHOLD {
        let x2 = x * x;
        x / 3.0 * (1.0 - x2 / 10.0 * (1.0 - x2 / 28.0 * (1.0 - x2 / 54.0)))
    } else {
        (x.sin() / x - x.cos()) / x
    }
}

/// 3·j1(x)/x, the normalised form factor of a uniform sphere. Equals 1 at the origin.
#[inline]
pub fn sphere_form_factor(x: f64) -> f64 {
    if x.abs() < SERIES_THRESHOLD {
        let x2 = x * x;
        1.0 - x2 / 10.0 * (1.0 - x2 / 28.0 * (1.0 - x2 / 54.0))
    } else {
        3.0 * (x.sin() - x * x.cos()) / (x * x * x)
    }
}

/// 1 − sin(x)/x without cancellation near the origin.
#[inline]
pub fn one_minus_sinc(x: f64) -> f64 {
    if x.abs() < SERIES_THRESHOLD {
        let x2 = x * x;
        x2 / 6.0 * (1.0 - x2 / 20.0 * (1.0 - x2 / 42.0))
    } else {
        1.0 - x.sin() / x
    }
}

/// The Faddeeva function w(z) = exp(−z²)·erfc(−iz).
///
/// Values whose lower-half-plane continuation overflows are returned as
/// non-finite numbers; callers decide how to treat them.
pub fn faddeeva(z: Complex64) -> Complex64 {
    const MAX_REAL: f64 = 0.5e154;
    const MAX_EXP: f64 = 708.503_061_461_606;
    const MAX_GONI: f64 = 3.537_118_876_014_22e15;

    let (xi, yi) = (z.re, z.im);
    let xabs = xi.abs();
    let yabs = yi.abs();

    if !(xabs <= MAX_REAL && yabs <= MAX_REAL) {
        return Complex64::new(f64::NAN, f64::NAN);
    }

    let x = xabs / 6.3;
    let y = yabs / 4.4;
    let mut qrho = x * x + y * y;
    let mut xquad = xabs * xabs - yabs * yabs;
    let yquad = 2.0 * xabs * yabs;

    let near_origin = qrho < 0.085_264;
    let mut u;
    let mut v;
    let mut u2 = 0.0;
    let mut v2 = 0.0;

    if near_origin {
        qrho = (1.0 - 0.85 * y) * qrho.sqrt();
        let n = (6.0 + 72.0 * qrho).round() as i32;
        let mut j = 2 * n + 1;
        let mut xsum = 1.0 / j as f64;
        let mut ysum = 0.0;
        for i in (1..=n).rev() {
            j -= 2;
            let xaux = (xsum * xquad - ysum * yquad) / i as f64;
            ysum = (xsum * yquad + ysum * xquad) / i as f64;
            xsum = xaux + 1.0 / j as f64;
        }
        let u1 = -TWO_OVER_SQRT_PI * (xsum * yabs + ysum * xabs) + 1.0;
        let v1 = TWO_OVER_SQRT_PI * (xsum * xabs - ysum * yabs);
        let daux = (-xquad).exp();
        u2 = daux * yquad.cos();
        v2 = -daux * yquad.sin();
        u = u1 * u2 - v1 * v2;
        v = u1 * v2 + v1 * u2;
    } else {
        let h;
        let kapn;
        let nu;
        if qrho > 1.0 {
            h = 0.0;
            kapn = 0;
            qrho = qrho.sqrt();
            nu = (3.0 + 1442.0 / (26.0 * qrho + 77.0)) as i32;
        } else {
            qrho = (1.0 - y) * (1.0 - qrho).sqrt();
            h = 1.88 * qrho;
            kapn = (7.0 + 34.0 * qrho).round() as i32;
            nu = (16.0 + 26.0 * qrho).round() as i32;
        }

        let h2 = 2.0 * h;
        let taylor = h > 0.0;
        let mut qlambda = if taylor { h2.powi(kapn) } else { 0.0 };

        let (mut rx, mut ry, mut sx, mut sy) = (0.0, 0.0, 0.0, 0.0);
        for n in (0..=nu).rev() {
            let np1 = (n + 1) as f64;
            let tx = yabs + h + np1 * rx;
            let ty = xabs - np1 * ry;
            let c = 0.5 / (tx * tx + ty * ty);
            rx = c * tx;
            ry = c * ty;
            if taylor && n <= kapn {
                let tx = qlambda + sx;
                sx = rx * tx - ry * sy;
                sy = ry * tx + rx * sy;
                qlambda /= h2;
            }
        }

        if taylor {
            u = TWO_OVER_SQRT_PI * sx;
            v = TWO_OVER_SQRT_PI * sy;
        } else {
            u = TWO_OVER_SQRT_PI * rx;
            v = TWO_OVER_SQRT_PI * ry;
        }
        if yabs == 0.0 {
            u = (-xabs * xabs).exp();
        }
    }

    if yi < 0.0 {
        if near_origin {
            u2 *= 2.0;
            v2 *= 2.0;
        } else {
            xquad = -xquad;
            if yquad > MAX_GONI || xquad > MAX_EXP {
                return Complex64::new(f64::INFINITY, f64::INFINITY);
            }
            let w1 = 2.0 * xquad.exp();
            u2 = w1 * yquad.cos();
            v2 = -w1 * yquad.sin();
        }
        u = u2 - u;
        v = v2 - v;
        if xi > 0.0 {
            v = -v;
        }
    } else if xi < 0.0 {
        v = -v;
    }

    Complex64::new(u, v)
}

/// The error function of a complex argument.
///
/// Uses erf(z) = 1 − exp(−z²)·w(iz) on the right half plane and odd symmetry
/// on the left. For arguments with |Im z| ≫ |Re z| the exponential overflows
/// and the result is not finite; `damped_erf` stays finite there.
pub fn erf_complex(z: Complex64) -> Complex64 {
    if z.re < 0.0 {
        return -erf_complex(-z);
    }
    if z.norm() < ERF_SERIES_THRESHOLD {
        return erf_series(z);
    }
    let iz = Complex64::new(-z.im, z.re);
    Complex64::new(1.0, 0.0) - (-z * z).exp() * faddeeva(iz)
}

/// e^{−y²}·erf(x + iy) split into a part that does not oscillate with x·y and one that does.
///
/// Returns `(smooth, edge)` such that e^{−y²}·erf(z) = smooth + edge·e^{−2i·x·y}. The Faddeeva
/// function is only evaluated in the closed upper half plane, so both parts are bounded by 1
/// for every z where erf(z) alone overflows.
pub fn damped_erf_parts(z: Complex64) -> (f64, Complex64) {
    let sign = if z.re < 0.0 { -1.0 } else { 1.0 };
    let (x, y) = (sign * z.re, sign * z.im);
    let smooth = sign * (-y * y).exp();
    let edge = faddeeva(Complex64::new(-y, x)) * (-sign * (-x * x).exp());
    (smooth, edge)
}

/// e^{−(Im z)²}·erf(z), finite over the whole complex plane.
pub fn damped_erf(z: Complex64) -> Complex64 {
    if z.norm() < ERF_SERIES_THRESHOLD {
        return erf_series(z) * (-z.im * z.im).exp();
    }
    let (smooth, edge) = damped_erf_parts(z);
    edge * Complex64::from_polar(1.0, -2.0 * z.re * z.im) + smooth
}

/// Maclaurin series of erf, used only for small |z|.
fn erf_series(z: Complex64) -> Complex64 {
    let z2 = z * z;
    let mut term = z;
    let mut sum = z;
    for n in 1..12 {
        term = -term * z2 / n as f64;
        sum += term / (2 * n + 1) as f64;
    }
    sum * (2.0 / PI.sqrt())
}
