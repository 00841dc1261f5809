//! Physical constants, unit conversions and the galactic halo model.
//!
//! Everything inside the crate is expressed in natural units with energies in
//! MeV: lengths and times in MeV⁻¹, velocities as fractions of the speed of
//! light, densities in MeV⁴. The conversion factors below are the only place
//! where SI or astronomical units enter.

/// ħc in MeV·m, at the precision used for all length conversions.
pub const HBAR_C_MEV_M: f64 = 1.97e-13;

/// One meter expressed in MeV⁻¹.
pub const METER_TO_INV_MEV: f64 = 1.0 / HBAR_C_MEV_M;

/// Speed of light in m/s.
pub const SPEED_OF_LIGHT_M_PER_S: f64 = 299_792_458.0;

/// One second expressed in MeV⁻¹.
pub const SECOND_TO_INV_MEV: f64 = SPEED_OF_LIGHT_M_PER_S * METER_TO_INV_MEV;

/// One centimeter expressed in MeV⁻¹.
pub const CENTIMETER_TO_INV_MEV: f64 = 1.0e-2 * METER_TO_INV_MEV;

/// One square centimeter expressed in MeV⁻².
pub const CM2_TO_INV_MEV2: f64 = CENTIMETER_TO_INV_MEV * CENTIMETER_TO_INV_MEV;

/// One femtometer expressed in MeV⁻¹.
pub const FEMTOMETER_TO_INV_MEV: f64 = 1.0e-15 * METER_TO_INV_MEV;

/// Proton rest mass in MeV.
pub const PROTON_MASS_MEV: f64 = 938.272_088_16;

/// Local dark-matter mass density in GeV/cm³ before the dark-sector fraction.
pub const LOCAL_DM_DENSITY_GEV_CM3: f64 = 0.4;

/// Fraction of the local dark matter carried by the species under test.
pub const DM_FRACTION: f64 = 0.05;

/// Galactic escape velocity in km/s.
pub const ESCAPE_VELOCITY_KM_S: f64 = 600.0;

/// Local dark-matter velocity dispersion in km/s.
pub const DISPERSION_VELOCITY_KM_S: f64 = 230.0;

/// Laboratory velocity through the halo in km/s.
pub const LAB_VELOCITY_KM_S: f64 = 232.0;

/// Converts a velocity in km/s into a fraction of the speed of light.
#[inline]
pub fn km_per_s_to_natural(velocity_km_s: f64) -> f64 {
    velocity_km_s * 1.0e3 / SPEED_OF_LIGHT_M_PER_S
}

/// Converts a mass density in GeV/cm³ into MeV⁴.
#[inline]
pub fn gev_per_cm3_to_mev4(density_gev_cm3: f64) -> f64 {
    density_gev_cm3 * 1.0e3 / CENTIMETER_TO_INV_MEV.powi(3)
}

/// Parameters of the truncated-Maxwellian dark-matter halo.
///
/// The halo is consumed read-only by every rate computation. The default is
/// the standard halo model with a 5% dark-sector fraction of the local density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HaloModel {
    /// Local density of the dark-matter species in MeV⁴.
    pub density: f64,
    /// Galactic escape velocity (fraction of c).
    pub escape_velocity: f64,
    /// Velocity dispersion v₀ of the Maxwellian (fraction of c).
    pub dispersion_velocity: f64,
    /// Velocity of the laboratory through the halo (fraction of c). Only the
    /// phase channel, which is sensitive to the direction of the wind, uses it.
    pub lab_velocity: f64,
}

impl Default for HaloModel {
    fn default() -> Self {
        Self {
            density: DM_FRACTION * gev_per_cm3_to_mev4(LOCAL_DM_DENSITY_GEV_CM3),
            escape_velocity: km_per_s_to_natural(ESCAPE_VELOCITY_KM_S),
            dispersion_velocity: km_per_s_to_natural(DISPERSION_VELOCITY_KM_S),
            lab_velocity: km_per_s_to_natural(LAB_VELOCITY_KM_S),
        }
    }
}
