//! Wind pressure correction formulas.
//!
//! Pure functions implementing the exposure, resonance and correction math.
//! Nothing here performs I/O: the processors feed parsed rows through these
//! functions and serialize the results. Intermediate engineering
//! coefficients are rounded to three decimals; corrected pressures are not.

use crate::config::AreaParameters;

/// Logarithmic decrement of structural damping.
///
/// Only the two code-defined values exist; the dynamic coefficient
/// polynomial is fitted separately for each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decrement {
    /// delta = 0.3, reinforced concrete and masonry structures.
    D03,
    /// delta = 0.15, steel frame structures.
    D015,
}

/// Building shape class derived from height and width.
///
/// Selects which dimension drives the turbulence profile exponent in the
/// correction formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GeometryIndex {
    /// H <= W: the profile follows the building height everywhere.
    Squat = 1,
    /// W < H <= 2W: the profile switches between height and width.
    Intermediate = 2,
    /// H > 2W: the profile additionally tracks the row's own elevation.
    Slender = 3,
}

impl GeometryIndex {
    /// Classify a building by its height and width.
    ///
    /// The H = 2W boundary classifies as `Intermediate`; only a strictly
    /// greater height is `Slender`.
    pub fn from_dimensions(height: f64, width: f64) -> Self {
        if height <= width {
            GeometryIndex::Squat
        } else if height > 2.0 * width {
            GeometryIndex::Slender
        } else {
            GeometryIndex::Intermediate
        }
    }
}

/// Immutable per-run inputs shared by every row correction.
///
/// Built once per request and read concurrently by all worker tasks. The
/// geometry index is classified here, at construction, and never
/// recomputed mid-run.
#[derive(Debug, Clone, Copy)]
pub struct CorrectionContext {
    pub height: f64,
    pub width: f64,
    pub index: GeometryIndex,
    /// Spatial correlation coefficient for the run.
    pub correlation: f64,
    /// Dynamic response coefficient; only the pulsation formula reads it.
    pub dynamic: f64,
    pub area: AreaParameters,
}

impl CorrectionContext {
    pub fn new(
        height: f64,
        width: f64,
        area: AreaParameters,
        correlation: f64,
        dynamic: f64,
    ) -> Self {
        Self {
            height,
            width,
            index: GeometryIndex::from_dimensions(height, width),
            correlation,
            dynamic,
            area,
        }
    }
}

/// Round to three decimal places.
fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Height exposure factor K(z_ek) at the equivalent height 0.8 * H.
///
/// K = k10 * (0.8 * H / 10)^(2 * alfa), rounded to three decimals.
pub fn height_exposure(height: f64, area: &AreaParameters) -> f64 {
    round3(area.k10 * (height * 0.8 / 10.0).powf(2.0 * area.alfa))
}

/// Resonance frequency ratio e1 for the first natural frequency.
///
/// e1 = sqrt(1.4 * K(z_ek) * w0) / 940 / f1, rounded to three decimals.
///
/// # Arguments
///
/// * `pressure` - Basic wind pressure w0 in Pa
/// * `k_zek` - Height exposure factor from [`height_exposure`]
/// * `frequency` - First natural frequency f1 in Hz
pub fn resonance_ratio(pressure: f64, k_zek: f64, frequency: f64) -> f64 {
    round3((pressure * k_zek * 1.4).sqrt() / 940.0 / frequency)
}

/// Dynamic response coefficient xi as a function of e1.
///
/// Quartic fit of the code chart, one polynomial per damping decrement,
/// rounded to three decimals.
pub fn dynamic_coefficient(e1: f64, decrement: Decrement) -> f64 {
    let xi = match decrement {
        Decrement::D03 => {
            -1917.9 * e1.powi(4) + 971.95 * e1.powi(3) - 187.65 * e1.powi(2) + 19.745 * e1 + 1.0
        }
        Decrement::D015 => {
            -3333.3 * e1.powi(4) + 1666.7 * e1.powi(3) - 311.67 * e1.powi(2) + 31.833 * e1 + 1.0
        }
    };
    round3(xi)
}

/// Resolve the dynamic coefficient actually used by a pulsation run.
///
/// A structure without a known first natural frequency takes 1.0. When the
/// frequency is known, the computed coefficient is used; 0.0 marks a
/// missing coefficient and is rejected by request validation.
pub fn resolved_dynamic(frequency_known: bool, xi: Option<f64>) -> f64 {
    match (frequency_known, xi) {
        (false, _) => 1.0,
        (true, Some(value)) => value,
        (true, None) => 0.0,
    }
}

/// Dimension driving the turbulence profile exponent at elevation `z`.
fn profile_dimension(ctx: &CorrectionContext, z: f64) -> f64 {
    let dimension = ctx.height - ctx.width;
    match ctx.index {
        GeometryIndex::Squat => ctx.height,
        GeometryIndex::Intermediate => {
            if z >= dimension {
                ctx.height
            } else {
                ctx.width
            }
        }
        GeometryIndex::Slender => {
            if z >= dimension {
                ctx.height
            } else if z <= ctx.width {
                ctx.width
            } else {
                z
            }
        }
    }
}

/// Pulsation correction for one row's pressure at elevation `z`.
///
/// p * (dzeta10 * (d/10)^-alfa) * xi * corr + p, where d is the profile
/// dimension for `z`. The trailing `+ p` term is the mean component and is
/// not scaled by the correlation coefficient.
pub fn correct_pulsation(pressure: f64, z: f64, ctx: &CorrectionContext) -> f64 {
    let d = profile_dimension(ctx, z);
    let turbulence = ctx.area.dzeta10 * (d / 10.0).powf(-ctx.area.alfa);
    pressure * turbulence * ctx.dynamic * ctx.correlation + pressure
}

/// Peak correction for one row's pressure at elevation `z`.
///
/// p * (1 + dzeta10 * (d/10)^-alfa) * corr. Unlike the pulsation formula
/// the whole term is scaled by the correlation coefficient and no dynamic
/// coefficient applies.
pub fn correct_peak(pressure: f64, z: f64, ctx: &CorrectionContext) -> f64 {
    let d = profile_dimension(ctx, z);
    let turbulence = ctx.area.dzeta10 * (d / 10.0).powf(-ctx.area.alfa);
    pressure * (1.0 + turbulence) * ctx.correlation
}
