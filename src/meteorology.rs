//! Meteorological terms: saturation vapour pressure, its slope, the
//! Priestley-Taylor epsilon, vapour pressure deficit and surface wetness.

use ndarray::{Array2, ArrayView2, Zip};
#[cfg(feature = "python")]
use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
#[cfg(feature = "python")]
use pyo3::prelude::*;

use crate::constants::{MAGNUS_A, MAGNUS_B, MAGNUS_E0_KPA};
#[cfg(feature = "python")]
use crate::constants::{GAMMA_PA, MIN_FWET, RH_THRESHOLD};
use crate::params::ModelParams;
use crate::utils::{finite_or_nan, non_negative};

/// Saturation vapour pressure (Pa), Magnus-Tetens form.
///
/// Returns 0 at and below -237.3 °C where the expression has a pole.
#[inline]
pub fn saturation_vapor_pressure_pa(ta_c: f64) -> f64 {
    let t = ta_c + MAGNUS_B;
    if t <= 0.0 {
        return 0.0;
    }
    MAGNUS_E0_KPA * 1000.0 * (MAGNUS_A * ta_c / t).exp()
}

/// Slope of the saturation vapour pressure curve, Δ (Pa/°C).
///
/// Δ = 4098 · 0.6108 · exp(17.27 Ta / (Ta + 237.3)) / (Ta + 237.3)², converted
/// from kPa to Pa. Same pole guard as [`saturation_vapor_pressure_pa`].
#[inline]
pub fn delta_pa_from_ta_c(ta_c: f64) -> f64 {
    let t = ta_c + MAGNUS_B;
    if t <= 0.0 {
        return 0.0;
    }
    4098.0 * saturation_vapor_pressure_pa(ta_c) / (t * t)
}

/// Priestley-Taylor epsilon, ε = Δ / (Δ + γ). 0 where Δ + γ ≤ 0.
#[inline]
pub fn epsilon_from_delta(delta_pa: f64, gamma_pa: f64) -> f64 {
    let denom = delta_pa + gamma_pa;
    if denom <= 0.0 {
        return 0.0;
    }
    delta_pa / denom
}

/// Vapour pressure deficit (Pa) from saturation pressure and RH ∈ [0, 1].
#[inline]
pub fn vapor_pressure_deficit(svp_pa: f64, rh: f64) -> f64 {
    non_negative(svp_pa - rh * svp_pa)
}

/// Relative surface wetness.
///
/// RH⁴ when RH is strictly above the threshold, otherwise `min_fwet`. The
/// step is deliberate: no blending across the threshold. With thresholding
/// off, RH⁴ floored at `min_fwet`.
#[inline]
pub fn relative_surface_wetness(rh: f64, threshold: Option<f64>, min_fwet: f64) -> f64 {
    if !rh.is_finite() {
        return f64::NAN;
    }
    match threshold {
        Some(t) if rh > t => rh.powi(4),
        Some(_) => min_fwet,
        None => rh.powi(4).max(min_fwet),
    }
}

/// Meteorological fields for one grid.
pub struct MeteorologyResult {
    /// RH after clipping to [0, 1]
    pub rh: Array2<f64>,
    pub svp: Array2<f64>,
    pub ea: Array2<f64>,
    pub vpd: Array2<f64>,
    pub delta: Array2<f64>,
    pub epsilon: Array2<f64>,
    pub fwet: Array2<f64>,
}

/// Pure-ndarray meteorological processor.
///
/// `delta` and `epsilon` overrides skip the corresponding derivation: with ε
/// supplied Δ is still reported (computed from Ta unless also supplied) but
/// ε is taken as given.
pub fn compute_meteorology_pure(
    ta_c: ArrayView2<f64>,
    rh: ArrayView2<f64>,
    delta: Option<ArrayView2<f64>>,
    epsilon: Option<ArrayView2<f64>>,
    params: &ModelParams,
) -> MeteorologyResult {
    let threshold = params.apply_rh_threshold.then_some(params.rh_threshold);
    let min_fwet = params.min_fwet;
    let gamma = params.gamma_pa;

    let rh = Zip::from(&rh).par_map_collect(|&r| finite_or_nan(r).clamp(0.0, 1.0));
    let svp = Zip::from(&ta_c).par_map_collect(|&t| saturation_vapor_pressure_pa(t));
    let ea = Zip::from(&rh).and(&svp).par_map_collect(|&r, &es| r * es);
    let vpd = Zip::from(&svp)
        .and(&rh)
        .par_map_collect(|&es, &r| vapor_pressure_deficit(es, r));
    let delta = match delta {
        Some(d) => d.to_owned(),
        None => Zip::from(&ta_c).par_map_collect(|&t| delta_pa_from_ta_c(t)),
    };
    let epsilon = match epsilon {
        Some(e) => e.to_owned(),
        None => Zip::from(&delta).par_map_collect(|&d| epsilon_from_delta(d, gamma)),
    };
    let fwet =
        Zip::from(&rh).par_map_collect(|&r| relative_surface_wetness(r, threshold, min_fwet));

    MeteorologyResult {
        rh,
        svp,
        ea,
        vpd,
        delta,
        epsilon,
        fwet,
    }
}

/// Derive meteorological terms from air temperature and relative humidity.
///
/// Parameters:
/// - ta_c: Air temperature (°C)
/// - rh: Relative humidity (fraction 0-1, clipped)
/// - gamma_pa: Psychrometric constant (Pa/°C, default 66.2)
/// - rh_threshold: Wetness threshold (default 0.7, None disables)
/// - min_fwet: Wetness floor (default 0.0001)
///
/// Returns tuple (delta_pa, epsilon, vpd_pa, fwet)
#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(signature = (ta_c, rh, gamma_pa=GAMMA_PA, rh_threshold=Some(RH_THRESHOLD), min_fwet=MIN_FWET))]
#[allow(clippy::type_complexity)]
pub fn compute_meteorology<'py>(
    py: Python<'py>,
    ta_c: PyReadonlyArray2<'py, f64>,
    rh: PyReadonlyArray2<'py, f64>,
    gamma_pa: f64,
    rh_threshold: Option<f64>,
    min_fwet: f64,
) -> PyResult<(
    Bound<'py, PyArray2<f64>>,
    Bound<'py, PyArray2<f64>>,
    Bound<'py, PyArray2<f64>>,
    Bound<'py, PyArray2<f64>>,
)> {
    let ta_v = ta_c.as_array();
    let rh_v = rh.as_array();
    crate::utils::check_shape("RH", ta_v.dim(), rh_v.dim())?;
    let params = ModelParams {
        gamma_pa,
        rh_threshold: rh_threshold.unwrap_or(RH_THRESHOLD),
        apply_rh_threshold: rh_threshold.is_some(),
        min_fwet,
        ..ModelParams::default()
    };
    params.validate()?;
    let met = compute_meteorology_pure(ta_v, rh_v, None, None, &params);
    Ok((
        met.delta.into_pyarray(py),
        met.epsilon.into_pyarray(py),
        met.vpd.into_pyarray(py),
        met.fwet.into_pyarray(py),
    ))
}
