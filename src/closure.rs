//! Physical closure of the latent heat flux components.
//!
//! Rule: each component is floored at 0. The potential ET cap
//! α·ε·(Rn - G) is floored at 0. When the components sum past the cap, all
//! three are scaled by cap/sum. LE_total is always the sum of the closed
//! components. A non-finite input makes every output at that pixel NaN.

use ndarray::{Array2, ArrayView2, Zip};
use ndarray_stats::QuantileExt;
#[cfg(feature = "python")]
use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
use crate::constants::PT_ALPHA;
use crate::utils::non_negative;
#[cfg(feature = "python")]
use crate::utils::check_shape;

/// Potential ET, α·ε·(Rn - G) (W/m²). Not floored; see [`close_fluxes`].
#[inline]
pub fn potential_et(alpha: f64, epsilon: f64, rn: f64, g: f64) -> f64 {
    alpha * epsilon * (rn - g)
}

/// One pixel after closure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosedFluxes {
    pub soil: f64,
    pub canopy: f64,
    pub interception: f64,
    pub total: f64,
    /// Components were scaled down to meet the cap
    pub rescaled: bool,
}

impl ClosedFluxes {
    const NODATA: Self = Self {
        soil: f64::NAN,
        canopy: f64::NAN,
        interception: f64::NAN,
        total: f64::NAN,
        rescaled: false,
    };
}

#[inline]
pub fn close_fluxes(soil: f64, canopy: f64, interception: f64, pet: f64) -> ClosedFluxes {
    if [soil, canopy, interception, pet].iter().any(|v| !v.is_finite()) {
        return ClosedFluxes::NODATA;
    }
    let mut soil = non_negative(soil);
    let mut canopy = non_negative(canopy);
    let mut interception = non_negative(interception);
    let cap = non_negative(pet);
    let sum = soil + canopy + interception;

    let rescaled = sum > cap;
    if rescaled {
        let scale = cap / sum;
        soil *= scale;
        canopy *= scale;
        interception *= scale;
    }
    ClosedFluxes {
        soil,
        canopy,
        interception,
        total: soil + canopy + interception,
        rescaled,
    }
}

/// Counts reported once per run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QcSummary {
    pub pixels: usize,
    pub nodata: usize,
    pub rescaled: usize,
    /// Largest valid LE_total; NaN when every pixel is nodata
    pub max_le: f64,
}

pub struct ClosureResult {
    pub le_soil: Array2<f64>,
    pub le_canopy: Array2<f64>,
    pub le_interception: Array2<f64>,
    pub le: Array2<f64>,
    pub pet: Array2<f64>,
    pub summary: QcSummary,
}

#[allow(clippy::too_many_arguments)]
pub fn close_fluxes_pure(
    le_soil: ArrayView2<f64>,
    le_canopy: ArrayView2<f64>,
    le_interception: ArrayView2<f64>,
    rn: ArrayView2<f64>,
    g: ArrayView2<f64>,
    epsilon: ArrayView2<f64>,
    alpha: f64,
) -> ClosureResult {
    let pet = Zip::from(&epsilon)
        .and(&rn)
        .and(&g)
        .par_map_collect(|&e, &r, &g| potential_et(alpha, e, r, g));

    let mut soil = le_soil.to_owned();
    let mut canopy = le_canopy.to_owned();
    let mut interception = le_interception.to_owned();
    let mut total = Array2::<f64>::zeros(pet.dim());
    let mut rescaled = Array2::<bool>::from_elem(pet.dim(), false);

    Zip::from(&mut soil)
        .and(&mut canopy)
        .and(&mut interception)
        .and(&mut total)
        .and(&mut rescaled)
        .and(&pet)
        .par_for_each(|s, c, i, t, r, &p| {
            let closed = close_fluxes(*s, *c, *i, p);
            *s = closed.soil;
            *c = closed.canopy;
            *i = closed.interception;
            *t = closed.total;
            *r = closed.rescaled;
        });

    let summary = summarize(&total, &rescaled);
    ClosureResult {
        le_soil: soil,
        le_canopy: canopy,
        le_interception: interception,
        le: total,
        pet,
        summary,
    }
}

fn summarize(total: &Array2<f64>, rescaled: &Array2<bool>) -> QcSummary {
    let pixels = total.len();
    let nodata = total.iter().filter(|v| v.is_nan()).count();
    let rescaled = rescaled.iter().filter(|&&r| r).count();
    let max_le = *total.max_skipnan();

    log::info!(
        "closure: {} pixels, {} nodata, {} rescaled to potential ET, max LE {:.2} W/m²",
        pixels,
        nodata,
        rescaled,
        max_le
    );
    let valid = pixels - nodata;
    if valid > 0 && rescaled * 2 > valid {
        log::warn!(
            "{} of {} valid pixels exceeded potential ET and were rescaled",
            rescaled,
            valid
        );
    }
    QcSummary {
        pixels,
        nodata,
        rescaled,
        max_le,
    }
}

/// Apply closure to raw flux components.
///
/// Parameters:
/// - le_soil, le_canopy, le_interception: Raw components (W/m²)
/// - rn, g: Net radiation and soil heat flux (W/m²)
/// - epsilon: Priestley-Taylor epsilon
/// - pt_alpha: Priestley-Taylor alpha (default 1.26)
///
/// Returns tuple (le_soil, le_canopy, le_interception, le, pet)
#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "close_fluxes", signature = (le_soil, le_canopy, le_interception, rn, g, epsilon, pt_alpha=PT_ALPHA))]
#[allow(clippy::too_many_arguments, clippy::type_complexity)]
pub fn close_fluxes_grid<'py>(
    py: Python<'py>,
    le_soil: PyReadonlyArray2<'py, f64>,
    le_canopy: PyReadonlyArray2<'py, f64>,
    le_interception: PyReadonlyArray2<'py, f64>,
    rn: PyReadonlyArray2<'py, f64>,
    g: PyReadonlyArray2<'py, f64>,
    epsilon: PyReadonlyArray2<'py, f64>,
    pt_alpha: f64,
) -> PyResult<(
    Bound<'py, PyArray2<f64>>,
    Bound<'py, PyArray2<f64>>,
    Bound<'py, PyArray2<f64>>,
    Bound<'py, PyArray2<f64>>,
    Bound<'py, PyArray2<f64>>,
)> {
    let expected = le_soil.as_array().dim();
    check_shape("LE_canopy", expected, le_canopy.as_array().dim())?;
    check_shape("LE_interception", expected, le_interception.as_array().dim())?;
    check_shape("Rn", expected, rn.as_array().dim())?;
    check_shape("G", expected, g.as_array().dim())?;
    check_shape("epsilon", expected, epsilon.as_array().dim())?;
    let c = close_fluxes_pure(
        le_soil.as_array(),
        le_canopy.as_array(),
        le_interception.as_array(),
        rn.as_array(),
        g.as_array(),
        epsilon.as_array(),
        pt_alpha,
    );
    Ok((
        c.le_soil.into_pyarray(py),
        c.le_canopy.into_pyarray(py),
        c.le_interception.into_pyarray(py),
        c.le.into_pyarray(py),
        c.pet.into_pyarray(py),
    ))
}
