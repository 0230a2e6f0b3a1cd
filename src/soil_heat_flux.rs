//! SEBAL soil heat flux (Bastiaanssen 2000).

use ndarray::{Array2, ArrayView2, Zip};
#[cfg(feature = "python")]
use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
#[cfg(feature = "python")]
use pyo3::prelude::*;

use crate::error::{PtJplError, Result};
use crate::radiation::{SoilHeatFluxEstimator, SurfaceContext};
use crate::utils::{check_shape, non_negative};

/// G = Rn · ST · (0.0038 + 0.0074 · albedo) · (1 - 0.98 · NDVI⁴), floored at 0.
#[inline]
pub fn sebal_soil_heat_flux(rn: f64, st_c: f64, ndvi: f64, albedo: f64) -> f64 {
    let vegetation_correction = 1.0 - 0.98 * ndvi.powi(4);
    non_negative(rn * st_c * (0.0038 + 0.0074 * albedo) * vegetation_correction)
}

pub fn sebal_soil_heat_flux_pure(
    rn: ArrayView2<f64>,
    st_c: ArrayView2<f64>,
    ndvi: ArrayView2<f64>,
    albedo: ArrayView2<f64>,
) -> Array2<f64> {
    Zip::from(&rn)
        .and(&st_c)
        .and(&ndvi)
        .and(&albedo)
        .par_map_collect(|&r, &s, &n, &a| sebal_soil_heat_flux(r, s, n, a))
}

/// Soil heat flux estimator; needs albedo in the surface context.
#[derive(Debug, Clone, Copy, Default)]
pub struct SebalSoilHeatFlux;

impl SoilHeatFluxEstimator for SebalSoilHeatFlux {
    fn name(&self) -> &'static str {
        "SEBAL soil heat flux"
    }

    fn estimate_g(&self, rn: ArrayView2<'_, f64>, ctx: &SurfaceContext<'_>) -> Result<Array2<f64>> {
        let albedo = ctx.albedo.ok_or(PtJplError::MissingInput {
            field: "albedo",
            needed_by: self.name(),
        })?;
        check_shape("albedo", ctx.shape(), albedo.dim())?;
        check_shape("Rn", ctx.shape(), rn.dim())?;
        Ok(sebal_soil_heat_flux_pure(rn, ctx.st_c, ctx.ndvi, albedo))
    }
}

/// SEBAL soil heat flux.
///
/// Parameters:
/// - rn: Net radiation (W/m²)
/// - st_c: Surface temperature (°C)
/// - ndvi: Normalized difference vegetation index
/// - albedo: Surface albedo (0-1)
///
/// Returns G (W/m²)
#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "sebal_soil_heat_flux")]
pub fn sebal_soil_heat_flux_grid<'py>(
    py: Python<'py>,
    rn: PyReadonlyArray2<'py, f64>,
    st_c: PyReadonlyArray2<'py, f64>,
    ndvi: PyReadonlyArray2<'py, f64>,
    albedo: PyReadonlyArray2<'py, f64>,
) -> PyResult<Bound<'py, PyArray2<f64>>> {
    let rn_v = rn.as_array();
    let expected = rn_v.dim();
    check_shape("ST", expected, st_c.as_array().dim())?;
    check_shape("NDVI", expected, ndvi.as_array().dim())?;
    check_shape("albedo", expected, albedo.as_array().dim())?;
    let g = sebal_soil_heat_flux_pure(rn_v, st_c.as_array(), ndvi.as_array(), albedo.as_array());
    Ok(g.into_pyarray(py))
}
