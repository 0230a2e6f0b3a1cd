//! Instantaneous net radiation after Verma et al. (2016).
//!
//! Shortwave balance from incoming radiation and albedo; longwave balance from
//! a Brutsaert-type clear-sky atmospheric emissivity (black-body sky under
//! cloud) against surface emission.

use ndarray::{Array2, ArrayView2, Zip};
#[cfg(feature = "python")]
use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
#[cfg(feature = "python")]
use pyo3::prelude::*;

use crate::constants::{KELVIN_OFFSET, SBC};
use crate::error::{PtJplError, Result};
use crate::radiation::{NetRadiationEstimator, SurfaceContext};
use crate::utils::{check_shape, non_negative};

const ESTIMATOR: &str = "Verma net radiation";

/// Actual vapour pressure (Pa) from the Tetens form over water.
#[inline]
pub fn actual_vapor_pressure_pa(ta_c: f64, rh: f64) -> f64 {
    // Ta_K - 35.85 expressed in °C
    let denom = ta_c + KELVIN_OFFSET - 35.85;
    if denom <= 0.0 {
        return 0.0;
    }
    rh * 0.6113 * 10f64.powf(7.5 * ta_c / denom) * 1000.0
}

/// Clear-sky atmospheric emissivity from vapour pressure and air temperature.
#[inline]
pub fn atmospheric_emissivity(ea_pa: f64, ta_k: f64) -> f64 {
    if ta_k <= 0.0 {
        return 0.0;
    }
    let eta1 = 0.465 * ea_pa / ta_k;
    1.0 - (1.0 + eta1) * (-(1.2 + 3.0 * eta1).sqrt()).exp()
}

/// Incoming longwave radiation (W/m²).
#[inline]
pub fn incoming_longwave(ta_c: f64, rh: f64, cloudy: bool) -> f64 {
    let ta_k = ta_c + KELVIN_OFFSET;
    if ta_k <= 0.0 {
        return 0.0;
    }
    let black_body = SBC * ta_k.powi(4);
    if cloudy {
        black_body
    } else {
        atmospheric_emissivity(actual_vapor_pressure_pa(ta_c, rh), ta_k) * black_body
    }
}

/// Outgoing longwave radiation (W/m²), emissivity clipped to [0, 1].
#[inline]
pub fn outgoing_longwave(st_c: f64, emissivity: f64) -> f64 {
    emissivity.clamp(0.0, 1.0) * SBC * (st_c + KELVIN_OFFSET).powi(4)
}

/// Reflected shortwave (W/m²), albedo clipped to [0, 1].
#[inline]
pub fn outgoing_shortwave(swin: f64, albedo: f64) -> f64 {
    non_negative(swin * albedo.clamp(0.0, 1.0))
}

/// Net radiation from its four components, each balance floored at 0.
#[inline]
pub fn net_radiation(sw_in: f64, sw_out: f64, lw_in: f64, lw_out: f64) -> f64 {
    let sw_net = non_negative(sw_in - sw_out);
    let lw_net = non_negative(lw_in - lw_out);
    non_negative(sw_net + lw_net)
}

pub struct VermaResult {
    pub sw_out: Array2<f64>,
    pub sw_net: Array2<f64>,
    pub lw_in: Array2<f64>,
    pub lw_out: Array2<f64>,
    pub rn: Array2<f64>,
}

#[allow(clippy::too_many_arguments)]
pub fn verma_net_radiation_pure(
    swin: ArrayView2<f64>,
    albedo: ArrayView2<f64>,
    st_c: ArrayView2<f64>,
    emissivity: ArrayView2<f64>,
    ta_c: ArrayView2<f64>,
    rh: ArrayView2<f64>,
    cloud_mask: Option<ArrayView2<bool>>,
) -> VermaResult {
    let sw_out = Zip::from(&swin)
        .and(&albedo)
        .par_map_collect(|&s, &a| outgoing_shortwave(s, a));
    let sw_net = Zip::from(&swin)
        .and(&sw_out)
        .par_map_collect(|&s, &o| non_negative(s - o));
    let lw_in = match cloud_mask {
        Some(mask) => Zip::from(&ta_c)
            .and(&rh)
            .and(&mask)
            .par_map_collect(|&t, &r, &c| incoming_longwave(t, r, c)),
        None => Zip::from(&ta_c)
            .and(&rh)
            .par_map_collect(|&t, &r| incoming_longwave(t, r, false)),
    };
    let lw_out = Zip::from(&st_c)
        .and(&emissivity)
        .par_map_collect(|&s, &e| outgoing_longwave(s, e));
    let rn = Zip::from(&swin)
        .and(&sw_out)
        .and(&lw_in)
        .and(&lw_out)
        .par_map_collect(|&si, &so, &li, &lo| net_radiation(si, so, li, lo));

    VermaResult {
        sw_out,
        sw_net,
        lw_in,
        lw_out,
        rn,
    }
}

/// Net radiation estimator backed by [`verma_net_radiation_pure`].
///
/// Needs incoming shortwave, albedo and emissivity in the surface context.
#[derive(Debug, Clone, Copy, Default)]
pub struct VermaNetRadiation;

impl VermaNetRadiation {
    pub fn components(&self, ctx: &SurfaceContext<'_>) -> Result<VermaResult> {
        let shape = ctx.shape();
        let swin = ctx.swin.ok_or(PtJplError::MissingInput {
            field: "SWin",
            needed_by: ESTIMATOR,
        })?;
        let albedo = ctx.albedo.ok_or(PtJplError::MissingInput {
            field: "albedo",
            needed_by: ESTIMATOR,
        })?;
        let emissivity = ctx.emissivity.ok_or(PtJplError::MissingInput {
            field: "emissivity",
            needed_by: ESTIMATOR,
        })?;
        check_shape("SWin", shape, swin.dim())?;
        check_shape("albedo", shape, albedo.dim())?;
        check_shape("emissivity", shape, emissivity.dim())?;
        if let Some(mask) = ctx.cloud_mask {
            check_shape("cloud_mask", shape, mask.dim())?;
        }
        Ok(verma_net_radiation_pure(
            swin,
            albedo,
            ctx.st_c,
            emissivity,
            ctx.ta_c,
            ctx.rh,
            ctx.cloud_mask,
        ))
    }
}

impl NetRadiationEstimator for VermaNetRadiation {
    fn name(&self) -> &'static str {
        ESTIMATOR
    }

    fn estimate_rn(&self, ctx: &SurfaceContext<'_>) -> Result<Array2<f64>> {
        Ok(self.components(ctx)?.rn)
    }
}

/// Verma net radiation.
///
/// Parameters:
/// - swin: Incoming shortwave (W/m²)
/// - albedo: Surface albedo (0-1)
/// - st_c: Surface temperature (°C)
/// - emissivity: Surface emissivity (0-1)
/// - ta_c: Air temperature (°C)
/// - rh: Relative humidity (0-1)
/// - cloud_mask: Optional overcast mask
///
/// Returns tuple (sw_out, sw_net, lw_in, lw_out, rn)
#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(signature = (swin, albedo, st_c, emissivity, ta_c, rh, cloud_mask=None))]
#[allow(clippy::too_many_arguments, clippy::type_complexity)]
pub fn verma_net_radiation<'py>(
    py: Python<'py>,
    swin: PyReadonlyArray2<'py, f64>,
    albedo: PyReadonlyArray2<'py, f64>,
    st_c: PyReadonlyArray2<'py, f64>,
    emissivity: PyReadonlyArray2<'py, f64>,
    ta_c: PyReadonlyArray2<'py, f64>,
    rh: PyReadonlyArray2<'py, f64>,
    cloud_mask: Option<PyReadonlyArray2<'py, bool>>,
) -> PyResult<(
    Bound<'py, PyArray2<f64>>,
    Bound<'py, PyArray2<f64>>,
    Bound<'py, PyArray2<f64>>,
    Bound<'py, PyArray2<f64>>,
    Bound<'py, PyArray2<f64>>,
)> {
    let st_v = st_c.as_array();
    let ta_v = ta_c.as_array();
    let rh_v = rh.as_array();
    let mask_v = cloud_mask.as_ref().map(|m| m.as_array());
    check_shape("Ta", st_v.dim(), ta_v.dim())?;
    check_shape("RH", st_v.dim(), rh_v.dim())?;
    let ctx = SurfaceContext {
        ndvi: st_v,
        st_c: st_v,
        ta_c: ta_v,
        rh: rh_v,
        albedo: Some(albedo.as_array()),
        emissivity: Some(emissivity.as_array()),
        swin: Some(swin.as_array()),
        cloud_mask: mask_v,
    };
    let v = VermaNetRadiation.components(&ctx)?;
    Ok((
        v.sw_out.into_pyarray(py),
        v.sw_net.into_pyarray(py),
        v.lw_in.into_pyarray(py),
        v.lw_out.into_pyarray(py),
        v.rn.into_pyarray(py),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_vapor_pressure_at_20c() {
        // 0.6113 * 10^(150 / 257.3) kPa, saturated
        let ea = actual_vapor_pressure_pa(20.0, 1.0);
        assert_relative_eq!(ea, 611.3 * 10f64.powf(150.0 / 257.3), max_relative = 1e-12);
        assert_relative_eq!(actual_vapor_pressure_pa(20.0, 0.5), ea / 2.0, max_relative = 1e-12);
        assert_eq!(actual_vapor_pressure_pa(-240.0, 0.5), 0.0);
    }

    #[test]
    fn test_atmospheric_emissivity_range() {
        let e = atmospheric_emissivity(1169.0, 293.15);
        assert!(e > 0.5 && e < 1.0, "emissivity {e}");
        // drier air emits less
        assert!(atmospheric_emissivity(200.0, 293.15) < e);
    }

    #[test]
    fn test_cloud_sky_is_black_body() {
        let lw = incoming_longwave(20.0, 0.5, true);
        assert_relative_eq!(lw, SBC * 293.15f64.powi(4), max_relative = 1e-12);
        assert!(incoming_longwave(20.0, 0.5, false) < lw);
    }

    #[test]
    fn test_shortwave_clips_albedo() {
        assert_eq!(outgoing_shortwave(800.0, 1.5), 800.0);
        assert_eq!(outgoing_shortwave(800.0, -0.2), 0.0);
        assert_relative_eq!(outgoing_shortwave(800.0, 0.2), 160.0);
    }

    #[test]
    fn test_net_radiation_floors() {
        // longwave deficit does not offset shortwave gain
        assert_eq!(net_radiation(800.0, 160.0, 300.0, 450.0), 640.0);
        assert_eq!(net_radiation(0.0, 0.0, 300.0, 450.0), 0.0);
        assert_eq!(net_radiation(800.0, 160.0, 450.0, 300.0), 790.0);
    }

    #[test]
    fn test_grid_with_cloud_mask() {
        let swin = array![[800.0, 800.0]];
        let albedo = array![[0.2, 0.2]];
        let st = array![[30.0, 30.0]];
        let emis = array![[0.98, 0.98]];
        let ta = array![[20.0, 20.0]];
        let rh = array![[0.5, 0.5]];
        let mask = array![[false, true]];
        let v = verma_net_radiation_pure(
            swin.view(),
            albedo.view(),
            st.view(),
            emis.view(),
            ta.view(),
            rh.view(),
            Some(mask.view()),
        );
        assert_relative_eq!(v.sw_net[[0, 0]], 640.0);
        assert!(v.lw_in[[0, 1]] > v.lw_in[[0, 0]]);
        assert!(v.rn[[0, 0]] >= 640.0);
        assert!(v.rn.iter().all(|&r| r >= 0.0));
    }

    #[test]
    fn test_estimator_requires_shortwave() {
        let grid = Array2::<f64>::zeros((2, 2));
        let ctx = SurfaceContext {
            ndvi: grid.view(),
            st_c: grid.view(),
            ta_c: grid.view(),
            rh: grid.view(),
            albedo: Some(grid.view()),
            emissivity: Some(grid.view()),
            swin: None,
            cloud_mask: None,
        };
        let err = VermaNetRadiation.estimate_rn(&ctx).unwrap_err();
        assert!(matches!(
            err,
            PtJplError::MissingInput {
                field: "SWin",
                needed_by: "Verma net radiation"
            }
        ));
    }
}
