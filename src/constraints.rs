//! Dimensionless stress functions that bound canopy and soil fluxes.

use ndarray::{Array2, ArrayView2, Zip};
#[cfg(feature = "python")]
use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
use crate::constants::BETA_PA;
use crate::params::ModelParams;

/// Topt after the optional corrections: raised to Ta where Ta is warmer
/// (`floor_topt`), then clamped from below (`minimum_topt`).
#[inline]
pub fn corrected_topt(ta_c: f64, topt_c: f64, floor_topt: bool, minimum_topt: Option<f64>) -> f64 {
    if !ta_c.is_finite() || !topt_c.is_finite() {
        return f64::NAN;
    }
    let mut topt = if floor_topt && ta_c > topt_c { ta_c } else { topt_c };
    if let Some(min) = minimum_topt {
        if topt < min {
            topt = min;
        }
    }
    topt
}

/// Plant temperature constraint f_T = exp(-((Ta - Topt) / Topt)²).
///
/// Topt = 0 has no defined optimum; f_T resolves to 0 there.
#[inline]
pub fn plant_temperature_constraint(ta_c: f64, topt_c: f64) -> f64 {
    if !ta_c.is_finite() || !topt_c.is_finite() {
        return f64::NAN;
    }
    if topt_c == 0.0 {
        return 0.0;
    }
    let x = (ta_c - topt_c) / topt_c;
    (-(x * x)).exp()
}

/// Plant moisture constraint f_M = fAPAR / fAPARmax, clamped to [0, 1].
/// 0 where the climatological maximum is not positive.
#[inline]
pub fn plant_moisture_constraint(fapar: f64, fapar_max: f64) -> f64 {
    if !fapar.is_finite() || !fapar_max.is_finite() {
        return f64::NAN;
    }
    if fapar_max <= 0.0 {
        return 0.0;
    }
    (fapar / fapar_max).clamp(0.0, 1.0)
}

/// Soil moisture constraint f_SM = min(RH / (RH + VPD/β), 1).
///
/// VPD = 0 gives 1 for any RH > 0. RH = VPD = 0 takes the RH → 0 limit, 0.
#[inline]
pub fn soil_moisture_constraint(rh: f64, vpd_pa: f64, beta_pa: f64) -> f64 {
    if !rh.is_finite() || !vpd_pa.is_finite() {
        return f64::NAN;
    }
    let denom = rh + vpd_pa / beta_pa;
    if denom <= 0.0 {
        return 0.0;
    }
    (rh / denom).clamp(0.0, 1.0)
}

pub struct ConstraintResult {
    /// Topt actually used for f_T
    pub topt: Array2<f64>,
    pub ft: Array2<f64>,
    pub fm: Array2<f64>,
    pub fsm: Array2<f64>,
}

/// Pure-ndarray constraint engine.
pub fn compute_constraints_pure(
    ta_c: ArrayView2<f64>,
    topt_c: ArrayView2<f64>,
    fapar: ArrayView2<f64>,
    fapar_max: ArrayView2<f64>,
    rh: ArrayView2<f64>,
    vpd_pa: ArrayView2<f64>,
    params: &ModelParams,
) -> ConstraintResult {
    let floor_topt = params.floor_topt;
    let minimum_topt = params.minimum_topt;
    let beta = params.beta_pa;

    let topt = Zip::from(&ta_c)
        .and(&topt_c)
        .par_map_collect(|&t, &o| corrected_topt(t, o, floor_topt, minimum_topt));
    let ft = Zip::from(&ta_c)
        .and(&topt)
        .par_map_collect(|&t, &o| plant_temperature_constraint(t, o));
    let fm = Zip::from(&fapar)
        .and(&fapar_max)
        .par_map_collect(|&f, &m| plant_moisture_constraint(f, m));
    let fsm = Zip::from(&rh)
        .and(&vpd_pa)
        .par_map_collect(|&r, &v| soil_moisture_constraint(r, v, beta));

    ConstraintResult { topt, ft, fm, fsm }
}

/// Compute f_T, f_M and f_SM.
///
/// Parameters:
/// - ta_c: Air temperature (°C)
/// - topt_c: Optimum temperature for phenology (°C, climatology)
/// - fapar: Absorbed PAR fraction
/// - fapar_max: Climatological maximum fAPAR
/// - rh: Relative humidity (0-1)
/// - vpd_pa: Vapour pressure deficit (Pa)
/// - beta_pa: Soil moisture VPD scale (Pa, default 200)
///
/// Returns tuple (ft, fm, fsm)
#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(signature = (ta_c, topt_c, fapar, fapar_max, rh, vpd_pa, beta_pa=BETA_PA, floor_topt=false, minimum_topt=None))]
#[allow(clippy::too_many_arguments, clippy::type_complexity)]
pub fn compute_constraints<'py>(
    py: Python<'py>,
    ta_c: PyReadonlyArray2<'py, f64>,
    topt_c: PyReadonlyArray2<'py, f64>,
    fapar: PyReadonlyArray2<'py, f64>,
    fapar_max: PyReadonlyArray2<'py, f64>,
    rh: PyReadonlyArray2<'py, f64>,
    vpd_pa: PyReadonlyArray2<'py, f64>,
    beta_pa: f64,
    floor_topt: bool,
    minimum_topt: Option<f64>,
) -> PyResult<(
    Bound<'py, PyArray2<f64>>,
    Bound<'py, PyArray2<f64>>,
    Bound<'py, PyArray2<f64>>,
)> {
    let ta_v = ta_c.as_array();
    let expected = ta_v.dim();
    crate::utils::check_shape("Topt", expected, topt_c.as_array().dim())?;
    crate::utils::check_shape("fAPAR", expected, fapar.as_array().dim())?;
    crate::utils::check_shape("fAPARmax", expected, fapar_max.as_array().dim())?;
    crate::utils::check_shape("RH", expected, rh.as_array().dim())?;
    crate::utils::check_shape("VPD", expected, vpd_pa.as_array().dim())?;

    let params = ModelParams {
        beta_pa,
        floor_topt,
        minimum_topt,
        ..ModelParams::default()
    };
    params.validate()?;
    let c = compute_constraints_pure(
        ta_v,
        topt_c.as_array(),
        fapar.as_array(),
        fapar_max.as_array(),
        rh.as_array(),
        vpd_pa.as_array(),
        &params,
    );
    Ok((
        c.ft.into_pyarray(py),
        c.fm.into_pyarray(py),
        c.fsm.into_pyarray(py),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MINIMUM_TOPT;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_ft_peaks_at_topt() {
        assert_eq!(plant_temperature_constraint(25.0, 25.0), 1.0);
        // ((20 - 25) / 25)² = 0.04
        assert_relative_eq!(
            plant_temperature_constraint(20.0, 25.0),
            (-0.04f64).exp(),
            epsilon = 1e-12
        );
        let below = plant_temperature_constraint(10.0, 25.0);
        assert!(below > 0.0 && below < 1.0);
    }

    #[test]
    fn test_ft_zero_topt_fallback() {
        assert_eq!(plant_temperature_constraint(20.0, 0.0), 0.0);
        assert_eq!(plant_temperature_constraint(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_topt_corrections() {
        assert_eq!(corrected_topt(30.0, 25.0, false, None), 25.0);
        assert_eq!(corrected_topt(30.0, 25.0, true, None), 30.0);
        assert_eq!(corrected_topt(20.0, 25.0, true, None), 25.0);
        assert_eq!(corrected_topt(-5.0, 0.0, false, Some(MINIMUM_TOPT)), MINIMUM_TOPT);
        assert!(corrected_topt(f64::NAN, 25.0, true, Some(0.1)).is_nan());
    }

    #[test]
    fn test_fm_ratio_and_guards() {
        assert_relative_eq!(plant_moisture_constraint(0.4, 0.8), 0.5);
        assert_eq!(plant_moisture_constraint(0.9, 0.6), 1.0);
        assert_eq!(plant_moisture_constraint(0.4, 0.0), 0.0);
        assert_eq!(plant_moisture_constraint(0.4, -0.1), 0.0);
    }

    #[test]
    fn test_infinite_inputs_are_nodata() {
        assert!(plant_moisture_constraint(0.4, f64::INFINITY).is_nan());
        assert!(plant_temperature_constraint(f64::NEG_INFINITY, 25.0).is_nan());
        assert!(corrected_topt(20.0, f64::INFINITY, false, None).is_nan());
        assert!(soil_moisture_constraint(f64::INFINITY, 100.0, 200.0).is_nan());
    }

    #[test]
    fn test_fsm_edges() {
        // saturated air: no deficit
        assert_eq!(soil_moisture_constraint(0.8, 0.0, 200.0), 1.0);
        // bone dry
        assert_eq!(soil_moisture_constraint(0.0, 1500.0, 200.0), 0.0);
        // 0/0
        assert_eq!(soil_moisture_constraint(0.0, 0.0, 200.0), 0.0);
        // 0.5 / (0.5 + 100/200)
        assert_relative_eq!(soil_moisture_constraint(0.5, 100.0, 200.0), 0.5);
    }

    #[test]
    fn test_grid_applies_params() {
        let ta = array![[30.0, 10.0]];
        let topt = array![[25.0, 0.0]];
        let fapar = array![[0.5, 0.2]];
        let fapar_max = array![[1.0, 0.0]];
        let rh = array![[0.5, 0.0]];
        let vpd = array![[100.0, 0.0]];

        let params = ModelParams::default();
        let c = compute_constraints_pure(
            ta.view(),
            topt.view(),
            fapar.view(),
            fapar_max.view(),
            rh.view(),
            vpd.view(),
            &params,
        );
        assert!(c.ft[[0, 0]] < 1.0);
        assert_eq!(c.ft[[0, 1]], 0.0);
        assert_eq!(c.fm, array![[0.5, 0.0]]);
        assert_eq!(c.fsm, array![[0.5, 0.0]]);

        let params = ModelParams {
            floor_topt: true,
            minimum_topt: Some(0.1),
            ..ModelParams::default()
        };
        let c = compute_constraints_pure(
            ta.view(),
            topt.view(),
            fapar.view(),
            fapar_max.view(),
            rh.view(),
            vpd.view(),
            &params,
        );
        assert_eq!(c.topt, array![[30.0, 10.0]]);
        assert_eq!(c.ft, array![[1.0, 1.0]]);
    }
}
