//! Vegetation indices and canopy fractions derived from NDVI.
//!
//! NDVI → SAVI → fAPAR, NDVI → fIPAR → LAI (Carlson), and the green canopy
//! fraction fAPAR/fIPAR. NaN pixels (nodata) stay NaN in every output.

use ndarray::{Array2, ArrayView2, Zip};
#[cfg(feature = "python")]
use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
#[cfg(feature = "python")]
use pyo3::prelude::*;

use crate::constants::{FAPAR_OFFSET, FAPAR_SLOPE, FIPAR_A, FIPAR_B, FIPAR_C, MAX_FIPAR, SAVI_L};
#[cfg(any(feature = "python", test))]
use crate::constants::{KPAR, MAX_LAI};

/// Soil-adjusted vegetation index, SAVI = (1 + L)(NDVI + L) / (NDVI + L + 1).
///
/// The denominator vanishes at NDVI = -1.5; that pixel resolves to 0.
#[inline]
pub fn savi_from_ndvi(ndvi: f64) -> f64 {
    let denom = ndvi + SAVI_L + 1.0;
    if denom == 0.0 {
        return 0.0;
    }
    (1.0 + SAVI_L) * (ndvi + SAVI_L) / denom
}

/// Absorbed PAR fraction from SAVI, clamped to [0, 1].
#[inline]
pub fn fapar_from_savi(savi: f64) -> f64 {
    (FAPAR_SLOPE * savi + FAPAR_OFFSET).clamp(0.0, 1.0)
}

/// Intercepted PAR fraction from NDVI (quadratic regression), clamped to [0, 0.95].
#[inline]
pub fn fipar_from_ndvi(ndvi: f64) -> f64 {
    (FIPAR_A * ndvi * ndvi + FIPAR_B * ndvi + FIPAR_C).clamp(0.0, MAX_FIPAR)
}

/// Green canopy fraction f_g = min(fAPAR / fIPAR, 1), 0 where fIPAR is 0.
#[inline]
pub fn green_canopy_fraction(fapar: f64, fipar: f64) -> f64 {
    if fapar.is_nan() || fipar.is_nan() {
        return f64::NAN;
    }
    if fipar <= 0.0 {
        return 0.0;
    }
    (fapar / fipar).clamp(0.0, 1.0)
}

/// Carlson LAI: inverted Beer-Lambert extinction, LAI = -ln(1 - fIPAR) / k_par.
///
/// Zero where fIPAR is 0, clamped to [0, max_lai].
#[inline]
pub fn carlson_lai(fipar: f64, k_par: f64, max_lai: f64) -> f64 {
    if fipar.is_nan() {
        return f64::NAN;
    }
    if fipar <= 0.0 {
        return 0.0;
    }
    (-(1.0 - fipar).ln() / k_par).clamp(0.0, max_lai)
}

/// All vegetation fields for one grid.
pub struct VegetationResult {
    pub savi: Array2<f64>,
    pub fapar: Array2<f64>,
    pub fipar: Array2<f64>,
    pub fg: Array2<f64>,
    pub lai: Array2<f64>,
}

/// Pure-ndarray vegetation processor.
/// Callable from pipeline.rs (fused path) or from the PyO3 wrapper (modular path).
pub fn compute_vegetation_pure(
    ndvi: ArrayView2<f64>,
    k_par: f64,
    max_lai: f64,
) -> VegetationResult {
    let savi = Zip::from(&ndvi).par_map_collect(|&n| savi_from_ndvi(n));
    let fapar = Zip::from(&savi).par_map_collect(|&s| fapar_from_savi(s));
    let fipar = Zip::from(&ndvi).par_map_collect(|&n| fipar_from_ndvi(n));
    let fg = Zip::from(&fapar)
        .and(&fipar)
        .par_map_collect(|&a, &i| green_canopy_fraction(a, i));
    let lai = Zip::from(&fipar).par_map_collect(|&i| carlson_lai(i, k_par, max_lai));

    VegetationResult {
        savi,
        fapar,
        fipar,
        fg,
        lai,
    }
}

/// Derive vegetation fields from NDVI.
///
/// Parameters:
/// - ndvi: Normalized difference vegetation index grid
/// - k_par: PAR extinction coefficient for LAI (default 0.5)
/// - max_lai: LAI ceiling (default 10)
///
/// Returns tuple (savi, fapar, fipar, fg, lai)
#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(signature = (ndvi, k_par=KPAR, max_lai=MAX_LAI))]
#[allow(clippy::type_complexity)]
pub fn compute_vegetation<'py>(
    py: Python<'py>,
    ndvi: PyReadonlyArray2<'py, f64>,
    k_par: f64,
    max_lai: f64,
) -> PyResult<(
    Bound<'py, PyArray2<f64>>,
    Bound<'py, PyArray2<f64>>,
    Bound<'py, PyArray2<f64>>,
    Bound<'py, PyArray2<f64>>,
    Bound<'py, PyArray2<f64>>,
)> {
    let veg = compute_vegetation_pure(ndvi.as_array(), k_par, max_lai);
    Ok((
        veg.savi.into_pyarray(py),
        veg.fapar.into_pyarray(py),
        veg.fipar.into_pyarray(py),
        veg.fg.into_pyarray(py),
        veg.lai.into_pyarray(py),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_savi_and_fapar_at_half_ndvi() {
        let savi = savi_from_ndvi(0.5);
        assert_relative_eq!(savi, 0.75, epsilon = 1e-12);
        // 1.3632 * 0.75 - 0.048
        assert_relative_eq!(fapar_from_savi(savi), 0.9744, epsilon = 1e-12);
    }

    #[test]
    fn test_savi_zero_denominator_falls_back_to_zero() {
        assert_eq!(savi_from_ndvi(-1.5), 0.0);
    }

    #[test]
    fn test_fapar_is_clamped() {
        assert_eq!(fapar_from_savi(-0.5), 0.0);
        assert_eq!(fapar_from_savi(2.0), 1.0);
    }

    #[test]
    fn test_fipar_ceiling_and_floor() {
        assert_relative_eq!(fipar_from_ndvi(0.5), 0.80245, epsilon = 1e-12);
        assert_eq!(fipar_from_ndvi(0.9), MAX_FIPAR);
        assert_eq!(fipar_from_ndvi(-0.5), 0.0);
    }

    #[test]
    fn test_green_canopy_fraction_guards_zero_fipar() {
        assert_eq!(green_canopy_fraction(0.3, 0.0), 0.0);
        assert_eq!(green_canopy_fraction(0.9, 0.5), 1.0);
        assert_relative_eq!(green_canopy_fraction(0.2, 0.4), 0.5);
        assert!(green_canopy_fraction(f64::NAN, 0.4).is_nan());
    }

    #[test]
    fn test_carlson_lai() {
        assert_eq!(carlson_lai(0.0, KPAR, MAX_LAI), 0.0);
        assert_relative_eq!(
            carlson_lai(0.80245, KPAR, MAX_LAI),
            3.2435271242494745,
            epsilon = 1e-9
        );
        // 0.95 ceiling keeps LAI finite: -ln(0.05) / 0.5
        assert_relative_eq!(carlson_lai(0.95, KPAR, MAX_LAI), 5.991464547107982, epsilon = 1e-9);
        assert_eq!(carlson_lai(0.95, KPAR, 2.0), 2.0);
    }

    #[test]
    fn test_grid_shapes_and_nodata() {
        let ndvi = array![[0.5, -0.5], [f64::NAN, 0.9]];
        let veg = compute_vegetation_pure(ndvi.view(), KPAR, MAX_LAI);
        for field in [&veg.savi, &veg.fapar, &veg.fipar, &veg.fg, &veg.lai] {
            assert_eq!(field.dim(), (2, 2));
            assert!(field[[1, 0]].is_nan());
        }
        // bare pixel: no canopy at all
        assert_eq!(veg.fipar[[0, 1]], 0.0);
        assert_eq!(veg.fg[[0, 1]], 0.0);
        assert_eq!(veg.lai[[0, 1]], 0.0);
    }
}
