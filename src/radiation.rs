//! Net radiation partitioning between soil and canopy.
//!
//! Rn and G are either supplied by the caller or produced by an estimator
//! (Verma for Rn, SEBAL for G). The choice is made once per run when the
//! source is resolved, never per pixel.

use ndarray::{Array2, ArrayView2, Zip};
#[cfg(feature = "python")]
use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
use crate::constants::KRN;
use crate::error::{PtJplError, Result};
use crate::utils::{check_shape, non_negative};

/// Ancillary surface and meteorological fields an estimator may draw on.
///
/// All present views share the shape of `ndvi`.
#[derive(Clone, Copy)]
pub struct SurfaceContext<'a> {
    pub ndvi: ArrayView2<'a, f64>,
    /// Surface temperature (°C)
    pub st_c: ArrayView2<'a, f64>,
    /// Air temperature (°C)
    pub ta_c: ArrayView2<'a, f64>,
    /// Relative humidity (0-1)
    pub rh: ArrayView2<'a, f64>,
    pub albedo: Option<ArrayView2<'a, f64>>,
    pub emissivity: Option<ArrayView2<'a, f64>>,
    /// Incoming shortwave radiation (W/m²)
    pub swin: Option<ArrayView2<'a, f64>>,
    /// true where the sky is overcast
    pub cloud_mask: Option<ArrayView2<'a, bool>>,
}

impl SurfaceContext<'_> {
    pub fn shape(&self) -> (usize, usize) {
        self.ndvi.dim()
    }
}

/// Produces net radiation (W/m²) when the caller has none.
pub trait NetRadiationEstimator: Send + Sync {
    fn name(&self) -> &'static str;
    fn estimate_rn(&self, ctx: &SurfaceContext<'_>) -> Result<Array2<f64>>;
}

/// Produces soil heat flux (W/m²) from resolved net radiation.
pub trait SoilHeatFluxEstimator: Send + Sync {
    fn name(&self) -> &'static str;
    fn estimate_g(&self, rn: ArrayView2<'_, f64>, ctx: &SurfaceContext<'_>) -> Result<Array2<f64>>;
}

/// Where net radiation comes from.
pub enum NetRadiationSource<'a> {
    Direct(ArrayView2<'a, f64>),
    Estimated(&'a dyn NetRadiationEstimator),
}

/// Where soil heat flux comes from.
pub enum SoilHeatFluxSource<'a> {
    Direct(ArrayView2<'a, f64>),
    Estimated(&'a dyn SoilHeatFluxEstimator),
}

impl NetRadiationSource<'_> {
    pub fn resolve(&self, ctx: &SurfaceContext<'_>) -> Result<Array2<f64>> {
        match self {
            Self::Direct(rn) => {
                check_shape("Rn", ctx.shape(), rn.dim())?;
                Ok(rn.to_owned())
            }
            Self::Estimated(est) => {
                log::debug!("Rn not supplied, estimating with {}", est.name());
                let rn = est.estimate_rn(ctx)?;
                estimator_output(est.name(), ctx.shape(), rn)
            }
        }
    }
}

impl SoilHeatFluxSource<'_> {
    pub fn resolve(
        &self,
        rn: ArrayView2<'_, f64>,
        ctx: &SurfaceContext<'_>,
    ) -> Result<Array2<f64>> {
        match self {
            Self::Direct(g) => {
                check_shape("G", ctx.shape(), g.dim())?;
                Ok(g.to_owned())
            }
            Self::Estimated(est) => {
                log::debug!("G not supplied, estimating with {}", est.name());
                let g = est.estimate_g(rn, ctx)?;
                estimator_output(est.name(), ctx.shape(), g)
            }
        }
    }
}

fn estimator_output(
    estimator: &'static str,
    expected: (usize, usize),
    field: Array2<f64>,
) -> Result<Array2<f64>> {
    if field.dim() != expected {
        return Err(PtJplError::EstimatorFailed {
            estimator,
            reason: format!("returned {:?} grid, expected {:?}", field.dim(), expected),
        });
    }
    Ok(field)
}

/// Net radiation reaching the soil through the canopy, Rn·exp(-k·LAI).
#[inline]
pub fn soil_net_radiation(rn: f64, lai: f64, k_rn: f64) -> f64 {
    non_negative(rn * (-k_rn * lai).exp())
}

/// Net radiation absorbed by the canopy, Rn - Rn_soil.
#[inline]
pub fn canopy_net_radiation(rn: f64, rn_soil: f64) -> f64 {
    non_negative(rn - rn_soil)
}

pub struct RadiationResult {
    pub rn: Array2<f64>,
    pub g: Array2<f64>,
    pub rn_soil: Array2<f64>,
    pub rn_canopy: Array2<f64>,
}

/// Split resolved net radiation by canopy attenuation.
pub fn partition_net_radiation_pure(
    rn: ArrayView2<f64>,
    lai: ArrayView2<f64>,
    k_rn: f64,
) -> (Array2<f64>, Array2<f64>) {
    let rn_soil = Zip::from(&rn)
        .and(&lai)
        .par_map_collect(|&r, &l| soil_net_radiation(r, l, k_rn));
    let rn_canopy = Zip::from(&rn)
        .and(&rn_soil)
        .par_map_collect(|&r, &s| canopy_net_radiation(r, s));
    (rn_soil, rn_canopy)
}

/// Radiation partitioner: resolve Rn then G, then split Rn by LAI.
pub fn compute_radiation_pure(
    rn_source: &NetRadiationSource<'_>,
    g_source: &SoilHeatFluxSource<'_>,
    lai: ArrayView2<f64>,
    ctx: &SurfaceContext<'_>,
    k_rn: f64,
) -> Result<RadiationResult> {
    check_shape("LAI", ctx.shape(), lai.dim())?;
    let rn = rn_source.resolve(ctx)?;
    let g = g_source.resolve(rn.view(), ctx)?;
    let (rn_soil, rn_canopy) = partition_net_radiation_pure(rn.view(), lai, k_rn);
    Ok(RadiationResult {
        rn,
        g,
        rn_soil,
        rn_canopy,
    })
}

/// Partition net radiation into soil and canopy shares.
///
/// Parameters:
/// - rn: Net radiation (W/m²)
/// - lai: Leaf area index
/// - k_rn: Extinction coefficient (default 0.5)
///
/// Returns tuple (rn_soil, rn_canopy)
#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(signature = (rn, lai, k_rn=KRN))]
pub fn partition_net_radiation<'py>(
    py: Python<'py>,
    rn: PyReadonlyArray2<'py, f64>,
    lai: PyReadonlyArray2<'py, f64>,
    k_rn: f64,
) -> PyResult<(Bound<'py, PyArray2<f64>>, Bound<'py, PyArray2<f64>>)> {
    let rn_v = rn.as_array();
    let lai_v = lai.as_array();
    check_shape("LAI", rn_v.dim(), lai_v.dim())?;
    let (rn_soil, rn_canopy) = partition_net_radiation_pure(rn_v, lai_v, k_rn);
    Ok((rn_soil.into_pyarray(py), rn_canopy.into_pyarray(py)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    struct Constant(f64);

    impl NetRadiationEstimator for Constant {
        fn name(&self) -> &'static str {
            "constant"
        }
        fn estimate_rn(&self, ctx: &SurfaceContext<'_>) -> Result<Array2<f64>> {
            Ok(Array2::from_elem(ctx.shape(), self.0))
        }
    }

    impl SoilHeatFluxEstimator for Constant {
        fn name(&self) -> &'static str {
            "constant"
        }
        fn estimate_g(
            &self,
            rn: ArrayView2<'_, f64>,
            _ctx: &SurfaceContext<'_>,
        ) -> Result<Array2<f64>> {
            Ok(rn.mapv(|r| r * self.0))
        }
    }

    struct WrongShape;

    impl NetRadiationEstimator for WrongShape {
        fn name(&self) -> &'static str {
            "wrong-shape"
        }
        fn estimate_rn(&self, _ctx: &SurfaceContext<'_>) -> Result<Array2<f64>> {
            Ok(Array2::zeros((1, 1)))
        }
    }

    fn context<'a>(grid: &'a Array2<f64>) -> SurfaceContext<'a> {
        SurfaceContext {
            ndvi: grid.view(),
            st_c: grid.view(),
            ta_c: grid.view(),
            rh: grid.view(),
            albedo: None,
            emissivity: None,
            swin: None,
            cloud_mask: None,
        }
    }

    #[test]
    fn test_partition_sums_to_rn() {
        let soil = soil_net_radiation(400.0, 2.0, 0.5);
        assert_relative_eq!(soil, 400.0 * (-1.0f64).exp(), epsilon = 1e-12);
        let canopy = canopy_net_radiation(400.0, soil);
        assert_relative_eq!(soil + canopy, 400.0, epsilon = 1e-9);
    }

    #[test]
    fn test_bare_soil_takes_all_radiation() {
        assert_eq!(soil_net_radiation(400.0, 0.0, 0.5), 400.0);
        assert_eq!(canopy_net_radiation(400.0, 400.0), 0.0);
    }

    #[test]
    fn test_negative_rn_partitions_to_zero() {
        let soil = soil_net_radiation(-50.0, 1.0, 0.5);
        assert_eq!(soil, 0.0);
        assert_eq!(canopy_net_radiation(-50.0, soil), 0.0);
        assert!(soil_net_radiation(f64::NAN, 1.0, 0.5).is_nan());
    }

    #[test]
    fn test_direct_sources_are_checked() {
        let grid = Array2::<f64>::zeros((2, 2));
        let ctx = context(&grid);
        let rn = array![[1.0, 2.0, 3.0]];
        let err = NetRadiationSource::Direct(rn.view()).resolve(&ctx).unwrap_err();
        assert!(matches!(err, PtJplError::ShapeMismatch { field: "Rn", .. }));
    }

    #[test]
    fn test_estimated_sources_resolve_in_order() {
        let grid = Array2::<f64>::zeros((2, 2));
        let ctx = context(&grid);
        let lai = Array2::<f64>::zeros((2, 2));
        let rn_est = Constant(500.0);
        let g_est = Constant(0.1);
        let r = compute_radiation_pure(
            &NetRadiationSource::Estimated(&rn_est),
            &SoilHeatFluxSource::Estimated(&g_est),
            lai.view(),
            &ctx,
            0.5,
        )
        .unwrap();
        assert_eq!(r.rn, Array2::from_elem((2, 2), 500.0));
        assert_relative_eq!(r.g[[1, 1]], 50.0);
        assert_eq!(r.rn_soil, r.rn);
        assert_eq!(r.rn_canopy, Array2::zeros((2, 2)));
    }

    #[test]
    fn test_estimator_shape_is_enforced() {
        let grid = Array2::<f64>::zeros((2, 2));
        let ctx = context(&grid);
        let err = NetRadiationSource::Estimated(&WrongShape)
            .resolve(&ctx)
            .unwrap_err();
        assert!(matches!(
            err,
            PtJplError::EstimatorFailed {
                estimator: "wrong-shape",
                ..
            }
        ));
    }
}
