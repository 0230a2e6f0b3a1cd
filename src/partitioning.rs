//! Modified Priestley-Taylor latent heat flux components.
//!
//! Raw multiplicative chains; bounds are enforced later in `closure`.

use ndarray::{Array2, ArrayView2, Zip};
#[cfg(feature = "python")]
use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
use crate::constants::PT_ALPHA;
#[cfg(feature = "python")]
use crate::utils::check_shape;

/// LE_soil = α·ε·(Rn_soil - G)·f_wet·f_SM
#[inline]
pub fn soil_latent_heat_flux(
    alpha: f64,
    epsilon: f64,
    rn_soil: f64,
    g: f64,
    fwet: f64,
    fsm: f64,
) -> f64 {
    alpha * epsilon * (rn_soil - g) * fwet * fsm
}

/// LE_canopy = α·ε·Rn_canopy·(1 - f_wet)·f_g·f_T·f_M
///
/// `canopy_stress` is the product f_g·f_T·f_M.
#[inline]
pub fn canopy_latent_heat_flux(
    alpha: f64,
    epsilon: f64,
    rn_canopy: f64,
    fwet: f64,
    canopy_stress: f64,
) -> f64 {
    alpha * epsilon * rn_canopy * (1.0 - fwet) * canopy_stress
}

/// LE_interception = α·ε·Rn_canopy·f_wet
#[inline]
pub fn interception_latent_heat_flux(alpha: f64, epsilon: f64, rn_canopy: f64, fwet: f64) -> f64 {
    alpha * epsilon * rn_canopy * fwet
}

pub struct PartitionResult {
    pub le_soil: Array2<f64>,
    pub le_canopy: Array2<f64>,
    pub le_interception: Array2<f64>,
}

/// Views over every field the flux partitioner reads.
#[derive(Clone, Copy)]
pub struct PartitionInputs<'a> {
    pub epsilon: ArrayView2<'a, f64>,
    pub rn_soil: ArrayView2<'a, f64>,
    pub rn_canopy: ArrayView2<'a, f64>,
    pub g: ArrayView2<'a, f64>,
    pub fwet: ArrayView2<'a, f64>,
    pub fsm: ArrayView2<'a, f64>,
    pub fg: ArrayView2<'a, f64>,
    pub ft: ArrayView2<'a, f64>,
    pub fm: ArrayView2<'a, f64>,
}

pub fn compute_partitioning_pure(inputs: &PartitionInputs<'_>, alpha: f64) -> PartitionResult {
    let eps = &inputs.epsilon;

    let le_soil = Zip::from(eps)
        .and(&inputs.rn_soil)
        .and(&inputs.g)
        .and(&inputs.fwet)
        .and(&inputs.fsm)
        .par_map_collect(|&e, &r, &g, &w, &s| soil_latent_heat_flux(alpha, e, r, g, w, s));

    // five producers at most per map; fold the canopy stress first
    let canopy_stress = Zip::from(&inputs.fg)
        .and(&inputs.ft)
        .and(&inputs.fm)
        .par_map_collect(|&g, &t, &m| g * t * m);
    let le_canopy = Zip::from(eps)
        .and(&inputs.rn_canopy)
        .and(&inputs.fwet)
        .and(&canopy_stress)
        .par_map_collect(|&e, &r, &w, &s| canopy_latent_heat_flux(alpha, e, r, w, s));

    let le_interception = Zip::from(eps)
        .and(&inputs.rn_canopy)
        .and(&inputs.fwet)
        .par_map_collect(|&e, &r, &w| interception_latent_heat_flux(alpha, e, r, w));

    PartitionResult {
        le_soil,
        le_canopy,
        le_interception,
    }
}

/// Compute raw soil, canopy and interception latent heat flux (W/m²).
///
/// All arrays must share one shape. Values are not clamped; pass them through
/// `closure.close_fluxes` for bounded output.
///
/// Returns tuple (le_soil, le_canopy, le_interception)
#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(signature = (epsilon, rn_soil, rn_canopy, g, fwet, fsm, fg, ft, fm, pt_alpha=PT_ALPHA))]
#[allow(clippy::too_many_arguments, clippy::type_complexity)]
pub fn compute_partitioning<'py>(
    py: Python<'py>,
    epsilon: PyReadonlyArray2<'py, f64>,
    rn_soil: PyReadonlyArray2<'py, f64>,
    rn_canopy: PyReadonlyArray2<'py, f64>,
    g: PyReadonlyArray2<'py, f64>,
    fwet: PyReadonlyArray2<'py, f64>,
    fsm: PyReadonlyArray2<'py, f64>,
    fg: PyReadonlyArray2<'py, f64>,
    ft: PyReadonlyArray2<'py, f64>,
    fm: PyReadonlyArray2<'py, f64>,
    pt_alpha: f64,
) -> PyResult<(
    Bound<'py, PyArray2<f64>>,
    Bound<'py, PyArray2<f64>>,
    Bound<'py, PyArray2<f64>>,
)> {
    let inputs = PartitionInputs {
        epsilon: epsilon.as_array(),
        rn_soil: rn_soil.as_array(),
        rn_canopy: rn_canopy.as_array(),
        g: g.as_array(),
        fwet: fwet.as_array(),
        fsm: fsm.as_array(),
        fg: fg.as_array(),
        ft: ft.as_array(),
        fm: fm.as_array(),
    };
    let expected = inputs.epsilon.dim();
    for (field, view) in [
        ("Rn_soil", inputs.rn_soil),
        ("Rn_canopy", inputs.rn_canopy),
        ("G", inputs.g),
        ("fwet", inputs.fwet),
        ("fSM", inputs.fsm),
        ("fg", inputs.fg),
        ("fT", inputs.ft),
        ("fM", inputs.fm),
    ] {
        check_shape(field, expected, view.dim())?;
    }
    let p = compute_partitioning_pure(&inputs, pt_alpha);
    Ok((
        p.le_soil.into_pyarray(py),
        p.le_canopy.into_pyarray(py),
        p.le_interception.into_pyarray(py),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_soil_flux() {
        // 1.26 * 0.5 * (200 - 50) * 0.25 * 0.8
        assert_relative_eq!(
            soil_latent_heat_flux(1.26, 0.5, 200.0, 50.0, 0.25, 0.8),
            18.9,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_wet_canopy_does_not_transpire() {
        assert_eq!(canopy_latent_heat_flux(1.26, 0.7, 300.0, 1.0, 0.9), 0.0);
        assert_relative_eq!(
            interception_latent_heat_flux(1.26, 0.7, 300.0, 1.0),
            1.26 * 0.7 * 300.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_grid_matches_kernels() {
        let eps = array![[0.6, 0.7]];
        let rn_soil = array![[100.0, 0.0]];
        let rn_canopy = array![[300.0, 400.0]];
        let g = array![[20.0, 0.0]];
        let fwet = array![[0.1, 0.0001]];
        let fsm = array![[0.9, 0.5]];
        let fg = array![[0.8, 1.0]];
        let ft = array![[0.95, 1.0]];
        let fm = array![[0.7, 0.5]];
        let inputs = PartitionInputs {
            epsilon: eps.view(),
            rn_soil: rn_soil.view(),
            rn_canopy: rn_canopy.view(),
            g: g.view(),
            fwet: fwet.view(),
            fsm: fsm.view(),
            fg: fg.view(),
            ft: ft.view(),
            fm: fm.view(),
        };
        let p = compute_partitioning_pure(&inputs, 1.26);
        assert_relative_eq!(
            p.le_soil[[0, 0]],
            soil_latent_heat_flux(1.26, 0.6, 100.0, 20.0, 0.1, 0.9),
            max_relative = 1e-12
        );
        assert_relative_eq!(
            p.le_canopy[[0, 0]],
            1.26 * 0.6 * 300.0 * 0.9 * 0.8 * 0.95 * 0.7,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            p.le_interception[[0, 1]],
            1.26 * 0.7 * 400.0 * 0.0001,
            max_relative = 1e-12
        );
        assert_eq!(p.le_soil[[0, 1]], 0.0);
    }

    #[test]
    fn test_soil_grid_keeps_factor_order() {
        // same left-to-right product as the kernel, bit for bit
        let eps = array![[0.613]];
        let rn_soil = array![[187.3]];
        let rn_canopy = array![[0.0]];
        let g = array![[41.9]];
        let fwet = array![[0.37]];
        let fsm = array![[0.83]];
        let one = array![[1.0]];
        let inputs = PartitionInputs {
            epsilon: eps.view(),
            rn_soil: rn_soil.view(),
            rn_canopy: rn_canopy.view(),
            g: g.view(),
            fwet: fwet.view(),
            fsm: fsm.view(),
            fg: one.view(),
            ft: one.view(),
            fm: one.view(),
        };
        let p = compute_partitioning_pure(&inputs, 1.26);
        let expected = soil_latent_heat_flux(1.26, 0.613, 187.3, 41.9, 0.37, 0.83);
        assert_eq!(p.le_soil[[0, 0]].to_bits(), expected.to_bits());
    }
}
