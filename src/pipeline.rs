//! Fused PT-JPL pipeline: one call from input fields to closed flux components.
//!
//! Stages run strictly forward: vegetation ∥ meteorology → radiation →
//! constraints → partitioning → closure. Every intermediate stays an
//! `Array2<f64>`; shapes and collaborators are settled before any pixel is
//! touched.

use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView2, Zip};
#[cfg(feature = "python")]
use numpy::{IntoPyArray, PyReadonlyArray2};
#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3::types::PyDict;

use crate::climatology::{Climatology, ClimatologyRequest};
use crate::closure::{close_fluxes_pure, QcSummary};
use crate::constraints::compute_constraints_pure;
use crate::error::{PtJplError, Result};
use crate::meteorology::compute_meteorology_pure;
use crate::net_radiation::VermaNetRadiation;
use crate::params::ModelParams;
#[cfg(feature = "python")]
use crate::params::PyModelParams;
use crate::partitioning::{compute_partitioning_pure, PartitionInputs};
use crate::radiation::{
    compute_radiation_pure, NetRadiationEstimator, NetRadiationSource, SoilHeatFluxEstimator,
    SoilHeatFluxSource, SurfaceContext,
};
use crate::soil_heat_flux::SebalSoilHeatFlux;
use crate::utils::check_shape;
use crate::vegetation::compute_vegetation_pure;

// ── Inputs ─────────────────────────────────────────────────────────────────

/// Pixel-aligned input fields. NDVI and surface temperature are required;
/// everything else is optional and may be supplied by a collaborator.
#[derive(Clone, Copy)]
pub struct PtJplInputs<'a> {
    pub ndvi: ArrayView2<'a, f64>,
    /// Surface temperature (°C)
    pub st_c: ArrayView2<'a, f64>,
    /// Air temperature (°C)
    pub ta_c: Option<ArrayView2<'a, f64>>,
    /// Relative humidity (0-1)
    pub rh: Option<ArrayView2<'a, f64>>,
    /// Net radiation (W/m²)
    pub rn: Option<ArrayView2<'a, f64>>,
    /// Soil heat flux (W/m²)
    pub g: Option<ArrayView2<'a, f64>>,
    pub topt_c: Option<ArrayView2<'a, f64>>,
    pub fapar_max: Option<ArrayView2<'a, f64>>,
    pub albedo: Option<ArrayView2<'a, f64>>,
    pub emissivity: Option<ArrayView2<'a, f64>>,
    /// Incoming shortwave (W/m²)
    pub swin: Option<ArrayView2<'a, f64>>,
    pub cloud_mask: Option<ArrayView2<'a, bool>>,
    pub delta: Option<ArrayView2<'a, f64>>,
    pub epsilon: Option<ArrayView2<'a, f64>>,
    pub day_of_year: Option<u32>,
}

impl<'a> PtJplInputs<'a> {
    pub fn new(ndvi: ArrayView2<'a, f64>, st_c: ArrayView2<'a, f64>) -> Self {
        Self {
            ndvi,
            st_c,
            ta_c: None,
            rh: None,
            rn: None,
            g: None,
            topt_c: None,
            fapar_max: None,
            albedo: None,
            emissivity: None,
            swin: None,
            cloud_mask: None,
            delta: None,
            epsilon: None,
            day_of_year: None,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.ndvi.dim()
    }

    /// Every present field must share the NDVI shape.
    pub fn validate_shapes(&self) -> Result<()> {
        let expected = self.shape();
        check_shape("ST", expected, self.st_c.dim())?;
        let optional = [
            ("Ta", self.ta_c),
            ("RH", self.rh),
            ("Rn", self.rn),
            ("G", self.g),
            ("Topt", self.topt_c),
            ("fAPARmax", self.fapar_max),
            ("albedo", self.albedo),
            ("emissivity", self.emissivity),
            ("SWin", self.swin),
            ("delta", self.delta),
            ("epsilon", self.epsilon),
        ];
        for (field, view) in optional {
            if let Some(v) = view {
                check_shape(field, expected, v.dim())?;
            }
        }
        if let Some(mask) = self.cloud_mask {
            check_shape("cloud_mask", expected, mask.dim())?;
        }
        Ok(())
    }
}

/// Estimators consulted only for fields missing from [`PtJplInputs`].
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub net_radiation: Option<&'a dyn NetRadiationEstimator>,
    pub soil_heat_flux: Option<&'a dyn SoilHeatFluxEstimator>,
    pub climatology: Option<&'a dyn Climatology>,
}

impl<'a> Collaborators<'a> {
    /// No estimators: every field must be supplied directly.
    pub fn none() -> Self {
        Self {
            net_radiation: None,
            soil_heat_flux: None,
            climatology: None,
        }
    }

    pub fn with_climatology(mut self, climatology: &'a dyn Climatology) -> Self {
        self.climatology = Some(climatology);
        self
    }
}

impl Default for Collaborators<'_> {
    /// Verma for Rn, SEBAL for G, no climatology.
    fn default() -> Self {
        Self {
            net_radiation: Some(&VermaNetRadiation),
            soil_heat_flux: Some(&SebalSoilHeatFlux),
            climatology: None,
        }
    }
}

// ── Output ─────────────────────────────────────────────────────────────────

/// Closed flux components plus every diagnostic field of the run.
#[derive(Debug, Clone)]
pub struct PtJplOutput {
    pub le: Array2<f64>,
    pub le_soil: Array2<f64>,
    pub le_canopy: Array2<f64>,
    pub le_interception: Array2<f64>,
    pub pet: Array2<f64>,
    pub rn: Array2<f64>,
    pub g: Array2<f64>,
    pub rn_soil: Array2<f64>,
    pub rn_canopy: Array2<f64>,
    pub epsilon: Array2<f64>,
    pub delta: Array2<f64>,
    pub svp: Array2<f64>,
    pub ea: Array2<f64>,
    pub vpd: Array2<f64>,
    pub fwet: Array2<f64>,
    pub fg: Array2<f64>,
    pub ft: Array2<f64>,
    pub fm: Array2<f64>,
    pub fsm: Array2<f64>,
    pub lai: Array2<f64>,
    pub savi: Array2<f64>,
    pub fapar: Array2<f64>,
    pub fipar: Array2<f64>,
    pub topt: Array2<f64>,
    pub summary: QcSummary,
}

impl PtJplOutput {
    /// Output fields keyed by their conventional names.
    pub fn into_map(self) -> BTreeMap<&'static str, Array2<f64>> {
        BTreeMap::from([
            ("LE", self.le),
            ("LE_soil", self.le_soil),
            ("LE_canopy", self.le_canopy),
            ("LE_interception", self.le_interception),
            ("PET", self.pet),
            ("Rn", self.rn),
            ("G", self.g),
            ("Rn_soil", self.rn_soil),
            ("Rn_canopy", self.rn_canopy),
            ("epsilon", self.epsilon),
            ("delta", self.delta),
            ("SVP", self.svp),
            ("Ea", self.ea),
            ("VPD", self.vpd),
            ("fwet", self.fwet),
            ("fg", self.fg),
            ("fT", self.ft),
            ("fM", self.fm),
            ("fSM", self.fsm),
            ("LAI", self.lai),
            ("SAVI", self.savi),
            ("fAPAR", self.fapar),
            ("fIPAR", self.fipar),
            ("Topt", self.topt),
        ])
    }

    fn grids_mut(&mut self) -> [&mut Array2<f64>; 24] {
        [
            &mut self.le,
            &mut self.le_soil,
            &mut self.le_canopy,
            &mut self.le_interception,
            &mut self.pet,
            &mut self.rn,
            &mut self.g,
            &mut self.rn_soil,
            &mut self.rn_canopy,
            &mut self.epsilon,
            &mut self.delta,
            &mut self.svp,
            &mut self.ea,
            &mut self.vpd,
            &mut self.fwet,
            &mut self.fg,
            &mut self.ft,
            &mut self.fm,
            &mut self.fsm,
            &mut self.lai,
            &mut self.savi,
            &mut self.fapar,
            &mut self.fipar,
            &mut self.topt,
        ]
    }
}

// ── Driver ─────────────────────────────────────────────────────────────────

fn required<'a>(
    field: &'static str,
    needed_by: &'static str,
    view: Option<ArrayView2<'a, f64>>,
) -> Result<ArrayView2<'a, f64>> {
    view.ok_or(PtJplError::MissingInput { field, needed_by })
}

/// Direct grid if present, else the climatology's, else `MissingInput`.
fn climatology_field(
    field: &'static str,
    direct: Option<ArrayView2<'_, f64>>,
    climatology: Option<&dyn Climatology>,
    request: &ClimatologyRequest,
    lookup: impl Fn(&dyn Climatology, &ClimatologyRequest) -> Result<Array2<f64>>,
) -> Result<Array2<f64>> {
    match (direct, climatology) {
        (Some(v), _) => Ok(v.to_owned()),
        (None, Some(c)) => {
            log::debug!("{} not supplied, reading climatology", field);
            let grid = lookup(c, request)?;
            check_shape(field, request.shape, grid.dim())?;
            Ok(grid)
        }
        (None, None) => Err(PtJplError::MissingInput {
            field,
            needed_by: "constraint engine",
        }),
    }
}

/// Pixels where any field is non-finite, or `None` when every pixel is
/// clean.
fn nodata_mask<'v>(
    shape: (usize, usize),
    fields: impl IntoIterator<Item = ArrayView2<'v, f64>>,
) -> Option<Array2<bool>> {
    let mut mask = Array2::from_elem(shape, false);
    for field in fields {
        Zip::from(&mut mask)
            .and(&field)
            .par_for_each(|m, &v| *m |= !v.is_finite());
    }
    mask.iter().any(|&m| m).then_some(mask)
}

fn apply_nodata(grid: &mut Array2<f64>, nodata: &Array2<bool>) {
    Zip::from(grid).and(nodata).par_for_each(|v, &m| {
        if m {
            *v = f64::NAN;
        }
    });
}

/// Run the full model on one set of aligned fields.
///
/// Fails before computing anything when a parameter is invalid, a field is
/// misaligned, or a required field has neither a direct value nor a
/// collaborator. Numerical degeneracies never fail: a pixel with a
/// non-finite value in any field is NaN in every output and counted as
/// nodata.
pub fn run_ptjpl(
    inputs: &PtJplInputs<'_>,
    params: &ModelParams,
    collaborators: &Collaborators<'_>,
) -> Result<PtJplOutput> {
    params.validate()?;
    inputs.validate_shapes()?;
    let shape = inputs.shape();

    let ta_c = required("Ta", "meteorological processor", inputs.ta_c)?;
    let rh_in = required("RH", "meteorological processor", inputs.rh)?;

    let rn_source = match (&inputs.rn, collaborators.net_radiation) {
        (Some(rn), _) => NetRadiationSource::Direct(rn.view()),
        (None, Some(est)) => NetRadiationSource::Estimated(est),
        (None, None) => {
            return Err(PtJplError::MissingInput {
                field: "Rn",
                needed_by: "radiation partitioner",
            })
        }
    };
    let g_source = match (&inputs.g, collaborators.soil_heat_flux) {
        (Some(g), _) => SoilHeatFluxSource::Direct(g.view()),
        (None, Some(est)) => SoilHeatFluxSource::Estimated(est),
        (None, None) => {
            return Err(PtJplError::MissingInput {
                field: "G",
                needed_by: "radiation partitioner",
            })
        }
    };

    let request = ClimatologyRequest {
        shape,
        day_of_year: inputs.day_of_year,
    };
    let climatology = collaborators.climatology;
    let topt = climatology_field("Topt", inputs.topt_c, climatology, &request, |c, r| {
        c.topt(r)
    })?;
    let fapar_max = climatology_field("fAPARmax", inputs.fapar_max, climatology, &request, |c, r| {
        c.fapar_max(r)
    })?;

    let fields = [
        Some(inputs.ndvi.view()),
        Some(inputs.st_c.view()),
        Some(ta_c.view()),
        Some(rh_in.view()),
        inputs.rn.as_ref().map(|v| v.view()),
        inputs.g.as_ref().map(|v| v.view()),
        Some(topt.view()),
        Some(fapar_max.view()),
        inputs.albedo.as_ref().map(|v| v.view()),
        inputs.emissivity.as_ref().map(|v| v.view()),
        inputs.swin.as_ref().map(|v| v.view()),
        inputs.delta.as_ref().map(|v| v.view()),
        inputs.epsilon.as_ref().map(|v| v.view()),
    ];
    let nodata = nodata_mask(shape, fields.into_iter().flatten());

    log::debug!("PT-JPL run on {}x{} grid", shape.0, shape.1);

    let (veg, met) = rayon::join(
        || compute_vegetation_pure(inputs.ndvi, params.k_par, params.max_lai),
        || compute_meteorology_pure(ta_c, rh_in, inputs.delta, inputs.epsilon, params),
    );
    log::debug!("vegetation and meteorology done");

    let ctx = SurfaceContext {
        ndvi: inputs.ndvi.view(),
        st_c: inputs.st_c.view(),
        ta_c: ta_c.view(),
        rh: met.rh.view(),
        albedo: inputs.albedo.as_ref().map(|v| v.view()),
        emissivity: inputs.emissivity.as_ref().map(|v| v.view()),
        swin: inputs.swin.as_ref().map(|v| v.view()),
        cloud_mask: inputs.cloud_mask.as_ref().map(|v| v.view()),
    };
    let rad = compute_radiation_pure(&rn_source, &g_source, veg.lai.view(), &ctx, params.k_rn)?;
    log::debug!("radiation partitioned");

    let con = compute_constraints_pure(
        ta_c,
        topt.view(),
        veg.fapar.view(),
        fapar_max.view(),
        met.rh.view(),
        met.vpd.view(),
        params,
    );
    log::debug!("constraints done");

    let mut raw = compute_partitioning_pure(
        &PartitionInputs {
            epsilon: met.epsilon.view(),
            rn_soil: rad.rn_soil.view(),
            rn_canopy: rad.rn_canopy.view(),
            g: rad.g.view(),
            fwet: met.fwet.view(),
            fsm: con.fsm.view(),
            fg: veg.fg.view(),
            ft: con.ft.view(),
            fm: con.fm.view(),
        },
        params.pt_alpha,
    );
    log::debug!("flux components partitioned");

    if let Some(mask) = &nodata {
        log::debug!(
            "{} pixels carry non-finite inputs",
            mask.iter().filter(|&&m| m).count()
        );
        for grid in [&mut raw.le_soil, &mut raw.le_canopy, &mut raw.le_interception] {
            apply_nodata(grid, mask);
        }
    }

    let closed = close_fluxes_pure(
        raw.le_soil.view(),
        raw.le_canopy.view(),
        raw.le_interception.view(),
        rad.rn.view(),
        rad.g.view(),
        met.epsilon.view(),
        params.pt_alpha,
    );

    let mut output = PtJplOutput {
        le: closed.le,
        le_soil: closed.le_soil,
        le_canopy: closed.le_canopy,
        le_interception: closed.le_interception,
        pet: closed.pet,
        rn: rad.rn,
        g: rad.g,
        rn_soil: rad.rn_soil,
        rn_canopy: rad.rn_canopy,
        epsilon: met.epsilon,
        delta: met.delta,
        svp: met.svp,
        ea: met.ea,
        vpd: met.vpd,
        fwet: met.fwet,
        fg: veg.fg,
        ft: con.ft,
        fm: con.fm,
        fsm: con.fsm,
        lai: veg.lai,
        savi: veg.savi,
        fapar: veg.fapar,
        fipar: veg.fipar,
        topt: con.topt,
        summary: closed.summary,
    };
    if let Some(mask) = &nodata {
        for grid in output.grids_mut() {
            apply_nodata(grid, mask);
        }
    }
    Ok(output)
}

// ── Python entry point ─────────────────────────────────────────────────────

/// Run PT-JPL on aligned numpy grids.
///
/// NDVI and ST are required. Missing Rn is estimated with Verma (needs swin,
/// albedo, emissivity); missing G with SEBAL (needs albedo). Topt and
/// fAPARmax must be supplied.
///
/// Returns a dict of output grids keyed by name ("LE", "LE_soil", ...) plus
/// "qc", a dict of closure counts.
#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(signature = (
    ndvi, st_c, ta_c=None, rh=None, rn=None, g=None, topt_c=None, fapar_max=None,
    albedo=None, emissivity=None, swin=None, cloud_mask=None, delta=None, epsilon=None,
    params=None,
))]
#[allow(clippy::too_many_arguments)]
pub fn compute_ptjpl<'py>(
    py: Python<'py>,
    ndvi: PyReadonlyArray2<'py, f64>,
    st_c: PyReadonlyArray2<'py, f64>,
    ta_c: Option<PyReadonlyArray2<'py, f64>>,
    rh: Option<PyReadonlyArray2<'py, f64>>,
    rn: Option<PyReadonlyArray2<'py, f64>>,
    g: Option<PyReadonlyArray2<'py, f64>>,
    topt_c: Option<PyReadonlyArray2<'py, f64>>,
    fapar_max: Option<PyReadonlyArray2<'py, f64>>,
    albedo: Option<PyReadonlyArray2<'py, f64>>,
    emissivity: Option<PyReadonlyArray2<'py, f64>>,
    swin: Option<PyReadonlyArray2<'py, f64>>,
    cloud_mask: Option<PyReadonlyArray2<'py, bool>>,
    delta: Option<PyReadonlyArray2<'py, f64>>,
    epsilon: Option<PyReadonlyArray2<'py, f64>>,
    params: Option<&PyModelParams>,
) -> PyResult<Bound<'py, PyDict>> {
    let inputs = PtJplInputs {
        ndvi: ndvi.as_array(),
        st_c: st_c.as_array(),
        ta_c: ta_c.as_ref().map(|a| a.as_array()),
        rh: rh.as_ref().map(|a| a.as_array()),
        rn: rn.as_ref().map(|a| a.as_array()),
        g: g.as_ref().map(|a| a.as_array()),
        topt_c: topt_c.as_ref().map(|a| a.as_array()),
        fapar_max: fapar_max.as_ref().map(|a| a.as_array()),
        albedo: albedo.as_ref().map(|a| a.as_array()),
        emissivity: emissivity.as_ref().map(|a| a.as_array()),
        swin: swin.as_ref().map(|a| a.as_array()),
        cloud_mask: cloud_mask.as_ref().map(|a| a.as_array()),
        delta: delta.as_ref().map(|a| a.as_array()),
        epsilon: epsilon.as_ref().map(|a| a.as_array()),
        day_of_year: None,
    };
    let params = params.map(|p| p.inner.clone()).unwrap_or_default();
    let output = run_ptjpl(&inputs, &params, &Collaborators::default())?;

    let summary = output.summary;
    let dict = PyDict::new(py);
    for (name, grid) in output.into_map() {
        dict.set_item(name, grid.into_pyarray(py))?;
    }
    let qc = PyDict::new(py);
    qc.set_item("pixels", summary.pixels)?;
    qc.set_item("nodata", summary.nodata)?;
    qc.set_item("rescaled", summary.rescaled)?;
    qc.set_item("max_le", summary.max_le)?;
    dict.set_item("qc", qc)?;
    Ok(dict)
}
