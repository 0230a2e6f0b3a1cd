//! Providers of the per-pixel climatology fields Topt and fAPARmax.
//!
//! Only consulted when the caller does not pass those grids directly.

use ndarray::{Array2, ArrayView2};

use crate::error::Result;
use crate::utils::check_shape;

/// Scale applied to int16-packed Topt grids (°C per count)
pub const TOPT_SCALE: f64 = 0.01;
/// Scale applied to int16-packed fAPARmax grids
pub const FAPAR_MAX_SCALE: f64 = 0.0001;

/// What the pipeline asks a climatology for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClimatologyRequest {
    pub shape: (usize, usize),
    /// Acquisition day (1-366) as passed in the run inputs. Only providers
    /// with a seasonal cycle read it; [`UniformClimatology`] and
    /// [`StaticClimatology`] hold one field for the whole year.
    pub day_of_year: Option<u32>,
}

pub trait Climatology: Send + Sync {
    /// Optimum temperature for phenology (°C).
    fn topt(&self, request: &ClimatologyRequest) -> Result<Array2<f64>>;
    /// Climatological maximum fAPAR.
    fn fapar_max(&self, request: &ClimatologyRequest) -> Result<Array2<f64>>;
}

/// Same value at every pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformClimatology {
    pub topt_c: f64,
    pub fapar_max: f64,
}

impl Climatology for UniformClimatology {
    fn topt(&self, request: &ClimatologyRequest) -> Result<Array2<f64>> {
        Ok(Array2::from_elem(request.shape, self.topt_c))
    }

    fn fapar_max(&self, request: &ClimatologyRequest) -> Result<Array2<f64>> {
        Ok(Array2::from_elem(request.shape, self.fapar_max))
    }
}

/// Pre-loaded grids already on the target raster.
#[derive(Debug, Clone)]
pub struct StaticClimatology {
    topt: Array2<f64>,
    fapar_max: Array2<f64>,
}

impl StaticClimatology {
    pub fn new(topt: Array2<f64>, fapar_max: Array2<f64>) -> Result<Self> {
        check_shape("fAPARmax", topt.dim(), fapar_max.dim())?;
        Ok(Self { topt, fapar_max })
    }

    /// Build from int16-packed grids: Topt in 0.01 °C, fAPARmax in 1e-4.
    ///
    /// Values are scaled, floored at 0, and `nodata` counts become NaN.
    pub fn from_packed(
        topt: ArrayView2<i16>,
        fapar_max: ArrayView2<i16>,
        nodata: Option<i16>,
    ) -> Result<Self> {
        let unpack = |scale: f64| {
            move |&v: &i16| {
                if Some(v) == nodata {
                    f64::NAN
                } else {
                    (v as f64 * scale).max(0.0)
                }
            }
        };
        Self::new(topt.map(unpack(TOPT_SCALE)), fapar_max.map(unpack(FAPAR_MAX_SCALE)))
    }

    pub fn shape(&self) -> (usize, usize) {
        self.topt.dim()
    }

    fn grid(
        &self,
        field: &'static str,
        grid: &Array2<f64>,
        request: &ClimatologyRequest,
    ) -> Result<Array2<f64>> {
        check_shape(field, request.shape, grid.dim())?;
        Ok(grid.clone())
    }
}

impl Climatology for StaticClimatology {
    fn topt(&self, request: &ClimatologyRequest) -> Result<Array2<f64>> {
        self.grid("Topt", &self.topt, request)
    }

    fn fapar_max(&self, request: &ClimatologyRequest) -> Result<Array2<f64>> {
        self.grid("fAPARmax", &self.fapar_max, request)
    }
}
