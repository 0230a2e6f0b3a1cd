//! Model parameters passed explicitly into every stage.

use std::path::Path;

use serde::{Deserialize, Serialize};

#[cfg(feature = "python")]
use pyo3::prelude::*;

use crate::constants::{
    BETA_PA, GAMMA_PA, KPAR, KRN, MAX_LAI, MIN_FWET, PT_ALPHA, RH_THRESHOLD,
};
use crate::error::{PtJplError, Result};

/// Coefficients and switches for a PT-JPL run.
///
/// Immutable for the duration of a run. Missing keys in a TOML document fall
/// back to the defaults, so a config file only needs the values it overrides:
///
/// ```toml
/// pt_alpha = 1.3
/// beta_pa = 250.0
/// minimum_topt = 0.1
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelParams {
    /// Priestley-Taylor alpha (dimensionless)
    pub pt_alpha: f64,
    /// Psychrometric constant (Pa/°C)
    pub gamma_pa: f64,
    /// Net radiation extinction coefficient
    pub k_rn: f64,
    /// PAR extinction coefficient for the Carlson LAI inversion
    pub k_par: f64,
    /// LAI ceiling
    pub max_lai: f64,
    /// Soil moisture VPD scale (Pa)
    pub beta_pa: f64,
    /// Relative humidity threshold for surface wetness
    pub rh_threshold: f64,
    /// When false, f_wet = RH⁴ everywhere (still floored at `min_fwet`)
    pub apply_rh_threshold: bool,
    /// Floor on relative surface wetness
    pub min_fwet: f64,
    /// Replace Topt by Ta where Ta exceeds it
    pub floor_topt: bool,
    /// Lower clamp on Topt (°C)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_topt: Option<f64>,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            pt_alpha: PT_ALPHA,
            gamma_pa: GAMMA_PA,
            k_rn: KRN,
            k_par: KPAR,
            max_lai: MAX_LAI,
            beta_pa: BETA_PA,
            rh_threshold: RH_THRESHOLD,
            apply_rh_threshold: true,
            min_fwet: MIN_FWET,
            floor_topt: false,
            minimum_topt: None,
        }
    }
}

impl ModelParams {
    /// Parse and validate parameters from a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let params: Self = toml::from_str(s).map_err(|e| PtJplError::Config(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Read, parse and validate parameters from a TOML file.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| PtJplError::Config(e.to_string()))
    }

    /// Reject coefficients that would make the model meaningless.
    pub fn validate(&self) -> Result<()> {
        positive("pt_alpha", self.pt_alpha)?;
        positive("gamma_pa", self.gamma_pa)?;
        positive("k_rn", self.k_rn)?;
        positive("k_par", self.k_par)?;
        positive("max_lai", self.max_lai)?;
        positive("beta_pa", self.beta_pa)?;
        unit_interval("rh_threshold", self.rh_threshold)?;
        unit_interval("min_fwet", self.min_fwet)?;
        if let Some(t) = self.minimum_topt {
            if !t.is_finite() {
                return Err(PtJplError::InvalidParameter {
                    name: "minimum_topt",
                    value: t,
                    reason: "must be finite",
                });
            }
        }
        Ok(())
    }
}

fn positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PtJplError::InvalidParameter {
            name,
            value,
            reason: "must be finite and > 0",
        })
    }
}

fn unit_interval(name: &'static str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(PtJplError::InvalidParameter {
            name,
            value,
            reason: "must lie in [0, 1]",
        })
    }
}

// ── Python wrapper ─────────────────────────────────────────────────────────

/// Python handle to [`ModelParams`].
#[cfg(feature = "python")]
#[pyclass(name = "ModelParams")]
#[derive(Clone)]
pub struct PyModelParams {
    pub(crate) inner: ModelParams,
}

#[cfg(feature = "python")]
#[pymethods]
impl PyModelParams {
    #[new]
    #[pyo3(signature = (
        pt_alpha=PT_ALPHA, gamma_pa=GAMMA_PA, k_rn=KRN, k_par=KPAR, max_lai=MAX_LAI,
        beta_pa=BETA_PA, rh_threshold=Some(RH_THRESHOLD), min_fwet=MIN_FWET,
        floor_topt=false, minimum_topt=None,
    ))]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pt_alpha: f64,
        gamma_pa: f64,
        k_rn: f64,
        k_par: f64,
        max_lai: f64,
        beta_pa: f64,
        rh_threshold: Option<f64>,
        min_fwet: f64,
        floor_topt: bool,
        minimum_topt: Option<f64>,
    ) -> PyResult<Self> {
        let inner = ModelParams {
            pt_alpha,
            gamma_pa,
            k_rn,
            k_par,
            max_lai,
            beta_pa,
            rh_threshold: rh_threshold.unwrap_or(RH_THRESHOLD),
            apply_rh_threshold: rh_threshold.is_some(),
            min_fwet,
            floor_topt,
            minimum_topt,
        };
        inner.validate()?;
        Ok(Self { inner })
    }

    /// Load parameters from a TOML file.
    #[staticmethod]
    pub fn from_toml(path: &str) -> PyResult<Self> {
        Ok(Self {
            inner: ModelParams::from_toml_file(path)?,
        })
    }

    #[getter]
    fn pt_alpha(&self) -> f64 {
        self.inner.pt_alpha
    }

    #[getter]
    fn beta_pa(&self) -> f64 {
        self.inner.beta_pa
    }

    fn __repr__(&self) -> String {
        format!("{:?}", self.inner)
    }
}
