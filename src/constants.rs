//! Default coefficients for the PT-JPL model.
//!
//! Run-time values live in [`crate::params::ModelParams`]; these are only the
//! defaults it is built from, plus fixed empirical regression coefficients.

/// Priestley-Taylor coefficient alpha for unstressed vegetation
pub const PT_ALPHA: f64 = 1.26;

/// Psychrometric constant gamma (Pa/°C), ventilated psychrometer
pub const GAMMA_PA: f64 = 66.2;

/// Net radiation extinction coefficient through the canopy
pub const KRN: f64 = 0.5;

/// PAR extinction coefficient for the Carlson LAI inversion
pub const KPAR: f64 = 0.5;

/// Upper bound on leaf area index
pub const MAX_LAI: f64 = 10.0;

/// Soil moisture constraint VPD scale (Pa)
pub const BETA_PA: f64 = 200.0;

/// RH above which the surface is treated as wet
pub const RH_THRESHOLD: f64 = 0.7;

/// Floor on relative surface wetness
pub const MIN_FWET: f64 = 0.0001;

/// Ceiling on the intercepted PAR fraction
pub const MAX_FIPAR: f64 = 0.95;

/// Customary `minimum_topt` when the Topt clamp is enabled (°C)
pub const MINIMUM_TOPT: f64 = 0.1;

// ── Empirical vegetation regressions ──────────────────────────────────────

/// SAVI soil brightness factor L
pub const SAVI_L: f64 = 0.5;

/// fAPAR = FAPAR_SLOPE * SAVI + FAPAR_OFFSET
pub const FAPAR_SLOPE: f64 = 1.3632;
pub const FAPAR_OFFSET: f64 = -0.048;

/// fIPAR = A * NDVI² + B * NDVI + C
pub const FIPAR_A: f64 = -0.1336;
pub const FIPAR_B: f64 = 1.4653;
pub const FIPAR_C: f64 = 0.1032;

// ── Magnus-Tetens ─────────────────────────────────────────────────────────

pub const MAGNUS_E0_KPA: f64 = 0.6108;
pub const MAGNUS_A: f64 = 17.27;
pub const MAGNUS_B: f64 = 237.3;

// ── Radiation ─────────────────────────────────────────────────────────────

/// Stefan-Boltzmann constant (W/m²/K⁴)
pub const SBC: f64 = 5.67036713e-8;
pub const KELVIN_OFFSET: f64 = 273.15;
