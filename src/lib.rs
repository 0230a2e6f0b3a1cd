//! PT-JPL evapotranspiration partitioning.
//!
//! Splits latent heat flux into soil evaporation, canopy transpiration and
//! interception evaporation from NDVI, surface temperature and meteorology.
//! [`pipeline::run_ptjpl`] runs every stage; each stage module also exposes
//! its per-pixel kernels and a `*_pure` grid function.

#[cfg(feature = "python")]
use pyo3::prelude::*;

pub mod climatology;
pub mod closure;
pub mod constants;
pub mod constraints;
pub mod error;
pub mod meteorology;
pub mod net_radiation;
pub mod params;
pub mod partitioning;
pub mod pipeline;
pub mod radiation;
pub mod soil_heat_flux;
mod utils;
pub mod vegetation;

pub use error::{PtJplError, Result};
pub use params::ModelParams;
pub use pipeline::{run_ptjpl, Collaborators, PtJplInputs, PtJplOutput};

#[cfg(feature = "python")]
#[pymodule]
fn ptjpl(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    py_module.add_class::<params::PyModelParams>()?;

    // Register submodules
    register_vegetation_module(py_module)?;
    register_meteorology_module(py_module)?;
    register_radiation_module(py_module)?;
    register_constraints_module(py_module)?;
    register_partitioning_module(py_module)?;
    register_closure_module(py_module)?;
    register_pipeline_module(py_module)?;

    py_module.add("__doc__", "PT-JPL evapotranspiration partitioning implemented in Rust.")?;

    Ok(())
}

#[cfg(feature = "python")]
fn register_vegetation_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let submodule = PyModule::new(py_module.py(), "vegetation")?;
    submodule.add("__doc__", "SAVI, fAPAR, fIPAR, green canopy fraction and LAI from NDVI.")?;
    submodule.add_function(wrap_pyfunction!(vegetation::compute_vegetation, &submodule)?)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}

#[cfg(feature = "python")]
fn register_meteorology_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let submodule = PyModule::new(py_module.py(), "meteorology")?;
    submodule.add("__doc__", "Delta, epsilon, VPD and surface wetness.")?;
    submodule.add_function(wrap_pyfunction!(meteorology::compute_meteorology, &submodule)?)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}

#[cfg(feature = "python")]
fn register_radiation_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let submodule = PyModule::new(py_module.py(), "radiation")?;
    submodule.add("__doc__", "Net radiation partitioning and Verma / SEBAL estimators.")?;
    submodule.add_function(wrap_pyfunction!(radiation::partition_net_radiation, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(net_radiation::verma_net_radiation, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(
        soil_heat_flux::sebal_soil_heat_flux_grid,
        &submodule
    )?)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}

#[cfg(feature = "python")]
fn register_constraints_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let submodule = PyModule::new(py_module.py(), "constraints")?;
    submodule.add("__doc__", "Plant temperature, plant moisture and soil moisture constraints.")?;
    submodule.add_function(wrap_pyfunction!(constraints::compute_constraints, &submodule)?)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}

#[cfg(feature = "python")]
fn register_partitioning_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let submodule = PyModule::new(py_module.py(), "partitioning")?;
    submodule.add("__doc__", "Soil, canopy and interception latent heat flux.")?;
    submodule.add_function(wrap_pyfunction!(partitioning::compute_partitioning, &submodule)?)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}

#[cfg(feature = "python")]
fn register_closure_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let submodule = PyModule::new(py_module.py(), "closure")?;
    submodule.add("__doc__", "Flux closure against potential ET.")?;
    submodule.add_function(wrap_pyfunction!(closure::close_fluxes_grid, &submodule)?)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}

#[cfg(feature = "python")]
fn register_pipeline_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let submodule = PyModule::new(py_module.py(), "pipeline")?;
    submodule.add("__doc__", "Fused PT-JPL run, single FFI call.")?;
    submodule.add_function(wrap_pyfunction!(pipeline::compute_ptjpl, &submodule)?)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}
