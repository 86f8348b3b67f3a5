use std::time::Duration;

use pyo3::{
    exceptions::{PyRuntimeWarning, PyValueError},
    prelude::*,
};

use crate::{
    assembly::{index_search, Outcome},
    config::AssemblyConfig,
    interrupt::CancelToken,
    loader::parse_molfile_str,
};

/// Compute the assembly index of the molecule in `mol_block`, giving up after
/// `run_time_ms` milliseconds if set.
///
/// A search that runs out of time returns the best index found so far and
/// raises a `RuntimeWarning`; that value is only an upper bound.
#[pyfunction]
#[pyo3(signature = (mol_block, run_time_ms=None))]
fn assembly_index(py: Python<'_>, mol_block: &str, run_time_ms: Option<u64>) -> PyResult<u32> {
    let mol = parse_molfile_str(mol_block).map_err(|e| PyValueError::new_err(e.to_string()))?;
    let config = AssemblyConfig {
        run_time: run_time_ms.map(Duration::from_millis),
        pathway: false,
        ..AssemblyConfig::default()
    };
    let result = index_search(&mol, &config, &CancelToken::new())
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    if result.outcome == Outcome::Cancelled {
        PyErr::warn(
            py,
            &py.get_type::<PyRuntimeWarning>(),
            c"run time exceeded; assembly index is an upper bound",
            1,
        )?;
    }
    Ok(result.index)
}

/// A Python module implemented in Rust. The name of this function must match
/// the `lib.name` setting in the `Cargo.toml`, else Python will not be able to
/// import the module.
#[pymodule]
fn assembly_engine(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(assembly_index, m)?)?;
    Ok(())
}
