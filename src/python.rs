//! Python bindings for the per-pixel kernels and the cluster legend

use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
use pyo3::prelude::*;

use crate::core::cluster_labels::{ClusterLabelMapper, ClusterLegendConfig};
use crate::core::composite::median_reduce;
use crate::core::indices::{normalized_difference_grid, SpectralIndex};
use crate::core::kernels::evaluate_pixels;
use crate::types::ChangeError;

impl From<ChangeError> for PyErr {
    fn from(err: ChangeError) -> PyErr {
        if err.is_configuration_error() {
            PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("{}", err))
        } else {
            PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!("{}", err))
        }
    }
}

fn shape_error(what: &str, expected: (usize, usize), got: (usize, usize)) -> PyErr {
    PyErr::new::<pyo3::exceptions::PyValueError, _>(format!(
        "{}: expected shape {:?}, got {:?}", what, expected, got
    ))
}

/// (a - b) / (a + b) with NaN as no-data
#[pyfunction]
fn normalized_difference<'py>(
    py: Python<'py>,
    a: PyReadonlyArray2<'py, f32>,
    b: PyReadonlyArray2<'py, f32>,
) -> PyResult<&'py PyArray2<f32>> {
    let (a, b) = (a.as_array(), b.as_array());
    if a.dim() != b.dim() {
        return Err(shape_error("normalized_difference", a.dim(), b.dim()));
    }
    Ok(normalized_difference_grid(&a, &b).into_pyarray(py))
}

/// Evaluate a named index; `inputs` follow the index's input band order
#[pyfunction]
fn spectral_index<'py>(
    py: Python<'py>,
    name: &str,
    inputs: Vec<PyReadonlyArray2<'py, f32>>,
) -> PyResult<&'py PyArray2<f32>> {
    let index = SpectralIndex::from_name(name).ok_or_else(|| {
        PyErr::new::<pyo3::exceptions::PyValueError, _>(format!("Unknown spectral index: {}", name))
    })?;
    if inputs.len() != index.inputs().len() {
        return Err(PyErr::new::<pyo3::exceptions::PyValueError, _>(format!(
            "{} needs {} inputs {:?}, got {}", index, index.inputs().len(), index.inputs(), inputs.len()
        )));
    }

    let views: Vec<_> = inputs.iter().map(|a| a.as_array()).collect();
    let dim = views[0].dim();
    if let Some(bad) = views.iter().find(|v| v.dim() != dim) {
        return Err(shape_error(index.name(), dim, bad.dim()));
    }
    Ok(evaluate_pixels(&views, dim, |v| index.evaluate(v)).into_pyarray(py))
}

/// Per-pixel median over layers, ignoring NaN
#[pyfunction]
fn seasonal_median<'py>(py: Python<'py>, layers: Vec<PyReadonlyArray2<'py, f32>>) -> PyResult<&'py PyArray2<f32>> {
    let views: Vec<_> = layers.iter().map(|a| a.as_array()).collect();
    let dim = match views.first() {
        Some(v) => v.dim(),
        None => {
            return Err(PyErr::new::<pyo3::exceptions::PyValueError, _>(
                "seasonal_median needs at least one layer",
            ))
        }
    };
    if let Some(bad) = views.iter().find(|v| v.dim() != dim) {
        return Err(shape_error("seasonal_median", dim, bad.dim()));
    }
    Ok(median_reduce(&views, dim).into_pyarray(py))
}

/// Simplified legend as (cluster_id, hex colour, label) tuples
#[pyfunction]
fn default_cluster_legend() -> Vec<(u32, String, String)> {
    ClusterLegendConfig::default()
        .simplified_classes
        .into_iter()
        .map(|e| (e.cluster_id, e.color.to_hex(), e.label))
        .collect()
}

/// Python wrapper for ClusterLabelMapper
#[pyclass(name = "ClusterLegend")]
struct PyClusterLegend {
    inner: ClusterLabelMapper,
}

#[pymethods]
impl PyClusterLegend {
    #[new]
    #[pyo3(signature = (palette=None))]
    fn new(palette: Option<Vec<String>>) -> PyResult<Self> {
        let mut config = ClusterLegendConfig::default();
        if let Some(palette) = palette {
            config.k = palette.len();
            config.palette = palette
                .iter()
                .map(|hex| crate::core::cluster_labels::Color::from_hex(hex))
                .collect::<Result<Vec<_>, _>>()?;
            config.simplified_classes.retain(|e| (e.cluster_id as usize) < config.k);
        }
        Ok(PyClusterLegend {
            inner: ClusterLabelMapper::new(config)?,
        })
    }

    #[getter]
    fn k(&self) -> usize {
        self.inner.k()
    }

    /// (hex colour, optional class label) for one cluster id
    fn map_label(&self, label: u32) -> PyResult<(String, Option<String>)> {
        let display = self.inner.map_label(label)?;
        Ok((display.color.to_hex(), display.text))
    }

    fn __repr__(&self) -> String {
        format!("ClusterLegend(k={})", self.inner.k())
    }
}

/// Python module definition
#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(normalized_difference, m)?)?;
    m.add_function(wrap_pyfunction!(spectral_index, m)?)?;
    m.add_function(wrap_pyfunction!(seasonal_median, m)?)?;
    m.add_function(wrap_pyfunction!(default_cluster_legend, m)?)?;
    m.add_class::<PyClusterLegend>()?;
    Ok(())
}
