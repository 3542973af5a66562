//! Preprocessing transform catalogue
//!
//! Each operation is a self-contained enum value carrying its own arguments,
//! tagged with an explicit category at registration: scaling operations fit
//! parameters (center/scale statistics) that must come from a training
//! reference, stateless operations transform the data without any fitted
//! state.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{ChemflowError, Result};
use crate::utils::{guard_zeros, matrix_inverse, median};

/// Category of a preprocessing operation. Scaling operations are always
/// ordered after stateless ones in the call ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OpCategory {
    Stateless,
    Scaling,
}

/// A recorded preprocessing operation with its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PreprocessOp {
    // Scaling (fitted center/scale statistics)
    MeanCenter,
    Autoscale,
    Pareto,
    MedianCenter,
    // Standardisation (stateless, element-wise)
    AbsoluteValue,
    Log10,
    Glog { lambda: f64, shift: f64 },
    ToAbsorbance,
    // Normalisation (stateless, row-wise)
    Snv,
    Msc,
    // Filtering (stateless, along the variable axis)
    SavitzkyGolay { width: usize, polyorder: usize, deriv: usize, delta: f64 },
}

impl PreprocessOp {
    pub fn category(&self) -> OpCategory {
        match self {
            PreprocessOp::MeanCenter
            | PreprocessOp::Autoscale
            | PreprocessOp::Pareto
            | PreprocessOp::MedianCenter => OpCategory::Scaling,
            _ => OpCategory::Stateless,
        }
    }

    pub fn is_scaling(&self) -> bool {
        self.category() == OpCategory::Scaling
    }

    /// Compute scaling parameters from a reference matrix. In fit-mode the
    /// reference is the view's own data; in reference-mode it is a fold's
    /// training partition.
    pub fn fit_scaling(&self, reference: &Array2<f64>) -> Result<ScalingParams> {
        let (offset, scale) = match self {
            PreprocessOp::MeanCenter => {
                let mean = column_means(reference);
                (-mean, Array1::ones(reference.ncols()))
            }
            PreprocessOp::Autoscale => {
                let mean = column_means(reference);
                let std = guard_zeros(column_stds(reference));
                (-mean, std)
            }
            PreprocessOp::Pareto => {
                let mean = column_means(reference);
                let std = guard_zeros(column_stds(reference).mapv(f64::sqrt));
                (-mean, std)
            }
            PreprocessOp::MedianCenter => {
                let medians: Array1<f64> = (0..reference.ncols())
                    .map(|j| {
                        let col: Vec<f64> = reference.column(j).to_vec();
                        -median(&col)
                    })
                    .collect();
                (medians, Array1::ones(reference.ncols()))
            }
            _ => {
                return Err(ChemflowError::DataError(format!(
                    "{self:?} is not a scaling operation"
                )))
            }
        };
        Ok(ScalingParams { offset, scale })
    }

    /// Apply a stateless transform, returning the new matrix.
    pub fn apply_stateless(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        match self {
            PreprocessOp::AbsoluteValue => Ok(data.mapv(f64::abs)),
            PreprocessOp::Log10 => Ok(data.mapv(|v| v.max(0.0).log10())),
            PreprocessOp::Glog { lambda, shift } => Ok(data.mapv(|v| {
                let shifted = v - shift;
                (shifted + (shifted * shifted + lambda).sqrt()).ln()
            })),
            PreprocessOp::ToAbsorbance => Ok(data.mapv(|v| (1.0 / v).log10())),
            PreprocessOp::Snv => Ok(snv(data)),
            PreprocessOp::Msc => msc(data),
            PreprocessOp::SavitzkyGolay { width, polyorder, deriv, delta } => {
                savitzky_golay(data, *width, *polyorder, *deriv, *delta)
            }
            _ => Err(ChemflowError::DataError(format!(
                "{self:?} requires a scaling mode"
            ))),
        }
    }
}

/// Fitted center/scale statistics of a scaling operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingParams {
    pub offset: Array1<f64>,
    pub scale: Array1<f64>,
}

impl ScalingParams {
    /// `(x + offset) / scale`, column-wise.
    pub fn apply(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        if data.ncols() != self.offset.len() {
            return Err(ChemflowError::ShapeError {
                expected: format!("{} columns", self.offset.len()),
                actual: format!("{} columns", data.ncols()),
            });
        }
        Ok((data + &self.offset) / &self.scale)
    }
}

fn column_means(data: &Array2<f64>) -> Array1<f64> {
    data.mean_axis(Axis(0))
        .unwrap_or_else(|| Array1::zeros(data.ncols()))
}

/// Population standard deviation per column.
fn column_stds(data: &Array2<f64>) -> Array1<f64> {
    data.std_axis(Axis(0), 0.0)
}

/// Standard normal variate: center and scale each row by its own statistics.
fn snv(data: &Array2<f64>) -> Array2<f64> {
    let mut out = data.clone();
    for mut row in out.rows_mut() {
        let mean = row.mean().unwrap_or(0.0);
        let mut std = row.std(0.0);
        if std.abs() < 10.0 * f64::EPSILON {
            std = 1.0;
        }
        row.mapv_inplace(|v| (v - mean) / std);
    }
    out
}

/// Multiplicative scatter correction against the mean spectrum: fit a
/// degree-1 polynomial of each row on the reference, then remove the
/// intercept and divide by the slope.
fn msc(data: &Array2<f64>) -> Result<Array2<f64>> {
    let reference = column_means(data);
    let ref_mean = reference.mean().unwrap_or(0.0);
    let ref_centered = &reference - ref_mean;
    let ref_var: f64 = ref_centered.iter().map(|v| v * v).sum();
    if ref_var.abs() < 10.0 * f64::EPSILON {
        return Err(ChemflowError::NumericalFailure(
            "constant reference spectrum in MSC".to_string(),
        ));
    }

    let mut out = data.clone();
    for mut row in out.rows_mut() {
        let row_mean = row.mean().unwrap_or(0.0);
        let cov: f64 = row
            .iter()
            .zip(ref_centered.iter())
            .map(|(&v, &r)| (v - row_mean) * r)
            .sum();
        let mut slope = cov / ref_var;
        if slope.abs() < 10.0 * f64::EPSILON {
            slope = 1.0;
        }
        let intercept = row_mean - slope * ref_mean;
        row.mapv_inplace(|v| (v - intercept) / slope);
    }
    Ok(out)
}

/// Least-squares Savitzky-Golay kernel: fit a polynomial of order
/// `polyorder` over a window of `width` points and evaluate its `deriv`-th
/// derivative at the window center.
fn savgol_coefficients(width: usize, polyorder: usize, deriv: usize, delta: f64) -> Result<Array1<f64>> {
    let halflen = width / 2;
    let x: Array1<f64> = (0..width).map(|i| i as f64 - halflen as f64).collect();

    // Vandermonde system: rows are powers 0..=polyorder of the window offsets
    let mut a = Array2::zeros((polyorder + 1, width));
    for (p, mut row) in a.rows_mut().into_iter().enumerate() {
        for (j, v) in row.iter_mut().enumerate() {
            *v = x[j].powi(p as i32);
        }
    }

    let mut y = Array1::zeros(polyorder + 1);
    let factorial: f64 = (1..=deriv).map(|k| k as f64).product();
    y[deriv] = factorial / delta.powi(deriv as i32);

    // Minimum-norm solution of the underdetermined system A c = y
    let gram = a.dot(&a.t());
    let coeffs = a.t().dot(&matrix_inverse(&gram)?.dot(&y));
    Ok(coeffs)
}

/// Convolve each row with the Savitzky-Golay kernel, reflecting at the
/// edges.
fn savitzky_golay(
    data: &Array2<f64>,
    width: usize,
    polyorder: usize,
    deriv: usize,
    delta: f64,
) -> Result<Array2<f64>> {
    if width < 3 || width % 2 == 0 {
        return Err(ChemflowError::ConfigError(
            "Savitzky-Golay width must be odd and >= 3".to_string(),
        ));
    }
    if polyorder < deriv {
        return Err(ChemflowError::ConfigError(
            "Savitzky-Golay derivative order must not exceed the polynomial order".to_string(),
        ));
    }

    let coeffs = savgol_coefficients(width, polyorder, deriv, delta)?;
    let half = width / 2;
    let n_cols = data.ncols() as isize;

    let mut out = Array2::zeros(data.raw_dim());
    for (r, row) in data.rows().into_iter().enumerate() {
        for j in 0..data.ncols() {
            let mut acc = 0.0;
            for (k, &c) in coeffs.iter().enumerate() {
                // Tap k weights the sample at window offset k - half
                let idx = j as isize + k as isize - half as isize;
                acc += c * row[reflect_index(idx, n_cols)];
            }
            out[[r, j]] = acc;
        }
    }
    Ok(out)
}

/// Reflect an index into [0, len) without repeating the edge sample.
fn reflect_index(idx: isize, len: isize) -> usize {
    let mut i = idx;
    loop {
        if i < 0 {
            i = -i - 1;
        } else if i >= len {
            i = 2 * len - i - 1;
        } else {
            return i as usize;
        }
    }
}
