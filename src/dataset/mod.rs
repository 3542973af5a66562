//! Dataset containers: masked index state, layered views, and branches

pub mod branch;
pub mod index_set;
pub mod store;

pub use branch::Branch;
pub use index_set::{IndexSet, MaskCategory};
pub use store::{Layer, LayeredStore};

use ndarray::Array2;

use crate::error::{ChemflowError, Result};

/// Check that a matrix has exactly the expected shape.
pub(crate) fn check_shape(data: &Array2<f64>, nrows: usize, ncols: usize) -> Result<()> {
    if data.nrows() != nrows || data.ncols() != ncols {
        return Err(ChemflowError::ShapeError {
            expected: format!("{nrows}x{ncols}"),
            actual: format!("{}x{}", data.nrows(), data.ncols()),
        });
    }
    Ok(())
}
