//! Model quality metrics, diagnostics, and component selection

pub mod diagnostics;
pub mod regression;
pub mod selection;

pub use diagnostics::Diagnostics;
pub use regression::RegressionMetrics;
pub use selection::{choose_optimal_component, find_knee};
