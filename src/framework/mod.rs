//! User-facing model framework

pub mod model;
pub mod options;
pub mod outliers;
pub mod variables;

pub use model::{CalibrationResults, ModelResults, RegressionModel};
pub use options::ModelOptions;
pub use outliers::DiagnosticKind;
