//! Model configuration

use serde::{Deserialize, Serialize};

use crate::split::SplitMethod;

/// Configuration shared by every model run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelOptions {
    /// Fold-assignment method, or `None` to skip cross-validation.
    pub cross_validation: Option<SplitMethod>,
    /// Fraction of rows held out per fold; the fold count is its rounded
    /// reciprocal.
    pub held_out_fraction: f64,
    /// Upper bound on latent components; clamped to what the data supports.
    pub n_components: usize,
    /// Automatically mean-center both branches before fitting when no
    /// scaling operation has been recorded.
    pub mean_center: bool,
    /// Seed for the random fold method. `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            cross_validation: Some(SplitMethod::Systematic),
            held_out_fraction: 0.1,
            n_components: 10,
            mean_center: true,
            seed: None,
        }
    }
}

impl ModelOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cross_validation(mut self, method: Option<SplitMethod>) -> Self {
        self.cross_validation = method;
        self
    }

    pub fn with_held_out_fraction(mut self, fraction: f64) -> Self {
        self.held_out_fraction = fraction;
        self
    }

    pub fn with_n_components(mut self, n_components: usize) -> Self {
        self.n_components = n_components;
        self
    }

    pub fn with_mean_center(mut self, mean_center: bool) -> Self {
        self.mean_center = mean_center;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
