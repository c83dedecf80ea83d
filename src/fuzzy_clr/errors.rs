use crate::regression::RegressorError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FuzzyClrError>;

/// An error when fitting with an invalid hyperparameter
#[derive(Error, Debug)]
pub enum FuzzyClrParamsError {
    #[error("n_clusters cannot be 0")]
    NClusters,
    #[error("n_runs cannot be 0")]
    NRuns,
    #[error("max_n_iterations cannot be 0")]
    MaxIterations,
    #[error("tolerance must be greater than 0")]
    Tolerance,
    #[error("spatial_weight cannot be negative")]
    SpatialWeight,
}

/// An error when fitting a fuzzy clusterwise linear regression model
#[derive(Error, Debug)]
pub enum FuzzyClrError {
    /// When any of the hyperparameters are set the wrong value
    #[error("Invalid hyperparameter: {0}")]
    InvalidParams(#[from] FuzzyClrParamsError),
    /// When the regression collaborator fails
    #[error(transparent)]
    Regressor(#[from] RegressorError),
    /// When the responsibilities degenerate (e.g. a collapsed variance
    /// producing NaN likelihoods) and no hard label can be derived
    #[error(transparent)]
    MinMaxError(#[from] ndarray_stats::errors::MinMaxError),
    #[error(transparent)]
    LinfaError(#[from] linfa::error::Error),
}
