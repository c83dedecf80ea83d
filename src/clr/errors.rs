use crate::regression::RegressorError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClrError>;

/// An error when fitting with an invalid hyperparameter
#[derive(Error, Debug)]
pub enum ClrParamsError {
    #[error("n_clusters cannot be 0")]
    NClusters,
    #[error("n_runs cannot be 0")]
    NRuns,
    #[error("max_n_iterations cannot be 0")]
    MaxIterations,
    #[error("spatial_weight cannot be negative")]
    SpatialWeight,
}

/// An error when fitting a clusterwise linear regression model
#[derive(Error, Debug)]
pub enum ClrError {
    /// When any of the hyperparameters are set the wrong value
    #[error("Invalid hyperparameter: {0}")]
    InvalidParams(#[from] ClrParamsError),
    /// When constraint groups or initial labels do not describe the dataset
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// When a cluster is assigned no points before its first fit
    #[error("Fitting failed: cluster #{0} has no points and no fitted model. Consider decreasing the number of clusters or supplying an initial labeling.")]
    EmptyCluster(usize),
    /// When the regression collaborator fails
    #[error(transparent)]
    Regressor(#[from] RegressorError),
    #[error(transparent)]
    LinfaError(#[from] linfa::error::Error),
}
