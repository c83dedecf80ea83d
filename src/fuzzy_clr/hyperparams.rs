use crate::fuzzy_clr::errors::FuzzyClrParamsError;
use linfa::{Float, ParamGuard};
use ndarray_rand::rand::Rng;

#[derive(Clone, Debug)]
/// The set of hyperparameters that can be specified for the execution of
/// the [fuzzy clusterwise linear regression algorithm](crate::FuzzyClr).
pub struct FuzzyClrValidParams<F: Float, R: Rng, M> {
    /// The number of mixture components.
    n_clusters: usize,
    /// Weight of the squared distance to the component center added to the
    /// squared residual in both the variance estimate and the likelihood.
    spatial_weight: F,
    /// The training is considered complete when no responsibility entry
    /// moved by more than `tolerance` during an iteration.
    tolerance: F,
    /// We exit the training loop when the number of EM iterations exceeds
    /// `max_n_iterations` even if the responsibilities have not stabilized.
    max_n_iterations: u64,
    /// Number of times the optimization is restarted from fresh random
    /// responsibilities; the run with the lowest objective is kept.
    n_runs: u64,
    /// Prototype configuration of the per-component linear models.
    regressor: M,
    /// The random number generator used to draw the starting
    /// responsibilities.
    rng: R,
}

impl<F: Float, R: Rng + Clone, M> FuzzyClrValidParams<F, R, M> {
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    pub fn spatial_weight(&self) -> F {
        self.spatial_weight
    }

    pub fn tolerance(&self) -> F {
        self.tolerance
    }

    pub fn max_n_iterations(&self) -> u64 {
        self.max_n_iterations
    }

    /// The final result is the best output of `n_runs` consecutive runs in
    /// terms of the negative log-likelihood.
    pub fn n_runs(&self) -> u64 {
        self.n_runs
    }

    pub fn regressor(&self) -> &M {
        &self.regressor
    }

    /// Returns the random generator
    pub fn rng(&self) -> R {
        self.rng.clone()
    }
}

#[derive(Clone, Debug)]
/// An helper struct used to construct a set of [valid hyperparameters](FuzzyClrValidParams)
/// for the [fuzzy clusterwise linear regression algorithm](crate::FuzzyClr) (using the builder pattern).
pub struct FuzzyClrParams<F: Float, R: Rng, M>(FuzzyClrValidParams<F, R, M>);

impl<F: Float, R: Rng + Clone, M> FuzzyClrParams<F, R, M> {
    /// `new` lets us configure our training algorithm parameters.
    ///
    /// Defaults are provided if optional parameters are not specified:
    /// * `spatial_weight = 0`
    /// * `tolerance = 1e-5`
    /// * `max_n_iterations = 5`
    /// * `n_runs = 1`
    pub fn new(n_clusters: usize, rng: R, regressor: M) -> Self {
        Self(FuzzyClrValidParams {
            n_clusters,
            spatial_weight: F::zero(),
            tolerance: F::cast(1e-5),
            max_n_iterations: 5,
            n_runs: 1,
            regressor,
            rng,
        })
    }

    /// Change the weight of the spatial-compactness penalty.
    pub fn spatial_weight(mut self, spatial_weight: F) -> Self {
        self.0.spatial_weight = spatial_weight;
        self
    }

    /// Change the responsibility convergence threshold.
    pub fn tolerance(mut self, tolerance: F) -> Self {
        self.0.tolerance = tolerance;
        self
    }

    /// Change the value of `max_n_iterations`
    pub fn max_n_iterations(mut self, max_n_iterations: u64) -> Self {
        self.0.max_n_iterations = max_n_iterations;
        self
    }

    /// Set the number of random restarts. The best result is kept.
    pub fn n_runs(mut self, n_runs: u64) -> Self {
        self.0.n_runs = n_runs;
        self
    }

    /// Replace the prototype of the per-component linear models.
    pub fn regressor<M2>(self, regressor: M2) -> FuzzyClrParams<F, R, M2> {
        FuzzyClrParams(FuzzyClrValidParams {
            n_clusters: self.0.n_clusters,
            spatial_weight: self.0.spatial_weight,
            tolerance: self.0.tolerance,
            max_n_iterations: self.0.max_n_iterations,
            n_runs: self.0.n_runs,
            regressor,
            rng: self.0.rng,
        })
    }

    pub fn with_rng<R2: Rng + Clone>(self, rng: R2) -> FuzzyClrParams<F, R2, M> {
        FuzzyClrParams(FuzzyClrValidParams {
            n_clusters: self.0.n_clusters,
            spatial_weight: self.0.spatial_weight,
            tolerance: self.0.tolerance,
            max_n_iterations: self.0.max_n_iterations,
            n_runs: self.0.n_runs,
            regressor: self.0.regressor,
            rng,
        })
    }
}

impl<F: Float, R: Rng, M> ParamGuard for FuzzyClrParams<F, R, M> {
    type Checked = FuzzyClrValidParams<F, R, M>;
    type Error = FuzzyClrParamsError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        if self.0.n_clusters == 0 {
            Err(FuzzyClrParamsError::NClusters)
        } else if self.0.n_runs == 0 {
            Err(FuzzyClrParamsError::NRuns)
        } else if self.0.max_n_iterations == 0 {
            Err(FuzzyClrParamsError::MaxIterations)
        } else if self.0.tolerance <= F::zero() {
            Err(FuzzyClrParamsError::Tolerance)
        } else if self.0.spatial_weight < F::zero() {
            Err(FuzzyClrParamsError::SpatialWeight)
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}
