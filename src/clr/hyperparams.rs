use crate::clr::errors::ClrParamsError;
use linfa::{Float, ParamGuard};
use ndarray::Array1;
use ndarray_rand::rand::Rng;

#[derive(Clone, Debug)]
/// The set of hyperparameters that can be specified for the execution of
/// the [clusterwise linear regression algorithm](crate::Clr).
pub struct ClrValidParams<F: Float, R: Rng, M> {
    /// The number of regression clusters to partition the dataset into.
    n_clusters: usize,
    /// Weight of the squared distance to the cluster mean added to every
    /// point's score; `0` scores by regression residual alone.
    spatial_weight: F,
    /// We exit the training loop when the number of training iterations
    /// exceeds `max_n_iterations` even if the labels have not stabilized.
    max_n_iterations: u64,
    /// Number of times the optimization is restarted from a fresh random
    /// labeling; the run with the lowest objective is kept.
    n_runs: u64,
    /// Optional group id per point; all points of a group always receive
    /// the same label.
    constraints: Option<Array1<usize>>,
    /// Optional starting labels; random when absent.
    initial_labels: Option<Array1<usize>>,
    /// Prototype configuration of the per-cluster linear models.
    regressor: M,
    /// The random number generator used to draw the starting labels.
    rng: R,
}

impl<F: Float, R: Rng + Clone, M> ClrValidParams<F, R, M> {
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    pub fn spatial_weight(&self) -> F {
        self.spatial_weight
    }

    pub fn max_n_iterations(&self) -> u64 {
        self.max_n_iterations
    }

    /// The final result is the best output of `n_runs` consecutive runs in
    /// terms of the objective.
    pub fn n_runs(&self) -> u64 {
        self.n_runs
    }

    pub fn constraints(&self) -> Option<&Array1<usize>> {
        self.constraints.as_ref()
    }

    pub fn initial_labels(&self) -> Option<&Array1<usize>> {
        self.initial_labels.as_ref()
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
/// An helper struct used to construct a set of [valid hyperparameters](ClrValidParams)
/// for the [clusterwise linear regression algorithm](crate::Clr) (using the builder pattern).
pub struct ClrParams<F: Float, R: Rng, M>(ClrValidParams<F, R, M>);

impl<F: Float, R: Rng + Clone, M> ClrParams<F, R, M> {
    /// `new` lets us configure our training algorithm parameters:
    /// * we will be looking for `n_clusters` regression regimes in the
    ///   training dataset;
    /// * every cluster model is created from the `regressor` prototype;
    /// * the starting labels are drawn from `rng` unless supplied.
    ///
    /// Defaults are provided if optional parameters are not specified:
    /// * `spatial_weight = 0`
    /// * `max_n_iterations = 5`
    /// * `n_runs = 1`
    /// * no constraints, random initial labels
    pub fn new(n_clusters: usize, rng: R, regressor: M) -> Self {
        Self(ClrValidParams {
            n_clusters,
            spatial_weight: F::zero(),
            max_n_iterations: 5,
            n_runs: 1,
            constraints: None,
            initial_labels: None,
            regressor,
            rng,
        })
    }

    /// Change the weight of the spatial-compactness penalty.
    pub fn spatial_weight(mut self, spatial_weight: F) -> Self {
        self.0.spatial_weight = spatial_weight;
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

    /// Force all points sharing a group id onto a single label.
    pub fn constraints(mut self, constraints: Array1<usize>) -> Self {
        self.0.constraints = Some(constraints);
        self
    }

    /// Start the optimization from the given labels instead of random ones.
    pub fn initial_labels(mut self, initial_labels: Array1<usize>) -> Self {
        self.0.initial_labels = Some(initial_labels);
        self
    }

    /// Replace the prototype of the per-cluster linear models.
    pub fn regressor<M2>(self, regressor: M2) -> ClrParams<F, R, M2> {
        ClrParams(ClrValidParams {
            n_clusters: self.0.n_clusters,
            spatial_weight: self.0.spatial_weight,
            max_n_iterations: self.0.max_n_iterations,
            n_runs: self.0.n_runs,
            constraints: self.0.constraints,
            initial_labels: self.0.initial_labels,
            regressor,
            rng: self.0.rng,
        })
    }

    pub fn with_rng<R2: Rng + Clone>(self, rng: R2) -> ClrParams<F, R2, M> {
        ClrParams(ClrValidParams {
            n_clusters: self.0.n_clusters,
            spatial_weight: self.0.spatial_weight,
            max_n_iterations: self.0.max_n_iterations,
            n_runs: self.0.n_runs,
            constraints: self.0.constraints,
            initial_labels: self.0.initial_labels,
            regressor: self.0.regressor,
            rng,
        })
    }
}

impl<F: Float, R: Rng, M> ParamGuard for ClrParams<F, R, M> {
    type Checked = ClrValidParams<F, R, M>;
    type Error = ClrParamsError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        if self.0.n_clusters == 0 {
            Err(ClrParamsError::NClusters)
        } else if self.0.n_runs == 0 {
            Err(ClrParamsError::NRuns)
        } else if self.0.max_n_iterations == 0 {
            Err(ClrParamsError::MaxIterations)
        } else if self.0.spatial_weight < F::zero() {
            Err(ClrParamsError::SpatialWeight)
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}
