use crate::assignment::cluster_memberships;
use crate::fuzzy_clr::errors::{FuzzyClrError, Result};
use crate::fuzzy_clr::hyperparams::{FuzzyClrParams, FuzzyClrValidParams};
use crate::regression::{FittedRegressor, Regressor};
use linfa::dataset::AsSingleTargets;
use linfa::traits::Fit;
use linfa::{DatasetBase, Float};
use linfa_elasticnet::{ElasticNet, ElasticNetParams};
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, ArrayView2, Axis, Data, Ix2, Zip};
use ndarray_rand::rand::{Rng, SeedableRng};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use ndarray_stats::QuantileExt;
use rand_isaac::Isaac64Rng;
use tracing::{debug, trace};

/// Clusterwise linear regression with soft cluster assignments.
///
/// The dataset is modelled as a mixture of `n_clusters` linear experts: each
/// component owns a linear model, a center in feature space, a mixing weight
/// and a residual variance. An EM loop alternates
///
/// - an M-step fitting every component by weighted least squares (the
///   responsibilities enter through the usual square-root rescaling of both
///   features and targets) and re-estimating centers, mixing weights and
///   variances from the current responsibilities;
/// - an E-step replacing the responsibilities by the normalized Gaussian
///   likelihood of every point under every component, where the
///   Gaussian penalty is the squared residual plus `spatial_weight` times
///   the squared distance to the component center.
///
/// The loop stops when no responsibility entry moves by more than
/// `tolerance`, or after `max_n_iterations` iterations. Hard labels are only
/// derived at the very end as the row-wise argmax of the responsibilities;
/// every component that owns at least one point under this assignment is
/// then refitted, unweighted, on exactly its points. The reported objective
/// is the negative log-likelihood of the mixture, which `n_runs` restarts
/// minimize.
///
/// Degenerate mixtures are not papered over: a component whose variance
/// collapses or whose mixing weight vanishes produces non-finite
/// likelihoods, which surface as an error when the hard labels are derived.
///
/// ## Tutorial
///
/// ```
/// use linfa::traits::Fit;
/// use linfa::DatasetBase;
/// use linfa_clr::FuzzyClr;
/// use ndarray::{Array1, Axis};
///
/// // Forty points drawn from two linear regimes with a little jitter.
/// let x = Array1::linspace(0.5_f64, 2.0, 40).insert_axis(Axis(1));
/// let y = x
///     .column(0)
///     .iter()
///     .enumerate()
///     .map(|(i, &v)| {
///         let jitter = 0.05 * (i as f64).sin();
///         if i < 20 {
///             2.0 * v + 1.0 + jitter
///         } else {
///             -3.0 * v + jitter
///         }
///     })
///     .collect::<Array1<_>>();
/// let dataset = DatasetBase::new(x, y);
///
/// let model = FuzzyClr::params(2)
///     .max_n_iterations(50)
///     .n_runs(5)
///     .fit(&dataset)
///     .expect("fuzzy CLR fitted");
///
/// assert_eq!(model.labels().len(), 40);
/// // the mixing weights form a distribution over the two experts
/// assert!((model.weights().sum() - 1.0).abs() < 1e-6);
/// ```
pub struct FuzzyClr<F: Float, M> {
    labels: Array1<usize>,
    models: Vec<M>,
    weights: Array1<F>,
    centers: Array2<F>,
    variances: Array1<F>,
    objective: F,
    n_iterations: u64,
}

impl<F: Float> FuzzyClr<F, ElasticNet<F>> {
    /// Configure the algorithm with the default ridge prototype
    /// (`ElasticNet::ridge().penalty(1e-5)`) and a seeded random source.
    pub fn params(n_clusters: usize) -> FuzzyClrParams<F, Isaac64Rng, ElasticNetParams<F>> {
        Self::params_with_rng(n_clusters, Isaac64Rng::seed_from_u64(42))
    }

    /// Configure the algorithm with the default ridge prototype and the
    /// given random source.
    pub fn params_with_rng<R: Rng + Clone>(
        n_clusters: usize,
        rng: R,
    ) -> FuzzyClrParams<F, R, ElasticNetParams<F>> {
        FuzzyClrParams::new(n_clusters, rng, ElasticNet::ridge().penalty(F::cast(1e-5)))
    }
}

impl<F: Float, M> FuzzyClr<F, M> {
    /// Configure the algorithm with a custom linear-model prototype.
    pub fn params_with<R: Rng + Clone>(
        n_clusters: usize,
        rng: R,
        regressor: M,
    ) -> FuzzyClrParams<F, R, M> {
        FuzzyClrParams::new(n_clusters, rng, regressor)
    }

    /// Return the maximum-a-posteriori cluster index of every training
    /// point, derived from the final responsibilities.
    pub fn labels(&self) -> &Array1<usize> {
        &self.labels
    }

    /// Return the linear model of each component. Components that own at
    /// least one point under the final hard assignment are refitted on
    /// exactly those points; the others keep their last weighted fit.
    pub fn models(&self) -> &[M] {
        &self.models
    }

    /// Return the mixing weight of each component.
    pub fn weights(&self) -> &Array1<F> {
        &self.weights
    }

    /// Return the component centers in feature space with shape
    /// `(n_clusters, n_features)`.
    pub fn centers(&self) -> &Array2<F> {
        &self.centers
    }

    /// Return the residual variance of each component.
    pub fn variances(&self) -> &Array1<F> {
        &self.variances
    }

    /// Return the negative log-likelihood of the training data under the
    /// final mixture; this is the quantity minimized across `n_runs`.
    pub fn objective(&self) -> F {
        self.objective
    }

    /// Return the number of EM iterations the winning run performed before
    /// the responsibilities stabilized or the cap was reached.
    pub fn n_iterations(&self) -> u64 {
        self.n_iterations
    }
}

impl<F: Float, R: Rng + Clone, DA: Data<Elem = F>, T: AsSingleTargets<Elem = F>, M: Regressor<F>>
    Fit<ArrayBase<DA, Ix2>, T, FuzzyClrError> for FuzzyClrValidParams<F, R, M>
{
    type Object = FuzzyClr<F, M::Fitted>;

    /// Given an input matrix `observations` with shape
    /// `(n_observations, n_features)` and index-aligned scalar targets,
    /// fit a mixture of `n_clusters` linear experts.
    ///
    /// An instance of [`FuzzyClr`] is returned.
    fn fit(&self, dataset: &DatasetBase<ArrayBase<DA, Ix2>, T>) -> Result<Self::Object> {
        let observations = dataset.records().view();
        let targets = dataset.as_single_targets();

        let mut rng = self.rng();
        let mut best = self.fit_one(&observations, &targets, &mut rng)?;
        for _ in 1..self.n_runs() {
            let run = self.fit_one(&observations, &targets, &mut rng)?;
            if run.objective < best.objective {
                best = run;
            }
        }
        Ok(best)
    }
}

impl<F: Float, R: Rng + Clone, M: Regressor<F>> FuzzyClrValidParams<F, R, M> {
    /// One full EM optimization from a single random initialization.
    fn fit_one(
        &self,
        observations: &ArrayView2<F>,
        targets: &ArrayView1<F>,
        rng: &mut R,
    ) -> Result<FuzzyClr<F, M::Fitted>> {
        let n_samples = observations.nrows();
        let n_features = observations.ncols();
        let n_clusters = self.n_clusters();

        // responsibilities are initialized uniformly random, row-normalized
        let raw = Array2::<f64>::random_using((n_samples, n_clusters), Uniform::new(0., 1.), rng);
        let totals = raw.sum_axis(Axis(1)).insert_axis(Axis(1));
        let mut responsibilities = (raw / &totals).mapv(|v| F::cast(v));

        let mut centers = Array2::zeros((n_clusters, n_features));
        let mut mixing = Array1::zeros(n_clusters);
        let mut variances = Array1::zeros(n_clusters);
        let mut likelihoods = Array2::zeros((n_samples, n_clusters));
        let mut penalties = Array2::zeros((n_samples, n_clusters));
        let mut models = Vec::with_capacity(n_clusters);
        let mut objective = F::zero();
        let mut n_iterations = 0;

        for iteration in 0..self.max_n_iterations() {
            n_iterations = iteration + 1;

            // M step: weighted least squares per component plus center,
            // mixing weight and variance estimates
            models.clear();
            for cluster in 0..n_clusters {
                let mass = responsibilities.column(cluster).sum();
                let scale = responsibilities.column(cluster).mapv(|v| v.sqrt());
                let x = observations * &scale.view().insert_axis(Axis(1));
                let y = targets * &scale;
                let model = self.regressor().fit(x.view(), y.view())?;

                let center = (observations * &responsibilities.column(cluster).insert_axis(Axis(1)))
                    .sum_axis(Axis(0))
                    / mass;
                let residuals = targets - &model.predict(observations.view());
                let spread = (observations - &center).mapv(|v| v * v).sum_axis(Axis(1));
                let penalty =
                    residuals.mapv(|r| r * r) + spread.mapv(|d| d * self.spatial_weight());

                variances[cluster] = (&responsibilities.column(cluster) * &penalty).sum() / mass;
                mixing[cluster] = mass / F::cast(n_samples);
                centers.row_mut(cluster).assign(&center);
                penalties.column_mut(cluster).assign(&penalty);
                models.push(model);
            }

            // E step: Gaussian likelihood of every point under every
            // component, responsibilities renormalized per point
            let previous = responsibilities.clone();
            for cluster in 0..n_clusters {
                let variance = variances[cluster];
                let normalizer = (F::cast(2.0 * std::f64::consts::PI) * variance).sqrt();
                let likelihood = penalties
                    .column(cluster)
                    .mapv(|p| (-p / (F::cast(2.0) * variance)).exp() / normalizer);
                responsibilities
                    .column_mut(cluster)
                    .assign(&likelihood.mapv(|l| l * mixing[cluster]));
                likelihoods.column_mut(cluster).assign(&likelihood);
            }
            for mut row in responsibilities.rows_mut() {
                let total = row.sum();
                row.mapv_inplace(|v| v / total);
            }

            objective = negative_log_likelihood(&likelihoods, &mixing);
            trace!("iteration {}: loglike = {:.6}", iteration, objective);

            if within_tolerance(&responsibilities, &previous, self.tolerance()) {
                break;
            }
        }
        debug!(
            "finished after {} iterations: loglike = {:.6}",
            n_iterations, objective
        );

        let mut labels = Array1::zeros(n_samples);
        for (index, row) in responsibilities.rows().into_iter().enumerate() {
            labels[index] = row.argmax()?;
        }

        // the returned models are refitted, unweighted, on the hard
        // assignment; components without points keep the weighted fit
        let memberships = cluster_memberships(&labels, n_clusters);
        for (cluster, members) in memberships.iter().enumerate() {
            if members.is_empty() {
                continue;
            }
            let x = observations.select(Axis(0), members);
            let y = targets.select(Axis(0), members);
            models[cluster] = self.regressor().fit(x.view(), y.view())?;
        }

        Ok(FuzzyClr {
            labels,
            models,
            weights: mixing,
            centers,
            variances,
            objective,
            n_iterations,
        })
    }
}

/// Negative log-likelihood of the mixture described by the per-component
/// likelihoods and mixing weights.
fn negative_log_likelihood<F: Float>(likelihoods: &Array2<F>, mixing: &Array1<F>) -> F {
    let mixture = (likelihoods * mixing).sum_axis(Axis(1));
    -mixture.mapv(|v| v.ln()).sum()
}

/// Elementwise all-close with an absolute tolerance.
fn within_tolerance<F: Float>(current: &Array2<F>, previous: &Array2<F>, tolerance: F) -> bool {
    Zip::from(current)
        .and(previous)
        .all(|&a, &b| (a - b).abs() <= tolerance)
}
