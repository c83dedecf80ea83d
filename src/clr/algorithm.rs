use crate::assignment::{cluster_memberships, reassign_labels};
use crate::clr::errors::{ClrError, Result};
use crate::clr::hyperparams::{ClrParams, ClrValidParams};
use crate::regression::{FittedRegressor, Regressor};
use linfa::dataset::AsSingleTargets;
use linfa::prelude::SingleTargetRegression;
use linfa::traits::Fit;
use linfa::{DatasetBase, Float};
use linfa_elasticnet::{ElasticNet, ElasticNetParams};
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, ArrayView2, Axis, Data, Ix2};
use ndarray_rand::rand::{Rng, SeedableRng};
use rand_isaac::Isaac64Rng;
use tracing::{debug, trace};

/// Clusterwise linear regression with hard cluster assignments.
///
/// The dataset is partitioned into `n_clusters` clusters, each owning its own
/// linear model, by alternating two steps until the labels stop changing or
/// the iteration cap is reached:
///
/// - fit step: every cluster model is (re)fitted on exactly the points
///   currently assigned to it;
/// - reassignment step: every point is scored under every cluster model
///   (squared residual, plus `spatial_weight` times the squared distance to
///   the cluster's current mean when a spatial penalty is requested) and
///   moved to the cluster with the lowest score.
///
/// The per-cluster models are created from a prototype [`Regressor`]
/// configuration; ridge regression with a small penalty is the default.
/// Group constraints can force sets of points to always share one label, and
/// `n_runs` restarts the whole optimization from fresh random labels keeping
/// the best objective, since the result depends on the initialization.
///
/// A cluster that loses all of its points keeps its stale model and simply
/// stops being refitted; it can win points back in a later iteration. A
/// cluster that is empty before its first fit has no model to score with and
/// aborts the run with [`ClrError::EmptyCluster`](crate::ClrError).
///
/// ## Tutorial
///
/// ```
/// use linfa::traits::Fit;
/// use linfa::DatasetBase;
/// use linfa_clr::Clr;
/// use ndarray::{Array1, Axis};
///
/// // Forty points drawn from two linear regimes: y = 2x + 1 on the first
/// // half, y = -3x on the second half.
/// let x = Array1::linspace(0.5_f64, 2.0, 40).insert_axis(Axis(1));
/// let y = x
///     .column(0)
///     .iter()
///     .enumerate()
///     .map(|(i, &v)| if i < 20 { 2.0 * v + 1.0 } else { -3.0 * v })
///     .collect::<Array1<_>>();
/// let dataset = DatasetBase::new(x, y);
///
/// let model = Clr::params(2)
///     .max_n_iterations(20)
///     .n_runs(10)
///     .fit(&dataset)
///     .expect("CLR fitted");
///
/// assert_eq!(model.labels().len(), 40);
/// assert_eq!(model.models().len(), 2);
/// // every point sits in exactly one cluster
/// assert!((model.weights().sum() - 1.0).abs() < 1e-9);
/// ```
pub struct Clr<F: Float, M> {
    labels: Array1<usize>,
    models: Vec<M>,
    weights: Array1<F>,
    objective: F,
    n_iterations: u64,
}

impl<F: Float> Clr<F, ElasticNet<F>> {
    /// Configure the algorithm with the default ridge prototype
    /// (`ElasticNet::ridge().penalty(1e-5)`) and a seeded random source.
    pub fn params(n_clusters: usize) -> ClrParams<F, Isaac64Rng, ElasticNetParams<F>> {
        Self::params_with_rng(n_clusters, Isaac64Rng::seed_from_u64(42))
    }

    /// Configure the algorithm with the default ridge prototype and the
    /// given random source.
    pub fn params_with_rng<R: Rng + Clone>(
        n_clusters: usize,
        rng: R,
    ) -> ClrParams<F, R, ElasticNetParams<F>> {
        ClrParams::new(n_clusters, rng, ElasticNet::ridge().penalty(F::cast(1e-5)))
    }
}

impl<F: Float, M> Clr<F, M> {
    /// Configure the algorithm with a custom linear-model prototype.
    pub fn params_with<R: Rng + Clone>(
        n_clusters: usize,
        rng: R,
        regressor: M,
    ) -> ClrParams<F, R, M> {
        ClrParams::new(n_clusters, rng, regressor)
    }

    /// Return the final cluster index of every training point.
    pub fn labels(&self) -> &Array1<usize> {
        &self.labels
    }

    /// Return the fitted linear model of each cluster.
    pub fn models(&self) -> &[M] {
        &self.models
    }

    /// Return the fraction of training points assigned to each cluster.
    pub fn weights(&self) -> &Array1<F> {
        &self.weights
    }

    /// Return the mean score of the training points under their final
    /// assignment; this is the quantity minimized across `n_runs`.
    pub fn objective(&self) -> F {
        self.objective
    }

    /// Return the number of fit/reassign iterations the winning run
    /// performed before the labels stabilized or the cap was reached.
    pub fn n_iterations(&self) -> u64 {
        self.n_iterations
    }
}

impl<F: Float, R: Rng + Clone, DA: Data<Elem = F>, T: AsSingleTargets<Elem = F>, M: Regressor<F>>
    Fit<ArrayBase<DA, Ix2>, T, ClrError> for ClrValidParams<F, R, M>
{
    type Object = Clr<F, M::Fitted>;

    /// Given an input matrix `observations` with shape
    /// `(n_observations, n_features)` and index-aligned scalar targets,
    /// partition the observations into `n_clusters` linear regimes.
    ///
    /// An instance of [`Clr`] is returned.
    fn fit(&self, dataset: &DatasetBase<ArrayBase<DA, Ix2>, T>) -> Result<Self::Object> {
        let observations = dataset.records().view();
        let targets = dataset.as_single_targets();
        let n_samples = observations.nrows();

        if let Some(constraints) = self.constraints() {
            if constraints.len() != n_samples {
                return Err(ClrError::InvalidInput(format!(
                    "constraint groups cover {} points but the dataset has {}",
                    constraints.len(),
                    n_samples
                )));
            }
        }
        if let Some(initial) = self.initial_labels() {
            if initial.len() != n_samples {
                return Err(ClrError::InvalidInput(format!(
                    "initial labels cover {} points but the dataset has {}",
                    initial.len(),
                    n_samples
                )));
            }
            if initial.iter().any(|&label| label >= self.n_clusters()) {
                return Err(ClrError::InvalidInput(format!(
                    "initial labels must lie in [0, {})",
                    self.n_clusters()
                )));
            }
        }

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

impl<F: Float, R: Rng + Clone, M: Regressor<F>> ClrValidParams<F, R, M> {
    /// One full optimization from a single initialization.
    fn fit_one(
        &self,
        observations: &ArrayView2<F>,
        targets: &ArrayView1<F>,
        rng: &mut R,
    ) -> Result<Clr<F, M::Fitted>> {
        let n_samples = observations.nrows();
        let n_clusters = self.n_clusters();

        let mut labels = match self.initial_labels() {
            Some(initial) => initial.clone(),
            None => (0..n_samples)
                .map(|_| rng.gen_range(0..n_clusters))
                .collect(),
        };
        let mut models: Vec<Option<M::Fitted>> = (0..n_clusters).map(|_| None).collect();
        let mut predictions = Array2::zeros((n_samples, n_clusters));
        let mut scores = Array2::zeros((n_samples, n_clusters));
        let target_values = targets.to_owned();
        let mut n_iterations = 0;

        for iteration in 0..self.max_n_iterations() {
            n_iterations = iteration + 1;

            // fit every non-empty cluster on exactly its members; empty
            // clusters keep their previous model
            let memberships = cluster_memberships(&labels, n_clusters);
            for (cluster, members) in memberships.iter().enumerate() {
                if members.is_empty() {
                    continue;
                }
                let x = observations.select(Axis(0), members);
                let y = targets.select(Axis(0), members);
                models[cluster] = Some(self.regressor().fit(x.view(), y.view())?);
            }

            // score every point under every cluster model
            for (cluster, members) in memberships.iter().enumerate() {
                let model = models[cluster]
                    .as_ref()
                    .ok_or(ClrError::EmptyCluster(cluster))?;
                let predicted = model.predict(observations.view());
                let residuals = targets - &predicted;
                scores
                    .column_mut(cluster)
                    .assign(&residuals.mapv(|r| r * r));
                predictions.column_mut(cluster).assign(&predicted);

                if self.spatial_weight() > F::zero() && !members.is_empty() {
                    if let Some(center) = observations
                        .select(Axis(0), members)
                        .mean_axis(Axis(0))
                    {
                        let spread =
                            (observations - &center).mapv(|v| v * v).sum_axis(Axis(1));
                        let mut column = scores.column_mut(cluster);
                        column += &spread.mapv(|d| d * self.spatial_weight());
                    }
                }
            }

            let previous = std::mem::replace(
                &mut labels,
                reassign_labels(&scores, self.constraints()),
            );

            let (objective, mse, r2) =
                iteration_summary(&scores, &predictions, &labels, &target_values)?;
            trace!(
                "iteration {}: objective = {:.6}, mse = {:.6}, r2 = {:.6}",
                iteration,
                objective,
                mse,
                r2
            );

            if labels == previous {
                break;
            }
        }

        let (objective, mse, r2) =
            iteration_summary(&scores, &predictions, &labels, &target_values)?;
        debug!(
            "finished after {} iterations: objective = {:.6}, mse = {:.6}, r2 = {:.6}",
            n_iterations, objective, mse, r2
        );

        let mut weights = Array1::zeros(n_clusters);
        for &label in labels.iter() {
            weights[label] += F::one();
        }
        weights /= F::cast(n_samples);

        let models = models
            .into_iter()
            .enumerate()
            .map(|(cluster, model)| model.ok_or(ClrError::EmptyCluster(cluster)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Clr {
            labels,
            models,
            weights,
            objective,
            n_iterations,
        })
    }
}

/// Mean assigned score plus regression diagnostics of the current labeling.
fn iteration_summary<F: Float>(
    scores: &Array2<F>,
    predictions: &Array2<F>,
    labels: &Array1<usize>,
    targets: &Array1<F>,
) -> Result<(F, F, F)> {
    let n_samples = labels.len();
    let mut objective = F::zero();
    let mut assigned = Array1::zeros(n_samples);
    for (index, &label) in labels.iter().enumerate() {
        objective += scores[(index, label)];
        assigned[index] = predictions[(index, label)];
    }
    objective /= F::cast(n_samples);
    let mse = assigned.mean_squared_error(targets)?;
    let r2 = assigned.r2(targets)?;
    Ok((objective, mse, r2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regression::Regressor;
    use approx::assert_abs_diff_eq;
    use linfa_linear::LinearRegression;
    use ndarray::{array, concatenate};

    /// Two linear regimes over disjoint target values: y = 2x + jitter on
    /// the first half, y = -3x + jitter on the second half.
    fn two_regimes(n_per_regime: usize) -> (Array2<f64>, Array1<f64>, Array1<usize>) {
        let xs = Array1::linspace(0.2, 1.8, n_per_regime);
        let first = xs.mapv(|v| 2.0 * v);
        let second = xs.mapv(|v| -3.0 * v);
        let jitter = Array1::from_shape_fn(2 * n_per_regime, |i| 0.02 * (i as f64).sin());

        let records = concatenate(
            Axis(0),
            &[
                xs.view().insert_axis(Axis(1)),
                xs.view().insert_axis(Axis(1)),
            ],
        )
        .unwrap();
        let targets = concatenate(Axis(0), &[first.view(), second.view()]).unwrap() + jitter;
        let truth = Array1::from_shape_fn(2 * n_per_regime, |i| {
            if i < n_per_regime {
                0
            } else {
                1
            }
        });
        (records, targets, truth)
    }

    fn agreement(labels: &Array1<usize>, truth: &Array1<usize>) -> usize {
        let direct = labels
            .iter()
            .zip(truth.iter())
            .filter(|(a, b)| a == b)
            .count();
        let flipped = labels
            .iter()
            .zip(truth.iter())
            .filter(|(a, b)| **a != **b)
            .count();
        direct.max(flipped)
    }

    #[test]
    fn recovers_two_linear_regimes() {
        let (records, targets, truth) = two_regimes(50);
        let dataset = DatasetBase::new(records, targets);

        let model = Clr::params(2)
            .max_n_iterations(20)
            .n_runs(10)
            .fit(&dataset)
            .expect("CLR fitted");

        assert!(agreement(model.labels(), &truth) >= 95);

        let mut slopes: Vec<f64> = model
            .models()
            .iter()
            .map(|m| m.hyperplane()[0])
            .collect();
        slopes.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_abs_diff_eq!(slopes[0], -3.0, epsilon = 0.1);
        assert_abs_diff_eq!(slopes[1], 2.0, epsilon = 0.1);
    }

    #[test]
    fn single_cluster_converges_on_the_first_iteration() {
        let (records, targets, _) = two_regimes(20);
        let dataset = DatasetBase::new(records.clone(), targets.clone());

        let model = Clr::params(1).fit(&dataset).expect("CLR fitted");
        assert_eq!(model.n_iterations(), 1);
        assert!(model.labels().iter().all(|&label| label == 0));
        assert_abs_diff_eq!(model.weights()[0], 1.0, epsilon = 1e-12);

        // with a single cluster the objective is the in-sample MSE of one
        // global regression
        let prototype = ElasticNet::ridge().penalty(1e-5);
        let global = Regressor::fit(&prototype, records.view(), targets.view()).unwrap();
        let residuals = &targets - &global.predict(records.view());
        let mse = residuals.mapv(|r| r * r).mean().unwrap();
        assert_abs_diff_eq!(model.objective(), mse, epsilon = 1e-9);
    }

    #[test]
    fn respects_the_iteration_cap() {
        let (records, targets, _) = two_regimes(30);
        let dataset = DatasetBase::new(records, targets);

        let model = Clr::params(3)
            .max_n_iterations(2)
            .fit(&dataset)
            .expect("CLR fitted");
        assert!(model.n_iterations() <= 2);
    }

    #[test]
    fn refitting_the_same_params_is_deterministic() {
        let (records, targets, _) = two_regimes(25);
        let dataset = DatasetBase::new(records, targets);
        let params = Clr::params(2).max_n_iterations(10);

        let first = params.fit(&dataset).expect("CLR fitted");
        let second = params.fit(&dataset).expect("CLR fitted");
        assert_eq!(first.labels(), second.labels());
        assert_abs_diff_eq!(first.objective(), second.objective(), epsilon = 1e-12);
    }

    #[test]
    fn multi_start_never_worsens_the_objective() {
        let (records, targets, _) = two_regimes(25);
        let dataset = DatasetBase::new(records, targets);

        let single = Clr::params(2)
            .max_n_iterations(10)
            .n_runs(1)
            .fit(&dataset)
            .expect("CLR fitted");
        let multi = Clr::params(2)
            .max_n_iterations(10)
            .n_runs(5)
            .fit(&dataset)
            .expect("CLR fitted");

        // the first of the five runs replays the single run's rng stream
        assert!(multi.objective() <= single.objective() + 1e-12);
    }

    #[test]
    fn constrained_groups_share_one_label() {
        let (records, targets, _) = two_regimes(30);
        let n_samples = records.nrows();
        let constraints = Array1::from_shape_fn(n_samples, |i| i / 10);
        let dataset = DatasetBase::new(records, targets);

        let model = Clr::params(2)
            .max_n_iterations(20)
            .constraints(constraints.clone())
            .fit(&dataset)
            .expect("CLR fitted");

        for group in 0..n_samples / 10 {
            let members: Vec<usize> = (0..n_samples).filter(|&i| constraints[i] == group).collect();
            let first = model.labels()[members[0]];
            assert!(members.iter().all(|&i| model.labels()[i] == first));
        }
    }

    #[test]
    fn constraint_length_must_match_the_dataset() {
        let (records, targets, _) = two_regimes(10);
        let dataset = DatasetBase::new(records, targets);

        let result = Clr::params(2)
            .constraints(array![0usize, 1, 0])
            .fit(&dataset);
        assert!(matches!(result, Err(ClrError::InvalidInput(_))));
    }

    #[test]
    fn initial_labels_must_lie_in_range() {
        let (records, targets, _) = two_regimes(10);
        let n_samples = records.nrows();
        let dataset = DatasetBase::new(records, targets);

        let result = Clr::params(2)
            .initial_labels(Array1::from_elem(n_samples, 7))
            .fit(&dataset);
        assert!(matches!(result, Err(ClrError::InvalidInput(_))));
    }

    #[test]
    fn a_cluster_empty_before_its_first_fit_is_an_error() {
        let (records, targets, _) = two_regimes(10);
        let n_samples = records.nrows();
        let dataset = DatasetBase::new(records, targets);

        // all points start in cluster 0, so clusters 1..4 never get a model
        let result = Clr::params(5)
            .initial_labels(Array1::zeros(n_samples))
            .fit(&dataset);
        assert!(matches!(result, Err(ClrError::EmptyCluster(_))));
    }

    #[test]
    fn supplied_initial_labels_seed_the_partition() {
        let (records, targets, truth) = two_regimes(40);
        let dataset = DatasetBase::new(records, targets);

        // starting from the true split, the first reassignment keeps it
        let model = Clr::params(2)
            .max_n_iterations(20)
            .initial_labels(truth.clone())
            .fit(&dataset)
            .expect("CLR fitted");
        assert!(agreement(model.labels(), &truth) >= 76);
        assert_eq!(model.n_iterations(), 1);
    }

    #[test]
    fn spatial_penalty_keeps_the_loop_convergent() {
        let (records, targets, _) = two_regimes(25);
        let dataset = DatasetBase::new(records, targets);

        let model = Clr::params(2)
            .spatial_weight(0.5)
            .max_n_iterations(20)
            .fit(&dataset)
            .expect("CLR fitted");
        assert!(model.n_iterations() <= 20);
        assert_abs_diff_eq!(model.weights().sum(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn works_with_a_plain_least_squares_prototype() {
        let (records, targets, truth) = two_regimes(40);
        let dataset = DatasetBase::new(records, targets);

        let model = Clr::params_with(2, Isaac64Rng::seed_from_u64(17), LinearRegression::new())
            .max_n_iterations(20)
            .n_runs(10)
            .fit(&dataset)
            .expect("CLR fitted");
        assert!(agreement(model.labels(), &truth) >= 76);
    }
}
