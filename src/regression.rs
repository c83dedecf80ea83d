use linfa::dataset::DatasetBase;
use linfa::traits::{Fit, PredictInplace};
use linfa::Float;
use linfa_elasticnet::{ElasticNet, ElasticNetError, ElasticNetParams};
use linfa_linear::{FittedLinearRegression, LinearError, LinearRegression};
use ndarray::{Array1, ArrayView1, ArrayView2};
use thiserror::Error;

/// An error raised by the regression collaborator while fitting a cluster
/// model. The optimizers perform no retries or recovery, whatever the
/// backend reports is passed through.
#[derive(Error, Debug)]
pub enum RegressorError {
    #[error("linear model fit failed: {0}")]
    Fit(String),
}

/// A linear model family that can be fitted to a feature matrix and a target
/// vector.
///
/// A value implementing this trait plays the role of a prototype
/// configuration: `fit` borrows the configuration and returns a fresh,
/// independently owned model, so the optimizers can train one instance per
/// cluster from a single prototype.
pub trait Regressor<F: Float> {
    type Fitted: FittedRegressor<F>;

    fn fit(&self, x: ArrayView2<F>, y: ArrayView1<F>) -> Result<Self::Fitted, RegressorError>;
}

/// A fitted linear model predicting scalar targets for a feature matrix.
pub trait FittedRegressor<F: Float> {
    fn predict(&self, x: ArrayView2<F>) -> Array1<F>;
}

impl<F: Float> Regressor<F> for ElasticNetParams<F> {
    type Fitted = ElasticNet<F>;

    fn fit(&self, x: ArrayView2<F>, y: ArrayView1<F>) -> Result<Self::Fitted, RegressorError> {
        let data = DatasetBase::new(x.to_owned(), y.to_owned());
        <Self as Fit<_, _, ElasticNetError>>::fit(self, &data)
            .map_err(|error| RegressorError::Fit(error.to_string()))
    }
}

impl<F: Float> FittedRegressor<F> for ElasticNet<F> {
    fn predict(&self, x: ArrayView2<F>) -> Array1<F> {
        let mut predictions = Array1::zeros(x.nrows());
        self.predict_inplace(&x, &mut predictions);
        predictions
    }
}

impl<F: Float> Regressor<F> for LinearRegression {
    type Fitted = FittedLinearRegression<F>;

    fn fit(&self, x: ArrayView2<F>, y: ArrayView1<F>) -> Result<Self::Fitted, RegressorError> {
        let data = DatasetBase::new(x.to_owned(), y.to_owned());
        <Self as Fit<_, _, LinearError<F>>>::fit(self, &data)
            .map_err(|error| RegressorError::Fit(error.to_string()))
    }
}

impl<F: Float> FittedRegressor<F> for FittedLinearRegression<F> {
    fn predict(&self, x: ArrayView2<F>) -> Array1<F> {
        let mut predictions = Array1::zeros(x.nrows());
        self.predict_inplace(&x, &mut predictions);
        predictions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn ridge_prototype_fits_a_line() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![1.0, 3.0, 5.0, 7.0];
        let prototype = ElasticNet::ridge().penalty(1e-5);
        let model = Regressor::fit(&prototype, x.view(), y.view()).unwrap();

        let predictions = model.predict(x.view());
        assert_abs_diff_eq!(predictions, y, epsilon = 1e-3);
        assert_abs_diff_eq!(model.hyperplane()[0], 2.0, epsilon = 1e-3);
        assert_abs_diff_eq!(model.intercept(), 1.0, epsilon = 1e-3);
    }

    #[test]
    fn ols_prototype_fits_a_line() {
        let x = array![[0.0], [1.0], [2.0]];
        let y = array![0.0, 2.0, 4.0];
        let model = Regressor::fit(&LinearRegression::new(), x.view(), y.view()).unwrap();

        let predictions = model.predict(array![[5.0]].view());
        assert_abs_diff_eq!(predictions[0], 10.0, epsilon = 1e-9);
    }

    #[test]
    fn every_fit_yields_an_independent_model() {
        let prototype = ElasticNet::ridge().penalty(1e-5);
        let first = Regressor::fit(&prototype, array![[0.0], [1.0]].view(), array![0.0, 1.0].view())
            .unwrap();
        let second =
            Regressor::fit(&prototype, array![[0.0], [1.0]].view(), array![0.0, -1.0].view())
                .unwrap();

        assert_abs_diff_eq!(first.hyperplane()[0], 1.0, epsilon = 1e-2);
        assert_abs_diff_eq!(second.hyperplane()[0], -1.0, epsilon = 1e-2);
    }
}
