//! `linfa-clr` provides pure Rust implementations of clusterwise linear
//! regression (CLR).
//!
//! ## The big picture
//!
//! `linfa-clr` is a crate in the `linfa` ecosystem, a wider effort to
//! bootstrap a toolkit for classical Machine Learning implemented in pure
//! Rust, kin in spirit to Python's `scikit-learn`.
//!
//! Clusterwise linear regression jointly partitions a dataset into `k`
//! clusters and fits a separate linear model to each cluster, so that every
//! point ends up in the cluster whose model explains it best. It is useful
//! whenever a single global regression hides several distinct linear
//! regimes, e.g. customer segments with different price sensitivities or
//! sensors with different calibration lines.
//!
//! ## Current state
//!
//! Right now `linfa-clr` provides the following algorithms:
//! * [Hard clusterwise linear regression](Clr), an EM-like alternation of
//!   per-cluster regression fits and best-fit label reassignment, with
//!   optional spatial-compactness penalty and group constraints;
//! * [Fuzzy clusterwise linear regression](FuzzyClr), a mixture-of-experts
//!   variant with Gaussian soft responsibilities and weighted least squares.
//!
//! Both optimizers are generic over the underlying linear model through the
//! [`Regressor`] trait; ridge regression with a small penalty is the
//! default. Both support multi-start selection (`n_runs`) to mitigate their
//! sensitivity to the random initialization.

mod assignment;
mod clr;
mod fuzzy_clr;
mod regression;

pub use assignment::reassign_labels;
pub use clr::*;
pub use fuzzy_clr::*;
pub use regression::*;
