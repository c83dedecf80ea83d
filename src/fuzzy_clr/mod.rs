mod algorithm;
mod errors;
mod hyperparams;

pub use algorithm::*;
pub use errors::{FuzzyClrError, FuzzyClrParamsError};
pub use hyperparams::*;
