mod algorithm;
mod errors;
mod hyperparams;

pub use algorithm::*;
pub use errors::{ClrError, ClrParamsError};
pub use hyperparams::*;
