pub mod error;
pub mod rounding;

pub use error::{AppError, Result};
