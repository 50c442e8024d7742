//! Numerical building blocks shared by the model-based forecast providers.

pub mod linalg;
pub mod optimize;
pub mod polynomial;

pub use linalg::{ordinary_least_squares, ridge_least_squares, LinearFit};
pub use optimize::{Minimum, NelderMead};
pub use polynomial::{integrate_ar, is_invertible, is_stationary, psi_weights};
