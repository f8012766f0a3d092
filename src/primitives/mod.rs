//! Core compute primitives (Vector, Matrix).
//!
//! Feature matrices handed to estimators and the target vectors they are
//! scored against.

mod matrix;
mod vector;

pub use matrix::Matrix;
pub use vector::Vector;
