//! Core linear-algebra traits and their implementations for faer and slices.

pub mod traits;
pub mod wrappers;
