//! Utility functions and helpers for the mlfit-rs library.

pub mod finite_difference;
pub mod numeric;
