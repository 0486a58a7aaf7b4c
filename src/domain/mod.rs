//! Core domain types and logic.

pub mod cleaning;
pub mod config_validation;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod price;
pub mod returns;
pub mod solver;
pub mod study;
pub mod summary;
pub mod universe;
pub mod window;
