//! Public entry point: [`Evaluator`].

pub mod evaluator;

pub use evaluator::{backoff_delay, Evaluator};
