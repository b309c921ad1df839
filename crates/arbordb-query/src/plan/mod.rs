//! Query plans.
//!
//! Only physical plans exist here: trees of operators with every static
//! parameter resolved. Planning from a higher-level query is left to callers.

pub mod physical;

pub use physical::PhysicalOperator;
