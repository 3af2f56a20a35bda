//! Folding store units into one published snapshot.
//!
//! Units are mounted strictly left to right. Each one reports its state through
//! its ready hook, which binds its methods, folds its entry into the running
//! snapshot and publishes the result. After composition a change in one unit
//! re-folds only that unit's entry.

mod composition;

pub use composition::{Composition, CompositionBuilder};
