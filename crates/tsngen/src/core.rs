//! Core `tsngen` data structures and routines. The most common entry point is
//! [`run::run()`](run::run), which turns a [specification](ScenarioSpec) into a
//! [`Scenario`](run::Scenario).

pub use tsngen_core::*;
