#![warn(unreachable_pub, missing_debug_implementations)]

//! The core `tsngen` library. This crate defines [the routine](run::run) that turns a generation
//! [specification](ScenarioSpec) into a complete TSN test [scenario](Scenario): a validated
//! switch/end-system topology with stable identifiers, synthesized traffic streams, and
//! deterministic routes. Frontends render scenarios into simulator input files.

#[macro_use]
mod ident;

pub mod network;
pub mod run;
pub mod spec;
pub mod testing;
pub mod traffic;
pub mod units;

pub(crate) mod utils;

pub use network::{
    builder::{ConnectivityError, InvalidParameterError, StructuralViolation, TopologyFamily},
    Link, LinkId, Network, Node, NodeId, NodeKind, Route, RoutedStream, TopologyError,
    UnreachableError,
};
pub use run::{run, Error, Scenario};
pub use spec::{ScenarioSpec, SpecError, TopologySpec};
pub use traffic::{Stream, StreamId, TrafficError, TrafficType};
