//! The generation pipeline. A specification becomes a validated topology, then an identified
//! network, then synthesized streams with resolved routes, packaged as an immutable
//! [`Scenario`].

use crate::network::builder::{self, ConnectivityError};
use crate::network::{Network, RoutedStream, TopologyError, UnreachableError};
use crate::spec::{ScenarioSpec, SpecError};
use crate::traffic::{self, TrafficError};

/// The core `tsngen` routine. This transforms a specification into a complete scenario: a
/// validated, fully identified topology plus synthesized streams with resolved routes.
///
/// Each stage consumes only the validated output of its predecessor, and the whole run is a pure
/// function of the specification (including its seed). Any stage failure aborts the run; there is
/// no partial scenario.
pub fn run(spec: ScenarioSpec) -> Result<Scenario, Error> {
    let spec = spec.validate()?;
    log::info!(
        "building {} topology: {} switches, {} end system(s) per switch (seed {})",
        spec.topology.family.name(),
        spec.topology.nr_switches,
        spec.topology.nr_es_per_switch,
        spec.seed,
    );
    let raw = builder::build_validated(
        &spec.topology.family,
        spec.topology.nr_switches,
        spec.topology.nr_es_per_switch,
        spec.seed,
    )?;
    let (nodes, links) = builder::materialize(&raw);
    let network = Network::new(&nodes, &links)?;
    log::info!(
        "topology ready: {} nodes, {} links",
        network.nr_nodes(),
        network.nr_links()
    );
    let streams = traffic::synthesize(&network, &spec.traffic, spec.seed)?;
    log::info!("synthesized {} stream(s)", streams.len());
    let streams = network.resolve_routes(&streams)?;
    Ok(Scenario { network, streams })
}

/// A complete generated scenario, immutable once constructed. This is also the read-only view
/// handed to artifact emission and to any external topology renderer.
#[derive(Debug, Clone)]
pub struct Scenario {
    network: Network,
    streams: Vec<RoutedStream>,
}

impl Scenario {
    /// Packages an already-identified network and routed streams as a scenario.
    ///
    /// [`run`] is the blessed producer; this constructor exists so frontends can be exercised
    /// against hand-built inputs.
    pub fn new(network: Network, streams: Vec<RoutedStream>) -> Self {
        Self { network, streams }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Routed streams, in stream identifier order.
    pub fn streams(&self) -> &[RoutedStream] {
        &self.streams
    }
}

/// Generation pipeline error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    InvalidSpec(#[from] SpecError),

    #[error(transparent)]
    Connectivity(#[from] ConnectivityError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Traffic(#[from] TrafficError),

    #[error(transparent)]
    Unreachable(#[from] UnreachableError),
}
