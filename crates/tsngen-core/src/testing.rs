//! Small fixture topologies and traffic configurations shared by tests here and in the frontend
//! crates.

use crate::network::builder::{self, TopologyFamily};
use crate::network::topology::{Topology, TopologyError};
use crate::network::{Link, Network, Node};
use crate::spec::{ScenarioSpec, TopologySpec};
use crate::traffic::TrafficType;
use crate::units::{Bytes, Microsecs};

/// An "ats" traffic type with one stream per end system and small, round bounds.
pub fn ats_type() -> TrafficType {
    TrafficType {
        name: "ats".into(),
        pcp: 5,
        streams_per_es: 1,
        periods: vec![
            Microsecs::new(500),
            Microsecs::new(1000),
            Microsecs::new(2000),
        ],
        size: (Bytes::new(64), Bytes::new(1518)),
        deadline: (Microsecs::new(1000), Microsecs::new(10000)),
    }
}

/// A chain-of-switches specification with the "ats" traffic type attached.
pub fn chain_spec(nr_switches: usize, nr_es_per_switch: usize) -> ScenarioSpec {
    ScenarioSpec::builder()
        .topology(
            TopologySpec::builder()
                .family(TopologyFamily::Chain)
                .nr_switches(nr_switches)
                .nr_es_per_switch(nr_es_per_switch)
                .build(),
        )
        .traffic(vec![ats_type()])
        .build()
}

/// An identified chain network.
pub fn chain_network(nr_switches: usize, nr_es_per_switch: usize) -> Result<Network, TopologyError> {
    let (nodes, links) = materialized(TopologyFamily::Chain, nr_switches, nr_es_per_switch);
    Network::new(&nodes, &links)
}

pub(crate) fn chain_topology(
    nr_switches: usize,
    nr_es_per_switch: usize,
) -> Result<Topology, TopologyError> {
    let (nodes, links) = materialized(TopologyFamily::Chain, nr_switches, nr_es_per_switch);
    Topology::new(&nodes, &links)
}

pub(crate) fn ring_topology(
    nr_switches: usize,
    nr_es_per_switch: usize,
) -> Result<Topology, TopologyError> {
    let (nodes, links) = materialized(TopologyFamily::Ring, nr_switches, nr_es_per_switch);
    Topology::new(&nodes, &links)
}

fn materialized(
    family: TopologyFamily,
    nr_switches: usize,
    nr_es_per_switch: usize,
) -> (Vec<Node>, Vec<Link>) {
    let raw = builder::build_validated(&family, nr_switches, nr_es_per_switch, 0)
        .expect("fixture topology must build");
    builder::materialize(&raw)
}
