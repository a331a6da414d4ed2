//! An interface to OMNeT++-style simulation inputs.
//!
//! This crate renders a generated [`Scenario`] into the two files the simulator consumes: a NED
//! network description listing every switch, end system, and link, and an INI run file binding
//! each stream's period, size, deadline, and route to the NED module names. Both files are built
//! from one shared name map, and nothing is written unless both render completely, so the INI can
//! never reference a module the NED does not declare.

#![warn(unreachable_pub, missing_debug_implementations, missing_docs)]

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use rustc_hash::FxHashMap;
use tsngen_core::{
    network::{LinkId, Network, NodeId, RoutedStream},
    traffic::StreamId,
    units::Gbps,
    Scenario,
};

/// The link rate of every emitted Ethernet channel.
const ETH_RATE: Gbps = Gbps::new(1);

/// An OMNeT++ rendering of a scenario.
#[derive(Debug, typed_builder::TypedBuilder)]
pub struct OmnetScenario<'a> {
    /// The scenario to render.
    pub scenario: &'a Scenario,
    /// The directory in which to write both artifacts.
    #[builder(setter(into))]
    pub output_dir: PathBuf,
    /// The NED network name, also used for the `.ned` file name.
    #[builder(setter(into), default = String::from("TsnNetwork"))]
    pub network_name: String,
}

impl OmnetScenario<'_> {
    /// Renders and writes both artifacts, returning their paths.
    ///
    /// Emission is all-or-nothing: both files are rendered in memory first, and any unresolved
    /// cross-reference fails the call before anything touches the filesystem.
    pub fn emit(&self) -> Result<EmittedArtifacts, Error> {
        let names = module_names(self.scenario.network());
        let ned = translate_network(self.scenario.network(), &self.network_name, &names)?;
        let ini = translate_runfile(self.scenario, &self.network_name, &names)?;
        fs::create_dir_all(&self.output_dir)?;
        let ned_path = self.output_dir.join(format!("{}.ned", self.network_name));
        let ini_path = self.output_dir.join("omnetpp.ini");
        fs::write(&ned_path, ned)?;
        fs::write(&ini_path, ini)?;
        Ok(EmittedArtifacts {
            ned: ned_path,
            ini: ini_path,
        })
    }
}

/// The paths of the two written artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedArtifacts {
    /// The NED network description.
    pub ned: PathBuf,
    /// The INI run file.
    pub ini: PathBuf,
}

/// The error type for [`OmnetScenario::emit`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A node is referenced that the topology does not contain.
    #[error("node {node} is referenced but not part of the topology")]
    UnknownNode {
        /// The unresolved node.
        node: NodeId,
    },

    /// A stream's route references a link the topology does not contain.
    #[error("stream {stream} routes over link {link}, which is not part of the topology")]
    UnknownLink {
        /// The stream whose route is broken.
        stream: StreamId,
        /// The unresolved link.
        link: LinkId,
    },

    /// A stream's route does not chain from its source to its destination.
    #[error("stream {stream} has a route that does not chain from its source to its destination")]
    BrokenRoute {
        /// The stream whose route is broken.
        stream: StreamId,
    },

    /// IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Builds the shared node-to-module-name map: switch `s` is `sw<s>`, and end system `k` of
/// switch `s` is `es<s>_<k>`.
fn module_names(network: &Network) -> FxHashMap<NodeId, String> {
    let mut names = FxHashMap::default();
    for (s, switch) in network.switches().enumerate() {
        names.insert(switch.id, format!("sw{s}"));
        for (k, es) in network.end_systems_of(switch.id).into_iter().enumerate() {
            names.insert(es, format!("es{s}_{k}"));
        }
    }
    names
}

fn name_of<'a>(names: &'a FxHashMap<NodeId, String>, node: NodeId) -> Result<&'a str, Error> {
    names
        .get(&node)
        .map(String::as_str)
        .ok_or(Error::UnknownNode { node })
}

fn translate_network(
    network: &Network,
    network_name: &str,
    names: &FxHashMap<NodeId, String>,
) -> Result<String, Error> {
    let mut s = String::new();
    writeln!(
        s,
        "// {} nodes ({} switches, {} end systems), {} links",
        network.nr_nodes(),
        network.nr_switches(),
        network.nr_end_systems(),
        network.nr_links()
    )
    .unwrap();
    writeln!(s, "package tsn;").unwrap();
    writeln!(s).unwrap();
    writeln!(s, "channel Eth1G extends ned.DatarateChannel").unwrap();
    writeln!(s, "{{").unwrap();
    writeln!(s, "    datarate = {ETH_RATE};").unwrap();
    writeln!(s, "}}").unwrap();
    writeln!(s).unwrap();
    for module in ["TsnSwitch", "TsnDevice"] {
        writeln!(s, "module {module}").unwrap();
        writeln!(s, "{{").unwrap();
        writeln!(s, "    gates:").unwrap();
        writeln!(s, "        inout ethg[];").unwrap();
        writeln!(s, "}}").unwrap();
        writeln!(s).unwrap();
    }
    writeln!(s, "network {network_name}").unwrap();
    writeln!(s, "{{").unwrap();
    writeln!(s, "    submodules:").unwrap();
    for node in network.nodes() {
        let name = name_of(names, node.id)?;
        let module = if node.is_switch() { "TsnSwitch" } else { "TsnDevice" };
        let nr_gates = network.links_of(node.id).len();
        if nr_gates == 0 {
            writeln!(s, "        {name}: {module};").unwrap();
        } else {
            writeln!(s, "        {name}: {module} {{").unwrap();
            writeln!(s, "            gates:").unwrap();
            writeln!(s, "                ethg[{nr_gates}];").unwrap();
            writeln!(s, "        }}").unwrap();
        }
    }
    writeln!(s, "    connections:").unwrap();
    for link in network.links() {
        writeln!(
            s,
            "        {}.ethg[{}] <--> Eth1G <--> {}.ethg[{}];",
            name_of(names, link.a)?,
            link.a_port,
            name_of(names, link.b)?,
            link.b_port
        )
        .unwrap();
    }
    writeln!(s, "}}").unwrap();
    Ok(s)
}

fn translate_runfile(
    scenario: &Scenario,
    network_name: &str,
    names: &FxHashMap<NodeId, String>,
) -> Result<String, Error> {
    let network = scenario.network();
    let mut per_source: FxHashMap<NodeId, Vec<&RoutedStream>> = FxHashMap::default();
    for rs in scenario.streams() {
        per_source.entry(rs.stream.src).or_default().push(rs);
    }
    let mut s = String::new();
    writeln!(s, "[General]").unwrap();
    writeln!(s, "network = {network_name}").unwrap();
    // One block per end system, in switch then end-system order, matching the NED.
    for switch in network.switches() {
        for es in network.end_systems_of(switch.id) {
            let es_name = name_of(names, es)?;
            let apps = per_source.get(&es).map(Vec::as_slice).unwrap_or(&[]);
            writeln!(s).unwrap();
            writeln!(s, "*.{es_name}.numApps = {}", apps.len()).unwrap();
            for (i, rs) in apps.iter().enumerate() {
                let stream = &rs.stream;
                let app = format!("*.{es_name}.app[{i}]");
                writeln!(s, "{app}.typename = \"TsnTrafficSource\"").unwrap();
                writeln!(s, "{app}.streamName = \"stream{}\"", stream.id).unwrap();
                writeln!(s, "{app}.trafficClass = \"{}\"", stream.traffic_type).unwrap();
                writeln!(s, "{app}.pcp = {}", stream.pcp).unwrap();
                writeln!(s, "{app}.productionInterval = {}", stream.period).unwrap();
                writeln!(s, "{app}.packetLength = {}", stream.size).unwrap();
                writeln!(s, "{app}.deadline = {}", stream.deadline).unwrap();
                writeln!(s, "{app}.destination = \"{}\"", name_of(names, stream.dst)?).unwrap();
                writeln!(s, "{app}.route = \"{}\"", route_modules(rs, network, names)?).unwrap();
            }
        }
    }
    Ok(s)
}

/// Renders a stream's route as the space-separated chain of module names from its source to its
/// destination, resolving every link against the topology.
fn route_modules(
    rs: &RoutedStream,
    network: &Network,
    names: &FxHashMap<NodeId, String>,
) -> Result<String, Error> {
    let stream = &rs.stream;
    let mut cur = stream.src;
    let mut chain = vec![name_of(names, cur)?];
    for &lid in rs.route.links() {
        let link = network.link(lid).ok_or(Error::UnknownLink {
            stream: stream.id,
            link: lid,
        })?;
        cur = link
            .opposite(cur)
            .ok_or(Error::BrokenRoute { stream: stream.id })?;
        chain.push(name_of(names, cur)?);
    }
    if cur != stream.dst {
        return Err(Error::BrokenRoute { stream: stream.id });
    }
    Ok(chain.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    use tsngen_core::{
        network::{NodeId, Route, RoutedStream},
        run,
        testing,
        traffic::{Stream, StreamId},
        units::{Bytes, Microsecs},
    };

    fn two_switch_scenario() -> anyhow::Result<Scenario> {
        let network = testing::chain_network(2, 1)?;
        let stream = Stream {
            id: StreamId::new(0),
            src: NodeId::new(2),
            dst: NodeId::new(3),
            traffic_type: "ats".into(),
            pcp: 5,
            period: Microsecs::new(500),
            size: Bytes::new(1000),
            deadline: Microsecs::new(2000),
        };
        let streams = network.resolve_routes(&[stream])?;
        Ok(Scenario::new(network, streams))
    }

    #[test]
    fn translate_network_correct() -> anyhow::Result<()> {
        let scenario = two_switch_scenario()?;
        let names = module_names(scenario.network());
        let s = translate_network(scenario.network(), "TsnNetwork", &names)?;
        insta::assert_snapshot!(s, @r###"
        // 4 nodes (2 switches, 2 end systems), 3 links
        package tsn;

        channel Eth1G extends ned.DatarateChannel
        {
            datarate = 1Gbps;
        }

        module TsnSwitch
        {
            gates:
                inout ethg[];
        }

        module TsnDevice
        {
            gates:
                inout ethg[];
        }

        network TsnNetwork
        {
            submodules:
                sw0: TsnSwitch {
                    gates:
                        ethg[2];
                }
                sw1: TsnSwitch {
                    gates:
                        ethg[2];
                }
                es0_0: TsnDevice {
                    gates:
                        ethg[1];
                }
                es1_0: TsnDevice {
                    gates:
                        ethg[1];
                }
            connections:
                sw0.ethg[0] <--> Eth1G <--> sw1.ethg[0];
                sw0.ethg[1] <--> Eth1G <--> es0_0.ethg[0];
                sw1.ethg[1] <--> Eth1G <--> es1_0.ethg[0];
        }
        "###);
        Ok(())
    }

    #[test]
    fn translate_runfile_correct() -> anyhow::Result<()> {
        let scenario = two_switch_scenario()?;
        let names = module_names(scenario.network());
        let s = translate_runfile(&scenario, "TsnNetwork", &names)?;
        insta::assert_snapshot!(s, @r###"
        [General]
        network = TsnNetwork

        *.es0_0.numApps = 1
        *.es0_0.app[0].typename = "TsnTrafficSource"
        *.es0_0.app[0].streamName = "stream0"
        *.es0_0.app[0].trafficClass = "ats"
        *.es0_0.app[0].pcp = 5
        *.es0_0.app[0].productionInterval = 500us
        *.es0_0.app[0].packetLength = 1000B
        *.es0_0.app[0].deadline = 2000us
        *.es0_0.app[0].destination = "es1_0"
        *.es0_0.app[0].route = "es0_0 sw0 sw1 es1_0"

        *.es1_0.numApps = 0
        "###);
        Ok(())
    }

    #[test]
    fn runfile_only_references_declared_modules() -> anyhow::Result<()> {
        let scenario = run(testing::chain_spec(4, 2))?;
        let names = module_names(scenario.network());
        let ned = translate_network(scenario.network(), "TsnNetwork", &names)?;
        let ini = translate_runfile(&scenario, "TsnNetwork", &names)?;
        for line in ini.lines() {
            if let Some((_, rest)) = line.split_once(" = \"") {
                let value = rest.trim_end_matches('"');
                if line.contains(".destination") || line.contains(".route") {
                    for module in value.split_whitespace() {
                        assert!(
                            ned.contains(&format!("        {module}: Tsn")),
                            "module {module} referenced in INI but not declared in NED"
                        );
                    }
                }
            }
        }
        Ok(())
    }

    #[test]
    fn emit_writes_both_artifacts_deterministically() -> anyhow::Result<()> {
        let scenario = run(testing::chain_spec(3, 2))?;
        let read = |dir: &std::path::Path| -> anyhow::Result<(String, String)> {
            let out = OmnetScenario::builder()
                .scenario(&scenario)
                .output_dir(dir)
                .build()
                .emit()?;
            Ok((fs::read_to_string(out.ned)?, fs::read_to_string(out.ini)?))
        };
        let dir_a = tempfile::tempdir()?;
        let dir_b = tempfile::tempdir()?;
        let a = read(dir_a.path())?;
        let b = read(dir_b.path())?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn broken_route_writes_nothing() -> anyhow::Result<()> {
        let network = testing::chain_network(2, 1)?;
        let stream = Stream {
            id: StreamId::new(0),
            src: NodeId::new(2),
            dst: NodeId::new(3),
            traffic_type: "ats".into(),
            pcp: 5,
            period: Microsecs::new(500),
            size: Bytes::new(1000),
            deadline: Microsecs::new(2000),
        };
        let routed = RoutedStream {
            stream,
            route: Route::new(vec![LinkId::new(99)]),
        };
        let scenario = Scenario::new(network, vec![routed]);
        let dir = tempfile::tempdir()?;
        let out_dir = dir.path().join("artifacts");
        let res = OmnetScenario::builder()
            .scenario(&scenario)
            .output_dir(&out_dir)
            .build()
            .emit();
        assert!(matches!(res, Err(Error::UnknownLink { .. })));
        assert!(!out_dir.exists());
        Ok(())
    }
}
