//! Validated network topologies: construction, identifier layout, and deterministic routing.

pub mod builder;
mod routing;
pub(crate) mod topology;
pub mod types;

use petgraph::visit::EdgeRef;
use rayon::prelude::*;

pub use topology::TopologyError;
pub use types::{Link, LinkId, Node, NodeId, NodeKind};

use crate::traffic::{Stream, StreamId};

use self::{routing::Routes, topology::Topology};

/// A validated, fully identified topology together with its routing table. This is the read-only
/// structure consumed by traffic synthesis, route resolution, artifact emission, and any external
/// renderer.
#[derive(Debug, Clone)]
pub struct Network {
    topology: Topology,
    routes: Routes,
}

impl Network {
    pub fn new(nodes: &[Node], links: &[Link]) -> Result<Self, TopologyError> {
        let topology = Topology::new(nodes, links)?;
        let routes = Routes::new(&topology);
        Ok(Self { topology, routes })
    }

    /// Resolves a route for every stream. Routes are shortest by hop count, with ties broken
    /// toward the smallest node ID, so resolution is a pure function of the topology and the
    /// stream endpoints.
    ///
    /// Streams are only ever synthesized against the same validated topology, so resolution
    /// cannot fail in a correct pipeline; it is still checked because topology and traffic
    /// generation are separate stages.
    pub fn resolve_routes(&self, streams: &[Stream]) -> Result<Vec<RoutedStream>, UnreachableError> {
        streams
            .par_iter()
            .map(|stream| {
                let route = self.route_between(stream.id, stream.src, stream.dst)?;
                Ok(RoutedStream {
                    stream: stream.clone(),
                    route,
                })
            })
            .collect()
    }

    fn route_between(
        &self,
        stream: StreamId,
        src: NodeId,
        dst: NodeId,
    ) -> Result<Route, UnreachableError> {
        let unreachable = || UnreachableError { stream, src, dst };
        let mut links = Vec::new();
        let mut cur = src;
        while cur != dst {
            let hops = self.routes.next_hops(cur, dst).ok_or_else(unreachable)?;
            let &next = hops.first().ok_or_else(unreachable)?;
            let link = self
                .topology
                .find_link(cur, next)
                .ok_or_else(unreachable)?;
            links.push(link.id);
            cur = next;
        }
        Ok(Route::new(links))
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.topology.node(id)
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.topology.link(id)
    }

    /// Switches, in identifier order.
    pub fn switches(&self) -> impl Iterator<Item = &Node> {
        self.nodes().filter(|n| n.is_switch())
    }

    /// End systems, in identifier order.
    pub fn end_systems(&self) -> impl Iterator<Item = &Node> {
        self.nodes().filter(|n| n.is_end_system())
    }

    /// The end systems attached to `switch`, in identifier order.
    pub fn end_systems_of(&self, switch: NodeId) -> Vec<NodeId> {
        let Some(&idx) = self.topology.idx_of(&switch) else {
            return Vec::new();
        };
        let mut out = self
            .topology
            .graph
            .neighbors(idx)
            .filter_map(|n| {
                let node = &self.topology.graph[n];
                node.is_end_system().then_some(node.id)
            })
            .collect::<Vec<_>>();
        out.sort();
        out
    }

    /// The links incident to `node`, in identifier order.
    pub fn links_of(&self, node: NodeId) -> Vec<LinkId> {
        let Some(&idx) = self.topology.idx_of(&node) else {
            return Vec::new();
        };
        let mut out = self
            .topology
            .graph
            .edges(idx)
            .map(|e| *e.weight())
            .collect::<Vec<_>>();
        out.sort();
        out
    }

    /// The switch an end system is attached to, or `None` if `node` is not an end system.
    pub fn switch_of(&self, node: NodeId) -> Option<NodeId> {
        if !self.node(node)?.is_end_system() {
            return None;
        }
        let &idx = self.topology.idx_of(&node)?;
        self.topology
            .graph
            .neighbors(idx)
            .next()
            .map(|n| self.topology.graph[n].id)
    }

    pub fn nr_switches(&self) -> usize {
        self.switches().count()
    }

    pub fn nr_end_systems(&self) -> usize {
        self.end_systems().count()
    }

    delegate::delegate! {
        to self.topology.graph {
            #[call(node_weights)]
            pub fn nodes(&self) -> impl Iterator<Item = &Node>;

            #[call(node_count)]
            pub fn nr_nodes(&self) -> usize;
        }

        to self.topology.links {
            #[call(iter)]
            pub fn links(&self) -> impl Iterator<Item = &Link>;

            #[call(len)]
            pub fn nr_links(&self) -> usize;
        }
    }
}

/// An ordered sequence of links from a stream's source end system to its destination. Computed
/// once by [`Network::resolve_routes`] and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Route {
    links: Vec<LinkId>,
}

impl Route {
    pub fn new(links: Vec<LinkId>) -> Self {
        Self { links }
    }

    pub fn links(&self) -> &[LinkId] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

/// A stream together with its resolved route.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RoutedStream {
    pub stream: Stream,
    pub route: Route,
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("no route for stream {stream} from {src} to {dst}")]
pub struct UnreachableError {
    /// The stream that could not be routed.
    pub stream: StreamId,
    /// The stream's source end system.
    pub src: NodeId,
    /// The intended destination end system.
    pub dst: NodeId,
}
