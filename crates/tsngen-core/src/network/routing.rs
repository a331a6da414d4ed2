use std::collections::VecDeque;

use petgraph::{
    graph::NodeIndex,
    visit::{VisitMap, Visitable},
};
use rustc_hash::FxHashMap;

use crate::network::{
    topology::Topology,
    types::{NodeId, NodeKind},
};

pub(super) type HopMatrix = FxHashMap<NodeId, HopMap>;
pub(super) type HopMap = FxHashMap<NodeId, Vec<NodeId>>;

#[derive(Debug, Clone, serde::Serialize)]
pub(crate) struct Routes {
    inner: HopMatrix,
}

impl Routes {
    /// Builds a routing table from a topology using BFS. Only switches forward traffic, so end
    /// systems are never expanded. Next-hop candidate lists are sorted ascending, and path walks
    /// take the first entry, so ties between equal-cost hops always resolve toward the smallest
    /// node ID.
    pub(crate) fn new(topology: &Topology) -> Self {
        let g = &topology.graph;
        let mut hops = HopMatrix::default();
        for start in g.node_indices() {
            let mut discovered = g.visit_map();
            discovered.visit(start);

            let mut queue = VecDeque::new();
            queue.push_back(start);

            let mut distances: FxHashMap<NodeIndex, usize> = [(start, 0)].into_iter().collect();

            while let Some(n) = queue.pop_front() {
                let cur_distance = *distances.get(&n).unwrap();
                for succ in g.neighbors(n) {
                    if discovered.visit(succ) {
                        distances.insert(succ, cur_distance + 1);
                        if matches!(g[succ].kind, NodeKind::Switch) {
                            queue.push_back(succ);
                        }
                    }
                    if *distances.get(&succ).unwrap() == cur_distance + 1 {
                        hops.entry(g[succ].id)
                            .or_default()
                            .entry(g[start].id)
                            .or_default()
                            .push(g[n].id);
                    }
                }
            }
        }
        for map in hops.values_mut() {
            for candidates in map.values_mut() {
                candidates.sort();
            }
        }
        Self { inner: hops }
    }

    pub(crate) fn for_node(&self, node: NodeId) -> Option<&HopMap> {
        self.inner.get(&node)
    }

    /// Returns the sorted next-hop candidates from `from` toward `to`, if a route exists.
    pub(crate) fn next_hops(&self, from: NodeId, to: NodeId) -> Option<&[NodeId]> {
        self.for_node(from)
            .and_then(|m| m.get(&to))
            .map(|v| v.as_slice())
    }
}
