use std::collections::VecDeque;

use petgraph::graph::{NodeIndex, UnGraph};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::network::types::{Link, LinkId, Node, NodeId, NodeKind};

#[derive(Debug, Clone)]
pub(crate) struct Topology {
    pub(crate) graph: UnGraph<Node, LinkId>,
    pub(crate) links: Vec<Link>,
    id2idx: FxHashMap<NodeId, NodeIndex>,
}

impl Topology {
    /// Creates a network topology from a list of nodes and links. This function returns an error
    /// if the given lists fail to produce a valid topology.
    ///
    /// Correctness properties:
    ///
    /// - Every node and every link must have a unique ID.
    /// - Every link must have distinct endpoints in `nodes`, at least one of them a switch.
    /// - For any two nodes, there must be at most one link between them.
    /// - No two links may occupy the same port on the same node.
    /// - Every end system must have exactly one link (to its owning switch).
    /// - The switch subgraph must be a single connected component.
    pub(crate) fn new(nodes: &[Node], links: &[Link]) -> Result<Self, TopologyError> {
        let mut g = UnGraph::default();
        let mut id2idx = FxHashMap::default();
        for n @ Node { id, .. } in nodes.iter().cloned() {
            let idx = g.add_node(n);
            if id2idx.insert(id, idx).is_some() {
                // CORRECTNESS: Every node must have a unique ID.
                return Err(TopologyError::DuplicateNodeId(id));
            }
        }
        let mut link_ids = FxHashSet::default();
        let mut ports = FxHashSet::default();
        for link @ &Link { id, a, b, .. } in links {
            // CORRECTNESS: Every link must have a unique ID.
            if !link_ids.insert(id) {
                return Err(TopologyError::DuplicateLinkId(id));
            }
            // CORRECTNESS: Every link must have distinct endpoints in `nodes`.
            if a == b {
                return Err(TopologyError::NodeAdjacentSelf(a));
            }
            let &aidx = id2idx.get(&a).ok_or(TopologyError::UndeclaredNode(a))?;
            let &bidx = id2idx.get(&b).ok_or(TopologyError::UndeclaredNode(b))?;
            // CORRECTNESS: At least one endpoint of every link must be a switch.
            if g[aidx].is_end_system() && g[bidx].is_end_system() {
                return Err(TopologyError::AdjacentEndSystems { a, b });
            }
            // CORRECTNESS: No two links may occupy the same port on the same node.
            for (node, port) in [(a, link.a_port), (b, link.b_port)] {
                if !ports.insert((node, port)) {
                    return Err(TopologyError::PortClash { node, port });
                }
            }
            g.add_edge(aidx, bidx, id);
        }
        for eidx in g.edge_indices() {
            // CORRECTNESS: For any two nodes, there must be at most one link between them.
            let (a, b) = g.edge_endpoints(eidx).unwrap();
            if g.edges_connecting(a, b).count() > 1 {
                return Err(TopologyError::DuplicateLink {
                    n1: g[a].id,
                    n2: g[b].id,
                });
            }
        }
        // CORRECTNESS: Every end system must have exactly one link.
        for idx in g.node_indices() {
            let Node { id, kind } = g[idx];
            if matches!(kind, NodeKind::EndSystem) {
                let nr_links = g.edges(idx).count();
                if nr_links != 1 {
                    return Err(TopologyError::EndSystemLinkCount { id, n: nr_links });
                }
            }
        }
        check_switches_connected(&g)?;
        Ok(Self {
            graph: g,
            links: links.to_vec(),
            id2idx,
        })
    }

    pub(crate) fn idx_of(&self, id: &NodeId) -> Option<&NodeIndex> {
        self.id2idx.get(id)
    }

    pub(crate) fn node(&self, id: NodeId) -> Option<&Node> {
        self.idx_of(&id).map(|&idx| &self.graph[idx])
    }

    pub(crate) fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.iter().find(|l| l.id == id)
    }

    pub(crate) fn find_link(&self, a: NodeId, b: NodeId) -> Option<&Link> {
        let (&aidx, &bidx) = (self.idx_of(&a)?, self.idx_of(&b)?);
        let eidx = self.graph.find_edge(aidx, bidx)?;
        self.link(self.graph[eidx])
    }
}

/// The switch subgraph must be one connected component. A lone switch (with or without end
/// systems) is trivially connected.
fn check_switches_connected(g: &UnGraph<Node, LinkId>) -> Result<(), TopologyError> {
    let switches = g
        .node_indices()
        .filter(|&idx| g[idx].is_switch())
        .collect::<Vec<_>>();
    let total = switches.len();
    let Some(&start) = switches.first() else {
        return Ok(());
    };
    let mut seen = FxHashSet::default();
    seen.insert(start);
    let mut queue = VecDeque::from([start]);
    while let Some(idx) = queue.pop_front() {
        for succ in g.neighbors(idx) {
            if g[succ].is_switch() && seen.insert(succ) {
                queue.push_back(succ);
            }
        }
    }
    if seen.len() != total {
        return Err(TopologyError::SwitchesDisconnected {
            reached: seen.len(),
            total,
        });
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("Duplicate node ID {0}")]
    DuplicateNodeId(NodeId),

    #[error("Duplicate link ID {0}")]
    DuplicateLinkId(LinkId),

    #[error("Node {0} is connected to itself")]
    NodeAdjacentSelf(NodeId),

    #[error("Node {0} is not declared")]
    UndeclaredNode(NodeId),

    #[error("Duplicate links between {n1} and {n2}")]
    DuplicateLink { n1: NodeId, n2: NodeId },

    #[error("End systems {a} and {b} are directly linked")]
    AdjacentEndSystems { a: NodeId, b: NodeId },

    #[error("Port {port} on node {node} is used by more than one link")]
    PortClash { node: NodeId, port: usize },

    #[error("End system {id} has {n} links (expected 1)")]
    EndSystemLinkCount { id: NodeId, n: usize },

    #[error("Switch subgraph is not connected ({reached} of {total} switches reachable)")]
    SwitchesDisconnected { reached: usize, total: usize },
}
