//! Topology generator families. A family turns `(nr_switches, nr_es_per_switch, seed)` into a raw
//! switch graph, which is checked against the family's structural contract and then materialized
//! into identified nodes and links.

use std::collections::BTreeSet;

use petgraph::unionfind::UnionFind;
use rand::prelude::*;

use crate::network::types::{Link, LinkId, Node, NodeId};
use crate::utils;

/// The maximum number of generation attempts for stochastic families before a disconnected draw
/// is surfaced as a [`ConnectivityError`].
pub(crate) const MAX_BUILD_ATTEMPTS: usize = 64;

/// A topology generator family and its family-specific parameters.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum TopologyFamily {
    /// Switches form a single cycle. Degenerate sizes degrade: two switches yield one edge, a
    /// single switch yields none.
    #[serde(alias = "cycle")]
    Ring,
    /// Switches form a simple chain with no wraparound edge.
    #[serde(alias = "path")]
    Chain,
    /// Every switch pair is linked (a complete graph). A bounded-degree mesh variant is not
    /// implemented.
    Mesh,
    /// Switches are placed uniformly in the unit square; switches within `radius` of each other
    /// are linked.
    RandomGeometric { radius: f64 },
    /// Each switch pair is linked independently with probability `edge_prob`.
    Binomial { edge_prob: f64 },
    /// Chung-Lu model: pair `(i, j)` is linked with probability
    /// `min(1, degrees[i] * degrees[j] / sum(degrees))`.
    ExpectedDegree { degrees: Vec<f64> },
}

impl TopologyFamily {
    pub fn name(&self) -> &'static str {
        match self {
            TopologyFamily::Ring => "ring",
            TopologyFamily::Chain => "chain",
            TopologyFamily::Mesh => "mesh",
            TopologyFamily::RandomGeometric { .. } => "random-geometric",
            TopologyFamily::Binomial { .. } => "binomial",
            TopologyFamily::ExpectedDegree { .. } => "expected-degree",
        }
    }

    /// Stochastic families draw their edge sets from a seeded generator and get bounded
    /// regeneration on disconnected draws.
    pub fn is_stochastic(&self) -> bool {
        matches!(
            self,
            TopologyFamily::RandomGeometric { .. }
                | TopologyFamily::Binomial { .. }
                | TopologyFamily::ExpectedDegree { .. }
        )
    }

    /// Checks the size and family parameters, without generating anything.
    pub fn validate_params(&self, nr_switches: usize) -> Result<(), InvalidParameterError> {
        if nr_switches < 1 {
            return Err(InvalidParameterError::SwitchCount { got: nr_switches });
        }
        match *self {
            TopologyFamily::Ring | TopologyFamily::Chain | TopologyFamily::Mesh => Ok(()),
            TopologyFamily::RandomGeometric { radius } => {
                if !radius.is_finite() || radius <= 0.0 {
                    return Err(InvalidParameterError::Radius { got: radius });
                }
                Ok(())
            }
            TopologyFamily::Binomial { edge_prob } => {
                if !(0.0..=1.0).contains(&edge_prob) {
                    return Err(InvalidParameterError::EdgeProbability { got: edge_prob });
                }
                Ok(())
            }
            TopologyFamily::ExpectedDegree { ref degrees } => {
                if degrees.len() != nr_switches {
                    return Err(InvalidParameterError::DegreeSequenceLength {
                        expected: nr_switches,
                        got: degrees.len(),
                    });
                }
                for (switch, &d) in degrees.iter().enumerate() {
                    if !d.is_finite() || d < 0.0 {
                        return Err(InvalidParameterError::Degree { switch, got: d });
                    }
                }
                if nr_switches > 1 && degrees.iter().sum::<f64>() <= 0.0 {
                    return Err(InvalidParameterError::DegreeSum);
                }
                Ok(())
            }
        }
    }
}

/// A raw switch graph: switch ordinals `0..nr_switches` and an edge set sorted ascending by
/// `(i, j)` with `i < j`, free of self-loops and duplicates by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawTopology {
    pub(crate) nr_switches: usize,
    pub(crate) nr_es_per_switch: usize,
    pub(crate) switch_edges: Vec<(usize, usize)>,
}

/// Builds a raw topology and checks it against the family's structural contract. Stochastic
/// families are regenerated with a derived sub-seed up to [`MAX_BUILD_ATTEMPTS`] times if a draw
/// comes out disconnected; deterministic families fail immediately, since for them a violation is
/// a generator bug rather than bad luck.
///
/// PRECONDITION: `family.validate_params(nr_switches)` has passed.
pub(crate) fn build_validated(
    family: &TopologyFamily,
    nr_switches: usize,
    nr_es_per_switch: usize,
    seed: u64,
) -> Result<RawTopology, ConnectivityError> {
    let mut attempts = 0;
    loop {
        // Every attempt, including the first, derives its generator seed from (seed, attempt) so
        // a regeneration can never replay the draw that just failed.
        let sub_seed = utils::calculate_hash(&(seed, attempts));
        let raw = build_raw(family, nr_switches, nr_es_per_switch, sub_seed);
        attempts += 1;
        match check_raw(&raw, family) {
            Ok(()) => return Ok(raw),
            Err(StructuralViolation::Disconnected { .. })
                if family.is_stochastic() && attempts < MAX_BUILD_ATTEMPTS =>
            {
                log::debug!(
                    "{} topology disconnected on attempt {attempts}, regenerating",
                    family.name()
                );
            }
            Err(violation) => {
                return Err(ConnectivityError {
                    family: family.name(),
                    seed,
                    attempts,
                    violation,
                });
            }
        }
    }
}

fn build_raw(
    family: &TopologyFamily,
    nr_switches: usize,
    nr_es_per_switch: usize,
    rng_seed: u64,
) -> RawTopology {
    let n = nr_switches;
    let mut edges = BTreeSet::new();
    let mut insert = |a: usize, b: usize| {
        if a != b {
            edges.insert((a.min(b), a.max(b)));
        }
    };
    match *family {
        TopologyFamily::Ring => {
            for i in 0..n {
                insert(i, (i + 1) % n);
            }
        }
        TopologyFamily::Chain => {
            for i in 1..n {
                insert(i - 1, i);
            }
        }
        TopologyFamily::Mesh => {
            for i in 0..n {
                for j in i + 1..n {
                    insert(i, j);
                }
            }
        }
        TopologyFamily::RandomGeometric { radius } => {
            let mut rng = StdRng::seed_from_u64(rng_seed);
            let points = (0..n)
                .map(|_| (rng.gen::<f64>(), rng.gen::<f64>()))
                .collect::<Vec<_>>();
            for i in 0..n {
                for j in i + 1..n {
                    let dx = points[i].0 - points[j].0;
                    let dy = points[i].1 - points[j].1;
                    if dx * dx + dy * dy <= radius * radius {
                        insert(i, j);
                    }
                }
            }
        }
        TopologyFamily::Binomial { edge_prob } => {
            let mut rng = StdRng::seed_from_u64(rng_seed);
            for i in 0..n {
                for j in i + 1..n {
                    if rng.gen_bool(edge_prob) {
                        insert(i, j);
                    }
                }
            }
        }
        TopologyFamily::ExpectedDegree { ref degrees } => {
            let mut rng = StdRng::seed_from_u64(rng_seed);
            let total: f64 = degrees.iter().sum();
            for i in 0..n {
                for j in i + 1..n {
                    let p = (degrees[i] * degrees[j] / total).min(1.0);
                    if rng.gen_bool(p) {
                        insert(i, j);
                    }
                }
            }
        }
    }
    RawTopology {
        nr_switches,
        nr_es_per_switch,
        switch_edges: edges.into_iter().collect(),
    }
}

/// Checks connectivity and the family's structural contract on a raw switch graph. End-system
/// attachment cannot affect any of these properties, so it is not considered here.
fn check_raw(raw: &RawTopology, family: &TopologyFamily) -> Result<(), StructuralViolation> {
    let n = raw.nr_switches;
    let edges = &raw.switch_edges;

    let mut uf = UnionFind::<usize>::new(n);
    for &(a, b) in edges {
        uf.union(a, b);
    }
    let nr_components = (0..n).map(|i| uf.find(i)).collect::<BTreeSet<_>>().len();
    if nr_components > 1 {
        return Err(StructuralViolation::Disconnected { nr_components });
    }

    let mut degrees = vec![0usize; n];
    for &(a, b) in edges {
        degrees[a] += 1;
        degrees[b] += 1;
    }
    match family {
        TopologyFamily::Ring => {
            let expected = match n {
                1 => 0,
                2 => 1,
                _ => n,
            };
            check_edge_count(expected, edges.len())?;
            if n >= 3 {
                check_degrees(&degrees, |d| d == 2)?;
            }
        }
        TopologyFamily::Chain => {
            check_edge_count(n - 1, edges.len())?;
            check_degrees(&degrees, |d| d <= 2)?;
        }
        TopologyFamily::Mesh => {
            check_edge_count(n * (n - 1) / 2, edges.len())?;
        }
        // Stochastic families promise connectivity only.
        TopologyFamily::RandomGeometric { .. }
        | TopologyFamily::Binomial { .. }
        | TopologyFamily::ExpectedDegree { .. } => {}
    }
    Ok(())
}

fn check_edge_count(expected: usize, got: usize) -> Result<(), StructuralViolation> {
    if expected != got {
        return Err(StructuralViolation::WrongEdgeCount { expected, got });
    }
    Ok(())
}

fn check_degrees(
    degrees: &[usize],
    ok: impl Fn(usize) -> bool,
) -> Result<(), StructuralViolation> {
    for (switch, &d) in degrees.iter().enumerate() {
        if !ok(d) {
            return Err(StructuralViolation::WrongDegree { switch, got: d });
        }
    }
    Ok(())
}

/// Turns a checked raw topology into identified nodes and links.
///
/// The numbering is a pure function of the raw topology: switches take IDs `0..S` in ordinal
/// order, end system `k` of switch `s` takes ID `S + s * E + k`, and links are numbered with the
/// switch-to-switch edges first (in raw edge order) followed by the end-system up-links grouped
/// by switch. Each link endpoint takes the next free port on its node, so an end system's single
/// up-link is always its port 0.
pub(crate) fn materialize(raw: &RawTopology) -> (Vec<Node>, Vec<Link>) {
    let nr_s = raw.nr_switches;
    let nr_es = raw.nr_es_per_switch;

    let switches = (0..nr_s).map(|i| Node::new_switch(NodeId::new(i)));
    let end_systems =
        (0..nr_s * nr_es).map(|i| Node::new_end_system(NodeId::new(nr_s + i)));
    let nodes = switches.chain(end_systems).collect::<Vec<_>>();

    let mut next_port = vec![0usize; nodes.len()];
    let mut links = Vec::with_capacity(raw.switch_edges.len() + nr_s * nr_es);
    let mut connect = |links: &mut Vec<Link>, a: NodeId, b: NodeId| {
        let a_port = next_port[a.inner()];
        next_port[a.inner()] += 1;
        let b_port = next_port[b.inner()];
        next_port[b.inner()] += 1;
        links.push(Link::new(LinkId::new(links.len()), a, b, a_port, b_port));
    };
    for &(i, j) in &raw.switch_edges {
        connect(&mut links, NodeId::new(i), NodeId::new(j));
    }
    for s in 0..nr_s {
        for k in 0..nr_es {
            let es = NodeId::new(nr_s + s * nr_es + k);
            connect(&mut links, NodeId::new(s), es);
        }
    }
    (nodes, links)
}

/// Malformed or out-of-range generation parameters. Fatal and surfaced immediately, with no
/// retry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidParameterError {
    #[error("switch count must be at least 1 (got {got})")]
    SwitchCount { got: usize },

    #[error("random-geometric radius must be positive and finite (got {got})")]
    Radius { got: f64 },

    #[error("binomial edge probability must be within [0, 1] (got {got})")]
    EdgeProbability { got: f64 },

    #[error("expected-degree sequence must have one entry per switch (expected {expected}, got {got})")]
    DegreeSequenceLength { expected: usize, got: usize },

    #[error("expected degree of switch {switch} must be non-negative and finite (got {got})")]
    Degree { switch: usize, got: f64 },

    #[error("expected-degree sequence must have a positive sum")]
    DegreeSum,
}

/// A generated graph failed its family's structural invariants, after bounded regeneration for
/// stochastic families. Carries the failing family and seed for reproducibility.
#[derive(Debug, thiserror::Error)]
#[error("{family} topology failed validation after {attempts} attempt(s) (seed {seed}): {violation}")]
pub struct ConnectivityError {
    /// The family that failed.
    pub family: &'static str,
    /// The base seed of the failing run.
    pub seed: u64,
    /// How many generation attempts were made.
    pub attempts: usize,
    /// The invariant that failed.
    pub violation: StructuralViolation,
}

/// A single failed structural invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StructuralViolation {
    #[error("switch graph has {nr_components} components (expected 1)")]
    Disconnected { nr_components: usize },

    #[error("wrong edge count (expected {expected}, got {got})")]
    WrongEdgeCount { expected: usize, got: usize },

    #[error("switch {switch} has out-of-contract degree {got}")]
    WrongDegree { switch: usize, got: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edges(family: &TopologyFamily, n: usize, seed: u64) -> Vec<(usize, usize)> {
        build_validated(family, n, 0, seed).unwrap().switch_edges
    }

    #[test]
    fn ring_sizes() {
        assert!(edges(&TopologyFamily::Ring, 1, 0).is_empty());
        assert_eq!(edges(&TopologyFamily::Ring, 2, 0), [(0, 1)]);
        let five = edges(&TopologyFamily::Ring, 5, 0);
        assert_eq!(five.len(), 5);
        let mut degrees = [0usize; 5];
        for &(a, b) in &five {
            degrees[a] += 1;
            degrees[b] += 1;
        }
        assert!(degrees.iter().all(|&d| d == 2));
    }

    #[test]
    fn chain_is_a_path() {
        assert_eq!(
            edges(&TopologyFamily::Chain, 4, 0),
            [(0, 1), (1, 2), (2, 3)]
        );
        assert!(edges(&TopologyFamily::Chain, 1, 0).is_empty());
    }

    #[test]
    fn mesh_is_complete() {
        assert_eq!(edges(&TopologyFamily::Mesh, 5, 0).len(), 10);
    }

    #[test]
    fn binomial_with_certain_edges_is_complete() {
        assert_eq!(
            edges(&TopologyFamily::Binomial { edge_prob: 1.0 }, 6, 7).len(),
            15
        );
    }

    #[test]
    fn binomial_without_edges_fails_connectivity() {
        let res = build_validated(&TopologyFamily::Binomial { edge_prob: 0.0 }, 4, 0, 7);
        let err = res.unwrap_err();
        assert_eq!(err.attempts, MAX_BUILD_ATTEMPTS);
        assert!(matches!(
            err.violation,
            StructuralViolation::Disconnected { nr_components: 4 }
        ));
    }

    #[test]
    fn geometric_with_covering_radius_is_complete() {
        // sqrt(2) covers the whole unit square.
        let family = TopologyFamily::RandomGeometric { radius: 1.5 };
        assert_eq!(edges(&family, 4, 3).len(), 6);
    }

    #[test]
    fn expected_degree_saturates_to_complete() {
        // With every weight equal to n, every pair probability is exactly 1.
        let family = TopologyFamily::ExpectedDegree {
            degrees: vec![4.0; 4],
        };
        assert_eq!(edges(&family, 4, 11).len(), 6);
    }

    #[test]
    fn stochastic_families_reproduce_under_a_seed() {
        let family = TopologyFamily::Binomial { edge_prob: 0.5 };
        let a = edges(&family, 12, 42);
        let b = edges(&family, 12, 42);
        assert_eq!(a, b);
    }

    #[test]
    fn switch_count_zero_is_rejected() {
        let res = TopologyFamily::Ring.validate_params(0);
        assert!(matches!(
            res,
            Err(InvalidParameterError::SwitchCount { got: 0 })
        ));
    }

    #[test]
    fn bad_family_params_are_rejected() {
        let cases = [
            TopologyFamily::RandomGeometric { radius: 0.0 },
            TopologyFamily::RandomGeometric { radius: f64::NAN },
            TopologyFamily::Binomial { edge_prob: 1.5 },
            TopologyFamily::Binomial {
                edge_prob: f64::NAN,
            },
            TopologyFamily::ExpectedDegree {
                degrees: vec![1.0; 3],
            },
            TopologyFamily::ExpectedDegree {
                degrees: vec![1.0, -1.0, 1.0, 1.0],
            },
            TopologyFamily::ExpectedDegree {
                degrees: vec![0.0; 4],
            },
        ];
        for family in &cases {
            assert!(family.validate_params(4).is_err(), "{family:?}");
        }
    }

    #[test]
    fn materialize_numbers_switches_then_end_systems_then_links() {
        let raw = build_validated(&TopologyFamily::Chain, 2, 2, 0).unwrap();
        let (nodes, links) = materialize(&raw);
        assert_eq!(nodes.len(), 6);
        assert!(nodes[..2].iter().all(|n| n.is_switch()));
        assert!(nodes[2..].iter().all(|n| n.is_end_system()));
        assert_eq!(
            links
                .iter()
                .map(|l| (l.id.inner(), l.a.inner(), l.b.inner()))
                .collect::<Vec<_>>(),
            [(0, 0, 1), (1, 0, 2), (2, 0, 3), (3, 1, 4), (4, 1, 5)]
        );
        // Ports are dense per node, and an end system's up-link is its port 0.
        assert_eq!(links[0].a_port, 0);
        assert_eq!(links[1].a_port, 1);
        assert_eq!(links[2].a_port, 2);
        assert!(links[1..].iter().all(|l| l.b_port == 0));
    }

    #[test]
    fn materialize_is_pure() {
        let raw = build_validated(&TopologyFamily::Ring, 5, 3, 9).unwrap();
        assert_eq!(materialize(&raw), materialize(&raw));
    }
}
