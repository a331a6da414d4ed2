//! Traffic stream synthesis. For every end system and every configured traffic type, a fixed
//! number of streams is drawn with seeded, per-stream generators, so the result is a pure
//! function of the topology, the traffic configuration, and the seed.

use rand::prelude::*;
use rayon::prelude::*;

use crate::network::{Network, NodeId};
use crate::units::{Bytes, Microsecs};
use crate::utils;

/// A configured traffic type: how many streams each end system originates and the distributions
/// their attributes are drawn from.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TrafficType {
    /// Type name, e.g. "ats".
    pub name: String,
    /// Priority code point shared by every stream of this type.
    #[serde(default)]
    pub pcp: u8,
    /// Streams per end system.
    pub streams_per_es: usize,
    /// Period candidates; each stream picks one.
    pub periods: Vec<Microsecs>,
    /// Inclusive `[min, max]` frame size bounds.
    pub size: (Bytes, Bytes),
    /// Inclusive `[min, max]` deadline bounds.
    pub deadline: (Microsecs, Microsecs),
}

identifier!(StreamId, usize);

/// One synthesized unicast stream. The destination is an end system distinct from `src`, drawn by
/// the stream's own seeded generator.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Stream {
    pub id: StreamId,
    pub src: NodeId,
    pub dst: NodeId,
    /// Name of the traffic type this stream was drawn from.
    pub traffic_type: String,
    pub pcp: u8,
    pub period: Microsecs,
    pub size: Bytes,
    pub deadline: Microsecs,
}

/// Synthesizes all streams for a topology. Stream IDs are global and sequential in (end system,
/// type, ordinal) order. Every stream's draws come from its own generator seeded by
/// `(seed, src, type index, ordinal)`, so per-end-system synthesis can run in parallel without
/// affecting the result.
///
/// The draw order within a stream is fixed: period, size, deadline, destination. The deadline is
/// sampled independently of the period and size; no cross-field constraint is enforced, so a
/// deadline below the period is legal output.
pub(crate) fn synthesize(
    network: &Network,
    types: &[TrafficType],
    seed: u64,
) -> Result<Vec<Stream>, TrafficError> {
    let end_systems = network.end_systems().map(|n| n.id).collect::<Vec<_>>();
    let mut type_offsets = Vec::with_capacity(types.len());
    let mut streams_per_es = 0;
    for ty in types {
        type_offsets.push(streams_per_es);
        streams_per_es += ty.streams_per_es;
    }
    // A topology without end systems demands no streams; a single end system cannot satisfy a
    // unicast demand.
    if end_systems.len() == 1 && streams_per_es > 0 {
        let ty = types.iter().find(|t| t.streams_per_es > 0).unwrap();
        return Err(TrafficError::NoDestination {
            ty: ty.name.clone(),
            nr_end_systems: end_systems.len(),
        });
    }
    let streams = end_systems
        .par_iter()
        .enumerate()
        .flat_map_iter(|(pos, &src)| {
            let end_systems = &end_systems;
            let type_offsets = &type_offsets;
            types.iter().enumerate().flat_map(move |(ti, ty)| {
                (0..ty.streams_per_es).map(move |k| {
                    let id = StreamId::new(pos * streams_per_es + type_offsets[ti] + k);
                    let mut rng =
                        StdRng::seed_from_u64(utils::calculate_hash(&(seed, src, ti, k)));
                    draw_stream(&mut rng, id, src, pos, ty, end_systems)
                })
            })
        })
        .collect::<Vec<_>>();
    Ok(streams)
}

fn draw_stream(
    rng: &mut StdRng,
    id: StreamId,
    src: NodeId,
    src_pos: usize,
    ty: &TrafficType,
    end_systems: &[NodeId],
) -> Stream {
    let period = ty.periods[rng.gen_range(0..ty.periods.len())];
    let size = Bytes::new(rng.gen_range(ty.size.0.into_u64()..=ty.size.1.into_u64()));
    let deadline =
        Microsecs::new(rng.gen_range(ty.deadline.0.into_u64()..=ty.deadline.1.into_u64()));
    // Uniform draw over the other end systems: draw an index into the list with `src` removed,
    // then skip over `src`.
    let di = rng.gen_range(0..end_systems.len() - 1);
    let dst = end_systems[if di >= src_pos { di + 1 } else { di }];
    Stream {
        id,
        src,
        dst,
        traffic_type: ty.name.clone(),
        pcp: ty.pcp,
        period,
        size,
        deadline,
    }
}

/// Unsatisfiable traffic configuration for the generated topology.
#[derive(Debug, thiserror::Error)]
pub enum TrafficError {
    #[error("traffic type \"{ty}\" needs a destination, but the topology has {nr_end_systems} end system(s)")]
    NoDestination { ty: String, nr_end_systems: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn stream_count_and_ids_are_exact() -> anyhow::Result<()> {
        let network = testing::chain_network(3, 2)?;
        let mut ats = testing::ats_type();
        ats.streams_per_es = 2;
        let mut bulk = testing::ats_type();
        bulk.name = "bulk".into();
        bulk.pcp = 0;
        bulk.streams_per_es = 1;
        let streams = synthesize(&network, &[ats, bulk], 1)?;
        // 6 end systems x (2 + 1) streams.
        assert_eq!(streams.len(), 18);
        for (i, s) in streams.iter().enumerate() {
            assert_eq!(s.id, StreamId::new(i));
        }
        // Types cycle per end system: ats, ats, bulk.
        assert_eq!(streams[0].traffic_type, "ats");
        assert_eq!(streams[1].traffic_type, "ats");
        assert_eq!(streams[2].traffic_type, "bulk");
        assert_eq!(streams[2].pcp, 0);
        Ok(())
    }

    #[test]
    fn draws_respect_configured_bounds() -> anyhow::Result<()> {
        let network = testing::chain_network(4, 2)?;
        let ty = testing::ats_type();
        let streams = synthesize(&network, &[ty.clone()], 7)?;
        let end_systems = network.end_systems().map(|n| n.id).collect::<Vec<_>>();
        for s in &streams {
            assert!(ty.periods.contains(&s.period));
            assert!(s.size >= ty.size.0 && s.size <= ty.size.1);
            assert!(s.deadline >= ty.deadline.0 && s.deadline <= ty.deadline.1);
            assert!(end_systems.contains(&s.src));
            assert!(end_systems.contains(&s.dst));
            assert_ne!(s.src, s.dst);
            assert_eq!(s.pcp, ty.pcp);
        }
        Ok(())
    }

    #[test]
    fn synthesis_is_reproducible() -> anyhow::Result<()> {
        let network = testing::chain_network(4, 2)?;
        let types = [testing::ats_type()];
        let a = synthesize(&network, &types, 99)?;
        let b = synthesize(&network, &types, 99)?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn no_end_systems_yields_no_streams() -> anyhow::Result<()> {
        let network = testing::chain_network(2, 0)?;
        let streams = synthesize(&network, &[testing::ats_type()], 0)?;
        assert!(streams.is_empty());
        Ok(())
    }

    #[test]
    fn single_end_system_with_demand_fails() -> anyhow::Result<()> {
        let network = testing::chain_network(1, 1)?;
        let res = synthesize(&network, &[testing::ats_type()], 0);
        assert!(matches!(
            res,
            Err(TrafficError::NoDestination {
                nr_end_systems: 1,
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn zero_streams_per_es_is_legal_anywhere() -> anyhow::Result<()> {
        let network = testing::chain_network(1, 1)?;
        let mut ty = testing::ats_type();
        ty.streams_per_es = 0;
        let streams = synthesize(&network, &[ty], 0)?;
        assert!(streams.is_empty());
        Ok(())
    }
}
