//! This module defines generation specifications ([`ScenarioSpec`]): which topology family to
//! build at what size, the traffic type registry, and the seed. [`run`](crate::run::run) turns a
//! specification into a [`Scenario`](crate::run::Scenario).

use rustc_hash::FxHashSet;

use crate::network::builder::{InvalidParameterError, TopologyFamily};
use crate::traffic::TrafficType;

/// A generation specification.
#[derive(Debug, Clone, PartialEq, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize)]
pub struct ScenarioSpec {
    /// Topology family and size.
    pub topology: TopologySpec,
    /// Traffic type registry.
    pub traffic: Vec<TrafficType>,
    /// Base seed for every stochastic draw in the run.
    #[builder(default)]
    #[serde(default)]
    pub seed: u64,
}

/// Topology family selection and size parameters.
#[derive(Debug, Clone, PartialEq, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize)]
pub struct TopologySpec {
    /// Generator family.
    pub family: TopologyFamily,
    /// Number of switches (at least 1).
    pub nr_switches: usize,
    /// End systems attached to every switch.
    #[builder(default)]
    #[serde(default)]
    pub nr_es_per_switch: usize,
}

impl ScenarioSpec {
    /// Validate a specification, producing a `ValidScenarioSpec`.
    ///
    /// Correctness properties:
    ///
    /// - The family's size and shape parameters must be in range.
    /// - Traffic type names must be unique.
    /// - Every traffic type must have period candidates and ordered size/deadline bounds.
    pub(crate) fn validate(self) -> Result<ValidScenarioSpec, SpecError> {
        self.topology
            .family
            .validate_params(self.topology.nr_switches)?;
        let mut names = FxHashSet::default();
        for ty in &self.traffic {
            // CORRECTNESS: Traffic type names must be unique.
            if !names.insert(ty.name.as_str()) {
                return Err(SpecError::DuplicateTrafficType {
                    name: ty.name.clone(),
                });
            }
            if ty.periods.is_empty() {
                return Err(SpecError::NoPeriods {
                    name: ty.name.clone(),
                });
            }
            if ty.size.0 > ty.size.1 {
                return Err(SpecError::SizeBounds {
                    name: ty.name.clone(),
                });
            }
            if ty.deadline.0 > ty.deadline.1 {
                return Err(SpecError::DeadlineBounds {
                    name: ty.name.clone(),
                });
            }
        }
        Ok(ValidScenarioSpec {
            topology: self.topology,
            traffic: self.traffic,
            seed: self.seed,
        })
    }
}

/// A `ValidScenarioSpec` is a `ScenarioSpec` whose parameters satisfy the properties listed in
/// `ScenarioSpec::validate()`.
#[derive(Debug)]
pub(crate) struct ValidScenarioSpec {
    pub(crate) topology: TopologySpec,
    pub(crate) traffic: Vec<TrafficType>,
    pub(crate) seed: u64,
}

/// Generation specification error.
#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    /// The topology parameters are out of range.
    #[error(transparent)]
    InvalidParameter(#[from] InvalidParameterError),

    /// Two traffic types share a name.
    #[error("duplicate traffic type \"{name}\"")]
    DuplicateTrafficType {
        /// The repeated name.
        name: String,
    },

    /// A traffic type has no period candidates.
    #[error("traffic type \"{name}\" has no period candidates")]
    NoPeriods {
        /// The offending type.
        name: String,
    },

    /// A traffic type's size bounds are reversed.
    #[error("traffic type \"{name}\" has size bounds with min > max")]
    SizeBounds {
        /// The offending type.
        name: String,
    },

    /// A traffic type's deadline bounds are reversed.
    #[error("traffic type \"{name}\" has deadline bounds with min > max")]
    DeadlineBounds {
        /// The offending type.
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use crate::units::{Bytes, Microsecs};

    #[test]
    fn valid_spec_succeeds() {
        assert!(testing::chain_spec(4, 2).validate().is_ok());
    }

    #[test]
    fn zero_switches_fails() {
        let spec = testing::chain_spec(0, 2);
        assert!(matches!(
            spec.validate(),
            Err(SpecError::InvalidParameter(
                InvalidParameterError::SwitchCount { got: 0 }
            ))
        ));
    }

    #[test]
    fn duplicate_traffic_type_fails() {
        let mut spec = testing::chain_spec(4, 2);
        spec.traffic.push(testing::ats_type());
        assert!(matches!(
            spec.validate(),
            Err(SpecError::DuplicateTrafficType { .. })
        ));
    }

    #[test]
    fn empty_period_list_fails() {
        let mut spec = testing::chain_spec(4, 2);
        spec.traffic[0].periods.clear();
        assert!(matches!(spec.validate(), Err(SpecError::NoPeriods { .. })));
    }

    #[test]
    fn reversed_size_bounds_fails() {
        let mut spec = testing::chain_spec(4, 2);
        spec.traffic[0].size = (Bytes::new(100), Bytes::new(50));
        assert!(matches!(spec.validate(), Err(SpecError::SizeBounds { .. })));
    }

    #[test]
    fn reversed_deadline_bounds_fails() {
        let mut spec = testing::chain_spec(4, 2);
        spec.traffic[0].deadline = (Microsecs::new(100), Microsecs::new(50));
        assert!(matches!(
            spec.validate(),
            Err(SpecError::DeadlineBounds { .. })
        ));
    }
}
