//! `tsngen` synthesizes Time-Sensitive-Networking test scenarios: given a topology family, size
//! parameters, and a traffic type registry, it builds a validated switch/end-system network with
//! stable identifiers, draws reproducible traffic streams, resolves deterministic routes, and
//! renders everything into the NED and INI files a discrete-event simulator consumes.

#![warn(unreachable_pub, missing_docs)]

pub mod core;
pub mod frontend;
