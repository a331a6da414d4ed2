//! Simulator file-format frontends. Currently the OMNeT++-style NED/INI renderer.

pub use omnet_frontend::*;
