//! This module is responsible for loading the static road network
//! description (CSV node/segment tables) and building the routing model.

mod builder;
mod parser;
mod raw_types;

pub use builder::{build_network, load_network};
