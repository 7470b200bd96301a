#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]
pub mod build;
pub mod filter;
pub mod planarity;
pub mod types;

#[path = "../shared/config.rs"]
pub mod config;

#[path = "../correlate/mod.rs"]
pub mod correlate;

#[path = "../scans/mod.rs"]
pub mod scans;

#[path = "../atlas/mod.rs"]
pub mod atlas;

#[path = "../features/mod.rs"]
pub mod features;

pub use build::{GraphError, build_graph, build_graphs};
pub use filter::{FilterError, FilterPolicy, filter, filter_graphs};
pub use types::{Edge, Graph, RegionLabels};
