#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Spatial state for the outbreak simulation.
//!
//! The grid tracks which agents stand on which cell and stores named scalar
//! layers. Around it sit the map representation, the building registry used
//! for destination lookups, the breadth-first path finder, and the virus
//! field that lives on one of the grid layers.

mod buildings;
mod field;
mod grid;
mod map;
mod navigation;

pub use buildings::BuildingRegistry;
pub use field::VirusField;
pub use grid::{Grid, PropertyLayer};
pub use map::{MapError, Tile, TileMap, DEMO_TOWN};
pub use navigation::PathFinder;
