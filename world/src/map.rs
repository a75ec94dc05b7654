//! In-memory tile map implementing the map adapter contract.
//!
//! Layouts are written as ASCII art, one character per cell:
//!
//! | glyph | tile |
//! |---|---|
//! | `.` | grass (not walkable) |
//! | `#` | road |
//! | `H` | house |
//! | `S` | shop |
//! | `L` | library |
//! | `F` | fast food |
//! | `+` | hospital |

use std::fmt;

use outbreak_core::{BuildingKind, MapAdapter, Position, SimulationError};
use thiserror::Error;

use crate::grid::cell_index;

/// Small town used by the command-line adapter when no map is provided.
pub const DEMO_TOWN: &str = "\
HH.HH.HH..SS..LL..++
####################
#.HH.#.FF.#..SS.#.HH
#....#....#.....#...
####################
HH..HH.+..LL..HH..FF
####################
";

/// Terrain stored for a single map cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tile {
    /// Open ground agents cannot cross.
    Grass,
    /// Walkable connector between buildings.
    Road,
    /// Walkable building of the given category.
    Building(BuildingKind),
}

impl Tile {
    /// Reports whether agents may stand on the tile.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        !matches!(self, Self::Grass)
    }

    /// Parses a layout glyph.
    #[must_use]
    pub const fn from_glyph(glyph: char) -> Option<Self> {
        match glyph {
            '.' => Some(Self::Grass),
            '#' => Some(Self::Road),
            'H' => Some(Self::Building(BuildingKind::House)),
            'S' => Some(Self::Building(BuildingKind::Shop)),
            'L' => Some(Self::Building(BuildingKind::Library)),
            'F' => Some(Self::Building(BuildingKind::FastFood)),
            '+' => Some(Self::Building(BuildingKind::Hospital)),
            _ => None,
        }
    }

    /// Layout glyph representing the tile.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::Grass => '.',
            Self::Road => '#',
            Self::Building(BuildingKind::House) => 'H',
            Self::Building(BuildingKind::Shop) => 'S',
            Self::Building(BuildingKind::Library) => 'L',
            Self::Building(BuildingKind::FastFood) => 'F',
            Self::Building(BuildingKind::Hospital) => '+',
        }
    }
}

/// Dense row-major tile map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileMap {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
}

impl TileMap {
    /// Creates a map with every cell set to `tile`.
    #[must_use]
    pub fn filled(width: u32, height: u32, tile: Tile) -> Self {
        let capacity = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0);
        Self {
            width,
            height,
            tiles: vec![tile; capacity],
        }
    }

    /// Parses an ASCII layout. Blank lines and trailing whitespace are ignored.
    pub fn parse(layout: &str) -> Result<Self, MapError> {
        let rows: Vec<&str> = layout
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .collect();
        let Some(first) = rows.first() else {
            return Err(MapError::Empty);
        };

        let width = first.chars().count();
        let mut tiles = Vec::with_capacity(width * rows.len());
        for (y, row) in rows.iter().enumerate() {
            let found = row.chars().count();
            if found != width {
                return Err(MapError::RaggedRow {
                    row: y,
                    expected: width,
                    found,
                });
            }
            for (x, glyph) in row.chars().enumerate() {
                let tile = Tile::from_glyph(glyph).ok_or(MapError::UnknownGlyph { glyph, x, y })?;
                tiles.push(tile);
            }
        }

        Ok(Self {
            width: u32::try_from(width).map_err(|_| MapError::TooLarge)?,
            height: u32::try_from(rows.len()).map_err(|_| MapError::TooLarge)?,
            tiles,
        })
    }

    /// Tile stored at the position, if it lies within the map.
    #[must_use]
    pub fn tile(&self, position: Position) -> Option<Tile> {
        cell_index(position, self.width, self.height).and_then(|index| self.tiles.get(index).copied())
    }

    /// Replaces the tile at the position.
    pub fn set(&mut self, position: Position, tile: Tile) -> Result<(), SimulationError> {
        let slot = cell_index(position, self.width, self.height)
            .and_then(|index| self.tiles.get_mut(index))
            .ok_or(SimulationError::OutOfBounds {
                position,
                width: self.width,
                height: self.height,
            })?;
        *slot = tile;
        Ok(())
    }

    fn positions(&self) -> impl Iterator<Item = (Position, Tile)> + '_ {
        let width = self.width.max(1);
        (0u32..).zip(self.tiles.iter().copied()).map(move |(index, tile)| {
            (Position::new(index % width, index / width), tile)
        })
    }
}

impl MapAdapter for TileMap {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn is_walkable(&self, position: Position) -> bool {
        self.tile(position).is_some_and(Tile::is_walkable)
    }

    fn positions_for_category(&self, category: BuildingKind) -> Vec<Position> {
        self.positions()
            .filter(|(_, tile)| *tile == Tile::Building(category))
            .map(|(position, _)| position)
            .collect()
    }
}

impl fmt::Display for TileMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.height {
            for x in 0..self.width {
                let glyph = self.tile(Position::new(x, y)).map_or(' ', Tile::glyph);
                write!(f, "{glyph}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Errors that can occur while parsing an ASCII layout.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MapError {
    /// The layout contained no rows.
    #[error("map layout is empty")]
    Empty,
    /// A row differs in length from the first row.
    #[error("row {row} has {found} cells but the first row has {expected}")]
    RaggedRow {
        /// Zero-based row index.
        row: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of the offending row.
        found: usize,
    },
    /// A character is not part of the legend.
    #[error("unknown map glyph `{glyph}` at ({x}, {y})")]
    UnknownGlyph {
        /// Offending character.
        glyph: char,
        /// Zero-based column.
        x: usize,
        /// Zero-based row.
        y: usize,
    },
    /// The layout does not fit in 32-bit coordinates.
    #[error("map layout exceeds the supported dimensions")]
    TooLarge,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{navigation::PathFinder, BuildingRegistry};

    #[test]
    fn parse_reads_dimensions_and_categories() {
        let map = TileMap::parse("H#S\n.#+\n").expect("valid layout");

        assert_eq!(map.dimensions(), (3, 2));
        assert_eq!(
            map.positions_for_category(BuildingKind::House),
            vec![Position::new(0, 0)]
        );
        assert_eq!(
            map.positions_for_category(BuildingKind::Hospital),
            vec![Position::new(2, 1)]
        );
        assert!(map.is_walkable(Position::new(1, 1)));
        assert!(!map.is_walkable(Position::new(0, 1)));
        assert!(!map.is_walkable(Position::new(3, 0)));
    }

    #[test]
    fn parse_rejects_ragged_rows() {
        assert_eq!(
            TileMap::parse("HH\nH\n"),
            Err(MapError::RaggedRow {
                row: 1,
                expected: 2,
                found: 1,
            })
        );
    }

    #[test]
    fn parse_rejects_unknown_glyphs() {
        assert_eq!(
            TileMap::parse("H?\n"),
            Err(MapError::UnknownGlyph {
                glyph: '?',
                x: 1,
                y: 0,
            })
        );
        assert_eq!(TileMap::parse("\n\n"), Err(MapError::Empty));
    }

    #[test]
    fn display_round_trips_layout() {
        let map = TileMap::parse(DEMO_TOWN).expect("demo town parses");
        assert_eq!(map.to_string(), DEMO_TOWN);
    }

    #[test]
    fn demo_town_buildings_are_mutually_reachable() {
        let map = TileMap::parse(DEMO_TOWN).expect("demo town parses");
        let registry = BuildingRegistry::from_map(&map);
        let finder = PathFinder::for_map(&map);

        for kind in BuildingKind::ALL {
            assert!(
                !registry.positions(kind).is_empty(),
                "demo town lacks {kind:?}"
            );
        }

        let origin = registry.positions(BuildingKind::House)[0];
        for kind in BuildingKind::ALL {
            for &target in registry.positions(kind) {
                if target == origin {
                    continue;
                }
                assert!(
                    !finder.find(&map, origin, target).is_empty(),
                    "{target} unreachable from {origin}"
                );
            }
        }
    }

    #[test]
    fn set_replaces_tiles_within_bounds() {
        let mut map = TileMap::filled(2, 2, Tile::Road);
        map.set(Position::new(1, 1), Tile::Building(BuildingKind::Hospital))
            .expect("in bounds");
        assert_eq!(
            map.positions_for_category(BuildingKind::Hospital),
            vec![Position::new(1, 1)]
        );
        assert!(map.set(Position::new(2, 0), Tile::Grass).is_err());
    }
}
