//! Classification of map positions into building categories.

use std::collections::{BTreeMap, HashMap};

use outbreak_core::{BuildingKind, MapAdapter, Position};

/// Registry mapping each building category to its positions.
///
/// Built once from the map adapter at setup. A position listed under several
/// categories is classified by the first one in [`BuildingKind::ALL`] order.
#[derive(Clone, Debug, Default)]
pub struct BuildingRegistry {
    positions: BTreeMap<BuildingKind, Vec<Position>>,
    kinds: HashMap<Position, BuildingKind>,
}

impl BuildingRegistry {
    /// Collects every category's positions from the map adapter.
    #[must_use]
    pub fn from_map<M>(map: &M) -> Self
    where
        M: MapAdapter + ?Sized,
    {
        Self::from_positions(
            BuildingKind::ALL
                .into_iter()
                .map(|kind| (kind, map.positions_for_category(kind))),
        )
    }

    /// Builds a registry from explicit category lists.
    #[must_use]
    pub fn from_positions<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (BuildingKind, Vec<Position>)>,
    {
        let mut registry = Self::default();
        for (kind, positions) in entries {
            for &position in &positions {
                let _ = registry.kinds.entry(position).or_insert(kind);
            }
            registry.positions.entry(kind).or_default().extend(positions);
        }
        registry
    }

    /// Positions registered for the category, in map order.
    #[must_use]
    pub fn positions(&self, kind: BuildingKind) -> &[Position] {
        self.positions
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Category the position belongs to, if any.
    #[must_use]
    pub fn kind_at(&self, position: Position) -> Option<BuildingKind> {
        self.kinds.get(&position).copied()
    }

    /// Reports whether the position is classified as `kind`.
    #[must_use]
    pub fn is_kind(&self, position: Position, kind: BuildingKind) -> bool {
        self.kind_at(position) == Some(kind)
    }

    /// Number of classified positions across every category.
    #[must_use]
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Reports whether no position is classified.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
