//! Bounded multi-occupancy grid with named scalar property layers.

use std::collections::{BTreeMap, HashMap};

use outbreak_core::{AgentId, Connectivity, FieldView, Position, SimulationError};

const MOORE_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

// North, East, South, West.
const VON_NEUMANN_OFFSETS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// Dense scalar field storing one value per grid cell in row-major order.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyLayer {
    width: u32,
    height: u32,
    values: Vec<f64>,
}

impl PropertyLayer {
    /// Creates a layer with every cell set to `initial`.
    #[must_use]
    pub fn new(width: u32, height: u32, initial: f64) -> Self {
        let capacity = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0);
        Self {
            width,
            height,
            values: vec![initial; capacity],
        }
    }

    /// Value stored for the cell, if it lies within the layer.
    #[must_use]
    pub fn get(&self, position: Position) -> Option<f64> {
        self.index(position)
            .and_then(|index| self.values.get(index).copied())
    }

    /// Overwrites the value stored for the cell.
    pub fn set(&mut self, position: Position, value: f64) -> Result<(), SimulationError> {
        let slot = self.slot_mut(position)?;
        *slot = value;
        Ok(())
    }

    /// Adds `amount` to the cell and returns the updated value.
    pub fn add(&mut self, position: Position, amount: f64) -> Result<f64, SimulationError> {
        let slot = self.slot_mut(position)?;
        *slot += amount;
        Ok(*slot)
    }

    /// Replaces every value with the result of `update`.
    pub fn modify_all<F>(&mut self, mut update: F)
    where
        F: FnMut(f64) -> f64,
    {
        for value in &mut self.values {
            *value = update(*value);
        }
    }

    /// Sum of every value in the layer.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Dense values stored in row-major order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Captures a read-only view of the layer for observers.
    #[must_use]
    pub fn view(&self) -> FieldView<'_> {
        FieldView::new(&self.values, self.width, self.height)
    }

    fn slot_mut(&mut self, position: Position) -> Result<&mut f64, SimulationError> {
        let (width, height) = (self.width, self.height);
        self.index(position)
            .and_then(|index| self.values.get_mut(index))
            .ok_or(SimulationError::OutOfBounds {
                position,
                width,
                height,
            })
    }

    fn index(&self, position: Position) -> Option<usize> {
        cell_index(position, self.width, self.height)
    }
}

/// Authoritative occupancy index and property layers of the simulated map.
///
/// Several agents may share a cell. The grid only tracks which identifiers sit
/// where; the orchestrator owns the agents themselves.
#[derive(Clone, Debug)]
pub struct Grid {
    width: u32,
    height: u32,
    cells: Vec<Vec<AgentId>>,
    locations: HashMap<AgentId, Position>,
    layers: BTreeMap<String, PropertyLayer>,
}

impl Grid {
    /// Creates an empty grid with the provided dimensions.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let capacity = usize::try_from(u64::from(width) * u64::from(height)).unwrap_or(0);
        Self {
            width,
            height,
            cells: vec![Vec::new(); capacity],
            locations: HashMap::new(),
            layers: BTreeMap::new(),
        }
    }

    /// Provides the width and height of the grid in cells.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Reports whether the position lies within the grid.
    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        position.x() < self.width && position.y() < self.height
    }

    /// Inserts the agent into the occupancy set of `position`.
    pub fn place(&mut self, agent: AgentId, position: Position) -> Result<(), SimulationError> {
        let index = self.checked_index(position)?;
        if self.locations.contains_key(&agent) {
            return Err(SimulationError::AgentAlreadyPlaced(agent));
        }

        self.cells[index].push(agent);
        let _ = self.locations.insert(agent, position);
        Ok(())
    }

    /// Moves the agent from its current cell into `position`.
    ///
    /// Walkability is not checked here; callers validate targets through the
    /// map adapter or the path finder.
    pub fn move_agent(&mut self, agent: AgentId, position: Position) -> Result<(), SimulationError> {
        let target = self.checked_index(position)?;
        let from = self
            .locations
            .get(&agent)
            .copied()
            .ok_or(SimulationError::AgentNotPlaced(agent))?;
        if from == position {
            return Ok(());
        }

        if let Some(source) = cell_index(from, self.width, self.height) {
            self.cells[source].retain(|occupant| *occupant != agent);
        }
        self.cells[target].push(agent);
        let _ = self.locations.insert(agent, position);
        Ok(())
    }

    /// Drops the agent from the occupancy index, returning its last cell.
    pub fn remove(&mut self, agent: AgentId) -> Result<Position, SimulationError> {
        let position = self
            .locations
            .remove(&agent)
            .ok_or(SimulationError::AgentNotPlaced(agent))?;
        if let Some(index) = cell_index(position, self.width, self.height) {
            self.cells[index].retain(|occupant| *occupant != agent);
        }
        Ok(position)
    }

    /// Cell currently occupied by the agent.
    #[must_use]
    pub fn position_of(&self, agent: AgentId) -> Option<Position> {
        self.locations.get(&agent).copied()
    }

    /// Agents occupying the cell in arrival order.
    #[must_use]
    pub fn occupants(&self, position: Position) -> &[AgentId] {
        cell_index(position, self.width, self.height)
            .and_then(|index| self.cells.get(index))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of agents present in the occupancy index.
    #[must_use]
    pub fn agent_count(&self) -> usize {
        self.locations.len()
    }

    /// Enumerates in-bounds neighbors of `position`.
    ///
    /// The cell itself is only included when `include_center` is set, in which
    /// case it comes first.
    #[must_use]
    pub fn neighbors(
        &self,
        position: Position,
        connectivity: Connectivity,
        include_center: bool,
    ) -> Vec<Position> {
        neighbor_positions(position, self.width, self.height, connectivity, include_center)
    }

    /// Adds a layer filled with `initial`, keeping any existing layer of that name.
    pub fn add_layer(&mut self, name: impl Into<String>, initial: f64) -> &mut PropertyLayer {
        let (width, height) = (self.width, self.height);
        self.layers
            .entry(name.into())
            .or_insert_with(|| PropertyLayer::new(width, height, initial))
    }

    /// Looks up a property layer by name.
    pub fn layer(&self, name: &str) -> Result<&PropertyLayer, SimulationError> {
        self.layers
            .get(name)
            .ok_or_else(|| SimulationError::UnknownLayer(name.to_owned()))
    }

    /// Looks up a property layer by name for mutation.
    pub fn layer_mut(&mut self, name: &str) -> Result<&mut PropertyLayer, SimulationError> {
        self.layers
            .get_mut(name)
            .ok_or_else(|| SimulationError::UnknownLayer(name.to_owned()))
    }

    /// Reads a single cell of a named layer.
    pub fn get_cell(&self, name: &str, position: Position) -> Result<f64, SimulationError> {
        let layer = self.layer(name)?;
        layer.get(position).ok_or(self.out_of_bounds(position))
    }

    /// Writes a single cell of a named layer. Values are stored unclamped.
    pub fn set_cell(
        &mut self,
        name: &str,
        position: Position,
        value: f64,
    ) -> Result<(), SimulationError> {
        self.layer_mut(name)?.set(position, value)
    }

    fn checked_index(&self, position: Position) -> Result<usize, SimulationError> {
        cell_index(position, self.width, self.height).ok_or(self.out_of_bounds(position))
    }

    fn out_of_bounds(&self, position: Position) -> SimulationError {
        SimulationError::OutOfBounds {
            position,
            width: self.width,
            height: self.height,
        }
    }
}

pub(crate) fn neighbor_positions(
    position: Position,
    width: u32,
    height: u32,
    connectivity: Connectivity,
    include_center: bool,
) -> Vec<Position> {
    let offsets: &[(i32, i32)] = match connectivity {
        Connectivity::Moore => &MOORE_OFFSETS,
        Connectivity::VonNeumann => &VON_NEUMANN_OFFSETS,
    };

    let mut neighbors = Vec::with_capacity(offsets.len() + 1);
    if include_center && position.x() < width && position.y() < height {
        neighbors.push(position);
    }

    for &(dx, dy) in offsets {
        let Some(x) = position.x().checked_add_signed(dx) else {
            continue;
        };
        let Some(y) = position.y().checked_add_signed(dy) else {
            continue;
        };
        if x < width && y < height {
            neighbors.push(Position::new(x, y));
        }
    }

    neighbors
}

pub(crate) fn cell_index(position: Position, width: u32, height: u32) -> Option<usize> {
    if position.x() >= width || position.y() >= height {
        return None;
    }
    let x = usize::try_from(position.x()).ok()?;
    let y = usize::try_from(position.y()).ok()?;
    let width = usize::try_from(width).ok()?;
    y.checked_mul(width)?.checked_add(x)
}
