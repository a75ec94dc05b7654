#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Outbreak simulation.
//!
//! This crate defines the vocabulary that connects the authoritative grid,
//! the agent systems, the orchestrator, and the adapters. The orchestrator
//! advances the simulation one discrete step at a time and reports [`Event`]
//! values describing what happened; observers such as the data collector and
//! the renderer consume immutable snapshots between steps and never reach into
//! the simulation mid-step.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod config;

pub use config::{
    ConfigError, FieldTuning, IllnessTuning, PopulationTuning, ScheduleTuning, SimulationConfig,
};

/// Name of the property layer holding virus concentration values.
pub const VIRUS_LAYER: &str = "virus";

/// Location of a single grid cell expressed as `x` and `y` coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    x: u32,
    y: u32,
}

impl Position {
    /// Creates a new grid position.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column of the cell.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row of the cell.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Computes the Manhattan distance between two positions.
    #[must_use]
    pub fn manhattan_distance(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Unique identifier assigned to an agent for its whole lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Illness axis of the agent state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IllnessState {
    /// Healthy and able to catch the virus.
    Susceptible,
    /// Carrying the virus and shedding it into the field.
    Infected,
    /// Temporarily immune after recovering.
    Recovered,
    /// Inert for the rest of the run.
    Dead,
}

/// Movement sub-state of the agent state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementState {
    /// No destination; the agent draws a new action each step.
    Idle,
    /// A destination is set and the planned path is non-empty.
    Moving,
}

/// Coarse age bracket derived from an agent's age.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeGroup {
    /// Younger than 18.
    Child,
    /// From 18 up to 29.
    Young,
    /// From 30 up to 64.
    Adult,
    /// 65 and older.
    Elderly,
}

impl AgeGroup {
    /// Classifies an age in years.
    #[must_use]
    pub const fn from_age(age: u32) -> Self {
        if age < 18 {
            Self::Child
        } else if age < 30 {
            Self::Young
        } else if age < 65 {
            Self::Adult
        } else {
            Self::Elderly
        }
    }
}

/// How often an agent leaves its current location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    /// Leaves on 20% of idle steps.
    Low,
    /// Leaves on 50% of idle steps.
    Medium,
    /// Leaves on 80% of idle steps.
    High,
}

impl ActivityLevel {
    /// Every activity level in declaration order.
    pub const ALL: [ActivityLevel; 3] = [Self::Low, Self::Medium, Self::High];

    /// Relative weights of the `[StayInPlace, GoOut]` actions out of ten draws.
    #[must_use]
    pub const fn action_weights(self) -> [u32; 2] {
        match self {
            Self::Low => [8, 2],
            Self::Medium => [5, 5],
            Self::High => [2, 8],
        }
    }
}

impl FromStr for ActivityLevel {
    type Err = SimulationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(SimulationError::UnknownActivityLevel(value.to_owned())),
        }
    }
}

/// How strongly an agent keeps its distance from others.
///
/// Stored as a demographic attribute; it does not alter movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocialDistancing {
    /// No distancing.
    Off,
    /// Average distancing.
    Average,
    /// Normal distancing.
    Normal,
    /// Extreme distancing.
    Extreme,
}

impl SocialDistancing {
    /// Every distancing level in declaration order.
    pub const ALL: [SocialDistancing; 4] =
        [Self::Off, Self::Average, Self::Normal, Self::Extreme];
}

/// Decision drawn by an idle agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    /// Remain on the current cell.
    StayInPlace,
    /// Pick a destination and start walking there.
    GoOut,
}

impl Action {
    /// Actions in the slot order used by the activity weight tables.
    pub const ALL: [Action; 2] = [Self::StayInPlace, Self::GoOut];

    /// Resolves a weight-table slot back into an action.
    pub fn from_index(index: usize) -> Result<Self, SimulationError> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(SimulationError::UnknownAction(index))
    }
}

/// Category of building a map position belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildingKind {
    /// Residential building; every agent owns one as its home.
    House,
    /// Errand destination.
    Shop,
    /// Errand destination.
    Library,
    /// Errand destination.
    FastFood,
    /// Where infected agents go to recover.
    Hospital,
}

impl BuildingKind {
    /// Every building kind in declaration order.
    pub const ALL: [BuildingKind; 5] = [
        Self::House,
        Self::Shop,
        Self::Library,
        Self::FastFood,
        Self::Hospital,
    ];

    /// Categories a healthy agent at home picks from when going out.
    pub const ERRANDS: [BuildingKind; 3] = [Self::Shop, Self::Library, Self::FastFood];

    /// Name of the map layer carrying this category.
    #[must_use]
    pub const fn layer_name(self) -> &'static str {
        match self {
            Self::House => "houses",
            Self::Shop => "shop",
            Self::Library => "library",
            Self::FastFood => "fastfood",
            Self::Hospital => "hospital",
        }
    }
}

impl FromStr for BuildingKind {
    type Err = SimulationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "house" | "houses" => Ok(Self::House),
            "shop" => Ok(Self::Shop),
            "library" => Ok(Self::Library),
            "fastfood" | "fast_food" => Ok(Self::FastFood),
            "hospital" => Ok(Self::Hospital),
            _ => Err(SimulationError::UnknownBuildingKind(value.to_owned())),
        }
    }
}

/// Neighborhood shape used when enumerating adjacent cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Connectivity {
    /// Up to eight neighbors, diagonals included.
    Moore,
    /// Up to four orthogonal neighbors.
    VonNeumann,
}

/// Events reported by the orchestrator while advancing a step.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// The simulation clock advanced to the provided step.
    TimeAdvanced {
        /// Step index reached after the advance, starting at one.
        step: u64,
    },
    /// The one-time seeding event forced an agent into the infected state.
    PatientZeroSeeded {
        /// Agent chosen as patient zero.
        agent: AgentId,
        /// Cell the agent occupied when seeded.
        position: Position,
    },
    /// An idle agent chose a destination and planned a path to it.
    DestinationChosen {
        /// Agent that chose the destination.
        agent: AgentId,
        /// Category the destination was drawn from.
        kind: BuildingKind,
        /// Concrete cell the agent is heading to.
        destination: Position,
    },
    /// An agent advanced one cell along its planned path.
    AgentMoved {
        /// Agent that moved.
        agent: AgentId,
        /// Cell occupied before the move.
        from: Position,
        /// Cell occupied after the move.
        to: Position,
    },
    /// A susceptible agent caught the virus.
    AgentInfected {
        /// Agent that became infected.
        agent: AgentId,
        /// Cell where the infection happened.
        position: Position,
    },
    /// An infected agent recovered at a hospital.
    AgentRecovered {
        /// Agent that recovered.
        agent: AgentId,
        /// Whether the agent started wearing a face covering on recovery.
        adopted_face_cover: bool,
    },
    /// An infected agent died at a hospital.
    AgentDied {
        /// Agent that died.
        agent: AgentId,
        /// Cell the agent remains on.
        position: Position,
    },
    /// A recovered agent lost its immunity and became susceptible again.
    ImmunityWaned {
        /// Agent whose immunity expired.
        agent: AgentId,
    },
    /// The virus field decayed across every cell.
    FieldDecayed {
        /// Step on which the decay was applied.
        step: u64,
    },
}

/// Immutable representation of a single agent's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct AgentSnapshot {
    /// Unique identifier assigned to the agent.
    pub id: AgentId,
    /// Grid cell currently occupied by the agent.
    pub position: Position,
    /// Illness state of the agent.
    pub illness: IllnessState,
    /// Movement sub-state of the agent.
    pub movement: MovementState,
    /// Whether the agent wears a face covering.
    pub face_covered: bool,
}

/// Read-only snapshot describing every agent in the simulation.
#[derive(Clone, Debug, Default)]
pub struct AgentView {
    snapshots: Vec<AgentSnapshot>,
}

impl AgentView {
    /// Creates a new agent view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<AgentSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentSnapshot> {
        self.snapshots.iter()
    }

    /// Number of captured agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no agents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<AgentSnapshot> {
        self.snapshots
    }
}

/// Read-only view into a dense property layer.
#[derive(Clone, Copy, Debug)]
pub struct FieldView<'a> {
    values: &'a [f64],
    width: u32,
    height: u32,
}

impl<'a> FieldView<'a> {
    /// Captures a new view backed by the provided row-major values.
    #[must_use]
    pub fn new(values: &'a [f64], width: u32, height: u32) -> Self {
        Self {
            values,
            width,
            height,
        }
    }

    /// Value stored for the provided cell, if it lies within the layer.
    #[must_use]
    pub fn value(&self, position: Position) -> Option<f64> {
        if position.x() >= self.width || position.y() >= self.height {
            return None;
        }
        let width = usize::try_from(self.width).ok()?;
        let x = usize::try_from(position.x()).ok()?;
        let y = usize::try_from(position.y()).ok()?;
        self.values.get(y.checked_mul(width)?.checked_add(x)?).copied()
    }

    /// Largest value stored in the layer, or zero when empty.
    #[must_use]
    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }

    /// Row-major values backing the view.
    #[must_use]
    pub fn values(&self) -> &'a [f64] {
        self.values
    }

    /// Provides the dimensions of the underlying layer.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Narrow contract through which the simulation consumes map data.
pub trait MapAdapter {
    /// Width and height of the map in cells.
    fn dimensions(&self) -> (u32, u32);

    /// Reports whether agents may occupy and traverse the cell.
    fn is_walkable(&self, position: Position) -> bool;

    /// Normalized positions belonging to the category, in map order.
    fn positions_for_category(&self, category: BuildingKind) -> Vec<Position>;
}

/// Capability queried by renderers to draw an entity without knowing its type.
pub trait Renderable {
    /// Cell the entity occupies.
    fn position(&self) -> Position;

    /// Illness state used to pick the entity's glyph or color.
    fn illness(&self) -> IllnessState;

    /// Whether the entity wears a face covering.
    fn face_covered(&self) -> bool;
}

impl Renderable for AgentSnapshot {
    fn position(&self) -> Position {
        self.position
    }

    fn illness(&self) -> IllnessState {
        self.illness
    }

    fn face_covered(&self) -> bool {
        self.face_covered
    }
}

/// Failures raised by the simulation core.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SimulationError {
    /// A position lies outside the grid extent.
    #[error("position {position} lies outside the {width}x{height} grid")]
    OutOfBounds {
        /// Offending position.
        position: Position,
        /// Grid width in cells.
        width: u32,
        /// Grid height in cells.
        height: u32,
    },
    /// The agent has no cell in the occupancy index.
    #[error("agent {0} is not placed on the grid")]
    AgentNotPlaced(AgentId),
    /// The agent is already present in the occupancy index.
    #[error("agent {0} is already placed on the grid")]
    AgentAlreadyPlaced(AgentId),
    /// No agent with the identifier exists.
    #[error("agent {0} does not exist")]
    UnknownAgent(AgentId),
    /// No property layer with the name exists.
    #[error("property layer `{0}` does not exist")]
    UnknownLayer(String),
    /// A weight-table slot does not correspond to an action.
    #[error("action table slot {0} does not name an action")]
    UnknownAction(usize),
    /// A name does not correspond to an activity level.
    #[error("unknown activity level `{0}`")]
    UnknownActivityLevel(String),
    /// A name does not correspond to a building category.
    #[error("unknown building category `{0}`")]
    UnknownBuildingKind(String),
    /// The action weights for an activity level cannot be sampled.
    #[error("action weights for {0:?} cannot be sampled")]
    InvalidActionWeights(ActivityLevel),
    /// The population generator found no house to use as a home.
    #[error("map contains no houses to spawn agents into")]
    NoHouses,
    /// The configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
