#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts and a plain-text backend for outbreak adapters.
//!
//! Scenes are captured between steps from the map adapter, a view of the
//! virus field, and entities exposed through [`Renderable`]. Backends never
//! see concrete simulation types.

use anyhow::{Context, Result as AnyResult};
use outbreak_core::{BuildingKind, FieldView, IllnessState, MapAdapter, Position, Renderable};
use std::{error::Error, fmt, io::Write};

/// Static terrain drawn underneath the virus field and agents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Terrain {
    /// Cell agents cannot enter.
    Blocked,
    /// Walkable cell without a building.
    Open,
    /// Walkable building of the given category.
    Building(BuildingKind),
}

impl Terrain {
    /// Glyph used by the text backend.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::Blocked => '.',
            Self::Open => '#',
            Self::Building(BuildingKind::House) => 'H',
            Self::Building(BuildingKind::Shop) => 'S',
            Self::Building(BuildingKind::Library) => 'L',
            Self::Building(BuildingKind::FastFood) => 'F',
            Self::Building(BuildingKind::Hospital) => '+',
        }
    }
}

/// Agent drawn at a grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AgentPresentation {
    /// Cell the agent occupies.
    pub position: Position,
    /// Illness state selecting the glyph.
    pub illness: IllnessState,
    /// Whether the agent wears a face covering.
    pub face_covered: bool,
}

impl AgentPresentation {
    /// Captures the presentation of a renderable entity.
    #[must_use]
    pub fn capture(entity: &dyn Renderable) -> Self {
        Self {
            position: entity.position(),
            illness: entity.illness(),
            face_covered: entity.face_covered(),
        }
    }

    /// Glyph used by the text backend; masked agents are drawn in lower case.
    #[must_use]
    pub const fn glyph(&self) -> char {
        let glyph = match self.illness {
            IllnessState::Susceptible => 'S',
            IllnessState::Infected => 'I',
            IllnessState::Recovered => 'R',
            IllnessState::Dead => 'D',
        };
        if self.face_covered {
            glyph.to_ascii_lowercase()
        } else {
            glyph
        }
    }

    // Higher ranks win when several agents share a cell.
    const fn rank(&self) -> u8 {
        match self.illness {
            IllnessState::Infected => 3,
            IllnessState::Dead => 2,
            IllnessState::Recovered => 1,
            IllnessState::Susceptible => 0,
        }
    }
}

/// Number of captured agents in each illness state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SceneTally {
    /// Susceptible agents.
    pub susceptible: usize,
    /// Infected agents.
    pub infected: usize,
    /// Recovered agents.
    pub recovered: usize,
    /// Dead agents.
    pub dead: usize,
}

/// Scene description combining terrain, virus intensity and agents.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Step the scene was captured after.
    pub step: u64,
    /// Width of the scene in cells.
    pub width: u32,
    /// Height of the scene in cells.
    pub height: u32,
    /// Terrain in row-major order.
    pub terrain: Vec<Terrain>,
    /// Virus concentration normalized to `[0, 1]`, row-major.
    pub intensity: Vec<f64>,
    /// Largest concentration present when the scene was captured.
    pub peak_concentration: f64,
    /// Agents in capture order.
    pub agents: Vec<AgentPresentation>,
}

impl Scene {
    /// Captures a scene from the map, the virus field, and renderable entities.
    pub fn capture(
        step: u64,
        map: &dyn MapAdapter,
        field: FieldView<'_>,
        entities: &[&dyn Renderable],
    ) -> Result<Self, RenderingError> {
        let (width, height) = map.dimensions();
        if field.dimensions() != (width, height) {
            let (field_width, field_height) = field.dimensions();
            return Err(RenderingError::DimensionMismatch {
                map: (width, height),
                field: (field_width, field_height),
            });
        }

        let mut terrain = Vec::new();
        for y in 0..height {
            for x in 0..width {
                terrain.push(if map.is_walkable(Position::new(x, y)) {
                    Terrain::Open
                } else {
                    Terrain::Blocked
                });
            }
        }
        for kind in BuildingKind::ALL {
            for position in map.positions_for_category(kind) {
                if let Some(slot) = index(position, width, height).and_then(|i| terrain.get_mut(i))
                {
                    *slot = Terrain::Building(kind);
                }
            }
        }

        let peak_concentration = field.max();
        let intensity = field
            .values()
            .iter()
            .map(|value| {
                if peak_concentration > 0.0 {
                    (value / peak_concentration).clamp(0.0, 1.0)
                } else {
                    0.0
                }
            })
            .collect();

        Ok(Self {
            step,
            width,
            height,
            terrain,
            intensity,
            peak_concentration,
            agents: entities
                .iter()
                .map(|entity| AgentPresentation::capture(*entity))
                .collect(),
        })
    }

    /// Counts the captured agents per illness state.
    #[must_use]
    pub fn tally(&self) -> SceneTally {
        let mut tally = SceneTally::default();
        for agent in &self.agents {
            match agent.illness {
                IllnessState::Susceptible => tally.susceptible += 1,
                IllnessState::Infected => tally.infected += 1,
                IllnessState::Recovered => tally.recovered += 1,
                IllnessState::Dead => tally.dead += 1,
            }
        }
        tally
    }

    /// Lays the scene out as text, one line per grid row.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut glyphs: Vec<char> = self
            .terrain
            .iter()
            .zip(&self.intensity)
            .map(|(terrain, intensity)| virus_glyph(*intensity).unwrap_or(terrain.glyph()))
            .collect();

        let mut ranks: Vec<Option<u8>> = vec![None; glyphs.len()];
        for agent in &self.agents {
            let Some(slot) = index(agent.position, self.width, self.height) else {
                continue;
            };
            if ranks[slot].map_or(true, |rank| agent.rank() > rank) {
                ranks[slot] = Some(agent.rank());
                glyphs[slot] = agent.glyph();
            }
        }

        let rows = usize::try_from(self.height).unwrap_or_default();
        let row_len = usize::try_from(self.width.max(1)).unwrap_or(1);
        let mut text = String::with_capacity(glyphs.len() + rows);
        for row in glyphs.chunks(row_len) {
            text.extend(row);
            text.push('\n');
        }
        text
    }
}

fn virus_glyph(intensity: f64) -> Option<char> {
    match intensity {
        value if value <= 0.0 => None,
        value if value < 0.25 => Some(','),
        value if value < 0.5 => Some(';'),
        value if value < 0.75 => Some('%'),
        _ => Some('@'),
    }
}

fn index(position: Position, width: u32, height: u32) -> Option<usize> {
    if position.x() >= width || position.y() >= height {
        return None;
    }
    usize::try_from(u64::from(position.y()) * u64::from(width) + u64::from(position.x())).ok()
}

/// Rendering backend capable of presenting outbreak scenes.
pub trait RenderingBackend {
    /// Presents one captured scene.
    fn present(&mut self, scene: &Scene) -> AnyResult<()>;
}

/// Backend writing scenes as plain-text frames.
#[derive(Debug)]
pub struct TextBackend<W> {
    out: W,
}

impl<W> TextBackend<W>
where
    W: Write,
{
    /// Creates a backend writing into `out`.
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    /// Consumes the backend, yielding the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W> RenderingBackend for TextBackend<W>
where
    W: Write,
{
    fn present(&mut self, scene: &Scene) -> AnyResult<()> {
        let tally = scene.tally();
        writeln!(
            self.out,
            "step {}  S:{} I:{} R:{} D:{}  peak virus {:.1}",
            scene.step,
            tally.susceptible,
            tally.infected,
            tally.recovered,
            tally.dead,
            scene.peak_concentration
        )
        .context("failed to write frame header")?;
        self.out
            .write_all(scene.to_text().as_bytes())
            .context("failed to write frame body")?;
        self.out.flush().context("failed to flush frame")
    }
}

/// Errors that can occur when capturing scenes.
#[derive(Debug, PartialEq, Eq)]
pub enum RenderingError {
    /// The field view does not cover the map.
    DimensionMismatch {
        /// Map width and height.
        map: (u32, u32),
        /// Field width and height.
        field: (u32, u32),
    },
}

impl fmt::Display for RenderingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DimensionMismatch { map, field } => write!(
                f,
                "field dimensions {}x{} do not match map dimensions {}x{}",
                field.0, field.1, map.0, map.1
            ),
        }
    }
}

impl Error for RenderingError {}
