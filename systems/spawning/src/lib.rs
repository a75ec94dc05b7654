#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Population generator drawing agent attributes and homes at setup.

use outbreak_core::{
    AgentId, BuildingKind, ConfigError, PopulationTuning, Position, SimulationError,
    SocialDistancing,
};
use outbreak_system_agents::AgentSpec;
use outbreak_world::BuildingRegistry;
use rand::{seq::SliceRandom, Rng};
use tracing::info;

/// Picks homes uniformly among the registered houses.
#[derive(Clone, Debug)]
pub struct SpawnPointGenerator {
    houses: Vec<Position>,
}

impl SpawnPointGenerator {
    /// Creates a generator over the registry's houses.
    pub fn new(registry: &BuildingRegistry) -> Result<Self, SimulationError> {
        let houses = registry.positions(BuildingKind::House).to_vec();
        if houses.is_empty() {
            return Err(SimulationError::NoHouses);
        }
        Ok(Self { houses })
    }

    /// Draws the next home.
    pub fn next<R>(&self, rng: &mut R) -> Result<Position, SimulationError>
    where
        R: Rng + ?Sized,
    {
        self.houses
            .choose(rng)
            .copied()
            .ok_or(SimulationError::NoHouses)
    }
}

/// Draws agent attributes according to the population tuning.
#[derive(Clone, Debug)]
pub struct AgentGenerator {
    tuning: PopulationTuning,
    spawn_points: SpawnPointGenerator,
    next_id: u32,
}

impl AgentGenerator {
    /// Creates a generator that issues identifiers starting at zero.
    #[must_use]
    pub const fn new(tuning: PopulationTuning, spawn_points: SpawnPointGenerator) -> Self {
        Self {
            tuning,
            spawn_points,
            next_id: 0,
        }
    }

    /// Draws the attributes of the next agent.
    pub fn next<R>(&mut self, rng: &mut R) -> Result<AgentSpec, SimulationError>
    where
        R: Rng + ?Sized,
    {
        let min_age = self.tuning.min_age.min(self.tuning.max_age);
        let age = rng.gen_range(min_age..=self.tuning.max_age);
        let face_covered = rng.gen_bool(self.tuning.face_cover_probability.clamp(0.0, 1.0));
        let vaccinated = rng.gen_bool(self.tuning.vaccination_probability.clamp(0.0, 1.0));
        let social_distancing = SocialDistancing::ALL
            .choose(rng)
            .copied()
            .unwrap_or(SocialDistancing::Off);
        let activity = self
            .tuning
            .activity_levels
            .choose(rng)
            .copied()
            .ok_or(SimulationError::Config(ConfigError::NoActivityLevels))?;
        let home = self.spawn_points.next(rng)?;

        let id = AgentId::new(self.next_id);
        self.next_id = self.next_id.saturating_add(1);

        Ok(AgentSpec {
            id,
            age,
            face_covered,
            vaccinated,
            social_distancing,
            activity,
            home,
        })
    }

    /// Draws the configured number of agents in identifier order.
    pub fn generate<R>(&mut self, rng: &mut R) -> Result<Vec<AgentSpec>, SimulationError>
    where
        R: Rng + ?Sized,
    {
        let specs = (0..self.tuning.agent_count)
            .map(|_| self.next(rng))
            .collect::<Result<Vec<_>, _>>()?;
        info!(agents = specs.len(), "population generated");
        Ok(specs)
    }
}
