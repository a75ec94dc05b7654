#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Orchestrator advancing the outbreak simulation one step at a time.
//!
//! A [`Simulation`] owns the grid, the agents, and the single seeded random
//! generator of a run. Each call to [`Simulation::step`] advances the clock,
//! seeds patient zero once the warm-up has elapsed, steps every agent in
//! creation order while infected agents shed into the virus field, and decays
//! the field on its cadence. Observers read state between steps through
//! [`query`].

use outbreak_core::{
    AgentId, Event, IllnessState, MapAdapter, SimulationConfig, SimulationError,
};
use outbreak_system_agents::{Agent, AgentSpec, DestinationPolicy, StepContext};
use outbreak_system_spawning::{AgentGenerator, SpawnPointGenerator};
use outbreak_world::{BuildingRegistry, Grid, PathFinder, VirusField};
use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, trace, warn};

/// Authoritative state of one simulation run.
pub struct Simulation {
    map: Box<dyn MapAdapter>,
    config: SimulationConfig,
    grid: Grid,
    policy: DestinationPolicy,
    path_finder: PathFinder,
    field: VirusField,
    agents: Vec<Agent>,
    rng: ChaCha8Rng,
    step: u64,
    seeded: bool,
}

impl Simulation {
    /// Builds a simulation and populates it according to the configuration.
    pub fn new<M>(map: M, config: SimulationConfig) -> Result<Self, SimulationError>
    where
        M: MapAdapter + 'static,
    {
        let mut simulation = Self::empty(map, config)?;
        if simulation.config.population.agent_count == 0 {
            return Ok(simulation);
        }

        let spawn_points = SpawnPointGenerator::new(simulation.policy.registry())?;
        let mut generator =
            AgentGenerator::new(simulation.config.population.clone(), spawn_points);
        for spec in generator.generate(&mut simulation.rng)? {
            let _ = simulation.spawn(spec)?;
        }
        Ok(simulation)
    }

    /// Builds a simulation without any agents.
    pub fn empty<M>(map: M, config: SimulationConfig) -> Result<Self, SimulationError>
    where
        M: MapAdapter + 'static,
    {
        config.validate()?;

        let (width, height) = map.dimensions();
        let mut grid = Grid::new(width, height);
        let field = VirusField::new(config.field.clone());
        field.install(&mut grid);

        let registry = BuildingRegistry::from_map(&map);
        info!(
            width,
            height,
            buildings = registry.len(),
            seed = config.schedule.seed,
            "simulation created"
        );

        Ok(Self {
            path_finder: PathFinder::for_map(&map),
            policy: DestinationPolicy::new(registry),
            map: Box::new(map),
            rng: ChaCha8Rng::seed_from_u64(config.schedule.seed),
            config,
            grid,
            field,
            agents: Vec::new(),
            step: 0,
            seeded: false,
        })
    }

    /// Creates an agent from the description and places it on its home cell.
    pub fn spawn(&mut self, spec: AgentSpec) -> Result<AgentId, SimulationError> {
        let agent = Agent::new(spec)?;
        self.grid.place(agent.id(), agent.home())?;
        let id = agent.id();
        self.agents.push(agent);
        Ok(id)
    }

    /// Forces the agent into the infected state.
    ///
    /// Returns whether the agent's state changed.
    pub fn infect(&mut self, agent: AgentId) -> Result<bool, SimulationError> {
        self.agents
            .iter_mut()
            .find(|candidate| candidate.id() == agent)
            .map(Agent::force_infect)
            .ok_or(SimulationError::UnknownAgent(agent))
    }

    /// Advances the simulation by one step, reporting what happened.
    pub fn step(&mut self, out_events: &mut Vec<Event>) -> Result<(), SimulationError> {
        self.step += 1;
        out_events.push(Event::TimeAdvanced { step: self.step });

        if !self.seeded && self.step >= self.config.schedule.warm_up_steps {
            self.seed_patient_zero(out_events);
        }

        let remove_dead = self.config.schedule.remove_dead;
        let mut ctx = StepContext {
            grid: &mut self.grid,
            map: self.map.as_ref(),
            policy: &self.policy,
            path_finder: &self.path_finder,
            field: &self.field,
            tuning: &self.config.illness,
        };

        for agent in &mut self.agents {
            let was_dead = agent.illness() == IllnessState::Dead;
            agent.step(&mut ctx, &mut self.rng, out_events)?;

            match agent.illness() {
                IllnessState::Infected => {
                    let _ =
                        self.field
                            .deposit(ctx.grid, agent.position(), agent.face_covered())?;
                }
                IllnessState::Dead if remove_dead && !was_dead => {
                    let _ = ctx.grid.remove(agent.id())?;
                }
                _ => {}
            }
        }

        if self.field.is_decay_step(self.step) {
            self.field.decay(&mut self.grid)?;
            trace!(step = self.step, "virus field decayed");
            out_events.push(Event::FieldDecayed { step: self.step });
        }

        Ok(())
    }

    fn seed_patient_zero(&mut self, out_events: &mut Vec<Event>) {
        self.seeded = true;

        let candidates: Vec<usize> = self
            .agents
            .iter()
            .enumerate()
            .filter(|(_, agent)| {
                !agent.face_covered()
                    && matches!(
                        agent.illness(),
                        IllnessState::Susceptible | IllnessState::Recovered
                    )
            })
            .map(|(index, _)| index)
            .collect();

        let Some(agent) = candidates
            .choose(&mut self.rng)
            .and_then(|index| self.agents.get_mut(*index))
        else {
            warn!(step = self.step, "no unmasked agent available to seed");
            return;
        };

        let _ = agent.force_infect();
        info!(
            step = self.step,
            agent = %agent.id(),
            position = %agent.position(),
            "patient zero seeded"
        );
        out_events.push(Event::PatientZeroSeeded {
            agent: agent.id(),
            position: agent.position(),
        });
    }

    /// Runs `steps` steps, discarding the reported events.
    pub fn run(&mut self, steps: u64) -> Result<(), SimulationError> {
        let mut events = Vec::new();
        for _ in 0..steps {
            events.clear();
            self.step(&mut events)?;
        }
        debug!(step = self.step, "run finished");
        Ok(())
    }
}

/// Query functions that expose read-only simulation state to observers.
pub mod query {
    use outbreak_core::{
        AgentId, AgentView, FieldView, MapAdapter, Renderable, SimulationConfig, SimulationError,
    };
    use outbreak_system_agents::Agent;
    use outbreak_world::{BuildingRegistry, Grid};

    use super::Simulation;

    /// Number of steps taken so far.
    #[must_use]
    pub fn step(simulation: &Simulation) -> u64 {
        simulation.step
    }

    /// Reports whether patient zero has been seeded.
    #[must_use]
    pub fn is_seeded(simulation: &Simulation) -> bool {
        simulation.seeded
    }

    /// Configuration the simulation runs with.
    #[must_use]
    pub fn config(simulation: &Simulation) -> &SimulationConfig {
        &simulation.config
    }

    /// Map the simulation was built from.
    #[must_use]
    pub fn map(simulation: &Simulation) -> &dyn MapAdapter {
        simulation.map.as_ref()
    }

    /// Occupancy index and property layers.
    #[must_use]
    pub fn grid(simulation: &Simulation) -> &Grid {
        &simulation.grid
    }

    /// Building registry derived from the map.
    #[must_use]
    pub fn buildings(simulation: &Simulation) -> &BuildingRegistry {
        simulation.policy.registry()
    }

    /// Agents in creation order.
    #[must_use]
    pub fn agents(simulation: &Simulation) -> &[Agent] {
        &simulation.agents
    }

    /// Looks up a single agent.
    pub fn agent(simulation: &Simulation, id: AgentId) -> Result<&Agent, SimulationError> {
        simulation
            .agents
            .iter()
            .find(|agent| agent.id() == id)
            .ok_or(SimulationError::UnknownAgent(id))
    }

    /// Captures a read-only view of every agent.
    #[must_use]
    pub fn agent_view(simulation: &Simulation) -> AgentView {
        AgentView::from_snapshots(simulation.agents.iter().map(Agent::snapshot).collect())
    }

    /// Agents exposed through the rendering capability.
    #[must_use]
    pub fn renderables(simulation: &Simulation) -> Vec<&dyn Renderable> {
        simulation
            .agents
            .iter()
            .map(|agent| agent as &dyn Renderable)
            .collect()
    }

    /// Read-only view over the virus field.
    pub fn field_view(simulation: &Simulation) -> Result<FieldView<'_>, SimulationError> {
        simulation.field.view(&simulation.grid)
    }
}
