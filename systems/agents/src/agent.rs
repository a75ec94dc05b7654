use std::collections::VecDeque;

use outbreak_core::{
    Action, ActivityLevel, AgeGroup, AgentId, AgentSnapshot, BuildingKind, Event, IllnessState,
    IllnessTuning, MapAdapter, MovementState, Position, Renderable, SimulationError,
    SocialDistancing,
};
use outbreak_world::{Grid, PathFinder, VirusField};
use rand::Rng;
use tracing::debug;

use crate::{actions::ActionTable, destination::DestinationPolicy};

/// Attributes drawn for an agent at setup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AgentSpec {
    /// Identifier the agent will carry.
    pub id: AgentId,
    /// Age in years.
    pub age: u32,
    /// Whether the agent starts out wearing a face covering.
    pub face_covered: bool,
    /// Whether the agent is vaccinated.
    pub vaccinated: bool,
    /// Distancing habit of the agent.
    pub social_distancing: SocialDistancing,
    /// How often the agent leaves its current location.
    pub activity: ActivityLevel,
    /// House the agent lives in and starts on.
    pub home: Position,
}

/// Collaborators an agent consults while stepping.
pub struct StepContext<'a> {
    /// Occupancy index and property layers.
    pub grid: &'a mut Grid,
    /// Walkability source for path planning.
    pub map: &'a dyn MapAdapter,
    /// Chooses where idle agents head.
    pub policy: &'a DestinationPolicy,
    /// Plans routes to chosen destinations.
    pub path_finder: &'a PathFinder,
    /// Virus concentration sampled by susceptible agents.
    pub field: &'a VirusField,
    /// Illness progression parameters.
    pub tuning: &'a IllnessTuning,
}

/// Individually owned illness and movement state machine.
#[derive(Clone, Debug)]
pub struct Agent {
    id: AgentId,
    illness: IllnessState,
    age: u32,
    age_group: AgeGroup,
    face_covered: bool,
    vaccinated: bool,
    social_distancing: SocialDistancing,
    actions: ActionTable,
    home: Position,
    position: Position,
    destination: Option<Position>,
    path: VecDeque<Position>,
    movement: MovementState,
    infection_time: u32,
    hospital_time: u32,
    recovered_time: u32,
}

impl Agent {
    /// Creates a susceptible, idle agent standing on its home cell.
    ///
    /// The agent is not placed on any grid; the caller registers it.
    pub fn new(spec: AgentSpec) -> Result<Self, SimulationError> {
        Ok(Self {
            id: spec.id,
            illness: IllnessState::Susceptible,
            age: spec.age,
            age_group: AgeGroup::from_age(spec.age),
            face_covered: spec.face_covered,
            vaccinated: spec.vaccinated,
            social_distancing: spec.social_distancing,
            actions: ActionTable::new(spec.activity)?,
            home: spec.home,
            position: spec.home,
            destination: None,
            path: VecDeque::new(),
            movement: MovementState::Idle,
            infection_time: 0,
            hospital_time: 0,
            recovered_time: 0,
        })
    }

    /// Advances the agent by one step.
    ///
    /// Movement runs first, then infection, progression and immunity decay in
    /// that order, each guarded by the state left by the previous phase.
    /// Dying ends the step. Dead agents are inert.
    pub fn step<R>(
        &mut self,
        ctx: &mut StepContext<'_>,
        rng: &mut R,
        out_events: &mut Vec<Event>,
    ) -> Result<(), SimulationError>
    where
        R: Rng + ?Sized,
    {
        if self.illness == IllnessState::Dead {
            return Ok(());
        }

        self.advance_movement(ctx, rng, out_events)?;

        if self.illness == IllnessState::Susceptible {
            self.sample_infection(ctx, rng, out_events)?;
        }
        if self.illness == IllnessState::Infected {
            self.progress_infection(ctx, rng, out_events);
            if self.illness == IllnessState::Dead {
                return Ok(());
            }
        }
        if self.illness == IllnessState::Recovered {
            self.wane_immunity(ctx.tuning, out_events);
        }
        Ok(())
    }

    /// Draws the idle action from the agent's activity table.
    pub fn decide_action<R>(&self, rng: &mut R) -> Result<Action, SimulationError>
    where
        R: Rng + ?Sized,
    {
        self.actions.draw(rng)
    }

    /// Forces the agent into the infected state.
    ///
    /// Returns `false` without changing anything when the agent is dead or
    /// already infected.
    pub fn force_infect(&mut self) -> bool {
        if matches!(self.illness, IllnessState::Dead | IllnessState::Infected) {
            return false;
        }
        self.become_infected();
        true
    }

    fn advance_movement<R>(
        &mut self,
        ctx: &mut StepContext<'_>,
        rng: &mut R,
        out_events: &mut Vec<Event>,
    ) -> Result<(), SimulationError>
    where
        R: Rng + ?Sized,
    {
        match self.movement {
            MovementState::Moving => self.follow_path(ctx.grid, out_events),
            MovementState::Idle => match self.decide_action(rng)? {
                Action::StayInPlace => Ok(()),
                Action::GoOut => {
                    self.head_out(ctx, rng, out_events);
                    Ok(())
                }
            },
        }
    }

    fn follow_path(
        &mut self,
        grid: &mut Grid,
        out_events: &mut Vec<Event>,
    ) -> Result<(), SimulationError> {
        if let Some(next) = self.path.pop_front() {
            grid.move_agent(self.id, next)?;
            out_events.push(Event::AgentMoved {
                agent: self.id,
                from: self.position,
                to: next,
            });
            self.position = next;
        }

        if self.path.is_empty() || Some(self.position) == self.destination {
            self.arrive();
        }
        Ok(())
    }

    fn head_out<R>(&mut self, ctx: &StepContext<'_>, rng: &mut R, out_events: &mut Vec<Event>)
    where
        R: Rng + ?Sized,
    {
        let Some((kind, destination)) =
            ctx.policy
                .choose(self.illness, self.position, self.home, rng)
        else {
            return;
        };

        let path = ctx.path_finder.find(ctx.map, self.position, destination);
        if path.is_empty() {
            self.arrive();
            return;
        }

        debug!(agent = %self.id, ?kind, %destination, steps = path.len(), "destination chosen");
        self.destination = Some(destination);
        self.path = path.into();
        self.movement = MovementState::Moving;
        out_events.push(Event::DestinationChosen {
            agent: self.id,
            kind,
            destination,
        });
    }

    fn arrive(&mut self) {
        self.destination = None;
        self.path.clear();
        self.movement = MovementState::Idle;
    }

    fn sample_infection<R>(
        &mut self,
        ctx: &StepContext<'_>,
        rng: &mut R,
        out_events: &mut Vec<Event>,
    ) -> Result<(), SimulationError>
    where
        R: Rng + ?Sized,
    {
        let concentration = ctx.field.concentration(&*ctx.grid, self.position)?;
        let probability = self.likelihood_of_infection(concentration, ctx.tuning);
        if rng.gen_bool(probability) {
            self.become_infected();
            debug!(agent = %self.id, position = %self.position, concentration, "agent infected");
            out_events.push(Event::AgentInfected {
                agent: self.id,
                position: self.position,
            });
        }
        Ok(())
    }

    fn progress_infection<R>(
        &mut self,
        ctx: &StepContext<'_>,
        rng: &mut R,
        out_events: &mut Vec<Event>,
    ) where
        R: Rng + ?Sized,
    {
        self.infection_time = self.infection_time.saturating_add(1);

        if !ctx
            .policy
            .registry()
            .is_kind(self.position, BuildingKind::Hospital)
        {
            self.hospital_time = 0;
            return;
        }

        self.hospital_time = self.hospital_time.saturating_add(1);
        if self.hospital_time < ctx.tuning.hospital_threshold {
            return;
        }

        if rng.gen_bool(self.likelihood_of_death(ctx.tuning)) {
            self.illness = IllnessState::Dead;
            self.arrive();
            debug!(agent = %self.id, age = self.age, position = %self.position, "agent died");
            out_events.push(Event::AgentDied {
                agent: self.id,
                position: self.position,
            });
            return;
        }

        if rng.gen_bool(self.likelihood_of_recovery(ctx.tuning)) {
            self.illness = IllnessState::Recovered;
            self.recovered_time = 0;
            self.hospital_time = 0;
            let adopted_face_cover = !self.face_covered
                && rng.gen_bool(ctx.tuning.mask_adoption_probability.clamp(0.0, 1.0));
            if adopted_face_cover {
                self.face_covered = true;
            }
            debug!(
                agent = %self.id,
                infection_time = self.infection_time,
                adopted_face_cover,
                "agent recovered"
            );
            out_events.push(Event::AgentRecovered {
                agent: self.id,
                adopted_face_cover,
            });
        }
    }

    fn wane_immunity(&mut self, tuning: &IllnessTuning, out_events: &mut Vec<Event>) {
        self.recovered_time = self.recovered_time.saturating_add(1);
        if self.recovered_time >= tuning.immunity_duration {
            self.illness = IllnessState::Susceptible;
            self.recovered_time = 0;
            debug!(agent = %self.id, "immunity waned");
            out_events.push(Event::ImmunityWaned { agent: self.id });
        }
    }

    fn become_infected(&mut self) {
        self.illness = IllnessState::Infected;
        self.infection_time = 0;
        self.hospital_time = 0;
    }

    /// Chance of catching the virus from the provided concentration.
    #[must_use]
    pub fn likelihood_of_infection(&self, concentration: f64, tuning: &IllnessTuning) -> f64 {
        let mut probability = concentration / tuning.infection_scale;
        if self.face_covered {
            probability *= tuning.mask_infection_factor;
        }
        if probability.is_nan() {
            return 0.0;
        }
        probability.clamp(0.0, 1.0)
    }

    /// Chance of dying on an eligible hospital step; scales with age.
    #[must_use]
    pub fn likelihood_of_death(&self, tuning: &IllnessTuning) -> f64 {
        (tuning.death_scale * f64::from(self.age) / 100.0).clamp(0.0, 1.0)
    }

    /// Chance of recovering on an eligible hospital step.
    #[must_use]
    pub fn likelihood_of_recovery(&self, tuning: &IllnessTuning) -> f64 {
        tuning.recovery_probability.clamp(0.0, 1.0)
    }

    /// Captures the observable state of the agent.
    #[must_use]
    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            position: self.position,
            illness: self.illness,
            movement: self.movement,
            face_covered: self.face_covered,
        }
    }

    /// Identifier of the agent.
    #[must_use]
    pub const fn id(&self) -> AgentId {
        self.id
    }

    /// Current illness state.
    #[must_use]
    pub const fn illness(&self) -> IllnessState {
        self.illness
    }

    /// Current movement sub-state.
    #[must_use]
    pub const fn movement(&self) -> MovementState {
        self.movement
    }

    /// Age in years.
    #[must_use]
    pub const fn age(&self) -> u32 {
        self.age
    }

    /// Age bracket derived from the age.
    #[must_use]
    pub const fn age_group(&self) -> AgeGroup {
        self.age_group
    }

    /// Whether the agent wears a face covering.
    #[must_use]
    pub const fn face_covered(&self) -> bool {
        self.face_covered
    }

    /// Whether the agent is vaccinated. The flag has no effect on illness.
    #[must_use]
    pub const fn vaccinated(&self) -> bool {
        self.vaccinated
    }

    /// Distancing habit the agent was created with.
    #[must_use]
    pub const fn social_distancing(&self) -> SocialDistancing {
        self.social_distancing
    }

    /// Activity level governing idle draws.
    #[must_use]
    pub const fn activity(&self) -> ActivityLevel {
        self.actions.activity()
    }

    /// House the agent lives in.
    #[must_use]
    pub const fn home(&self) -> Position {
        self.home
    }

    /// Cell the agent occupies.
    #[must_use]
    pub const fn position(&self) -> Position {
        self.position
    }

    /// Cell the agent is walking to, if any.
    #[must_use]
    pub const fn destination(&self) -> Option<Position> {
        self.destination
    }

    /// Remaining cells of the planned route.
    pub fn path(&self) -> impl Iterator<Item = Position> + '_ {
        self.path.iter().copied()
    }

    /// Steps spent infected.
    #[must_use]
    pub const fn infection_time(&self) -> u32 {
        self.infection_time
    }

    /// Consecutive infected steps spent at a hospital.
    #[must_use]
    pub const fn hospital_time(&self) -> u32 {
        self.hospital_time
    }

    /// Steps spent recovered since the last recovery.
    #[must_use]
    pub const fn recovered_time(&self) -> u32 {
        self.recovered_time
    }
}

impl Renderable for Agent {
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

#[cfg(test)]
mod tests {
    use super::*;
    use outbreak_core::FieldTuning;
    use outbreak_world::{BuildingRegistry, Tile, TileMap};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct Harness {
        map: TileMap,
        grid: Grid,
        policy: DestinationPolicy,
        path_finder: PathFinder,
        field: VirusField,
        tuning: IllnessTuning,
    }

    impl Harness {
        fn new(map: TileMap) -> Self {
            let (width, height) = map.dimensions();
            let mut grid = Grid::new(width, height);
            let field = VirusField::new(FieldTuning::default());
            field.install(&mut grid);
            Self {
                policy: DestinationPolicy::new(BuildingRegistry::from_map(&map)),
                path_finder: PathFinder::for_map(&map),
                map,
                grid,
                field,
                tuning: IllnessTuning::default(),
            }
        }

        fn spawn(&mut self, id: u32, activity: ActivityLevel, home: Position) -> Agent {
            let agent = Agent::new(AgentSpec {
                id: AgentId::new(id),
                age: 40,
                face_covered: false,
                vaccinated: false,
                social_distancing: SocialDistancing::Off,
                activity,
                home,
            })
            .expect("valid activity");
            self.grid.place(agent.id(), home).expect("home in bounds");
            agent
        }

        fn step(&mut self, agent: &mut Agent, rng: &mut ChaCha8Rng) -> Vec<Event> {
            let mut events = Vec::new();
            let mut ctx = StepContext {
                grid: &mut self.grid,
                map: &self.map,
                policy: &self.policy,
                path_finder: &self.path_finder,
                field: &self.field,
                tuning: &self.tuning,
            };
            agent.step(&mut ctx, rng, &mut events).expect("step succeeds");
            events
        }
    }

    fn town() -> TileMap {
        TileMap::parse("H###S\n.#.#.\n+###L\n").expect("valid layout")
    }

    #[test]
    fn dead_agents_never_change() {
        let mut harness = Harness::new(town());
        let mut agent = harness.spawn(0, ActivityLevel::High, Position::new(0, 0));
        agent.illness = IllnessState::Dead;
        let before = agent.snapshot();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        for _ in 0..200 {
            let events = harness.step(&mut agent, &mut rng);
            assert!(events.is_empty());
            assert_eq!(agent.snapshot(), before);
        }
        assert!(!agent.force_infect());
    }

    #[test]
    fn moving_agents_follow_their_path_and_stop_on_arrival() {
        let mut harness = Harness::new(town());
        let home = Position::new(0, 0);
        let mut agent = harness.spawn(0, ActivityLevel::High, home);
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        let mut chosen = None;
        for _ in 0..100 {
            let events = harness.step(&mut agent, &mut rng);
            if let Some(Event::DestinationChosen { destination, .. }) = events
                .iter()
                .find(|event| matches!(event, Event::DestinationChosen { .. }))
            {
                chosen = Some(*destination);
                break;
            }
        }
        let destination = chosen.expect("a high-activity agent leaves home");
        assert_eq!(agent.movement(), MovementState::Moving);
        let route: Vec<Position> = agent.path().collect();
        assert_eq!(route.last(), Some(&destination));

        let mut previous = agent.position();
        for expected in route {
            let events = harness.step(&mut agent, &mut rng);
            assert!(events.contains(&Event::AgentMoved {
                agent: agent.id(),
                from: previous,
                to: expected,
            }));
            assert_eq!(harness.grid.position_of(agent.id()), Some(expected));
            previous = expected;
        }

        assert_eq!(agent.position(), destination);
        assert_eq!(agent.movement(), MovementState::Idle);
        assert_eq!(agent.destination(), None);
    }

    #[test]
    fn unreachable_destination_keeps_agent_idle() {
        let mut harness = Harness::new(TileMap::parse("H.S\n").expect("valid layout"));
        let home = Position::new(0, 0);
        let mut agent = harness.spawn(0, ActivityLevel::High, home);
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        for _ in 0..100 {
            let events = harness.step(&mut agent, &mut rng);
            assert!(events.is_empty());
            assert_eq!(agent.movement(), MovementState::Idle);
            assert_eq!(agent.position(), home);
        }
    }

    #[test]
    fn saturated_cell_infects_susceptible_agent() {
        let mut harness = Harness::new(TileMap::filled(1, 1, Tile::Building(BuildingKind::House)));
        let home = Position::new(0, 0);
        let mut agent = harness.spawn(0, ActivityLevel::Low, home);
        harness
            .grid
            .set_cell(harness.field.layer_name(), home, 1_000.0)
            .expect("layer installed");
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let events = harness.step(&mut agent, &mut rng);
        assert_eq!(agent.illness(), IllnessState::Infected);
        assert!(events.contains(&Event::AgentInfected {
            agent: agent.id(),
            position: home,
        }));
    }

    #[test]
    fn clean_cell_never_infects() {
        let mut harness = Harness::new(TileMap::filled(1, 1, Tile::Building(BuildingKind::House)));
        let mut agent = harness.spawn(0, ActivityLevel::Medium, Position::new(0, 0));
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        for _ in 0..1_000 {
            let _ = harness.step(&mut agent, &mut rng);
        }
        assert_eq!(agent.illness(), IllnessState::Susceptible);
    }

    #[test]
    fn masks_scale_infection_likelihood() {
        let tuning = IllnessTuning::default();
        let mut agent = Agent::new(AgentSpec {
            id: AgentId::new(1),
            age: 30,
            face_covered: false,
            vaccinated: true,
            social_distancing: SocialDistancing::Extreme,
            activity: ActivityLevel::Low,
            home: Position::new(0, 0),
        })
        .expect("valid activity");

        assert_eq!(agent.likelihood_of_infection(500.0, &tuning), 0.5);
        assert_eq!(agent.likelihood_of_infection(5_000.0, &tuning), 1.0);
        agent.face_covered = true;
        assert!((agent.likelihood_of_infection(500.0, &tuning) - 0.025).abs() < 1e-12);
        assert!((agent.likelihood_of_death(&tuning) - 0.015).abs() < 1e-12);
    }

    #[test]
    fn recovered_agents_revert_exactly_at_immunity_duration() {
        let mut harness = Harness::new(TileMap::filled(1, 1, Tile::Building(BuildingKind::House)));
        let mut agent = harness.spawn(0, ActivityLevel::Low, Position::new(0, 0));
        agent.illness = IllnessState::Recovered;
        let mut rng = ChaCha8Rng::seed_from_u64(13);

        for _ in 0..499 {
            let events = harness.step(&mut agent, &mut rng);
            assert!(events.is_empty());
            assert_eq!(agent.illness(), IllnessState::Recovered);
        }
        assert_eq!(agent.recovered_time(), 499);

        let events = harness.step(&mut agent, &mut rng);
        assert_eq!(agent.illness(), IllnessState::Susceptible);
        assert_eq!(agent.recovered_time(), 0);
        assert_eq!(events, vec![Event::ImmunityWaned { agent: agent.id() }]);
    }

    #[test]
    fn leaving_hospital_resets_hospital_time() {
        let mut harness = Harness::new(TileMap::parse("+#H\n").expect("valid layout"));
        let mut agent = harness.spawn(0, ActivityLevel::Low, Position::new(0, 0));
        assert!(agent.force_infect());
        assert!(!agent.force_infect());
        let mut rng = ChaCha8Rng::seed_from_u64(17);

        let _ = harness.step(&mut agent, &mut rng);
        assert_eq!(agent.hospital_time(), 1);

        harness
            .grid
            .move_agent(agent.id(), Position::new(2, 0))
            .expect("in bounds");
        agent.position = Position::new(2, 0);
        agent.movement = MovementState::Idle;
        let _ = harness.step(&mut agent, &mut rng);
        assert_eq!(agent.position(), Position::new(2, 0));
        assert_eq!(agent.hospital_time(), 0);
        assert_eq!(agent.infection_time(), 2);
    }

    #[test]
    fn hospitalised_agent_resolves_after_threshold() {
        let mut open = TileMap::filled(10, 10, Tile::Road);
        open.set(Position::new(0, 0), Tile::Building(BuildingKind::House))
            .expect("in bounds");
        open.set(Position::new(9, 9), Tile::Building(BuildingKind::Hospital))
            .expect("in bounds");

        for seed in 0..20 {
            let mut harness = Harness::new(open.clone());
            let mut agent = harness.spawn(0, ActivityLevel::Medium, Position::new(0, 0));
            assert!(agent.force_infect());
            let mut rng = ChaCha8Rng::seed_from_u64(seed);

            let mut at_hospital = 0;
            for _ in 0..5_000 {
                let _ = harness.step(&mut agent, &mut rng);
                if agent.illness() != IllnessState::Infected {
                    break;
                }
                if agent.position() == Position::new(9, 9) {
                    at_hospital += 1;
                }
            }

            assert!(
                matches!(
                    agent.illness(),
                    IllnessState::Recovered | IllnessState::Dead
                ),
                "seed {seed} still infected after {at_hospital} hospital steps"
            );
            assert!(at_hospital >= 299, "seed {seed} resolved outside the hospital");
        }
    }

    fn hospital_ward(tuning: IllnessTuning) -> Harness {
        let mut harness = Harness::new(TileMap::filled(
            1,
            1,
            Tile::Building(BuildingKind::Hospital),
        ));
        harness.tuning = tuning;
        harness
    }

    fn certain_recovery() -> IllnessTuning {
        IllnessTuning {
            hospital_threshold: 1,
            death_scale: 0.0,
            recovery_probability: 1.0,
            ..IllnessTuning::default()
        }
    }

    #[test]
    fn illness_phases_follow_each_other_within_a_step() {
        let mut harness = hospital_ward(IllnessTuning {
            hospital_threshold: 2,
            ..certain_recovery()
        });
        let ward = Position::new(0, 0);
        let mut agent = harness.spawn(0, ActivityLevel::Low, ward);
        harness
            .grid
            .set_cell(harness.field.layer_name(), ward, 1_000.0)
            .expect("layer installed");
        let mut rng = ChaCha8Rng::seed_from_u64(21);

        let events = harness.step(&mut agent, &mut rng);
        assert!(events.contains(&Event::AgentInfected {
            agent: agent.id(),
            position: ward,
        }));
        assert_eq!(agent.illness(), IllnessState::Infected);
        assert_eq!(agent.infection_time(), 1);
        assert_eq!(agent.hospital_time(), 1);

        let events = harness.step(&mut agent, &mut rng);
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::AgentRecovered { .. })));
        assert_eq!(agent.illness(), IllnessState::Recovered);
        assert_eq!(agent.infection_time(), 2);
        assert_eq!(agent.hospital_time(), 0);
        assert_eq!(agent.recovered_time(), 1);
    }

    #[test]
    fn death_is_rolled_before_recovery() {
        let mut harness = hospital_ward(IllnessTuning {
            death_scale: 1.0,
            ..certain_recovery()
        });
        let mut agent = harness.spawn(0, ActivityLevel::Low, Position::new(0, 0));
        agent.age = 100;
        assert!(agent.force_infect());
        let mut rng = ChaCha8Rng::seed_from_u64(23);

        let events = harness.step(&mut agent, &mut rng);
        assert_eq!(agent.illness(), IllnessState::Dead);
        assert!(events.contains(&Event::AgentDied {
            agent: agent.id(),
            position: Position::new(0, 0),
        }));
        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::AgentRecovered { .. })));
        assert_eq!(agent.recovered_time(), 0);
    }

    #[test]
    fn recovery_resets_counters_and_adopts_face_cover() {
        let mut harness = hospital_ward(IllnessTuning {
            hospital_threshold: 3,
            mask_adoption_probability: 1.0,
            ..certain_recovery()
        });
        let mut agent = harness.spawn(0, ActivityLevel::Low, Position::new(0, 0));
        assert!(agent.force_infect());
        let mut rng = ChaCha8Rng::seed_from_u64(29);

        for _ in 0..2 {
            let _ = harness.step(&mut agent, &mut rng);
        }
        assert_eq!(agent.illness(), IllnessState::Infected);
        assert_eq!(agent.hospital_time(), 2);

        let events = harness.step(&mut agent, &mut rng);
        assert_eq!(agent.illness(), IllnessState::Recovered);
        assert!(agent.face_covered());
        assert_eq!(agent.hospital_time(), 0);
        // Reset on recovery, then ticked once by the immunity phase.
        assert_eq!(agent.recovered_time(), 1);
        assert!(events.contains(&Event::AgentRecovered {
            agent: agent.id(),
            adopted_face_cover: true,
        }));
    }

    #[test]
    fn masked_agents_keep_their_face_cover_on_recovery() {
        let mut harness = hospital_ward(IllnessTuning {
            mask_adoption_probability: 1.0,
            ..certain_recovery()
        });
        let mut agent = harness.spawn(0, ActivityLevel::Low, Position::new(0, 0));
        agent.face_covered = true;
        assert!(agent.force_infect());
        let mut rng = ChaCha8Rng::seed_from_u64(31);

        let events = harness.step(&mut agent, &mut rng);
        assert_eq!(agent.illness(), IllnessState::Recovered);
        assert!(agent.face_covered());
        assert!(events.contains(&Event::AgentRecovered {
            agent: agent.id(),
            adopted_face_cover: false,
        }));
    }

    #[test]
    fn face_cover_adoption_follows_configured_probability() {
        let tuning = certain_recovery();
        assert!((tuning.mask_adoption_probability - 0.4).abs() < f64::EPSILON);
        let mut rng = ChaCha8Rng::seed_from_u64(37);
        let trials = 4_000;

        let mut adopted = 0_u32;
        for id in 0..trials {
            let mut harness = hospital_ward(tuning.clone());
            let mut agent = harness.spawn(id, ActivityLevel::Low, Position::new(0, 0));
            assert!(agent.force_infect());
            let _ = harness.step(&mut agent, &mut rng);
            assert_eq!(agent.illness(), IllnessState::Recovered);
            if agent.face_covered() {
                adopted += 1;
            }
        }

        let ratio = f64::from(adopted) / f64::from(trials);
        assert!((0.37..=0.43).contains(&ratio), "adoption ratio {ratio}");
    }
}
