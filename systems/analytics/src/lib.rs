#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Data collector recording agent positions and illness tallies per step.

use outbreak_core::{AgentId, AgentView, Event, IllnessState, Position};
use serde::Serialize;

/// Position of one agent at the end of one step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PositionRecord {
    /// Step the record was captured on.
    pub step: u64,
    /// Agent the record describes.
    pub agent: AgentId,
    /// Cell the agent occupied.
    pub position: Position,
}

/// Number of agents in each illness state at the end of one step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IllnessTally {
    /// Step the tally was captured on.
    pub step: u64,
    /// Agents able to catch the virus.
    pub susceptible: usize,
    /// Agents carrying the virus.
    pub infected: usize,
    /// Agents immune after recovery.
    pub recovered: usize,
    /// Agents that died.
    pub dead: usize,
}

impl IllnessTally {
    fn capture(step: u64, agents: &AgentView) -> Self {
        agents
            .iter()
            .fold(Self { step, ..Self::default() }, |mut tally, agent| {
                match agent.illness {
                    IllnessState::Susceptible => tally.susceptible += 1,
                    IllnessState::Infected => tally.infected += 1,
                    IllnessState::Recovered => tally.recovered += 1,
                    IllnessState::Dead => tally.dead += 1,
                }
                tally
            })
    }

    /// Total number of agents counted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.susceptible + self.infected + self.recovered + self.dead
    }
}

/// Transitions counted over the whole run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CumulativeCounts {
    /// Infections, patient zero included.
    pub infections: u64,
    /// Recoveries at a hospital.
    pub recoveries: u64,
    /// Deaths at a hospital.
    pub deaths: u64,
    /// Recovered agents that became susceptible again.
    pub immunity_lost: u64,
    /// Agents that adopted a face covering on recovery.
    pub masks_adopted: u64,
}

/// Serializable summary of a run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunReport {
    /// Last step observed by the collector.
    pub steps: u64,
    /// Agent forced into the infected state by the seeding event.
    pub patient_zero: Option<AgentId>,
    /// Step on which patient zero was seeded.
    pub seeded_at: Option<u64>,
    /// Largest number of simultaneously infected agents.
    pub peak_infected: usize,
    /// First step on which the peak was reached.
    pub peak_step: u64,
    /// Transition counters.
    pub cumulative: CumulativeCounts,
    /// Tally at the last observed step.
    pub final_tally: IllnessTally,
    /// Tally captured on every observed step.
    pub timeline: Vec<IllnessTally>,
}

/// Observer that records the simulation state once per step.
///
/// The collector only records when the supplied events contain a
/// [`Event::TimeAdvanced`]; calls without one only update the counters.
#[derive(Clone, Debug, Default)]
pub struct DataCollector {
    positions: Vec<PositionRecord>,
    timeline: Vec<IllnessTally>,
    cumulative: CumulativeCounts,
    patient_zero: Option<(AgentId, u64)>,
    last_step: u64,
}

impl DataCollector {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes the events of one step and the agent view captured after it.
    pub fn record(&mut self, events: &[Event], agents: &AgentView) {
        let mut step = None;
        for event in events {
            match event {
                Event::TimeAdvanced { step: advanced } => step = Some(*advanced),
                Event::PatientZeroSeeded { agent, .. } => {
                    self.cumulative.infections += 1;
                    self.patient_zero = Some((*agent, step.unwrap_or(self.last_step)));
                }
                Event::AgentInfected { .. } => self.cumulative.infections += 1,
                Event::AgentRecovered {
                    adopted_face_cover, ..
                } => {
                    self.cumulative.recoveries += 1;
                    if *adopted_face_cover {
                        self.cumulative.masks_adopted += 1;
                    }
                }
                Event::AgentDied { .. } => self.cumulative.deaths += 1,
                Event::ImmunityWaned { .. } => self.cumulative.immunity_lost += 1,
                Event::DestinationChosen { .. }
                | Event::AgentMoved { .. }
                | Event::FieldDecayed { .. } => {}
            }
        }

        let Some(step) = step else {
            return;
        };
        self.last_step = step;
        self.positions.extend(agents.iter().map(|agent| PositionRecord {
            step,
            agent: agent.id,
            position: agent.position,
        }));
        self.timeline.push(IllnessTally::capture(step, agents));
    }

    /// Position records in capture order.
    #[must_use]
    pub fn positions(&self) -> &[PositionRecord] {
        &self.positions
    }

    /// Position records captured on the given step.
    pub fn positions_at(&self, step: u64) -> impl Iterator<Item = &PositionRecord> {
        self.positions
            .iter()
            .filter(move |record| record.step == step)
    }

    /// Tallies in capture order.
    #[must_use]
    pub fn timeline(&self) -> &[IllnessTally] {
        &self.timeline
    }

    /// Most recent tally, if any step was recorded.
    #[must_use]
    pub fn latest(&self) -> Option<&IllnessTally> {
        self.timeline.last()
    }

    /// Transition counters accumulated so far.
    #[must_use]
    pub const fn cumulative(&self) -> &CumulativeCounts {
        &self.cumulative
    }

    /// Summarises the run observed so far.
    #[must_use]
    pub fn report(&self) -> RunReport {
        let (peak_step, peak_infected) = self
            .timeline
            .iter()
            .fold((0, 0), |(best_step, best), tally| {
                if tally.infected > best {
                    (tally.step, tally.infected)
                } else {
                    (best_step, best)
                }
            });

        RunReport {
            steps: self.last_step,
            patient_zero: self.patient_zero.map(|(agent, _)| agent),
            seeded_at: self.patient_zero.map(|(_, step)| step),
            peak_infected,
            peak_step,
            cumulative: self.cumulative,
            final_tally: self.latest().copied().unwrap_or_default(),
            timeline: self.timeline.clone(),
        }
    }
}
