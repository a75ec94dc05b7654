//! Tuning knobs for every adjustable aspect of the simulation.
//!
//! All sections deserialize with `#[serde(default)]`, so a configuration file
//! only needs to name the values it overrides.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ActivityLevel, VIRUS_LAYER};

/// Seed used when a configuration does not provide one.
pub const DEFAULT_SEED: u64 = 0x5eed_c0de_2020_0311;

/// Aggregated configuration for a simulation run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Controls how the initial population is generated.
    pub population: PopulationTuning,
    /// Governs infection, hospitalisation, and immunity.
    pub illness: IllnessTuning,
    /// Configures virus deposit and decay.
    pub field: FieldTuning,
    /// Controls the random seed and the seeding event.
    pub schedule: ScheduleTuning,
}

impl SimulationConfig {
    /// Checks every section for values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.population.validate()?;
        self.illness.validate()?;
        self.field.validate()
    }
}

/// Parameters of the population generator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationTuning {
    /// Number of agents created at setup.
    pub agent_count: u32,
    /// Youngest age drawn, inclusive.
    pub min_age: u32,
    /// Oldest age drawn, inclusive.
    pub max_age: u32,
    /// Chance that a new agent wears a face covering.
    pub face_cover_probability: f64,
    /// Chance that a new agent is vaccinated.
    pub vaccination_probability: f64,
    /// Activity levels drawn uniformly for new agents.
    pub activity_levels: Vec<ActivityLevel>,
}

impl PopulationTuning {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_age > self.max_age {
            return Err(ConfigError::InvertedAgeRange {
                min: self.min_age,
                max: self.max_age,
            });
        }
        if self.activity_levels.is_empty() {
            return Err(ConfigError::NoActivityLevels);
        }
        check_probability("population.face_cover_probability", self.face_cover_probability)?;
        check_probability(
            "population.vaccination_probability",
            self.vaccination_probability,
        )
    }
}

impl Default for PopulationTuning {
    fn default() -> Self {
        Self {
            agent_count: 100,
            min_age: 10,
            max_age: 100,
            face_cover_probability: 0.5,
            vaccination_probability: 0.5,
            activity_levels: ActivityLevel::ALL.to_vec(),
        }
    }
}

/// Parameters of the per-agent illness progression.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IllnessTuning {
    /// Concentration that corresponds to certain infection.
    pub infection_scale: f64,
    /// Multiplier applied to the infection chance of masked agents.
    pub mask_infection_factor: f64,
    /// Consecutive hospital steps before death and recovery are rolled.
    pub hospital_threshold: u32,
    /// Death chance at age 100; scales linearly with age.
    pub death_scale: f64,
    /// Chance of recovering on each eligible hospital step.
    pub recovery_probability: f64,
    /// Chance that an unmasked agent starts wearing a face covering on recovery.
    pub mask_adoption_probability: f64,
    /// Steps a recovered agent stays immune.
    pub immunity_duration: u32,
}

impl IllnessTuning {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.infection_scale.is_nan() || self.infection_scale <= 0.0 {
            return Err(ConfigError::NonPositiveInfectionScale(self.infection_scale));
        }
        check_probability("illness.mask_infection_factor", self.mask_infection_factor)?;
        check_probability("illness.death_scale", self.death_scale)?;
        check_probability("illness.recovery_probability", self.recovery_probability)?;
        check_probability(
            "illness.mask_adoption_probability",
            self.mask_adoption_probability,
        )
    }
}

impl Default for IllnessTuning {
    fn default() -> Self {
        Self {
            infection_scale: 1_000.0,
            mask_infection_factor: 0.05,
            hospital_threshold: 300,
            death_scale: 0.05,
            recovery_probability: 0.2,
            mask_adoption_probability: 0.4,
            immunity_duration: 500,
        }
    }
}

/// Parameters of the virus concentration field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldTuning {
    /// Name of the grid property layer holding the field.
    pub layer: String,
    /// Amount an unmasked infected agent sheds per step.
    pub deposit_unmasked: f64,
    /// Amount a masked infected agent sheds per step.
    pub deposit_masked: f64,
    /// Amount removed from every cell when the field decays.
    pub decay_amount: f64,
    /// Steps between decays; zero disables decay.
    pub decay_interval: u64,
}

impl FieldTuning {
    fn validate(&self) -> Result<(), ConfigError> {
        check_non_negative("field.deposit_unmasked", self.deposit_unmasked)?;
        check_non_negative("field.deposit_masked", self.deposit_masked)?;
        check_non_negative("field.decay_amount", self.decay_amount)
    }
}

impl Default for FieldTuning {
    fn default() -> Self {
        Self {
            layer: VIRUS_LAYER.to_owned(),
            deposit_unmasked: 10.0,
            deposit_masked: 1.0,
            decay_amount: 1.0,
            decay_interval: 5,
        }
    }
}

/// Parameters of the orchestrator schedule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleTuning {
    /// Seed of the single random source shared by the run.
    pub seed: u64,
    /// Step on which patient zero is seeded.
    pub warm_up_steps: u64,
    /// Drops dead agents from grid occupancy instead of keeping them inert.
    pub remove_dead: bool,
}

impl Default for ScheduleTuning {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            warm_up_steps: 100,
            remove_dead: false,
        }
    }
}

/// Reasons a configuration is rejected.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// A probability lies outside `[0, 1]`.
    #[error("`{field}` must lie within [0, 1] (received {value})")]
    ProbabilityOutOfRange {
        /// Dotted path of the offending setting.
        field: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// An amount that must not be negative is negative.
    #[error("`{field}` must not be negative (received {value})")]
    NegativeAmount {
        /// Dotted path of the offending setting.
        field: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// The age range is inverted.
    #[error("minimum age {min} exceeds maximum age {max}")]
    InvertedAgeRange {
        /// Configured minimum age.
        min: u32,
        /// Configured maximum age.
        max: u32,
    },
    /// The infection scale cannot turn concentrations into probabilities.
    #[error("infection scale must be positive (received {0})")]
    NonPositiveInfectionScale(f64),
    /// The population lists no activity level to draw from.
    #[error("population must allow at least one activity level")]
    NoActivityLevels,
}

fn check_probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ProbabilityOutOfRange { field, value })
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NegativeAmount { field, value })
    }
}
