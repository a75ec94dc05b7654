use outbreak_core::{Action, ActivityLevel, SimulationError};
use rand::{
    distributions::{Distribution, WeightedIndex},
    Rng,
};

/// Weighted `[StayInPlace, GoOut]` table derived from an activity level.
#[derive(Clone, Debug)]
pub struct ActionTable {
    activity: ActivityLevel,
    distribution: WeightedIndex<u32>,
}

impl ActionTable {
    /// Builds the table for the activity level.
    pub fn new(activity: ActivityLevel) -> Result<Self, SimulationError> {
        let distribution = WeightedIndex::new(activity.action_weights())
            .map_err(|_| SimulationError::InvalidActionWeights(activity))?;
        Ok(Self {
            activity,
            distribution,
        })
    }

    /// Activity level the table was built from.
    #[must_use]
    pub const fn activity(&self) -> ActivityLevel {
        self.activity
    }

    /// Draws the next idle action.
    pub fn draw<R>(&self, rng: &mut R) -> Result<Action, SimulationError>
    where
        R: Rng + ?Sized,
    {
        Action::from_index(self.distribution.sample(rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn stay_ratio(activity: ActivityLevel, draws: u32, seed: u64) -> f64 {
        let table = ActionTable::new(activity).expect("valid weights");
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let stays = (0..draws)
            .filter(|_| table.draw(&mut rng).expect("known slot") == Action::StayInPlace)
            .count();
        stays as f64 / f64::from(draws)
    }

    #[test]
    fn low_activity_stays_about_eighty_percent() {
        let ratio = stay_ratio(ActivityLevel::Low, 10_000, 0x10);
        assert!((0.77..=0.83).contains(&ratio), "stay ratio {ratio}");
    }

    #[test]
    fn medium_and_high_follow_their_weights() {
        let medium = stay_ratio(ActivityLevel::Medium, 10_000, 0x20);
        let high = stay_ratio(ActivityLevel::High, 10_000, 0x30);
        assert!((0.47..=0.53).contains(&medium), "medium stay ratio {medium}");
        assert!((0.17..=0.23).contains(&high), "high stay ratio {high}");
    }
}
