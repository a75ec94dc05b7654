use outbreak_core::{BuildingKind, IllnessState, Position};
use outbreak_world::BuildingRegistry;
use rand::{seq::SliceRandom, Rng};

/// Chooses where an idle agent heads next.
///
/// Infected agents seek a hospital, agents away from home return there, and
/// agents at home pick one of the errand categories uniformly. Concrete cells
/// are drawn uniformly from the registry.
#[derive(Clone, Debug)]
pub struct DestinationPolicy {
    registry: BuildingRegistry,
}

impl DestinationPolicy {
    /// Creates a policy drawing destinations from the registry.
    #[must_use]
    pub const fn new(registry: BuildingRegistry) -> Self {
        Self { registry }
    }

    /// Registry the policy draws from.
    #[must_use]
    pub const fn registry(&self) -> &BuildingRegistry {
        &self.registry
    }

    /// Category an agent in the given state heads for.
    pub fn category<R>(
        &self,
        illness: IllnessState,
        position: Position,
        home: Position,
        rng: &mut R,
    ) -> BuildingKind
    where
        R: Rng + ?Sized,
    {
        if illness == IllnessState::Infected {
            return BuildingKind::Hospital;
        }
        if position != home {
            return BuildingKind::House;
        }
        BuildingKind::ERRANDS
            .choose(rng)
            .copied()
            .unwrap_or(BuildingKind::Shop)
    }

    /// Picks a destination category and cell.
    ///
    /// Returns `None` when the chosen category has no registered position.
    pub fn choose<R>(
        &self,
        illness: IllnessState,
        position: Position,
        home: Position,
        rng: &mut R,
    ) -> Option<(BuildingKind, Position)>
    where
        R: Rng + ?Sized,
    {
        let kind = self.category(illness, position, home, rng);
        if kind == BuildingKind::House {
            return Some((kind, home));
        }
        self.registry
            .positions(kind)
            .choose(rng)
            .map(|destination| (kind, *destination))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn policy() -> DestinationPolicy {
        DestinationPolicy::new(BuildingRegistry::from_positions([
            (BuildingKind::House, vec![Position::new(0, 0)]),
            (BuildingKind::Shop, vec![Position::new(1, 0), Position::new(2, 0)]),
            (BuildingKind::Library, vec![Position::new(3, 0)]),
            (BuildingKind::FastFood, vec![Position::new(4, 0)]),
            (BuildingKind::Hospital, vec![Position::new(5, 0)]),
        ]))
    }

    #[test]
    fn infected_agents_head_to_hospital() {
        let policy = policy();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let home = Position::new(0, 0);

        for position in [home, Position::new(3, 0)] {
            assert_eq!(
                policy.choose(IllnessState::Infected, position, home, &mut rng),
                Some((BuildingKind::Hospital, Position::new(5, 0)))
            );
        }
    }

    #[test]
    fn agents_away_from_home_return_home() {
        let policy = policy();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let home = Position::new(0, 0);

        for illness in [IllnessState::Susceptible, IllnessState::Recovered] {
            assert_eq!(
                policy.choose(illness, Position::new(4, 0), home, &mut rng),
                Some((BuildingKind::House, home))
            );
        }
    }

    #[test]
    fn agents_at_home_run_errands() {
        let policy = policy();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let home = Position::new(0, 0);
        let mut seen = Vec::new();

        for _ in 0..200 {
            let (kind, destination) = policy
                .choose(IllnessState::Susceptible, home, home, &mut rng)
                .expect("errand categories are populated");
            assert!(BuildingKind::ERRANDS.contains(&kind));
            assert!(policy.registry().is_kind(destination, kind));
            if !seen.contains(&kind) {
                seen.push(kind);
            }
        }

        assert_eq!(seen.len(), BuildingKind::ERRANDS.len());
    }

    #[test]
    fn empty_category_yields_no_destination() {
        let policy = DestinationPolicy::new(BuildingRegistry::from_positions([(
            BuildingKind::House,
            vec![Position::new(0, 0)],
        )]));
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let home = Position::new(0, 0);

        assert_eq!(
            policy.choose(IllnessState::Infected, home, home, &mut rng),
            None
        );
        assert_eq!(
            policy.choose(IllnessState::Susceptible, home, home, &mut rng),
            None
        );
    }
}
