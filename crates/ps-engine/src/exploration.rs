//! Strategies to derive the next generation of search points.

use std::collections::BTreeSet;

use ps_space::{extend_by_shifting, SearchPoint};
use ps_types::Generation;

/// Strategy producing the next points to evaluate from a scored
/// generation. The result has the same cardinality as the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Exploration {
    /// Keep the best half of the generation and pad with shift-neighbours
    /// of the kept points.
    #[default]
    ShiftAndKeepBestHalf,
}

impl Exploration {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ShiftAndKeepBestHalf => "shift_and_keep_best_half",
        }
    }

    /// The next points to evaluate, preserving the generation size.
    pub fn next_points(&self, generation: &Generation) -> BTreeSet<SearchPoint> {
        match self {
            Self::ShiftAndKeepBestHalf => {
                let keep = generation.len().div_ceil(2);
                let seed: BTreeSet<SearchPoint> = generation
                    .iter()
                    .take(keep)
                    .map(|ps| ps.point().clone())
                    .collect();
                extend_by_shifting(&seed, generation.len())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use ps_space::{SearchSpace, SpaceHandle};
    use ps_types::{PointScore, Score};

    fn scored(space: &Arc<SearchSpace>, coords: Vec<i64>, objective: f64) -> PointScore {
        PointScore::new(
            space.point(coords).unwrap(),
            Score::new(BTreeSet::new(), BTreeSet::new(), BTreeSet::new(), objective),
        )
    }

    #[test]
    fn preserves_size_and_keeps_best_half() {
        let space = Arc::new(
            SearchSpace::new()
                .add_int("order", 1, 6)
                .add_int("level", 0, 4),
        );
        let generation: Generation = (1..=6)
            .map(|i| scored(&space, vec![i, 2], i as f64))
            .collect();

        let next = Exploration::ShiftAndKeepBestHalf.next_points(&generation);
        assert_eq!(next.len(), 6);

        // The best three (smallest objective) survive into the next set.
        for i in 1..=3 {
            assert!(next.contains(&space.point(vec![i, 2]).unwrap()));
        }
    }

    #[test]
    fn odd_generation_keeps_ceil_half() {
        let space = Arc::new(SearchSpace::new().add_int("order", 1, 9));
        let generation: Generation = (1..=5)
            .map(|i| scored(&space, vec![i], i as f64))
            .collect();

        let next = Exploration::ShiftAndKeepBestHalf.next_points(&generation);
        assert_eq!(next.len(), 5);
        for i in 1..=3 {
            assert!(next.contains(&space.point(vec![i]).unwrap()));
        }
    }
}
