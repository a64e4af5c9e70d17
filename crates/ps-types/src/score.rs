//! Scoring records and their total order.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use ps_space::SearchPoint;

/// The score of one task execution against a constraining specification.
///
/// Ordering is ascending lexicographic on (hard failures, soft failures,
/// objective): fewer failures are better, and a smaller objective is
/// better, so the *minimum* under this order is the best score. Successes
/// do not steer the primary ordering; they are compared last only so that
/// equality and ordering agree. The objective is compared with
/// [`f64::total_cmp`], which makes the order total and treats NaN as equal
/// to NaN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Score {
    successes: BTreeSet<usize>,
    hard_failures: BTreeSet<usize>,
    soft_failures: BTreeSet<usize>,
    objective: f64,
}

impl Score {
    pub fn new(
        successes: BTreeSet<usize>,
        hard_failures: BTreeSet<usize>,
        soft_failures: BTreeSet<usize>,
        objective: f64,
    ) -> Self {
        Self {
            successes,
            hard_failures,
            soft_failures,
            objective,
        }
    }

    pub fn successes(&self) -> &BTreeSet<usize> {
        &self.successes
    }

    pub fn hard_failures(&self) -> &BTreeSet<usize> {
        &self.hard_failures
    }

    pub fn soft_failures(&self) -> &BTreeSet<usize> {
        &self.soft_failures
    }

    pub fn objective(&self) -> f64 {
        self.objective
    }

    /// True when no failure of either kind was recorded.
    pub fn is_clean(&self) -> bool {
        self.hard_failures.is_empty() && self.soft_failures.is_empty()
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hard_failures
            .cmp(&other.hard_failures)
            .then_with(|| self.soft_failures.cmp(&other.soft_failures))
            .then_with(|| self.objective.total_cmp(&other.objective))
            .then_with(|| self.successes.cmp(&other.successes))
    }
}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Score {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Score {}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{successes {:?}, hard_failures {:?}, soft_failures {:?}, objective {}}}",
            self.successes, self.hard_failures, self.soft_failures, self.objective
        )
    }
}

/// A search point together with the score its execution earned.
///
/// Ordered primarily by score, breaking ties by point; the minimum element
/// of a generation is its best.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointScore {
    point: SearchPoint,
    score: Score,
}

impl PointScore {
    pub fn new(point: SearchPoint, score: Score) -> Self {
        Self { point, score }
    }

    pub fn point(&self) -> &SearchPoint {
        &self.point
    }

    pub fn score(&self) -> &Score {
        &self.score
    }
}

impl Ord for PointScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .cmp(&other.score)
            .then_with(|| self.point.cmp(&other.point))
    }
}

impl PartialOrd for PointScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PointScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}: {}}}", self.point, self.score)
    }
}

/// The scored generation produced by one iteration of the parallel runner.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Generation {
    scores: BTreeSet<PointScore>,
}

impl Generation {
    pub fn from_scores(scores: BTreeSet<PointScore>) -> Self {
        Self { scores }
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// The best point score: the minimum under the [`PointScore`] order.
    pub fn best(&self) -> Option<&PointScore> {
        self.scores.iter().next()
    }

    /// Iterate best-first.
    pub fn iter(&self) -> impl Iterator<Item = &PointScore> {
        self.scores.iter()
    }
}

impl FromIterator<PointScore> for Generation {
    fn from_iter<T: IntoIterator<Item = PointScore>>(iter: T) -> Self {
        Self {
            scores: iter.into_iter().collect(),
        }
    }
}
