//! Search points and neighbour shifting.

use rand::seq::SliceRandom;
use rand::Rng;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::config::ParamValue;
use crate::space::SearchSpace;

/// A specific coordinate tuple in a [`SearchSpace`].
///
/// Points hold a shared handle to their space; comparisons are only
/// meaningful between points of the same space and order coordinates
/// lexicographically.
#[derive(Debug, Clone)]
pub struct SearchPoint {
    space: Arc<SearchSpace>,
    coordinates: Vec<i64>,
}

impl SearchPoint {
    pub(crate) fn new_unchecked(space: Arc<SearchSpace>, coordinates: Vec<i64>) -> Self {
        debug_assert_eq!(space.dimension(), coordinates.len());
        Self { space, coordinates }
    }

    pub fn space(&self) -> &Arc<SearchSpace> {
        &self.space
    }

    pub fn coordinates(&self) -> &[i64] {
        &self.coordinates
    }

    /// Materialise the value of the `index`-th parameter.
    pub fn value_at(&self, index: usize) -> Option<ParamValue> {
        self.space
            .parameters()
            .get(index)?
            .value_at(self.coordinates[index])
    }

    /// All points at Hamming distance 1, in deterministic order.
    pub fn neighbours(&self) -> Vec<SearchPoint> {
        let mut result = Vec::new();
        for (index, param) in self.space.parameters().iter().enumerate() {
            for delta in [-1i64, 1] {
                let candidate = self.coordinates[index] + delta;
                if param.contains(candidate) {
                    let mut coordinates = self.coordinates.clone();
                    coordinates[index] = candidate;
                    result.push(SearchPoint::new_unchecked(
                        Arc::clone(&self.space),
                        coordinates,
                    ));
                }
            }
        }
        result
    }

    /// A single random neighbour at Hamming distance 1, if any exists.
    pub fn random_shift<R: Rng>(&self, rng: &mut R) -> Option<SearchPoint> {
        let neighbours = self.neighbours();
        neighbours.choose(rng).cloned()
    }

    /// Produce `count` distinct points near this one: Hamming-1 neighbours
    /// first, padded by random shifts of already-selected points. The
    /// point itself is not included. The result is capped at the number of
    /// distinct points the space can supply (excluding this one).
    pub fn shifted(&self, count: usize) -> BTreeSet<SearchPoint> {
        let mut rng = rand::thread_rng();
        let available = self
            .space
            .total_points()
            .unwrap_or(usize::MAX)
            .saturating_sub(1);
        let target = count.min(available);

        let mut result: BTreeSet<SearchPoint> = BTreeSet::new();
        let mut neighbours = self.neighbours();
        neighbours.shuffle(&mut rng);
        for point in neighbours {
            if result.len() >= target {
                break;
            }
            result.insert(point);
        }

        pad_with_shifts(&mut result, self, target, &mut rng);
        result
    }
}

/// Grow `seed` to `target` points by randomly shifting its members, falling
/// back to an exhaustive scan when random shifts stop finding new points.
/// The seed is preserved; the result is capped at the total number of
/// points in the space.
pub fn extend_by_shifting(seed: &BTreeSet<SearchPoint>, target: usize) -> BTreeSet<SearchPoint> {
    let mut result = seed.clone();
    let Some(sample) = seed.iter().next() else {
        return result;
    };
    let space = Arc::clone(sample.space());
    let capped = target.min(space.total_points().unwrap_or(usize::MAX));
    let mut rng = rand::thread_rng();

    let mut attempts = 0usize;
    let budget = 64 * capped.max(1);
    while result.len() < capped && attempts < budget {
        attempts += 1;
        let index = rng.gen_range(0..result.len());
        let base = result
            .iter()
            .nth(index)
            .cloned()
            .unwrap_or_else(|| sample.clone());
        if let Some(shifted) = base.random_shift(&mut rng) {
            result.insert(shifted);
        }
    }
    if result.len() < capped {
        fill_by_scanning(&mut result, &space, capped);
    }
    result
}

fn pad_with_shifts<R: Rng>(
    result: &mut BTreeSet<SearchPoint>,
    origin: &SearchPoint,
    target: usize,
    rng: &mut R,
) {
    let mut attempts = 0usize;
    let budget = 64 * target.max(1);
    while result.len() < target && attempts < budget {
        attempts += 1;
        let base = if result.is_empty() {
            origin.clone()
        } else {
            let index = rng.gen_range(0..result.len());
            match result.iter().nth(index) {
                Some(point) => point.clone(),
                None => origin.clone(),
            }
        };
        if let Some(shifted) = base.random_shift(rng) {
            if &shifted != origin {
                result.insert(shifted);
            }
        }
    }
    if result.len() < target {
        let space = Arc::clone(origin.space());
        let mut scanned = result.clone();
        scanned.insert(origin.clone());
        fill_by_scanning(&mut scanned, &space, target + 1);
        scanned.remove(origin);
        *result = scanned;
    }
}

/// Deterministically walk the whole space inserting unseen points until
/// `target` is reached. Only used for small spaces where random shifting
/// stalls.
fn fill_by_scanning(result: &mut BTreeSet<SearchPoint>, space: &Arc<SearchSpace>, target: usize) {
    let dimension = space.dimension();
    if dimension == 0 {
        return;
    }
    let mut cursor: Vec<i64> = space
        .parameters()
        .iter()
        .map(|p| p.lower_coordinate())
        .collect();
    loop {
        if result.len() >= target {
            return;
        }
        result.insert(SearchPoint::new_unchecked(
            Arc::clone(space),
            cursor.clone(),
        ));
        // Odometer increment over the space.
        let mut index = 0;
        loop {
            if index == dimension {
                return;
            }
            let param = &space.parameters()[index];
            if cursor[index] < param.upper_coordinate() {
                cursor[index] += 1;
                break;
            }
            cursor[index] = param.lower_coordinate();
            index += 1;
        }
    }
}

impl PartialEq for SearchPoint {
    fn eq(&self, other: &Self) -> bool {
        self.coordinates == other.coordinates
    }
}

impl Eq for SearchPoint {}

impl PartialOrd for SearchPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SearchPoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.coordinates.cmp(&other.coordinates)
    }
}

impl fmt::Display for SearchPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (index, param) in self.space.parameters().iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", param.name(), self.coordinates[index])?;
        }
        write!(f, "}}")
    }
}
