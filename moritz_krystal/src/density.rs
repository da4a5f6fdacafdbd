// DensityInputKrystal: the krystal that drives an expansion.
//
// Its values say how many output values each moment produces; its
// structure says how fast planets move along their paths. The latter is
// captured by `relative_planet_point_positions`: one position in [0, 1]
// per value, spaced so that values sharing a level are evenly spaced
// inside the span of their enclosing coarser group.
//
// The positions are built level by level. The first value is pinned at 0
// and the last at 1, even when the last value sits deeper than level 1;
// a trailing span therefore always ends at the last value rather than at
// a virtual 1 past it, which keeps the path ending on its terminal point.
// Each pass takes the spans between already-fixed
// positions and divides each one evenly among the values of the current
// level that fall inside it. Deeper values are left for later passes, so
// a coarse boundary is never moved once placed. The per-level step is a
// pure function over a `Subdivision` so it can be tested on its own.

use serde::{Deserialize, Serialize};

use crate::input::InputKrystal;
use crate::krystal::{Krystal, LeveledValue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Krystal", into = "Krystal")]
pub struct DensityInputKrystal {
    input: InputKrystal,
    relative_planet_point_positions: Vec<f32>,
}

impl DensityInputKrystal {
    pub fn new(krystal: Krystal) -> Self {
        let relative_planet_point_positions = calculate_relative_positions(&krystal);
        DensityInputKrystal {
            input: InputKrystal::new(krystal),
            relative_planet_point_positions,
        }
    }

    pub fn input(&self) -> &InputKrystal {
        &self.input
    }

    pub fn krystal(&self) -> &Krystal {
        self.input.krystal()
    }

    pub fn name(&self) -> &str {
        self.input.name()
    }

    pub fn level(&self) -> u32 {
        self.input.level()
    }

    pub fn num_values(&self) -> u32 {
        self.input.num_values()
    }

    pub fn leveled_values(&self) -> Vec<LeveledValue> {
        self.input.leveled_values()
    }

    /// One position per value: non-decreasing, first 0.0, last 1.0 (a
    /// single-value krystal yields just `[0.0]`).
    pub fn relative_planet_point_positions(&self) -> &[f32] {
        &self.relative_planet_point_positions
    }
}

impl From<Krystal> for DensityInputKrystal {
    fn from(krystal: Krystal) -> Self {
        DensityInputKrystal::new(krystal)
    }
}

impl From<DensityInputKrystal> for Krystal {
    fn from(density: DensityInputKrystal) -> Self {
        density.input.into_krystal()
    }
}

/// Positions placed so far, and which of them are final.
#[derive(Debug, Clone, PartialEq)]
pub struct Subdivision {
    pub positions: Vec<f32>,
    pub fixed: Vec<bool>,
}

impl Subdivision {
    /// `n` positions with only the endpoints fixed (0 and 1).
    pub fn pinned(n: usize) -> Self {
        let mut positions = vec![0.0; n];
        let mut fixed = vec![false; n];
        if n > 0 {
            fixed[0] = true;
            fixed[n - 1] = true;
            if n > 1 {
                positions[n - 1] = 1.0;
            }
        }
        Subdivision { positions, fixed }
    }
}

/// Place every value at `level` between the fixed positions enclosing it.
///
/// Each span between two consecutive fixed positions is divided into
/// `k + 1` equal sections, where `k` is the number of values at exactly
/// `level` strictly inside the span. Those values then become fixed.
pub fn subdivide_level(levels: &[u32], mut state: Subdivision, level: u32) -> Subdivision {
    let anchors: Vec<usize> = (0..levels.len()).filter(|&i| state.fixed[i]).collect();
    for pair in anchors.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        let members: Vec<usize> = (start + 1..end).filter(|&i| levels[i] == level).collect();
        if members.is_empty() {
            continue;
        }
        let from = state.positions[start];
        let to = state.positions[end];
        let sections = (members.len() + 1) as f32;
        for (j, &i) in members.iter().enumerate() {
            state.positions[i] = from + (to - from) * ((j + 1) as f32 / sections);
            state.fixed[i] = true;
        }
    }
    state
}

/// Relative planet point positions of a krystal.
pub fn calculate_relative_positions(krystal: &Krystal) -> Vec<f32> {
    let n = krystal.num_values() as usize;
    if n <= 1 {
        return vec![0.0; n];
    }
    if krystal.level() <= 1 {
        let last = (n - 1) as f32;
        return (0..n).map(|i| i as f32 / last).collect();
    }

    let levels: Vec<u32> = krystal.leveled_values().iter().map(|lv| lv.level).collect();
    let max_level = krystal.level() + 1;
    let mut state = Subdivision::pinned(n);
    for level in 1..=max_level {
        state = subdivide_level(&levels, state, level);
    }
    state.positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::krystal::{KrystalKind, PermutationHeredity};
    use crate::strand::Strand;

    fn krystal(strands: &[(u32, &[u32])]) -> Krystal {
        let strands = strands
            .iter()
            .map(|&(level, values)| Strand::new(level, values.to_vec()).unwrap())
            .collect();
        let kind = KrystalKind::Permutation(PermutationHeredity {
            source: "s".into(),
            permutation_level: 1,
            contour: 0,
        });
        Krystal::new("k", kind, strands).unwrap()
    }

    fn assert_close(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-6, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn test_line_is_evenly_spaced() {
        let d = DensityInputKrystal::new(Krystal::line(vec![1, 2, 3, 4, 5], 1).unwrap());
        assert_eq!(
            d.relative_planet_point_positions(),
            &[0.0, 0.25, 0.5, 0.75, 1.0]
        );
    }

    #[test]
    fn test_single_value() {
        let d = DensityInputKrystal::new(Krystal::constant(4, 1).unwrap());
        assert_eq!(d.relative_planet_point_positions(), &[0.0]);
    }

    #[test]
    fn test_two_levels_nested_spacing() {
        // (a b)(c d)(e f)(g h)(i): nine values, evenly spaced by nesting.
        let k = krystal(&[
            (1, &[1, 1]),
            (2, &[1, 1]),
            (2, &[1, 1]),
            (2, &[1, 1]),
            (2, &[1]),
        ]);
        let expected: Vec<f32> = (0..9).map(|i| i as f32 / 8.0).collect();
        assert_close(&calculate_relative_positions(&k), &expected);
    }

    #[test]
    fn test_uneven_groups() {
        // (a b c)(d): the first group is split in thirds of the half before d.
        let k = krystal(&[(1, &[1, 1, 1]), (2, &[1, 1])]);
        let positions = calculate_relative_positions(&k);
        // levels: 1 3 3 2 3 -> d at 0.5, b/c at 1/6 and 2/6, last pinned at 1.
        assert_close(&positions, &[0.0, 1.0 / 6.0, 2.0 / 6.0, 0.5, 1.0]);
    }

    #[test]
    fn test_positions_properties() {
        let k = krystal(&[
            (1, &[3, 1, 2]),
            (3, &[1, 1]),
            (2, &[4]),
            (3, &[2, 2, 2, 2]),
            (2, &[1, 5]),
        ]);
        let positions = calculate_relative_positions(&k);
        assert_eq!(positions.len(), k.num_values() as usize);
        assert_eq!(positions[0], 0.0);
        assert_eq!(*positions.last().unwrap(), 1.0);
        for pair in positions.windows(2) {
            assert!(pair[0] <= pair[1], "{positions:?}");
        }
    }

    #[test]
    fn test_recalculation_is_bit_identical() {
        let k = krystal(&[(1, &[1, 2]), (3, &[3]), (2, &[4, 5, 6]), (3, &[7])]);
        let first = calculate_relative_positions(&k);
        let second = calculate_relative_positions(&k);
        let first_bits: Vec<u32> = first.iter().map(|p| p.to_bits()).collect();
        let second_bits: Vec<u32> = second.iter().map(|p| p.to_bits()).collect();
        assert_eq!(first_bits, second_bits);
    }

    #[test]
    fn test_subdivide_single_level_step() {
        let levels = [1, 3, 2, 3, 2, 3];
        let state = subdivide_level(&levels, Subdivision::pinned(6), 2);
        assert_close(&state.positions, &[0.0, 0.0, 1.0 / 3.0, 0.0, 2.0 / 3.0, 1.0]);
        assert_eq!(state.fixed, vec![true, false, true, false, true, true]);
    }
}
