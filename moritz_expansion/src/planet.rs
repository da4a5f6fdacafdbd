// Planet: a value that moves along a path across the moments of a density
// krystal.
//
// The path is a sequence of subpaths (point groups), each covering a
// contiguous run of moments. Subpath `k` starts at `start_moment` (1-based)
// and has `count` points; together the subpaths cover every moment of the
// density input exactly once. Every subpath has at least one point and the
// last has at least two, so the planet's final point lands on the
// template's terminal point.
//
// Two operations mutate a planet in place:
// - `normalise_subpaths` repairs start moments after editing and derives
//   the counts from them.
// - `adjust_subpath_counts_to_density_input` moves the subpath boundaries
//   onto a different density krystal of the same family, by walking both
//   krystals' leveled values in lock-step and matching levels. `rebase`
//   does the same starting from the planet's original layout.
//
// The original layout is the one the planet was created, loaded or last
// edited with. Editing through the mutators makes the current density
// krystal and layout the new original, so re-basing never drops an edit.
// Every mutation is computed on a copy and committed only on success.
//
// The density krystal is shared read-only through an `Arc`; its lifetime
// belongs to whoever loaded it.

use std::sync::Arc;

use log::{debug, warn};
use moritz_krystal::{DensityInputKrystal, KrystalRepository, LeveledValue};
use serde::{Deserialize, Serialize};

use crate::error::ExpansionError;
use crate::geometry::Point;
use crate::point_group::PointGroup;

#[derive(Debug, Clone)]
pub struct Planet {
    subpaths: Vec<PointGroup>,
    density_input: Arc<DensityInputKrystal>,
    original_density_name: String,
    original_subpaths: Vec<PointGroup>,
    is_saved: bool,
}

/// Persisted form of a planet: its subpaths and the name of the density
/// krystal they are laid out against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanetRecord {
    pub density_input: String,
    pub subpaths: Vec<PointGroup>,
}

impl Planet {
    /// Create a planet over `density_input`. All subpaths must carry the
    /// same single planet value; start moments are normalised and counts
    /// derived. The resulting layout becomes the planet's original layout.
    pub fn new(
        density_input: Arc<DensityInputKrystal>,
        subpaths: Vec<PointGroup>,
    ) -> Result<Self, ExpansionError> {
        let Some(first) = subpaths.first() else {
            return Err(ExpansionError::InvalidStructure(
                "planet has no subpaths".to_string(),
            ));
        };
        let value = first.value.clone();
        if value.len() != 1 || subpaths.iter().any(|s| s.value != value) {
            return Err(ExpansionError::InvalidStructure(
                "planet subpaths must share a single planet value".to_string(),
            ));
        }

        let mut planet = Planet {
            original_density_name: density_input.name().to_string(),
            density_input,
            subpaths,
            original_subpaths: Vec::new(),
            is_saved: false,
        };
        planet.normalise_subpaths()?;
        planet.original_subpaths = planet.subpaths.clone();
        Ok(planet)
    }

    /// Rebuild a planet from its persisted form, loading the density
    /// krystal by name.
    pub fn from_record<R: KrystalRepository + ?Sized>(
        record: PlanetRecord,
        krystals: &R,
    ) -> Result<Self, ExpansionError> {
        let density_input = krystals.load_density_input(&record.density_input)?;
        let mut planet = Planet::new(density_input, record.subpaths)?;
        planet.is_saved = true;
        Ok(planet)
    }

    pub fn to_record(&self) -> PlanetRecord {
        PlanetRecord {
            density_input: self.density_input.name().to_string(),
            subpaths: self.subpaths.clone(),
        }
    }

    pub fn subpaths(&self) -> &[PointGroup] {
        &self.subpaths
    }

    pub fn density_input(&self) -> &Arc<DensityInputKrystal> {
        &self.density_input
    }

    pub fn original_density_name(&self) -> &str {
        &self.original_density_name
    }

    pub fn original_subpaths(&self) -> &[PointGroup] {
        &self.original_subpaths
    }

    pub fn is_saved(&self) -> bool {
        self.is_saved
    }

    pub(crate) fn mark_saved(&mut self) {
        self.is_saved = true;
    }

    /// The planet's value, shared by every subpath.
    pub fn value(&self) -> u32 {
        self.subpaths[0].value[0]
    }

    /// Insert a subpath before `index` and re-normalise. The subpath takes
    /// the planet's value.
    pub fn insert_subpath(
        &mut self,
        index: usize,
        mut subpath: PointGroup,
    ) -> Result<(), ExpansionError> {
        if index > self.subpaths.len() {
            return Err(ExpansionError::InvalidStructure(format!(
                "subpath index {index} out of range"
            )));
        }
        subpath.value = vec![self.value()];
        let mut subpaths = self.subpaths.clone();
        subpaths.insert(index, subpath);
        self.commit_edit(subpaths)
    }

    /// Remove a subpath and re-normalise. A planet keeps at least one.
    pub fn remove_subpath(&mut self, index: usize) -> Result<PointGroup, ExpansionError> {
        if index >= self.subpaths.len() || self.subpaths.len() == 1 {
            return Err(ExpansionError::InvalidStructure(format!(
                "cannot remove subpath {index} of {}",
                self.subpaths.len()
            )));
        }
        let mut subpaths = self.subpaths.clone();
        let removed = subpaths.remove(index);
        self.commit_edit(subpaths)?;
        Ok(removed)
    }

    /// Move a subpath's start moment and re-normalise.
    pub fn set_start_moment(
        &mut self,
        index: usize,
        start_moment: u32,
    ) -> Result<(), ExpansionError> {
        let mut subpaths = self.subpaths.clone();
        let subpath = subpaths.get_mut(index).ok_or_else(|| {
            ExpansionError::InvalidStructure(format!("subpath index {index} out of range"))
        })?;
        subpath.start_moment = start_moment;
        self.commit_edit(subpaths)
    }

    /// Normalise edited `subpaths` over the current density krystal and
    /// make them the original layout.
    fn commit_edit(&mut self, mut subpaths: Vec<PointGroup>) -> Result<(), ExpansionError> {
        normalise_layout(&mut subpaths, self.density_input.num_values())?;
        self.subpaths = subpaths;
        self.original_subpaths = self.subpaths.clone();
        self.original_density_name = self.density_input.name().to_string();
        self.is_saved = false;
        Ok(())
    }

    /// Force strictly increasing start moments starting at 1, keep the last
    /// subpath at least two moments long, and derive every count.
    pub fn normalise_subpaths(&mut self) -> Result<(), ExpansionError> {
        let mut subpaths = self.subpaths.clone();
        normalise_layout(&mut subpaths, self.density_input.num_values())?;
        self.subpaths = subpaths;
        self.is_saved = false;
        Ok(())
    }

    /// Move the subpath boundaries from `original` (the density krystal the
    /// current layout belongs to) onto `new`, then normalise.
    pub fn adjust_subpath_counts_to_density_input(
        &mut self,
        original: &DensityInputKrystal,
        new: Arc<DensityInputKrystal>,
    ) -> Result<(), ExpansionError> {
        let total: u32 = self.subpaths.iter().map(|s| s.count).sum();
        if total != original.num_values() {
            return Err(ExpansionError::InvalidStructure(format!(
                "planet covers {total} moments but {} has {} values",
                original.name(),
                original.num_values()
            )));
        }

        let starts: Vec<u32> = self.subpaths.iter().map(|s| s.start_moment).collect();
        let new_starts = if original.num_values() == new.num_values() {
            starts
        } else {
            remap_start_moments(&original.leveled_values(), &new.leveled_values(), &starts)
        };
        debug!(
            "planet {}: re-based from {} to {}: {:?}",
            self.value(),
            original.name(),
            new.name(),
            new_starts
        );
        let mut subpaths = self.subpaths.clone();
        for (subpath, start) in subpaths.iter_mut().zip(new_starts) {
            subpath.start_moment = start;
        }
        normalise_layout(&mut subpaths, new.num_values())?;
        self.subpaths = subpaths;
        self.density_input = new;
        self.is_saved = false;
        Ok(())
    }

    /// Restore the original layout, then move it onto `new`. The original
    /// density krystal is loaded by name unless the planet is already on it.
    pub fn rebase<R: KrystalRepository + ?Sized>(
        &mut self,
        krystals: &R,
        new: Arc<DensityInputKrystal>,
    ) -> Result<(), ExpansionError> {
        let mut planet = self.clone();
        planet.subpaths = self.original_subpaths.clone();
        if new.name() == self.original_density_name {
            planet.density_input = new;
            planet.normalise_subpaths()?;
        } else {
            let original = if self.density_input.name() == self.original_density_name {
                self.density_input.clone()
            } else {
                krystals.load_density_input(&self.original_density_name)?
            };
            planet.adjust_subpath_counts_to_density_input(&original, new)?;
        }
        *self = planet;
        Ok(())
    }

    /// One point per moment of the density input.
    ///
    /// Each subpath spans from its first moment to the first moment of the
    /// next subpath; the last subpath spans to its own last moment.
    pub fn path_points(&self) -> Result<Vec<Point>, ExpansionError> {
        let positions = self.density_input.relative_planet_point_positions();
        let mut points = Vec::with_capacity(positions.len());
        for (k, subpath) in self.subpaths.iter().enumerate() {
            let first = subpath.start_moment as usize - 1;
            let span_end = match self.subpaths.get(k + 1) {
                Some(next) => next.start_moment as usize - 1,
                None => first + subpath.count as usize - 1,
            };
            points.extend(subpath.planet_points(positions, first, span_end)?);
        }
        Ok(points)
    }
}

/// Normalise the start moments of `subpaths` for `moments` moments and
/// write the derived counts.
fn normalise_layout(subpaths: &mut [PointGroup], moments: u32) -> Result<(), ExpansionError> {
    let starts: Vec<u32> = subpaths.iter().map(|s| s.start_moment).collect();
    let starts = normalise_start_moments(&starts, moments)?;
    let counts = counts_from_start_moments(&starts, moments);
    for ((subpath, start), count) in subpaths.iter_mut().zip(starts).zip(counts) {
        subpath.start_moment = start;
        subpath.count = count;
    }
    Ok(())
}

/// Repair a sequence of 1-based start moments for `moments` moments.
///
/// Starts past the end are first clamped to `moments`. The first start
/// becomes 1; each later start is bumped past its
/// predecessor; the last is clamped to `moments - 1` (so the last subpath
/// has two points) with a backward cascade. Fails if the starts still
/// collide.
pub fn normalise_start_moments(starts: &[u32], moments: u32) -> Result<Vec<u32>, ExpansionError> {
    let unresolvable = || ExpansionError::UnresolvablePlanetLayout {
        subpaths: starts.len(),
        moments,
    };
    if starts.is_empty() {
        return Err(unresolvable());
    }

    let mut s: Vec<u32> = starts.iter().map(|&start| start.min(moments)).collect();
    s[0] = 1;
    for i in 1..s.len() {
        if s[i] <= s[i - 1] {
            let bumped = s[i - 1].saturating_add(1);
            debug!("subpath {i}: start moment {} bumped to {bumped}", s[i]);
            s[i] = bumped;
        }
    }

    let last_allowed = moments.saturating_sub(1);
    let last = s.len() - 1;
    if s[last] > last_allowed {
        debug!("last subpath: start moment {} clamped to {last_allowed}", s[last]);
        s[last] = last_allowed;
        for i in (0..last).rev() {
            if s[i] >= s[i + 1] {
                s[i] = s[i + 1].saturating_sub(1);
            }
        }
    }

    let increasing = s.windows(2).all(|w| w[0] < w[1]);
    if s[0] != 1 || !increasing || s[last] > last_allowed {
        return Err(unresolvable());
    }
    Ok(s)
}

/// Counts from normalised start moments, walking back from the last
/// subpath. The counts sum to `moments`.
pub fn counts_from_start_moments(starts: &[u32], moments: u32) -> Vec<u32> {
    let mut counts = vec![0; starts.len()];
    let mut end = moments + 1;
    for (i, &start) in starts.iter().enumerate().rev() {
        counts[i] = end - start;
        end = start;
    }
    counts
}

/// Lock-step cursors over a shorter and a longer leveled sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockStep {
    pub short: usize,
    pub long: usize,
}

impl LockStep {
    /// Both cursors on the first value.
    pub fn start() -> Self {
        LockStep { short: 0, long: 0 }
    }

    /// Move to the next value of the shorter sequence, advancing the longer
    /// cursor to the next value at the same level. `None` when either
    /// sequence runs out.
    pub fn advance(self, shorter: &[LeveledValue], longer: &[LeveledValue]) -> Option<LockStep> {
        let short = self.short + 1;
        let level = shorter.get(short)?.level;
        let long = (self.long + 1..longer.len()).find(|&j| longer[j].level == level)?;
        Some(LockStep { short, long })
    }
}

/// For each value of `shorter`, the index of its structural match in
/// `longer`. Values left unmatched when `longer` runs out map to its last
/// index.
pub fn match_indices(shorter: &[LeveledValue], longer: &[LeveledValue]) -> Vec<usize> {
    let mut matches = Vec::with_capacity(shorter.len());
    if shorter.is_empty() || longer.is_empty() {
        return matches;
    }
    let mut cursor = LockStep::start();
    matches.push(cursor.long);
    while let Some(next) = cursor.advance(shorter, longer) {
        matches.push(next.long);
        cursor = next;
    }
    if matches.len() < shorter.len() {
        warn!(
            "level matching ran out after {} of {} values; clamping the rest",
            matches.len(),
            shorter.len()
        );
        matches.resize(shorter.len(), longer.len() - 1);
    }
    matches
}

/// Map 1-based start moments laid out over `from` onto `to`.
///
/// When `to` is longer, each boundary moves to the structural match of its
/// value in `to`. When `to` is shorter, each boundary moves to the first
/// value of `to` whose match in `from` is at or after it. Either way
/// duplicates are possible and left for normalisation.
pub fn remap_start_moments(from: &[LeveledValue], to: &[LeveledValue], starts: &[u32]) -> Vec<u32> {
    if from.len() == to.len() || from.is_empty() || to.is_empty() {
        return starts.to_vec();
    }
    let boundary = |start: u32| (start.max(1) as usize - 1).min(from.len() - 1);

    if to.len() > from.len() {
        let matches = match_indices(from, to);
        starts
            .iter()
            .map(|&start| matches[boundary(start)] as u32 + 1)
            .collect()
    } else {
        let matches = match_indices(to, from);
        starts
            .iter()
            .map(|&start| {
                let b = boundary(start);
                let i = matches.iter().position(|&m| m >= b).unwrap_or(to.len() - 1);
                i as u32 + 1
            })
            .collect()
    }
}
