// Gamete: one half of an expander.
//
// A gamete is a set of fixed point groups (points that never move) plus a
// set of planets (one value each, moving across the moments of a density
// krystal). Its summaries count every fixed point once and every planet
// once, whatever the length of its path.
//
// `layout` evaluates all the geometry once; `GameteLayout::points_at` then
// gives the valued points present at a moment, fixed points first and
// planets after, in declaration order. Expansion and path rebuilding both
// search that list.

use std::sync::Arc;

use moritz_krystal::{DensityInputKrystal, KrystalRepository};
use serde::{Deserialize, Serialize};

use crate::error::ExpansionError;
use crate::geometry::{Point, ValuedPoint};
use crate::planet::{Planet, PlanetRecord};
use crate::point_group::PointGroup;

#[derive(Debug, Clone, Default)]
pub struct Gamete {
    fixed_point_groups: Vec<PointGroup>,
    planets: Vec<Planet>,
}

/// Persisted form of a gamete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameteRecord {
    #[serde(default)]
    pub fixed_point_groups: Vec<PointGroup>,
    #[serde(default)]
    pub planets: Vec<PlanetRecord>,
}

impl Gamete {
    pub fn new(
        fixed_point_groups: Vec<PointGroup>,
        planets: Vec<Planet>,
    ) -> Result<Self, ExpansionError> {
        for group in &fixed_point_groups {
            group.validate_fixed()?;
        }
        Ok(Gamete {
            fixed_point_groups,
            planets,
        })
    }

    pub fn from_record<R: KrystalRepository + ?Sized>(
        record: GameteRecord,
        krystals: &R,
    ) -> Result<Self, ExpansionError> {
        let planets = record
            .planets
            .into_iter()
            .map(|planet| Planet::from_record(planet, krystals))
            .collect::<Result<Vec<_>, _>>()?;
        Gamete::new(record.fixed_point_groups, planets)
    }

    pub fn to_record(&self) -> GameteRecord {
        GameteRecord {
            fixed_point_groups: self.fixed_point_groups.clone(),
            planets: self.planets.iter().map(Planet::to_record).collect(),
        }
    }

    pub fn fixed_point_groups(&self) -> &[PointGroup] {
        &self.fixed_point_groups
    }

    pub fn planets(&self) -> &[Planet] {
        &self.planets
    }

    pub fn planet(&self, index: usize) -> Option<&Planet> {
        self.planets.get(index)
    }

    pub fn add_fixed_point_group(&mut self, group: PointGroup) -> Result<(), ExpansionError> {
        group.validate_fixed()?;
        self.fixed_point_groups.push(group);
        Ok(())
    }

    pub fn add_planet(&mut self, planet: Planet) {
        self.planets.push(planet);
    }

    /// Every value in the gamete: each fixed point's value, then each
    /// planet's.
    pub fn values(&self) -> impl Iterator<Item = u32> + '_ {
        self.fixed_point_groups
            .iter()
            .flat_map(|g| g.value.iter().copied())
            .chain(self.planets.iter().map(Planet::value))
    }

    pub fn number_of_values(&self) -> u32 {
        self.values().count() as u32
    }

    /// Smallest value, 0 for an empty gamete.
    pub fn min_value(&self) -> u32 {
        self.values().min().unwrap_or(0)
    }

    /// Largest value, 0 for an empty gamete.
    pub fn max_value(&self) -> u32 {
        self.values().max().unwrap_or(0)
    }

    pub fn is_saved(&self) -> bool {
        self.planets.iter().all(Planet::is_saved)
    }

    pub(crate) fn mark_saved(&mut self) {
        for planet in &mut self.planets {
            planet.mark_saved();
        }
    }

    /// Same summaries, same number of groups and planets, and pairwise
    /// structurally equivalent fixed point groups.
    pub fn is_structurally_equivalent(&self, other: &Gamete) -> bool {
        self.min_value() == other.min_value()
            && self.max_value() == other.max_value()
            && self.number_of_values() == other.number_of_values()
            && self.fixed_point_groups.len() == other.fixed_point_groups.len()
            && self.planets.len() == other.planets.len()
            && self
                .fixed_point_groups
                .iter()
                .zip(&other.fixed_point_groups)
                .all(|(a, b)| a.is_structurally_equivalent(b))
    }

    /// Move every planet not already on `density` onto it, starting from
    /// the layout each planet was saved with.
    pub fn rebase_planets<R: KrystalRepository + ?Sized>(
        &mut self,
        krystals: &R,
        density: &Arc<DensityInputKrystal>,
    ) -> Result<(), ExpansionError> {
        for planet in &mut self.planets {
            if planet.density_input().name() != density.name() {
                planet.rebase(krystals, Arc::clone(density))?;
            }
        }
        Ok(())
    }

    /// Evaluate all point geometry. Planets must already be laid out over
    /// `moments` moments.
    pub fn layout(&self, moments: u32) -> Result<GameteLayout, ExpansionError> {
        let fixed = self
            .fixed_point_groups
            .iter()
            .flat_map(PointGroup::valued_fixed_points)
            .collect();
        let mut planets = Vec::with_capacity(self.planets.len());
        for planet in &self.planets {
            if planet.density_input().num_values() != moments {
                return Err(ExpansionError::InvalidStructure(format!(
                    "planet {} is laid out over {} moments, expected {moments}",
                    planet.value(),
                    planet.density_input().num_values()
                )));
            }
            planets.push((planet.value(), planet.path_points()?));
        }
        Ok(GameteLayout { fixed, planets })
    }
}

/// Evaluated points of a gamete.
#[derive(Debug, Clone)]
pub struct GameteLayout {
    fixed: Vec<ValuedPoint>,
    planets: Vec<(u32, Vec<Point>)>,
}

impl GameteLayout {
    /// Valued points at `moment` (0-based): fixed points, then planets.
    pub fn points_at(&self, moment: usize) -> Vec<ValuedPoint> {
        let planets = self.planets.iter().filter_map(|(value, path)| {
            path.get(moment).map(|&point| ValuedPoint {
                point,
                value: *value,
            })
        });
        self.fixed.iter().copied().chain(planets).collect()
    }

    /// Path of the planet at `index`, one point per moment.
    pub fn planet_path(&self, index: usize) -> Option<&[Point]> {
        self.planets.get(index).map(|(_, path)| path.as_slice())
    }
}
