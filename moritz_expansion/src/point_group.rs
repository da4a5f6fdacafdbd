// PointGroup: a geometric primitive that turns fractions into points.
//
// A point group is a shape (circle, spiral, straight line) plus control
// parameters, and a list of values. In a gamete's fixed points the group
// holds one value per point and the points are evenly spaced along the
// shape. As a planet subpath it holds exactly one value (the planet's) and
// its points are spaced by the density krystal's relative positions, so
// the planet speeds up and slows down with the krystal's nested grouping.
//
// Every shape is evaluated the same way: compute the untranslated point for
// the fraction (rotation already applied), then translate by the polar
// offset (translate_radius, translate_angle).

use serde::{Deserialize, Serialize};

use crate::error::ExpansionError;
use crate::geometry::{Point, ValuedPoint, lerp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointGroupShape {
    /// A full turn at constant radius, starting at `from_angle`.
    Circle,
    /// Radius and angle both move from `from_*` to `to_*`.
    Spiral,
    /// Straight segment between the polar points `from_*` and `to_*`.
    StraightLine,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointGroup {
    pub shape: PointGroupShape,
    /// Number of points in the group.
    pub count: u32,
    /// First moment (1-based) covered when the group is a planet subpath.
    pub start_moment: u32,
    pub color: String,
    /// Fixed point values, or the single planet value of a subpath.
    pub value: Vec<u32>,
    pub from_radius: f32,
    pub from_angle: f32,
    pub to_radius: f32,
    pub to_angle: f32,
    pub rotate_angle: f32,
    pub translate_radius: f32,
    pub translate_angle: f32,
    pub visible: bool,
}

impl Default for PointGroup {
    fn default() -> Self {
        PointGroup {
            shape: PointGroupShape::Circle,
            count: 1,
            start_moment: 1,
            color: "#000000".to_string(),
            value: Vec::new(),
            from_radius: 0.0,
            from_angle: 0.0,
            to_radius: 0.0,
            to_angle: 0.0,
            rotate_angle: 0.0,
            translate_radius: 0.0,
            translate_angle: 0.0,
            visible: true,
        }
    }
}

impl PointGroup {
    /// A group of fixed points, one per value.
    pub fn fixed(shape: PointGroupShape, values: Vec<u32>) -> Self {
        PointGroup {
            shape,
            count: values.len() as u32,
            value: values,
            ..PointGroup::default()
        }
    }

    /// A planet subpath starting at `start_moment`. The count is filled in
    /// when the owning planet normalises its subpaths.
    pub fn subpath(shape: PointGroupShape, start_moment: u32, planet_value: u32) -> Self {
        PointGroup {
            shape,
            start_moment,
            value: vec![planet_value],
            ..PointGroup::default()
        }
    }

    /// Fixed point groups must hold exactly `count` values, at least one.
    pub fn validate_fixed(&self) -> Result<(), ExpansionError> {
        if self.count == 0 || self.value.len() != self.count as usize {
            return Err(ExpansionError::InvalidStructure(format!(
                "fixed point group has count {} but {} values",
                self.count,
                self.value.len()
            )));
        }
        Ok(())
    }

    /// Evenly spaced points along the shape: fraction `i / (count - 1)`.
    pub fn fixed_points(&self) -> Vec<Point> {
        let count = self.count as usize;
        let last = count.saturating_sub(1).max(1) as f32;
        let fractions: Vec<f32> = (0..count).map(|i| i as f32 / last).collect();
        self.points(&fractions)
    }

    /// Fixed points paired with their values.
    pub fn valued_fixed_points(&self) -> Vec<ValuedPoint> {
        self.fixed_points()
            .into_iter()
            .zip(self.value.iter().copied())
            .map(|(point, value)| ValuedPoint { point, value })
            .collect()
    }

    /// Subpath points for moments `first..first + count` (0-based), spaced by
    /// the relative positions. The fraction at moment `i` is
    /// `(positions[i] - positions[first]) / (positions[span_end] - positions[first])`.
    pub fn planet_points(
        &self,
        positions: &[f32],
        first: usize,
        span_end: usize,
    ) -> Result<Vec<Point>, ExpansionError> {
        let end = first + self.count as usize;
        if end > positions.len() || span_end >= positions.len() || span_end < first {
            return Err(ExpansionError::InvalidStructure(format!(
                "subpath at moment {} with {} points exceeds {} moments",
                first + 1,
                self.count,
                positions.len()
            )));
        }
        let origin = positions[first];
        let span = positions[span_end] - origin;
        let fractions: Vec<f32> = positions[first..end]
            .iter()
            .map(|&p| if span > 0.0 { (p - origin) / span } else { 0.0 })
            .collect();
        Ok(self.points(&fractions))
    }

    /// Structural equality as used for expander deduplication: colour,
    /// visibility, rotation, and translation are ignored.
    pub fn is_structurally_equivalent(&self, other: &PointGroup) -> bool {
        self.shape == other.shape
            && self.count == other.count
            && self.from_radius == other.from_radius
            && self.from_angle == other.from_angle
            && self.to_radius == other.to_radius
            && self.to_angle == other.to_angle
            && self.start_moment == other.start_moment
            && self.value == other.value
    }

    fn points(&self, fractions: &[f32]) -> Vec<Point> {
        let offset = Point::from_polar(self.translate_radius, self.translate_angle);
        match self.shape {
            PointGroupShape::Circle => fractions
                .iter()
                .map(|&f| {
                    let angle = self.from_angle + 360.0 * f + self.rotate_angle;
                    Point::from_polar(self.from_radius, angle).translate(offset)
                })
                .collect(),
            PointGroupShape::Spiral => fractions
                .iter()
                .map(|&f| {
                    let radius = lerp(self.from_radius, self.to_radius, f);
                    let angle = lerp(self.from_angle, self.to_angle, f) + self.rotate_angle;
                    Point::from_polar(radius, angle).translate(offset)
                })
                .collect(),
            PointGroupShape::StraightLine => {
                let start =
                    Point::from_polar(self.from_radius, self.from_angle + self.rotate_angle);
                let end = Point::from_polar(self.to_radius, self.to_angle + self.rotate_angle);
                fractions
                    .iter()
                    .map(|&f| start.lerp(end, f).translate(offset))
                    .collect()
            }
        }
    }
}
