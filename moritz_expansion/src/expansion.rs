// Expansion: map a density krystal through an expander into a new krystal.
//
// For every moment m of the density input D:
// - the points input, aligned to D, names the input point to start from:
//   the first input-gamete point at m carrying that value;
// - the output-gamete points at m are ordered by distance from it;
// - the strand for m takes the values of the first d of them, where d is
//   D's value at m (clamped to the number of output points), at D's
//   structural level for m.
//
// Output points closer than `CoreConfig::distance_tolerance` in distance
// are tied; ties go to the smaller value, then to the earlier point.

use std::sync::Arc;

use moritz_krystal::{
    CoreConfig, DensityInputKrystal, ExpansionHeredity, InputKrystal, Krystal, KrystalKind,
    KrystalRepository, Strand,
};

use crate::error::ExpansionError;
use crate::expander::Expander;
use crate::geometry::{Point, ValuedPoint};

/// Order `candidates` by distance from `origin`. Repeatedly takes the
/// nearest remaining point; among those within `tolerance` of it, the
/// smallest value wins, then the earliest.
pub fn order_by_distance(
    origin: Point,
    candidates: &[ValuedPoint],
    tolerance: f32,
) -> Vec<ValuedPoint> {
    let mut remaining: Vec<(usize, f32, ValuedPoint)> = candidates
        .iter()
        .enumerate()
        .map(|(i, p)| (i, origin.distance(p.point), *p))
        .collect();
    let mut ordered = Vec::with_capacity(remaining.len());
    while !remaining.is_empty() {
        let nearest = remaining
            .iter()
            .map(|&(_, d, _)| d)
            .fold(f32::INFINITY, f32::min);
        let mut best: Option<(usize, usize, u32)> = None;
        for (slot, &(order, d, p)) in remaining.iter().enumerate() {
            if d - nearest > tolerance {
                continue;
            }
            let better = match best {
                Some((_, best_order, best_value)) => (p.value, order) < (best_value, best_order),
                None => true,
            };
            if better {
                best = Some((slot, order, p.value));
            }
        }
        let slot = best.map_or(0, |(slot, _, _)| slot);
        ordered.push(remaining.remove(slot).2);
    }
    ordered
}

/// Strands of the expansion of `density` by `expander`, with the points
/// input `points`. Every planet must already be laid out over `density`.
pub fn expansion_strands(
    expander: &Expander,
    density: &DensityInputKrystal,
    points: &InputKrystal,
    config: &CoreConfig,
) -> Result<Vec<Strand>, ExpansionError> {
    let moments = density.num_values();
    let aligned = points.aligned_values(density.krystal())?;
    let leveled = density.leveled_values();
    let input = expander.input_gamete().layout(moments)?;
    let output = expander.output_gamete().layout(moments)?;

    let mut strands = Vec::with_capacity(leveled.len());
    for (m, (density_value, &value)) in leveled.iter().zip(&aligned).enumerate() {
        let origin = input
            .points_at(m)
            .into_iter()
            .find(|p| p.value == value)
            .ok_or(ExpansionError::MissingInputPoint {
                value,
                moment: m + 1,
            })?;
        let candidates = output.points_at(m);
        if candidates.is_empty() {
            return Err(ExpansionError::InvalidStructure(format!(
                "expander {} has no output points at moment {}",
                expander.name(),
                m + 1
            )));
        }
        let take = (density_value.value as usize).clamp(1, candidates.len());
        let values = order_by_distance(origin.point, &candidates, config.distance_tolerance)
            .into_iter()
            .take(take)
            .map(|p| p.value)
            .collect();
        strands.push(Strand::new(density_value.level, values)?);
    }
    Ok(strands)
}

/// Expand the named density and points krystals with `expander`, re-basing
/// the expander's planets onto the density input first. The result is
/// named with `index` and `expander_index`.
pub fn expand<K: KrystalRepository + ?Sized>(
    expander: &Expander,
    density_input: &str,
    points_input: &str,
    krystals: &K,
    config: &CoreConfig,
    index: u32,
    expander_index: u32,
) -> Result<Krystal, ExpansionError> {
    let density: Arc<DensityInputKrystal> = krystals.load_density_input(density_input)?;
    let points = krystals.load_input_krystal(points_input)?;
    let mut expander = expander.clone();
    expander.rebase_planets(krystals, &density)?;
    let strands = expansion_strands(&expander, &density, &points, config)?;
    let kind = KrystalKind::Expansion(ExpansionHeredity {
        density_input: density_input.to_string(),
        points_input: points_input.to_string(),
        expander: expander.name().to_string(),
        expander_index,
    });
    Ok(Krystal::with_index(kind, strands, index)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamete::Gamete;
    use crate::point_group::{PointGroup, PointGroupShape};

    fn vp(x: f32, y: f32, value: u32) -> ValuedPoint {
        ValuedPoint {
            point: Point::new(x, y),
            value,
        }
    }

    #[test]
    fn test_order_by_distance() {
        let candidates = [vp(3.0, 0.0, 1), vp(1.0, 0.0, 2), vp(2.0, 0.0, 3)];
        let ordered = order_by_distance(Point::new(0.0, 0.0), &candidates, 1e-4);
        assert_eq!(ordered.iter().map(|p| p.value).collect::<Vec<_>>(), vec![2, 3, 1]);
    }

    #[test]
    fn test_order_ties_prefer_smaller_value_then_order() {
        let candidates = [vp(0.0, 1.0, 5), vp(1.0, 0.0, 4), vp(-1.0, 0.0, 4), vp(0.0, 2.0, 1)];
        let ordered = order_by_distance(Point::new(0.0, 0.0), &candidates, 1e-4);
        assert_eq!(ordered.iter().map(|p| p.value).collect::<Vec<_>>(), vec![4, 4, 5, 1]);
        assert_eq!(ordered[0].point, Point::new(1.0, 0.0));
    }

    /// Input: 1 at (10, 0) and 2 at (-10, 0). Output: a radius-10 circle
    /// of 1, 2, 3, 4 at quarter turns, closing with another 1 at (10, 0).
    fn square_expander() -> Expander {
        let circle = |values: Vec<u32>| PointGroup {
            from_radius: 10.0,
            ..PointGroup::fixed(PointGroupShape::Circle, values)
        };
        // Three fixed points over a full turn sit at 0, 180 and 360 degrees.
        let input = Gamete::new(vec![circle(vec![1, 2, 1])], vec![]).unwrap();
        let output = Gamete::new(vec![circle(vec![1, 2, 3, 4, 1])], vec![]).unwrap();
        Expander::new("square", input, output)
    }

    #[test]
    fn test_expansion_strands() {
        let density = DensityInputKrystal::new(Krystal::line(vec![1, 3, 2], 1).unwrap());
        let points = InputKrystal::new(Krystal::line(vec![1, 2, 1], 2).unwrap());
        let config = CoreConfig::default();
        let strands = expansion_strands(&square_expander(), &density, &points, &config).unwrap();
        let values: Vec<Vec<u32>> = strands.iter().map(|s| s.values().to_vec()).collect();
        // Moment 2 starts from input 2 at (-10, 0): 3 on top, then 2 and 4
        // tied and ordered by value.
        assert_eq!(values[0], vec![1]);
        assert_eq!(values[1], vec![3, 2, 4]);
        assert_eq!(values[2], vec![1, 1]);
        assert_eq!(strands.iter().map(Strand::level).collect::<Vec<_>>(), vec![1, 2, 2]);
    }

    #[test]
    fn test_missing_input_point() {
        let density = DensityInputKrystal::new(Krystal::line(vec![1, 1], 1).unwrap());
        let points = InputKrystal::new(Krystal::line(vec![1, 7], 1).unwrap());
        let err = expansion_strands(&square_expander(), &density, &points, &CoreConfig::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ExpansionError::MissingInputPoint { value: 7, moment: 2 }
        ));
    }

    #[test]
    fn test_expand_names_result() {
        let mut krystals = moritz_krystal::InMemoryKrystalRepository::new();
        let density = Krystal::line(vec![1, 3, 2], 1).unwrap();
        let points = Krystal::line(vec![1, 2, 1], 2).unwrap();
        krystals.store_krystal(&density).unwrap();
        krystals.store_krystal(&points).unwrap();
        let k = expand(
            &square_expander(),
            density.name(),
            points.name(),
            &krystals,
            &CoreConfig::default(),
            1,
            4,
        )
        .unwrap();
        assert_eq!(k.name(), "4.1_3_6.4.1.exp.krys");
        assert_eq!(k.num_values(), 6);
        match k.kind() {
            KrystalKind::Expansion(h) => {
                assert_eq!(h.expander, "square");
                assert_eq!(h.density_input, density.name());
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }
}
