// Deriving krystals from their heredity.
//
// Each heredity variant knows how to regenerate its strands from the
// krystals (and expander) it names. `derive_krystal` builds a new krystal
// of a given kind; `rebuild` re-derives an existing one, keeping its index
// and renaming it for its possibly changed domain and shape. Constant and
// line krystals have no heredity, and both refuse them as not applicable.
//
// - Modulation: x-input structure, values looked up in the modulator
//   table at (y, x), y aligned to x.
// - Permutation: source structure, strands at or below the permutation
//   level rotated left by the contour.
// - Path: density structure, values of the output points nearest to one
//   input planet as it moves across the density moments.

use moritz_krystal::{
    CoreConfig, InputKrystal, Krystal, KrystalError, KrystalKind, KrystalName, KrystalRepository,
    ModulationHeredity, PathHeredity, PermutationHeredity, Strand,
};

use crate::error::ExpansionError;
use crate::expansion::{expansion_strands, order_by_distance};
use crate::repository::ExpanderRepository;

/// Strands of `x` with every value `x` replaced by `modulator[y - 1][x - 1]`,
/// `y` being `y_input`'s value aligned to that position.
pub fn modulation_strands(
    x_input: &InputKrystal,
    y_input: &InputKrystal,
    modulator: &[Vec<u32>],
) -> Result<Vec<Strand>, ExpansionError> {
    let width = modulator.first().map_or(0, Vec::len);
    if width == 0 || modulator.iter().any(|row| row.len() != width) {
        return Err(ExpansionError::InvalidStructure(
            "modulator must be a non-empty rectangular table".to_string(),
        ));
    }
    let ys = y_input.aligned_values(x_input.krystal())?;
    let mut ys = ys.into_iter();
    let mut strands = Vec::with_capacity(x_input.krystal().strands().len());
    for strand in x_input.krystal().strands() {
        let mut values = Vec::with_capacity(strand.len());
        for &x in strand.values() {
            let y = ys.next().ok_or_else(|| {
                ExpansionError::InvalidStructure("y input ran out of values".to_string())
            })?;
            let value = (y as usize)
                .checked_sub(1)
                .and_then(|row| modulator.get(row))
                .and_then(|row| (x as usize).checked_sub(1).and_then(|col| row.get(col)))
                .ok_or_else(|| {
                    ExpansionError::InvalidStructure(format!(
                        "modulator has no entry for y={y}, x={x}"
                    ))
                })?;
            values.push(*value);
        }
        strands.push(Strand::new(strand.level(), values)?);
    }
    Ok(strands)
}

/// Strands of `source` with every strand at level `permutation_level` or
/// deeper rotated left by `contour`.
pub fn permutation_strands(
    source: &Krystal,
    permutation_level: u32,
    contour: u32,
) -> Result<Vec<Strand>, ExpansionError> {
    source
        .strands()
        .iter()
        .map(|strand| {
            let mut values = strand.values().to_vec();
            if strand.level() >= permutation_level {
                let by = contour as usize % values.len();
                values.rotate_left(by);
            }
            Strand::new(strand.level(), values).map_err(ExpansionError::from)
        })
        .collect()
}

/// Strands following input planet `heredity.planet_index` of the named
/// expander across the density input, taking at each moment the value of
/// the nearest output point.
pub fn path_strands(
    heredity: &PathHeredity,
    krystals: &dyn KrystalRepository,
    expanders: &dyn ExpanderRepository,
    config: &CoreConfig,
) -> Result<Vec<Strand>, ExpansionError> {
    let density = krystals.load_density_input(&heredity.density_input)?;
    let mut expander = expanders.load_expander(&heredity.expander, krystals, config)?;
    let planet_index = heredity.planet_index as usize;
    if expander.input_gamete().planet(planet_index).is_none() {
        return Err(ExpansionError::InvalidStructure(format!(
            "expander {} has no input planet {planet_index}",
            expander.name()
        )));
    }
    expander.rebase_planets(krystals, &density)?;

    let moments = density.num_values();
    let input = expander.input_gamete().layout(moments)?;
    let output = expander.output_gamete().layout(moments)?;
    let path = input.planet_path(planet_index).ok_or_else(|| {
        ExpansionError::InvalidStructure(format!("no path for input planet {planet_index}"))
    })?;

    let mut values = Vec::with_capacity(path.len());
    for (m, &point) in path.iter().enumerate() {
        let nearest = order_by_distance(point, &output.points_at(m), config.distance_tolerance)
            .into_iter()
            .next()
            .ok_or_else(|| {
                ExpansionError::InvalidStructure(format!(
                    "expander {} has no output points at moment {}",
                    expander.name(),
                    m + 1
                ))
            })?;
        values.push(nearest.value);
    }

    let mut values = values.into_iter();
    density
        .krystal()
        .strands()
        .iter()
        .map(|strand| {
            let chunk: Vec<u32> = values.by_ref().take(strand.len()).collect();
            Strand::new(strand.level(), chunk).map_err(ExpansionError::from)
        })
        .collect()
}

/// Strands for a krystal of `kind`, derived from its heredity.
pub fn derive_strands(
    kind: &KrystalKind,
    krystals: &dyn KrystalRepository,
    expanders: &dyn ExpanderRepository,
    config: &CoreConfig,
) -> Result<Vec<Strand>, ExpansionError> {
    match kind {
        KrystalKind::Constant | KrystalKind::Line => Err(KrystalError::NotApplicable {
            operation: "rebuild",
            kind: kind.krystal_type().tag(),
        }
        .into()),
        KrystalKind::Expansion(heredity) => {
            let density = krystals.load_density_input(&heredity.density_input)?;
            let points = krystals.load_input_krystal(&heredity.points_input)?;
            let mut expander = expanders.load_expander(&heredity.expander, krystals, config)?;
            expander.rebase_planets(krystals, &density)?;
            expansion_strands(&expander, &density, &points, config)
        }
        KrystalKind::Modulation(ModulationHeredity {
            x_input,
            y_input,
            modulator,
        }) => {
            let x = krystals.load_input_krystal(x_input)?;
            let y = krystals.load_input_krystal(y_input)?;
            modulation_strands(&x, &y, modulator)
        }
        KrystalKind::Permutation(PermutationHeredity {
            source,
            permutation_level,
            contour,
        }) => permutation_strands(&krystals.load_krystal(source)?, *permutation_level, *contour),
        KrystalKind::Path(heredity) => path_strands(heredity, krystals, expanders, config),
    }
}

/// Derive a new krystal of `kind` named with `index`.
pub fn derive_krystal(
    kind: KrystalKind,
    index: u32,
    krystals: &dyn KrystalRepository,
    expanders: &dyn ExpanderRepository,
    config: &CoreConfig,
) -> Result<Krystal, ExpansionError> {
    let strands = derive_strands(&kind, krystals, expanders, config)?;
    Ok(Krystal::with_index(kind, strands, index)?)
}

/// Re-derive `krystal` from its heredity, keeping its index.
pub fn rebuild(
    krystal: &Krystal,
    krystals: &dyn KrystalRepository,
    expanders: &dyn ExpanderRepository,
    config: &CoreConfig,
) -> Result<Krystal, ExpansionError> {
    if !krystal.krystal_type().has_heredity() {
        return Err(KrystalError::NotApplicable {
            operation: "rebuild",
            kind: krystal.krystal_type().tag(),
        }
        .into());
    }
    let index = KrystalName::parse(krystal.name())?.index;
    derive_krystal(krystal.kind().clone(), index, krystals, expanders, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryExpanderRepository;
    use moritz_krystal::InMemoryKrystalRepository;

    fn line(values: Vec<u32>, index: u32) -> InputKrystal {
        InputKrystal::new(Krystal::line(values, index).unwrap())
    }

    fn values(strands: &[Strand]) -> Vec<Vec<u32>> {
        strands.iter().map(|s| s.values().to_vec()).collect()
    }

    #[test]
    fn test_modulation() {
        let x = line(vec![1, 2, 3], 1);
        let y = line(vec![2, 1, 2], 2);
        let modulator = vec![vec![7, 8, 9], vec![4, 5, 6]];
        let strands = modulation_strands(&x, &y, &modulator).unwrap();
        assert_eq!(values(&strands), vec![vec![4, 8, 6]]);
    }

    #[test]
    fn test_modulation_rejects_bad_tables() {
        let x = line(vec![1, 4], 1);
        let y = line(vec![1, 1], 2);
        assert!(modulation_strands(&x, &y, &[]).is_err());
        assert!(modulation_strands(&x, &y, &[vec![1, 2], vec![3]]).is_err());
        // x = 4 is outside a three-column table.
        assert!(modulation_strands(&x, &y, &[vec![1, 2, 3]]).is_err());
    }

    #[test]
    fn test_permutation_rotates_deep_strands() {
        let source = Krystal::with_index(
            KrystalKind::Permutation(PermutationHeredity {
                source: String::new(),
                permutation_level: 1,
                contour: 0,
            }),
            vec![
                Strand::new(1, vec![1, 2, 3]).unwrap(),
                Strand::new(2, vec![4, 5, 6]).unwrap(),
            ],
            1,
        )
        .unwrap();
        let strands = permutation_strands(&source, 2, 4).unwrap();
        assert_eq!(values(&strands), vec![vec![1, 2, 3], vec![5, 6, 4]]);
        assert_eq!(strands[1].level(), 2);
    }

    #[test]
    fn test_rebuild_permutation_keeps_index() {
        let mut krystals = InMemoryKrystalRepository::new();
        let source = Krystal::line(vec![1, 2, 3], 1).unwrap();
        krystals.store_krystal(&source).unwrap();
        let expanders = InMemoryExpanderRepository::new();
        let config = CoreConfig::default();

        let kind = KrystalKind::Permutation(PermutationHeredity {
            source: source.name().to_string(),
            permutation_level: 1,
            contour: 1,
        });
        let derived = derive_krystal(kind, 5, &krystals, &expanders, &config).unwrap();
        assert_eq!(derived.name(), "3.1_3.5.perm.krys");
        assert_eq!(derived.values().collect::<Vec<_>>(), vec![2, 3, 1]);

        let rebuilt = rebuild(&derived, &krystals, &expanders, &config).unwrap();
        assert_eq!(rebuilt, derived);
    }

    #[test]
    fn test_rebuild_not_applicable_without_heredity() {
        let krystals = InMemoryKrystalRepository::new();
        let expanders = InMemoryExpanderRepository::new();
        let config = CoreConfig::default();
        for k in [Krystal::constant(3, 1).unwrap(), Krystal::line(vec![1, 2], 1).unwrap()] {
            let err = rebuild(&k, &krystals, &expanders, &config).unwrap_err();
            assert!(matches!(
                err,
                ExpansionError::Krystal(KrystalError::NotApplicable { operation: "rebuild", .. })
            ));
        }
    }
}
