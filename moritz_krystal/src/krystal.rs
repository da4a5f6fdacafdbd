// Krystal: an ordered sequence of strands plus derived summaries.
//
// The summaries (level, min/max value, value count) are computed once when
// the krystal is built and never drift from the strands, because the
// strands are only reachable through read-only accessors. Deserialized
// krystals go through the same constructor, so a hand-edited file that
// breaks an invariant is rejected at load time.
//
// The six variants are a tagged union (`KrystalKind`). Constant and line
// krystals carry nothing but their strands; the other four carry their
// heredity, i.e. the names of the krystals/expander they were derived from
// plus any parameters, which is what `rebuild` in the expansion crate
// replays. Saving and rebuilding are refused for the heredity-free
// variants.
//
// Structural levels: within a krystal of level L, the first value of a
// strand sits at the strand's own level and every other value sits at
// L + 1. `leveled_values` flattens a krystal into that annotated form; it
// is the common currency of value alignment (input.rs), relative
// positions (density.rs) and planet re-basing (expansion crate).

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::KrystalError;
use crate::name::{KrystalName, KrystalType};
use crate::repository::KrystalRepository;
use crate::strand::Strand;

/// Heredity of an expansion krystal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionHeredity {
    pub density_input: String,
    pub points_input: String,
    pub expander: String,
    /// Index of the expander, recorded in the krystal's name.
    pub expander_index: u32,
}

/// Heredity of a modulation krystal. `modulator[y - 1][x - 1]` is the
/// output value for an x-input value `x` aligned with a y-input value `y`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulationHeredity {
    pub x_input: String,
    pub y_input: String,
    pub modulator: Vec<Vec<u32>>,
}

/// Heredity of a permutation krystal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermutationHeredity {
    pub source: String,
    /// Strands at this level or deeper are permuted.
    pub permutation_level: u32,
    /// Rotation applied to each permuted strand.
    pub contour: u32,
}

/// Heredity of a path krystal: one input planet of an expander, followed
/// across the moments of a density input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathHeredity {
    pub density_input: String,
    pub expander: String,
    pub planet_index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KrystalKind {
    Constant,
    Line,
    Expansion(ExpansionHeredity),
    Modulation(ModulationHeredity),
    Permutation(PermutationHeredity),
    Path(PathHeredity),
}

impl KrystalKind {
    pub fn krystal_type(&self) -> KrystalType {
        match self {
            KrystalKind::Constant => KrystalType::Constant,
            KrystalKind::Line => KrystalType::Line,
            KrystalKind::Expansion(_) => KrystalType::Expansion,
            KrystalKind::Modulation(_) => KrystalType::Modulation,
            KrystalKind::Permutation(_) => KrystalType::Permutation,
            KrystalKind::Path(_) => KrystalType::Path,
        }
    }

    fn expander_index(&self) -> Option<u32> {
        match self {
            KrystalKind::Expansion(heredity) => Some(heredity.expander_index),
            _ => None,
        }
    }
}

/// One value of a krystal annotated with its structural level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeveledValue {
    pub level: u32,
    pub value: u32,
}

/// Persisted form of a krystal. Summaries are not stored; they are
/// recomputed on load.
#[derive(Serialize, Deserialize)]
struct KrystalFile {
    name: String,
    kind: KrystalKind,
    strands: Vec<Strand>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "KrystalFile", into = "KrystalFile")]
pub struct Krystal {
    name: String,
    kind: KrystalKind,
    level: u32,
    min_value: u32,
    max_value: u32,
    num_values: u32,
    strands: Vec<Strand>,
}

impl Krystal {
    /// Build a krystal from its strands, validating structure and computing
    /// the summaries.
    ///
    /// A multi-value krystal whose first strand is tagged level 0 has that
    /// strand corrected to level 1. Any other level-0 strand, a first
    /// strand deeper than level 1, or a variant-specific shape violation
    /// (constant krystals hold exactly one value, line krystals exactly one
    /// strand) is rejected.
    pub fn new(
        name: impl Into<String>,
        kind: KrystalKind,
        mut strands: Vec<Strand>,
    ) -> Result<Self, KrystalError> {
        let name = name.into();
        if strands.is_empty() {
            return Err(KrystalError::InvalidStructure(format!(
                "krystal {name} has no strands"
            )));
        }
        if let Some(i) = strands.iter().position(Strand::is_empty) {
            return Err(KrystalError::InvalidStructure(format!(
                "krystal {name}: strand {i} has no values"
            )));
        }

        let num_values: usize = strands.iter().map(Strand::len).sum();
        if num_values > 1 && strands[0].level() == 0 {
            debug!("krystal {name}: first strand level corrected from 0 to 1");
            strands[0].set_level(1);
        }
        if strands[0].level() > 1 {
            return Err(KrystalError::InvalidStructure(format!(
                "krystal {name}: first strand has level {}, expected 1",
                strands[0].level()
            )));
        }
        if let Some(i) = strands.iter().skip(1).position(|s| s.level() == 0) {
            return Err(KrystalError::InvalidStructure(format!(
                "krystal {name}: strand {} has level 0",
                i + 1
            )));
        }

        match kind {
            KrystalKind::Constant if num_values != 1 => {
                return Err(KrystalError::InvalidStructure(format!(
                    "constant krystal {name} has {num_values} values"
                )));
            }
            KrystalKind::Line if strands.len() != 1 => {
                return Err(KrystalError::InvalidStructure(format!(
                    "line krystal {name} has {} strands",
                    strands.len()
                )));
            }
            _ => {}
        }

        let values = || strands.iter().flat_map(|s| s.values().iter().copied());
        let min_value = values().min().unwrap_or(0);
        let max_value = values().max().unwrap_or(0);
        let level = strands.iter().map(Strand::level).max().unwrap_or(0);
        let num_values = u32::try_from(num_values).map_err(|_| {
            KrystalError::InvalidStructure(format!("krystal {name} has too many values"))
        })?;

        Ok(Krystal {
            name,
            kind,
            level,
            min_value,
            max_value,
            num_values,
            strands,
        })
    }

    /// Build a krystal and name it from its own domain and shape.
    pub fn with_index(
        kind: KrystalKind,
        strands: Vec<Strand>,
        index: u32,
    ) -> Result<Self, KrystalError> {
        let mut krystal = Krystal::new(String::new(), kind, strands)?;
        krystal.name = krystal.generated_name(index).to_string();
        Ok(krystal)
    }

    /// A constant krystal: one level-0 strand holding one value.
    pub fn constant(value: u32, index: u32) -> Result<Self, KrystalError> {
        Krystal::with_index(KrystalKind::Constant, vec![Strand::new(0, vec![value])?], index)
    }

    /// A line krystal: one level-1 strand.
    pub fn line(values: Vec<u32>, index: u32) -> Result<Self, KrystalError> {
        Krystal::with_index(KrystalKind::Line, vec![Strand::new(1, values)?], index)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &KrystalKind {
        &self.kind
    }

    pub fn krystal_type(&self) -> KrystalType {
        self.kind.krystal_type()
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn min_value(&self) -> u32 {
        self.min_value
    }

    pub fn max_value(&self) -> u32 {
        self.max_value
    }

    pub fn num_values(&self) -> u32 {
        self.num_values
    }

    pub fn strands(&self) -> &[Strand] {
        &self.strands
    }

    /// All values in strand order.
    pub fn values(&self) -> impl Iterator<Item = u32> + '_ {
        self.strands.iter().flat_map(|s| s.values().iter().copied())
    }

    /// Nested grouping sizes: for each level `1..=level`, the number of
    /// strands at that level or shallower, followed by the value count.
    pub fn shape(&self) -> Vec<u32> {
        let mut shape: Vec<u32> = (1..=self.level)
            .map(|l| self.strands.iter().filter(|s| s.level() <= l).count() as u32)
            .collect();
        shape.push(self.num_values);
        shape
    }

    /// The name this krystal would carry under the naming grammar.
    pub fn generated_name(&self, index: u32) -> KrystalName {
        KrystalName::new(
            self.max_value,
            self.shape(),
            self.krystal_type(),
            index,
            self.kind.expander_index(),
        )
    }

    /// Every value annotated with its structural level. The first value of
    /// a strand takes the strand's level (level 0 counts as 1); the rest
    /// take `self.level + 1`.
    pub fn leveled_values(&self) -> Vec<LeveledValue> {
        let inner_level = self.level + 1;
        let mut leveled = Vec::with_capacity(self.num_values as usize);
        for strand in &self.strands {
            for (i, &value) in strand.values().iter().enumerate() {
                let level = if i == 0 { strand.level().max(1) } else { inner_level };
                leveled.push(LeveledValue { level, value });
            }
        }
        leveled
    }

    /// Persist a krystal that has heredity. Constant and line krystals have
    /// nothing to save beyond their values and are refused.
    pub fn save<R: KrystalRepository + ?Sized>(&self, repo: &mut R) -> Result<(), KrystalError> {
        if !self.krystal_type().has_heredity() {
            return Err(KrystalError::NotApplicable {
                operation: "save",
                kind: self.krystal_type().tag(),
            });
        }
        repo.store_krystal(self)
    }
}

impl TryFrom<KrystalFile> for Krystal {
    type Error = KrystalError;

    fn try_from(file: KrystalFile) -> Result<Self, Self::Error> {
        Krystal::new(file.name, file.kind, file.strands)
    }
}

impl From<Krystal> for KrystalFile {
    fn from(krystal: Krystal) -> Self {
        KrystalFile {
            name: krystal.name,
            kind: krystal.kind,
            strands: krystal.strands,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryKrystalRepository;

    fn strand(level: u32, values: &[u32]) -> Strand {
        Strand::new(level, values.to_vec()).unwrap()
    }

    fn line_krystal() -> Krystal {
        Krystal::new(
            "test",
            KrystalKind::Line,
            vec![strand(1, &[3, 1])],
        )
        .unwrap()
    }

    #[test]
    fn test_summaries() {
        let k = Krystal::new(
            "k",
            KrystalKind::Permutation(PermutationHeredity {
                source: "s".into(),
                permutation_level: 1,
                contour: 0,
            }),
            vec![strand(1, &[4, 2]), strand(2, &[7]), strand(2, &[1, 5, 3])],
        )
        .unwrap();
        assert_eq!(k.level(), 2);
        assert_eq!(k.min_value(), 1);
        assert_eq!(k.max_value(), 7);
        assert_eq!(k.num_values(), 6);
        assert_eq!(k.num_values() as usize, k.strands().iter().map(Strand::len).sum::<usize>());
        assert_eq!(k.shape(), vec![1, 3, 6]);
        for v in k.values() {
            assert!(k.min_value() <= v && v <= k.max_value());
        }
    }

    #[test]
    fn test_constant_and_line() {
        let c = Krystal::constant(5, 1).unwrap();
        assert_eq!(c.level(), 0);
        assert_eq!(c.shape(), vec![1]);
        assert_eq!(c.name(), "5.1.1.constant.krys");

        let l = Krystal::line(vec![1, 2, 3, 4, 5], 2).unwrap();
        assert_eq!(l.level(), 1);
        assert_eq!(l.shape(), vec![1, 5]);
        assert_eq!(l.name(), "5.1_5.2.line.krys");
    }

    #[test]
    fn test_first_strand_level_corrected() {
        let k = Krystal::new("k", KrystalKind::Line, vec![strand(0, &[1, 2])]).unwrap();
        assert_eq!(k.strands()[0].level(), 1);
        assert_eq!(k.level(), 1);
    }

    #[test]
    fn test_invalid_structures() {
        assert!(Krystal::new("k", KrystalKind::Line, vec![]).is_err());
        assert!(Krystal::new("k", KrystalKind::Line, vec![strand(2, &[1])]).is_err());
        assert!(
            Krystal::new(
                "k",
                KrystalKind::Line,
                vec![strand(1, &[1]), strand(2, &[2])]
            )
            .is_err()
        );
        assert!(Krystal::new("k", KrystalKind::Constant, vec![strand(0, &[1, 2])]).is_err());
        let perm = KrystalKind::Permutation(PermutationHeredity {
            source: "s".into(),
            permutation_level: 1,
            contour: 0,
        });
        assert!(Krystal::new("k", perm, vec![strand(1, &[1]), strand(0, &[2])]).is_err());
    }

    #[test]
    fn test_leveled_values() {
        let k = Krystal::new(
            "k",
            KrystalKind::Modulation(ModulationHeredity {
                x_input: "x".into(),
                y_input: "y".into(),
                modulator: vec![vec![1]],
            }),
            vec![strand(1, &[1, 2]), strand(2, &[3, 4])],
        )
        .unwrap();
        let levels: Vec<u32> = k.leveled_values().iter().map(|lv| lv.level).collect();
        assert_eq!(levels, vec![1, 3, 2, 3]);

        let c = Krystal::constant(1, 1).unwrap();
        assert_eq!(c.leveled_values(), vec![LeveledValue { level: 1, value: 1 }]);
    }

    #[test]
    fn test_save_refused_without_heredity() {
        let mut repo = InMemoryKrystalRepository::default();
        let err = line_krystal().save(&mut repo).unwrap_err();
        assert!(matches!(
            err,
            KrystalError::NotApplicable { operation: "save", kind: "line" }
        ));
    }

    #[test]
    fn test_save_with_heredity() {
        let mut repo = InMemoryKrystalRepository::default();
        let k = Krystal::with_index(
            KrystalKind::Permutation(PermutationHeredity {
                source: "7.1_7.1.line.krys".into(),
                permutation_level: 1,
                contour: 2,
            }),
            vec![strand(1, &[1, 2, 3])],
            1,
        )
        .unwrap();
        k.save(&mut repo).unwrap();
        assert_eq!(repo.load_krystal(k.name()).unwrap(), k);
    }

    #[test]
    fn test_json_roundtrip_revalidates() {
        let k = Krystal::line(vec![2, 1, 2], 1).unwrap();
        let json = serde_json::to_string(&k).unwrap();
        let back: Krystal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, k);

        let broken = r#"{"name":"k","kind":{"type":"line"},"strands":[]}"#;
        assert!(serde_json::from_str::<Krystal>(broken).is_err());
    }
}
