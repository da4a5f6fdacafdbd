// Krystal names: the only persistent cross-reference between krystals.
//
// A name encodes the krystal's domain (max value), its shape (nested
// grouping sizes), an index distinguishing krystals of the same domain and
// shape, and a type tag. Expansion names additionally carry the index of
// the expander that produced them:
//
//   <maxValue>.<shape, '_' separated>.<index>.<tag>.krys
//   <maxValue>.<shape>.<expanderIndex>.<index>.exp.krys
//
// Names sort by domain, then shape, then expander index, then type tag,
// then index. The ordering is what repository listings are sorted by.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KrystalError;

const SUFFIX: &str = ".krys";

/// The six krystal variants, in their naming sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KrystalType {
    Constant,
    Line,
    Expansion,
    Modulation,
    Permutation,
    Path,
}

impl KrystalType {
    pub const ALL: [KrystalType; 6] = [
        KrystalType::Constant,
        KrystalType::Line,
        KrystalType::Expansion,
        KrystalType::Modulation,
        KrystalType::Permutation,
        KrystalType::Path,
    ];

    /// The tag used in file names.
    pub fn tag(self) -> &'static str {
        match self {
            KrystalType::Constant => "constant",
            KrystalType::Line => "line",
            KrystalType::Expansion => "exp",
            KrystalType::Modulation => "mod",
            KrystalType::Permutation => "perm",
            KrystalType::Path => "path",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        KrystalType::ALL.into_iter().find(|t| t.tag() == tag)
    }

    /// Constant and line krystals are written by hand; everything else is
    /// derived from other krystals and can be rebuilt.
    pub fn has_heredity(self) -> bool {
        !matches!(self, KrystalType::Constant | KrystalType::Line)
    }
}

impl fmt::Display for KrystalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A parsed krystal name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KrystalName {
    pub max_value: u32,
    pub shape: Vec<u32>,
    /// Only present for expansion krystals.
    pub expander_index: Option<u32>,
    pub index: u32,
    pub krystal_type: KrystalType,
}

impl KrystalName {
    pub fn new(
        max_value: u32,
        shape: Vec<u32>,
        krystal_type: KrystalType,
        index: u32,
        expander_index: Option<u32>,
    ) -> Self {
        KrystalName {
            max_value,
            shape,
            expander_index,
            index,
            krystal_type,
        }
    }

    /// Parse a file name such as `7.1_3_9.2.line.krys`.
    pub fn parse(name: &str) -> Result<Self, KrystalError> {
        let stem = name
            .strip_suffix(SUFFIX)
            .ok_or_else(|| KrystalError::InvalidName(name.to_string()))?;
        let parts: Vec<&str> = stem.split('.').collect();
        let (tag, fields) = parts
            .split_last()
            .ok_or_else(|| KrystalError::InvalidName(name.to_string()))?;
        let krystal_type = KrystalType::from_tag(tag)
            .ok_or_else(|| KrystalError::UnknownKrystalType(name.to_string()))?;

        let expected_fields = if krystal_type == KrystalType::Expansion { 4 } else { 3 };
        if fields.len() != expected_fields {
            return Err(KrystalError::InvalidName(name.to_string()));
        }

        let number = |s: &str| {
            s.parse::<u32>()
                .map_err(|_| KrystalError::InvalidName(name.to_string()))
        };
        let max_value = number(fields[0])?;
        let shape = fields[1]
            .split('_')
            .map(number)
            .collect::<Result<Vec<u32>, _>>()?;
        let (expander_index, index) = if krystal_type == KrystalType::Expansion {
            (Some(number(fields[2])?), number(fields[3])?)
        } else {
            (None, number(fields[2])?)
        };

        Ok(KrystalName {
            max_value,
            shape,
            expander_index,
            index,
            krystal_type,
        })
    }

    fn shape_string(&self) -> String {
        self.shape
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join("_")
    }
}

impl fmt::Display for KrystalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.", self.max_value, self.shape_string())?;
        if let Some(expander_index) = self.expander_index {
            write!(f, "{expander_index}.")?;
        }
        write!(f, "{}.{}{SUFFIX}", self.index, self.krystal_type)
    }
}

impl FromStr for KrystalName {
    type Err = KrystalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KrystalName::parse(s)
    }
}

/// Shorter shapes sort first; equal-length shapes compare component-wise.
fn compare_shapes(a: &[u32], b: &[u32]) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

impl Ord for KrystalName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.max_value
            .cmp(&other.max_value)
            .then_with(|| compare_shapes(&self.shape, &other.shape))
            .then_with(|| self.expander_index.cmp(&other.expander_index))
            .then_with(|| self.krystal_type.cmp(&other.krystal_type))
            .then_with(|| self.index.cmp(&other.index))
    }
}

impl PartialOrd for KrystalName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compare two names by the krystal name order, falling back to plain
/// string order when either does not parse.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    match (KrystalName::parse(a), KrystalName::parse(b)) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line_name() {
        let name = KrystalName::parse("7.1_7.3.line.krys").unwrap();
        assert_eq!(name.max_value, 7);
        assert_eq!(name.shape, vec![1, 7]);
        assert_eq!(name.index, 3);
        assert_eq!(name.expander_index, None);
        assert_eq!(name.krystal_type, KrystalType::Line);
    }

    #[test]
    fn test_parse_expansion_name() {
        let name = KrystalName::parse("12.1_7_38.4.2.exp.krys").unwrap();
        assert_eq!(name.max_value, 12);
        assert_eq!(name.shape, vec![1, 7, 38]);
        assert_eq!(name.expander_index, Some(4));
        assert_eq!(name.index, 2);
        assert_eq!(name.krystal_type, KrystalType::Expansion);
    }

    #[test]
    fn test_display_matches_input() {
        for s in [
            "1.1.1.constant.krys",
            "7.1_7.3.line.krys",
            "12.1_7_38.4.2.exp.krys",
            "5.1_2_6.1.mod.krys",
            "5.1_2_6.9.perm.krys",
            "3.1_4.2.path.krys",
        ] {
            assert_eq!(KrystalName::parse(s).unwrap().to_string(), s);
        }
    }

    #[test]
    fn test_unknown_type_tag() {
        let err = KrystalName::parse("7.1_7.3.spline.krys").unwrap_err();
        assert!(matches!(err, KrystalError::UnknownKrystalType(_)));
    }

    #[test]
    fn test_malformed_names() {
        for s in ["7.1_7.3.line", "x.1_7.3.line.krys", "7.1_7.line.krys", "7.1_7.3.exp.krys"] {
            let err = KrystalName::parse(s).unwrap_err();
            assert!(matches!(err, KrystalError::InvalidName(_)), "{s}");
        }
    }

    #[test]
    fn test_name_ordering() {
        let mut names: Vec<KrystalName> = [
            "8.1_4.1.line.krys",
            "7.1_2_6.1.line.krys",
            "7.1_7.2.perm.krys",
            "7.1_7.1.perm.krys",
            "7.1_7.1.constant.krys",
            "7.1_3.1.mod.krys",
            "7.1_7.2.1.exp.krys",
            "7.1_7.1.3.exp.krys",
        ]
        .iter()
        .map(|s| KrystalName::parse(s).unwrap())
        .collect();
        names.sort();
        let sorted: Vec<String> = names.iter().map(ToString::to_string).collect();
        assert_eq!(
            sorted,
            vec![
                "7.1_3.1.mod.krys",
                "7.1_7.1.constant.krys",
                "7.1_7.1.perm.krys",
                "7.1_7.2.perm.krys",
                "7.1_7.1.3.exp.krys",
                "7.1_7.2.1.exp.krys",
                "7.1_2_6.1.line.krys",
                "8.1_4.1.line.krys",
            ]
        );
    }

    #[test]
    fn test_compare_names_falls_back_to_strings() {
        assert_eq!(compare_names("a", "b"), Ordering::Less);
        assert_eq!(
            compare_names("7.1_7.1.line.krys", "7.1_7.1.mod.krys"),
            Ordering::Less
        );
    }
}
