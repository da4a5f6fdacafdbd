// Strand: one leveled run of values inside a krystal.
//
// A strand's level says where in the krystal's self-similar hierarchy the
// strand begins: a level-1 strand opens the whole krystal, a level-2 strand
// opens a new top-level group, and so on. Values are immutable once the
// strand exists; only the level can be corrected, and only by the owning
// krystal while it normalises itself (see `krystal.rs`).

use serde::{Deserialize, Serialize};

use crate::error::KrystalError;

/// An ordered, non-empty sequence of values tagged with a hierarchy level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strand {
    level: u32,
    values: Vec<u32>,
}

impl Strand {
    /// Create a strand. Fails if `values` is empty.
    pub fn new(level: u32, values: Vec<u32>) -> Result<Self, KrystalError> {
        if values.is_empty() {
            return Err(KrystalError::InvalidStructure(format!(
                "strand at level {level} has no values"
            )));
        }
        Ok(Strand { level, values })
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn values(&self) -> &[u32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false for a constructed strand; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn set_level(&mut self, level: u32) {
        self.level = level;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_strand_rejected() {
        let err = Strand::new(1, vec![]).unwrap_err();
        assert!(matches!(err, KrystalError::InvalidStructure(_)));
    }

    #[test]
    fn test_strand_accessors() {
        let strand = Strand::new(2, vec![3, 1, 2]).unwrap();
        assert_eq!(strand.level(), 2);
        assert_eq!(strand.values(), &[3, 1, 2]);
        assert_eq!(strand.len(), 3);
        assert!(!strand.is_empty());
    }
}
