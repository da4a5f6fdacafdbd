// Expander: a paired input/output gamete template.
//
// An expander either owns each gamete or names another expander whose
// gamete it uses (`input_gamete_name` / `output_gamete_name`). The name is
// a reference, never ownership: the repository resolves it at load time
// and fills in a copy, and saving writes the name back instead of the
// gamete. Equivalence therefore compares resolved gametes and needs no
// I/O.

use std::cmp::Ordering;
use std::sync::Arc;

use moritz_krystal::{DensityInputKrystal, KrystalRepository};

use crate::error::ExpansionError;
use crate::gamete::{Gamete, GameteRecord};
use crate::repository::ExpanderFile;

/// Which half of an expander a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameteSide {
    Input,
    Output,
}

#[derive(Debug, Clone)]
pub struct Expander {
    name: String,
    input_gamete_name: Option<String>,
    output_gamete_name: Option<String>,
    input_gamete: Gamete,
    output_gamete: Gamete,
}

impl Expander {
    pub fn new(name: impl Into<String>, input_gamete: Gamete, output_gamete: Gamete) -> Self {
        Expander {
            name: name.into(),
            input_gamete_name: None,
            output_gamete_name: None,
            input_gamete,
            output_gamete,
        }
    }

    /// Assemble an expander whose references have already been resolved.
    pub(crate) fn from_resolved(
        file: &ExpanderFile,
        input_gamete: Gamete,
        output_gamete: Gamete,
    ) -> Self {
        Expander {
            name: file.name.clone(),
            input_gamete_name: file.input_gamete_name.clone(),
            output_gamete_name: file.output_gamete_name.clone(),
            input_gamete,
            output_gamete,
        }
    }

    /// Record that a gamete is shared with another expander. `gamete` is
    /// that expander's resolved gamete.
    pub fn set_gamete_reference(
        &mut self,
        side: GameteSide,
        expander_name: String,
        gamete: Gamete,
    ) {
        match side {
            GameteSide::Input => {
                self.input_gamete_name = Some(expander_name);
                self.input_gamete = gamete;
            }
            GameteSide::Output => {
                self.output_gamete_name = Some(expander_name);
                self.output_gamete = gamete;
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_gamete_name(&self) -> Option<&str> {
        self.input_gamete_name.as_deref()
    }

    pub fn output_gamete_name(&self) -> Option<&str> {
        self.output_gamete_name.as_deref()
    }

    pub fn input_gamete(&self) -> &Gamete {
        &self.input_gamete
    }

    pub fn output_gamete(&self) -> &Gamete {
        &self.output_gamete
    }

    pub fn gamete(&self, side: GameteSide) -> &Gamete {
        match side {
            GameteSide::Input => &self.input_gamete,
            GameteSide::Output => &self.output_gamete,
        }
    }

    pub fn gamete_name(&self, side: GameteSide) -> Option<&str> {
        match side {
            GameteSide::Input => self.input_gamete_name(),
            GameteSide::Output => self.output_gamete_name(),
        }
    }

    pub fn is_saved(&self) -> bool {
        self.input_gamete.is_saved() && self.output_gamete.is_saved()
    }

    pub(crate) fn mark_saved(&mut self) {
        self.input_gamete.mark_saved();
        self.output_gamete.mark_saved();
    }

    /// Both resolved gametes are structurally equivalent. Names, colours
    /// and visibility play no part.
    pub fn is_equivalent(&self, other: &Expander) -> bool {
        self.input_gamete.is_structurally_equivalent(&other.input_gamete)
            && self.output_gamete.is_structurally_equivalent(&other.output_gamete)
    }

    /// `Equal` for equivalent expanders, otherwise name order.
    pub fn compare(&self, other: &Expander) -> Ordering {
        if self.is_equivalent(other) {
            Ordering::Equal
        } else {
            self.name.cmp(&other.name)
        }
    }

    /// Re-base every planet of both gametes onto `density`.
    pub fn rebase_planets<R: KrystalRepository + ?Sized>(
        &mut self,
        krystals: &R,
        density: &Arc<DensityInputKrystal>,
    ) -> Result<(), ExpansionError> {
        self.input_gamete.rebase_planets(krystals, density)?;
        self.output_gamete.rebase_planets(krystals, density)
    }

    /// Persisted form. A referenced gamete is written as its name only.
    pub fn to_file(&self) -> ExpanderFile {
        let record = |name: &Option<String>, gamete: &Gamete| match name {
            Some(_) => GameteRecord::default(),
            None => gamete.to_record(),
        };
        ExpanderFile {
            name: self.name.clone(),
            input_gamete_name: self.input_gamete_name.clone(),
            output_gamete_name: self.output_gamete_name.clone(),
            input_gamete: record(&self.input_gamete_name, &self.input_gamete),
            output_gamete: record(&self.output_gamete_name, &self.output_gamete),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point_group::{PointGroup, PointGroupShape};

    fn gamete(values: Vec<u32>, radius: f32) -> Gamete {
        let group = PointGroup {
            from_radius: radius,
            ..PointGroup::fixed(PointGroupShape::Circle, values)
        };
        Gamete::new(vec![group], vec![]).unwrap()
    }

    #[test]
    fn test_equivalent_expanders_compare_equal() {
        let a = Expander::new("alpha", gamete(vec![1, 2], 5.0), gamete(vec![1, 2, 3], 9.0));
        let b = Expander::new("beta", gamete(vec![1, 2], 5.0), gamete(vec![1, 2, 3], 9.0));
        assert!(a.is_equivalent(&b));
        assert_eq!(a.compare(&b), Ordering::Equal);
    }

    #[test]
    fn test_inequivalent_expanders_order_by_name() {
        let a = Expander::new("alpha", gamete(vec![1, 2], 5.0), gamete(vec![1, 2, 3], 9.0));
        let b = Expander::new("beta", gamete(vec![1, 2], 6.0), gamete(vec![1, 2, 3], 9.0));
        assert!(!a.is_equivalent(&b));
        assert_eq!(a.compare(&b), Ordering::Less);
        assert_eq!(b.compare(&a), Ordering::Greater);
    }

    #[test]
    fn test_reference_written_by_name() {
        let mut e = Expander::new("child", gamete(vec![1], 1.0), gamete(vec![2], 1.0));
        e.set_gamete_reference(GameteSide::Output, "parent".into(), gamete(vec![3, 4], 2.0));
        assert_eq!(e.gamete_name(GameteSide::Output), Some("parent"));
        assert_eq!(e.gamete(GameteSide::Output).number_of_values(), 2);

        let file = e.to_file();
        assert_eq!(file.output_gamete, GameteRecord::default());
        assert_eq!(file.input_gamete.fixed_point_groups.len(), 1);
        assert_eq!(file.input_gamete_name, None);
    }
}
