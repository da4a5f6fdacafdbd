// InputKrystal: a krystal used read-only as input to a generative operation.
//
// Adds the set of values that actually occur (and the ones in the domain
// that don't), plus value alignment against a finer "master" krystal.
// Everything is derived once in `new`; an input krystal never changes.
//
// Alignment (`aligned_values`) walks the master's leveled values and emits
// one of our values per master value. Our cursor only moves when the
// master reaches a boundary at exactly the level of our next value, so our
// values repeat wherever the master subdivides further than we do.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::KrystalError;
use crate::krystal::{Krystal, LeveledValue};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Krystal", into = "Krystal")]
pub struct InputKrystal {
    krystal: Krystal,
    absolute_values: Vec<u32>,
    missing_absolute_values: Vec<u32>,
}

impl InputKrystal {
    pub fn new(krystal: Krystal) -> Self {
        let present: BTreeSet<u32> = krystal.values().collect();
        let missing_absolute_values = (1..krystal.max_value())
            .filter(|v| !present.contains(v))
            .collect();
        InputKrystal {
            absolute_values: present.into_iter().collect(),
            missing_absolute_values,
            krystal,
        }
    }

    pub fn krystal(&self) -> &Krystal {
        &self.krystal
    }

    pub fn into_krystal(self) -> Krystal {
        self.krystal
    }

    pub fn name(&self) -> &str {
        self.krystal.name()
    }

    pub fn level(&self) -> u32 {
        self.krystal.level()
    }

    pub fn num_values(&self) -> u32 {
        self.krystal.num_values()
    }

    pub fn max_value(&self) -> u32 {
        self.krystal.max_value()
    }

    /// The distinct values occurring in the krystal, ascending.
    pub fn absolute_values(&self) -> &[u32] {
        &self.absolute_values
    }

    /// Values in `1..max_value` that never occur, ascending.
    pub fn missing_absolute_values(&self) -> &[u32] {
        &self.missing_absolute_values
    }

    pub fn leveled_values(&self) -> Vec<LeveledValue> {
        self.krystal.leveled_values()
    }

    /// One of our values per value of `master`, repeating ours wherever
    /// `master` subdivides further.
    ///
    /// `master` must have at least as many levels as `self` and must refine
    /// our structure; otherwise the walk cannot consume all of our values
    /// and an `Alignment` error is returned.
    pub fn aligned_values(&self, master: &Krystal) -> Result<Vec<u32>, KrystalError> {
        if master.level() < self.level() {
            return Err(KrystalError::Alignment(format!(
                "master {} has level {}, fewer than {} at level {}",
                master.name(),
                master.level(),
                self.name(),
                self.level()
            )));
        }

        let own = self.leveled_values();
        let mut cursor = 0;
        let mut aligned = Vec::with_capacity(master.num_values() as usize);
        for (i, m) in master.leveled_values().into_iter().enumerate() {
            if i > 0 && own.get(cursor + 1).is_some_and(|next| next.level == m.level) {
                cursor += 1;
            }
            aligned.push(own[cursor].value);
        }

        if cursor + 1 != own.len() {
            return Err(KrystalError::Alignment(format!(
                "master {} does not refine {}: only {} of {} values aligned",
                master.name(),
                self.name(),
                cursor + 1,
                own.len()
            )));
        }
        Ok(aligned)
    }
}

impl From<Krystal> for InputKrystal {
    fn from(krystal: Krystal) -> Self {
        InputKrystal::new(krystal)
    }
}

impl From<InputKrystal> for Krystal {
    fn from(input: InputKrystal) -> Self {
        input.krystal
    }
}
