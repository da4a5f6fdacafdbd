// Error type for expanders, planets, and expansion.
//
// Krystal-level failures (bad structure, alignment, loader errors) pass
// through unchanged inside `Krystal`. None of these are retried.

use moritz_krystal::KrystalError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExpansionError {
    #[error(transparent)]
    Krystal(#[from] KrystalError),

    /// A point group, gamete, or planet violates a structural invariant.
    #[error("invalid expander structure: {0}")]
    InvalidStructure(String),

    /// Normalisation cannot give every subpath its own start moment.
    #[error("cannot lay out {subpaths} subpaths over {moments} moments")]
    UnresolvablePlanetLayout { subpaths: usize, moments: u32 },

    /// A by-name gamete reference is missing or cyclic.
    #[error("unknown expander reference: {0}")]
    UnknownExpanderReference(String),

    /// No input point carries the value the points input asks for.
    #[error("no input point with value {value} at moment {moment}")]
    MissingInputPoint { value: u32, moment: usize },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serde error: {0}")]
    Json(#[from] serde_json::Error),
}
