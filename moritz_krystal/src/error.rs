// Error type for the krystal data model.
//
// Every failure here is a programmer or data error, never a transient
// condition: callers get the error immediately and nothing is retried.
// Repository I/O and JSON failures are wrapped so loaders can use `?`
// throughout.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KrystalError {
    /// A strand or krystal violates a structural invariant on construction.
    #[error("invalid krystal structure: {0}")]
    InvalidStructure(String),

    /// `aligned_values` was called with a master that does not refine `self`.
    #[error("cannot align krystal values: {0}")]
    Alignment(String),

    /// A name whose type tag is not one of constant/line/exp/mod/perm/path.
    #[error("unknown krystal type: {0}")]
    UnknownKrystalType(String),

    /// A name that does not follow the krystal naming grammar.
    #[error("malformed krystal name: {0}")]
    InvalidName(String),

    /// No krystal with this name exists in the repository.
    #[error("krystal not found: {0}")]
    NotFound(String),

    /// The operation needs heredity, which this variant does not have.
    #[error("{operation} is not applicable to {kind} krystals")]
    NotApplicable {
        operation: &'static str,
        kind: &'static str,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serde error: {0}")]
    Json(#[from] serde_json::Error),
}
