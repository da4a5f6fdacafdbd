// Moritz krystal core.
//
// A krystal is a self-similar, leveled sequence of values used as the
// generative skeleton of a composition. This crate holds the data model and
// the algorithms that need nothing but krystals; the expansion crate
// (`moritz_expansion`) builds its geometry and templates on top of it.
// No UI, rendering, or file-dialog code lives here.
//
// Architecture:
// - strand.rs: `Strand`, one leveled run of values
// - krystal.rs: `Krystal` and the `KrystalKind` variants with their heredity;
//   summaries, shape, leveled values, save
// - name.rs: the krystal naming grammar and its sort order
// - input.rs: `InputKrystal`, absolute values and value alignment
// - density.rs: `DensityInputKrystal`, relative planet point positions
// - repository.rs: `KrystalRepository` loaders (in-memory and directory)
// - config.rs: `CoreConfig`, loaded from JSON
// - error.rs: `KrystalError`
//
// Everything is single-threaded and deterministic: the same krystal always
// produces bit-identical derived data.

pub mod config;
pub mod density;
pub mod error;
pub mod input;
pub mod krystal;
pub mod name;
pub mod repository;
pub mod strand;

pub use config::CoreConfig;
pub use density::DensityInputKrystal;
pub use error::KrystalError;
pub use input::InputKrystal;
pub use krystal::{
    ExpansionHeredity, Krystal, KrystalKind, LeveledValue, ModulationHeredity, PathHeredity,
    PermutationHeredity,
};
pub use name::{KrystalName, KrystalType};
pub use repository::{DirectoryKrystalRepository, InMemoryKrystalRepository, KrystalRepository};
pub use strand::Strand;
