// Moritz expansion engine.
//
// Builds on the krystal data model (`moritz_krystal`) with the geometric
// side of composition: point groups, planets moving across the moments of
// a density krystal, gametes, expanders, and the operations that derive
// new krystals from them.
//
// Architecture:
// - geometry.rs: `Point`, polar helpers
// - point_group.rs: `PointGroup` shapes and coordinate generation
// - planet.rs: `Planet` subpath normalisation and re-basing
// - gamete.rs: `Gamete` summaries, equivalence, evaluated layout
// - expander.rs: `Expander`, by-name gamete references, ordering
// - repository.rs: `ExpanderRepository` loaders and the persisted forms
// - expansion.rs: expanding a density krystal through an expander
// - rebuild.rs: deriving and rebuilding krystals from their heredity
// - error.rs: `ExpansionError`
//
// Anything that needs a krystal or an expander by name gets it from a
// repository passed in by the caller. Planets share their density krystal
// through an `Arc`; every type is `Send + Sync` and mutation needs `&mut`.

pub mod error;
pub mod expander;
pub mod expansion;
pub mod gamete;
pub mod geometry;
pub mod planet;
pub mod point_group;
pub mod rebuild;
pub mod repository;

pub use error::ExpansionError;
pub use expander::{Expander, GameteSide};
pub use expansion::{expand, expansion_strands};
pub use gamete::{Gamete, GameteLayout, GameteRecord};
pub use geometry::{Point, ValuedPoint};
pub use planet::{Planet, PlanetRecord};
pub use point_group::{PointGroup, PointGroupShape};
pub use rebuild::{derive_krystal, rebuild};
pub use repository::{
    DirectoryExpanderRepository, ExpanderFile, ExpanderRepository, InMemoryExpanderRepository,
};
