// Data-driven configuration for the krystal core.
//
// `CoreConfig` is loaded from JSON at startup and handed to whatever needs
// it; nothing in the core reads a global or an environment variable. The
// algorithms themselves take no configuration except the expansion
// distance tolerance, so most fields here locate persisted krystals and
// expanders.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Directory holding one JSON file per krystal.
    pub krystals_dir: PathBuf,
    /// Directory holding one JSON file per expander.
    pub expanders_dir: PathBuf,
    /// How many by-name gamete references may be followed before a chain
    /// is treated as a cycle.
    pub max_reference_depth: usize,
    /// Output points whose distances from the input point differ by no
    /// more than this are considered equidistant during expansion.
    pub distance_tolerance: f32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            krystals_dir: PathBuf::from("data/krystals"),
            expanders_dir: PathBuf::from("data/expanders"),
            max_reference_depth: 8,
            distance_tolerance: 1e-4,
        }
    }
}

impl CoreConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
