// Expander repositories: the loader/saver collaborator for expanders.
//
// Expanders persist as `ExpanderFile`s: the gametes' point groups, each
// planet as a `PlanetRecord` naming its density krystal, and optional
// by-name references to another expander's gamete. `load_expander` turns a
// file back into a fully populated `Expander`:
// - planet density krystals are loaded through the krystal repository;
// - a referenced gamete is taken from the named expander, same side,
//   following further references up to `CoreConfig::max_reference_depth`.
//   A missing target or a longer chain (in practice, a cycle) fails with
//   `UnknownExpanderReference`.
//
// Implementations only move files; resolution lives in the trait's
// provided methods so both share it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use moritz_krystal::{CoreConfig, KrystalRepository};
use serde::{Deserialize, Serialize};

use crate::error::ExpansionError;
use crate::expander::{Expander, GameteSide};
use crate::gamete::{Gamete, GameteRecord};

/// Persisted form of an expander.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpanderFile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_gamete_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_gamete_name: Option<String>,
    #[serde(default)]
    pub input_gamete: GameteRecord,
    #[serde(default)]
    pub output_gamete: GameteRecord,
}

impl ExpanderFile {
    fn side(&self, side: GameteSide) -> (Option<&str>, &GameteRecord) {
        match side {
            GameteSide::Input => (self.input_gamete_name.as_deref(), &self.input_gamete),
            GameteSide::Output => (self.output_gamete_name.as_deref(), &self.output_gamete),
        }
    }
}

pub trait ExpanderRepository {
    /// The stored file for `name`, or `UnknownExpanderReference`.
    fn load_expander_file(&self, name: &str) -> Result<ExpanderFile, ExpansionError>;

    fn store_expander_file(&mut self, file: &ExpanderFile) -> Result<(), ExpansionError>;

    /// All stored names, sorted.
    fn expander_names(&self) -> Result<Vec<String>, ExpansionError>;

    /// Load and fully resolve an expander.
    fn load_expander(
        &self,
        name: &str,
        krystals: &dyn KrystalRepository,
        config: &CoreConfig,
    ) -> Result<Expander, ExpansionError> {
        let file = self.load_expander_file(name)?;
        let depth = config.max_reference_depth;
        let input = resolve_gamete(self, &file, GameteSide::Input, krystals, depth)?;
        let output = resolve_gamete(self, &file, GameteSide::Output, krystals, depth)?;
        Ok(Expander::from_resolved(&file, input, output))
    }

    /// Store an expander and mark its planets saved.
    fn store_expander(&mut self, expander: &mut Expander) -> Result<(), ExpansionError> {
        check_expander_name(expander.name())?;
        self.store_expander_file(&expander.to_file())?;
        expander.mark_saved();
        Ok(())
    }

    /// Name of a stored expander equivalent to `expander`, other than
    /// `expander` itself.
    fn find_equivalent(
        &self,
        expander: &Expander,
        krystals: &dyn KrystalRepository,
        config: &CoreConfig,
    ) -> Result<Option<String>, ExpansionError> {
        for name in self.expander_names()? {
            if name == expander.name() {
                continue;
            }
            if self.load_expander(&name, krystals, config)?.is_equivalent(expander) {
                return Ok(Some(name));
            }
        }
        Ok(None)
    }
}

fn resolve_gamete<R: ExpanderRepository + ?Sized>(
    repo: &R,
    file: &ExpanderFile,
    side: GameteSide,
    krystals: &dyn KrystalRepository,
    depth_left: usize,
) -> Result<Gamete, ExpansionError> {
    match file.side(side) {
        (None, record) => Gamete::from_record(record.clone(), krystals),
        (Some(target), _) => {
            if depth_left == 0 {
                return Err(ExpansionError::UnknownExpanderReference(format!(
                    "{} -> {target}: reference chain too deep",
                    file.name
                )));
            }
            debug!("expander {}: {side:?} gamete from {target}", file.name);
            let target_file = repo.load_expander_file(target)?;
            resolve_gamete(repo, &target_file, side, krystals, depth_left - 1)
        }
    }
}

fn check_expander_name(name: &str) -> Result<(), ExpansionError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(ExpansionError::InvalidStructure(format!(
            "invalid expander name {name:?}"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryExpanderRepository {
    files: BTreeMap<String, ExpanderFile>,
}

impl InMemoryExpanderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl ExpanderRepository for InMemoryExpanderRepository {
    fn load_expander_file(&self, name: &str) -> Result<ExpanderFile, ExpansionError> {
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| ExpansionError::UnknownExpanderReference(name.to_string()))
    }

    fn store_expander_file(&mut self, file: &ExpanderFile) -> Result<(), ExpansionError> {
        check_expander_name(&file.name)?;
        self.files.insert(file.name.clone(), file.clone());
        Ok(())
    }

    fn expander_names(&self) -> Result<Vec<String>, ExpansionError> {
        Ok(self.files.keys().cloned().collect())
    }
}

/// One `<name>` JSON file per expander under `dir`.
#[derive(Debug, Clone)]
pub struct DirectoryExpanderRepository {
    dir: PathBuf,
}

impl DirectoryExpanderRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirectoryExpanderRepository { dir: dir.into() }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(config.expanders_dir.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ExpanderRepository for DirectoryExpanderRepository {
    fn load_expander_file(&self, name: &str) -> Result<ExpanderFile, ExpansionError> {
        check_expander_name(name)?;
        let path = self.dir.join(name);
        if !path.exists() {
            return Err(ExpansionError::UnknownExpanderReference(name.to_string()));
        }
        debug!("loading expander {}", path.display());
        let file: ExpanderFile = serde_json::from_str(&fs::read_to_string(&path)?)?;
        if file.name != name {
            return Err(ExpansionError::InvalidStructure(format!(
                "file {} holds expander {}",
                path.display(),
                file.name
            )));
        }
        Ok(file)
    }

    fn store_expander_file(&mut self, file: &ExpanderFile) -> Result<(), ExpansionError> {
        check_expander_name(&file.name)?;
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&file.name);
        debug!("storing expander {}", path.display());
        fs::write(&path, serde_json::to_string_pretty(file)?)?;
        Ok(())
    }

    fn expander_names(&self) -> Result<Vec<String>, ExpansionError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
