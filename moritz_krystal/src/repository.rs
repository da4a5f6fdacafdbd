// Krystal repositories: the loader/saver collaborator for krystals.
//
// The data model never touches the filesystem itself; anything that needs
// a krystal by name (planet re-basing, rebuilding derived krystals) goes
// through a `KrystalRepository`. Two implementations:
// - `InMemoryKrystalRepository`: a name-keyed map, used by tests and by
//   callers composing krystals without persisting them.
// - `DirectoryKrystalRepository`: one JSON file per krystal in a
//   directory, the file name being the krystal name.
//
// Both check the name grammar first, so a name with an unrecognized type
// tag fails with `UnknownKrystalType` before any lookup happens.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;

use crate::config::CoreConfig;
use crate::density::DensityInputKrystal;
use crate::error::KrystalError;
use crate::input::InputKrystal;
use crate::krystal::Krystal;
use crate::name::{KrystalName, compare_names};

pub trait KrystalRepository {
    fn load_krystal(&self, name: &str) -> Result<Krystal, KrystalError>;

    fn store_krystal(&mut self, krystal: &Krystal) -> Result<(), KrystalError>;

    /// All stored names, in krystal name order.
    fn krystal_names(&self) -> Result<Vec<String>, KrystalError>;

    fn load_input_krystal(&self, name: &str) -> Result<InputKrystal, KrystalError> {
        Ok(InputKrystal::new(self.load_krystal(name)?))
    }

    fn load_density_input(&self, name: &str) -> Result<Arc<DensityInputKrystal>, KrystalError> {
        Ok(Arc::new(DensityInputKrystal::new(self.load_krystal(name)?)))
    }
}

/// Parse `name` and check that it agrees with the krystal's variant.
fn check_name(krystal: &Krystal) -> Result<KrystalName, KrystalError> {
    let name = KrystalName::parse(krystal.name())?;
    if name.krystal_type != krystal.krystal_type() {
        return Err(KrystalError::InvalidStructure(format!(
            "krystal {} is a {} krystal",
            krystal.name(),
            krystal.krystal_type()
        )));
    }
    Ok(name)
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryKrystalRepository {
    krystals: BTreeMap<String, Krystal>,
}

impl InMemoryKrystalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.krystals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.krystals.is_empty()
    }
}

impl KrystalRepository for InMemoryKrystalRepository {
    fn load_krystal(&self, name: &str) -> Result<Krystal, KrystalError> {
        KrystalName::parse(name)?;
        self.krystals
            .get(name)
            .cloned()
            .ok_or_else(|| KrystalError::NotFound(name.to_string()))
    }

    fn store_krystal(&mut self, krystal: &Krystal) -> Result<(), KrystalError> {
        check_name(krystal)?;
        self.krystals
            .insert(krystal.name().to_string(), krystal.clone());
        Ok(())
    }

    fn krystal_names(&self) -> Result<Vec<String>, KrystalError> {
        let mut names: Vec<String> = self.krystals.keys().cloned().collect();
        names.sort_by(|a, b| compare_names(a, b));
        Ok(names)
    }
}

/// One `<name>` JSON file per krystal under `dir`.
#[derive(Debug, Clone)]
pub struct DirectoryKrystalRepository {
    dir: PathBuf,
}

impl DirectoryKrystalRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirectoryKrystalRepository { dir: dir.into() }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(config.krystals_dir.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl KrystalRepository for DirectoryKrystalRepository {
    fn load_krystal(&self, name: &str) -> Result<Krystal, KrystalError> {
        let parsed = KrystalName::parse(name)?;
        let path = self.dir.join(name);
        if !path.exists() {
            return Err(KrystalError::NotFound(name.to_string()));
        }
        debug!("loading krystal {}", path.display());
        let json = fs::read_to_string(&path)?;
        let krystal: Krystal = serde_json::from_str(&json)?;
        if krystal.name() != name || krystal.krystal_type() != parsed.krystal_type {
            return Err(KrystalError::InvalidStructure(format!(
                "file {} holds krystal {} ({})",
                path.display(),
                krystal.name(),
                krystal.krystal_type()
            )));
        }
        Ok(krystal)
    }

    fn store_krystal(&mut self, krystal: &Krystal) -> Result<(), KrystalError> {
        check_name(krystal)?;
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(krystal.name());
        debug!("storing krystal {}", path.display());
        fs::write(&path, serde_json::to_string_pretty(krystal)?)?;
        Ok(())
    }

    fn krystal_names(&self) -> Result<Vec<String>, KrystalError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let file_name = entry?.file_name();
            match file_name.to_str() {
                Some(name) if KrystalName::parse(name).is_ok() => names.push(name.to_string()),
                _ => {}
            }
        }
        names.sort_by(|a, b| compare_names(a, b));
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::krystal::{KrystalKind, PermutationHeredity};
    use crate::strand::Strand;

    fn permutation(index: u32) -> Krystal {
        Krystal::with_index(
            KrystalKind::Permutation(PermutationHeredity {
                source: "3.1_3.1.line.krys".into(),
                permutation_level: 1,
                contour: 1,
            }),
            vec![Strand::new(1, vec![2, 3, 1]).unwrap()],
            index,
        )
        .unwrap()
    }

    #[test]
    fn test_in_memory_store_and_load() {
        let mut repo = InMemoryKrystalRepository::new();
        let line = Krystal::line(vec![1, 2, 3], 1).unwrap();
        repo.store_krystal(&line).unwrap();
        repo.store_krystal(&permutation(1)).unwrap();
        assert_eq!(repo.len(), 2);
        assert_eq!(repo.load_krystal("3.1_3.1.line.krys").unwrap(), line);

        let input = repo.load_input_krystal("3.1_3.1.line.krys").unwrap();
        assert_eq!(input.absolute_values(), &[1, 2, 3]);
        let density = repo.load_density_input("3.1_3.1.line.krys").unwrap();
        assert_eq!(density.relative_planet_point_positions(), &[0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_in_memory_errors() {
        let repo = InMemoryKrystalRepository::new();
        assert!(matches!(
            repo.load_krystal("3.1_3.1.wave.krys").unwrap_err(),
            KrystalError::UnknownKrystalType(_)
        ));
        assert!(matches!(
            repo.load_krystal("3.1_3.1.line.krys").unwrap_err(),
            KrystalError::NotFound(_)
        ));
    }

    #[test]
    fn test_store_rejects_mismatched_name() {
        let mut repo = InMemoryKrystalRepository::new();
        let k = Krystal::new(
            "3.1_3.1.line.krys",
            KrystalKind::Permutation(PermutationHeredity {
                source: "s".into(),
                permutation_level: 1,
                contour: 0,
            }),
            vec![Strand::new(1, vec![1, 2, 3]).unwrap()],
        )
        .unwrap();
        assert!(repo.store_krystal(&k).is_err());
    }

    #[test]
    fn test_directory_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = DirectoryKrystalRepository::new(dir.path());
        let line = Krystal::line(vec![4, 1, 2, 4], 2).unwrap();
        let perm = permutation(1);
        repo.store_krystal(&perm).unwrap();
        repo.store_krystal(&line).unwrap();

        assert_eq!(repo.load_krystal(line.name()).unwrap(), line);
        assert_eq!(repo.load_krystal(perm.name()).unwrap(), perm);
        assert_eq!(
            repo.krystal_names().unwrap(),
            vec![perm.name().to_string(), line.name().to_string()]
        );
        assert!(matches!(
            repo.load_krystal("4.1_4.9.line.krys").unwrap_err(),
            KrystalError::NotFound(_)
        ));
    }

    #[test]
    fn test_directory_from_config() {
        let config = CoreConfig::default();
        let repo = DirectoryKrystalRepository::from_config(&config);
        assert_eq!(repo.dir(), config.krystals_dir.as_path());
    }
}
