use std::path::PathBuf;

use shared::PlantSpecies;

use crate::config::ReferenceConfig;

/// Healthy-leaf photos, one per species, shown next to a diagnosis.
#[derive(Debug, Clone)]
pub struct ReferenceLibrary {
    config: ReferenceConfig,
}

impl ReferenceLibrary {
    pub fn new(config: ReferenceConfig) -> Self {
        Self { config }
    }

    pub fn path_for(&self, species: PlantSpecies) -> Option<PathBuf> {
        self.config
            .files
            .get(&species)
            .map(|file| self.config.dir.join(file))
    }

    /// Reference image for the label's species, if one is configured and on disk.
    pub fn lookup(&self, label: &str) -> Option<PathBuf> {
        let species = PlantSpecies::from_label(label)?;
        let path = self.path_for(species)?;
        if path.is_file() {
            Some(path)
        } else {
            log::debug!("No healthy reference at {}", path.display());
            None
        }
    }
}
