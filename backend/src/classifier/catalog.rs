use std::collections::HashSet;
use std::path::Path;

/// Label order the shipped classifier was trained with. Index `i` of the
/// model output corresponds to `PLANT_VILLAGE_LABELS[i]`.
pub const PLANT_VILLAGE_LABELS: [&str; 15] = [
    "Pepper__bell___Bacterial_spot",
    "Pepper__bell___healthy",
    "Potato___Early_blight",
    "Potato___Late_blight",
    "Potato___healthy",
    "Tomato_Bacterial_spot",
    "Tomato_Early_blight",
    "Tomato_Late_blight",
    "Tomato_Leaf_Mold",
    "Tomato_Septoria_leaf_spot",
    "Tomato_Spider_mites_Two_spotted_spider_mite",
    "Tomato__Target_Spot",
    "Tomato__Tomato_YellowLeaf__Curl_Virus",
    "Tomato__Tomato_mosaic_virus",
    "Tomato_healthy",
];

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Class catalog is empty")]
    Empty,
    #[error("Duplicate label in class catalog: {0}")]
    Duplicate(String),
    #[error("Failed to read labels file: {0}")]
    Io(#[from] std::io::Error),
}

/// Fixed, ordered list of labels the classifier can emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassCatalog {
    labels: Vec<String>,
}

impl Default for ClassCatalog {
    fn default() -> Self {
        Self {
            labels: PLANT_VILLAGE_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ClassCatalog {
    pub fn new(labels: Vec<String>) -> Result<Self, CatalogError> {
        if labels.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::new();
        for label in &labels {
            if !seen.insert(label.as_str()) {
                return Err(CatalogError::Duplicate(label.clone()));
            }
        }
        Ok(Self { labels })
    }

    /// One label per line; blank lines and `#` comments are skipped.
    pub fn parse(text: &str) -> Result<Self, CatalogError> {
        let labels = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();
        Self::new(labels)
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn disease_labels(&self) -> impl Iterator<Item = &str> {
        self.labels
            .iter()
            .map(String::as_str)
            .filter(|label| !shared::is_healthy_label(label))
    }
}
