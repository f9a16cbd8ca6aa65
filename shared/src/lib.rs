use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumIter, EnumString};
use uuid::Uuid;

/// Identifies one browser session's current analysis.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Display, From)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value.trim()).ok().map(Self)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// A single top-1 classification: the predicted class label and its probability.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Diagnosis {
    pub label: String,
    pub confidence: f32,
}

impl Diagnosis {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }

    pub fn is_healthy(&self) -> bool {
        is_healthy_label(&self.label)
    }

    pub fn confidence_percent(&self) -> f32 {
        self.confidence * 100.0
    }
}

/// Which pass produced the final diagnosis.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, AsRefStr, EnumString, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SelectionOutcome {
    Original,
    Enhanced,
    EnhancementFailed,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, AsRefStr, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WarningKind {
    Timeout,
    Error,
    Reclassification,
}

/// Non-fatal problem raised while trying the enhancement pass.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EnhancementWarning {
    pub kind: WarningKind,
    pub message: String,
}

/// Plant species known to the catalog, matched by token against a label.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, AsRefStr, EnumIter, EnumString, strum_macros::Display,
)]
pub enum PlantSpecies {
    Tomato,
    Potato,
    Pepper,
}

impl PlantSpecies {
    pub fn from_label(label: &str) -> Option<Self> {
        use strum::IntoEnumIterator;
        Self::iter().find(|species| label.contains(species.as_ref()))
    }
}

pub fn is_healthy_label(label: &str) -> bool {
    label.to_lowercase().ends_with("healthy")
}

/// Human readable form of a catalog label, e.g. `Tomato_Leaf_Mold` -> `Tomato Leaf Mold`.
pub fn display_name(label: &str) -> String {
    label
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DiagnosisResponse {
    pub session_id: SessionId,
    #[serde(rename = "final")]
    pub final_diagnosis: Diagnosis,
    pub original: Diagnosis,
    pub enhanced: Option<Diagnosis>,
    pub outcome: SelectionOutcome,
    pub warning: Option<EnhancementWarning>,
    pub healthy: bool,
    pub display_name: String,
    pub species: Option<PlantSpecies>,
    pub treatment: Vec<String>,
    pub reference_url: Option<String>,
    pub original_image_url: String,
    pub enhanced_image_url: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CatalogResponse {
    pub labels: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn healthy_labels_are_detected_case_insensitively() {
        assert!(is_healthy_label("Pepper__bell___healthy"));
        assert!(is_healthy_label("Tomato_healthy"));
        assert!(is_healthy_label("Potato___Healthy"));
        assert!(!is_healthy_label("Tomato_Early_blight"));
    }

    #[test]
    fn display_name_collapses_underscores() {
        assert_eq!(display_name("Tomato_Leaf_Mold"), "Tomato Leaf Mold");
        assert_eq!(
            display_name("Tomato__Tomato_YellowLeaf__Curl_Virus"),
            "Tomato Tomato YellowLeaf Curl Virus"
        );
        assert_eq!(display_name("Pepper__bell___Bacterial_spot"), "Pepper bell Bacterial spot");
    }

    #[test]
    fn species_from_label_token() {
        assert_eq!(PlantSpecies::from_label("Pepper__bell___healthy"), Some(PlantSpecies::Pepper));
        assert_eq!(PlantSpecies::from_label("Potato___Late_blight"), Some(PlantSpecies::Potato));
        assert_eq!(PlantSpecies::from_label("Tomato_Leaf_Mold"), Some(PlantSpecies::Tomato));
        assert_eq!(PlantSpecies::from_label("Corn_rust"), None);
    }

    #[test]
    fn outcome_uses_snake_case_on_the_wire() {
        let json = serde_json::to_string(&SelectionOutcome::EnhancementFailed).unwrap();
        assert_eq!(json, "\"enhancement_failed\"");
        assert_eq!(SelectionOutcome::Enhanced.to_string(), "enhanced");
        assert_eq!(
            SelectionOutcome::from_str("original").unwrap(),
            SelectionOutcome::Original
        );
    }

    #[test]
    fn session_id_round_trips_as_plain_string() {
        let id = SessionId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        assert_eq!(SessionId::parse(&id.to_string()), Some(id));
        assert_eq!(SessionId::parse("not-a-uuid"), None);
    }
}
