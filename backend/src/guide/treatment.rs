use lazy_static::lazy_static;
use std::collections::HashMap;

type Steps = [&'static str; 4];

const COPPER_SPRAY_STEPS: Steps = [
    "Remove and destroy infected leaves.",
    "Spray copper-based bactericides regularly.",
    "Practice crop rotation and sanitize tools to prevent spread.",
    "Ensure good air circulation by pruning dense foliage.",
];

lazy_static! {
    static ref TREATMENT_GUIDE: HashMap<&'static str, Steps> = {
        let mut guide = HashMap::new();
        guide.insert("Pepper__bell___Bacterial_spot", COPPER_SPRAY_STEPS);
        guide.insert(
            "Potato___Early_blight",
            [
                "Remove affected foliage to prevent spore spread.",
                "Apply fungicides containing Chlorothalonil or Mancozeb.",
                "Rotate crops and avoid planting potatoes in the same soil consecutively.",
                "Ensure proper spacing for good air circulation.",
            ],
        );
        guide.insert(
            "Potato___Late_blight",
            [
                "Remove and destroy infected plants immediately.",
                "Apply fungicides containing Metalaxyl or Mancozeb at the first signs of infection.",
                "Avoid overhead irrigation; use drip irrigation instead.",
                "Plant resistant potato varieties if available.",
            ],
        );
        guide.insert("Tomato_Bacterial_spot", COPPER_SPRAY_STEPS);
        guide.insert(
            "Tomato_Early_blight",
            [
                "Remove affected leaves and destroy them.",
                "Apply fungicides such as Chlorothalonil or Copper hydroxide.",
                "Rotate crops and avoid planting tomatoes in the same soil consecutively.",
                "Keep soil moisture consistent but avoid wetting leaves.",
            ],
        );
        guide.insert(
            "Tomato_Late_blight",
            [
                "Remove infected plants and dispose of them safely.",
                "Apply protective fungicides like Metalaxyl or Mancozeb before infection spreads.",
                "Ensure good drainage to prevent waterlogging.",
                "Plant resistant tomato varieties if possible.",
            ],
        );
        guide.insert(
            "Tomato_Leaf_Mold",
            [
                "Remove infected leaves to prevent spore spread.",
                "Apply fungicides such as Mancozeb or Copper oxychloride.",
                "Maintain proper plant spacing for airflow.",
                "Avoid wetting leaves during irrigation.",
            ],
        );
        guide.insert(
            "Tomato_Septoria_leaf_spot",
            [
                "Remove infected leaves and destroy them.",
                "Apply fungicides like Chlorothalonil or Mancozeb.",
                "Practice crop rotation and keep soil clean from debris.",
                "Ensure proper spacing and airflow around plants.",
            ],
        );
        guide.insert(
            "Tomato_Spider_mites_Two_spotted_spider_mite",
            [
                "Spray insecticidal soap or neem oil directly on affected areas.",
                "Maintain adequate humidity to discourage mite development.",
                "Introduce natural predators like ladybugs or predatory mites.",
                "Avoid excessive use of nitrogen fertilizers which favor mite growth.",
            ],
        );
        guide.insert(
            "Tomato__Target_Spot",
            [
                "Remove and destroy infected leaves.",
                "Apply fungicides like Chlorothalonil or Copper oxychloride.",
                "Ensure good spacing and pruning for airflow.",
                "Practice crop rotation to reduce recurring infections.",
            ],
        );
        guide.insert(
            "Tomato__Tomato_YellowLeaf__Curl_Virus",
            [
                "Remove and destroy infected plants immediately.",
                "Control whitefly populations using yellow sticky traps or insecticides.",
                "Avoid planting tomatoes near infected crops.",
                "Use resistant tomato varieties if available.",
            ],
        );
        guide.insert(
            "Tomato__Tomato_mosaic_virus",
            [
                "Remove infected plants and sanitize all tools.",
                "Avoid handling healthy plants after touching infected ones.",
                "Practice crop rotation and avoid planting tomatoes continuously.",
                "Wash hands and tools frequently to prevent virus spread.",
            ],
        );
        guide
    };
}

/// Treatment advice for disease labels.
pub struct TreatmentGuide;

impl TreatmentGuide {
    /// Ordered steps for `label`; empty for healthy or unknown labels.
    pub fn steps(label: &str) -> &'static [&'static str] {
        TREATMENT_GUIDE
            .get(label)
            .map(|steps| steps.as_slice())
            .unwrap_or(&[])
    }

    pub fn labels() -> impl Iterator<Item = &'static str> {
        TREATMENT_GUIDE.keys().copied()
    }
}
