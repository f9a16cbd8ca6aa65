use serde::{Deserialize, Serialize};
use serde_yaml;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use shared::PlantSpecies;

pub const DEFAULT_CONFIG_PATH: &str = "config/plantcare.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: String, value: String },
    #[error("Classifier model not found at: {0}")]
    MissingModel(PathBuf),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub classifier: ClassifierConfig,
    pub enhancer: EnhancerConfig,
    pub reference: ReferenceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub frontend_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub max_sessions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// The exported model already ends in a softmax.
    Probabilities,
    Logits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceChoice {
    Auto,
    Cpu,
    Cuda,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub model_path: PathBuf,
    pub labels_path: Option<PathBuf>,
    pub input_size: u32,
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
    pub output: OutputKind,
    pub device: DeviceChoice,
    pub preload: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancerConfig {
    pub enabled: bool,
    /// Program used to run `script`, e.g. `python`. When absent `script` is executed directly.
    pub interpreter: Option<String>,
    pub tool_dir: PathBuf,
    pub script: PathBuf,
    pub weights_path: PathBuf,
    pub model_name: String,
    pub scale: u32,
    pub fp32: bool,
    pub output_ext: String,
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub timeout_secs: u64,
    pub settle_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    pub dir: PathBuf,
    pub files: HashMap<PlantSpecies, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            classifier: ClassifierConfig::default(),
            enhancer: EnhancerConfig::default(),
            reference: ReferenceConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            frontend_dir: PathBuf::from("frontend/dist"),
            max_upload_bytes: 20 * 1024 * 1024,
            max_sessions: 256,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/plant_disease_cls.torchscript"),
            labels_path: None,
            input_size: 224,
            mean: vec![0.0, 0.0, 0.0],
            std: vec![1.0, 1.0, 1.0],
            output: OutputKind::Probabilities,
            device: DeviceChoice::Auto,
            preload: true,
        }
    }
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interpreter: Some("python".to_string()),
            tool_dir: PathBuf::from("Real-ESRGAN"),
            script: PathBuf::from("inference_realesrgan.py"),
            weights_path: PathBuf::from("Real-ESRGAN/weights/RealESRGAN_x4plus.pth"),
            model_name: "RealESRGAN_x4plus".to_string(),
            scale: 4,
            fp32: true,
            output_ext: "png".to_string(),
            input_dir: None,
            output_dir: None,
            timeout_secs: 180,
            settle_ms: 2000,
        }
    }
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        let files = [
            (PlantSpecies::Tomato, "tomato.JPG"),
            (PlantSpecies::Potato, "potato.JPG"),
            (PlantSpecies::Pepper, "pepper.JPG"),
        ]
        .into_iter()
        .map(|(species, file)| (species, file.to_string()))
        .collect();

        Self {
            dir: PathBuf::from("healthy"),
            files,
        }
    }
}

impl EnhancerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Script path as it will be checked on disk, resolved against `tool_dir`.
    pub fn script_path(&self) -> PathBuf {
        self.tool_dir.join(&self.script)
    }

    pub fn input_dir(&self) -> PathBuf {
        self.input_dir
            .clone()
            .unwrap_or_else(|| self.tool_dir.join("inputs"))
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.tool_dir.join("results"))
    }

    /// Copy with every path made absolute against the server's working
    /// directory. The tool runs with `tool_dir` as its cwd, so relative paths
    /// handed to it would resolve a second time.
    pub fn resolved(&self) -> std::io::Result<Self> {
        let tool_dir = std::path::absolute(&self.tool_dir)?;
        Ok(Self {
            script: tool_dir.join(&self.script),
            weights_path: std::path::absolute(&self.weights_path)?,
            input_dir: Some(std::path::absolute(self.input_dir())?),
            output_dir: Some(std::path::absolute(self.output_dir())?),
            tool_dir,
            ..self.clone()
        })
    }

    /// Artifacts the external tool needs that are absent on disk.
    pub fn missing_artifacts(&self) -> Vec<PathBuf> {
        [self.script_path(), self.weights_path.clone()]
            .into_iter()
            .filter(|path| !path.exists())
            .collect()
    }
}

impl AppConfig {
    /// Load from `$PLANTCARE_CONFIG` (or the default path) and apply
    /// `PLANTCARE_*` environment overrides.
    pub fn load() -> Result<Self, ConfigurationError> {
        let path = std::env::var("PLANTCARE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut config = if path.exists() {
            log::info!("Loading configuration from {}", path.display());
            Self::from_file(&path)?
        } else {
            log::info!(
                "No configuration file at {}, using defaults",
                path.display()
            );
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let config_str =
            std::fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_yaml(&config_str).map_err(|source| ConfigurationError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(config_str: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(config_str)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("PLANTCARE_HOST") {
            self.server.host = host;
        }
        let port = ["PORT", "PLANTCARE_PORT"]
            .into_iter()
            .find_map(|key| lookup(key).map(|value| (key, value)));
        if let Some((key, port)) = port {
            self.server.port = parse_env(key, &port)?;
        }
        if let Some(dir) = lookup("PLANTCARE_FRONTEND_DIR") {
            self.server.frontend_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("PLANTCARE_MODEL_PATH") {
            self.classifier.model_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("PLANTCARE_LABELS_PATH") {
            self.classifier.labels_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = lookup("PLANTCARE_REALESRGAN_PATH") {
            self.enhancer.tool_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("PLANTCARE_REALESRGAN_WEIGHTS") {
            self.enhancer.weights_path = PathBuf::from(path);
        }
        if let Some(enabled) = lookup("PLANTCARE_ENHANCER_ENABLED") {
            self.enhancer.enabled = parse_env("PLANTCARE_ENHANCER_ENABLED", &enabled)?;
        }
        if let Some(secs) = lookup("PLANTCARE_ENHANCE_TIMEOUT_SECS") {
            self.enhancer.timeout_secs = parse_env("PLANTCARE_ENHANCE_TIMEOUT_SECS", &secs)?;
        }
        if let Some(dir) = lookup("PLANTCARE_HEALTHY_IMAGES_PATH") {
            self.reference.dir = PathBuf::from(dir);
        }
        Ok(())
    }

    /// Eager checks run before the server starts accepting uploads.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let classifier = &self.classifier;
        if classifier.input_size == 0 {
            return Err(ConfigurationError::Invalid(
                "classifier.input_size must be positive".into(),
            ));
        }
        if classifier.mean.len() != 3 || classifier.std.len() != 3 {
            return Err(ConfigurationError::Invalid(
                "classifier.mean and classifier.std need exactly 3 channels".into(),
            ));
        }
        if classifier.std.iter().any(|s| *s == 0.0) {
            return Err(ConfigurationError::Invalid(
                "classifier.std must not contain zero".into(),
            ));
        }
        if !classifier.model_path.exists() {
            return Err(ConfigurationError::MissingModel(
                classifier.model_path.clone(),
            ));
        }

        let enhancer = &self.enhancer;
        if enhancer.scale == 0 {
            return Err(ConfigurationError::Invalid(
                "enhancer.scale must be positive".into(),
            ));
        }
        if enhancer.timeout_secs == 0 {
            return Err(ConfigurationError::Invalid(
                "enhancer.timeout_secs must be positive".into(),
            ));
        }
        // The tool's alternate output names include the input's own name.
        if std::path::absolute(enhancer.input_dir()).ok()
            == std::path::absolute(enhancer.output_dir()).ok()
        {
            return Err(ConfigurationError::Invalid(
                "enhancer.input_dir and enhancer.output_dir must differ".into(),
            ));
        }
        if self.server.max_sessions == 0 {
            return Err(ConfigurationError::Invalid(
                "server.max_sessions must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigurationError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigurationError::InvalidEnv {
            key: key.to_string(),
            value: value.to_string(),
        })
}
