use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Instant;
use tch::{CModule, Device, Kind, Tensor};

use shared::Diagnosis;

use crate::config::{ClassifierConfig, DeviceChoice, OutputKind};
use crate::imaging::Image;

use super::preprocess::{PreprocessSettings, preprocess};
use super::{ClassCatalog, Classifier, InferenceError, diagnosis_from_scores};

/// TorchScript classifier. The module is loaded on first use and kept for
/// the life of the process; the mutex doubles as the initialisation guard.
pub struct TorchClassifier {
    model_path: PathBuf,
    device: Device,
    catalog: ClassCatalog,
    settings: PreprocessSettings,
    output: OutputKind,
    model: Mutex<Option<CModule>>,
}

impl TorchClassifier {
    pub fn new(config: &ClassifierConfig, catalog: ClassCatalog) -> Result<Self, InferenceError> {
        let device = match config.device {
            DeviceChoice::Auto => Device::cuda_if_available(),
            DeviceChoice::Cpu => Device::Cpu,
            DeviceChoice::Cuda => Device::Cuda(0),
        };
        Ok(Self {
            model_path: config.model_path.clone(),
            device,
            catalog,
            settings: PreprocessSettings::from_config(config)?,
            output: config.output,
            model: Mutex::new(None),
        })
    }

    pub fn catalog(&self) -> &ClassCatalog {
        &self.catalog
    }

    /// Force the lazy load now so a broken model path fails at startup.
    pub fn warm_up(&self) -> Result<(), InferenceError> {
        self.with_model(|_| Ok(()))
    }

    fn load(&self) -> Result<CModule, InferenceError> {
        let started = Instant::now();
        let mut module = CModule::load_on_device(&self.model_path, self.device).map_err(|e| {
            InferenceError::ModelLoad {
                path: self.model_path.display().to_string(),
                reason: e.to_string(),
            }
        })?;
        module.set_eval();
        log::info!(
            "Loaded classifier {} on {:?} in {:?}",
            self.model_path.display(),
            self.device,
            started.elapsed()
        );
        Ok(module)
    }

    fn with_model<R>(
        &self,
        f: impl FnOnce(&CModule) -> Result<R, InferenceError>,
    ) -> Result<R, InferenceError> {
        let mut guard = self.model.lock().map_err(|_| InferenceError::Poisoned)?;
        if guard.is_none() {
            *guard = Some(self.load()?);
        }
        match guard.as_ref() {
            Some(module) => f(module),
            None => Err(InferenceError::Poisoned),
        }
    }

    /// Raw scores for one image, flattened to the class dimension.
    pub fn inference(&self, image: &Image) -> Result<Vec<f32>, InferenceError> {
        let batch = preprocess(image, &self.settings)?;
        let side = self.settings.size as i64;
        let data = batch.as_slice().ok_or_else(|| {
            InferenceError::PreprocessingError("input tensor is not contiguous".into())
        })?;
        let input = Tensor::from_slice(data)
            .view([1, 3, side, side])
            .to_device(self.device);

        self.with_model(|module| {
            let _no_grad = tch::no_grad_guard();
            let output = module.forward_ts(&[input])?;
            let output_flat = output
                .to_kind(Kind::Float)
                .to_device(Device::Cpu)
                .view([-1]);
            let num_elements = output_flat.numel();
            let mut output_vec = vec![0.0f32; num_elements];
            output_flat.copy_data(&mut output_vec, num_elements);
            Ok(output_vec)
        })
    }
}

impl Classifier for TorchClassifier {
    fn classify(&self, image: &Image) -> Result<Diagnosis, InferenceError> {
        let scores = self.inference(image)?;
        let diagnosis = diagnosis_from_scores(&scores, &self.catalog, self.output)?;
        log::info!(
            "Classified {}x{} image as {} ({:.1}%)",
            image.width(),
            image.height(),
            diagnosis.label,
            diagnosis.confidence_percent()
        );
        Ok(diagnosis)
    }
}
