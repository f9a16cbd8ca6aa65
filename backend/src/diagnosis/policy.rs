use std::sync::Arc;
use std::time::Duration;

use shared::{Diagnosis, EnhancementWarning, SessionId, WarningKind};

use crate::classifier::{Classifier, InferenceError};
use crate::enhance::Enhancer;
use crate::imaging::Image;

use super::session::SessionResult;

#[derive(Debug, thiserror::Error)]
pub enum DiagnoseError {
    /// The baseline pass failed; there is nothing to fall back to.
    #[error("Classification failed: {0}")]
    Inference(#[from] InferenceError),
}

/// Runs the baseline pass, the optional enhanced pass, and picks the result.
#[derive(Clone)]
pub struct Orchestrator {
    classifier: Arc<dyn Classifier>,
    enhancer: Arc<dyn Enhancer>,
    enhance_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        enhancer: Arc<dyn Enhancer>,
        enhance_timeout: Duration,
    ) -> Self {
        Self {
            classifier,
            enhancer,
            enhance_timeout,
        }
    }

    pub async fn diagnose(
        &self,
        image: Image,
        use_enhancement: bool,
    ) -> Result<SessionResult, DiagnoseError> {
        self.diagnose_as(SessionId::new(), image, use_enhancement)
            .await
    }

    pub async fn diagnose_as(
        &self,
        id: SessionId,
        image: Image,
        use_enhancement: bool,
    ) -> Result<SessionResult, DiagnoseError> {
        let original = self.classify(&image).await?;
        log::info!(
            "Session {}: original pass {} ({:.1}%)",
            id,
            original.label,
            original.confidence_percent()
        );

        if !use_enhancement {
            return Ok(SessionResult::original_only(id, image, original));
        }

        let enhanced_image = match self.enhancer.enhance(&image, self.enhance_timeout).await {
            Ok(enhanced_image) => enhanced_image,
            Err(e) => {
                log::warn!("Session {}: enhancement failed: {}", id, e);
                let kind = if e.is_timeout() {
                    WarningKind::Timeout
                } else {
                    WarningKind::Error
                };
                let warning = EnhancementWarning {
                    kind,
                    message: e.to_string(),
                };
                return Ok(SessionResult::enhancement_failed(
                    id, image, None, original, warning,
                ));
            }
        };

        let enhanced = match self.classify(&enhanced_image).await {
            Ok(enhanced) => enhanced,
            Err(e) => {
                log::warn!("Session {}: classification of enhanced image failed: {}", id, e);
                let warning = EnhancementWarning {
                    kind: WarningKind::Reclassification,
                    message: e.to_string(),
                };
                return Ok(SessionResult::enhancement_failed(
                    id,
                    image,
                    Some(enhanced_image),
                    original,
                    warning,
                ));
            }
        };

        let result = SessionResult::compared(id, image, enhanced_image, original, enhanced);
        log::info!(
            "Session {}: enhanced pass {} ({:.1}%), selected {}",
            id,
            result.enhanced().map(|d| d.label.as_str()).unwrap_or_default(),
            result
                .enhanced()
                .map(Diagnosis::confidence_percent)
                .unwrap_or_default(),
            result.outcome()
        );
        Ok(result)
    }

    /// Forward passes are CPU/GPU bound, so they run on the blocking pool.
    async fn classify(&self, image: &Image) -> Result<Diagnosis, InferenceError> {
        let classifier = Arc::clone(&self.classifier);
        let image = image.clone();
        tokio::task::spawn_blocking(move || classifier.classify(&image))
            .await
            .map_err(|e| InferenceError::Join(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enhance::EnhanceError;
    use crate::imaging::solid;
    use async_trait::async_trait;
    use shared::SelectionOutcome;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scores by image width so the original and upscaled images get
    /// different answers.
    struct ByWidth {
        small: Result<Diagnosis, ()>,
        large: Result<Diagnosis, ()>,
        calls: AtomicUsize,
    }

    impl ByWidth {
        fn new(small: f32, large: f32) -> Self {
            Self {
                small: Ok(Diagnosis::new("Tomato_Early_blight", small)),
                large: Ok(Diagnosis::new("Tomato_Late_blight", large)),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Classifier for ByWidth {
        fn classify(&self, image: &Image) -> Result<Diagnosis, InferenceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let answer = if image.width() < 8 { &self.small } else { &self.large };
            answer
                .clone()
                .map_err(|_| InferenceError::InvalidOutput("scripted failure".into()))
        }
    }

    enum Script {
        Upscale,
        TimeOut,
        Fail,
    }

    struct FakeEnhancer {
        script: Script,
        calls: AtomicUsize,
    }

    impl FakeEnhancer {
        fn new(script: Script) -> Self {
            Self {
                script,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Enhancer for FakeEnhancer {
        async fn enhance(&self, image: &Image, timeout: Duration) -> Result<Image, EnhanceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.script {
                Script::Upscale => Ok(solid(image.width() * 4, image.height() * 4, [0, 90, 0])),
                Script::TimeOut => Err(EnhanceError::Timeout(timeout)),
                Script::Fail => Err(EnhanceError::NoOutput {
                    status: "exit status: 1".into(),
                    expected: "results/x_out.png".into(),
                    output_dir: "results".into(),
                    listing: vec![],
                    stdout: String::new(),
                    stderr: "boom".into(),
                }),
            }
        }
    }

    fn orchestrator(
        classifier: Arc<ByWidth>,
        enhancer: Arc<FakeEnhancer>,
    ) -> Orchestrator {
        Orchestrator::new(classifier, enhancer, Duration::from_secs(180))
    }

    fn leaf() -> Image {
        solid(4, 4, [30, 120, 40])
    }

    #[tokio::test]
    async fn enhancement_off_never_calls_the_enhancer() {
        let classifier = Arc::new(ByWidth::new(0.7, 0.99));
        let enhancer = Arc::new(FakeEnhancer::new(Script::Upscale));
        let result = orchestrator(classifier.clone(), enhancer.clone())
            .diagnose(leaf(), false)
            .await
            .unwrap();

        assert_eq!(enhancer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.outcome(), SelectionOutcome::Original);
        assert!(result.enhanced_image().is_none());
        assert!(result.enhanced().is_none());
    }

    #[tokio::test]
    async fn higher_enhanced_confidence_wins() {
        for (o, e) in [(0.10, 0.11), (0.5, 0.9), (0.79, 0.80)] {
            let result = orchestrator(
                Arc::new(ByWidth::new(o, e)),
                Arc::new(FakeEnhancer::new(Script::Upscale)),
            )
            .diagnose(leaf(), true)
            .await
            .unwrap();
            assert_eq!(result.outcome(), SelectionOutcome::Enhanced);
            assert_eq!(result.final_diagnosis().confidence, e);
            assert_eq!(result.enhanced_image().map(Image::width), Some(16));
        }
    }

    #[tokio::test]
    async fn equal_or_lower_enhanced_confidence_keeps_original() {
        for (o, e) in [(0.80, 0.80), (0.9, 0.3), (1.0, 0.0)] {
            let result = orchestrator(
                Arc::new(ByWidth::new(o, e)),
                Arc::new(FakeEnhancer::new(Script::Upscale)),
            )
            .diagnose(leaf(), true)
            .await
            .unwrap();
            assert_eq!(result.outcome(), SelectionOutcome::Original);
            assert_eq!(result.final_diagnosis().label, "Tomato_Early_blight");
            assert_eq!(result.enhanced().map(|d| d.confidence), Some(e));
        }
    }

    #[tokio::test]
    async fn enhancement_errors_degrade_to_the_original_pass() {
        for (script, kind) in [
            (Script::TimeOut, WarningKind::Timeout),
            (Script::Fail, WarningKind::Error),
        ] {
            let classifier = Arc::new(ByWidth::new(0.64, 0.99));
            let enhancer = Arc::new(FakeEnhancer::new(script));
            let result = orchestrator(classifier.clone(), enhancer.clone())
                .diagnose(leaf(), true)
                .await
                .unwrap();

            assert_eq!(enhancer.calls.load(Ordering::SeqCst), 1);
            assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
            assert_eq!(result.outcome(), SelectionOutcome::EnhancementFailed);
            assert_eq!(result.final_diagnosis(), &Diagnosis::new("Tomato_Early_blight", 0.64));
            assert_eq!(result.warning().map(|w| w.kind), Some(kind));
            assert!(result.enhanced_image().is_none());
        }
    }

    #[tokio::test]
    async fn failed_reclassification_keeps_enhanced_image_but_not_its_diagnosis() {
        let classifier = Arc::new(ByWidth {
            large: Err(()),
            ..ByWidth::new(0.5, 0.0)
        });
        let result = orchestrator(classifier, Arc::new(FakeEnhancer::new(Script::Upscale)))
            .diagnose(leaf(), true)
            .await
            .unwrap();

        assert_eq!(result.outcome(), SelectionOutcome::EnhancementFailed);
        assert_eq!(
            result.warning().map(|w| w.kind),
            Some(WarningKind::Reclassification)
        );
        assert!(result.enhanced_image().is_some());
        assert!(result.enhanced().is_none());
        assert_eq!(result.final_diagnosis().confidence, 0.5);
    }

    #[tokio::test]
    async fn baseline_failure_fails_the_request_without_enhancing() {
        let classifier = Arc::new(ByWidth {
            small: Err(()),
            ..ByWidth::new(0.0, 0.9)
        });
        let enhancer = Arc::new(FakeEnhancer::new(Script::Upscale));
        let err = orchestrator(classifier, enhancer.clone())
            .diagnose(leaf(), true)
            .await
            .unwrap_err();

        assert!(matches!(err, DiagnoseError::Inference(_)));
        assert_eq!(enhancer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn diagnose_as_keeps_the_session_id() {
        let id = SessionId::new();
        let result = orchestrator(
            Arc::new(ByWidth::new(0.7, 0.1)),
            Arc::new(FakeEnhancer::new(Script::Upscale)),
        )
        .diagnose_as(id, leaf(), false)
        .await
        .unwrap();
        assert_eq!(result.id(), id);
    }
}
