pub mod discovery;
pub mod handoff;
pub mod realesrgan;

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use crate::imaging::{Image, ImageError};

pub use discovery::{Discovered, DiscoveryTier, discover_output};
pub use handoff::HandoffNames;
pub use realesrgan::RealEsrganEnhancer;

#[derive(Debug, thiserror::Error)]
pub enum EnhanceError {
    #[error("Real-ESRGAN timed out (>{}s). Try with a smaller image.", .0.as_secs())]
    Timeout(Duration),
    #[error("Real-ESRGAN {what} not found at: {}", .path.display())]
    MissingArtifact { what: &'static str, path: PathBuf },
    #[error("Failed to start Real-ESRGAN: {0}")]
    Spawn(std::io::Error),
    #[error(
        "Real-ESRGAN did not produce an output image (exit status: {status}); expected {}. \
         Files in {}: {listing:?}\nstdout:\n{stdout}\nstderr:\n{stderr}",
        .expected.display(),
        .output_dir.display()
    )]
    NoOutput {
        status: String,
        expected: PathBuf,
        output_dir: PathBuf,
        listing: Vec<String>,
        stdout: String,
        stderr: String,
    },
    #[error("Image enhancement is disabled on this server")]
    Disabled,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] ImageError),
    #[error("Enhancement task failed: {0}")]
    Join(String),
}

impl EnhanceError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, EnhanceError::Timeout(_))
    }
}

/// Produces an upscaled copy of an image. Kept behind a trait so the external
/// tool can be replaced by an in-process implementation.
#[async_trait]
pub trait Enhancer: Send + Sync {
    async fn enhance(&self, image: &Image, timeout: Duration) -> Result<Image, EnhanceError>;
}

/// Stand-in used when `enhancer.enabled` is false.
pub struct DisabledEnhancer;

#[async_trait]
impl Enhancer for DisabledEnhancer {
    async fn enhance(&self, _image: &Image, _timeout: Duration) -> Result<Image, EnhanceError> {
        Err(EnhanceError::Disabled)
    }
}
