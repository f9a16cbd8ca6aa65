use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::config::EnhancerConfig;
use crate::imaging::Image;

use super::discovery::{DiscoveryTier, discover_output, list_dir};
use super::handoff::{HANDOFF_PREFIX, HandoffNames};
use super::{EnhanceError, Enhancer};

struct ToolOutput {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

/// Runs the Real-ESRGAN command line tool through a file handoff: the input is
/// written to the tool's input folder and the result is picked up from its
/// results folder. Handoff files are left in place for inspection.
pub struct RealEsrganEnhancer {
    config: EnhancerConfig,
}

impl RealEsrganEnhancer {
    pub fn new(config: EnhancerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EnhancerConfig {
        &self.config
    }

    /// Script and weights must exist before anything is spawned.
    pub fn check_artifacts(&self) -> Result<(), EnhanceError> {
        let script = self.config.script_path();
        if !script.is_file() {
            return Err(EnhanceError::MissingArtifact {
                what: "inference script",
                path: script,
            });
        }
        if !self.config.weights_path.is_file() {
            return Err(EnhanceError::MissingArtifact {
                what: "model weights",
                path: self.config.weights_path.clone(),
            });
        }
        Ok(())
    }

    pub fn command_args(&self, input: &Path, output_dir: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-n".into(),
            self.config.model_name.clone().into(),
            "-i".into(),
            input.into(),
            "-o".into(),
            output_dir.into(),
            "-s".into(),
            self.config.scale.to_string().into(),
        ];
        if self.config.fp32 {
            args.push("--fp32".into());
        }
        args.push("--ext".into());
        args.push(self.config.output_ext.clone().into());
        args
    }

    fn command(&self, config: &EnhancerConfig, input: &Path, output_dir: &Path) -> Command {
        let script = config.script_path();
        let mut command = match &config.interpreter {
            Some(interpreter) => {
                let mut command = Command::new(interpreter);
                command.arg(&script);
                command
            }
            None => Command::new(&script),
        };
        command
            .args(self.command_args(input, output_dir))
            .current_dir(&config.tool_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    async fn run_tool(
        &self,
        config: &EnhancerConfig,
        input: &Path,
        output_dir: &Path,
        timeout: Duration,
    ) -> Result<ToolOutput, EnhanceError> {
        let mut command = self.command(config, input, output_dir);
        log::info!("Running Real-ESRGAN: {:?}", command.as_std());

        let mut child = command.spawn().map_err(EnhanceError::Spawn)?;
        let stdout = tokio::spawn(read_pipe(child.stdout.take()));
        let stderr = tokio::spawn(read_pipe(child.stderr.take()));

        let status = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    log::error!("Failed to terminate Real-ESRGAN after timeout: {}", e);
                }
                return Err(EnhanceError::Timeout(timeout));
            }
        };

        let stdout = stdout.await.map_err(|e| EnhanceError::Join(e.to_string()))?;
        let stderr = stderr.await.map_err(|e| EnhanceError::Join(e.to_string()))?;
        log::debug!("Real-ESRGAN exited with {}", status);
        if !stdout.is_empty() {
            log::debug!("Real-ESRGAN stdout:\n{}", stdout);
        }
        if !stderr.is_empty() {
            log::debug!("Real-ESRGAN stderr:\n{}", stderr);
        }

        Ok(ToolOutput {
            status,
            stdout,
            stderr,
        })
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let mut buffer = Vec::new();
    if let Some(mut pipe) = pipe {
        if let Err(e) = pipe.read_to_end(&mut buffer).await {
            log::warn!("Failed to read Real-ESRGAN output: {}", e);
        }
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[async_trait]
impl Enhancer for RealEsrganEnhancer {
    async fn enhance(&self, image: &Image, timeout: Duration) -> Result<Image, EnhanceError> {
        self.check_artifacts()?;

        let config = self.config.resolved()?;
        let input_dir = config.input_dir();
        let output_dir = config.output_dir();
        tokio::fs::create_dir_all(&input_dir).await?;
        tokio::fs::create_dir_all(&output_dir).await?;

        let names = HandoffNames::fresh(HANDOFF_PREFIX, &config.output_ext);
        let input_path = names.input_path(&input_dir);
        let expected = names.expected_output_path(&output_dir);

        let to_write = image.clone();
        let write_path = input_path.clone();
        tokio::task::spawn_blocking(move || to_write.save_png(&write_path))
            .await
            .map_err(|e| EnhanceError::Join(e.to_string()))??;
        log::debug!("Saved enhancement input to {}", input_path.display());

        let started = Instant::now();
        let output = self.run_tool(&config, &input_path, &output_dir, timeout).await?;

        if !expected.is_file() && !config.settle_delay().is_zero() {
            tokio::time::sleep(config.settle_delay()).await;
        }

        let found = discover_output(&output_dir, &names)?.ok_or_else(|| EnhanceError::NoOutput {
            status: output.status.to_string(),
            expected: expected.clone(),
            output_dir: output_dir.clone(),
            listing: list_dir(&output_dir),
            stdout: output.stdout.clone(),
            stderr: output.stderr.clone(),
        })?;
        match found.tier {
            DiscoveryTier::Exact => {}
            DiscoveryTier::Alternate => log::info!(
                "Expected output {} missing, using {}",
                expected.display(),
                found.path.display()
            ),
            DiscoveryTier::Newest => log::warn!(
                "Expected output {} missing, falling back to newest file {}",
                expected.display(),
                found.path.display()
            ),
        }

        let read_path: PathBuf = found.path.clone();
        let enhanced = tokio::task::spawn_blocking(move || Image::open(&read_path))
            .await
            .map_err(|e| EnhanceError::Join(e.to_string()))??;

        log::info!(
            "Enhanced {}x{} -> {}x{} in {:?}; kept {} and {}",
            image.width(),
            image.height(),
            enhanced.width(),
            enhanced.height(),
            started.elapsed(),
            input_path.display(),
            found.path.display()
        );
        Ok(enhanced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::solid;
    use std::fs;
    use tempfile::TempDir;

    fn config_in(dir: &Path) -> EnhancerConfig {
        EnhancerConfig {
            interpreter: Some("sh".to_string()),
            tool_dir: dir.to_path_buf(),
            script: PathBuf::from("inference.sh"),
            weights_path: dir.join("weights.pth"),
            settle_ms: 0,
            ..EnhancerConfig::default()
        }
    }

    #[test]
    fn arguments_select_model_scale_precision_and_format() {
        let enhancer = RealEsrganEnhancer::new(EnhancerConfig::default());
        let args = enhancer.command_args(Path::new("in/a.png"), Path::new("out"));
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "-n", "RealESRGAN_x4plus", "-i", "in/a.png", "-o", "out", "-s", "4", "--fp32",
                "--ext", "png"
            ]
        );

        let half = RealEsrganEnhancer::new(EnhancerConfig {
            fp32: false,
            ..EnhancerConfig::default()
        });
        let args = half.command_args(Path::new("a.png"), Path::new("out"));
        assert!(!args.iter().any(|a| a == "--fp32"));
    }

    #[test]
    fn artifacts_are_checked_before_invocation() {
        let dir = TempDir::new().unwrap();
        let enhancer = RealEsrganEnhancer::new(config_in(dir.path()));
        assert!(matches!(
            enhancer.check_artifacts(),
            Err(EnhanceError::MissingArtifact { what: "inference script", .. })
        ));

        fs::write(dir.path().join("inference.sh"), "exit 0\n").unwrap();
        assert!(matches!(
            enhancer.check_artifacts(),
            Err(EnhanceError::MissingArtifact { what: "model weights", .. })
        ));

        fs::write(dir.path().join("weights.pth"), b"w").unwrap();
        enhancer.check_artifacts().unwrap();
    }

    #[tokio::test]
    async fn missing_weights_fail_without_writing_handoff_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("inference.sh"), "exit 0\n").unwrap();
        let enhancer = RealEsrganEnhancer::new(config_in(dir.path()));

        let err = enhancer
            .enhance(&solid(4, 4, [1, 2, 3]), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, EnhanceError::MissingArtifact { .. }));
        assert!(!dir.path().join("inputs").exists());
    }
}
