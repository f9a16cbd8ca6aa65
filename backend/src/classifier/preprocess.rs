use image::imageops::{self, FilterType};
use ndarray::Array4;

use crate::config::ClassifierConfig;
use crate::imaging::Image;

use super::InferenceError;

/// Classification transform: centre square crop, resized to `size`, scaled to
/// [0, 1], then `(x - mean) / std` per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessSettings {
    pub size: u32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Default for PreprocessSettings {
    fn default() -> Self {
        Self {
            size: 224,
            mean: [0.0; 3],
            std: [1.0; 3],
        }
    }
}

impl PreprocessSettings {
    pub fn from_config(config: &ClassifierConfig) -> Result<Self, InferenceError> {
        let channels = |values: &[f32], name: &str| -> Result<[f32; 3], InferenceError> {
            values.try_into().map_err(|_| {
                InferenceError::PreprocessingError(format!("{} needs 3 channels", name))
            })
        };
        Ok(Self {
            size: config.input_size,
            mean: channels(&config.mean, "mean")?,
            std: channels(&config.std, "std")?,
        })
    }
}

/// Produce an NCHW batch of one.
pub fn preprocess(image: &Image, settings: &PreprocessSettings) -> Result<Array4<f32>, InferenceError> {
    let size = settings.size;
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(InferenceError::PreprocessingError(
            "image has zero width or height".into(),
        ));
    }
    if size == 0 {
        return Err(InferenceError::PreprocessingError(
            "target size must be positive".into(),
        ));
    }

    // Crop before resizing so the working buffer never exceeds the decoded image.
    let square = width.min(height);
    let left = (width - square) / 2;
    let top = (height - square) / 2;
    let cropped = imageops::crop_imm(image.rgb(), left, top, square, square).to_image();
    let resized = imageops::resize(&cropped, size, size, FilterType::Triangle);

    let side = size as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, side, side));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for channel in 0..3 {
            let value = pixel.0[channel] as f32 / 255.0;
            tensor[[0, channel, y as usize, x as usize]] =
                (value - settings.mean[channel]) / settings.std[channel];
        }
    }
    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::solid;
    use image::{Rgb, RgbImage};

    #[test]
    fn output_is_square_nchw() {
        let settings = PreprocessSettings {
            size: 32,
            ..PreprocessSettings::default()
        };
        let tensor = preprocess(&solid(100, 60, [255, 0, 51]), &settings).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 32, 32]);
        assert!((tensor[[0, 0, 10, 10]] - 1.0).abs() < 1e-6);
        assert!(tensor[[0, 1, 10, 10]].abs() < 1e-6);
        assert!((tensor[[0, 2, 10, 10]] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn normalisation_applies_mean_and_std() {
        let settings = PreprocessSettings {
            size: 8,
            mean: [0.5, 0.5, 0.5],
            std: [0.5, 0.25, 1.0],
        };
        let tensor = preprocess(&solid(8, 8, [255, 255, 0]), &settings).unwrap();
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 1e-6);
        assert!((tensor[[0, 1, 0, 0]] - 2.0).abs() < 1e-6);
        assert!((tensor[[0, 2, 0, 0]] + 0.5).abs() < 1e-6);
    }

    #[test]
    fn centre_crop_drops_the_long_edges() {
        // 3:1 image whose outer thirds are black and centre third is white.
        let image = RgbImage::from_fn(300, 100, |x, _| {
            if (100..200).contains(&x) {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        });
        let settings = PreprocessSettings {
            size: 10,
            ..PreprocessSettings::default()
        };
        let tensor = preprocess(&Image::from_rgb(image), &settings).unwrap();
        assert!(tensor[[0, 0, 5, 5]] > 0.9);
    }

    #[test]
    fn extreme_aspect_ratio_keeps_the_centre_pixel() {
        let image = RgbImage::from_fn(1, 5000, |_, y| {
            if y == 2499 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 0, 0])
            }
        });
        let tensor = preprocess(&Image::from_rgb(image), &PreprocessSettings::default()).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 1e-6);
        assert!((tensor[[0, 0, 223, 223]] - 1.0).abs() < 1e-6);
        assert!(tensor[[0, 1, 100, 100]].abs() < 1e-6);
    }

    #[test]
    fn same_image_gives_the_same_diagnosis() {
        use crate::classifier::{ClassCatalog, diagnosis_from_scores};
        use crate::config::OutputKind;

        let catalog = ClassCatalog::default();
        let settings = PreprocessSettings {
            size: 16,
            ..PreprocessSettings::default()
        };
        let image = Image::from_rgb(RgbImage::from_fn(40, 30, |x, y| {
            Rgb([(x * 6) as u8, (y * 8) as u8, ((x + y) * 3) as u8])
        }));
        // Deterministic stand-in for the network: per-class weighted pixel sums.
        let run = || {
            let tensor = preprocess(&image, &settings).unwrap();
            let logits: Vec<f32> = (0..catalog.len())
                .map(|class| {
                    tensor
                        .iter()
                        .enumerate()
                        .map(|(i, v)| v * ((i + class) % 7) as f32)
                        .sum::<f32>()
                        / tensor.len() as f32
                })
                .collect();
            diagnosis_from_scores(&logits, &catalog, OutputKind::Logits).unwrap()
        };

        let first = run();
        let second = run();
        assert_eq!(first.label, second.label);
        assert_eq!(first.confidence, second.confidence);
    }

    #[test]
    fn config_channels_must_have_three_values() {
        let config = ClassifierConfig {
            mean: vec![0.0, 0.0],
            ..ClassifierConfig::default()
        };
        assert!(matches!(
            PreprocessSettings::from_config(&config),
            Err(InferenceError::PreprocessingError(_))
        ));
        let settings = PreprocessSettings::from_config(&ClassifierConfig::default()).unwrap();
        assert_eq!(settings, PreprocessSettings::default());
    }
}
