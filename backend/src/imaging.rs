use image::{DynamicImage, ImageFormat, RgbImage};
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Image data is empty")]
    Empty,
    #[error("Image data is too large: {0} bytes (max: {1} bytes)")]
    TooLarge(usize, usize),
    #[error("Unsupported image format, expected JPG or PNG")]
    UnsupportedFormat,
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode image: {0}")]
    Encode(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Immutable RGB raster shared between the upload handler, the adapters and
/// the session record.
#[derive(Clone, Debug)]
pub struct Image {
    pixels: Arc<RgbImage>,
}

impl Image {
    pub fn from_rgb(pixels: RgbImage) -> Self {
        Self {
            pixels: Arc::new(pixels),
        }
    }

    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self::from_rgb(image.to_rgb8())
    }

    pub fn open(path: &Path) -> Result<Self, ImageError> {
        let image = image::open(path).map_err(|e| ImageError::Decode(e.to_string()))?;
        Ok(Self::from_dynamic(image))
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn rgb(&self) -> &RgbImage {
        &self.pixels
    }

    pub fn to_png(&self) -> Result<Vec<u8>, ImageError> {
        let mut buffer = Cursor::new(Vec::new());
        self.pixels
            .write_to(&mut buffer, ImageFormat::Png)
            .map_err(|e| ImageError::Encode(e.to_string()))?;
        Ok(buffer.into_inner())
    }

    pub fn save_png(&self, path: &Path) -> Result<(), ImageError> {
        self.pixels
            .save_with_format(path, ImageFormat::Png)
            .map_err(|e| ImageError::Encode(e.to_string()))
    }

    /// Hex SHA-256 of the raw raster, used to tag an upload in logs.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.width().to_le_bytes());
        hasher.update(self.height().to_le_bytes());
        hasher.update(self.pixels.as_raw());
        hex::encode(hasher.finalize())
    }
}

/// Decode an uploaded file. Only JPEG and PNG are accepted.
pub fn decode_upload(bytes: &[u8], max_bytes: usize) -> Result<Image, ImageError> {
    if bytes.is_empty() {
        return Err(ImageError::Empty);
    }
    if bytes.len() > max_bytes {
        return Err(ImageError::TooLarge(bytes.len(), max_bytes));
    }

    let format = image::guess_format(bytes).map_err(|_| ImageError::UnsupportedFormat)?;
    if !matches!(format, ImageFormat::Jpeg | ImageFormat::Png) {
        return Err(ImageError::UnsupportedFormat);
    }

    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ImageError::Decode(e.to_string()))?;
    Ok(Image::from_dynamic(decoded))
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
        .unwrap_or(false)
}

#[cfg(test)]
pub(crate) fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Image {
    Image::from_rgb(RgbImage::from_pixel(width, height, image::Rgb(rgb)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_upload_decodes_to_rgb() {
        let png = solid(4, 3, [10, 200, 30]).to_png().unwrap();
        let image = decode_upload(&png, 1024 * 1024).unwrap();
        assert_eq!((image.width(), image.height()), (4, 3));
        assert_eq!(image.rgb().get_pixel(0, 0).0, [10, 200, 30]);
    }

    #[test]
    fn jpeg_upload_is_accepted() {
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, image::Rgb([0, 128, 0])))
            .write_to(&mut buffer, ImageFormat::Jpeg)
            .unwrap();
        let image = decode_upload(buffer.get_ref(), 1024 * 1024).unwrap();
        assert_eq!(image.width(), 8);
    }

    #[test]
    fn rejects_empty_oversized_and_foreign_formats() {
        assert!(matches!(decode_upload(&[], 10), Err(ImageError::Empty)));

        let png = solid(2, 2, [0, 0, 0]).to_png().unwrap();
        assert!(matches!(
            decode_upload(&png, 8),
            Err(ImageError::TooLarge(_, 8))
        ));

        let mut gif = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(2, 2))
            .write_to(&mut gif, ImageFormat::Gif)
            .unwrap();
        assert!(matches!(
            decode_upload(gif.get_ref(), 1024),
            Err(ImageError::UnsupportedFormat)
        ));

        assert!(matches!(
            decode_upload(b"definitely not an image", 1024),
            Err(ImageError::UnsupportedFormat)
        ));
    }

    #[test]
    fn digest_tracks_pixel_content() {
        let a = solid(3, 3, [1, 2, 3]);
        let b = solid(3, 3, [1, 2, 3]);
        let c = solid(3, 3, [1, 2, 4]);
        assert_eq!(a.digest(), b.digest());
        assert_ne!(a.digest(), c.digest());
        assert_eq!(a.digest().len(), 64);
    }

    #[test]
    fn image_extensions() {
        assert!(is_image_file(Path::new("a/b_out.PNG")));
        assert!(is_image_file(Path::new("x.jpeg")));
        assert!(!is_image_file(Path::new("x.txt")));
        assert!(!is_image_file(Path::new("noext")));
    }
}
