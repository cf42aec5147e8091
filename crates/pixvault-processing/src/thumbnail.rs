//! Thumbnail generation.

use image::{ImageFormat, ImageReader};
use std::io::Cursor;

use pixvault_core::{AppError, ThumbnailSize};

/// Decode `data` and report its pixel dimensions and container format.
pub fn picture_dimensions(data: &[u8]) -> Result<(u32, u32, String), AppError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| AppError::ImageProcessing(e.to_string()))?;

    let format = reader
        .format()
        .map(|f| format!("{:?}", f).to_lowercase())
        .unwrap_or_else(|| "unknown".to_string());

    let img = reader
        .decode()
        .map_err(|e| AppError::ImageProcessing(e.to_string()))?;

    Ok((img.width(), img.height(), format))
}

/// Produce one JPEG thumbnail variant of `data`.
///
/// The source is scaled, preserving aspect ratio, to the largest size fitting
/// the variant's bounding box, so a larger variant always has more pixels
/// than a smaller one. Regenerating a thumbnail yields identical bytes, which
/// keeps reprocessing after a requeue idempotent.
pub fn generate_thumbnail(data: &[u8], size: ThumbnailSize) -> Result<Vec<u8>, AppError> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| AppError::ImageProcessing(e.to_string()))?
        .decode()
        .map_err(|e| AppError::ImageProcessing(e.to_string()))?;

    let bound = size.bound();
    let resized = img.resize(bound, bound, image::imageops::FilterType::Triangle);

    // JPEG has no alpha channel.
    let rgb = resized.into_rgb8();

    let mut buffer = Cursor::new(Vec::new());
    rgb.write_to(&mut buffer, ImageFormat::Jpeg)
        .map_err(|e| AppError::ImageProcessing(e.to_string()))?;

    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    /// Gradient image; compresses worse than a flat fill, so byte sizes track
    /// pixel counts.
    pub(crate) fn gradient_jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                ((x + y) % 256) as u8,
            ])
        });
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, ImageFormat::Jpeg).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn dimensions_and_format_are_reported() {
        let data = gradient_jpeg(320, 240);
        let (width, height, format) = picture_dimensions(&data).unwrap();
        assert_eq!((width, height), (320, 240));
        assert_eq!(format, "jpeg");
    }

    #[test]
    fn invalid_data_is_rejected() {
        assert!(picture_dimensions(b"not an image").is_err());
        assert!(generate_thumbnail(b"not an image", ThumbnailSize::Sm).is_err());
    }

    #[test]
    fn variants_scale_up_and_down_to_their_bounds() {
        let data = gradient_jpeg(100, 100);

        let sm = generate_thumbnail(&data, ThumbnailSize::Sm).unwrap();
        let (w, h, _) = picture_dimensions(&sm).unwrap();
        assert_eq!((w, h), (128, 128));

        let data = gradient_jpeg(4000, 2000);
        let lg = generate_thumbnail(&data, ThumbnailSize::Lg).unwrap();
        let (w, h, _) = picture_dimensions(&lg).unwrap();
        assert_eq!((w, h), (1024, 512));
    }

    #[test]
    fn byte_sizes_increase_with_the_variant() {
        let data = gradient_jpeg(100, 100);
        let sm = generate_thumbnail(&data, ThumbnailSize::Sm).unwrap().len();
        let md = generate_thumbnail(&data, ThumbnailSize::Md).unwrap().len();
        let lg = generate_thumbnail(&data, ThumbnailSize::Lg).unwrap().len();
        assert!(sm > 0);
        assert!(sm < md && md < lg, "expected {} < {} < {}", sm, md, lg);
    }

    #[test]
    fn regeneration_is_deterministic() {
        let data = gradient_jpeg(300, 200);
        let first = generate_thumbnail(&data, ThumbnailSize::Md).unwrap();
        let second = generate_thumbnail(&data, ThumbnailSize::Md).unwrap();
        assert_eq!(first, second);
    }
}
