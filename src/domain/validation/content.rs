use std::io::Cursor;

use image::{ImageFormat, ImageReader};

use crate::errors::AppError;

pub const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];
pub const MIN_FILE_SIZE: usize = 1024;
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;
pub const MIN_DIMENSION: u32 = 50;
pub const MAX_DIMENSION: u32 = 4000;

/// Facts derived from the bytes themselves. Client claims (extension,
/// content type) never make it into here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub format: String,
}

pub fn validate_extension(filename: &str) -> Result<(), AppError> {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());

    match extension {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(AppError::Validation(
            "Invalid file extension. Allowed: jpg, jpeg, png, gif, webp".to_string(),
        )),
    }
}

pub fn validate_size(byte_length: usize) -> Result<(), AppError> {
    if (MIN_FILE_SIZE..=MAX_FILE_SIZE).contains(&byte_length) {
        Ok(())
    } else {
        Err(AppError::Validation(
            "File size must be between 1KB and 10MB".to_string(),
        ))
    }
}

/// Decodes the buffer as a raster image and enforces the dimension policy.
/// The magic bytes are sniffed first so a non-image payload gets a message
/// naming what it actually is.
pub fn validate_content(bytes: &[u8]) -> Result<DecodedImage, AppError> {
    let kind = infer::get(bytes).ok_or_else(|| {
        AppError::Validation("File content is not a recognized image format".to_string())
    })?;
    if kind.matcher_type() != infer::MatcherType::Image {
        return Err(AppError::Validation(format!(
            "File content is {}, not an image",
            kind.mime_type()
        )));
    }

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| AppError::Validation(format!("Unable to read image data: {e}")))?;

    let format = match reader.format() {
        Some(ImageFormat::Jpeg) => "jpeg",
        Some(ImageFormat::Png) => "png",
        Some(ImageFormat::Gif) => "gif",
        Some(ImageFormat::WebP) => "webp",
        Some(other) => {
            return Err(AppError::Validation(format!(
                "Unsupported image format: {other:?}. Allowed: jpeg, png, gif, webp"
            )));
        }
        None => {
            return Err(AppError::Validation(
                "File content is not a supported image".to_string(),
            ));
        }
    };

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| AppError::Validation(format!("Invalid image file: {e}")))?;

    if width < MIN_DIMENSION
        || height < MIN_DIMENSION
        || width > MAX_DIMENSION
        || height > MAX_DIMENSION
    {
        return Err(AppError::Validation(format!(
            "Image dimensions must be between {MIN_DIMENSION}px and {MAX_DIMENSION}px"
        )));
    }

    Ok(DecodedImage {
        width,
        height,
        format: format.to_string(),
    })
}


#[cfg(test)]
mod tests {
    use super::test_images::{jpeg_bytes, png_bytes};
    use super::*;

    #[test]
    fn extension_accepts_allowed_suffixes_case_insensitively() {
        assert!(validate_extension("photo.jpg").is_ok());
        assert!(validate_extension("photo.JPEG").is_ok());
        assert!(validate_extension("archive.tar.png").is_ok());
        assert!(validate_extension("anim.webp").is_ok());
    }

    #[test]
    fn extension_rejects_missing_dot_and_unknown_suffixes() {
        assert!(validate_extension("").is_err());
        assert!(validate_extension("noext").is_err());
        assert!(validate_extension("trailing.").is_err());
        assert!(validate_extension("document.pdf").is_err());
    }

    #[test]
    fn size_bounds_are_inclusive() {
        assert!(validate_size(MIN_FILE_SIZE).is_ok());
        assert!(validate_size(MAX_FILE_SIZE).is_ok());
        assert!(validate_size(MIN_FILE_SIZE - 1).is_err());
        assert!(validate_size(MAX_FILE_SIZE + 1).is_err());
        assert!(validate_size(0).is_err());
    }

    #[test]
    fn content_decodes_png_dimensions_and_format() {
        let decoded = validate_content(&png_bytes(120, 80)).unwrap();
        assert_eq!(decoded.width, 120);
        assert_eq!(decoded.height, 80);
        assert_eq!(decoded.format, "png");
    }

    #[test]
    fn content_decodes_jpeg_format() {
        let decoded = validate_content(&jpeg_bytes(200, 200)).unwrap();
        assert_eq!(decoded.format, "jpeg");
    }

    #[test]
    fn content_rejects_undecodable_bytes() {
        let err = validate_content(b"definitely not an image").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn content_rejects_truncated_image_data() {
        let bytes = png_bytes(120, 80);
        // Magic bytes survive but the IHDR chunk does not.
        let err = validate_content(&bytes[..12]).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn content_rejects_dimensions_below_floor() {
        let err = validate_content(&png_bytes(10, 10)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn content_rejects_one_axis_out_of_range() {
        let err = validate_content(&png_bytes(200, 10)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn content_accepts_boundary_dimensions() {
        assert!(validate_content(&png_bytes(50, 50)).is_ok());
        assert!(validate_content(&png_bytes(50, 4000)).is_ok());
    }
}
