use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use std::io::Write;
use tempfile::NamedTempFile;

use crate::error::AppError;

pub const MAX_EDGE: u32 = 1024;
const JPEG_QUALITY: u8 = 85;

/// Accepts raw base64 or a `data:<mime>;base64,` URL.
pub fn decode_base64_photo(photo: &str) -> Result<Vec<u8>, AppError> {
    let payload = photo.split_once(',').map_or(photo, |(_, data)| data);
    BASE64
        .decode(payload.trim())
        .map_err(|e| AppError::Validation(format!("Invalid image data: {}", e)))
}

/// The file is removed when the handle is dropped.
pub fn write_temp_photo(bytes: &[u8]) -> Result<NamedTempFile, AppError> {
    let staged = tempfile::Builder::new()
        .prefix("outfit-person-")
        .suffix(".png")
        .tempfile()
        .and_then(|mut file| {
            file.write_all(bytes)?;
            file.flush()?;
            Ok(file)
        })
        .map_err(|e| AppError::Upload(format!("Failed to process person image: {}", e)))?;
    Ok(staged)
}

/// Caps the longest edge at [`MAX_EDGE`], flattens transparency onto white
/// and re-encodes as JPEG.
pub fn to_jpeg_data_url(bytes: &[u8]) -> Result<String, AppError> {
    let img = image::load_from_memory(bytes)?;
    let img = if img.width() > MAX_EDGE || img.height() > MAX_EDGE {
        img.resize(MAX_EDGE, MAX_EDGE, FilterType::Lanczos3)
    } else {
        img
    };

    let rgb = flatten_onto_white(&img);
    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, JPEG_QUALITY).encode_image(&rgb)?;

    tracing::info!(
        "Image optimized: {} -> {} bytes ({}x{})",
        bytes.len(),
        encoded.len(),
        rgb.width(),
        rgb.height()
    );

    Ok(format!("data:image/jpeg;base64,{}", BASE64.encode(&encoded)))
}

fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = u32::from(a);
        let blend = |c: u8| ((u32::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}
