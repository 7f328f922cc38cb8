//! # Image Loading and Embedding
//!
//! Turns dropped image files into something the surface can hold inline: a
//! base64 data URI plus the intrinsic pixel size, read from the image header.
//! Reading the header is what rejects corrupt files, so a bad file fails
//! here, on its own, without affecting the other files of the same drop.
//!
//! Only PNG, JPEG, GIF and WebP headers are read. Any other image (SVG, BMP,
//! ICO, ...) is embedded as declared, with no known intrinsic size.
//!
//! Also reads existing `data:image/...;base64,...` sources back, so images
//! already in a document can be measured without a renderer.

use std::io::Cursor;

use base64::Engine;
use image::ImageFormat;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Not an image file: {0}")]
    NotAnImage(String),

    #[error("Image data too short")]
    TooShort,

    #[error("Unsupported image format (expected PNG, JPEG, GIF or WebP)")]
    UnsupportedFormat,

    #[error("Invalid data URI: {0}")]
    InvalidDataUri(&'static str),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Failed to read image: {0}")]
    Decode(#[from] image::ImageError),
}

/// A file taken from a drop payload.
#[derive(Debug, Clone)]
pub struct DroppedFile {
    pub name: String,
    /// Declared MIME type, as reported by the drop source.
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl DroppedFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    pub fn is_image(&self) -> bool {
        is_image_mime(&self.mime)
    }
}

/// Whether a declared MIME type names an image.
pub fn is_image_mime(mime: &str) -> bool {
    mime.trim()
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
}

/// An image ready to be placed in the document.
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    pub data_uri: String,
    /// Intrinsic `(width, height)` in pixels, when the header could be read.
    pub size: Option<(u32, u32)>,
}

impl EmbeddedImage {
    /// Display size fitted into `max_width` × `max_height`, keeping the
    /// aspect ratio. Never scales up. `None` when the size is unknown.
    pub fn fitted(&self, max_width: f64, max_height: f64) -> Option<(f64, f64)> {
        let (width, height) = self.size?;
        Some(fit_within(width as f64, height as f64, max_width, max_height))
    }
}

/// Decode a dropped file into an embeddable image.
///
/// Bytes in a readable format must carry a valid header. Bytes in any other
/// format are embedded under the declared MIME type.
pub fn embed_dropped_file(file: &DroppedFile) -> Result<EmbeddedImage, ImageError> {
    if !file.is_image() {
        return Err(ImageError::NotAnImage(file.mime.clone()));
    }
    if file.bytes.is_empty() {
        return Err(ImageError::TooShort);
    }
    let (mime, size) = match sniff_format(&file.bytes) {
        Some(format) => {
            let (width, height) = read_dimensions(&file.bytes, format)?;
            let mime = mime_for(format).unwrap_or_else(|| declared_mime(&file.mime));
            (mime.to_string(), Some((width, height)))
        }
        None => (declared_mime(&file.mime).to_ascii_lowercase(), None),
    };
    let encoded = base64::engine::general_purpose::STANDARD.encode(&file.bytes);
    Ok(EmbeddedImage {
        data_uri: format!("data:{};base64,{}", mime, encoded),
        size,
    })
}

/// The bare type of a declared MIME, without parameters.
fn declared_mime(mime: &str) -> &str {
    mime.split(';').next().unwrap_or(mime).trim()
}

/// Intrinsic size of the image behind a `data:image/...;base64,` source.
pub fn data_uri_dimensions(src: &str) -> Result<(u32, u32), ImageError> {
    let bytes = decode_data_uri(src)?;
    let (_, width, height) = read_header(&bytes)?;
    Ok((width, height))
}

/// Raw bytes of a `data:image/...;base64,...` URI.
pub fn decode_data_uri(src: &str) -> Result<Vec<u8>, ImageError> {
    let rest = src
        .strip_prefix("data:image/")
        .ok_or(ImageError::InvalidDataUri("expected data:image/ prefix"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or(ImageError::InvalidDataUri("missing comma"))?;
    if !header.ends_with(";base64") {
        return Err(ImageError::InvalidDataUri("only base64 payloads are supported"));
    }
    Ok(base64::engine::general_purpose::STANDARD.decode(payload.trim())?)
}

/// Detect the format from magic bytes and read dimensions from the header
/// without decoding pixels.
fn read_header(data: &[u8]) -> Result<(ImageFormat, u32, u32), ImageError> {
    if data.len() < 4 {
        return Err(ImageError::TooShort);
    }
    let format = sniff_format(data).ok_or(ImageError::UnsupportedFormat)?;
    let (width, height) = read_dimensions(data, format)?;
    Ok((format, width, height))
}

fn read_dimensions(data: &[u8], format: ImageFormat) -> Result<(u32, u32), ImageError> {
    let reader = image::io::Reader::with_format(Cursor::new(data), format);
    Ok(reader.into_dimensions()?)
}

fn sniff_format(data: &[u8]) -> Option<ImageFormat> {
    if is_jpeg(data) {
        Some(ImageFormat::Jpeg)
    } else if is_png(data) {
        Some(ImageFormat::Png)
    } else if data.starts_with(b"GIF8") {
        Some(ImageFormat::Gif)
    } else if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        Some(ImageFormat::WebP)
    } else {
        None
    }
}

fn mime_for(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::WebP => Some("image/webp"),
        _ => None,
    }
}

fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}

fn is_png(data: &[u8]) -> bool {
    data.len() >= 4 && data[0] == 0x89 && data[1] == 0x50 && data[2] == 0x4E && data[3] == 0x47
}

/// Scale `width` × `height` down to fit the box, keeping the aspect ratio.
pub fn fit_within(width: f64, height: f64, max_width: f64, max_height: f64) -> (f64, f64) {
    if width <= 0.0 || height <= 0.0 {
        return (0.0, 0.0);
    }
    let scale = (max_width / width).min(max_height / height).min(1.0).max(0.0);
    (width * scale, height * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 0, 0, 255]));
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            width,
            height,
            image::ColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    fn jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |_, _| image::Rgb([0, 128, 255]));
        let mut buf = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            width,
            height,
            image::ColorType::Rgb8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn test_is_jpeg() {
        assert!(is_jpeg(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!is_jpeg(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(!is_jpeg(&[0xFF]));
    }

    #[test]
    fn test_is_png() {
        assert!(is_png(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(!is_png(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!is_png(&[0x89, 0x50]));
    }

    #[test]
    fn image_mime_detection() {
        assert!(is_image_mime("image/png"));
        assert!(is_image_mime("IMAGE/JPEG"));
        assert!(!is_image_mime("application/pdf"));
        assert!(!is_image_mime("text"));
    }

    #[test]
    fn embeds_png_as_data_uri() {
        let file = DroppedFile::new("logo.png", "image/png", png(3, 2));
        let embedded = embed_dropped_file(&file).unwrap();
        assert!(embedded.data_uri.starts_with("data:image/png;base64,"));
        assert_eq!(embedded.size, Some((3, 2)));
        assert_eq!(data_uri_dimensions(&embedded.data_uri).unwrap(), (3, 2));
    }

    #[test]
    fn sniffed_format_wins_over_declared_mime() {
        let file = DroppedFile::new("photo.png", "image/png", jpeg(2, 2));
        let embedded = embed_dropped_file(&file).unwrap();
        assert!(embedded.data_uri.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn corrupt_image_fails() {
        let mut bytes = png(4, 4);
        bytes.truncate(12);
        let file = DroppedFile::new("broken.png", "image/png", bytes);
        assert!(embed_dropped_file(&file).is_err());
    }

    #[test]
    fn unreadable_formats_embed_without_size() {
        let svg = br#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"/>"#;
        let file = DroppedFile::new("a.svg", "image/svg+xml", svg.to_vec());
        let embedded = embed_dropped_file(&file).unwrap();
        assert!(embedded.data_uri.starts_with("data:image/svg+xml;base64,"));
        assert_eq!(embedded.size, None);
        assert_eq!(embedded.fitted(100.0, 100.0), None);
        assert_eq!(decode_data_uri(&embedded.data_uri).unwrap(), svg.to_vec());

        let bmp = DroppedFile::new("a.bmp", "IMAGE/BMP; name=a", b"BM\x3a\x00".to_vec());
        let embedded = embed_dropped_file(&bmp).unwrap();
        assert!(embedded.data_uri.starts_with("data:image/bmp;base64,"));
    }

    #[test]
    fn empty_file_fails() {
        let file = DroppedFile::new("empty.png", "image/png", Vec::new());
        assert!(matches!(embed_dropped_file(&file), Err(ImageError::TooShort)));
    }

    #[test]
    fn non_image_is_rejected() {
        let file = DroppedFile::new("notes.txt", "text/plain", b"hello world".to_vec());
        assert!(matches!(
            embed_dropped_file(&file),
            Err(ImageError::NotAnImage(_))
        ));
    }

    #[test]
    fn too_short_and_unknown_data() {
        assert!(matches!(read_header(&[0x00, 0x01]), Err(ImageError::TooShort)));
        assert!(matches!(
            read_header(&[0x00, 0x01, 0x02, 0x03, 0x04]),
            Err(ImageError::UnsupportedFormat)
        ));
    }

    #[test]
    fn invalid_data_uris() {
        assert!(decode_data_uri("data:image/png;base64").is_err());
        assert!(decode_data_uri("data:text/plain;base64,aGk=").is_err());
        assert!(decode_data_uri("data:image/svg+xml,<svg/>").is_err());
    }

    #[test]
    fn fitting_never_upscales() {
        assert_eq!(fit_within(100.0, 50.0, 500.0, 500.0), (100.0, 50.0));
        assert_eq!(fit_within(1000.0, 500.0, 500.0, 500.0), (500.0, 250.0));
        assert_eq!(fit_within(1000.0, 500.0, 500.0, 40.0), (80.0, 40.0));
        assert_eq!(fit_within(0.0, 10.0, 50.0, 50.0), (0.0, 0.0));
    }
}
