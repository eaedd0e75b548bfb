use anyhow::Context;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Encode `img` in `format`. JPEG honours `quality`; the other encoders the
/// image crate ships are lossless or ignore it.
pub fn encode_image(img: &DynamicImage, format: ImageFormat, quality: u8) -> anyhow::Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());

    match format {
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
            img.to_rgb8()
                .write_with_encoder(encoder)
                .context("JPEG encode failed")?;
        }
        other => {
            img.write_to(&mut buf, other)
                .with_context(|| format!("{:?} encode failed", other))?;
        }
    }

    Ok(buf.into_inner())
}

/// Detect image format from content type
pub fn detect_format(content_type: &str) -> Option<ImageFormat> {
    match content_type {
        "image/jpg" | "image/pjpeg" => Some(ImageFormat::Jpeg),
        other => ImageFormat::from_mime_type(other),
    }
}
