use super::PostEffectApplier;
use crate::image::encode::encode_image;
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use image::{imageops, DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::filter::gaussian_blur_f32;

const SHADOW_OPACITY: f32 = 0.6;
const SHADOW_SIGMA: f32 = 5.0;
const SHADOW_OFFSET: u32 = 5;
/// Room around the image for the blurred edge
const SHADOW_PAD: u32 = 10;

/// Drop shadow rendered without external tools: an offset, blurred
/// silhouette of the image flattened onto white.
pub struct InProcessShadowEffect {
    jpeg_quality: u8,
}

impl InProcessShadowEffect {
    pub fn new(jpeg_quality: u8) -> Self {
        Self { jpeg_quality }
    }

    pub fn render(img: &DynamicImage) -> DynamicImage {
        let source = img.to_rgba8();
        let (width, height) = source.dimensions();
        let canvas_w = width + 2 * SHADOW_PAD + SHADOW_OFFSET;
        let canvas_h = height + 2 * SHADOW_PAD + SHADOW_OFFSET;

        let mut silhouette = RgbaImage::new(canvas_w, canvas_h);
        for (x, y, pixel) in source.enumerate_pixels() {
            let alpha = (pixel[3] as f32 * SHADOW_OPACITY).round() as u8;
            silhouette.put_pixel(
                x + SHADOW_PAD + SHADOW_OFFSET,
                y + SHADOW_PAD + SHADOW_OFFSET,
                Rgba([0, 0, 0, alpha]),
            );
        }
        let shadow = gaussian_blur_f32(&silhouette, SHADOW_SIGMA);

        let mut canvas = RgbaImage::from_pixel(canvas_w, canvas_h, Rgba([255, 255, 255, 255]));
        imageops::overlay(&mut canvas, &shadow, 0, 0);
        imageops::overlay(&mut canvas, &source, SHADOW_PAD as i64, SHADOW_PAD as i64);

        DynamicImage::ImageRgba8(canvas)
    }
}

#[async_trait]
impl PostEffectApplier for InProcessShadowEffect {
    async fn apply(&self, data: Bytes, format: ImageFormat) -> Result<Bytes> {
        let quality = self.jpeg_quality;
        tokio::task::spawn_blocking(move || {
            let img = image::load_from_memory(&data).context("Failed to decode shadow input")?;
            let shadowed = Self::render(&img);
            tracing::debug!(
                width = shadowed.width(),
                height = shadowed.height(),
                "Rendered drop shadow"
            );
            Ok(Bytes::from(encode_image(&shadowed, format, quality)?))
        })
        .await
        .context("Shadow worker panicked")?
    }

    fn name(&self) -> &'static str {
        "in-process-shadow"
    }
}
