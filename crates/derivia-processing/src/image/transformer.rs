//! Image transformer - decode, fit, orient and re-encode one image

use crate::image::encode::encode_image;
use crate::image::fit::FitPlan;
use crate::image::orientation::Orientation;
use anyhow::Context;
use bytes::Bytes;
use derivia_core::{FitMode, ResizeSpec};
use image::{GenericImageView, ImageFormat};
use std::io::Cursor;

#[derive(Debug, Clone, Copy)]
pub struct ImageTransformer {
    allow_enlargement: bool,
    jpeg_quality: u8,
}

impl ImageTransformer {
    pub fn new(allow_enlargement: bool, jpeg_quality: u8) -> Self {
        Self {
            allow_enlargement,
            jpeg_quality,
        }
    }

    /// Resize `data` per `spec` and encode the result as `format`.
    ///
    /// The box is interpreted in display orientation. Pixels are scaled as
    /// stored and the EXIF orientation is applied to the scaled result.
    /// `FitMode::Shadow` resizes like `Cover`; the effect itself is applied
    /// by a [`crate::PostEffectApplier`].
    pub fn resize(&self, data: &[u8], format: ImageFormat, spec: &ResizeSpec) -> anyhow::Result<Bytes> {
        let orientation = Orientation::read(data);
        let img = image::ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .context("Failed to read image header")?
            .decode()
            .context("Failed to decode image")?;

        let (src_w, src_h) = img.dimensions();
        let (target_w, target_h) = if orientation.swaps_axes() {
            (spec.height_px(), spec.width_px())
        } else {
            (spec.width_px(), spec.height_px())
        };
        let fit = if spec.fit.is_post_effect() {
            FitMode::Cover
        } else {
            spec.fit
        };

        let plan = FitPlan::plan(src_w, src_h, target_w, target_h, fit, self.allow_enlargement);

        tracing::debug!(
            src_width = src_w,
            src_height = src_h,
            fit = %fit,
            plan = ?plan,
            orientation = ?orientation,
            "Applying fit plan"
        );

        let resized = plan.apply(img);
        let oriented = orientation.apply(resized);

        let encoded = encode_image(&oriented, format, self.jpeg_quality)?;
        Ok(Bytes::from(encoded))
    }
}
