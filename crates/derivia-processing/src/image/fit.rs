//! Fit planning
//!
//! Turns source dimensions plus a requested box into the concrete geometry
//! operations to run. Planning is pure arithmetic so the aspect-ratio rules
//! can be tested without decoding anything.

use derivia_core::FitMode;
use image::{imageops, DynamicImage, GenericImageView, Rgba, RgbaImage};

/// Letterbox color for `contain`
const LETTERBOX: Rgba<u8> = Rgba([0, 0, 0, 255]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitPlan {
    /// Output keeps the source geometry
    Keep,
    /// Scale to exactly `width` x `height`
    Scale { width: u32, height: u32 },
    /// Scale, then center-crop to `width` x `height`
    ScaleAndCrop {
        scaled_width: u32,
        scaled_height: u32,
        width: u32,
        height: u32,
    },
    /// Scale, then center on an opaque `width` x `height` canvas
    ScaleAndPad {
        scaled_width: u32,
        scaled_height: u32,
        width: u32,
        height: u32,
    },
}

fn apply_scale(src_w: u32, src_h: u32, scale: f64) -> (u32, u32) {
    let new_w = (src_w as f64 * scale).round() as u32;
    let new_h = (src_h as f64 * scale).round() as u32;
    (new_w.max(1), new_h.max(1))
}

impl FitPlan {
    pub fn plan(
        src_w: u32,
        src_h: u32,
        target_w: Option<u32>,
        target_h: Option<u32>,
        fit: FitMode,
        allow_enlargement: bool,
    ) -> FitPlan {
        let clamp = |scale: f64| {
            if allow_enlargement {
                scale
            } else {
                scale.min(1.0)
            }
        };
        let scale_to = |width: u32, height: u32| {
            if (width, height) == (src_w, src_h) {
                FitPlan::Keep
            } else {
                FitPlan::Scale { width, height }
            }
        };

        let (w, h) = match (target_w, target_h) {
            (None, None) => return FitPlan::Keep,
            (Some(w), None) => {
                let (nw, nh) = apply_scale(src_w, src_h, clamp(w as f64 / src_w as f64));
                return scale_to(nw, nh);
            }
            (None, Some(h)) => {
                let (nw, nh) = apply_scale(src_w, src_h, clamp(h as f64 / src_h as f64));
                return scale_to(nw, nh);
            }
            (Some(w), Some(h)) => (w, h),
        };

        let scale_x = w as f64 / src_w as f64;
        let scale_y = h as f64 / src_h as f64;

        match fit {
            FitMode::Fill => {
                if allow_enlargement {
                    scale_to(w, h)
                } else {
                    scale_to(w.min(src_w), h.min(src_h))
                }
            }
            FitMode::Inside => {
                let (nw, nh) = apply_scale(src_w, src_h, clamp(scale_x.min(scale_y)));
                scale_to(nw.min(w), nh.min(h))
            }
            FitMode::Outside => {
                let (nw, nh) = apply_scale(src_w, src_h, clamp(scale_x.max(scale_y)));
                scale_to(nw, nh)
            }
            FitMode::Cover | FitMode::Shadow => {
                let (scaled_width, scaled_height) =
                    apply_scale(src_w, src_h, clamp(scale_x.max(scale_y)));
                let (width, height) = (w.min(scaled_width), h.min(scaled_height));
                if (width, height) == (scaled_width, scaled_height) {
                    scale_to(scaled_width, scaled_height)
                } else {
                    FitPlan::ScaleAndCrop {
                        scaled_width,
                        scaled_height,
                        width,
                        height,
                    }
                }
            }
            FitMode::Contain => {
                let scale = scale_x.min(scale_y);
                if !allow_enlargement && scale > 1.0 {
                    return FitPlan::Keep;
                }
                let (nw, nh) = apply_scale(src_w, src_h, scale);
                let (scaled_width, scaled_height) = (nw.min(w), nh.min(h));
                if (scaled_width, scaled_height) == (w, h) {
                    scale_to(w, h)
                } else {
                    FitPlan::ScaleAndPad {
                        scaled_width,
                        scaled_height,
                        width: w,
                        height: h,
                    }
                }
            }
        }
    }

    /// Dimensions of the image `apply` produces from a `src_w` x `src_h` source
    pub fn output_dimensions(&self, src_w: u32, src_h: u32) -> (u32, u32) {
        match *self {
            FitPlan::Keep => (src_w, src_h),
            FitPlan::Scale { width, height }
            | FitPlan::ScaleAndCrop { width, height, .. }
            | FitPlan::ScaleAndPad { width, height, .. } => (width, height),
        }
    }

    pub fn apply(&self, img: DynamicImage) -> DynamicImage {
        match *self {
            FitPlan::Keep => img,
            FitPlan::Scale { width, height } => resize_image(&img, width, height),
            FitPlan::ScaleAndCrop {
                scaled_width,
                scaled_height,
                width,
                height,
            } => {
                let scaled = resize_image(&img, scaled_width, scaled_height);
                let x = (scaled_width - width) / 2;
                let y = (scaled_height - height) / 2;
                scaled.crop_imm(x, y, width, height)
            }
            FitPlan::ScaleAndPad {
                scaled_width,
                scaled_height,
                width,
                height,
            } => {
                let scaled = resize_image(&img, scaled_width, scaled_height);
                let mut canvas =
                    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, LETTERBOX));
                let x = (width - scaled_width) / 2;
                let y = (height - scaled_height) / 2;
                imageops::overlay(&mut canvas, &scaled, x as i64, y as i64);
                canvas
            }
        }
    }
}

/// Select appropriate filter type based on resize ratio
pub fn select_filter(
    orig_width: u32,
    orig_height: u32,
    new_width: u32,
    new_height: u32,
) -> imageops::FilterType {
    let width_ratio = orig_width as f32 / new_width as f32;
    let height_ratio = orig_height as f32 / new_height as f32;
    let max_ratio = width_ratio.max(height_ratio);

    if max_ratio > 2.0 {
        imageops::FilterType::Triangle
    } else if max_ratio > 1.5 {
        imageops::FilterType::CatmullRom
    } else {
        imageops::FilterType::Lanczos3
    }
}

fn resize_image(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    let (orig_width, orig_height) = img.dimensions();
    if (orig_width, orig_height) == (width, height) {
        return img.clone();
    }
    let filter = select_filter(orig_width, orig_height, width, height);
    img.resize_exact(width, height, filter)
}
