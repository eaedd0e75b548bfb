//! Derivia Processing Library
//!
//! Everything that touches pixels: MIME classification of origins, fit
//! planning, EXIF orientation, re-encoding and post effects.

pub mod effects;
pub mod engine;
pub mod image;
pub mod mime;

pub use effects::{CommandShadowEffect, InProcessShadowEffect, PostEffectApplier};
pub use engine::{LoadedOrigin, TransformEngine};
pub use crate::image::{FitPlan, ImageTransformer, Orientation};
pub use mime::{MimeClass, MimePolicy};
