//! Post effects applied after the geometric resize
//!
//! Effects that the pixel pipeline does not express as a fit rule sit behind
//! [`PostEffectApplier`]. The drop shadow has two implementations: one shells
//! out to ImageMagick, the other renders in process.

pub mod shadow_command;
pub mod shadow_in_process;

use async_trait::async_trait;
use bytes::Bytes;
use image::ImageFormat;

pub use shadow_command::CommandShadowEffect;
pub use shadow_in_process::InProcessShadowEffect;

#[async_trait]
pub trait PostEffectApplier: Send + Sync {
    /// Apply the effect to an encoded image, returning it encoded as `format`.
    async fn apply(&self, data: Bytes, format: ImageFormat) -> anyhow::Result<Bytes>;

    fn name(&self) -> &'static str;
}
