//! Transform engine: pass-through, resize, and post effects
//!
//! Pixel work runs on the blocking pool. Decode and encode errors, as well as
//! a panicking worker, come back as `TransformFailure`.

use crate::effects::{CommandShadowEffect, InProcessShadowEffect, PostEffectApplier};
use crate::image::ImageTransformer;
use crate::mime::MimeClass;
use bytes::Bytes;
use derivia_core::{Config, DerivativeError, ResizeSpec};
use std::sync::Arc;

/// An origin image that passed MIME gating
#[derive(Debug, Clone)]
pub struct LoadedOrigin {
    pub key: String,
    pub content_type: String,
    pub class: MimeClass,
    pub data: Bytes,
}

#[derive(Clone)]
pub struct TransformEngine {
    transformer: ImageTransformer,
    post_effect: Arc<dyn PostEffectApplier>,
}

fn failure(what: &str, err: anyhow::Error) -> DerivativeError {
    DerivativeError::transform(format!("{}: {:#}", what, err), err)
}

/// Run pixel work on the blocking pool. A panic inside `job` is caught at
/// the join and reported like any other transform error.
async fn run_blocking<T, F>(what: &str, job: F) -> Result<T, DerivativeError>
where
    T: Send + 'static,
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| failure("Transform worker failed", e.into()))?
        .map_err(|e| failure(what, e))
}

impl TransformEngine {
    /// Uses ImageMagick for the shadow effect when a filter path is
    /// configured, the in-process renderer otherwise.
    pub fn new(config: &Config) -> Self {
        let post_effect: Arc<dyn PostEffectApplier> = match config.shadow_filter_path() {
            Some(path) => Arc::new(CommandShadowEffect::new(path.to_string())),
            None => Arc::new(InProcessShadowEffect::new(config.jpeg_quality())),
        };
        Self::with_post_effect(config, post_effect)
    }

    pub fn with_post_effect(config: &Config, post_effect: Arc<dyn PostEffectApplier>) -> Self {
        Self {
            transformer: ImageTransformer::new(config.allow_enlargement(), config.jpeg_quality()),
            post_effect,
        }
    }

    pub fn post_effect_name(&self) -> &'static str {
        self.post_effect.name()
    }

    pub async fn transform(
        &self,
        origin: &LoadedOrigin,
        spec: &ResizeSpec,
    ) -> Result<Bytes, DerivativeError> {
        let format = match origin.class {
            MimeClass::PassThrough => {
                tracing::debug!(
                    key = %origin.key,
                    content_type = %origin.content_type,
                    "Passing origin through untransformed"
                );
                return Ok(origin.data.clone());
            }
            MimeClass::Transformable(format) => format,
        };

        let start = std::time::Instant::now();
        let transformer = self.transformer;
        let data = origin.data.clone();
        let job_spec = spec.clone();

        let resized = run_blocking("Failed to transform image", move || {
            transformer.resize(&data, format, &job_spec)
        })
        .await?;

        let output = if spec.fit.is_post_effect() {
            self.post_effect
                .apply(resized, format)
                .await
                .map_err(|e| failure("Failed to apply shadow effect", e))?
        } else {
            resized
        };

        tracing::info!(
            key = %origin.key,
            token = %spec.token,
            input_bytes = origin.data.len() as u64,
            output_bytes = output.len() as u64,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Transform complete"
        );

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use derivia_core::{ErrorMetadata, FitMode};
    use image::{DynamicImage, GenericImageView, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEffect {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PostEffectApplier for CountingEffect {
        async fn apply(&self, data: Bytes, _format: ImageFormat) -> anyhow::Result<Bytes> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(data)
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    struct FailingEffect;

    #[async_trait]
    impl PostEffectApplier for FailingEffect {
        async fn apply(&self, _data: Bytes, _format: ImageFormat) -> anyhow::Result<Bytes> {
            Err(anyhow::anyhow!("filter exited with status 1"))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn png_origin(width: u32, height: u32) -> LoadedOrigin {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([1, 2, 3, 255])));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        LoadedOrigin {
            key: "a.png".to_string(),
            content_type: "image/png".to_string(),
            class: MimeClass::Transformable(ImageFormat::Png),
            data: Bytes::from(buf.into_inner()),
        }
    }

    fn config() -> Config {
        Config::for_bucket("images")
    }

    #[tokio::test]
    async fn test_pass_through_is_byte_identical() {
        let engine = TransformEngine::new(&config());
        let origin = LoadedOrigin {
            key: "a.gif".to_string(),
            content_type: "image/gif".to_string(),
            class: MimeClass::PassThrough,
            data: Bytes::from_static(b"GIF89a-not-really"),
        };
        let spec = ResizeSpec::new(Some(10), Some(10), FitMode::Cover);
        let out = engine.transform(&origin, &spec).await.unwrap();
        assert_eq!(out, origin.data);
    }

    #[tokio::test]
    async fn test_shadow_runs_post_effect_only_for_shadow() {
        let effect = Arc::new(CountingEffect {
            calls: AtomicUsize::new(0),
        });
        let engine = TransformEngine::with_post_effect(&config(), effect.clone());
        let origin = png_origin(100, 100);

        engine
            .transform(&origin, &ResizeSpec::new(Some(50), Some(50), FitMode::Cover))
            .await
            .unwrap();
        assert_eq!(effect.calls.load(Ordering::SeqCst), 0);

        let out = engine
            .transform(&origin, &ResizeSpec::new(Some(50), Some(40), FitMode::Shadow))
            .await
            .unwrap();
        assert_eq!(effect.calls.load(Ordering::SeqCst), 1);
        assert_eq!(image::load_from_memory(&out).unwrap().dimensions(), (50, 40));
    }

    #[tokio::test]
    async fn test_failures_are_transform_failures() {
        let engine = TransformEngine::with_post_effect(&config(), Arc::new(FailingEffect));

        let err = engine
            .transform(
                &png_origin(20, 20),
                &ResizeSpec::new(Some(10), Some(10), FitMode::Shadow),
            )
            .await
            .unwrap_err();
        assert_eq!(err.http_status_code(), 422);
        assert!(err.client_message().contains("filter exited with status 1"));

        let corrupt = LoadedOrigin {
            data: Bytes::from_static(b"\x89PNG\r\n\x1a\ntruncated"),
            ..png_origin(1, 1)
        };
        let err = engine
            .transform(&corrupt, &ResizeSpec::new(Some(10), Some(10), FitMode::Cover))
            .await
            .unwrap_err();
        assert!(matches!(err, DerivativeError::TransformFailure { .. }));
    }

    #[tokio::test]
    async fn test_panicking_worker_is_contained() {
        let err = run_blocking::<Bytes, _>("Failed to transform image", || {
            panic!("decoder invariant violated")
        })
        .await
        .unwrap_err();
        assert!(matches!(err, DerivativeError::TransformFailure { .. }));
        assert_eq!(err.http_status_code(), 422);
        assert!(err.client_message().contains("Transform worker failed"));

        // The runtime keeps serving after the panic.
        let engine = TransformEngine::new(&config());
        let out = engine
            .transform(&png_origin(20, 20), &ResizeSpec::new(Some(10), Some(10), FitMode::Cover))
            .await
            .unwrap();
        assert_eq!(image::load_from_memory(&out).unwrap().dimensions(), (10, 10));
    }
}
