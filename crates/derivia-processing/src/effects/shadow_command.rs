use super::PostEffectApplier;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use image::ImageFormat;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Drop shadow rendered by ImageMagick `convert`.
///
/// Input and output live in a private temporary directory that is removed
/// when `apply` returns, whether the filter succeeded or not. The child is
/// killed if the request is cancelled while it runs.
pub struct CommandShadowEffect {
    convert_path: String,
    work_root: Option<PathBuf>,
}

impl CommandShadowEffect {
    pub fn new(convert_path: String) -> Self {
        Self {
            convert_path,
            work_root: None,
        }
    }

    /// Create working directories under `work_root` instead of the system
    /// temp directory.
    pub fn with_work_dir(convert_path: String, work_root: impl Into<PathBuf>) -> Self {
        Self {
            convert_path,
            work_root: Some(work_root.into()),
        }
    }

    fn work_dir(&self) -> std::io::Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("derivia-shadow-");
        match &self.work_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
    }
}

#[async_trait]
impl PostEffectApplier for CommandShadowEffect {
    async fn apply(&self, data: Bytes, format: ImageFormat) -> Result<Bytes> {
        let dir = self
            .work_dir()
            .context("Failed to create shadow working directory")?;
        let ext = format.extensions_str().first().copied().unwrap_or("img");
        let input_path = dir.path().join(format!("input.{}", ext));
        let output_path = dir.path().join(format!("output.{}", ext));

        tokio::fs::write(&input_path, &data)
            .await
            .context("Failed to write shadow input")?;

        let start = std::time::Instant::now();
        let output = Command::new(&self.convert_path)
            .arg(&input_path)
            .args([
                "(",
                "+clone",
                "-background",
                "black",
                "-shadow",
                "60x5+5+5",
                ")",
                "+swap",
                "-background",
                "white",
                "-layers",
                "merge",
                "+repage",
            ])
            .arg(&output_path)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .context("Failed to execute convert")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Shadow filter failed: {}", stderr.trim()));
        }

        let result = tokio::fs::read(&output_path)
            .await
            .context("Shadow filter produced no output")?;

        tracing::debug!(
            size_bytes = result.len() as u64,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Shadow filter finished"
        );

        Ok(Bytes::from(result))
    }

    fn name(&self) -> &'static str {
        "imagemagick-shadow"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_an_error() {
        let effect = CommandShadowEffect::new("/nonexistent/convert".to_string());
        let result = effect
            .apply(Bytes::from_static(b"data"), ImageFormat::Png)
            .await;
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_filter_is_an_error() {
        let effect = CommandShadowEffect::new("false".to_string());
        let err = effect
            .apply(Bytes::from_static(b"data"), ImageFormat::Png)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Shadow filter failed"));
    }

    #[cfg(unix)]
    fn entries(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_work_dir_removed_after_success() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempfile::TempDir::new().unwrap();
        let bin = tempfile::TempDir::new().unwrap();
        // Stand-in filter: copy the input (first arg) to the output (last arg).
        let script = bin.path().join("convert");
        std::fs::write(&script, "#!/bin/sh\nfor last; do :; done\ncp \"$1\" \"$last\"\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let effect = CommandShadowEffect::with_work_dir(
            script.to_string_lossy().into_owned(),
            root.path(),
        );
        let out = effect
            .apply(Bytes::from_static(b"pixels"), ImageFormat::Png)
            .await
            .unwrap();
        assert_eq!(out, Bytes::from_static(b"pixels"));
        assert_eq!(entries(root.path()), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_work_dir_removed_after_failure() {
        let root = tempfile::TempDir::new().unwrap();
        let effect = CommandShadowEffect::with_work_dir("false".to_string(), root.path());
        assert!(effect
            .apply(Bytes::from_static(b"data"), ImageFormat::Png)
            .await
            .is_err());
        assert_eq!(entries(root.path()), 0);

        let effect = CommandShadowEffect::with_work_dir("/nonexistent/convert".to_string(), root.path());
        assert!(effect
            .apply(Bytes::from_static(b"data"), ImageFormat::Png)
            .await
            .is_err());
        assert_eq!(entries(root.path()), 0);
    }
}
