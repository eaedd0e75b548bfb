//! Domain models for derivative requests

use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

/// Fit action names accepted in the `_fit` suffix of a size token.
pub const FIT_ACTIONS: [&str; 6] = ["cover", "contain", "fill", "inside", "outside", "shadow"];

/// How the source aspect ratio interacts with the requested box.
///
/// `Shadow` is not an aspect rule: the image is resized as `Cover` and a drop
/// shadow post-effect is applied afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitMode {
    #[default]
    Cover,
    Contain,
    Fill,
    Inside,
    Outside,
    Shadow,
}

impl FitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FitMode::Cover => "cover",
            FitMode::Contain => "contain",
            FitMode::Fill => "fill",
            FitMode::Inside => "inside",
            FitMode::Outside => "outside",
            FitMode::Shadow => "shadow",
        }
    }

    pub fn is_post_effect(&self) -> bool {
        matches!(self, FitMode::Shadow)
    }
}

impl FromStr for FitMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cover" => Ok(FitMode::Cover),
            "contain" => Ok(FitMode::Contain),
            "fill" => Ok(FitMode::Fill),
            "inside" => Ok(FitMode::Inside),
            "outside" => Ok(FitMode::Outside),
            "shadow" => Ok(FitMode::Shadow),
            _ => Err(()),
        }
    }
}

impl fmt::Display for FitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated resize request. `None` on an axis means `auto`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeSpec {
    pub width: Option<NonZeroU32>,
    pub height: Option<NonZeroU32>,
    pub fit: FitMode,
    /// The full `sizeAndFit` token as it appeared in the path
    pub token: String,
}

impl ResizeSpec {
    pub fn new(width: Option<u32>, height: Option<u32>, fit: FitMode) -> Self {
        let width = width.and_then(NonZeroU32::new);
        let height = height.and_then(NonZeroU32::new);
        let token = format!(
            "{}x{}_{}",
            width.map_or("auto".to_string(), |w| w.to_string()),
            height.map_or("auto".to_string(), |h| h.to_string()),
            fit
        );
        Self {
            width,
            height,
            fit,
            token,
        }
    }

    pub fn width_px(&self) -> Option<u32> {
        self.width.map(NonZeroU32::get)
    }

    pub fn height_px(&self) -> Option<u32> {
        self.height.map(NonZeroU32::get)
    }

    /// Both axes `auto`: the transform keeps the source geometry.
    pub fn is_unbounded(&self) -> bool {
        self.width.is_none() && self.height.is_none()
    }
}

/// Blob store key of a derivative: the normalized request path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DerivativeKey(String);

impl DerivativeKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DerivativeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DerivativeKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An origin or derivative image as read from the blob store.
#[derive(Debug, Clone)]
pub struct ImageObject {
    pub key: String,
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub data: Bytes,
}

impl ImageObject {
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}
