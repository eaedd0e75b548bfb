//! Request path grammar: `[dir/]{width}x{height}[_fit]/filename`
//!
//! Each size component is a positive integer or `auto` (any case). The size
//! segment is the right-most segment before the filename that matches the
//! size grammar, so filenames may themselves contain `/`.

use crate::error::DerivativeError;
use crate::models::DerivativeKey;
use std::num::NonZeroU32;

const PATH_FORMAT: &str = "expected [dir/]{width}x{height}[_fit]/filename";

/// A request path split into its components. The fit token is kept raw so
/// that the validator owns the decision about unknown fit names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPath {
    /// Directory prefix including its trailing `/`, or empty
    pub directory: String,
    /// The full `{width}x{height}[_fit]` segment
    pub size_and_fit: String,
    pub width: Option<NonZeroU32>,
    pub height: Option<NonZeroU32>,
    pub fit: Option<String>,
    pub filename: String,
}

impl RequestPath {
    pub fn parse(raw: &str) -> Result<Self, DerivativeError> {
        let path = raw.strip_prefix('/').unwrap_or(raw);

        if path.is_empty() {
            return Err(DerivativeError::InvalidSpec(format!(
                "path is empty, {}",
                PATH_FORMAT
            )));
        }
        if path.contains('\\') {
            return Err(DerivativeError::InvalidSpec(
                "path must not contain backslashes".to_string(),
            ));
        }

        let segments: Vec<&str> = path.split('/').collect();
        if segments.len() < 2 {
            return Err(DerivativeError::InvalidSpec(format!(
                "\"{}\" has no size segment, {}",
                path, PATH_FORMAT
            )));
        }
        for segment in &segments {
            if segment.is_empty() {
                return Err(DerivativeError::InvalidSpec(format!(
                    "\"{}\" contains an empty segment",
                    path
                )));
            }
            if *segment == ".." || *segment == "." {
                return Err(DerivativeError::InvalidSpec(format!(
                    "\"{}\" contains a relative segment",
                    path
                )));
            }
        }

        let last = segments.len() - 1;
        let size_index = (0..last)
            .rev()
            .find(|&i| parse_size_and_fit(segments[i]).is_ok())
            .unwrap_or(last - 1);

        let size_and_fit = segments[size_index];
        let (width, height, fit) = parse_size_and_fit(size_and_fit)?;

        let directory = if size_index == 0 {
            String::new()
        } else {
            format!("{}/", segments[..size_index].join("/"))
        };
        let filename = segments[size_index + 1..].join("/");

        Ok(RequestPath {
            directory,
            size_and_fit: size_and_fit.to_string(),
            width,
            height,
            fit,
            filename,
        })
    }

    /// Key under which the derivative is stored; identical requests map to
    /// identical keys.
    pub fn derivative_key(&self) -> DerivativeKey {
        DerivativeKey::new(format!(
            "{}{}/{}",
            self.directory, self.size_and_fit, self.filename
        ))
    }

    /// Key of the unmodified source image.
    pub fn origin_key(&self) -> String {
        format!("{}{}", self.directory, self.filename)
    }
}

type SizeAndFit = (Option<NonZeroU32>, Option<NonZeroU32>, Option<String>);

fn parse_size_and_fit(segment: &str) -> Result<SizeAndFit, DerivativeError> {
    let (size, fit) = match segment.split_once('_') {
        Some((size, fit)) if !fit.is_empty() => (size, Some(fit.to_string())),
        Some((size, _)) => (size, None),
        None => (segment, None),
    };

    let (w, h) = size.split_once('x').ok_or_else(|| {
        DerivativeError::InvalidSpec(format!(
            "size \"{}\" must be of the form {{width}}x{{height}}",
            size
        ))
    })?;

    Ok((parse_dimension(w)?, parse_dimension(h)?, fit))
}

fn parse_dimension(component: &str) -> Result<Option<NonZeroU32>, DerivativeError> {
    if component.eq_ignore_ascii_case("auto") {
        return Ok(None);
    }
    if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DerivativeError::InvalidSpec(format!(
            "dimension \"{}\" must be a positive integer or \"auto\"",
            component
        )));
    }
    let value: u32 = component.parse().map_err(|_| {
        DerivativeError::InvalidSpec(format!("dimension \"{}\" is out of range", component))
    })?;
    NonZeroU32::new(value)
        .map(Some)
        .ok_or_else(|| DerivativeError::InvalidSpec("dimension must not be zero".to_string()))
}
