//! Request validation rules
//!
//! Rules run in a fixed order (whitelist, fit, bounds) and the first failure
//! wins. Validation is pure: no store access happens before it passes.

use crate::config::Config;
use crate::error::DerivativeError;
use crate::models::{FitMode, ResizeSpec};
use crate::request_path::RequestPath;
use std::collections::HashSet;
use std::num::NonZeroU32;

#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    whitelist: Option<HashSet<String>>,
    max_width: u32,
    max_height: u32,
    enforce_dimension_limits: bool,
}

impl ValidationPolicy {
    pub fn new(config: &Config) -> Self {
        Self {
            whitelist: config
                .whitelist()
                .map(|tokens| tokens.iter().cloned().collect()),
            max_width: config.max_width(),
            max_height: config.max_height(),
            enforce_dimension_limits: config.enforce_dimension_limits(),
        }
    }

    pub fn validate(&self, path: &RequestPath) -> Result<ResizeSpec, DerivativeError> {
        if let Some(whitelist) = &self.whitelist {
            if !whitelist.contains(&path.size_and_fit) {
                return Err(DerivativeError::WhitelistRejected {
                    token: path.size_and_fit.clone(),
                });
            }
        }

        let fit = match path.fit.as_deref() {
            Some(raw) => raw
                .parse::<FitMode>()
                .map_err(|_| DerivativeError::UnknownFit {
                    fit: raw.to_string(),
                })?,
            None => FitMode::default(),
        };

        if self.enforce_dimension_limits {
            check_bound("width", path.width, self.max_width)?;
            check_bound("height", path.height, self.max_height)?;
        }

        Ok(ResizeSpec {
            width: path.width,
            height: path.height,
            fit,
            token: path.size_and_fit.clone(),
        })
    }
}

fn check_bound(
    dimension: &'static str,
    requested: Option<NonZeroU32>,
    max: u32,
) -> Result<(), DerivativeError> {
    match requested {
        Some(value) if value.get() > max => Err(DerivativeError::DimensionTooLarge {
            dimension,
            requested: value.get(),
            max,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DerivativeConfig;

    fn policy(configure: impl FnOnce(&mut DerivativeConfig)) -> ValidationPolicy {
        let mut inner = DerivativeConfig::with_bucket("images");
        configure(&mut inner);
        ValidationPolicy::new(&Config(Box::new(inner)))
    }

    fn parse(raw: &str) -> RequestPath {
        RequestPath::parse(raw).unwrap()
    }

    #[test]
    fn test_default_fit_is_cover() {
        let spec = policy(|_| {}).validate(&parse("300x200/a.jpg")).unwrap();
        assert_eq!(spec.fit, FitMode::Cover);
        assert_eq!(spec.width_px(), Some(300));
        assert_eq!(spec.height_px(), Some(200));
        assert_eq!(spec.token, "300x200");
    }

    #[test]
    fn test_whitelist_matches_full_token() {
        let policy = policy(|c| c.whitelist = Some(vec!["300x300_contain".to_string()]));
        assert!(policy.validate(&parse("300x300_contain/a.jpg")).is_ok());

        let err = policy.validate(&parse("300x300/a.jpg")).unwrap_err();
        assert!(matches!(
            err,
            DerivativeError::WhitelistRejected { ref token } if token == "300x300"
        ));
    }

    #[test]
    fn test_whitelist_checked_before_fit_and_bounds() {
        let policy = policy(|c| c.whitelist = Some(vec!["10x10".to_string()]));
        let err = policy.validate(&parse("9000x10_bogus/a.jpg")).unwrap_err();
        assert!(matches!(err, DerivativeError::WhitelistRejected { .. }));
    }

    #[test]
    fn test_unknown_fit() {
        let err = policy(|_| {})
            .validate(&parse("9000x10_bogus/a.jpg"))
            .unwrap_err();
        assert!(matches!(err, DerivativeError::UnknownFit { ref fit } if fit == "bogus"));
    }

    #[test]
    fn test_dimension_limits() {
        let err = policy(|_| {}).validate(&parse("5000x100/a.jpg")).unwrap_err();
        assert!(matches!(
            err,
            DerivativeError::DimensionTooLarge {
                dimension: "width",
                requested: 5000,
                max: 3840
            }
        ));

        let err = policy(|_| {})
            .validate(&parse("autox2161/a.jpg"))
            .unwrap_err();
        assert!(matches!(
            err,
            DerivativeError::DimensionTooLarge {
                dimension: "height",
                ..
            }
        ));

        assert!(policy(|_| {}).validate(&parse("3840x2160/a.jpg")).is_ok());
    }

    #[test]
    fn test_dimension_limits_can_be_disabled() {
        let policy = policy(|c| c.enforce_dimension_limits = false);
        let spec = policy.validate(&parse("5000x5000_fill/a.jpg")).unwrap();
        assert_eq!(spec.fit, FitMode::Fill);
    }
}
