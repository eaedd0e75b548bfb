//! Image processing module
//!
//! - Fit planning (fit)
//! - EXIF orientation (orientation)
//! - Encoding back to the origin format (encode)
//! - Decode / plan / apply / encode orchestration (transformer)

pub mod encode;
pub mod fit;
pub mod orientation;
pub mod transformer;

pub use fit::FitPlan;
pub use orientation::Orientation;
pub use transformer::ImageTransformer;
