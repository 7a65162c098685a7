//! Blockstat - windowed-statistics engine over raster images
//!
//! Precomputes integral (summed-area) tables over 2D sample grids so
//! that rectangular-window aggregates cost O(1) regardless of window
//! size, and builds four consumers on top of them:
//!
//! - block-wise Pearson correlation between two offset-registered
//!   rasters ([`integral::BlockPmcc`])
//! - box-filter rescaling ([`integral::Rescaler`])
//! - tilt-dependent variable-radius blur ([`integral::Tilt`])
//! - fixed-radius box mean ([`integral::BoxMean`])
//!
//! # Example
//!
//! ```
//! use blockstat::{Raster, SampleFormat};
//! use blockstat::integral::Rescaler;
//!
//! let source = Raster::new(640, 480, SampleFormat::Gray8).unwrap();
//! let thumb = Rescaler::new(&source).unwrap().scale_to(64, 48).unwrap();
//! assert_eq!(thumb.dimensions(), (64, 48));
//! ```

// Re-export core types (primary data structures used everywhere)
pub use blockstat_core::*;

// Re-export the engine crate as a module
pub use blockstat_integral as integral;
