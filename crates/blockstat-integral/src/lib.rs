//! blockstat-integral - O(1) windowed statistics over rasters
//!
//! This crate precomputes cumulative (summed-area) tables over a raster
//! so that the sum, sum of squares, or cross-product sum over any
//! axis-aligned rectangular window is a four-lookup query, independent
//! of window size. On top of the tables it provides:
//!
//! - [`BlockPmcc`] - per-pixel Pearson correlation between two rasters
//!   registered with an integer offset
//! - [`Rescaler`] - box-filter rescaling
//! - [`Tilt`] - variable-radius box blur keyed to a directed line
//! - [`BoxMean`] - fixed-radius box-mean filter
//!
//! All operations are synchronous, single-threaded and deterministic;
//! each component owns its tables and output raster exclusively, so
//! independent instances over disjoint rasters may run in parallel
//! without coordination.

pub mod error;
pub mod mean;
pub mod pmcc;
pub mod rescale;
pub mod table;
pub mod tilt;

pub use error::{StatError, StatResult};
pub use mean::BoxMean;
pub use pmcc::BlockPmcc;
pub use rescale::Rescaler;
pub use table::{DoubleIntegralTable, IntegralTable, LongIntegralTable, RgbIntegralTable};
pub use tilt::Tilt;
