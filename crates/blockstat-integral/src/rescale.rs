//! Box-filter rescaling through an integral table
//!
//! Each output pixel box-averages exactly the source rectangle it covers,
//! so arbitrary downscale factors cost O(1) per output pixel after the
//! one-time table construction. Rounding, clamping and the final store
//! all happen inside the scaled table query, so no intermediate float
//! buffer is allocated.

use blockstat_core::Raster;

use crate::error::{StatError, StatResult};
use crate::table::IntegralTable;

/// Round half away from zero.
#[inline]
pub(crate) fn round(a: f64) -> i32 {
    (a + a.signum() * 0.5) as i32
}

/// Box-filter rescaler over one source raster.
///
/// # Examples
///
/// ```
/// use blockstat_core::Raster;
/// use blockstat_integral::Rescaler;
///
/// let source = Raster::from_gray8(4, 4, (0..16).collect()).unwrap();
/// let half = Rescaler::new(&source).unwrap().scale_to(2, 2).unwrap();
/// assert_eq!(half.dimensions(), (2, 2));
/// ```
pub struct Rescaler<'a> {
    raster: &'a Raster,
    table: IntegralTable,
}

impl<'a> Rescaler<'a> {
    /// Build the table variant matching the source raster's format.
    pub fn new(raster: &'a Raster) -> StatResult<Self> {
        let table = IntegralTable::build(raster)?;
        Ok(Rescaler { raster, table })
    }

    /// Rescale to exactly `width x height`, box-averaging the source
    /// footprint of each destination pixel.
    ///
    /// Per axis, the source interval of destination index `i` is
    /// `[i * pixel_size, (i + 1) * pixel_size)` with edges rounded half
    /// away from zero and clamped into `[-1, source_dim - 1]`; the lower
    /// clamp keeps degenerate footprints at least one sample wide.
    ///
    /// # Errors
    ///
    /// Returns [`StatError::InvalidParameters`] if either target
    /// dimension is zero.
    pub fn scale_to(&self, width: u32, height: u32) -> StatResult<Raster> {
        if width == 0 || height == 0 {
            return Err(StatError::InvalidParameters(format!(
                "target dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }

        let ww = self.raster.width() as i32 - 1;
        let hh = self.raster.height() as i32 - 1;
        let pixel_width = f64::from(self.raster.width()) / f64::from(width);
        let pixel_height = f64::from(self.raster.height()) / f64::from(height);

        let mut target = Raster::new(width, height, self.raster.format())?;

        for y in 0..height {
            let y_min_f = f64::from(y) * pixel_height;
            let y_min = (hh - 1).min((-1).max(round(y_min_f) - 1));
            let y_max = hh.min((y_min + 1).max(round(y_min_f + pixel_height - 1.0)));
            let bh = (y_max - y_min) as f32;

            for x in 0..width {
                let x_min_f = f64::from(x) * pixel_width;
                let x_min = (ww - 1).min((-1).max(round(x_min_f) - 1));
                let x_max = ww.min((x_min + 1).max(round(x_min_f + pixel_width - 1.0)));
                let scale = 1.0 / (x_max - x_min) as f32 / bh;

                target.set_pixel_unchecked(x, y, self.table.scaled_sum(x_min, y_min, x_max, y_max, scale));
            }
        }

        Ok(target)
    }

    /// Rescale by a uniform factor; target dimensions are the rounded
    /// scaled source dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`StatError::InvalidParameters`] if the factor rounds
    /// either dimension to zero or below.
    pub fn scale_by(&self, factor: f64) -> StatResult<Raster> {
        let width = round(f64::from(self.raster.width()) * factor);
        let height = round(f64::from(self.raster.height()) * factor);
        if width <= 0 || height <= 0 {
            return Err(StatError::InvalidParameters(format!(
                "scale factor {} collapses {}x{} to {}x{}",
                factor,
                self.raster.width(),
                self.raster.height(),
                width,
                height
            )));
        }
        self.scale_to(width as u32, height as u32)
    }
}
