//! Fixed-radius box mean through an integral table
//!
//! The constant-radius relative of the tilt renderer: every pixel is
//! replaced by the average of its `(2*rx + 1) x (2*ry + 1)` neighborhood,
//! clamped to the raster bounds, in O(1) per pixel. Reads come from the
//! construction-time table, so the in-place overwrite never feeds back
//! into later windows.

use blockstat_core::Raster;

use crate::error::StatResult;
use crate::table::IntegralTable;

/// Box-mean filter over one raster.
pub struct BoxMean {
    raster: Raster,
    table: IntegralTable,
}

impl BoxMean {
    /// Take ownership of the raster and build its integral table.
    pub fn new(raster: Raster) -> StatResult<Self> {
        let table = IntegralTable::build(&raster)?;
        Ok(BoxMean { raster, table })
    }

    /// Box-average every pixel in place over the window with half-width
    /// `radius_x` and half-height `radius_y`, clamped to the raster
    /// bounds. Radius 0 on both axes is the identity.
    pub fn mean(&mut self, radius_x: u32, radius_y: u32) {
        let radius_x = radius_x as i32;
        let radius_y = radius_y as i32;
        let w = self.raster.width() as i32 - 1;
        let h = self.raster.height() as i32 - 1;

        for y in 0..=h {
            let y_min = (-1).max(y - radius_y - 1);
            let y_max = h.min(y + radius_y);
            let bh = (y_max - y_min) as f32;

            for x in 0..=w {
                let x_min = (-1).max(x - radius_x - 1);
                let x_max = w.min(x + radius_x);
                let scale = 1.0 / (x_max - x_min) as f32 / bh;

                let value = self.table.scaled_sum(x_min, y_min, x_max, y_max, scale);
                self.raster.set_pixel_unchecked(x as u32, y as u32, value);
            }
        }
    }

    /// The filtered raster.
    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    /// Surrender the filtered raster.
    pub fn into_raster(self) -> Raster {
        self.raster
    }
}
