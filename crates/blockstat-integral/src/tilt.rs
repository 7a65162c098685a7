//! Tilt rendering - variable-radius box blur along a line
//!
//! Simulates a tilt/depth-of-field effect: every pixel is box-averaged
//! with a window radius proportional to its signed distance from a
//! directed line, so blur strength grows away from the line while pixels
//! on the line stay sharp.
//!
//! The integral table is built once at construction, so rendering
//! overwrites the owned raster in place while all reads keep coming from
//! the pre-render state; repeated renders with different lines are
//! independent of each other.

use blockstat_core::Raster;

use crate::error::StatResult;
use crate::table::IntegralTable;

/// Variable-radius box blur keyed to a directed line.
///
/// # Examples
///
/// ```
/// use blockstat_core::{Raster, SampleFormat};
/// use blockstat_integral::Tilt;
///
/// let raster = Raster::new(32, 32, SampleFormat::Gray8).unwrap();
/// let mut tilt = Tilt::new(raster).unwrap();
/// tilt.render(0, 16, 31, 16);
/// let blurred = tilt.into_raster();
/// ```
pub struct Tilt {
    raster: Raster,
    table: IntegralTable,
}

impl Tilt {
    /// Take ownership of the raster and build its integral table.
    pub fn new(raster: Raster) -> StatResult<Self> {
        let table = IntegralTable::build(&raster)?;
        Ok(Tilt { raster, table })
    }

    /// Blur the raster in place with a window radius derived from the
    /// directed line `(x1, y1) -> (x2, y2)`.
    ///
    /// The radius at (x, y) is the magnitude of the projection
    /// `((x2 - x1) * (x - x1) + (y2 - y1) * (y - y1)) / (2 * (W + H))`,
    /// truncated to an integer; the window is clamped to the raster
    /// bounds. Coincident endpoints give radius 0 everywhere, i.e. an
    /// identity copy.
    pub fn render(&mut self, x1: i32, y1: i32, x2: i32, y2: i32) {
        let w = self.raster.width() as i32 - 1;
        let h = self.raster.height() as i32 - 1;
        let s = f64::from(self.raster.width() + self.raster.height()) * 2.0;

        let dx = f64::from(x2 - x1);
        let dy = f64::from(y2 - y1);

        for y in 0..=h {
            let yt = f64::from(y - y1);
            for x in 0..=w {
                let xt = f64::from(x - x1);

                let r = (dx * xt + dy * yt) / s;
                let ri = r.abs() as i32;

                let y_min = (-1).max(y - ri - 1);
                let y_max = h.min(y + ri);
                let bh = (y_max - y_min) as f32;
                let x_min = (-1).max(x - ri - 1);
                let x_max = w.min(x + ri);
                let scale = 1.0 / (x_max - x_min) as f32 / bh;

                let value = self.table.scaled_sum(x_min, y_min, x_max, y_max, scale);
                self.raster.set_pixel_unchecked(x as u32, y as u32, value);
            }
        }
    }

    /// The rendered raster.
    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    /// Surrender the rendered raster.
    pub fn into_raster(self) -> Raster {
        self.raster
    }
}
